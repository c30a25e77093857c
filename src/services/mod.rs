pub mod connection_service;
pub mod listing_service;
pub mod metadata_service;
pub mod open_service;
