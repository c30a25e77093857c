pub mod domain;
pub mod dto;
pub mod error;
pub mod infra;
pub mod panels;
pub mod services;
