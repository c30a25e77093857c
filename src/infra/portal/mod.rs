pub mod client;
pub mod memory;
pub mod queries;

pub use client::PortalClient;
pub use memory::MemoryPortalGateway;
