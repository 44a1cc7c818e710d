pub mod client;
pub mod render;
pub mod wire;

pub use client::{ApiClient, ClientError};
pub use wire::WireError;
