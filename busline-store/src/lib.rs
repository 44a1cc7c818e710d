pub mod app_config;
pub mod session_file;

pub use app_config::Config;
pub use session_file::{FileSessionStore, StoreError};
