pub mod directory;
pub mod identity;
pub mod search;
pub mod session;
pub mod stats;

pub use search::{CatalogView, SearchFilter, TripSource};
pub use session::{MemorySessionStore, SessionContext, SessionStore};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Admin access required for {0}")]
    Forbidden(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Boxed error used at async seams, matching the repository traits
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
