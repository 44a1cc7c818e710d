use busline_shared::{Masked, Role, User};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::{BoxError, CoreError, CoreResult};

/// Who is signed in and the bearer token that proves it.
///
/// Passed explicitly to whatever needs it; there is no ambient session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    pub user: User,
    pub token: Masked<String>,
}

impl SessionContext {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: Masked::new(token.into()),
        }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role.is_admin()
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }

    /// Gate an admin-only action
    pub fn require_admin(&self, action: &str) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(action.to_string()))
        }
    }
}

/// Unwrap an optional session or fail with `NotAuthenticated`
pub fn require_session(session: Option<&SessionContext>) -> CoreResult<&SessionContext> {
    session.ok_or(CoreError::NotAuthenticated)
}

/// Persistence for the signed-in session across runs
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionContext>, BoxError>;

    fn save(&self, session: &SessionContext) -> Result<(), BoxError>;

    /// Forget the session (logout). Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), BoxError>;
}

/// In-process store, used by tests and one-shot runs
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<SessionContext>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionContext>, BoxError> {
        let guard = self.inner.lock().map_err(|e| e.to_string())?;
        Ok(guard.clone())
    }

    fn save(&self, session: &SessionContext) -> Result<(), BoxError> {
        let mut guard = self.inner.lock().map_err(|e| e.to_string())?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), BoxError> {
        let mut guard = self.inner.lock().map_err(|e| e.to_string())?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rider() -> SessionContext {
        SessionContext::new(
            User {
                id: Some("u1".to_string()),
                name: "Asha".to_string(),
                email: Some("asha@example.com".to_string()),
                role: Role::Rider,
            },
            "tok-123",
        )
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(rider().bearer(), "Bearer tok-123");
    }

    #[test]
    fn test_token_not_in_debug_output() {
        let debug = format!("{:?}", rider());
        assert!(!debug.contains("tok-123"));
    }

    #[test]
    fn test_require_admin() {
        let session = rider();
        assert!(matches!(
            session.require_admin("list users"),
            Err(CoreError::Forbidden(_))
        ));

        let mut admin = rider();
        admin.user.role = Role::Admin;
        assert!(admin.require_admin("list users").is_ok());
    }

    #[test]
    fn test_require_session() {
        assert!(matches!(require_session(None), Err(CoreError::NotAuthenticated)));
        let session = rider();
        assert!(require_session(Some(&session)).is_ok());
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&rider()).unwrap();
        assert_eq!(store.load().unwrap(), Some(rider()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }
}
