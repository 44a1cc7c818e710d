use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CoreError, CoreResult};

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(CoreError::ValidationError(
                "Email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Registration request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ValidationError("Name is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(CoreError::ValidationError(format!(
                "Invalid email address: {}",
                self.email
            )));
        }
        if self.password.is_empty() {
            return Err(CoreError::ValidationError("Password is required".to_string()));
        }
        Ok(())
    }

    pub fn strength(&self) -> PasswordStrength {
        password_strength(&self.password)
    }
}

/// Password strength on a 0..=4 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PasswordStrength(pub u8);

impl PasswordStrength {
    pub fn label(&self) -> &'static str {
        match self.0 {
            0 => "",
            1 => "Weak",
            2 => "Fair",
            3 => "Good",
            _ => "Strong",
        }
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One point each for: 8+ characters, an uppercase letter, a digit, a symbol
pub fn password_strength(password: &str) -> PasswordStrength {
    let checks = [
        password.chars().count() >= 8,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    PasswordStrength(checks.iter().filter(|c| **c).count() as u8)
}
