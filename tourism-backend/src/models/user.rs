use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::errors::ApiError;
use crate::validation::{Validate, Validator};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Access level checked on every protected route
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Editor,
    User,
}

impl Role {
    /// Whether this role may access a route open to `allowed`. ADMIN passes every check.
    pub fn satisfies(&self, allowed: &[Role]) -> bool {
        *self == Role::Admin || allowed.contains(self)
    }
}

/// Roles that manage site content
pub const STAFF: &[Role] = &[Role::Admin, Role::Editor];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as exposed over the API (no password hash)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .email("email", &self.email)
            .required("name", &self.name, 100)
            .check(
                self.password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "must be at least 8 characters",
            )
            .check(self.password.len() <= 200, "password", "is too long")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_strings() {
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert_eq!("EDITOR".parse::<Role>().unwrap(), Role::Editor);
        assert!("editor".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"USER\"");
    }

    #[test]
    fn test_role_satisfies() {
        assert!(Role::Admin.satisfies(&[Role::Editor]));
        assert!(Role::Admin.satisfies(&[]));
        assert!(Role::Editor.satisfies(STAFF));
        assert!(!Role::Editor.satisfies(ADMIN_ONLY));
        assert!(!Role::User.satisfies(STAFF));
    }
}
