// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Capability roles. Stored as plain text in the database; parsed here so
/// authorization checks live in one place instead of per-route string
/// comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Expert,
    Admin,
}

impl Role {
    /// Unknown values fall back to the least-privileged role.
    pub fn parse(s: &str) -> Role {
        match s {
            "expert" => Role::Expert,
            "admin" => Role::Admin,
            _ => Role::Farmer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Expert => "expert",
            Role::Admin => "admin",
        }
    }

    /// Official answers and question status changes.
    pub fn can_answer(self) -> bool {
        matches!(self, Role::Expert | Role::Admin)
    }

    /// Deleting other users' content.
    pub fn can_moderate(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,

    /// Unique login email.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub phone: Option<String>,
    pub location: Option<String>,

    /// User role: 'farmer', 'expert' or 'admin'.
    pub role: String,

    /// Free-form UI preferences (units, notification toggles, ...).
    pub preferences: serde_json::Value,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be between 6 and 128 characters"
    ))]
    pub password: String,

    pub phone: Option<String>,
    pub location: Option<String>,

    /// Optional requested role. Admin accounts only exist via seeding.
    #[validate(custom(function = validate_registration_role))]
    pub role: Option<String>,
}

fn validate_registration_role(role: &str) -> Result<(), validator::ValidationError> {
    if role != "farmer" && role != "expert" {
        return Err(validator::ValidationError::new("invalid_role")
            .with_message("Role must be 'farmer' or 'expert'".into()));
    }
    Ok(())
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for profile updates. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub preferences: Option<serde_json::Value>,
}
