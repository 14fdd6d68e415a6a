use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) country: String,
    pub(crate) city: Option<String>,
    pub(crate) phone: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) password: String,
}

impl RegisterRequest {
    /// Trims every field, lowercases the email and drops blank optionals.
    pub(crate) fn normalize(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: normalize_email(&self.email),
            country: self.country.trim().to_string(),
            city: normalize_optional(self.city),
            phone: self.phone.trim().to_string(),
            avatar_url: normalize_optional(self.avatar_url),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) country: String,
    pub(crate) city: Option<String>,
    pub(crate) phone: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) is_admin: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
