use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::Role;

pub type Id = i32;

/// Public projection of a `users` row. Never carries password material.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full row as stored, including the bcrypt hash. Stays inside the repo/service layers.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: r.id,
            name: r.name,
            email: r.email,
            role: r.role,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Input to `service::create_user`; `password` is plaintext here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Row handed to the repository once the password has been hashed.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Roles a client may request at sign-up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignUpRole {
    #[default]
    User,
    Admin,
}

impl From<SignUpRole> for Role {
    fn from(r: SignUpRole) -> Self {
        match r {
            SignUpRole::User => Role::User,
            SignUpRole::Admin => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 2, max = 255))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[serde(default)]
    pub role: SignUpRole,
}

impl SignUpRequest {
    /// Trims the name and lower-cases the email before validation.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self
    }
}

impl From<SignUpRequest> for NewUser {
    fn from(req: SignUpRequest) -> Self {
        NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role.into(),
        }
    }
}

/// Subset of the user returned by sign-up.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        UserSummary {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignUpResponse {
    pub message: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: SignUpRole::default(),
        }
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        let r = req("  Ada  ", " Ada@Example.COM ", "secret1").normalized();
        assert_eq!(r.name, "Ada");
        assert_eq!(r.email, "ada@example.com");
        assert!(r.validate().is_ok());
    }

    #[test]
    fn validation_rejects_short_fields() {
        assert!(req("A", "a@b.io", "secret1").validate().is_err());
        assert!(req("Ada", "not-an-email", "secret1").validate().is_err());
        assert!(req("Ada", "a@b.io", "12345").validate().is_err());
    }

    #[test]
    fn role_defaults_to_user() {
        let r: SignUpRequest =
            serde_json::from_str(r#"{"name":"Ada","email":"a@b.io","password":"secret1"}"#).unwrap();
        assert_eq!(r.role, SignUpRole::User);
        let bad = serde_json::from_str::<SignUpRequest>(
            r#"{"name":"Ada","email":"a@b.io","password":"secret1","role":"guest"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn user_json_has_no_password() {
        let now = Utc::now();
        let user: User = UserRecord {
            id: 1,
            name: "Ada".into(),
            email: "a@b.io".into(),
            password_hash: "$2b$10$hash".into(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
        .into();
        let v = serde_json::to_value(&user).unwrap();
        assert!(v.get("password").is_none());
        assert!(v.get("password_hash").is_none());
        assert_eq!(v["role"], "user");
    }
}
