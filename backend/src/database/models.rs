//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. API payloads live in `auth::models` and never expose
//! the stored password hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a member account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberStatus {
    Ready,
    Active,
    Disabled,
    Deleted,
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberStatus::Ready => write!(f, "READY"),
            MemberStatus::Active => write!(f, "ACTIVE"),
            MemberStatus::Disabled => write!(f, "DISABLED"),
            MemberStatus::Deleted => write!(f, "DELETED"),
        }
    }
}

/// Role a member can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Member {
    pub member_id: i64,
    pub email: String,
    /// bcrypt hash of the member's secret
    pub password: String,
    pub name: String,
    pub tel: Option<String>,
    pub address: Option<String>,
    pub profile: Option<String>,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// Insert payload for a new member row.
#[derive(Debug, Clone)]
pub struct CreateMember {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub tel: Option<String>,
    pub address: Option<String>,
    pub profile: Option<String>,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, FromRow)]
pub struct MemberRole {
    pub member_id: i64,
    pub role: Role,
}
