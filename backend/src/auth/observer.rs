//! Reporting hook for authentication outcomes.
//!
//! The service receives its observer at construction. Business failures are
//! recorded as events, internal failures with their full error detail.

use crate::errors::ServiceError;
use std::fmt;

/// Operation an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Register,
    Login,
    Refresh,
    CurrentMember,
}

impl fmt::Display for AuthOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthOperation::Register => "register",
            AuthOperation::Login => "login",
            AuthOperation::Refresh => "refresh",
            AuthOperation::CurrentMember => "current_member",
        };
        f.write_str(name)
    }
}

pub trait AuthObserver: Send + Sync {
    fn succeeded(&self, operation: AuthOperation, member_id: i64);

    /// Expected, recoverable failure (duplicate email, bad credential, expiry).
    fn business_error(&self, operation: AuthOperation, error: &ServiceError);

    /// Unexpected failure (storage, hashing, signing, forged token).
    fn service_error(&self, operation: AuthOperation, error: &ServiceError);
}

/// Observer that writes outcomes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AuthObserver for TracingObserver {
    fn succeeded(&self, operation: AuthOperation, member_id: i64) {
        tracing::info!(operation = %operation, member.id = member_id, "auth succeeded");
    }

    fn business_error(&self, operation: AuthOperation, error: &ServiceError) {
        tracing::warn!(operation = %operation, code = error.code(), "auth rejected");
    }

    fn service_error(&self, operation: AuthOperation, error: &ServiceError) {
        tracing::error!(operation = %operation, code = error.code(), error = ?error, "auth failed");
    }
}
