//! Authentication module for member accounts, sessions, and access control.
//!
//! This module provides registration, login, token refresh, the refresh
//! cookie, and the session gate that protects authenticated routes.

pub mod cookie;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observer;
pub mod routes;
pub mod service;
