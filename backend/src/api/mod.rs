//! Shared pieces of the HTTP API surface.
//!
//! Authentication routes live in `auth`; this module holds the response
//! envelope and error mapping every handler uses.

pub mod common;
