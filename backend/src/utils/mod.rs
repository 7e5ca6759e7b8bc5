//! Collection of general utility functions and common traits.
//!
//! This module holds the token and password primitives that the
//! authentication service builds on.

pub mod jwt;
pub mod password;
