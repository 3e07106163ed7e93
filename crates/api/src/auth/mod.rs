//! Session tokens.
//!
//! - [`jwt`] -- HS256 session issuance and validation.

pub mod jwt;
