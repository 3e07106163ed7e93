//! Domain logic for the GEM Rush mining game.
//!
//! Everything here is free of HTTP and database concerns so the login
//! service, the store backends and the game client can share it.

pub mod boost;
pub mod display;
pub mod error;
pub mod launch;
pub mod mining;
pub mod referral;
pub mod store;
pub mod types;
