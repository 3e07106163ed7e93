//! Client for the managed backend (a PostgREST-style REST API).
//!
//! - [`client`] -- authenticated table and RPC calls.
//! - [`game`] -- typed wrappers for the game's stored procedures.
//! - [`user_store`] -- [`gemrush_core::store::UserStore`] over the `user` table.

pub mod client;
pub mod game;
pub mod user_store;

pub use client::{BaasClient, BaasError};
pub use user_store::RestUserStore;
