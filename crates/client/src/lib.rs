//! Game-side client for GEM Rush.
//!
//! - [`login`] -- exchanges launch data for a session token.
//! - [`session`] -- caches the token and the authenticated backend client.
//! - [`mining`] -- mining session, spins and boosts, reconciled with the backend.
//! - [`background`] -- countdown ticker and boost expiry sweep.

pub mod background;
pub mod error;
pub mod login;
pub mod mining;
pub mod session;

pub use error::ClientError;
pub use login::LoginClient;
pub use mining::{MiningService, MiningSnapshot};
pub use session::{LaunchCredentials, SessionStore};
