//! Stateless session layer
//!
//! The only copy of in-flight ceremony state lives inside an encrypted
//! cookie held by the client, so the server scales horizontally with no
//! session store and no coordination.
//!
//! # Modules
//!
//! - [`codec`] - Serialization of ceremony state to canonical bytes
//! - [`cipher`] - AEAD sealing of encoded state into opaque tokens
//! - [`cookie`] - Cookie issuance, extraction, and invalidation
//! - [`errors`] - Session error taxonomy

pub mod cipher;
pub mod codec;
pub mod cookie;
pub mod errors;

pub use cipher::{SessionCipher, KEY_SIZE, NONCE_SIZE};
pub use codec::{CeremonySession, CeremonyState};
pub use cookie::{SessionCookieFactory, SESSION_COOKIE};
pub use errors::SessionError;
