#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ceremony;
pub mod handlers;
pub mod session;
pub mod settings;
pub mod utils;

/// Re-export commonly used items
pub use ceremony::{
    CeremonyError, CeremonyService, CredentialStore, Identity, MemoryCredentialStore,
    RequestIdentity,
};
pub use session::{SessionCipher, SessionCookieFactory, SessionError, SESSION_COOKIE};
pub use settings::PassgateSettings;
