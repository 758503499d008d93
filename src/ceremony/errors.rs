//! Ceremony error taxonomy

use thiserror::Error;
use webauthn_rs::prelude::WebauthnError;

use crate::session::SessionError;

use super::store::StoreError;

/// Failures while driving a ceremony
///
/// Every variant is caught at the handler boundary and converted into a
/// structured error response; none escapes as an unhandled fault.
#[derive(Debug, Error)]
pub enum CeremonyError {
    /// Finalize was called without a session cookie
    #[error("no session cookie accompanied the request")]
    MissingSession,

    /// The session cookie could not be opened or decoded
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session belongs to the other ceremony kind
    #[error("session does not belong to an {expected} ceremony")]
    WrongCeremony { expected: &'static str },

    /// The client's credential response did not parse
    #[error("malformed credential response: {0}")]
    InvalidClientData(String),

    /// The collaborator failed to produce a challenge
    #[error("challenge generation failed: {0}")]
    Challenge(WebauthnError),

    /// The collaborator rejected the credential response
    #[error("credential verification failed: {0}")]
    Verification(WebauthnError),

    /// Assertion was initialized for an identity with nothing registered
    #[error("no registered credentials for this identity")]
    NoCredentials,

    /// The credential store collaborator failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
