//! Error types for the stateless session layer

use thiserror::Error;

use super::cipher::{KEY_SIZE, NONCE_SIZE};

/// Failures while moving ceremony state through the cookie pipeline
///
/// Everything except `InvalidKeyLength` can be triggered by untrusted input
/// and must be handled as a recoverable, per-request error.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Cipher key material has the wrong length
    #[error("session key must be {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The secure random source failed while drawing a nonce
    #[error("random source failure while generating nonce")]
    RandomSource,

    /// AEAD sealing failed
    #[error("session encryption failed")]
    Encryption,

    /// Token is shorter than one nonce, so it cannot contain any ciphertext
    #[error("session token shorter than {NONCE_SIZE} bytes")]
    TruncatedToken,

    /// Ciphertext failed authentication on decrypt
    #[error("session token failed authentication")]
    Tampered,

    /// Cookie value is not valid base64
    #[error("session cookie is not valid base64")]
    InvalidEncoding,

    /// Ceremony state could not be serialized
    #[error("session state could not be encoded")]
    Encoding,

    /// Decrypted bytes do not parse into ceremony state
    #[error("session state could not be decoded")]
    MalformedSession,
}
