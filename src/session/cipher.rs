//! Symmetric encryption of serialized ceremony state
//!
//! Ceremony state never touches server-side storage: the encoded session is
//! sealed with AES-256-GCM and handed to the client inside a cookie. The
//! AEAD tag means a flipped bit in transit is rejected at decrypt time
//! instead of silently decoding into garbage state.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, TryRngCore};

use super::errors::SessionError;

/// Nonce size for AES-256-GCM encryption (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Encryption key size for AES-256 (256 bits)
pub const KEY_SIZE: usize = 32;

/// Process-wide session cipher
///
/// Holds the fixed symmetric key for the process lifetime. The key is never
/// mutated after startup, so the cipher is shared freely across concurrent
/// request handlers. Rotating the key invalidates every outstanding cookie.
#[derive(Clone)]
pub struct SessionCipher {
    key: [u8; KEY_SIZE],
}

impl SessionCipher {
    /// Create a cipher from raw key material
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidKeyLength` unless the key is exactly
    /// 32 bytes. Callers treat this as fatal at startup.
    pub fn new(key: &[u8]) -> Result<Self, SessionError> {
        let key: [u8; KEY_SIZE] = key
            .try_into()
            .map_err(|_| SessionError::InvalidKeyLength(key.len()))?;
        Ok(Self { key })
    }

    /// Seal serialized session state into a self-contained token
    ///
    /// Output layout is `nonce || ciphertext`. The nonce is drawn fresh from
    /// the OS random source for every call; two encryptions of the same
    /// plaintext produce different tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the random source fails or AEAD sealing fails.
    /// Both are local to the current request and not retried.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| SessionError::RandomSource)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| SessionError::Encryption)?;

        let mut token = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&ciphertext);
        Ok(token)
    }

    /// Open a token previously produced by [`encrypt`](Self::encrypt)
    ///
    /// # Errors
    ///
    /// Returns `TruncatedToken` when the input cannot even hold a nonce, and
    /// `Tampered` when the ciphertext fails authentication (wrong key, bit
    /// flips, or a token sealed by someone else).
    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, SessionError> {
        if token.len() < NONCE_SIZE {
            return Err(SessionError::TruncatedToken);
        }

        let (nonce_bytes, ciphertext) = token.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SessionError::Tampered)
    }
}
