//! Ceremony orchestration
//!
//! Drives both two-phase ceremonies (attestation = registration, assertion =
//! authentication) through the session pipeline and the `webauthn-rs`
//! verification collaborator. A ceremony has exactly two states: initialized
//! (challenge issued, state sealed into the cookie) and finalized (terminal,
//! cookie invalidated). Ordering is enforced purely by the data dependency
//! on the cookie; there is no server-side locking and no per-ceremony task.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use anyhow::Context;
use webauthn_rs::prelude::{
    AuthenticationResult, CreationChallengeResponse, Passkey, RequestChallengeResponse,
};
use webauthn_rs::Webauthn;
use webauthn_rs_proto::{PublicKeyCredential, RegisterPublicKeyCredential};

use crate::session::{codec, CeremonySession, CeremonyState};
use crate::session::{SessionCipher, SessionCookieFactory};
use crate::settings::PassgateSettings;

use super::errors::CeremonyError;
use super::identity::Identity;
use super::store::CredentialStore;

/// Orchestrates initialize/finalize for both ceremony kinds
///
/// Holds only immutable collaborators, so one instance is shared read-only
/// across all concurrent request handlers.
pub struct CeremonyService {
    webauthn: Webauthn,
    cipher: SessionCipher,
    cookies: SessionCookieFactory,
    store: Arc<dyn CredentialStore>,
}

impl CeremonyService {
    /// Assemble the service from startup configuration
    ///
    /// # Errors
    ///
    /// Returns an error on invalid relying-party configuration or a
    /// wrong-length session key. Both are fatal: the process must not start.
    pub fn new(
        settings: &PassgateSettings,
        store: Arc<dyn CredentialStore>,
    ) -> anyhow::Result<Self> {
        let webauthn = settings.relying_party.build_webauthn()?;
        let cipher = SessionCipher::new(settings.session.secret.as_bytes())
            .context("invalid session secret")?;
        let cookies = SessionCookieFactory::new(settings.cookies.secure);

        Ok(Self {
            webauthn,
            cipher,
            cookies,
            store,
        })
    }

    /// Begin a registration ceremony
    ///
    /// Returns the creation challenge for the client authenticator together
    /// with the session cookie carrying the sealed ceremony state. On error
    /// no cookie is produced; from the client's perspective the ceremony
    /// never started.
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator cannot produce a challenge or
    /// the session pipeline fails.
    pub fn initialize_registration(
        &self,
        identity: &dyn Identity,
    ) -> Result<(CreationChallengeResponse, Cookie<'static>), CeremonyError> {
        let exclude = match identity.credential_ids() {
            ids if ids.is_empty() => None,
            ids => Some(ids),
        };

        let (options, state) = self
            .webauthn
            .start_passkey_registration(
                identity.user_handle(),
                identity.user_name(),
                identity.display_name(),
                exclude,
            )
            .map_err(CeremonyError::Challenge)?;

        let cookie = self.seal(CeremonySession {
            user_handle: identity.user_handle(),
            user_name: identity.user_name().to_string(),
            state: CeremonyState::Attestation(state),
        })?;

        Ok((options, cookie))
    }

    /// Complete a registration ceremony
    ///
    /// Parses the client's credential-creation response, recovers the sealed
    /// ceremony state from the cookie, lets the collaborator verify the
    /// attestation, and hands the resulting passkey to the credential store.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed response body, an unusable session
    /// cookie, failed verification, or a store failure. The HTTP layer
    /// attaches the invalidation cookie on every outcome.
    pub fn finalize_registration(
        &self,
        cookie_value: Option<&str>,
        body: &[u8],
    ) -> Result<Passkey, CeremonyError> {
        let credential: RegisterPublicKeyCredential = serde_json::from_slice(body)
            .map_err(|e| CeremonyError::InvalidClientData(e.to_string()))?;

        let session = self.recover(cookie_value)?;
        let CeremonyState::Attestation(state) = session.state else {
            return Err(CeremonyError::WrongCeremony {
                expected: "attestation",
            });
        };

        let passkey = self
            .webauthn
            .finish_passkey_registration(&credential, &state)
            .map_err(CeremonyError::Verification)?;

        self.store.persist(session.user_handle, passkey.clone())?;
        log::info!(
            "registered credential for {} ({})",
            session.user_name,
            session.user_handle
        );

        Ok(passkey)
    }

    /// Begin an authentication ceremony
    ///
    /// Unlike registration, this path needs the identity's already
    /// registered credentials from the store to build the allow-list.
    ///
    /// # Errors
    ///
    /// Returns `NoCredentials` when nothing is registered for the identity,
    /// or an error from the collaborator or session pipeline.
    pub fn initialize_authentication(
        &self,
        identity: &dyn Identity,
    ) -> Result<(RequestChallengeResponse, Cookie<'static>), CeremonyError> {
        let passkeys = self.store.lookup(identity.user_handle())?;
        if passkeys.is_empty() {
            return Err(CeremonyError::NoCredentials);
        }

        let (options, state) = self
            .webauthn
            .start_passkey_authentication(&passkeys)
            .map_err(CeremonyError::Challenge)?;

        let cookie = self.seal(CeremonySession {
            user_handle: identity.user_handle(),
            user_name: identity.user_name().to_string(),
            state: CeremonyState::Assertion(state),
        })?;

        Ok((options, cookie))
    }

    /// Complete an authentication ceremony
    ///
    /// # Errors
    ///
    /// Same contract as [`finalize_registration`](Self::finalize_registration),
    /// with the ceremony kinds swapped.
    pub fn finalize_authentication(
        &self,
        cookie_value: Option<&str>,
        body: &[u8],
    ) -> Result<AuthenticationResult, CeremonyError> {
        let credential: PublicKeyCredential = serde_json::from_slice(body)
            .map_err(|e| CeremonyError::InvalidClientData(e.to_string()))?;

        let session = self.recover(cookie_value)?;
        let CeremonyState::Assertion(state) = session.state else {
            return Err(CeremonyError::WrongCeremony {
                expected: "assertion",
            });
        };

        // The identity's credentials may have been revoked since initialize
        if self.store.lookup(session.user_handle)?.is_empty() {
            return Err(CeremonyError::NoCredentials);
        }

        let result = self
            .webauthn
            .finish_passkey_authentication(&credential, &state)
            .map_err(CeremonyError::Verification)?;

        self.store.update(session.user_handle, &result)?;
        log::info!(
            "authenticated {} ({})",
            session.user_name,
            session.user_handle
        );

        Ok(result)
    }

    /// Cookie that clears the ceremony session
    ///
    /// Finalize handlers prepare this up front and attach it to success and
    /// failure responses alike, so a consumed ceremony cannot be replayed
    /// with the same cookie.
    #[must_use]
    pub fn invalidation_cookie(&self) -> Cookie<'static> {
        self.cookies.invalidate()
    }

    /// encode -> encrypt -> cookie
    fn seal(&self, session: CeremonySession) -> Result<Cookie<'static>, CeremonyError> {
        let encoded = codec::encode(&session)?;
        let token = self.cipher.encrypt(&encoded)?;
        Ok(self.cookies.issue(&token))
    }

    /// cookie -> decrypt -> decode
    fn recover(&self, cookie_value: Option<&str>) -> Result<CeremonySession, CeremonyError> {
        let value = cookie_value.ok_or(CeremonyError::MissingSession)?;
        let token = SessionCookieFactory::extract(value)?;
        let encoded = self.cipher.decrypt(&token)?;
        Ok(codec::decode(&encoded)?)
    }
}
