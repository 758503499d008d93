use std::fs;

use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use url::Url;
use webauthn_rs::{Webauthn, WebauthnBuilder};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PassgateSettings {
    pub application: ApplicationSettings,
    pub relying_party: RelyingPartySettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelyingPartySettings {
    /// Relying Party ID (usually the domain)
    pub rp_id: String,
    /// Relying Party name (displayed to user)
    pub rp_name: String,
    /// Relying Party origin the client pages are served from
    pub rp_origin: String,
    /// Identity used when an initialize request names no one
    pub default_user_name: String,
    pub default_display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionSettings {
    /// Symmetric key material for session cookies; must be exactly 32 bytes
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "http://localhost:5500".to_string(),
        }
    }
}

impl Default for RelyingPartySettings {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "passgate".to_string(),
            rp_origin: "http://localhost:5500".to_string(),
            default_user_name: "passkey".to_string(),
            default_display_name: "Passkey User".to_string(),
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true, // Default to secure cookies
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RelyingPartySettings {
    /// Build the verification collaborator from relying-party configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid URL or the builder
    /// rejects the configuration. Callers treat this as fatal at startup.
    pub fn build_webauthn(&self) -> anyhow::Result<Webauthn> {
        let origin = Url::parse(&self.rp_origin)
            .with_context(|| format!("invalid relying party origin: {}", self.rp_origin))?;

        WebauthnBuilder::new(&self.rp_id, &origin)
            .context("invalid relying party configuration")?
            .rp_name(&self.rp_name)
            .build()
            .context("failed to assemble WebAuthn configuration")
    }
}

impl PassgateSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or
    /// parsed. A wrong-length session secret is not caught here; it fails
    /// when the cipher is constructed, before the server binds.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::initialize_environment();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        Self::ensure_session_secret(&mut settings.session);

        Ok(settings)
    }

    /// Initialize logging; tolerant of repeat calls
    fn initialize_environment() {
        let _ = env_logger::try_init();
    }

    /// Load base settings from TOML file(s) or use defaults
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading)
    /// 2. Settings.toml in `PASSGATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
            log::info!("loaded base settings from {}", default_config_path.display());
        }

        if let Ok(secrets_dir) = std::env::var("PASSGATE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let secrets_toml_content = fs::read_to_string(&secrets_path)?;
                settings = basic_toml::from_str(&secrets_toml_content)?;
                log::info!("overriding settings from {}", secrets_path.display());
            } else {
                log::info!(
                    "PASSGATE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_relying_party_env_overrides(&mut settings.relying_party);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    fn apply_relying_party_env_overrides(rp_settings: &mut RelyingPartySettings) {
        if let Ok(rp_id) = std::env::var("RP_ID") {
            rp_settings.rp_id = rp_id;
        }
        if let Ok(rp_name) = std::env::var("RP_NAME") {
            rp_settings.rp_name = rp_name;
        }
        if let Ok(rp_origin) = std::env::var("RP_ORIGIN") {
            rp_settings.rp_origin = rp_origin;
        }
    }

    fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        if let Ok(secret) = std::env::var("SESSION_SECRET") {
            if !secret.is_empty() {
                session_settings.secret = secret;
            }
        }
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = cookie_secure;
            }
        }
    }

    /// Generate a session secret when none was configured
    ///
    /// The generated secret changes on every restart, invalidating any
    /// outstanding ceremony cookies, which is harmless for ceremonies that
    /// live for seconds. Configured deployments should still pin one.
    fn ensure_session_secret(session_settings: &mut SessionSettings) {
        if session_settings.secret.is_empty() {
            session_settings.secret = Self::generate_session_secret();
            log::warn!(
                "no session secret configured; generated an ephemeral one \
                 (set SESSION_SECRET or session.secret in Settings.toml)"
            );
        }
    }

    /// 24 random bytes base64-encode to exactly the 32 bytes AES-256 needs
    fn generate_session_secret() -> String {
        use rand::RngCore;
        let mut seed = [0u8; 24]; // 192 bits of entropy
        rand::rng().fill_bytes(&mut seed);
        general_purpose::STANDARD.encode(seed)
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Origins allowed to make credentialed cross-origin calls
    #[must_use]
    pub fn cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::KEY_SIZE;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = PassgateSettings::default();

        assert_eq!(settings.bind_address(), "0.0.0.0:8080");
        assert_eq!(settings.relying_party.rp_id, "localhost");
        assert!(settings.cookies.secure);
        assert!(settings.session.secret.is_empty());
    }

    #[test]
    fn test_cors_origins_parsing() {
        let mut settings = PassgateSettings::default();
        settings.application.cors_origins =
            "http://localhost:5500, https://app.example.com,".to_string();

        assert_eq!(
            settings.cors_origins(),
            vec!["http://localhost:5500", "https://app.example.com"]
        );
    }

    #[test]
    fn test_generated_secret_has_key_length() {
        let mut session = SessionSettings::default();
        PassgateSettings::ensure_session_secret(&mut session);

        assert_eq!(session.secret.len(), KEY_SIZE);
    }

    #[test]
    fn test_build_webauthn_rejects_bad_origin() {
        let rp = RelyingPartySettings {
            rp_origin: "not a url".to_string(),
            ..Default::default()
        };
        assert!(rp.build_webauthn().is_err());
    }

    #[test]
    fn test_build_webauthn_with_defaults() {
        assert!(RelyingPartySettings::default().build_webauthn().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_override_priority() {
        std::env::set_var("RP_ID", "example.com");
        std::env::set_var("SESSION_SECRET", "an example very very secret key.");
        std::env::set_var("COOKIE_SECURE", "false");

        let mut settings = PassgateSettings::default();
        PassgateSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.relying_party.rp_id, "example.com");
        assert_eq!(settings.session.secret, "an example very very secret key.");
        assert!(!settings.cookies.secure);

        std::env::remove_var("RP_ID");
        std::env::remove_var("SESSION_SECRET");
        std::env::remove_var("COOKIE_SECURE");
    }

    #[test]
    #[serial]
    fn test_secrets_dir_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Settings.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[application]\nhost = \"127.0.0.1\"\nport = 9090\ncors_origins = \"http://localhost:3000\"\n\n\
             [relying_party]\nrp_id = \"example.com\"\nrp_name = \"Example\"\nrp_origin = \"https://example.com\"\n\
             default_user_name = \"someone\"\ndefault_display_name = \"Someone\"\n\n\
             [session]\nsecret = \"an example very very secret key.\"\n\n\
             [cookies]\nsecure = true\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        std::env::set_var("PASSGATE_SECRETS_DIR", dir.path());
        let settings = PassgateSettings::load_base_settings().unwrap();
        std::env::remove_var("PASSGATE_SECRETS_DIR");

        assert_eq!(settings.application.port, 9090);
        assert_eq!(settings.relying_party.rp_id, "example.com");
        assert_eq!(settings.logging.level, "debug");
    }
}
