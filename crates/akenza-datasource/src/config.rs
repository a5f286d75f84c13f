//! Data source settings, and the editing operations of the configuration page.
use std::{fmt, time::Duration};

use akenza_client::{Credential, SecretKey, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors in a data source's configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No base URL was configured.
    #[error("Base URL is missing; set it in the data source configuration")]
    MissingBaseUrl,
    /// The base URL could not be parsed or has an unsupported scheme.
    #[error("Base URL {url:?} is invalid: {reason}")]
    InvalidBaseUrl {
        /// The configured URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Neither a legacy nor an encrypted API key was configured.
    #[error("API key is missing; set it in the data source configuration")]
    MissingApiKey,
    /// The request was not made on behalf of a data source instance.
    #[error("Missing datasource instance settings")]
    MissingInstanceSettings,
    /// The HTTP client could not be built.
    #[error("Could not create HTTP client: {0}")]
    Client(#[from] akenza_client::TransportError),
}

/// Non-secret settings of a data source instance (Grafana's `jsonData`).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AkenzaJsonData {
    /// Base URL of the Akenza API, e.g. `https://api.akenza.io`.
    #[serde(default)]
    pub base_url: String,
    /// Legacy API key stored in plain text.
    ///
    /// Kept only for data sources configured before keys were encrypted; it is
    /// cleared the first time the key is edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl AkenzaJsonData {
    /// The configured request timeout, or the client default.
    pub fn timeout(&self) -> Duration {
        self.timeout_seconds
            .filter(|s| *s > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// The base URL, validated.
    pub fn validated_base_url(&self) -> Result<&str, ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidBaseUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {other:?}"),
            }),
        }
    }
}

/// Secret settings of a data source instance (Grafana's `secureJsonData`),
/// as decrypted by Grafana before being handed to the plugin.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AkenzaSecureJsonData {
    /// The encrypted-at-rest API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl fmt::Debug for AkenzaSecureJsonData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AkenzaSecureJsonData")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Decide which stored key is authoritative.
///
/// A non-empty legacy plaintext key wins, which keeps data sources that predate
/// encrypted storage on the legacy route until their key is edited.
pub fn credential_from_settings(
    json: &AkenzaJsonData,
    secure: &AkenzaSecureJsonData,
) -> Result<Credential, ConfigError> {
    if let Some(key) = non_empty(json.api_key.as_ref()) {
        return Ok(Credential::Plaintext(key.to_string()));
    }
    non_empty(secure.api_key.as_ref())
        .map(|key| Credential::Encrypted(SecretKey::new(key)))
        .ok_or(ConfigError::MissingApiKey)
}

/// Which secure fields already hold a value (Grafana's `secureJsonFields`).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecureJsonFields {
    /// Whether an encrypted API key is stored.
    #[serde(default)]
    pub api_key: bool,
}

/// The options object edited on the data source configuration page.
///
/// Mirrors what Grafana sends to and expects back from a config editor: the
/// plain settings, the secrets being written (if any) and the flags telling
/// which secrets are already stored.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEditor {
    /// Plain settings.
    #[serde(default)]
    pub json_data: AkenzaJsonData,
    /// Secrets to be written on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_json_data: Option<AkenzaSecureJsonData>,
    /// Secrets already stored.
    #[serde(default)]
    pub secure_json_fields: SecureJsonFields,
}

impl ConfigEditor {
    /// Set the base URL.
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.json_data.base_url = url.into();
    }

    /// Enter a new API key.
    ///
    /// This is the one-way migration to encrypted storage: the legacy plaintext key
    /// is cleared and the new key goes to the secure settings.
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.json_data.api_key = None;
        self.secure_json_data = Some(AkenzaSecureJsonData {
            api_key: Some(key.into()),
        });
    }

    /// Forget the stored encrypted key so a new one can be entered.
    pub fn reset_api_key(&mut self) {
        self.secure_json_fields.api_key = false;
        self.secure_json_data = Some(AkenzaSecureJsonData {
            api_key: Some(String::new()),
        });
    }

    /// Whether the data source still relies on a plaintext key.
    pub fn uses_legacy_key(&self) -> bool {
        non_empty(self.json_data.api_key.as_ref()).is_some()
    }

    /// Check that the options describe a usable data source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.json_data.validated_base_url()?;
        let has_new_secret = self
            .secure_json_data
            .as_ref()
            .and_then(|s| non_empty(s.api_key.as_ref()))
            .is_some();
        if self.uses_legacy_key() || has_new_secret || self.secure_json_fields.api_key {
            Ok(())
        } else {
            Err(ConfigError::MissingApiKey)
        }
    }
}

#[cfg(test)]
mod tests {
    use akenza_client::Route;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn json_data(api_key: Option<&str>) -> AkenzaJsonData {
        AkenzaJsonData {
            base_url: "https://api.example.io".to_string(),
            api_key: api_key.map(str::to_string),
            timeout_seconds: None,
        }
    }

    fn secure(api_key: Option<&str>) -> AkenzaSecureJsonData {
        AkenzaSecureJsonData {
            api_key: api_key.map(str::to_string),
        }
    }

    #[test]
    fn plaintext_key_takes_precedence() {
        let credential =
            credential_from_settings(&json_data(Some("legacy")), &secure(Some("new"))).unwrap();
        assert_eq!(credential, Credential::Plaintext("legacy".to_string()));
        assert_eq!(credential.route(), Route::Insecure);
    }

    #[test]
    fn encrypted_key_is_used_once_plaintext_is_cleared() {
        let credential = credential_from_settings(&json_data(Some("")), &secure(Some("new"))).unwrap();
        assert_eq!(credential.route(), Route::Secure);
    }

    #[test]
    fn missing_key_is_an_error() {
        assert!(matches!(
            credential_from_settings(&json_data(None), &secure(None)),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn settings_deserialize_from_grafana_json() {
        let data: AkenzaJsonData =
            serde_json::from_value(json!({"baseUrl": "https://api.example.io", "apiKey": "secret"}))
                .unwrap();
        assert_eq!(data, json_data(Some("secret")));
        assert_eq!(data.timeout(), DEFAULT_TIMEOUT);
        let data: AkenzaJsonData =
            serde_json::from_value(json!({"baseUrl": "x", "timeoutSeconds": 5})).unwrap();
        assert_eq!(data.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn base_url_validation() {
        assert!(json_data(None).validated_base_url().is_ok());
        let mut data = json_data(None);
        data.base_url = " ".to_string();
        assert!(matches!(
            data.validated_base_url(),
            Err(ConfigError::MissingBaseUrl)
        ));
        data.base_url = "ftp://api.example.io".to_string();
        assert!(matches!(
            data.validated_base_url(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        data.base_url = "not a url".to_string();
        assert!(data.validated_base_url().is_err());
    }

    #[test]
    fn editing_the_key_migrates_it() {
        let mut editor = ConfigEditor {
            json_data: json_data(Some("legacy")),
            ..Default::default()
        };
        assert!(editor.uses_legacy_key());
        editor.set_api_key("fresh");
        assert!(!editor.uses_legacy_key());
        assert_eq!(editor.json_data.api_key, None);
        assert_eq!(editor.secure_json_data, Some(secure(Some("fresh"))));
        editor.validate().unwrap();

        let serialized = serde_json::to_value(&editor).unwrap();
        assert_eq!(serialized["jsonData"], json!({"baseUrl": "https://api.example.io"}));
        assert_eq!(serialized["secureJsonData"], json!({"apiKey": "fresh"}));
    }

    #[test]
    fn reset_requires_a_new_key() {
        let mut editor = ConfigEditor {
            json_data: json_data(None),
            secure_json_fields: SecureJsonFields { api_key: true },
            ..Default::default()
        };
        editor.validate().unwrap();
        editor.reset_api_key();
        assert!(matches!(editor.validate(), Err(ConfigError::MissingApiKey)));
        editor.set_base_url("https://other.example.io");
        editor.set_api_key("k");
        editor.validate().unwrap();
        assert_eq!(editor.json_data.base_url, "https://other.example.io");
    }

    #[test]
    fn secure_data_is_redacted() {
        assert!(!format!("{:?}", secure(Some("hunter2"))).contains("hunter2"));
    }
}
