//! API key storage forms and the request route each one selects.
use std::fmt;

/// An API key kept in Grafana's encrypted secure JSON storage.
///
/// The key is only readable through [`SecretKey::expose`]; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a decrypted key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for attaching to outgoing requests.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// The API key of a data source, in whichever form is authoritative.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Legacy key stored in plain text in the data source's JSON data.
    Plaintext(String),
    /// Key stored encrypted at rest.
    Encrypted(SecretKey),
}

impl Credential {
    /// Move a plaintext key into encrypted storage.
    ///
    /// This is one-way: an already encrypted credential is returned unchanged.
    #[must_use]
    pub fn migrate(self) -> Self {
        match self {
            Self::Plaintext(key) => Self::Encrypted(SecretKey::new(key)),
            encrypted @ Self::Encrypted(_) => encrypted,
        }
    }

    /// The route requests made with this credential must take.
    pub fn route(&self) -> Route {
        route_for(self)
    }

    pub(crate) fn key(&self) -> &str {
        match self {
            Self::Plaintext(key) => key,
            Self::Encrypted(secret) => secret.expose(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext(_) => f.write_str("Plaintext(<redacted>)"),
            Self::Encrypted(secret) => f.debug_tuple("Encrypted").field(secret).finish(),
        }
    }
}

/// How a request reaches the Akenza API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// Legacy route, used while a plaintext key is still configured.
    Insecure,
    /// Route whose key comes from encrypted storage.
    Secure,
}

impl Route {
    /// The name of the route, used in logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insecure => "akenza",
            Self::Secure => "akenza-secure",
        }
    }

    /// The header carrying the API key on this route.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::Insecure => "x-api-key",
            Self::Secure => "Api-Key",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Select the route for a credential.
///
/// A plaintext key forces the legacy route for backward compatibility.
pub fn route_for(credential: &Credential) -> Route {
    match credential {
        Credential::Plaintext(_) => Route::Insecure,
        Credential::Encrypted(_) => Route::Secure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_uses_insecure_route() {
        let credential = Credential::Plaintext("secret".to_string());
        assert_eq!(route_for(&credential), Route::Insecure);
        assert_eq!(credential.route().header_name(), "x-api-key");
    }

    #[test]
    fn migration_switches_to_secure_route() {
        let migrated = Credential::Plaintext("secret".to_string()).migrate();
        assert_eq!(migrated, Credential::Encrypted(SecretKey::new("secret")));
        assert_eq!(migrated.route(), Route::Secure);
        assert_eq!(migrated.key(), "secret");
        // Migrating again is a no-op.
        assert_eq!(migrated.clone().migrate(), migrated);
    }

    #[test]
    fn debug_never_prints_keys() {
        let plain = format!("{:?}", Credential::Plaintext("hunter2".to_string()));
        let secure = format!("{:?}", Credential::Encrypted(SecretKey::new("hunter2")));
        assert!(!plain.contains("hunter2"));
        assert!(!secure.contains("hunter2"));
    }
}
