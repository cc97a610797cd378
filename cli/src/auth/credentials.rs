//! OAuth client credentials.

use std::fmt;

/// Client ID and optional secret identifying this application to TIDAL.
///
/// The secret is redacted from `Debug` output so credentials can appear in
/// tracing fields.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: Option<String>,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(id: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Form fields identifying the client on token requests.
    ///
    /// The secret is only sent when one is configured.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("client_id", self.id.clone())];
        if let Some(secret) = &self.secret {
            fields.push(("client_secret", secret.clone()));
        }
        fields
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}
