//! Identity service port
//!
//! The remote login/registration endpoint is an external collaborator; the
//! session actor only sees this trait. With the `http` feature an adapter
//! over `reqwest` is available.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{AuthGrant, Credentials, Registration};

/// Remote identity provider
///
/// Errors should be `AuthError::Rejected` (message shown verbatim to the
/// user) or `AuthError::Transport`.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn login(&self, credentials: Credentials) -> Result<AuthGrant>;
    async fn register(&self, registration: Registration) -> Result<AuthGrant>;
}

#[cfg(feature = "http")]
pub use http::HttpIdentityService;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use serde::Deserialize;
    use tracing::{debug, warn};
    use url::Url;

    use crate::auth::types::{AuthGrant, Credentials, Registration, User};
    use crate::error::{AuthError, Result};

    use super::IdentityService;

    /// JSON-over-HTTP identity service
    ///
    /// ```text
    /// POST {base}/auth/login     {email, password}
    /// POST {base}/auth/register  {name, email, password, role?}
    /// 2xx  → {user, tokens: {accessToken}}   (or a flat {user, token})
    /// else → {message}
    /// ```
    #[derive(Debug, Clone)]
    pub struct HttpIdentityService {
        client: reqwest::Client,
        base: Url,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct WireTokens {
        access_token: String,
    }

    #[derive(Debug, Deserialize)]
    struct WireGrant {
        user: User,
        #[serde(default)]
        tokens: Option<WireTokens>,
        #[serde(default)]
        token: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct WireError {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
    }

    impl HttpIdentityService {
        pub fn new(base_url: &str) -> Result<Self> {
            Self::with_client(reqwest::Client::new(), base_url)
        }

        pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
            let mut base = Url::parse(base_url)?;
            if !base.path().ends_with('/') {
                let path = format!("{}/", base.path());
                base.set_path(&path);
            }
            Ok(Self { client, base })
        }

        async fn post<B: serde::Serialize + Sync>(&self, path: &str, body: &B) -> Result<AuthGrant> {
            let url = self.base.join(path)?;
            debug!(%url, "Identity request");

            let response = self.client.post(url).json(body).send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;

            if !status.is_success() {
                let message = serde_json::from_slice::<WireError>(&bytes)
                    .ok()
                    .and_then(|e| e.message.or(e.error))
                    .unwrap_or_default();
                warn!(%status, "Identity service rejected request");
                return Err(AuthError::Rejected(message));
            }

            let grant: WireGrant = serde_json::from_slice(&bytes)
                .map_err(|e| AuthError::Transport(format!("Unexpected identity response: {e}")))?;
            let access_token = grant
                .tokens
                .map(|t| t.access_token)
                .or(grant.token)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| AuthError::Transport("Identity response carried no token".into()))?;

            Ok(AuthGrant {
                user: grant.user,
                access_token,
            })
        }
    }

    #[async_trait]
    impl IdentityService for HttpIdentityService {
        async fn login(&self, credentials: Credentials) -> Result<AuthGrant> {
            self.post("auth/login", &credentials).await
        }

        async fn register(&self, registration: Registration) -> Result<AuthGrant> {
            self.post("auth/register", &registration).await
        }
    }

}
