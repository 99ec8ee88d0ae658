//! # Google sign-in (OAuth 2.0 authorization code flow with PKCE)
//!
//! The flow is split in two so the HTTP exchange can be swapped out:
//!
//! - [`IdentityProvider`] builds the consent URL and turns an authorization code
//!   into a [`ProviderProfile`]. [`GoogleProvider`] is the real implementation,
//!   requesting only the `profile` scope and reading the userinfo endpoint.
//! - [`DelegatedStrategy`] drives a provider and resolves the profile to a local
//!   user with find-or-create keyed on the provider's user id. The profile's
//!   given name becomes the username only when the record is created.
//!
//! The CSRF `state` and PKCE verifier are persisted by the route layer through
//! the session store; this module only produces and consumes them.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{AuthError, Strategy};
use crate::store::{User, UserStore};
use crate::APP_USER_AGENT;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google OAuth client settings.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Where to send the browser, plus what must be remembered until the callback.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub pkce_verifier: String,
}

/// What the provider tells us about the user.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ProviderProfile {
    /// Username for a newly created user: given name, else display name.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.given_name
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Input of the delegated strategy, taken from the provider callback.
#[derive(Clone, Debug)]
pub struct AuthorizationCallback {
    pub code: String,
    pub pkce_verifier: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the consent URL with a fresh CSRF state and PKCE challenge.
    fn authorization_request(&self) -> AuthorizationRequest;

    /// Exchange an authorization code for the user's profile.
    async fn fetch_profile(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<ProviderProfile, AuthError>;
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

pub struct GoogleProvider {
    client: ConfiguredClient,
    http: reqwest::Client,
}

impl GoogleProvider {
    /// # Errors
    /// Returns an error if the redirect URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &GoogleConfig) -> Result<Self, AuthError> {
        let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string())
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| AuthError::Provider(format!("invalid redirect URL: {e}")))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                config.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        // The token endpoint must not be allowed to redirect (SSRF).
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(Self { client, http })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_request(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url: auth_url.to_string(),
            state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    #[instrument(skip_all)]
    async fn fetch_profile(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<ProviderProfile, AuthError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::Provider(format!("token exchange failed: {e}")))?;

        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "userinfo request failed: {}",
                response.status()
            )));
        }

        response
            .json::<ProviderProfile>()
            .await
            .map_err(|e| AuthError::Provider(format!("invalid userinfo payload: {e}")))
    }
}

/// Sign-in through an external identity provider.
#[derive(Clone)]
pub struct DelegatedStrategy {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
}

impl DelegatedStrategy {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, users: Arc<dyn UserStore>) -> Self {
        Self { provider, users }
    }

    #[must_use]
    pub fn authorization_request(&self) -> AuthorizationRequest {
        self.provider.authorization_request()
    }

    /// Resolve a provider profile to a local user, creating it on first sight.
    ///
    /// # Errors
    /// Returns [`AuthError::Store`] if the store fails.
    pub async fn resolve(&self, profile: &ProviderProfile) -> Result<User, AuthError> {
        let user = self
            .users
            .find_or_create_by_google_id(&profile.id, profile.username())
            .await?;
        debug!(user_id = %user.id, "resolved google profile");
        Ok(user)
    }
}

#[async_trait]
impl Strategy for DelegatedStrategy {
    type Credentials = AuthorizationCallback;

    async fn authenticate(&self, callback: AuthorizationCallback) -> Result<User, AuthError> {
        let profile = self
            .provider
            .fetch_profile(&callback.code, &callback.pkce_verifier)
            .await?;
        self.resolve(&profile).await
    }
}
