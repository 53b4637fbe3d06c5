//! HTTP authority client
//!
//! Speaks the OAuth 2.0 token endpoint for the password, client-credentials
//! (API key), authorization-code and refresh-token grants, and a JSON
//! assume-role endpoint for walking role chains.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use courier_domain::constants::DEFAULT_ROLE_SESSION_SECS;
use courier_domain::{AuthSettings, Credential, RoleHop};
use reqwest::{Client, Response};
use tokio::sync::Mutex;
use tracing::debug;

use super::error::AuthError;
use super::pkce::{validate_state, PKCEChallenge};
use super::traits::AuthorityClientTrait;
use super::types::{AssumeRoleRequest, OAuthError, TokenResponse};

const AUTHORITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Authority client backed by `reqwest`.
///
/// Clones share the HTTP connection pool and the pending PKCE challenge.
#[derive(Debug, Clone)]
pub struct AuthorityClient {
    settings: AuthSettings,
    http: Client,
    pending_challenge: Arc<Mutex<Option<PKCEChallenge>>>,
}

impl AuthorityClient {
    /// Build a client with its own connection pool.
    pub fn new(settings: AuthSettings) -> Result<Self, AuthError> {
        let http = Client::builder().timeout(AUTHORITY_TIMEOUT).build()?;
        Ok(Self::with_http_client(settings, http))
    }

    /// Build a client on top of an existing `reqwest::Client`.
    pub fn with_http_client(settings: AuthSettings, http: Client) -> Self {
        Self { settings, http, pending_challenge: Arc::new(Mutex::new(None)) }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Start an authorization-code flow.
    ///
    /// Returns `(authorize_url, state)`. The PKCE verifier stays with the
    /// client until [`exchange_code`](AuthorityClientTrait::exchange_code)
    /// consumes it; starting a new flow discards the previous one.
    pub async fn authorization_url(&self) -> Result<(String, String), AuthError> {
        let authorize_url = self
            .settings
            .authorize_url
            .as_deref()
            .ok_or(AuthError::MissingEndpoint("auth.authorize_url"))?;
        let redirect_uri = self
            .settings
            .redirect_uri
            .as_deref()
            .ok_or(AuthError::MissingEndpoint("auth.redirect_uri"))?;

        let challenge = PKCEChallenge::generate();
        let state = challenge.state.clone();

        let mut url = url::Url::parse(authorize_url)
            .map_err(|e| AuthError::InvalidResponse(format!("invalid authorize_url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", &state)
            .append_pair("code_challenge", &challenge.code_challenge)
            .append_pair("code_challenge_method", challenge.challenge_method());
        if !self.settings.scopes.is_empty() {
            url.query_pairs_mut().append_pair("scope", &self.settings.scope_string());
        }

        *self.pending_challenge.lock().await = Some(challenge);
        Ok((url.into(), state))
    }

    fn base_form(&self, grant_type: &'static str) -> Vec<(&'static str, String)> {
        let mut form = vec![("grant_type", grant_type.to_string())];
        if !self.settings.scopes.is_empty() {
            form.push(("scope", self.settings.scope_string()));
        }
        form
    }

    fn with_client_auth(
        &self,
        mut form: Vec<(&'static str, String)>,
    ) -> Vec<(&'static str, String)> {
        form.push(("client_id", self.settings.client_id.clone()));
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        form
    }

    async fn token_request(
        &self,
        grant: &'static str,
        form: &[(&'static str, String)],
    ) -> Result<Credential, AuthError> {
        debug!(grant, url = %self.settings.token_url, "Requesting token");
        let response = self.http.post(&self.settings.token_url).form(form).send().await?;
        self.read_credential(grant, response).await
    }

    async fn read_credential(
        &self,
        grant: &'static str,
        response: Response,
    ) -> Result<Credential, AuthError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OAuthError>(&body)
                .map(|e| e.to_string())
                .unwrap_or(body);
            return Err(AuthError::Rejected { grant, status: status.as_u16(), message });
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Ok(token.into_credential(Utc::now(), self.settings.default_lifetime_secs))
    }
}

#[async_trait]
impl AuthorityClientTrait for AuthorityClient {
    async fn password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credential, AuthError> {
        let mut form = self.with_client_auth(self.base_form("password"));
        form.push(("username", username.to_string()));
        form.push(("password", password.to_string()));
        self.token_request("password", &form).await
    }

    async fn api_key_grant(&self, key_id: &str, secret: &str) -> Result<Credential, AuthError> {
        let mut form = self.base_form("client_credentials");
        form.push(("client_id", key_id.to_string()));
        form.push(("client_secret", secret.to_string()));
        self.token_request("client_credentials", &form).await
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<Credential, AuthError> {
        let challenge =
            self.pending_challenge.lock().await.take().ok_or(AuthError::StateMismatch)?;
        if !validate_state(&challenge.state, state) {
            return Err(AuthError::StateMismatch);
        }

        let mut form =
            self.with_client_auth(vec![("grant_type", "authorization_code".to_string())]);
        form.push(("code", code.to_string()));
        form.push(("code_verifier", challenge.code_verifier));
        if let Some(redirect_uri) = &self.settings.redirect_uri {
            form.push(("redirect_uri", redirect_uri.clone()));
        }
        self.token_request("authorization_code", &form).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::NoRefreshToken);
        }
        let mut form = self.with_client_auth(self.base_form("refresh_token"));
        form.push(("refresh_token", refresh_token.to_string()));
        let mut credential = self.token_request("refresh_token", &form).await?;
        // Authorities may omit the refresh token on rotation.
        if credential.refresh_token.is_none() {
            credential.refresh_token = Some(refresh_token.to_string());
        }
        Ok(credential)
    }

    async fn assume_role(
        &self,
        caller: &Credential,
        hop: &RoleHop,
        session_name: &str,
    ) -> Result<Credential, AuthError> {
        let role_url =
            self.settings.role_url.as_deref().ok_or(AuthError::MissingEndpoint("auth.role_url"))?;
        let body = AssumeRoleRequest {
            role_name: &hop.role_name,
            target_account: hop.target_account.as_deref(),
            external_id: hop.external_id.as_deref(),
            session_name,
            duration_secs: i64::from(DEFAULT_ROLE_SESSION_SECS),
        };

        debug!(role = %hop.role_name, account = ?hop.target_account, "Assuming role");
        let response = self
            .http
            .post(role_url)
            .header(reqwest::header::AUTHORIZATION, caller.bearer())
            .json(&body)
            .send()
            .await?;
        let credential = self.read_credential("assume_role", response).await?;
        Ok(credential.with_session_name(session_name))
    }
}
