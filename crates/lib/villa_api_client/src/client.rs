//! API client with transparent access-token refresh.
//!
//! Authenticated calls carry the stored access token. On `401 Unauthorized`
//! the client refreshes the pair once and replays the request once; the
//! second response is final.

use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::models::{
    ApiResponse, LoginRequest, RegistrationRequest, SessionUser, TokenPair, UserDto,
};
use crate::session::SessionScope;

pub const LOGIN_PATH: &str = "/api/users/login";
pub const REGISTER_PATH: &str = "/api/users/register";
pub const REFRESH_PATH: &str = "/api/users/refresh";
pub const REVOKE_PATH: &str = "/api/users/revoke";
pub const ME_PATH: &str = "/api/users/me";

/// Default API origin.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7001";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://127.0.0.1:7001`.
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionScope>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionScope>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(&config.base_url)?,
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionScope> {
        &self.session
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Send the request produced by `build`.
    ///
    /// `build` is called once per physical send, so it must produce an
    /// equivalent request every time. With `requires_auth`, a `401` triggers
    /// one refresh of the stored pair and one replay; the replayed response
    /// is returned as is.
    pub async fn send<F>(&self, build: F, requires_auth: bool) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        if !requires_auth {
            return Ok(build(&self.http).send().await?);
        }

        let stored = self.session.tokens()?;
        let resp = self.send_with_bearer(&build, stored.as_ref()).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        let Some(stale) = stored else {
            return Err(ClientError::NotSignedIn);
        };
        let fresh = self.refresh_after_unauthorized(&stale).await?;

        debug!("replaying request with refreshed access token");
        Ok(self.send_with_bearer(&build, Some(&fresh)).await?)
    }

    async fn send_with_bearer<F>(
        &self,
        build: &F,
        tokens: Option<&TokenPair>,
    ) -> reqwest::Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut request = build(&self.http);
        if let Some(tokens) = tokens {
            request = request.bearer_auth(&tokens.access_token);
        }
        request.send().await
    }

    /// Refresh `stale` unless a concurrent caller already replaced it.
    async fn refresh_after_unauthorized(&self, stale: &TokenPair) -> Result<TokenPair> {
        let _guard = self.session.lock_refresh().await;

        match self.session.tokens()? {
            // A concurrent refresh failed and signed the session out.
            None => Err(ClientError::AuthFailed),
            Some(current) if current.access_token != stale.access_token => {
                debug!("reusing tokens refreshed by a concurrent request");
                Ok(current)
            }
            Some(_) => self.exchange(stale).await,
        }
    }

    /// Call the refresh endpoint and store the result. Must run under the
    /// session's refresh lock.
    async fn exchange(&self, stale: &TokenPair) -> Result<TokenPair> {
        let resp = self
            .http
            .post(self.url(REFRESH_PATH)?)
            .json(stale)
            .send()
            .await?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(ClientError::Api {
                status,
                messages: vec!["Refresh failed".into()],
            });
        }

        match resp.json::<ApiResponse<TokenPair>>().await {
            Ok(ApiResponse {
                is_success: true,
                result: Some(pair),
                ..
            }) if !pair.is_empty() => {
                let user = self.session.sign_in(pair.clone())?;
                info!(user = %user.name, "session refreshed");
                Ok(pair)
            }
            other => {
                let reason = other
                    .map(|body| body.error_messages.join("; "))
                    .unwrap_or_default();
                warn!(%status, reason = %reason, "refresh rejected, signing out");
                self.session.sign_out()?;
                Err(ClientError::AuthFailed)
            }
        }
    }

    /// Sign in and store the issued pair.
    pub async fn login(&self, user_name: &str, password: &str) -> Result<SessionUser> {
        let url = self.url(LOGIN_PATH)?;
        let body = LoginRequest {
            user_name: user_name.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .send(|http| http.post(url.clone()).json(&body), false)
            .await?;
        let pair: TokenPair = read_result(resp).await?;
        let user = self.session.sign_in(pair)?;
        info!(user = %user.name, "signed in");
        Ok(user)
    }

    pub async fn register(&self, request: &RegistrationRequest) -> Result<UserDto> {
        let url = self.url(REGISTER_PATH)?;
        let resp = self
            .send(|http| http.post(url.clone()).json(request), false)
            .await?;
        read_result(resp).await
    }

    /// The session identity as seen by the server.
    pub async fn me(&self) -> Result<SessionUser> {
        let url = self.url(ME_PATH)?;
        let resp = self.send(|http| http.get(url.clone()), true).await?;
        read_result(resp).await
    }

    /// Refresh the stored pair now, without waiting for a `401`.
    pub async fn refresh(&self) -> Result<SessionUser> {
        let _guard = self.session.lock_refresh().await;
        let stale = self.session.tokens()?.ok_or(ClientError::NotSignedIn)?;
        self.exchange(&stale).await?;
        self.session.user()?.ok_or(ClientError::NotSignedIn)
    }

    /// Clear the local session, then revoke its chain on the server.
    pub async fn logout(&self) -> Result<()> {
        let Some(tokens) = self.session.tokens()? else {
            return Ok(());
        };
        self.session.sign_out()?;

        let url = self.url(REVOKE_PATH)?;
        let resp = self
            .send(|http| http.post(url.clone()).json(&tokens), false)
            .await?;
        read_envelope::<serde_json::Value>(resp).await?;
        info!("signed out");
        Ok(())
    }
}

/// Decode the envelope, turning well-known failure statuses and
/// unsuccessful envelopes into errors.
async fn read_envelope<T: DeserializeOwned>(resp: Response) -> Result<ApiResponse<T>> {
    let status = resp.status();
    let fixed = match status {
        StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized),
        StatusCode::NOT_FOUND => Some("Not Found"),
        StatusCode::FORBIDDEN => Some("Access Denied"),
        StatusCode::INTERNAL_SERVER_ERROR => Some("Internal Server Error"),
        _ => None,
    };
    if let Some(message) = fixed {
        return Err(ClientError::Api {
            status,
            messages: vec![message.into()],
        });
    }

    let body: ApiResponse<T> = resp.json().await?;
    if !body.is_success {
        return Err(ClientError::Api {
            status,
            messages: body.error_messages,
        });
    }
    Ok(body)
}

async fn read_result<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    read_envelope(resp)
        .await?
        .result
        .ok_or_else(|| ClientError::Api {
            status,
            messages: vec!["Response carried no result".into()],
        })
}
