//! HTTP access to the task API.

mod error;
mod navigator;

pub use error::{ApiError, error_message};
pub use navigator::{
    DASHBOARD_PATH, Headless, LOGIN_PATH, Location, Navigator, RecordingNavigator,
    forbidden_redirect, login_redirect, login_url, safe_next,
};

use std::future::Future;
use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::TokenStore;
use crate::models::{LoginRequest, LoginResponse};

/// The seam between the cache/controllers and the network.
///
/// `ApiClient` is the real implementation; tests substitute an in-memory one.
pub trait Backend: Send + Sync + 'static {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            navigator,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Issue one request and return its JSON body (`Null` for an empty body).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(CACHE_CONTROL, "no-store");
        if let Some(token) = self.tokens.read() {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        debug!(%method, path, "api request");
        let resp = req.send().await.map_err(|e| {
            warn!(%method, path, "api transport failure: {e}");
            ApiError::Transport(e.to_string())
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let code = status.as_u16();
            let message = error_message(code, &text);
            debug!(%method, path, status = code, "api error: {message}");
            self.after_failure(code);
            return Err(ApiError::Http {
                status: code,
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }

    /// Exchange credentials for a bearer token and store it.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let body = serde_json::to_value(LoginRequest { email, password })
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let value = self.send(Method::POST, "/auth/login", Some(&body)).await?;
        let resp: LoginResponse =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("/auth/login: {e}")))?;
        self.tokens.save(&resp.access_token);
        info!("signed in");
        Ok(resp.access_token)
    }

    /// 401 drops the session and heads for the login view; 403 heads for the
    /// dashboard. Both only when there is an interactive location to steer.
    fn after_failure(&self, status: u16) {
        match status {
            401 => {
                self.tokens.clear();
                if let Some(target) = self.navigator.location().as_ref().and_then(login_redirect) {
                    info!(target = %target, "session rejected, redirecting to login");
                    self.navigator.redirect(&target);
                }
            }
            403 => {
                if let Some(target) = self.navigator.location().as_ref().and_then(forbidden_redirect) {
                    info!(target = %target, "forbidden, redirecting");
                    self.navigator.redirect(&target);
                }
            }
            _ => {}
        }
    }
}

impl Backend for ApiClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.send(method, path, body.as_ref()).await
    }
}
