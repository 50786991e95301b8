//! Per-request plumbing between the browser session and the task API.

use std::sync::{Arc, Mutex};

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration as CookieDuration;
use tracing::debug;

use super::AppState;
use crate::auth::{TOKEN_COOKIE, TokenStore, session_ttl};
use crate::client::{ApiClient, LOGIN_PATH, Location, RecordingNavigator};
use crate::store::ResourceStore;

const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

pub fn token_from(jar: &CookieJar) -> Option<String> {
    jar.get(TOKEN_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(session_ttl().num_seconds()))
        .build()
}

pub fn cleared_cookie() -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .max_age(CookieDuration::seconds(0))
        .build()
}

/// Token store backed by the request's cookie. Writes are buffered and turned
/// into `Set-Cookie` headers when the response is built.
#[derive(Debug)]
pub struct CookieTokenStore {
    current: Mutex<Option<String>>,
    changed: Mutex<bool>,
}

impl CookieTokenStore {
    pub fn new(token: Option<String>) -> Self {
        CookieTokenStore {
            current: Mutex::new(token),
            changed: Mutex::new(false),
        }
    }

    fn set(&self, token: Option<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = token;
        }
        if let Ok(mut changed) = self.changed.lock() {
            *changed = true;
        }
    }

    pub fn apply(&self, jar: CookieJar) -> CookieJar {
        let changed = self.changed.lock().map(|c| *c).unwrap_or(false);
        if !changed {
            return jar;
        }
        match self.read() {
            Some(token) => jar.add(session_cookie(&token)),
            None => jar.remove(cleared_cookie()),
        }
    }
}

impl TokenStore for CookieTokenStore {
    fn save(&self, token: &str) {
        self.set(Some(token.to_string()));
    }

    fn clear(&self) {
        self.set(None);
    }

    fn read(&self) -> Option<String> {
        self.current.lock().ok().and_then(|t| t.clone())
    }
}

/// The page a request came from, as `path?query`. Form posts go to action
/// paths that cannot be opened with GET, so for those this is the page that
/// held the form: the `Referer` when there is one, else the page the action
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin(pub String);

impl PageOrigin {
    pub fn of(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let requested = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        if *method == Method::GET || *method == Method::HEAD {
            return PageOrigin(requested.to_string());
        }
        let referer = headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .and_then(referer_page);
        PageOrigin(referer.unwrap_or_else(|| action_page(uri.path())))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for PageOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        Ok(PageOrigin::of(&parts.method, &parts.uri, &parts.headers))
    }
}

fn referer_page(referer: &str) -> Option<String> {
    let url = url::Url::parse(referer).ok()?;
    let path = url.path();
    if path.starts_with(LOGIN_PATH) {
        return None;
    }
    Some(match url.query() {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    })
}

fn action_page(path: &str) -> String {
    if let Some(task) = path.strip_suffix("/logs") {
        return task.to_string();
    }
    if path.ends_with("/delete") {
        return "/tasks".to_string();
    }
    path.to_string()
}

/// Everything one page render needs: a client bound to the caller's cookie,
/// a navigator that records 401/403 redirects, and a cache shared by every
/// component on the page.
pub struct RequestScope {
    pub store: Arc<ResourceStore<ApiClient>>,
    tokens: Arc<CookieTokenStore>,
    navigator: Arc<RecordingNavigator>,
}

impl RequestScope {
    pub fn new(state: &AppState, jar: &CookieJar, origin: &PageOrigin) -> Self {
        let location = Location::parse(&origin.0);
        let tokens = Arc::new(CookieTokenStore::new(token_from(jar)));
        let navigator = Arc::new(RecordingNavigator::new(location));
        let client = ApiClient::new(
            state.http.clone(),
            &state.config.api_base_url,
            tokens.clone(),
            navigator.clone(),
        );
        RequestScope {
            store: ResourceStore::new(Arc::new(client)),
            tokens,
            navigator,
        }
    }

    pub fn client(&self) -> &ApiClient {
        self.store.backend()
    }

    /// Attach cookie changes to `response`. A redirect requested by the API
    /// client while rendering replaces the page.
    pub fn finish(self, jar: CookieJar, response: impl IntoResponse, htmx: bool) -> Response {
        let jar = self.tokens.apply(jar);
        match self.navigator.redirect_target() {
            Some(target) => {
                debug!(target = %target, "page replaced by redirect");
                (jar, redirect(&target, htmx)).into_response()
            }
            None => (jar, response).into_response(),
        }
    }
}

/// htmx swaps follow `HX-Redirect`; plain requests get a 303.
pub fn redirect(target: &str, htmx: bool) -> Response {
    if htmx {
        if let Ok(value) = HeaderValue::from_str(target) {
            return (StatusCode::OK, [(HX_REDIRECT, value)]).into_response();
        }
    }
    Redirect::to(target).into_response()
}
