use std::sync::Mutex;

use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Where the user currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Option<String>,
}

impl Location {
    pub fn parse(path_and_query: &str) -> Self {
        match path_and_query.split_once('?') {
            Some((path, query)) if !query.is_empty() => Location {
                path: path.to_string(),
                query: Some(query.to_string()),
            },
            Some((path, _)) => Location {
                path: path.to_string(),
                query: None,
            },
            None => Location {
                path: path_and_query.to_string(),
                query: None,
            },
        }
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }
}

/// The interactive surface the API client may steer after a 401/403.
pub trait Navigator: Send + Sync {
    /// `None` outside an interactive context; redirects are then skipped.
    fn location(&self) -> Option<Location>;
    fn redirect(&self, target: &str);
}

/// No page to steer (terminal client, background work).
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Navigator for Headless {
    fn location(&self) -> Option<Location> {
        None
    }

    fn redirect(&self, _target: &str) {}
}

/// Remembers the first redirect requested while serving one page.
#[derive(Debug)]
pub struct RecordingNavigator {
    location: Location,
    target: Mutex<Option<String>>,
}

impl RecordingNavigator {
    pub fn new(location: Location) -> Self {
        RecordingNavigator {
            location,
            target: Mutex::new(None),
        }
    }

    pub fn redirect_target(&self) -> Option<String> {
        self.target.lock().ok().and_then(|t| t.clone())
    }
}

impl Navigator for RecordingNavigator {
    fn location(&self) -> Option<Location> {
        Some(self.location.clone())
    }

    fn redirect(&self, target: &str) {
        if let Ok(mut slot) = self.target.lock() {
            slot.get_or_insert_with(|| target.to_string());
        }
    }
}

/// `/login?next=<path+query>` for a location, or `None` when already on the
/// login view or already at the computed target.
pub fn login_redirect(location: &Location) -> Option<String> {
    if location.path.starts_with(LOGIN_PATH) {
        return None;
    }
    let target = login_url(&location.path_and_query());
    (target != location.path_and_query()).then_some(target)
}

/// Login URL carrying `next`, omitted for the root path.
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        return LOGIN_PATH.to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// `/dashboard` unless already there.
pub fn forbidden_redirect(location: &Location) -> Option<String> {
    (location.path != DASHBOARD_PATH).then(|| DASHBOARD_PATH.to_string())
}

/// Only same-site absolute paths are honoured as a post-login target.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.starts_with(LOGIN_PATH) => {
            n.to_string()
        }
        _ => DASHBOARD_PATH.to_string(),
    }
}
