//! Application routes and the guard that gates them on the session credential.

pub mod guard;

pub use guard::{GuardDecision, RouteGuard};

use std::fmt;

use crate::domain::asset::AssetId;
use crate::domain::project::ProjectId;

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/auth/login";

const AUTH_PREFIX: &str = "/auth";
const PROTECTED_PREFIXES: [&str; 3] = ["/dashboard", "/projects", "/assets"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Login and signup.
    Auth,
    Protected,
    Public,
}

impl PathClass {
    /// Prefix match on the path component only.
    pub fn of(path: &str) -> Self {
        if path.starts_with(AUTH_PREFIX) {
            PathClass::Auth
        } else if PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p)) {
            PathClass::Protected
        } else {
            PathClass::Public
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Auth,
    Login,
    Signup,
    Dashboard,
    Project(ProjectId),
    ProjectEdit(ProjectId),
    Assets,
    Asset(AssetId),
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["auth"] => Route::Auth,
            ["auth", "login"] => Route::Login,
            ["auth", "signup"] => Route::Signup,
            ["dashboard"] => Route::Dashboard,
            ["projects", id] => id
                .parse()
                .map(Route::Project)
                .unwrap_or_else(|_| Route::NotFound(path.to_string())),
            ["projects", id, "edit"] => id
                .parse()
                .map(Route::ProjectEdit)
                .unwrap_or_else(|_| Route::NotFound(path.to_string())),
            ["assets"] => Route::Assets,
            ["assets", id] => id
                .parse()
                .map(Route::Asset)
                .unwrap_or_else(|_| Route::NotFound(path.to_string())),
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn class(&self) -> PathClass {
        PathClass::of(&self.to_string())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::Auth => write!(f, "/auth"),
            Route::Login => write!(f, "{}", LOGIN_PATH),
            Route::Signup => write!(f, "/auth/signup"),
            Route::Dashboard => write!(f, "{}", DASHBOARD_PATH),
            Route::Project(id) => write!(f, "/projects/{}", id),
            Route::ProjectEdit(id) => write!(f, "/projects/{}/edit", id),
            Route::Assets => write!(f, "/assets"),
            Route::Asset(id) => write!(f, "/assets/{}", id),
            Route::NotFound(path) => write!(f, "{}", path),
        }
    }
}
