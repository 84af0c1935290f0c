use serde::{Deserialize, Serialize};

use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Transactions,
    Loans,
    Goals,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::Transactions,
        Route::Loans,
        Route::Goals,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Transactions => "/transactions",
            Self::Loans => "/loans",
            Self::Goals => "/goals",
        }
    }

    /// Exact path match; a single trailing slash is tolerated.
    pub fn parse(path: &str) -> Option<Self> {
        let path = match path.strip_suffix('/') {
            Some(p) if !p.is_empty() => p,
            _ => path,
        };
        Self::ALL.into_iter().find(|r| r.path() == path)
    }

    /// Requires a credential to render.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }
}

/// Result of guarding a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Render(Route),
    Redirect(Route),
}

impl Resolution {
    /// The route that ends up on screen.
    pub fn target(&self) -> Route {
        match self {
            Self::Render(r) | Self::Redirect(r) => *r,
        }
    }
}

/// Decide what `path` shows for the given authentication state.
pub fn resolve_path(path: &str, authenticated: bool) -> Resolution {
    match Route::parse(path) {
        Some(route) if route.is_protected() && !authenticated => Resolution::Redirect(Route::Login),
        Some(route) => Resolution::Render(route),
        None if authenticated => Resolution::Redirect(Route::Dashboard),
        None => Resolution::Redirect(Route::Login),
    }
}

/// Guard against the live session. Checked on every navigation, never cached.
pub fn resolve(path: &str, session: &SessionStore) -> Resolution {
    resolve_path(path, session.is_authenticated())
}
