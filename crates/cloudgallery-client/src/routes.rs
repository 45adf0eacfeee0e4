//! Route table, the authentication guard, and the navigator.
//!
//! # Design
//! - Every protected route passes through [`RouteGuard::resolve`]; there is
//!   no code path that renders one without a token.
//! - The current route lives in a `watch` channel so views can react to
//!   forced redirects issued by the API layer.

use std::fmt::{self, Display, Formatter};

use tokio::sync::watch;
use tracing::debug;

use crate::session::SessionContext;

/// Screens the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Credential entry.
    Login,
    /// Account creation.
    Register,
    /// Image grid, search, and slideshow launch.
    Gallery,
    /// File upload with live progress.
    Upload,
    /// Single image with metadata editing.
    ImageDetail {
        /// Image identifier.
        id: i64,
    },
    /// Crop and filter editor for one image.
    Editor {
        /// Image identifier.
        id: i64,
    },
}

impl Route {
    /// Path used for this route.
    ///
    /// The editor carries its image id as a query parameter.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".to_string(),
            Self::Register => "/register".to_string(),
            Self::Gallery => "/".to_string(),
            Self::Upload => "/upload".to_string(),
            Self::ImageDetail { id } => format!("/image/{id}"),
            Self::Editor { id } => format!("/editor?image={id}"),
        }
    }

    /// Parse a path produced by [`Route::path`].
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Self::Gallery),
            "/login" => Some(Self::Login),
            "/register" => Some(Self::Register),
            "/upload" => Some(Self::Upload),
            "/editor" => query
                .split('&')
                .find_map(|pair| pair.strip_prefix("image="))
                .and_then(|raw| raw.parse().ok())
                .map(|id| Self::Editor { id }),
            other => other
                .strip_prefix("/image/")
                .and_then(|raw| raw.parse().ok())
                .map(|id| Self::ImageDetail { id }),
        }
    }

    /// Whether a session token is required.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of guarding a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The route may be shown.
    Render(Route),
    /// The caller must show this route instead.
    Redirect(Route),
}

impl GuardDecision {
    /// Route that will actually be shown.
    #[must_use]
    pub const fn target(&self) -> Route {
        match self {
            Self::Render(route) | Self::Redirect(route) => *route,
        }
    }
}

/// Gate protected routes on token presence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteGuard;

impl RouteGuard {
    /// Decide whether `route` renders for `session`.
    #[must_use]
    pub fn resolve(route: Route, session: &SessionContext) -> GuardDecision {
        if route.is_protected() && !session.is_authenticated() {
            GuardDecision::Redirect(Route::Login)
        } else {
            GuardDecision::Render(route)
        }
    }
}

/// Holds the current route and applies the guard to every transition.
#[derive(Debug, Clone)]
pub struct Navigator {
    session: SessionContext,
    current: watch::Sender<Route>,
}

impl Navigator {
    /// Start at `initial`, redirected through the guard.
    #[must_use]
    pub fn new(session: SessionContext, initial: Route) -> Self {
        let start = RouteGuard::resolve(initial, &session).target();
        let (current, _) = watch::channel(start);
        Self { session, current }
    }

    /// Route currently shown.
    #[must_use]
    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    /// Move to `route`, returning the route actually shown.
    pub fn navigate(&self, route: Route) -> Route {
        let decision = RouteGuard::resolve(route, &self.session);
        let target = decision.target();
        if let GuardDecision::Redirect(_) = decision {
            debug!(requested = %route, "protected route requires login");
        }
        self.current.send_replace(target);
        target
    }

    /// Force the login screen.
    pub fn redirect_to_login(&self) {
        self.current.send_replace(Route::Login);
    }

    /// Observe route changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }
}
