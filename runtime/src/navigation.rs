//! Views and the authentication guard in front of them.
//!
//! Navigating to a view that needs a principal while nobody is signed in
//! redirects to the login view. The guard waits for the identity provider's
//! first report before deciding, so a session that is still being restored
//! is not mistaken for a signed-out user.

use horizon_todo_core::identity::AuthSession;
use horizon_todo_core::todo::TodoId;
use serde::Serialize;
use std::fmt;

/// A view of the application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// `/`
    Home,
    /// `/todos`: the paginated list
    Todos,
    /// `/add-todo`: creation form
    AddTodo,
    /// `/todos/:id`: a single todo
    TodoDetails(TodoId),
    /// `/login`
    Login,
    /// `/search`
    Search,
    /// `/signup`
    SignUp,
}

impl Route {
    /// Parses a path. Query strings, fragments and a trailing slash are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };

        match path {
            "/" => Some(Self::Home),
            "/todos" => Some(Self::Todos),
            "/add-todo" => Some(Self::AddTodo),
            "/login" => Some(Self::Login),
            "/search" => Some(Self::Search),
            "/signup" => Some(Self::SignUp),
            other => {
                let id = other.strip_prefix("/todos/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Some(Self::TodoDetails(TodoId::parse(id)))
            }
        }
    }

    /// Returns `true` for views that need a signed-in principal.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(self, Self::Todos | Self::AddTodo | Self::Search)
    }

    /// The view's path.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Todos => "/todos".to_string(),
            Self::AddTodo => "/add-todo".to_string(),
            Self::TodoDetails(id) => format!("/todos/{id}"),
            Self::Login => "/login".to_string(),
            Self::Search => "/search".to_string(),
            Self::SignUp => "/signup".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of a navigation attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// Show the requested view.
    Proceed(Route),
    /// Show this view instead.
    Redirect(Route),
}

impl Navigation {
    /// The view that ends up being shown.
    #[must_use]
    pub const fn destination(&self) -> &Route {
        match self {
            Self::Proceed(route) | Self::Redirect(route) => route,
        }
    }
}

/// Decides whether `route` may be shown.
pub async fn guard(route: Route, session: &AuthSession) -> Navigation {
    if !route.requires_auth() {
        return Navigation::Proceed(route);
    }

    if session.current().await.is_some() {
        Navigation::Proceed(route)
    } else {
        tracing::debug!(%route, "redirecting unauthenticated navigation to login");
        Navigation::Redirect(Route::Login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_todo_core::identity::{Principal, UserId};
    use std::time::Duration;

    #[test]
    fn parses_every_view() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse("/todos"), Some(Route::Todos));
        assert_eq!(Route::parse("/todos/"), Some(Route::Todos));
        assert_eq!(Route::parse("/add-todo"), Some(Route::AddTodo));
        assert_eq!(Route::parse("/login?next=/todos"), Some(Route::Login));
        assert_eq!(Route::parse("/search#top"), Some(Route::Search));
        assert_eq!(Route::parse("/signup"), Some(Route::SignUp));
        assert_eq!(
            Route::parse("/todos/42"),
            Some(Route::TodoDetails(TodoId::Feed(42)))
        );
        assert_eq!(
            Route::parse("/todos/Xy9abc"),
            Some(Route::TodoDetails(TodoId::remote("Xy9abc")))
        );
        assert_eq!(Route::parse("/todos/a/b"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn only_list_add_and_search_require_auth() {
        let protected: Vec<Route> = [
            Route::Home,
            Route::Todos,
            Route::AddTodo,
            Route::TodoDetails(TodoId::Feed(1)),
            Route::Login,
            Route::Search,
            Route::SignUp,
        ]
        .into_iter()
        .filter(Route::requires_auth)
        .collect();
        assert_eq!(protected, vec![Route::Todos, Route::AddTodo, Route::Search]);
    }

    #[test]
    fn path_round_trips() {
        for route in [Route::Todos, Route::TodoDetails(TodoId::remote("doc-7"))] {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
    }

    #[tokio::test]
    async fn signed_out_user_is_redirected_to_login() {
        let session = AuthSession::resolved(None);
        assert_eq!(
            guard(Route::Todos, &session).await,
            Navigation::Redirect(Route::Login)
        );
        assert_eq!(
            guard(Route::TodoDetails(TodoId::Feed(3)), &session).await,
            Navigation::Proceed(Route::TodoDetails(TodoId::Feed(3)))
        );
    }

    #[tokio::test]
    async fn guard_waits_for_session_restore() {
        let session = AuthSession::new();
        let restorer = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            restorer.publish(Some(Principal::new(UserId::new("u1"))));
        });

        let navigation = guard(Route::AddTodo, &session).await;
        assert_eq!(navigation, Navigation::Proceed(Route::AddTodo));
        assert_eq!(navigation.destination(), &Route::AddTodo);
    }
}
