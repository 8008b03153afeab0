//! The `Todo` record and its identifiers.
//!
//! Two backing stores issue identifiers for todos:
//!
//! - the Remote Document Store issues opaque strings
//! - the Public Todo Feed issues small positive integers (at most [`FEED_ID_CEILING`])
//!
//! A [`TodoId`] carries the source it was issued by. Records are tagged when they
//! are ingested, so mutation routing never has to guess from the id text. Only
//! ids that arrive untyped (command line arguments, route parameters) go
//! through [`TodoId::parse`], which applies the numeric heuristic once.

use crate::identity::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest identifier the Public Todo Feed issues.
pub const FEED_ID_CEILING: u32 = 200;

/// Which backing store owns a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoSource {
    /// Persistent, authenticated document store
    RemoteStore,
    /// Public sample feed; mutations are simulated and not persisted
    PublicFeed,
}

impl TodoSource {
    /// Stable label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RemoteStore => "remote_store",
            Self::PublicFeed => "public_feed",
        }
    }
}

impl fmt::Display for TodoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-tagged todo identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoId {
    /// Document id issued by the Remote Document Store
    Remote(String),
    /// Numeric id issued by the Public Todo Feed
    Feed(u32),
}

impl TodoId {
    /// Creates a remote-store id.
    #[must_use]
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    /// Creates a feed id.
    #[must_use]
    pub const fn feed(id: u32) -> Self {
        Self::Feed(id)
    }

    /// Routes an untyped id.
    ///
    /// An id belongs to the Public Todo Feed iff it parses as an unsigned
    /// integer no greater than [`FEED_ID_CEILING`]; everything else is a
    /// Remote Document Store id. Surrounding whitespace is ignored for the
    /// numeric check but kept in remote ids.
    ///
    /// The rule is a heuristic: a remote store issuing short numeric ids
    /// would be misrouted. Records loaded through the aggregator are tagged
    /// at ingestion and never pass through here.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<u32>() {
            Ok(n) if n <= FEED_ID_CEILING => Self::Feed(n),
            _ => Self::Remote(raw.to_string()),
        }
    }

    /// Returns the store that owns this id.
    #[must_use]
    pub const fn source(&self) -> TodoSource {
        match self {
            Self::Remote(_) => TodoSource::RemoteStore,
            Self::Feed(_) => TodoSource::PublicFeed,
        }
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(id) => f.write_str(id),
            Self::Feed(id) => write!(f, "{id}"),
        }
    }
}

/// A single todo item as shown in the merged list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Source-tagged identifier
    pub id: TodoId,
    /// Display text
    pub title: String,
    /// Whether the todo is done
    pub completed: bool,
    /// Creation time (remote-store records only)
    pub created_at: Option<DateTime<Utc>>,
    /// Owning principal (remote-store records only)
    pub user_id: Option<UserId>,
}

impl Todo {
    /// Creates a feed record. Feed records carry neither timestamp nor owner.
    #[must_use]
    pub fn from_feed(id: u32, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id: TodoId::Feed(id),
            title: title.into(),
            completed,
            created_at: None,
            user_id: None,
        }
    }

    /// Returns the store that owns this record.
    #[must_use]
    pub const fn source(&self) -> TodoSource {
        self.id.source()
    }

    /// Returns `true` if the record belongs to `user`.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }

    /// Merges a partial update into this record.
    pub fn apply(&mut self, patch: &TodoPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// A record about to be written to the Remote Document Store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    /// Display text
    pub title: String,
    /// Always `false` for new records
    pub completed: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Owning principal
    pub user_id: UserId,
}

impl NewTodo {
    /// Creates an open todo owned by `user_id`.
    #[must_use]
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>, user_id: UserId) -> Self {
        Self {
            title: title.into(),
            completed: false,
            created_at,
            user_id,
        }
    }

    /// Attaches the store-generated document id.
    #[must_use]
    pub fn into_todo(self, id: String) -> Todo {
        Todo {
            id: TodoId::Remote(id),
            title: self.title,
            completed: self.completed,
            created_at: Some(self.created_at),
            user_id: Some(self.user_id),
        }
    }
}

/// Partial update of a todo. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New completion state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Creates an empty patch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            title: None,
            completed: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the completion state.
    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// Names of the fields this patch sets, in document-store spelling.
    #[must_use]
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::with_capacity(2);
        if self.title.is_some() {
            paths.push("title");
        }
        if self.completed.is_some() {
            paths.push("completed");
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_routes_small_numbers_to_feed() {
        assert_eq!(TodoId::parse("1"), TodoId::Feed(1));
        assert_eq!(TodoId::parse("42"), TodoId::Feed(42));
        assert_eq!(TodoId::parse("200"), TodoId::Feed(200));
        assert_eq!(TodoId::parse(" 7 "), TodoId::Feed(7));
    }

    #[test]
    fn parse_routes_everything_else_to_remote() {
        assert_eq!(TodoId::parse("201"), TodoId::remote("201"));
        assert_eq!(TodoId::parse("abcId"), TodoId::remote("abcId"));
        assert_eq!(TodoId::parse("-3"), TodoId::remote("-3"));
        assert_eq!(TodoId::parse("1.5"), TodoId::remote("1.5"));
        assert_eq!(TodoId::parse(""), TodoId::remote(""));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for id in [TodoId::Feed(5), TodoId::remote("x9Qz")] {
            assert_eq!(TodoId::parse(&id.to_string()), id);
        }
    }

    #[test]
    fn apply_patch_only_touches_set_fields() {
        let mut todo = Todo::from_feed(3, "Original", false);
        todo.apply(&TodoPatch::new().completed(true));
        assert_eq!(todo.title, "Original");
        assert!(todo.completed);

        todo.apply(&TodoPatch::new().title("Renamed"));
        assert_eq!(todo.title, "Renamed");
        assert!(todo.completed);
    }

    #[test]
    fn new_todo_becomes_owned_remote_record() {
        let owner = UserId::new("user-1");
        let now = Utc::now();
        let todo = NewTodo::new("Buy milk", now, owner.clone()).into_todo("doc-1".into());

        assert_eq!(todo.id, TodoId::remote("doc-1"));
        assert_eq!(todo.source(), TodoSource::RemoteStore);
        assert!(!todo.completed);
        assert_eq!(todo.created_at, Some(now));
        assert!(todo.is_owned_by(&owner));
        assert!(!todo.is_owned_by(&UserId::new("user-2")));
    }

    #[test]
    fn patch_field_paths() {
        assert!(TodoPatch::new().field_paths().is_empty());
        assert_eq!(
            TodoPatch::new().title("t").completed(false).field_paths(),
            vec!["title", "completed"]
        );
    }

    proptest! {
        #[test]
        fn numeric_routing_is_a_partition(n in any::<u32>()) {
            let routed = TodoId::parse(&n.to_string());
            if n <= FEED_ID_CEILING {
                prop_assert_eq!(routed, TodoId::Feed(n));
            } else {
                prop_assert_eq!(routed.source(), TodoSource::RemoteStore);
            }
        }

        #[test]
        fn non_numeric_ids_are_remote(raw in "[A-Za-z][A-Za-z0-9]{0,19}") {
            prop_assert_eq!(TodoId::parse(&raw), TodoId::Remote(raw));
        }
    }
}
