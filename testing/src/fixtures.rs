//! Fixture builders.

use chrono::{DateTime, TimeZone, Utc};
use horizon_todo_core::identity::{Principal, UserId};
use horizon_todo_core::todo::{NewTodo, Todo};
use std::num::NonZeroUsize;

/// Timestamp `secs` seconds after the Unix epoch.
#[must_use]
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// A signed-in principal with a bearer token.
#[must_use]
pub fn principal(uid: &str) -> Principal {
    Principal::new(UserId::new(uid))
        .with_email(format!("{uid}@example.com"))
        .with_id_token(format!("token-{uid}"))
}

/// Open feed records `1..=count`, titled `feed todo N`.
#[must_use]
pub fn feed_todos(count: u32) -> Vec<Todo> {
    (1..=count)
        .map(|i| Todo::from_feed(i, format!("feed todo {i}"), false))
        .collect()
}

/// A remote-store record owned by `owner`, created at `created_at`.
#[must_use]
pub fn remote_todo(id: &str, title: &str, created_at: DateTime<Utc>, owner: &str) -> Todo {
    NewTodo::new(title, created_at, UserId::new(owner)).into_todo(id.to_string())
}

/// Page size helper; zero becomes one.
#[must_use]
pub fn page_size(size: usize) -> NonZeroUsize {
    NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN)
}
