//! Firestore REST document encoding.
//!
//! Firestore wraps every field in a single-key object naming its type:
//!
//! ```json
//! {
//!   "name": "projects/p/databases/(default)/documents/todos/abc123",
//!   "fields": {
//!     "title":     { "stringValue": "Buy milk" },
//!     "completed": { "booleanValue": false },
//!     "createdAt": { "integerValue": "1735689600000" },
//!     "userId":    { "stringValue": "u1" }
//!   }
//! }
//! ```
//!
//! `createdAt` is written as epoch milliseconds. Documents written by other
//! clients may carry a `timestampValue` or `doubleValue` instead; both decode.

use chrono::{DateTime, Utc};
use horizon_todo_core::error::StoreError;
use horizon_todo_core::identity::UserId;
use horizon_todo_core::todo::{NewTodo, Todo, TodoId, TodoPatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field names as stored in the document.
pub mod field {
    /// Display text
    pub const TITLE: &str = "title";
    /// Completion flag
    pub const COMPLETED: &str = "completed";
    /// Creation time, epoch milliseconds
    pub const CREATED_AT: &str = "createdAt";
    /// Owning principal
    pub const USER_ID: &str = "userId";
}

/// A typed field value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    /// Explicit null
    NullValue(()),
    /// Boolean
    BooleanValue(bool),
    /// 64-bit integer, sent as a decimal string
    IntegerValue(String),
    /// UTF-8 string
    StringValue(String),
    /// RFC 3339 timestamp
    TimestampValue(String),
}

impl Value {
    /// Wraps an integer.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::IntegerValue(value.to_string())
    }

    /// Wraps a string.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue(value.into())
    }
}

/// Field map of a document about to be written.
pub type Fields = BTreeMap<String, Value>;

/// A document as returned by the store.
///
/// Fields are kept as raw JSON so that values of types this client never
/// writes (maps, arrays, references) do not fail the whole read.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Document {
    /// Full resource name; the last path segment is the document id
    #[serde(default)]
    pub name: String,
    /// Raw typed fields
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Document {
    /// The document id: the last segment of the resource name.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.name.rsplit('/').next().filter(|id| !id.is_empty())
    }

    fn string(&self, name: &str) -> Option<String> {
        match self.typed(name)? {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        match self.typed(name)? {
            Value::BooleanValue(b) => Some(b),
            _ => None,
        }
    }

    fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        let raw = self.fields.get(name)?;
        if let Some(millis) = raw.get("doubleValue").and_then(serde_json::Value::as_f64) {
            #[allow(clippy::cast_possible_truncation)]
            return DateTime::from_timestamp_millis(millis as i64);
        }
        match self.typed(name)? {
            Value::IntegerValue(millis) => millis
                .parse::<i64>()
                .ok()
                .and_then(DateTime::from_timestamp_millis),
            Value::TimestampValue(ts) => DateTime::parse_from_rfc3339(&ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    fn typed(&self, name: &str) -> Option<Value> {
        self.fields
            .get(name)
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
    }

    /// Decodes the document into a remote-store [`Todo`].
    ///
    /// Missing `title` and `completed` fields fall back to an empty title and
    /// `false`; missing `createdAt` and `userId` stay `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if the document has no resource name.
    pub fn into_todo(self) -> Result<Todo, StoreError> {
        let id = self
            .id()
            .ok_or_else(|| StoreError::Decode("document without a name".to_string()))?
            .to_string();

        Ok(Todo {
            id: TodoId::Remote(id),
            title: self.string(field::TITLE).unwrap_or_default(),
            completed: self.boolean(field::COMPLETED).unwrap_or(false),
            created_at: self.timestamp(field::CREATED_AT),
            user_id: self.string(field::USER_ID).map(UserId::new),
        })
    }
}

/// Encodes a new record.
#[must_use]
pub fn encode_new_todo(todo: &NewTodo) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::TITLE.into(), Value::string(&todo.title));
    fields.insert(field::COMPLETED.into(), Value::BooleanValue(todo.completed));
    fields.insert(
        field::CREATED_AT.into(),
        Value::integer(todo.created_at.timestamp_millis()),
    );
    fields.insert(field::USER_ID.into(), Value::string(todo.user_id.as_str()));
    fields
}

/// Encodes the fields set in `patch`.
#[must_use]
pub fn encode_patch(patch: &TodoPatch) -> Fields {
    let mut fields = Fields::new();
    if let Some(title) = &patch.title {
        fields.insert(field::TITLE.into(), Value::string(title));
    }
    if let Some(completed) = patch.completed {
        fields.insert(field::COMPLETED.into(), Value::BooleanValue(completed));
    }
    fields
}
