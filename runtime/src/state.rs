//! State owned by the todo aggregator and its pure transitions.
//!
//! Every method here is synchronous and free of I/O; the aggregator performs
//! the remote calls and then applies their outcome through these transitions.

use horizon_todo_core::pagination::{Pagination, slice_page};
use horizon_todo_core::todo::{Todo, TodoId, TodoPatch, TodoSource};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;

/// Success message after a load.
pub const LOADED_MESSAGE: &str = "Todos loaded successfully!";
/// Success message after an add.
pub const ADDED_MESSAGE: &str = "Todo added successfully!";
/// Success message after a persisted update.
pub const UPDATED_MESSAGE: &str = "Todo updated successfully!";
/// Success message after a persisted delete.
pub const DELETED_MESSAGE: &str = "Todo deleted successfully!";
/// Success message after a simulated feed update.
pub const UPDATED_LOCALLY_MESSAGE: &str = "Todo updated locally (sample todos are not persisted)";
/// Success message after a simulated feed delete.
pub const DELETED_LOCALLY_MESSAGE: &str = "Todo deleted locally (sample todos are not persisted)";

/// Aggregator operations. Each owns one busy flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// `load(page)`
    Load,
    /// `add(title)`
    Add,
    /// `update(id, patch)`
    Update,
    /// `delete(id)`
    Delete,
}

impl Operation {
    /// Stable label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Busy flags, one per operation.
///
/// Each flag counts in-flight calls so that overlapping calls of the same
/// operation keep it raised until the last one finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BusyFlags {
    load: usize,
    add: usize,
    update: usize,
    delete: usize,
}

impl BusyFlags {
    const fn slot(&mut self, op: Operation) -> &mut usize {
        match op {
            Operation::Load => &mut self.load,
            Operation::Add => &mut self.add,
            Operation::Update => &mut self.update,
            Operation::Delete => &mut self.delete,
        }
    }

    fn begin(&mut self, op: Operation) {
        let slot = self.slot(op);
        *slot = slot.saturating_add(1);
    }

    fn end(&mut self, op: Operation) {
        let slot = self.slot(op);
        *slot = slot.saturating_sub(1);
    }

    /// Returns `true` while at least one call of `op` is running.
    #[must_use]
    pub const fn is_busy(&self, op: Operation) -> bool {
        match op {
            Operation::Load => self.load > 0,
            Operation::Add => self.add > 0,
            Operation::Update => self.update > 0,
            Operation::Delete => self.delete > 0,
        }
    }
}

/// Everything the presentation layer binds to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TodoListState {
    /// Displayed page
    pub todos: Vec<Todo>,
    /// Full merged list: remote records (newest first), then feed records
    pub full_todos: Vec<Todo>,
    /// Records added during this session, newest first
    pub local_todos: Vec<Todo>,
    /// Message of the last failed operation
    pub error: Option<String>,
    /// Message of the last successful operation
    pub success_message: Option<String>,
    /// Page bookkeeping
    pub pagination: Pagination,
    busy: BusyFlags,
}

impl TodoListState {
    /// Creates an empty state with the given page size.
    #[must_use]
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            todos: Vec::new(),
            full_todos: Vec::new(),
            local_todos: Vec::new(),
            error: None,
            success_message: None,
            pagination: Pagination::new(page_size),
            busy: BusyFlags::default(),
        }
    }

    /// Busy flags.
    #[must_use]
    pub const fn busy(&self) -> &BusyFlags {
        &self.busy
    }

    /// `true` while a load runs.
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.busy.is_busy(Operation::Load)
    }

    /// `true` while an add runs.
    #[must_use]
    pub const fn adding(&self) -> bool {
        self.busy.is_busy(Operation::Add)
    }

    /// `true` while an update runs.
    #[must_use]
    pub const fn updating(&self) -> bool {
        self.busy.is_busy(Operation::Update)
    }

    /// `true` while a delete runs.
    #[must_use]
    pub const fn deleting(&self) -> bool {
        self.busy.is_busy(Operation::Delete)
    }

    /// Full merged list. Search reads from here.
    #[must_use]
    pub fn all_todos(&self) -> &[Todo] {
        &self.full_todos
    }

    /// Raises the busy flag of `op` and clears both status messages.
    pub(crate) fn begin(&mut self, op: Operation) {
        self.busy.begin(op);
        self.error = None;
        self.success_message = None;
    }

    /// Lowers the busy flag of `op`.
    pub(crate) fn finish(&mut self, op: Operation) {
        self.busy.end(op);
    }

    /// Records a failure.
    pub(crate) fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.success_message = None;
    }

    fn succeed(&mut self, message: &str) {
        self.error = None;
        self.success_message = Some(message.to_string());
    }

    /// Publishes a freshly merged list and slices the requested page.
    pub(crate) fn apply_loaded(&mut self, merged: Vec<Todo>, page: usize) {
        self.pagination.set_total(merged.len());
        self.pagination.current_page = page;
        self.todos = slice_page(&merged, page, self.pagination.page_size);
        self.full_todos = merged;
        self.succeed(LOADED_MESSAGE);
    }

    /// Prepends a newly created record.
    ///
    /// The record shows at the head of the displayed page until the next
    /// load, whatever its true sort position.
    pub(crate) fn apply_added(&mut self, todo: Todo) {
        self.local_todos.insert(0, todo.clone());
        self.full_todos.insert(0, todo.clone());
        self.todos.insert(0, todo);
        self.pagination.increment();
        self.succeed(ADDED_MESSAGE);
    }

    /// Patches every copy of `id` and returns the patched record.
    ///
    /// The result comes from the displayed page, falling back to the full
    /// list; `None` means the id is in neither.
    pub(crate) fn apply_updated(&mut self, id: &TodoId, patch: &TodoPatch) -> Option<Todo> {
        let on_page = patch_matching(&mut self.todos, id, patch);
        patch_matching(&mut self.local_todos, id, patch);
        let in_full = patch_matching(&mut self.full_todos, id, patch);

        self.succeed(match id.source() {
            TodoSource::RemoteStore => UPDATED_MESSAGE,
            TodoSource::PublicFeed => UPDATED_LOCALLY_MESSAGE,
        });
        on_page.or(in_full)
    }

    /// Removes every copy of `id` and counts one deletion.
    pub(crate) fn apply_deleted(&mut self, id: &TodoId) {
        self.todos.retain(|t| &t.id != id);
        self.local_todos.retain(|t| &t.id != id);
        self.full_todos.retain(|t| &t.id != id);
        self.pagination.decrement();

        self.succeed(match id.source() {
            TodoSource::RemoteStore => DELETED_MESSAGE,
            TodoSource::PublicFeed => DELETED_LOCALLY_MESSAGE,
        });
    }

    /// Looks up a record in the full merged list.
    #[must_use]
    pub fn find(&self, id: &TodoId) -> Option<&Todo> {
        self.full_todos.iter().find(|t| &t.id == id)
    }

    /// Records of the full merged list whose title contains `query`,
    /// ignoring case. A blank query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Todo> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.full_todos
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

impl Default for TodoListState {
    fn default() -> Self {
        Self::new(horizon_todo_core::pagination::DEFAULT_PAGE_SIZE)
    }
}

fn patch_matching(list: &mut [Todo], id: &TodoId, patch: &TodoPatch) -> Option<Todo> {
    let mut patched = None;
    for todo in list.iter_mut().filter(|t| &t.id == id) {
        todo.apply(patch);
        patched.get_or_insert_with(|| todo.clone());
    }
    patched
}
