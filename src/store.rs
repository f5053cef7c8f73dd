// Task store: in-memory collection + view state, persisted to a blob store

use crate::blob::BlobStore;
use crate::filter::{self, CompletionFilter, Selector, SortKey, SortOrder, ViewState};
use crate::models::{self, Category, Priority, Status, Task, TaskOptions, TaskPatch, clean_text};
use crate::stats::Stats;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const CURRENT_VERSION: u32 = 1;

/// Key the state blob is stored under unless configured otherwise
pub const DEFAULT_KEY: &str = "todo-storage";

/// Everything that is persisted: tasks (newest first) plus view selectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    pub todos: Vec<Task>,
    pub view: ViewState,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    state: &'a State,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(default)]
    state: State,
}

/// Serialize state into the versioned blob format
pub fn encode_state(state: &State) -> Result<String> {
    let snapshot = SnapshotRef {
        version: CURRENT_VERSION,
        state,
    };
    serde_json::to_string(&snapshot).context("Failed to serialize state")
}

/// Parse a versioned blob back into state
pub fn decode_state(blob: &str) -> Result<State> {
    let snapshot: Snapshot = serde_json::from_str(blob).context("Failed to parse state blob")?;
    if snapshot.version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "Unsupported state version {} (max {})",
            snapshot.version,
            CURRENT_VERSION
        ));
    }

    let mut state = snapshot.state;
    let mut seen = HashSet::new();
    state.todos.retain(|task| {
        let first = seen.insert(task.id.clone());
        if !first {
            warn!(id = %task.id, text = %task.text, "Duplicate task id in saved state, skipping");
        }
        first
    });
    for task in &mut state.todos {
        task.reconcile_status();
    }
    Ok(state)
}

/// Task collection with mutation operations and a save-on-change hook
///
/// Mutations never fail: invalid input and unknown ids are ignored. Every
/// mutation that changes something writes the full state back to the blob
/// store; write failures are logged and otherwise swallowed.
pub struct Store {
    key: String,
    blobs: Box<dyn BlobStore>,
    state: State,
    clock: Box<dyn Fn() -> i64>,
}

impl Store {
    /// Open a store over `blobs`, loading any state saved under `key`
    ///
    /// A missing or unreadable blob yields an empty collection.
    pub fn open(blobs: Box<dyn BlobStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let state = Self::load(blobs.as_ref(), &key);
        Self {
            key,
            blobs,
            state,
            clock: Box::new(models::now_ms),
        }
    }

    /// Replace the timestamp source (milliseconds since epoch)
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn load(blobs: &dyn BlobStore, key: &str) -> State {
        let blob = match blobs.get(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!(key, "No saved state, starting empty");
                return State::default();
            }
            Err(e) => {
                warn!(key, error = ?e, "Failed to read saved state, starting empty");
                return State::default();
            }
        };

        match decode_state(&blob) {
            Ok(state) => {
                info!(key, count = state.todos.len(), "Loaded saved state");
                state
            }
            Err(e) => {
                warn!(key, error = ?e, "Saved state unusable, starting empty");
                State::default()
            }
        }
    }

    /// Write the current state to the blob store
    pub fn save(&mut self) -> Result<()> {
        let blob = encode_state(&self.state)?;
        self.blobs.put(&self.key, &blob)?;
        debug!(key = %self.key, count = self.state.todos.len(), "Saved state");
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!(key = %self.key, error = ?e, "Failed to save state, continuing");
        }
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = models::new_id();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Apply `f` to the task with `id`, then persist. False if absent.
    fn mutate_task(&mut self, id: &str, f: impl FnOnce(&mut Task, i64)) -> bool {
        let now = self.now();
        let Some(task) = self.state.todos.iter_mut().find(|t| t.id == id) else {
            debug!(id, "Task not found, ignoring");
            return false;
        };
        f(task, now);
        self.persist();
        true
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn state(&self) -> &State {
        &self.state
    }

    /// All tasks in collection order (newest first)
    pub fn tasks(&self) -> &[Task] {
        &self.state.todos
    }

    pub fn view(&self) -> &ViewState {
        &self.state.view
    }

    pub fn len(&self) -> usize {
        self.state.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.todos.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.state.todos.iter().find(|t| t.id == id)
    }

    /// Tasks whose id equals `needle` or ends with it (at least 4 chars)
    ///
    /// Ids are time-ordered, so their tails are the distinguishing part.
    pub fn find_matching(&self, needle: &str) -> Vec<&Task> {
        let needle = needle.trim();
        if let Some(task) = self.get(needle) {
            return vec![task];
        }
        if needle.len() < 4 {
            return Vec::new();
        }
        self.state.todos.iter().filter(|t| t.id.ends_with(needle)).collect()
    }

    /// The derived view under the current view state
    pub fn visible(&self) -> Vec<&Task> {
        filter::derive(&self.state.todos, &self.state.view)
    }

    pub fn stats(&self) -> Stats {
        Stats::compute(&self.state.todos, self.now())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task at the front of the collection; `None` if text is blank
    pub fn add(&mut self, text: &str, options: TaskOptions) -> Option<String> {
        let Some(text) = clean_text(text) else {
            debug!("Ignoring task with empty text");
            return None;
        };

        let id = self.fresh_id();
        let task = Task::new(id.clone(), text, options, self.now());
        self.state.todos.insert(0, task);
        self.persist();

        debug!(id = %id, "Added task");
        Some(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.state.todos.len();
        self.state.todos.retain(|t| t.id != id);
        if self.state.todos.len() == before {
            debug!(id, "Task not found, ignoring");
            return false;
        }
        self.persist();
        true
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        self.mutate_task(id, |task, now| task.set_completed(!task.completed, now))
    }

    /// Replace the text; blank text is ignored
    pub fn update_text(&mut self, id: &str, text: &str) -> bool {
        let Some(text) = clean_text(text) else {
            debug!(id, "Ignoring empty text update");
            return false;
        };
        self.mutate_task(id, |task, now| {
            task.text = text;
            task.touch(now);
        })
    }

    pub fn update_priority(&mut self, id: &str, priority: Priority) -> bool {
        self.mutate_task(id, |task, now| {
            task.priority = priority;
            task.touch(now);
        })
    }

    pub fn update_category(&mut self, id: &str, category: Category) -> bool {
        self.mutate_task(id, |task, now| {
            task.category = category;
            task.touch(now);
        })
    }

    pub fn update_status(&mut self, id: &str, status: Status) -> bool {
        self.mutate_task(id, |task, now| task.set_status(status, now))
    }

    /// Apply several field changes at once
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> bool {
        let patch = patch.without_blank_text();
        if patch.is_empty() {
            debug!(id, "Ignoring empty patch");
            return false;
        }
        self.mutate_task(id, |task, now| {
            task.apply(patch, now);
        })
    }

    /// Copy a task as a new pending task with " (Copy)" appended to its text
    pub fn duplicate(&mut self, id: &str) -> Option<String> {
        let Some(original) = self.get(id) else {
            debug!(id, "Task not found, ignoring");
            return None;
        };

        let now = self.now();
        let copy = Task {
            id: self.fresh_id(),
            text: format!("{} (Copy)", original.text),
            completed: false,
            status: Status::Pending,
            created_at: now,
            updated_at: now,
            ..original.clone()
        };

        let new_id = copy.id.clone();
        self.state.todos.insert(0, copy);
        self.persist();
        Some(new_id)
    }

    /// Complete every task, or reopen all of them if all are already complete
    pub fn toggle_all(&mut self) -> bool {
        if self.state.todos.is_empty() {
            return false;
        }

        let complete = !self.state.todos.iter().all(|t| t.completed);
        let now = self.now();
        for task in &mut self.state.todos {
            task.set_completed(complete, now);
        }
        self.persist();
        true
    }

    /// Remove completed tasks, returning how many were removed
    pub fn clear_completed(&mut self) -> usize {
        let before = self.state.todos.len();
        self.state.todos.retain(|t| !t.completed);
        let removed = before - self.state.todos.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Remove every task, returning how many were removed
    pub fn clear_all(&mut self) -> usize {
        let removed = self.state.todos.len();
        if removed > 0 {
            self.state.todos.clear();
            self.persist();
        }
        removed
    }

    // ========================================================================
    // View state
    // ========================================================================

    fn update_view(&mut self, f: impl FnOnce(&mut ViewState)) {
        let before = self.state.view.clone();
        f(&mut self.state.view);
        if self.state.view != before {
            self.persist();
        }
    }

    pub fn set_filter(&mut self, filter: CompletionFilter) {
        self.update_view(|v| v.filter = filter);
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        self.update_view(|v| v.search_query = query);
    }

    pub fn set_category(&mut self, category: Selector<Category>) {
        self.update_view(|v| v.category = category);
    }

    pub fn set_priority(&mut self, priority: Selector<Priority>) {
        self.update_view(|v| v.priority = priority);
    }

    pub fn set_sort_by(&mut self, sort_by: SortKey) {
        self.update_view(|v| v.sort_by = sort_by);
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) {
        self.update_view(|v| v.sort_order = sort_order);
    }

    /// Replace the whole view state
    pub fn set_view(&mut self, view: ViewState) {
        self.update_view(|v| *v = view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{FileBlobStore, MemoryBlobStore};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Store whose clock advances by one millisecond per reading
    fn ticking_store(blobs: Box<dyn BlobStore>) -> Store {
        let tick = Rc::new(Cell::new(1_000i64));
        Store::open(blobs, DEFAULT_KEY).with_clock(move || {
            let now = tick.get();
            tick.set(now + 1);
            now
        })
    }

    fn memory_store() -> Store {
        ticking_store(Box::new(MemoryBlobStore::default()))
    }

    /// Blob store that refuses every write
    struct ReadOnlyBlobs;

    impl BlobStore for ReadOnlyBlobs {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn put(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(eyre::eyre!("read-only"))
        }

        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(eyre::eyre!("read-only"))
        }
    }

    /// Blob store holding a fixed value
    struct FixedBlobs(String);

    impl BlobStore for FixedBlobs {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(Some(self.0.clone()))
        }

        fn put(&mut self, _key: &str, value: &str) -> Result<()> {
            self.0 = value.to_string();
            Ok(())
        }

        fn remove(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_add_rejects_blank_text() {
        let mut store = memory_store();
        assert!(store.add("", TaskOptions::default()).is_none());
        assert!(store.add("   ", TaskOptions::default()).is_none());
        assert!(store.is_empty());

        let id = store.add("  x ", TaskOptions::default()).unwrap();
        assert_eq!(store.get(&id).unwrap().text, "x");
    }

    #[test]
    fn test_add_prepends() {
        let mut store = memory_store();
        store.add("first", TaskOptions::default());
        store.add("second", TaskOptions::default());

        let texts: Vec<&str> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
        assert_ne!(store.tasks()[0].id, store.tasks()[1].id);
    }

    #[test]
    fn test_add_with_options() {
        let mut store = memory_store();
        let id = store
            .add(
                "Gym",
                TaskOptions::default()
                    .priority(Priority::High)
                    .category(Category::Health)
                    .tags(["fitness"]),
            )
            .unwrap();

        let task = store.get(&id).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.category, Category::Health);
        assert_eq!(task.tags, vec!["fitness".to_string()]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = memory_store();
        let id = store.add("x", TaskOptions::default()).unwrap();

        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_toggle_twice_restores_and_updates_timestamp() {
        let mut store = memory_store();
        let id = store.add("x", TaskOptions::default()).unwrap();
        let created = store.get(&id).unwrap().updated_at;

        assert!(store.toggle(&id));
        let task = store.get(&id).unwrap();
        assert!(task.completed);
        assert_eq!(task.status, Status::Completed);
        let first = task.updated_at;
        assert!(first > created);

        assert!(store.toggle(&id));
        let task = store.get(&id).unwrap();
        assert!(!task.completed);
        assert_eq!(task.status, Status::Pending);
        assert!(task.updated_at > first);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut store = memory_store();
        store.add("x", TaskOptions::default());
        let before = store.state().clone();

        assert!(!store.toggle("missing"));
        assert!(!store.update_text("missing", "y"));
        assert!(!store.update_priority("missing", Priority::High));
        assert!(!store.update_status("missing", Status::Completed));
        assert!(store.duplicate("missing").is_none());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_update_text() {
        let mut store = memory_store();
        let id = store.add("old", TaskOptions::default()).unwrap();

        assert!(!store.update_text(&id, "  "));
        assert_eq!(store.get(&id).unwrap().text, "old");

        assert!(store.update_text(&id, " new "));
        assert_eq!(store.get(&id).unwrap().text, "new");
    }

    #[test]
    fn test_update_fields_bump_updated_at() {
        let mut store = memory_store();
        let id = store.add("x", TaskOptions::default()).unwrap();
        let mut last = store.get(&id).unwrap().updated_at;

        store.update_priority(&id, Priority::Low);
        let task = store.get(&id).unwrap();
        assert_eq!(task.priority, Priority::Low);
        assert!(task.updated_at > last);
        last = task.updated_at;

        store.update_category(&id, Category::Shopping);
        let task = store.get(&id).unwrap();
        assert_eq!(task.category, Category::Shopping);
        assert!(task.updated_at > last);
        last = task.updated_at;

        store.update_status(&id, Status::Completed);
        let task = store.get(&id).unwrap();
        assert!(task.completed);
        assert!(task.updated_at > last);

        store.update_status(&id, Status::InProgress);
        let task = store.get(&id).unwrap();
        assert!(!task.completed);
        assert_eq!(task.status, Status::InProgress);
    }

    #[test]
    fn test_update_patch() {
        let mut store = memory_store();
        let id = store.add("x", TaskOptions::default()).unwrap();

        assert!(store.update(
            &id,
            TaskPatch {
                description: Some("details".to_string()),
                tags: Some(vec!["a".to_string()]),
                ..Default::default()
            }
        ));
        let task = store.get(&id).unwrap();
        assert_eq!(task.description, "details");
        assert_eq!(task.tags, vec!["a".to_string()]);
    }

    #[test]
    fn test_duplicate() {
        let mut store = memory_store();
        let id = store
            .add(
                "Report",
                TaskOptions::default()
                    .priority(Priority::High)
                    .description("quarterly"),
            )
            .unwrap();
        store.toggle(&id);
        let original = store.get(&id).unwrap().clone();

        let copy_id = store.duplicate(&id).unwrap();
        assert_ne!(copy_id, id);

        let copy = store.get(&copy_id).unwrap();
        assert_eq!(copy.text, "Report (Copy)");
        assert!(!copy.completed);
        assert_eq!(copy.status, Status::Pending);
        assert_eq!(copy.priority, Priority::High);
        assert_eq!(copy.description, "quarterly");
        assert!(copy.created_at > original.created_at);

        // Original untouched, copy at the front
        assert_eq!(store.get(&id).unwrap(), &original);
        assert_eq!(store.tasks()[0].id, copy_id);
    }

    #[test]
    fn test_toggle_all() {
        let mut store = memory_store();
        let a = store.add("a", TaskOptions::default()).unwrap();
        store.add("b", TaskOptions::default());
        store.toggle(&a);

        // Mixed -> all complete
        assert!(store.toggle_all());
        assert!(store.tasks().iter().all(|t| t.completed && t.status == Status::Completed));

        // All complete -> all incomplete
        assert!(store.toggle_all());
        assert!(store.tasks().iter().all(|t| !t.completed && t.status == Status::Pending));

        // None complete -> all complete
        assert!(store.toggle_all());
        assert!(store.tasks().iter().all(|t| t.completed));
    }

    #[test]
    fn test_toggle_all_empty() {
        let mut store = memory_store();
        assert!(!store.toggle_all());
    }

    #[test]
    fn test_clear_completed_and_all() {
        let mut store = memory_store();
        let a = store.add("a", TaskOptions::default()).unwrap();
        store.add("b", TaskOptions::default());
        store.add("c", TaskOptions::default());
        store.toggle(&a);

        assert_eq!(store.clear_completed(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(&a).is_none());
        assert_eq!(store.clear_completed(), 0);

        assert_eq!(store.clear_all(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_find_matching() {
        let mut store = memory_store();
        let id = store.add("x", TaskOptions::default()).unwrap();
        store.add("y", TaskOptions::default());

        assert_eq!(store.find_matching(&id).len(), 1);
        let tail = &id[id.len() - 8..];
        let found = store.find_matching(tail);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);

        assert!(store.find_matching("ab").is_empty());
    }

    #[test]
    fn test_visible_uses_view_state() {
        let mut store = memory_store();
        store.add(
            "Buy milk",
            TaskOptions::default()
                .category(Category::Work)
                .priority(Priority::Low),
        );
        let mom = store
            .add(
                "Call mom",
                TaskOptions::default()
                    .category(Category::Personal)
                    .priority(Priority::High),
            )
            .unwrap();
        store.toggle(&mom);

        store.set_filter(CompletionFilter::Active);
        let visible: Vec<&str> = store.visible().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(visible, vec!["Buy milk"]);

        store.set_filter(CompletionFilter::All);
        store.set_search_query("milk");
        let visible: Vec<&str> = store.visible().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(visible, vec!["Buy milk"]);

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.high_priority, 1);
    }

    #[test]
    fn test_state_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let id;
        let saved;
        {
            let mut store = ticking_store(Box::new(FileBlobStore::open(temp.path()).unwrap()));
            id = store
                .add("Persist me", TaskOptions::default().due_date(99).tags(["x"]))
                .unwrap();
            store.toggle(&id);
            store.set_sort_by(SortKey::Priority);
            store.set_category(Selector::Only(Category::Work));
            saved = store.state().clone();
        }

        let store = Store::open(Box::new(FileBlobStore::open(temp.path()).unwrap()), DEFAULT_KEY);
        assert_eq!(store.state(), &saved);
        assert!(store.get(&id).unwrap().completed);
        assert_eq!(store.view().sort_by, SortKey::Priority);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut store = memory_store();
        store.add("a", TaskOptions::default().priority(Priority::High));
        store.add("b", TaskOptions::default().due_date(5).description("d"));
        store.set_sort_order(SortOrder::Asc);

        let blob = encode_state(store.state()).unwrap();
        assert!(blob.contains("\"version\":1"));
        let decoded = decode_state(&blob).unwrap();
        assert_eq!(&decoded, store.state());
    }

    #[test]
    fn test_corrupt_blob_starts_empty() {
        let store = Store::open(Box::new(FixedBlobs("{not json".to_string())), DEFAULT_KEY);
        assert!(store.is_empty());
        assert_eq!(store.view(), &ViewState::default());
    }

    #[test]
    fn test_newer_version_starts_empty() {
        let blob = r#"{"version":99,"state":{"todos":[]}}"#.to_string();
        let store = Store::open(Box::new(FixedBlobs(blob)), DEFAULT_KEY);
        assert!(store.is_empty());
    }

    #[test]
    fn test_legacy_records_load() {
        let blob = r#"{"version":1,"state":{"todos":[
            {"id":"a","text":"Old","completed":true,"created_at":1,"updated_at":1}
        ]}}"#
            .to_string();
        let store = Store::open(Box::new(FixedBlobs(blob)), DEFAULT_KEY);
        let task = store.get("a").unwrap();
        assert_eq!(task.status, Status::Completed);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let blob = r#"{"version":1,"state":{"todos":[
            {"id":"dup","text":"A","created_at":2,"updated_at":2},
            {"id":"other","text":"C","created_at":1,"updated_at":1},
            {"id":"dup","text":"B","created_at":1,"updated_at":1}
        ]}}"#
            .to_string();
        let mut store = Store::open(Box::new(FixedBlobs(blob)), DEFAULT_KEY);
        let texts: Vec<_> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["A", "C"]);

        assert!(store.toggle("dup"));
        assert!(store.get("dup").unwrap().completed);

        assert!(store.remove("dup"));
        assert_eq!(store.len(), 1);
        assert!(!store.remove("dup"));
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let mut store = Store::open(Box::new(ReadOnlyBlobs), DEFAULT_KEY);
        let id = store.add("still works", TaskOptions::default()).unwrap();
        assert!(store.toggle(&id));
        assert_eq!(store.len(), 1);
        assert!(store.save().is_err());
    }

    /// Blob store that records every write
    #[derive(Default)]
    struct RecordingBlobs {
        writes: Rc<Cell<usize>>,
        last: Rc<RefCell<Option<String>>>,
    }

    impl BlobStore for RecordingBlobs {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(self.last.borrow().clone())
        }

        fn put(&mut self, _key: &str, value: &str) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            *self.last.borrow_mut() = Some(value.to_string());
            Ok(())
        }

        fn remove(&mut self, _key: &str) -> Result<()> {
            *self.last.borrow_mut() = None;
            Ok(())
        }
    }

    #[test]
    fn test_every_change_saves_and_noops_do_not() {
        let blobs = RecordingBlobs::default();
        let writes = Rc::clone(&blobs.writes);
        let last = Rc::clone(&blobs.last);
        let mut store = Store::open(Box::new(blobs), DEFAULT_KEY);
        let saved = || decode_state(last.borrow().as_deref().unwrap()).unwrap();

        let id = store.add("x", TaskOptions::default()).unwrap();
        assert_eq!(writes.get(), 1);

        store.update_priority(&id, Priority::High);
        assert_eq!(writes.get(), 2);
        assert_eq!(saved().todos[0].priority, Priority::High);

        store.set_filter(CompletionFilter::Completed);
        assert_eq!(writes.get(), 3);
        assert_eq!(saved().view.filter, CompletionFilter::Completed);

        // Nothing changes, nothing written
        store.add("  ", TaskOptions::default());
        store.toggle("missing");
        store.set_filter(CompletionFilter::Completed);
        assert_eq!(store.clear_completed(), 0);
        assert_eq!(writes.get(), 3);

        // A patch whose only field is blank text is a no-op too
        let updated_at = store.get(&id).unwrap().updated_at;
        let blank = TaskPatch {
            text: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!store.update(&id, blank));
        assert!(!store.update(&id, TaskPatch::default()));
        assert_eq!(store.get(&id).unwrap().updated_at, updated_at);
        assert_eq!(writes.get(), 3);

        store.clear_all();
        assert_eq!(writes.get(), 4);
        assert!(saved().todos.is_empty());
    }
}
