//! Synchronization driver.
//!
//! [`QueryState`] binds a [`Form`] to a [`Host`] that owns the live query
//! string. Two events drive it:
//!
//! - **read**: decode every field from the host's current snapshot. When a
//!   field with a default has no entry, one deferred write is handed to the
//!   [`Scheduler`]; the host runs it after the read has completed and
//!   before its next read.
//! - **set**: rebuild the complete query string with the new value and
//!   commit it to the host in one step.
//!
//! Setter calls are not serialized against each other. Each rebuild reads
//! the snapshot current when it runs, so two sets issued against the same
//! stale snapshot keep only the last one's view of the other fields.
//!
//! # Example
//! ```rust
//! use querystate::{number, Form, MemoryHost, QueryState, QueueScheduler};
//! use serde_json::json;
//!
//! let form = Form::builder()
//!     .field("page", number().min(1.0).default(1.0).unwrap())
//!     .build()
//!     .unwrap();
//! let mut state = QueryState::new(form, MemoryHost::new("?q=x"), QueueScheduler::new());
//!
//! state.read();
//! assert_eq!(state.flush(), 1);
//! assert_eq!(state.host().current().to_string(), "q=x&page=1");
//!
//! state.set("page", &json!(3)).unwrap();
//! assert_eq!(state.host().current().to_string(), "page=3");
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::FormError;
use crate::form::{Form, FormValues};
use crate::snapshot::QuerySnapshot;

/// How a new snapshot replaces the old one in the host's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Add a history entry (user-initiated changes).
    Push,
    /// Overwrite the current entry (default back-fill).
    Replace,
}

/// Owner of the live query string.
pub trait Host {
    /// The current wire text.
    fn snapshot(&self) -> QuerySnapshot;

    /// Replace the wire text with `next`.
    fn commit(&mut self, next: QuerySnapshot, mode: CommitMode);
}

/// A write that must run after the current read completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredWrite {
    /// Write the defaults of these fields if they are still absent.
    ApplyDefaults { fields: Vec<String> },
}

/// Deferral primitive supplied by the host.
pub trait Scheduler {
    /// Queue `write`; returns false when it could not be queued.
    fn schedule(&mut self, write: DeferredWrite) -> bool;
}

/// Queue drained by the host at its post-read hook.
#[derive(Debug, Default)]
pub struct QueueScheduler {
    queue: VecDeque<DeferredWrite>,
}

impl QueueScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every pending write in scheduling order.
    pub fn drain(&mut self) -> Vec<DeferredWrite> {
        self.queue.drain(..).collect()
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&mut self, write: DeferredWrite) -> bool {
        self.queue.push_back(write);
        true
    }
}

/// Sends deferred writes to an async event loop.
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<DeferredWrite>,
}

impl ChannelScheduler {
    /// A scheduler and the receiver the event loop polls.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeferredWrite>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Scheduler for ChannelScheduler {
    fn schedule(&mut self, write: DeferredWrite) -> bool {
        if self.tx.send(write).is_err() {
            warn!("Deferred write dropped: receiver closed");
            return false;
        }
        true
    }
}

/// In-memory host that records every commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    current: QuerySnapshot,
    history: Vec<(QuerySnapshot, CommitMode)>,
}

impl MemoryHost {
    pub fn new(query: &str) -> Self {
        Self {
            current: QuerySnapshot::parse(query),
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &QuerySnapshot {
        &self.current
    }

    /// Every commit so far, oldest first.
    pub fn history(&self) -> &[(QuerySnapshot, CommitMode)] {
        &self.history
    }

    /// Replace the wire text from outside the driver (navigation).
    pub fn navigate(&mut self, query: &str) {
        self.current = QuerySnapshot::parse(query);
    }
}

impl Host for MemoryHost {
    fn snapshot(&self) -> QuerySnapshot {
        self.current.clone()
    }

    fn commit(&mut self, next: QuerySnapshot, mode: CommitMode) {
        self.history.push((next.clone(), mode));
        self.current = next;
    }
}

/// A form bound to a host and a scheduler.
#[derive(Debug)]
pub struct QueryState<H: Host, S: Scheduler> {
    form: Arc<Form>,
    host: H,
    scheduler: S,
    defaults_pending: bool,
}

impl<H: Host, S: Scheduler> QueryState<H, S> {
    pub fn new(form: impl Into<Arc<Form>>, host: H, scheduler: S) -> Self {
        Self {
            form: form.into(),
            host,
            scheduler,
            defaults_pending: false,
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Returns true while a default write is scheduled but not yet applied.
    pub fn defaults_pending(&self) -> bool {
        self.defaults_pending
    }

    /// Decode every field, scheduling the default write if one is needed.
    ///
    /// Never commits to the host.
    pub fn read(&mut self) -> FormValues {
        self.read_at(Utc::now())
    }

    pub fn read_at(&mut self, now: DateTime<Utc>) -> FormValues {
        let snapshot = self.host.snapshot();
        if !self.defaults_pending {
            let missing = self.form.missing_defaults_at(&snapshot, now);
            if !missing.is_empty() {
                let fields: Vec<String> = missing.into_iter().map(str::to_string).collect();
                debug!(fields = ?fields, "Scheduled default write");
                // a dropped write is retried on the next read
                self.defaults_pending = self
                    .scheduler
                    .schedule(DeferredWrite::ApplyDefaults { fields });
            }
        }
        self.form.read_at(&snapshot, now)
    }

    /// Run a deferred write against the host's current snapshot.
    ///
    /// Returns true when something was committed.
    pub fn apply(&mut self, write: DeferredWrite) -> bool {
        self.apply_at(write, Utc::now())
    }

    pub fn apply_at(&mut self, write: DeferredWrite, now: DateTime<Utc>) -> bool {
        match write {
            DeferredWrite::ApplyDefaults { fields } => {
                self.defaults_pending = false;
                let snapshot = self.host.snapshot();
                // fields set since scheduling are left alone
                match self.form.apply_defaults_at(&snapshot, now) {
                    Some(next) => {
                        debug!(scheduled = ?fields, "Applied deferred defaults");
                        self.host.commit(next, CommitMode::Replace);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Set one field and commit the rebuilt query string.
    pub fn set(&mut self, key: &str, input: &serde_json::Value) -> Result<(), FormError> {
        self.set_at(key, input, Utc::now())
    }

    pub fn set_at(
        &mut self,
        key: &str,
        input: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), FormError> {
        let snapshot = self.host.snapshot();
        let next = self.form.rebuild_at(&snapshot, key, input, now)?;
        self.host.commit(next, CommitMode::Push);
        Ok(())
    }
}

impl<H: Host> QueryState<H, QueueScheduler> {
    /// Apply every queued write. Returns the number of commits made.
    pub fn flush(&mut self) -> usize {
        self.flush_at(Utc::now())
    }

    pub fn flush_at(&mut self, now: DateTime<Utc>) -> usize {
        let mut commits = 0;
        for write in self.scheduler.drain() {
            if self.apply_at(write, now) {
                commits += 1;
            }
        }
        commits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{number, string};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn form() -> Form {
        Form::builder()
            .field("name", string().default("John").unwrap())
            .field("page", number().min(1.0).default(1.0).unwrap())
            .field("q", string())
            .build_at(now())
            .unwrap()
    }

    #[test]
    fn test_read_schedules_once() {
        let mut state = QueryState::new(form(), MemoryHost::new(""), QueueScheduler::new());
        state.read_at(now());
        state.read_at(now());
        assert_eq!(state.scheduler_mut().len(), 1);
        assert!(state.host().history().is_empty());
    }

    #[test]
    fn test_no_schedule_when_complete() {
        let mut state = QueryState::new(
            form(),
            MemoryHost::new("name=Ann&page=2"),
            QueueScheduler::new(),
        );
        state.read_at(now());
        assert!(state.scheduler_mut().is_empty());
    }

    #[test]
    fn test_deferred_write_replaces() {
        let mut state = QueryState::new(form(), MemoryHost::new("q=x"), QueueScheduler::new());
        let values = state.read_at(now());
        assert_eq!(values.get("page"), Some(&crate::Value::Single(1.0.into())));
        assert_eq!(state.flush_at(now()), 1);
        assert_eq!(
            state.host().history(),
            &[(QuerySnapshot::parse("q=x&name=John&page=1"), CommitMode::Replace)]
        );
    }

    #[test]
    fn test_deferred_write_keeps_fields_set_meanwhile() {
        let mut state = QueryState::new(form(), MemoryHost::new(""), QueueScheduler::new());
        state.read_at(now());
        state.set_at("name", &json!("Ann"), now()).unwrap();
        state.flush_at(now());
        assert_eq!(state.host().current().get("name"), Some("Ann"));
        assert_eq!(state.host().current().get("page"), Some("1"));
    }

    #[test]
    fn test_set_pushes_full_rebuild() {
        let mut state = QueryState::new(
            form(),
            MemoryHost::new("name=Ann&utm=1"),
            QueueScheduler::new(),
        );
        state.set_at("q", &json!("rust"), now()).unwrap();
        let (last, mode) = state.host().history().last().unwrap();
        assert_eq!(*mode, CommitMode::Push);
        assert_eq!(last.to_string(), "name=Ann&page=1&q=rust");
        assert_eq!(
            state.set_at("other", &json!(1), now()),
            Err(FormError::UnknownField("other".into()))
        );
    }

    #[test]
    fn test_apply_after_navigation_is_noop() {
        let mut state = QueryState::new(form(), MemoryHost::new(""), QueueScheduler::new());
        state.read_at(now());
        state.host_mut().navigate("name=Bo&page=5");
        assert_eq!(state.flush_at(now()), 0);
        assert!(state.host().history().is_empty());
    }

    #[test]
    fn test_channel_scheduler_closed_receiver() {
        let (mut scheduler, rx) = ChannelScheduler::new();
        drop(rx);
        assert!(!scheduler.schedule(DeferredWrite::ApplyDefaults { fields: vec![] }));
    }

    #[test]
    fn test_dropped_write_is_rescheduled() {
        let (scheduler, rx) = ChannelScheduler::new();
        drop(rx);
        let mut state = QueryState::new(form(), MemoryHost::new(""), scheduler);
        state.read_at(now());
        assert!(!state.defaults_pending());

        let (scheduler, mut rx) = ChannelScheduler::new();
        *state.scheduler_mut() = scheduler;
        state.read_at(now());
        assert!(state.defaults_pending());
        assert!(matches!(
            rx.try_recv(),
            Ok(DeferredWrite::ApplyDefaults { fields }) if fields == vec!["name", "page"]
        ));
    }

    #[test]
    fn test_empty_collection_default_commits_nothing() {
        let form = Form::builder()
            .field("tags", string().array().default(Vec::<String>::new()).unwrap())
            .build_at(now())
            .unwrap();
        let mut state = QueryState::new(form, MemoryHost::new(""), QueueScheduler::new());
        for _ in 0..3 {
            state.read_at(now());
            assert_eq!(state.flush_at(now()), 0);
        }
        assert!(state.scheduler_mut().is_empty());
        assert!(state.host().history().is_empty());
    }

    #[test]
    fn test_collection_defaults_written_once() {
        let form = Form::builder()
            .field("tags", string().array().default(["rust", "wasm"]).unwrap())
            .field("labels", number().set().default([1.0, 2.0]).unwrap())
            .field("empty", string().set().default(Vec::<String>::new()).unwrap())
            .build_at(now())
            .unwrap();
        let mut state = QueryState::new(form, MemoryHost::new("q=x"), QueueScheduler::new());
        for _ in 0..3 {
            state.read_at(now());
            state.flush_at(now());
        }
        assert_eq!(state.host().history().len(), 1);
        let (written, mode) = &state.host().history()[0];
        assert_eq!(*mode, CommitMode::Replace);
        assert_eq!(
            written.to_string(),
            "q=x&tags%5B%5D=rust&tags%5B%5D=wasm&labels%5B%5D=1&labels%5B%5D=2"
        );
    }
}
