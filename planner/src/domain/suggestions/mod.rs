//! Debounced search-ahead lookups for the origin and destination fields.
//!
//! Each field owns one cancellable scheduled task. New input for a field
//! aborts that field's pending lookup and schedules a fresh one after the
//! quiet period; the other field is never touched. Results are published on
//! a per-field [`watch`] channel, and a lookup failure publishes an empty
//! list.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::domain::ports::{AddressSuggestion, AddressSuggestionSource};

/// Quiet period after the last keystroke before a lookup is issued.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);
/// Maximum number of candidates requested per lookup.
pub const DEFAULT_MAX_RESULTS: usize = 6;

/// Input field a suggestion list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionField {
    /// Start address.
    Origin,
    /// End address.
    Destination,
}

impl SuggestionField {
    /// Lowercase field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Destination => "destination",
        }
    }
}

impl fmt::Display for SuggestionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and size knobs for [`AddressSuggestionDebouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Delay after the most recent input before looking up.
    pub quiet_period: Duration,
    /// Upper bound on the published list length.
    pub max_results: usize,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Default)]
struct PendingLookup {
    generation: u64,
    task: Option<AbortHandle>,
}

impl PendingLookup {
    /// Invalidate whatever is scheduled and return the new generation.
    fn supersede(&mut self) -> u64 {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

struct FieldChannel {
    pending: Arc<Mutex<PendingLookup>>,
    results: watch::Sender<Vec<AddressSuggestion>>,
}

impl FieldChannel {
    fn new() -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self {
            pending: Arc::new(Mutex::new(PendingLookup::default())),
            results,
        }
    }
}

fn lock(pending: &Mutex<PendingLookup>) -> MutexGuard<'_, PendingLookup> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-field debounced suggestion issuer.
pub struct AddressSuggestionDebouncer {
    source: Arc<dyn AddressSuggestionSource>,
    settings: DebounceSettings,
    origin: FieldChannel,
    destination: FieldChannel,
}

impl AddressSuggestionDebouncer {
    /// Create a debouncer backed by `source`.
    pub fn new(source: Arc<dyn AddressSuggestionSource>, settings: DebounceSettings) -> Self {
        Self {
            source,
            settings,
            origin: FieldChannel::new(),
            destination: FieldChannel::new(),
        }
    }

    /// Receive the suggestion lists published for `field`.
    pub fn subscribe(&self, field: SuggestionField) -> watch::Receiver<Vec<AddressSuggestion>> {
        self.channel(field).results.subscribe()
    }

    /// Latest list published for `field`.
    pub fn current(&self, field: SuggestionField) -> Vec<AddressSuggestion> {
        self.channel(field).results.borrow().clone()
    }

    /// Record new text for `field`.
    ///
    /// Blank text publishes an empty list at once and schedules nothing.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, like [`tokio::spawn`].
    pub fn on_input(&self, field: SuggestionField, text: &str) {
        let channel = self.channel(field);
        let mut pending = lock(&channel.pending);
        let generation = pending.supersede();

        let text = text.trim().to_owned();
        if text.is_empty() {
            channel.results.send_replace(Vec::new());
            debug!(field = %field, "blank input; suggestions cleared");
            return;
        }

        let lookup = ScheduledLookup {
            field,
            text,
            generation,
            settings: self.settings,
            source: Arc::clone(&self.source),
            pending: Arc::clone(&channel.pending),
            results: channel.results.clone(),
        };
        let task = tokio::spawn(lookup.run());
        pending.task = Some(task.abort_handle());
    }

    /// Cancel pending lookups for both fields.
    pub fn shutdown(&self) {
        for channel in [&self.origin, &self.destination] {
            lock(&channel.pending).supersede();
        }
    }

    fn channel(&self, field: SuggestionField) -> &FieldChannel {
        match field {
            SuggestionField::Origin => &self.origin,
            SuggestionField::Destination => &self.destination,
        }
    }
}

impl Drop for AddressSuggestionDebouncer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct ScheduledLookup {
    field: SuggestionField,
    text: String,
    generation: u64,
    settings: DebounceSettings,
    source: Arc<dyn AddressSuggestionSource>,
    pending: Arc<Mutex<PendingLookup>>,
    results: watch::Sender<Vec<AddressSuggestion>>,
}

impl ScheduledLookup {
    async fn run(self) {
        tokio::time::sleep(self.settings.quiet_period).await;
        debug!(field = %self.field, text = %self.text, "issuing suggestion lookup");
        let suggestions = match self
            .source
            .suggest(&self.text, self.settings.max_results)
            .await
        {
            Ok(mut suggestions) => {
                suggestions.truncate(self.settings.max_results);
                suggestions
            }
            Err(error) => {
                warn!(
                    field = %self.field,
                    kind = error.kind(),
                    error = %error,
                    "suggestion lookup failed"
                );
                Vec::new()
            }
        };

        let mut pending = lock(&self.pending);
        if pending.generation != self.generation {
            debug!(field = %self.field, "discarding superseded suggestions");
            return;
        }
        pending.task = None;
        self.results.send_replace(suggestions);
    }
}
