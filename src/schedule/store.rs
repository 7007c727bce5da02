//! Schedule persistence and the owned collection.
//!
//! The [`ScheduleStore`] trait is the persistence bridge: bulk load/save of
//! the schedule set as one opaque blob. [`ScheduleBook`] is the explicitly
//! owned collection the engine works on: every mutation normalizes,
//! persists the whole set once, and broadcasts a [`StoreEvent`] so that a
//! separately-held collection elsewhere in the process can reload instead
//! of operating on stale data.

use crate::error::{EngineError, Result};
use crate::schedule::model::Schedule;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// Capacity of the store-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Emitted whenever the schedule set is mutated and persisted.
///
/// Carries the mutator's origin id; subscribers ignore events they
/// originated themselves, which is what prevents reload storms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    /// Identity of the component that performed the mutation.
    pub origin: Uuid,
}

/// Persistence bridge for the schedule set.
pub trait ScheduleStore: Send + Sync {
    /// Load the full schedule set. Missing or corrupt data yields an empty
    /// set, never an error.
    fn load(&self) -> Vec<Schedule>;

    /// Persist the full schedule set, replacing whatever was stored.
    fn save_all(&self, schedules: &[Schedule]) -> Result<()>;
}

/// Persisted store state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    /// Schema version.
    #[serde(default = "default_state_version")]
    version: u8,
    /// Persisted schedules.
    #[serde(default)]
    schedules: Vec<Schedule>,
}

fn default_state_version() -> u8 {
    2
}

/// JSON-file-backed schedule store.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store writing to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default state file location under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("koyomi").join("schedules.json"))
    }
}

impl ScheduleStore for JsonFileStore {
    fn load(&self) -> Vec<Schedule> {
        let bytes = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("cannot read schedule state: {e}");
                return Vec::new();
            }
        };

        // Current versioned shape first, then the bare-array blob the
        // original application wrote.
        let mut schedules = match serde_json::from_slice::<StoreState>(&bytes) {
            Ok(state) => state.schedules,
            Err(_) => match serde_json::from_slice::<Vec<Schedule>>(&bytes) {
                Ok(schedules) => schedules,
                Err(e) => {
                    warn!("cannot parse schedule state, starting empty: {e}");
                    return Vec::new();
                }
            },
        };

        for schedule in &mut schedules {
            schedule.normalize();
        }
        debug!(
            count = schedules.len(),
            path = %self.path.display(),
            "loaded schedule state"
        );
        schedules
    }

    fn save_all(&self, schedules: &[Schedule]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EngineError::Store(format!("cannot create state dir: {e}")))?;
        }

        let state = StoreState {
            version: default_state_version(),
            schedules: schedules.to_vec(),
        };
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| EngineError::Store(format!("cannot serialize state: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| EngineError::Store(format!("cannot write state: {e}")))?;
        Ok(())
    }
}

/// In-memory schedule store, for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    schedules: Mutex<Vec<Schedule>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for MemoryStore {
    fn load(&self) -> Vec<Schedule> {
        self.schedules.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn save_all(&self, schedules: &[Schedule]) -> Result<()> {
        let mut stored = self
            .schedules
            .lock()
            .map_err(|e| EngineError::Store(format!("store lock poisoned: {e}")))?;
        *stored = schedules.to_vec();
        Ok(())
    }
}

/// The owned schedule collection.
///
/// All reads and writes go through accessor/mutator methods; mutators
/// normalize, persist and emit in one step, so no caller can leave the
/// collection and the blob out of sync.
pub struct ScheduleBook {
    schedules: Vec<Schedule>,
    store: Arc<dyn ScheduleStore>,
    events: broadcast::Sender<StoreEvent>,
}

impl ScheduleBook {
    /// Load the collection from the persistence bridge.
    pub fn load(store: Arc<dyn ScheduleStore>) -> Self {
        let schedules = store.load();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            schedules,
            store,
            events,
        }
    }

    /// Subscribe to store-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Returns the schedules, read-only.
    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Returns a schedule by id.
    pub fn get(&self, id: u64) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.id == id)
    }

    /// Mutable iteration for the evaluation pass. Callers are expected to
    /// follow up with [`persist`](Self::persist) when anything changed.
    pub(crate) fn schedules_mut(&mut self) -> impl Iterator<Item = &mut Schedule> {
        self.schedules.iter_mut()
    }

    /// Add a schedule. Returns its id.
    pub fn add(&mut self, mut schedule: Schedule, origin: Uuid) -> u64 {
        schedule.normalize();
        schedule.reset_notification_state();
        let id = schedule.id;
        self.schedules.push(schedule);
        self.persist(origin);
        id
    }

    /// Replace a schedule in place, matched by id. Notification state is
    /// forcibly reset because editing implies the occurrence contract may
    /// have changed. Returns `false` when the id is unknown.
    pub fn replace(&mut self, mut updated: Schedule, origin: Uuid) -> bool {
        updated.normalize();
        updated.reset_notification_state();
        let Some(existing) = self.schedules.iter_mut().find(|s| s.id == updated.id) else {
            return false;
        };
        *existing = updated;
        self.persist(origin);
        true
    }

    /// Remove a schedule by id. Returns `false` when the id is unknown.
    pub fn remove(&mut self, id: u64, origin: Uuid) -> bool {
        let before = self.schedules.len();
        self.schedules.retain(|s| s.id != id);
        let removed = self.schedules.len() != before;
        if removed {
            self.persist(origin);
        }
        removed
    }

    /// Append a batch of imported schedules. Returns how many were added.
    pub fn extend(&mut self, batch: Vec<Schedule>, origin: Uuid) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let added = batch.len();
        for mut schedule in batch {
            schedule.normalize();
            schedule.reset_notification_state();
            self.schedules.push(schedule);
        }
        self.persist(origin);
        added
    }

    /// Drop the in-memory set and reload from the persistence bridge.
    pub fn reload(&mut self) {
        self.schedules = self.store.load();
        debug!(count = self.schedules.len(), "reloaded schedule collection");
    }

    /// Broadcast a change without saving.
    ///
    /// For collaborators (e.g. a paired voice-command module) that already
    /// wrote the blob through their own path and only need other holders of
    /// the collection to reload.
    pub fn announce(&self, origin: Uuid) {
        let _ = self.events.send(StoreEvent { origin });
    }

    /// Persist the whole collection once and broadcast the change.
    ///
    /// Write failures are logged, not retried; the in-memory collection
    /// stays authoritative and the engine continues degraded.
    pub fn persist(&self, origin: Uuid) {
        if let Err(e) = self.store.save_all(&self.schedules) {
            warn!("cannot persist schedules: {e}");
        }
        let _ = self.events.send(StoreEvent { origin });
    }
}
