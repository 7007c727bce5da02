//! Minute-aligned notification clock.
//!
//! Drives evaluation passes over the schedule collection: resolve each
//! schedule's occurrence, reconcile tracked state, and fire the lead and
//! start stages at most once each per occurrence. A bootstrap pass runs
//! immediately at startup with the lead stage suppressed; only start-stage
//! catch-up is allowed, so a restart never wakes the user with a stale
//! "N minutes left" warning. Subsequent passes are aligned to the minute
//! boundary and repeat on a fixed period.

use crate::config::EngineConfig;
use crate::notify::Notifier;
use crate::schedule::model::NotifyStage;
use crate::schedule::occurrence::{self, Occurrence};
use crate::schedule::store::{ScheduleBook, StoreEvent};
use crate::schedule::tracker;
use crate::speech::{PlaybackQueue, SpeechRequest};
use chrono::{Local, NaiveDateTime, Timelike};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Read-only per-schedule snapshot emitted after each evaluation pass,
/// consumed by a presentation layer.
#[derive(Debug, Clone)]
pub struct TickEntry {
    /// Schedule id.
    pub schedule_id: u64,
    /// Schedule title.
    pub title: String,
    /// Resolved occurrence, `None` when unresolvable this pass.
    pub occurrence: Option<Occurrence>,
    /// Notification stage after the pass.
    pub stage: NotifyStage,
}

/// The periodic evaluation driver.
pub struct NotificationClock {
    book: Arc<Mutex<ScheduleBook>>,
    queue: PlaybackQueue,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    origin: Uuid,
    snapshot_tx: Option<mpsc::UnboundedSender<Vec<TickEntry>>>,
}

impl NotificationClock {
    /// Create a clock over the given collection, queue and notifier.
    pub fn new(
        book: Arc<Mutex<ScheduleBook>>,
        queue: PlaybackQueue,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            book,
            queue,
            notifier,
            config,
            origin: Uuid::new_v4(),
            snapshot_tx: None,
        }
    }

    /// Emit a per-pass snapshot of every schedule over this channel.
    pub fn with_snapshots(mut self, tx: mpsc::UnboundedSender<Vec<TickEntry>>) -> Self {
        self.snapshot_tx = Some(tx);
        self
    }

    /// Identity this clock persists under. Store events carrying this
    /// origin are its own and are not reloaded.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Start the clock loop.
    ///
    /// Runs the bootstrap pass immediately, sleeps to the next minute
    /// boundary, then re-evaluates on the configured period. Store-change
    /// events from other origins reload the collection from the bridge;
    /// they are serviced throughout, including during the alignment sleep,
    /// so a boundary pass never evaluates a stale collection.
    pub fn run(self) -> tokio::task::JoinHandle<()> {
        let mut events = match self.book.lock() {
            Ok(book) => book.subscribe(),
            Err(e) => {
                warn!("schedule collection lock poisoned, clock not started: {e}");
                return tokio::spawn(async {});
            }
        };

        tokio::spawn(async move {
            let now = Local::now().naive_local();
            info!("notification clock started");
            self.run_pass(now, true);
            let mut events_open = true;

            let wait = millis_until_next_minute(Local::now().naive_local());
            let align = tokio::time::sleep(std::time::Duration::from_millis(wait));
            tokio::pin!(align);
            loop {
                tokio::select! {
                    _ = &mut align => break,
                    event = events.recv(), if events_open => {
                        events_open = self.apply_store_event(event);
                    }
                }
            }

            let mut interval = tokio::time::interval(std::time::Duration::from_secs(
                self.config.tick_interval_secs.max(1),
            ));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_pass(Local::now().naive_local(), false);
                    }
                    event = events.recv(), if events_open => {
                        events_open = self.apply_store_event(event);
                    }
                }
            }
        })
    }

    /// React to one store-change event. Returns whether the event channel
    /// is still open.
    fn apply_store_event(
        &self,
        event: std::result::Result<StoreEvent, tokio::sync::broadcast::error::RecvError>,
    ) -> bool {
        match event {
            Ok(event) if event.origin == self.origin => true,
            Ok(_) => {
                debug!("external schedule change, reloading collection");
                if let Ok(mut book) = self.book.lock() {
                    book.reload();
                }
                true
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "store events lagged, reloading collection");
                if let Ok(mut book) = self.book.lock() {
                    book.reload();
                }
                true
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => false,
        }
    }

    /// Execute one evaluation pass at `now`.
    ///
    /// Public so embedders (and tests) can drive passes deterministically
    /// instead of running the wall-clock loop.
    pub fn run_pass(&self, now: NaiveDateTime, bootstrap: bool) {
        let Ok(mut book) = self.book.lock() else {
            warn!("schedule collection lock poisoned, skipping pass");
            return;
        };

        let tick_floor = occurrence::minute_floor(now);
        let on_boundary = now.second() == 0;
        let mut dirty = false;
        let mut entries = Vec::new();

        for schedule in book.schedules_mut() {
            let Some(occ) = occurrence::resolve(schedule, now) else {
                // Unresolvable (e.g. one-off without a date): skip this
                // schedule for the tick, never the whole pass.
                debug!(id = schedule.id, "occurrence unresolvable, skipping");
                entries.push(TickEntry {
                    schedule_id: schedule.id,
                    title: schedule.title.clone(),
                    occurrence: None,
                    stage: schedule.stage,
                });
                continue;
            };

            dirty |= tracker::reconcile(schedule, &occ, now, self.config.cooldown_ms);

            let minutes_left = (occ.at - tick_floor).num_seconds().div_euclid(60);
            let time_diff_ms = (occ.at - now).num_milliseconds();

            if !bootstrap
                && on_boundary
                && minutes_left == self.config.lead_minutes
                && schedule.stage == NotifyStage::Pending
            {
                schedule.stage = NotifyStage::LeadFired;
                let text = schedule.lead_text(self.config.lead_minutes);
                info!(id = schedule.id, key = %occ.key, "lead warning fired");
                self.notifier.notify(&schedule.title, &text);
                self.queue.enqueue(SpeechRequest {
                    text,
                    speaker_id: self.config.speech.speaker_id,
                    speed_scale: self.config.speech.speed_scale,
                });
                dirty = true;
            }

            // Exact boundary hit, or a tick that ran slightly late but still
            // inside the grace window. The boundary check is what prevents
            // re-firing on every tick while minutes_left stays 0.
            let start_due = (on_boundary && minutes_left == 0)
                || (time_diff_ms <= 0 && time_diff_ms > -self.config.cooldown_ms);
            if start_due && schedule.stage < NotifyStage::StartFired {
                schedule.stage = NotifyStage::StartFired;
                let text = schedule.start_text();
                info!(id = schedule.id, key = %occ.key, "start alert fired");
                self.notifier.notify(&schedule.title, &text);
                self.queue.enqueue(SpeechRequest {
                    text,
                    speaker_id: self.config.speech.speaker_id,
                    speed_scale: self.config.speech.speed_scale,
                });
                dirty = true;
            }

            entries.push(TickEntry {
                schedule_id: schedule.id,
                title: schedule.title.clone(),
                occurrence: Some(occ),
                stage: schedule.stage,
            });
        }

        if dirty {
            book.persist(self.origin);
        }
        drop(book);

        if let Some(tx) = &self.snapshot_tx {
            let _ = tx.send(entries);
        }
    }
}

/// Milliseconds from `now` to the next minute boundary (full minute when
/// already exactly on one).
fn millis_until_next_minute(now: NaiveDateTime) -> u64 {
    let into_minute = u64::from(now.second()) * 1000 + u64::from(now.nanosecond()) / 1_000_000;
    if into_minute == 0 {
        60_000
    } else {
        60_000 - into_minute
    }
}
