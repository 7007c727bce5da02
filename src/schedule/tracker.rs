//! Notification state reconciliation.
//!
//! Keeps each schedule's tracked occurrence key and notification stage in
//! step with the resolved occurrence. The key is the engine's idempotency
//! unit: the memory of having notified is scoped to exactly one occurrence,
//! and rolling the key over is the sole mechanism that lets a recurring
//! schedule fire again in a later week.

use crate::schedule::model::{NotifyStage, Schedule};
use crate::schedule::occurrence::Occurrence;
use chrono::NaiveDateTime;
use tracing::debug;

/// Reconcile a schedule's notification state with its resolved occurrence.
///
/// Returns `true` when the schedule was mutated and needs persisting. Never
/// fires anything itself; firing decisions belong to the clock.
///
/// Three rules, applied in order:
/// 1. A changed occurrence key stores the new key and resets the stage;
///    key and stage are one atomic unit, never partially stale.
/// 2. A surviving pre-two-stage `notified` flag is consumed once: an
///    occurrence still in the future means only the lead stage had fired;
///    anything else means both had.
/// 3. An occurrence more than one cooldown window in the past with stages
///    still unset is considered missed and silently marked fired, rather
///    than alerting late.
pub fn reconcile(
    schedule: &mut Schedule,
    occurrence: &Occurrence,
    now: NaiveDateTime,
    cooldown_ms: i64,
) -> bool {
    let mut dirty = false;

    if schedule.last_occurrence_key.as_deref() != Some(occurrence.key.as_str()) {
        schedule.last_occurrence_key = Some(occurrence.key.clone());
        schedule.stage = NotifyStage::Pending;
        dirty = true;
    }

    if let Some(notified) = schedule.legacy_notified.take() {
        if notified && schedule.stage == NotifyStage::Pending {
            schedule.stage = if occurrence.at > now {
                NotifyStage::LeadFired
            } else {
                NotifyStage::StartFired
            };
            debug!(
                id = schedule.id,
                stage = ?schedule.stage,
                "upgraded legacy notified flag"
            );
        }
        dirty = true;
    }

    if schedule.stage < NotifyStage::StartFired
        && (now - occurrence.at).num_milliseconds() > cooldown_ms
    {
        schedule.stage = NotifyStage::StartFired;
        debug!(
            id = schedule.id,
            key = %occurrence.key,
            "occurrence aged past the firing window, suppressing"
        );
        dirty = true;
    }

    dirty
}
