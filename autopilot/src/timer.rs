//! Timer registry
//!
//! Every recurring poll and one-shot delay the engine schedules lives in this
//! registry, keyed by an opaque [`TimerId`]. A timer can only fire while it is
//! registered, so cancelling (or draining) the registry guarantees the
//! callback never runs. The registry does no sleeping itself: the executor
//! asks for [`TimerRegistry::next_deadline`] and feeds due timers back to the
//! engine.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// What the engine should do when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPurpose {
    /// Re-evaluate the active completion monitor
    Poll,
    /// Settling delay after a movement completed; then advance the route
    Stabilize,
    /// Settling delay after a trajectory deviation; then resume the movement
    Correction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Interval(Duration),
    Timeout,
}

#[derive(Debug, Clone)]
struct TimerEntry {
    kind: TimerKind,
    deadline: Instant,
    purpose: TimerPurpose,
}

#[derive(Debug, Default)]
pub struct TimerRegistry {
    next_id: u64,
    entries: BTreeMap<TimerId, TimerEntry>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, entry: TimerEntry) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, entry);
        id
    }

    /// Register a recurring timer; first fires one period after `now`
    pub fn schedule_interval(&mut self, period: Duration, now: Instant, purpose: TimerPurpose) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        let id = self.insert(TimerEntry {
            kind: TimerKind::Interval(period),
            deadline: now + period,
            purpose,
        });
        tracing::trace!("Scheduled {:?} interval {} every {:?}", purpose, id, period);
        id
    }

    /// Register a one-shot timer
    pub fn schedule_timeout(&mut self, delay: Duration, now: Instant, purpose: TimerPurpose) -> TimerId {
        let id = self.insert(TimerEntry {
            kind: TimerKind::Timeout,
            deadline: now + delay,
            purpose,
        });
        tracing::trace!("Scheduled {:?} timeout {} in {:?}", purpose, id, delay);
        id
    }

    /// Remove a timer. Returns false if it had already fired or been cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Cancel everything; returns how many timers were outstanding
    pub fn drain(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|e| e.deadline).min()
    }

    /// Pop the earliest timer due at `now`.
    ///
    /// One-shot timers are deregistered as they fire. Recurring timers move to
    /// their next period; periods already missed are skipped.
    pub fn take_due(&mut self, now: Instant) -> Option<(TimerId, TimerPurpose)> {
        let (id, entry) = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(id, e)| (e.deadline, **id))
            .map(|(id, e)| (*id, e.clone()))?;

        match entry.kind {
            TimerKind::Timeout => {
                self.entries.remove(&id);
            }
            TimerKind::Interval(period) => {
                let mut next = entry.deadline + period;
                if next <= now {
                    next = now + period;
                }
                if let Some(e) = self.entries.get_mut(&id) {
                    e.deadline = next;
                }
            }
        }

        Some((id, entry.purpose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_timeout_fires_once_and_deregisters() {
        let t0 = Instant::now();
        let mut timers = TimerRegistry::new();
        let id = timers.schedule_timeout(ms(3000), t0, TimerPurpose::Stabilize);

        assert_eq!(timers.next_deadline(), Some(t0 + ms(3000)));
        assert_eq!(timers.take_due(t0 + ms(2999)), None);
        assert_eq!(timers.take_due(t0 + ms(3000)), Some((id, TimerPurpose::Stabilize)));
        assert!(timers.is_empty());
        assert_eq!(timers.take_due(t0 + ms(9000)), None);
    }

    #[test]
    fn test_interval_keeps_cadence() {
        let t0 = Instant::now();
        let mut timers = TimerRegistry::new();
        let id = timers.schedule_interval(ms(100), t0, TimerPurpose::Poll);

        assert_eq!(timers.take_due(t0 + ms(100)), Some((id, TimerPurpose::Poll)));
        assert_eq!(timers.next_deadline(), Some(t0 + ms(200)));
        assert_eq!(timers.take_due(t0 + ms(150)), None);

        // Late tick skips the missed periods instead of replaying them
        assert_eq!(timers.take_due(t0 + ms(550)), Some((id, TimerPurpose::Poll)));
        assert_eq!(timers.next_deadline(), Some(t0 + ms(650)));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let t0 = Instant::now();
        let mut timers = TimerRegistry::new();
        let poll = timers.schedule_interval(ms(100), t0, TimerPurpose::Poll);
        let settle = timers.schedule_timeout(ms(50), t0, TimerPurpose::Correction);

        assert!(timers.cancel(poll));
        assert!(!timers.cancel(poll));
        assert_eq!(timers.take_due(t0 + ms(1000)), Some((settle, TimerPurpose::Correction)));
        assert_eq!(timers.take_due(t0 + ms(1000)), None);
    }

    #[test]
    fn test_drain_empties_registry() {
        let t0 = Instant::now();
        let mut timers = TimerRegistry::new();
        timers.schedule_interval(ms(100), t0, TimerPurpose::Poll);
        timers.schedule_timeout(ms(3000), t0, TimerPurpose::Stabilize);

        assert_eq!(timers.drain(), 2);
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
        assert_eq!(timers.take_due(t0 + ms(10_000)), None);
    }

    #[test]
    fn test_due_timers_fire_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = TimerRegistry::new();
        let late = timers.schedule_timeout(ms(200), t0, TimerPurpose::Stabilize);
        let early = timers.schedule_timeout(ms(100), t0, TimerPurpose::Correction);

        let now = t0 + ms(300);
        assert_eq!(timers.take_due(now).map(|(id, _)| id), Some(early));
        assert_eq!(timers.take_due(now).map(|(id, _)| id), Some(late));
    }
}
