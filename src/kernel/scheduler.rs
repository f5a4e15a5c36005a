use std::collections::{BTreeMap, HashMap};

use super::time::Timestamp;

/// Handle for a scheduled task. Owned by whoever scheduled it and released
/// through `cancel` (or by letting a one-shot fire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Timer<T> {
    token: TimerToken,
    interval_ms: Option<u64>,
    task: T,
}

/// A task whose due time has been reached, handed back for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub token: TimerToken,
    pub at: Timestamp,
    pub task: T,
}

/// Virtual-time timer queue.
///
/// Tasks are plain data; the owner pops them one at a time and runs them, so
/// nothing executes inside the scheduler and no callback can re-enter another.
/// Ordering is (due time, insertion order).
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Timestamp,
    next_token: u64,
    next_seq: u64,
    queue: BTreeMap<(u64, u64), Timer<T>>,
    index: HashMap<TimerToken, (u64, u64)>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Timestamp::ZERO,
            next_token: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// One-shot task `delay_ms` from now. A zero delay fires on the next pop.
    pub fn after(&mut self, delay_ms: u64, task: T) -> TimerToken {
        let token = self.mint();
        let due = self.now.plus(delay_ms);
        self.insert(due, token, None, task);
        token
    }

    /// Repeating task, first firing one interval from now.
    pub fn every(&mut self, interval_ms: u64, task: T) -> TimerToken {
        let interval_ms = interval_ms.max(1);
        let token = self.mint();
        let due = self.now.plus(interval_ms);
        self.insert(due, token, Some(interval_ms), task);
        token
    }

    /// Returns true if the task was still pending. Cancelling a fired
    /// one-shot (or an unknown token) is a no-op.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        match self.index.remove(&token) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.queue.clear();
        self.index.clear();
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.index.contains_key(&token)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn next_due(&self) -> Option<Timestamp> {
        self.queue.keys().next().map(|(due, _)| Timestamp::new(*due))
    }

    /// Pop the earliest task due at or before `until`, moving the clock to its
    /// due time. Repeating tasks are re-armed before being returned.
    pub fn pop_due(&mut self, until: Timestamp) -> Option<Fired<T>> {
        let key = *self.queue.keys().next()?;
        if key.0 > until.ms {
            return None;
        }
        let timer = self.queue.remove(&key)?;
        self.index.remove(&timer.token);

        let at = Timestamp::new(key.0);
        if at > self.now {
            self.now = at;
        }

        match timer.interval_ms {
            Some(interval) => {
                let fired = Fired { token: timer.token, at, task: timer.task.clone() };
                self.insert(at.plus(interval), timer.token, Some(interval), timer.task);
                Some(fired)
            }
            None => Some(Fired { token: timer.token, at, task: timer.task }),
        }
    }

    /// Move the clock forward without firing anything. Callers drain
    /// `pop_due` first.
    pub fn advance_to(&mut self, until: Timestamp) {
        if until > self.now {
            self.now = until;
        }
    }

    fn mint(&mut self) -> TimerToken {
        self.next_token += 1;
        TimerToken(self.next_token)
    }

    fn insert(&mut self, due: Timestamp, token: TimerToken, interval_ms: Option<u64>, task: T) {
        self.next_seq += 1;
        let key = (due.ms, self.next_seq);
        self.queue.insert(key, Timer { token, interval_ms, task });
        self.index.insert(token, key);
    }
}
