//! Parameter Timeline
//!
//! An in-memory model of an automatable audio parameter with
//! `setValueAtTime` / `cancelScheduledValues` semantics:
//!
//! - events are kept sorted by time
//! - writing at a time that already holds an event replaces it (last write wins)
//! - cancelling removes every event at or after the given time
//! - the value at `t` is the most recent event at or before `t`, or the
//!   parameter's default if nothing has been scheduled yet
//!
//! Only step (`setValueAtTime`) events are modelled; the engine never uses
//! ramps.

use serde::{Deserialize, Serialize};

/// A scheduled value change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: f64,
    pub value: f64,
}

/// Automation timeline for one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTimeline {
    default_value: f64,
    events: Vec<TimelineEvent>,
}

impl ParamTimeline {
    pub fn new(default_value: f64) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Schedule `value` to take effect at `time`
    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        let event = TimelineEvent { time, value };

        // appends in time order are the common case
        if self.events.last().map_or(true, |last| last.time < time) {
            self.events.push(event);
            return;
        }

        match self
            .events
            .binary_search_by(|e| e.time.partial_cmp(&time).unwrap_or(core::cmp::Ordering::Less))
        {
            Ok(idx) => self.events[idx] = event,
            Err(idx) => self.events.insert(idx, event),
        }
    }

    /// Remove every event at or after `from`. Returns how many were removed.
    pub fn cancel_scheduled_values(&mut self, from: f64) -> usize {
        let keep = self.events.partition_point(|e| e.time < from);
        let removed = self.events.len() - keep;
        self.events.truncate(keep);
        removed
    }

    /// Parameter value at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        let idx = self.events.partition_point(|e| e.time <= time);
        if idx == 0 {
            self.default_value
        } else {
            self.events[idx - 1].value
        }
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Events strictly after `time`
    pub fn pending_after(&self, time: f64) -> &[TimelineEvent] {
        let idx = self.events.partition_point(|e| e.time <= time);
        &self.events[idx..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
