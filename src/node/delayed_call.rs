//! The delayed-call table driving Interest timeouts.

use crate::clock;
use crate::node::Node;
use crate::types::{Milliseconds, MillisecondsSince1970};

pub(crate) type DelayedCallback = Box<dyn FnOnce(&mut Node)>;

struct DelayedCall {
    call_time: MillisecondsSince1970,
    callback: DelayedCallback,
}

/// Schedules callbacks against the wall clock, sorted by target time.
///
/// A signed offset is added to the clock reading; it stays zero outside
/// tests, which use it for deterministic time travel.
#[derive(Default)]
pub(crate) struct DelayedCallTable {
    table: Vec<DelayedCall>,
    now_offset_ms: i64,
}

impl DelayedCallTable {
    /// Schedules `callback` to fire `delay` milliseconds from now.
    pub(crate) fn call_later(&mut self, delay: Milliseconds, callback: DelayedCallback) {
        let call_time = self.now_ms().saturating_add(delay);
        // Insert after entries with the same time so equal deadlines fire
        // in scheduling order.
        let at = self.table.partition_point(|entry| entry.call_time <= call_time);
        self.table.insert(at, DelayedCall { call_time, callback });
    }

    /// Removes and returns every callback whose time has come, in order.
    pub(crate) fn extract_due(&mut self) -> Vec<DelayedCallback> {
        let now = self.now_ms();
        let due = self.table.partition_point(|entry| entry.call_time <= now);
        self.table
            .drain(..due)
            .map(|entry| entry.callback)
            .collect()
    }

    pub(crate) fn now_ms(&self) -> MillisecondsSince1970 {
        clock::offset_now_ms(self.now_offset_ms)
    }

    pub(crate) fn set_now_offset_ms(&mut self, offset_ms: i64) {
        self.now_offset_ms = offset_ms;
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_time_order_under_an_offset_clock() {
        let mut table = DelayedCallTable::default();
        table.call_later(2000, Box::new(|_| {}));
        table.call_later(500, Box::new(|_| {}));
        table.call_later(1000, Box::new(|_| {}));
        assert!(table.extract_due().is_empty());

        table.set_now_offset_ms(600);
        assert_eq!(1, table.extract_due().len());
        assert_eq!(2, table.len());

        table.set_now_offset_ms(2100);
        assert_eq!(2, table.extract_due().len());
        assert_eq!(0, table.len());
    }
}
