// libs/checkin-cell/src/services/time_buckets.rs
use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use tracing::debug;

use crate::models::{ClassifiedAppointment, DayAggregate, StateCounts, TimeSlot};

/// Fixed chart window. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub step_minutes: u32,
}

impl Default for SlotWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            step_minutes: 15,
        }
    }
}

impl SlotWindow {
    pub fn slot_times(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(i64::from(self.step_minutes.max(1)));
        let mut times = Vec::new();
        let mut current = self.start;

        while current <= self.end {
            times.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 || next <= current {
                break;
            }
            current = next;
        }

        times
    }
}

pub struct TimeBucketAggregator {
    window: SlotWindow,
}

impl TimeBucketAggregator {
    pub fn new(window: SlotWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> SlotWindow {
        self.window
    }

    /// Always returns every slot of the window, in order, zero-filled.
    pub fn empty_slots(&self) -> Vec<TimeSlot> {
        self.window
            .slot_times()
            .into_iter()
            .map(|time| TimeSlot {
                label: time.format("%H:%M").to_string(),
                hour: time.hour(),
                minute: time.minute(),
                counts: StateCounts::default(),
            })
            .collect()
    }

    /// Bucket classified records for `reference_date`.
    ///
    /// A record lands in a slot only when its hour:minute equals the slot's
    /// exactly; off-grid times are left out of the chart. Day totals are counted
    /// from every record on the reference date, not summed from slots.
    pub fn aggregate(
        &self,
        reference_date: NaiveDate,
        records: &[ClassifiedAppointment<'_>],
        unresolved: u32,
    ) -> DayAggregate {
        let mut slots = self.empty_slots();
        let index: HashMap<(u32, u32), usize> = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| ((slot.hour, slot.minute), i))
            .collect();

        let mut totals = StateCounts::default();
        let mut off_grid = 0u32;

        for record in records
            .iter()
            .filter(|r| r.scheduled_at.date_naive() == reference_date)
        {
            totals.record(record.state);

            let key = (record.scheduled_at.hour(), record.scheduled_at.minute());
            match index.get(&key) {
                Some(&i) => slots[i].counts.record(record.state),
                None => off_grid += 1,
            }
        }

        if off_grid > 0 {
            debug!("{} records on {} fall outside every chart slot", off_grid, reference_date);
        }

        DayAggregate {
            reference_date,
            slots,
            totals,
            unresolved,
        }
    }
}

impl Default for TimeBucketAggregator {
    fn default() -> Self {
        Self::new(SlotWindow::default())
    }
}
