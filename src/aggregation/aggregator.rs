use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ReferenceCurve;
use crate::extraction::QueueEstimator;
use crate::ingest::RawMessage;

/// One row of durable output: the estimated maximum waiting time for one
/// event night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEstimate {
    pub date: NaiveDate,
    pub max_waiting_time: f64,
}

/// Reconciles many noisy per-message estimates into one max-waiting-time
/// figure per event night.
///
/// The whole pass is a pure computation over the in-memory record set:
/// filter to open weekdays, estimate per message, rescale against the
/// weekend reference curve, smooth the Sunday-into-Monday spill-over, then
/// group by event night. Running it twice on the same input yields the
/// same output.
pub struct TemporalAggregator {
    estimator: QueueEstimator,
    curve: ReferenceCurve,
    /// Open weekdays, 0 = Monday
    open_weekdays: Vec<u32>,
    /// Clamp for curve-scaled estimates, in hours
    max_waiting_time: f64,
    /// Records before this local hour (and after midnight) belong to the
    /// previous calendar day's event
    early_morning_cutoff: u32,
}

/// Per-record intermediate state, transient within one aggregation pass
struct ScaledRecord {
    event_date: NaiveDate,
    /// ISO (year, week) of the record itself
    week: (i32, u32),
    /// ISO (year, week) seven days later, for pairing a weekend with the
    /// following Monday
    next_week: (i32, u32),
    is_monday: bool,
    scaled: f64,
}

impl TemporalAggregator {
    pub fn new(estimator: QueueEstimator) -> Self {
        Self {
            estimator,
            curve: ReferenceCurve::new(),
            open_weekdays: vec![4, 5, 6, 0],
            max_waiting_time: 10.0,
            early_morning_cutoff: 5,
        }
    }

    pub fn with_curve(mut self, curve: ReferenceCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_open_weekdays(mut self, weekdays: Vec<u32>) -> Self {
        self.open_weekdays = weekdays;
        self
    }

    pub fn with_max_waiting_time(mut self, hours: f64) -> Self {
        self.max_waiting_time = hours;
        self
    }

    pub fn estimator(&self) -> &QueueEstimator {
        &self.estimator
    }

    /// Aggregate a batch of crowd reports into one row per event night.
    /// An empty or entirely off-night input produces an empty result.
    pub fn aggregate(&self, records: &[RawMessage]) -> Vec<AggregatedEstimate> {
        let scaled = self.scale_records(records);
        let smoothed = self.smooth_across_weeks(&scaled);

        // Group by event night and average the post-scaling values
        let mut sums: HashMap<NaiveDate, (f64, usize)> = HashMap::new();
        for (record, value) in scaled.iter().zip(smoothed.iter()) {
            let entry = sums.entry(record.event_date).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }

        let mut rows: Vec<AggregatedEstimate> = sums
            .into_iter()
            .map(|(date, (sum, count))| AggregatedEstimate {
                date,
                max_waiting_time: sum / count as f64,
            })
            .collect();
        rows.sort_by_key(|row| row.date);

        debug!(
            records = records.len(),
            nights = rows.len(),
            "aggregated crowd reports"
        );
        rows
    }

    /// Steps 1-5: filter, estimate, derive calendar features, rescale
    fn scale_records(&self, records: &[RawMessage]) -> Vec<ScaledRecord> {
        let mut scaled = Vec::new();

        for record in records {
            let weekday = record.timestamp.weekday().num_days_from_monday();
            if !self.open_weekdays.contains(&weekday) {
                continue;
            }

            let hours = self.estimator.estimate(&record.text);
            let value = match self
                .hours_since_opening(&record.timestamp)
                .and_then(|h| self.curve.intensity(h))
            {
                Some(intensity) => hours / intensity,
                None => hours,
            }
            .min(self.max_waiting_time);

            let iso = record.timestamp.iso_week();
            let next_iso = (record.timestamp.date_naive() + Duration::days(7)).iso_week();

            scaled.push(ScaledRecord {
                event_date: self.event_date(&record.timestamp),
                week: (iso.year(), iso.week()),
                next_week: (next_iso.year(), next_iso.week()),
                is_monday: record.timestamp.weekday() == Weekday::Mon,
                scaled: value,
            });
        }

        scaled
    }

    /// Step 6: pool a week's Friday-to-Sunday values with the following
    /// week's early-Monday values and replace both groups with the pooled
    /// mean, so a sparse Monday-morning signal stays consistent with the
    /// rest of its event. Pooled means are computed into a separate buffer
    /// first and applied once, never mid-loop.
    fn smooth_across_weeks(&self, records: &[ScaledRecord]) -> Vec<f64> {
        let mut weekend_groups: HashMap<(i32, u32), Vec<usize>> = HashMap::new();
        let mut monday_groups: HashMap<(i32, u32), Vec<usize>> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            if record.is_monday {
                monday_groups.entry(record.week).or_default().push(index);
            } else {
                weekend_groups.entry(record.week).or_default().push(index);
            }
        }

        let mut smoothed: Vec<f64> = records.iter().map(|r| r.scaled).collect();

        for weekend_indices in weekend_groups.values() {
            let next_week = records[weekend_indices[0]].next_week;
            let Some(monday_indices) = monday_groups.get(&next_week) else {
                continue;
            };

            let pooled: Vec<usize> = weekend_indices
                .iter()
                .chain(monday_indices.iter())
                .copied()
                .collect();
            let pooled_mean =
                pooled.iter().map(|&i| records[i].scaled).sum::<f64>() / pooled.len() as f64;

            for index in pooled {
                smoothed[index] = pooled_mean;
            }
        }

        smoothed
    }

    /// Whole hours elapsed since the week's Friday opening, for timestamps
    /// on open weekdays. Friday 22:00 -> 22, Saturday 14:00 -> 38.
    pub fn hours_since_opening(&self, timestamp: &DateTime<FixedOffset>) -> Option<u32> {
        let day_offset = match timestamp.weekday() {
            Weekday::Fri => 0,
            Weekday::Sat => 1,
            Weekday::Sun => 2,
            Weekday::Mon => 3,
            _ => return None,
        };
        Some(day_offset * 24 + timestamp.hour())
    }

    /// The event night a report belongs to: early-morning reports (after
    /// midnight, before the cutoff) count toward the previous calendar day.
    pub fn event_date(&self, timestamp: &DateTime<FixedOffset>) -> NaiveDate {
        let hour = timestamp.hour();
        if hour > 0 && hour < self.early_morning_cutoff {
            timestamp.date_naive() - Duration::days(1)
        } else {
            timestamp.date_naive()
        }
    }
}
