/// Temporal aggregation of per-message estimates
///
/// Takes the estimator's per-report values and produces one
/// max-waiting-time figure per event night, rescaled against the weekend
/// reference curve and smoothed across the Sunday-into-Monday boundary.
pub mod aggregator;
pub mod reference_curve;

pub use aggregator::{AggregatedEstimate, TemporalAggregator};
pub use reference_curve::ReferenceCurve;
