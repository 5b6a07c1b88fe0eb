/// Queue-duration extraction
///
/// Turns one free-text crowd report ("2 hours", "one and a half hrs",
/// "50m past hellweg") into a normalized waiting-time estimate in hours.
/// The extraction is a priority cascade over pattern rules; see
/// `estimator::ExtractionRule` for the evaluation order.
pub mod estimator;
pub mod vocabulary;

pub use estimator::{ExtractionRule, QueueEstimator};
pub use vocabulary::{Landmark, Vocabulary, VocabularyStats};
