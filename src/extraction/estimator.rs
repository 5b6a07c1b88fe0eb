use anyhow::Result;
use regex::Regex;
use tracing::debug;

use super::Vocabulary;
use crate::config::ExtractionConfig;

/// One step of the extraction cascade. Rules are evaluated in order and
/// the first one that fires decides the estimate; later rules never run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Digit + hour-unit keyword, averaged over all plausible numbers
    Hours,
    /// Digit + minute-unit keyword, averaged and converted to hours
    Minutes,
    /// Mention of the landmark group at this index in the vocabulary
    Landmark(usize),
}

/// Rule-based queue-duration extractor
///
/// Converts one free-text crowd report into an estimated waiting time in
/// hours. Pure and deterministic: no side effects, no shared mutable state,
/// and no input can make it panic. Unparseable text is a valid "no signal"
/// observation and yields 0.
pub struct QueueEstimator {
    vocab: Vocabulary,
    rules: Vec<ExtractionRule>,
    re_hours: Regex,
    re_minutes: Regex,
    re_competing_club: Regex,
    re_number: Regex,
    re_integer: Regex,
    re_meters: Regex,
}

impl QueueEstimator {
    /// Build an estimator over the given vocabulary tables
    pub fn new(vocab: Vocabulary) -> Self {
        let re_hours = unit_pattern(vocab.hour_units());
        let re_minutes = unit_pattern(vocab.minute_units());

        // Deliberately broad: any digit anywhere before a rival club name
        // counts as a competing report, even when the digit is unrelated.
        // Known source of false negatives, kept on purpose.
        let club_alternation = alternation(vocab.competing_clubs());
        let re_competing_club = Regex::new(&format!(r"(?s)\d.*(?:{})", club_alternation))
            .unwrap_or_else(|_| never_matching());

        // One token per number so "1.5" is never also counted as "1" and "5"
        let re_number = Regex::new(r"\d+(?:\.\d+)?").unwrap_or_else(|_| never_matching());
        let re_integer = Regex::new(r"\d+").unwrap_or_else(|_| never_matching());
        let re_meters = Regex::new(r"\d+\s*m").unwrap_or_else(|_| never_matching());

        let mut rules = vec![ExtractionRule::Hours, ExtractionRule::Minutes];
        rules.extend((0..vocab.landmarks().len()).map(ExtractionRule::Landmark));

        Self {
            vocab,
            rules,
            re_hours,
            re_minutes,
            re_competing_club,
            re_number,
            re_integer,
            re_meters,
        }
    }

    /// Build an estimator from the extraction config, loading a terms file
    /// when one is configured
    pub async fn from_config(config: &ExtractionConfig) -> Result<Self> {
        let mut vocab = match &config.terms_file {
            Some(path) => Vocabulary::from_file(path).await?,
            None => Vocabulary::new(),
        };
        vocab.implausible_hour_threshold = config.implausible_hour_threshold;
        vocab.distance_time_factor = config.distance_time_factor;
        Ok(Self::new(vocab))
    }

    /// The cascade in evaluation order
    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Estimate the reported queue duration in hours for one message
    pub fn estimate(&self, text: &str) -> f64 {
        let text = text.to_lowercase();

        for rule in &self.rules {
            if let Some(hours) = self.apply_rule(rule, &text) {
                debug!(?rule, hours, "extraction rule fired");
                return hours;
            }
        }

        0.0
    }

    /// Missing text is absence of signal, not an error
    pub fn estimate_opt(&self, text: Option<&str>) -> f64 {
        text.map(|t| self.estimate(t)).unwrap_or(0.0)
    }

    fn apply_rule(&self, rule: &ExtractionRule, text: &str) -> Option<f64> {
        match rule {
            ExtractionRule::Hours => self.hours_estimate(text),
            ExtractionRule::Minutes => self.minutes_estimate(text),
            ExtractionRule::Landmark(index) => self.landmark_estimate(*index, text),
        }
    }

    fn hours_estimate(&self, text: &str) -> Option<f64> {
        if !self.re_hours.is_match(text) || self.re_competing_club.is_match(text) {
            return None;
        }

        let mut candidates: Vec<f64> = self
            .re_number
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .filter(|value| *value < self.vocab.implausible_hour_threshold)
            .collect();

        candidates.extend(
            self.vocab
                .hour_words()
                .iter()
                .filter(|(word, _)| text.contains(word.as_str()))
                .map(|(_, value)| *value),
        );

        Some(mean(&candidates).max(0.0))
    }

    fn minutes_estimate(&self, text: &str) -> Option<f64> {
        if !self.re_minutes.is_match(text) || self.re_competing_club.is_match(text) {
            return None;
        }

        let mut candidates: Vec<f64> = self
            .re_integer
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .collect();

        candidates.extend(
            self.vocab
                .minute_words()
                .iter()
                .filter(|(word, _)| text.contains(word.as_str()))
                .map(|(_, value)| *value),
        );

        Some((mean(&candidates) / 60.0).max(0.0))
    }

    fn landmark_estimate(&self, index: usize, text: &str) -> Option<f64> {
        let landmark = self.vocab.landmarks().get(index)?;

        if !landmark
            .aliases
            .iter()
            .any(|alias| text.contains(alias.as_str()))
        {
            return None;
        }

        Some(landmark.base_hours + self.reported_distance(text) * self.vocab.distance_time_factor)
    }

    /// Mean of all digit runs when a meters token is present, else 0
    fn reported_distance(&self, text: &str) -> f64 {
        if !self.re_meters.is_match(text) {
            return 0.0;
        }

        let distances: Vec<f64> = self
            .re_integer
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .collect();

        mean(&distances)
    }
}

/// Mean over the candidates, with the empty list defined as 0 so no
/// numeric-domain error can surface from averaging.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// `\d+\s*<unit>` over the configured unit keywords
fn unit_pattern(units: &[String]) -> Regex {
    Regex::new(&format!(r"\d+\s*(?:{})", alternation(units))).unwrap_or_else(|_| never_matching())
}

fn alternation(words: &[String]) -> String {
    if words.is_empty() {
        // Alternation over nothing must match nothing, not everything
        return "[^\\s\\S]".to_string();
    }
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn never_matching() -> Regex {
    // Infallible fallback pattern; only reachable with a broken vocabulary
    #[allow(clippy::unwrap_used)]
    Regex::new(r"[^\s\S]").unwrap()
}
