use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A named real-world point near the club with an empirically assigned
/// base queue duration. Matched against message text via its aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Landmark {
    /// Canonical landmark name
    pub name: String,
    /// Lowercase aliases, including transliteration variants
    pub aliases: Vec<String>,
    /// Base queue duration in hours when the landmark is mentioned
    pub base_hours: f64,
}

/// Vocabulary tables for queue-duration extraction
///
/// Holds the unit keywords, spelled-out number words, competing-club names
/// and landmark groups the estimator matches against. All tables are plain
/// data; the defaults can be replaced from a terms file.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Hour unit keywords ("hour", "hrs", ...)
    hour_units: Vec<String>,

    /// Minute unit keywords ("minutes", "mins", ...)
    minute_units: Vec<String>,

    /// Names of other venues whose wait times show up in messages
    competing_clubs: Vec<String>,

    /// Spelled-out hour values, matched as substrings
    hour_words: Vec<(String, f64)>,

    /// Spelled-out minute values, matched as substrings
    minute_words: Vec<(String, f64)>,

    /// Landmark groups in match priority order
    landmarks: Vec<Landmark>,

    /// Hours of queueing per meter of reported distance
    pub distance_time_factor: f64,

    /// Number candidates at or above this are treated as noise
    pub implausible_hour_threshold: f64,
}

impl Vocabulary {
    /// Create a vocabulary with the default tables
    pub fn new() -> Self {
        let mut vocab = Self {
            hour_units: Vec::new(),
            minute_units: Vec::new(),
            competing_clubs: Vec::new(),
            hour_words: Vec::new(),
            minute_words: Vec::new(),
            landmarks: Vec::new(),
            // 2 minutes walked per 60 meters of queue
            distance_time_factor: 2.0 / 60.0,
            implausible_hour_threshold: 8.0,
        };

        vocab.load_default_units();
        vocab.load_default_number_words();
        vocab.load_default_landmarks();
        vocab
    }

    /// Load vocabulary from a terms file, starting from the defaults
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let mut vocab = Self::new();
        vocab.parse_terms_file(&content)?;
        info!("Loaded queue vocabulary from: {}", path.as_ref().display());
        Ok(vocab)
    }

    pub fn hour_units(&self) -> &[String] {
        &self.hour_units
    }

    pub fn minute_units(&self) -> &[String] {
        &self.minute_units
    }

    pub fn competing_clubs(&self) -> &[String] {
        &self.competing_clubs
    }

    pub fn hour_words(&self) -> &[(String, f64)] {
        &self.hour_words
    }

    pub fn minute_words(&self) -> &[(String, f64)] {
        &self.minute_words
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Look up a landmark group by canonical name
    pub fn landmark(&self, name: &str) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.name == name)
    }

    fn load_default_units(&mut self) {
        // Covers full words and abbreviations; "h" also catches German
        // usages like "2h schlange".
        self.hour_units = vec!["hour", "hrs", "h"]
            .into_iter()
            .map(String::from)
            .collect();

        self.minute_units = vec!["minutes", "mins", "min"]
            .into_iter()
            .map(String::from)
            .collect();

        // A digit mention next to one of these suppresses the unit branches:
        // the message is reporting a wait somewhere else.
        self.competing_clubs = vec!["tresor", "sisyphos", "kitkat", "watergate"]
            .into_iter()
            .map(String::from)
            .collect();
    }

    fn load_default_number_words(&mut self) {
        let hours = [
            ("zero", 0.0),
            ("one", 1.0),
            ("two", 2.0),
            ("three", 3.0),
            ("four", 4.0),
            ("five", 5.0),
            ("six", 6.0),
            ("seven", 7.0),
            ("eight", 8.0),
            ("half", 0.5),
        ];

        let minutes = [
            ("zero", 0.0),
            ("one", 1.0),
            ("two", 2.0),
            ("three", 3.0),
            ("four", 4.0),
            ("five", 5.0),
            ("six", 6.0),
            ("seven", 7.0),
            ("eight", 8.0),
            ("nine", 9.0),
            ("ten", 10.0),
            ("eleven", 11.0),
            ("twelve", 12.0),
            ("thirteen", 13.0),
            ("fourteen", 14.0),
            ("fifteen", 15.0),
            ("sixteen", 16.0),
            ("seventeen", 17.0),
            ("eighteen", 18.0),
            ("nineteen", 19.0),
            ("twenty", 20.0),
            ("thirty", 30.0),
            ("forty", 40.0),
            ("fifty", 50.0),
        ];

        self.hour_words = hours.iter().map(|(w, v)| (w.to_string(), *v)).collect();
        self.minute_words = minutes.iter().map(|(w, v)| (w.to_string(), *v)).collect();
    }

    fn load_default_landmarks(&mut self) {
        // Order matters: groups are tried in sequence by the estimator.
        self.landmarks = vec![
            Landmark {
                name: "kiosk".to_string(),
                aliases: vec!["kiosk", "späti", "spaeti", "spati"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                base_hours: 1.0,
            },
            Landmark {
                name: "hellweg".to_string(),
                aliases: vec!["hellweg".to_string()],
                base_hours: 2.0,
            },
            Landmark {
                name: "wriezener karree".to_string(),
                aliases: vec!["wriezener", "karree"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                base_hours: 2.5,
            },
        ];
    }

    /// Parse a terms file. Sections are `[hour_units]`, `[minute_units]`,
    /// `[competing_clubs]`, `[hour_words]`, `[minute_words]`, `[landmarks]`.
    /// Word and landmark lines use `name -> value`; landmark names may list
    /// comma-separated aliases.
    fn parse_terms_file(&mut self, content: &str) -> Result<()> {
        let mut current_section = String::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].to_lowercase();
                match current_section.as_str() {
                    "hour_units" => self.hour_units.clear(),
                    "minute_units" => self.minute_units.clear(),
                    "competing_clubs" => self.competing_clubs.clear(),
                    "hour_words" => self.hour_words.clear(),
                    "minute_words" => self.minute_words.clear(),
                    "landmarks" => self.landmarks.clear(),
                    _ => {}
                }
                continue;
            }

            match current_section.as_str() {
                "hour_units" => self.hour_units.push(line.to_lowercase()),
                "minute_units" => self.minute_units.push(line.to_lowercase()),
                "competing_clubs" => self.competing_clubs.push(line.to_lowercase()),
                "hour_words" | "minute_words" | "landmarks" => {
                    if let Some((name, value)) = line.split_once("->") {
                        let value: f64 = value.trim().parse()?;
                        match current_section.as_str() {
                            "hour_words" => {
                                self.hour_words.push((name.trim().to_lowercase(), value))
                            }
                            "minute_words" => {
                                self.minute_words.push((name.trim().to_lowercase(), value))
                            }
                            _ => {
                                let aliases: Vec<String> = name
                                    .split(',')
                                    .map(|a| a.trim().to_lowercase())
                                    .filter(|a| !a.is_empty())
                                    .collect();
                                if let Some(first) = aliases.first().cloned() {
                                    self.landmarks.push(Landmark {
                                        name: first,
                                        aliases,
                                        base_hours: value,
                                    });
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Summary counts over the loaded tables
    pub fn stats(&self) -> VocabularyStats {
        VocabularyStats {
            hour_units: self.hour_units.len(),
            minute_units: self.minute_units.len(),
            competing_clubs: self.competing_clubs.len(),
            number_words: self.hour_words.len() + self.minute_words.len(),
            landmarks: self.landmarks.len(),
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the vocabulary tables
#[derive(Debug, Clone)]
pub struct VocabularyStats {
    pub hour_units: usize,
    pub minute_units: usize,
    pub competing_clubs: usize,
    pub number_words: usize,
    pub landmarks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let vocab = Vocabulary::new();
        let stats = vocab.stats();

        assert!(stats.hour_units > 0);
        assert!(stats.number_words > 0);
        assert_eq!(stats.landmarks, 3);
        assert!(vocab.hour_units().contains(&"hour".to_string()));
        assert!(vocab.competing_clubs().contains(&"tresor".to_string()));
    }

    #[test]
    fn test_landmark_lookup() {
        let vocab = Vocabulary::new();

        let kiosk = vocab.landmark("kiosk").unwrap();
        assert_eq!(kiosk.base_hours, 1.0);
        assert!(kiosk.aliases.contains(&"späti".to_string()));

        let hellweg = vocab.landmark("hellweg").unwrap();
        assert_eq!(hellweg.base_hours, 2.0);

        assert!(vocab.landmark("nonexistent").is_none());
    }

    #[test]
    fn test_hour_words_include_half() {
        let vocab = Vocabulary::new();
        let half = vocab
            .hour_words()
            .iter()
            .find(|(w, _)| w == "half")
            .map(|(_, v)| *v);
        assert_eq!(half, Some(0.5));
    }

    #[test]
    fn test_parse_terms_file() {
        let mut vocab = Vocabulary::new();
        let content = "\
# custom tables
[hour_units]
stunden
[landmarks]
ostbahnhof -> 3.0
kiosk, späti -> 1.5
";
        vocab.parse_terms_file(content).unwrap();

        assert_eq!(vocab.hour_units(), &["stunden".to_string()]);
        assert_eq!(vocab.landmarks().len(), 2);
        assert_eq!(vocab.landmarks()[0].name, "ostbahnhof");
        assert_eq!(vocab.landmarks()[0].base_hours, 3.0);
        assert_eq!(vocab.landmark("kiosk").unwrap().base_hours, 1.5);
    }
}
