use std::collections::HashSet;
use std::fs;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{ConfigError, SpamConfig};

/// Denylist-based message filter.
///
/// Matching is case-insensitive and works on Unicode word tokens, so `spam`
/// matches "SPAM!" but not "spamalot". A denylist entry with several words
/// matches the same consecutive words in the message. An empty denylist
/// filters nothing.
#[derive(Debug, Clone, Default)]
pub struct SpamFilter {
    words: HashSet<String>,
    phrases: Vec<Vec<String>>,
}

impl SpamFilter {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = HashSet::new();
        let mut phrases = Vec::new();

        for entry in entries {
            let tokens = tokenize(entry.as_ref());
            match tokens.len() {
                0 => {}
                1 => {
                    words.extend(tokens);
                }
                _ => phrases.push(tokens),
            }
        }

        Self { words, phrases }
    }

    /// Build the filter from inline entries plus an optional word file.
    pub fn from_config(config: &SpamConfig) -> Result<Self, ConfigError> {
        let mut entries = config.denylist.clone();
        if let Some(path) = &config.denylist_path {
            entries.extend(Self::load_words(path)?);
        }

        let filter = Self::new(entries);
        tracing::info!(entries = filter.len(), "spam filter loaded");
        Ok(filter)
    }

    /// Load denylist entries from a file, one per line. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn load_words(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Denylist {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    pub fn is_filtered(&self, message: &str) -> bool {
        if self.is_empty() || message.is_empty() {
            return false;
        }

        let tokens = tokenize(message);
        if tokens.iter().any(|t| self.words.contains(t)) {
            tracing::debug!("message flagged by denylisted word");
            return true;
        }

        self.phrases.iter().any(|phrase| {
            tokens
                .windows(phrase.len())
                .any(|window| window == phrase.as_slice())
        })
    }

    pub fn len(&self) -> usize {
        self.words.len() + self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_word_matching_is_case_insensitive() {
        let filter = SpamFilter::new(["spam"]);
        assert!(filter.is_filtered("Buy SPAM now!"));
        assert!(filter.is_filtered("spam"));
        assert!(!filter.is_filtered("spamalot tickets"));
        assert!(!filter.is_filtered("hello world"));
    }

    #[test]
    fn test_phrase_matching() {
        let filter = SpamFilter::new(["free money"]);
        assert!(filter.is_filtered("Get FREE money today"));
        assert!(!filter.is_filtered("money for free"));
        assert!(!filter.is_filtered("free"));
    }

    #[test]
    fn test_empty_denylist_filters_nothing() {
        let filter = SpamFilter::new(Vec::<String>::new());
        assert!(filter.is_empty());
        assert!(!filter.is_filtered("anything at all"));

        let blank = SpamFilter::new(["", "   "]);
        assert!(blank.is_empty());
    }

    #[test]
    fn test_unicode_words() {
        let filter = SpamFilter::new(["Größe"]);
        assert!(filter.is_filtered("die GRÖßE ist egal"));
        assert!(!filter.is_filtered("die größere Frage"));
    }

    #[test]
    fn test_from_config_merges_file_and_inline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "scam").unwrap();
        writeln!(file, "  click here  ").unwrap();

        let config = SpamConfig {
            denylist: vec!["spam".to_string()],
            denylist_path: Some(file.path().display().to_string()),
        };
        let filter = SpamFilter::from_config(&config).unwrap();

        assert_eq!(filter.len(), 3);
        assert!(filter.is_filtered("total scam"));
        assert!(filter.is_filtered("Click here to win"));
        assert!(filter.is_filtered("more spam"));
        assert!(!filter.is_filtered("comment line"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let config = SpamConfig {
            denylist: vec![],
            denylist_path: Some("/nonexistent/denylist.txt".to_string()),
        };
        assert!(matches!(
            SpamFilter::from_config(&config),
            Err(ConfigError::Denylist { .. })
        ));
    }
}
