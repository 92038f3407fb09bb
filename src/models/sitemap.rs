//! Sitemap entries.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `<changefreq>` values of the sitemap protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<url>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub location: String,
    pub last_modified: NaiveDate,
    pub change_frequency: ChangeFrequency,
    /// Always within `0.0..=1.0`
    pub priority: f32,
}

impl SitemapEntry {
    /// Entry with the default policy: dated `run_date`, monthly, priority 0.5.
    pub fn new(location: impl Into<String>, run_date: NaiveDate) -> Self {
        Self {
            location: location.into(),
            last_modified: run_date,
            change_frequency: ChangeFrequency::default(),
            priority: 0.5,
        }
    }

    pub fn with_change_frequency(mut self, change_frequency: ChangeFrequency) -> Self {
        self.change_frequency = change_frequency;
        self
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let entry = SitemapEntry::new("https://example.com/", date);
        assert_eq!(entry.change_frequency, ChangeFrequency::Monthly);
        assert_eq!(entry.priority, 0.5);
        assert_eq!(entry.last_modified, date);
    }

    #[test]
    fn test_priority_clamped() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(SitemapEntry::new("a", date).with_priority(3.0).priority, 1.0);
        assert_eq!(SitemapEntry::new("a", date).with_priority(-1.0).priority, 0.0);
    }
}
