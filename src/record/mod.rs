//! Canonical record shapes
//!
//! This module defines the data that flows through a run:
//! - `Record`: one parsed catalog item, keyed by its source URL
//! - `ChangeEntry`: one audit-log row for an addition or field-level update
//! - `RunSummary`: aggregate statistics for a single change-detection run

mod change;
mod fingerprint;
mod summary;

pub use change::{ChangeEntry, ChangeKind, FieldChange, FieldChanges, FieldValue};
pub use fingerprint::fingerprint;
pub use summary::RunSummary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length (in characters) of a record name
pub const NAME_MAX_CHARS: usize = 500;

/// Maximum length (in characters) of a record description
pub const DESCRIPTION_MAX_CHARS: usize = 5000;

/// Maximum length (in characters) of a record category
pub const CATEGORY_MAX_CHARS: usize = 100;

/// Maximum length (in characters) of an availability string
pub const AVAILABILITY_MAX_CHARS: usize = 100;

/// Placeholder for text fields the page did not provide
pub const UNKNOWN: &str = "Unknown";

/// One scraped catalog item as stored
///
/// `source_url` is the sole identity; everything else may change between runs.
/// `content_hash` must always match [`fingerprint`] of the current attributes,
/// so any code that mutates a monitored field must call
/// [`Record::refresh_fingerprint`] afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub source_url: String,
    pub name: String,
    pub category: String,
    pub price_incl_tax: f64,
    pub price_excl_tax: f64,
    pub availability: String,
    /// Star rating 1-5, or 0 when the page shows no recognizable rating
    pub rating: u8,
    pub number_of_reviews: u32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub crawled_at: DateTime<Utc>,
    pub content_hash: String,
    pub raw_html_snapshot: Option<String>,
}

impl Record {
    /// Creates a record with default attributes for the given URL
    ///
    /// Text fields start as "Unknown" and numbers as zero, matching what the
    /// parser falls back to for missing values.
    pub fn new(source_url: impl Into<String>, name: impl Into<String>) -> Self {
        let mut record = Self {
            source_url: source_url.into(),
            name: name.into(),
            category: UNKNOWN.to_string(),
            price_incl_tax: 0.0,
            price_excl_tax: 0.0,
            availability: UNKNOWN.to_string(),
            rating: 0,
            number_of_reviews: 0,
            description: None,
            image_url: None,
            crawled_at: Utc::now(),
            content_hash: String::new(),
            raw_html_snapshot: None,
        };
        record.enforce_limits();
        record.refresh_fingerprint();
        record
    }

    /// Truncates every bounded text field to its maximum length
    pub fn enforce_limits(&mut self) {
        truncate_in_place(&mut self.name, NAME_MAX_CHARS);
        truncate_in_place(&mut self.category, CATEGORY_MAX_CHARS);
        truncate_in_place(&mut self.availability, AVAILABILITY_MAX_CHARS);
        if let Some(description) = self.description.as_mut() {
            truncate_in_place(description, DESCRIPTION_MAX_CHARS);
        }
    }

    /// Recomputes `content_hash` from the current attributes
    pub fn refresh_fingerprint(&mut self) {
        self.content_hash = fingerprint(self);
    }

    /// Returns true if the stored hash matches the current attributes
    pub fn fingerprint_is_current(&self) -> bool {
        self.content_hash == fingerprint(self)
    }
}

/// Returns `text` cut to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

fn truncate_in_place(text: &mut String, max_chars: usize) {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
}
