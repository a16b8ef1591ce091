//! Field-level comparison of two record snapshots

use crate::record::{FieldChange, FieldChanges, FieldValue, Record};
use std::fmt;

/// A record attribute that participates in change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoredField {
    Name,
    PriceInclTax,
    PriceExclTax,
    Availability,
    Rating,
    NumberOfReviews,
}

/// Every monitored field, in reporting order
pub const MONITORED_FIELDS: [MonitoredField; 6] = [
    MonitoredField::Name,
    MonitoredField::PriceInclTax,
    MonitoredField::PriceExclTax,
    MonitoredField::Availability,
    MonitoredField::Rating,
    MonitoredField::NumberOfReviews,
];

impl MonitoredField {
    /// Field name as it appears in change entries and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceInclTax => "price_incl_tax",
            Self::PriceExclTax => "price_excl_tax",
            Self::Availability => "availability",
            Self::Rating => "rating",
            Self::NumberOfReviews => "number_of_reviews",
        }
    }

    /// Returns true if this field feeds the content fingerprint
    pub fn is_fingerprinted(&self) -> bool {
        !matches!(self, Self::NumberOfReviews)
    }

    /// Extracts this field's value from a record
    pub fn value_of(&self, record: &Record) -> FieldValue {
        match self {
            Self::Name => FieldValue::Text(record.name.clone()),
            Self::PriceInclTax => FieldValue::Number(record.price_incl_tax),
            Self::PriceExclTax => FieldValue::Number(record.price_excl_tax),
            Self::Availability => FieldValue::Text(record.availability.clone()),
            Self::Rating => FieldValue::Integer(i64::from(record.rating)),
            Self::NumberOfReviews => FieldValue::Integer(i64::from(record.number_of_reviews)),
        }
    }
}

impl fmt::Display for MonitoredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares every monitored field of two snapshots
///
/// Returns `None` when all monitored fields agree, otherwise exactly the
/// differing fields with their `(old, new)` values. Floats are compared with
/// exact equality.
pub fn compute_field_diff(old: &Record, new: &Record) -> Option<FieldChanges> {
    compute_field_diff_among(old, new, &MONITORED_FIELDS)
}

/// Compares only the given fields of two snapshots
pub fn compute_field_diff_among(
    old: &Record,
    new: &Record,
    fields: &[MonitoredField],
) -> Option<FieldChanges> {
    let mut changes = FieldChanges::new();

    for field in fields {
        let old_value = field.value_of(old);
        let new_value = field.value_of(new);

        if old_value != new_value {
            tracing::debug!(
                "Change detected in '{}': {} -> {}",
                field,
                old_value,
                new_value
            );
            changes.insert(
                field.as_str().to_string(),
                FieldChange {
                    old: old_value,
                    new: new_value,
                },
            );
        }
    }

    if changes.is_empty() {
        None
    } else {
        Some(changes)
    }
}

/// Fast pre-check: does the stored fingerprint differ from the fresh one?
///
/// A stored hash that no longer matches the stored attributes is treated as
/// a difference so the full diff runs.
pub fn hashes_differ(old: &Record, new: &Record) -> bool {
    if !old.fingerprint_is_current() {
        tracing::warn!(
            "Stored fingerprint for {} is stale, forcing full comparison",
            old.source_url
        );
        return true;
    }

    old.content_hash != crate::record::fingerprint(new)
}

/// Detects changes using the fingerprint as a pre-filter
///
/// When fingerprints match, only monitored fields outside the fingerprint
/// (review count) can still differ, so only those are compared.
pub fn detect_changes(old: &Record, new: &Record) -> Option<FieldChanges> {
    if hashes_differ(old, new) {
        compute_field_diff(old, new)
    } else {
        let unhashed: Vec<MonitoredField> = MONITORED_FIELDS
            .iter()
            .copied()
            .filter(|field| !field.is_fingerprinted())
            .collect();
        compute_field_diff_among(old, new, &unhashed)
    }
}
