//! Content fingerprinting for cheap change pre-screening

use crate::record::Record;
use sha2::{Digest, Sha256};

/// Computes the content fingerprint of a record
///
/// SHA-256 over `name|price_incl_tax|price_excl_tax|availability|rating`,
/// hex-encoded. Only these fields participate: timestamps, description,
/// category, image and review count never affect the result.
pub fn fingerprint(record: &Record) -> String {
    let input = format!(
        "{}|{:?}|{:?}|{}|{}",
        record.name,
        record.price_incl_tax,
        record.price_excl_tax,
        record.availability,
        record.rating
    );

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
