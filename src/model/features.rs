//! Feature Layout - Canonical Applicant Features
//!
//! The HTML form and the JSON contract are built around this list.
//! The authoritative order at inference time is the one stored in the
//! loaded bundle, so bundles are checked against this layout on load.

use crc32fast::Hasher;

// ============================================================================
// FEATURE LAYOUT
// ============================================================================

/// Feature names in the order the training pipeline emits them
pub const RISK_FEATURES: &[&str] = &[
    "income",            // 0: Annual income
    "age",               // 1: Applicant age in years
    "loan_amount",       // 2: Requested loan amount
    "loan_term_months",  // 3: Loan term in months
    "credit_score",      // 4: Credit score (300-850)
    "num_of_defaults",   // 5: Past defaults
    "employment_years",  // 6: Years at current job
];

/// Total number of canonical features
pub const FEATURE_COUNT: usize = 7;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the ordered feature names.
/// Two bundles with the same hash expect the same column order.
pub fn layout_hash<S: AsRef<str>>(features: &[S]) -> u32 {
    let mut hasher = Hasher::new();

    for name in features {
        hasher.update(name.as_ref().as_bytes());
        // Separator so ["ab", "c"] and ["a", "bc"] differ
        hasher.update(&[0]);
    }

    hasher.finalize()
}

/// Hash of the canonical layout
pub fn canonical_layout_hash() -> u32 {
    layout_hash(RISK_FEATURES)
}

/// Check a bundle's feature list against the canonical layout.
///
/// Returns the canonical names the bundle does not know about, plus the
/// bundle names the canonical layout does not provide. Order differences
/// are not reported: the gateway reorders by name.
pub fn layout_diff<S: AsRef<str>>(features: &[S]) -> (Vec<String>, Vec<String>) {
    let missing = RISK_FEATURES
        .iter()
        .filter(|name| !features.iter().any(|f| f.as_ref() == **name))
        .map(|name| name.to_string())
        .collect();

    let unknown = features
        .iter()
        .map(AsRef::as_ref)
        .filter(|f| !RISK_FEATURES.contains(f))
        .map(str::to_string)
        .collect();

    (missing, unknown)
}
