//! Attempt planning: which models to try, in which order.

use std::collections::HashSet;

/// Build the ordered candidate list for one request.
///
/// The primary model comes first, followed by the fallbacks in configured
/// order. Entries are trimmed, blank entries are dropped and duplicates are
/// removed by first occurrence (exact, case-sensitive match).
///
/// An empty result is valid output. Callers treat it as "no model
/// available", which is distinct from a malformed request.
pub fn plan_attempts<S: AsRef<str>>(primary: &str, fallbacks: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(primary)
        .chain(fallbacks.iter().map(AsRef::as_ref))
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .filter(|model| seen.insert(*model))
        .map(str::to_string)
        .collect()
}
