//! Detection of known customer names in a query.

use support_core::KnownName;

/// Display names of every known customer whose full name occurs in `query`.
///
/// Matching is a case-insensitive substring test with no word boundaries,
/// so "Al Li" also matches inside "Sal Liu". Results follow directory order
/// and contain each display name once.
pub fn match_names(query: &str, known_names: &[KnownName]) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut mentioned: Vec<String> = Vec::new();

    for name in known_names {
        if name.normalized.trim().is_empty() {
            continue;
        }
        if lowered.contains(&name.normalized) && !mentioned.contains(&name.display) {
            mentioned.push(name.display.clone());
        }
    }

    mentioned
}
