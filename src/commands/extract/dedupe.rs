use super::*;

/// Keeps the first entry per postal code. The first sighting carries the
/// hierarchy context that was active when the row was read, so later repeats
/// (usually a page scanned twice) are dropped rather than merged.
pub fn dedupe(entries: Vec<LocationEntry>) -> Vec<LocationEntry> {
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    let mut unique = Vec::with_capacity(entries.len());

    for entry in entries {
        if seen.insert(entry.postal_code.clone()) {
            unique.push(entry);
        }
    }

    unique
}
