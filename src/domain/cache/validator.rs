//! Document overlap validation for semantic cache candidates

use std::collections::HashSet;

/// Jaccard similarity between two sets of document identifiers.
///
/// Duplicates within an input are ignored. Returns `0.0` if either side is
/// empty, so a candidate with no documents can never pass the gate.
pub fn validate<A, B>(current: &[A], cached: &[B]) -> f32
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let current: HashSet<&str> = current.iter().map(AsRef::as_ref).collect();
    let cached: HashSet<&str> = cached.iter().map(AsRef::as_ref).collect();

    if current.is_empty() || cached.is_empty() {
        return 0.0;
    }

    let intersection = current.intersection(&cached).count();
    let union = current.union(&cached).count();

    intersection as f32 / union as f32
}
