//! Change detection: decides whether a branch tip is new for a watch.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Changed,
    Unchanged,
}

/// Compares the last acted-on commit with the live tip.
///
/// - No previous commit: any tip is new (first observation bootstraps the state).
/// - An empty tip is never new; the inspector reports it as an error instead.
pub fn detect(previous: Option<&str>, current: &str) -> Detection {
    if current.trim().is_empty() {
        return Detection::Unchanged;
    }
    match previous {
        Some(prev) if prev == current => Detection::Unchanged,
        _ => Detection::Changed,
    }
}
