//! Business rules deciding what the outside world learns about a change.
//!
//! Consumers of the public topic never see credential material, cannot tell
//! a soft deletion from a hard one, and are not told about changes that
//! become empty once credentials are removed.

use crate::model::Change;

/// What to do with a decoded change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Publish this sanitized change.
    Publish(Change),
    /// Nothing externally visible changed.
    Suppress,
}

/// Applies redaction, soft-delete collapsing and no-op suppression, in
/// that order.
///
/// The input is consumed and a fresh [`Change`] is built; applying
/// `sanitize` to its own output yields the same verdict.
pub fn sanitize(change: Change) -> Verdict {
    let sanitized = change.redacted().collapse_soft_deletion();
    if sanitized.is_noop() {
        Verdict::Suppress
    } else {
        Verdict::Publish(sanitized)
    }
}
