use thiserror::Error;

/// Failure of a single lookup against a backing store.
///
/// `NotFound` is not an error at this layer: store methods return
/// `Ok(None)` for it, and callers decide how to report the absence.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The lookup failed but a retry may succeed (timeout, 5xx, busy file).
    #[error("transient lookup failure: {reason}")]
    Transient { reason: String },

    /// The store itself is down (unreachable database, refused connection).
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn transient(reason: impl Into<String>) -> Self {
        StoreError::Transient {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Request-level failure of an insight request.
///
/// Everything else — unknown names, failed sub-lookups, missing label data —
/// degrades into the result structure instead of surfacing here.
#[derive(Debug, Error)]
pub enum InsightError {
    /// Precondition violation: rejected before any lookup runs.
    #[error("no drug names provided")]
    EmptyQuery,

    /// Precondition violation: pairwise work grows quadratically, so the
    /// number of inputs per request is capped.
    #[error("too many drugs in one request: {count} (limit {limit})")]
    TooManyDrugs { count: usize, limit: usize },

    /// A whole backing store is down. Surfaced once per request rather than
    /// as one failure entry per drug.
    #[error("{store} store unavailable: {reason}")]
    ServiceUnavailable { store: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_human_readable_messages() {
        let err = InsightError::TooManyDrugs { count: 12, limit: 8 };
        assert_eq!(
            err.to_string(),
            "too many drugs in one request: 12 (limit 8)"
        );

        let err = InsightError::ServiceUnavailable {
            store: "name lookup",
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "name lookup store unavailable: connection refused"
        );

        let err = StoreError::transient("timed out");
        assert_eq!(err.to_string(), "transient lookup failure: timed out");
    }
}
