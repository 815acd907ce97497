//! Error types for the tandem wire format.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while encoding or decoding protocol lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The line exceeds [`MAX_LINE_LEN`](crate::MAX_LINE_LEN).
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong { actual: usize, limit: usize },

    /// A payload contains a line break and cannot travel as one line.
    #[error("payload contains a line break")]
    EmbeddedNewline,

    /// An envelope does not start with a bracketed sender.
    #[error("missing sender in envelope: {line:?}")]
    MissingSender { line: String },

    /// A replica id is empty or contains a reserved character.
    #[error("invalid replica id {id:?}: {reason}")]
    InvalidReplicaId { id: String, reason: &'static str },

    /// A topic is empty or contains whitespace.
    #[error("invalid topic {topic:?}: {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    /// A pub/sub frame has no space between topic and payload.
    #[error("malformed frame: {line:?}")]
    MalformedFrame { line: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ProtocolError::LineTooLong {
            actual: 9000,
            limit: 8192,
        };
        assert_eq!(err.to_string(), "line too long: 9000 bytes (limit: 8192)");

        let err = ProtocolError::InvalidReplicaId {
            id: "a b".to_string(),
            reason: "contains whitespace",
        };
        assert_eq!(
            err.to_string(),
            "invalid replica id \"a b\": contains whitespace"
        );
    }

    #[test]
    fn test_errors_are_comparable() {
        let a = ProtocolError::MalformedFrame {
            line: "x".to_string(),
        };
        assert_eq!(a.clone(), a);
        assert_ne!(a, ProtocolError::EmbeddedNewline);
    }
}
