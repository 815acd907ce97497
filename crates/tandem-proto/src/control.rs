//! Snapshot control lines and protocol limits.

use crate::error::{ProtocolError, Result};

/// Sent by a joining replica on the snapshot channel.
pub const REQUEST_SNAPSHOT: &str = "request_snapshot";

/// Envelope body that terminates a snapshot stream.
pub const FINISHED_SNAPSHOT: &str = "finished_snapshot";

/// Topic used when none is configured.
pub const DEFAULT_TOPIC: &str = "tandem";

/// Longest line accepted on any channel, excluding the line terminator.
pub const MAX_LINE_LEN: usize = 8192;

/// Returns `true` if `body` is the snapshot sentinel.
#[must_use]
pub fn is_finished_snapshot(body: &str) -> bool {
    body == FINISHED_SNAPSHOT
}

/// Rejects lines the transports could not carry.
pub fn check_line(line: &str) -> Result<()> {
    if line.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong {
            actual: line.len(),
            limit: MAX_LINE_LEN,
        });
    }
    if line.contains(['\r', '\n']) {
        return Err(ProtocolError::EmbeddedNewline);
    }
    Ok(())
}

/// Checks that `topic` can prefix a frame.
pub fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(ProtocolError::InvalidTopic {
            topic: topic.to_owned(),
            reason: "empty",
        });
    }
    if topic.chars().any(char::is_whitespace) {
        return Err(ProtocolError::InvalidTopic {
            topic: topic.to_owned(),
            reason: "contains whitespace",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_exact() {
        assert!(is_finished_snapshot("finished_snapshot"));
        assert!(!is_finished_snapshot("finished_snapshot "));
        assert!(!is_finished_snapshot("FINISHED_SNAPSHOT"));
    }

    #[test]
    fn test_check_line() {
        assert!(check_line("ok").is_ok());
        assert!(check_line(&"x".repeat(MAX_LINE_LEN)).is_ok());
        assert!(matches!(
            check_line(&"x".repeat(MAX_LINE_LEN + 1)),
            Err(ProtocolError::LineTooLong { .. })
        ));
        assert_eq!(check_line("a\nb"), Err(ProtocolError::EmbeddedNewline));
        assert_eq!(check_line("a\rb"), Err(ProtocolError::EmbeddedNewline));
    }

    #[test]
    fn test_validate_topic() {
        assert!(validate_topic(DEFAULT_TOPIC).is_ok());
        assert!(validate_topic("").is_err());
        assert!(validate_topic("two words").is_err());
    }
}
