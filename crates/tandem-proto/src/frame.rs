//! Topic-scoped frames on the publish and subscribe channels.

use crate::control::{check_line, validate_topic};
use crate::error::{ProtocolError, Result};
use std::fmt;
use std::str::FromStr;

/// One `"<topic> <payload>"` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    topic: String,
    payload: String,
}

impl Frame {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        validate_topic(&topic)?;
        Ok(Self {
            topic,
            payload: payload.into(),
        })
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> String {
        self.payload
    }

    /// Renders the frame as one transport line.
    pub fn encode(&self) -> Result<String> {
        let line = self.to_string();
        check_line(&line)?;
        Ok(line)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.topic, self.payload)
    }
}

impl FromStr for Frame {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self> {
        check_line(line)?;
        let (topic, payload) = line
            .split_once(' ')
            .ok_or_else(|| ProtocolError::MalformedFrame {
                line: line.to_owned(),
            })?;
        Self::new(topic, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame() {
        let frame: Frame = "tandem [a] 1 NODE x".parse().unwrap();
        assert_eq!(frame.topic(), "tandem");
        assert_eq!(frame.payload(), "[a] 1 NODE x");
        assert_eq!(frame.to_string(), "tandem [a] 1 NODE x");
    }

    #[test]
    fn test_frame_without_payload_is_malformed() {
        assert!(matches!(
            "tandem".parse::<Frame>(),
            Err(ProtocolError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_frame_rejects_bad_topic() {
        assert!(Frame::new("", "x").is_err());
        assert!(Frame::new("a b", "x").is_err());
        assert!(" leading".parse::<Frame>().is_err());
    }
}
