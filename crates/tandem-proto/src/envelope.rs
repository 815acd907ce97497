//! The `"[sender] body"` envelope every replicated message travels in.

use crate::control::{check_line, is_finished_snapshot, FINISHED_SNAPSHOT};
use crate::error::{ProtocolError, Result};
use crate::replica::ReplicaId;
use std::fmt;
use std::str::FromStr;

/// A message body tagged with the replica that sent it.
///
/// # Example
///
/// ```rust
/// use tandem_proto::{Envelope, ReplicaId};
///
/// let sender = ReplicaId::new("alice").unwrap();
/// let envelope = Envelope::new(sender.clone(), "17 NODE n1");
/// assert_eq!(envelope.to_string(), "[alice] 17 NODE n1");
///
/// let parsed: Envelope = "[alice] 17 NODE n1".parse().unwrap();
/// assert!(parsed.is_from(&sender));
/// assert_eq!(parsed.body(), "17 NODE n1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    sender: ReplicaId,
    body: String,
}

impl Envelope {
    pub fn new(sender: ReplicaId, body: impl Into<String>) -> Self {
        Self {
            sender,
            body: body.into(),
        }
    }

    /// The sentinel that ends a snapshot stream.
    #[must_use]
    pub fn finished_snapshot(sender: ReplicaId) -> Self {
        Self::new(sender, FINISHED_SNAPSHOT)
    }

    #[must_use]
    pub fn sender(&self) -> &ReplicaId {
        &self.sender
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }

    /// Returns `true` if this envelope was sent by `replica`.
    #[must_use]
    pub fn is_from(&self, replica: &ReplicaId) -> bool {
        self.sender == *replica
    }

    #[must_use]
    pub fn is_finished_snapshot(&self) -> bool {
        is_finished_snapshot(&self.body)
    }

    /// Renders the envelope as one transport line.
    pub fn encode(&self) -> Result<String> {
        let line = self.to_string();
        check_line(&line)?;
        Ok(line)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.sender, self.body)
    }
}

impl FromStr for Envelope {
    type Err = ProtocolError;

    /// Splits at the first space; the leading token must be `[sender]`.
    /// A line with no space carries an empty body.
    fn from_str(line: &str) -> Result<Self> {
        check_line(line)?;
        let (token, body) = line.split_once(' ').unwrap_or((line, ""));
        let sender = token
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| ProtocolError::MissingSender {
                line: line.to_owned(),
            })?;
        Ok(Self {
            sender: ReplicaId::new(sender)?,
            body: body.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ReplicaId {
        ReplicaId::new(s).unwrap()
    }

    #[test]
    fn test_body_keeps_inner_spaces() {
        let env: Envelope = "[a] 5 SET n1 title hello world".parse().unwrap();
        assert_eq!(env.sender().as_str(), "a");
        assert_eq!(env.body(), "5 SET n1 title hello world");
    }

    #[test]
    fn test_sentinel_envelope() {
        let env = Envelope::finished_snapshot(id("hub"));
        assert_eq!(env.to_string(), "[hub] finished_snapshot");
        let parsed: Envelope = "[hub] finished_snapshot".parse().unwrap();
        assert!(parsed.is_finished_snapshot());
    }

    #[test]
    fn test_missing_brackets_rejected() {
        assert!(matches!(
            "alice 1 NODE x".parse::<Envelope>(),
            Err(ProtocolError::MissingSender { .. })
        ));
        assert!(matches!(
            "[alice 1 NODE x".parse::<Envelope>(),
            Err(ProtocolError::MissingSender { .. })
        ));
        assert!("[] body".parse::<Envelope>().is_err());
    }

    #[test]
    fn test_line_without_body() {
        let env: Envelope = "[solo]".parse().unwrap();
        assert_eq!(env.body(), "");
    }

    #[test]
    fn test_encode_rejects_newline() {
        let env = Envelope::new(id("a"), "1 NODE x\n2 NODE y");
        assert_eq!(env.encode(), Err(ProtocolError::EmbeddedNewline));
        assert_eq!(
            Envelope::new(id("a"), "1 NODE x").encode().unwrap(),
            "[a] 1 NODE x"
        );
    }

    #[test]
    fn test_is_from() {
        let env = Envelope::new(id("a"), "x");
        assert!(env.is_from(&id("a")));
        assert!(!env.is_from(&id("b")));
    }
}
