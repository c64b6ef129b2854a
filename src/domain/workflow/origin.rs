//! Provenance tags on extracted facts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DocumentId, ValidationError};

const USER_MESSAGE_TAG: &str = "user_message";
const FILE_TAG_PREFIX: &str = "file:";

/// Where a device constant came from.
///
/// Serialized as `user_message` or `file:<document id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Origin {
    /// Stated by the user directly, in text or as an MCQ answer.
    UserMessage,

    /// Inferred from an uploaded document.
    File(DocumentId),
}

impl Origin {
    /// Origin for a fact inferred from the given document.
    pub fn file(id: DocumentId) -> Self {
        Origin::File(id)
    }

    /// True if the fact was stated by the user.
    pub fn is_user(&self) -> bool {
        matches!(self, Origin::UserMessage)
    }

    /// Document identifier when the origin is a file.
    pub fn document_id(&self) -> Option<&DocumentId> {
        match self {
            Origin::File(id) => Some(id),
            Origin::UserMessage => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::UserMessage => f.write_str(USER_MESSAGE_TAG),
            Origin::File(id) => write!(f, "{}{}", FILE_TAG_PREFIX, id),
        }
    }
}

impl FromStr for Origin {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == USER_MESSAGE_TAG {
            return Ok(Origin::UserMessage);
        }
        match s.strip_prefix(FILE_TAG_PREFIX) {
            Some(id) => Ok(Origin::File(DocumentId::new(id)?)),
            None => Err(ValidationError::invalid_format(
                "origin",
                format!("expected 'user_message' or 'file:<id>', got '{}'", s),
            )),
        }
    }
}

impl TryFrom<String> for Origin {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocumentId {
        DocumentId::new(id).unwrap()
    }

    #[test]
    fn user_message_tag_round_trips() {
        let json = serde_json::to_string(&Origin::UserMessage).unwrap();
        assert_eq!(json, "\"user_message\"");
        let back: Origin = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Origin::UserMessage);
    }

    #[test]
    fn file_tag_carries_document_id() {
        let origin = Origin::file(doc("motor-datasheet"));
        assert_eq!(origin.to_string(), "file:motor-datasheet");
        assert_eq!(origin.document_id(), Some(&doc("motor-datasheet")));
        assert!(!origin.is_user());
    }

    #[test]
    fn parses_file_tag() {
        let origin: Origin = "file:abc123".parse().unwrap();
        assert_eq!(origin, Origin::File(doc("abc123")));
    }

    #[test]
    fn rejects_empty_file_id() {
        assert!("file:".parse::<Origin>().is_err());
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!("assistant".parse::<Origin>().is_err());
        assert!(serde_json::from_str::<Origin>("\"llm\"").is_err());
    }
}
