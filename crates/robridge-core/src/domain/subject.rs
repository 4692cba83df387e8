use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_SUBJECT_LEN: usize = 20;

/// Numeric upstream identifier (user id, universe id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Parse a trimmed, all-digit identifier.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySubjectId);
        }

        let len = trimmed.chars().count();
        if len > MAX_SUBJECT_LEN {
            return Err(ValidationError::SubjectIdTooLong {
                len,
                max: MAX_SUBJECT_LEN,
            });
        }

        for (index, ch) in trimmed.chars().enumerate() {
            if !ch.is_ascii_digit() {
                return Err(ValidationError::SubjectIdInvalidChar { ch, index });
            }
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SubjectId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SubjectId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims() {
        let parsed = SubjectId::parse(" 156 ").expect("id should parse");
        assert_eq!(parsed.as_str(), "156");
    }

    #[test]
    fn rejects_non_digits() {
        let err = SubjectId::parse("12a").expect_err("must fail");
        assert_eq!(err, ValidationError::SubjectIdInvalidChar { ch: 'a', index: 2 });
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert_eq!(SubjectId::parse("  "), Err(ValidationError::EmptySubjectId));
        assert!(matches!(
            SubjectId::parse(&"9".repeat(21)),
            Err(ValidationError::SubjectIdTooLong { len: 21, max: 20 })
        ));
    }
}
