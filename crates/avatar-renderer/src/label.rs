//! The text drawn on an avatar.

use std::fmt;
use std::ops::Deref;

use crate::error::LabelError;

/// Maximum label length in bytes.
pub const INITIALS_MAX_SIZE: usize = 8;

/// A validated label: non-empty, at most [`INITIALS_MAX_SIZE`] bytes, no
/// control characters. Always rendered as a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label(String);

impl Label {
    /// Validate `text` as a label without modifying it.
    pub fn parse(text: &str) -> Result<Self, LabelError> {
        if text.is_empty() {
            return Err(LabelError::Empty);
        }
        if text.len() > INITIALS_MAX_SIZE {
            return Err(LabelError::TooLong {
                len: text.len(),
                max: INITIALS_MAX_SIZE,
            });
        }
        if text.chars().any(char::is_control) {
            return Err(LabelError::ControlCharacter);
        }
        Ok(Self(text.to_string()))
    }

    /// Trim surrounding whitespace and cut `text` to at most
    /// [`INITIALS_MAX_SIZE`] bytes at a char boundary, then validate.
    pub fn truncate(text: &str) -> Result<Self, LabelError> {
        let text = text.trim();
        let mut end = text.len().min(INITIALS_MAX_SIZE);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Self::parse(text[..end].trim_end())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Label {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_short_labels() {
        assert_eq!(Label::parse("AB").unwrap().as_str(), "AB");
        assert_eq!(Label::parse("ЖЯ").unwrap().len(), 4);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!(Label::parse(""), Err(LabelError::Empty));
        assert_eq!(
            Label::parse("ABCDEFGHI"),
            Err(LabelError::TooLong { len: 9, max: 8 })
        );
        assert_eq!(Label::parse("A\nB"), Err(LabelError::ControlCharacter));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // Each Cyrillic letter is two bytes; the fifth would end at byte 10
        let label = Label::truncate("АБВГД").unwrap();
        assert_eq!(label.as_str(), "АБВГ");

        // Three-byte chars: only two fit in eight bytes
        let label = Label::truncate("日本語").unwrap();
        assert_eq!(label.as_str(), "日本");
    }

    #[test]
    fn test_truncate_trims_whitespace() {
        assert_eq!(Label::truncate("  JD  ").unwrap().as_str(), "JD");
        assert_eq!(Label::truncate("   "), Err(LabelError::Empty));
    }
}
