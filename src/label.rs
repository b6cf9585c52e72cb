use std::fmt;

use arrayvec::ArrayString;

/// Maximum number of bytes a [`Label`] stores.
pub const LABEL_CAPACITY: usize = 16;

/// A short fixed-capacity tag attached to a block.
///
/// Longer input is cut to at most [`LABEL_CAPACITY`] bytes, backing off to the
/// nearest UTF-8 character boundary so the stored text is always valid.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Label(ArrayString<LABEL_CAPACITY>);

impl Label {
  /// Creates a label from `text`, truncating it to the label capacity.
  pub fn new(text: &str) -> Self {
    let mut end = text.len().min(LABEL_CAPACITY);
    while !text.is_char_boundary(end) {
      end -= 1;
    }

    let mut label = ArrayString::new();
    label.push_str(&text[..end]);
    Self(label)
  }

  /// Label of the block a fresh heap starts with.
  pub fn start() -> Self {
    Self::new("START")
  }

  /// Label given to free blocks.
  pub fn free() -> Self {
    Self::new("FREE")
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<&str> for Label {
  fn from(text: &str) -> Self {
    Self::new(text)
  }
}

impl PartialEq<str> for Label {
  fn eq(
    &self,
    other: &str,
  ) -> bool {
    self.as_str() == other
  }
}

impl PartialEq<&str> for Label {
  fn eq(
    &self,
    other: &&str,
  ) -> bool {
    self.as_str() == *other
  }
}

impl fmt::Debug for Label {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    fmt::Debug::fmt(self.as_str(), f)
  }
}

impl fmt::Display for Label {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.pad(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_short_label_kept() {
    let label = Label::new("A");

    assert_eq!(label, "A");
    assert_eq!(label.len(), 1);
  }

  #[test]
  fn test_long_label_truncated() {
    let label = Label::new("a-label-that-is-way-too-long");

    assert_eq!(label.len(), LABEL_CAPACITY);
    assert_eq!(label, "a-label-that-is-");
  }

  #[test]
  fn test_truncation_respects_char_boundary() {
    // 15 ASCII bytes followed by a 2 byte character straddling the limit.
    let label = Label::new("aaaaaaaaaaaaaaaé");

    assert_eq!(label.len(), 15);
    assert_eq!(label, "aaaaaaaaaaaaaaa");
  }

  #[test]
  fn test_exact_capacity() {
    let text = "0123456789abcdef";
    assert_eq!(text.len(), LABEL_CAPACITY);

    assert_eq!(Label::new(text), text);
  }

  #[test]
  fn test_multibyte_only_label() {
    // Six 3 byte characters: only five fit in 16 bytes.
    let label = Label::new("日本語日本語");

    assert_eq!(label, "日本語日本");
    assert_eq!(label.len(), 15);
    assert_eq!(Label::new("日本語日本語"), label);
  }

  #[test]
  fn test_markers() {
    assert_eq!(Label::start().to_string(), "START");
    assert_eq!(Label::free().to_string(), "FREE");
    assert!(Label::default().is_empty());
  }
}
