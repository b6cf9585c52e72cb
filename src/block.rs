use crate::label::Label;

/// Slot of a descriptor in the heap's block arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct BlockId(pub(crate) usize);

/// Descriptor of one contiguous region of the managed buffer.
///
/// Descriptors are linked in address order in both directions. `offset` is
/// relative to the start of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
  pub offset: usize,
  pub size: usize,
  pub allocated: bool,
  pub label: Label,
  pub prev: Option<BlockId>,
  pub next: Option<BlockId>,
}

impl Block {
  pub fn new(
    offset: usize,
    size: usize,
    label: Label,
  ) -> Self {
    Self {
      offset,
      size,
      allocated: false,
      label,
      prev: None,
      next: None,
    }
  }

  /// One past the last byte of the block.
  pub fn end(&self) -> usize {
    self.offset + self.size
  }

  pub fn is_free(&self) -> bool {
    !self.allocated
  }

  pub fn fits(
    &self,
    bytes: usize,
  ) -> bool {
    self.is_free() && self.size >= bytes
  }

  /// Marks the block as handed out under `label`.
  pub fn allocate(
    &mut self,
    label: Label,
  ) {
    self.allocated = true;
    self.label = label;
  }

  /// Marks the block as free.
  pub fn release(&mut self) {
    self.allocated = false;
    self.label = Label::free();
  }

  /// Shrinks this block to `size` bytes and returns a free block covering the
  /// rest. Returns `None` when nothing would remain.
  ///
  /// The remainder is not linked: the caller is responsible for wiring it in.
  pub fn split(
    &mut self,
    size: usize,
  ) -> Option<Block> {
    if size >= self.size {
      return None;
    }

    let rest = Block::new(self.offset + size, self.size - size, Label::free());
    self.size = size;
    Some(rest)
  }

  /// Absorbs the block directly after this one.
  pub fn merge(
    &mut self,
    other: Block,
  ) {
    debug_assert!(self.is_adjacent(&other), "Blocks are not adjacent");

    self.size += other.size;
    self.next = other.next;
  }

  pub fn is_adjacent(
    &self,
    other: &Block,
  ) -> bool {
    self.end() == other.offset
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_block_split() {
    let mut block = Block::new(0x100, 1024, Label::start());
    let rest = block.split(512).unwrap();

    assert_eq!(block.size, 512);
    assert_eq!(rest.size, 512);
    assert_eq!(rest.offset, 0x300);
    assert_eq!(block.end(), rest.offset);
    assert!(rest.is_free());
    assert_eq!(rest.label, "FREE");
  }

  #[test]
  fn test_block_split_not_even() {
    let mut block = Block::new(0, 100, Label::start());
    let rest = block.split(30).unwrap();

    assert_eq!(block.size, 30);
    assert_eq!(rest.size, 70);
    assert_eq!(rest.offset, 30);
  }

  #[test]
  fn test_block_split_exact() {
    let mut block = Block::new(0, 100, Label::start());

    assert!(block.split(100).is_none());
    assert_eq!(block.size, 100);
  }

  #[test]
  fn test_block_split_too_large() {
    let mut block = Block::new(0, 100, Label::start());

    assert!(block.split(200).is_none());
    assert_eq!(block.size, 100);
    assert!(block.is_free());
  }

  #[test]
  fn test_block_merge() {
    let mut left = Block::new(0, 30, Label::free());
    let mut right = Block::new(30, 70, Label::free());
    right.next = Some(BlockId(7));

    left.merge(right);

    assert_eq!(left.offset, 0);
    assert_eq!(left.size, 100);
    assert_eq!(left.next, Some(BlockId(7)));
  }

  #[test]
  fn test_block_is_adjacent() {
    let left = Block::new(0, 30, Label::free());
    let right = Block::new(30, 70, Label::free());
    let far = Block::new(50, 10, Label::free());

    assert!(left.is_adjacent(&right));
    assert!(!right.is_adjacent(&left));
    assert!(!left.is_adjacent(&far));
  }

  #[test]
  fn test_fits() {
    let mut block = Block::new(0, 30, Label::free());

    assert!(block.fits(30));
    assert!(block.fits(1));
    assert!(!block.fits(31));

    block.allocate(Label::new("A"));
    assert!(!block.fits(1));
    assert_eq!(block.label, "A");

    block.release();
    assert!(block.fits(30));
    assert_eq!(block.label, "FREE");
  }
}
