//! Storage for block descriptors.

use std::{
  mem,
  ops::{Index, IndexMut},
};

use crate::{
  block::{Block, BlockId},
  error::{HeapError, Resource},
};

/// Slot-based table of block descriptors with an optional capacity.
///
/// Removed descriptors leave a vacant slot that the next insert reuses, so a
/// [`BlockId`] stays stable for as long as its block is alive.
#[derive(Debug, Default)]
pub(crate) struct Arena {
  slots: Vec<Option<Block>>,
  vacant: Vec<BlockId>,
  live: usize,
  limit: Option<usize>,
}

impl Arena {
  pub fn with_limit(limit: Option<usize>) -> Self {
    Self {
      limit,
      ..Self::default()
    }
  }

  /// Number of live descriptors.
  pub fn len(&self) -> usize {
    self.live
  }

  /// Number of slots, live or vacant.
  pub fn slot_count(&self) -> usize {
    self.slots.len()
  }

  pub fn at_capacity(&self) -> bool {
    self.limit.is_some_and(|limit| self.live >= limit)
  }

  /// Makes sure the next [`Arena::insert`] succeeds without allocating.
  pub fn reserve(&mut self) -> Result<(), HeapError> {
    let oom = HeapError::OutOfMemory {
      resource: Resource::Descriptor,
      bytes: mem::size_of::<Block>(),
    };

    if self.at_capacity() {
      return Err(oom);
    }
    if self.vacant.is_empty() {
      self.slots.try_reserve(1).map_err(|_| oom)?;
    }
    Ok(())
  }

  pub fn insert(
    &mut self,
    block: Block,
  ) -> BlockId {
    self.live += 1;
    match self.vacant.pop() {
      Some(id) => {
        self.slots[id.0] = Some(block);
        id
      }
      None => {
        self.slots.push(Some(block));
        BlockId(self.slots.len() - 1)
      }
    }
  }

  pub fn remove(
    &mut self,
    id: BlockId,
  ) -> Option<Block> {
    let block = self.slots.get_mut(id.0)?.take()?;
    self.vacant.push(id);
    self.live -= 1;
    Some(block)
  }

  pub fn get(
    &self,
    id: BlockId,
  ) -> Option<&Block> {
    self.slots.get(id.0)?.as_ref()
  }
}

impl Index<BlockId> for Arena {
  type Output = Block;

  #[track_caller]
  fn index(
    &self,
    id: BlockId,
  ) -> &Block {
    match self.get(id) {
      Some(block) => block,
      None => panic!("stale block id {:?}", id),
    }
  }
}

impl IndexMut<BlockId> for Arena {
  #[track_caller]
  fn index_mut(
    &mut self,
    id: BlockId,
  ) -> &mut Block {
    match self.slots.get_mut(id.0).and_then(Option::as_mut) {
      Some(block) => block,
      None => panic!("stale block id {:?}", id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::label::Label;

  #[test]
  fn test_insert_remove_reuses_slot() {
    let mut arena = Arena::default();
    let a = arena.insert(Block::new(0, 10, Label::free()));
    let b = arena.insert(Block::new(10, 10, Label::free()));

    assert_eq!(arena.len(), 2);
    assert_eq!(arena.remove(a).map(|block| block.offset), Some(0));
    assert_eq!(arena.len(), 1);
    assert!(arena.get(a).is_none());

    let c = arena.insert(Block::new(20, 5, Label::free()));
    assert_eq!(c, a);
    assert_eq!(arena.slot_count(), 2);
    assert_eq!(arena[c].offset, 20);
    assert_eq!(arena[b].offset, 10);
  }

  #[test]
  fn test_remove_twice() {
    let mut arena = Arena::default();
    let a = arena.insert(Block::new(0, 10, Label::free()));

    assert!(arena.remove(a).is_some());
    assert!(arena.remove(a).is_none());
    assert_eq!(arena.len(), 0);
  }

  #[test]
  fn test_limit() {
    let mut arena = Arena::with_limit(Some(1));

    assert!(arena.reserve().is_ok());
    let a = arena.insert(Block::new(0, 10, Label::free()));

    assert!(arena.at_capacity());
    assert_eq!(
      arena.reserve(),
      Err(HeapError::OutOfMemory {
        resource: Resource::Descriptor,
        bytes: mem::size_of::<Block>(),
      })
    );

    arena.remove(a);
    assert!(arena.reserve().is_ok());
  }

  #[test]
  #[should_panic(expected = "stale block id")]
  fn test_stale_index_panics() {
    let mut arena = Arena::default();
    let a = arena.insert(Block::new(0, 10, Label::free()));
    arena.remove(a);

    let _ = &arena[a];
  }
}
