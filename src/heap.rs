use std::{collections::BTreeMap, fmt, ptr::NonNull};

use crate::{
  arena::Arena,
  block::{Block, BlockId},
  buffer::RawBuffer,
  config::HeapConfig,
  error::{HeapError, InvariantViolation},
  label::Label,
  placement::PlacementPolicy,
};

/// Location of a block, as a byte offset from the start of the heap buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
  pub const fn new(offset: usize) -> Self {
    Self(offset)
  }

  pub const fn offset(self) -> usize {
    self.0
  }
}

impl fmt::Display for Address {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:#x}", self.0)
  }
}

/// Copy of a block descriptor, as seen from outside the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub address: Address,
  pub size: usize,
  pub allocated: bool,
  pub label: Label,
}

impl BlockInfo {
  /// One past the last byte of the block.
  pub fn end(&self) -> usize {
    self.address.offset() + self.size
  }
}

impl From<&Block> for BlockInfo {
  fn from(block: &Block) -> Self {
    Self {
      address: Address(block.offset),
      size: block.size,
      allocated: block.allocated,
      label: block.label,
    }
  }
}

/// Occupancy summary of a heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub capacity: usize,
  pub used: usize,
  pub free: usize,
  pub blocks: usize,
  pub allocated_blocks: usize,
  pub free_blocks: usize,
  pub largest_free: usize,
}

/// A list-based allocator over one fixed buffer.
///
/// The buffer is partitioned into blocks kept in address order. Allocation
/// picks a free block according to the heap's [`PlacementPolicy`] and splits
/// off whatever it does not need; deallocation merges the freed block with
/// free neighbours on both sides, so no two free blocks are ever adjacent.
pub struct Heap {
  buffer: RawBuffer,
  blocks: Arena,
  // Block start offset -> descriptor, for O(log n) lookup on free.
  index: BTreeMap<usize, BlockId>,
  head: BlockId,
  policy: PlacementPolicy,
}

impl Heap {
  /// Creates a heap of `bytes` bytes with the default configuration.
  pub fn create(bytes: usize) -> Result<Self, HeapError> {
    Self::with_config(bytes, HeapConfig::default())
  }

  /// Creates a heap of `bytes` bytes holding a single free block labelled
  /// `START`.
  pub fn with_config(
    bytes: usize,
    config: HeapConfig,
  ) -> Result<Self, HeapError> {
    if bytes == 0 {
      awarn!("Refusing to create an empty heap");
      return Err(HeapError::ZeroSize);
    }

    // Descriptor first, then the buffer. If the buffer fails the arena is
    // dropped on the way out.
    let mut blocks = Arena::with_limit(config.max_blocks);
    blocks.reserve().inspect_err(|err| {
      awarn!("Heap creation failed: {}", err);
    })?;
    let buffer = RawBuffer::reserve(bytes).inspect_err(|err| {
      awarn!("Heap creation failed: {}", err);
    })?;

    let head = blocks.insert(Block::new(0, bytes, Label::start()));
    let index = BTreeMap::from([(0, head)]);

    ainfo!("Created heap of {} bytes ({})", bytes, config.policy);

    Ok(Self {
      buffer,
      blocks,
      index,
      head,
      policy: config.policy,
    })
  }

  /// Releases every block descriptor, then the buffer.
  ///
  /// Every address handed out by this heap is invalid afterwards. Dropping the
  /// heap has the same effect.
  pub fn destroy(mut self) {
    let capacity = self.capacity();
    let mut cursor = Some(self.head);
    let mut released = 0;

    while let Some(id) = cursor {
      cursor = self.blocks.remove(id).and_then(|block| block.next);
      released += 1;
    }
    self.index.clear();

    ainfo!(
      "Destroyed heap of {} bytes, released {} descriptors",
      capacity,
      released
    );
  }

  pub fn capacity(&self) -> usize {
    self.buffer.len()
  }

  pub fn policy(&self) -> PlacementPolicy {
    self.policy
  }

  /// Changes the policy used by every later [`Heap::allocate`].
  pub fn set_policy(
    &mut self,
    policy: PlacementPolicy,
  ) {
    adebug!("Placement policy {} -> {}", self.policy, policy);
    self.policy = policy;
  }

  /// Hands out a block of exactly `bytes` bytes tagged with `label`.
  ///
  /// Labels longer than [`LABEL_CAPACITY`](crate::LABEL_CAPACITY) bytes are
  /// truncated. On failure the heap is left untouched.
  pub fn allocate(
    &mut self,
    bytes: usize,
    label: &str,
  ) -> Result<Address, HeapError> {
    if bytes == 0 {
      return Err(HeapError::ZeroSize);
    }

    let Some(id) = self.policy.search(self.walk(), bytes) else {
      awarn!("No free block of {} bytes under {}", bytes, self.policy);
      return Err(HeapError::NoFit {
        requested: bytes,
        policy: self.policy,
      });
    };
    atrace!("Found free block {:?}", self.blocks[id]);

    if self.blocks[id].size > bytes {
      let offset = self.blocks[id].offset;
      self.blocks.reserve().inspect_err(|err| {
        awarn!("Cannot split block at {:#x}: {}", offset, err);
      })?;
      self.split(id, bytes);
    }

    let block = &mut self.blocks[id];
    block.allocate(Label::new(label));
    let address = Address(block.offset);
    adebug!("Allocated {} bytes at {} ({})", bytes, address, block.label);

    self.condition_check();
    Ok(address)
  }

  /// Returns the block at `address` to the heap, merging it with free
  /// neighbours.
  ///
  /// Fails with [`HeapError::InvalidFree`] when `address` is not the start of
  /// a currently allocated block; the heap is left untouched in that case.
  pub fn deallocate(
    &mut self,
    address: Address,
  ) -> Result<(), HeapError> {
    let invalid = HeapError::InvalidFree { address };

    if address.offset() >= self.capacity() {
      awarn!("Free of {} outside a {} byte heap", address, self.capacity());
      return Err(invalid);
    }

    let id = match self.index.get(&address.offset()) {
      Some(&id) if self.blocks[id].allocated => id,
      Some(_) => {
        awarn!("Double free of {}", address);
        return Err(invalid);
      }
      None => {
        awarn!("Free of {}, which is not the start of a block", address);
        return Err(invalid);
      }
    };

    adebug!("Deallocating block {:?}", self.blocks[id]);
    self.blocks[id].release();

    let mut target = id;
    if let Some(prev) = self.blocks[id].prev.filter(|&prev| self.blocks[prev].is_free()) {
      self.coalesce(prev, id);
      target = prev;
    }
    if let Some(next) = self.blocks[target].next.filter(|&next| self.blocks[next].is_free()) {
      self.coalesce(target, next);
    }
    atrace!("Freed region is now {:?}", self.blocks[target]);

    self.condition_check();
    Ok(())
  }

  /// Carves `bytes` off the front of block `id`, linking the remainder in
  /// after it. The caller must have reserved a descriptor.
  fn split(
    &mut self,
    id: BlockId,
    bytes: usize,
  ) {
    let Some(mut rest) = self.blocks[id].split(bytes) else {
      return;
    };
    rest.prev = Some(id);
    rest.next = self.blocks[id].next;

    let offset = rest.offset;
    let next = rest.next;
    let rest_id = self.blocks.insert(rest);

    if let Some(next) = next {
      self.blocks[next].prev = Some(rest_id);
    }
    self.blocks[id].next = Some(rest_id);
    self.index.insert(offset, rest_id);
    atrace!("Split off free block at {:#x}", offset);
  }

  /// Folds `right` into its left neighbour `left`, releasing its descriptor.
  fn coalesce(
    &mut self,
    left: BlockId,
    right: BlockId,
  ) {
    let Some(block) = self.blocks.remove(right) else {
      return;
    };
    self.index.remove(&block.offset);
    if let Some(next) = block.next {
      self.blocks[next].prev = Some(left);
    }
    atrace!("Merging block at {:#x} into {:#x}", block.offset, self.blocks[left].offset);
    self.blocks[left].merge(block);
  }

  fn walk(&self) -> Walk<'_> {
    Walk {
      blocks: &self.blocks,
      cursor: Some(self.head),
    }
  }

  fn allocated_block(
    &self,
    address: Address,
  ) -> Option<&Block> {
    let id = *self.index.get(&address.offset())?;
    Some(&self.blocks[id]).filter(|block| block.allocated)
  }

  /// Pointer to the data of the allocated block at `address`.
  pub fn as_ptr(
    &self,
    address: Address,
  ) -> Option<NonNull<u8>> {
    let block = self.allocated_block(address)?;
    self.buffer.ptr_at(block.offset)
  }

  /// The data of the allocated block at `address`.
  pub fn bytes(
    &self,
    address: Address,
  ) -> Option<&[u8]> {
    let block = self.allocated_block(address)?;
    self.buffer.slice(block.offset, block.size)
  }

  /// The data of the allocated block at `address`, mutably.
  pub fn bytes_mut(
    &mut self,
    address: Address,
  ) -> Option<&mut [u8]> {
    let (offset, size) = self
      .allocated_block(address)
      .map(|block| (block.offset, block.size))?;
    self.buffer.slice_mut(offset, size)
  }

  /// Blocks in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks { walk: self.walk() }
  }

  /// The block starting at `address`, free or not.
  pub fn block_at(
    &self,
    address: Address,
  ) -> Option<BlockInfo> {
    let id = *self.index.get(&address.offset())?;
    Some(BlockInfo::from(&self.blocks[id]))
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      capacity: self.capacity(),
      ..HeapStats::default()
    };

    for (_, block) in self.walk() {
      stats.blocks += 1;
      if block.allocated {
        stats.allocated_blocks += 1;
        stats.used += block.size;
      } else {
        stats.free_blocks += 1;
        stats.free += block.size;
        stats.largest_free = stats.largest_free.max(block.size);
      }
    }
    stats
  }

  /// Checks the block list: contiguous cover of the whole buffer, no empty
  /// blocks, no adjacent free blocks, consistent back links and index.
  pub fn validate(&self) -> Result<(), InvariantViolation> {
    let mut expected = 0;
    let mut reachable = 0;
    let mut prev: Option<(BlockId, &Block)> = None;

    // A cycle would walk forever; cut off once every slot has been visited.
    for (id, block) in self.walk().take(self.blocks.slot_count() + 1) {
      let address = Address(block.offset);

      if block.offset != expected {
        return Err(match prev {
          None => InvariantViolation::HeadNotAtStart(address),
          Some(_) => InvariantViolation::Gap {
            expected: Address(expected),
            found: address,
          },
        });
      }
      if block.size == 0 {
        return Err(InvariantViolation::EmptyBlock(address));
      }
      if block.prev != prev.map(|(prev_id, _)| prev_id) {
        return Err(InvariantViolation::BrokenBackLink(address));
      }
      if let Some((_, left)) = prev {
        if left.is_free() && block.is_free() {
          return Err(InvariantViolation::AdjacentFree {
            left: Address(left.offset),
            right: address,
          });
        }
      }
      if self.index.get(&block.offset) != Some(&id) {
        return Err(InvariantViolation::IndexMismatch(address));
      }

      expected = block.end();
      reachable += 1;
      prev = Some((id, block));
    }

    if reachable != self.blocks.len() {
      return Err(InvariantViolation::LeakedDescriptors {
        live: self.blocks.len(),
        reachable,
      });
    }
    if expected != self.capacity() {
      return Err(InvariantViolation::SizeMismatch {
        covered: expected,
        capacity: self.capacity(),
      });
    }
    if self.index.len() != reachable {
      let stray = self
        .index
        .iter()
        .find(|&(&offset, &id)| self.blocks.get(id).is_none_or(|block| block.offset != offset))
        .map_or(expected, |(&offset, _)| offset);
      return Err(InvariantViolation::IndexMismatch(Address(stray)));
    }
    Ok(())
  }

  #[track_caller]
  fn condition_check(&self) {
    #[cfg(debug_assertions)]
    if let Err(violation) = self.validate() {
      aerror!("Heap condition check failed: {}", violation);
      panic!("heap invariant broken: {}", violation);
    }
  }
}

impl fmt::Debug for Heap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("capacity", &self.capacity())
      .field("policy", &self.policy)
      .field("blocks", &self.blocks().collect::<Vec<_>>())
      .finish()
  }
}

impl fmt::Display for Heap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "heap: {} bytes, {}", self.capacity(), self.policy)?;
    for block in self.blocks() {
      writeln!(
        f,
        "  [{:#x}, {:#x}) {:>8} {:<16} {}",
        block.address.offset(),
        block.end(),
        block.size,
        block.label,
        if block.allocated { "allocated" } else { "free" },
      )?;
    }
    Ok(())
  }
}

/// Follows `next` links from the head.
struct Walk<'a> {
  blocks: &'a Arena,
  cursor: Option<BlockId>,
}

impl<'a> Iterator for Walk<'a> {
  type Item = (BlockId, &'a Block);

  fn next(&mut self) -> Option<Self::Item> {
    let id = self.cursor?;
    let block = self.blocks.get(id)?;
    self.cursor = block.next;
    Some((id, block))
  }
}

/// Iterator over the blocks of a [`Heap`], in address order.
pub struct Blocks<'a> {
  walk: Walk<'a>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    self.walk.next().map(|(_, block)| BlockInfo::from(block))
  }
}
