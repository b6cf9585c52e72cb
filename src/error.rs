use std::fmt;

use crate::{heap::Address, placement::PlacementPolicy};

/// Resource the allocator failed to obtain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  /// The backing buffer requested by [`Heap::create`](crate::Heap::create).
  Buffer,
  /// A block descriptor needed to split a free block.
  Descriptor,
}

impl fmt::Display for Resource {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Resource::Buffer => f.write_str("heap buffer"),
      Resource::Descriptor => f.write_str("block descriptor"),
    }
  }
}

/// Errors returned by heap operations.
///
/// A failed call never leaves partial state behind: the heap is exactly as it
/// was before the call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
  #[error("out of memory while obtaining a {resource} ({bytes} bytes)")]
  OutOfMemory { resource: Resource, bytes: usize },
  #[error("no free block of {requested} bytes under {policy}")]
  NoFit {
    requested: usize,
    policy: PlacementPolicy,
  },
  #[error("{address} is not an allocated block of this heap")]
  InvalidFree { address: Address },
  #[error("zero-sized request")]
  ZeroSize,
}

/// A broken structural invariant, reported by [`Heap::validate`](crate::Heap::validate).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
  #[error("head block starts at {0}, expected 0x0")]
  HeadNotAtStart(Address),
  #[error("block at {found} should start at {expected}")]
  Gap { expected: Address, found: Address },
  #[error("empty block at {0}")]
  EmptyBlock(Address),
  #[error("adjacent free blocks at {left} and {right}")]
  AdjacentFree { left: Address, right: Address },
  #[error("back link of block at {0} does not point at its predecessor")]
  BrokenBackLink(Address),
  #[error("blocks cover {covered} bytes of a {capacity} byte heap")]
  SizeMismatch { covered: usize, capacity: usize },
  #[error("address index is out of sync with the block list at {0}")]
  IndexMismatch(Address),
  #[error("{live} live descriptors but {reachable} reachable from the head")]
  LeakedDescriptors { live: usize, reachable: usize },
}

/// Errors produced while reading a [`HeapConfig`](crate::HeapConfig).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("unknown placement policy {0:?}, expected first-fit or best-fit")]
  UnknownPolicy(String),
  #[error("invalid value {value:?} for {key}: expected a positive integer")]
  InvalidNumber { key: &'static str, value: String },
}
