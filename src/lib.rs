//! # rheap - A List-Based Heap Allocator
//!
//! This crate manages allocations inside **one fixed buffer** obtained up front.
//! The buffer is partitioned into blocks, each either handed out to a client or
//! free for reuse, and the blocks are kept in address order.
//!
//! ## Overview
//!
//! ```text
//!   Heap after a few allocations:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          HEAP BUFFER                                 │
//!   │                                                                      │
//!   │   ┌─────────┬──────┬──────────┬─────────┬────────────────────────┐   │
//!   │   │   "A"   │ free │   "C"    │   "D"   │          free          │   │
//!   │   │  alloc  │      │  alloc   │  alloc  │                        │   │
//!   │   └─────────┴──────┴──────────┴─────────┴────────────────────────┘   │
//!   │   0x0                                                        end     │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Blocks cover the buffer with no gaps, and no two free blocks touch.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── heap       - Heap: create/destroy, allocate (split), deallocate (merge)
//!   ├── placement  - PlacementPolicy: first-fit and best-fit search
//!   ├── block      - Block descriptor (internal)
//!   ├── arena      - Descriptor table (internal)
//!   ├── buffer     - The calloc'd region (internal)
//!   ├── label      - Fixed-capacity block labels
//!   ├── config     - HeapConfig, optionally read from the environment
//!   └── error      - HeapError, InvariantViolation, ConfigError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rheap::{Heap, PlacementPolicy};
//!
//! let mut heap = Heap::create(100).unwrap();
//! heap.set_policy(PlacementPolicy::BestFit);
//!
//! let a = heap.allocate(30, "A").unwrap();
//! heap.bytes_mut(a).unwrap()[0] = 42;
//! assert_eq!(heap.bytes(a).unwrap()[0], 42);
//!
//! heap.deallocate(a).unwrap();
//! heap.destroy();
//! ```
//!
//! ## How It Works
//!
//! Allocating splits the chosen free block in two:
//!
//! ```text
//!   allocate(30, "A") on a 100 byte free block:
//!
//!   ┌──────────────────────────────────────────┐
//!   │               free (100)                 │
//!   └──────────────────────────────────────────┘
//!                       │
//!                       ▼
//!   ┌─────────────┬────────────────────────────┐
//!   │  "A" (30)   │         free (70)          │
//!   └─────────────┴────────────────────────────┘
//!   ▲
//!   └── Address returned to the caller (offset 0x0)
//! ```
//!
//! Freeing merges the block with free neighbours on both sides:
//!
//! ```text
//!   ┌──────────┬──────────┬──────────┬─────────┐
//!   │ free(20) │ "B" (30) │ free(10) │ "C"(40) │      deallocate(B)
//!   └──────────┴──────────┴──────────┴─────────┘
//!                       │
//!                       ▼
//!   ┌────────────────────────────────┬─────────┐
//!   │            free (60)           │ "C"(40) │
//!   └────────────────────────────────┴─────────┘
//! ```
//!
//! Descriptors live outside the buffer, linked both ways, so merging with the
//! left neighbour needs no rescan. An ordered index from address to descriptor
//! finds the block being freed.
//!
//! ## Placement Policies
//!
//! - **First-fit**: the first free block, in address order, that is big enough.
//! - **Best-fit**: the smallest free block that is big enough; an exact fit
//!   stops the scan, ties go to the lower address.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` is `Send` but not `Sync`
//! - **Fixed size**: the buffer never grows
//! - **No extra alignment**: addresses are byte offsets, blocks are exactly the
//!   requested size
//!
//! ## Logging
//!
//! Allocator events are emitted through the `log` facade once
//! [`enable_logging`] has been called.

use std::sync::atomic::{AtomicBool, Ordering};

#[macro_use]
#[allow(unused_macros)]
mod alog;

mod arena;
mod block;
mod buffer;
pub mod config;
pub mod error;
pub mod heap;
pub mod label;
pub mod placement;


pub use config::HeapConfig;
pub use error::{ConfigError, HeapError, InvariantViolation, Resource};
pub use heap::{Address, BlockInfo, Blocks, Heap, HeapStats};
pub use label::{LABEL_CAPACITY, Label};
pub use placement::PlacementPolicy;

static ALLOC_LOG: AtomicBool = AtomicBool::new(false);

/// Enables logging for the allocator.
pub fn enable_logging() {
  ALLOC_LOG.store(true, Ordering::Relaxed);
}

/// Disables logging for the allocator.
pub fn disable_logging() {
  ALLOC_LOG.store(false, Ordering::Relaxed);
}

pub(crate) fn should_log() -> bool {
  ALLOC_LOG.load(Ordering::Relaxed)
}

#[cfg(test)]
mod log_internal {
  use ctor::ctor;

  #[ctor]
  static INIT: () = {
    let _ = env_logger::builder().is_test(true).try_init();
    crate::enable_logging();
  };
}
