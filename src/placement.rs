//! Placement policies: choosing which free block serves a request.

use std::{fmt, str::FromStr};

use crate::{
  block::{Block, BlockId},
  error::ConfigError,
};

/// How [`Heap::allocate`](crate::Heap::allocate) picks a free block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlacementPolicy {
  /// Use the first free block, in address order, that is large enough.
  #[default]
  FirstFit,
  /// Use the smallest free block that is large enough.
  BestFit,
}

impl PlacementPolicy {
  /// Scans `blocks` (in address order) for a free block of at least `bytes`.
  pub(crate) fn search<'a, I>(
    self,
    blocks: I,
    bytes: usize,
  ) -> Option<BlockId>
  where
    I: IntoIterator<Item = (BlockId, &'a Block)>,
  {
    match self {
      PlacementPolicy::FirstFit => first_fit(blocks, bytes),
      PlacementPolicy::BestFit => best_fit(blocks, bytes),
    }
  }
}

fn first_fit<'a, I>(
  blocks: I,
  bytes: usize,
) -> Option<BlockId>
where
  I: IntoIterator<Item = (BlockId, &'a Block)>,
{
  blocks
    .into_iter()
    .find(|(_, block)| block.fits(bytes))
    .map(|(id, _)| id)
}

fn best_fit<'a, I>(
  blocks: I,
  bytes: usize,
) -> Option<BlockId>
where
  I: IntoIterator<Item = (BlockId, &'a Block)>,
{
  let mut best: Option<(BlockId, usize)> = None;

  for (id, block) in blocks {
    if !block.fits(bytes) {
      continue;
    }
    // Nothing can beat an exact fit.
    if block.size == bytes {
      return Some(id);
    }
    // Strictly smaller only, so ties go to the block seen first.
    if best.is_none_or(|(_, size)| block.size < size) {
      best = Some((id, block.size));
    }
  }

  best.map(|(id, _)| id)
}

impl fmt::Display for PlacementPolicy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      PlacementPolicy::FirstFit => f.write_str("first-fit"),
      PlacementPolicy::BestFit => f.write_str("best-fit"),
    }
  }
}

impl FromStr for PlacementPolicy {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "first-fit" | "firstfit" | "first_fit" | "first" => Ok(PlacementPolicy::FirstFit),
      "best-fit" | "bestfit" | "best_fit" | "best" => Ok(PlacementPolicy::BestFit),
      _ => Err(ConfigError::UnknownPolicy(s.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::label::Label;

  /// Builds a contiguous run of blocks from `(size, allocated)` pairs.
  fn blocks(layout: &[(usize, bool)]) -> Vec<(BlockId, Block)> {
    let mut offset = 0;
    layout
      .iter()
      .enumerate()
      .map(|(i, &(size, allocated))| {
        let mut block = Block::new(offset, size, Label::free());
        block.allocated = allocated;
        offset += size;
        (BlockId(i), block)
      })
      .collect()
  }

  fn search(
    policy: PlacementPolicy,
    list: &[(BlockId, Block)],
    bytes: usize,
  ) -> Option<BlockId> {
    policy.search(list.iter().map(|(id, block)| (*id, block)), bytes)
  }

  #[test]
  fn test_first_fit_takes_first_adequate() {
    let list = blocks(&[(50, false), (10, true), (10, false), (30, false)]);

    assert_eq!(search(PlacementPolicy::FirstFit, &list, 20), Some(BlockId(0)));
    assert_eq!(search(PlacementPolicy::FirstFit, &list, 51), None);
  }

  #[test]
  fn test_first_fit_skips_allocated() {
    let list = blocks(&[(50, true), (10, false), (30, false)]);

    assert_eq!(search(PlacementPolicy::FirstFit, &list, 20), Some(BlockId(2)));
  }

  #[test]
  fn test_first_fit_is_deterministic() {
    let list = blocks(&[(10, false), (40, true), (25, false), (25, false)]);

    let first = search(PlacementPolicy::FirstFit, &list, 20);
    for _ in 0..8 {
      assert_eq!(search(PlacementPolicy::FirstFit, &list, 20), first);
    }
    assert_eq!(first, Some(BlockId(2)));
  }

  #[test]
  fn test_best_fit_picks_smallest_adequate() {
    let list = blocks(&[(50, false), (5, true), (10, false), (5, true), (30, false)]);

    assert_eq!(search(PlacementPolicy::BestFit, &list, 20), Some(BlockId(4)));
  }

  #[test]
  fn test_best_fit_exact_match() {
    let list = blocks(&[(50, false), (1, true), (20, false), (1, true), (21, false)]);

    assert_eq!(search(PlacementPolicy::BestFit, &list, 20), Some(BlockId(2)));
  }

  #[test]
  fn test_best_fit_ties_keep_first() {
    let list = blocks(&[(40, false), (1, true), (30, false), (1, true), (30, false)]);

    assert_eq!(search(PlacementPolicy::BestFit, &list, 20), Some(BlockId(2)));
  }

  #[test]
  fn test_best_fit_is_minimal() {
    let sizes = [64, 17, 33, 90, 21, 40, 18];
    let layout: Vec<(usize, bool)> = sizes
      .iter()
      .flat_map(|&size| [(size, false), (1, true)])
      .collect();
    let list = blocks(&layout);

    for request in 1..=100 {
      let expected = sizes.iter().copied().filter(|&s| s >= request).min();
      let found = search(PlacementPolicy::BestFit, &list, request)
        .map(|id| list[id.0].1.size);
      assert_eq!(found, expected, "request {}", request);
    }
  }

  #[test]
  fn test_no_fit() {
    let list = blocks(&[(100, true)]);

    assert_eq!(search(PlacementPolicy::FirstFit, &list, 1), None);
    assert_eq!(search(PlacementPolicy::BestFit, &list, 1), None);
  }

  #[test]
  fn test_parse_policy() {
    assert_eq!("first-fit".parse(), Ok(PlacementPolicy::FirstFit));
    assert_eq!("BestFit".parse(), Ok(PlacementPolicy::BestFit));
    assert_eq!(" best ".parse(), Ok(PlacementPolicy::BestFit));
    assert_eq!(
      "worst-fit".parse::<PlacementPolicy>(),
      Err(ConfigError::UnknownPolicy("worst-fit".to_string()))
    );
  }

  #[test]
  fn test_display_round_trips() {
    for policy in [PlacementPolicy::FirstFit, PlacementPolicy::BestFit] {
      assert_eq!(policy.to_string().parse(), Ok(policy));
    }
  }
}
