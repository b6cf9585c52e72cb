use std::env;

use crate::{error::ConfigError, placement::PlacementPolicy};

/// Environment variable selecting the placement policy.
pub const POLICY_VAR: &str = "RHEAP_POLICY";
/// Environment variable capping the number of block descriptors.
pub const MAX_BLOCKS_VAR: &str = "RHEAP_MAX_BLOCKS";

/// Settings a [`Heap`](crate::Heap) is created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapConfig {
  /// Placement policy used by `allocate` until changed with `set_policy`.
  pub policy: PlacementPolicy,
  /// Maximum number of live block descriptors. `None` means unbounded.
  pub max_blocks: Option<usize>,
}

impl HeapConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn policy(
    mut self,
    policy: PlacementPolicy,
  ) -> Self {
    self.policy = policy;
    self
  }

  pub fn max_blocks(
    mut self,
    max_blocks: usize,
  ) -> Self {
    self.max_blocks = Some(max_blocks);
    self
  }

  /// Reads `RHEAP_POLICY` and `RHEAP_MAX_BLOCKS` from the process environment.
  /// Unset variables keep their defaults.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Like [`HeapConfig::from_env`], resolving variables through `lookup`.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(policy) = lookup(POLICY_VAR) {
      config.policy = policy.parse()?;
    }

    if let Some(value) = lookup(MAX_BLOCKS_VAR) {
      let max_blocks = value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or(ConfigError::InvalidNumber {
          key: MAX_BLOCKS_VAR,
          value,
        })?;
      config.max_blocks = Some(max_blocks);
    }

    Ok(config)
  }
}
