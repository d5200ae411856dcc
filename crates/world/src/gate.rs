//! Reward gate in front of the final area.

use crate::error::ConfigError;
use crate::params::GateParams;
use delve_core::PlayerId;

/// Read-only view of how many distinct rewards a player holds.
pub trait RewardInventory: Send + Sync {
    fn distinct_count(&self, player: PlayerId) -> u32;
}

/// Result of asking the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub approved: bool,
    pub distinct_count: u32,
    /// Rewards still missing; zero when approved.
    pub needed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardGate {
    threshold: u32,
}

impl RewardGate {
    pub fn new(params: GateParams) -> Self {
        Self {
            threshold: params.threshold,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn can_enter(&self, player: PlayerId, inventory: &dyn RewardInventory) -> GateDecision {
        let distinct_count = inventory.distinct_count(player);
        let needed = self.threshold.saturating_sub(distinct_count);
        GateDecision {
            approved: needed == 0,
            distinct_count,
            needed,
        }
    }

    /// Generation-time check that the gate can ever open.
    pub fn validate_world(&self, apex_count: usize) -> Result<(), ConfigError> {
        if apex_count < self.threshold as usize {
            return Err(ConfigError::InsufficientApex {
                apex: apex_count,
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

impl Default for RewardGate {
    fn default() -> Self {
        Self::new(GateParams::default())
    }
}
