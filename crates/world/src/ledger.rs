//! Per-player collection of distinct rewards.

use crate::gate::RewardInventory;
use crate::progression::PlayerSlots;
use delve_core::{ContentKey, PlayerId};
use std::collections::BTreeSet;

/// Distinct rewards each player holds.
///
/// The built-in [`RewardInventory`]. Hosts that keep rewards as items in
/// their own inventories can hand the gate their own implementation instead.
#[derive(Debug, Default)]
pub struct RewardLedger {
    players: PlayerSlots<BTreeSet<ContentKey>>,
}

impl RewardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the player already held this reward.
    pub fn add(&self, player: PlayerId, reward: ContentKey) -> bool {
        self.players.slot(player).lock().insert(reward)
    }

    pub fn remove(&self, player: PlayerId, reward: &ContentKey) -> bool {
        self.players
            .get(player)
            .is_some_and(|slot| slot.lock().remove(reward))
    }

    pub fn has(&self, player: PlayerId, reward: &ContentKey) -> bool {
        self.players
            .get(player)
            .is_some_and(|slot| slot.lock().contains(reward))
    }

    /// Rewards held, in key order.
    pub fn rewards(&self, player: PlayerId) -> Vec<ContentKey> {
        self.players
            .get(player)
            .map(|slot| slot.lock().iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self, player: PlayerId) {
        if let Some(slot) = self.players.get(player) {
            slot.lock().clear();
        }
    }

    pub fn snapshot(&self) -> Vec<(PlayerId, BTreeSet<ContentKey>)> {
        self.players.snapshot()
    }

    pub fn restore(&self, records: impl IntoIterator<Item = (PlayerId, BTreeSet<ContentKey>)>) {
        self.players.restore(records);
    }
}

impl RewardInventory for RewardLedger {
    fn distinct_count(&self, player: PlayerId) -> u32 {
        self.players
            .get(player)
            .map_or(0, |slot| slot.lock().len().min(u32::MAX as usize) as u32)
    }
}
