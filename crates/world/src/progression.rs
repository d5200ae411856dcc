//! Per-player depth and dungeon association.
//!
//! Each player gets their own mutex. The outer map lock is only held long
//! enough to find or create a slot, so unrelated players never serialize
//! against each other.

use delve_core::{DungeonId, PlayerId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Depth-derived difficulty bucket, used when no instance is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Depth 0..=5.
    A,
    /// Depth 6..=10.
    B,
    /// Anything deeper.
    C,
}

impl Tier {
    pub fn for_depth(depth: u32) -> Self {
        match depth {
            0..=5 => Tier::A,
            6..=10 => Tier::B,
            _ => Tier::C,
        }
    }
}

/// Where one player is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgressionState {
    /// 0 is the surface.
    pub depth: u32,
    pub instance: Option<DungeonId>,
    /// Set after passing the reward gate, cleared on leaving.
    pub in_apex_area: bool,
    pub last_portal_use_ms: Option<u64>,
}

impl PlayerProgressionState {
    pub fn on_surface(&self) -> bool {
        self.depth == 0
    }

    /// Milliseconds left on the cooldown at `now_ms`, if any.
    ///
    /// The window is `[last, last + cooldown]`: a portal becomes usable only
    /// once strictly more than `cooldown_ms` has passed, so the last blocked
    /// millisecond reports 1 remaining. A stamp later than `now_ms` comes from
    /// a clock that has since been restarted and is treated as expired.
    pub fn cooldown_remaining(&self, now_ms: u64, cooldown_ms: u64) -> Option<u64> {
        let last = self.last_portal_use_ms?;
        if last > now_ms {
            return None;
        }
        let ready_at = last.saturating_add(cooldown_ms);
        (now_ms <= ready_at).then(|| (ready_at - now_ms).max(1))
    }

    pub fn reset_to_surface(&mut self) {
        self.depth = 0;
        self.instance = None;
        self.in_apex_area = false;
    }
}

/// Lazily-created per-player slots, each behind its own mutex.
#[derive(Debug)]
pub(crate) struct PlayerSlots<T> {
    slots: RwLock<HashMap<PlayerId, Arc<Mutex<T>>>>,
}

impl<T> Default for PlayerSlots<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Default + Clone> PlayerSlots<T> {
    /// Existing slot, without creating one.
    pub(crate) fn get(&self, player: PlayerId) -> Option<Arc<Mutex<T>>> {
        self.slots.read().get(&player).cloned()
    }

    /// Slot for `player`, created on first use.
    pub(crate) fn slot(&self, player: PlayerId) -> Arc<Mutex<T>> {
        if let Some(slot) = self.get(player) {
            return slot;
        }
        self.slots.write().entry(player).or_default().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Copy of every slot, ordered by player id.
    pub(crate) fn snapshot(&self) -> Vec<(PlayerId, T)> {
        let slots: Vec<(PlayerId, Arc<Mutex<T>>)> = self
            .slots
            .read()
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect();
        let mut out: Vec<(PlayerId, T)> = slots
            .into_iter()
            .map(|(id, slot)| (id, slot.lock().clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub(crate) fn restore(&self, records: impl IntoIterator<Item = (PlayerId, T)>) {
        let mut slots = self.slots.write();
        slots.clear();
        for (id, value) in records {
            slots.insert(id, Arc::new(Mutex::new(value)));
        }
    }
}

/// Owns every player's [`PlayerProgressionState`].
#[derive(Debug, Default)]
pub struct PlayerProgressionTracker {
    players: PlayerSlots<PlayerProgressionState>,
}

impl PlayerProgressionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to `player`'s state, creating it first.
    ///
    /// Other players are not blocked while `f` runs.
    pub fn with_player<R>(
        &self,
        player: PlayerId,
        f: impl FnOnce(&mut PlayerProgressionState) -> R,
    ) -> R {
        let slot = self.players.slot(player);
        let mut state = slot.lock();
        f(&mut state)
    }

    /// Copy of `player`'s state, or `None` if they never used a portal.
    pub fn state(&self, player: PlayerId) -> Option<PlayerProgressionState> {
        self.players.get(player).map(|slot| slot.lock().clone())
    }

    pub fn get_depth(&self, player: PlayerId) -> u32 {
        self.players
            .get(player)
            .map_or(0, |slot| slot.lock().depth)
    }

    pub fn set_depth(&self, player: PlayerId, depth: u32) {
        self.with_player(player, |state| state.depth = depth);
    }

    pub fn get_instance(&self, player: PlayerId) -> Option<DungeonId> {
        self.players
            .get(player)
            .and_then(|slot| slot.lock().instance)
    }

    pub fn set_instance(&self, player: PlayerId, instance: Option<DungeonId>) {
        self.with_player(player, |state| state.instance = instance);
    }

    /// Clear depth and instance in one step.
    pub fn reset_to_surface(&self, player: PlayerId) {
        self.with_player(player, PlayerProgressionState::reset_to_surface);
    }

    pub fn reward_tier_for_depth(depth: u32) -> Tier {
        Tier::for_depth(depth)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Forget every cooldown stamp. Depth and instance are kept.
    pub fn clear_cooldowns(&self) {
        for (player, _) in self.players.snapshot() {
            self.with_player(player, |state| state.last_portal_use_ms = None);
        }
    }

    /// Every player's state, ordered by player id.
    pub fn snapshot(&self) -> Vec<(PlayerId, PlayerProgressionState)> {
        self.players.snapshot()
    }

    /// Replace all state with `records`.
    pub fn restore(&self, records: impl IntoIterator<Item = (PlayerId, PlayerProgressionState)>) {
        self.players.restore(records);
    }
}
