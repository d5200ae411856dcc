//! Portal markers and the activation state machine.
//!
//! A player is on the surface (depth 0), somewhere inside a dungeon
//! (depth >= 1, optionally bound to an instance) or in the apex area behind
//! the reward gate. Every transition is gated by one shared per-player
//! cooldown, checked and stamped while that player's state is locked, so two
//! racing activations by the same player cannot both pass.

use crate::clock::MonotonicClock;
use crate::error::PortalError;
use crate::gate::{RewardGate, RewardInventory};
use crate::instance::CollectOutcome;
use crate::progression::{PlayerProgressionState, PlayerProgressionTracker, Tier};
use crate::registry::DungeonRegistry;
use delve_core::{BlockPos, ContentKey, DungeonId, PlayerId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortalKind {
    /// Surface to depth 1.
    Entrance,
    /// One level up; reaching depth 0 returns to the surface.
    Ascend,
    /// One level down.
    Descend,
    /// Straight back to the surface.
    Exit,
    /// Reward-gated descent into the apex area.
    Gated,
}

/// A registered physical portal location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalMarker {
    pub position: BlockPos,
    pub kind: PortalKind,
    /// Instance an [`PortalKind::Entrance`] leads into.
    pub bound: Option<DungeonId>,
}

impl PortalMarker {
    pub fn new(position: BlockPos, kind: PortalKind) -> Self {
        Self {
            position,
            kind,
            bound: None,
        }
    }

    /// Entrance bound to a generated instance.
    pub fn entrance(position: BlockPos, instance: DungeonId) -> Self {
        Self {
            position,
            kind: PortalKind::Entrance,
            bound: Some(instance),
        }
    }
}

/// What the vault content resolver is asked to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// A level of a generated instance.
    Instance { id: DungeonId, depth: u32 },
    /// Ambient rooms picked by depth tier.
    Tier { tier: Tier, depth: u32 },
    /// The final area behind the gate.
    ApexArea { depth: u32 },
}

impl Destination {
    fn for_state(state: &PlayerProgressionState) -> Self {
        let depth = state.depth;
        if state.in_apex_area {
            return Destination::ApexArea { depth };
        }
        match state.instance {
            Some(id) => Destination::Instance { id, depth },
            None => Destination::Tier {
                tier: Tier::for_depth(depth),
                depth,
            },
        }
    }

    pub fn depth(&self) -> u32 {
        match *self {
            Destination::Instance { depth, .. }
            | Destination::Tier { depth, .. }
            | Destination::ApexArea { depth } => depth,
        }
    }
}

/// Host-side content lookup run after a successful transition.
pub trait VaultResolver {
    type Room;

    fn resolve(&self, destination: &Destination) -> Self::Room;
}

/// A reward won by reaching the bottom of an apex instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardClaim {
    pub instance: DungeonId,
    pub reward: ContentKey,
}

/// Result of a portal activation. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoPortalHere,
    OnCooldown {
        remaining: Duration,
    },
    Entered {
        instance: Option<DungeonId>,
        depth: u32,
        destination: Destination,
    },
    Descended {
        depth: u32,
        destination: Destination,
        claim: Option<RewardClaim>,
    },
    Ascended {
        depth: u32,
        destination: Destination,
    },
    ReturnedToSurface,
    GateDenied {
        needed: u32,
        distinct_count: u32,
    },
}

impl Outcome {
    /// Where the player ended up, for transitions that move them underground.
    pub fn destination(&self) -> Option<&Destination> {
        match self {
            Outcome::Entered { destination, .. }
            | Outcome::Descended { destination, .. }
            | Outcome::Ascended { destination, .. } => Some(destination),
            Outcome::NoPortalHere
            | Outcome::OnCooldown { .. }
            | Outcome::ReturnedToSurface
            | Outcome::GateDenied { .. } => None,
        }
    }

    /// True for outcomes that stamp the cooldown.
    pub fn is_transition(&self) -> bool {
        !matches!(self, Outcome::NoPortalHere | Outcome::OnCooldown { .. })
    }
}

/// Everything an activation reads or mutates besides the graph itself.
#[derive(Clone, Copy)]
pub struct PortalContext<'a> {
    pub registry: &'a DungeonRegistry,
    pub tracker: &'a PlayerProgressionTracker,
    pub gate: &'a RewardGate,
    pub inventory: &'a dyn RewardInventory,
    pub clock: &'a dyn MonotonicClock,
}

/// Registered markers and the rules for moving through them.
#[derive(Debug)]
pub struct PortalGraph {
    markers: RwLock<HashMap<BlockPos, PortalMarker>>,
    cooldown_ms: u64,
}

impl PortalGraph {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            markers: RwLock::new(HashMap::new()),
            cooldown_ms,
        }
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Register a marker built by the host. Markers never move.
    pub fn register_marker(
        &self,
        marker: PortalMarker,
        registry: &DungeonRegistry,
    ) -> Result<(), PortalError> {
        if let Some(id) = marker.bound {
            if marker.kind != PortalKind::Entrance {
                return Err(PortalError::BindingOnNonEntrance {
                    position: marker.position,
                    kind: marker.kind,
                });
            }
            if !registry.contains(id) {
                return Err(PortalError::UnknownDungeon(id));
            }
        }

        let mut markers = self.markers.write();
        if markers.contains_key(&marker.position) {
            return Err(PortalError::DuplicateMarker(marker.position));
        }
        debug!(position = %marker.position, kind = ?marker.kind, bound = ?marker.bound, "Registered portal marker");
        markers.insert(marker.position, marker);
        Ok(())
    }

    pub fn marker_at(&self, position: BlockPos) -> Option<PortalMarker> {
        self.markers.read().get(&position).cloned()
    }

    /// All markers, ordered by position.
    pub fn markers(&self) -> Vec<PortalMarker> {
        let mut all: Vec<PortalMarker> = self.markers.read().values().cloned().collect();
        all.sort_by_key(|marker| marker.position);
        all
    }

    pub fn len(&self) -> usize {
        self.markers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.read().is_empty()
    }

    /// Resolve `player` stepping on `position`.
    pub fn activate(&self, position: BlockPos, player: PlayerId, ctx: PortalContext<'_>) -> Outcome {
        let Some(marker) = self.marker_at(position) else {
            return Outcome::NoPortalHere;
        };

        ctx.tracker.with_player(player, |state| {
            let now = ctx.clock.now_ms();
            if let Some(remaining) = state.cooldown_remaining(now, self.cooldown_ms) {
                return Outcome::OnCooldown {
                    remaining: Duration::from_millis(remaining),
                };
            }

            let old_depth = state.depth;
            let outcome = match marker.kind {
                PortalKind::Entrance => enter(state, marker.bound),
                PortalKind::Descend => descend(state, ctx.registry),
                PortalKind::Ascend => ascend(state),
                PortalKind::Exit => {
                    state.reset_to_surface();
                    Outcome::ReturnedToSurface
                }
                PortalKind::Gated => {
                    let decision = ctx.gate.can_enter(player, ctx.inventory);
                    if decision.approved {
                        state.instance = None;
                        state.in_apex_area = true;
                        descend(state, ctx.registry)
                    } else {
                        Outcome::GateDenied {
                            needed: decision.needed,
                            distinct_count: decision.distinct_count,
                        }
                    }
                }
            };
            state.last_portal_use_ms = Some(now);

            debug!(
                %player,
                kind = ?marker.kind,
                old_depth,
                new_depth = state.depth,
                instance = ?state.instance,
                "Portal transition"
            );
            outcome
        })
    }
}

fn enter(state: &mut PlayerProgressionState, bound: Option<DungeonId>) -> Outcome {
    state.depth = 1;
    state.instance = bound;
    state.in_apex_area = false;
    Outcome::Entered {
        instance: bound,
        depth: 1,
        destination: Destination::for_state(state),
    }
}

fn descend(state: &mut PlayerProgressionState, registry: &DungeonRegistry) -> Outcome {
    state.depth = state.depth.saturating_add(1);
    let claim = state
        .instance
        .and_then(|id| registry.get_by_id(id))
        .filter(|inst| inst.is_apex() && state.depth >= u32::from(inst.level_count()))
        .and_then(|inst| match inst.try_collect_reward() {
            CollectOutcome::Collected(reward) => Some(RewardClaim {
                instance: inst.id(),
                reward,
            }),
            _ => None,
        });
    Outcome::Descended {
        depth: state.depth,
        destination: Destination::for_state(state),
        claim,
    }
}

/// One level up. Leaving the apex area by ascending drops the apex flag at
/// once, so the level above resolves to a depth tier rather than the area.
fn ascend(state: &mut PlayerProgressionState) -> Outcome {
    state.depth = state.depth.saturating_sub(1);
    state.in_apex_area = false;
    if state.depth == 0 {
        state.reset_to_surface();
        return Outcome::ReturnedToSurface;
    }
    Outcome::Ascended {
        depth: state.depth,
        destination: Destination::for_state(state),
    }
}
