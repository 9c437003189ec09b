//! Faction tagging for projectiles and damageable targets.
//!
//! Every projectile and every collision target belongs to exactly one
//! faction. The faction selects the spawn pool, the caps that apply, and
//! which targets a projectile is allowed to hit.

use serde::{Deserialize, Serialize};

/// Combat faction of a projectile or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Player,
    Boss,
    Minion,
}

/// Number of factions (size of per-faction arrays).
pub const FACTION_COUNT: usize = 3;

impl Faction {
    /// All factions in their canonical processing order.
    pub const ALL: [Faction; FACTION_COUNT] = [Faction::Player, Faction::Boss, Faction::Minion];

    /// Stable index into per-faction arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Faction::Player => 0,
            Faction::Boss => 1,
            Faction::Minion => 2,
        }
    }

    /// Target factions a projectile owned by `self` can damage.
    ///
    /// Player shots hit bosses and minions; boss and minion shots only hit
    /// the player. Bosses and minions never damage each other.
    pub fn hostile_factions(self) -> &'static [Faction] {
        match self {
            Faction::Player => &[Faction::Boss, Faction::Minion],
            Faction::Boss => &[Faction::Player],
            Faction::Minion => &[Faction::Player],
        }
    }

    /// Whether a projectile owned by `self` may hit a target of `other`.
    #[inline]
    pub fn is_hostile_to(self, other: Faction) -> bool {
        self.hostile_factions().contains(&other)
    }

    /// Lowercase name used in logs and stats.
    pub fn name(self) -> &'static str {
        match self {
            Faction::Player => "player",
            Faction::Boss => "boss",
            Faction::Minion => "minion",
        }
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
