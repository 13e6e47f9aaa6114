//! The authoritative, mutable territory map.
//!
//! Exactly one [`TerritoryMap`] exists per running coordinator and it is
//! only mutated by outcome resolution. Readers never see it directly: they
//! receive immutable [`MapSnapshot`]s produced by [`TerritoryMap::snapshot`].
//!
//! Every mutation marks the touched territory or faction dirty so the
//! coordinator can stage exactly the changed rows for persistence.
//!
//! A contested flag is backed by a [`Challenge`] with an expiry cycle.
//! Renewing the challenge pushes the expiry out; once it passes with no
//! renewal, [`TerritoryMap::expire_challenges`] clears the flag.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use hegemony_types::{FactionId, FactionStanding, MapSnapshot, Territory, TerritoryId};

use crate::error::WorldError;

/// Rows changed since the last [`TerritoryMap::take_dirty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtyRows {
    /// Territories whose control or contested flag changed.
    pub territories: Vec<Territory>,
    /// Factions whose strength or resources changed.
    pub factions: Vec<FactionStanding>,
}

impl DirtyRows {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty() && self.factions.is_empty()
    }
}

/// The active challenge behind a contested flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    /// Faction pressing the challenge; `None` for cascade pressure or a
    /// flag loaded from storage.
    pub challenger: Option<FactionId>,
    /// Cycle at which the challenge lapses unless renewed.
    pub expires_at: u64,
}

/// The mutable territorial map.
#[derive(Debug, Clone)]
pub struct TerritoryMap {
    version: u64,
    territories: BTreeMap<TerritoryId, Territory>,
    factions: BTreeMap<FactionId, FactionStanding>,
    challenges: BTreeMap<TerritoryId, Challenge>,
    dirty_territories: BTreeSet<TerritoryId>,
    dirty_factions: BTreeSet<FactionId>,
}

impl TerritoryMap {
    /// Seed the map from a validated snapshot.
    pub fn from_snapshot(snapshot: &MapSnapshot) -> Self {
        Self {
            version: snapshot.version,
            territories: snapshot.territories.clone(),
            factions: snapshot.factions.clone(),
            challenges: BTreeMap::new(),
            dirty_territories: BTreeSet::new(),
            dirty_factions: BTreeSet::new(),
        }
    }

    /// Current version.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Produce an immutable copy stamped with a fresh version.
    pub fn snapshot(&mut self) -> MapSnapshot {
        self.version = self.version.saturating_add(1);
        MapSnapshot {
            version: self.version,
            taken_at: Utc::now(),
            territories: self.territories.clone(),
            factions: self.factions.clone(),
        }
    }

    /// Look up a territory.
    pub fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    /// Look up a faction's standing.
    pub fn standing(&self, id: FactionId) -> Option<&FactionStanding> {
        self.factions.get(&id)
    }

    /// All faction ids in ascending order.
    pub fn faction_ids(&self) -> Vec<FactionId> {
        self.factions.keys().copied().collect()
    }

    /// Replace the controller of a territory, returning the previous one.
    ///
    /// A territory can only ever have one controller; assigning a new one
    /// implicitly removes the old.
    pub fn set_controller(
        &mut self,
        id: TerritoryId,
        controller: Option<FactionId>,
    ) -> Result<Option<FactionId>, WorldError> {
        if let Some(faction) = controller {
            if !self.factions.contains_key(&faction) {
                return Err(WorldError::FactionNotFound(faction));
            }
        }
        let territory = self
            .territories
            .get_mut(&id)
            .ok_or(WorldError::TerritoryNotFound(id))?;
        let previous = std::mem::replace(&mut territory.controller, controller);
        if previous != controller {
            self.dirty_territories.insert(id);
        }
        Ok(previous)
    }

    /// Set the contested flag, returning whether it changed. Clearing the
    /// flag also ends its challenge.
    pub fn set_contested(&mut self, id: TerritoryId, contested: bool) -> Result<bool, WorldError> {
        let territory = self
            .territories
            .get_mut(&id)
            .ok_or(WorldError::TerritoryNotFound(id))?;
        if !contested {
            self.challenges.remove(&id);
        }
        if territory.contested == contested {
            return Ok(false);
        }
        territory.contested = contested;
        self.dirty_territories.insert(id);
        Ok(true)
    }

    /// Contest a territory until `expires_at`, renewing any open challenge.
    /// Returns whether the contested flag flipped.
    pub fn raise_challenge(
        &mut self,
        id: TerritoryId,
        challenger: Option<FactionId>,
        expires_at: u64,
    ) -> Result<bool, WorldError> {
        let flipped = self.set_contested(id, true)?;
        let challenge = self.challenges.entry(id).or_insert(Challenge {
            challenger,
            expires_at,
        });
        challenge.expires_at = challenge.expires_at.max(expires_at);
        if challenger.is_some() {
            challenge.challenger = challenger;
        }
        Ok(flipped)
    }

    /// The challenge behind a contested territory, if one is tracked.
    pub fn challenge(&self, id: TerritoryId) -> Option<&Challenge> {
        self.challenges.get(&id)
    }

    /// Clear every challenge that lapsed by `cycle`, returning the
    /// territories whose contested flag was cleared.
    ///
    /// Contested territories with no tracked challenge (loaded from storage
    /// or set directly) are given one lasting `ttl` cycles from now.
    pub fn expire_challenges(&mut self, cycle: u64, ttl: u64) -> Vec<TerritoryId> {
        for territory in self.territories.values().filter(|t| t.contested) {
            self.challenges.entry(territory.id).or_insert(Challenge {
                challenger: None,
                expires_at: cycle.saturating_add(ttl),
            });
        }
        let lapsed: Vec<TerritoryId> = self
            .challenges
            .iter()
            .filter(|(_, c)| c.expires_at <= cycle)
            .map(|(id, _)| *id)
            .collect();
        let mut cleared = Vec::with_capacity(lapsed.len());
        for id in lapsed {
            self.challenges.remove(&id);
            if let Some(territory) = self.territories.get_mut(&id).filter(|t| t.contested) {
                territory.contested = false;
                self.dirty_territories.insert(id);
                cleared.push(id);
            }
        }
        cleared
    }

    /// Add `delta` to a faction's military strength, saturating at the
    /// `u32` bounds.
    pub fn adjust_strength(&mut self, id: FactionId, delta: i64) -> Result<u32, WorldError> {
        let standing = self
            .factions
            .get_mut(&id)
            .ok_or(WorldError::FactionNotFound(id))?;
        let next = i64::from(standing.military_strength).saturating_add(delta);
        standing.military_strength = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
        self.dirty_factions.insert(id);
        Ok(standing.military_strength)
    }

    /// Add `delta` to a faction's resource stock.
    pub fn adjust_resources(&mut self, id: FactionId, delta: i64) -> Result<i64, WorldError> {
        let standing = self
            .factions
            .get_mut(&id)
            .ok_or(WorldError::FactionNotFound(id))?;
        standing.resources = standing.resources.saturating_add(delta);
        self.dirty_factions.insert(id);
        Ok(standing.resources)
    }

    /// Drain the set of changed rows.
    pub fn take_dirty(&mut self) -> DirtyRows {
        let territories = std::mem::take(&mut self.dirty_territories)
            .into_iter()
            .filter_map(|id| self.territories.get(&id).cloned())
            .collect();
        let factions = std::mem::take(&mut self.dirty_factions)
            .into_iter()
            .filter_map(|id| self.factions.get(&id).cloned())
            .collect();
        DirtyRows {
            territories,
            factions,
        }
    }
}
