//! The faction behaviour profile registry.
//!
//! The set of factions is fixed for a campaign, so the outer map is built
//! once and never changes. Each profile sits behind its own mutex: the
//! learning task updates one faction while decision tasks read others
//! without contention.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hegemony_types::{Decision, FactionId, FactionProfile};
use tracing::{debug, info};

use crate::error::ProfileError;
use crate::learning::{self, LearningConfig, Outcome};

/// Shared, per-faction-locked profile store.
#[derive(Debug)]
pub struct ProfileRegistry {
    profiles: BTreeMap<FactionId, Arc<Mutex<FactionProfile>>>,
    config: LearningConfig,
}

impl ProfileRegistry {
    /// Validate and register a campaign's profiles.
    ///
    /// Every profile's window is resized to the configured capacity.
    pub fn new(
        profiles: Vec<FactionProfile>,
        config: LearningConfig,
    ) -> Result<Self, ProfileError> {
        if config.window_capacity == 0 {
            return Err(ProfileError::EmptyWindow);
        }
        let mut map = BTreeMap::new();
        for mut profile in profiles {
            validate(&profile)?;
            if map.contains_key(&profile.faction_id) {
                return Err(ProfileError::DuplicateFaction(profile.faction_id));
            }
            profile.adaptation.capacity = config.window_capacity;
            while profile.adaptation.window.len() > config.window_capacity {
                profile.adaptation.window.pop_front();
            }
            learning::recompute(&mut profile.adaptation, config.economic_threshold);
            map.insert(profile.faction_id, Arc::new(Mutex::new(profile)));
        }
        info!(factions = map.len(), "profile registry ready");
        Ok(Self {
            profiles: map,
            config,
        })
    }

    /// Registered faction ids in ascending order.
    pub fn faction_ids(&self) -> Vec<FactionId> {
        self.profiles.keys().copied().collect()
    }

    /// Number of registered factions.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no factions are registered.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// A copy of a faction's current profile.
    pub fn get(&self, faction: FactionId) -> Result<FactionProfile, ProfileError> {
        Ok(self.lock(faction)?.clone())
    }

    /// Fold a resolved decision's outcome into its faction's adaptation
    /// state and return the updated profile for persistence.
    pub fn record_outcome(
        &self,
        decision: &Decision,
        success: bool,
        influence_delta: i64,
        target_value: u8,
    ) -> Result<FactionProfile, ProfileError> {
        let outcome = Outcome::now(decision.action, success, influence_delta, target_value);
        let mut profile = self.lock(decision.faction_id)?;
        learning::apply_outcome(
            &mut profile.adaptation,
            outcome,
            self.config.economic_threshold,
        );
        debug!(
            faction_id = %decision.faction_id,
            action = %decision.action,
            success,
            success_rate = profile.adaptation.success_rate,
            "outcome recorded"
        );
        Ok(profile.clone())
    }

    /// Clear one faction's adaptation state (season boundary).
    pub fn reset_adaptation(&self, faction: FactionId) -> Result<FactionProfile, ProfileError> {
        let mut profile = self.lock(faction)?;
        learning::reset(&mut profile.adaptation);
        info!(faction_id = %faction, "adaptation reset");
        Ok(profile.clone())
    }

    fn lock(&self, faction: FactionId) -> Result<MutexGuard<'_, FactionProfile>, ProfileError> {
        let slot = self
            .profiles
            .get(&faction)
            .ok_or(ProfileError::UnknownFaction(faction))?;
        // A panic while holding the lock leaves a fully-formed profile behind.
        Ok(slot.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn validate(profile: &FactionProfile) -> Result<(), ProfileError> {
    for (name, value) in profile.traits.named() {
        if !(0.0..=1.0).contains(&value) {
            return Err(ProfileError::TraitOutOfRange {
                faction: profile.faction_id,
                name,
                value,
            });
        }
    }
    for (other, value) in &profile.compatibility {
        if !(0.0..=1.0).contains(value) {
            return Err(ProfileError::CompatibilityOutOfRange {
                faction: profile.faction_id,
                other: *other,
                value: *value,
            });
        }
    }
    Ok(())
}
