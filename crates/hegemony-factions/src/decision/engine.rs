//! The decision engine: one ranked decision per faction per cycle.

use chrono::Utc;
use hegemony_types::{
    ActionKind, Decision, DecisionId, FactionProfile, MapSnapshot, Specialization, TerritoryId,
};
use tracing::debug;

use super::config::DecisionConfig;
use super::opportunity::{Holding, Opportunity, rank_holdings, rank_opportunities};
use super::strategy::{Choice, StrategyContext, expand_fallback, retreat_rule, strategy_for};
use crate::deadline::Deadline;
use crate::error::DecisionError;

/// Produces decisions from a profile and a map snapshot.
///
/// The engine holds no mutable state; one instance is shared by every
/// shard.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    /// Create an engine with the given tuning.
    pub const fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    /// The active tuning.
    pub const fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Decide what `profile`'s faction does this cycle.
    ///
    /// A choice the faction cannot pay for is skipped in favour of the next
    /// rule, so resources never go negative through decisions.
    ///
    /// Returns `Ok(None)` when no valid action exists. Returns
    /// [`DecisionError::Timeout`] when `deadline` expires during scoring;
    /// the caller discards the task.
    pub fn decide(
        &self,
        cycle: u64,
        profile: &FactionProfile,
        snapshot: &MapSnapshot,
        deadline: &Deadline,
    ) -> Result<Option<Decision>, DecisionError> {
        let faction = profile.faction_id;
        let (strength, resources) = snapshot
            .standing(faction)
            .map(|s| (s.military_strength, s.resources))
            .ok_or(DecisionError::UnknownFaction(faction))?;

        let opportunities = rank_opportunities(snapshot, profile, &self.config, deadline)?;
        let holdings = rank_holdings(snapshot, profile, &self.config);
        if deadline.is_expired() {
            return Err(DecisionError::Timeout {
                faction_id: faction,
                deadline_ms: deadline.budget_ms(),
            });
        }

        let ctx = StrategyContext {
            profile,
            snapshot,
            strength,
            opportunities: &opportunities,
            holdings: &holdings,
            config: &self.config,
        };
        let affordable = |c: &Choice| self.cost_of(snapshot, c) <= resources;
        let choice = retreat_rule(&ctx)
            .filter(affordable)
            .or_else(|| strategy_for(profile.archetype)(&ctx).filter(affordable))
            .or_else(|| expand_fallback(&ctx).filter(affordable));

        let Some(choice) = choice else {
            debug!(faction_id = %faction, cycle, resources, "no valid or affordable action");
            return Ok(None);
        };

        let decision = self.finish(cycle, profile, snapshot, &ctx, choice);
        debug!(
            faction_id = %faction,
            cycle,
            action = %decision.action,
            target = %decision.target,
            priority = decision.priority,
            "decision made"
        );
        Ok(Some(decision))
    }

    fn cost_of(&self, snapshot: &MapSnapshot, choice: &Choice) -> i64 {
        let strategic_value = snapshot
            .territory(choice.target)
            .map_or(0, |t| t.strategic_value);
        self.config.costs.cost_of(choice.action, strategic_value)
    }

    fn finish(
        &self,
        cycle: u64,
        profile: &FactionProfile,
        snapshot: &MapSnapshot,
        ctx: &StrategyContext<'_>,
        choice: Choice,
    ) -> Decision {
        let resource_cost = self.cost_of(snapshot, &choice);
        let risk = self.risk_of(choice.action, choice.target, profile, snapshot, ctx.strength);
        let adaptation_factors = factors_for(&choice, ctx.opportunities, ctx.holdings);
        Decision {
            id: DecisionId::new(),
            cycle,
            faction_id: profile.faction_id,
            action: choice.action,
            target: choice.target,
            priority: choice.priority.clamp(0.0, 1.0),
            resource_cost,
            risk,
            reasoning: choice.reasoning,
            adaptation_factors,
            created_at: Utc::now(),
        }
    }

    #[allow(clippy::match_same_arms)] // Each action carries its own risk constant.
    fn risk_of(
        &self,
        action: ActionKind,
        target: TerritoryId,
        profile: &FactionProfile,
        snapshot: &MapSnapshot,
        strength: u32,
    ) -> f64 {
        let territory = snapshot.territory(target);
        let contested = territory.is_some_and(|t| t.contested);
        let controller = territory.and_then(|t| t.controller);
        let risk = match action {
            ActionKind::Attack => {
                let defender = controller.map_or(0, |owner| snapshot.strength_of(owner));
                let total = f64::from(strength) + f64::from(defender);
                if total > 0.0 {
                    f64::from(defender) / total
                } else {
                    0.5
                }
            }
            ActionKind::Expand if contested => 0.3,
            ActionKind::Expand => 0.1,
            ActionKind::Defend => 0.3,
            ActionKind::Retreat => 0.1,
            ActionKind::Fortify => 0.05,
            ActionKind::Patrol => 0.02,
            ActionKind::Negotiate => {
                1.0 - controller.map_or(self.config.friendly_compatibility, |owner| {
                    profile.compatibility_with(owner)
                })
            }
        };
        risk.clamp(0.0, 1.0)
    }
}

/// Adaptation tags for the specializations that shaped the chosen target,
/// e.g. `rapid_expansion:0.40`.
fn factors_for(choice: &Choice, opportunities: &[Opportunity], holdings: &[Holding]) -> Vec<String> {
    let tag = |s: Specialization, a: f64| format!("{}:{a:.2}", s.as_str());
    if choice.action.is_acquisition() {
        opportunities
            .iter()
            .find(|o| o.territory_id == choice.target)
            .map(|o| o.boosts.iter().map(|(s, a)| tag(*s, *a)).collect())
            .unwrap_or_default()
    } else {
        holdings
            .iter()
            .find(|h| h.territory_id == choice.target)
            .and_then(|h| h.boost)
            .map(|a| vec![tag(Specialization::FortressBuilding, a)])
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use hegemony_types::{
        AdaptationState, FactionId, FactionStanding, FactionTraits, StrategyArchetype, Territory,
    };

    use super::*;

    fn profile(id: u32, archetype: StrategyArchetype) -> FactionProfile {
        FactionProfile {
            faction_id: FactionId::new(id),
            archetype,
            traits: FactionTraits {
                aggression: 0.8,
                expansion_priority: 0.6,
                resource_focus: 0.5,
                diplomatic_tendency: 0.5,
                risk_tolerance: 0.5,
            },
            preferred_territories: Vec::new(),
            compatibility: BTreeMap::new(),
            adaptation: AdaptationState::with_capacity(50),
        }
    }

    struct MapBuilder {
        snapshot: MapSnapshot,
    }

    impl MapBuilder {
        fn new() -> Self {
            Self {
                snapshot: MapSnapshot::empty(),
            }
        }

        fn faction(mut self, id: u32, strength: u32) -> Self {
            self.snapshot.factions.insert(
                FactionId::new(id),
                FactionStanding {
                    faction_id: FactionId::new(id),
                    name: format!("F{id}"),
                    military_strength: strength,
                    resources: 100,
                },
            );
            self
        }

        fn territory(mut self, id: u32, name: &str, value: u8, owner: Option<u32>) -> Self {
            self.snapshot.territories.insert(
                TerritoryId::new(id),
                Territory {
                    id: TerritoryId::new(id),
                    name: name.to_string(),
                    strategic_value: value,
                    contested: false,
                    controller: owner.map(FactionId::new),
                    adjacency: BTreeMap::new(),
                },
            );
            self
        }

        fn resources(mut self, id: u32, resources: i64) -> Self {
            if let Some(s) = self.snapshot.factions.get_mut(&FactionId::new(id)) {
                s.resources = resources;
            }
            self
        }

        fn contested(mut self, id: u32) -> Self {
            if let Some(t) = self.snapshot.territories.get_mut(&TerritoryId::new(id)) {
                t.contested = true;
            }
            self
        }

        fn link(mut self, a: u32, b: u32) -> Self {
            for (from, to) in [(a, b), (b, a)] {
                if let Some(t) = self.snapshot.territories.get_mut(&TerritoryId::new(from)) {
                    t.adjacency.insert(TerritoryId::new(to), 0.5);
                }
            }
            self
        }

        fn build(self) -> MapSnapshot {
            self.snapshot
        }
    }

    fn decide(profile: &FactionProfile, snapshot: &MapSnapshot) -> Option<Decision> {
        DecisionEngine::default()
            .decide(1, profile, snapshot, &Deadline::never())
            .unwrap()
    }

    #[test]
    fn aggressive_faction_targets_metro_region() {
        let snapshot = MapBuilder::new()
            .faction(1, 75)
            .territory(1, "Metro_Region", 9, None)
            .build();
        let d = decide(&profile(1, StrategyArchetype::Aggressive), &snapshot).unwrap();
        assert!(matches!(d.action, ActionKind::Attack | ActionKind::Expand));
        assert_eq!(d.target, TerritoryId::new(1));
        assert!(d.priority > 0.5);
    }

    #[test]
    fn aggressive_attacks_when_strong() {
        let snapshot = MapBuilder::new()
            .faction(1, 75)
            .faction(2, 40)
            .territory(1, "Keep", 7, Some(2))
            .territory(2, "Field", 3, None)
            .build();
        let d = decide(&profile(1, StrategyArchetype::Aggressive), &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Attack);
        assert_eq!(d.target, TerritoryId::new(1));
        assert!((d.risk - 40.0 / 115.0).abs() < 1e-12);
        assert_eq!(d.resource_cost, 20 + 3 * 7);
    }

    #[test]
    fn aggressive_expands_when_weak() {
        let snapshot = MapBuilder::new()
            .faction(1, 50)
            .faction(2, 40)
            .territory(1, "Keep", 9, Some(2))
            .territory(2, "Field", 3, None)
            .build();
        let d = decide(&profile(1, StrategyArchetype::Aggressive), &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Expand);
        assert_eq!(d.target, TerritoryId::new(2));
    }

    #[test]
    fn unaffordable_attack_falls_back_to_expansion() {
        let base = || {
            MapBuilder::new()
                .faction(1, 75)
                .faction(2, 40)
                .territory(1, "Keep", 7, Some(2))
                .territory(2, "Field", 3, None)
        };
        let p = profile(1, StrategyArchetype::Aggressive);

        // Attack costs 41, expansion into Field 16.
        let d = decide(&p, &base().resources(1, 30).build()).unwrap();
        assert_eq!(d.action, ActionKind::Expand);
        assert_eq!(d.target, TerritoryId::new(2));
        assert!(d.resource_cost <= 30);

        assert!(decide(&p, &base().resources(1, 5).build()).is_none());
    }

    #[test]
    fn defensive_fortifies_contested_holding() {
        let snapshot = MapBuilder::new()
            .faction(1, 50)
            .territory(1, "Home", 9, Some(1))
            .territory(2, "Gate", 4, Some(1))
            .contested(2)
            .build();
        let d = decide(&profile(1, StrategyArchetype::Defensive), &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Fortify);
        assert_eq!(d.target, TerritoryId::new(2));
    }

    #[test]
    fn defensive_patrols_when_quiet() {
        let snapshot = MapBuilder::new()
            .faction(1, 50)
            .territory(1, "Home", 9, Some(1))
            .territory(2, "Gate", 4, Some(1))
            .build();
        let d = decide(&profile(1, StrategyArchetype::Defensive), &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Patrol);
        assert_eq!(d.target, TerritoryId::new(1));
    }

    #[test]
    fn opportunistic_needs_a_strength_margin() {
        let base = || {
            MapBuilder::new()
                .territory(1, "Vault", 8, Some(2))
                .territory(2, "Ditch", 2, None)
        };
        let strong = base().faction(1, 60).faction(2, 50).build();
        let weak = base().faction(1, 59).faction(2, 50).build();
        let p = profile(1, StrategyArchetype::Opportunistic);
        assert_eq!(decide(&p, &strong).unwrap().action, ActionKind::Attack);
        assert_eq!(decide(&p, &weak).unwrap().action, ActionKind::Expand);
    }

    #[test]
    fn diplomatic_negotiates_with_compatible_controller() {
        let snapshot = MapBuilder::new()
            .faction(1, 30)
            .faction(2, 30)
            .faction(3, 30)
            .territory(1, "A", 5, Some(2))
            .territory(2, "B", 5, Some(3))
            .territory(3, "Home", 3, Some(1))
            .build();
        let mut p = profile(1, StrategyArchetype::Diplomatic);
        p.compatibility.insert(FactionId::new(2), 0.65);
        p.compatibility.insert(FactionId::new(3), 0.8);
        let d = decide(&p, &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Negotiate);
        assert_eq!(d.target, TerritoryId::new(2));
        assert!((d.risk - 0.2).abs() < 1e-12);
    }

    #[test]
    fn diplomatic_patrols_without_partner() {
        let snapshot = MapBuilder::new()
            .faction(1, 30)
            .faction(2, 30)
            .territory(1, "A", 5, Some(2))
            .territory(3, "Home", 3, Some(1))
            .build();
        let d = decide(&profile(1, StrategyArchetype::Diplomatic), &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Patrol);
    }

    #[test]
    fn isolationist_fortifies_most_remote_low_value_holding() {
        let snapshot = MapBuilder::new()
            .faction(1, 30)
            .faction(2, 30)
            .territory(1, "Frontier", 3, Some(1))
            .territory(2, "Hermitage", 4, Some(1))
            .territory(3, "Enemy", 5, Some(2))
            .link(1, 3)
            .build();
        let d = decide(&profile(1, StrategyArchetype::Isolationist), &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Fortify);
        assert_eq!(d.target, TerritoryId::new(2));
    }

    #[test]
    fn weak_faction_retreats_from_contested_ground() {
        let snapshot = MapBuilder::new()
            .faction(1, 10)
            .territory(1, "Home", 9, Some(1))
            .territory(2, "Gate", 4, Some(1))
            .territory(3, "Wall", 6, Some(1))
            .contested(2)
            .contested(3)
            .build();
        let d = decide(&profile(1, StrategyArchetype::Aggressive), &snapshot).unwrap();
        assert_eq!(d.action, ActionKind::Retreat);
        assert_eq!(d.target, TerritoryId::new(2));
    }

    #[test]
    fn acquisitions_never_target_own_territory() {
        let snapshot = MapBuilder::new()
            .faction(1, 90)
            .faction(2, 10)
            .territory(1, "Metro_Region", 10, Some(1))
            .territory(2, "B", 6, Some(2))
            .territory(3, "C", 2, None)
            .build();
        for archetype in StrategyArchetype::ALL {
            let p = profile(1, archetype);
            if let Some(d) = decide(&p, &snapshot) {
                if d.action.is_acquisition() {
                    assert_ne!(d.target, TerritoryId::new(1), "{archetype}");
                }
            }
        }
    }

    #[test]
    fn nothing_to_do_returns_none() {
        let snapshot = MapBuilder::new().faction(1, 50).build();
        assert!(decide(&profile(1, StrategyArchetype::Defensive), &snapshot).is_none());
    }

    #[test]
    fn expired_deadline_is_a_timeout() {
        let snapshot = MapBuilder::new()
            .faction(1, 50)
            .territory(1, "A", 5, None)
            .build();
        let result = DecisionEngine::default().decide(
            1,
            &profile(1, StrategyArchetype::Aggressive),
            &snapshot,
            &Deadline::after(Duration::ZERO),
        );
        assert!(matches!(result, Err(DecisionError::Timeout { .. })));
    }

    #[test]
    fn specialization_shows_up_in_factors() {
        let snapshot = MapBuilder::new()
            .faction(1, 50)
            .territory(1, "Field", 5, None)
            .build();
        let mut p = profile(1, StrategyArchetype::Aggressive);
        p.adaptation
            .specializations
            .insert(Specialization::RapidExpansion, 0.4);
        let d = decide(&p, &snapshot).unwrap();
        assert_eq!(d.adaptation_factors, vec![String::from("rapid_expansion:0.40")]);
    }
}
