//! Opportunity scoring for territories a faction does not hold, and
//! priority scoring for the ones it does.

use std::cmp::Ordering;

use hegemony_types::{FactionId, FactionProfile, MapSnapshot, Specialization, Territory, TerritoryId};

use super::config::DecisionConfig;
use crate::deadline::Deadline;
use crate::error::DecisionError;

/// A scored territory the faction could try to acquire.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    /// Candidate territory.
    pub territory_id: TerritoryId,
    /// Its strategic value.
    pub strategic_value: u8,
    /// Current controller, if any (never the deciding faction).
    pub controller: Option<FactionId>,
    /// Whether it is contested.
    pub contested: bool,
    /// Final score in `[0, 1]`.
    pub score: f64,
    /// Specializations that scaled the score, with their activations.
    pub boosts: Vec<(Specialization, f64)>,
}

/// A territory the faction already holds, with its defensive priority.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    /// Held territory.
    pub territory_id: TerritoryId,
    /// Its strategic value.
    pub strategic_value: u8,
    /// Whether it is contested.
    pub contested: bool,
    /// Adjacent territories held by someone else.
    pub foreign_neighbours: usize,
    /// Priority in `[0, 1]`.
    pub priority: f64,
    /// Activation of fortress building when it scaled the priority.
    pub boost: Option<f64>,
}

fn normalized_value(strategic_value: u8) -> f64 {
    f64::from(strategic_value) / 10.0
}

fn name_is_preferred(name: &str, preferred: &[String]) -> bool {
    let lowered = name.to_lowercase();
    preferred
        .iter()
        .any(|p| !p.is_empty() && lowered.contains(&p.to_lowercase()))
}

/// Specializations whose multiplier applies to a candidate.
fn applicable(
    territory: &Territory,
    profile: &FactionProfile,
    config: &DecisionConfig,
) -> Vec<Specialization> {
    match territory.controller {
        None => vec![Specialization::RapidExpansion],
        Some(owner) => {
            let mut out = vec![if territory.strategic_value >= config.high_value_threshold {
                Specialization::EconomicWarfare
            } else {
                Specialization::BorderSkirmishing
            }];
            if profile.compatibility_with(owner) >= config.negotiate_min_compatibility {
                out.push(Specialization::DiplomaticNetwork);
            }
            out
        }
    }
}

/// Score one candidate territory for a faction.
pub fn score_territory(
    territory: &Territory,
    profile: &FactionProfile,
    config: &DecisionConfig,
) -> Opportunity {
    let traits = &profile.traits;
    let mut score = normalized_value(territory.strategic_value);

    if name_is_preferred(&territory.name, &profile.preferred_territories) {
        score += config.preference_bonus;
    }
    if territory.strategic_value >= config.high_value_threshold {
        score += config.resource_focus_bonus * traits.resource_focus;
    }
    if territory.contested {
        if config.embraces_contest(profile) {
            score += config.contested_bonus;
        } else {
            score -= config.contested_penalty;
        }
    }
    if let Some(owner) = territory.controller {
        let compatibility = profile.compatibility_with(owner);
        if compatibility > config.friendly_compatibility {
            score -= config.friendly_penalty;
        } else if compatibility < config.hostile_compatibility {
            score += config.hostile_bonus;
        }
    }
    score = score.clamp(0.0, 1.0);

    let mut boosts = Vec::new();
    for specialization in applicable(territory, profile, config) {
        let activation = profile.adaptation.activation(specialization);
        if activation > 0.0 {
            score *= config.specialization_weight.mul_add(activation, 1.0);
            boosts.push((specialization, activation));
        }
    }

    Opportunity {
        territory_id: territory.id,
        strategic_value: territory.strategic_value,
        controller: territory.controller,
        contested: territory.contested,
        score: score.clamp(0.0, 1.0),
        boosts,
    }
}

/// Descending score, ascending id on ties.
fn by_score_then_id(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.territory_id.cmp(&b.territory_id))
}

/// Score and rank every territory the faction does not control.
///
/// The deadline is polled once per territory.
pub fn rank_opportunities(
    snapshot: &MapSnapshot,
    profile: &FactionProfile,
    config: &DecisionConfig,
    deadline: &Deadline,
) -> Result<Vec<Opportunity>, DecisionError> {
    let faction = profile.faction_id;
    let mut ranked = Vec::new();
    for territory in snapshot.territories.values() {
        if deadline.is_expired() {
            return Err(DecisionError::Timeout {
                faction_id: faction,
                deadline_ms: deadline.budget_ms(),
            });
        }
        if territory.is_held_by(faction) {
            continue;
        }
        ranked.push(score_territory(territory, profile, config));
    }
    ranked.sort_by(by_score_then_id);
    Ok(ranked)
}

/// Rank the faction's own holdings by defensive priority.
///
/// Priority is `value / 10`, plus a bonus while contested, scaled by the
/// fortress-building multiplier. Ranked descending, ties by ascending id.
pub fn rank_holdings(
    snapshot: &MapSnapshot,
    profile: &FactionProfile,
    config: &DecisionConfig,
) -> Vec<Holding> {
    let faction = profile.faction_id;
    let fortress = profile
        .adaptation
        .activation(Specialization::FortressBuilding);
    let mut holdings: Vec<Holding> = snapshot
        .holdings_of(faction)
        .map(|territory| {
            let mut priority = normalized_value(territory.strategic_value);
            if territory.contested {
                priority += config.contested_holding_bonus;
            }
            priority = priority.clamp(0.0, 1.0);
            let boost = (fortress > 0.0).then_some(fortress);
            if let Some(activation) = boost {
                priority = (priority * config.specialization_weight.mul_add(activation, 1.0))
                    .clamp(0.0, 1.0);
            }
            let foreign_neighbours = territory
                .adjacency
                .keys()
                .filter_map(|id| snapshot.territory(*id))
                .filter(|n| n.controller.is_some_and(|owner| owner != faction))
                .count();
            Holding {
                territory_id: territory.id,
                strategic_value: territory.strategic_value,
                contested: territory.contested,
                foreign_neighbours,
                priority,
                boost,
            }
        })
        .collect();
    holdings.sort_by(|a, b| {
        b.priority
            .total_cmp(&a.priority)
            .then_with(|| a.territory_id.cmp(&b.territory_id))
    });
    holdings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use hegemony_types::{AdaptationState, FactionTraits, StrategyArchetype};

    use super::*;

    fn profile() -> FactionProfile {
        FactionProfile {
            faction_id: FactionId::new(1),
            archetype: StrategyArchetype::Aggressive,
            traits: FactionTraits {
                aggression: 0.8,
                expansion_priority: 0.5,
                resource_focus: 0.5,
                diplomatic_tendency: 0.2,
                risk_tolerance: 0.4,
            },
            preferred_territories: vec![String::from("metro")],
            compatibility: BTreeMap::from([(FactionId::new(2), 0.9), (FactionId::new(3), 0.1)]),
            adaptation: AdaptationState::with_capacity(10),
        }
    }

    fn territory(id: u32, name: &str, value: u8, controller: Option<u32>) -> Territory {
        Territory {
            id: TerritoryId::new(id),
            name: name.to_string(),
            strategic_value: value,
            contested: false,
            controller: controller.map(FactionId::new),
            adjacency: BTreeMap::new(),
        }
    }

    #[test]
    fn preference_match_is_case_insensitive() {
        let scored = score_territory(
            &territory(1, "Metro_Region", 5, None),
            &profile(),
            &DecisionConfig::default(),
        );
        assert!((scored.score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn high_value_adds_resource_focus_bonus() {
        let scored = score_territory(
            &territory(1, "Quarry", 8, None),
            &profile(),
            &DecisionConfig::default(),
        );
        assert!((scored.score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn friendly_controller_lowers_and_hostile_raises() {
        let config = DecisionConfig::default();
        let friendly = score_territory(&territory(1, "A", 5, Some(2)), &profile(), &config);
        let hostile = score_territory(&territory(2, "B", 5, Some(3)), &profile(), &config);
        assert!((friendly.score - 0.2).abs() < 1e-12);
        assert!((hostile.score - 0.7).abs() < 1e-12);
    }

    #[test]
    fn contested_is_penalised_for_cautious_factions() {
        let mut t = territory(1, "A", 5, None);
        t.contested = true;
        let scored = score_territory(&t, &profile(), &DecisionConfig::default());
        assert!((scored.score - 0.3).abs() < 1e-12);
    }

    #[test]
    fn specialization_scales_after_clamping() {
        let mut p = profile();
        p.adaptation
            .specializations
            .insert(Specialization::RapidExpansion, 0.4);
        let scored = score_territory(&territory(1, "A", 5, None), &p, &DecisionConfig::default());
        assert!((scored.score - 0.5 * 1.1).abs() < 1e-12);
        assert_eq!(scored.boosts, vec![(Specialization::RapidExpansion, 0.4)]);
    }

    #[test]
    fn ranking_excludes_own_territory_and_breaks_ties_by_id() {
        let mut snapshot = MapSnapshot::empty();
        for t in [
            territory(3, "C", 5, None),
            territory(1, "A", 5, None),
            territory(2, "B", 7, Some(1)),
        ] {
            snapshot.territories.insert(t.id, t);
        }
        let ranked =
            rank_opportunities(&snapshot, &profile(), &DecisionConfig::default(), &Deadline::never())
                .unwrap();
        let ids: Vec<u32> = ranked.iter().map(|o| o.territory_id.into_inner()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn expired_deadline_times_out() {
        let mut snapshot = MapSnapshot::empty();
        let t = territory(1, "A", 5, None);
        snapshot.territories.insert(t.id, t);
        let result = rank_opportunities(
            &snapshot,
            &profile(),
            &DecisionConfig::default(),
            &Deadline::after(std::time::Duration::ZERO),
        );
        assert!(matches!(result, Err(DecisionError::Timeout { .. })));
    }
}
