//! Archetype strategies.
//!
//! Each archetype maps to one pure selection function over the ranked
//! opportunities and holdings. [`strategy_for`] is the dispatch table.

use hegemony_types::{ActionKind, FactionProfile, MapSnapshot, StrategyArchetype, TerritoryId};

use super::config::DecisionConfig;
use super::opportunity::{Holding, Opportunity};

/// Everything a strategy may look at.
#[derive(Debug)]
pub struct StrategyContext<'a> {
    /// The deciding faction's profile.
    pub profile: &'a FactionProfile,
    /// The map the decision is made against.
    pub snapshot: &'a MapSnapshot,
    /// The deciding faction's current strength.
    pub strength: u32,
    /// Territories the faction does not hold, best first.
    pub opportunities: &'a [Opportunity],
    /// Territories the faction holds, highest priority first.
    pub holdings: &'a [Holding],
    /// Engine tuning.
    pub config: &'a DecisionConfig,
}

/// What a strategy picked, before costing.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    /// Chosen action.
    pub action: ActionKind,
    /// Target territory.
    pub target: TerritoryId,
    /// Priority in `[0, 1]`.
    pub priority: f64,
    /// Why it was picked.
    pub reasoning: String,
}

/// A pure archetype selection function.
pub type StrategyFn = fn(&StrategyContext<'_>) -> Option<Choice>;

/// The strategy table: archetype to selection function.
pub const fn strategy_for(archetype: StrategyArchetype) -> StrategyFn {
    match archetype {
        StrategyArchetype::Aggressive => aggressive,
        StrategyArchetype::Defensive => defensive,
        StrategyArchetype::Opportunistic => opportunistic,
        StrategyArchetype::Diplomatic => diplomatic,
        StrategyArchetype::Isolationist => isolationist,
    }
}

impl StrategyContext<'_> {
    fn name_of(&self, id: TerritoryId) -> &str {
        self.snapshot
            .territory(id)
            .map_or("unknown", |t| t.name.as_str())
    }

    fn best_uncontrolled(&self) -> Option<&Opportunity> {
        self.opportunities.iter().find(|o| o.controller.is_none())
    }

    fn best_foreign(&self) -> Option<&Opportunity> {
        self.opportunities.iter().find(|o| o.controller.is_some())
    }

    fn top_holding(&self) -> Option<&Holding> {
        self.holdings.first()
    }

    fn top_contested_holding(&self) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.contested)
    }

    fn acquire(&self, action: ActionKind, target: &Opportunity, why: &str) -> Choice {
        Choice {
            action,
            target: target.territory_id,
            priority: target.score,
            reasoning: format!(
                "{}: {action} {} (value {}, score {:.2}) {why}",
                self.profile.archetype,
                self.name_of(target.territory_id),
                target.strategic_value,
                target.score
            ),
        }
    }

    fn hold(&self, action: ActionKind, holding: &Holding, why: &str) -> Choice {
        Choice {
            action,
            target: holding.territory_id,
            priority: holding.priority,
            reasoning: format!(
                "{}: {action} {} (value {}) {why}",
                self.profile.archetype,
                self.name_of(holding.territory_id),
                holding.strategic_value
            ),
        }
    }
}

/// Retreat from the lowest-value contested holding when too weak to hold it.
pub fn retreat_rule(ctx: &StrategyContext<'_>) -> Option<Choice> {
    if ctx.strength >= ctx.config.retreat_strength_threshold {
        return None;
    }
    let weakest = ctx
        .holdings
        .iter()
        .filter(|h| h.contested)
        .min_by(|a, b| {
            a.strategic_value
                .cmp(&b.strategic_value)
                .then_with(|| a.territory_id.cmp(&b.territory_id))
        })?;
    Some(ctx.hold(
        ActionKind::Retreat,
        weakest,
        &format!("with strength {} below retreat threshold", ctx.strength),
    ))
}

/// Expand into the best uncontrolled territory, if any remain.
pub fn expand_fallback(ctx: &StrategyContext<'_>) -> Option<Choice> {
    ctx.best_uncontrolled()
        .map(|o| ctx.acquire(ActionKind::Expand, o, "as fallback"))
}

fn aggressive(ctx: &StrategyContext<'_>) -> Option<Choice> {
    if ctx.strength > ctx.config.attack_strength_threshold {
        if let Some(target) = ctx.best_foreign() {
            return Some(ctx.acquire(
                ActionKind::Attack,
                target,
                &format!("with strength {}", ctx.strength),
            ));
        }
    }
    if let Some(target) = ctx.best_uncontrolled() {
        return Some(ctx.acquire(ActionKind::Expand, target, "into open ground"));
    }
    ctx.top_holding()
        .map(|h| ctx.hold(ActionKind::Fortify, h, "while regrouping"))
}

fn defensive(ctx: &StrategyContext<'_>) -> Option<Choice> {
    if let Some(holding) = ctx.top_contested_holding() {
        return Some(ctx.hold(ActionKind::Fortify, holding, "under challenge"));
    }
    ctx.top_holding()
        .map(|h| ctx.hold(ActionKind::Patrol, h, "to show presence"))
}

fn opportunistic(ctx: &StrategyContext<'_>) -> Option<Choice> {
    let strength = f64::from(ctx.strength);
    let strike = ctx.opportunities.iter().find(|o| {
        o.strategic_value >= ctx.config.opportunistic_min_value
            && o.controller.is_some_and(|owner| {
                strength
                    >= ctx.config.opportunistic_strength_ratio
                        * f64::from(ctx.snapshot.strength_of(owner))
            })
    });
    if let Some(target) = strike {
        let defender = target
            .controller
            .map_or(0, |owner| ctx.snapshot.strength_of(owner));
        return Some(ctx.acquire(
            ActionKind::Attack,
            target,
            &format!("with strength {} against {defender}", ctx.strength),
        ));
    }
    ctx.best_uncontrolled()
        .map(|o| ctx.acquire(ActionKind::Expand, o, "while waiting for an opening"))
}

fn diplomatic(ctx: &StrategyContext<'_>) -> Option<Choice> {
    let partner = ctx
        .opportunities
        .iter()
        .filter_map(|o| {
            let owner = o.controller?;
            let compatibility = ctx.profile.compatibility_with(owner);
            (compatibility >= ctx.config.negotiate_min_compatibility).then_some((o, compatibility))
        })
        // max_by keeps the last maximum; reversed, ties go to the better rank.
        .rev()
        .max_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((target, compatibility)) = partner {
        return Some(ctx.acquire(
            ActionKind::Negotiate,
            target,
            &format!("with compatibility {compatibility:.2}"),
        ));
    }
    ctx.top_holding()
        .map(|h| ctx.hold(ActionKind::Patrol, h, "while no partner is available"))
}

fn isolationist(ctx: &StrategyContext<'_>) -> Option<Choice> {
    if let Some(holding) = ctx.top_contested_holding() {
        return Some(ctx.hold(ActionKind::Defend, holding, "against intrusion"));
    }
    let remote = ctx
        .holdings
        .iter()
        .filter(|h| h.strategic_value <= ctx.config.isolationist_max_value)
        .min_by(|a, b| {
            a.foreign_neighbours
                .cmp(&b.foreign_neighbours)
                .then_with(|| a.strategic_value.cmp(&b.strategic_value))
                .then_with(|| a.territory_id.cmp(&b.territory_id))
        });
    if let Some(holding) = remote {
        return Some(ctx.hold(
            ActionKind::Fortify,
            holding,
            &format!("with {} foreign neighbours", holding.foreign_neighbours),
        ));
    }
    ctx.top_holding()
        .map(|h| ctx.hold(ActionKind::Patrol, h, "along the frontier"))
}
