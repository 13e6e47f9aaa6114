//! Campaign seeds: the lore-derived starting map and faction roster.
//!
//! A seed is a YAML document read once at startup. When no seed path is
//! configured the built-in default campaign (`campaign/default.yaml`) is
//! used. Seeds never reach the map directly: they are flattened into
//! [`SnapshotRecords`] and go through the same validation as rows read from
//! the store.

use std::collections::BTreeMap;
use std::path::Path;

use hegemony_types::{
    AdaptationState, FactionId, FactionProfile, FactionStanding, FactionTraits, StrategyArchetype,
    TerritoryId,
};
use serde::Deserialize;

use crate::error::WorldError;
use crate::records::{AdjacencyRecord, ControlRecord, SnapshotRecords, TerritoryRecord};

/// The built-in campaign.
const DEFAULT_CAMPAIGN: &str = include_str!("../campaign/default.yaml");

/// A territory as authored in a seed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TerritorySeed {
    /// Territory identifier.
    pub id: TerritoryId,
    /// Display name.
    pub name: String,
    /// Strategic value, 1 through 10.
    pub strategic_value: i64,
    /// Starting controller.
    #[serde(default)]
    pub controller: Option<FactionId>,
    /// Whether the territory starts contested.
    #[serde(default)]
    pub contested: bool,
}

/// A dependency link between two territories.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LinkSeed {
    /// One end.
    pub from: TerritoryId,
    /// Other end.
    pub to: TerritoryId,
    /// Dependency weight in `[0, 1]`.
    pub weight: f64,
    /// When true (the default) the link is added in both directions.
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
}

const fn default_bidirectional() -> bool {
    true
}

/// A faction as authored in a seed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FactionSeed {
    /// Faction identifier.
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Strategy archetype.
    pub archetype: StrategyArchetype,
    /// Static trait scalars.
    pub traits: FactionTraits,
    /// Starting military strength.
    pub military_strength: u32,
    /// Starting resource stock.
    #[serde(default)]
    pub resources: i64,
    /// Preferred territory-name substrings, most preferred first.
    #[serde(default)]
    pub preferred_territories: Vec<String>,
    /// Compatibility with other factions.
    #[serde(default)]
    pub compatibility: BTreeMap<FactionId, f64>,
}

impl FactionSeed {
    /// Starting standing for the map snapshot.
    pub fn standing(&self) -> FactionStanding {
        FactionStanding {
            faction_id: self.id,
            name: self.name.clone(),
            military_strength: self.military_strength,
            resources: self.resources,
        }
    }

    /// Starting behaviour profile with an empty adaptation window.
    pub fn profile(&self, window_capacity: usize) -> FactionProfile {
        FactionProfile {
            faction_id: self.id,
            archetype: self.archetype,
            traits: self.traits,
            preferred_territories: self.preferred_territories.clone(),
            compatibility: self.compatibility.clone(),
            adaptation: AdaptationState::with_capacity(window_capacity),
        }
    }
}

/// A complete campaign seed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CampaignSeed {
    /// Campaign name.
    pub name: String,
    /// Territories.
    pub territories: Vec<TerritorySeed>,
    /// Dependency links.
    #[serde(default)]
    pub links: Vec<LinkSeed>,
    /// Factions.
    pub factions: Vec<FactionSeed>,
}

impl CampaignSeed {
    /// Parse a seed from YAML.
    pub fn parse(yaml: &str) -> Result<Self, WorldError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Read and parse a seed file.
    pub fn from_file(path: &Path) -> Result<Self, WorldError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| WorldError::CampaignRead {
                path: path.display().to_string(),
                source,
            })?;
        Self::parse(&contents)
    }

    /// The built-in campaign.
    pub fn builtin() -> Result<Self, WorldError> {
        Self::parse(DEFAULT_CAMPAIGN)
    }

    /// Load from `path` when given, otherwise the built-in campaign.
    pub fn load(path: Option<&Path>) -> Result<Self, WorldError> {
        path.map_or_else(Self::builtin, Self::from_file)
    }

    /// Flatten into snapshot rows at version 0.
    pub fn to_records(&self) -> SnapshotRecords {
        let mut records = SnapshotRecords {
            factions: self.factions.iter().map(FactionSeed::standing).collect(),
            ..SnapshotRecords::default()
        };
        for seed in &self.territories {
            records.territories.push(TerritoryRecord {
                id: seed.id,
                name: seed.name.clone(),
                strategic_value: seed.strategic_value,
                contested: seed.contested,
            });
            if let Some(faction_id) = seed.controller {
                records.control.push(ControlRecord {
                    territory_id: seed.id,
                    faction_id,
                });
            }
        }
        for link in &self.links {
            records.adjacency.push(AdjacencyRecord {
                from: link.from,
                to: link.to,
                weight: link.weight,
            });
            if link.bidirectional {
                records.adjacency.push(AdjacencyRecord {
                    from: link.to,
                    to: link.from,
                    weight: link.weight,
                });
            }
        }
        records
    }

    /// Starting profiles for every faction.
    pub fn profiles(&self, window_capacity: usize) -> Vec<FactionProfile> {
        self.factions
            .iter()
            .map(|f| f.profile(window_capacity))
            .collect()
    }
}
