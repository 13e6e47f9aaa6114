//! The persistence boundary.
//!
//! [`StateStore`] is object-safe so the coordinator can hold an
//! `Arc<dyn StateStore>` and swap the in-memory backend for `PostgreSQL`
//! without generic plumbing.

use async_trait::async_trait;
use hegemony_types::{CascadeSummary, Decision, FactionProfile, FactionStanding, Territory};
use hegemony_world::SnapshotRecords;

use crate::error::StoreError;

/// Durable storage for the territorial map, profiles, and logs.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Read every row needed to assemble a map snapshot.
    async fn load_snapshot(&self) -> Result<SnapshotRecords, StoreError>;

    /// Read every stored faction profile.
    async fn load_profiles(&self) -> Result<Vec<FactionProfile>, StoreError>;

    /// Write a campaign's starting rows into an empty store.
    async fn seed_campaign(
        &self,
        records: &SnapshotRecords,
        profiles: &[FactionProfile],
    ) -> Result<(), StoreError>;

    /// Append recorded decisions.
    async fn append_decisions(&self, decisions: &[Decision]) -> Result<(), StoreError>;

    /// Insert or replace a faction profile.
    async fn update_profile(&self, profile: &FactionProfile) -> Result<(), StoreError>;

    /// Replace control and contested state of the given territories.
    async fn update_territories(&self, territories: &[Territory]) -> Result<(), StoreError>;

    /// Replace strength and resources of the given factions.
    async fn update_standings(&self, standings: &[FactionStanding]) -> Result<(), StoreError>;

    /// Append cascade summaries.
    async fn append_cascades(&self, summaries: &[CascadeSummary]) -> Result<(), StoreError>;
}
