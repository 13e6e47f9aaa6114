//! In-process [`StateStore`] for tests and database-less runs.
//!
//! Writes can be made to fail or stall on demand so the adapter's retry,
//! timeout and degraded-health paths can be exercised without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hegemony_types::{
    CascadeSummary, Decision, FactionId, FactionProfile, FactionStanding, Territory,
};
use hegemony_world::{ControlRecord, SnapshotRecords};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::StateStore;

#[derive(Debug, Default)]
struct Inner {
    records: SnapshotRecords,
    profiles: BTreeMap<FactionId, FactionProfile>,
    decisions: Vec<Decision>,
    cascades: Vec<CascadeSummary>,
}

/// A [`StateStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    failing: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with snapshot rows.
    pub fn with_records(records: SnapshotRecords) -> Self {
        Self {
            inner: Mutex::new(Inner {
                records,
                ..Inner::default()
            }),
            failing: AtomicBool::new(false),
            write_delay_ms: AtomicU64::new(0),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every subsequent write wait this long before touching the rows.
    pub fn set_write_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Decisions written so far.
    pub async fn decisions(&self) -> Vec<Decision> {
        self.inner.lock().await.decisions.clone()
    }

    /// Cascade summaries written so far.
    pub async fn cascades(&self) -> Vec<CascadeSummary> {
        self.inner.lock().await.cascades.clone()
    }

    /// The stored profile of a faction.
    pub async fn profile(&self, faction: FactionId) -> Option<FactionProfile> {
        self.inner.lock().await.profiles.get(&faction).cloned()
    }

    /// The stored snapshot rows.
    pub async fn records(&self) -> SnapshotRecords {
        self.inner.lock().await.records.clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(String::from(
                "memory store is failing on purpose",
            )));
        }
        Ok(())
    }

    async fn check_write(&self) -> Result<(), StoreError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load_snapshot(&self) -> Result<SnapshotRecords, StoreError> {
        self.check()?;
        Ok(self.inner.lock().await.records.clone())
    }

    async fn load_profiles(&self) -> Result<Vec<FactionProfile>, StoreError> {
        self.check()?;
        Ok(self.inner.lock().await.profiles.values().cloned().collect())
    }

    async fn seed_campaign(
        &self,
        records: &SnapshotRecords,
        profiles: &[FactionProfile],
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut inner = self.inner.lock().await;
        inner.records = records.clone();
        inner.profiles = profiles
            .iter()
            .map(|p| (p.faction_id, p.clone()))
            .collect();
        Ok(())
    }

    async fn append_decisions(&self, decisions: &[Decision]) -> Result<(), StoreError> {
        self.check_write().await?;
        self.inner
            .lock()
            .await
            .decisions
            .extend_from_slice(decisions);
        Ok(())
    }

    async fn update_profile(&self, profile: &FactionProfile) -> Result<(), StoreError> {
        self.check_write().await?;
        self.inner
            .lock()
            .await
            .profiles
            .insert(profile.faction_id, profile.clone());
        Ok(())
    }

    async fn update_territories(&self, territories: &[Territory]) -> Result<(), StoreError> {
        self.check_write().await?;
        let mut inner = self.inner.lock().await;
        let records = &mut inner.records;
        for territory in territories {
            if let Some(row) = records.territories.iter_mut().find(|r| r.id == territory.id) {
                row.contested = territory.contested;
            }
            records.control.retain(|c| c.territory_id != territory.id);
            if let Some(faction_id) = territory.controller {
                records.control.push(ControlRecord {
                    territory_id: territory.id,
                    faction_id,
                });
            }
        }
        Ok(())
    }

    async fn update_standings(&self, standings: &[FactionStanding]) -> Result<(), StoreError> {
        self.check_write().await?;
        let mut inner = self.inner.lock().await;
        let factions = &mut inner.records.factions;
        for standing in standings {
            if let Some(row) = factions
                .iter_mut()
                .find(|f| f.faction_id == standing.faction_id)
            {
                *row = standing.clone();
            } else {
                factions.push(standing.clone());
            }
        }
        Ok(())
    }

    async fn append_cascades(&self, summaries: &[CascadeSummary]) -> Result<(), StoreError> {
        self.check_write().await?;
        self.inner
            .lock()
            .await
            .cascades
            .extend_from_slice(summaries);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use hegemony_types::TerritoryId;
    use hegemony_world::{CampaignSeed, assemble};

    use super::*;

    #[tokio::test]
    async fn territory_updates_replace_control_rows() {
        let seed = CampaignSeed::builtin().unwrap();
        let store = MemoryStore::with_records(seed.to_records());
        let territory = Territory {
            id: TerritoryId::new(2),
            name: String::from("Harbor_District"),
            strategic_value: 8,
            contested: true,
            controller: Some(FactionId::new(1)),
            adjacency: BTreeMap::new(),
        };
        store.update_territories(&[territory]).await.unwrap();
        let assembly = assemble(store.load_snapshot().await.unwrap());
        assert!(assembly.violations.is_empty());
        let harbor = assembly.snapshot.territory(TerritoryId::new(2)).unwrap();
        assert_eq!(harbor.controller, Some(FactionId::new(1)));
        assert!(harbor.contested);
    }

    #[tokio::test]
    async fn failing_store_rejects_reads_and_writes() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(store.load_snapshot().await.is_err());
        assert!(store.append_decisions(&[]).await.is_err());
        store.set_failing(false);
        assert!(store.load_snapshot().await.is_ok());
    }
}
