//! `Dragonfly` (Redis-compatible) hot snapshot cache.
//!
//! The adapter mirrors every successfully persisted snapshot here so a
//! coordinator restarting while `PostgreSQL` is unreachable can still come
//! up on the last good map.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `hegemony:snapshot` | JSON | Last good [`MapSnapshot`] |
//! | `hegemony:snapshot:version` | Integer | Version of that snapshot |
//! | `hegemony:profile:{id}` | JSON | Latest [`FactionProfile`] of a faction |

use fred::prelude::*;
use hegemony_types::{FactionId, FactionProfile, MapSnapshot};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

const SNAPSHOT_KEY: &str = "hegemony:snapshot";
const SNAPSHOT_VERSION_KEY: &str = "hegemony:snapshot:version";

/// Connection handle to a `Dragonfly` instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at a `redis://host:port[/db]` URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed and
    /// [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Serialize `value` as JSON and store it at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] or [`StoreError::Dragonfly`].
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize it from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if the key does not exist.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        value.map_or_else(
            || Err(StoreError::KeyNotFound(key.to_owned())),
            |s| Ok(serde_json::from_str(&s)?),
        )
    }

    /// Mirror a snapshot and its version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or either write fails.
    pub async fn set_snapshot(&self, snapshot: &MapSnapshot) -> Result<(), StoreError> {
        self.set_json(SNAPSHOT_KEY, snapshot).await?;
        let _: () = self
            .client
            .set(
                SNAPSHOT_VERSION_KEY,
                snapshot.version.to_string().as_str(),
                None,
                None,
                false,
            )
            .await?;
        Ok(())
    }

    /// The last mirrored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if nothing was mirrored yet.
    pub async fn get_snapshot(&self) -> Result<MapSnapshot, StoreError> {
        self.get_json(SNAPSHOT_KEY).await
    }

    /// Version of the last mirrored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if not set and
    /// [`StoreError::Corrupt`] if the stored value is not a number.
    pub async fn get_snapshot_version(&self) -> Result<u64, StoreError> {
        let value: Option<String> = self.client.get(SNAPSHOT_VERSION_KEY).await?;
        value.map_or_else(
            || Err(StoreError::KeyNotFound(SNAPSHOT_VERSION_KEY.to_owned())),
            |s| {
                s.parse::<u64>().map_err(|e| {
                    StoreError::Corrupt(format!("{SNAPSHOT_VERSION_KEY} is not a valid u64: {e}"))
                })
            },
        )
    }

    /// Mirror a faction profile at `hegemony:profile:{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the write fails.
    pub async fn set_profile(&self, profile: &FactionProfile) -> Result<(), StoreError> {
        let key = format!("hegemony:profile:{}", profile.faction_id);
        self.set_json(&key, profile).await
    }

    /// The mirrored profile of a faction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] if the faction has no mirror.
    pub async fn get_profile(&self, faction: FactionId) -> Result<FactionProfile, StoreError> {
        let key = format!("hegemony:profile:{faction}");
        self.get_json(&key).await
    }

    /// Delete every key. Tests only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), StoreError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }

    /// The underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}
