//! Type-safe identifier wrappers.
//!
//! Territories and factions are keyed by small integers that come straight
//! from the campaign seed and the relational store. Connections and
//! decisions are minted at runtime and use UUID v7 (time-ordered) so they
//! index well in `PostgreSQL`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around a `u32` row identifier.
macro_rules! define_int_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u32);

        impl $name {
            /// Wrap a raw row identifier.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Return the raw row identifier.
            pub const fn into_inner(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_int_id! {
    /// Identifier of a faction taking part in the campaign.
    FactionId
}

define_int_id! {
    /// Identifier of a territory (node in the dependency graph).
    TerritoryId
}

define_uuid_id! {
    /// Opaque handle of a broadcast subscriber connection.
    ConnectionId
}

define_uuid_id! {
    /// Identifier of a recorded decision.
    DecisionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_ids_serialize_as_numbers() {
        let json = serde_json::to_string(&TerritoryId::new(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
    }

    #[test]
    fn int_ids_work_as_json_map_keys() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(FactionId::new(3), 0.5_f64);
        let json = serde_json::to_string(&map).unwrap_or_default();
        assert_eq!(json, r#"{"3":0.5}"#);
        let back: Result<std::collections::BTreeMap<FactionId, f64>, _> =
            serde_json::from_str(&json);
        assert!(back.is_ok_and(|m| m.contains_key(&FactionId::new(3))));
    }

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
        assert_ne!(DecisionId::new().into_inner(), Uuid::nil());
    }
}
