//! Stable identifier types for the haulage simulator
//!
//! Entities are created once per run and addressed by small dense integers, so
//! identifiers double as indices into the owning collection. They serialize as
//! prefixed strings (`VEH_3`, `ORD_0`, `MCH_1`) to keep reports readable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// Create an identifier from its raw index
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Position of this entity in its owning collection
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                digits
                    .parse::<u32>()
                    .map(Self)
                    .map_err(|e| format!("Invalid {} '{}': {}", stringify!($name), s, e))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_id!(
    /// Identifier of a haul vehicle; vehicles are numbered `0..fleet_size`
    VehicleId,
    "VEH"
);

define_id!(
    /// Identifier of a customer order in the order-tracking variant
    OrderId,
    "ORD"
);

define_id!(
    /// Identifier of a pile-forming machine
    MachineId,
    "MCH"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(VehicleId::new(3).to_string(), "VEH_3");
        assert_eq!(OrderId::new(0).to_string(), "ORD_0");
        assert_eq!(MachineId::new(12).to_string(), "MCH_12");
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        assert_eq!("VEH_7".parse::<VehicleId>().unwrap(), VehicleId(7));
        assert_eq!("7".parse::<VehicleId>().unwrap(), VehicleId(7));
        assert!("VEH_x".parse::<VehicleId>().is_err());
    }

    #[test]
    fn test_ordering_follows_raw_index() {
        let mut ids = vec![VehicleId(2), VehicleId(0), VehicleId(1)];
        ids.sort();
        assert_eq!(ids, vec![VehicleId(0), VehicleId(1), VehicleId(2)]);
        assert_eq!(VehicleId(2).index(), 2);
    }

    #[test]
    fn test_serde_uses_prefixed_string() {
        let json = serde_json::to_string(&OrderId(4)).unwrap();
        assert_eq!(json, "\"ORD_4\"");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderId(4));
    }
}
