//! Variant schema table.
//!
//! A variant is a 4-bit schema id selecting an ordered field list; the
//! position of a field in that list is its presence-bit position. The
//! table is compile-time read-only, so independent codec instances
//! share nothing mutable.

use crate::field::FieldKind;

/// Highest variant id usable for sensor data.
pub const MAX_SENSOR_VARIANT: u8 = 14;

/// Variant reserved for mesh control traffic.
pub const MESH_VARIANT: u8 = 15;

/// Highest station id expressible in 12 bits.
pub const MAX_STATION: u16 = 4095;

/// Upper bound on chained presence bytes the decoder accepts.
pub const MAX_PRESENCE_BYTES: usize = 4;

/// Ordered field list for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSchema {
    /// Diagnostic name.
    pub name: &'static str,
    /// Presence bytes this variant declares capacity for.
    pub num_pres_bytes: u8,
    /// Field types in wire order; index = presence position.
    pub fields: &'static [FieldKind],
}

impl VariantSchema {
    /// Declarable positions: 6 in the first presence byte, 7 in each
    /// extension byte.
    #[must_use]
    pub fn capacity(&self) -> usize {
        6 + 7 * (usize::from(self.num_pres_bytes) - 1)
    }

    /// Presence position of `kind`, if declared.
    #[must_use]
    pub fn position_of(&self, kind: FieldKind) -> Option<usize> {
        self.fields.iter().position(|&f| f == kind)
    }
}

/// Presence bytes needed to cover a highest set position.
///
/// Byte 0 holds ext + tlv + six positions; each extension byte holds
/// ext + seven positions.
#[must_use]
pub fn presence_bytes_for(max_position: usize) -> usize {
    (max_position + 2).div_ceil(7)
}

const WEATHER_STATION: VariantSchema = VariantSchema {
    name: "weather_station",
    num_pres_bytes: 2,
    fields: &[
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Environment,
        FieldKind::Wind,
        FieldKind::Rain,
        FieldKind::Solar,
        FieldKind::CloudCover,
        FieldKind::Datetime,
        FieldKind::Flags,
    ],
};

const AIR_QUALITY: VariantSchema = VariantSchema {
    name: "air_quality",
    num_pres_bytes: 2,
    fields: &[
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Environment,
        FieldKind::AirQuality,
        FieldKind::Solar,
        FieldKind::CloudCover,
        FieldKind::Datetime,
        FieldKind::Flags,
    ],
};

const HYDROLOGY: VariantSchema = VariantSchema {
    name: "hydrology",
    num_pres_bytes: 2,
    fields: &[
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Temperature,
        FieldKind::Depth,
        FieldKind::Rain,
        FieldKind::Datetime,
        FieldKind::Flags,
    ],
};

const RADIATION_MONITOR: VariantSchema = VariantSchema {
    name: "radiation_monitor",
    num_pres_bytes: 1,
    fields: &[
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Environment,
        FieldKind::Radiation,
        FieldKind::Datetime,
        FieldKind::Flags,
    ],
};

const ASSET_TRACKER: VariantSchema = VariantSchema {
    name: "asset_tracker",
    num_pres_bytes: 1,
    fields: &[
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Position,
        FieldKind::Temperature,
        FieldKind::Datetime,
        FieldKind::Flags,
    ],
};

const CAMERA_NODE: VariantSchema = VariantSchema {
    name: "camera_node",
    num_pres_bytes: 2,
    fields: &[
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Environment,
        FieldKind::Position,
        FieldKind::Image,
        FieldKind::Datetime,
        FieldKind::Flags,
    ],
};

const DIAGNOSTIC: VariantSchema = VariantSchema {
    name: "diagnostic",
    num_pres_bytes: 2,
    fields: &[
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Temperature,
        FieldKind::Pressure,
        FieldKind::Humidity,
        FieldKind::Wind,
        FieldKind::Rain,
        FieldKind::Solar,
        FieldKind::CloudCover,
        FieldKind::AirQuality,
        FieldKind::Depth,
        FieldKind::Datetime,
        FieldKind::Flags,
    ],
};

const SCHEMAS: [Option<&VariantSchema>; 15] = [
    Some(&WEATHER_STATION),
    Some(&AIR_QUALITY),
    Some(&HYDROLOGY),
    Some(&RADIATION_MONITOR),
    Some(&ASSET_TRACKER),
    Some(&CAMERA_NODE),
    Some(&DIAGNOSTIC),
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
];

/// Look up the schema for a sensor variant.
#[must_use]
pub fn variant_schema(variant: u8) -> Option<&'static VariantSchema> {
    SCHEMAS.get(usize::from(variant)).copied().flatten()
}
