//! Field registry: typed sensor values and per-field pack/unpack.
//!
//! Every field type the schemas can declare is listed in [`FieldKind`];
//! the per-field wire work is dispatched through a single exhaustive
//! `match` in [`FieldSet::pack`] / [`FieldSet::unpack`]. Adding a field
//! type without wiring its pack/unpack arms is a compile error.
//!
//! Value structs store *raw* quantized values, so a decoded packet
//! re-encodes to identical bytes. Constructors take scaled integer
//! units (the canonical path); fields with fractional physical units
//! also offer `f64` constructors behind the `float` feature, which
//! convert to scaled units and delegate.
//!
//! # Invariants
//!
//! - A present field occupies exactly [`FieldKind::width`] bits on the
//!   wire (variable-length image excepted).
//! - Unpack never reads past the reader limit; truncation surfaces as
//!   `CodecError::Truncated`.

use core::fmt;

use crate::{
    bitstream::{BitReader, BitWriter},
    errors::Result,
    quantize as q,
};

#[cfg(feature = "float")]
use crate::quantize::{f64_from_scaled, scaled_from_f64};

/// Field-type tag. Wire order and presence positions come from the
/// variant schema, not from this enum's discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    /// Battery level and charging flag.
    Battery,
    /// Radio link quality (RSSI + SNR).
    Link,
    /// Composite temperature + pressure + humidity.
    Environment,
    /// Standalone air temperature.
    Temperature,
    /// Standalone barometric pressure.
    Pressure,
    /// Standalone relative humidity.
    Humidity,
    /// Wind speed, gust and direction.
    Wind,
    /// Rain rate and drop size.
    Rain,
    /// Solar irradiance and UV index.
    Solar,
    /// Cloud cover in oktas.
    CloudCover,
    /// Air quality index.
    AirQuality,
    /// Radiation counts and dose rate.
    Radiation,
    /// Water depth.
    Depth,
    /// Latitude/longitude fix.
    Position,
    /// Seconds since the epoch start.
    Datetime,
    /// Application-defined flag bits.
    Flags,
    /// Length-prefixed image payload.
    Image,
}

impl FieldKind {
    /// Every declarable field type.
    pub const ALL: [FieldKind; 17] = [
        FieldKind::Battery,
        FieldKind::Link,
        FieldKind::Environment,
        FieldKind::Temperature,
        FieldKind::Pressure,
        FieldKind::Humidity,
        FieldKind::Wind,
        FieldKind::Rain,
        FieldKind::Solar,
        FieldKind::CloudCover,
        FieldKind::AirQuality,
        FieldKind::Radiation,
        FieldKind::Depth,
        FieldKind::Position,
        FieldKind::Datetime,
        FieldKind::Flags,
        FieldKind::Image,
    ];

    /// Fixed wire width in bits; `None` for the variable-length image.
    #[must_use]
    pub fn width(self) -> Option<usize> {
        match self {
            FieldKind::Battery => Some(6),
            FieldKind::Link => Some(9),
            FieldKind::Environment => Some(24),
            FieldKind::Temperature => Some(9),
            FieldKind::Pressure => Some(8),
            FieldKind::Humidity => Some(7),
            FieldKind::Wind => Some(22),
            FieldKind::Rain => Some(13),
            FieldKind::Solar => Some(14),
            FieldKind::CloudCover => Some(4),
            FieldKind::AirQuality => Some(9),
            FieldKind::Radiation => Some(30),
            FieldKind::Depth => Some(10),
            FieldKind::Position => Some(49),
            FieldKind::Datetime => Some(20),
            FieldKind::Flags => Some(8),
            FieldKind::Image => None,
        }
    }

    /// Diagnostic / JSON label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Battery => "battery",
            FieldKind::Link => "link",
            FieldKind::Environment => "environment",
            FieldKind::Temperature => "temperature",
            FieldKind::Pressure => "pressure",
            FieldKind::Humidity => "humidity",
            FieldKind::Wind => "wind",
            FieldKind::Rain => "rain",
            FieldKind::Solar => "solar",
            FieldKind::CloudCover => "cloud_cover",
            FieldKind::AirQuality => "air_quality",
            FieldKind::Radiation => "radiation",
            FieldKind::Depth => "depth",
            FieldKind::Position => "position",
            FieldKind::Datetime => "datetime",
            FieldKind::Flags => "flags",
            FieldKind::Image => "image",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Battery level (5 % steps) and charging flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Battery {
    pub(crate) level: u8,
    pub(crate) charging: bool,
}

impl Battery {
    /// Quantize a battery reading.
    pub fn new(level_pct: i64, charging: bool) -> Result<Self> {
        Ok(Self { level: q::BATTERY_LEVEL.encode(level_pct)? as u8, charging })
    }

    /// Level in percent, rounded to the 5 % wire step.
    #[must_use]
    pub fn level_pct(&self) -> i64 {
        q::BATTERY_LEVEL.dequantize(u32::from(self.level))
    }

    /// Charging flag.
    #[must_use]
    pub fn charging(&self) -> bool {
        self.charging
    }
}

/// Radio link quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    pub(crate) rssi: u8,
    pub(crate) snr: u8,
}

impl Link {
    /// Quantize a link report (dBm, dB).
    pub fn new(rssi_dbm: i64, snr_db: i64) -> Result<Self> {
        Ok(Self {
            rssi: q::LINK_RSSI.encode(rssi_dbm)? as u8,
            snr: q::LINK_SNR.encode(snr_db)? as u8,
        })
    }

    /// RSSI in dBm at wire resolution.
    #[must_use]
    pub fn rssi_dbm(&self) -> i64 {
        q::LINK_RSSI.dequantize(u32::from(self.rssi))
    }

    /// SNR in dB at wire resolution.
    #[must_use]
    pub fn snr_db(&self) -> i64 {
        q::LINK_SNR.dequantize(u32::from(self.snr))
    }
}

/// Composite environment reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Environment {
    pub(crate) temperature: u16,
    pub(crate) pressure: u8,
    pub(crate) humidity: u8,
}

impl Environment {
    /// Quantize from scaled units (centi-°C, hPa, %).
    pub fn new_scaled(temperature_centi: i64, pressure_hpa: i64, humidity_pct: i64) -> Result<Self> {
        Ok(Self {
            temperature: q::TEMPERATURE.encode(temperature_centi)? as u16,
            pressure: q::PRESSURE.encode(pressure_hpa)? as u8,
            humidity: q::HUMIDITY.encode(humidity_pct)? as u8,
        })
    }

    /// Quantize from physical units (°C, hPa, %).
    #[cfg(feature = "float")]
    pub fn new(temperature_c: f64, pressure_hpa: f64, humidity_pct: f64) -> Result<Self> {
        Self::new_scaled(
            scaled_from_f64(temperature_c, 100.0),
            scaled_from_f64(pressure_hpa, 1.0),
            scaled_from_f64(humidity_pct, 1.0),
        )
    }

    /// Temperature in centi-°C at wire resolution.
    #[must_use]
    pub fn temperature_centi(&self) -> i64 {
        q::TEMPERATURE.dequantize(u32::from(self.temperature))
    }

    /// Temperature in °C at wire resolution.
    #[cfg(feature = "float")]
    #[must_use]
    pub fn temperature_c(&self) -> f64 {
        f64_from_scaled(self.temperature_centi(), 100.0)
    }

    /// Pressure in hPa.
    #[must_use]
    pub fn pressure_hpa(&self) -> i64 {
        q::PRESSURE.dequantize(u32::from(self.pressure))
    }

    /// Relative humidity in percent.
    #[must_use]
    pub fn humidity_pct(&self) -> i64 {
        q::HUMIDITY.dequantize(u32::from(self.humidity))
    }
}

/// Standalone temperature, for variants that do not carry the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Temperature(pub(crate) u16);

impl Temperature {
    /// Quantize from centi-°C.
    pub fn new_scaled(centi: i64) -> Result<Self> {
        Ok(Self(q::TEMPERATURE.encode(centi)? as u16))
    }

    /// Quantize from °C.
    #[cfg(feature = "float")]
    pub fn new(celsius: f64) -> Result<Self> {
        Self::new_scaled(scaled_from_f64(celsius, 100.0))
    }

    /// Centi-°C at wire resolution.
    #[must_use]
    pub fn centi(&self) -> i64 {
        q::TEMPERATURE.dequantize(u32::from(self.0))
    }

    /// °C at wire resolution.
    #[cfg(feature = "float")]
    #[must_use]
    pub fn celsius(&self) -> f64 {
        f64_from_scaled(self.centi(), 100.0)
    }
}

/// Standalone barometric pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pressure(pub(crate) u8);

impl Pressure {
    /// Quantize from hPa.
    pub fn new(hpa: i64) -> Result<Self> {
        Ok(Self(q::PRESSURE.encode(hpa)? as u8))
    }

    /// hPa.
    #[must_use]
    pub fn hpa(&self) -> i64 {
        q::PRESSURE.dequantize(u32::from(self.0))
    }
}

/// Standalone relative humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Humidity(pub(crate) u8);

impl Humidity {
    /// Quantize from percent.
    pub fn new(pct: i64) -> Result<Self> {
        Ok(Self(q::HUMIDITY.encode(pct)? as u8))
    }

    /// Percent.
    #[must_use]
    pub fn pct(&self) -> i64 {
        q::HUMIDITY.dequantize(u32::from(self.0))
    }
}

/// Wind speed, gust and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wind {
    pub(crate) speed: u8,
    pub(crate) gust: u8,
    pub(crate) direction: u8,
}

impl Wind {
    /// Quantize from scaled units (centi-m/s, centi-m/s, centi-degrees).
    pub fn new_scaled(speed_centi: i64, gust_centi: i64, direction_centi: i64) -> Result<Self> {
        Ok(Self {
            speed: q::WIND_SPEED.encode(speed_centi)? as u8,
            gust: q::WIND_GUST.encode(gust_centi)? as u8,
            direction: q::WIND_DIRECTION.encode(direction_centi)? as u8,
        })
    }

    /// Quantize from physical units (m/s, m/s, degrees).
    #[cfg(feature = "float")]
    pub fn new(speed_ms: f64, gust_ms: f64, direction_deg: f64) -> Result<Self> {
        Self::new_scaled(
            scaled_from_f64(speed_ms, 100.0),
            scaled_from_f64(gust_ms, 100.0),
            scaled_from_f64(direction_deg, 100.0),
        )
    }

    /// Speed in centi-m/s at wire resolution.
    #[must_use]
    pub fn speed_centi(&self) -> i64 {
        q::WIND_SPEED.dequantize(u32::from(self.speed))
    }

    /// Gust in centi-m/s at wire resolution.
    #[must_use]
    pub fn gust_centi(&self) -> i64 {
        q::WIND_SPEED.dequantize(u32::from(self.gust))
    }

    /// Direction in centi-degrees at wire resolution.
    #[must_use]
    pub fn direction_centi(&self) -> i64 {
        q::WIND_DIRECTION.dequantize(u32::from(self.direction))
    }

    /// Speed in m/s at wire resolution.
    #[cfg(feature = "float")]
    #[must_use]
    pub fn speed_ms(&self) -> f64 {
        f64_from_scaled(self.speed_centi(), 100.0)
    }

    /// Direction in degrees at wire resolution.
    #[cfg(feature = "float")]
    #[must_use]
    pub fn direction_deg(&self) -> f64 {
        f64_from_scaled(self.direction_centi(), 100.0)
    }
}

/// Rain rate and drop size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rain {
    pub(crate) rate: u8,
    pub(crate) size: u8,
}

impl Rain {
    /// Quantize from scaled units (mm/hr, centi-mm/d).
    pub fn new_scaled(rate_mm_hr: i64, size_centi: i64) -> Result<Self> {
        Ok(Self {
            rate: q::RAIN_RATE.encode(rate_mm_hr)? as u8,
            size: q::RAIN_SIZE.encode(size_centi)? as u8,
        })
    }

    /// Quantize from physical units (mm/hr, mm/d).
    #[cfg(feature = "float")]
    pub fn new(rate_mm_hr: f64, size_mm_d: f64) -> Result<Self> {
        Self::new_scaled(scaled_from_f64(rate_mm_hr, 1.0), scaled_from_f64(size_mm_d, 100.0))
    }

    /// Rate in mm/hr.
    #[must_use]
    pub fn rate_mm_hr(&self) -> i64 {
        q::RAIN_RATE.dequantize(u32::from(self.rate))
    }

    /// Drop size in centi-mm/d at wire resolution.
    #[must_use]
    pub fn size_centi(&self) -> i64 {
        q::RAIN_SIZE.dequantize(u32::from(self.size))
    }
}

/// Solar irradiance and UV index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solar {
    pub(crate) irradiance: u16,
    pub(crate) uv: u8,
}

impl Solar {
    /// Quantize a solar reading (W/m², UV index).
    pub fn new(irradiance_w_m2: i64, uv_index: i64) -> Result<Self> {
        Ok(Self {
            irradiance: q::SOLAR_IRRADIANCE.encode(irradiance_w_m2)? as u16,
            uv: q::SOLAR_UV.encode(uv_index)? as u8,
        })
    }

    /// Irradiance in W/m².
    #[must_use]
    pub fn irradiance_w_m2(&self) -> i64 {
        q::SOLAR_IRRADIANCE.dequantize(u32::from(self.irradiance))
    }

    /// UV index.
    #[must_use]
    pub fn uv_index(&self) -> i64 {
        q::SOLAR_UV.dequantize(u32::from(self.uv))
    }
}

/// Cloud cover in oktas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CloudCover(pub(crate) u8);

impl CloudCover {
    /// Quantize from oktas (0..=8).
    pub fn new(okta: i64) -> Result<Self> {
        Ok(Self(q::CLOUD_COVER.encode(okta)? as u8))
    }

    /// Oktas.
    #[must_use]
    pub fn okta(&self) -> i64 {
        q::CLOUD_COVER.dequantize(u32::from(self.0))
    }
}

/// Air quality index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AirQuality(pub(crate) u16);

impl AirQuality {
    /// Quantize from AQI (0..=500).
    pub fn new(aqi: i64) -> Result<Self> {
        Ok(Self(q::AQ_INDEX.encode(aqi)? as u16))
    }

    /// AQI.
    #[must_use]
    pub fn aqi(&self) -> i64 {
        q::AQ_INDEX.dequantize(u32::from(self.0))
    }
}

/// Radiation counts and dose rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Radiation {
    pub(crate) cpm: u16,
    pub(crate) dose: u16,
}

impl Radiation {
    /// Quantize from scaled units (cpm, centi-µSv/h).
    pub fn new_scaled(cpm: i64, dose_centi: i64) -> Result<Self> {
        Ok(Self {
            cpm: q::RADIATION_CPM.encode(cpm)? as u16,
            dose: q::RADIATION_DOSE.encode(dose_centi)? as u16,
        })
    }

    /// Quantize from physical units (cpm, µSv/h).
    #[cfg(feature = "float")]
    pub fn new(cpm: i64, dose_usv_h: f64) -> Result<Self> {
        Self::new_scaled(cpm, scaled_from_f64(dose_usv_h, 100.0))
    }

    /// Counts per minute.
    #[must_use]
    pub fn cpm(&self) -> i64 {
        q::RADIATION_CPM.dequantize(u32::from(self.cpm))
    }

    /// Dose rate in centi-µSv/h at wire resolution.
    #[must_use]
    pub fn dose_centi(&self) -> i64 {
        q::RADIATION_DOSE.dequantize(u32::from(self.dose))
    }
}

/// Water depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Depth(pub(crate) u16);

impl Depth {
    /// Quantize from centimetres.
    pub fn new(cm: i64) -> Result<Self> {
        Ok(Self(q::DEPTH.encode(cm)? as u16))
    }

    /// Centimetres.
    #[must_use]
    pub fn cm(&self) -> i64 {
        q::DEPTH.dequantize(u32::from(self.0))
    }
}

/// Latitude/longitude fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub(crate) lat: u32,
    pub(crate) lon: u32,
}

impl Position {
    /// Quantize from micro-degrees.
    pub fn new_scaled(lat_micro: i64, lon_micro: i64) -> Result<Self> {
        Ok(Self {
            lat: q::POSITION_LAT.encode(lat_micro)?,
            lon: q::POSITION_LON.encode(lon_micro)?,
        })
    }

    /// Quantize from degrees.
    #[cfg(feature = "float")]
    pub fn new(lat_deg: f64, lon_deg: f64) -> Result<Self> {
        Self::new_scaled(scaled_from_f64(lat_deg, 1e6), scaled_from_f64(lon_deg, 1e6))
    }

    /// Latitude in micro-degrees at wire resolution.
    #[must_use]
    pub fn lat_micro(&self) -> i64 {
        q::POSITION_LAT.dequantize(self.lat)
    }

    /// Longitude in micro-degrees at wire resolution.
    #[must_use]
    pub fn lon_micro(&self) -> i64 {
        q::POSITION_LON.dequantize(self.lon)
    }

    /// Latitude in degrees at wire resolution.
    #[cfg(feature = "float")]
    #[must_use]
    pub fn lat_deg(&self) -> f64 {
        f64_from_scaled(self.lat_micro(), 1e6)
    }

    /// Longitude in degrees at wire resolution.
    #[cfg(feature = "float")]
    #[must_use]
    pub fn lon_deg(&self) -> f64 {
        f64_from_scaled(self.lon_micro(), 1e6)
    }
}

/// Seconds since the epoch start, 5 s steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Datetime(pub(crate) u32);

impl Datetime {
    /// Quantize from seconds.
    pub fn new(seconds: i64) -> Result<Self> {
        Ok(Self(q::DATETIME.encode(seconds)?))
    }

    /// Seconds at wire resolution.
    #[must_use]
    pub fn seconds(&self) -> i64 {
        q::DATETIME.dequantize(self.0)
    }
}

/// Application-defined flag bits, carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags(
    /// The raw bitmask.
    pub u8,
);

/// The fixed-width typed slots of one packet.
///
/// Used as the encoder's staging area and as the decoded output; the
/// variable-length image travels beside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldSet {
    /// Battery slot.
    pub battery: Option<Battery>,
    /// Link quality slot.
    pub link: Option<Link>,
    /// Composite environment slot.
    pub environment: Option<Environment>,
    /// Standalone temperature slot.
    pub temperature: Option<Temperature>,
    /// Standalone pressure slot.
    pub pressure: Option<Pressure>,
    /// Standalone humidity slot.
    pub humidity: Option<Humidity>,
    /// Wind slot.
    pub wind: Option<Wind>,
    /// Rain slot.
    pub rain: Option<Rain>,
    /// Solar slot.
    pub solar: Option<Solar>,
    /// Cloud cover slot.
    pub cloud_cover: Option<CloudCover>,
    /// Air quality slot.
    pub air_quality: Option<AirQuality>,
    /// Radiation slot.
    pub radiation: Option<Radiation>,
    /// Depth slot.
    pub depth: Option<Depth>,
    /// Position slot.
    pub position: Option<Position>,
    /// Datetime slot.
    pub datetime: Option<Datetime>,
    /// Flags slot.
    pub flags: Option<Flags>,
}

impl FieldSet {
    /// Whether the fixed-width slot for `kind` is populated.
    ///
    /// The image is tracked beside this set; `Image` always reports
    /// `false` here.
    #[must_use]
    pub fn contains(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Battery => self.battery.is_some(),
            FieldKind::Link => self.link.is_some(),
            FieldKind::Environment => self.environment.is_some(),
            FieldKind::Temperature => self.temperature.is_some(),
            FieldKind::Pressure => self.pressure.is_some(),
            FieldKind::Humidity => self.humidity.is_some(),
            FieldKind::Wind => self.wind.is_some(),
            FieldKind::Rain => self.rain.is_some(),
            FieldKind::Solar => self.solar.is_some(),
            FieldKind::CloudCover => self.cloud_cover.is_some(),
            FieldKind::AirQuality => self.air_quality.is_some(),
            FieldKind::Radiation => self.radiation.is_some(),
            FieldKind::Depth => self.depth.is_some(),
            FieldKind::Position => self.position.is_some(),
            FieldKind::Datetime => self.datetime.is_some(),
            FieldKind::Flags => self.flags.is_some(),
            FieldKind::Image => false,
        }
    }

    /// Pack the populated slot for `kind` at the writer cursor.
    ///
    /// Slots are packed sub-field by sub-field in declaration order, so
    /// each field occupies exactly its declared width.
    pub(crate) fn pack(&self, kind: FieldKind, w: &mut BitWriter<'_>) -> Result<()> {
        match kind {
            FieldKind::Battery => {
                if let Some(v) = &self.battery {
                    w.write(u64::from(v.level), 5)?;
                    w.write(u64::from(v.charging), 1)?;
                }
            },
            FieldKind::Link => {
                if let Some(v) = &self.link {
                    w.write(u64::from(v.rssi), 4)?;
                    w.write(u64::from(v.snr), 5)?;
                }
            },
            FieldKind::Environment => {
                if let Some(v) = &self.environment {
                    w.write(u64::from(v.temperature), 9)?;
                    w.write(u64::from(v.pressure), 8)?;
                    w.write(u64::from(v.humidity), 7)?;
                }
            },
            FieldKind::Temperature => {
                if let Some(v) = &self.temperature {
                    w.write(u64::from(v.0), 9)?;
                }
            },
            FieldKind::Pressure => {
                if let Some(v) = &self.pressure {
                    w.write(u64::from(v.0), 8)?;
                }
            },
            FieldKind::Humidity => {
                if let Some(v) = &self.humidity {
                    w.write(u64::from(v.0), 7)?;
                }
            },
            FieldKind::Wind => {
                if let Some(v) = &self.wind {
                    w.write(u64::from(v.speed), 7)?;
                    w.write(u64::from(v.gust), 7)?;
                    w.write(u64::from(v.direction), 8)?;
                }
            },
            FieldKind::Rain => {
                if let Some(v) = &self.rain {
                    w.write(u64::from(v.rate), 8)?;
                    w.write(u64::from(v.size), 5)?;
                }
            },
            FieldKind::Solar => {
                if let Some(v) = &self.solar {
                    w.write(u64::from(v.irradiance), 10)?;
                    w.write(u64::from(v.uv), 4)?;
                }
            },
            FieldKind::CloudCover => {
                if let Some(v) = &self.cloud_cover {
                    w.write(u64::from(v.0), 4)?;
                }
            },
            FieldKind::AirQuality => {
                if let Some(v) = &self.air_quality {
                    w.write(u64::from(v.0), 9)?;
                }
            },
            FieldKind::Radiation => {
                if let Some(v) = &self.radiation {
                    w.write(u64::from(v.cpm), 16)?;
                    w.write(u64::from(v.dose), 14)?;
                }
            },
            FieldKind::Depth => {
                if let Some(v) = &self.depth {
                    w.write(u64::from(v.0), 10)?;
                }
            },
            FieldKind::Position => {
                if let Some(v) = &self.position {
                    w.write(u64::from(v.lat), 24)?;
                    w.write(u64::from(v.lon), 25)?;
                }
            },
            FieldKind::Datetime => {
                if let Some(v) = &self.datetime {
                    w.write(u64::from(v.0), 20)?;
                }
            },
            FieldKind::Flags => {
                if let Some(v) = &self.flags {
                    w.write(u64::from(v.0), 8)?;
                }
            },
            FieldKind::Image => {
                debug_assert!(false, "image is packed by the encoder, not the field set");
            },
        }
        Ok(())
    }

    /// Unpack the slot for `kind` from the reader cursor.
    pub(crate) fn unpack(&mut self, kind: FieldKind, r: &mut BitReader<'_>) -> Result<()> {
        match kind {
            FieldKind::Battery => {
                let level = r.try_read(5)? as u8;
                let charging = r.try_read(1)? != 0;
                self.battery = Some(Battery { level, charging });
            },
            FieldKind::Link => {
                let rssi = r.try_read(4)? as u8;
                let snr = r.try_read(5)? as u8;
                self.link = Some(Link { rssi, snr });
            },
            FieldKind::Environment => {
                let temperature = r.try_read(9)? as u16;
                let pressure = r.try_read(8)? as u8;
                let humidity = r.try_read(7)? as u8;
                self.environment = Some(Environment { temperature, pressure, humidity });
            },
            FieldKind::Temperature => {
                self.temperature = Some(Temperature(r.try_read(9)? as u16));
            },
            FieldKind::Pressure => {
                self.pressure = Some(Pressure(r.try_read(8)? as u8));
            },
            FieldKind::Humidity => {
                self.humidity = Some(Humidity(r.try_read(7)? as u8));
            },
            FieldKind::Wind => {
                let speed = r.try_read(7)? as u8;
                let gust = r.try_read(7)? as u8;
                let direction = r.try_read(8)? as u8;
                self.wind = Some(Wind { speed, gust, direction });
            },
            FieldKind::Rain => {
                let rate = r.try_read(8)? as u8;
                let size = r.try_read(5)? as u8;
                self.rain = Some(Rain { rate, size });
            },
            FieldKind::Solar => {
                let irradiance = r.try_read(10)? as u16;
                let uv = r.try_read(4)? as u8;
                self.solar = Some(Solar { irradiance, uv });
            },
            FieldKind::CloudCover => {
                self.cloud_cover = Some(CloudCover(r.try_read(4)? as u8));
            },
            FieldKind::AirQuality => {
                self.air_quality = Some(AirQuality(r.try_read(9)? as u16));
            },
            FieldKind::Radiation => {
                let cpm = r.try_read(16)? as u16;
                let dose = r.try_read(14)? as u16;
                self.radiation = Some(Radiation { cpm, dose });
            },
            FieldKind::Depth => {
                self.depth = Some(Depth(r.try_read(10)? as u16));
            },
            FieldKind::Position => {
                let lat = r.try_read(24)? as u32;
                let lon = r.try_read(25)? as u32;
                self.position = Some(Position { lat, lon });
            },
            FieldKind::Datetime => {
                self.datetime = Some(Datetime(r.try_read(20)? as u32));
            },
            FieldKind::Flags => {
                self.flags = Some(Flags(r.try_read(8)? as u8));
            },
            FieldKind::Image => {
                debug_assert!(false, "image is unpacked by the decoder, not the field set");
            },
        }
        Ok(())
    }
}
