//! Scalar quantizers between physical units and raw wire values.
//!
//! Every scalar field is carried as `raw = round((value - min) / step)`
//! over a fixed range, where `step` may be rational (wind direction,
//! position). All arithmetic is integer over *scaled units* — centi
//! units for fractional fields, micro-degrees for position — so the
//! codec builds identically with or without the `float` feature and
//! both paths emit the same wire bytes.
//!
//! Exactness: `quantize(dequantize(raw)) == raw` for every in-range
//! raw value. Each scale's unit is finer than half a step, so the
//! round-to-nearest in `dequantize` never moves a value across a step
//! boundary. Re-encoding a decoded packet therefore reproduces the
//! original bytes.

use crate::errors::{CodecError, Result};

/// A linear quantizer over scaled integer units.
///
/// `step_num / step_den` is the physical size of one raw step, in the
/// field's scaled unit. `min`/`max` bound accepted input, and
/// `(max - min) / step` always fits in `bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearScale {
    /// Sub-field name used in range errors.
    pub name: &'static str,
    /// Minimum accepted value, scaled units.
    pub min: i64,
    /// Maximum accepted value, scaled units.
    pub max: i64,
    /// Step numerator, scaled units.
    pub step_num: i64,
    /// Step denominator.
    pub step_den: i64,
    /// Raw field width on the wire.
    pub bits: usize,
}

impl LinearScale {
    /// Validate `value` against the declared range.
    ///
    /// # Errors
    ///
    /// `RangeLow` / `RangeHigh` naming the sub-field.
    pub fn check(&self, value: i64) -> Result<()> {
        if value < self.min {
            return Err(CodecError::RangeLow { field: self.name, value, min: self.min });
        }
        if value > self.max {
            return Err(CodecError::RangeHigh { field: self.name, value, max: self.max });
        }
        Ok(())
    }

    /// Quantize an in-range value to its raw wire representation.
    ///
    /// Callers must [`check`](Self::check) first; the result is masked
    /// to the field width, so the bit-mask (index) scales wrap instead
    /// of overflowing.
    #[must_use]
    pub fn quantize(&self, value: i64) -> u32 {
        debug_assert!(value >= self.min && value <= self.max);
        let offset = value - self.min;
        // round(offset * den / num), offset >= 0
        let raw = (offset * self.step_den * 2 + self.step_num) / (self.step_num * 2);
        (raw as u32) & self.raw_mask()
    }

    /// Recover the nearest scaled value for a raw wire representation.
    #[must_use]
    pub fn dequantize(&self, raw: u32) -> i64 {
        let raw = i64::from(raw & self.raw_mask());
        self.min + (raw * self.step_num * 2 + self.step_den) / (self.step_den * 2)
    }

    /// Largest raw value the range produces.
    #[must_use]
    pub fn max_raw(&self) -> u32 {
        self.quantize(self.max)
    }

    const fn raw_mask(&self) -> u32 {
        if self.bits >= 32 { u32::MAX } else { (1u32 << self.bits) - 1 }
    }

    /// Check then quantize in one step.
    ///
    /// # Errors
    ///
    /// `RangeLow` / `RangeHigh` naming the sub-field.
    pub fn encode(&self, value: i64) -> Result<u32> {
        self.check(value)?;
        Ok(self.quantize(value))
    }
}

/// Battery charge, percent, 5 % steps.
pub const BATTERY_LEVEL: LinearScale =
    LinearScale { name: "battery_level", min: 0, max: 100, step_num: 5, step_den: 1, bits: 5 };

/// Link RSSI, dBm, 4 dBm steps.
pub const LINK_RSSI: LinearScale =
    LinearScale { name: "link_rssi", min: -120, max: -60, step_num: 4, step_den: 1, bits: 4 };

/// Link SNR, dB.
pub const LINK_SNR: LinearScale =
    LinearScale { name: "link_snr", min: -20, max: 10, step_num: 1, step_den: 1, bits: 5 };

/// Air temperature, centi-°C, 0.25 °C steps.
pub const TEMPERATURE: LinearScale =
    LinearScale { name: "temperature", min: -4000, max: 8000, step_num: 25, step_den: 1, bits: 9 };

/// Barometric pressure, hPa, offset 850.
pub const PRESSURE: LinearScale =
    LinearScale { name: "pressure", min: 850, max: 1105, step_num: 1, step_den: 1, bits: 8 };

/// Relative humidity, percent.
pub const HUMIDITY: LinearScale =
    LinearScale { name: "humidity", min: 0, max: 100, step_num: 1, step_den: 1, bits: 7 };

/// Wind speed, centi-m/s, 0.5 m/s steps.
pub const WIND_SPEED: LinearScale =
    LinearScale { name: "wind_speed", min: 0, max: 6350, step_num: 50, step_den: 1, bits: 7 };

/// Wind gust, same scale as speed, distinct name for range errors.
pub const WIND_GUST: LinearScale =
    LinearScale { name: "wind_gust", min: 0, max: 6350, step_num: 50, step_den: 1, bits: 7 };

/// Wind direction, centi-degrees over a 256-step circle (index scale).
pub const WIND_DIRECTION: LinearScale = LinearScale {
    name: "wind_direction",
    min: 0,
    max: 35900,
    step_num: 36000,
    step_den: 256,
    bits: 8,
};

/// Rain rate, mm/hr.
pub const RAIN_RATE: LinearScale =
    LinearScale { name: "rain_rate", min: 0, max: 255, step_num: 1, step_den: 1, bits: 8 };

/// Rain drop size, centi-mm/d, 0.2 mm/d steps.
pub const RAIN_SIZE: LinearScale =
    LinearScale { name: "rain_size", min: 0, max: 600, step_num: 20, step_den: 1, bits: 5 };

/// Solar irradiance, W/m².
pub const SOLAR_IRRADIANCE: LinearScale =
    LinearScale { name: "solar_irradiance", min: 0, max: 1023, step_num: 1, step_den: 1, bits: 10 };

/// Solar UV index.
pub const SOLAR_UV: LinearScale =
    LinearScale { name: "solar_uv", min: 0, max: 15, step_num: 1, step_den: 1, bits: 4 };

/// Cloud cover, oktas.
pub const CLOUD_COVER: LinearScale =
    LinearScale { name: "cloud_cover", min: 0, max: 8, step_num: 1, step_den: 1, bits: 4 };

/// Air quality index.
pub const AQ_INDEX: LinearScale =
    LinearScale { name: "aq_index", min: 0, max: 500, step_num: 1, step_den: 1, bits: 9 };

/// Radiation counts per minute.
pub const RADIATION_CPM: LinearScale =
    LinearScale { name: "radiation_cpm", min: 0, max: 65535, step_num: 1, step_den: 1, bits: 16 };

/// Radiation dose rate, centi-µSv/h, 0.01 µSv/h steps.
pub const RADIATION_DOSE: LinearScale =
    LinearScale { name: "radiation_dose", min: 0, max: 16383, step_num: 1, step_den: 1, bits: 14 };

/// Water depth, cm.
pub const DEPTH: LinearScale =
    LinearScale { name: "depth", min: 0, max: 1023, step_num: 1, step_den: 1, bits: 10 };

/// Latitude, micro-degrees over the full 24-bit range.
pub const POSITION_LAT: LinearScale = LinearScale {
    name: "position_lat",
    min: -90_000_000,
    max: 90_000_000,
    step_num: 180_000_000,
    step_den: (1 << 24) - 1,
    bits: 24,
};

/// Longitude, micro-degrees over the full 25-bit range.
pub const POSITION_LON: LinearScale = LinearScale {
    name: "position_lon",
    min: -180_000_000,
    max: 180_000_000,
    step_num: 360_000_000,
    step_den: (1 << 25) - 1,
    bits: 25,
};

/// Seconds since the epoch start, 5 s steps over the 20-bit range.
pub const DATETIME: LinearScale =
    LinearScale { name: "datetime", min: 0, max: 5_242_875, step_num: 5, step_den: 1, bits: 20 };

/// Scaled-unit conversion for the `float` API: round `phys * factor`.
#[cfg(feature = "float")]
#[must_use]
pub fn scaled_from_f64(phys: f64, factor: f64) -> i64 {
    (phys * factor).round() as i64
}

/// Inverse of [`scaled_from_f64`].
#[cfg(feature = "float")]
#[must_use]
pub fn f64_from_scaled(scaled: i64, factor: f64) -> f64 {
    scaled as f64 / factor
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const ALL: &[LinearScale] = &[
        BATTERY_LEVEL,
        LINK_RSSI,
        LINK_SNR,
        TEMPERATURE,
        PRESSURE,
        HUMIDITY,
        WIND_SPEED,
        WIND_DIRECTION,
        RAIN_RATE,
        RAIN_SIZE,
        SOLAR_IRRADIANCE,
        SOLAR_UV,
        CLOUD_COVER,
        AQ_INDEX,
        RADIATION_CPM,
        RADIATION_DOSE,
        DEPTH,
        POSITION_LAT,
        POSITION_LON,
        DATETIME,
    ];

    #[test]
    fn ranges_fit_declared_widths() {
        for scale in ALL {
            assert!(
                u64::from(scale.max_raw()) <= (1u64 << scale.bits) - 1,
                "{} raw range exceeds {} bits",
                scale.name,
                scale.bits
            );
        }
    }

    #[test]
    fn raw_round_trip_is_exact() {
        for scale in ALL {
            // Exhaustive for narrow fields, strided for the wide ones.
            let stride = (scale.max_raw() / 65536).max(1) as usize;
            for raw in (0..=scale.max_raw()).step_by(stride) {
                let value = scale.dequantize(raw);
                assert_eq!(scale.quantize(value), raw, "{} raw {raw}", scale.name);
            }
            let last = scale.max_raw();
            assert_eq!(scale.quantize(scale.dequantize(last)), last, "{} raw {last}", scale.name);
        }
    }

    #[test]
    fn known_values() {
        assert_eq!(BATTERY_LEVEL.quantize(75), 15);
        assert_eq!(BATTERY_LEVEL.dequantize(15), 75);

        assert_eq!(TEMPERATURE.quantize(2150), 246); // 21.50 °C
        assert_eq!(TEMPERATURE.dequantize(246), 2150);
        assert_eq!(TEMPERATURE.quantize(-4000), 0);
        assert_eq!(TEMPERATURE.quantize(8000), 480);

        assert_eq!(PRESSURE.quantize(1013), 163);
        assert_eq!(PRESSURE.dequantize(163), 1013);

        assert_eq!(LINK_RSSI.quantize(-120), 0);
        assert_eq!(LINK_RSSI.quantize(-60), 15);

        assert_eq!(DATETIME.max_raw(), (1 << 20) - 1);
    }

    #[test]
    fn out_of_range_is_an_error() {
        assert_eq!(
            TEMPERATURE.encode(-4001),
            Err(CodecError::RangeLow { field: "temperature", value: -4001, min: -4000 })
        );
        assert_eq!(
            TEMPERATURE.encode(8001),
            Err(CodecError::RangeHigh { field: "temperature", value: 8001, max: 8000 })
        );
        assert!(TEMPERATURE.encode(-4000).is_ok());
        assert!(TEMPERATURE.encode(8000).is_ok());
    }

    #[test]
    fn wind_direction_wraps_on_the_index_circle() {
        // 0° and the notional 360° land on the same raw step.
        assert_eq!(WIND_DIRECTION.quantize(0), 0);
        let last = WIND_DIRECTION.quantize(35900);
        assert_eq!(last, 255);
        assert_eq!(WIND_DIRECTION.dequantize(255), 35859);
    }

    proptest! {
        #[test]
        fn dequantize_lands_within_one_step(idx in 0usize..20, raw in any::<u32>()) {
            let scale = ALL[idx];
            let raw = raw % (scale.max_raw() + 1);
            let value = scale.dequantize(raw);
            prop_assert!(value >= scale.min);
            prop_assert!(value <= scale.max + scale.step_num / (2 * scale.step_den).max(1));
        }
    }

    #[cfg(feature = "float")]
    #[test]
    fn float_path_matches_integer_path() {
        // Byte-for-byte agreement between modes at step granularity.
        for raw in 0..=TEMPERATURE.max_raw() {
            let centi = TEMPERATURE.dequantize(raw);
            let phys = f64_from_scaled(centi, 100.0);
            assert_eq!(scaled_from_f64(phys, 100.0), centi);
            assert_eq!(TEMPERATURE.quantize(scaled_from_f64(phys, 100.0)), raw);
        }
        for raw in (0..=POSITION_LAT.max_raw()).step_by(4099) {
            let micro = POSITION_LAT.dequantize(raw);
            let phys = f64_from_scaled(micro, 1_000_000.0);
            assert_eq!(POSITION_LAT.quantize(scaled_from_f64(phys, 1_000_000.0)), raw);
        }
    }
}
