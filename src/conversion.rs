//! Thermistor resistance to temperature conversion
//!
//! The probe is a 10 kΩ NTC thermistor. Resistance is converted with the
//! Steinhart-Hart equation:
//!
//! ```text
//! 1 / T = A + B·ln(R) + C·ln(R)³        (T in kelvin, R in ohms)
//! ```
//!
//! The fit is only trusted between [`SteinhartHart::min_ohms`] (inclusive) and
//! [`SteinhartHart::max_ohms`] (exclusive). Anything outside, including 0 Ω from an
//! open input, converts to `None` rather than to a made-up number.

/// Offset between kelvin and degrees Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Rounding used when the caller does not ask for anything else.
pub const DEFAULT_DIGITS: i32 = 2;

/// Steinhart-Hart coefficients and the resistance range they are valid for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteinhartHart {
    /// Constant term
    pub a: f64,
    /// ln(R) coefficient
    pub b: f64,
    /// ln(R)³ coefficient
    pub c: f64,
    /// Smallest accepted resistance (inclusive), about 198 °C
    pub min_ohms: u32,
    /// Upper resistance bound (exclusive), about -44 °C
    pub max_ohms: u32,
}

impl SteinhartHart {
    /// Coefficients for the 10 kΩ probe shipped with the instrument.
    pub const ATLAS_PROBE: Self = Self {
        a: 1.009_249_522e-3,
        b: 2.378_405_444e-4,
        c: 2.019_202_697e-7,
        min_ohms: 100,
        max_ohms: 250_000,
    };

    /// Whether `ohms` lies inside the fitted range.
    #[inline]
    pub fn in_domain(&self, ohms: u32) -> bool {
        (self.min_ohms..self.max_ohms).contains(&ohms)
    }

    /// Unrounded temperature in °C, or `None` outside the valid domain.
    pub fn celsius(&self, ohms: u32) -> Option<f64> {
        if !self.in_domain(ohms) {
            return None;
        }
        let ln_r = f64::from(ohms).ln();
        let inverse_kelvin = self.a + self.b * ln_r + self.c * ln_r.powi(3);
        let celsius = inverse_kelvin.recip() - KELVIN_OFFSET;
        (inverse_kelvin > 0.0 && celsius.is_finite()).then_some(celsius)
    }
}

impl Default for SteinhartHart {
    fn default() -> Self {
        Self::ATLAS_PROBE
    }
}

/// Round to `digits` fractional digits, half away from zero.
///
/// Precisions finer than `f64` can scale to return `value` unchanged.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let scaled = value * factor;
    if !factor.is_finite() || !scaled.is_finite() || factor == 0.0 {
        return value;
    }
    scaled.round() / factor
}

/// Convert one resistance with the probe constants and round the result.
///
/// Out-of-domain resistances stay `None`; rounding applies to valid values only.
pub fn ohms_to_celsius(ohms: u32, digits: i32) -> Option<f64> {
    SteinhartHart::ATLAS_PROBE
        .celsius(ohms)
        .map(|celsius| round_to(celsius, digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_resistance_is_room_temperature() {
        let celsius = SteinhartHart::ATLAS_PROBE.celsius(10_000).unwrap();
        assert!((celsius - 24.68).abs() < 0.01, "got {celsius}");
    }

    #[test]
    fn known_points() {
        let probe = SteinhartHart::default();
        assert!((probe.celsius(100).unwrap() - 197.60).abs() < 0.01);
        assert!((probe.celsius(4_000).unwrap() - 49.73).abs() < 0.01);
        assert!((probe.celsius(100_000).unwrap() + 26.58).abs() < 0.01);
    }

    #[test]
    fn out_of_domain_is_none() {
        assert_eq!(ohms_to_celsius(0, 2), None);
        assert_eq!(ohms_to_celsius(99, 2), None);
        assert_eq!(ohms_to_celsius(250_000, 2), None);
        assert_eq!(ohms_to_celsius(262_136, 2), None);
        assert_eq!(ohms_to_celsius(u32::MAX, 2), None);
    }

    #[test]
    fn domain_edges() {
        let probe = SteinhartHart::ATLAS_PROBE;
        assert!(probe.in_domain(probe.min_ohms));
        assert!(!probe.in_domain(probe.max_ohms));
        assert!(probe.celsius(probe.max_ohms - 4).is_some());
    }

    #[test]
    fn temperature_falls_as_resistance_rises() {
        let probe = SteinhartHart::ATLAS_PROBE;
        let mut previous = f64::INFINITY;
        for ohms in (probe.min_ohms..probe.max_ohms).step_by(4) {
            let celsius = probe.celsius(ohms).unwrap();
            assert!(celsius < previous, "not monotonic at {ohms} Ω");
            previous = celsius;
        }
    }

    #[test]
    fn rounding_applies_requested_digits() {
        assert_eq!(ohms_to_celsius(10_000, 2), Some(24.68));
        assert_eq!(ohms_to_celsius(10_000, 1), Some(24.7));
        assert_eq!(ohms_to_celsius(10_000, 0), Some(25.0));
        assert_eq!(round_to(-44.257, 1), -44.3);
    }

    #[test]
    fn huge_precision_keeps_the_value() {
        let exact = SteinhartHart::ATLAS_PROBE.celsius(10_000).unwrap();
        for digits in [15, 300, 308, 309, 400, i32::MAX] {
            let celsius = ohms_to_celsius(10_000, digits).unwrap();
            assert!(celsius.is_finite(), "digits {digits} gave {celsius}");
            assert!((celsius - exact).abs() < 1e-9);
        }
        assert_eq!(round_to(-44.257, 400), -44.257);
    }

    #[test]
    fn conversion_is_deterministic() {
        assert_eq!(ohms_to_celsius(5_000, 3), ohms_to_celsius(5_000, 3));
    }
}
