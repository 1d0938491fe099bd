//! Mapping from provider condition codes and temperature to a display icon.
//!
//! Condition codes follow OpenWeatherMap's grouping: 2xx thunderstorm, 3xx
//! drizzle, 5xx rain, 6xx snow, 7xx atmosphere, 800 clear, 80x clouds.
//! Only the clear/clouds family looks at temperature.

use crate::model::UnitSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconId {
    Clear,
    Cloudy,
    Rainy,
    Snow,
    Storm,
    Downpour,
    Atmospheric,
}

impl IconId {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconId::Clear => "clear",
            IconId::Cloudy => "cloudy",
            IconId::Rainy => "rainy",
            IconId::Snow => "snow",
            IconId::Storm => "storm",
            IconId::Downpour => "downpour",
            IconId::Atmospheric => "atmospheric",
        }
    }
}

const CLEAR_SKY: i32 = 800;
const HEAVY_RAIN: [i32; 4] = [502, 503, 504, 522];

/// Temperature band edges, expressed in the unit system of the reading.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Thresholds {
    freezing: f64,
    cool: f64,
    warm: f64,
}

impl Thresholds {
    fn for_units(units: UnitSystem) -> Self {
        // the "cold" edge (10 / 50) separates two bands that both render as Cloudy
        match units {
            UnitSystem::Metric => Thresholds { freezing: 0.0, cool: 15.0, warm: 25.0 },
            UnitSystem::Imperial => Thresholds { freezing: 32.0, cool: 59.0, warm: 77.0 },
        }
    }
}

/// Pick the icon for a condition code and temperature.
///
/// Total and deterministic: absent or nonsensical input yields [`IconId::Cloudy`].
/// Severe-weather codes always win over temperature, so a hot thunderstorm is
/// still a [`IconId::Storm`].
pub fn select_icon(condition_code: Option<i32>, temperature: f64, units: UnitSystem) -> IconId {
    let Some(code) = condition_code else {
        return IconId::Cloudy;
    };

    match code {
        200..=299 => IconId::Storm,
        300..=399 | 500..=599 if HEAVY_RAIN.contains(&code) => IconId::Downpour,
        300..=399 | 500..=599 => IconId::Rainy,
        600..=699 => IconId::Snow,
        700..=799 => IconId::Atmospheric,
        CLEAR_SKY.. => by_temperature(code, temperature, units),
        _ => IconId::Cloudy,
    }
}

fn by_temperature(code: i32, temperature: f64, units: UnitSystem) -> IconId {
    if !temperature.is_finite() {
        return IconId::Cloudy;
    }

    let t = Thresholds::for_units(units);
    if temperature < t.freezing {
        IconId::Snow
    } else if temperature < t.cool {
        IconId::Cloudy
    } else if temperature < t.warm {
        if code == CLEAR_SKY { IconId::Clear } else { IconId::Cloudy }
    } else {
        IconId::Clear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use UnitSystem::{Imperial, Metric};

    #[test]
    fn thunderstorm_family_is_always_storm() {
        for code in 200..300 {
            for temp in [-40.0, 0.0, 20.0, 45.0, 110.0] {
                assert_eq!(select_icon(Some(code), temp, Metric), IconId::Storm);
                assert_eq!(select_icon(Some(code), temp, Imperial), IconId::Storm);
            }
        }
    }

    #[test]
    fn heavy_rain_subcodes_are_downpour() {
        for code in HEAVY_RAIN {
            assert_eq!(select_icon(Some(code), 30.0, Metric), IconId::Downpour);
        }
        assert_eq!(select_icon(Some(522), -3.0, Imperial), IconId::Downpour);
    }

    #[test]
    fn drizzle_and_light_rain_are_rainy() {
        assert_eq!(select_icon(Some(301), 18.0, Metric), IconId::Rainy);
        assert_eq!(select_icon(Some(500), 18.0, Metric), IconId::Rainy);
        assert_eq!(select_icon(Some(531), 90.0, Imperial), IconId::Rainy);
    }

    #[test]
    fn snow_and_atmosphere_families() {
        assert_eq!(select_icon(Some(601), 5.0, Metric), IconId::Snow);
        assert_eq!(select_icon(Some(741), 30.0, Metric), IconId::Atmospheric);
        assert_eq!(select_icon(Some(781), -10.0, Metric), IconId::Atmospheric);
    }

    #[test]
    fn clear_code_distinguishes_mild_band() {
        assert_eq!(select_icon(Some(800), 20.0, Metric), IconId::Clear);
        assert_eq!(select_icon(Some(801), 20.0, Metric), IconId::Cloudy);
    }

    #[test]
    fn freezing_overrides_clear_code() {
        assert_eq!(select_icon(Some(800), -5.0, Metric), IconId::Snow);
        assert_eq!(select_icon(Some(804), 20.0, Imperial), IconId::Snow);
    }

    #[test]
    fn cold_and_chilly_bands_are_cloudy() {
        assert_eq!(select_icon(Some(800), 0.0, Metric), IconId::Cloudy);
        assert_eq!(select_icon(Some(800), 12.0, Metric), IconId::Cloudy);
        assert_eq!(select_icon(Some(800), 55.0, Imperial), IconId::Cloudy);
    }

    #[test]
    fn warm_is_clear_for_any_clouds_code() {
        assert_eq!(select_icon(Some(803), 25.0, Metric), IconId::Clear);
        assert_eq!(select_icon(Some(800), 77.0, Imperial), IconId::Clear);
        assert_eq!(
            select_icon(Some(800), 77.0, Imperial),
            select_icon(Some(800), 25.0, Metric)
        );
    }

    #[test]
    fn same_reading_differs_by_unit() {
        // 20 is mild in Celsius but below freezing in Fahrenheit
        assert_eq!(select_icon(Some(800), 20.0, Metric), IconId::Clear);
        assert_eq!(select_icon(Some(800), 20.0, Imperial), IconId::Snow);
    }

    #[test]
    fn absent_or_malformed_input_is_cloudy() {
        assert_eq!(select_icon(None, 30.0, Metric), IconId::Cloudy);
        assert_eq!(select_icon(None, -30.0, Imperial), IconId::Cloudy);
        assert_eq!(select_icon(Some(-1), 20.0, Metric), IconId::Cloudy);
        assert_eq!(select_icon(Some(450), 20.0, Metric), IconId::Cloudy);
        assert_eq!(select_icon(Some(800), f64::NAN, Metric), IconId::Cloudy);
    }

    #[test]
    fn nan_temperature_does_not_mask_storm() {
        assert_eq!(select_icon(Some(211), f64::NAN, Metric), IconId::Storm);
    }
}
