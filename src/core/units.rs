use thiserror::Error;

pub const SECONDS_PER_HOUR: u32 = 3_600;
pub const JOULES_PER_WATT_HOUR: u32 = 3_600;
pub const KELVIN_OFFSET: f64 = 273.15;
// US liquid gallon
pub const CUBIC_METRES_PER_GALLON: f64 = 0.003_785_411_784;
pub const SQUARE_METRES_PER_SQUARE_FOOT: f64 = 0.092_903_04;

pub(crate) fn celsius_to_kelvin(temp_c: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_c < -KELVIN_OFFSET {
        Err(BelowAbsoluteZeroError::from_c(temp_c))
    } else {
        Ok(temp_c + KELVIN_OFFSET)
    }
}

pub(crate) fn kelvin_to_celsius(temp_k: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_k < 0.0 {
        Err(BelowAbsoluteZeroError::from_k(temp_k))
    } else {
        Ok(temp_k - KELVIN_OFFSET)
    }
}

/// Convert a volume flow rate from m3/h to m3/s
pub(crate) fn per_hour_to_per_second(flow_per_hour: f64) -> f64 {
    flow_per_hour / SECONDS_PER_HOUR as f64
}

/// Convert energy over a timestep (in J) to an average heat rate (in W)
///
/// Arguments:
/// * `energy` - in J
/// * `timestep` - in hours
pub(crate) fn joules_to_average_watts(energy: f64, timestep: f64) -> f64 {
    energy / JOULES_PER_WATT_HOUR as f64 / timestep
}

/// Convert an average heat rate (in W) held for a timestep to energy (in J)
pub(crate) fn average_watts_to_joules(heat_rate: f64, timestep: f64) -> f64 {
    heat_rate * timestep * JOULES_PER_WATT_HOUR as f64
}

pub fn cubic_metres_to_gallons(volume: f64) -> f64 {
    volume / CUBIC_METRES_PER_GALLON
}

pub fn gallons_to_cubic_metres(volume: f64) -> f64 {
    volume * CUBIC_METRES_PER_GALLON
}

pub fn square_feet_to_square_metres(area: f64) -> f64 {
    area * SQUARE_METRES_PER_SQUARE_FOOT
}

#[derive(Debug, Error)]
#[error("A temperature of {k}K/{}ºC was encountered, which is less than absolute zero", k - KELVIN_OFFSET)]
pub struct BelowAbsoluteZeroError {
    k: f64,
}

impl BelowAbsoluteZeroError {
    fn from_k(k: f64) -> Self {
        Self { k }
    }

    fn from_c(c: f64) -> Self {
        Self { k: c + KELVIN_OFFSET }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[rstest]
    fn should_convert_water_main_temperature_to_kelvin() {
        assert_relative_eq!(celsius_to_kelvin(20.).unwrap(), 293.15);
        assert_relative_eq!(kelvin_to_celsius(322.04).unwrap(), 48.89, max_relative = 1e-9);
    }

    #[rstest]
    fn should_reject_temperatures_below_absolute_zero() {
        assert!(celsius_to_kelvin(-300.).is_err());
        assert!(kelvin_to_celsius(-1.).is_err());
    }

    #[rstest]
    fn should_convert_between_energy_and_average_heat_rate() {
        assert_relative_eq!(joules_to_average_watts(7_200., 1.), 2.);
        assert_relative_eq!(joules_to_average_watts(7_200., 0.5), 4.);
        assert_relative_eq!(average_watts_to_joules(2., 1.), 7_200.);
    }

    #[rstest]
    fn should_convert_tank_volume_to_gallons() {
        // 30 gallon tank
        assert_relative_eq!(
            cubic_metres_to_gallons(0.113_562_353_52),
            30.,
            max_relative = 1e-9
        );
        assert_relative_eq!(gallons_to_cubic_metres(55.), 0.208_197_648_12, max_relative = 1e-9);
    }
}
