use crate::core::units::per_hour_to_per_second;
use std::sync::LazyLock;

/// This module contains data on the properties of the working fluids, and a type to
/// organise this data.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialProperties {
    density: f64,                  // kg/m3
    specific_heat_capacity: f64,   // J/(kg.K)
    volumetric_heat_capacity: f64, // J/(m3.K)
}

impl MaterialProperties {
    pub fn new(density: f64, specific_heat_capacity: f64) -> Self {
        Self {
            density,
            specific_heat_capacity,
            volumetric_heat_capacity: specific_heat_capacity * density,
        }
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn specific_heat_capacity(&self) -> f64 {
        self.specific_heat_capacity
    }

    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.volumetric_heat_capacity
    }

    /// Return the heat capacity of a volume of material, in J / K
    ///
    /// Arguments:
    /// * `volume` - in m3
    pub fn heat_capacity(&self, volume: f64) -> f64 {
        volume * self.volumetric_heat_capacity
    }

    /// Return the heat rate carried by a flow of material, in W
    ///
    /// Arguments:
    /// * `flow` - volume flow rate, in m3/h
    /// * `temp_high` - temperature of the flow, in K or deg C
    /// * `temp_base` - temperature which defines "zero energy", in same units as temp_high
    pub fn heat_rate_of_flow(&self, flow: f64, temp_high: f64, temp_base: f64) -> f64 {
        per_hour_to_per_second(flow) * self.volumetric_heat_capacity * (temp_high - temp_base)
    }
}

// Water at 20 degC, ASHRAE Fundamentals 2017, chapter 33, table 2
pub static WATER: LazyLock<MaterialProperties> =
    LazyLock::new(|| MaterialProperties::new(998.2, 4180.));

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[rstest]
    fn should_have_correct_water_properties() {
        assert_eq!(WATER.density(), 998.2);
        assert_eq!(WATER.specific_heat_capacity(), 4180.);
        assert_relative_eq!(WATER.volumetric_heat_capacity(), 4_172_476.);
    }

    #[rstest]
    fn should_calc_heat_capacity_of_volume() {
        assert_relative_eq!(WATER.heat_capacity(0.5), 2_086_238.);
    }

    #[rstest]
    fn should_calc_heat_rate_of_draw() {
        // 0.02 m3/h heated from 20 degC to 48.89 degC
        assert_relative_eq!(
            WATER.heat_rate_of_flow(0.02, 322.04, 293.15),
            669.682398,
            max_relative = 1e-6
        );
    }
}
