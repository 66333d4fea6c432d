pub mod gas_tank;
pub mod thermal_tank;

use std::f64::consts::PI;

/// Cylindrical tank dimensions derived from the volume and a regressed height to radius ratio.
/// The difference between internal and external volume is disregarded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TankDimensions {
    radius: f64,
    height: f64,
}

impl TankDimensions {
    /// Arguments:
    /// * `volume` - in m3
    /// * `height_vs_radius` - ratio of tank height to its radius
    pub(crate) fn from_volume(volume: f64, height_vs_radius: f64) -> Self {
        let radius = (volume / (height_vs_radius * PI)).cbrt();
        Self {
            radius,
            height: radius * height_vs_radius,
        }
    }

    /// Wall area of the whole tank, in m2
    pub(crate) fn area(&self) -> f64 {
        2. * self.radius.powi(2) * PI + 2. * self.radius * PI * self.height
    }

    /// Wall areas (upper, lower) of a tank split by the upper volume fraction; each part has one
    /// end cap.
    pub(crate) fn split_areas(&self, upper_volume_fraction: f64) -> (f64, f64) {
        let height_upper = upper_volume_fraction * self.height;
        let height_lower = self.height - height_upper;
        let part_area = |height: f64| self.radius.powi(2) * PI + 2. * self.radius * PI * height;
        (part_area(height_upper), part_area(height_lower))
    }
}

/// Coefficient of thermal transmittance of a unit of tank wall, in W/(m2.K)
///
/// Arguments:
/// * `insulation_thickness` - in m
/// * `insulation_conductivity` - in W/(m.K)
pub(crate) fn thermal_transmittance(insulation_thickness: f64, insulation_conductivity: f64) -> f64 {
    insulation_conductivity / insulation_thickness
}

/// Heat loss rate through a tank wall to the environment, in W
pub(crate) fn wall_heat_loss(u_value: f64, area: f64, ambient_temp: f64, tank_temp: f64) -> f64 {
    u_value * area * (tank_temp - ambient_temp)
}
