use crate::compare_floats::max_of_2;
use crate::core::material_properties::{MaterialProperties, WATER};
use crate::core::parameters::{ComponentKind, ComponentSizes, FromCatalog, ParameterCatalog};
use crate::core::storage::{thermal_transmittance, TankDimensions};

// 30 gal tank, DOE residential water heater rulemaking (2010)
const DEFAULT_VOLUME: f64 = 0.11356236; // m3
const HEIGHT_VS_RADIUS: f64 = 6.;
pub const DEFAULT_SURROUNDING_TEMP: f64 = 291.48; // K, 65 degF

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GasTankParameters {
    pub recovery_efficiency: f64,
    /// in m
    pub insulation_thickness: f64,
    /// in W/(m.K)
    pub insulation_conductivity: f64,
    /// in K
    pub draw_set_temp: f64,
}

// insulation is about R2.1, in line with the EL1 efficiency level of the 2010 rule
impl Default for GasTankParameters {
    fn default() -> Self {
        Self {
            recovery_efficiency: 0.76,
            insulation_thickness: 0.03,
            insulation_conductivity: 0.081,
            draw_set_temp: 322.04,
        }
    }
}

impl FromCatalog for GasTankParameters {
    const COMPONENT: ComponentKind = ComponentKind::GasTankWaterHeater;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        let component = Self::COMPONENT;
        Ok(Self {
            recovery_efficiency: catalog.number(component, "tank recovery efficiency")?,
            insulation_thickness: catalog.number(component, "insulation thickness")?,
            insulation_conductivity: catalog.number(component, "specific heat conductivity")?,
            draw_set_temp: catalog.number(component, "tap temperature setpoint")?,
        })
    }
}

/// Heat rates in W
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GasTankOutput {
    pub delivered: f64,
    pub gas_use: f64,
    pub demand: f64,
}

/// Conventional gas storage water heater following the WHAM energy consumption equation
/// (Lutz et al., 1998, WHAM: A Simplified Energy Consumption Equation for Water Heaters),
/// expressed as a consumption rate rather than daily energy use. The model only holds for
/// tanks sized with realistic volume to input power ratios.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GasTank {
    params: GasTankParameters,
    volume: f64,
    area: f64,
    u_value: f64,
    nominal_power: f64,
    medium: MaterialProperties,
}

impl GasTank {
    /// Arguments:
    /// * `params` - tank parameters
    /// * `volume` - in m3; the burner input power is autosized from it
    pub fn new(params: GasTankParameters, volume: f64) -> anyhow::Result<Self> {
        if volume <= 0. {
            anyhow::bail!("Gas tank volume must be positive, got {volume} m3");
        }
        if params.recovery_efficiency <= 0. || params.recovery_efficiency > 1. {
            anyhow::bail!(
                "Tank recovery efficiency must be within (0, 1], got {}",
                params.recovery_efficiency
            );
        }
        if params.insulation_thickness <= 0. {
            anyhow::bail!(
                "Tank insulation thickness must be positive, got {} m",
                params.insulation_thickness
            );
        }

        Ok(Self {
            params,
            volume,
            area: TankDimensions::from_volume(volume, HEIGHT_VS_RADIUS).area(),
            u_value: thermal_transmittance(
                params.insulation_thickness,
                params.insulation_conductivity,
            ),
            nominal_power: Self::volume_to_power(volume),
            medium: *WATER,
        })
    }

    pub fn from_catalog(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
    ) -> anyhow::Result<Self> {
        Self::new(
            GasTankParameters::resolve(catalog)?,
            sizes.get_or(ComponentKind::GasTankWaterHeater, DEFAULT_VOLUME),
        )
    }

    /// Rated input power of a gas water heater from its volume, by linear regression over
    /// listed products, in W
    pub fn volume_to_power(volume: f64) -> f64 {
        63560. * volume + 1777.9
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn nominal_power(&self) -> f64 {
        self.nominal_power
    }

    /// Delivered heat and gas use for a draw. No electricity use is modelled and all of the
    /// demand is met.
    ///
    /// Arguments:
    /// * `draw_volume` - in m3/h
    /// * `feed_temp` - temperature of the water entering the tank, in K
    /// * `surrounding_temp` - temperature of the space around the tank, in K
    pub fn gas_tank_wh(
        &self,
        draw_volume: f64,
        feed_temp: f64,
        surrounding_temp: f64,
    ) -> GasTankOutput {
        wham_gas_use(
            self.nominal_power,
            draw_volume,
            self.area,
            self.u_value,
            self.params.recovery_efficiency,
            self.params.draw_set_temp,
            feed_temp,
            surrounding_temp,
            &self.medium,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn wham_gas_use(
    nominal_power: f64,
    draw_volume: f64,
    area: f64,
    u_value: f64,
    recovery_efficiency: f64,
    set_temp: f64,
    feed_temp: f64,
    surrounding_temp: f64,
    medium: &MaterialProperties,
) -> GasTankOutput {
    let delivered = medium.heat_rate_of_flow(draw_volume, max_of_2(set_temp, feed_temp), feed_temp);

    let standing_loss = u_value * area * (set_temp - surrounding_temp);
    // standing losses are already part of the recovery efficiency while the burner fires
    let loss_adjustment = 1. - standing_loss / nominal_power;
    let gas_use = delivered / recovery_efficiency * loss_adjustment + standing_loss;

    GasTankOutput {
        delivered,
        gas_use,
        demand: delivered,
    }
}
