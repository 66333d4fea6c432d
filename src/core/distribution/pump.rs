use crate::core::parameters::{ComponentKind, ComponentSizes, FromCatalog, ParameterCatalog};
use strum_macros::Display;

// Size substituted when the pump size is absent, as a unit pump
const UNIT_PUMP_POWER: f64 = 1.; // W

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PumpRole {
    /// Primary (solar collector) loop
    #[strum(serialize = "solar")]
    Solar,
    /// Secondary (distribution) loop
    #[strum(serialize = "distribution")]
    Distribution,
}

impl PumpRole {
    fn component(&self) -> ComponentKind {
        match self {
            Self::Solar => ComponentKind::SolarPump,
            Self::Distribution => ComponentKind::DistributionPump,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolarPumpParameters {
    pub efficiency: f64,
}

impl Default for SolarPumpParameters {
    fn default() -> Self {
        Self { efficiency: 0.7 }
    }
}

impl FromCatalog for SolarPumpParameters {
    const COMPONENT: ComponentKind = ComponentKind::SolarPump;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        Ok(Self {
            efficiency: catalog.number(Self::COMPONENT, "nominal solar pump efficiency")?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistributionPumpParameters {
    pub efficiency: f64,
}

impl Default for DistributionPumpParameters {
    fn default() -> Self {
        Self { efficiency: 0.7 }
    }
}

impl FromCatalog for DistributionPumpParameters {
    const COMPONENT: ComponentKind = ComponentKind::DistributionPump;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        Ok(Self {
            efficiency: catalog.number(Self::COMPONENT, "nominal distribution pump efficiency")?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PumpEnergyUse {
    /// Electricity use per timestep, in W
    pub el_use: Vec<f64>,
    /// Electricity use over the operating time, in Wh
    pub total: f64,
    /// in hours
    pub operating_hours: f64,
}

/// A fixed speed pump, so the part load ratio is 1 whenever it is on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pump {
    role: PumpRole,
    nominal_power: f64,
    efficiency: f64,
    timestep: f64,
}

impl Pump {
    /// Arguments:
    /// * `role` - which loop the pump serves
    /// * `nominal_power` - in W
    /// * `efficiency` - nominal pump efficiency
    /// * `timestep` - in hours
    pub fn new(
        role: PumpRole,
        nominal_power: f64,
        efficiency: f64,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        if efficiency <= 0. {
            anyhow::bail!("Efficiency of the {role} pump must be positive, got {efficiency}");
        }
        Ok(Self {
            role,
            nominal_power,
            efficiency,
            timestep,
        })
    }

    pub fn from_catalog(
        role: PumpRole,
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        let efficiency = match role {
            PumpRole::Solar => SolarPumpParameters::resolve(catalog)?.efficiency,
            PumpRole::Distribution => DistributionPumpParameters::resolve(catalog)?.efficiency,
        };
        Self::new(
            role,
            sizes.get_or(role.component(), UNIT_PUMP_POWER),
            efficiency,
            timestep,
        )
    }

    pub fn role(&self) -> PumpRole {
        self.role
    }

    /// Arguments:
    /// * `on_fractions` - fraction of each timestep the pump was on, each within [0, 1]
    pub fn energy_use(&self, on_fractions: &[f64]) -> PumpEnergyUse {
        let el_use = on_fractions
            .iter()
            .map(|on| self.nominal_power * on / self.efficiency)
            .collect::<Vec<_>>();

        PumpEnergyUse {
            total: el_use.iter().sum::<f64>() * self.timestep,
            operating_hours: on_fractions.iter().sum::<f64>() * self.timestep,
            el_use,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_calc_pump_energy_use_for_year() {
        let pump = Pump::new(PumpRole::Solar, 45., 0.7, 1.).unwrap();
        let use_ = pump.energy_use(&vec![1.; 8760]);
        assert_relative_eq!(use_.total, 45. / 0.7 * 8760.);
        assert_eq!(use_.operating_hours, 8760.);
        assert_relative_eq!(use_.el_use[0], 45. / 0.7);
    }

    #[rstest]
    fn should_scale_with_part_timestep_operation() {
        let pump = Pump::new(PumpRole::Distribution, 70., 0.7, 0.5).unwrap();
        let use_ = pump.energy_use(&[0., 0.5, 1.]);
        assert_eq!(use_.el_use, vec![0., 50., 100.]);
        assert_eq!(use_.total, 75.);
        assert_eq!(use_.operating_hours, 0.75);
    }

    #[rstest]
    fn should_use_unit_pump_when_size_absent() {
        let pump =
            Pump::from_catalog(PumpRole::Solar, None, &ComponentSizes::default(), 1.).unwrap();
        assert_relative_eq!(pump.energy_use(&[1.]).total, 1. / 0.7);
        assert_eq!(pump.role().to_string(), "solar");
    }
}
