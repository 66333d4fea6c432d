use crate::compare_floats::min_of_2;
use crate::core::parameters::{ComponentKind, ComponentSizes, FromCatalog, ParameterCatalog};
use tracing::info;

const DEFAULT_EFFICIENCY: f64 = 0.85;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElectricResistanceParameters {
    pub efficiency: f64,
}

impl Default for ElectricResistanceParameters {
    fn default() -> Self {
        Self {
            efficiency: DEFAULT_EFFICIENCY,
        }
    }
}

impl FromCatalog for ElectricResistanceParameters {
    const COMPONENT: ComponentKind = ComponentKind::ElectricResistance;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        Ok(Self {
            efficiency: catalog.number(Self::COMPONENT, "electric resistance efficiency")?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GasBurnerParameters {
    pub efficiency: f64,
}

impl Default for GasBurnerParameters {
    fn default() -> Self {
        Self {
            efficiency: DEFAULT_EFFICIENCY,
        }
    }
}

impl FromCatalog for GasBurnerParameters {
    const COMPONENT: ComponentKind = ComponentKind::GasBurner;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        Ok(Self {
            efficiency: catalog.number(Self::COMPONENT, "combustion efficiency")?,
        })
    }
}

/// Result of covering a heat demand with a heater, all as average heat rates in W
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeaterOutput {
    pub delivered: f64,
    /// Fuel or electricity use, depending on the heater
    pub energy_use: f64,
    pub unmet: f64,
}

/// A capacity-limited heater with a fixed conversion efficiency. Used both as an instantaneous
/// water heater and as a backup behind a solar or heat pump tank.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Heater {
    kind: ComponentKind,
    efficiency: f64,
    capacity: Option<f64>,
}

impl Heater {
    /// Arguments:
    /// * `kind` - electric resistance or gas burner
    /// * `efficiency` - combustion or electric resistance conversion efficiency
    /// * `capacity` - nominal capacity, in W; None means the heater can cover any load
    pub fn new(kind: ComponentKind, efficiency: f64, capacity: Option<f64>) -> anyhow::Result<Self> {
        if !matches!(
            kind,
            ComponentKind::ElectricResistance | ComponentKind::GasBurner
        ) {
            anyhow::bail!("Component '{kind}' is not a heater");
        }
        if efficiency <= 0. {
            anyhow::bail!("Efficiency of the {kind} must be positive, got {efficiency}");
        }
        Ok(Self {
            kind,
            efficiency,
            capacity,
        })
    }

    pub fn electric_resistance(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
    ) -> anyhow::Result<Self> {
        let params = ElectricResistanceParameters::resolve(catalog)?;
        Self::new(
            ComponentKind::ElectricResistance,
            params.efficiency,
            capacity_from_sizes(ComponentKind::ElectricResistance, sizes),
        )
    }

    pub fn gas_burner(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
    ) -> anyhow::Result<Self> {
        let params = GasBurnerParameters::resolve(catalog)?;
        Self::new(
            ComponentKind::GasBurner,
            params.efficiency,
            capacity_from_sizes(ComponentKind::GasBurner, sizes),
        )
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Arguments:
    /// * `demand` - heat demand, in W
    pub fn demand_heat(&self, demand: f64) -> HeaterOutput {
        let delivered = match self.capacity {
            Some(capacity) => min_of_2(demand, capacity),
            None => demand,
        };

        HeaterOutput {
            delivered,
            energy_use: delivered / self.efficiency,
            unmet: demand - delivered,
        }
    }
}

fn capacity_from_sizes(kind: ComponentKind, sizes: &ComponentSizes) -> Option<f64> {
    let capacity = sizes.get(kind);
    if capacity.is_none() {
        info!("Could not find the size of the {kind}. Setting it to infinite.");
    }
    capacity
}
