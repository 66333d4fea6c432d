use crate::compare_floats::floor_at_zero;
use crate::core::converters::OutputStatus;
use crate::core::parameters::{ComponentKind, ComponentSizes, FromCatalog, ParameterCatalog};
use tracing::debug;

const DEFAULT_GROSS_AREA: f64 = 1.; // m2

// Rating defaults for Heliodyne, Inc, GOBI 410 001 Plus, SRCC Standard 100-2006-09
const HWB_INTERCEPT: f64 = 0.753;
const HWB_SLOPE: f64 = -4.025;
const CD_INTERCEPT: f64 = 0.75;
const CD_A1: f64 = -3.688;
const CD_A2: f64 = -0.0055;

/// Empirical instantaneous collector efficiency curves (Duffie & Beckman, Solar engineering of
/// thermal processes, 3rd ed.)
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CollectorModel {
    /// Hottel-Whillier-Bliss, eq 6.16.1 and 6.7.6
    HottelWhillierBliss { intercept: f64, slope: f64 },
    /// Cooper and Dunkle, eq 6.17.7
    CooperDunkle { intercept: f64, a1: f64, a2: f64 },
}

impl Default for CollectorModel {
    fn default() -> Self {
        Self::HottelWhillierBliss {
            intercept: HWB_INTERCEPT,
            slope: HWB_SLOPE,
        }
    }
}

impl CollectorModel {
    pub fn default_cooper_dunkle() -> Self {
        Self::CooperDunkle {
            intercept: CD_INTERCEPT,
            a1: CD_A1,
            a2: CD_A2,
        }
    }

    /// Instantaneous conversion efficiency. Zero irradiance is treated as an infinite
    /// denominator so the temperature terms vanish.
    fn efficiency(&self, inlet_temp: f64, ambient_temp: f64, irradiance: f64) -> f64 {
        let irradiance_on = if irradiance != 0. { 1. } else { 0. };
        let delta_t = inlet_temp - ambient_temp;
        let over_irradiance = |power: i32| {
            if irradiance == 0. {
                0.
            } else {
                delta_t / irradiance.powi(power)
            }
        };

        match *self {
            Self::HottelWhillierBliss { intercept, slope } => {
                intercept * irradiance_on + slope * over_irradiance(1)
            }
            Self::CooperDunkle { intercept, a1, a2 } => {
                intercept * irradiance_on + a1 * over_irradiance(1) + a2 * over_irradiance(2)
            }
        }
    }
}

/// Collector parameters; the HWB curve is used where its parameters are available, otherwise
/// the CD curve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolarCollectorParameters {
    pub model: CollectorModel,
}

impl FromCatalog for SolarCollectorParameters {
    const COMPONENT: ComponentKind = ComponentKind::SolarCollector;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        let component = Self::COMPONENT;
        let hwb = (
            catalog.optional_number(component, "interc hwb")?,
            catalog.optional_number(component, "slope hwb")?,
        );
        let model = match hwb {
            (Some(intercept), Some(slope)) => CollectorModel::HottelWhillierBliss { intercept, slope },
            _ => CollectorModel::CooperDunkle {
                intercept: catalog.number(component, "interc cd")?,
                a1: catalog.number(component, "a1 cd")?,
                a2: catalog.number(component, "a2 cd")?,
            },
        };
        Ok(Self { model })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollectorOutput {
    /// Solar gain from the gross collector area, in W
    pub gain: f64,
    pub efficiency: f64,
    pub status: OutputStatus,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolarCollector {
    model: CollectorModel,
    gross_area: f64,
}

impl SolarCollector {
    /// Arguments:
    /// * `model` - efficiency curve with its rating parameters
    /// * `gross_area` - gross collector area, in m2
    pub fn new(model: CollectorModel, gross_area: f64) -> anyhow::Result<Self> {
        if gross_area < 0. {
            anyhow::bail!("Solar collector area must not be negative, got {gross_area} m2");
        }
        Ok(Self { model, gross_area })
    }

    pub fn from_catalog(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
    ) -> anyhow::Result<Self> {
        let params = SolarCollectorParameters::resolve(catalog)?;
        Self::new(
            params.model,
            sizes.get_or(ComponentKind::SolarCollector, DEFAULT_GROSS_AREA),
        )
    }

    pub fn gross_area(&self) -> f64 {
        self.gross_area
    }

    /// Arguments:
    /// * `inlet_temp` - collector inlet temperature, in K
    /// * `ambient_temp` - in K
    /// * `irradiance` - global irradiance on the tilted collector surface, in W/m2
    pub fn gain(&self, inlet_temp: f64, ambient_temp: f64, irradiance: f64) -> CollectorOutput {
        let efficiency = self.model.efficiency(inlet_temp, ambient_temp, irradiance);
        let (gain, clamped) = floor_at_zero(irradiance * self.gross_area * efficiency);

        let status = if clamped {
            debug!(
                "Negative collector gain at inlet {inlet_temp} K, ambient {ambient_temp} K set to zero"
            );
            OutputStatus::Clamped
        } else if gain == 0. {
            OutputStatus::Idle
        } else {
            OutputStatus::Active
        };

        CollectorOutput {
            gain,
            efficiency,
            status,
        }
    }
}
