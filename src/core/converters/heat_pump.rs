use crate::core::converters::OutputStatus;
use crate::core::parameters::{ComponentKind, FromCatalog, ParameterCatalog};
use crate::core::units::kelvin_to_celsius;
use tracing::debug;

/// Coefficients of a biquadratic performance curve in wet bulb and tank temperature (both in
/// deg C), normalised to rated conditions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceCurve([f64; 6]);

impl PerformanceCurve {
    pub fn new(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    fn from_catalog(catalog: &ParameterCatalog, suffix: &str) -> anyhow::Result<Self> {
        let mut coefficients = [0.; 6];
        for (i, coefficient) in coefficients.iter_mut().enumerate() {
            *coefficient =
                catalog.number(ComponentKind::HeatPump, &format!("c{}_{suffix}", i + 1))?;
        }
        Ok(Self(coefficients))
    }

    /// Performance factor
    ///
    /// Arguments:
    /// * `wet_bulb_temp` - in deg C
    /// * `tank_temp` - in deg C
    pub fn performance_factor(&self, wet_bulb_temp: f64, tank_temp: f64) -> f64 {
        let [c1, c2, c3, c4, c5, c6] = self.0;
        c1 + c2 * wet_bulb_temp
            + c3 * wet_bulb_temp * wet_bulb_temp
            + c4 * tank_temp
            + c5 * tank_temp * tank_temp
            + c6 * wet_bulb_temp * tank_temp
    }
}

// Coefficients of Unit A, NREL/TP-5500-52635 (Sparn et al., 2011)
const COP_COEFFICIENTS: [f64; 6] = [1.229e+00, 5.549e-02, 1.139e-04, -1.128e-02, -3.570e-06, -7.234e-04];
const HEATING_CAPACITY_COEFFICIENTS: [f64; 6] =
    [7.055e-01, 3.945e-02, 1.433e-04, 2.768e-03, -1.069e-04, -2.494e-04];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatPumpParameters {
    pub rated_cop: f64,
    /// in W
    pub rated_heating_capacity: f64,
    pub cop_curve: PerformanceCurve,
    pub heating_capacity_curve: PerformanceCurve,
}

impl Default for HeatPumpParameters {
    fn default() -> Self {
        Self {
            rated_cop: 2.43,
            rated_heating_capacity: 2350.,
            cop_curve: PerformanceCurve(COP_COEFFICIENTS),
            heating_capacity_curve: PerformanceCurve(HEATING_CAPACITY_COEFFICIENTS),
        }
    }
}

impl FromCatalog for HeatPumpParameters {
    const COMPONENT: ComponentKind = ComponentKind::HeatPump;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        Ok(Self {
            rated_cop: catalog.number(Self::COMPONENT, "rated COP")?,
            rated_heating_capacity: catalog.number(Self::COMPONENT, "rated heating capacity")?,
            cop_curve: PerformanceCurve::from_catalog(catalog, "cop")?,
            heating_capacity_curve: PerformanceCurve::from_catalog(catalog, "heat_cap")?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeatPumpOutput {
    pub cop: f64,
    /// Heating capacity under current conditions, in W
    pub heat_cap: f64,
    /// Electricity use, in W
    pub el_use: f64,
    pub status: OutputStatus,
}

impl HeatPumpOutput {
    /// Output of a heat pump switched off by its control
    pub fn off() -> Self {
        Self {
            status: OutputStatus::Idle,
            ..Default::default()
        }
    }
}

/// Heat pump water heater with performance curves from Sparn et al. (2011), Laboratory
/// Performance Evaluation of Residential Integrated Heat Pump Water Heaters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatPump {
    params: HeatPumpParameters,
}

impl HeatPump {
    pub fn new(params: HeatPumpParameters) -> anyhow::Result<Self> {
        if params.rated_cop <= 0. {
            anyhow::bail!("Rated COP must be positive, got {}", params.rated_cop);
        }
        Ok(Self { params })
    }

    pub fn from_catalog(catalog: Option<&ParameterCatalog>) -> anyhow::Result<Self> {
        Self::new(HeatPumpParameters::resolve(catalog)?)
    }

    /// Arguments:
    /// * `wet_bulb_temp` - wet bulb temperature of the air around the heat pump, in K
    /// * `tank_temp` - tank water temperature, in K
    pub fn performance(&self, wet_bulb_temp: f64, tank_temp: f64) -> anyhow::Result<HeatPumpOutput> {
        let wet_bulb_c = kelvin_to_celsius(wet_bulb_temp)?;
        let tank_c = kelvin_to_celsius(tank_temp)?;

        let heat_cap = self.params.rated_heating_capacity
            * self
                .params
                .heating_capacity_curve
                .performance_factor(wet_bulb_c, tank_c);
        let cop =
            self.params.rated_cop * self.params.cop_curve.performance_factor(wet_bulb_c, tank_c);

        // large tank to air temperature differences can give a negative capacity or COP, in
        // which case the device is taken to be disabled
        if heat_cap < 0. || cop <= 0. {
            debug!(
                "Heat pump capacity {heat_cap} W at COP {cop} (wet bulb {wet_bulb_temp} K, tank {tank_temp} K) set to zero"
            );
            return Ok(HeatPumpOutput {
                cop,
                heat_cap: 0.,
                el_use: 0.,
                status: OutputStatus::Clamped,
            });
        }

        Ok(HeatPumpOutput {
            cop,
            heat_cap,
            el_use: heat_cap / cop,
            status: OutputStatus::Active,
        })
    }
}
