use crate::core::parameters::{ComponentKind, ComponentSizes, FromCatalog, ParameterCatalog};

// 1000 Wdc peak corresponds to 6.25 m2 of active cells at 16% efficiency
const DEFAULT_PEAK_POWER: f64 = 1000.; // W
const DEFAULT_PANEL_AREA: f64 = 6.25; // m2

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhotovoltaicParameters {
    /// Fraction of the aperture area with active cells
    pub active_fraction: f64,
    pub efficiency: f64,
    /// Reference irradiance for the peak power rating, in W/m2
    pub reference_irradiance: f64,
}

impl Default for PhotovoltaicParameters {
    fn default() -> Self {
        Self {
            active_fraction: 1.,
            efficiency: 0.16,
            reference_irradiance: 1000.,
        }
    }
}

impl FromCatalog for PhotovoltaicParameters {
    const COMPONENT: ComponentKind = ComponentKind::Photovoltaic;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        Ok(Self {
            active_fraction: catalog.number(Self::COMPONENT, "fraction of active PV area")?,
            efficiency: catalog.number(Self::COMPONENT, "PV efficiency")?,
            reference_irradiance: catalog.number(Self::COMPONENT, "reference irradiation")?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InverterParameters {
    pub dc_to_ac_efficiency: f64,
}

impl Default for InverterParameters {
    fn default() -> Self {
        Self {
            dc_to_ac_efficiency: 0.85,
        }
    }
}

impl FromCatalog for InverterParameters {
    const COMPONENT: ComponentKind = ComponentKind::Inverter;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        Ok(Self {
            dc_to_ac_efficiency: catalog.number(Self::COMPONENT, "DC to AC efficiency")?,
        })
    }
}

/// How the array is sized
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PanelSize {
    /// Peak (nameplate) power, in W
    PeakPower(f64),
    /// Area of the panel, in m2
    Area(f64),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhotovoltaicOutput {
    pub ac: f64,
    pub dc: f64,
}

/// Simple photovoltaic model where yield scales linearly with irradiance, followed by a
/// fixed-efficiency inverter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Photovoltaic {
    size: PanelSize,
    params: PhotovoltaicParameters,
    inverter: InverterParameters,
}

impl Photovoltaic {
    pub fn new(
        size: PanelSize,
        params: PhotovoltaicParameters,
        inverter: InverterParameters,
    ) -> anyhow::Result<Self> {
        if params.reference_irradiance <= 0. {
            anyhow::bail!(
                "PV reference irradiation must be positive, got {} W/m2",
                params.reference_irradiance
            );
        }
        Ok(Self {
            size,
            params,
            inverter,
        })
    }

    /// Arguments:
    /// * `catalog` - parameters of the photovoltaic and inverter components
    /// * `sizes` - the photovoltaic size is read as peak power or area depending on `use_peak_power`
    /// * `use_peak_power` - whether the array is sized by peak power rather than area
    pub fn from_catalog(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
        use_peak_power: bool,
    ) -> anyhow::Result<Self> {
        let size = if use_peak_power {
            PanelSize::PeakPower(sizes.get_or(ComponentKind::Photovoltaic, DEFAULT_PEAK_POWER))
        } else {
            PanelSize::Area(sizes.get_or(ComponentKind::Photovoltaic, DEFAULT_PANEL_AREA))
        };
        Self::new(
            size,
            PhotovoltaicParameters::resolve(catalog)?,
            InverterParameters::resolve(catalog)?,
        )
    }

    /// Arguments:
    /// * `irradiance` - total (direct and diffuse) irradiance on the panel, in W/m2
    pub fn power(&self, irradiance: f64) -> PhotovoltaicOutput {
        let dc = match self.size {
            PanelSize::PeakPower(peak_power) => {
                peak_power / self.params.reference_irradiance * irradiance
            }
            PanelSize::Area(area) => {
                area * self.params.active_fraction * self.params.efficiency * irradiance
            }
        };

        PhotovoltaicOutput {
            ac: self.dc_to_ac(dc),
            dc,
        }
    }

    fn dc_to_ac(&self, dc: f64) -> f64 {
        self.inverter.dc_to_ac_efficiency * dc
    }
}
