pub mod heat_pump;
pub mod heater;
pub mod photovoltaic;
pub mod solar_collector;

/// How a converter output came about for a timestep.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputStatus {
    #[default]
    Active,
    /// A legitimate zero output, e.g. no irradiance or a heat pump switched off by control.
    Idle,
    /// A computed negative output that was floored to zero.
    Clamped,
}

impl OutputStatus {
    pub fn is_clamped(&self) -> bool {
        matches!(self, Self::Clamped)
    }
}
