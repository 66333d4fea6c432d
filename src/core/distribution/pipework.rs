use crate::core::material_properties::{MaterialProperties, WATER};
use crate::core::parameters::{ComponentKind, ComponentSizes, FromCatalog, ParameterCatalog};
use crate::core::units::SECONDS_PER_HOUR;
use std::f64::consts::PI;
use tracing::info;

const DEFAULT_LENGTH: f64 = 20.; // m
const DEFAULT_DIAMETER: f64 = 0.0381; // m, 1.5 in

/// How the pipe diameter is found
#[derive(Clone, Debug, PartialEq)]
pub enum DiameterSelection {
    /// A known diameter, in m
    Fixed(f64),
    /// The smallest market size at least as large as `scaler * length ^ exponent`
    Discrete {
        scaler: f64,
        exponent: f64,
        sizes: Vec<f64>,
    },
}

impl DiameterSelection {
    fn diameter_for_length(&self, length: f64) -> anyhow::Result<f64> {
        match self {
            Self::Fixed(diameter) => Ok(*diameter),
            Self::Discrete {
                scaler,
                exponent,
                sizes,
            } => pick_first_larger_size(scaler * length.powf(*exponent), sizes),
        }
    }
}

/// The smallest discrete size not below the theoretical size, or the largest discrete size if
/// none is large enough.
pub(crate) fn pick_first_larger_size(theoretical_size: f64, discrete_sizes: &[f64]) -> anyhow::Result<f64> {
    let largest = discrete_sizes.iter().copied().reduce(f64::max);
    let Some(largest) = largest else {
        anyhow::bail!("No discrete sizes were given to pick from");
    };
    Ok(discrete_sizes
        .iter()
        .copied()
        .filter(|size| *size >= theoretical_size)
        .reduce(f64::min)
        .unwrap_or(largest))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipingParameters {
    /// in W/(m.K)
    pub insulation_conductivity: f64,
    /// in m
    pub insulation_thickness: f64,
    pub diameter: DiameterSelection,
    /// Ratio of the pipe design flow to the maximum draw. Values below 1 represent oversizing,
    /// higher values account for heated water left stagnant in large networks after a draw.
    pub flow_factor: f64,
    pub circulation: bool,
    /// Ratio between the longest branch and the total pipe length, for networks of parallel
    /// branches
    pub longest_branch_length_ratio: Option<f64>,
}

impl Default for PipingParameters {
    fn default() -> Self {
        Self {
            insulation_conductivity: 0.0175,
            insulation_thickness: 0.008,
            diameter: DiameterSelection::Fixed(DEFAULT_DIAMETER),
            flow_factor: 0.5,
            circulation: false,
            longest_branch_length_ratio: None,
        }
    }
}

impl FromCatalog for PipingParameters {
    const COMPONENT: ComponentKind = ComponentKind::Piping;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        let component = Self::COMPONENT;
        Ok(Self {
            insulation_conductivity: catalog
                .number(component, "piping insulation specific heat conductivity")?,
            insulation_thickness: catalog.number(component, "piping insulation thickness")?,
            diameter: DiameterSelection::Discrete {
                scaler: catalog.number(component, "diameter vs. length scaler")?,
                exponent: catalog.number(component, "diameter vs. length exponent")?,
                sizes: catalog.list(component, "discrete diameters")?,
            },
            flow_factor: catalog.number(component, "flow factor")?,
            circulation: catalog.flag(component, "circulation")?,
            longest_branch_length_ratio: catalog
                .optional_number(component, "longest branch length fraction")?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipeLossOutput {
    /// Loss heat rate while the flow is on, in W
    pub heat_rate: f64,
    /// Temperature drop along the pipe, in K
    pub dt_drop: f64,
    /// Heat lost during the timestep, in Wh
    pub heat_loss: f64,
    /// Fraction of the timestep during which water flows through the pipe
    pub flow_on_fraction: f64,
}

/// Distribution piping between a tank and the taps
#[derive(Clone, Debug)]
pub struct Pipework {
    length: f64,
    diameter: f64,
    params: PipingParameters,
    contents_properties: MaterialProperties,
    timestep: f64,
}

impl Pipework {
    /// Arguments:
    /// * `params` - insulation, diameter and flow parameters
    /// * `length` - total pipe length, in m
    /// * `timestep` - in hours
    pub fn new(params: PipingParameters, length: f64, timestep: f64) -> anyhow::Result<Self> {
        if length < 0. {
            anyhow::bail!("Pipe length must not be negative, got {length} m");
        }
        if params.insulation_thickness <= 0. {
            anyhow::bail!(
                "Pipe insulation thickness must be positive, got {} m",
                params.insulation_thickness
            );
        }
        if params.flow_factor <= 0. {
            anyhow::bail!("Flow factor must be positive, got {}", params.flow_factor);
        }
        let diameter = params.diameter.diameter_for_length(length)?;

        Ok(Self {
            length,
            diameter,
            params,
            contents_properties: *WATER,
            timestep,
        })
    }

    /// Without parameters, a default 20 m network is assumed. With parameters but no piping
    /// size, there is no distribution network.
    pub fn from_catalog(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        let length = match (sizes.get(ComponentKind::Piping), catalog) {
            (Some(length), _) => length,
            (None, None) => {
                info!("Could not find the piping length. Setting it to {DEFAULT_LENGTH} m.");
                DEFAULT_LENGTH
            }
            (None, Some(_)) => {
                info!("No piping size was given. Distribution losses are not modelled.");
                0.
            }
        };
        Self::new(PipingParameters::resolve(catalog)?, length, timestep)
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    fn u_value(&self) -> f64 {
        self.params.insulation_conductivity / self.params.insulation_thickness
    }

    /// Outer surface area of an insulated pipe of the given length, in m2
    fn surface_area(&self, length: f64) -> f64 {
        (self.diameter + 2. * self.params.insulation_thickness) * PI * length
    }

    /// Heat loss rate from pipes of the given length, in W
    fn loss_rate(&self, avg_temp: f64, ambient_temp: f64, length: f64) -> f64 {
        self.surface_area(length) * self.u_value() * (avg_temp - ambient_temp)
    }

    /// Thermal losses from the distribution pipes for a timestep
    ///
    /// Arguments:
    /// * `inlet_temp` - hot water temperature at the pipe inlet, in K
    /// * `ambient_temp` - in K
    /// * `draw_volume` - timestep draw, in m3/h
    /// * `max_draw_volume` - design (peak) draw, in m3/h
    pub fn pipe_losses(
        &self,
        inlet_temp: f64,
        ambient_temp: f64,
        draw_volume: f64,
        max_draw_volume: f64,
    ) -> PipeLossOutput {
        if self.length <= 0. || max_draw_volume <= 0. {
            return PipeLossOutput::default();
        }

        // with circulation, constant nominal flow; otherwise only the drawn volume flows through
        // the pipe at nominal speed, for a fraction of the timestep
        let (flow, flow_on_fraction) = if self.params.circulation {
            (max_draw_volume / self.params.flow_factor, 1.)
        } else {
            (
                draw_volume,
                draw_volume * self.params.flow_factor / max_draw_volume,
            )
        };

        if flow <= 0. {
            return PipeLossOutput::default();
        }

        // effective flow rate, in m3/s
        let flow_eff = flow / flow_on_fraction / SECONDS_PER_HOUR as f64;
        let length_eff = self.params.longest_branch_length_ratio.unwrap_or(1.) * self.length;
        let capacity_rate = self.contents_properties.volumetric_heat_capacity() * flow_eff;

        // Incropera, DeWitt, Bergman, Lavine: Fundamentals of Heat and Mass Transfer
        let k = self.u_value() * self.surface_area(length_eff) / capacity_rate;
        let avg_temp = (inlet_temp - ambient_temp) * ((1. - (-k).exp()) / k) + ambient_temp;

        let heat_rate = self.loss_rate(avg_temp, ambient_temp, self.length);

        PipeLossOutput {
            heat_rate,
            dt_drop: heat_rate * (length_eff / self.length) / capacity_rate,
            heat_loss: heat_rate * self.timestep * flow_on_fraction,
            flow_on_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const DISCRETE_DIAMETERS: [f64; 9] = [
        0.0127, 0.01905, 0.0254, 0.03175, 0.0381, 0.0508, 0.0635, 0.0762, 0.1016,
    ];

    #[fixture]
    fn params() -> PipingParameters {
        PipingParameters {
            diameter: DiameterSelection::Discrete {
                scaler: 0.007332348418708248,
                exponent: 0.5,
                sizes: DISCRETE_DIAMETERS.to_vec(),
            },
            longest_branch_length_ratio: Some(1.),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(0.0327, 0.0381)]
    #[case(0.0381, 0.0381)]
    #[case(0.001, 0.0127)]
    #[case(0.5, 0.1016)]
    fn should_pick_first_larger_diameter(#[case] theoretical: f64, #[case] expected: f64) {
        assert_eq!(
            pick_first_larger_size(theoretical, &DISCRETE_DIAMETERS).unwrap(),
            expected
        );
    }

    #[rstest]
    fn should_fail_to_pick_from_no_sizes() {
        assert!(pick_first_larger_size(0.1, &[]).is_err());
    }

    #[rstest]
    fn should_calc_pipe_losses(params: PipingParameters) {
        let pipework = Pipework::new(params, 20., 1.).unwrap();
        assert_eq!(pipework.diameter(), 0.0381);

        let losses = pipework.pipe_losses(333.15, 293.15, 0.05, 0.1514);
        assert_relative_eq!(losses.heat_rate, 294.3, max_relative = 1e-3);
        assert_relative_eq!(losses.heat_loss, 48.6, max_relative = 1e-3);
        assert_relative_eq!(losses.dt_drop, 0.8386, max_relative = 1e-3);
        assert_relative_eq!(losses.flow_on_fraction, 0.05 * 0.5 / 0.1514);
    }

    #[rstest]
    fn should_circulate_for_whole_timestep(params: PipingParameters) {
        let pipework = Pipework::new(
            PipingParameters {
                circulation: true,
                ..params
            },
            20.,
            1.,
        )
        .unwrap();

        // circulation losses do not depend on the draw
        let losses = pipework.pipe_losses(333.15, 293.15, 0., 0.1514);
        assert_eq!(losses.flow_on_fraction, 1.);
        assert_relative_eq!(losses.heat_rate, 294.3, max_relative = 1e-3);
        assert_relative_eq!(losses.heat_loss, losses.heat_rate);
    }

    #[rstest]
    fn should_have_no_losses_without_draw_or_pipe(params: PipingParameters) {
        let pipework = Pipework::new(params.clone(), 20., 1.).unwrap();
        assert_eq!(
            pipework.pipe_losses(333.15, 293.15, 0., 0.1514),
            PipeLossOutput::default()
        );

        let no_pipe = Pipework::new(params, 0., 1.).unwrap();
        assert_eq!(
            no_pipe.pipe_losses(333.15, 293.15, 0.05, 0.1514),
            PipeLossOutput::default()
        );
    }

    #[rstest]
    fn should_default_to_twenty_metre_network() {
        let pipework = Pipework::from_catalog(None, &ComponentSizes::default(), 1.).unwrap();
        assert_eq!(pipework.diameter(), DEFAULT_DIAMETER);
        let losses = pipework.pipe_losses(333.15, 293.15, 0.05, 0.1514);
        assert_relative_eq!(losses.heat_rate, 294.3, max_relative = 1e-3);
    }
}
