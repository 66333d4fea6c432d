use crate::compare_floats::{max_of_2, min_of_2};
use crate::core::distribution::pipework::Pipework;
use crate::core::material_properties::{MaterialProperties, WATER};
use crate::core::parameters::{
    ComponentKind, ComponentSizes, FromCatalog, MissingParameterError, ParameterCatalog,
};
use crate::core::storage::{thermal_transmittance, wall_heat_loss, TankDimensions};
use crate::core::units::{
    average_watts_to_joules, joules_to_average_watts, JOULES_PER_WATT_HOUR,
};
use thiserror::Error;
use tracing::warn;

const DEFAULT_VOLUME: f64 = 1.; // m3

// Relative tolerance for delivered and unmet heat to add up to the requested draw heat
const TAP_BALANCE_TOLERANCE: f64 = 0.01;
// in K, absorbs rounding when both volumes are reset to the same temperature
const STRATIFICATION_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThermalStorageParameters {
    pub upper_volume_fraction: f64,
    /// Ratio of tank height to radius (web scraped data)
    pub height_vs_radius: f64,
    /// Largest temperature difference between the upper and lower volume while charging, in K
    pub approach_dt: f64,
    /// in K
    pub max_temp: f64,
    /// Nominal draw temperature, in K
    pub draw_set_temp: f64,
    /// in m
    pub insulation_thickness: f64,
    /// in W/(m.K)
    pub insulation_conductivity: f64,
    /// Efficiency of the in-tank coil heat exchanger; only solar tanks need it
    pub coil_efficiency: Option<f64>,
    /// Allowed temperature error below the minimum tank temperature, from finite timestep
    /// averaging, before a warning is logged, in K
    pub allowed_overcooling_dt: f64,
}

impl Default for ThermalStorageParameters {
    fn default() -> Self {
        Self {
            upper_volume_fraction: 0.5,
            height_vs_radius: 6.,
            approach_dt: 2.,
            max_temp: 344.15,
            draw_set_temp: 322.04,
            insulation_thickness: 0.085,
            insulation_conductivity: 0.04,
            coil_efficiency: Some(0.84),
            allowed_overcooling_dt: 2.,
        }
    }
}

impl FromCatalog for ThermalStorageParameters {
    const COMPONENT: ComponentKind = ComponentKind::ThermalStorageTank;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self> {
        let component = Self::COMPONENT;
        Ok(Self {
            upper_volume_fraction: catalog.number(component, "upper volume fraction")?,
            height_vs_radius: catalog.number(component, "height vs. radius")?,
            approach_dt: catalog.number(component, "temperature difference (approach)")?,
            max_temp: catalog.number(component, "maximum temperature")?,
            draw_set_temp: catalog.number(component, "tap temperature setpoint")?,
            insulation_thickness: catalog.number(component, "insulation thickness")?,
            insulation_conductivity: catalog.number(component, "specific heat conductivity")?,
            coil_efficiency: catalog.optional_number(component, "coil efficiency")?,
            ..Default::default()
        })
    }
}

/// What heats the tank
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TankKind {
    /// Heated fluid from a solar collector circulates through an in-tank coil
    Solar,
    /// An inbuilt heat pump is the main heat source, given as its net performance
    HeatPump,
}

/// Average temperatures of the two tank volumes, in K
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TankState {
    pub upper: f64,
    pub lower: f64,
}

impl TankState {
    pub fn uniform(temp: f64) -> Self {
        Self {
            upper: temp,
            lower: temp,
        }
    }
}

#[derive(Debug, Error)]
#[error("Tank delivered {delivered} W and unmet {unmet} W demand do not balance with the tank demand setpoint {requested} W")]
pub struct TankBalanceError {
    delivered: f64,
    unmet: f64,
    requested: f64,
}

#[derive(Debug, Error)]
#[error("Upper tank temperature {upper} K is below the lower tank temperature {lower} K")]
pub struct TankStratificationError {
    upper: f64,
    lower: f64,
}

/// Draw from the top of an idealised infinitely large adiabatic tank. Heat rates in W.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TapOutput {
    /// Volume drawn from the tank, in m3/h
    pub volume: f64,
    /// Demand heat rate including the distribution loss
    pub total_demand: f64,
    pub net_demand: f64,
    pub heat_rate: f64,
    pub unmet: f64,
}

/// Average heat rates over the timestep, in W, and the resulting tank state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TankDynamicsOutput {
    pub state: TankState,
    /// Expected net gain (or loss) based on the inputs
    pub net_heat_rate: f64,
    pub dumped: f64,
    /// Balancing error from holding the tank at its minimum temperature
    pub overcooled: f64,
    pub delivered: f64,
    /// Unmet draw due to the finite tank volume
    pub unmet: f64,
}

/// Single timestep results of a thermal tank with its distribution network. Temperatures in K,
/// heat rates in W.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThermalTankOutput {
    /// Gain to the tank net of the coil efficiency
    pub net_gain: f64,
    pub loss_lower: f64,
    pub loss_upper: f64,
    pub demand: f64,
    pub demand_total: f64,
    pub delivered: f64,
    /// Unmet heat from the tank and from a draw cooler than set point
    pub unmet: f64,
    pub dumped: f64,
    pub overcooled: f64,
    pub demand_balance: f64,
    pub state: TankState,
    pub dt_dist: f64,
    pub set_temp: f64,
    /// in Wh
    pub dist_heat_loss: f64,
    pub flow_on_fraction: f64,
    /// Temperature of the fluid returned to the collector, for solar tanks
    pub collector_return_temp: Option<f64>,
}

/// A stratified tank modelled as two lumped volumes, upper and lower, with a coil or heat pump
/// heat source, a tap at the top and the feed water entering at the bottom.
#[derive(Clone, Debug)]
pub struct ThermalTank {
    kind: TankKind,
    params: ThermalStorageParameters,
    volume: f64,
    volume_upper: f64,
    volume_lower: f64,
    input_efficiency: f64,
    u_value: f64,
    area_upper: f64,
    area_lower: f64,
    pipework: Pipework,
    medium: MaterialProperties,
    timestep: f64,
}

impl ThermalTank {
    /// Arguments:
    /// * `kind` - solar or heat pump tank
    /// * `params` - tank parameters
    /// * `volume` - tank volume, in m3
    /// * `pipework` - distribution network fed from the top of the tank
    /// * `timestep` - in hours
    pub fn new(
        kind: TankKind,
        params: ThermalStorageParameters,
        volume: f64,
        pipework: Pipework,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        if volume <= 0. {
            anyhow::bail!("Thermal tank volume must be positive, got {volume} m3");
        }
        if params.upper_volume_fraction <= 0. || params.upper_volume_fraction >= 1. {
            anyhow::bail!(
                "Upper volume fraction must be between 0 and 1, got {}",
                params.upper_volume_fraction
            );
        }
        if params.insulation_thickness <= 0. {
            anyhow::bail!(
                "Tank insulation thickness must be positive, got {} m",
                params.insulation_thickness
            );
        }
        let input_efficiency = match kind {
            TankKind::Solar => params.coil_efficiency.ok_or_else(|| {
                MissingParameterError::new(ComponentKind::ThermalStorageTank, "coil efficiency")
            })?,
            TankKind::HeatPump => 1.,
        };

        let (area_upper, area_lower) = TankDimensions::from_volume(volume, params.height_vs_radius)
            .split_areas(params.upper_volume_fraction);

        Ok(Self {
            kind,
            params,
            volume,
            volume_upper: volume * params.upper_volume_fraction,
            volume_lower: volume * (1. - params.upper_volume_fraction),
            input_efficiency,
            u_value: thermal_transmittance(
                params.insulation_thickness,
                params.insulation_conductivity,
            ),
            area_upper,
            area_lower,
            pipework,
            medium: *WATER,
            timestep,
        })
    }

    pub fn from_catalog(
        kind: TankKind,
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        Self::new(
            kind,
            ThermalStorageParameters::resolve(catalog)?,
            sizes.get_or(ComponentKind::ThermalStorageTank, DEFAULT_VOLUME),
            Pipework::from_catalog(catalog, sizes, timestep)?,
            timestep,
        )
    }

    pub fn kind(&self) -> TankKind {
        self.kind
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn max_temp(&self) -> f64 {
        self.params.max_temp
    }

    pub fn draw_set_temp(&self) -> f64 {
        self.params.draw_set_temp
    }

    pub fn approach_dt(&self) -> f64 {
        self.params.approach_dt
    }

    fn heat_capacity_upper(&self) -> f64 {
        self.medium.heat_capacity(self.volume_upper)
    }

    fn heat_capacity_lower(&self) -> f64 {
        self.medium.heat_capacity(self.volume_lower)
    }

    fn heat_capacity(&self) -> f64 {
        self.medium.heat_capacity(self.volume)
    }

    /// Heat taken up by the tank between two states, in Wh
    pub fn stored_heat_change(&self, from: TankState, to: TankState) -> f64 {
        (self.heat_capacity_upper() * (to.upper - from.upper)
            + self.heat_capacity_lower() * (to.lower - from.lower))
            / JOULES_PER_WATT_HOUR as f64
    }

    /// Wall losses (upper, lower) at the given tank state, in W
    pub fn wall_losses(&self, ambient_temp: f64, state: TankState) -> (f64, f64) {
        (
            wall_heat_loss(self.u_value, self.area_upper, ambient_temp, state.upper),
            wall_heat_loss(self.u_value, self.area_lower, ambient_temp, state.lower),
        )
    }

    /// Water draw volume and its heat content from the top of an infinitely large adiabatic
    /// tank. Acts somewhat like a thermostatic valve: the flow is limited when the tank is hotter
    /// than the nominal draw temperature, equals the demanded volume between `min_draw_temp`
    /// and the nominal draw temperature, and is zero at or below `min_draw_temp`.
    ///
    /// Arguments:
    /// * `draw_volume` - volume demanded at the nominal draw temperature, in m3/h
    /// * `tank_temp` - temperature of the volume tapped from, in K
    /// * `feed_temp` - temperature of the water replenishing the tank, in K
    /// * `dist_loss_dt` - distribution temperature drop, in K
    /// * `min_draw_temp` - tank temperature needed to allow tapping, in K; None to always allow
    pub fn tap(
        &self,
        draw_volume: f64,
        tank_temp: f64,
        feed_temp: f64,
        dist_loss_dt: f64,
        min_draw_temp: Option<f64>,
    ) -> TapOutput {
        let draw_temp = self.params.draw_set_temp + dist_loss_dt;

        let mut volume = if tank_temp > draw_temp {
            draw_volume * (draw_temp - feed_temp) / (tank_temp - feed_temp)
        } else {
            draw_volume
        };
        if min_draw_temp.is_some_and(|min_temp| tank_temp <= min_temp) {
            volume = 0.;
        }

        let round_2 = |heat_rate: f64| (heat_rate * 100.).round() / 100.;
        let net_demand = round_2(self.medium.heat_rate_of_flow(
            draw_volume,
            self.params.draw_set_temp,
            feed_temp,
        ));
        let total_demand = round_2(self.medium.heat_rate_of_flow(draw_volume, draw_temp, feed_temp));
        let heat_rate = round_2(self.medium.heat_rate_of_flow(volume, tank_temp, feed_temp));

        TapOutput {
            volume,
            total_demand,
            net_demand,
            heat_rate,
            unmet: total_demand - heat_rate,
        }
    }

    /// Update the tank state for a timestep with a first order forward Euler step on the
    /// enthalpy balance, under simplified assumptions about stratification. All inputs pertain
    /// to the previous timestep.
    ///
    /// Arguments:
    /// * `ambient_temp` - in K
    /// * `state` - tank state at the end of the previous timestep
    /// * `heat_in` - total heat gain, e.g. from a coil or heating element, in W
    /// * `loss_upper`, `loss_lower` - wall losses of the two volumes, in W
    /// * `feed_temp` - temperature of the water replenishing the tapped volume, in K
    /// * `tap_heat_rate` - heat an infinitely large tank at the upper temperature would deliver
    ///                     to the draw, in W
    #[allow(clippy::too_many_arguments)]
    pub fn thermal_tank_dynamics(
        &self,
        ambient_temp: f64,
        state: TankState,
        heat_in: f64,
        loss_upper: f64,
        loss_lower: f64,
        feed_temp: f64,
        tap_heat_rate: f64,
    ) -> anyhow::Result<TankDynamicsOutput> {
        let min_temp = min_of_2(ambient_temp, feed_temp);
        let net_heat_rate = heat_in - loss_lower - loss_upper - tap_heat_rate;
        let energy = average_watts_to_joules(net_heat_rate, self.timestep);

        let mut output = TankDynamicsOutput {
            state,
            net_heat_rate,
            dumped: 0.,
            overcooled: 0.,
            delivered: tap_heat_rate,
            unmet: 0.,
        };

        if net_heat_rate > 0. {
            self.charge(energy, min_temp, &mut output);
        } else if tap_heat_rate > 0. {
            self.discharge_with_draw(energy, min_temp, &mut output);
        } else {
            self.stagnate(energy, min_temp, &mut output);
        }

        if tap_heat_rate != 0. {
            let relative_error = ((output.unmet + output.delivered) - tap_heat_rate) / tap_heat_rate;
            if relative_error.abs() >= TAP_BALANCE_TOLERANCE {
                return Err(TankBalanceError {
                    delivered: output.delivered,
                    unmet: output.unmet,
                    requested: tap_heat_rate,
                }
                .into());
            }
        }
        if output.state.lower - output.state.upper > STRATIFICATION_TOLERANCE {
            return Err(TankStratificationError {
                upper: output.state.upper,
                lower: output.state.lower,
            }
            .into());
        }

        Ok(output)
    }

    /// Heat goes to the upper volume until it is `approach_dt` above the lower volume, after
    /// which both volumes are heated, as if the region above the limit were homogeneous.
    fn charge(&self, energy: f64, min_temp: f64, output: &mut TankDynamicsOutput) {
        let approach_dt = self.params.approach_dt;
        let TankState { upper, lower } = output.state;

        let (upper, lower) = if upper - lower < approach_dt {
            let dt_upper = energy / self.heat_capacity_upper();
            let dt_remaining = (dt_upper + upper) - (lower + approach_dt);
            if dt_remaining > 0. {
                let dt_both = dt_remaining * self.volume_upper / self.volume;
                (upper + dt_upper - dt_remaining + dt_both, lower + dt_both)
            } else {
                (upper + dt_upper, lower)
            }
        } else {
            let dt_lower_max = (upper - approach_dt) - lower;
            let dt_lower = energy / self.heat_capacity_lower();
            if dt_lower <= dt_lower_max {
                (upper, lower + dt_lower)
            } else {
                let dt_remaining = (dt_lower - dt_lower_max) * self.volume_lower / self.volume;
                (upper + dt_remaining, lower + dt_lower_max + dt_remaining)
            }
        };
        output.state = TankState { upper, lower };

        // finite timestep artefact, left in place while charging
        if output.state.upper < min_temp || output.state.lower < min_temp {
            output.overcooled = self.overcool(min_temp, &mut output.state, false);
        }

        if output.state.upper > self.params.max_temp {
            output.dumped = self.thermostatic_safety_valve(&mut output.state);
        }
    }

    /// With a draw, both volumes cool in parallel, emulating the water main pushing the
    /// temperature profile down through the whole tank.
    fn discharge_with_draw(&self, energy: f64, min_temp: f64, output: &mut TankDynamicsOutput) {
        let TankState {
            mut upper,
            mut lower,
        } = output.state;

        let dt = -energy / self.heat_capacity();
        let dt_lower_max = max_of_2(0., lower - min_temp);
        if dt <= dt_lower_max {
            upper -= dt;
            lower -= dt;
        } else {
            upper -= dt_lower_max;
            lower -= dt_lower_max;
            let dt_upper = (dt - dt_lower_max) * self.volume / self.volume_upper;
            let dt_upper_max = max_of_2(0., upper - min_temp);
            if dt_upper < dt_upper_max {
                upper -= dt_upper;
            } else {
                upper -= dt_upper_max;
                output.unmet = joules_to_average_watts(
                    (dt_upper - dt_upper_max) * self.heat_capacity_upper(),
                    self.timestep,
                );
                output.delivered -= output.unmet;
            }
        }
        output.state = TankState { upper, lower };

        if upper < min_temp || lower < min_temp {
            output.overcooled = self.overcool(min_temp, &mut output.state, true);
        }
    }

    /// Without a draw the lower volume cools first, then the upper volume, then both.
    fn stagnate(&self, energy: f64, min_temp: f64, output: &mut TankDynamicsOutput) {
        let floor = min_temp + self.params.approach_dt;
        let TankState {
            upper: prev_upper,
            lower: prev_lower,
        } = output.state;

        let dt_lower = energy / self.heat_capacity_lower();
        let mut lower = max_of_2(prev_lower + dt_lower, floor);
        let mut upper = prev_upper;

        let dt_lim_lower = floor - (prev_lower + dt_lower);
        if dt_lim_lower > 0. {
            let dt_to_upper = dt_lim_lower * self.volume_lower / self.volume_upper;
            upper = max_of_2(prev_upper - dt_to_upper, floor);

            let dt_lim_upper = floor - (prev_upper - dt_to_upper);
            if dt_lim_upper > 0. {
                let dt_to_both = dt_lim_upper * self.volume_upper / self.volume;
                upper -= dt_to_both;
                lower -= dt_to_both;
            }
        }
        output.state = TankState { upper, lower };

        if upper < min_temp || lower < min_temp {
            output.overcooled = self.overcool(min_temp, &mut output.state, true);
        }
    }

    /// Emulates a thermostatic safety valve at the top of the tank: caps the upper volume at the
    /// maximum temperature and the lower volume at `approach_dt` below it, returning the dumped
    /// heat rate.
    fn thermostatic_safety_valve(&self, state: &mut TankState) -> f64 {
        let max_temp = self.params.max_temp;
        let max_temp_lower = max_temp - self.params.approach_dt;

        let mut energy_dumped = self.heat_capacity_upper() * (state.upper - max_temp);
        state.upper = max_temp;

        if state.lower > max_temp_lower {
            energy_dumped += self.heat_capacity_lower() * (state.lower - max_temp_lower);
            state.lower = max_temp_lower;
        }

        joules_to_average_watts(energy_dumped, self.timestep)
    }

    /// Account for tank temperatures below the minimum (the smaller of feed and ambient). When
    /// discharging the temperatures are reset to the minimum and the shortfall is declared;
    /// while charging this is allowed. Returns the balancing error as a heat rate.
    fn overcool(&self, min_temp: f64, state: &mut TankState, discharge: bool) -> f64 {
        let dt_overcool = max_of_2(min_temp - state.upper, min_temp - state.lower);
        let energy_overcool = self.heat_capacity_upper() * max_of_2(0., min_temp - state.upper)
            + self.heat_capacity_lower() * max_of_2(0., min_temp - state.lower);

        if discharge {
            state.upper = max_of_2(min_temp, state.upper);
            state.lower = max_of_2(min_temp, state.lower);
        }

        if dt_overcool > self.params.allowed_overcooling_dt {
            warn!(
                "Cooling off {:.1} K below temperature limit {min_temp} K, balanced as {}",
                dt_overcool,
                if discharge {
                    "declared unmet demand, since discharging"
                } else {
                    "allowed, since charging"
                }
            );
        }

        joules_to_average_watts(energy_overcool, self.timestep)
    }

    /// One timestep of the tank with its wall losses, distribution losses and draw.
    ///
    /// Arguments:
    /// * `ambient_temp` - in K
    /// * `feed_temp` - in K
    /// * `state` - tank state at the end of the previous timestep
    /// * `draw_volume` - volume tapped from the top of the tank, in m3/h
    /// * `heat_in` - heat passed to the coil from a collector, or from a heat pump, in W
    /// * `max_draw_volume` - peak draw, in m3/h
    pub fn thermal_tank(
        &self,
        ambient_temp: f64,
        feed_temp: f64,
        state: TankState,
        draw_volume: f64,
        heat_in: f64,
        max_draw_volume: f64,
    ) -> anyhow::Result<ThermalTankOutput> {
        let (loss_upper, loss_lower) = self.wall_losses(ambient_temp, state);

        let dist =
            self.pipework
                .pipe_losses(state.upper, ambient_temp, draw_volume, max_draw_volume);

        let tap = self.tap(
            draw_volume,
            state.upper,
            feed_temp,
            dist.dt_drop,
            Some(feed_temp + dist.dt_drop),
        );

        let net_gain = heat_in * self.input_efficiency;

        let tank = self.thermal_tank_dynamics(
            ambient_temp,
            state,
            net_gain,
            loss_upper,
            loss_lower,
            feed_temp,
            tap.heat_rate,
        )?;

        let delivered_and_unmet = tank.delivered + tank.unmet + tap.unmet;

        Ok(ThermalTankOutput {
            net_gain,
            loss_lower,
            loss_upper,
            demand: tap.net_demand,
            demand_total: tap.total_demand,
            delivered: tank.delivered,
            unmet: ((tank.unmet + tap.unmet) * 100.).round() / 100.,
            dumped: tank.dumped,
            overcooled: tank.overcooled,
            demand_balance: (tap.total_demand - delivered_and_unmet).round(),
            state: tank.state,
            dt_dist: dist.dt_drop,
            set_temp: self.params.draw_set_temp,
            dist_heat_loss: dist.heat_loss,
            flow_on_fraction: dist.flow_on_fraction,
            collector_return_temp: match self.kind {
                TankKind::Solar => Some(tank.state.lower + self.params.approach_dt),
                TankKind::HeatPump => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distribution::pipework::PipingParameters;
    use crate::core::parameters::{ParameterRecord, ParameterValue, SizeRecord};
    use crate::core::units::gallons_to_cubic_metres;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const AMBIENT_TEMP: f64 = 298.15;
    const MAIN_TEMP: f64 = 291.15;
    const HEAT_IN: f64 = 500.;

    fn tank_of(kind: TankKind, params: ThermalStorageParameters, gallons: f64) -> ThermalTank {
        let pipework = Pipework::new(PipingParameters::default(), 20., 1.).unwrap();
        ThermalTank::new(kind, params, gallons_to_cubic_metres(gallons), pipework, 1.).unwrap()
    }

    #[fixture]
    fn tank() -> ThermalTank {
        tank_of(TankKind::Solar, ThermalStorageParameters::default(), 30.)
    }

    #[rstest]
    fn should_draw_full_volume_from_cool_tank(tank: ThermalTank) {
        let tap = tank.tap(0.02, 313.15, 293.15, 0., None);
        assert_relative_eq!(tap.volume, 0.02);
        assert!(tap.unmet > 0.);
    }

    #[rstest]
    fn should_draw_reduced_volume_from_hot_tank(tank: ThermalTank) {
        let tap = tank.tap(0.02, 353.15, 293.15, 0., None);
        assert_relative_eq!(
            tap.volume,
            0.02 * (322.04 - 293.15) / (353.15 - 293.15),
            max_relative = 1e-9
        );

        let expected_demand =
            ((322.04_f64 - 293.15) * 998.2 * 4180. * 0.02 / 3600. * 100.).round() / 100.;
        assert_relative_eq!(tap.total_demand, expected_demand, epsilon = 0.01);
        assert_relative_eq!(tap.unmet, 0., epsilon = 0.02);
    }

    #[rstest]
    fn should_reduce_draw_at_seventy_degrees(tank: ThermalTank) {
        let tap = tank.tap(0.02, 343.15, 293.15, 0., None);
        assert_relative_eq!(tap.volume, 0.011556, max_relative = 1e-3);
        assert_eq!(tap, tank.tap(0.02, 343.15, 293.15, 0., None));
    }

    #[rstest]
    fn should_not_draw_below_minimum_draw_temperature(tank: ThermalTank) {
        let tap = tank.tap(0.02, 290.15, 291.15, 0.5, Some(291.65));
        assert_eq!(tap.volume, 0.);
        assert_eq!(tap.heat_rate, 0.);
        assert_eq!(tap.unmet, tap.total_demand);
    }

    #[rstest]
    fn should_keep_temperatures_at_steady_state(tank: ThermalTank) {
        let state = TankState {
            upper: 333.15,
            lower: 328.15,
        };
        let steady = tank
            .thermal_tank_dynamics(AMBIENT_TEMP, state, HEAT_IN, 150., 100., MAIN_TEMP, 250.)
            .unwrap();
        assert_eq!(steady.state, state);
        assert_eq!(steady.delivered, 250.);
        assert_eq!(steady.unmet, 0.);
    }

    #[rstest]
    fn should_store_heat_of_whole_volume(tank: ThermalTank) {
        let per_kelvin = 998.2 * 4180. * tank.volume() / 3600.;
        assert_relative_eq!(
            tank.stored_heat_change(TankState::uniform(300.), TankState::uniform(301.)),
            per_kelvin,
            max_relative = 1e-9
        );
        let charged = tank
            .thermal_tank_dynamics(
                AMBIENT_TEMP,
                TankState::uniform(MAIN_TEMP),
                HEAT_IN,
                0.,
                0.,
                MAIN_TEMP,
                0.,
            )
            .unwrap();
        assert_relative_eq!(
            tank.stored_heat_change(TankState::uniform(MAIN_TEMP), charged.state),
            HEAT_IN,
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_charge_upper_volume_up_to_approach(tank: ThermalTank) {
        let charged = tank
            .thermal_tank_dynamics(
                AMBIENT_TEMP,
                TankState::uniform(328.15),
                HEAT_IN,
                50.,
                30.,
                MAIN_TEMP,
                150.,
            )
            .unwrap();
        assert_relative_eq!(
            charged.state.upper - tank.approach_dt(),
            charged.state.lower,
            max_relative = 1e-12
        );
        assert!(charged.state.lower > 328.15);
    }

    #[rstest]
    fn should_charge_upper_volume_only_with_little_energy(tank: ThermalTank) {
        let charged = tank
            .thermal_tank_dynamics(
                AMBIENT_TEMP,
                TankState::uniform(328.15),
                100.,
                0.,
                0.,
                MAIN_TEMP,
                0.,
            )
            .unwrap();
        assert!(charged.state.upper > 328.15);
        assert!(charged.state.upper - charged.state.lower < tank.approach_dt());
        assert_eq!(charged.state.lower, 328.15);
    }

    #[rstest]
    fn should_charge_both_volumes_when_stratified(tank: ThermalTank) {
        let state = TankState {
            upper: 330.15,
            lower: 328.15,
        };
        let charged = tank
            .thermal_tank_dynamics(AMBIENT_TEMP, state, HEAT_IN, 50., 30., MAIN_TEMP, 150.)
            .unwrap();
        assert_relative_eq!(
            charged.state.upper - charged.state.lower,
            tank.approach_dt(),
            max_relative = 1e-9
        );
        assert!(charged.state.upper > state.upper);
    }

    #[rstest]
    fn should_dump_heat_at_maximum_temperature(tank: ThermalTank) {
        let state = TankState {
            upper: tank.max_temp(),
            lower: tank.max_temp() - tank.approach_dt(),
        };
        let charged = tank
            .thermal_tank_dynamics(AMBIENT_TEMP, state, HEAT_IN, 50., 30., MAIN_TEMP, 150.)
            .unwrap();
        assert_eq!(charged.state.upper, state.upper);
        assert_relative_eq!(charged.state.lower, state.lower, max_relative = 1e-12);
        assert_relative_eq!(charged.net_heat_rate, charged.dumped, max_relative = 1e-9);
    }

    #[rstest]
    fn should_cool_lower_volume_first_without_draw(tank: ThermalTank) {
        let state = TankState {
            upper: 330.15,
            lower: 328.15,
        };
        let cooled = tank
            .thermal_tank_dynamics(AMBIENT_TEMP, state, 0., 100., 100., MAIN_TEMP, 0.)
            .unwrap();
        assert_eq!(cooled.state.upper, state.upper);
        assert!(cooled.state.lower < state.lower);
        assert_eq!(cooled.overcooled, 0.);
    }

    #[rstest]
    fn should_cool_upper_volume_once_lower_volume_is_cold(tank: ThermalTank) {
        let state = TankState {
            upper: 330.15,
            lower: 295.15,
        };
        let cooled = tank
            .thermal_tank_dynamics(AMBIENT_TEMP, state, 0., 100., 100., MAIN_TEMP, 0.)
            .unwrap();
        assert!(cooled.state.upper < state.upper);
        assert!(cooled.state.lower < state.lower);
        assert_relative_eq!(cooled.state.lower, MAIN_TEMP + tank.approach_dt());
    }

    #[rstest]
    fn should_declare_unmet_demand_from_depleted_tank(tank: ThermalTank) {
        let state = TankState {
            upper: 293.15,
            lower: 291.65,
        };
        let drawn = tank
            .thermal_tank_dynamics(AMBIENT_TEMP, state, 0., 5., 1., MAIN_TEMP, 5000.)
            .unwrap();
        assert_relative_eq!(drawn.state.upper, MAIN_TEMP, max_relative = 1e-12);
        assert_relative_eq!(drawn.state.lower, MAIN_TEMP, max_relative = 1e-12);
        assert!(drawn.unmet > 0.);
        assert_relative_eq!(drawn.unmet + drawn.delivered, 5000., max_relative = 1e-9);
    }

    #[rstest]
    fn should_heat_tank_with_solar_gain(tank: ThermalTank) {
        let state = TankState {
            upper: 328.15,
            lower: 323.15,
        };
        let with_gain = tank
            .thermal_tank(293.15, 291.15, state, 0.00757, 400., 0.1514)
            .unwrap();
        let no_gain = tank
            .thermal_tank(293.15, 291.15, state, 0.00757, 0., 0.1514)
            .unwrap();

        assert!(with_gain.state.upper > no_gain.state.upper);
        assert_relative_eq!(with_gain.net_gain, 400. * 0.84);
        assert_relative_eq!(
            with_gain.delivered,
            no_gain.delivered + no_gain.unmet,
            epsilon = 0.02
        );
        assert_eq!(
            with_gain.collector_return_temp,
            Some(with_gain.state.lower + tank.approach_dt())
        );
        assert_eq!(with_gain.demand_balance, 0.);
    }

    #[rstest]
    fn should_match_default_tank_when_built_from_catalog() {
        let piping_diameters = ParameterValue::List(vec![
            0.0127, 0.01905, 0.0254, 0.03175, 0.0381, 0.0508, 0.0635, 0.0762, 0.1016,
        ]);
        let records = [
            (ComponentKind::ThermalStorageTank, "upper volume fraction", ParameterValue::Number(0.5)),
            (ComponentKind::ThermalStorageTank, "insulation thickness", ParameterValue::Number(0.085)),
            (ComponentKind::ThermalStorageTank, "specific heat conductivity", ParameterValue::Number(0.04)),
            (ComponentKind::ThermalStorageTank, "tap temperature setpoint", ParameterValue::Number(322.04)),
            (ComponentKind::ThermalStorageTank, "height vs. radius", ParameterValue::Number(6.)),
            (ComponentKind::ThermalStorageTank, "temperature difference (approach)", ParameterValue::Number(2.)),
            (ComponentKind::ThermalStorageTank, "maximum temperature", ParameterValue::Number(344.15)),
            (ComponentKind::ThermalStorageTank, "coil efficiency", ParameterValue::Number(0.84)),
            (ComponentKind::Piping, "piping insulation specific heat conductivity", ParameterValue::Number(0.0175)),
            (ComponentKind::Piping, "piping insulation thickness", ParameterValue::Number(0.008)),
            (ComponentKind::Piping, "flow factor", ParameterValue::Number(0.5)),
            (ComponentKind::Piping, "diameter vs. length exponent", ParameterValue::Number(0.5)),
            (ComponentKind::Piping, "diameter vs. length scaler", ParameterValue::Number(0.007332348418708248)),
            (ComponentKind::Piping, "discrete diameters", piping_diameters),
            (ComponentKind::Piping, "circulation", ParameterValue::Flag(false)),
            (ComponentKind::Piping, "longest branch length fraction", ParameterValue::Number(1.)),
        ]
        .into_iter()
        .map(|(component, parameter, value)| ParameterRecord {
            component,
            parameter: parameter.into(),
            value,
            unit: None,
        })
        .collect::<Vec<_>>();
        let catalog = ParameterCatalog::from_records(&records).unwrap();
        let sizes = ComponentSizes::from_records(&[
            SizeRecord {
                component: ComponentKind::ThermalStorageTank,
                size: gallons_to_cubic_metres(30.),
                unit: None,
            },
            SizeRecord {
                component: ComponentKind::Piping,
                size: 20.,
                unit: None,
            },
        ])
        .unwrap();

        let from_catalog =
            ThermalTank::from_catalog(TankKind::Solar, Some(&catalog), &sizes, 1.).unwrap();
        let default_tank = tank_of(TankKind::Solar, ThermalStorageParameters::default(), 30.);

        let state = TankState {
            upper: 310.15,
            lower: 305.15,
        };
        assert_eq!(
            from_catalog
                .thermal_tank(293.15, 291.15, state, 0.00757, 0., 0.1514)
                .unwrap(),
            default_tank
                .thermal_tank(293.15, 291.15, state, 0.00757, 0., 0.1514)
                .unwrap()
        );
    }

    #[rstest]
    fn should_account_distribution_loss_in_heat_pump_tank_demand() {
        let params = ThermalStorageParameters {
            height_vs_radius: 2.56,
            max_temp: 333.15,
            coil_efficiency: None,
            ..Default::default()
        };
        let tank = tank_of(TankKind::HeatPump, params, 80.);
        let state = TankState {
            upper: 321.15,
            lower: 320.15,
        };
        let output = tank
            .thermal_tank(293.15, 291.15, state, 0.00757, 2350., 0.1514)
            .unwrap();

        assert_eq!(output.net_gain, 2350.);
        assert_eq!(output.collector_return_temp, None);
        assert_relative_eq!(
            output.demand_total - output.demand,
            output.dist_heat_loss,
            epsilon = 0.011
        );
    }

    #[rstest]
    fn should_require_coil_efficiency_for_solar_tank() {
        let params = ThermalStorageParameters {
            coil_efficiency: None,
            ..Default::default()
        };
        let pipework = Pipework::new(PipingParameters::default(), 0., 1.).unwrap();
        assert!(ThermalTank::new(TankKind::Solar, params, 0.3, pipework, 1.).is_err());
    }
}
