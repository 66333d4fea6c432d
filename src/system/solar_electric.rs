use crate::compare_floats::{max_of_2, min_of_2};
use crate::core::converters::heat_pump::{HeatPump, HeatPumpOutput};
use crate::core::converters::photovoltaic::Photovoltaic;
use crate::core::distribution::pump::{Pump, PumpRole};
use crate::core::parameters::{ComponentSizes, ParameterCatalog};
use crate::core::storage::thermal_tank::{TankKind, TankState, ThermalTank};
use crate::system::backup::{dist_loss_at_backup, run_backups, BackupDemand};
use crate::system::results::{
    column, ratio_or_zero, seasonal_series_total, ProjectAnnualResult, SimulationResults,
    TimestepResult,
};
use crate::system::{demand_balance_error, tank_balance_error, tank_record, BackupFuel, System};

/// Temperature band below the tank maximum temperature over which a heat pump that switched
/// off stays off, in K
const HYSTERESIS_BAND: f64 = 5.;

/// On/off thermostat of the heat pump. It starts on and runs until the control temperature
/// reaches the limit, then stays off until the temperature drops below the limit less the
/// band.
#[derive(Clone, Copy, Debug, PartialEq)]
struct HysteresisControl {
    on: bool,
    limit: f64,
    band: f64,
}

impl HysteresisControl {
    fn new(limit: f64, band: f64) -> Self {
        Self {
            on: true,
            limit,
            band,
        }
    }

    /// Update the status for the current control temperature and return whether to run
    fn update(&mut self, control_temp: f64) -> bool {
        self.on = if self.on {
            control_temp < self.limit
        } else {
            control_temp < self.limit - self.band
        };
        self.on
    }
}

/// Heat pump charging a stratified tank, powered partly by a PV array whose leftover output
/// goes to the household backups and the distribution pump.
#[derive(Clone, Debug)]
pub(crate) struct SolarElectricPlant {
    heat_pump: HeatPump,
    photovoltaic: Photovoltaic,
    tank: ThermalTank,
    distribution_pump: Pump,
}

impl SolarElectricPlant {
    pub(crate) fn new(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            heat_pump: HeatPump::from_catalog(catalog)?,
            photovoltaic: Photovoltaic::from_catalog(catalog, sizes, false)?,
            tank: ThermalTank::from_catalog(TankKind::HeatPump, catalog, sizes, timestep)?,
            distribution_pump: Pump::from_catalog(
                PumpRole::Distribution,
                catalog,
                sizes,
                timestep,
            )?,
        })
    }

    pub(crate) fn simulate(&self, system: &System) -> anyhow::Result<SimulationResults> {
        let loads = &system.loads;
        let weather = &system.weather;
        let calendar = weather.calendar();
        let timestep = system.simulation_time.step();
        let len = system.simulation_time.result_len();

        let seed_temp = weather.first_main_temp();
        let mut results = vec![TimestepResult::default(); len];
        results[0] = TimestepResult {
            tank_upper_temp: seed_temp,
            tank_lower_temp: seed_temp,
            set_temp: self.tank.draw_set_temp(),
            ..system.seed_record()
        };

        let mut state = TankState::uniform(seed_temp);
        let mut control = HysteresisControl::new(self.tank.max_temp(), HYSTERESIS_BAND);
        let mut pv_after_hp = vec![0.; len];
        let mut clamped_outputs = 0;

        for t_it in system.simulation_time.iter() {
            let ts = t_it.index;
            let conditions = weather.at(ts);
            let load = loads.project()[ts];

            let heat_pump = if control.update(state.upper) {
                self.heat_pump
                    .performance(conditions.wet_bulb_temp, state.upper)?
            } else {
                HeatPumpOutput::off()
            };
            if heat_pump.status.is_clamped() {
                clamped_outputs += 1;
            }

            let pv = self.photovoltaic.power(conditions.irradiance);
            pv_after_hp[ts + 1] = max_of_2(pv.ac - heat_pump.el_use, 0.);

            let tank = self.tank.thermal_tank(
                conditions.ambient_temp,
                conditions.main_temp,
                state,
                load,
                heat_pump.heat_cap,
                loads.max(),
            )?;
            state = tank.state;

            results[ts + 1] = TimestepResult {
                hp_el_use: heat_pump.el_use,
                pv_ac: pv.ac,
                pv_dc: pv.dc,
                pv_to_hp: min_of_2(heat_pump.el_use, pv.ac),
                ..tank_record(load, conditions, &tank, timestep)
            };
        }

        let tank_unmet = column(&results, |r| r.tank_unmet);
        let dist_loss = column(&results, |r| r.dist_loss);
        let backup_run = run_backups(
            &system.backups,
            loads,
            &BackupDemand {
                tank_unmet: &tank_unmet,
                dist_loss: &dist_loss,
                feed_temps: None,
                pv_available: Some(&pv_after_hp),
            },
            timestep,
        )?;

        // the distribution pump runs whenever the tank delivers heat
        let distribution_pump = loads.is_community().then(|| {
            let pump_on = results
                .iter()
                .map(|r| if r.tank_delivered > 0. { 1. } else { 0. })
                .collect::<Vec<_>>();
            self.distribution_pump.energy_use(&pump_on)
        });

        let mut pump_after_pv = vec![0.; len];
        for (i, result) in results.iter_mut().enumerate() {
            result.backup_delivered = backup_run.project.delivered[i];
            result.el_res_gross_use = backup_run.project.gross_energy_use[i];
            result.pv_to_el_res = backup_run.pv_used[i];
            result.unmet = backup_run.project.unmet[i];
            result.delivered = result.tank_delivered + result.backup_delivered;
            result.dist_loss_at_backup = dist_loss_at_backup(result.dist_loss, result.tank_unmet);

            let pv_remaining = backup_run.pv_remaining[i];
            result.pump_el_use = distribution_pump
                .as_ref()
                .map_or(0., |pump| pump.el_use[i]);
            pump_after_pv[i] = max_of_2(result.pump_el_use - pv_remaining, 0.);
            result.pv_surplus = max_of_2(pv_remaining - result.pump_el_use, 0.);

            result.gross_el_use = result.hp_el_use + result.el_res_gross_use + result.pump_el_use;
            result.el_use = result.hp_el_use - result.pv_to_hp
                + backup_run.project.energy_use[i]
                + pump_after_pv[i];
        }

        let mut project = ProjectAnnualResult::from_timesteps(&results, calendar, timestep);
        let pv_share_hp = ratio_or_zero(project.pv_to_hp, project.hp_el_use);
        let pv_share_el_res = ratio_or_zero(project.pv_to_el_res, project.el_res_gross_use);
        project.solar_fraction = ratio_or_zero(
            project.tank_gain * pv_share_hp + project.backup_delivered * pv_share_el_res,
            project.demand,
        );
        project.distribution_pump_hours = distribution_pump.map(|pump| pump.operating_hours);
        project.tank_balance_error = Some(tank_balance_error(
            &project,
            self.tank
                .stored_heat_change(TankState::uniform(seed_temp), state),
        ));
        project.demand_balance_error = Some(demand_balance_error(&results));
        project.max_load_gallons = loads.max_in_gallons();
        project.clamped_outputs = clamped_outputs;

        let tank_gain = column(&results, |r| r.tank_gain);
        let demand = column(&results, |r| r.demand);
        let solar_fractions = (0..loads.household_count())
            .map(|household| {
                let backup_delivered =
                    backup_run.households[household].delivered.iter().sum::<f64>() * timestep;
                ratio_or_zero(
                    loads.household_total(household, &tank_gain, timestep) * pv_share_hp
                        + backup_delivered * pv_share_el_res,
                    loads.household_total(household, &demand, timestep),
                )
            })
            .collect::<Vec<_>>();

        let households = system.household_results(
            &results,
            &backup_run,
            BackupFuel::Electricity,
            seasonal_series_total(&pump_after_pv, calendar, timestep),
            &solar_fractions,
        );

        Ok(SimulationResults {
            archetype: system.archetype,
            timesteps: results,
            calendar: calendar.to_vec(),
            households,
            project,
        })
    }
}
