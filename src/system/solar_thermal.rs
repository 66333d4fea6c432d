use crate::core::converters::solar_collector::SolarCollector;
use crate::core::distribution::pump::{Pump, PumpRole};
use crate::core::parameters::{ComponentSizes, ParameterCatalog};
use crate::core::storage::thermal_tank::{TankKind, TankState, ThermalTank};
use crate::system::backup::{dist_loss_at_backup, run_backups, BackupDemand};
use crate::system::results::{
    column, periodic_solar_fractions, ratio_or_zero, seasonal_total, ProjectAnnualResult,
    SimulationResults, TimestepResult,
};
use crate::system::{demand_balance_error, tank_balance_error, tank_record, BackupFuel, System};

/// Solar collector loop charging a stratified tank through a coil, with a distribution network
/// to the households.
#[derive(Clone, Debug)]
pub(crate) struct SolarThermalPlant {
    collector: SolarCollector,
    tank: ThermalTank,
    solar_pump: Pump,
    distribution_pump: Pump,
}

impl SolarThermalPlant {
    pub(crate) fn new(
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            collector: SolarCollector::from_catalog(catalog, sizes)?,
            tank: ThermalTank::from_catalog(TankKind::Solar, catalog, sizes, timestep)?,
            solar_pump: Pump::from_catalog(PumpRole::Solar, catalog, sizes, timestep)?,
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

        let seed_temp = weather.first_main_temp();
        let mut results = vec![TimestepResult::default(); system.simulation_time.result_len()];
        results[0] = TimestepResult {
            tank_upper_temp: seed_temp,
            tank_lower_temp: seed_temp,
            collector_return_temp: seed_temp,
            set_temp: self.tank.draw_set_temp(),
            ..system.seed_record()
        };

        let mut state = TankState::uniform(seed_temp);
        let mut return_temp = seed_temp;
        let mut clamped_outputs = 0;

        for t_it in system.simulation_time.iter() {
            let ts = t_it.index;
            let conditions = weather.at(ts);
            let load = loads.project()[ts];

            let collector =
                self.collector
                    .gain(return_temp, conditions.ambient_temp, conditions.irradiance);
            if collector.status.is_clamped() {
                clamped_outputs += 1;
            }

            let tank = self.tank.thermal_tank(
                conditions.ambient_temp,
                conditions.main_temp,
                state,
                load,
                collector.gain,
                loads.max(),
            )?;
            state = tank.state;
            return_temp = tank.collector_return_temp.unwrap_or(conditions.main_temp);

            results[ts + 1] = TimestepResult {
                collector_gain: collector.gain,
                collector_return_temp: return_temp,
                ..tank_record(load, conditions, &tank, timestep)
            };
        }

        let tank_unmet = column(&results, |r| r.tank_unmet);
        let dist_loss = column(&results, |r| r.dist_loss);
        let (feed_temps, feed_temps_no_loss) = backup_feed_temps(&results);

        let backup_run = run_backups(
            &system.backups,
            loads,
            &BackupDemand {
                tank_unmet: &tank_unmet,
                dist_loss: &dist_loss,
                feed_temps: Some((&feed_temps, &feed_temps_no_loss)),
                pv_available: None,
            },
            timestep,
        )?;

        for (i, result) in results.iter_mut().enumerate() {
            result.backup_delivered = backup_run.project.delivered[i];
            result.gas_use = backup_run.project.energy_use[i];
            result.gas_use_no_dist = backup_run.project.energy_use_no_dist[i];
            result.unmet = backup_run.project.unmet[i];
            result.delivered = result.tank_delivered + result.backup_delivered;
            result.dist_loss_at_backup = dist_loss_at_backup(result.dist_loss, result.tank_unmet);
        }

        let solar_on = results
            .iter()
            .map(|r| if r.collector_gain > 0. { 1. } else { 0. })
            .collect::<Vec<_>>();
        let solar_pump = self.solar_pump.energy_use(&solar_on);
        let distribution_pump = loads.is_community().then(|| {
            self.distribution_pump
                .energy_use(&column(&results, |r| r.pump_on_fraction))
        });
        for (i, result) in results.iter_mut().enumerate() {
            result.pump_el_use = solar_pump.el_use[i]
                + distribution_pump
                    .as_ref()
                    .map_or(0., |pump| pump.el_use[i]);
            result.el_use = result.pump_el_use;
            result.gross_el_use = result.pump_el_use;
        }

        let mut project = ProjectAnnualResult::from_timesteps(&results, calendar, timestep);
        project.solar_fraction =
            ratio_or_zero(project.demand - project.backup_delivered, project.demand);
        (project.monthly_solar_fraction, project.seasonal_solar_fraction) =
            periodic_solar_fractions(&results, calendar);
        project.solar_pump_hours = Some(solar_pump.operating_hours);
        project.distribution_pump_hours = distribution_pump.map(|pump| pump.operating_hours);
        project.tank_balance_error = Some(tank_balance_error(
            &project,
            self.tank
                .stored_heat_change(TankState::uniform(seed_temp), state),
        ));
        project.demand_balance_error = Some(demand_balance_error(&results));
        project.max_load_gallons = loads.max_in_gallons();
        project.clamped_outputs = clamped_outputs;

        let demand_sum = results.iter().map(|r| r.demand).sum::<f64>();
        let solar_fractions = (0..loads.household_count())
            .map(|household| {
                let solar_share = loads
                    .share(household)
                    .iter()
                    .zip(&results)
                    .map(|(share, r)| share * (r.demand - r.backup_delivered))
                    .sum::<f64>();
                ratio_or_zero(solar_share, loads.annual_share(household) * demand_sum)
            })
            .collect::<Vec<_>>();

        let households = system.household_results(
            &results,
            &backup_run,
            BackupFuel::Gas,
            seasonal_total(&results, calendar, |r| r.pump_el_use, timestep),
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

/// Feed temperatures of the household backups, with and without the distribution temperature
/// drop. Backups take the water as it leaves the tank at the start of each timestep, which is
/// the upper volume temperature of the previous record, cooled along the distribution network
/// during the timestep. The seed record has no feed.
fn backup_feed_temps(results: &[TimestepResult]) -> (Vec<f64>, Vec<f64>) {
    let feed_temps_no_loss = (0..results.len())
        .map(|i| if i == 0 { 0. } else { results[i - 1].tank_upper_temp })
        .collect::<Vec<_>>();
    let feed_temps = feed_temps_no_loss
        .iter()
        .zip(results)
        .map(|(temp, result)| temp - result.dist_dt)
        .collect();
    (feed_temps, feed_temps_no_loss)
}
