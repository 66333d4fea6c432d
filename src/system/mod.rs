pub mod backup;
mod conventional;
pub mod loads;
pub mod results;
mod solar_electric;
mod solar_thermal;

use crate::compare_floats::relative_error;
use crate::core::converters::heater::Heater;
use crate::core::parameters::{ComponentKind, ComponentSizes, ParameterCatalog};
use crate::core::storage::gas_tank::GasTank;
use crate::core::storage::thermal_tank::ThermalTankOutput;
use crate::input::{Archetype, HouseholdInput, ProjectInput};
use crate::simulation_time::SimulationTime;
use crate::system::backup::{BackupHeater, BackupRun};
use crate::system::loads::{split_by_occupancy, ProjectLoads};
use crate::system::results::{
    seasonal_series_total, HouseholdAnnualResult, ProjectAnnualResult, SeasonalTotal,
    SimulationResults, TimestepResult,
};
use crate::weather::{TimestepWeather, WeatherSeries};
use conventional::simulate_gas_tank;
use solar_electric::SolarElectricPlant;
use solar_thermal::SolarThermalPlant;
use tracing::{info, warn};

/// Balance errors above this relative error are reported
const BALANCE_TOLERANCE: f64 = 0.01;

#[derive(Clone, Debug)]
enum MainSystem {
    GasTank(GasTank),
    SolarThermal(SolarThermalPlant),
    SolarElectric(SolarElectricPlant),
}

/// What the households' backups burn or draw
#[derive(Clone, Copy, Debug, PartialEq)]
enum BackupFuel {
    Gas,
    Electricity,
}

/// A hot water system serving one or more households, with the main system at project level
/// and a backup heater per household. All components are built on construction, so a missing
/// or invalid parameter is reported before any simulation runs.
#[derive(Clone, Debug)]
pub struct System {
    archetype: Archetype,
    main: MainSystem,
    backups: Vec<BackupHeater>,
    household_ids: Vec<u32>,
    loads: ProjectLoads,
    weather: WeatherSeries,
    simulation_time: SimulationTime,
}

impl System {
    /// Arguments:
    /// * `archetype` - system configuration to simulate
    /// * `catalog` - main system parameters; None uses the defaults of each component
    /// * `sizes` - main system component sizes
    /// * `backup_catalog` - backup heater parameters; None uses defaults
    /// * `households` - household load profiles and backup sizes
    /// * `weather` - weather per timestep; None uses default conditions
    /// * `timestep` - in hours
    pub fn new(
        archetype: Archetype,
        catalog: Option<&ParameterCatalog>,
        sizes: &ComponentSizes,
        backup_catalog: Option<&ParameterCatalog>,
        households: &[HouseholdInput],
        weather: Option<WeatherSeries>,
        timestep: f64,
    ) -> anyhow::Result<Self> {
        let loads = ProjectLoads::new(households)?;
        let simulation_time = SimulationTime::new(timestep, loads.project().len())?;
        let weather = match weather {
            Some(weather) => {
                if weather.len() != simulation_time.total_steps() {
                    anyhow::bail!(
                        "Weather has {} timesteps while the loads have {}",
                        weather.len(),
                        simulation_time.total_steps()
                    );
                }
                weather
            }
            None => WeatherSeries::default_for(&simulation_time),
        };

        let main = match archetype {
            Archetype::GasTankWh => MainSystem::GasTank(GasTank::from_catalog(catalog, sizes)?),
            Archetype::SolarThermalNew | Archetype::SolarThermalRetrofit => {
                // collector and tank not sized in the input follow the household occupancy
                let mut sizes = sizes.clone();
                let (collector_area, tank_volume) = loads.solar_thermal_sizes();
                if collector_area > 0. {
                    sizes = sizes
                        .with_default(ComponentKind::SolarCollector, collector_area)
                        .with_default(ComponentKind::ThermalStorageTank, tank_volume);
                }
                MainSystem::SolarThermal(SolarThermalPlant::new(catalog, &sizes, timestep)?)
            }
            Archetype::SolarElectric => {
                MainSystem::SolarElectric(SolarElectricPlant::new(catalog, sizes, timestep)?)
            }
        };

        let backups = match archetype {
            Archetype::GasTankWh => vec![],
            _ => households
                .iter()
                .map(|household| {
                    let backup_sizes = ComponentSizes::from_records(&household.backup_sizes)?;
                    Ok(match archetype {
                        Archetype::SolarThermalRetrofit => BackupHeater::GasTank(
                            GasTank::from_catalog(backup_catalog, &backup_sizes)?,
                        ),
                        Archetype::SolarElectric => BackupHeater::InstantaneousElectric(
                            Heater::electric_resistance(backup_catalog, &backup_sizes)?,
                        ),
                        _ => BackupHeater::InstantaneousGas(Heater::gas_burner(
                            backup_catalog,
                            &backup_sizes,
                        )?),
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
        };

        info!(
            "Set up a {archetype} system serving {} household(s) over {} timesteps.",
            loads.household_count(),
            simulation_time.total_steps()
        );

        Ok(Self {
            archetype,
            main,
            backups,
            household_ids: households.iter().map(|household| household.id).collect(),
            loads,
            weather,
            simulation_time,
        })
    }

    pub fn from_input(input: &ProjectInput) -> anyhow::Result<Self> {
        let catalog = input
            .component_parameters
            .as_deref()
            .map(ParameterCatalog::from_records)
            .transpose()?;
        let backup_catalog = input
            .backup_parameters
            .as_deref()
            .map(ParameterCatalog::from_records)
            .transpose()?;
        let weather = input
            .weather
            .as_deref()
            .map(WeatherSeries::from_records)
            .transpose()?;

        Self::new(
            input.archetype,
            catalog.as_ref(),
            &ComponentSizes::from_records(&input.component_sizes)?,
            backup_catalog.as_ref(),
            &input.households,
            weather,
            input.timestep,
        )
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn loads(&self) -> &ProjectLoads {
        &self.loads
    }

    /// Run the main system over every timestep, then the household backups, and reduce the
    /// results to project and household totals.
    pub fn simulate(&self) -> anyhow::Result<SimulationResults> {
        let results = match &self.main {
            MainSystem::GasTank(gas_tank) => simulate_gas_tank(self, gas_tank),
            MainSystem::SolarThermal(plant) => plant.simulate(self),
            MainSystem::SolarElectric(plant) => plant.simulate(self),
        }?;

        info!(
            "Simulated the {} system, solar fraction {:.3}.",
            self.archetype, results.project.solar_fraction
        );
        Ok(results)
    }

    /// Record of the initial conditions, ahead of the first simulated timestep
    fn seed_record(&self) -> TimestepResult {
        let first = self.weather.records().first().copied().unwrap_or_default();
        TimestepResult {
            ambient_temp: first.ambient_temp,
            wet_bulb_temp: first.wet_bulb_temp,
            main_temp: first.main_temp,
            ..Default::default()
        }
    }

    /// Household totals of the tank and backup results. Electricity used at project level is
    /// split between households by occupancy.
    fn household_results(
        &self,
        results: &[TimestepResult],
        backup_run: &BackupRun,
        fuel: BackupFuel,
        shared_el_use: SeasonalTotal,
        solar_fractions: &[f64],
    ) -> Vec<HouseholdAnnualResult> {
        let timestep = self.simulation_time.step();
        let calendar = self.weather.calendar();
        let column = |field: fn(&TimestepResult) -> f64| results.iter().map(field).collect::<Vec<_>>();
        let demand = column(|r| r.demand);
        let tank_delivered = column(|r| r.tank_delivered);
        let tank_unmet = column(|r| r.tank_unmet);
        let dist_loss = column(|r| r.dist_loss);
        let dist_loss_at_backup = column(|r| r.dist_loss_at_backup);

        let occupancies = self.loads.occupancies();
        let shared_total = split_by_occupancy(shared_el_use.total, occupancies);
        let shared_summer = split_by_occupancy(shared_el_use.summer, occupancies);
        let shared_winter = split_by_occupancy(shared_el_use.winter, occupancies);

        self.household_ids
            .iter()
            .enumerate()
            .map(|(household, id)| {
                let backup = &backup_run.households[household];
                let share = self.loads.share(household);
                let weighted_total = |series: &[f64]| {
                    self.loads.household_total(household, series, timestep)
                };

                let tank_delivered = weighted_total(&tank_delivered);
                let backup_delivered = backup.delivered.iter().sum::<f64>() * timestep;
                let energy_use = seasonal_series_total(&backup.energy_use, calendar, timestep);
                let shared = SeasonalTotal {
                    total: shared_total[household],
                    summer: shared_summer[household],
                    winter: shared_winter[household],
                };
                let (gas_use, gas_use_no_dist, el_use) = match fuel {
                    BackupFuel::Gas => (
                        energy_use,
                        seasonal_series_total(&backup.energy_use_no_dist, calendar, timestep),
                        shared,
                    ),
                    BackupFuel::Electricity => (
                        SeasonalTotal::default(),
                        SeasonalTotal::default(),
                        energy_use + shared,
                    ),
                };

                HouseholdAnnualResult {
                    id: *id,
                    occupancy: occupancies[household],
                    demand: weighted_total(&demand),
                    tank_delivered,
                    tank_unmet: weighted_total(&tank_unmet),
                    backup_delivered,
                    delivered: tank_delivered + backup_delivered,
                    unmet: backup.unmet.iter().sum::<f64>() * timestep,
                    dist_loss: weighted_total(&dist_loss),
                    dist_loss_at_backup: seasonal_series_total(
                        &share
                            .iter()
                            .zip(&dist_loss_at_backup)
                            .map(|(share, loss)| share * loss)
                            .collect::<Vec<_>>(),
                        calendar,
                        timestep,
                    ),
                    gas_use,
                    gas_use_no_dist,
                    el_use,
                    solar_fraction: solar_fractions[household],
                }
            })
            .collect()
    }
}

/// Timestep record of a thermal tank with its distribution network
fn tank_record(
    load: f64,
    conditions: &TimestepWeather,
    tank: &ThermalTankOutput,
    timestep: f64,
) -> TimestepResult {
    TimestepResult {
        project_load: load,
        ambient_temp: conditions.ambient_temp,
        wet_bulb_temp: conditions.wet_bulb_temp,
        main_temp: conditions.main_temp,
        demand: tank.demand,
        demand_total: tank.demand_total,
        demand_balance: tank.demand_balance,
        tank_gain: tank.net_gain,
        tank_loss_upper: tank.loss_upper,
        tank_loss_lower: tank.loss_lower,
        tank_delivered: tank.delivered,
        tank_unmet: tank.unmet,
        dumped: tank.dumped,
        overcooled: tank.overcooled,
        tank_upper_temp: tank.state.upper,
        tank_lower_temp: tank.state.lower,
        set_temp: tank.set_temp,
        dist_dt: tank.dt_dist,
        dist_loss: tank.dist_heat_loss / timestep,
        pump_on_fraction: tank.flow_on_fraction,
        ..Default::default()
    }
}

/// Relative error of the tank heat balance over the run: heat in against heat delivered,
/// dumped, lost and left stored in the tank, less the heat added by overcooling.
///
/// Arguments:
/// * `stored_heat_change` - heat taken up by the tank between the seed and final state, in Wh
fn tank_balance_error(project: &ProjectAnnualResult, stored_heat_change: f64) -> f64 {
    let heat_out = project.tank_delivered
        + project.dumped
        + project.tank_loss_upper
        + project.tank_loss_lower
        + stored_heat_change
        - project.overcooled;
    let error = relative_error(heat_out, project.tank_gain);
    if error > BALANCE_TOLERANCE {
        warn!(
            "Solar tank balance error is {:.2} %, above {} %.",
            error * 100.,
            BALANCE_TOLERANCE * 100.
        );
    }
    error
}

/// Relative error between the total demand and what was delivered or reported unmet
fn demand_balance_error(results: &[TimestepResult]) -> f64 {
    let imbalance = results.iter().map(|r| r.demand_balance).sum::<f64>().abs();
    let demand_total = results.iter().map(|r| r.demand_total).sum::<f64>();
    let error = if demand_total == 0. {
        0.
    } else {
        imbalance / demand_total
    };
    if error > BALANCE_TOLERANCE {
        warn!(
            "Demand balance error is {:.2} %, above {} %.",
            error * 100.,
            BALANCE_TOLERANCE * 100.
        );
    }
    error
}
