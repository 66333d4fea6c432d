use crate::compare_floats::{max_of_2, min_of_2};
use crate::core::converters::heater::Heater;
use crate::core::storage::gas_tank::{GasTank, DEFAULT_SURROUNDING_TEMP};
use crate::system::loads::ProjectLoads;
use rayon::prelude::*;
use thiserror::Error;

/// The backup heater installed at a household
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackupHeater {
    /// Instantaneous gas water heater covering the heat the solar tank could not supply
    InstantaneousGas(Heater),
    /// Existing gas tank water heater fed with water from the solar tank
    GasTank(GasTank),
    /// Instantaneous electric resistance heater, partly powered by leftover PV
    InstantaneousElectric(Heater),
}

#[derive(Debug, Error)]
#[error(
    "Backup energy use of the project, {project} Wh, does not match the sum over households, \
    {household_sum} Wh"
)]
pub struct BackupMismatchError {
    pub project: f64,
    pub household_sum: f64,
}

/// What the main system leaves for the backups. All series are aligned with result series,
/// with entry 0 being the seed.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackupDemand<'a> {
    /// Project heat demand the tank could not meet, in W
    pub tank_unmet: &'a [f64],
    /// Distribution heat loss, in W
    pub dist_loss: &'a [f64],
    /// Temperatures of the water reaching each household from the tank, with and without the
    /// distribution temperature drop, in K
    pub feed_temps: Option<(&'a [f64], &'a [f64])>,
    /// PV output left after the main system, in W
    pub pv_available: Option<&'a [f64]>,
}

/// Timeseries of a backup heater, or of all backups of a project. Rates in W.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackupSeries {
    pub delivered: Vec<f64>,
    /// Gas use, or electricity drawn from the grid after any PV offset
    pub energy_use: Vec<f64>,
    /// Gas use as if there were no distribution losses
    pub energy_use_no_dist: Vec<f64>,
    /// Energy use before any PV offset
    pub gross_energy_use: Vec<f64>,
    pub unmet: Vec<f64>,
}

impl BackupSeries {
    fn zeros(len: usize) -> Self {
        Self {
            delivered: vec![0.; len],
            energy_use: vec![0.; len],
            energy_use_no_dist: vec![0.; len],
            gross_energy_use: vec![0.; len],
            unmet: vec![0.; len],
        }
    }

    fn accumulate(&mut self, other: &Self) {
        for (total, series) in [
            (&mut self.delivered, &other.delivered),
            (&mut self.energy_use, &other.energy_use),
            (&mut self.energy_use_no_dist, &other.energy_use_no_dist),
            (&mut self.gross_energy_use, &other.gross_energy_use),
            (&mut self.unmet, &other.unmet),
        ] {
            for (total, value) in total.iter_mut().zip(series) {
                *total += value;
            }
        }
    }

    /// Total energy use over the run, in Wh
    pub fn energy_use_total(&self, timestep: f64) -> f64 {
        self.energy_use.iter().sum::<f64>() * timestep
    }
}

/// Results of the backups of all households
#[derive(Clone, Debug, PartialEq)]
pub struct BackupRun {
    /// Sum over households
    pub project: BackupSeries,
    /// Per household, in input order
    pub households: Vec<BackupSeries>,
    /// PV output left after the backups, in W
    pub pv_remaining: Vec<f64>,
    /// PV output used by the backups, in W
    pub pv_used: Vec<f64>,
}

impl BackupHeater {
    fn household_series(
        &self,
        household: usize,
        loads: &ProjectLoads,
        demand: &BackupDemand,
    ) -> anyhow::Result<BackupSeries> {
        let share = loads.share(household);
        let len = share.len();

        match self {
            Self::InstantaneousGas(heater) => {
                let mut series = BackupSeries::zeros(len);
                for i in 0..len {
                    let unmet = demand.tank_unmet[i];
                    let output = heater.demand_heat(unmet * share[i]);

                    let dist_loss = if unmet > 0. {
                        demand.dist_loss[i]
                    } else {
                        0.
                    };
                    let output_no_dist = heater.demand_heat(max_of_2(unmet - dist_loss, 0.) * share[i]);

                    series.delivered[i] = output.delivered;
                    series.energy_use[i] = output.energy_use;
                    series.energy_use_no_dist[i] = output_no_dist.energy_use;
                    series.gross_energy_use[i] = output.energy_use;
                    series.unmet[i] = output.unmet;
                }
                Ok(series)
            }
            Self::GasTank(gas_tank) => {
                let Some((feed_temps, feed_temps_no_loss)) = demand.feed_temps else {
                    anyhow::bail!("A gas tank backup needs the temperature of the water it is fed");
                };
                let draws = loads.household_draws(household);

                let mut series = BackupSeries::zeros(len);
                // entry 0 is the seed and has no draw
                for i in 1..len {
                    let draw = draws[i - 1];
                    let output = gas_tank.gas_tank_wh(draw, feed_temps[i], DEFAULT_SURROUNDING_TEMP);
                    let output_no_loss =
                        gas_tank.gas_tank_wh(draw, feed_temps_no_loss[i], DEFAULT_SURROUNDING_TEMP);

                    series.delivered[i] = output.delivered;
                    series.energy_use[i] = output.gas_use;
                    series.energy_use_no_dist[i] = output_no_loss.gas_use;
                    series.gross_energy_use[i] = output.gas_use;
                }
                Ok(series)
            }
            Self::InstantaneousElectric(heater) => {
                let mut series = BackupSeries::zeros(len);
                for i in 0..len {
                    let output = heater.demand_heat(demand.tank_unmet[i] * share[i]);
                    let pv = demand
                        .pv_available
                        .map_or(0., |pv_available| pv_available[i] * share[i]);
                    let net = max_of_2(output.energy_use - pv, 0.);

                    series.delivered[i] = output.delivered;
                    series.energy_use[i] = net;
                    series.energy_use_no_dist[i] = net;
                    series.gross_energy_use[i] = output.energy_use;
                    series.unmet[i] = output.unmet;
                }
                Ok(series)
            }
        }
    }
}

/// Run the backup heater of every household on its share of what the main system left, then
/// sum the results over the project.
///
/// Arguments:
/// * `heaters` - backup heater per household, in the order of the households in `loads`
/// * `loads` - project loads with the household shares
/// * `demand` - what the main system left for the backups
/// * `timestep` - in hours
pub fn run_backups(
    heaters: &[BackupHeater],
    loads: &ProjectLoads,
    demand: &BackupDemand,
    timestep: f64,
) -> anyhow::Result<BackupRun> {
    if heaters.len() != loads.household_count() {
        anyhow::bail!(
            "Expected a backup heater for each of the {} households, got {}",
            loads.household_count(),
            heaters.len()
        );
    }
    let len = demand.tank_unmet.len();

    let households = heaters
        .par_iter()
        .enumerate()
        .map(|(household, heater)| heater.household_series(household, loads, demand))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut project = BackupSeries::zeros(len);
    for series in &households {
        project.accumulate(series);
    }
    check_backup_totals(&project, &households, timestep)?;

    let (pv_remaining, pv_used) = match demand.pv_available {
        Some(pv_available) => pv_available
            .iter()
            .zip(&project.gross_energy_use)
            .map(|(pv, gross)| {
                let remaining = max_of_2(pv - gross, 0.);
                (remaining, pv - remaining)
            })
            .unzip(),
        None => (vec![0.; len], vec![0.; len]),
    };

    Ok(BackupRun {
        project,
        households,
        pv_remaining,
        pv_used,
    })
}

/// The project energy use must match the sum over households to four decimals.
fn check_backup_totals(
    project: &BackupSeries,
    households: &[BackupSeries],
    timestep: f64,
) -> Result<(), BackupMismatchError> {
    let project_total = project.energy_use_total(timestep);
    let household_sum = households
        .iter()
        .map(|series| series.energy_use_total(timestep))
        .sum::<f64>();

    if !is_close!(project_total, household_sum, abs_tol = 1e-4) {
        return Err(BackupMismatchError {
            project: project_total,
            household_sum,
        });
    }
    Ok(())
}

/// Distribution losses while the backup is on: the loss, capped at the unmet heat, in the
/// timesteps with unmet heat.
pub fn dist_loss_at_backup(dist_loss: f64, tank_unmet: f64) -> f64 {
    if tank_unmet > 0. {
        min_of_2(dist_loss, tank_unmet)
    } else {
        0.
    }
}
