use crate::core::units::{
    cubic_metres_to_gallons, gallons_to_cubic_metres, square_feet_to_square_metres,
};
use crate::input::HouseholdInput;

// CSI-Thermal program sizing rules
const COLLECTOR_SQFT_PER_DAILY_GALLON: f64 = 1.2;
const TANK_GALLONS_PER_COLLECTOR_SQFT: f64 = 1.3;

/// Aggregated hot water draw of all households in a project, with each household's share of it.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectLoads {
    /// Project draw per timestep, in m3/h
    project: Vec<f64>,
    /// Peak project draw, in m3/h
    max: f64,
    household_draws: Vec<Vec<f64>>,
    /// Per household, share of the project draw aligned with result series: entry 0 is the
    /// seed and is zero, entry `ts + 1` is the share at timestep `ts`
    shares: Vec<Vec<f64>>,
    /// Per household, share of the total project draw over the run
    annual_shares: Vec<f64>,
    occupancies: Vec<u32>,
}

impl ProjectLoads {
    pub fn new(households: &[HouseholdInput]) -> anyhow::Result<Self> {
        let Some(first) = households.first() else {
            anyhow::bail!("A project needs at least one household");
        };
        let total_steps = first.draw_volumes.len();

        let mut project = vec![0.; total_steps];
        for household in households {
            if household.draw_volumes.len() != total_steps {
                anyhow::bail!(
                    "Load profile of household {} has {} timesteps, expected {total_steps}",
                    household.id,
                    household.draw_volumes.len()
                );
            }
            for (total, draw) in project.iter_mut().zip(&household.draw_volumes) {
                *total += draw;
            }
        }
        let max = project.iter().copied().fold(0., f64::max);
        let project_total = project.iter().sum::<f64>();

        let shares = households
            .iter()
            .map(|household| {
                std::iter::once(0.)
                    .chain(household.draw_volumes.iter().zip(&project).map(
                        |(draw, total)| if *total == 0. { 0. } else { draw / total },
                    ))
                    .collect()
            })
            .collect();
        let annual_shares = households
            .iter()
            .map(|household| {
                if project_total == 0. {
                    0.
                } else {
                    household.draw_volumes.iter().sum::<f64>() / project_total
                }
            })
            .collect();

        Ok(Self {
            project,
            max,
            household_draws: households
                .iter()
                .map(|household| household.draw_volumes.clone())
                .collect(),
            shares,
            annual_shares,
            occupancies: households.iter().map(|household| household.occupancy).collect(),
        })
    }

    /// Whether the project serves more than one household
    pub fn is_community(&self) -> bool {
        self.household_draws.len() > 1
    }

    pub fn household_count(&self) -> usize {
        self.household_draws.len()
    }

    pub fn project(&self) -> &[f64] {
        &self.project
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn max_in_gallons(&self) -> f64 {
        cubic_metres_to_gallons(self.max)
    }

    pub fn household_draws(&self, household: usize) -> &[f64] {
        &self.household_draws[household]
    }

    pub fn share(&self, household: usize) -> &[f64] {
        &self.shares[household]
    }

    pub fn annual_share(&self, household: usize) -> f64 {
        self.annual_shares[household]
    }

    /// Daily hot water demand of all households estimated from their occupancy, in US gallons
    pub fn estimated_daily_demand_gallons(&self) -> f64 {
        self.occupancies
            .iter()
            .map(|occupancy| estimate_daily_demand_gallons(*occupancy))
            .sum()
    }

    /// Solar collector gross area (in m2) and solar tank volume (in m3) for the estimated daily
    /// demand, following the CSI-Thermal program sizing rules.
    pub fn solar_thermal_sizes(&self) -> (f64, f64) {
        let collector_sqft = self.estimated_daily_demand_gallons() * COLLECTOR_SQFT_PER_DAILY_GALLON;
        (
            square_feet_to_square_metres(collector_sqft),
            gallons_to_cubic_metres(collector_sqft * TANK_GALLONS_PER_COLLECTOR_SQFT),
        )
    }

    pub fn occupancies(&self) -> &[u32] {
        &self.occupancies
    }

    /// Sum over the timesteps of a result series weighted by a household's share, multiplied by
    /// the timestep
    pub fn household_total(&self, household: usize, series: &[f64], timestep: f64) -> f64 {
        self.share(household)
            .iter()
            .zip(series)
            .map(|(share, value)| share * value)
            .sum::<f64>()
            * timestep
    }
}

/// Split a project level value between households in proportion to their occupancy.
pub fn split_by_occupancy(value: f64, occupancies: &[u32]) -> Vec<f64> {
    let total_occupancy = occupancies.iter().sum::<u32>();
    occupancies
        .iter()
        .map(|occupancy| {
            if total_occupancy == 0 {
                0.
            } else {
                value * *occupancy as f64 / total_occupancy as f64
            }
        })
        .collect()
}

/// Daily hot water demand of a household, in US gallons, from the CSI-Thermal program
/// handbook: 20 gal for a single occupant, 35 gal for two and 10 gal for each further occupant.
pub fn estimate_daily_demand_gallons(occupancy: u32) -> f64 {
    match occupancy {
        0 => 0.,
        1 => 20.,
        occupancy => 35. + 10. * (occupancy - 2) as f64,
    }
}
