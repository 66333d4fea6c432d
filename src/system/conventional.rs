use crate::core::storage::gas_tank::{GasTank, DEFAULT_SURROUNDING_TEMP};
use crate::system::results::{
    HouseholdAnnualResult, ProjectAnnualResult, SimulationResults, TimestepResult,
};
use crate::system::System;

/// A single gas tank water heater serving the whole project load. This is the baseline the
/// solar systems are compared against, so it has no solar gain, distribution losses or
/// electricity use.
pub(crate) fn simulate_gas_tank(
    system: &System,
    gas_tank: &GasTank,
) -> anyhow::Result<SimulationResults> {
    let loads = &system.loads;
    let weather = &system.weather;
    let calendar = weather.calendar();
    let timestep = system.simulation_time.step();

    let mut results = vec![TimestepResult::default(); system.simulation_time.result_len()];
    results[0] = system.seed_record();

    for t_it in system.simulation_time.iter() {
        let ts = t_it.index;
        let conditions = weather.at(ts);
        let load = loads.project()[ts];
        let output = gas_tank.gas_tank_wh(load, conditions.main_temp, DEFAULT_SURROUNDING_TEMP);

        results[ts + 1] = TimestepResult {
            project_load: load,
            ambient_temp: conditions.ambient_temp,
            wet_bulb_temp: conditions.wet_bulb_temp,
            main_temp: conditions.main_temp,
            demand: output.demand,
            demand_total: output.demand,
            delivered: output.delivered,
            gas_use: output.gas_use,
            gas_use_no_dist: output.gas_use,
            ..Default::default()
        };
    }

    let project = ProjectAnnualResult {
        tank_upper_temp: None,
        tank_lower_temp: None,
        solar_fraction: 0.,
        max_load_gallons: loads.max_in_gallons(),
        ..ProjectAnnualResult::from_timesteps(&results, calendar, timestep)
    };

    // standby gas use is not tied to any draw, so everything is split by the share of the
    // total draw over the run
    let households = system
        .household_ids
        .iter()
        .enumerate()
        .map(|(household, id)| {
            let share = loads.annual_share(household);
            HouseholdAnnualResult {
                id: *id,
                occupancy: loads.occupancies()[household],
                demand: project.demand * share,
                delivered: project.delivered * share,
                gas_use: project.gas_use.scale(share),
                gas_use_no_dist: project.gas_use_no_dist.scale(share),
                ..Default::default()
            }
        })
        .collect();

    Ok(SimulationResults {
        archetype: system.archetype,
        timesteps: results,
        calendar: calendar.to_vec(),
        households,
        project,
    })
}

#[cfg(test)]
mod tests {
    use crate::core::parameters::{ComponentKind, ComponentSizes};
    use crate::input::Archetype;
    use crate::system::tests::household;
    use crate::system::System;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_meet_project_load_with_gas_only() {
        let households = [
            household(1, 3, vec![0., 0.02, 0.01, 0.]),
            household(2, 1, vec![0., 0., 0.01, 0.]),
        ];
        let sizes: ComponentSizes = [(ComponentKind::GasTankWaterHeater, 0.3)]
            .into_iter()
            .collect();
        let results = System::new(Archetype::GasTankWh, None, &sizes, None, &households, None, 1.)
            .unwrap()
            .simulate()
            .unwrap();
        let project = &results.project;

        assert_eq!(results.timesteps.len(), 5);
        assert_eq!(results.timesteps[0].gas_use, 0.);
        assert!(results.timesteps[1].gas_use > 0.);
        assert_eq!(results.timesteps[1].delivered, 0.);
        assert_eq!(project.unmet, 0.);
        assert_eq!(project.dumped, 0.);
        assert_eq!(project.dist_loss, 0.);
        assert_eq!(project.el_use.total, 0.);
        assert_eq!(project.solar_fraction, 0.);
        assert_eq!(project.tank_upper_temp, None);
        assert_eq!(project.gas_use, project.gas_use_no_dist);
        assert_eq!(project.delivered, project.demand);

        assert_relative_eq!(results.households[0].gas_use.total, project.gas_use.total * 0.75);
        assert_relative_eq!(
            results.households.iter().map(|h| h.delivered).sum::<f64>(),
            project.delivered,
            max_relative = 1e-12
        );
    }
}
