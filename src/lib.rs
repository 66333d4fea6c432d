#![allow(clippy::too_many_arguments)]

mod compare_floats;
pub mod core;
pub mod errors;
pub mod input;
pub mod output;
pub mod simulation_time;
mod statistics;
pub mod system;
pub mod weather;

#[macro_use]
extern crate is_close;

use crate::errors::{MswhCoreError, MswhError, OutputError};
use crate::input::ingest_for_processing;
use crate::output::Output;
use crate::system::results::{HouseholdAnnualResult, TimestepResult};
pub use crate::system::results::SimulationResults;
use crate::system::System;
use csv::WriterBuilder;
use std::io::Read;
use tracing::info;

/// Simulate the project described by a JSON input document and write the timestep, household
/// and project results to the output.
pub fn run_project(input: impl Read, output: impl Output) -> Result<SimulationResults, MswhError> {
    let input = ingest_for_processing(input)?;
    let system = System::from_input(&input)?;

    let results = system
        .simulate()
        .map_err(|err| MswhError::FailureInCalculation(MswhCoreError::new(err)))?;

    if !output.is_noop() {
        write_output_files(&output, &results)
            .map_err(|err| MswhError::ErrorInOutput(OutputError::new(err)))?;
    }

    Ok(results)
}

fn write_output_files(output: &impl Output, results: &SimulationResults) -> anyhow::Result<()> {
    write_timestep_output_file(output, results)?;
    write_household_output_file(output, &results.households)?;
    write_project_output_file(output, results)?;
    Ok(())
}

fn write_timestep_output_file(
    output: &impl Output,
    results: &SimulationResults,
) -> anyhow::Result<()> {
    info!("writing out timestep results");
    let writer = output.writer_for_location_key("timestep")?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    let mut headings = vec!["Timestep"];
    let mut units_row = vec!["[count]"];
    for (heading, unit) in TimestepResult::COLUMNS {
        headings.push(heading);
        units_row.push(unit);
    }
    writer.write_record(&headings)?;
    writer.write_record(&units_row)?;

    for (t_idx, (result, stamp)) in results.timesteps.iter().zip(&results.calendar).enumerate() {
        let mut row = vec![t_idx.to_string()];
        row.extend(result.values(stamp).into_iter().map(|val| val.to_string()));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_household_output_file(
    output: &impl Output,
    households: &[HouseholdAnnualResult],
) -> anyhow::Result<()> {
    info!("writing out household results");
    let writer = output.writer_for_location_key("households")?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    writer.write_record(HouseholdAnnualResult::COLUMNS.map(|(heading, _)| heading))?;
    writer.write_record(HouseholdAnnualResult::COLUMNS.map(|(_, unit)| unit))?;

    for household in households {
        writer.write_record(household.values().into_iter().map(|val| val.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

fn write_project_output_file(
    output: &impl Output,
    results: &SimulationResults,
) -> anyhow::Result<()> {
    info!("writing out project results");
    let writer = output.writer_for_location_key("project")?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    writer.write_record(["Quantity", "Value", "Unit"])?;
    writer.write_record(["archetype", &results.archetype.to_string(), "[name]"])?;
    for (quantity, value, unit) in results.project.rows() {
        writer.write_record([quantity.as_str(), &value.to_string(), unit])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Archetype;
    use crate::output::SinkOutput;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct MemoryOutput {
        files: RefCell<IndexMap<String, Rc<RefCell<Vec<u8>>>>>,
    }

    impl MemoryOutput {
        fn contents(&self, location_key: &str) -> String {
            String::from_utf8(self.files.borrow()[location_key].borrow().clone()).unwrap()
        }
    }

    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Output for &MemoryOutput {
        fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
            let buffer = Rc::new(RefCell::new(vec![]));
            self.files
                .borrow_mut()
                .insert(location_key.to_string(), buffer.clone());
            Ok(SharedBuffer(buffer))
        }
    }

    #[derive(Debug)]
    struct FailingOutput;

    impl Output for FailingOutput {
        fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
            Err::<std::io::Sink, _>(anyhow::anyhow!("no space left for {location_key}"))
        }
    }

    #[fixture]
    fn input_json() -> serde_json::Value {
        json!({
            "archetype": "solar_thermal_new",
            "component_sizes": [
                {"component": "solar collector", "size": 10.0, "unit": "m2"},
                {"component": "thermal storage tank", "size": 0.3, "unit": "m3"}
            ],
            "households": [
                {"id": 11, "occupancy": 3, "draw_volumes": [0.0, 0.01, 0.02, 0.0]},
                {"id": 12, "occupancy": 1, "draw_volumes": [0.0, 0.0, 0.01, 0.01]}
            ]
        })
    }

    #[rstest]
    fn should_write_three_result_documents(input_json: serde_json::Value) {
        let output = MemoryOutput::default();
        let results = run_project(input_json.to_string().as_bytes(), &output).unwrap();

        assert_eq!(results.archetype, Archetype::SolarThermalNew);
        assert_eq!(
            output.files.borrow().keys().cloned().collect::<Vec<_>>(),
            vec!["timestep", "households", "project"]
        );

        let timestep = output.contents("timestep");
        let mut lines = timestep.lines();
        assert!(lines.next().unwrap().starts_with("Timestep,project load,"));
        assert!(lines.next().unwrap().starts_with("[count],[m3/h],"));
        // seed record plus one per timestep
        assert_eq!(timestep.lines().count(), 2 + 5);

        let households = output.contents("households");
        assert_eq!(households.lines().count(), 2 + 2);
        assert!(households.lines().nth(2).unwrap().starts_with("11,3,"));

        let project = output.contents("project");
        assert!(project.contains("archetype,solar_thermal_new,[name]"));
        assert!(project.lines().any(|line| line.starts_with("solar fraction,")));
    }

    #[rstest]
    fn should_report_invalid_input_as_invalid_request(mut input_json: serde_json::Value) {
        input_json["households"][0]["draw_volumes"] = json!([0.0, -0.01, 0.0, 0.0]);
        let result = run_project(input_json.to_string().as_bytes(), SinkOutput);
        assert!(matches!(result, Err(MswhError::InvalidRequest(_))));
    }

    #[rstest]
    fn should_report_missing_parameter_as_invalid_request(mut input_json: serde_json::Value) {
        input_json["component_parameters"] = json!([
            {"component": "solar collector", "parameter": "interc hwb", "value": 0.753}
        ]);
        let result = run_project(input_json.to_string().as_bytes(), SinkOutput);
        assert!(matches!(result, Err(MswhError::InvalidRequest(_))));
    }

    #[rstest]
    fn should_report_failing_output(input_json: serde_json::Value) {
        let result = run_project(input_json.to_string().as_bytes(), FailingOutput);
        assert!(matches!(result, Err(MswhError::ErrorInOutput(_))));
    }

    #[rstest]
    fn should_skip_writing_to_sink(input_json: serde_json::Value) {
        let results = run_project(input_json.to_string().as_bytes(), SinkOutput).unwrap();
        assert_eq!(results.households.len(), 2);
        assert_eq!(results.timesteps.len(), 5);
    }
}
