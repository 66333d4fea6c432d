use crate::core::parameters::{ParameterRecord, SizeRecord};
use crate::weather::Season;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::{BufReader, Read};
use strum_macros::{Display, EnumIter};

pub fn ingest_for_processing(json: impl Read) -> anyhow::Result<ProjectInput> {
    ProjectInput::init_with_json(json)
}

/// The system configurations which can be simulated
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Archetype {
    /// Conventional gas tank water heater at project level
    GasTankWh,
    /// Solar thermal system with instantaneous gas backup at each household
    SolarThermalNew,
    /// Solar thermal system retaining the gas tank water heater of each household as backup
    SolarThermalRetrofit,
    /// Heat pump tank partially powered by PV, with electric resistance backup at each
    /// household
    SolarElectric,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct HouseholdInput {
    pub id: u32,
    #[validate(minimum = 1)]
    pub occupancy: u32,
    /// Hot water draw per timestep, in m3/h
    pub draw_volumes: Vec<f64>,
    /// Sizes of this household's backup heater
    #[serde(default)]
    pub backup_sizes: Vec<SizeRecord>,
}

/// Weather for one timestep, temperatures in deg C
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WeatherRecord {
    pub t_amb_c: f64,
    #[serde(default)]
    pub t_wet_bulb_c: Option<f64>,
    /// Used to approximate the wet bulb temperature when it is not given, in percent
    #[serde(default)]
    #[validate(minimum = 0.)]
    #[validate(maximum = 100.)]
    pub relative_humidity: Option<f64>,
    /// in W/m2
    #[validate(minimum = 0.)]
    pub irradiance_on_tilt: f64,
    pub t_main_c: f64,
    #[validate(minimum = 1)]
    #[validate(maximum = 12)]
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    #[serde(default)]
    pub season: Option<Season>,
}

fn default_timestep() -> f64 {
    1.
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProjectInput {
    pub archetype: Archetype,
    /// in hours
    #[serde(default = "default_timestep")]
    #[validate(exclusive_minimum = 0.)]
    pub timestep: f64,
    /// Main system parameters; without them every component runs on its defaults
    #[serde(default)]
    pub component_parameters: Option<Vec<ParameterRecord>>,
    #[serde(default)]
    pub component_sizes: Vec<SizeRecord>,
    #[serde(default)]
    pub backup_parameters: Option<Vec<ParameterRecord>>,
    #[validate(min_items = 1)]
    #[validate]
    pub households: Vec<HouseholdInput>,
    #[serde(default)]
    #[validate]
    pub weather: Option<Vec<WeatherRecord>>,
}

impl ProjectInput {
    pub fn init_with_json(json: impl Read) -> anyhow::Result<Self> {
        let reader = BufReader::new(json);

        let input: Self = serde_json::from_reader(reader)?;
        input
            .validate()
            .map_err(|errors| anyhow::anyhow!("Input failed validation: {errors}"))?;
        input.check_consistency()?;

        Ok(input)
    }

    /// Number of simulated timesteps, taken from the household load profiles
    pub fn total_steps(&self) -> usize {
        self.households
            .first()
            .map_or(0, |household| household.draw_volumes.len())
    }

    fn check_consistency(&self) -> anyhow::Result<()> {
        let total_steps = self.total_steps();
        if total_steps == 0 {
            anyhow::bail!("Household load profiles must have at least one timestep");
        }
        if let Some(household) = self
            .households
            .iter()
            .find(|household| household.draw_volumes.len() != total_steps)
        {
            anyhow::bail!(
                "Load profile of household {} has {} timesteps, expected {total_steps}",
                household.id,
                household.draw_volumes.len()
            );
        }
        if let Some(household) = self
            .households
            .iter()
            .find(|household| household.draw_volumes.iter().any(|volume| *volume < 0.))
        {
            anyhow::bail!("Load profile of household {} has negative draws", household.id);
        }
        if let Some(id) = self.households.iter().map(|household| household.id).duplicates().next() {
            anyhow::bail!("Household id {id} was given more than once");
        }
        if let Some(weather) = &self.weather {
            if weather.len() != total_steps {
                anyhow::bail!(
                    "Weather has {} timesteps while the loads have {total_steps}",
                    weather.len()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::ComponentKind;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[fixture]
    fn input_json() -> serde_json::Value {
        json!({
            "archetype": "solar_thermal_new",
            "component_parameters": [
                {"component": "solar collector", "parameter": "interc hwb", "value": 0.753, "unit": "-"}
            ],
            "component_sizes": [
                {"component": "solar collector", "size": 20.0, "unit": "m2"}
            ],
            "households": [
                {"id": 1, "occupancy": 4, "draw_volumes": [0.0, 0.01, 0.02],
                 "backup_sizes": [{"component": "gas burner", "size": 24000.0}]},
                {"id": 2, "occupancy": 2, "draw_volumes": [0.01, 0.0, 0.0]}
            ],
            "weather": [
                {"t_amb_c": 12.0, "t_wet_bulb_c": 9.0, "irradiance_on_tilt": 0.0, "t_main_c": 15.0,
                 "month": 1, "day": 1, "hour": 1, "season": "winter"},
                {"t_amb_c": 12.5, "relative_humidity": 60.0, "irradiance_on_tilt": 10.0,
                 "t_main_c": 15.0, "month": 1, "day": 1, "hour": 2},
                {"t_amb_c": 13.0, "t_wet_bulb_c": 9.5, "irradiance_on_tilt": 50.0, "t_main_c": 15.0,
                 "month": 1, "day": 1, "hour": 3}
            ]
        })
    }

    fn ingest(value: &serde_json::Value) -> anyhow::Result<ProjectInput> {
        ingest_for_processing(value.to_string().as_bytes())
    }

    #[rstest]
    fn should_ingest_project_input(input_json: serde_json::Value) {
        let input = ingest(&input_json).unwrap();

        assert_eq!(input.archetype, Archetype::SolarThermalNew);
        assert_eq!(input.timestep, 1.);
        assert_eq!(input.total_steps(), 3);
        assert_eq!(input.households[0].backup_sizes[0].component, ComponentKind::GasBurner);
        assert_eq!(input.backup_parameters, None);
        assert_eq!(input.weather.unwrap()[1].relative_humidity, Some(60.));
    }

    #[rstest]
    fn should_reject_unknown_archetype(mut input_json: serde_json::Value) {
        input_json["archetype"] = json!("solar_thermal_oil");
        assert!(ingest(&input_json).is_err());
    }

    #[rstest]
    fn should_reject_mismatched_profile_lengths(mut input_json: serde_json::Value) {
        input_json["households"][1]["draw_volumes"] = json!([0.01, 0.0]);
        assert!(ingest(&input_json).is_err());
    }

    #[rstest]
    fn should_reject_duplicate_household_ids(mut input_json: serde_json::Value) {
        input_json["households"][1]["id"] = json!(1);
        assert!(ingest(&input_json).is_err());
    }

    #[rstest]
    fn should_reject_mismatched_weather_length(mut input_json: serde_json::Value) {
        input_json["weather"].as_array_mut().unwrap().pop();
        assert!(ingest(&input_json).is_err());
    }

    #[rstest]
    fn should_reject_unoccupied_household(mut input_json: serde_json::Value) {
        input_json["households"][0]["occupancy"] = json!(0);
        assert!(ingest(&input_json).is_err());
    }

    #[rstest]
    fn should_reject_unknown_fields(mut input_json: serde_json::Value) {
        input_json["households"][0]["pets"] = json!(2);
        assert!(ingest(&input_json).is_err());
    }

    #[rstest]
    fn should_name_archetypes_consistently() {
        for archetype in Archetype::iter() {
            assert_eq!(
                serde_json::to_value(archetype).unwrap(),
                json!(archetype.to_string())
            );
        }
        assert_eq!(Archetype::iter().count(), 4);
    }
}
