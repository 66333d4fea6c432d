use crate::core::units::celsius_to_kelvin;
use crate::input::WeatherRecord;
use crate::simulation_time::SimulationTime;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::info;

const DEFAULT_AMBIENT_TEMP: f64 = 293.15; // K
const DEFAULT_WET_BULB_TEMP: f64 = 283.15; // K
const DEFAULT_IRRADIANCE: f64 = 800.; // W/m2
const DEFAULT_MAIN_TEMP: f64 = 291.15; // K

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Season {
    Summer,
    Winter,
}

impl Season {
    /// May to September is summer
    pub fn from_month(month: u32) -> Self {
        if (5..=9).contains(&month) {
            Self::Summer
        } else {
            Self::Winter
        }
    }
}

/// Weather for one timestep, temperatures in K
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimestepWeather {
    pub ambient_temp: f64,
    pub wet_bulb_temp: f64,
    /// Total irradiance on the tilted collector or panel surface, in W/m2
    pub irradiance: f64,
    pub main_temp: f64,
}

impl Default for TimestepWeather {
    fn default() -> Self {
        Self {
            ambient_temp: DEFAULT_AMBIENT_TEMP,
            wet_bulb_temp: DEFAULT_WET_BULB_TEMP,
            irradiance: DEFAULT_IRRADIANCE,
            main_temp: DEFAULT_MAIN_TEMP,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalendarStamp {
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub season: Season,
}

impl CalendarStamp {
    /// Stamp of the seed entry that precedes the first timestep in result series
    fn seed() -> Self {
        Self {
            month: 1,
            day: 1,
            hour: 1,
            season: Season::Winter,
        }
    }
}

/// Weather inputs for a run, one record per simulated timestep, and the calendar of the result
/// series, which carries a leading seed entry.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherSeries {
    records: Vec<TimestepWeather>,
    calendar: Vec<CalendarStamp>,
}

impl WeatherSeries {
    pub fn from_records(records: &[WeatherRecord]) -> anyhow::Result<Self> {
        let mut weather = Vec::with_capacity(records.len());
        let mut calendar = Vec::with_capacity(records.len() + 1);
        calendar.push(CalendarStamp::seed());

        for (index, record) in records.iter().enumerate() {
            let wet_bulb_c = match (record.t_wet_bulb_c, record.relative_humidity) {
                (Some(wet_bulb_c), _) => wet_bulb_c,
                (None, Some(relative_humidity)) => {
                    stull_wet_bulb_temp(record.t_amb_c, relative_humidity)
                }
                (None, None) => anyhow::bail!(
                    "Weather record {index} has neither a wet bulb temperature nor a relative humidity"
                ),
            };
            weather.push(TimestepWeather {
                ambient_temp: celsius_to_kelvin(record.t_amb_c)?,
                wet_bulb_temp: celsius_to_kelvin(wet_bulb_c)?,
                irradiance: record.irradiance_on_tilt,
                main_temp: celsius_to_kelvin(record.t_main_c)?,
            });
            calendar.push(CalendarStamp {
                month: record.month,
                day: record.day,
                hour: record.hour,
                season: record.season.unwrap_or_else(|| Season::from_month(record.month)),
            });
        }

        info!("Assigned weather data timeseries.");
        Ok(Self {
            records: weather,
            calendar,
        })
    }

    /// Constant default conditions for every timestep, with the calendar taken from the
    /// simulation time.
    pub fn default_for(simulation_time: &SimulationTime) -> Self {
        info!(
            "No weather data was passed. Setting default values for ambient temperature, \
            {DEFAULT_AMBIENT_TEMP} K, and solar irradiation, {DEFAULT_IRRADIANCE} W/m2."
        );
        let calendar = std::iter::once(CalendarStamp::seed())
            .chain(simulation_time.iter().map(|t_it| {
                let month = t_it.current_month();
                CalendarStamp {
                    month,
                    day: t_it.day_of_month(),
                    hour: t_it.hour_of_day(),
                    season: Season::from_month(month),
                }
            }))
            .collect();

        Self {
            records: vec![TimestepWeather::default(); simulation_time.total_steps()],
            calendar,
        }
    }

    /// Number of simulated timesteps
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Weather for simulated timestep `ts`
    pub fn at(&self, ts: usize) -> &TimestepWeather {
        &self.records[ts]
    }

    pub fn records(&self) -> &[TimestepWeather] {
        &self.records
    }

    /// Calendar of the result series, seed entry first
    pub fn calendar(&self) -> &[CalendarStamp] {
        &self.calendar
    }

    /// Whether result entry `index` falls in the given season
    pub fn in_season(&self, index: usize, season: Season) -> bool {
        self.calendar[index].season == season
    }

    /// Water main temperature of the first timestep, used to seed the tank
    pub fn first_main_temp(&self) -> f64 {
        self.records
            .first()
            .map_or(DEFAULT_MAIN_TEMP, |record| record.main_temp)
    }
}

/// Wet bulb temperature from dry bulb temperature and relative humidity at standard sea level
/// pressure, in deg C. Stull (2011), Wet-Bulb Temperature from Relative Humidity and Air
/// Temperature, J. Appl. Meteor. Climatol. 50.
///
/// Arguments:
/// * `dry_bulb_c` - in deg C
/// * `relative_humidity` - in percent
pub fn stull_wet_bulb_temp(dry_bulb_c: f64, relative_humidity: f64) -> f64 {
    let rh = relative_humidity;
    dry_bulb_c * (0.151977 * (rh + 8.313659).sqrt()).atan() + (dry_bulb_c + rh).atan()
        - (rh - 1.676331).atan()
        + 0.00391838 * rh.powf(1.5) * (0.023101 * rh).atan()
        - 4.686035
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn record(month: u32, season: Option<Season>) -> WeatherRecord {
        WeatherRecord {
            t_amb_c: 20.,
            t_wet_bulb_c: None,
            relative_humidity: Some(50.),
            irradiance_on_tilt: 350.,
            t_main_c: 15.,
            month,
            day: 1,
            hour: 13,
            season,
        }
    }

    #[rstest]
    fn should_approximate_wet_bulb_temperature() {
        // worked example from the paper
        assert_relative_eq!(stull_wet_bulb_temp(20., 50.), 13.7, epsilon = 0.05);
    }

    #[rstest]
    #[case(1, Season::Winter)]
    #[case(4, Season::Winter)]
    #[case(5, Season::Summer)]
    #[case(9, Season::Summer)]
    #[case(10, Season::Winter)]
    fn should_derive_season_from_month(#[case] month: u32, #[case] expected: Season) {
        assert_eq!(Season::from_month(month), expected);
    }

    #[rstest]
    fn should_convert_records_and_prepend_seed_to_calendar() {
        let series =
            WeatherSeries::from_records(&[record(7, None), record(7, Some(Season::Winter))])
                .unwrap();

        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.at(0).ambient_temp, 293.15);
        assert_relative_eq!(series.at(1).main_temp, 288.15);
        assert_relative_eq!(series.at(0).wet_bulb_temp, 273.15 + stull_wet_bulb_temp(20., 50.));
        assert_eq!(series.calendar().len(), 3);
        assert_eq!(series.calendar()[0].season, Season::Winter);
        assert!(series.in_season(1, Season::Summer));
        assert!(series.in_season(2, Season::Winter));
    }

    #[rstest]
    fn should_reject_record_without_humidity_information() {
        let record = WeatherRecord {
            relative_humidity: None,
            ..record(1, None)
        };
        assert!(WeatherSeries::from_records(&[record]).is_err());
    }

    #[rstest]
    fn should_default_weather_over_simulation_time() {
        let simtime = SimulationTime::new(1., 8760).unwrap();
        let series = WeatherSeries::default_for(&simtime);

        assert_eq!(series.len(), 8760);
        assert_eq!(*series.at(100), TimestepWeather::default());
        assert_eq!(series.first_main_temp(), 291.15);
        // hour 4344 is the first hour of July
        assert_eq!(series.calendar()[4345].month, 7);
        assert!(series.in_season(4345, Season::Summer));
    }
}
