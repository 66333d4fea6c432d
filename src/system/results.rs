use crate::input::Archetype;
use crate::statistics::{grouped_means, mean};
use crate::weather::{CalendarStamp, Season};
use std::ops::Add;

/// Results of one timestep of a project simulation. Heat and power quantities are rates
/// averaged over the timestep, in W; temperatures in K; draws in m3/h.
///
/// Entry 0 of a result series is the seed record holding the initial conditions, entry
/// `ts + 1` holds the results of simulated timestep `ts`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimestepResult {
    pub project_load: f64,
    pub ambient_temp: f64,
    pub wet_bulb_temp: f64,
    pub main_temp: f64,
    /// Heat demand at the set point temperature
    pub demand: f64,
    /// Demand including distribution losses
    pub demand_total: f64,
    pub demand_balance: f64,
    /// Gross gain of the solar collector
    pub collector_gain: f64,
    /// Gain into the tank net of the coil efficiency, or heat pump output
    pub tank_gain: f64,
    pub tank_loss_upper: f64,
    pub tank_loss_lower: f64,
    pub tank_delivered: f64,
    pub tank_unmet: f64,
    pub dumped: f64,
    pub overcooled: f64,
    pub tank_upper_temp: f64,
    pub tank_lower_temp: f64,
    pub collector_return_temp: f64,
    pub set_temp: f64,
    /// Temperature drop along the distribution network, in K
    pub dist_dt: f64,
    pub dist_loss: f64,
    /// Distribution losses while the backup heater is on
    pub dist_loss_at_backup: f64,
    /// Fraction of the timestep with flow in the distribution network
    pub pump_on_fraction: f64,
    pub backup_delivered: f64,
    /// Tank and backup delivered heat
    pub delivered: f64,
    /// Heat neither the tank nor the backups could supply
    pub unmet: f64,
    pub gas_use: f64,
    /// Gas use of the backups when distribution losses are not modelled
    pub gas_use_no_dist: f64,
    /// Electricity drawn from the grid
    pub el_use: f64,
    /// Electricity use before any PV offset
    pub gross_el_use: f64,
    pub hp_el_use: f64,
    /// Electric resistance backup use before any PV offset
    pub el_res_gross_use: f64,
    pub pump_el_use: f64,
    pub pv_ac: f64,
    pub pv_dc: f64,
    pub pv_to_hp: f64,
    pub pv_to_el_res: f64,
    pub pv_surplus: f64,
}

impl TimestepResult {
    /// Column headings and units for tabular output, in the order of `values`
    pub const COLUMNS: [(&'static str, &'static str); 41] = [
        ("project load", "[m3/h]"),
        ("ambient temperature", "[K]"),
        ("wet bulb temperature", "[K]"),
        ("water main temperature", "[K]"),
        ("demand", "[W]"),
        ("demand with distribution losses", "[W]"),
        ("demand balance", "[W]"),
        ("collector gain", "[W]"),
        ("tank gain", "[W]"),
        ("tank loss upper", "[W]"),
        ("tank loss lower", "[W]"),
        ("tank delivered", "[W]"),
        ("tank unmet", "[W]"),
        ("dumped", "[W]"),
        ("overcooled", "[W]"),
        ("tank upper temperature", "[K]"),
        ("tank lower temperature", "[K]"),
        ("collector return temperature", "[K]"),
        ("set point temperature", "[K]"),
        ("distribution temperature drop", "[K]"),
        ("distribution loss", "[W]"),
        ("distribution loss at backup", "[W]"),
        ("pump on fraction", "[ratio]"),
        ("backup delivered", "[W]"),
        ("delivered", "[W]"),
        ("unmet", "[W]"),
        ("gas use", "[W]"),
        ("gas use without distribution", "[W]"),
        ("electricity use", "[W]"),
        ("gross electricity use", "[W]"),
        ("heat pump electricity use", "[W]"),
        ("electric resistance gross use", "[W]"),
        ("pump electricity use", "[W]"),
        ("pv ac", "[W]"),
        ("pv dc", "[W]"),
        ("pv to heat pump", "[W]"),
        ("pv to electric resistance", "[W]"),
        ("pv surplus", "[W]"),
        ("month", "[count]"),
        ("hour", "[count]"),
        ("summer", "[flag]"),
    ];

    /// Values in the order of `COLUMNS`, with the calendar of the entry appended
    pub fn values(&self, stamp: &CalendarStamp) -> Vec<f64> {
        vec![
            self.project_load,
            self.ambient_temp,
            self.wet_bulb_temp,
            self.main_temp,
            self.demand,
            self.demand_total,
            self.demand_balance,
            self.collector_gain,
            self.tank_gain,
            self.tank_loss_upper,
            self.tank_loss_lower,
            self.tank_delivered,
            self.tank_unmet,
            self.dumped,
            self.overcooled,
            self.tank_upper_temp,
            self.tank_lower_temp,
            self.collector_return_temp,
            self.set_temp,
            self.dist_dt,
            self.dist_loss,
            self.dist_loss_at_backup,
            self.pump_on_fraction,
            self.backup_delivered,
            self.delivered,
            self.unmet,
            self.gas_use,
            self.gas_use_no_dist,
            self.el_use,
            self.gross_el_use,
            self.hp_el_use,
            self.el_res_gross_use,
            self.pump_el_use,
            self.pv_ac,
            self.pv_dc,
            self.pv_to_hp,
            self.pv_to_el_res,
            self.pv_surplus,
            stamp.month as f64,
            stamp.hour as f64,
            if stamp.season == Season::Summer { 1. } else { 0. },
        ]
    }
}

/// Energy totals of a run split by season, in Wh
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeasonalTotal {
    pub total: f64,
    pub summer: f64,
    pub winter: f64,
}

impl SeasonalTotal {
    /// Split an already seasonal pair of totals
    pub fn from_parts(summer: f64, winter: f64) -> Self {
        Self {
            total: summer + winter,
            summer,
            winter,
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            total: self.total * factor,
            summer: self.summer * factor,
            winter: self.winter * factor,
        }
    }
}

impl Add for SeasonalTotal {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            summer: self.summer + other.summer,
            winter: self.winter + other.winter,
        }
    }
}

/// Project totals over a run. Energies in Wh, temperatures in K.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectAnnualResult {
    pub demand: f64,
    pub demand_total: f64,
    pub collector_gain: f64,
    pub tank_gain: f64,
    pub tank_loss_upper: f64,
    pub tank_loss_lower: f64,
    pub tank_delivered: f64,
    pub tank_unmet: f64,
    pub dumped: f64,
    pub overcooled: f64,
    pub dist_loss: f64,
    pub dist_loss_at_backup: SeasonalTotal,
    pub backup_delivered: f64,
    pub delivered: f64,
    pub unmet: f64,
    pub gas_use: SeasonalTotal,
    pub gas_use_no_dist: SeasonalTotal,
    pub el_use: SeasonalTotal,
    pub gross_el_use: f64,
    pub hp_el_use: f64,
    pub el_res_gross_use: f64,
    pub pump_el_use: f64,
    pub pv_ac: f64,
    pub pv_to_hp: f64,
    pub pv_to_el_res: f64,
    pub pv_surplus: f64,
    pub ambient_temp: f64,
    pub main_temp: f64,
    /// Mean tank temperatures, absent for systems without a thermal tank
    pub tank_upper_temp: Option<f64>,
    pub tank_lower_temp: Option<f64>,
    pub solar_fraction: f64,
    pub monthly_solar_fraction: Vec<(u32, f64)>,
    pub seasonal_solar_fraction: Vec<(Season, f64)>,
    pub solar_pump_hours: Option<f64>,
    pub distribution_pump_hours: Option<f64>,
    /// Relative error of the tank heat balance over the run
    pub tank_balance_error: Option<f64>,
    /// Relative error of the demand balance over the run
    pub demand_balance_error: Option<f64>,
    /// Peak project draw, in US gal/h
    pub max_load_gallons: f64,
    /// Number of converter outputs that were clamped to their physical range
    pub clamped_outputs: usize,
}

impl ProjectAnnualResult {
    /// Sum heat rates and average temperatures of a result series. Seasonal splits use the
    /// calendar of the result series; quantities without a single summation rule are left at
    /// their defaults.
    pub fn from_timesteps(
        results: &[TimestepResult],
        calendar: &[CalendarStamp],
        timestep: f64,
    ) -> Self {
        let total = |field: fn(&TimestepResult) -> f64| series_total(results, field, timestep);
        let seasonal =
            |field: fn(&TimestepResult) -> f64| seasonal_total(results, calendar, field, timestep);
        // the seed record holds initial conditions only
        let simulated = results.get(1..).unwrap_or_default();
        let temps =
            |field: fn(&TimestepResult) -> f64| mean(&simulated.iter().map(field).collect::<Vec<_>>());

        Self {
            demand: total(|r| r.demand),
            demand_total: total(|r| r.demand_total),
            collector_gain: total(|r| r.collector_gain),
            tank_gain: total(|r| r.tank_gain),
            tank_loss_upper: total(|r| r.tank_loss_upper),
            tank_loss_lower: total(|r| r.tank_loss_lower),
            tank_delivered: total(|r| r.tank_delivered),
            tank_unmet: total(|r| r.tank_unmet),
            dumped: total(|r| r.dumped),
            overcooled: total(|r| r.overcooled),
            dist_loss: total(|r| r.dist_loss),
            dist_loss_at_backup: seasonal(|r| r.dist_loss_at_backup),
            backup_delivered: total(|r| r.backup_delivered),
            delivered: total(|r| r.delivered),
            unmet: total(|r| r.unmet),
            gas_use: seasonal(|r| r.gas_use),
            gas_use_no_dist: seasonal(|r| r.gas_use_no_dist),
            el_use: seasonal(|r| r.el_use),
            gross_el_use: total(|r| r.gross_el_use),
            hp_el_use: total(|r| r.hp_el_use),
            el_res_gross_use: total(|r| r.el_res_gross_use),
            pump_el_use: total(|r| r.pump_el_use),
            pv_ac: total(|r| r.pv_ac),
            pv_to_hp: total(|r| r.pv_to_hp),
            pv_to_el_res: total(|r| r.pv_to_el_res),
            pv_surplus: total(|r| r.pv_surplus),
            ambient_temp: temps(|r| r.ambient_temp),
            main_temp: temps(|r| r.main_temp),
            tank_upper_temp: Some(temps(|r| r.tank_upper_temp)),
            tank_lower_temp: Some(temps(|r| r.tank_lower_temp)),
            ..Default::default()
        }
    }

    /// Quantity, value and unit rows for tabular output
    pub fn rows(&self) -> Vec<(String, f64, &'static str)> {
        let optional = |value: Option<f64>| value.unwrap_or(f64::NAN);
        let mut rows = vec![
            ("demand".to_string(), self.demand, "[Wh]"),
            ("demand with distribution losses".to_string(), self.demand_total, "[Wh]"),
            ("collector gain".to_string(), self.collector_gain, "[Wh]"),
            ("tank gain".to_string(), self.tank_gain, "[Wh]"),
            ("tank loss upper".to_string(), self.tank_loss_upper, "[Wh]"),
            ("tank loss lower".to_string(), self.tank_loss_lower, "[Wh]"),
            ("tank delivered".to_string(), self.tank_delivered, "[Wh]"),
            ("tank unmet".to_string(), self.tank_unmet, "[Wh]"),
            ("dumped".to_string(), self.dumped, "[Wh]"),
            ("overcooled".to_string(), self.overcooled, "[Wh]"),
            ("distribution loss".to_string(), self.dist_loss, "[Wh]"),
        ];
        rows.extend(seasonal_rows("distribution loss at backup", &self.dist_loss_at_backup));
        rows.extend([
            ("backup delivered".to_string(), self.backup_delivered, "[Wh]"),
            ("delivered".to_string(), self.delivered, "[Wh]"),
            ("unmet".to_string(), self.unmet, "[Wh]"),
        ]);
        rows.extend(seasonal_rows("gas use", &self.gas_use));
        rows.extend(seasonal_rows("gas use without distribution", &self.gas_use_no_dist));
        rows.extend(seasonal_rows("electricity use", &self.el_use));
        rows.extend([
            ("gross electricity use".to_string(), self.gross_el_use, "[Wh]"),
            ("heat pump electricity use".to_string(), self.hp_el_use, "[Wh]"),
            ("electric resistance gross use".to_string(), self.el_res_gross_use, "[Wh]"),
            ("pump electricity use".to_string(), self.pump_el_use, "[Wh]"),
            ("pv ac".to_string(), self.pv_ac, "[Wh]"),
            ("pv to heat pump".to_string(), self.pv_to_hp, "[Wh]"),
            ("pv to electric resistance".to_string(), self.pv_to_el_res, "[Wh]"),
            ("pv surplus".to_string(), self.pv_surplus, "[Wh]"),
            ("mean ambient temperature".to_string(), self.ambient_temp, "[K]"),
            ("mean water main temperature".to_string(), self.main_temp, "[K]"),
            ("mean tank upper temperature".to_string(), optional(self.tank_upper_temp), "[K]"),
            ("mean tank lower temperature".to_string(), optional(self.tank_lower_temp), "[K]"),
            ("solar fraction".to_string(), self.solar_fraction, "[ratio]"),
        ]);
        rows.extend(self.monthly_solar_fraction.iter().map(|(month, fraction)| {
            (format!("solar fraction month {month}"), *fraction, "[ratio]")
        }));
        rows.extend(self.seasonal_solar_fraction.iter().map(|(season, fraction)| {
            (format!("solar fraction {season}"), *fraction, "[ratio]")
        }));
        rows.extend([
            ("solar pump operating hours".to_string(), optional(self.solar_pump_hours), "[h]"),
            (
                "distribution pump operating hours".to_string(),
                optional(self.distribution_pump_hours),
                "[h]",
            ),
            ("tank balance error".to_string(), optional(self.tank_balance_error), "[ratio]"),
            ("demand balance error".to_string(), optional(self.demand_balance_error), "[ratio]"),
            ("peak load".to_string(), self.max_load_gallons, "[gal/h]"),
            ("clamped outputs".to_string(), self.clamped_outputs as f64, "[count]"),
        ]);
        rows
    }
}

fn seasonal_rows(quantity: &str, value: &SeasonalTotal) -> [(String, f64, &'static str); 3] {
    [
        (quantity.to_string(), value.total, "[Wh]"),
        (format!("{quantity} summer"), value.summer, "[Wh]"),
        (format!("{quantity} winter"), value.winter, "[Wh]"),
    ]
}

/// Totals over a run for one household. Energies in Wh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HouseholdAnnualResult {
    pub id: u32,
    pub occupancy: u32,
    pub demand: f64,
    pub tank_delivered: f64,
    pub tank_unmet: f64,
    pub backup_delivered: f64,
    /// Tank and backup delivered heat
    pub delivered: f64,
    pub unmet: f64,
    pub dist_loss: f64,
    pub dist_loss_at_backup: SeasonalTotal,
    pub gas_use: SeasonalTotal,
    pub gas_use_no_dist: SeasonalTotal,
    pub el_use: SeasonalTotal,
    pub solar_fraction: f64,
}

impl HouseholdAnnualResult {
    pub const COLUMNS: [(&'static str, &'static str); 22] = [
        ("household id", "[id]"),
        ("occupancy", "[count]"),
        ("demand", "[Wh]"),
        ("tank delivered", "[Wh]"),
        ("tank unmet", "[Wh]"),
        ("backup delivered", "[Wh]"),
        ("delivered", "[Wh]"),
        ("unmet", "[Wh]"),
        ("distribution loss", "[Wh]"),
        ("distribution loss at backup", "[Wh]"),
        ("distribution loss at backup summer", "[Wh]"),
        ("distribution loss at backup winter", "[Wh]"),
        ("gas use", "[Wh]"),
        ("gas use summer", "[Wh]"),
        ("gas use winter", "[Wh]"),
        ("gas use without distribution", "[Wh]"),
        ("gas use without distribution summer", "[Wh]"),
        ("gas use without distribution winter", "[Wh]"),
        ("electricity use", "[Wh]"),
        ("electricity use summer", "[Wh]"),
        ("electricity use winter", "[Wh]"),
        ("solar fraction", "[ratio]"),
    ];

    /// Values in the order of `COLUMNS`
    pub fn values(&self) -> Vec<f64> {
        vec![
            self.id as f64,
            self.occupancy as f64,
            self.demand,
            self.tank_delivered,
            self.tank_unmet,
            self.backup_delivered,
            self.delivered,
            self.unmet,
            self.dist_loss,
            self.dist_loss_at_backup.total,
            self.dist_loss_at_backup.summer,
            self.dist_loss_at_backup.winter,
            self.gas_use.total,
            self.gas_use.summer,
            self.gas_use.winter,
            self.gas_use_no_dist.total,
            self.gas_use_no_dist.summer,
            self.gas_use_no_dist.winter,
            self.el_use.total,
            self.el_use.summer,
            self.el_use.winter,
            self.solar_fraction,
        ]
    }
}

/// Everything a project simulation produces.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResults {
    pub archetype: Archetype,
    /// One record per timestep, seed record first
    pub timesteps: Vec<TimestepResult>,
    /// Calendar of the timestep records, seed entry first
    pub calendar: Vec<CalendarStamp>,
    pub households: Vec<HouseholdAnnualResult>,
    pub project: ProjectAnnualResult,
}

/// Values of one result field across a result series
pub fn column(results: &[TimestepResult], field: fn(&TimestepResult) -> f64) -> Vec<f64> {
    results.iter().map(field).collect()
}

/// Sum of a result field over the run, multiplied by the timestep
pub fn series_total(
    results: &[TimestepResult],
    field: fn(&TimestepResult) -> f64,
    timestep: f64,
) -> f64 {
    results.iter().map(field).sum::<f64>() * timestep
}

/// Total of a series split by the season of each entry
pub fn seasonal_series_total(series: &[f64], calendar: &[CalendarStamp], timestep: f64) -> SeasonalTotal {
    let (summer, winter) = series.iter().zip(calendar).fold(
        (0., 0.),
        |(summer, winter), (value, stamp)| match stamp.season {
            Season::Summer => (summer + value, winter),
            Season::Winter => (summer, winter + value),
        },
    );
    SeasonalTotal::from_parts(summer * timestep, winter * timestep)
}

/// Total of a result field split by season
pub fn seasonal_total(
    results: &[TimestepResult],
    calendar: &[CalendarStamp],
    field: fn(&TimestepResult) -> f64,
    timestep: f64,
) -> SeasonalTotal {
    seasonal_series_total(&column(results, field), calendar, timestep)
}

/// Ratio of two totals, zero when the denominator is zero
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0. {
        0.
    } else {
        numerator / denominator
    }
}

/// Mean of the per-timestep solar fractions by month and by season. Timesteps without demand
/// have no solar fraction and are left out.
pub fn periodic_solar_fractions(
    results: &[TimestepResult],
    calendar: &[CalendarStamp],
) -> (Vec<(u32, f64)>, Vec<(Season, f64)>) {
    let hourly = results
        .iter()
        .map(|result| (result.demand - result.backup_delivered) / result.demand)
        .collect::<Vec<_>>();

    let monthly = grouped_means(
        calendar
            .iter()
            .zip(&hourly)
            .map(|(stamp, fraction)| (stamp.month, *fraction)),
    );
    let seasonal = grouped_means(
        calendar
            .iter()
            .zip(&hourly)
            .map(|(stamp, fraction)| (stamp.season, *fraction)),
    );
    (monthly, seasonal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn stamp(month: u32) -> CalendarStamp {
        CalendarStamp {
            month,
            day: 1,
            hour: 1,
            season: Season::from_month(month),
        }
    }

    #[fixture]
    fn calendar() -> Vec<CalendarStamp> {
        vec![stamp(1), stamp(1), stamp(6), stamp(6)]
    }

    #[fixture]
    fn results() -> Vec<TimestepResult> {
        let record = |demand: f64, backup: f64, gas: f64, temp: f64| TimestepResult {
            demand,
            backup_delivered: backup,
            gas_use: gas,
            ambient_temp: temp,
            tank_upper_temp: temp,
            tank_lower_temp: temp,
            ..Default::default()
        };
        vec![
            record(0., 0., 0., 0.),
            record(1000., 500., 600., 280.),
            record(2000., 0., 10., 290.),
            record(0., 0., 10., 300.),
        ]
    }

    #[rstest]
    fn should_have_a_heading_for_every_value(calendar: Vec<CalendarStamp>) {
        assert_eq!(
            TimestepResult::default().values(&calendar[0]).len(),
            TimestepResult::COLUMNS.len()
        );
        assert_eq!(
            HouseholdAnnualResult::default().values().len(),
            HouseholdAnnualResult::COLUMNS.len()
        );
    }

    #[rstest]
    fn should_sum_rates_and_average_temperatures_after_seed(
        results: Vec<TimestepResult>,
        calendar: Vec<CalendarStamp>,
    ) {
        let annual = ProjectAnnualResult::from_timesteps(&results, &calendar, 0.5);

        assert_eq!(annual.demand, 1500.);
        assert_eq!(annual.gas_use, SeasonalTotal::from_parts(10., 300.));
        assert_relative_eq!(annual.ambient_temp, 290.);
        assert_eq!(annual.tank_upper_temp, Some(290.));
    }

    #[rstest]
    fn should_average_solar_fraction_over_timesteps_with_demand(
        results: Vec<TimestepResult>,
        calendar: Vec<CalendarStamp>,
    ) {
        let (monthly, seasonal) = periodic_solar_fractions(&results, &calendar);

        assert_eq!(monthly, vec![(1, 0.5), (6, 1.)]);
        assert_eq!(seasonal, vec![(Season::Summer, 1.), (Season::Winter, 0.5)]);
    }

    #[rstest]
    fn should_report_monthly_fractions_in_project_rows(
        results: Vec<TimestepResult>,
        calendar: Vec<CalendarStamp>,
    ) {
        let mut annual = ProjectAnnualResult::from_timesteps(&results, &calendar, 1.);
        (annual.monthly_solar_fraction, annual.seasonal_solar_fraction) =
            periodic_solar_fractions(&results, &calendar);
        let rows = annual.rows();

        assert!(rows
            .iter()
            .any(|(quantity, value, _)| quantity == "solar fraction month 6" && *value == 1.));
        assert!(rows
            .iter()
            .any(|(quantity, value, _)| quantity == "solar fraction winter" && *value == 0.5));
    }

    #[rstest]
    fn should_guard_ratio_against_zero_denominator() {
        assert_eq!(ratio_or_zero(1., 0.), 0.);
        assert_eq!(ratio_or_zero(1., 4.), 0.25);
    }
}
