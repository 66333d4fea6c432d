pub const HOURS_IN_DAY: u32 = 24;

// # Define hours that start each month (and end next month). Note there are 13
// # values so that end of final month is handled correctly.
// # E.g. Jan is hours 0-743
const MONTH_START_END_HOURS: [u32; 13] = [
    0, 744, 1416, 2160, 2880, 3624, 4344, 5088, 5832, 6552, 7296, 8016, 8760,
];

/// The timeline of a simulation run: a fixed number of equal timesteps starting at hour 0 of
/// the year. Results are held for one extra seed step ahead of the first simulated timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationTime {
    step: f64,
    total_steps: usize,
}

impl SimulationTime {
    /// Arguments:
    /// * `step` - timestep length, in hours
    /// * `total_steps` - number of simulated timesteps
    pub fn new(step: f64, total_steps: usize) -> anyhow::Result<Self> {
        if step <= 0. {
            anyhow::bail!("Timestep must be positive, got {step} h");
        }
        Ok(Self { step, total_steps })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Number of entries in a result timeseries, including the seed step
    pub fn result_len(&self) -> usize {
        self.total_steps + 1
    }

    pub fn iter(&self) -> SimulationTimeIterator {
        SimulationTimeIterator {
            current_index: 0,
            simulation_time: *self,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SimulationTimeIterator {
    current_index: usize,
    simulation_time: SimulationTime,
}

impl Iterator for SimulationTimeIterator {
    type Item = SimulationTimeIteration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.simulation_time.total_steps {
            return None;
        }
        let item = SimulationTimeIteration {
            index: self.current_index,
            time: self.current_index as f64 * self.simulation_time.step,
            timestep: self.simulation_time.step,
        };
        self.current_index += 1;
        Some(item)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SimulationTimeIteration {
    pub index: usize,
    pub time: f64,
    pub timestep: f64,
}

impl SimulationTimeIteration {
    pub fn current_hour(&self) -> u32 {
        self.time.floor() as u32
    }

    /// Hour of the day, counted from 1 as in hourly weather files
    pub fn hour_of_day(&self) -> u32 {
        self.current_hour() % HOURS_IN_DAY + 1
    }

    /// Month of the year, counted from 1; hours past the end of a year wrap around
    pub fn current_month(&self) -> u32 {
        let hour_of_year = self.current_hour() % MONTH_START_END_HOURS[12];
        MONTH_START_END_HOURS
            .iter()
            .skip(1)
            .position(|end_hour| hour_of_year < *end_hour)
            .map(|idx| idx as u32 + 1)
            .unwrap_or(12)
    }

    /// Day of the month, counted from 1
    pub fn day_of_month(&self) -> u32 {
        let hour_of_year = self.current_hour() % MONTH_START_END_HOURS[12];
        let month_start = MONTH_START_END_HOURS[(self.current_month() - 1) as usize];
        (hour_of_year - month_start) / HOURS_IN_DAY + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn simtime() -> SimulationTime {
        SimulationTime::new(1., 8760).unwrap()
    }

    #[rstest]
    fn should_have_seed_step_in_results(simtime: SimulationTime) {
        assert_eq!(simtime.total_steps(), 8760);
        assert_eq!(simtime.result_len(), 8761);
        assert_eq!(simtime.iter().count(), 8760);
    }

    #[rstest]
    fn should_reject_non_positive_step() {
        assert!(SimulationTime::new(0., 10).is_err());
    }

    #[rstest]
    fn should_iterate_calendar_correctly(simtime: SimulationTime) {
        let expected = [
            (0, 1, 1, 1),
            (23, 1, 1, 24),
            (24, 1, 2, 1),
            (743, 1, 31, 24),
            (744, 2, 1, 1),
            (4344, 7, 1, 1),
            (8759, 12, 31, 24),
        ];
        let iterations = simtime.iter().collect::<Vec<_>>();
        for (index, month, day, hour) in expected {
            let item = iterations[index];
            assert_eq!(item.index, index);
            assert_eq!(item.current_month(), month, "month at index {index}");
            assert_eq!(item.day_of_month(), day, "day at index {index}");
            assert_eq!(item.hour_of_day(), hour, "hour at index {index}");
        }
    }

    #[rstest]
    fn should_iterate_with_sub_hourly_step() {
        let simtime = SimulationTime::new(0.5, 4).unwrap();
        let times = simtime.iter().map(|it| it.time).collect::<Vec<_>>();
        assert_eq!(times, vec![0., 0.5, 1., 1.5]);
    }
}
