pub fn min_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first < second {
        first
    } else {
        second
    }
}

pub fn max_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first > second {
        first
    } else {
        second
    }
}

/// Floor a value at zero, reporting whether the floor was applied.
pub(crate) fn floor_at_zero(value: f64) -> (f64, bool) {
    if value < 0. {
        (0., true)
    } else {
        (value, false)
    }
}

/// Relative error of `actual` against `reference`; zero when both are zero.
pub(crate) fn relative_error(actual: f64, reference: f64) -> f64 {
    if reference == 0. {
        if actual == 0. {
            0.
        } else {
            f64::INFINITY
        }
    } else {
        ((actual - reference) / reference).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(24000., 26000., 24000.)]
    #[case(26000., 24000., 24000.)]
    #[case(-3., 0., -3.)]
    fn should_pick_smaller_heat_rate(#[case] first: f64, #[case] second: f64, #[case] expected: f64) {
        assert_eq!(min_of_2(first, second), expected);
    }

    #[rstest]
    #[case(344.15, 322.04, 344.15)]
    #[case(0., -12.5, 0.)]
    fn should_pick_larger_temperature(#[case] first: f64, #[case] second: f64, #[case] expected: f64) {
        assert_eq!(max_of_2(first, second), expected);
    }

    #[rstest]
    fn should_flag_negative_values_when_flooring() {
        assert_eq!(floor_at_zero(-0.3), (0., true));
        assert_eq!(floor_at_zero(0.), (0., false));
        assert_eq!(floor_at_zero(12.), (12., false));
    }

    #[rstest]
    fn should_calc_relative_error() {
        assert_eq!(relative_error(101., 100.), 0.01);
        assert_eq!(relative_error(0., 0.), 0.);
        assert_eq!(relative_error(1., 0.), f64::INFINITY);
    }
}
