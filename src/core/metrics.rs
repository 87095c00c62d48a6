use tracing::debug;

use super::solver::{RootSolveConfig, find_roots};
use super::types::{Co2Series, Irr, MetricsSummary, Payback};

const IRR_SEARCH: RootSolveConfig = RootSolveConfig {
    search_min: -0.99,
    search_max: 10.0,
    grid_step: 0.005,
    tolerance: 1e-12,
    max_iterations: 200,
};

/// Among several real roots, the one nearest this rate is reported.
const IRR_GUESS: f64 = 0.10;

/// Rates beyond the main grid are scanned in windows doubling up to this cap.
const IRR_UPPER_CAP: f64 = 1e6;
/// Closest approach to the -100% pole, as powers of ten of `1 + r`.
const IRR_POLE_DECADES: i32 = 9;
const IRR_WINDOW_STEPS: f64 = 200.0;

pub fn reduce(
    free_cash_flow: &[f64],
    co2_series: &Co2Series,
    discount_rate: f64,
) -> MetricsSummary {
    let summary = MetricsSummary {
        npv: npv(discount_rate, free_cash_flow),
        irr: irr(free_cash_flow),
        payback: payback_year(free_cash_flow),
        total_co2_saved_tons: total_co2_saved(co2_series),
    };
    debug!(
        target: "feasibility.metrics",
        npv = summary.npv,
        irr = ?summary.irr,
        payback = ?summary.payback,
        "Metrics reduced"
    );
    summary
}

/// Entry `t` is discounted by `(1 + rate)^t`; entry 0 is the undiscounted outlay.
pub fn npv(rate: f64, cash_flows: &[f64]) -> f64 {
    let one_plus_r = 1.0 + rate;
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / one_plus_r.powf(t as f64))
        .sum()
}

pub fn irr(cash_flows: &[f64]) -> Irr {
    if cash_flows.len() < 2 || !has_sign_change(cash_flows) {
        return Irr::Undefined;
    }

    let mut roots = Vec::new();
    for window in irr_search_windows() {
        match find_roots(|r| npv(r, cash_flows), window) {
            Ok(found) => roots.extend(found),
            Err(_) => return Irr::Undefined,
        }
    }

    roots
        .into_iter()
        .filter(|r| r.converged)
        .map(|r| r.root)
        .min_by(|a, b| (a - IRR_GUESS).abs().total_cmp(&(b - IRR_GUESS).abs()))
        .map_or(Irr::Undefined, |rate| Irr::Defined {
            percent: rate * 100.0,
        })
}

/// The main grid, then windows toward the -100% pole, then windows doubling
/// up to [`IRR_UPPER_CAP`]. Tolerance scales with the window so bisection
/// can still converge at large rates.
fn irr_search_windows() -> Vec<RootSolveConfig> {
    let window = |search_min: f64, search_max: f64| RootSolveConfig {
        search_min,
        search_max,
        grid_step: (search_max - search_min) / IRR_WINDOW_STEPS,
        tolerance: IRR_SEARCH.tolerance * search_max.abs().max(1.0),
        ..IRR_SEARCH
    };

    let mut windows = vec![IRR_SEARCH];
    let mut upper = 1.0 + IRR_SEARCH.search_min;
    for decade in 3..=IRR_POLE_DECADES {
        let lower = 10f64.powi(-decade);
        windows.push(window(lower - 1.0, upper - 1.0));
        upper = lower;
    }
    let mut lower = IRR_SEARCH.search_max;
    while lower < IRR_UPPER_CAP {
        windows.push(window(lower, lower * 2.0));
        lower *= 2.0;
    }
    windows
}

fn has_sign_change(cash_flows: &[f64]) -> bool {
    let mut signs = cash_flows.iter().filter(|cf| **cf != 0.0).map(|cf| cf.is_sign_positive());
    match signs.next() {
        Some(first) => signs.any(|s| s != first),
        None => false,
    }
}

/// First index whose running total is strictly positive. Index 0 is the
/// outlay year, so a reached payback is normally 1 or later.
pub fn payback_year(cash_flows: &[f64]) -> Payback {
    let mut cumulative = 0.0;
    for (year, cf) in cash_flows.iter().enumerate() {
        cumulative += cf;
        if cumulative > 0.0 {
            return Payback::Reached { year: year as u32 };
        }
    }
    Payback::NotReached
}

pub fn total_co2_saved(co2_series: &Co2Series) -> f64 {
    co2_series.co2_saved_tons.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn co2(saved: &[f64]) -> Co2Series {
        Co2Series {
            years: (1..=saved.len() as u32).collect(),
            baseline_emissions_tons: saved.to_vec(),
            project_emissions_tons: vec![0.0; saved.len()],
            co2_saved_tons: saved.to_vec(),
        }
    }

    #[test]
    fn npv_discounts_each_entry_by_its_own_index() {
        let cfs = [-1000.0, 300.0, 400.0, 500.0];
        let expected = -1000.0 + 300.0 / 1.1 + 400.0 / 1.21 + 500.0 / 1.331;
        assert_approx(npv(0.10, &cfs), expected);
    }

    #[test]
    fn npv_at_zero_rate_is_plain_sum() {
        let cfs = [-100.0, 50.0, 50.0, 50.0];
        assert_eq!(npv(0.0, &cfs), 50.0);
    }

    #[test]
    fn irr_of_level_annuity() {
        let cfs = [-1000.0, 400.0, 400.0, 400.0];
        let percent = irr(&cfs).percent().expect("irr should be defined");
        assert!((percent - 9.7010).abs() < 1e-3, "got {percent}");
        assert!(npv(percent / 100.0, &cfs).abs() < 1e-6);
    }

    #[test]
    fn irr_can_be_negative() {
        let cfs = [-100.0, 10.0, 10.0];
        let percent = irr(&cfs).percent().expect("irr should be defined");
        assert!(percent < 0.0);
        assert!(npv(percent / 100.0, &cfs).abs() < 1e-6);
    }

    #[test]
    fn irr_of_break_even_flows_is_zero_not_undefined() {
        let cfs = [-100.0, 50.0, 50.0];
        let result = irr(&cfs);
        let percent = result.percent().expect("zero irr is still defined");
        assert!(percent.abs() < 1e-6);
    }

    #[test]
    fn irr_undefined_without_sign_change() {
        assert_eq!(irr(&[-100.0, 0.0, 0.0, 0.0]), Irr::Undefined);
        assert_eq!(irr(&[-100.0, -5.0, -5.0]), Irr::Undefined);
        assert_eq!(irr(&[0.0, 0.0, 0.0]), Irr::Undefined);
        assert_eq!(irr(&[-100.0]), Irr::Undefined);
    }

    #[test]
    fn irr_finds_rates_above_the_main_grid() {
        let percent = irr(&[-1.0, 20.0]).percent().expect("irr should be defined");
        assert!((percent - 1900.0).abs() < 1e-6, "got {percent}");

        let cfs = [-150.0, 5_893.5, 5_981.3, 6_070.0];
        let percent = irr(&cfs).percent().expect("irr should be defined");
        assert!(percent > 1000.0, "got {percent}");
        assert!(npv(percent / 100.0, &cfs).abs() < 1e-6);
    }

    #[test]
    fn irr_finds_rates_near_total_loss() {
        // -100 + 0.02 / (1 + r) = 0 at r = -0.9998.
        let percent = irr(&[-100.0, 0.02]).percent().expect("irr should be defined");
        assert!((percent - -99.98).abs() < 1e-6, "got {percent}");
    }

    #[test]
    fn irr_picks_root_closest_to_ten_percent() {
        // -100 + 230/(1+r) - 132/(1+r)^2 has roots at 10% and 20%.
        let cfs = [-100.0, 230.0, -132.0];
        let percent = irr(&cfs).percent().expect("irr should be defined");
        assert!((percent - 10.0).abs() < 1e-6, "got {percent}");
    }

    #[test]
    fn payback_is_first_strictly_positive_cumulative_index() {
        assert_eq!(
            payback_year(&[-100.0, 40.0, 60.0, 1.0]),
            Payback::Reached { year: 3 }
        );
        assert_eq!(
            payback_year(&[-100.0, 40.0, 61.0]),
            Payback::Reached { year: 2 }
        );
    }

    #[test]
    fn payback_not_reached_when_cumulative_stays_non_positive() {
        assert_eq!(payback_year(&[-100.0, 50.0, 50.0]), Payback::NotReached);
        assert_eq!(payback_year(&[-100.0, 0.0, 0.0]), Payback::NotReached);
    }

    #[test]
    fn reduce_keeps_other_metrics_when_irr_is_undefined() {
        let cfs = [-1000.0, 0.0, 0.0];
        let summary = reduce(&cfs, &co2(&[1.5, 2.5]), 0.05);
        assert_eq!(summary.irr, Irr::Undefined);
        assert_eq!(summary.payback, Payback::NotReached);
        assert_approx(summary.npv, -1000.0);
        assert_approx(summary.total_co2_saved_tons, 4.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_npv_at_zero_rate_equals_sum(
            outlay in 0u32..1_000_000,
            flows in proptest::collection::vec(-200_000i32..200_000, 5..26)
        ) {
            let mut cfs = vec![-(outlay as f64)];
            cfs.extend(flows.iter().map(|v| *v as f64));
            let sum: f64 = cfs.iter().sum();
            prop_assert_eq!(npv(0.0, &cfs), sum);
        }

        #[test]
        fn prop_defined_irr_is_a_root_of_npv(
            outlay in 1_000u32..1_000_000,
            flows in proptest::collection::vec(1u32..200_000, 5..26)
        ) {
            let mut cfs = vec![-(outlay as f64)];
            cfs.extend(flows.iter().map(|v| *v as f64));
            if let Irr::Defined { percent } = irr(&cfs) {
                let scale: f64 = cfs.iter().map(|v| v.abs()).sum();
                prop_assert!(npv(percent / 100.0, &cfs).abs() <= scale * 1e-9);
            }
        }

        #[test]
        fn prop_zero_tail_never_pays_back(
            outlay in 0u32..1_000_000,
            years in 5usize..26
        ) {
            let mut cfs = vec![-(outlay as f64)];
            cfs.extend(std::iter::repeat_n(0.0, years));
            prop_assert_eq!(payback_year(&cfs), Payback::NotReached);
            prop_assert_eq!(irr(&cfs), Irr::Undefined);
        }
    }
}
