use tracing::debug;

use super::error::ValidationError;
use super::metrics::reduce;
use super::types::{AssumptionSet, Co2Series, Evaluation, Projection, YearSeries};

/// Average annual PV yield per installed kWp.
pub const AVG_GEN_PER_KWP: f64 = 1100.0;
/// Fractional loss of PV output per year of operation.
pub const PV_DEGRADATION: f64 = 0.005;
/// Share of PV generation consumed on site.
pub const SELF_CONSUMPTION_RATIO: f64 = 0.4;

pub const HORIZON_MIN_YEARS: u32 = 5;
pub const HORIZON_MAX_YEARS: u32 = 25;

/// Runs the projection and reduces it to investment metrics, discounting at
/// the loan interest rate.
pub fn evaluate(assumptions: &AssumptionSet) -> Result<Evaluation, ValidationError> {
    let projection = project(assumptions)?;
    let metrics = reduce(
        &projection.year_series.free_cash_flow,
        &projection.co2_series,
        assumptions.interest_rate,
    );
    Ok(Evaluation {
        assumptions: assumptions.clone(),
        projection,
        metrics,
    })
}

pub fn project(assumptions: &AssumptionSet) -> Result<Projection, ValidationError> {
    validate_assumptions(assumptions)?;
    let a = assumptions;

    let years: Vec<u32> = (1..=a.horizon_years).collect();
    let n = years.len();

    let pv_generation = per_year(n, |age| {
        a.pv_size_kwp * AVG_GEN_PER_KWP * (1.0 - PV_DEGRADATION).powf(age as f64)
    });
    let self_consumed = per_year(n, |i| pv_generation[i] * SELF_CONSUMPTION_RATIO);
    let grid_import = per_year(n, |i| 0.0_f64.max(a.annual_ev_demand_kwh - self_consumed[i]));
    let grid_export = per_year(n, |i| pv_generation[i] - self_consumed[i]);

    let capex_total = a.pv_size_kwp * a.pv_cost_per_kwp
        + a.battery_size_kwh * a.battery_cost_per_kwh
        + a.infra_cost;
    let inflation_factor = per_year(n, |age| (1.0 + a.inflation_rate).powf(age as f64));

    let opex_om = per_year(n, |i| capex_total * a.om_cost_fraction * inflation_factor[i]);
    let opex_grid_cost =
        per_year(n, |i| grid_import[i] * a.grid_price_per_kwh * inflation_factor[i]);
    let total_opex = per_year(n, |i| opex_om[i] + opex_grid_cost[i]);

    let revenue_feed_in =
        per_year(n, |i| grid_export[i] * a.feed_in_tariff_per_kwh * inflation_factor[i]);
    let co2_saved_tons = per_year(n, |i| self_consumed[i] * a.grid_co2_kg_per_kwh / 1000.0);
    let revenue_co2 =
        per_year(n, |i| co2_saved_tons[i] * a.co2_price_per_ton * inflation_factor[i]);
    let total_revenue = per_year(n, |i| revenue_feed_in[i] + revenue_co2[i]);

    let depreciation = capex_total * a.depreciation_rate;
    let loan_amount = capex_total * a.loan_coverage_fraction;
    let interest_payment = loan_amount * a.interest_rate;

    let ebitda = per_year(n, |i| total_revenue[i] - total_opex[i]);
    let ebit = per_year(n, |i| ebitda[i] - depreciation);
    let ebt = per_year(n, |i| ebit[i] - interest_payment);
    let tax = per_year(n, |i| 0.0_f64.max(ebt[i] * a.tax_rate));
    let net_income = per_year(n, |i| ebt[i] - tax[i]);

    // Unlevered: taxed on EBIT at the statutory rate, independent of `tax` and
    // `net_income` above.
    let mut free_cash_flow = Vec::with_capacity(n + 1);
    free_cash_flow.push(-capex_total);
    free_cash_flow.extend(ebit.iter().map(|e| e * (1.0 - a.tax_rate) + depreciation));

    let baseline = a.annual_ev_demand_kwh * a.grid_co2_kg_per_kwh / 1000.0;
    let baseline_emissions_tons = vec![baseline; n];
    let project_emissions_tons = per_year(n, |i| grid_import[i] * a.grid_co2_kg_per_kwh / 1000.0);
    let co2_series_saved =
        per_year(n, |i| baseline_emissions_tons[i] - project_emissions_tons[i]);

    debug!(
        target: "feasibility.projection",
        project = %a.project_name,
        horizon_years = a.horizon_years,
        capex_total,
        "Projection computed"
    );

    Ok(Projection {
        capex_total,
        loan_amount,
        interest_payment,
        year_series: YearSeries {
            years: years.clone(),
            pv_generation_kwh: pv_generation,
            self_consumed_kwh: self_consumed,
            grid_import_kwh: grid_import,
            grid_export_kwh: grid_export,
            opex_om,
            opex_grid_cost,
            total_opex,
            revenue_feed_in,
            co2_saved_tons,
            revenue_co2,
            total_revenue,
            depreciation,
            ebitda,
            ebit,
            ebt,
            tax,
            net_income,
            free_cash_flow,
        },
        co2_series: Co2Series {
            years,
            baseline_emissions_tons,
            project_emissions_tons,
            co2_saved_tons: co2_series_saved,
        },
    })
}

/// Evaluates `f` for each year offset `0..n` (year `offset + 1`).
fn per_year(n: usize, f: impl Fn(usize) -> f64) -> Vec<f64> {
    (0..n).map(f).collect()
}

pub fn validate_assumptions(a: &AssumptionSet) -> Result<(), ValidationError> {
    if !(HORIZON_MIN_YEARS..=HORIZON_MAX_YEARS).contains(&a.horizon_years) {
        return Err(ValidationError::HorizonOutOfRange {
            years: i64::from(a.horizon_years),
            min: HORIZON_MIN_YEARS,
            max: HORIZON_MAX_YEARS,
        });
    }

    for (field, value) in [
        ("pv_size_kwp", a.pv_size_kwp),
        ("battery_size_kwh", a.battery_size_kwh),
        ("annual_ev_demand_kwh", a.annual_ev_demand_kwh),
        ("pv_cost_per_kwp", a.pv_cost_per_kwp),
        ("battery_cost_per_kwh", a.battery_cost_per_kwh),
        ("infra_cost", a.infra_cost),
        ("grid_price_per_kwh", a.grid_price_per_kwh),
        ("feed_in_tariff_per_kwh", a.feed_in_tariff_per_kwh),
        ("grid_co2_kg_per_kwh", a.grid_co2_kg_per_kwh),
        ("co2_price_per_ton", a.co2_price_per_ton),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidValue {
                field,
                reason: format!("must be a finite value >= 0, got {value}"),
            });
        }
    }

    for (field, rate) in [
        ("om_cost_pct", a.om_cost_fraction),
        ("inflation_pct", a.inflation_rate),
        ("loan_coverage_pct", a.loan_coverage_fraction),
        ("interest_rate_pct", a.interest_rate),
        ("depreciation_pct", a.depreciation_rate),
        ("tax_rate_pct", a.tax_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ValidationError::InvalidValue {
                field,
                reason: format!("must be between 0 and 100 percent, got {}", rate * 100.0),
            });
        }
    }

    Ok(())
}
