use serde::Serialize;

/// Validated, normalized inputs for one run. Rates are fractions (0.045 = 4.5%).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionSet {
    pub project_name: String,
    pub horizon_years: u32,
    pub pv_size_kwp: f64,
    pub battery_size_kwh: f64,
    pub annual_ev_demand_kwh: f64,
    pub pv_cost_per_kwp: f64,
    pub battery_cost_per_kwh: f64,
    pub infra_cost: f64,
    pub om_cost_fraction: f64,
    pub grid_price_per_kwh: f64,
    pub feed_in_tariff_per_kwh: f64,
    pub inflation_rate: f64,
    pub loan_coverage_fraction: f64,
    pub interest_rate: f64,
    pub depreciation_rate: f64,
    pub tax_rate: f64,
    pub grid_co2_kg_per_kwh: f64,
    pub co2_price_per_ton: f64,
}

/// Per-year energy, cost and income-statement lines. Every vector holds
/// `horizon_years` entries (index 0 is year 1) except `free_cash_flow`,
/// which is prefixed with the year-0 capital outlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSeries {
    pub years: Vec<u32>,
    pub pv_generation_kwh: Vec<f64>,
    pub self_consumed_kwh: Vec<f64>,
    pub grid_import_kwh: Vec<f64>,
    pub grid_export_kwh: Vec<f64>,
    pub opex_om: Vec<f64>,
    pub opex_grid_cost: Vec<f64>,
    pub total_opex: Vec<f64>,
    pub revenue_feed_in: Vec<f64>,
    pub co2_saved_tons: Vec<f64>,
    pub revenue_co2: Vec<f64>,
    pub total_revenue: Vec<f64>,
    pub depreciation: f64,
    pub ebitda: Vec<f64>,
    pub ebit: Vec<f64>,
    pub ebt: Vec<f64>,
    pub tax: Vec<f64>,
    pub net_income: Vec<f64>,
    pub free_cash_flow: Vec<f64>,
}

impl YearSeries {
    pub fn horizon_years(&self) -> usize {
        self.years.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Co2Series {
    pub years: Vec<u32>,
    pub baseline_emissions_tons: Vec<f64>,
    pub project_emissions_tons: Vec<f64>,
    pub co2_saved_tons: Vec<f64>,
}

/// Output of the projection engine for one assumption set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub capex_total: f64,
    pub loan_amount: f64,
    pub interest_payment: f64,
    pub year_series: YearSeries,
    pub co2_series: Co2Series,
}

/// Internal rate of return. `Undefined` is kept apart from a genuine 0%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Irr {
    Defined { percent: f64 },
    Undefined,
}

impl Irr {
    pub fn percent(self) -> Option<f64> {
        match self {
            Irr::Defined { percent } => Some(percent),
            Irr::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Payback {
    Reached { year: u32 },
    NotReached,
}

impl Payback {
    pub fn year(self) -> Option<u32> {
        match self {
            Payback::Reached { year } => Some(year),
            Payback::NotReached => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub npv: f64,
    pub irr: Irr,
    pub payback: Payback,
    pub total_co2_saved_tons: f64,
}

/// One display row of the cash-flow table. Free cash flow excludes the
/// year-0 outlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowRow {
    pub year: u32,
    pub revenue: f64,
    pub opex: f64,
    pub ebitda: f64,
    pub depreciation: f64,
    pub net_income: f64,
    pub free_cash_flow: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Co2Row {
    pub year: u32,
    pub baseline_emissions_tons: f64,
    pub project_emissions_tons: f64,
    pub co2_saved_tons: f64,
}

/// A complete run: the inputs, the projected series and the reduced metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub assumptions: AssumptionSet,
    pub projection: Projection,
    pub metrics: MetricsSummary,
}

impl Evaluation {
    pub fn cash_flow_table(&self) -> Vec<CashFlowRow> {
        let s = &self.projection.year_series;
        (0..s.horizon_years())
            .map(|i| CashFlowRow {
                year: s.years[i],
                revenue: s.total_revenue[i],
                opex: s.total_opex[i],
                ebitda: s.ebitda[i],
                depreciation: s.depreciation,
                net_income: s.net_income[i],
                free_cash_flow: s.free_cash_flow[i + 1],
            })
            .collect()
    }

    pub fn co2_table(&self) -> Vec<Co2Row> {
        let c = &self.projection.co2_series;
        (0..c.years.len())
            .map(|i| Co2Row {
                year: c.years[i],
                baseline_emissions_tons: c.baseline_emissions_tons[i],
                project_emissions_tons: c.project_emissions_tons[i],
                co2_saved_tons: c.co2_saved_tons[i],
            })
            .collect()
    }

    /// Raw free cash flow including the year-0 outlay.
    pub fn free_cash_flow(&self) -> &[f64] {
        &self.projection.year_series.free_cash_flow
    }
}
