//! Display strings, text tables and CSV export for a finished evaluation.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

use crate::core::{AssumptionSet, CashFlowRow, Co2Row, Evaluation, Irr, MetricsSummary, Payback};

const CASH_FLOW_HEADER: [&str; 7] = [
    "Year",
    "Revenue",
    "OPEX",
    "EBITDA",
    "Depreciation",
    "Net Income",
    "Free Cash Flow",
];
const CO2_HEADER: [&str; 4] = [
    "Year",
    "Baseline Emissions (t)",
    "Project Emissions (t)",
    "CO2 Saved (t)",
];

/// Headline metrics rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub npv: String,
    pub irr: String,
    pub payback: String,
    pub co2_saved: String,
}

impl Kpis {
    pub fn from_metrics(metrics: &MetricsSummary) -> Self {
        Self {
            npv: format_currency(metrics.npv),
            irr: format_irr(metrics.irr),
            payback: format_payback(metrics.payback),
            co2_saved: format!("{} tons", group_thousands(metrics.total_co2_saved_tons)),
        }
    }
}

impl fmt::Display for Kpis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NPV:               {}", self.npv)?;
        writeln!(f, "IRR:               {}", self.irr)?;
        writeln!(f, "Payback:           {}", self.payback)?;
        write!(f, "Total CO2 saved:   {}", self.co2_saved)
    }
}

pub fn format_currency(value: f64) -> String {
    format!("€ {}", group_thousands(value))
}

pub fn format_irr(irr: Irr) -> String {
    match irr {
        Irr::Defined { percent } => format!("{percent:.2} %"),
        Irr::Undefined => "N/A".to_string(),
    }
}

pub fn format_payback(payback: Payback) -> String {
    match payback {
        Payback::Reached { year } => format!("Year {year}"),
        Payback::NotReached => "N/A".to_string(),
    }
}

/// Rounds to a whole number and inserts `,` every three digits.
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Project header, input assumptions, KPI block and the cash-flow table with
/// whole-unit values.
pub fn render_text(evaluation: &Evaluation) -> String {
    let a = &evaluation.assumptions;
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({} years, capex {})\n\n",
        a.project_name,
        a.horizon_years,
        format_currency(evaluation.projection.capex_total)
    ));
    out.push_str(&render_assumptions(a));
    out.push('\n');
    out.push_str(&Kpis::from_metrics(&evaluation.metrics).to_string());
    out.push_str("\n\n");
    out.push_str(&render_cash_flow_table(&evaluation.cash_flow_table()));
    out
}

/// The sizing, cost and tariff inputs as labelled lines under an
/// `Input Assumptions` heading.
pub fn render_assumptions(a: &AssumptionSet) -> String {
    let rows = [
        ("Project Name", a.project_name.clone()),
        ("Simulation Years", format!("{} years", a.horizon_years)),
        ("PV System Size", format!("{} kWp", group_thousands(a.pv_size_kwp))),
        ("Battery Size", format!("{} kWh", group_thousands(a.battery_size_kwh))),
        (
            "Annual EV Demand",
            format!("{} kWh/yr", group_thousands(a.annual_ev_demand_kwh)),
        ),
        ("Infrastructure Cost", format_currency(a.infra_cost)),
        ("PV System Cost", format!("{}/kWp", format_currency(a.pv_cost_per_kwp))),
        (
            "Battery Cost",
            format!("{}/kWh", format_currency(a.battery_cost_per_kwh)),
        ),
        (
            "Grid Electricity Price",
            format!("{:.2} €/kWh", a.grid_price_per_kwh),
        ),
        ("Feed-in Tariff", format!("{:.2} €/kWh", a.feed_in_tariff_per_kwh)),
    ];
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;

    let mut out = String::from("Input Assumptions\n");
    for (label, value) in rows {
        out.push_str(&format!("  {:<width$} {value}\n", format!("{label}:")));
    }
    out
}

pub fn render_cash_flow_table(rows: &[CashFlowRow]) -> String {
    let body: Vec<[String; 7]> = rows
        .iter()
        .map(|r| {
            [
                r.year.to_string(),
                group_thousands(r.revenue),
                group_thousands(r.opex),
                group_thousands(r.ebitda),
                group_thousands(r.depreciation),
                group_thousands(r.net_income),
                group_thousands(r.free_cash_flow),
            ]
        })
        .collect();

    let mut widths = CASH_FLOW_HEADER.map(str::len);
    for row in &body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = CASH_FLOW_HEADER
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{h:>w$}"))
        .collect();
    out.push_str(&header.join("  "));
    out.push('\n');
    for row in &body {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{c:>w$}"))
            .collect();
        out.push_str(&cells.join("  "));
        out.push('\n');
    }
    out
}

/// Writes the cash-flow table as CSV to any writer. Deterministic for
/// identical rows.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_cash_flow_csv(rows: &[CashFlowRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(CASH_FLOW_HEADER)?;
    for r in rows {
        wtr.write_record(&[
            r.year.to_string(),
            format!("{:.2}", r.revenue),
            format!("{:.2}", r.opex),
            format!("{:.2}", r.ebitda),
            format!("{:.2}", r.depreciation),
            format!("{:.2}", r.net_income),
            format!("{:.2}", r.free_cash_flow),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_co2_csv(rows: &[Co2Row], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(CO2_HEADER)?;
    for r in rows {
        wtr.write_record(&[
            r.year.to_string(),
            format!("{:.4}", r.baseline_emissions_tons),
            format!("{:.4}", r.project_emissions_tons),
            format!("{:.4}", r.co2_saved_tons),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Cash-flow table followed by a blank line and the CO2 table.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_evaluation_csv(evaluation: &Evaluation, mut writer: impl Write) -> io::Result<()> {
    write_cash_flow_csv(&evaluation.cash_flow_table(), &mut writer)?;
    writeln!(writer)?;
    write_co2_csv(&evaluation.co2_table(), &mut writer)
}
