//! Nullable, percent-valued assumption input: presets, overlays and TOML files.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::{AssumptionSet, HORIZON_MAX_YEARS, HORIZON_MIN_YEARS, ValidationError};

/// Failure to obtain raw assumptions. Missing values are not config errors;
/// they surface as [`ValidationError`] on conversion.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid assumptions file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown preset \"{name}\", available: {}", RawAssumptions::PRESETS.join(", "))]
    UnknownPreset { name: String },
}

/// The 18 named inputs exactly as a form, request or file supplies them.
///
/// Every field is optional so an absent or `null` value can be rejected by
/// name. `*_pct` fields are raw percentages (1.5 means 1.5%). JSON and query
/// keys are camelCase; TOML files may use the snake_case names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Args)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RawAssumptions {
    /// Display label for the project
    #[arg(long)]
    #[serde(alias = "project_name")]
    pub project_name: Option<String>,
    /// Projection horizon in whole years (5 to 25); `20.0` reads as 20
    #[arg(long)]
    #[serde(alias = "horizon_years")]
    pub horizon_years: Option<f64>,
    /// Installed PV capacity in kWp
    #[arg(long)]
    #[serde(alias = "pv_size_kwp")]
    pub pv_size_kwp: Option<f64>,
    /// Battery capacity in kWh
    #[arg(long)]
    #[serde(alias = "battery_size_kwh")]
    pub battery_size_kwh: Option<f64>,
    /// Annual EV charging demand in kWh
    #[arg(long)]
    #[serde(alias = "annual_ev_demand_kwh")]
    pub annual_ev_demand_kwh: Option<f64>,
    /// PV cost per kWp
    #[arg(long)]
    #[serde(alias = "pv_cost_per_kwp")]
    pub pv_cost_per_kwp: Option<f64>,
    /// Battery cost per kWh
    #[arg(long)]
    #[serde(alias = "battery_cost_per_kwh")]
    pub battery_cost_per_kwh: Option<f64>,
    /// Fixed infrastructure cost
    #[arg(long)]
    #[serde(alias = "infra_cost")]
    pub infra_cost: Option<f64>,
    /// Annual O&M cost as percent of capex
    #[arg(long)]
    #[serde(alias = "om_cost_pct")]
    pub om_cost_pct: Option<f64>,
    /// Grid electricity price per kWh
    #[arg(long)]
    #[serde(alias = "grid_price_per_kwh")]
    pub grid_price_per_kwh: Option<f64>,
    /// Feed-in tariff per exported kWh
    #[arg(long)]
    #[serde(alias = "feed_in_tariff_per_kwh")]
    pub feed_in_tariff_per_kwh: Option<f64>,
    /// Annual price inflation in percent
    #[arg(long)]
    #[serde(alias = "inflation_pct")]
    pub inflation_pct: Option<f64>,
    /// Share of capex financed by the loan in percent
    #[arg(long)]
    #[serde(alias = "loan_coverage_pct")]
    pub loan_coverage_pct: Option<f64>,
    /// Loan interest rate in percent, also the NPV discount rate
    #[arg(long)]
    #[serde(alias = "interest_rate_pct")]
    pub interest_rate_pct: Option<f64>,
    /// Straight-line depreciation rate in percent of capex
    #[arg(long)]
    #[serde(alias = "depreciation_pct")]
    pub depreciation_pct: Option<f64>,
    /// Corporate tax rate in percent
    #[arg(long)]
    #[serde(alias = "tax_rate_pct")]
    pub tax_rate_pct: Option<f64>,
    /// Grid carbon intensity in kg CO2 per kWh
    #[arg(long)]
    #[serde(alias = "grid_co2_kg_per_kwh")]
    pub grid_co2_kg_per_kwh: Option<f64>,
    /// CO2 price per ton
    #[arg(long)]
    #[serde(alias = "co2_price_per_ton")]
    pub co2_price_per_ton: Option<f64>,
}

impl RawAssumptions {
    pub const PRESETS: &[&str] = &["default"];

    /// The values the input form pre-fills.
    pub fn dashboard_defaults() -> Self {
        Self {
            project_name: Some("My Charging Hub".to_string()),
            horizon_years: Some(20.0),
            pv_size_kwp: Some(150.0),
            battery_size_kwh: Some(200.0),
            annual_ev_demand_kwh: Some(300_000.0),
            pv_cost_per_kwp: Some(900.0),
            battery_cost_per_kwh: Some(450.0),
            infra_cost: Some(100_000.0),
            om_cost_pct: Some(1.5),
            grid_price_per_kwh: Some(0.18),
            feed_in_tariff_per_kwh: Some(0.07),
            inflation_pct: Some(2.0),
            loan_coverage_pct: Some(70.0),
            interest_rate_pct: Some(4.5),
            depreciation_pct: Some(8.0),
            tax_rate_pct: Some(25.0),
            grid_co2_kg_per_kwh: Some(0.401),
            co2_price_per_ton: Some(35.0),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPreset`] if the name is not in [`Self::PRESETS`].
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::dashboard_defaults()),
            _ => Err(ConfigError::UnknownPreset {
                name: name.to_string(),
            }),
        }
    }

    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(target: "feasibility.config", path = %path.display(), "Loaded assumptions file");
        Self::from_toml_str(&content)
    }

    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown keys.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Takes every value `other` carries, keeping `self` where `other` is empty.
    pub fn overlay(self, other: RawAssumptions) -> RawAssumptions {
        RawAssumptions {
            project_name: other.project_name.or(self.project_name),
            horizon_years: other.horizon_years.or(self.horizon_years),
            pv_size_kwp: other.pv_size_kwp.or(self.pv_size_kwp),
            battery_size_kwh: other.battery_size_kwh.or(self.battery_size_kwh),
            annual_ev_demand_kwh: other.annual_ev_demand_kwh.or(self.annual_ev_demand_kwh),
            pv_cost_per_kwp: other.pv_cost_per_kwp.or(self.pv_cost_per_kwp),
            battery_cost_per_kwh: other.battery_cost_per_kwh.or(self.battery_cost_per_kwh),
            infra_cost: other.infra_cost.or(self.infra_cost),
            om_cost_pct: other.om_cost_pct.or(self.om_cost_pct),
            grid_price_per_kwh: other.grid_price_per_kwh.or(self.grid_price_per_kwh),
            feed_in_tariff_per_kwh: other.feed_in_tariff_per_kwh.or(self.feed_in_tariff_per_kwh),
            inflation_pct: other.inflation_pct.or(self.inflation_pct),
            loan_coverage_pct: other.loan_coverage_pct.or(self.loan_coverage_pct),
            interest_rate_pct: other.interest_rate_pct.or(self.interest_rate_pct),
            depreciation_pct: other.depreciation_pct.or(self.depreciation_pct),
            tax_rate_pct: other.tax_rate_pct.or(self.tax_rate_pct),
            grid_co2_kg_per_kwh: other.grid_co2_kg_per_kwh.or(self.grid_co2_kg_per_kwh),
            co2_price_per_ton: other.co2_price_per_ton.or(self.co2_price_per_ton),
        }
    }

    /// Checks presence field by field in declaration order, normalizes the
    /// percentages and validates the result.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn into_assumptions(self) -> Result<AssumptionSet, ValidationError> {
        let project_name = required(self.project_name, "project_name")?;
        let horizon = required(self.horizon_years, "horizon_years")?;
        let assumptions = AssumptionSet {
            project_name,
            horizon_years: horizon_in_range(horizon)?,
            pv_size_kwp: required(self.pv_size_kwp, "pv_size_kwp")?,
            battery_size_kwh: required(self.battery_size_kwh, "battery_size_kwh")?,
            annual_ev_demand_kwh: required(self.annual_ev_demand_kwh, "annual_ev_demand_kwh")?,
            pv_cost_per_kwp: required(self.pv_cost_per_kwp, "pv_cost_per_kwp")?,
            battery_cost_per_kwh: required(self.battery_cost_per_kwh, "battery_cost_per_kwh")?,
            infra_cost: required(self.infra_cost, "infra_cost")?,
            om_cost_fraction: required(self.om_cost_pct, "om_cost_pct")? / 100.0,
            grid_price_per_kwh: required(self.grid_price_per_kwh, "grid_price_per_kwh")?,
            feed_in_tariff_per_kwh: required(self.feed_in_tariff_per_kwh, "feed_in_tariff_per_kwh")?,
            inflation_rate: required(self.inflation_pct, "inflation_pct")? / 100.0,
            loan_coverage_fraction: required(self.loan_coverage_pct, "loan_coverage_pct")? / 100.0,
            interest_rate: required(self.interest_rate_pct, "interest_rate_pct")? / 100.0,
            depreciation_rate: required(self.depreciation_pct, "depreciation_pct")? / 100.0,
            tax_rate: required(self.tax_rate_pct, "tax_rate_pct")? / 100.0,
            grid_co2_kg_per_kwh: required(self.grid_co2_kg_per_kwh, "grid_co2_kg_per_kwh")?,
            co2_price_per_ton: required(self.co2_price_per_ton, "co2_price_per_ton")?,
        };
        crate::core::validate_assumptions(&assumptions)?;
        Ok(assumptions)
    }
}

impl TryFrom<RawAssumptions> for AssumptionSet {
    type Error = ValidationError;

    fn try_from(raw: RawAssumptions) -> Result<Self, Self::Error> {
        raw.into_assumptions()
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField { field })
}

/// Accepts any whole number, whether it arrived as `20` or `20.0`.
fn horizon_in_range(years: f64) -> Result<u32, ValidationError> {
    if !years.is_finite() || years.fract() != 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "horizon_years",
            reason: format!("must be a whole number of years, got {years}"),
        });
    }
    let range = f64::from(HORIZON_MIN_YEARS)..=f64::from(HORIZON_MAX_YEARS);
    if !range.contains(&years) {
        return Err(ValidationError::HorizonOutOfRange {
            years: years as i64,
            min: HORIZON_MIN_YEARS,
            max: HORIZON_MAX_YEARS,
        });
    }
    Ok(years as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_defaults_convert_to_normalized_rates() {
        let a = RawAssumptions::dashboard_defaults()
            .into_assumptions()
            .expect("defaults are valid");
        assert_eq!(a.project_name, "My Charging Hub");
        assert_eq!(a.horizon_years, 20);
        assert_eq!(a.om_cost_fraction, 1.5 / 100.0);
        assert_eq!(a.loan_coverage_fraction, 0.70);
        assert_eq!(a.interest_rate, 0.045);
        assert_eq!(a.tax_rate, 0.25);
        assert_eq!(a.grid_co2_kg_per_kwh, 0.401);
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(
            RawAssumptions::preset("default").expect("known preset"),
            RawAssumptions::dashboard_defaults()
        );
        let err = RawAssumptions::preset("sunny").expect_err("unknown preset");
        assert!(err.to_string().contains("sunny"));
        assert!(err.to_string().contains("default"));
    }

    #[test]
    fn missing_fields_reported_in_declaration_order() {
        let mut raw = RawAssumptions::dashboard_defaults();
        raw.tax_rate_pct = None;
        raw.pv_size_kwp = None;
        assert_eq!(
            raw.into_assumptions(),
            Err(ValidationError::MissingField {
                field: "pv_size_kwp"
            })
        );

        let empty = RawAssumptions::default().into_assumptions();
        assert_eq!(
            empty,
            Err(ValidationError::MissingField {
                field: "project_name"
            })
        );
    }

    #[test]
    fn horizon_bounds_are_inclusive() {
        let cases = [
            (4.0, false),
            (5.0, true),
            (25.0, true),
            (26.0, false),
            (0.0, false),
            (-3.0, false),
        ];
        for (years, ok) in cases {
            let mut raw = RawAssumptions::dashboard_defaults();
            raw.horizon_years = Some(years);
            let result = raw.into_assumptions();
            assert_eq!(result.is_ok(), ok, "horizon {years}");
            if !ok {
                assert!(matches!(
                    result,
                    Err(ValidationError::HorizonOutOfRange { years: y, .. }) if y == years as i64
                ));
            }
        }
    }

    #[test]
    fn fractional_horizon_is_rejected_by_name() {
        for years in [20.5, f64::NAN, f64::INFINITY] {
            let mut raw = RawAssumptions::dashboard_defaults();
            raw.horizon_years = Some(years);
            let err = raw.into_assumptions().expect_err("must reject");
            assert!(
                matches!(err, ValidationError::InvalidValue { field: "horizon_years", .. }),
                "horizon {years}: {err:?}"
            );
        }
    }

    #[test]
    fn integral_float_horizon_is_accepted() {
        let raw: RawAssumptions =
            serde_json::from_str(r#"{"horizonYears": 20.0}"#).expect("valid json");
        let a = RawAssumptions::dashboard_defaults()
            .overlay(raw)
            .into_assumptions()
            .expect("20.0 is a whole number of years");
        assert_eq!(a.horizon_years, 20);
    }

    #[test]
    fn percentages_above_hundred_are_rejected() {
        let mut raw = RawAssumptions::dashboard_defaults();
        raw.loan_coverage_pct = Some(120.0);
        let err = raw.into_assumptions().expect_err("must reject");
        assert_eq!(err.field(), "loan_coverage_pct");
    }

    #[test]
    fn overlay_prefers_present_values() {
        let base = RawAssumptions::dashboard_defaults();
        let flags = RawAssumptions {
            pv_size_kwp: Some(300.0),
            project_name: Some("Depot".to_string()),
            ..RawAssumptions::default()
        };
        let merged = base.clone().overlay(flags);
        assert_eq!(merged.pv_size_kwp, Some(300.0));
        assert_eq!(merged.project_name.as_deref(), Some("Depot"));
        assert_eq!(merged.battery_size_kwh, base.battery_size_kwh);
        assert_eq!(merged.tax_rate_pct, base.tax_rate_pct);
    }

    #[test]
    fn toml_accepts_snake_case_keys() {
        let raw = RawAssumptions::from_toml_str(
            r#"
project_name = "Depot"
horizon_years = 10
pv_size_kwp = 80.0
om_cost_pct = 2.0
"#,
        )
        .expect("valid toml");
        assert_eq!(raw.project_name.as_deref(), Some("Depot"));
        assert_eq!(raw.horizon_years, Some(10.0));
        assert_eq!(raw.pv_size_kwp, Some(80.0));
        assert_eq!(raw.om_cost_pct, Some(2.0));
        assert_eq!(raw.tax_rate_pct, None);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = RawAssumptions::from_toml_str("pv_size = 10.0\n").expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn partial_toml_fails_validation_not_parsing() {
        let raw = RawAssumptions::from_toml_str("horizon_years = 10\n").expect("parses");
        assert_eq!(
            raw.into_assumptions().expect_err("incomplete").field(),
            "project_name"
        );
    }

    #[test]
    fn json_null_is_missing() {
        let raw: RawAssumptions = serde_json::from_str(
            r#"{"projectName": "Hub", "horizonYears": 20, "pvSizeKwp": null}"#,
        )
        .expect("valid json");
        assert_eq!(raw.pv_size_kwp, None);
        assert_eq!(raw.horizon_years, Some(20.0));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RawAssumptions::from_toml_file(Path::new("does/not/exist.toml"))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("exist.toml"));
    }
}
