mod engine;
mod error;
mod metrics;
mod solver;
mod types;

pub use engine::{
    AVG_GEN_PER_KWP, HORIZON_MAX_YEARS, HORIZON_MIN_YEARS, PV_DEGRADATION,
    SELF_CONSUMPTION_RATIO, evaluate, project, validate_assumptions,
};
pub use error::ValidationError;
pub use metrics::{irr, npv, payback_year, reduce, total_co2_saved};
pub use types::{
    AssumptionSet, CashFlowRow, Co2Row, Co2Series, Evaluation, Irr, MetricsSummary, Payback,
    Projection, YearSeries,
};
