use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::RawAssumptions;
use crate::core::{CashFlowRow, Co2Row, Evaluation, MetricsSummary, ValidationError, evaluate};
use crate::report::{Kpis, write_cash_flow_csv};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    project_name: String,
    horizon_years: u32,
    capex_total: f64,
    metrics: MetricsSummary,
    kpis: Kpis,
    cash_flow_table: Vec<CashFlowRow>,
    co2_table: Vec<Co2Row>,
    free_cash_flow: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/simulate/csv", post(simulate_csv_handler))
        .route("/api/defaults", get(defaults_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(target: "feasibility.api", %addr, "Feasibility API listening");
    info!(target: "feasibility.api", "Local access: http://127.0.0.1:{port}/api/defaults");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", None)
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, RawAssumptions::dashboard_defaults())
}

async fn simulate_get_handler(
    payload: Result<Query<RawAssumptions>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(raw)) => simulate_handler_impl(raw),
        Err(rejection) => bad_payload(&rejection.body_text()),
    }
}

async fn simulate_post_handler(payload: Result<Json<RawAssumptions>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(raw)) => simulate_handler_impl(raw),
        Err(rejection) => bad_payload(&rejection.body_text()),
    }
}

async fn simulate_csv_handler(payload: Result<Json<RawAssumptions>, JsonRejection>) -> Response {
    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => return bad_payload(&rejection.body_text()),
    };
    let evaluation = match evaluate_raw(raw) {
        Ok(evaluation) => evaluation,
        Err(err) => return validation_error_response(&err),
    };

    let mut body = Vec::new();
    if let Err(e) = write_cash_flow_csv(&evaluation.cash_flow_table(), &mut body) {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("CSV export failed: {e}"),
            None,
        );
    }
    with_cache_control(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}

fn simulate_handler_impl(raw: RawAssumptions) -> Response {
    match evaluate_raw(raw) {
        Ok(evaluation) => json_response(StatusCode::OK, build_simulate_response(&evaluation)),
        Err(err) => validation_error_response(&err),
    }
}

fn evaluate_raw(raw: RawAssumptions) -> Result<Evaluation, ValidationError> {
    let assumptions = raw.into_assumptions()?;
    let evaluation = evaluate(&assumptions)?;
    info!(
        target: "feasibility.api",
        project = %assumptions.project_name,
        horizon_years = assumptions.horizon_years,
        npv = evaluation.metrics.npv,
        "Simulation served"
    );
    Ok(evaluation)
}

fn build_simulate_response(evaluation: &Evaluation) -> SimulateResponse {
    SimulateResponse {
        project_name: evaluation.assumptions.project_name.clone(),
        horizon_years: evaluation.assumptions.horizon_years,
        capex_total: evaluation.projection.capex_total,
        metrics: evaluation.metrics,
        kpis: Kpis::from_metrics(&evaluation.metrics),
        cash_flow_table: evaluation.cash_flow_table(),
        co2_table: evaluation.co2_table(),
        free_cash_flow: evaluation.free_cash_flow().to_vec(),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str, field: Option<&'static str>) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            field,
        },
    )
}

fn validation_error_response(err: &ValidationError) -> Response {
    warn!(target: "feasibility.api", field = err.field(), "Rejected assumptions: {err}");
    error_response(StatusCode::BAD_REQUEST, &err.to_string(), Some(err.field()))
}

fn bad_payload(detail: &str) -> Response {
    warn!(target: "feasibility.api", "Rejected payload: {detail}");
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid API payload: {detail}"),
        None,
    )
}
