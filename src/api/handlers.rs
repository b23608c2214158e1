//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, LoopSummary, StateResponse, TelemetryQuery, TelemetryRecord};
use crate::runner::OptimalStartRun;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorResponse { error: message }))
}

/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let loops = state
        .loops
        .iter()
        .map(|l| LoopSummary {
            label: l.label,
            kpi: l.kpi.clone(),
            latest_step: l.results.last().map(|r| TelemetryRecord::new(l.label, r)),
        })
        .collect();

    Json(StateResponse {
        config: state.config.clone(),
        loops,
    })
}

/// Returns tick records, optionally filtered by loop and timestep range.
///
/// `GET /telemetry` → 200 + every loop's records
/// `GET /telemetry?loop=static_pressure&from=N&to=M` → one loop, inclusive range
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
/// `GET /telemetry?loop=unknown` → 404 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!("`from` ({from}) must be <= `to` ({to})"),
        ));
    }

    if let Some(name) = &query.loop_name {
        if !state.loops.iter().any(|l| l.label == name.as_str()) {
            return Err(error(StatusCode::NOT_FOUND, format!("unknown loop \"{name}\"")));
        }
    }

    let records: Vec<TelemetryRecord> = state
        .loops
        .iter()
        .filter(|l| query.loop_name.as_deref().is_none_or(|n| n == l.label))
        .flat_map(|l| {
            l.results
                .iter()
                .filter(|r| r.timestep >= from && r.timestep <= to)
                .map(|r| TelemetryRecord::new(l.label, r))
        })
        .collect();

    Ok(Json(records))
}

/// `GET /optimal-start` → 200 + `OptimalStartRun` JSON
pub async fn get_optimal_start(State(state): State<Arc<AppState>>) -> Json<OptimalStartRun> {
    Json(state.optimal_start.clone())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::io::history::sample_week;
    use crate::runner::{STATIC_PRESSURE, estimate_start, run_scenario};

    fn make_test_state() -> Arc<AppState> {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.steps = 24;
        cfg.optimal_start.date = Some("2024-01-08".into());
        let run = run_scenario(&cfg, &sample_week()).unwrap();
        Arc::new(AppState::from(run))
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn state_returns_200() {
        let (status, json) = get_json(make_test_state(), "/state").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("config").is_some());
        let loops = json["loops"].as_array().unwrap();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0]["loop"], STATIC_PRESSURE);
        assert_eq!(loops[0]["latest_step"]["timestep"], 23);
    }

    #[tokio::test]
    async fn telemetry_returns_all_loops() {
        let (status, json) = get_json(make_test_state(), "/telemetry").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 48);
    }

    #[tokio::test]
    async fn telemetry_loop_and_range_query() {
        let (status, json) =
            get_json(make_test_state(), "/telemetry?loop=static_pressure&from=5&to=10").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["timestep"], 5);
        assert_eq!(rows[5]["timestep"], 10);
        assert!(rows.iter().all(|r| r["loop"] == STATIC_PRESSURE));
    }

    #[tokio::test]
    async fn telemetry_invalid_range_returns_400() {
        let (status, json) = get_json(make_test_state(), "/telemetry?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn telemetry_unknown_loop_returns_404() {
        let (status, _) = get_json(make_test_state(), "/telemetry?loop=chiller").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn optimal_start_reports_lead_time() {
        let state = make_test_state();
        let expected = estimate_start(
            &{
                let mut c = ScenarioConfig::baseline();
                c.simulation.steps = 24;
                c
            },
            &sample_week(),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        )
        .unwrap();
        let (status, json) = get_json(state, "/optimal-start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["lead"]["minutes"], expected.lead.minutes);
        assert_eq!(json["accepted"], 7);
        assert!(json["start_at"].is_string());
    }
}
