//! HTTP endpoints
//!
//! REST API over the orchestrator. Transport-thin: handlers validate,
//! delegate, and shape responses; all behaviour lives below.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use leadflow_compliance::{ComplianceStatus, OptOutReason};
use leadflow_core::conversation::{InboundMessage, RawMessage};
use leadflow_core::events::OrchestrationEvent;
use leadflow_core::lead::{Channel, LeadKind};
use leadflow_core::plan::OutboundPlan;
use leadflow_core::scoring::TrajectoryForecast;
use leadflow_intent::forecast_trajectory;
use leadflow_orchestrator::InboundOutcome;
use leadflow_session::SessionSnapshot;
use leadflow_workflows::ProspectSourcer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState, cors_origins: &[String], cors_enabled: bool) -> Router {
    let cors_layer = build_cors_layer(cors_origins, cors_enabled);

    Router::new()
        .route("/api/inbound", post(handle_inbound))
        .route("/api/opt-out", post(process_opt_out))
        .route("/api/compliance-status", get(compliance_status))
        .route("/api/sessions/:lead_id", get(get_session))
        .route("/admin/prospecting/pull", post(prospecting_pull))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS disabled - allowing all origins (not for production)");
        return CorsLayer::permissive();
    }

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
                None
            })
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundRequest {
    #[serde(alias = "leadID")]
    lead_id: Option<String>,
    #[serde(default)]
    lead_name: Option<String>,
    channel: Channel,
    content: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    lead_kind_hint: Option<LeadKind>,
    /// Prior conversation context for a freshly-seeded session
    #[serde(default)]
    history: Vec<RawMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InboundResponse {
    outbound_plan: OutboundPlan,
    session_snapshot: Option<SessionSnapshot>,
    events: Vec<OrchestrationEvent>,
}

impl From<InboundOutcome> for InboundResponse {
    fn from(outcome: InboundOutcome) -> Self {
        Self {
            outbound_plan: outcome.plan,
            session_snapshot: outcome.snapshot,
            events: outcome.events,
        }
    }
}

async fn handle_inbound(
    State(state): State<AppState>,
    Json(request): Json<InboundRequest>,
) -> Result<Json<InboundResponse>, ServerError> {
    let lead_id = request
        .lead_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ServerError::InvalidRequest("missing leadID".to_string()))?;
    let content = request
        .content
        .ok_or(ServerError::InvalidRequest("missing content".to_string()))?;

    let seed_history = RawMessage::validate_history(&request.history)
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

    let mut msg = InboundMessage::new(lead_id, request.channel, content);
    msg.lead_name = request.lead_name;
    msg.phone = request.phone;
    msg.lead_kind_hint = request.lead_kind_hint;
    msg.seed_history = seed_history;

    let outcome = state.orchestrator.handle_inbound(msg).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
struct OptOutRequest {
    phone: String,
    reason: OptOutReason,
}

async fn process_opt_out(
    State(state): State<AppState>,
    Json(request): Json<OptOutRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state
        .orchestrator
        .process_opt_out(&request.phone, request.reason)
        .await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
struct PhoneQuery {
    phone: String,
}

async fn compliance_status(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<ComplianceStatus>, ServerError> {
    let status = state.orchestrator.compliance_status(&query.phone).await?;
    Ok(Json(status))
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    #[serde(flatten)]
    snapshot: SessionSnapshot,
    /// Linear extrapolation over the recent score snapshots
    trajectory: TrajectoryForecast,
}

async fn get_session(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<SessionResponse>, ServerError> {
    let snapshot = state
        .sessions
        .snapshot(&lead_id)
        .await
        .ok_or_else(|| ServerError::NotFound(format!("no session for lead {lead_id}")))?;

    let trajectory = forecast_trajectory(&snapshot.score_history);
    Ok(Json(SessionResponse {
        snapshot,
        trajectory,
    }))
}

#[derive(Debug, Deserialize)]
struct ProspectingPullRequest {
    stale_stage_id: String,
    #[serde(default = "default_inactive_days")]
    inactive_days: i64,
    #[serde(default = "default_pull_limit")]
    limit: usize,
}

fn default_inactive_days() -> i64 {
    90
}

fn default_pull_limit() -> usize {
    50
}

async fn prospecting_pull(
    State(state): State<AppState>,
    Json(request): Json<ProspectingPullRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let sourcer = ProspectSourcer::new(
        request.stale_stage_id,
        request.inactive_days,
        request.limit,
    );
    let enrolled = state.orchestrator.run_prospecting_pull(&sourcer).await?;
    Ok(Json(serde_json::json!({"enrolled": enrolled})))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "active_sessions": state.sessions.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    use leadflow_config::Settings;
    use leadflow_crm::{InMemoryCrm, StaticCmaGenerator};
    use leadflow_llm::TemplateDrafter;

    async fn test_state() -> AppState {
        AppState::build(
            Settings::default(),
            Arc::new(InMemoryCrm::new()),
            Arc::new(TemplateDrafter),
            Arc::new(StaticCmaGenerator::default()),
        )
        .await
        .unwrap()
    }

    async fn request(router: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_inbound_round_trip() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, body) = request(
            router,
            post_json(
                "/api/inbound",
                serde_json::json!({
                    "leadID": "lead-1",
                    "leadName": "Sam",
                    "channel": "chat",
                    "content": "I want to sell my house soon",
                    "leadKindHint": "seller",
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["outboundPlan"]["reply_text"].is_string());
        assert_eq!(body["sessionSnapshot"]["lead_id"], "lead-1");
        assert!(body["events"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn test_missing_lead_id_is_400() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, body) = request(
            router,
            post_json(
                "/api/inbound",
                serde_json::json!({"channel": "sms", "content": "hello"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("leadID"));
    }

    #[tokio::test]
    async fn test_missing_content_is_400() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, _) = request(
            router,
            post_json(
                "/api/inbound",
                serde_json::json!({"leadID": "lead-2", "channel": "sms"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_seed_history_is_400() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, body) = request(
            router,
            post_json(
                "/api/inbound",
                serde_json::json!({
                    "leadID": "lead-h",
                    "channel": "chat",
                    "content": "hello",
                    "history": [{"role": "user"}],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("malformed history"));
    }

    #[tokio::test]
    async fn test_seed_history_shapes_first_analysis() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, body) = request(
            router,
            post_json(
                "/api/inbound",
                serde_json::json!({
                    "leadID": "lead-s",
                    "channel": "chat",
                    "content": "Yes, that's still the plan",
                    "history": [
                        {"role": "user", "content": "I need to sell my house fast, divorce"},
                        {"role": "assistant", "content": "Understood — what timeline?"},
                    ],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Seeded turns plus the new inbound and the reply
        let history_len = body["sessionSnapshot"]["history"].as_array().unwrap().len();
        assert!(history_len >= 3);
    }

    #[tokio::test]
    async fn test_opt_out_and_status() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, _) = request(
            router.clone(),
            post_json(
                "/api/opt-out",
                serde_json::json!({"phone": "+15125550100", "reason": "user-request"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = request(
            router,
            Request::builder()
                .uri("/api/compliance-status?phone=%2B15125550100")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["opted_out"], true);
    }

    #[tokio::test]
    async fn test_session_endpoint_includes_trajectory() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, _) = request(
            router.clone(),
            post_json(
                "/api/inbound",
                serde_json::json!({
                    "leadID": "lead-t",
                    "channel": "chat",
                    "content": "thinking about selling next year",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = request(
            router,
            Request::builder()
                .uri("/api/sessions/lead-t")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lead_id"], "lead-t");
        assert_eq!(body["trajectory"]["trajectory"], "insufficient_data");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, _) = request(
            router,
            Request::builder()
                .uri("/api/sessions/ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prospecting_pull_endpoint() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, body) = request(
            router,
            post_json(
                "/admin/prospecting/pull",
                serde_json::json!({"stale_stage_id": "stage-stale", "limit": 10}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enrolled"], 0, "empty CRM yields no prospects");
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state().await;
        let router = create_router(state, &[], true);

        let (status, body) = request(
            router,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
