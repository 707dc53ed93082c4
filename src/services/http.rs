use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::referrals::ReferralServiceRequest;
use super::ReferralError;
use crate::models::referrals::NewReferral;
use crate::settings;

#[derive(Clone)]
struct AppState {
    referral_channel: mpsc::Sender<ReferralServiceRequest>,
}

#[derive(Serialize)]
struct ReferralAccepted {
    success: bool,
    message: String,
    referral_id: String,
    referrer_name: String,
}

async fn new_referral(
    State(state): State<AppState>,
    body: Result<Json<NewReferral>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            log::error!("Unreadable referral submission: {}", rejection);
            return internal_error();
        }
    };

    let (referral_tx, referral_rx) = oneshot::channel();

    let send_result = state
        .referral_channel
        .send(ReferralServiceRequest::NewReferral {
            request,
            response: referral_tx,
        })
        .await;
    if let Err(e) = send_result {
        log::error!("Failed to reach referral service: {}", e);
        return internal_error();
    }

    match referral_rx.await {
        Ok(Ok(admitted)) => {
            let response = ReferralAccepted {
                success: true,
                message: "Referral recorded successfully".to_string(),
                referral_id: admitted.referral_id,
                referrer_name: admitted.referrer_name,
            };
            (StatusCode::OK, Json(json!(response)))
        }
        Ok(Err(error)) => rejection_response(error),
        Err(e) => {
            log::error!("Referral service dropped the request: {}", e);
            internal_error()
        }
    }
}

fn rejection_response(error: ReferralError) -> (StatusCode, Json<serde_json::Value>) {
    let status = if error.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else {
        log::error!("Referral admission failed: {:?}", error);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(json!({ "success": false, "error": error.to_string() })))
}

fn internal_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal server error" })),
    )
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

pub fn router(referral_channel: mpsc::Sender<ReferralServiceRequest>) -> Router {
    let app_state = AppState { referral_channel };

    Router::new()
        .route("/new-referral", post(new_referral))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors())
}

pub async fn start_http_server(
    server: settings::Server,
    referral_channel: mpsc::Sender<ReferralServiceRequest>,
) -> Result<(), anyhow::Error> {
    let app = router(referral_channel);

    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port)).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
