//! REST API server for sandboxed interactive code execution
//!
//! Each execution is a session: code goes in, a newline-delimited JSON
//! event stream comes back, and input/stop arrive as separate calls.
//!
//! ## Endpoints
//!
//! POST   /api/v1/sessions            - Start a session (streams events)
//! POST   /api/v1/sessions/{id}/input - Answer a pending input request
//! DELETE /api/v1/sessions/{id}       - Stop a session
//! GET    /api/v1/sessions            - List live sessions
//! GET    /health                     - Liveness probe

use std::sync::Arc;

use actix_web::web::Bytes;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use futures::StreamExt;
use runbox::{
    DockerBackend, RunboxError, RunnerConfigBuilder, Session, SessionSupervisor,
    StaleSessionReaper,
};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = RunnerConfigBuilder::new()
        .build()
        .expect("default configuration is valid");
    let backend = Arc::new(DockerBackend::new(config.clone()));
    let supervisor = SessionSupervisor::new(config, backend);
    let _reaper = StaleSessionReaper::spawn(Arc::clone(&supervisor));

    let state = web::Data::new(AppState { supervisor });

    println!("runbox server starting on http://127.0.0.1:8080");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .route("/sessions", web::post().to(start_session))
                    .route("/sessions", web::get().to(list_sessions))
                    .route("/sessions/{id}/input", web::post().to(submit_input))
                    .route("/sessions/{id}", web::delete().to(stop_session)),
            )
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await
}

// ============ API Types ============

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionRequest {
    /// Source code to execute
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitInputRequest {
    /// Answer to the pending input request
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

// ============ Application State ============

pub struct AppState {
    supervisor: Arc<SessionSupervisor>,
}

// ============ Handlers ============

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "runbox",
        "version": "0.1.0"
    }))
}

/// Start a session and stream its events
async fn start_session(
    req: web::Json<StartSessionRequest>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.supervisor.start_session(req.into_inner().code).await {
        Ok((_, events)) => {
            let stream = ReceiverStream::new(events)
                .map(|event| Ok::<Bytes, actix_web::Error>(Bytes::from(event.to_line())));
            HttpResponse::Ok()
                .content_type("application/x-ndjson")
                .streaming(stream)
        }
        Err(e @ RunboxError::RuntimeUnavailable(_)) => {
            HttpResponse::ServiceUnavailable().json(ApiResponse::<()>::error(e.to_string()))
        }
        Err(e) => HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string())),
    }
}

/// Answer a session's pending input request
async fn submit_input(
    id: web::Path<String>,
    req: web::Json<SubmitInputRequest>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state
        .supervisor
        .submit_input(id.as_str(), req.into_inner().input)
    {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::ok(
            "Input accepted",
            serde_json::json!({"sessionId": id.as_str()}),
        )),
        Err(e @ RunboxError::NoSuchSession(_)) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error(e.to_string()))
        }
        Err(e @ (RunboxError::NotAwaitingInput(_) | RunboxError::NoSuchPendingInput(_))) => {
            HttpResponse::Conflict().json(ApiResponse::<()>::error(e.to_string()))
        }
        Err(e) => HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string())),
    }
}

/// Stop a session
async fn stop_session(id: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    match state.supervisor.stop_session(id.as_str()) {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::ok(
            format!("Session stopped: {}", id),
            serde_json::json!({"sessionId": id.as_str()}),
        )),
        Err(e @ RunboxError::NoSuchSession(_)) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error(e.to_string()))
        }
        Err(e) => HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string())),
    }
}

/// List live sessions
async fn list_sessions(state: web::Data<AppState>) -> impl Responder {
    let sessions: Vec<Session> = state.supervisor.registry().list_active();
    HttpResponse::Ok().json(ApiResponse::ok(
        format!("Found {} sessions", sessions.len()),
        sessions,
    ))
}
