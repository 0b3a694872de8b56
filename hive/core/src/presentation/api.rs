// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// HTTP Control Surface
//
// Thin axum layer over the core services. Every failure renders as
// {"status": "error", "result": <message>} with a non-success status code.

use crate::application::pipeline::TaskPipeline;
use crate::application::swarm_service::SwarmService;
use crate::domain::agent::{AgentConfig, AgentId, AgentState};
use crate::domain::plugin::{ActionParams, PluginCategory};
use crate::infrastructure::action_handler::ActionHandler;
use crate::infrastructure::plugins::registry::PluginRegistry;
use crate::infrastructure::resource_manager::ResourceManager;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub registry: Arc<PluginRegistry>,
    pub resources: Arc<ResourceManager>,
    pub actions: Arc<ActionHandler>,
    pub pipeline: Arc<TaskPipeline>,
    pub swarm: Arc<dyn SwarmService>,
    pub agents_dir: PathBuf,
    pub stop_timeout: Duration,
    pub current_agent: Mutex<Option<AgentConfig>>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/agents/{name}/load", post(load_agent))
        .route("/connections", get(list_connections))
        .route("/connections/{name}/status", get(connection_status))
        .route("/connections/{name}/configure", post(configure_connection))
        .route("/agent/action", post(agent_action))
        .route("/agent/task", post(agent_task))
        .route("/swarm", post(start_swarm))
        .route("/swarm/stop", post(stop_swarm))
        .with_state(state)
}

type ApiError = (StatusCode, Json<Value>);

fn error(code: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (code, Json(json!({"status": "error", "result": message.to_string()})))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let agent = state.current_agent.lock().as_ref().map(|a| a.name.clone());
    let agent_running = state
        .swarm
        .agent_states()
        .values()
        .any(|s| *s == AgentState::Running);
    let resources = state.resources.stats();
    Json(json!({
        "status": "running",
        "agent": agent,
        "agent_running": agent_running,
        "resources": {
            "total": resources.total,
            "free": resources.free,
            "acquired": resources.acquired,
            "destroyed": resources.destroyed,
        },
    }))
}

async fn load_agent(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let config = AgentConfig::load(&state.agents_dir, &AgentId::new(&name))
        .map_err(|e| error(StatusCode::NOT_FOUND, e))?;
    let display_name = config.name.clone();
    *state.current_agent.lock() = Some(config);
    Ok(Json(json!({"status": "success", "agent": display_name})))
}

async fn list_connections(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut connections = serde_json::Map::new();
    for descriptor in state.registry.list(Some(PluginCategory::Connection)) {
        let configured = state
            .registry
            .get_connection(&descriptor.name)
            .map(|c| c.is_configured())
            .unwrap_or(false);
        connections.insert(
            descriptor.name.clone(),
            json!({"version": descriptor.version, "configured": configured}),
        );
    }
    Json(json!({"connections": connections}))
}

async fn connection_status(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let connection = state
        .registry
        .get_connection(&name)
        .map_err(|e| error(StatusCode::NOT_FOUND, e))?;
    Ok(Json(json!({
        "name": name,
        "configured": connection.is_configured(),
        "actions": connection.actions(),
    })))
}

#[derive(Deserialize)]
struct ConfigureRequest {
    #[serde(default)]
    params: Value,
}

async fn configure_connection(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(payload): Json<ConfigureRequest>,
) -> Result<Json<Value>, ApiError> {
    let connection = state
        .registry
        .get_connection(&name)
        .map_err(|e| error(StatusCode::NOT_FOUND, e))?;
    let params = if payload.params.is_null() { json!({}) } else { payload.params };
    connection
        .initialize(&params)
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
    Ok(Json(json!({"status": "success"})))
}

#[derive(Deserialize)]
struct ActionRequest {
    #[serde(default)]
    connection: Option<String>,
    action: String,
    #[serde(default)]
    params: ActionParams,
}

async fn agent_action(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ActionRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = match payload.connection {
        Some(connection) => {
            let plugin = state
                .registry
                .get_connection(&connection)
                .map_err(|e| error(StatusCode::NOT_FOUND, e))?;
            plugin
                .perform_action(&payload.action, payload.params)
                .await
                .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?
        }
        None => state
            .actions
            .execute(&payload.action, payload.params)
            .await
            .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?,
    };
    Ok(Json(json!({"status": "success", "result": result})))
}

#[derive(Deserialize)]
struct TaskRequest {
    task: String,
    #[serde(rename = "loop", default)]
    loop_task: bool,
    #[serde(default)]
    context: Value,
}

async fn agent_task(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let context = if payload.context.is_null() { json!({}) } else { payload.context };
    let report = state
        .pipeline
        .run(&payload.task, context, payload.loop_task)
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(json!({"status": "success", "result": report})))
}

#[derive(Deserialize)]
struct SwarmRequest {
    agent_ids: Vec<String>,
}

async fn start_swarm(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SwarmRequest>,
) -> Result<Json<Value>, ApiError> {
    let ids = payload.agent_ids.into_iter().map(AgentId::new).collect();
    let report = state
        .swarm
        .start(ids)
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
    Ok(Json(json!({"status": "success", "result": report})))
}

async fn stop_swarm(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let report = state
        .swarm
        .stop(state.stop_timeout)
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(json!({"status": "success", "result": report})))
}
