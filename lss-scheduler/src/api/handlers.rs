//! HTTP request handlers
//!
//! Protocol-level failures (unknown playlist, bad parameters, ...) are
//! answered with HTTP 200 and `"result":"failed"`; only transport problems
//! use HTTP error codes.

use crate::api::server::AppContext;
use crate::error::Error;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandParams {
    #[serde(rename = "Command")]
    command: String,
    #[serde(rename = "Parameters", default)]
    parameters: String,
    /// Playlist selected on the calling surface
    #[serde(rename = "Selected")]
    selected: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(rename = "Query")]
    query: String,
    #[serde(rename = "Parameters", default)]
    parameters: String,
}

#[derive(Debug, Deserialize)]
pub struct StashParams {
    #[serde(rename = "Command")]
    command: String,
    #[serde(rename = "Key")]
    key: String,
}

fn failed(message: impl Into<String>) -> Value {
    json!({ "result": "failed", "message": message.into() })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "lss-scheduler".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /xScheduleCommand
pub async fn command(
    State(ctx): State<AppContext>,
    Query(params): Query<CommandParams>,
) -> Json<Value> {
    let outcome = ctx.commands.execute(
        &params.command,
        &params.parameters,
        params.selected.as_deref(),
    );

    if !outcome.success {
        return Json(failed(outcome.message));
    }
    match outcome.rate {
        Some(rate) => Json(json!({ "result": "ok", "rate": rate })),
        None => Json(json!({ "result": "ok" })),
    }
}

/// GET /xScheduleQuery
pub async fn query(
    State(ctx): State<AppContext>,
    Query(params): Query<QueryParams>,
) -> Json<Value> {
    let outcome = ctx.queries.execute(&params.query, &params.parameters);
    if outcome.success {
        return Json(outcome.data);
    }

    // Failure marker merged into the query's empty payload
    let mut body = match outcome.data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    body.insert("result".to_string(), json!("failed"));
    body.insert("message".to_string(), json!(outcome.message));
    Json(Value::Object(body))
}

/// GET|POST /xScheduleStash
pub async fn stash(
    State(ctx): State<AppContext>,
    Query(params): Query<StashParams>,
    body: String,
) -> Response {
    match params.command.as_str() {
        "Store" => match ctx.stash.store(&params.key, &body).await {
            Ok(()) => Json(json!({ "result": "ok" })).into_response(),
            Err(e) => Json(failed(e.to_string())).into_response(),
        },
        "Retrieve" => match ctx.stash.retrieve(&params.key).await {
            Ok(data) => data.into_response(),
            Err(e) => Json(failed(e.to_string())).into_response(),
        },
        _ => Json(failed(Error::UnknownCommand.to_string())).into_response(),
    }
}
