//! Query handlers

use crate::api::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Shortest and longest accepted user names
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 2..=15;

/// Query string of `GET /get`
#[derive(Debug, Deserialize)]
pub struct RepliesQuery {
    /// User whose replies are requested
    pub u: Option<String>,
    /// `pretty` to indent the response
    pub print: Option<String>,
}

/// Letters, ASCII digits, `_` and `-`, 2 to 15 characters
pub fn is_valid_username(name: &str) -> bool {
    USERNAME_LEN.contains(&name.chars().count())
        && name
            .chars()
            .all(|c| c.is_alphabetic() || c.is_ascii_digit() || c == '_' || c == '-')
}

fn json_response(value: &Value, pretty: bool) -> Response {
    let body = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };

    match body {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /get - Latest replies to a user, newest first
///
/// Invalid or missing user names answer `null`. Stored bodies that are not
/// valid JSON are left out.
pub async fn get_replies(
    State(state): State<AppState>,
    Query(query): Query<RepliesQuery>,
) -> Response {
    let pretty = query.print.as_deref() == Some("pretty");

    let Some(user) = query.u.filter(|u| is_valid_username(u)) else {
        return json_response(&Value::Null, pretty);
    };

    match state.store.replies(&user, state.max_replies).await {
        Ok(bodies) => {
            let replies: Vec<Value> = bodies
                .iter()
                .filter_map(|body| serde_json::from_str(body).ok())
                .collect();
            json_response(&json!({ "replies": replies }), pretty)
        }
        Err(e) => {
            tracing::error!(user = %user, error = %e, "Failed to read replies");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
