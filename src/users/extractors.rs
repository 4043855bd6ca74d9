use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap},
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{error::ApiError, state::AppState, users::repo::User};

/// Parses the `:id` segment. Non-digit segments behave like an unmatched route.
pub fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::NotFound);
    }
    raw.parse::<i64>().map_err(|_| ApiError::InvalidUserId)
}

/// The user named by the `:id` path segment, loaded once before the handler runs.
pub struct LoadedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for LoadedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;
        let id = parse_user_id(&raw)?;

        match User::find_by_id(&state.db, id).await? {
            Some(user) => Ok(LoadedUser(user)),
            None => {
                debug!(id, "user not found");
                Err(ApiError::NotFound)
            }
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON object body. Non-JSON and empty bodies read as `{}`, as do arrays.
/// Malformed JSON and bare scalars are unreadable and fail with a 500.
pub struct JsonBody(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json(req.headers()) {
            return Ok(JsonBody(Map::new()));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Internal(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(Map::new()));
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(JsonBody(map)),
            Ok(Value::Array(_)) => Ok(JsonBody(Map::new())),
            Ok(other) => {
                warn!(kind = json_kind(&other), "json body is not an object or array");
                Err(ApiError::Internal(format!(
                    "JSON body must be an object or array, got {}",
                    json_kind(&other)
                )))
            }
            Err(e) => {
                warn!(error = %e, "malformed json body");
                Err(ApiError::Internal(e.to_string()))
            }
        }
    }
}
