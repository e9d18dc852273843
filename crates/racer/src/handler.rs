//! Request handlers and the signed dispatch pipeline.
//!
//! Every token route runs the same pipeline before its own work:
//!   1. Verify `Content-Type: application/json`
//!   2. Parse the body into a mapping
//!   3. Resolve the hex path token to a live session
//!   4. Verify the body's `sig` with the session secret
//!   5. Dispatch to the route's handler
//!   6. Sign the reply
//!
//! Any step can short-circuit into a failure reply. Failures are signed with
//! the session secret once one is known and with the empty secret before
//! that.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use racer_protocol::{
    Codec, EntryReply, FIELD_SIGNATURE, ProtocolError, PullRequest, PushRequest, Reply,
    ShopAction, ShopRequest, StartReply, StartRequest, verify,
};
use racer_session::Session;
use racer_store::{show_all, show_some};
use serde_json::{Map, Value, json};

use crate::RacerError;
use crate::server::AppState;

/// Secret used to sign replies when no session is known.
const NO_SESSION: &str = "";

/// Body fields that never reach the logs.
const MASKED_FIELDS: [&str; 2] = [FIELD_SIGNATURE, "platformAuthKey"];

// ---------------------------------------------------------------------------
// Signed replies
// ---------------------------------------------------------------------------

/// A reply envelope together with its status and signing secret.
pub(crate) struct Signed {
    status: StatusCode,
    reply: Reply,
    secret: String,
}

impl Signed {
    fn ok(reply: Reply, secret: &str) -> Self {
        Self {
            status: StatusCode::OK,
            reply,
            secret: secret.to_string(),
        }
    }

    /// Converts an error into a failure reply, logging it at a level that
    /// matches who is at fault.
    fn failure(route: &'static str, err: &RacerError, secret: &str) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(route, error = %err, "request failed");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(route, error = %err, "request unauthorized");
        } else {
            tracing::debug!(route, error = %err, "request rejected");
        }

        let code = err.error_code();
        let reply = if err.is_client_facing() {
            Reply::error_with_message(code, err.to_string())
        } else if status == StatusCode::UNAUTHORIZED || status.is_server_error() {
            Reply::failure()
        } else {
            Reply::error(code)
        };

        Self {
            status,
            reply,
            secret: secret.to_string(),
        }
    }

    fn finish(route: &'static str, result: Result<Reply, RacerError>, secret: &str) -> Self {
        match result {
            Ok(reply) => Self::ok(reply, secret),
            Err(err) => Self::failure(route, &err, secret),
        }
    }
}

impl IntoResponse for Signed {
    fn into_response(self) -> Response {
        let body = self.reply.signed(&self.secret);
        (self.status, Json(Value::Object(body))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn require_json(headers: &HeaderMap) -> Result<(), RacerError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if is_json { Ok(()) } else { Err(RacerError::NotJson) }
}

/// Renders a body for logs with secret-bearing fields replaced.
fn masked(object: &Map<String, Value>) -> Value {
    let mut copy = object.clone();
    for field in MASKED_FIELDS {
        if let Some(value) = copy.get_mut(field) {
            *value = Value::String("***".into());
        }
    }
    Value::Object(copy)
}

/// Steps 1–2: content type and body shape.
fn parse_body(
    state: &AppState,
    route: &'static str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Map<String, Value>, RacerError> {
    require_json(headers)?;
    let object = state.codec.decode_object(body)?;
    tracing::debug!(route, body = %masked(&object), "request received");
    Ok(object)
}

/// Steps 1–4 for token routes. On failure, returns the finished failure
/// reply.
async fn authenticate(
    state: &AppState,
    route: &'static str,
    hex_token: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(Session, Map<String, Value>), Signed> {
    let object = parse_body(state, route, headers, body)
        .map_err(|err| Signed::failure(route, &err, NO_SESSION))?;

    let Some(session) = state.sessions.resolve_hex(hex_token).await else {
        return Err(Signed::failure(route, &RacerError::Unauthorized, NO_SESSION));
    };

    if let Err(err) = verify(&object, &session.secret) {
        tracing::warn!(route, player_id = %session.player_id, "request signature mismatch");
        return Err(Signed::failure(route, &err.into(), &session.secret));
    }

    Ok((session, object))
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// `GET /health`
pub(crate) async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// `GET /client?<launch params>`: game-client entry.
pub(crate) async fn client(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Signed {
    let result = async {
        let launch = launch_params(query)?;
        let entered = state.sessions.enter(&launch).await?;
        let body = EntryReply {
            login_stamp: entered.login_ms,
            platform: state.sessions.platform().to_string(),
        };
        Ok::<_, RacerError>(Reply::success().with_body(&body)?)
    }
    .await;
    Signed::finish("client", result, NO_SESSION)
}

/// Collects the launch query into a map. A repeated key would make the
/// platform signature ambiguous, so it is rejected.
fn launch_params(
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<BTreeMap<String, String>, RacerError> {
    let Query(pairs) =
        query.map_err(|rejection| ProtocolError::InvalidMessage(rejection.body_text()))?;

    let mut launch = BTreeMap::new();
    for (key, value) in pairs {
        if launch.contains_key(&key) {
            return Err(ProtocolError::InvalidMessage(format!(
                "launch parameter `{key}` is repeated"
            ))
            .into());
        }
        launch.insert(key, value);
    }
    Ok(launch)
}

/// `POST /start`: exchange a platform proof for a token.
pub(crate) async fn start(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Signed {
    let result = async {
        let object = parse_body(&state, "start", &headers, &body)?;
        let request: StartRequest = state.codec.from_object(object)?;
        let started = state.sessions.start(&request).await?;
        let reply = Reply::success().with_body(&StartReply {
            token: started.token,
            t: started.start_ms,
        })?;
        Ok::<_, RacerError>((reply, started.secret))
    }
    .await;

    match result {
        Ok((reply, secret)) => Signed::ok(reply, &secret),
        Err(err) => Signed::failure("start", &err, NO_SESSION),
    }
}

/// `POST /pull/{token}`
pub(crate) async fn pull(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Signed {
    let (session, object) = match authenticate(&state, "pull", &token, &headers, &body).await {
        Ok(authenticated) => authenticated,
        Err(rejected) => return rejected,
    };

    let result = async {
        let request: PullRequest = state.codec.from_object(object)?;
        let pulled = state.repo.pull(session.player_id, &request).await?;
        Ok::<_, RacerError>(Reply::success().with_body(&pulled)?)
    }
    .await;
    Signed::finish("pull", result, &session.secret)
}

/// `POST /push/{token}`
pub(crate) async fn push(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Signed {
    let (session, object) = match authenticate(&state, "push", &token, &headers, &body).await {
        Ok(authenticated) => authenticated,
        Err(rejected) => return rejected,
    };

    let result = async {
        let request: PushRequest = state.codec.from_object(object)?;
        state.repo.push(session.player_id, &request).await?;
        Ok::<_, RacerError>(Reply::success())
    }
    .await;
    Signed::finish("push", result, &session.secret)
}

/// `POST /shop/{token}`
pub(crate) async fn shop(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Signed {
    let (session, object) = match authenticate(&state, "shop", &token, &headers, &body).await {
        Ok(authenticated) => authenticated,
        Err(rejected) => return rejected,
    };

    let result = (|| {
        let request: ShopRequest = state.codec.from_object(object)?;
        let catalog = state.repo.catalog();
        let listing = match request.action()? {
            ShopAction::ShowAll => show_all(catalog),
            ShopAction::ShowSome { from, to } => show_some(catalog, from, to),
        };
        Ok::<_, RacerError>(Reply::success().with_body(&listing)?)
    })();
    Signed::finish("shop", result, &session.secret)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_require_json_accepts_charset_suffix() {
        assert!(require_json(&headers("application/json")).is_ok());
        assert!(require_json(&headers("application/json; charset=utf-8")).is_ok());
        assert!(require_json(&headers("Application/JSON")).is_ok());
    }

    #[test]
    fn test_require_json_rejects_other_types() {
        assert!(matches!(
            require_json(&headers("text/plain")),
            Err(RacerError::NotJson)
        ));
        assert!(matches!(
            require_json(&HeaderMap::new()),
            Err(RacerError::NotJson)
        ));
    }

    #[test]
    fn test_masked_hides_secrets_only() {
        let body = json!({"sig": "abc", "platformAuthKey": "key", "platformID": "5"});
        let Value::Object(object) = body else { unreachable!() };

        let rendered = masked(&object);

        assert_eq!(rendered["sig"], "***");
        assert_eq!(rendered["platformAuthKey"], "***");
        assert_eq!(rendered["platformID"], "5");
    }

    #[test]
    fn test_failure_validation_carries_message() {
        let err: RacerError = racer_store::StoreError::Validation("level cannot be negative".into()).into();

        let signed = Signed::failure("push", &err, "42");

        assert_eq!(signed.status, StatusCode::OK);
        assert_eq!(signed.reply.fields()["errorCode"], 4);
        assert_eq!(signed.reply.fields()["errorMessage"], "level cannot be negative");
    }

    #[test]
    fn test_launch_params_collects_pairs() {
        let query = Ok(Query(vec![
            ("viewer_id".to_string(), "42".to_string()),
            ("api_id".to_string(), "8000".to_string()),
        ]));

        let launch = launch_params(query).unwrap();

        assert_eq!(launch["viewer_id"], "42");
        assert_eq!(launch["api_id"], "8000");
    }

    #[test]
    fn test_launch_params_repeated_key_is_invalid() {
        let query = Ok(Query(vec![
            ("viewer_id".to_string(), "42".to_string()),
            ("viewer_id".to_string(), "43".to_string()),
        ]));

        let err = launch_params(query).unwrap_err();

        assert!(matches!(
            err,
            RacerError::Protocol(ProtocolError::InvalidMessage(_))
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_failure_duplicate_player_is_409_code_101() {
        let identity = racer_store::PlatformIdentity::new("vk.com", 7);
        let err: RacerError = racer_store::StoreError::DuplicatePlayer(identity).into();

        let signed = Signed::failure("client", &err, NO_SESSION);

        assert_eq!(signed.status, StatusCode::CONFLICT);
        assert_eq!(signed.reply.fields()["errorCode"], 101);
        assert!(!signed.reply.is_success());
    }

    #[test]
    fn test_failure_unauthorized_is_bare() {
        let signed = Signed::failure("pull", &RacerError::Unauthorized, NO_SESSION);

        assert_eq!(signed.status, StatusCode::UNAUTHORIZED);
        assert!(!signed.reply.fields().contains_key("errorCode"));
        assert!(!signed.reply.is_success());
    }
}
