//! Core protocol types for the racer wire format.
//!
//! Request bodies use single-character section names:
//!
//! | Key | Section | Pull (read) | Push (write) |
//! |---|---|---|---|
//! | `"0"` | common player data | list of field names | `{"level": n}` |
//! | `"r"` | resources | list of names | `{name: count}` |
//! | `"c"` | costumes | list of names | `{name: bool}` |
//! | `"z"` | timers | list of names | ignored |
//!
//! Each section is a fixed, optional, typed field. An omitted section is
//! `None` and produces no output section; an empty list is a real selector
//! with category-specific "everything" semantics.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;
use crate::signature::signify;

/// Name of the signature field in every signed body.
pub const FIELD_SIGNATURE: &str = "sig";
const FIELD_IS_SUCCESS: &str = "isSuccess";
const FIELD_ERROR_CODE: &str = "errorCode";
const FIELD_ERROR_MESSAGE: &str = "errorMessage";

/// The only readable/writable common-data field besides `playerID`.
pub const PLAYER_LEVEL: &str = "level";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Server-assigned identifier of a player.
///
/// Serialized as the bare number (`#[serde(transparent)]`), so it appears as
/// `"playerID": 17` in pull responses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Stable numeric error codes carried in `errorCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 0: anything not covered below.
    Unrecognized,
    /// 1: the request was not `application/json`.
    NotJson,
    /// 2: the body is not a well-formed JSON request.
    MalformedJson,
    /// 3: a required parameter is missing.
    InsufficientParameters,
    /// 4: a value failed validation; carries a human-readable message.
    Validation,
    /// 101: the player already exists.
    DuplicatePlayer,
}

impl ErrorCode {
    /// The number sent on the wire.
    pub fn code(self) -> u16 {
        match self {
            Self::Unrecognized => 0,
            Self::NotJson => 1,
            Self::MalformedJson => 2,
            Self::InsufficientParameters => 3,
            Self::Validation => 4,
            Self::DuplicatePlayer => 101,
        }
    }

    /// Default `errorMessage` for this code.
    pub fn message(self) -> &'static str {
        match self {
            Self::Unrecognized => "Unrecognized JSON error.",
            Self::NotJson => "Only JSON requests are allowed.",
            Self::MalformedJson => "Wrong JSON request.",
            Self::InsufficientParameters => {
                "Parameters are not enough to perform the request."
            }
            Self::Validation => "Validation failed.",
            Self::DuplicatePlayer => "The player already exists.",
        }
    }
}

// ---------------------------------------------------------------------------
// Reply envelope
// ---------------------------------------------------------------------------

/// A response envelope under construction.
///
/// Every reply carries `isSuccess`; failures may add `errorCode` and
/// `errorMessage`. Handler-specific bodies are merged in with
/// [`with_body`](Self::with_body), and [`signed`](Self::signed) produces the
/// final mapping with `sig` attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    fields: Map<String, Value>,
}

impl Reply {
    /// `{"isSuccess": 1}`.
    pub fn success() -> Self {
        Self::with_flag(1)
    }

    /// `{"isSuccess": 0}` with no error code.
    pub fn failure() -> Self {
        Self::with_flag(0)
    }

    /// A failure with `code` and its default message.
    pub fn error(code: ErrorCode) -> Self {
        Self::error_with_message(code, code.message())
    }

    /// A failure with `code` and a custom message.
    pub fn error_with_message(
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        let mut reply = Self::failure();
        reply
            .fields
            .insert(FIELD_ERROR_CODE.into(), Value::from(code.code()));
        reply
            .fields
            .insert(FIELD_ERROR_MESSAGE.into(), Value::String(message.into()));
        reply
    }

    fn with_flag(flag: u8) -> Self {
        let mut fields = Map::new();
        fields.insert(FIELD_IS_SUCCESS.into(), Value::from(flag));
        Self { fields }
    }

    /// Returns `true` if `isSuccess` is 1.
    pub fn is_success(&self) -> bool {
        self.fields.get(FIELD_IS_SUCCESS) == Some(&Value::from(1u8))
    }

    /// Merges the fields of a serializable body into the envelope.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if `body` cannot be serialized, or
    /// [`ProtocolError::InvalidMessage`] if it is not a mapping.
    pub fn with_body<T: Serialize>(
        mut self,
        body: &T,
    ) -> Result<Self, ProtocolError> {
        match serde_json::to_value(body).map_err(ProtocolError::Encode)? {
            Value::Object(map) => {
                self.fields.extend(map);
                Ok(self)
            }
            _ => Err(ProtocolError::InvalidMessage(
                "reply body must serialize to an object".into(),
            )),
        }
    }

    /// Read access to the fields assembled so far.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Signs the envelope with `secret` and returns the final mapping.
    pub fn signed(mut self, secret: &str) -> Map<String, Value> {
        signify(&mut self.fields, secret);
        self.fields
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /start`.
///
/// Platforms are inconsistent about sending ids as numbers or strings, so
/// every field accepts any scalar and keeps its text form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StartRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform: String,
    #[serde(rename = "platformID", default, deserialize_with = "lenient_string")]
    pub platform_id: String,
    #[serde(
        rename = "platformAPIID",
        default,
        deserialize_with = "lenient_string"
    )]
    pub platform_api_id: String,
    #[serde(
        rename = "platformAuthKey",
        default,
        deserialize_with = "lenient_string"
    )]
    pub platform_auth_key: String,
}

/// Body of `POST /pull/{token}`: which fields of each section to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    #[serde(rename = "0", default)]
    pub common: Option<Vec<String>>,
    #[serde(rename = "r", default)]
    pub resources: Option<Vec<String>>,
    #[serde(rename = "c", default)]
    pub costumes: Option<Vec<String>>,
    #[serde(rename = "z", default)]
    pub timers: Option<Vec<String>>,
}

/// Body of `POST /push/{token}`: new values for each writable section.
///
/// Values stay as raw JSON here; range and type checks belong to the store,
/// which reports them as validation failures rather than decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushRequest {
    #[serde(rename = "0", default)]
    pub common: Option<CommonPatch>,
    #[serde(rename = "r", default)]
    pub resources: Option<BTreeMap<String, Value>>,
    #[serde(rename = "c", default)]
    pub costumes: Option<BTreeMap<String, Value>>,
    /// Timers are not client-writable. Accepted so old clients that echo the
    /// section back are not rejected, then dropped.
    #[serde(rename = "z", default)]
    pub timers: Option<IgnoredAny>,
}

/// The `"0"` section of a push. Unknown keys (such as an echoed `playerID`)
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommonPatch {
    #[serde(default)]
    pub level: Option<Value>,
}

/// Body of `POST /shop/{token}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShopRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub from: Option<Value>,
    #[serde(default)]
    pub to: Option<Value>,
}

/// A parsed shop action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopAction {
    ShowAll,
    /// Inclusive index range; unparseable bounds arrive as -1.
    ShowSome { from: i64, to: i64 },
}

impl ShopRequest {
    /// Interprets the `action` field.
    ///
    /// # Errors
    /// [`ProtocolError::MissingParameter`] if `action` is absent or unknown.
    pub fn action(&self) -> Result<ShopAction, ProtocolError> {
        match self.action.as_deref() {
            Some("showAll") => Ok(ShopAction::ShowAll),
            Some("showSome") => Ok(ShopAction::ShowSome {
                from: lenient_int(self.from.as_ref()).unwrap_or(-1),
                to: lenient_int(self.to.as_ref()).unwrap_or(-1),
            }),
            _ => Err(ProtocolError::MissingParameter("action")),
        }
    }
}

fn lenient_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Reply bodies
// ---------------------------------------------------------------------------

/// Body of a successful `/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReply {
    pub token: String,
    /// Session start stamp in epoch milliseconds.
    pub t: i64,
}

/// Body of a successful game-client entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReply {
    pub login_stamp: i64,
    pub platform: String,
}

/// The `"0"` section of a pull reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonData {
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

/// Body of a successful pull. Sections mirror the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullReply {
    #[serde(rename = "0", skip_serializing_if = "Option::is_none")]
    pub common: Option<CommonData>,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub resources: Option<BTreeMap<String, u64>>,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub costumes: Option<BTreeMap<String, bool>>,
    /// Remaining milliseconds per timer.
    #[serde(rename = "z", skip_serializing_if = "Option::is_none")]
    pub timers: Option<BTreeMap<String, u64>>,
}

/// Body of a successful shop listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopReply {
    #[serde(rename = "shopSetsCount")]
    pub shop_sets_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<usize>,
    #[serde(rename = "shopSets")]
    pub shop_sets: Vec<ShopSetView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopSetView {
    pub name: String,
    pub price: u32,
    pub components: Vec<ShopComponentView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopComponentView {
    pub name: String,
    pub count: u32,
}
