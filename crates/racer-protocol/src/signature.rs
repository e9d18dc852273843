//! Request, response, and platform signatures.
//!
//! Every signature here is `md5(pre_image + secret)` rendered as 32 lowercase
//! hex characters. Only the pre-image and the secret differ:
//!
//! | Signature | Pre-image | Secret |
//! |---|---|---|
//! | session request / response | [`canonical_string`] of the body minus `sig` | session secret |
//! | platform query string | `k=v` of every field minus `sig`, sorted by key | app secret |

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use serde_json::{Map, Value};

use crate::types::FIELD_SIGNATURE;
use crate::{ProtocolError, canonical_string};

/// Hashes `input` with MD5 and returns the lowercase hex digest.
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Computes the session signature of `body`, ignoring any `sig` it carries.
pub fn sign(body: &Map<String, Value>, secret: &str) -> String {
    let mut unsigned = body.clone();
    unsigned.remove(FIELD_SIGNATURE);
    let pre_image = canonical_string(&Value::Object(unsigned));
    md5_hex(&format!("{pre_image}{secret}"))
}

/// Writes the session signature of `body` into its `sig` field.
pub fn signify(body: &mut Map<String, Value>, secret: &str) {
    let sig = sign(body, secret);
    body.insert(FIELD_SIGNATURE.to_string(), Value::String(sig));
}

/// Checks the `sig` field of `body` against `secret`.
///
/// # Errors
/// [`ProtocolError::BadSignature`] when `sig` is missing, not a string, or
/// does not match.
pub fn verify(
    body: &Map<String, Value>,
    secret: &str,
) -> Result<(), ProtocolError> {
    let received = body
        .get(FIELD_SIGNATURE)
        .and_then(Value::as_str)
        .ok_or(ProtocolError::BadSignature)?;

    if received == sign(body, secret) {
        Ok(())
    } else {
        Err(ProtocolError::BadSignature)
    }
}

/// Computes a platform query-string signature: `k=v` for every field except
/// `sig`, sorted by key, followed by the app secret.
pub fn query_signature(
    fields: &BTreeMap<String, String>,
    app_secret: &str,
) -> String {
    let pre_image: String = fields
        .iter()
        .filter(|(k, _)| k.as_str() != FIELD_SIGNATURE)
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    md5_hex(&format!("{pre_image}{app_secret}"))
}
