//! Wire protocol for the racer backend.
//!
//! This crate defines what travels between the game client and the server:
//!
//! - **Canonical encoding** ([`canonical_string`]) — an order-independent
//!   rendering of a JSON value, used as the signature pre-image.
//! - **Signatures** ([`sign`], [`verify`], [`query_signature`]) — MD5-based
//!   request/response signatures keyed by a per-session secret, plus the
//!   platform's own query-string signature.
//! - **Types** ([`PullRequest`], [`PushRequest`], [`Reply`], etc.) — the
//!   typed sections of the compact `0/r/c/z` wire format.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — bytes to values and back.
//! - **Errors** ([`ProtocolError`], [`ErrorCode`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about players, tokens, or storage. It only
//! knows how to parse, render, and sign messages.
//!
//! ```text
//! HTTP body (bytes) → Protocol (typed request) → Session / Store
//! ```

mod canonical;
mod codec;
mod error;
mod signature;
mod types;

pub use canonical::canonical_string;
pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use signature::{md5_hex, query_signature, sign, signify, verify};
pub use types::{
    CommonData, CommonPatch, EntryReply, ErrorCode, PlayerId, PullReply,
    PullRequest, PushRequest, Reply, ShopAction, ShopComponentView,
    ShopReply, ShopRequest, ShopSetView, StartReply, StartRequest,
    FIELD_SIGNATURE, PLAYER_LEVEL,
};
