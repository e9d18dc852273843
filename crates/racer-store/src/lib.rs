//! # racer-store
//!
//! Player state for the racer backend: the static game catalog, the
//! in-memory player store with per-player row locks, and the repository
//! that reads and writes player state by catalog name.
//!
//! ## Key types
//!
//! - [`Catalog`] / [`StaticCatalog`]: resources, costumes, timer kinds,
//!   shop sets, and initial grants, loaded from a [`CatalogSeed`].
//! - [`Store`]: player rows, identity index, token index.
//! - [`PlayerRepository`]: pull, push, and timer scheduling as units of work.
//! - [`shop`]: shop listing and range normalization.

pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod repository;
pub mod shop;
pub mod store;

pub use catalog::{
    Catalog, CatalogSeed, ComponentSeed, Costume, InitialResource, InitialResourceSeed,
    Resource, ShopSet, ShopSetComponent, ShopSetSeed, StaticCatalog, TimerKind, TimerSeed,
};
pub use config::Limits;
pub use error::StoreError;
pub use model::{
    CostumeId, PlatformIdentity, Player, PlayerRecord, ResourceId, ShopSetId, TimerId,
};
pub use repository::PlayerRepository;
pub use shop::{normalize_range, show_all, show_some};
pub use store::{EnteredPlayer, Store};
