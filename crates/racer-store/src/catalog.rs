//! Read-only catalogs: resources, costumes, timers, shop sets, and the seed
//! data applied to new players.
//!
//! The repository never reaches for a global table. It asks an injected
//! [`Catalog`] to resolve names, so tests can hand it a small fixture.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{CostumeId, ResourceId, ShopSetId, StoreError, TimerId};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Costume {
    pub id: CostumeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerKind {
    pub id: TimerId,
    pub name: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSet {
    pub id: ShopSetId,
    pub name: String,
    pub price: u32,
    /// At least one, unique per resource, each count ≥ 1.
    pub components: Vec<ShopSetComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShopSetComponent {
    pub resource: ResourceId,
    pub count: u32,
}

/// A resource every new player starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialResource {
    pub resource: ResourceId,
    pub count: u64,
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// Read access to the shared catalogs.
///
/// Implementors provide the slices; name lookups have linear default
/// implementations that an indexed catalog can override.
pub trait Catalog: Send + Sync + 'static {
    fn resources(&self) -> &[Resource];
    fn costumes(&self) -> &[Costume];
    fn timers(&self) -> &[TimerKind];
    /// Shop sets in ascending id order.
    fn shop_sets(&self) -> &[ShopSet];
    fn initial_resources(&self) -> &[InitialResource];
    fn initial_costumes(&self) -> &[CostumeId];

    fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resources().iter().find(|r| r.name == name).map(|r| r.id)
    }

    fn resource_name(&self, id: ResourceId) -> Option<&str> {
        self.resources()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.as_str())
    }

    fn costume_id(&self, name: &str) -> Option<CostumeId> {
        self.costumes().iter().find(|c| c.name == name).map(|c| c.id)
    }

    fn costume_name(&self, id: CostumeId) -> Option<&str> {
        self.costumes()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    fn timer_by_name(&self, name: &str) -> Option<&TimerKind> {
        self.timers().iter().find(|t| t.name == name)
    }

    fn timer(&self, id: TimerId) -> Option<&TimerKind> {
        self.timers().iter().find(|t| t.id == id)
    }
}

// ---------------------------------------------------------------------------
// Seed format
// ---------------------------------------------------------------------------

/// On-disk catalog description, loaded from JSON.
///
/// ```json
/// {
///   "resources": ["coins", "lives"],
///   "costumes": ["classic"],
///   "timers": [{"name": "lifeRecovery", "durationMs": 1800000}],
///   "shopSets": [{"name": "starter", "price": 100,
///                 "components": [{"resource": "coins", "count": 500}]}],
///   "initialResources": [{"resource": "lives", "count": 5}],
///   "initialCostumes": ["classic"]
/// }
/// ```
///
/// Ids are assigned from list position, starting at 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSeed {
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub costumes: Vec<String>,
    #[serde(default)]
    pub timers: Vec<TimerSeed>,
    #[serde(default)]
    pub shop_sets: Vec<ShopSetSeed>,
    #[serde(default)]
    pub initial_resources: Vec<InitialResourceSeed>,
    #[serde(default)]
    pub initial_costumes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSeed {
    pub name: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSetSeed {
    pub name: String,
    pub price: u32,
    pub components: Vec<ComponentSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSeed {
    pub resource: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialResourceSeed {
    pub resource: String,
    pub count: u64,
}

impl CatalogSeed {
    /// The catalog used when no file is configured.
    pub fn builtin() -> Self {
        let names = |list: &[&str]| -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        };
        let set = |name: &str, price: u32, parts: &[(&str, u32)]| ShopSetSeed {
            name: name.into(),
            price,
            components: parts
                .iter()
                .map(|(resource, count)| ComponentSeed {
                    resource: resource.to_string(),
                    count: *count,
                })
                .collect(),
        };

        Self {
            resources: names(&["coins", "lives", "stars", "chances"]),
            costumes: names(&["classic", "neon", "cape"]),
            timers: vec![
                TimerSeed {
                    name: "lifeRecovery".into(),
                    duration_ms: 1_800_000,
                },
                TimerSeed {
                    name: "dailyBonus".into(),
                    duration_ms: 86_400_000,
                },
            ],
            shop_sets: vec![
                set("lives5", 50, &[("lives", 5)]),
                set("coins1k", 100, &[("coins", 1_000)]),
                set("starter", 150, &[("coins", 500), ("lives", 3)]),
                set("lucky", 200, &[("chances", 5), ("stars", 1)]),
            ],
            initial_resources: vec![
                InitialResourceSeed {
                    resource: "coins".into(),
                    count: 1_000,
                },
                InitialResourceSeed {
                    resource: "lives".into(),
                    count: 5,
                },
            ],
            initial_costumes: names(&["classic"]),
        }
    }
}

// ---------------------------------------------------------------------------
// StaticCatalog
// ---------------------------------------------------------------------------

/// An in-memory, indexed [`Catalog`] built from a [`CatalogSeed`].
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    resources: Vec<Resource>,
    costumes: Vec<Costume>,
    timers: Vec<TimerKind>,
    shop_sets: Vec<ShopSet>,
    initial_resources: Vec<InitialResource>,
    initial_costumes: Vec<CostumeId>,
    resource_index: HashMap<String, ResourceId>,
    costume_index: HashMap<String, CostumeId>,
    timer_index: HashMap<String, usize>,
}

impl StaticCatalog {
    /// Parses and validates a JSON catalog.
    ///
    /// # Errors
    /// [`StoreError::InvalidCatalog`] on malformed JSON or inconsistent data.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let seed: CatalogSeed = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidCatalog(e.to_string()))?;
        Self::from_seed(seed)
    }

    /// Builds the catalog, checking every cross-reference.
    ///
    /// # Errors
    /// [`StoreError::InvalidCatalog`] for duplicate or empty names, unknown
    /// references, shop sets without components, repeated components, or
    /// component counts below 1.
    pub fn from_seed(seed: CatalogSeed) -> Result<Self, StoreError> {
        let resource_index = index_names("resource", &seed.resources, ResourceId)?;
        let costume_index = index_names("costume", &seed.costumes, CostumeId)?;
        let timer_names: Vec<String> =
            seed.timers.iter().map(|t| t.name.clone()).collect();
        index_names("timer", &timer_names, TimerId)?;

        let resources = seed
            .resources
            .iter()
            .map(|name| Resource {
                id: resource_index[name],
                name: name.clone(),
            })
            .collect();
        let costumes = seed
            .costumes
            .iter()
            .map(|name| Costume {
                id: costume_index[name],
                name: name.clone(),
            })
            .collect();
        let timers: Vec<TimerKind> = seed
            .timers
            .iter()
            .zip(1u32..)
            .map(|(t, id)| TimerKind {
                id: TimerId(id),
                name: t.name.clone(),
                duration_ms: t.duration_ms,
            })
            .collect();
        let timer_index = timers
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.name.clone(), pos))
            .collect();

        let mut shop_names = HashSet::new();
        let mut shop_sets = Vec::with_capacity(seed.shop_sets.len());
        for (set, id) in seed.shop_sets.iter().zip(1u32..) {
            if !shop_names.insert(set.name.as_str()) {
                return Err(invalid(format!("duplicate shop set `{}`", set.name)));
            }
            if set.components.is_empty() {
                return Err(invalid(format!(
                    "shop set `{}` has no components",
                    set.name
                )));
            }
            let mut seen = HashSet::new();
            let mut components = Vec::with_capacity(set.components.len());
            for part in &set.components {
                let resource = *resource_index.get(&part.resource).ok_or_else(|| {
                    invalid(format!(
                        "shop set `{}` references unknown resource `{}`",
                        set.name, part.resource
                    ))
                })?;
                if !seen.insert(resource) {
                    return Err(invalid(format!(
                        "shop set `{}` lists `{}` twice",
                        set.name, part.resource
                    )));
                }
                if part.count < 1 {
                    return Err(invalid(format!(
                        "shop set `{}` component `{}` must have count >= 1",
                        set.name, part.resource
                    )));
                }
                components.push(ShopSetComponent {
                    resource,
                    count: part.count,
                });
            }
            shop_sets.push(ShopSet {
                id: ShopSetId(id),
                name: set.name.clone(),
                price: set.price,
                components,
            });
        }

        let mut initial_resources = Vec::with_capacity(seed.initial_resources.len());
        let mut seeded = HashSet::new();
        for initial in &seed.initial_resources {
            let resource = *resource_index.get(&initial.resource).ok_or_else(|| {
                invalid(format!(
                    "initial resource `{}` is not in the catalog",
                    initial.resource
                ))
            })?;
            if !seeded.insert(resource) {
                return Err(invalid(format!(
                    "initial resource `{}` listed twice",
                    initial.resource
                )));
            }
            initial_resources.push(InitialResource {
                resource,
                count: initial.count,
            });
        }

        let mut initial_costumes = Vec::with_capacity(seed.initial_costumes.len());
        for name in &seed.initial_costumes {
            let costume = *costume_index.get(name).ok_or_else(|| {
                invalid(format!("initial costume `{name}` is not in the catalog"))
            })?;
            if initial_costumes.contains(&costume) {
                return Err(invalid(format!("initial costume `{name}` listed twice")));
            }
            initial_costumes.push(costume);
        }

        Ok(Self {
            resources,
            costumes,
            timers,
            shop_sets,
            initial_resources,
            initial_costumes,
            resource_index,
            costume_index,
            timer_index,
        })
    }
}

impl Catalog for StaticCatalog {
    fn resources(&self) -> &[Resource] {
        &self.resources
    }

    fn costumes(&self) -> &[Costume] {
        &self.costumes
    }

    fn timers(&self) -> &[TimerKind] {
        &self.timers
    }

    fn shop_sets(&self) -> &[ShopSet] {
        &self.shop_sets
    }

    fn initial_resources(&self) -> &[InitialResource] {
        &self.initial_resources
    }

    fn initial_costumes(&self) -> &[CostumeId] {
        &self.initial_costumes
    }

    fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_index.get(name).copied()
    }

    fn costume_id(&self, name: &str) -> Option<CostumeId> {
        self.costume_index.get(name).copied()
    }

    fn timer_by_name(&self, name: &str) -> Option<&TimerKind> {
        self.timer_index.get(name).map(|&pos| &self.timers[pos])
    }
}

fn invalid(message: String) -> StoreError {
    StoreError::InvalidCatalog(message)
}

/// Checks names are non-empty and unique, assigning ids from position.
fn index_names<Id>(
    kind: &str,
    names: &[String],
    make_id: fn(u32) -> Id,
) -> Result<HashMap<String, Id>, StoreError> {
    let mut index = HashMap::with_capacity(names.len());
    for (name, id) in names.iter().zip(1u32..) {
        if name.is_empty() {
            return Err(invalid(format!("{kind} name must not be empty")));
        }
        if index.insert(name.clone(), make_id(id)).is_some() {
            return Err(invalid(format!("duplicate {kind} `{name}`")));
        }
    }
    Ok(index)
}
