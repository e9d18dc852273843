//! Player repository: reads and writes of player state by catalog name.
//!
//! Every operation runs as one unit of work under the player's row lock
//! (see [`crate::store`]). Pushes are validated in full before anything is
//! applied, so a rejected push leaves the player untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use racer_protocol::{CommonData, PLAYER_LEVEL, PlayerId, PullReply, PullRequest, PushRequest};
use racer_timer::{Clock, TimerRun, TimerState};
use serde_json::Value;

use crate::{Catalog, CostumeId, Limits, PlayerRecord, ResourceId, Store, StoreError, TimerId};

/// Reads and writes player state through the store.
pub struct PlayerRepository {
    store: Arc<Store>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
    limits: Limits,
}

impl PlayerRepository {
    pub fn new(
        store: Arc<Store>,
        catalog: Arc<dyn Catalog>,
        clock: Arc<dyn Clock>,
        limits: Limits,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            limits,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Reads the requested sections of a player's state.
    ///
    /// An absent section is omitted from the reply; an empty selector reads
    /// the whole section. Reading timers advances them, so Working runs get
    /// their cached remainder refreshed and Expired runs are deleted.
    ///
    /// # Errors
    /// [`StoreError::PlayerNotFound`] if the player does not exist.
    pub async fn pull(
        &self,
        player_id: PlayerId,
        request: &PullRequest,
    ) -> Result<PullReply, StoreError> {
        let mut record = self
            .store
            .lock(player_id)
            .await
            .ok_or(StoreError::PlayerNotFound(player_id))?;
        let catalog = self.catalog.as_ref();
        let now_ms = self.clock.now_ms();

        let reply = PullReply {
            common: request
                .common
                .as_deref()
                .map(|selector| read_common(&record, selector)),
            resources: request
                .resources
                .as_deref()
                .map(|selector| read_resources(&record, selector, catalog)),
            costumes: request
                .costumes
                .as_deref()
                .map(|selector| read_costumes(&record, selector, catalog)),
            timers: request
                .timers
                .as_deref()
                .map(|selector| read_timers(&mut record, selector, catalog, now_ms)),
        };

        tracing::debug!(%player_id, "pull served");
        Ok(reply)
    }

    /// Writes the pushed level, resource counts, and costume ownership.
    ///
    /// # Errors
    /// - [`StoreError::Validation`] if any pushed value is rejected. Nothing
    ///   is written in that case.
    /// - [`StoreError::PlayerNotFound`] if the player does not exist.
    pub async fn push(
        &self,
        player_id: PlayerId,
        request: &PushRequest,
    ) -> Result<(), StoreError> {
        let plan = match PushPlan::validate(request, self.catalog.as_ref(), &self.limits) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "push rejected");
                return Err(e);
            }
        };

        let mut record = self
            .store
            .lock(player_id)
            .await
            .ok_or(StoreError::PlayerNotFound(player_id))?;
        plan.apply(&mut record);

        tracing::info!(
            %player_id,
            level = ?plan.level,
            resources = plan.resources.len(),
            costumes_granted = plan.granted.len(),
            costumes_revoked = plan.revoked.len(),
            "push applied"
        );
        Ok(())
    }

    /// Plans a timer for a player, replacing any existing run of that kind.
    ///
    /// The run stays Planned (and hidden from pulls) until `start_ms`.
    ///
    /// # Errors
    /// - [`StoreError::UnknownTimer`] if the catalog has no such timer.
    /// - [`StoreError::PlayerNotFound`] if the player does not exist.
    pub async fn schedule_timer(
        &self,
        player_id: PlayerId,
        timer: &str,
        start_ms: i64,
    ) -> Result<(), StoreError> {
        let timer_id = self
            .catalog
            .timer_by_name(timer)
            .map(|kind| kind.id)
            .ok_or_else(|| StoreError::UnknownTimer(timer.to_string()))?;

        let mut record = self
            .store
            .lock(player_id)
            .await
            .ok_or(StoreError::PlayerNotFound(player_id))?;
        record.timers.insert(timer_id, TimerRun::planned(start_ms));

        tracing::info!(%player_id, timer, start_ms, "timer scheduled");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pull sections
// ---------------------------------------------------------------------------

fn read_common(record: &PlayerRecord, selector: &[String]) -> CommonData {
    let wants_level = selector.iter().any(|field| field == PLAYER_LEVEL);
    CommonData {
        player_id: record.player.id,
        level: wants_level.then_some(record.player.level),
    }
}

fn read_resources(
    record: &PlayerRecord,
    selector: &[String],
    catalog: &dyn Catalog,
) -> BTreeMap<String, u64> {
    let count = |id: ResourceId| record.resources.get(&id).copied().unwrap_or(0);

    if selector.is_empty() {
        return catalog
            .resources()
            .iter()
            .map(|resource| (resource.name.clone(), count(resource.id)))
            .collect();
    }
    selector
        .iter()
        .map(|name| {
            let value = catalog.resource_id(name).map(count).unwrap_or(0);
            (name.clone(), value)
        })
        .collect()
}

fn read_costumes(
    record: &PlayerRecord,
    selector: &[String],
    catalog: &dyn Catalog,
) -> BTreeMap<String, bool> {
    if selector.is_empty() {
        return record
            .costumes
            .iter()
            .filter_map(|&id| catalog.costume_name(id))
            .map(|name| (name.to_string(), true))
            .collect();
    }
    selector
        .iter()
        .map(|name| {
            let owned = catalog
                .costume_id(name)
                .is_some_and(|id| record.costumes.contains(&id));
            (name.clone(), owned)
        })
        .collect()
}

/// Advances the selected timers to `now_ms` and reports remaining time.
///
/// Planned runs are not reported. Expired runs report 0 and are deleted. A
/// requested name with no run (or unknown to the catalog) reports 0.
fn read_timers(
    record: &mut PlayerRecord,
    selector: &[String],
    catalog: &dyn Catalog,
    now_ms: i64,
) -> BTreeMap<String, u64> {
    let mut report = BTreeMap::new();

    let targets: Vec<TimerId> = if selector.is_empty() {
        record.timers.keys().copied().collect()
    } else {
        let mut targets = Vec::with_capacity(selector.len());
        for name in selector {
            match catalog.timer_by_name(name) {
                Some(kind) if record.timers.contains_key(&kind.id) => targets.push(kind.id),
                _ => {
                    report.insert(name.clone(), 0);
                }
            }
        }
        targets
    };

    for id in targets {
        let Some(kind) = catalog.timer(id) else {
            // Orphaned run: its timer kind left the catalog.
            record.timers.remove(&id);
            continue;
        };
        let Some(run) = record.timers.get(&id).copied() else {
            continue;
        };

        let run = run.advanced(kind.duration_ms, now_ms);
        if !run.state.is_visible() {
            continue;
        }
        if run.state == TimerState::Expired {
            record.timers.remove(&id);
        } else {
            record.timers.insert(id, run);
        }
        report.insert(kind.name.clone(), run.remaining_ms);
    }
    report
}

// ---------------------------------------------------------------------------
// Push validation
// ---------------------------------------------------------------------------

/// A fully validated push, ready to apply.
#[derive(Debug, Default)]
struct PushPlan {
    level: Option<u32>,
    resources: Vec<(ResourceId, u64)>,
    granted: Vec<CostumeId>,
    revoked: Vec<CostumeId>,
}

impl PushPlan {
    fn validate(
        request: &PushRequest,
        catalog: &dyn Catalog,
        limits: &Limits,
    ) -> Result<Self, StoreError> {
        let mut plan = Self::default();

        if let Some(level) = request.common.as_ref().and_then(|c| c.level.as_ref()) {
            plan.level = Some(validate_level(level, limits)?);
        }

        for (name, value) in request.resources.iter().flatten() {
            let id = catalog.resource_id(name).ok_or_else(|| {
                StoreError::Validation(format!("resource `{name}` does not exist"))
            })?;
            let count = validate_count(name, value, limits)?;
            plan.resources.push((id, count));
        }

        for (name, value) in request.costumes.iter().flatten() {
            let id = catalog.costume_id(name).ok_or_else(|| {
                StoreError::Validation(format!("costume `{name}` does not exist"))
            })?;
            match value.as_bool() {
                Some(true) => plan.granted.push(id),
                Some(false) => plan.revoked.push(id),
                None => {
                    return Err(StoreError::Validation(format!(
                        "costume `{name}`: ownership must be a boolean"
                    )));
                }
            }
        }

        Ok(plan)
    }

    fn apply(&self, record: &mut PlayerRecord) {
        if let Some(level) = self.level {
            record.player.level = level;
        }
        for &(id, count) in &self.resources {
            record.resources.insert(id, count);
        }
        for id in &self.granted {
            record.costumes.insert(*id);
        }
        for id in &self.revoked {
            record.costumes.remove(id);
        }
    }
}

fn validate_level(value: &Value, limits: &Limits) -> Result<u32, StoreError> {
    let level = integer(value)
        .ok_or_else(|| StoreError::Validation("level must be an integer".into()))?;
    if level < 0 {
        return Err(StoreError::Validation("level cannot be negative".into()));
    }
    u32::try_from(level)
        .ok()
        .filter(|&level| level <= limits.max_level)
        .ok_or_else(|| {
            StoreError::Validation(format!("level cannot exceed {}", limits.max_level))
        })
}

fn validate_count(name: &str, value: &Value, limits: &Limits) -> Result<u64, StoreError> {
    let count = integer(value).ok_or_else(|| {
        StoreError::Validation(format!("resource `{name}`: count must be an integer"))
    })?;
    if count < 0 {
        return Err(StoreError::Validation(format!(
            "resource `{name}`: count cannot be negative"
        )));
    }
    u64::try_from(count)
        .ok()
        .filter(|&count| count <= limits.max_resource_count)
        .ok_or_else(|| {
            StoreError::Validation(format!(
                "resource `{name}`: count cannot exceed {}",
                limits.max_resource_count
            ))
        })
}

/// Integral JSON numbers only; `12.0` and `"12"` are rejected.
fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        _ => None,
    }
}
