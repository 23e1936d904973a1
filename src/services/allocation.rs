//! Equipment allocation core.
//!
//! Holds the in-memory allocation ledger and a cached view of the equipment
//! catalog, layered as authoritative-catalog + provisional-ledger: the ledger
//! wins a status lookup until the backend confirms or corrects it through the
//! realtime change feed. Writes are optimistic: reserve in the ledger,
//! persist, then let a debounced reconciliation pass and the change feed heal
//! any drift. The database remains the real enforcement point for the
//! one-active-job-per-unit invariant; the ledger is a cache, not a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        allocation::{
            BatchOutcome, ConflictResolution, EquipmentAllocation, EquipmentChange,
            EquipmentConflict, ValidationOutcome,
        },
        enums::{AllocationStatus, ChangeOp, EquipmentStatus},
        equipment::{BulkEquipment, EquipmentQuery, IndividualEquipment},
        job::Job,
    },
    repository::Repository,
};

/// Placeholder holder name when a conflict is detected from persisted state
/// and the ledger has no entry to name the current job.
pub const UNKNOWN_JOB: &str = "Unknown Job";

/// Persistence seam for the allocation core. Production wires this to the
/// Postgres repository; tests substitute an in-memory catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_individual(&self) -> AppResult<Vec<IndividualEquipment>>;

    async fn list_bulk(&self) -> AppResult<Vec<BulkEquipment>>;

    /// Write the (status, job) pair for an individual unit.
    async fn update_individual_assignment(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
        job_id: Option<i32>,
    ) -> AppResult<()>;

    /// Write the (status, job) pair for a bulk row, splitting the row on a
    /// partial quantity. Returns the id of the row now carrying the
    /// assignment (differs from `id` after a split).
    async fn update_bulk_assignment(
        &self,
        id: i32,
        status: EquipmentStatus,
        job_id: Option<i32>,
        quantity: Option<i32>,
    ) -> AppResult<i32>;

    /// Single batched write: listed ids become deployed-under-job, units
    /// previously deployed under the job but absent from the list are
    /// released.
    async fn batch_update_status(
        &self,
        job_id: i32,
        equipment_ids: &[String],
    ) -> AppResult<BatchOutcome>;

    /// Merge duplicate bulk rows sharing (type, location, status, job).
    async fn consolidate_bulk(&self) -> AppResult<u64>;
}

/// Fire-and-forget user-facing notifications. The core surfaces conflicts
/// and failures through this but never blocks on it.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_error(&self, message: &str);
}

/// Production notifier: notifications ride the structured log stream and are
/// re-surfaced to clients by the log shipper.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_success(&self, message: &str) {
        tracing::info!("notify: {}", message);
    }

    fn notify_error(&self, message: &str) {
        tracing::error!("notify: {}", message);
    }
}

/// `CatalogStore` backed by the Postgres repository.
pub struct PgCatalogStore {
    repository: Repository,
}

impl PgCatalogStore {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_individual(&self) -> AppResult<Vec<IndividualEquipment>> {
        self.repository
            .equipment
            .list_individual(&EquipmentQuery::default())
            .await
    }

    async fn list_bulk(&self) -> AppResult<Vec<BulkEquipment>> {
        self.repository
            .equipment
            .list_bulk(&EquipmentQuery::default())
            .await
    }

    async fn update_individual_assignment(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
        job_id: Option<i32>,
    ) -> AppResult<()> {
        self.repository
            .equipment
            .set_individual_assignment(equipment_id, status, job_id)
            .await
    }

    async fn update_bulk_assignment(
        &self,
        id: i32,
        status: EquipmentStatus,
        job_id: Option<i32>,
        quantity: Option<i32>,
    ) -> AppResult<i32> {
        self.repository
            .equipment
            .set_bulk_assignment(id, status, job_id, quantity)
            .await
    }

    async fn batch_update_status(
        &self,
        job_id: i32,
        equipment_ids: &[String],
    ) -> AppResult<BatchOutcome> {
        self.repository
            .equipment
            .batch_update_status(job_id, equipment_ids)
            .await
    }

    async fn consolidate_bulk(&self) -> AppResult<u64> {
        self.repository.equipment.consolidate_bulk().await
    }
}

/// Everything the allocation core mutates, behind one lock. Critical
/// sections are synchronous map work only; backend I/O happens on snapshots
/// taken under the lock.
#[derive(Default)]
struct AllocationState {
    /// Equipment id -> current allocation. Insertion-ordered so "all
    /// equipment on job X" listings are stable.
    ledger: IndexMap<String, EquipmentAllocation>,
    /// Pending conflicts keyed by equipment id; re-detection replaces the
    /// previous record rather than accumulating duplicates.
    conflicts: IndexMap<String, EquipmentConflict>,
    /// Cached catalog view, individual units by equipment id.
    individual: HashMap<String, IndividualEquipment>,
    /// Cached catalog view, bulk rows by row id.
    bulk: HashMap<i32, BulkEquipment>,
}

/// Outcome of an availability check, before it is shaped for a caller.
enum Availability {
    Available,
    /// The requesting job already holds this equipment; re-validation is
    /// idempotent and re-allocation returns the existing entry untouched.
    AlreadyHeld(EquipmentAllocation),
    NotFound,
    Terminal(EquipmentStatus),
    Insufficient { requested: i32, available: i32 },
    Conflicted(EquipmentConflict),
}

/// Which catalog record an allocate/release write lands on.
enum WriteTarget {
    Individual(String),
    Bulk(i32),
}

pub struct AllocationService {
    store: Arc<dyn CatalogStore>,
    notifier: Arc<dyn Notifier>,
    /// Shared with the spawned resync task, which needs the state after the
    /// debounce window with no back-reference to the service.
    state: Arc<Mutex<AllocationState>>,
    /// Single-slot debounce: the pending resync timer, replaced (and the
    /// previous one aborted) on every schedule call.
    resync_timer: Mutex<Option<JoinHandle<()>>>,
    resync_debounce: Duration,
}

impl AllocationService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        notifier: Arc<dyn Notifier>,
        resync_debounce: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            state: Arc::new(Mutex::new(AllocationState::default())),
            resync_timer: Mutex::new(None),
            resync_debounce,
        }
    }

    fn state(&self) -> MutexGuard<'_, AllocationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load the catalog cache from the store and rebuild the ledger from
    /// persisted assignments. Called at startup and by the full resync pass.
    /// `job_names` maps job ids to display names for rebuilt entries.
    pub async fn load_catalog(&self, job_names: &HashMap<i32, String>) -> AppResult<()> {
        let individual = self.store.list_individual().await?;
        let bulk = self.store.list_bulk().await?;

        let mut state = self.state();
        state.ledger.clear();

        for unit in &individual {
            if let (EquipmentStatus::Deployed, Some(job_id)) =
                (EquipmentStatus::from(unit.status), unit.job_id)
            {
                let job_name = job_names
                    .get(&job_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_JOB.to_string());
                state.ledger.insert(
                    unit.equipment_id.clone(),
                    EquipmentAllocation {
                        equipment_id: unit.equipment_id.clone(),
                        job_id,
                        job_name,
                        status: AllocationStatus::Deployed,
                        timestamp: unit.updated_at,
                    },
                );
            }
        }
        for row in &bulk {
            if let (EquipmentStatus::Deployed, Some(job_id)) =
                (EquipmentStatus::from(row.status), row.job_id)
            {
                let key = row.id.to_string();
                let job_name = job_names
                    .get(&job_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_JOB.to_string());
                state.ledger.insert(
                    key.clone(),
                    EquipmentAllocation {
                        equipment_id: key,
                        job_id,
                        job_name,
                        status: AllocationStatus::Deployed,
                        timestamp: row.updated_at,
                    },
                );
            }
        }

        state.individual = individual
            .into_iter()
            .map(|u| (u.equipment_id.clone(), u))
            .collect();
        state.bulk = bulk.into_iter().map(|r| (r.id, r)).collect();

        tracing::info!(
            "catalog loaded: {} individual units, {} bulk rows, {} active allocations",
            state.individual.len(),
            state.bulk.len(),
            state.ledger.len()
        );
        Ok(())
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Current ledger entry for an equipment id, if any.
    pub fn ledger_entry(&self, equipment_id: &str) -> Option<EquipmentAllocation> {
        self.state().ledger.get(equipment_id).cloned()
    }

    /// All equipment currently held by a job, in allocation order.
    pub fn allocations_for_job(&self, job_id: i32) -> Vec<EquipmentAllocation> {
        self.state()
            .ledger
            .values()
            .filter(|entry| entry.job_id == job_id)
            .cloned()
            .collect()
    }

    /// Conflicts awaiting resolution, oldest first.
    pub fn pending_conflicts(&self) -> Vec<EquipmentConflict> {
        self.state().conflicts.values().cloned().collect()
    }

    /// Derived status for an equipment id: ledger first (recently-mutated
    /// state the backend may not have confirmed yet), then the cached
    /// catalog, defaulting to `Unavailable` when the id resolves nowhere.
    pub fn equipment_status(&self, equipment_id: &str) -> EquipmentStatus {
        let state = self.state();
        if let Some(entry) = state.ledger.get(equipment_id) {
            return match entry.status {
                AllocationStatus::Released => EquipmentStatus::Available,
                _ => EquipmentStatus::Deployed,
            };
        }
        match Self::resolve_equipment(&state, equipment_id) {
            Some(WriteTarget::Individual(id)) => state
                .individual
                .get(&id)
                .map(|u| EquipmentStatus::from(u.status))
                .unwrap_or(EquipmentStatus::Unavailable),
            Some(WriteTarget::Bulk(id)) => state
                .bulk
                .get(&id)
                .map(|r| EquipmentStatus::from(r.status))
                .unwrap_or(EquipmentStatus::Unavailable),
            None => EquipmentStatus::Unavailable,
        }
    }

    /// Individual units first, then bulk rows addressed by numeric id.
    fn resolve_equipment(state: &AllocationState, equipment_id: &str) -> Option<WriteTarget> {
        if state.individual.contains_key(equipment_id) {
            return Some(WriteTarget::Individual(equipment_id.to_string()));
        }
        equipment_id
            .parse::<i32>()
            .ok()
            .filter(|id| state.bulk.contains_key(id))
            .map(WriteTarget::Bulk)
    }

    // =========================================================================
    // Conflict detector
    // =========================================================================

    fn register_conflict(
        state: &mut AllocationState,
        equipment_id: &str,
        current_job_id: i32,
        current_job_name: String,
        requested_job_id: i32,
        requested_job_name: &str,
    ) -> EquipmentConflict {
        let conflict = EquipmentConflict {
            id: Uuid::new_v4(),
            equipment_id: equipment_id.to_string(),
            equipment_name: equipment_id.to_string(),
            current_job_id,
            current_job_name,
            requested_job_id,
            requested_job_name: requested_job_name.to_string(),
            timestamp: Utc::now(),
        };
        state
            .conflicts
            .insert(equipment_id.to_string(), conflict.clone());
        conflict
    }

    /// The availability decision. Registers a pending conflict as a side
    /// effect when the refusal is a genuine double-booking; terminal
    /// statuses, missing ids, and short bulk quantities reject without one.
    fn check_availability(
        state: &mut AllocationState,
        equipment_id: &str,
        job_id: i32,
        job_name: &str,
        quantity: Option<i32>,
    ) -> Availability {
        // Ledger first: it may hold an allocation the backend has not
        // confirmed yet.
        if let Some(entry) = state.ledger.get(equipment_id) {
            if entry.status != AllocationStatus::Released {
                if entry.job_id == job_id {
                    return Availability::AlreadyHeld(entry.clone());
                }
                let current_job_id = entry.job_id;
                let current_job_name = entry.job_name.clone();
                let conflict = Self::register_conflict(
                    state,
                    equipment_id,
                    current_job_id,
                    current_job_name,
                    job_id,
                    job_name,
                );
                return Availability::Conflicted(conflict);
            }
        }

        match Self::resolve_equipment(state, equipment_id) {
            None => Availability::NotFound,
            Some(WriteTarget::Individual(key)) => {
                let Some(unit) = state.individual.get(&key).cloned() else {
                    return Availability::NotFound;
                };
                let status = EquipmentStatus::from(unit.status);
                if status.is_terminal() {
                    return Availability::Terminal(status);
                }
                if status == EquipmentStatus::Deployed {
                    if let Some(holder) = unit.job_id {
                        if holder != job_id {
                            let conflict = Self::register_conflict(
                                state,
                                equipment_id,
                                holder,
                                UNKNOWN_JOB.to_string(),
                                job_id,
                                job_name,
                            );
                            return Availability::Conflicted(conflict);
                        }
                    }
                }
                Availability::Available
            }
            Some(WriteTarget::Bulk(row_id)) => {
                let Some(row) = state.bulk.get(&row_id).cloned() else {
                    return Availability::NotFound;
                };
                let status = EquipmentStatus::from(row.status);
                if status.is_terminal() {
                    return Availability::Terminal(status);
                }
                if status == EquipmentStatus::Deployed {
                    if let Some(holder) = row.job_id {
                        if holder != job_id {
                            let conflict = Self::register_conflict(
                                state,
                                equipment_id,
                                holder,
                                UNKNOWN_JOB.to_string(),
                                job_id,
                                job_name,
                            );
                            return Availability::Conflicted(conflict);
                        }
                    }
                    // The requesting job already holds this row.
                    return Availability::Available;
                }

                // Quantity is checked against the whole available pool for
                // the row's (type, location), not just this row.
                let requested = quantity.unwrap_or(row.quantity);
                let available: i32 = state
                    .bulk
                    .values()
                    .filter(|r| {
                        r.type_id == row.type_id
                            && r.location_id == row.location_id
                            && EquipmentStatus::from(r.status) == EquipmentStatus::Available
                    })
                    .map(|r| r.quantity)
                    .sum();
                if requested > available {
                    return Availability::Insufficient {
                        requested,
                        available,
                    };
                }
                Availability::Available
            }
        }
    }

    /// Availability check as exposed to callers. Returns an outcome rather
    /// than an error so "not available" stays a normal answer; a genuine
    /// double-booking carries the registered conflict for resolution.
    pub fn validate_availability(
        &self,
        equipment_id: &str,
        job_id: i32,
        job_name: &str,
        quantity: Option<i32>,
    ) -> ValidationOutcome {
        let mut state = self.state();
        match Self::check_availability(&mut state, equipment_id, job_id, job_name, quantity) {
            Availability::Available | Availability::AlreadyHeld(_) => ValidationOutcome::ok(),
            Availability::NotFound => {
                ValidationOutcome::rejected(format!("Equipment {} not found", equipment_id))
            }
            Availability::Terminal(status) => {
                ValidationOutcome::rejected(format!("Equipment {} is {}", equipment_id, status))
            }
            Availability::Insufficient {
                requested,
                available,
            } => ValidationOutcome::rejected(format!(
                "Requested {} units, {} available",
                requested, available
            )),
            Availability::Conflicted(conflict) => ValidationOutcome {
                available: false,
                reason: Some(format!(
                    "{} is already assigned to {}",
                    conflict.equipment_name, conflict.current_job_name
                )),
                conflict: Some(conflict),
            },
        }
    }

    // =========================================================================
    // Allocate / release primitives
    // =========================================================================

    /// Allocate equipment to a job: re-check availability, reserve in the
    /// ledger, persist the deployment, then schedule a debounced resync.
    /// The ledger reservation is rolled back if the persisted write fails.
    pub async fn allocate(
        &self,
        equipment_id: &str,
        job_id: i32,
        job_name: &str,
        quantity: Option<i32>,
    ) -> AppResult<EquipmentAllocation> {
        let (target, prior, mut entry) = {
            let mut state = self.state();
            match Self::check_availability(&mut state, equipment_id, job_id, job_name, quantity) {
                Availability::Available => {}
                Availability::AlreadyHeld(entry) => return Ok(entry),
                Availability::NotFound => {
                    return Err(AppError::NotFound(format!(
                        "Equipment {} not found",
                        equipment_id
                    )))
                }
                Availability::Terminal(status) => {
                    drop(state);
                    self.notifier
                        .notify_error(&format!("{} is {}", equipment_id, status));
                    return Err(AppError::BusinessRule(format!(
                        "Equipment {} is {}",
                        equipment_id, status
                    )));
                }
                Availability::Insufficient {
                    requested,
                    available,
                } => {
                    return Err(AppError::InsufficientQuantity {
                        requested,
                        available,
                    })
                }
                Availability::Conflicted(conflict) => {
                    drop(state);
                    self.notifier.notify_error(&format!(
                        "{} is already assigned to {}",
                        conflict.equipment_name, conflict.current_job_name
                    ));
                    return Err(AppError::AllocationConflict(Box::new(conflict)));
                }
            }

            let target = match Self::resolve_equipment(&state, equipment_id) {
                Some(target) => target,
                None => {
                    return Err(AppError::NotFound(format!(
                        "Equipment {} not found",
                        equipment_id
                    )))
                }
            };
            let prior = state.ledger.get(equipment_id).cloned();
            let entry = EquipmentAllocation::allocated(equipment_id, job_id, job_name);
            state.ledger.insert(equipment_id.to_string(), entry.clone());
            (target, prior, entry)
        };

        let persisted = match &target {
            WriteTarget::Individual(unit_id) => self
                .store
                .update_individual_assignment(unit_id, EquipmentStatus::Deployed, Some(job_id))
                .await
                .map(|_| None),
            WriteTarget::Bulk(row_id) => self
                .store
                .update_bulk_assignment(*row_id, EquipmentStatus::Deployed, Some(job_id), quantity)
                .await
                .map(Some),
        };

        let assigned_row = match persisted {
            Ok(assigned) => assigned,
            Err(e) => {
                // Roll the optimistic reservation back before surfacing the
                // failure; the resync pass stays as the net for other drift.
                let mut state = self.state();
                match prior {
                    Some(previous) => {
                        state.ledger.insert(equipment_id.to_string(), previous);
                    }
                    None => {
                        state.ledger.shift_remove(equipment_id);
                    }
                }
                drop(state);
                self.notifier
                    .notify_error(&format!("Failed to allocate {}: {}", equipment_id, e));
                return Err(e);
            }
        };

        {
            let mut state = self.state();
            match (&target, assigned_row) {
                (WriteTarget::Individual(unit_id), _) => {
                    if let Some(unit) = state.individual.get_mut(unit_id) {
                        unit.status = EquipmentStatus::Deployed as i16;
                        unit.job_id = Some(job_id);
                    }
                }
                (WriteTarget::Bulk(row_id), Some(assigned)) if assigned == *row_id => {
                    if let Some(row) = state.bulk.get_mut(row_id) {
                        row.status = EquipmentStatus::Deployed as i16;
                        row.job_id = Some(job_id);
                    }
                }
                (WriteTarget::Bulk(row_id), Some(assigned)) => {
                    // Partial quantity split the row: the deployment lives in
                    // a fresh row now, so the reservation follows it. The
                    // change feed fills in the new row's cache entry.
                    if let Some(row) = state.bulk.get_mut(row_id) {
                        row.quantity -= quantity.unwrap_or(row.quantity);
                    }
                    state.ledger.shift_remove(equipment_id);
                    let key = assigned.to_string();
                    entry.equipment_id = key.clone();
                    state.ledger.insert(key, entry.clone());
                }
                (WriteTarget::Bulk(_), None) => {}
            }
        }

        self.schedule_resync();
        self.notifier
            .notify_success(&format!("{} allocated to {}", equipment_id, job_name));
        tracing::info!("allocated {} to job {} ({})", equipment_id, job_id, job_name);
        Ok(entry)
    }

    /// Release equipment from a job: clear the ledger entry, persist the
    /// return to the available pool, then schedule a debounced resync.
    pub async fn release(&self, equipment_id: &str, job_id: i32) -> AppResult<()> {
        let (target, prior) = {
            let mut state = self.state();
            let prior = state.ledger.get(equipment_id).cloned();

            if let Some(ref entry) = prior {
                if entry.job_id != job_id {
                    return Err(AppError::BusinessRule(format!(
                        "Equipment {} is held by {}, not job {}",
                        equipment_id, entry.job_name, job_id
                    )));
                }
            }

            let target = match Self::resolve_equipment(&state, equipment_id) {
                Some(target) => target,
                None => {
                    if prior.is_none() {
                        return Err(AppError::NotFound(format!(
                            "Equipment {} not found",
                            equipment_id
                        )));
                    }
                    // Ledger-only residue with no catalog record behind it;
                    // dropping the entry is the whole release.
                    state.ledger.shift_remove(equipment_id);
                    return Ok(());
                }
            };

            // Without a ledger entry the persisted holder is authoritative.
            if prior.is_none() {
                let status = match &target {
                    WriteTarget::Individual(key) => state
                        .individual
                        .get(key)
                        .map(|u| EquipmentStatus::from(u.status)),
                    WriteTarget::Bulk(row_id) => {
                        state.bulk.get(row_id).map(|r| EquipmentStatus::from(r.status))
                    }
                };
                if let Some(status) = status {
                    // Terminal statuses leave the pool through their own
                    // paths (lift red tag, finish maintenance), not release.
                    if status.is_terminal() {
                        return Err(AppError::BusinessRule(format!(
                            "Equipment {} is {} and cannot be released",
                            equipment_id, status
                        )));
                    }
                }
                if let WriteTarget::Individual(ref key) = target {
                    if let Some(unit) = state.individual.get(key) {
                        if let Some(holder) = unit.job_id {
                            if holder != job_id {
                                return Err(AppError::BusinessRule(format!(
                                    "Equipment {} is held by job {}, not job {}",
                                    equipment_id, holder, job_id
                                )));
                            }
                        }
                    }
                }
                if let WriteTarget::Bulk(ref row_id) = target {
                    if let Some(row) = state.bulk.get(row_id) {
                        if let Some(holder) = row.job_id {
                            if holder != job_id {
                                return Err(AppError::BusinessRule(format!(
                                    "Equipment {} is held by job {}, not job {}",
                                    equipment_id, holder, job_id
                                )));
                            }
                        }
                    }
                }
            }

            state.ledger.shift_remove(equipment_id);
            (target, prior)
        };

        let write = match &target {
            WriteTarget::Individual(unit_id) => {
                self.store
                    .update_individual_assignment(unit_id, EquipmentStatus::Available, None)
                    .await
            }
            WriteTarget::Bulk(row_id) => self
                .store
                .update_bulk_assignment(*row_id, EquipmentStatus::Available, None, None)
                .await
                .map(|_| ()),
        };

        if let Err(e) = write {
            let mut state = self.state();
            if let Some(previous) = prior {
                state.ledger.insert(equipment_id.to_string(), previous);
            }
            drop(state);
            self.notifier
                .notify_error(&format!("Failed to release {}: {}", equipment_id, e));
            return Err(e);
        }

        {
            let mut state = self.state();
            match &target {
                WriteTarget::Individual(unit_id) => {
                    if let Some(unit) = state.individual.get_mut(unit_id) {
                        unit.status = EquipmentStatus::Available as i16;
                        unit.job_id = None;
                    }
                }
                WriteTarget::Bulk(row_id) => {
                    if let Some(row) = state.bulk.get_mut(row_id) {
                        row.status = EquipmentStatus::Available as i16;
                        row.job_id = None;
                    }
                }
            }
        }

        self.schedule_resync();
        tracing::info!("released {} from job {}", equipment_id, job_id);
        Ok(())
    }

    // =========================================================================
    // Conflict resolver
    // =========================================================================

    /// Resolve a pending conflict. `KeepCurrent` discards the record with no
    /// state change; `TransferToRequester` releases the equipment from the
    /// current holder and allocates it to the requester. If the transfer's
    /// allocate step fails, a compensating re-allocation hands the unit back
    /// to the original holder; if that also fails the equipment is left
    /// unassigned and the original error propagates. The conflict record is
    /// consumed in every outcome.
    pub async fn resolve_conflict(
        &self,
        conflict_id: Uuid,
        resolution: ConflictResolution,
    ) -> AppResult<Option<EquipmentAllocation>> {
        let conflict = {
            let mut state = self.state();
            let key = state
                .conflicts
                .iter()
                .find(|(_, c)| c.id == conflict_id)
                .map(|(key, _)| key.clone());
            match key.and_then(|k| state.conflicts.shift_remove(&k)) {
                Some(conflict) => conflict,
                None => {
                    return Err(AppError::NotFound(format!(
                        "Conflict {} not found",
                        conflict_id
                    )))
                }
            }
        };

        match resolution {
            ConflictResolution::KeepCurrent => {
                tracing::info!(
                    "conflict on {} resolved: kept with {}",
                    conflict.equipment_id,
                    conflict.current_job_name
                );
                Ok(None)
            }
            ConflictResolution::TransferToRequester => {
                self.release(&conflict.equipment_id, conflict.current_job_id)
                    .await?;

                match self
                    .allocate(
                        &conflict.equipment_id,
                        conflict.requested_job_id,
                        &conflict.requested_job_name,
                        None,
                    )
                    .await
                {
                    Ok(entry) => {
                        self.notifier.notify_success(&format!(
                            "{} transferred to {}",
                            conflict.equipment_name, conflict.requested_job_name
                        ));
                        Ok(Some(entry))
                    }
                    Err(e) => {
                        // Compensate: try to hand the unit back to the
                        // original holder rather than leaving it dangling.
                        match self
                            .allocate(
                                &conflict.equipment_id,
                                conflict.current_job_id,
                                &conflict.current_job_name,
                                None,
                            )
                            .await
                        {
                            Ok(_) => self.notifier.notify_error(&format!(
                                "Transfer of {} failed; returned to {}",
                                conflict.equipment_name, conflict.current_job_name
                            )),
                            Err(comp) => {
                                tracing::error!(
                                    "transfer of {} failed and compensation failed: {}",
                                    conflict.equipment_id,
                                    comp
                                );
                                self.notifier.notify_error(&format!(
                                    "Transfer of {} failed; equipment left unassigned",
                                    conflict.equipment_name
                                ));
                            }
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    // =========================================================================
    // Allocation synchronizer
    // =========================================================================

    /// Reconcile a job's deployments against its desired equipment manifest
    /// with one batched backend write: listed ids become deployed-under-job,
    /// previously-deployed ids absent from the manifest are released. The
    /// ledger is then updated to match the manifest.
    pub async fn sync_job_equipment(&self, job: &Job) -> AppResult<BatchOutcome> {
        let desired = job.equipment_manifest.desired_equipment();
        let outcome = self.store.batch_update_status(job.id, &desired).await?;

        {
            let mut state = self.state();
            let stale: Vec<String> = state
                .ledger
                .iter()
                .filter(|(key, entry)| {
                    entry.job_id == job.id && !desired.iter().any(|id| id == *key)
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in &stale {
                state.ledger.shift_remove(key);
            }
            for id in &desired {
                state
                    .ledger
                    .insert(id.clone(), EquipmentAllocation::allocated(id, job.id, &job.name));
                if let Some(unit) = state.individual.get_mut(id) {
                    unit.status = EquipmentStatus::Deployed as i16;
                    unit.job_id = Some(job.id);
                }
            }
            for key in &stale {
                if let Some(unit) = state.individual.get_mut(key) {
                    if unit.job_id == Some(job.id) {
                        unit.status = EquipmentStatus::Available as i16;
                        unit.job_id = None;
                    }
                }
            }
        }

        if outcome.failure_count > 0 {
            self.notifier.notify_error(&format!(
                "Equipment sync for {}: {} deployed, {} failed",
                job.name, outcome.success_count, outcome.failure_count
            ));
        }
        self.schedule_resync();
        tracing::info!(
            "synced {} equipment ids to job {} in {}ms ({} ok, {} failed)",
            desired.len(),
            job.id,
            outcome.duration_ms,
            outcome.success_count,
            outcome.failure_count
        );
        Ok(outcome)
    }

    /// Release everything a job holds: one batched write for individual
    /// units, per-row writes for bulk, then the ledger entries go away.
    /// Used when a job is deleted.
    pub async fn release_job_equipment(&self, job_id: i32) -> AppResult<BatchOutcome> {
        let outcome = self.store.batch_update_status(job_id, &[]).await?;

        let bulk_held: Vec<i32> = {
            let state = self.state();
            state
                .ledger
                .iter()
                .filter(|(key, entry)| {
                    entry.job_id == job_id && !state.individual.contains_key(*key)
                })
                .filter_map(|(key, _)| key.parse::<i32>().ok())
                .collect()
        };
        for row_id in &bulk_held {
            if let Err(e) = self
                .store
                .update_bulk_assignment(*row_id, EquipmentStatus::Available, None, None)
                .await
            {
                tracing::warn!("failed to release bulk row {} from job {}: {}", row_id, job_id, e);
            }
        }

        {
            let mut state = self.state();
            let held: Vec<String> = state
                .ledger
                .iter()
                .filter(|(_, entry)| entry.job_id == job_id)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &held {
                state.ledger.shift_remove(key);
            }
        }

        self.schedule_resync();
        tracing::info!("released all equipment held by job {}", job_id);
        Ok(outcome)
    }

    /// Full reconciliation pass: consolidate duplicate bulk rows, reload the
    /// catalog cache, then correct any persisted assignment that disagrees
    /// with the ledger. Ledger entries whose equipment left the catalog or
    /// entered a terminal status are dropped; the catalog wins those.
    pub async fn sync_inventory_status(&self) -> AppResult<()> {
        Self::resync(Arc::clone(&self.store), Arc::clone(&self.state)).await
    }

    async fn resync(
        store: Arc<dyn CatalogStore>,
        state: Arc<Mutex<AllocationState>>,
    ) -> AppResult<()> {
        store.consolidate_bulk().await?;

        let individual = store.list_individual().await?;
        let bulk = store.list_bulk().await?;

        let (unit_fixes, bulk_fixes, dropped) = {
            let mut st = state.lock().unwrap_or_else(|e| e.into_inner());
            st.individual = individual
                .into_iter()
                .map(|u| (u.equipment_id.clone(), u))
                .collect();
            st.bulk = bulk.into_iter().map(|r| (r.id, r)).collect();

            let mut unit_fixes: Vec<(String, i32)> = Vec::new();
            let mut bulk_fixes: Vec<(i32, i32)> = Vec::new();
            let mut dropped: Vec<String> = Vec::new();

            for (key, entry) in &st.ledger {
                if let Some(unit) = st.individual.get(key) {
                    let status = EquipmentStatus::from(unit.status);
                    if status.is_terminal() {
                        dropped.push(key.clone());
                    } else if status != EquipmentStatus::Deployed
                        || unit.job_id != Some(entry.job_id)
                    {
                        unit_fixes.push((key.clone(), entry.job_id));
                    }
                } else if let Some(row) = key.parse::<i32>().ok().and_then(|id| st.bulk.get(&id)) {
                    let status = EquipmentStatus::from(row.status);
                    if status.is_terminal() {
                        dropped.push(key.clone());
                    } else if status != EquipmentStatus::Deployed
                        || row.job_id != Some(entry.job_id)
                    {
                        bulk_fixes.push((row.id, entry.job_id));
                    }
                } else {
                    dropped.push(key.clone());
                }
            }

            for key in &dropped {
                st.ledger.shift_remove(key);
            }
            (unit_fixes, bulk_fixes, dropped)
        };

        let mut corrected = 0usize;
        for (equipment_id, job_id) in &unit_fixes {
            match store
                .update_individual_assignment(equipment_id, EquipmentStatus::Deployed, Some(*job_id))
                .await
            {
                Ok(()) => {
                    corrected += 1;
                    let mut st = state.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(unit) = st.individual.get_mut(equipment_id) {
                        unit.status = EquipmentStatus::Deployed as i16;
                        unit.job_id = Some(*job_id);
                    }
                }
                Err(e) => {
                    tracing::warn!("resync could not correct {}: {}", equipment_id, e);
                }
            }
        }
        for (row_id, job_id) in &bulk_fixes {
            match store
                .update_bulk_assignment(*row_id, EquipmentStatus::Deployed, Some(*job_id), None)
                .await
            {
                Ok(_) => {
                    corrected += 1;
                    let mut st = state.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(row) = st.bulk.get_mut(row_id) {
                        row.status = EquipmentStatus::Deployed as i16;
                        row.job_id = Some(*job_id);
                    }
                }
                Err(e) => {
                    tracing::warn!("resync could not correct bulk row {}: {}", row_id, e);
                }
            }
        }

        if corrected > 0 || !dropped.is_empty() {
            tracing::warn!(
                "inventory resync corrected {} assignments, dropped {} stale ledger entries",
                corrected,
                dropped.len()
            );
        } else {
            tracing::debug!("inventory resync found no drift");
        }
        Ok(())
    }

    /// Schedule a debounced full resync. A single pending timer per service:
    /// scheduling while one is pending aborts and replaces it, so a burst of
    /// edits coalesces into one pass.
    pub fn schedule_resync(&self) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let delay = self.resync_debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = Self::resync(store, state).await {
                tracing::warn!("scheduled inventory resync failed: {}", e);
            }
        });

        let mut slot = self.resync_timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    // =========================================================================
    // Realtime reconciliation
    // =========================================================================

    /// Fold one change-feed notification into the cache and ledger. The
    /// remote row image is authoritative: deployed-with-job upserts a ledger
    /// entry whether or not this process initiated the change, anything else
    /// clears it. Idempotent under replay.
    pub fn apply_remote_change(&self, change: &EquipmentChange) {
        if let Some(unit) = change.individual_row() {
            let mut state = self.state();
            let key = unit.equipment_id.clone();
            match change.op {
                ChangeOp::Delete => {
                    state.individual.remove(&key);
                    state.ledger.shift_remove(&key);
                }
                ChangeOp::Insert | ChangeOp::Update => {
                    match (EquipmentStatus::from(unit.status), unit.job_id) {
                        (EquipmentStatus::Deployed, Some(job_id)) => {
                            let job_name = state
                                .ledger
                                .get(&key)
                                .filter(|entry| entry.job_id == job_id)
                                .map(|entry| entry.job_name.clone())
                                .unwrap_or_else(|| UNKNOWN_JOB.to_string());
                            state.ledger.insert(
                                key.clone(),
                                EquipmentAllocation {
                                    equipment_id: key.clone(),
                                    job_id,
                                    job_name,
                                    status: AllocationStatus::Allocated,
                                    timestamp: unit.updated_at,
                                },
                            );
                        }
                        _ => {
                            state.ledger.shift_remove(&key);
                        }
                    }
                    state.individual.insert(key, unit);
                }
            }
        } else if let Some(row) = change.bulk_row() {
            let mut state = self.state();
            let key = row.id.to_string();
            match change.op {
                ChangeOp::Delete => {
                    state.bulk.remove(&row.id);
                    state.ledger.shift_remove(&key);
                }
                ChangeOp::Insert | ChangeOp::Update => {
                    match (EquipmentStatus::from(row.status), row.job_id) {
                        (EquipmentStatus::Deployed, Some(job_id)) => {
                            let job_name = state
                                .ledger
                                .get(&key)
                                .filter(|entry| entry.job_id == job_id)
                                .map(|entry| entry.job_name.clone())
                                .unwrap_or_else(|| UNKNOWN_JOB.to_string());
                            state.ledger.insert(
                                key.clone(),
                                EquipmentAllocation {
                                    equipment_id: key.clone(),
                                    job_id,
                                    job_name,
                                    status: AllocationStatus::Allocated,
                                    timestamp: row.updated_at,
                                },
                            );
                        }
                        _ => {
                            state.ledger.shift_remove(&key);
                        }
                    }
                    state.bulk.insert(row.id, row);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::EquipmentManifest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unit(
        equipment_id: &str,
        status: EquipmentStatus,
        job_id: Option<i32>,
    ) -> IndividualEquipment {
        let now = Utc::now();
        IndividualEquipment {
            id: 0,
            equipment_id: equipment_id.to_string(),
            serial_number: None,
            type_id: 1,
            location_id: 1,
            status: status as i16,
            job_id,
            red_tag_reason: None,
            red_tagged_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn bulk_row(
        id: i32,
        quantity: i32,
        status: EquipmentStatus,
        job_id: Option<i32>,
    ) -> BulkEquipment {
        let now = Utc::now();
        BulkEquipment {
            id,
            type_id: 1,
            location_id: 1,
            quantity,
            status: status as i16,
            job_id,
            red_tag_reason: None,
            red_tagged_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// In-memory catalog with injectable deploy failures and call counters.
    struct FakeCatalog {
        individual: Mutex<Vec<IndividualEquipment>>,
        bulk: Mutex<Vec<BulkEquipment>>,
        list_calls: AtomicUsize,
        batch_calls: AtomicUsize,
        unit_writes: AtomicUsize,
        /// Number of upcoming deploy writes that fail (usize::MAX = all).
        fail_deploys: AtomicUsize,
    }

    impl FakeCatalog {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                individual: Mutex::new(Vec::new()),
                bulk: Mutex::new(Vec::new()),
                list_calls: AtomicUsize::new(0),
                batch_calls: AtomicUsize::new(0),
                unit_writes: AtomicUsize::new(0),
                fail_deploys: AtomicUsize::new(0),
            })
        }

        fn add_unit(&self, unit: IndividualEquipment) {
            self.individual.lock().unwrap().push(unit);
        }

        fn add_bulk(&self, row: BulkEquipment) {
            self.bulk.lock().unwrap().push(row);
        }

        fn unit_state(&self, equipment_id: &str) -> (EquipmentStatus, Option<i32>) {
            let units = self.individual.lock().unwrap();
            let unit = units
                .iter()
                .find(|u| u.equipment_id == equipment_id)
                .expect("unit exists");
            (EquipmentStatus::from(unit.status), unit.job_id)
        }

        fn bulk_state(&self, id: i32) -> (i32, EquipmentStatus, Option<i32>) {
            let rows = self.bulk.lock().unwrap();
            let row = rows.iter().find(|r| r.id == id).expect("bulk row exists");
            (row.quantity, EquipmentStatus::from(row.status), row.job_id)
        }

        fn take_deploy_failure(&self) -> bool {
            let remaining = self.fail_deploys.load(Ordering::SeqCst);
            if remaining == 0 {
                return false;
            }
            if remaining != usize::MAX {
                self.fail_deploys.store(remaining - 1, Ordering::SeqCst);
            }
            true
        }
    }

    #[async_trait]
    impl CatalogStore for FakeCatalog {
        async fn list_individual(&self) -> AppResult<Vec<IndividualEquipment>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.individual.lock().unwrap().clone())
        }

        async fn list_bulk(&self) -> AppResult<Vec<BulkEquipment>> {
            Ok(self.bulk.lock().unwrap().clone())
        }

        async fn update_individual_assignment(
            &self,
            equipment_id: &str,
            status: EquipmentStatus,
            job_id: Option<i32>,
        ) -> AppResult<()> {
            if status == EquipmentStatus::Deployed && self.take_deploy_failure() {
                return Err(AppError::Internal("injected write failure".to_string()));
            }
            self.unit_writes.fetch_add(1, Ordering::SeqCst);
            let mut units = self.individual.lock().unwrap();
            let unit = units
                .iter_mut()
                .find(|u| u.equipment_id == equipment_id)
                .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))?;
            unit.status = status as i16;
            unit.job_id = job_id;
            unit.updated_at = Utc::now();
            Ok(())
        }

        async fn update_bulk_assignment(
            &self,
            id: i32,
            status: EquipmentStatus,
            job_id: Option<i32>,
            quantity: Option<i32>,
        ) -> AppResult<i32> {
            if status == EquipmentStatus::Deployed && self.take_deploy_failure() {
                return Err(AppError::Internal("injected write failure".to_string()));
            }
            let mut rows = self.bulk.lock().unwrap();
            let index = rows
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Bulk equipment {} not found", id)))?;
            let moved = quantity.unwrap_or(rows[index].quantity);
            if moved > rows[index].quantity {
                return Err(AppError::InsufficientQuantity {
                    requested: moved,
                    available: rows[index].quantity,
                });
            }
            if moved == rows[index].quantity {
                rows[index].status = status as i16;
                rows[index].job_id = job_id;
                rows[index].updated_at = Utc::now();
                Ok(id)
            } else {
                rows[index].quantity -= moved;
                let new_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
                let mut split = bulk_row(new_id, moved, status, job_id);
                split.type_id = rows[index].type_id;
                split.location_id = rows[index].location_id;
                rows.push(split);
                Ok(new_id)
            }
        }

        async fn batch_update_status(
            &self,
            job_id: i32,
            equipment_ids: &[String],
        ) -> AppResult<BatchOutcome> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            let mut units = self.individual.lock().unwrap();
            for unit in units.iter_mut() {
                if unit.job_id == Some(job_id)
                    && !equipment_ids.iter().any(|id| *id == unit.equipment_id)
                {
                    unit.status = EquipmentStatus::Available as i16;
                    unit.job_id = None;
                }
            }
            let mut deployed = 0i64;
            for id in equipment_ids {
                if let Some(unit) = units.iter_mut().find(|u| u.equipment_id == *id) {
                    let status = EquipmentStatus::from(unit.status);
                    if status == EquipmentStatus::Available
                        || (status == EquipmentStatus::Deployed && unit.job_id == Some(job_id))
                    {
                        unit.status = EquipmentStatus::Deployed as i16;
                        unit.job_id = Some(job_id);
                        deployed += 1;
                    }
                }
            }
            Ok(BatchOutcome {
                success_count: deployed,
                failure_count: equipment_ids.len() as i64 - deployed,
                duration_ms: 1,
            })
        }

        async fn consolidate_bulk(&self) -> AppResult<u64> {
            let mut rows = self.bulk.lock().unwrap();
            let mut merged = 0u64;
            let mut kept: Vec<BulkEquipment> = Vec::new();
            for row in rows.drain(..) {
                if EquipmentStatus::from(row.status) != EquipmentStatus::RedTagged {
                    if let Some(existing) = kept.iter_mut().find(|k| {
                        k.type_id == row.type_id
                            && k.location_id == row.location_id
                            && k.status == row.status
                            && k.job_id == row.job_id
                            && EquipmentStatus::from(k.status) != EquipmentStatus::RedTagged
                    }) {
                        existing.quantity += row.quantity;
                        merged += 1;
                        continue;
                    }
                }
                kept.push(row);
            }
            *rows = kept;
            Ok(merged)
        }
    }

    fn relaxed_notifier() -> Arc<MockNotifier> {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify_success().returning(|_| ());
        notifier.expect_notify_error().returning(|_| ());
        Arc::new(notifier)
    }

    async fn service(store: Arc<FakeCatalog>) -> Arc<AllocationService> {
        service_with_names(store, HashMap::new()).await
    }

    async fn service_with_names(
        store: Arc<FakeCatalog>,
        job_names: HashMap<i32, String>,
    ) -> Arc<AllocationService> {
        let svc = Arc::new(AllocationService::new(
            store,
            relaxed_notifier(),
            Duration::from_millis(25),
        ));
        svc.load_catalog(&job_names).await.expect("load catalog");
        svc
    }

    fn change(table: &str, op: ChangeOp, row: serde_json::Value) -> EquipmentChange {
        EquipmentChange {
            table: table.to_string(),
            op,
            row,
        }
    }

    #[tokio::test]
    async fn test_allocate_available_equipment() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        let entry = svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        assert_eq!(entry.job_id, 1);
        assert_eq!(entry.status, AllocationStatus::Allocated);

        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Deployed, Some(1))
        );
        assert_eq!(svc.equipment_status("SS0001"), EquipmentStatus::Deployed);
        assert_eq!(svc.allocations_for_job(1).len(), 1);
    }

    #[tokio::test]
    async fn test_reallocation_to_same_job_is_idempotent() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        let first = svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let writes_after_first = store.unit_writes.load(Ordering::SeqCst);
        let second = svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();

        assert_eq!(first, second);
        assert!(svc.pending_conflicts().is_empty());
        // No second persisted write for the no-op re-allocation.
        assert_eq!(store.unit_writes.load(Ordering::SeqCst), writes_after_first);
    }

    #[tokio::test]
    async fn test_double_booking_produces_one_conflict_and_no_transfer() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let err = svc
            .allocate("SS0001", 2, "Eagle Ford 7", None)
            .await
            .unwrap_err();

        match err {
            AppError::AllocationConflict(conflict) => {
                assert_eq!(conflict.equipment_id, "SS0001");
                assert_eq!(conflict.current_job_id, 1);
                assert_eq!(conflict.current_job_name, "Permian 42");
                assert_eq!(conflict.requested_job_id, 2);
                assert_eq!(conflict.requested_job_name, "Eagle Ford 7");
            }
            other => panic!("expected allocation conflict, got {:?}", other),
        }

        let conflicts = svc.pending_conflicts();
        assert_eq!(conflicts.len(), 1);
        // The equipment stays with the original holder.
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Deployed, Some(1))
        );
        assert_eq!(svc.ledger_entry("SS0001").unwrap().job_id, 1);
    }

    #[tokio::test]
    async fn test_terminal_status_rejected_without_conflict() {
        let store = FakeCatalog::new();
        let mut tagged = unit("SS0002", EquipmentStatus::RedTagged, None);
        tagged.red_tag_reason = Some("bent frame".to_string());
        store.add_unit(tagged);
        let svc = service(Arc::clone(&store)).await;

        let err = svc
            .allocate("SS0002", 1, "Permian 42", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(svc.pending_conflicts().is_empty());
        assert_eq!(
            store.unit_state("SS0002"),
            (EquipmentStatus::RedTagged, None)
        );
    }

    #[tokio::test]
    async fn test_unknown_equipment_rejected_without_conflict() {
        let store = FakeCatalog::new();
        let svc = service(Arc::clone(&store)).await;

        let err = svc
            .allocate("GHOST", 1, "Permian 42", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(svc.pending_conflicts().is_empty());

        let outcome = svc.validate_availability("GHOST", 1, "Permian 42", None);
        assert!(!outcome.available);
        assert!(outcome.conflict.is_none());
    }

    #[tokio::test]
    async fn test_same_job_revalidation_on_persisted_status() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Deployed, Some(1)));
        let svc = service(Arc::clone(&store)).await;

        // Drop the ledger entry so validation has to fall back to the
        // cached catalog row (as after a restart that lost ledger state).
        svc.state().ledger.shift_remove("SS0001");

        let outcome = svc.validate_availability("SS0001", 1, "Permian 42", None);
        assert!(outcome.available);
        assert!(svc.pending_conflicts().is_empty());

        let outcome = svc.validate_availability("SS0001", 2, "Eagle Ford 7", None);
        assert!(!outcome.available);
        let conflict = outcome.conflict.expect("conflict for other job");
        assert_eq!(conflict.current_job_name, UNKNOWN_JOB);
    }

    #[tokio::test]
    async fn test_insufficient_bulk_quantity_rejected_without_conflict() {
        let store = FakeCatalog::new();
        store.add_bulk(bulk_row(7, 5, EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        let err = svc.allocate("7", 1, "Permian 42", Some(10)).await.unwrap_err();
        match err {
            AppError::InsufficientQuantity {
                requested,
                available,
            } => {
                assert_eq!(requested, 10);
                assert_eq!(available, 5);
            }
            other => panic!("expected insufficient quantity, got {:?}", other),
        }
        assert!(svc.pending_conflicts().is_empty());
        assert_eq!(store.bulk_state(7).0, 5);
    }

    #[tokio::test]
    async fn test_partial_bulk_allocation_splits_row_and_rekeys_ledger() {
        let store = FakeCatalog::new();
        store.add_bulk(bulk_row(7, 10, EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        let entry = svc.allocate("7", 3, "Midland 9", Some(3)).await.unwrap();

        // The deployment landed in a fresh row; the ledger follows it.
        assert_eq!(entry.equipment_id, "8");
        assert_eq!(store.bulk_state(7), (7, EquipmentStatus::Available, None));
        assert_eq!(store.bulk_state(8), (3, EquipmentStatus::Deployed, Some(3)));
        assert!(svc.ledger_entry("7").is_none());
        assert_eq!(svc.ledger_entry("8").unwrap().job_id, 3);
    }

    #[tokio::test]
    async fn test_ledger_rolled_back_when_persist_fails() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        store.fail_deploys.store(usize::MAX, Ordering::SeqCst);
        let svc = service(Arc::clone(&store)).await;

        let err = svc
            .allocate("SS0001", 1, "Permian 42", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(svc.ledger_entry("SS0001").is_none());
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Available, None)
        );
        assert_eq!(svc.equipment_status("SS0001"), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn test_persistence_failure_notifies_error() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        store.fail_deploys.store(usize::MAX, Ordering::SeqCst);

        let mut notifier = MockNotifier::new();
        notifier.expect_notify_success().returning(|_| ());
        notifier
            .expect_notify_error()
            .times(1)
            .returning(|_| ());

        let svc = Arc::new(AllocationService::new(
            store,
            Arc::new(notifier),
            Duration::from_millis(25),
        ));
        svc.load_catalog(&HashMap::new()).await.unwrap();

        assert!(svc.allocate("SS0001", 1, "Permian 42", None).await.is_err());
    }

    #[tokio::test]
    async fn test_release_returns_equipment_to_pool() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        svc.release("SS0001", 1).await.unwrap();

        assert!(svc.ledger_entry("SS0001").is_none());
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Available, None)
        );
        assert_eq!(svc.equipment_status("SS0001"), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn test_release_of_unknown_equipment_is_an_error() {
        let store = FakeCatalog::new();
        let svc = service(Arc::clone(&store)).await;

        let err = svc.release("GHOST", 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_release_by_wrong_job_is_rejected() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let err = svc.release("SS0001", 2).await.unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(svc.ledger_entry("SS0001").unwrap().job_id, 1);
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Deployed, Some(1))
        );
    }

    #[tokio::test]
    async fn test_release_of_red_tagged_equipment_is_rejected() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::RedTagged, None));
        let svc = service(Arc::clone(&store)).await;

        let err = svc.release("SS0001", 1).await.unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(_)));
        // The red tag survives: no write reached the store.
        assert_eq!(store.unit_writes.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::RedTagged, None)
        );
    }

    #[tokio::test]
    async fn test_transfer_resolution_moves_equipment_to_requester() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let err = svc
            .allocate("SS0001", 2, "Eagle Ford 7", None)
            .await
            .unwrap_err();
        let conflict = match err {
            AppError::AllocationConflict(c) => *c,
            other => panic!("expected conflict, got {:?}", other),
        };

        let entry = svc
            .resolve_conflict(conflict.id, ConflictResolution::TransferToRequester)
            .await
            .unwrap()
            .expect("transfer produces an allocation");

        assert_eq!(entry.job_id, 2);
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Deployed, Some(2))
        );
        assert_eq!(svc.ledger_entry("SS0001").unwrap().job_id, 2);
        assert!(svc.pending_conflicts().is_empty());
        // At most one holder across ledger and catalog.
        assert_eq!(svc.allocations_for_job(1).len(), 0);
        assert_eq!(svc.allocations_for_job(2).len(), 1);
    }

    #[tokio::test]
    async fn test_keep_current_resolution_changes_nothing() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let err = svc
            .allocate("SS0001", 2, "Eagle Ford 7", None)
            .await
            .unwrap_err();
        let conflict = match err {
            AppError::AllocationConflict(c) => *c,
            other => panic!("expected conflict, got {:?}", other),
        };

        let outcome = svc
            .resolve_conflict(conflict.id, ConflictResolution::KeepCurrent)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(svc.pending_conflicts().is_empty());
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Deployed, Some(1))
        );
        assert_eq!(svc.ledger_entry("SS0001").unwrap().job_id, 1);
    }

    #[tokio::test]
    async fn test_resolving_unknown_conflict_is_not_found() {
        let store = FakeCatalog::new();
        let svc = service(Arc::clone(&store)).await;

        let err = svc
            .resolve_conflict(Uuid::new_v4(), ConflictResolution::KeepCurrent)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_transfer_compensates_back_to_original_holder() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let err = svc
            .allocate("SS0001", 2, "Eagle Ford 7", None)
            .await
            .unwrap_err();
        let conflict = match err {
            AppError::AllocationConflict(c) => *c,
            other => panic!("expected conflict, got {:?}", other),
        };

        // Release succeeds (not a deploy write); the requester's allocate
        // fails; the compensating re-allocation to the original succeeds.
        store.fail_deploys.store(1, Ordering::SeqCst);
        let result = svc
            .resolve_conflict(conflict.id, ConflictResolution::TransferToRequester)
            .await;

        assert!(result.is_err());
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Deployed, Some(1))
        );
        assert_eq!(svc.ledger_entry("SS0001").unwrap().job_id, 1);
        assert!(svc.pending_conflicts().is_empty());
    }

    #[tokio::test]
    async fn test_failed_transfer_and_compensation_leaves_unassigned() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let err = svc
            .allocate("SS0001", 2, "Eagle Ford 7", None)
            .await
            .unwrap_err();
        let conflict = match err {
            AppError::AllocationConflict(c) => *c,
            other => panic!("expected conflict, got {:?}", other),
        };

        store.fail_deploys.store(usize::MAX, Ordering::SeqCst);
        let result = svc
            .resolve_conflict(conflict.id, ConflictResolution::TransferToRequester)
            .await;

        assert!(result.is_err());
        // Documented policy: the unit ends up unassigned, visibly, rather
        // than silently re-held.
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Available, None)
        );
        assert!(svc.ledger_entry("SS0001").is_none());
        assert!(svc.pending_conflicts().is_empty());
    }

    #[tokio::test]
    async fn test_redetected_conflict_replaces_previous_record() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        let _ = svc.validate_availability("SS0001", 2, "Eagle Ford 7", None);
        let _ = svc.validate_availability("SS0001", 3, "Midland 9", None);

        let conflicts = svc.pending_conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].requested_job_id, 3);
    }

    fn job_with_manifest(id: i32, name: &str, manifest: EquipmentManifest) -> Job {
        let now = Utc::now();
        Job {
            id,
            name: name.to_string(),
            client: None,
            wellsite: None,
            equipment_manifest: sqlx::types::Json(manifest),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_job_sync_applies_manifest_diff_with_one_batch() {
        let store = FakeCatalog::new();
        for id in ["SS0001", "SS0002", "SS0003", "SS0004"] {
            store.add_unit(unit(id, EquipmentStatus::Available, None));
        }
        let svc = service(Arc::clone(&store)).await;

        let job = job_with_manifest(
            5,
            "Permian 42",
            EquipmentManifest {
                box_ids: vec!["SS0001".into(), "SS0002".into(), "SS0003".into()],
                satellite_id: None,
                computer_ids: vec![],
            },
        );
        svc.sync_job_equipment(&job).await.unwrap();
        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 1);

        let job = job_with_manifest(
            5,
            "Permian 42",
            EquipmentManifest {
                box_ids: vec!["SS0001".into(), "SS0003".into(), "SS0004".into()],
                satellite_id: None,
                computer_ids: vec![],
            },
        );
        let outcome = svc.sync_job_equipment(&job).await.unwrap();

        assert_eq!(outcome.success_count, 3);
        assert_eq!(outcome.failure_count, 0);
        // One batched write per sync, no per-item round-trips.
        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.unit_writes.load(Ordering::SeqCst), 0);

        let mut held: Vec<String> = svc
            .allocations_for_job(5)
            .into_iter()
            .map(|entry| entry.equipment_id)
            .collect();
        held.sort();
        assert_eq!(held, vec!["SS0001", "SS0003", "SS0004"]);
        assert_eq!(
            store.unit_state("SS0002"),
            (EquipmentStatus::Available, None)
        );
        assert_eq!(
            store.unit_state("SS0004"),
            (EquipmentStatus::Deployed, Some(5))
        );
    }

    #[tokio::test]
    async fn test_release_job_equipment_clears_everything() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        store.add_bulk(bulk_row(7, 4, EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        svc.allocate("7", 1, "Permian 42", None).await.unwrap();

        svc.release_job_equipment(1).await.unwrap();

        assert!(svc.allocations_for_job(1).is_empty());
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Available, None)
        );
        assert_eq!(store.bulk_state(7), (4, EquipmentStatus::Available, None));
    }

    #[tokio::test]
    async fn test_remote_change_creates_ledger_entry_without_local_allocate() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0009", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        let mut remote = unit("SS0009", EquipmentStatus::Deployed, Some(9));
        remote.updated_at = Utc::now();
        svc.apply_remote_change(&change(
            EquipmentChange::INDIVIDUAL_TABLE,
            ChangeOp::Update,
            serde_json::to_value(&remote).unwrap(),
        ));

        let entry = svc.ledger_entry("SS0009").expect("entry from remote change");
        assert_eq!(entry.job_id, 9);
        assert_eq!(entry.status, AllocationStatus::Allocated);
        assert_eq!(entry.job_name, UNKNOWN_JOB);
        assert_eq!(svc.equipment_status("SS0009"), EquipmentStatus::Deployed);
    }

    #[tokio::test]
    async fn test_remote_release_removes_ledger_entry() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();

        // Another client released the unit; the feed forces local state to
        // match.
        let remote = unit("SS0001", EquipmentStatus::Available, None);
        svc.apply_remote_change(&change(
            EquipmentChange::INDIVIDUAL_TABLE,
            ChangeOp::Update,
            serde_json::to_value(&remote).unwrap(),
        ));

        assert!(svc.ledger_entry("SS0001").is_none());
        assert_eq!(svc.equipment_status("SS0001"), EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn test_remote_change_replay_is_idempotent() {
        let store = FakeCatalog::new();
        let svc = service(Arc::clone(&store)).await;

        let mut remote = unit("SS0009", EquipmentStatus::Deployed, Some(9));
        remote.updated_at = Utc::now();
        let payload = serde_json::to_value(&remote).unwrap();

        svc.apply_remote_change(&change(
            EquipmentChange::INDIVIDUAL_TABLE,
            ChangeOp::Update,
            payload.clone(),
        ));
        let first = svc.ledger_entry("SS0009").unwrap();
        svc.apply_remote_change(&change(
            EquipmentChange::INDIVIDUAL_TABLE,
            ChangeOp::Update,
            payload,
        ));
        let second = svc.ledger_entry("SS0009").unwrap();

        assert_eq!(first, second);
        assert_eq!(svc.state().ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_change_preserves_known_job_name() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();

        // The confirming update for our own write keeps the resolved name.
        let remote = unit("SS0001", EquipmentStatus::Deployed, Some(1));
        svc.apply_remote_change(&change(
            EquipmentChange::INDIVIDUAL_TABLE,
            ChangeOp::Update,
            serde_json::to_value(&remote).unwrap(),
        ));

        assert_eq!(svc.ledger_entry("SS0001").unwrap().job_name, "Permian 42");
    }

    #[tokio::test]
    async fn test_remote_bulk_change_updates_cache_and_ledger() {
        let store = FakeCatalog::new();
        store.add_bulk(bulk_row(7, 4, EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        let remote = bulk_row(7, 4, EquipmentStatus::Deployed, Some(3));
        svc.apply_remote_change(&change(
            EquipmentChange::BULK_TABLE,
            ChangeOp::Update,
            serde_json::to_value(&remote).unwrap(),
        ));
        assert_eq!(svc.ledger_entry("7").unwrap().job_id, 3);

        let remote = bulk_row(7, 4, EquipmentStatus::Available, None);
        svc.apply_remote_change(&change(
            EquipmentChange::BULK_TABLE,
            ChangeOp::Update,
            serde_json::to_value(&remote).unwrap(),
        ));
        assert!(svc.ledger_entry("7").is_none());
    }

    #[tokio::test]
    async fn test_remote_delete_drops_cache_and_ledger() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();

        let remote = unit("SS0001", EquipmentStatus::Deployed, Some(1));
        svc.apply_remote_change(&change(
            EquipmentChange::INDIVIDUAL_TABLE,
            ChangeOp::Delete,
            serde_json::to_value(&remote).unwrap(),
        ));

        assert!(svc.ledger_entry("SS0001").is_none());
        assert_eq!(svc.equipment_status("SS0001"), EquipmentStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_status_resolution_falls_back_to_catalog_then_unavailable() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Maintenance, None));
        store.add_bulk(bulk_row(7, 4, EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        assert_eq!(svc.equipment_status("SS0001"), EquipmentStatus::Maintenance);
        assert_eq!(svc.equipment_status("7"), EquipmentStatus::Available);
        assert_eq!(svc.equipment_status("GHOST"), EquipmentStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_resync_corrects_drifted_assignment() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();

        // Something external clobbered the persisted assignment while the
        // ledger still records the intent.
        {
            let mut units = store.individual.lock().unwrap();
            let unit = units.iter_mut().find(|u| u.equipment_id == "SS0001").unwrap();
            unit.status = EquipmentStatus::Available as i16;
            unit.job_id = None;
        }

        svc.sync_inventory_status().await.unwrap();

        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::Deployed, Some(1))
        );
        assert_eq!(svc.ledger_entry("SS0001").unwrap().job_id, 1);
    }

    #[tokio::test]
    async fn test_resync_drops_entry_for_terminal_equipment() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();

        // Red-tagged in the field: the catalog wins over the ledger's intent.
        {
            let mut units = store.individual.lock().unwrap();
            let unit = units.iter_mut().find(|u| u.equipment_id == "SS0001").unwrap();
            unit.status = EquipmentStatus::RedTagged as i16;
            unit.job_id = None;
            unit.red_tag_reason = Some("hydraulic leak".to_string());
        }

        svc.sync_inventory_status().await.unwrap();

        assert!(svc.ledger_entry("SS0001").is_none());
        assert_eq!(
            store.unit_state("SS0001"),
            (EquipmentStatus::RedTagged, None)
        );
    }

    #[tokio::test]
    async fn test_resync_consolidates_duplicate_bulk_rows() {
        let store = FakeCatalog::new();
        store.add_bulk(bulk_row(1, 5, EquipmentStatus::Available, None));
        store.add_bulk(bulk_row(2, 7, EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;

        svc.sync_inventory_status().await.unwrap();

        assert_eq!(store.bulk.lock().unwrap().len(), 1);
        assert_eq!(store.bulk_state(1).0, 12);
        assert_eq!(svc.state().bulk.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_schedules_coalesce_into_one_resync() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        store.add_unit(unit("SS0002", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;
        let baseline = store.list_calls.load(Ordering::SeqCst);

        // Each allocate schedules a resync; the second replaces the first's
        // pending timer.
        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        svc.allocate("SS0002", 1, "Permian 42", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.list_calls.load(Ordering::SeqCst) - baseline, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_fires_again_after_quiet_period() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Available, None));
        let svc = service(Arc::clone(&store)).await;
        let baseline = store.list_calls.load(Ordering::SeqCst);

        svc.allocate("SS0001", 1, "Permian 42", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        svc.release("SS0001", 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.list_calls.load(Ordering::SeqCst) - baseline, 2);
    }

    #[tokio::test]
    async fn test_load_catalog_rebuilds_ledger_with_job_names() {
        let store = FakeCatalog::new();
        store.add_unit(unit("SS0001", EquipmentStatus::Deployed, Some(4)));
        store.add_unit(unit("SS0002", EquipmentStatus::Available, None));
        store.add_bulk(bulk_row(7, 4, EquipmentStatus::Deployed, Some(4)));

        let names = HashMap::from([(4, "Delaware 12".to_string())]);
        let svc = service_with_names(Arc::clone(&store), names).await;

        assert_eq!(svc.allocations_for_job(4).len(), 2);
        let entry = svc.ledger_entry("SS0001").unwrap();
        assert_eq!(entry.job_name, "Delaware 12");
        assert_eq!(entry.status, AllocationStatus::Deployed);
        assert!(svc.ledger_entry("SS0002").is_none());
    }
}
