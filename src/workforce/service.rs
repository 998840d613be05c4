//! Workforce service: one repository per entity type over shared storage.

use chrono::{DateTime, Days, NaiveDate, Utc};
use color_eyre::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cache::{
  CacheStorage, FingerprintRegistry, FingerprintStore, RemoteStore, RemoteWriter, Repository,
  SqliteFingerprintStore, SqliteStorage, SyncCoordinator, SyncError, Syncable,
};
use crate::config::{CacheConfig, Config};
use crate::db::Database;

use super::client::WorkforceClient;
use super::types::{Absence, Contract, Employee, Shift};

/// How long shift weeks stay cached after they end.
pub const SHIFT_RETENTION_DAYS: u64 = 90;

/// Sync state of one scope, as recorded in the fingerprint store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeStatus {
  pub entity_type: &'static str,
  pub scope_key: String,
  pub fingerprint: String,
  pub synced_at: Option<DateTime<Utc>>,
}

impl<S: CacheStorage> Repository<Shift, S> {
  /// Evict shift weeks that ended more than [`SHIFT_RETENTION_DAYS`] before `reference`.
  pub async fn delete_old_cached_data(
    &self,
    reference: NaiveDate,
  ) -> Result<Vec<String>, SyncError> {
    self
      .delete_cached_data_older_than(reference, SHIFT_RETENTION_DAYS)
      .await
  }

  /// Evict shift weeks that ended more than `retention_days` before `reference`.
  pub async fn delete_cached_data_older_than(
    &self,
    reference: NaiveDate,
    retention_days: u64,
  ) -> Result<Vec<String>, SyncError> {
    let cutoff = reference
      .checked_sub_days(Days::new(retention_days))
      .unwrap_or(NaiveDate::MIN);
    self.coordinator().evict_windows_before(cutoff).await
  }
}

/// Wires the sync subsystem for every workforce entity type.
///
/// All repositories share one database, one fingerprint store and one cache
/// storage; nothing is global.
pub struct WorkforceService {
  fingerprints: Arc<dyn FingerprintStore>,
  storage: Arc<SqliteStorage>,
  retention_days: u64,
  employees: Repository<Employee, SqliteStorage>,
  shifts: Repository<Shift, SqliteStorage>,
  contracts: Repository<Contract, SqliteStorage>,
  absences: Repository<Absence, SqliteStorage>,
}

impl WorkforceService {
  /// Create the service against the configured remote and database.
  pub fn new(config: &Config) -> Result<Self> {
    let client = Arc::new(WorkforceClient::new(&config.remote)?);
    let db = Database::open(config.cache.path.as_deref())?;
    Ok(Self::with_remote(db, client, &config.cache))
  }

  /// Create the service with an explicit remote implementation.
  pub fn with_remote<R>(db: Database, remote: Arc<R>, cache: &CacheConfig) -> Self
  where
    R: RemoteStore<Employee>
      + RemoteStore<Shift>
      + RemoteStore<Contract>
      + RemoteStore<Absence>
      + RemoteWriter<Employee>
      + RemoteWriter<Absence>
      + 'static,
  {
    let fingerprints: Arc<dyn FingerprintStore> =
      Arc::new(SqliteFingerprintStore::new(db.clone()));
    let storage = Arc::new(SqliteStorage::new(db));

    let employee_remote: Arc<dyn RemoteStore<Employee>> = remote.clone();
    let shift_remote: Arc<dyn RemoteStore<Shift>> = remote.clone();
    let contract_remote: Arc<dyn RemoteStore<Contract>> = remote.clone();
    let absence_remote: Arc<dyn RemoteStore<Absence>> = remote.clone();
    let employee_writer: Arc<dyn RemoteWriter<Employee>> = remote.clone();
    let absence_writer: Arc<dyn RemoteWriter<Absence>> = remote;

    let employees = repository(employee_remote, &storage, &fingerprints, cache)
      .with_writer(employee_writer);
    let shifts = repository(shift_remote, &storage, &fingerprints, cache);
    let contracts = repository(contract_remote, &storage, &fingerprints, cache);
    let absences =
      repository(absence_remote, &storage, &fingerprints, cache).with_writer(absence_writer);

    Self {
      fingerprints,
      storage,
      retention_days: cache.retention_days,
      employees,
      shifts,
      contracts,
      absences,
    }
  }

  pub fn employees(&self) -> &Repository<Employee, SqliteStorage> {
    &self.employees
  }

  pub fn shifts(&self) -> &Repository<Shift, SqliteStorage> {
    &self.shifts
  }

  pub fn contracts(&self) -> &Repository<Contract, SqliteStorage> {
    &self.contracts
  }

  pub fn absences(&self) -> &Repository<Absence, SqliteStorage> {
    &self.absences
  }

  /// Evict expired shift weeks using the configured retention.
  pub async fn prune(&self, reference: NaiveDate) -> Result<Vec<String>, SyncError> {
    self
      .shifts
      .delete_cached_data_older_than(reference, self.retention_days)
      .await
  }

  /// Every scope that currently has a recorded fingerprint.
  pub fn status(&self) -> Result<Vec<ScopeStatus>> {
    let mut statuses = Vec::new();
    collect_status(self.employees.coordinator().registry(), &mut statuses)?;
    collect_status(self.shifts.coordinator().registry(), &mut statuses)?;
    collect_status(self.contracts.coordinator().registry(), &mut statuses)?;
    collect_status(self.absences.coordinator().registry(), &mut statuses)?;
    Ok(statuses)
  }

  /// Raw keys held by the fingerprint store.
  pub fn fingerprint_keys(&self) -> Result<BTreeSet<String>> {
    self.fingerprints.list_keys()
  }

  /// Forget every fingerprint and drop every cached partition.
  pub fn reset(&self) -> Result<()> {
    // Fingerprints go first so a partial reset leaves scopes Unsynced
    self.fingerprints.delete_all()?;
    self.storage.clear_all::<Employee>()?;
    self.storage.clear_all::<Shift>()?;
    self.storage.clear_all::<Contract>()?;
    self.storage.clear_all::<Absence>()?;
    Ok(())
  }
}

fn repository<T: Syncable>(
  remote: Arc<dyn RemoteStore<T>>,
  storage: &Arc<SqliteStorage>,
  fingerprints: &Arc<dyn FingerprintStore>,
  cache: &CacheConfig,
) -> Repository<T, SqliteStorage> {
  let registry = FingerprintRegistry::new(fingerprints.clone(), T::entity_type());
  let coordinator = SyncCoordinator::new(remote, storage.clone(), registry)
    .with_scope_serialization(cache.serialize_scopes);
  Repository::new(coordinator, storage.clone())
}

fn collect_status(registry: &FingerprintRegistry, out: &mut Vec<ScopeStatus>) -> Result<()> {
  for scope_key in registry.scopes()? {
    if let Some(fp) = registry.fingerprint(&scope_key)? {
      out.push(ScopeStatus {
        entity_type: registry.namespace(),
        synced_at: registry.last_synced(&scope_key)?,
        fingerprint: fp.to_string(),
        scope_key,
      });
    }
  }
  Ok(())
}
