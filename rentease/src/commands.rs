//! Operator commands. Each returns its result as data; `main` prints it.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use rentease_store::config::StoreConfig;
use rentease_store::models::{Bill, LandlordTenant, Property, Role, StayStatus, TenantStay, User};
use rentease_store::persistence::sqlite::{import_json_store, Database, ImportReport};
use rentease_store::persistence::{Backend, CollectionCounts, DocumentStore, JsonFileStore};
use rentease_store::RentalStore;
use tracing::info;

pub async fn open_store(config: &StoreConfig) -> Result<RentalStore<Backend>> {
    let backend = Backend::open(config)
        .await
        .with_context(|| format!("failed to open the {} backend", config.backend.as_str()))?;
    Ok(RentalStore::new(backend))
}

pub async fn stats<S: DocumentStore>(store: &RentalStore<S>) -> Result<CollectionCounts> {
    store
        .backend()
        .counts()
        .await
        .context("failed to count records")
}

/// Copy a file-mode store into the configured SQLite database.
pub async fn import_json(config: &StoreConfig, from: Option<PathBuf>) -> Result<ImportReport> {
    let source = JsonFileStore::new(from.unwrap_or_else(|| config.json_path()));
    if !source.path().exists() {
        bail!("no JSON store found at {}", source.path().display());
    }

    let db = Database::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    import_json_store(db.pool(), &source)
        .await
        .with_context(|| format!("failed to import {}", source.path().display()))
}

/// Result of `rentease check`.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub counts: CollectionCounts,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Look for references nothing enforces: owners, tenants and properties
/// that no longer exist, and tenants with more than one active stay.
pub async fn check(store: &RentalStore<Backend>) -> Result<CheckReport> {
    let mut report = CheckReport::default();

    if let Backend::File(file) = store.backend() {
        match file.read_strict().await {
            Ok(schema) => {
                for (collection, records) in &schema.unrecognized.records {
                    report.problems.push(format!(
                        "{} record(s) in {collection} do not match the record layout",
                        records.len()
                    ));
                }
            }
            Err(e) => {
                report
                    .problems
                    .push(format!("store file {} is unreadable: {e}", file.path().display()));
                return Ok(report);
            }
        }
    }
    report.counts = stats(store).await?;

    let backend = store.backend();
    let users: HashSet<String> = backend
        .list::<User>()
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();
    let properties: Vec<Property> = backend.list().await?;
    let stays: Vec<TenantStay> = backend.list().await?;
    let bills: Vec<Bill> = backend.list().await?;

    for property in &properties {
        if !users.contains(&property.landlord_id) {
            report.problems.push(format!(
                "property {} belongs to missing landlord {}",
                property.id, property.landlord_id
            ));
        }
    }

    let property_ids: HashSet<&str> = properties.iter().map(|p| p.id.as_str()).collect();
    let mut active_per_tenant: HashMap<&str, usize> = HashMap::new();
    for stay in stays.iter().filter(|s| s.status == StayStatus::Active) {
        *active_per_tenant.entry(stay.tenant_id.as_str()).or_default() += 1;
        if !users.contains(&stay.tenant_id) {
            report.problems.push(format!(
                "active stay {} refers to missing tenant {}",
                stay.id, stay.tenant_id
            ));
        }
        if !property_ids.contains(stay.property_id.as_str()) {
            report.problems.push(format!(
                "active stay {} refers to missing property {}",
                stay.id, stay.property_id
            ));
        }
    }
    let mut duplicated: Vec<_> = active_per_tenant
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .collect();
    duplicated.sort();
    for (tenant_id, n) in duplicated {
        report
            .problems
            .push(format!("tenant {tenant_id} has {n} active stays"));
    }

    let stay_ids: HashSet<&str> = stays.iter().map(|s| s.id.as_str()).collect();
    for bill in &bills {
        if !stay_ids.contains(bill.stay_id.as_str()) {
            report
                .problems
                .push(format!("bill {} refers to missing stay {}", bill.id, bill.stay_id));
        }
    }

    info!(problems = report.problems.len(), "Store check finished");
    Ok(report)
}

pub async fn users<S: DocumentStore>(
    store: &RentalStore<S>,
    role: Option<Role>,
) -> Result<Vec<User>> {
    let users = store.get_users().await.context("failed to list users")?;
    Ok(users
        .into_iter()
        .filter(|u| role.map_or(true, |r| u.role == r))
        .collect())
}

pub async fn tenants<S: DocumentStore>(
    store: &RentalStore<S>,
    landlord_id: &str,
) -> Result<Vec<LandlordTenant>> {
    store
        .get_landlord_tenants(landlord_id)
        .await
        .with_context(|| format!("failed to list tenants of {landlord_id}"))
}
