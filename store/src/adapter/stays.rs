use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use super::RentalStore;
use crate::models::{LandlordTenant, Property, StayStatus, TenantHistory, TenantStay, User};
use crate::persistence::{DocumentStore, Filter, PersistenceError};

const UNKNOWN: &str = "Unknown";

fn active_stay_of(tenant_id: &str) -> Filter {
    Filter::eq("tenantId", tenant_id).and("status", StayStatus::Active.as_str())
}

impl<S: DocumentStore> RentalStore<S> {
    /// Record a stay. An `Active` stay is refused with a conflict when the
    /// tenant already has one.
    pub async fn add_tenant_stay(&self, stay: TenantStay) -> Result<TenantStay, PersistenceError> {
        match stay.status {
            StayStatus::Active => {
                self.store
                    .insert_unless(&stay, &active_stay_of(&stay.tenant_id))
                    .await?
            }
            StayStatus::MovedOut => self.store.insert(&stay).await?,
        }
        debug!(id = %stay.id, tenant_id = %stay.tenant_id, "Added tenant stay");
        Ok(stay)
    }

    /// The tenant's active stay, if they currently live anywhere.
    pub async fn get_tenant_stay(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantStay>, PersistenceError> {
        Ok(self
            .store
            .find::<TenantStay>(&active_stay_of(tenant_id))
            .await?
            .into_iter()
            .next())
    }

    /// Close the tenant's active stay, stamping the move-out date.
    pub async fn end_tenant_stay(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantStay>, PersistenceError> {
        let ended = self
            .store
            .update_where(&active_stay_of(tenant_id), |stay: &mut TenantStay| {
                stay.status = StayStatus::MovedOut;
                stay.move_out_date = Some(Utc::now());
                true
            })
            .await?;
        debug!(tenant_id, ended = ended.len(), "Ended tenant stay");
        Ok(ended.into_iter().next())
    }

    /// The landlord's active stays, each with the tenant's name and the
    /// property's name and address. Missing users or properties show as
    /// "Unknown".
    pub async fn get_landlord_tenants(
        &self,
        landlord_id: &str,
    ) -> Result<Vec<LandlordTenant>, PersistenceError> {
        let stays = self
            .store
            .find::<TenantStay>(
                &Filter::eq("landlordId", landlord_id).and("status", StayStatus::Active.as_str()),
            )
            .await?;
        if stays.is_empty() {
            return Ok(Vec::new());
        }

        let users: HashMap<String, User> = self
            .store
            .list::<User>()
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let properties: HashMap<String, Property> = self
            .store
            .list::<Property>()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(stays
            .into_iter()
            .map(|stay| {
                let tenant_name = users
                    .get(&stay.tenant_id)
                    .map_or_else(|| UNKNOWN.to_string(), |u| u.name.clone());
                let property = properties.get(&stay.property_id);
                LandlordTenant {
                    tenant_name,
                    property_name: property.map_or_else(|| UNKNOWN.to_string(), |p| p.name.clone()),
                    property_address: property.map(|p| p.address.clone()),
                    stay,
                }
            })
            .collect())
    }

    pub async fn add_history(&self, entry: TenantHistory) -> Result<TenantHistory, PersistenceError> {
        self.store.insert(&entry).await?;
        debug!(id = %entry.id, tenant_id = %entry.tenant_id, "Added history entry");
        Ok(entry)
    }

    /// The tenant's ledger, newest first.
    pub async fn get_tenant_history(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<TenantHistory>, PersistenceError> {
        let mut entries = self
            .store
            .find::<TenantHistory>(&Filter::eq("tenantId", tenant_id))
            .await?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }
}
