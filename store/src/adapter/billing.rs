use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::RentalStore;
use crate::models::{Bill, BillStatus, HistoryKind, StoredDocument, TenantHistory};
use crate::persistence::{DocumentStore, Filter, PersistenceError};

impl<S: DocumentStore> RentalStore<S> {
    pub async fn add_bill(&self, bill: Bill) -> Result<Bill, PersistenceError> {
        self.store.insert(&bill).await?;
        debug!(id = %bill.id, stay_id = %bill.stay_id, "Added bill");
        Ok(bill)
    }

    pub async fn find_bill_by_id(&self, id: &str) -> Result<Option<Bill>, PersistenceError> {
        self.store.get(id).await
    }

    pub async fn get_bills_by_landlord(&self, landlord_id: &str) -> Result<Vec<Bill>, PersistenceError> {
        self.store
            .find(&Filter::eq("landlordId", landlord_id))
            .await
    }

    pub async fn get_bills_by_tenant(&self, tenant_id: &str) -> Result<Vec<Bill>, PersistenceError> {
        self.store.find(&Filter::eq("tenantId", tenant_id)).await
    }

    /// Mark a bill paid and record the payment in the tenant's history.
    ///
    /// The two writes are separate: if the second fails the bill stays paid
    /// without a ledger entry. Paying an already paid bill returns it
    /// unchanged and records nothing.
    pub async fn pay_bill(&self, id: &str) -> Result<Option<Bill>, PersistenceError> {
        let mut newly_paid = false;
        let bill = self
            .store
            .update(id, |bill: &mut Bill| {
                newly_paid = bill.status != BillStatus::Paid;
                if newly_paid {
                    bill.status = BillStatus::Paid;
                    bill.paid_at = Some(Utc::now());
                }
                newly_paid
            })
            .await?;

        let Some(bill) = bill else {
            return Ok(None);
        };
        if !newly_paid {
            debug!(id, "Bill already paid");
            return Ok(Some(bill));
        }

        self.add_history(TenantHistory {
            id: Uuid::new_v4().to_string(),
            tenant_id: bill.tenant_id.clone(),
            kind: HistoryKind::Payment,
            description: format!("Paid {} bill", bill.kind.as_str()),
            amount: Some(bill.amount),
            month: None,
            year: None,
            units: None,
            status: None,
            date: Utc::now(),
            created_by: bill.tenant_id.clone(),
        })
        .await?;

        info!(id, tenant_id = %bill.tenant_id, amount = bill.amount, "Bill paid");
        Ok(Some(bill))
    }

    pub async fn delete_bill(&self, id: &str) -> Result<bool, PersistenceError> {
        let removed = self.store.remove::<Bill>(id).await?;
        debug!(id, removed, "Deleted bill");
        Ok(removed)
    }

    pub async fn add_document(
        &self,
        document: StoredDocument,
    ) -> Result<StoredDocument, PersistenceError> {
        self.store.insert(&document).await?;
        debug!(id = %document.id, tenant_id = %document.tenant_id, "Added document");
        Ok(document)
    }

    pub async fn get_documents_by_landlord(
        &self,
        landlord_id: &str,
    ) -> Result<Vec<StoredDocument>, PersistenceError> {
        self.store
            .find(&Filter::eq("landlordId", landlord_id))
            .await
    }

    pub async fn get_documents_by_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<StoredDocument>, PersistenceError> {
        self.store.find(&Filter::eq("tenantId", tenant_id)).await
    }
}
