use chrono::Utc;
use tracing::{debug, warn};

use super::RentalStore;
use crate::models::{RequestExtras, RequestPatch, RequestStatus, VerificationRequest};
use crate::persistence::{DocumentStore, Filter, PersistenceError};

impl<S: DocumentStore> RentalStore<S> {
    pub async fn get_requests(&self) -> Result<Vec<VerificationRequest>, PersistenceError> {
        self.store.list().await
    }

    pub async fn add_request(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationRequest, PersistenceError> {
        self.store.insert(&request).await?;
        debug!(id = %request.id, tenant_id = %request.tenant_id, "Added verification request");
        Ok(request)
    }

    pub async fn find_request_by_id(
        &self,
        id: &str,
    ) -> Result<Option<VerificationRequest>, PersistenceError> {
        self.store.get(id).await
    }

    /// The tenant's most recently submitted request. Equal submission times
    /// resolve to the one stored last.
    pub async fn find_request_by_tenant_id(
        &self,
        tenant_id: &str,
    ) -> Result<Option<VerificationRequest>, PersistenceError> {
        let requests = self
            .store
            .find::<VerificationRequest>(&Filter::eq("tenantId", tenant_id))
            .await?;
        Ok(requests.into_iter().max_by(|a, b| a.submitted_at.cmp(&b.submitted_at)))
    }

    pub async fn get_requests_by_landlord(
        &self,
        landlord_id: &str,
    ) -> Result<Vec<VerificationRequest>, PersistenceError> {
        self.store
            .find(&Filter::eq("landlordId", landlord_id))
            .await
    }

    /// Merge `patch` into the request. Status is not patchable; use
    /// [`update_request_status`](Self::update_request_status).
    /// Merge `patch` into the request. Only the patched fields change;
    /// `updated_at` is left for [`update_request_status`](Self::update_request_status).
    pub async fn update_request(
        &self,
        id: &str,
        patch: RequestPatch,
    ) -> Result<Option<VerificationRequest>, PersistenceError> {
        self.store
            .update(id, |req: &mut VerificationRequest| {
                patch.apply(req);
                true
            })
            .await
    }

    /// Move a request through its lifecycle.
    ///
    /// Stamps `updated_at` every time and `verified_at` on the first
    /// approval only. Moves the status machine does not allow fail with
    /// [`PersistenceError::InvalidTransition`] and leave the record as it was.
    pub async fn update_request_status(
        &self,
        id: &str,
        status: RequestStatus,
        remarks: Option<String>,
        extras: RequestExtras,
    ) -> Result<Option<VerificationRequest>, PersistenceError> {
        let mut refused = None;
        let updated = self
            .store
            .update(id, |req: &mut VerificationRequest| {
                refused = None;
                if !req.status.can_transition_to(status) {
                    refused = Some(req.status);
                    return false;
                }

                let now = Utc::now();
                req.status = status;
                if let Some(remarks) = &remarks {
                    req.remarks = Some(remarks.clone());
                }
                extras.apply(req);
                req.updated_at = Some(now);
                if status == RequestStatus::Approved && req.verified_at.is_none() {
                    req.verified_at = Some(now);
                }
                true
            })
            .await?;

        if let Some(from) = refused {
            warn!(id, %from, to = %status, "Refused request status change");
            return Err(PersistenceError::InvalidTransition {
                id: id.to_string(),
                from,
                to: status,
            });
        }
        debug!(id, %status, found = updated.is_some(), "Updated request status");
        Ok(updated)
    }
}
