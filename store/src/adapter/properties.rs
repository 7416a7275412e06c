use tracing::debug;

use super::RentalStore;
use crate::models::{Property, PropertyPatch};
use crate::persistence::{DocumentStore, Filter, PersistenceError};

impl<S: DocumentStore> RentalStore<S> {
    pub async fn add_property(&self, property: Property) -> Result<Property, PersistenceError> {
        self.store.insert(&property).await?;
        debug!(id = %property.id, landlord_id = %property.landlord_id, "Added property");
        Ok(property)
    }

    pub async fn find_property_by_id(&self, id: &str) -> Result<Option<Property>, PersistenceError> {
        self.store.get(id).await
    }

    /// Properties owned by one landlord.
    pub async fn get_properties(&self, landlord_id: &str) -> Result<Vec<Property>, PersistenceError> {
        self.store
            .find(&Filter::eq("landlordId", landlord_id))
            .await
    }

    pub async fn get_all_properties(&self) -> Result<Vec<Property>, PersistenceError> {
        self.store.list().await
    }

    pub async fn update_property(
        &self,
        id: &str,
        patch: PropertyPatch,
    ) -> Result<Option<Property>, PersistenceError> {
        self.store
            .update(id, |property: &mut Property| {
                patch.apply(property);
                true
            })
            .await
    }

    /// Delete a property. Stays, requests and bills that point at it are
    /// left in place.
    pub async fn delete_property(&self, id: &str) -> Result<bool, PersistenceError> {
        let removed = self.store.remove::<Property>(id).await?;
        debug!(id, removed, "Deleted property");
        Ok(removed)
    }
}
