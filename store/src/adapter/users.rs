use tracing::debug;

use super::RentalStore;
use crate::models::{LandlordSummary, Role, User, UserPatch};
use crate::persistence::{DocumentStore, Filter, PersistenceError};

impl<S: DocumentStore> RentalStore<S> {
    pub async fn get_users(&self) -> Result<Vec<User>, PersistenceError> {
        self.store.list().await
    }

    /// Register a user. Fails with a conflict if the id or the email is
    /// already taken.
    pub async fn add_user(&self, user: User) -> Result<User, PersistenceError> {
        self.store
            .insert_unless(&user, &Filter::eq("email", user.email.as_str()))
            .await?;
        debug!(id = %user.id, role = %user.role, "Added user");
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError> {
        Ok(self
            .store
            .find::<User>(&Filter::eq("email", email))
            .await?
            .into_iter()
            .next())
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, PersistenceError> {
        self.store.get(id).await
    }

    /// Every landlord's id and name. Password hashes never leave here.
    pub async fn get_landlords(&self) -> Result<Vec<LandlordSummary>, PersistenceError> {
        let landlords = self
            .store
            .find::<User>(&Filter::eq("role", Role::Landlord.as_str()))
            .await?;
        Ok(landlords
            .into_iter()
            .map(|u| LandlordSummary {
                id: u.id,
                name: u.name,
            })
            .collect())
    }

    /// Merge `patch` into the user. Moving to an email another user already
    /// holds fails with a conflict and changes nothing.
    pub async fn update_user(
        &self,
        id: &str,
        patch: UserPatch,
    ) -> Result<Option<User>, PersistenceError> {
        let apply = |user: &mut User| {
            patch.apply(user);
            true
        };
        let updated = match &patch.email {
            Some(email) => {
                self.store
                    .update_unless(id, &Filter::eq("email", email.as_str()), apply)
                    .await?
            }
            None => self.store.update(id, apply).await?,
        };
        debug!(id, found = updated.is_some(), "Updated user");
        Ok(updated)
    }
}
