use std::collections::BTreeMap;

use tracing::debug;

use super::RentalStore;
use crate::models::{Message, Notification, NotificationPatch, Review};
use crate::persistence::{Collection, DocumentStore, Filter, PersistenceError};

fn unread_for(receiver_id: &str) -> Filter {
    Filter::eq("receiverId", receiver_id).and("isRead", false)
}

impl<S: DocumentStore> RentalStore<S> {
    // ── Notifications ───────────────────────────────────────────────────

    pub async fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, PersistenceError> {
        self.store.insert(&notification).await?;
        debug!(id = %notification.id, user_id = %notification.user_id, "Added notification");
        Ok(notification)
    }

    /// The user's notifications, newest first.
    pub async fn get_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, PersistenceError> {
        let mut notifications = self
            .store
            .find::<Notification>(&Filter::eq("userId", user_id))
            .await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn update_notification(
        &self,
        id: &str,
        patch: NotificationPatch,
    ) -> Result<Option<Notification>, PersistenceError> {
        self.store
            .update(id, |notification: &mut Notification| {
                patch.apply(notification);
                true
            })
            .await
    }

    /// Returns how many notifications were flipped to read.
    pub async fn mark_all_notifications_as_read(
        &self,
        user_id: &str,
    ) -> Result<usize, PersistenceError> {
        let changed = self
            .store
            .update_where(
                &Filter::eq("userId", user_id).and("isRead", false),
                |notification: &mut Notification| {
                    notification.is_read = true;
                    true
                },
            )
            .await?;
        debug!(user_id, count = changed.len(), "Marked notifications read");
        Ok(changed.len())
    }

    // ── Messages ────────────────────────────────────────────────────────

    pub async fn add_message(&self, message: Message) -> Result<Message, PersistenceError> {
        self.store.insert(&message).await?;
        debug!(id = %message.id, sender_id = %message.sender_id, "Added message");
        Ok(message)
    }

    /// The conversation between two users in either direction, oldest first.
    pub async fn get_messages(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Message>, PersistenceError> {
        let mut conversation = self
            .store
            .find::<Message>(&Filter::eq("senderId", user_a).and("receiverId", user_b))
            .await?;
        if user_a != user_b {
            conversation.extend(
                self.store
                    .find::<Message>(&Filter::eq("senderId", user_b).and("receiverId", user_a))
                    .await?,
            );
        }
        conversation.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(conversation)
    }

    /// Mark everything `sender_id` sent to `receiver_id` as read. Returns
    /// how many messages changed; nothing is written when none did.
    pub async fn mark_messages_as_read(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<usize, PersistenceError> {
        let changed = self
            .store
            .update_where(
                &unread_for(receiver_id).and("senderId", sender_id),
                |message: &mut Message| {
                    message.is_read = true;
                    true
                },
            )
            .await?;
        Ok(changed.len())
    }

    pub async fn get_unread_count(&self, user_id: &str) -> Result<usize, PersistenceError> {
        Ok(self.store.find::<Message>(&unread_for(user_id)).await?.len())
    }

    /// Unread messages addressed to `user_id`, counted per sender.
    pub async fn get_unread_counts_by_sender(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, usize>, PersistenceError> {
        let mut counts = BTreeMap::new();
        for message in self.store.find::<Message>(&unread_for(user_id)).await? {
            *counts.entry(message.sender_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    // ── Reviews ─────────────────────────────────────────────────────────

    /// Store a review. A reviewer gets one review per stay; a second is
    /// refused with a conflict.
    /// Store a review. Fails if the rating is out of range or the reviewer
    /// already reviewed this stay.
    pub async fn add_review(&self, review: Review) -> Result<Review, PersistenceError> {
        if !review.has_valid_rating() {
            return Err(PersistenceError::Invalid {
                collection: Collection::Reviews,
                reason: format!(
                    "rating {} is outside {}..={}",
                    review.rating,
                    Review::MIN_RATING,
                    Review::MAX_RATING
                ),
            });
        }
        let unique = Filter::eq("reviewerId", review.reviewer_id.as_str())
            .and("stayId", review.stay_id.as_str());
        self.store.insert_unless(&review, &unique).await?;
        debug!(id = %review.id, stay_id = %review.stay_id, "Added review");
        Ok(review)
    }

    pub async fn get_reviews(&self) -> Result<Vec<Review>, PersistenceError> {
        self.store.list().await
    }

    /// Reviews written about `reviewee_id`.
    pub async fn get_reviews_for_user(
        &self,
        reviewee_id: &str,
    ) -> Result<Vec<Review>, PersistenceError> {
        self.store
            .find(&Filter::eq("revieweeId", reviewee_id))
            .await
    }
}
