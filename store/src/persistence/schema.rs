use serde::de::Error as _;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::models::{
    Bill, Message, Notification, Property, Review, StoredDocument, TenantHistory, TenantStay,
    User, VerificationRequest,
};

/// Named top-level collections of the store. The string form is the JSON key
/// in file mode and the `collection` column in database mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Users,
    Properties,
    VerificationRequests,
    TenantStays,
    History,
    Notifications,
    Bills,
    Documents,
    Messages,
    Reviews,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::Users,
        Collection::Properties,
        Collection::VerificationRequests,
        Collection::TenantStays,
        Collection::History,
        Collection::Notifications,
        Collection::Bills,
        Collection::Documents,
        Collection::Messages,
        Collection::Reviews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Properties => "properties",
            Collection::VerificationRequests => "verificationRequests",
            Collection::TenantStays => "tenantStays",
            Collection::History => "history",
            Collection::Notifications => "notifications",
            Collection::Bills => "bills",
            Collection::Documents => "documents",
            Collection::Messages => "messages",
            Collection::Reviews => "reviews",
        }
    }

    /// The collection stored under a top-level file key.
    pub fn from_key(key: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record count per collection.
pub type CollectionCounts = BTreeMap<Collection, u64>;

/// The whole store as one value: what file mode reads and writes in a
/// single piece.
///
/// Decode with [`StoreSchema::from_value`] and encode with
/// [`StoreSchema::to_value`]. The derived `Serialize` alone drops
/// [`unrecognized`](Self::unrecognized).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSchema {
    pub users: Vec<User>,
    pub properties: Vec<Property>,
    pub verification_requests: Vec<VerificationRequest>,
    pub tenant_stays: Vec<TenantStay>,
    pub history: Vec<TenantHistory>,
    pub notifications: Vec<Notification>,
    pub bills: Vec<Bill>,
    pub documents: Vec<StoredDocument>,
    pub messages: Vec<Message>,
    pub reviews: Vec<Review>,
    /// Whatever the file held that none of the collections above can
    /// represent. Kept so a rewrite of the file does not lose it.
    #[serde(skip)]
    pub unrecognized: Unrecognized,
}

/// Parts of a store file outside the typed collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unrecognized {
    /// Records that sit in a known collection but do not decode as its type.
    pub records: BTreeMap<Collection, Vec<Value>>,
    /// Top-level keys that are not collection names.
    pub keys: Map<String, Value>,
}

impl Unrecognized {
    pub fn record_count(&self) -> u64 {
        self.records.values().map(|r| r.len() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.keys.is_empty()
    }
}

impl StoreSchema {
    pub fn counts(&self) -> CollectionCounts {
        let mut counts = CollectionCounts::new();
        counts.insert(Collection::Users, self.users.len() as u64);
        counts.insert(Collection::Properties, self.properties.len() as u64);
        counts.insert(
            Collection::VerificationRequests,
            self.verification_requests.len() as u64,
        );
        counts.insert(Collection::TenantStays, self.tenant_stays.len() as u64);
        counts.insert(Collection::History, self.history.len() as u64);
        counts.insert(Collection::Notifications, self.notifications.len() as u64);
        counts.insert(Collection::Bills, self.bills.len() as u64);
        counts.insert(Collection::Documents, self.documents.len() as u64);
        counts.insert(Collection::Messages, self.messages.len() as u64);
        counts.insert(Collection::Reviews, self.reviews.len() as u64);
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.counts().values().all(|n| *n == 0)
    }

    /// Decode a parsed store file one record at a time. Missing collections
    /// are empty. A record that does not fit its collection's type is kept
    /// aside in [`unrecognized`](Self::unrecognized) instead of failing the
    /// whole file. Errors only when the file is not an object or a
    /// collection is not an array.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(map) = value else {
            return Err(serde_json::Error::custom("store file is not a JSON object"));
        };

        let mut schema = StoreSchema::default();
        for (key, value) in map {
            let Some(collection) = Collection::from_key(&key) else {
                schema.unrecognized.keys.insert(key, value);
                continue;
            };
            let records = match value {
                Value::Array(records) => records,
                Value::Null => continue,
                _ => {
                    return Err(serde_json::Error::custom(format!(
                        "collection {collection} is not an array"
                    )))
                }
            };
            match collection {
                Collection::Users => schema.decode_into::<User>(records),
                Collection::Properties => schema.decode_into::<Property>(records),
                Collection::VerificationRequests => {
                    schema.decode_into::<VerificationRequest>(records)
                }
                Collection::TenantStays => schema.decode_into::<TenantStay>(records),
                Collection::History => schema.decode_into::<TenantHistory>(records),
                Collection::Notifications => schema.decode_into::<Notification>(records),
                Collection::Bills => schema.decode_into::<Bill>(records),
                Collection::Documents => schema.decode_into::<StoredDocument>(records),
                Collection::Messages => schema.decode_into::<Message>(records),
                Collection::Reviews => schema.decode_into::<Review>(records),
            }
        }
        Ok(schema)
    }

    fn decode_into<T: Document>(&mut self, records: Vec<Value>) {
        for record in records {
            match T::deserialize(&record) {
                Ok(doc) => T::items_mut(self).push(doc),
                Err(e) => {
                    warn!(
                        collection = %T::COLLECTION,
                        id = record.get("id").and_then(serde_json::Value::as_str).unwrap_or("?"),
                        error = %e,
                        "Keeping record that does not match its collection's layout"
                    );
                    self.unrecognized
                        .records
                        .entry(T::COLLECTION)
                        .or_default()
                        .push(record);
                }
            }
        }
    }

    /// Encode for writing, with unrecognized records appended after the
    /// typed ones of their collection and unknown keys restored.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let Value::Object(mut map) = serde_json::to_value(self)? else {
            return Err(serde_json::Error::custom("store schema did not encode as an object"));
        };
        for (collection, records) in &self.unrecognized.records {
            if let Some(Value::Array(items)) = map.get_mut(collection.as_str()) {
                items.extend(records.iter().cloned());
            }
        }
        for (key, value) in &self.unrecognized.keys {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(Value::Object(map))
    }
}

/// A record type that lives in one collection of the store.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// This type's collection inside a file-mode schema.
    fn items(schema: &StoreSchema) -> &Vec<Self>;
    fn items_mut(schema: &mut StoreSchema) -> &mut Vec<Self>;
}

macro_rules! impl_document {
    ($ty:ty, $collection:ident, $field:ident) => {
        impl Document for $ty {
            const COLLECTION: Collection = Collection::$collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn items(schema: &StoreSchema) -> &Vec<Self> {
                &schema.$field
            }

            fn items_mut(schema: &mut StoreSchema) -> &mut Vec<Self> {
                &mut schema.$field
            }
        }
    };
}

impl_document!(User, Users, users);
impl_document!(Property, Properties, properties);
impl_document!(VerificationRequest, VerificationRequests, verification_requests);
impl_document!(TenantStay, TenantStays, tenant_stays);
impl_document!(TenantHistory, History, history);
impl_document!(Notification, Notifications, notifications);
impl_document!(Bill, Bills, bills);
impl_document!(StoredDocument, Documents, documents);
impl_document!(Message, Messages, messages);
impl_document!(Review, Reviews, reviews);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use serde_json::json;

    #[test]
    fn missing_collections_default_to_empty() {
        let schema = StoreSchema::from_value(json!({"users": []})).unwrap();
        assert!(schema.is_empty());
        assert!(schema.unrecognized.is_empty());
        assert_eq!(schema.counts().len(), Collection::ALL.len());
    }

    #[test]
    fn mismatched_records_are_kept_aside() {
        let user = User::new("u1", "A", "a@x.io", "h", Role::Landlord);
        let foreign = json!({
            "id": "r-legacy",
            "userId": "u1",
            "name": "A",
            "rating": 5,
            "comment": "Great",
            "date": "2024-01-01",
            "verified": true
        });
        let schema = StoreSchema::from_value(json!({
            "users": [serde_json::to_value(&user).unwrap()],
            "reviews": [foreign.clone()],
            "settings": {"theme": "dark"}
        }))
        .unwrap();

        assert_eq!(schema.users, vec![user]);
        assert!(schema.reviews.is_empty());
        assert_eq!(schema.unrecognized.record_count(), 1);

        let written = schema.to_value().unwrap();
        assert_eq!(written["reviews"], json!([foreign]));
        assert_eq!(written["settings"], json!({"theme": "dark"}));
        assert_eq!(written["users"][0]["id"], "u1");
    }

    #[test]
    fn non_object_or_non_array_collection_is_an_error() {
        assert!(StoreSchema::from_value(json!([1, 2])).is_err());
        assert!(StoreSchema::from_value(json!({"users": {"u1": {}}})).is_err());
    }

    #[test]
    fn top_level_keys_match_collection_names() {
        let json = serde_json::to_value(StoreSchema::default()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for collection in Collection::ALL {
            assert!(keys.contains(&collection.as_str()), "missing {collection}");
        }
    }

    #[test]
    fn items_mut_reaches_the_right_collection() {
        let mut schema = StoreSchema::default();
        User::items_mut(&mut schema).push(User::new("u1", "A", "a@x.io", "h", Role::Tenant));
        assert_eq!(schema.users.len(), 1);
        assert_eq!(User::items(&schema)[0].id(), "u1");
        assert_eq!(<User as Document>::COLLECTION, Collection::Users);
    }
}
