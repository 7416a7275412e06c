use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PropertyType {
    #[default]
    Apartment,
    House,
    Shop,
    Other,
}

/// A building or unit group owned by one landlord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub landlord_id: String,
    pub name: String,
    pub address: String,
    pub units: u32,
    pub occupied_units: u32,
    pub monthly_rent: f64,
    #[serde(rename = "type", default)]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Property {
    /// Units not currently let. Never negative, even if the occupied count
    /// was entered higher than the unit count.
    pub fn vacant_units(&self) -> u32 {
        self.units.saturating_sub(self.occupied_units)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub units: Option<u32>,
    pub occupied_units: Option<u32>,
    pub monthly_rent: Option<f64>,
    pub kind: Option<PropertyType>,
}

impl PropertyPatch {
    pub fn apply(&self, property: &mut Property) {
        if let Some(name) = &self.name {
            property.name = name.clone();
        }
        if let Some(address) = &self.address {
            property.address = address.clone();
        }
        if let Some(units) = self.units {
            property.units = units;
        }
        if let Some(occupied) = self.occupied_units {
            property.occupied_units = occupied;
        }
        if let Some(rent) = self.monthly_rent {
            property.monthly_rent = rent;
        }
        if let Some(kind) = self.kind {
            property.kind = kind;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacant_units_saturates() {
        let mut property = Property {
            id: "p1".into(),
            landlord_id: "u1".into(),
            name: "Lake View".into(),
            address: "12 Lake Rd".into(),
            units: 10,
            occupied_units: 3,
            monthly_rent: 12000.0,
            kind: PropertyType::Apartment,
            created_at: None,
        };
        assert_eq!(property.vacant_units(), 7);
        property.occupied_units = 12;
        assert_eq!(property.vacant_units(), 0);
    }

    #[test]
    fn kind_is_stored_under_type_key() {
        let json = serde_json::json!({
            "id": "p1",
            "landlordId": "u1",
            "name": "Corner",
            "address": "1 Main St",
            "units": 1,
            "occupiedUnits": 0,
            "monthlyRent": 5000,
            "type": "Shop"
        });
        let property: Property = serde_json::from_value(json).unwrap();
        assert_eq!(property.kind, PropertyType::Shop);
        assert!(property.created_at.is_none());
    }
}
