//! Lead information collected from unrecognized callers.

use serde::{Deserialize, Serialize};

/// One slot of lead information, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    PharmacyName,
    Location,
    RxVolume,
    ContactPerson,
    Email,
}

impl LeadField {
    /// Order in which the agent asks for fields.
    pub const ORDER: [LeadField; 5] = [
        Self::PharmacyName,
        Self::Location,
        Self::RxVolume,
        Self::ContactPerson,
        Self::Email,
    ];

    /// JSON key used in extraction replies and summaries.
    pub fn key(&self) -> &'static str {
        match self {
            Self::PharmacyName => "pharmacy_name",
            Self::Location => "location",
            Self::RxVolume => "rx_volume",
            Self::ContactPerson => "contact_person",
            Self::Email => "email",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PharmacyName => "pharmacy name",
            Self::Location => "location",
            Self::RxVolume => "prescription volume",
            Self::ContactPerson => "contact person",
            Self::Email => "email address",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::PharmacyName => 0,
            Self::Location => 1,
            Self::RxVolume => 2,
            Self::ContactPerson => 3,
            Self::Email => 4,
        }
    }
}

impl std::fmt::Display for LeadField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A validated value for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Volume(u32),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Volume(v) => write!(f, "{v}"),
        }
    }
}

/// Lead fields gathered so far. Slots are only ever filled, never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pharmacy_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CollectedInfo {
    /// Store `value` in `field`. Returns false, leaving the slot untouched,
    /// when the value has the wrong shape or is blank or zero.
    pub fn set(&mut self, field: LeadField, value: FieldValue) -> bool {
        match (field, value) {
            (LeadField::RxVolume, FieldValue::Volume(v)) if v > 0 => {
                self.rx_volume = Some(v);
                true
            }
            (LeadField::RxVolume, _) => false,
            (_, FieldValue::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return false;
                }
                let slot = match field {
                    LeadField::PharmacyName => &mut self.pharmacy_name,
                    LeadField::Location => &mut self.location,
                    LeadField::ContactPerson => &mut self.contact_person,
                    LeadField::Email => &mut self.email,
                    LeadField::RxVolume => return false,
                };
                *slot = Some(text.to_string());
                true
            }
            (_, FieldValue::Volume(_)) => false,
        }
    }

    pub fn get(&self, field: LeadField) -> Option<FieldValue> {
        match field {
            LeadField::PharmacyName => self.pharmacy_name.clone().map(FieldValue::Text),
            LeadField::Location => self.location.clone().map(FieldValue::Text),
            LeadField::RxVolume => self.rx_volume.map(FieldValue::Volume),
            LeadField::ContactPerson => self.contact_person.clone().map(FieldValue::Text),
            LeadField::Email => self.email.clone().map(FieldValue::Text),
        }
    }

    pub fn has(&self, field: LeadField) -> bool {
        self.get(field).is_some()
    }

    /// First field in collection order that is still empty.
    pub fn next_missing(&self) -> Option<LeadField> {
        LeadField::ORDER.into_iter().find(|f| !self.has(*f))
    }

    pub fn missing(&self) -> Vec<LeadField> {
        LeadField::ORDER.into_iter().filter(|f| !self.has(*f)).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.next_missing().is_none()
    }

    /// Collected volume, or 0 when not yet known.
    pub fn volume(&self) -> u32 {
        self.rx_volume.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_matches_index() {
        for (i, field) in LeadField::ORDER.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn display_matches_serde() {
        for field in LeadField::ORDER {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(format!("\"{field}\""), json);
        }
    }

    #[test]
    fn set_rejects_wrong_shapes() {
        let mut info = CollectedInfo::default();
        assert!(!info.set(LeadField::RxVolume, FieldValue::Text("500".into())));
        assert!(!info.set(LeadField::RxVolume, FieldValue::Volume(0)));
        assert!(!info.set(LeadField::Location, FieldValue::Volume(3)));
        assert!(!info.set(LeadField::PharmacyName, FieldValue::Text("   ".into())));
        assert_eq!(info, CollectedInfo::default());
    }

    #[test]
    fn set_trims_text() {
        let mut info = CollectedInfo::default();
        assert!(info.set(LeadField::PharmacyName, FieldValue::Text("  Acme Pharmacy ".into())));
        assert_eq!(info.pharmacy_name.as_deref(), Some("Acme Pharmacy"));
    }

    #[test]
    fn completeness_tracks_next_missing() {
        let mut info = CollectedInfo::default();
        assert_eq!(info.next_missing(), Some(LeadField::PharmacyName));

        info.set(LeadField::PharmacyName, FieldValue::Text("Acme".into()));
        info.set(LeadField::RxVolume, FieldValue::Volume(800));
        assert_eq!(info.next_missing(), Some(LeadField::Location));
        assert_eq!(
            info.missing(),
            vec![LeadField::Location, LeadField::ContactPerson, LeadField::Email]
        );

        info.set(LeadField::Location, FieldValue::Text("Orlando".into()));
        info.set(LeadField::ContactPerson, FieldValue::Text("Sam".into()));
        assert!(!info.is_complete());
        info.set(LeadField::Email, FieldValue::Text("sam@acme.com".into()));
        assert!(info.is_complete());
        assert_eq!(info.volume(), 800);
    }

    #[test]
    fn serializes_only_filled_slots() {
        let mut info = CollectedInfo::default();
        info.set(LeadField::RxVolume, FieldValue::Volume(1500));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json, serde_json::json!({"rx_volume": 1500}));
    }
}
