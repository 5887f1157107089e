//! Pharmacy directory records and lenient payload parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Volume (monthly prescriptions) from which a pharmacy counts as high-volume.
pub const HIGH_VOLUME_THRESHOLD: u32 = 1000;

/// A pharmacy as known to the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerRecord {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub location: String,
    pub rx_volume: u32,
    pub contact_person: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CallerRecord {
    /// Build a record from one element of the directory's JSON list.
    ///
    /// Never fails: the upstream service is loosely typed, so every field
    /// falls back to a default instead of rejecting the record.
    pub fn from_json(value: &Value) -> Self {
        let rx_volume = match value.get("rx_volume") {
            None | Some(Value::Null) => 0,
            Some(raw) => parse_volume(raw).unwrap_or_else(|| {
                warn!(id = %json_string(value.get("id")), rx_volume = %raw, "Unparseable rx_volume, defaulting to 0");
                0
            }),
        };

        Self {
            id: json_string(value.get("id")),
            name: json_string(value.get("name")),
            phone: json_string(value.get("phone")),
            location: json_string(value.get("location")),
            rx_volume,
            contact_person: json_string(value.get("contact_person")),
            email: json_opt_string(value.get("email")),
            notes: json_opt_string(value.get("notes")),
        }
    }

    /// Whether the phone on file matches `phone` once both are normalized.
    pub fn matches_phone(&self, phone: &str) -> bool {
        let wanted = normalize_phone(phone);
        !wanted.is_empty() && normalize_phone(&self.phone) == wanted
    }

    pub fn is_high_volume(&self) -> bool {
        self.rx_volume >= HIGH_VOLUME_THRESHOLD
    }
}

/// Payload for creating a pharmacy in the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPharmacy {
    pub name: String,
    pub phone: String,
    pub location: String,
    pub rx_volume: u32,
    pub contact_person: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Strip everything but ASCII digits. Idempotent.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Coerce a JSON value to a prescription volume. Accepts non-negative
/// integers, integral floats and digit strings.
pub fn parse_volume(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                u32::try_from(v).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u32)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
                trimmed.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn json_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn json_opt_string(value: Option<&Value>) -> Option<String> {
    Some(json_string(value)).filter(|s| !s.is_empty())
}
