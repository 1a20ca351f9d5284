//! User and time record types as they travel over the wire.

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

/// Authorization role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Support,
    /// Owner account; never shown or editable from this console
    Master,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "employee" => Some(Self::Employee),
            "support" => Some(Self::Support),
            "master" => Some(Self::Master),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Support => "support",
            Self::Master => "master",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account record.
/// Missing or `null` fields decode to their defaults.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nif: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hourly_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_provisional_password: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "timestamp")]
    pub first_access_date: Option<DateTime<Utc>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Either an RFC 3339 string or epoch milliseconds
#[derive(Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Millis(i64),
    Text(DateTime<Utc>),
}

fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Timestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Timestamp::Text(date)) => Ok(Some(date)),
        Some(Timestamp::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("timestamp {} is out of range", ms))),
    }
}

impl User {
    /// Anything but a master account
    pub fn is_manageable(&self) -> bool {
        self.role != Role::Master
    }
}

/// Time-tracking entries are carried verbatim into backups and never inspected.
pub type TimeRecord = serde_json::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::from_str("Support"), Some(Role::Support));
        assert_eq!(Role::from_str("master"), Some(Role::Master));
        assert!(Role::from_str("admin").is_none());
    }

    #[test]
    fn test_partial_record_uses_defaults() {
        let user: User = serde_json::from_value(json!({
            "id": "U1",
            "name": "Ana",
            "role": "employee",
            "isActive": true
        }))
        .unwrap();
        assert_eq!(user.id, "U1");
        assert!(user.is_active);
        assert_eq!(user.hourly_rate, 0.0);
        assert!(user.nif.is_none());
        assert!(user.first_access_date.is_none());
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let user = User {
            id: "U2".to_string(),
            hourly_rate: 10.0,
            is_provisional_password: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["hourlyRate"], json!(10.0));
        assert_eq!(value["isProvisionalPassword"], json!(true));
        assert_eq!(value["role"], json!("employee"));
        assert!(value.get("password").is_none());
    }

    #[test]
    fn test_first_access_date_parses_rfc3339() {
        let user: User = serde_json::from_value(json!({
            "id": "U3",
            "firstAccessDate": "2025-03-01T09:30:00Z"
        }))
        .unwrap();
        assert_eq!(
            user.first_access_date.unwrap().to_rfc3339(),
            "2025-03-01T09:30:00+00:00"
        );
    }

    #[test]
    fn test_null_fields_decode_to_defaults() {
        let user: User = serde_json::from_value(json!({
            "id": "U4",
            "name": null,
            "username": null,
            "email": null,
            "phone": null,
            "nif": null,
            "role": null,
            "hourlyRate": null,
            "currency": null,
            "country": null,
            "isActive": null,
            "firstAccessDate": null
        }))
        .unwrap();
        assert_eq!(user.id, "U4");
        assert_eq!(user.phone, "");
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.hourly_rate, 0.0);
        assert!(!user.is_active);
        assert!(user.nif.is_none());
        assert!(user.first_access_date.is_none());
    }

    #[test]
    fn test_first_access_date_accepts_epoch_millis() {
        let user: User = serde_json::from_value(json!({
            "id": "U5",
            "firstAccessDate": 1735689600000_i64
        }))
        .unwrap();
        assert_eq!(
            user.first_access_date.unwrap().to_rfc3339(),
            "2025-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_first_access_date_rejects_garbage() {
        let result: Result<User, _> = serde_json::from_value(json!({
            "id": "U6",
            "firstAccessDate": "last tuesday"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_master_is_not_manageable() {
        let mut user = User::default();
        assert!(user.is_manageable());
        user.role = Role::Master;
        assert!(!user.is_manageable());
    }
}
