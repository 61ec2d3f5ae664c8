//! Employee records and their document representation.
//!
//! Stored field names follow the collection's existing schema:
//!
//! | Field | Type |
//! |---|---|
//! | `name`, `role`, `description` | string |
//! | `photoUrl` | data URL, http(s) URL or the placeholder URL |
//! | `order` | non-negative integer |
//! | `createdAt` | RFC 3339 string (others accepted on read, see [`normalize_timestamp`]) |

use crate::photo::PhotoRef;
use crate::store::{Document, Fields};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

pub const NAME_FIELD: &str = "name";
pub const ROLE_FIELD: &str = "role";
pub const DESCRIPTION_FIELD: &str = "description";
pub const PHOTO_FIELD: &str = "photoUrl";
pub const ORDER_FIELD: &str = "order";
pub const CREATED_AT_FIELD: &str = "createdAt";

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_ROLE_CHARS: usize = 2;
pub const DESCRIPTION_CHARS: std::ops::RangeInclusive<usize> = 10..=200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("name must have at least {min} characters")]
    NameTooShort { min: usize },
    #[error("role must have at least {min} characters")]
    RoleTooShort { min: usize },
    #[error("description has {len} characters; it must have between {min} and {max}")]
    DescriptionLength { len: usize, min: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub role: String,
    pub description: String,
    pub photo: PhotoRef,
    /// `None` when the stored document has no usable order.
    pub order: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Employee {
    /// Build an employee from a stored document. Missing text fields read as
    /// empty; a missing or broken photo reads as the placeholder.
    pub fn from_document(doc: &Document, placeholder: &str) -> Self {
        let text = |key: &str| {
            doc.fields
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            id: doc.id.clone(),
            name: text(NAME_FIELD),
            role: text(ROLE_FIELD),
            description: text(DESCRIPTION_FIELD),
            photo: PhotoRef::from_stored(
                doc.fields.get(PHOTO_FIELD).and_then(Value::as_str),
                placeholder,
            ),
            order: doc
                .fields
                .get(ORDER_FIELD)
                .and_then(Value::as_u64)
                .and_then(|o| u32::try_from(o).ok()),
            created_at: doc.fields.get(CREATED_AT_FIELD).and_then(normalize_timestamp),
        }
    }

    pub fn fields(&self) -> EmployeeFields {
        EmployeeFields {
            name: self.name.clone(),
            role: self.role.clone(),
            description: self.description.clone(),
            photo: self.photo.clone(),
        }
    }
}

/// The editable part of an employee.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmployeeFields {
    pub name: String,
    pub role: String,
    pub description: String,
    pub photo: PhotoRef,
}

impl EmployeeFields {
    /// Check the field rules against the values [`to_fields`](Self::to_fields)
    /// stores: every length is counted in characters after trimming, so
    /// padding can neither satisfy a minimum nor trip the description maximum.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            return Err(FieldError::NameTooShort {
                min: MIN_NAME_CHARS,
            });
        }
        if self.role.trim().chars().count() < MIN_ROLE_CHARS {
            return Err(FieldError::RoleTooShort {
                min: MIN_ROLE_CHARS,
            });
        }
        let len = self.description.trim().chars().count();
        if !DESCRIPTION_CHARS.contains(&len) {
            return Err(FieldError::DescriptionLength {
                len,
                min: *DESCRIPTION_CHARS.start(),
                max: *DESCRIPTION_CHARS.end(),
            });
        }
        Ok(())
    }

    /// Editable fields as a partial document. `order` and `createdAt` are
    /// never part of it.
    pub fn to_fields(&self, placeholder: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(NAME_FIELD.into(), Value::from(self.name.trim()));
        fields.insert(ROLE_FIELD.into(), Value::from(self.role.trim()));
        fields.insert(
            DESCRIPTION_FIELD.into(),
            Value::from(self.description.trim()),
        );
        fields.insert(
            PHOTO_FIELD.into(),
            Value::from(self.photo.to_stored(placeholder)),
        );
        fields
    }
}

/// Full document for a new employee.
pub fn new_document_fields(
    fields: &EmployeeFields,
    order: u32,
    created_at: DateTime<Utc>,
    placeholder: &str,
) -> Fields {
    let mut doc = fields.to_fields(placeholder);
    doc.insert(ORDER_FIELD.into(), Value::from(order));
    doc.insert(
        CREATED_AT_FIELD.into(),
        Value::from(created_at.to_rfc3339()),
    );
    doc
}

/// Read a creation timestamp in any of the shapes found in the collection:
///
/// - RFC 3339 text
/// - `{"seconds": i64, "nanoseconds": u32}` (also `_seconds`/`_nanoseconds`)
/// - integer epoch milliseconds
pub fn normalize_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLACEHOLDER: &str = "https://placehold.co/200x200.png";

    fn doc(id: &str, value: Value) -> Document {
        let Value::Object(fields) = value else {
            panic!("test document must be an object");
        };
        Document {
            id: id.into(),
            fields,
        }
    }

    fn valid() -> EmployeeFields {
        EmployeeFields {
            name: "Ana Souza".into(),
            role: "Consultora".into(),
            description: "Especialista em crédito consignado.".into(),
            photo: PhotoRef::Placeholder,
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn valid_fields_pass() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn short_name_rejected() {
        let f = EmployeeFields {
            name: " A ".into(),
            ..valid()
        };
        assert_eq!(f.validate(), Err(FieldError::NameTooShort { min: 2 }));
    }

    #[test]
    fn short_role_rejected() {
        let f = EmployeeFields {
            role: "x".into(),
            ..valid()
        };
        assert_eq!(f.validate(), Err(FieldError::RoleTooShort { min: 2 }));
    }

    #[test]
    fn description_bounds_are_inclusive() {
        let at = |n: usize| EmployeeFields {
            description: "é".repeat(n),
            ..valid()
        };
        assert!(at(10).validate().is_ok());
        assert!(at(200).validate().is_ok());
        assert_eq!(
            at(9).validate(),
            Err(FieldError::DescriptionLength {
                len: 9,
                min: 10,
                max: 200
            })
        );
        assert!(matches!(
            at(201).validate(),
            Err(FieldError::DescriptionLength { len: 201, .. })
        ));
    }

    #[test]
    fn description_length_counts_stored_text() {
        let padded = |text: String| EmployeeFields {
            description: format!("   {text}   "),
            ..valid()
        };
        // Ten raw characters, four once trimmed
        assert!(matches!(
            padded("curt".into()).validate(),
            Err(FieldError::DescriptionLength { len: 4, .. })
        ));
        assert!(padded("x".repeat(200)).validate().is_ok());
        assert_eq!(
            padded("x".repeat(200)).to_fields("")[DESCRIPTION_FIELD],
            Value::from("x".repeat(200))
        );
    }

    // =========================================================================
    // Document conversion
    // =========================================================================

    #[test]
    fn from_full_document() {
        let d = doc(
            "abc",
            json!({
                "name": "Ana",
                "role": "Gerente",
                "description": "Dez anos de mercado.",
                "photoUrl": "https://cdn.example.com/ana.jpg",
                "order": 3,
                "createdAt": "2024-05-01T12:00:00Z",
            }),
        );
        let e = Employee::from_document(&d, PLACEHOLDER);
        assert_eq!(e.id, "abc");
        assert_eq!(e.name, "Ana");
        assert_eq!(e.order, Some(3));
        assert!(matches!(e.photo, PhotoRef::External(_)));
        assert_eq!(
            e.created_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_fields_get_defaults() {
        let e = Employee::from_document(&doc("x", json!({"photoUrl": ""})), PLACEHOLDER);
        assert_eq!(e.name, "");
        assert_eq!(e.order, None);
        assert_eq!(e.created_at, None);
        assert_eq!(e.photo, PhotoRef::Placeholder);
    }

    #[test]
    fn negative_order_reads_as_missing() {
        let e = Employee::from_document(&doc("x", json!({"order": -1})), PLACEHOLDER);
        assert_eq!(e.order, None);
    }

    #[test]
    fn to_fields_never_touches_order_or_created_at() {
        let fields = valid().to_fields(PLACEHOLDER);
        assert!(!fields.contains_key(ORDER_FIELD));
        assert!(!fields.contains_key(CREATED_AT_FIELD));
        assert_eq!(fields[PHOTO_FIELD], json!(PLACEHOLDER));
    }

    #[test]
    fn new_document_has_order_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let fields = new_document_fields(&valid(), 4, now, PLACEHOLDER);
        assert_eq!(fields[ORDER_FIELD], json!(4));
        assert_eq!(
            normalize_timestamp(&fields[CREATED_AT_FIELD]),
            Some(now)
        );
    }

    #[test]
    fn round_trip_keeps_editable_fields() {
        let now = Utc::now();
        let d = Document {
            id: "id1".into(),
            fields: new_document_fields(&valid(), 0, now, PLACEHOLDER),
        };
        let e = Employee::from_document(&d, PLACEHOLDER);
        assert_eq!(e.fields(), valid());
    }

    // =========================================================================
    // Timestamps
    // =========================================================================

    #[test]
    fn timestamp_shapes_normalize_to_same_instant() {
        let expected = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
        assert_eq!(
            normalize_timestamp(&json!("2023-11-14T22:13:20.5Z")),
            Some(expected)
        );
        assert_eq!(
            normalize_timestamp(&json!({"seconds": 1_700_000_000i64, "nanoseconds": 500_000_000})),
            Some(expected)
        );
        assert_eq!(
            normalize_timestamp(&json!({"_seconds": 1_700_000_000i64, "_nanoseconds": 500_000_000})),
            Some(expected)
        );
        assert_eq!(
            normalize_timestamp(&json!(1_700_000_000_500i64)),
            Some(expected)
        );
    }

    #[test]
    fn offset_timestamp_converted_to_utc() {
        let ts = normalize_timestamp(&json!("2024-01-01T09:00:00-03:00")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn garbage_timestamp_is_none() {
        assert_eq!(normalize_timestamp(&json!("yesterday")), None);
        assert_eq!(normalize_timestamp(&json!(true)), None);
        assert_eq!(normalize_timestamp(&json!({"nanoseconds": 1})), None);
    }
}
