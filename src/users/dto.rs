use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::error::ApiError;

/// Fields checked on create, in the order they are reported.
const REQUIRED_FIELDS: [&str; 3] = ["forename", "surname", "email"];

/// Trimmed string value, or `""` for anything that isn't a string.
pub fn safe_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Validated create payload. Only these fields ever reach the store on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub created: OffsetDateTime,
    pub email: String,
    pub forename: String,
    pub surname: String,
}

impl NewUser {
    pub fn from_body(body: &Map<String, Value>, created: OffsetDateTime) -> Result<Self, ApiError> {
        let [forename, surname, email] = REQUIRED_FIELDS.map(|field| safe_string(body.get(field)));

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .into_iter()
            .zip([&forename, &surname, &email])
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| field)
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::MissingFields(missing));
        }

        Ok(Self {
            created,
            email,
            forename,
            surname,
        })
    }
}

/// Name value supplied on PUT/PATCH. `None` for absent or falsy values.
pub fn truthy_name(body: &Map<String, Value>, field: &'static str) -> Result<Option<String>, ApiError> {
    match body.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some("true".into())),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(ApiError::Internal(format!(
            "string violation: {field} cannot be an array or an object"
        ))),
    }
}

#[derive(Debug, Default)]
pub struct NameChanges {
    pub forename: Option<String>,
    pub surname: Option<String>,
}

impl NameChanges {
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, ApiError> {
        Ok(Self {
            forename: truthy_name(body, "forename")?,
            surname: truthy_name(body, "surname")?,
        })
    }
}
