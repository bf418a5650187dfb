//! Schema boundary between raw backend JSON and typed entities.
//!
//! Every response body passes through [`parse`] or [`parse_many`] before a
//! store sees it. Shape mismatches and rule violations become an
//! `ApiError` of kind `Decode`, with `errors` mapping field paths to
//! messages:
//!
//! ```json
//! { "email": ["email must be valid"], "[1].team_members[0].user": ["reference id must not be empty"] }
//! ```

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use validator::Validate;

use atrium_core::ApiError;

#[derive(Default)]
pub struct SchemaErrors {
    map: Map<String, Value>,
}

impl SchemaErrors {
    pub fn push_schema(&mut self, msg: impl Into<String>) {
        Self::push_to(&mut self.map, "_schema", msg);
    }

    pub fn push_field(&mut self, field: &str, msg: impl Into<String>) {
        Self::push_to(&mut self.map, field, msg);
    }

    fn push_to(map: &mut Map<String, Value>, key: &str, msg: impl Into<String>) {
        let msg = Value::String(msg.into());
        match map.get_mut(key) {
            Some(Value::Array(arr)) => arr.push(msg),
            _ => {
                map.insert(key.to_string(), Value::Array(vec![msg]));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_decode_error(self, message: &str) -> ApiError {
        ApiError::decode(message).with_errors(Value::Object(self.map))
    }
}

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "email" => Some("must be a valid email"),
        "length" => Some("has invalid length"),
        "range" => Some("is out of range"),
        "url" => Some("must be a valid URL"),
        _ => None,
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn join_index(prefix: &str, idx: usize) -> String {
    format!("{prefix}[{idx}]")
}

fn push_validation_errors(out: &mut SchemaErrors, prefix: &str, errs: &validator::ValidationErrors) {
    for (field, kind) in errs.errors() {
        match kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                let key = join_path(prefix, field);
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| m.to_string()))
                        .unwrap_or_else(|| e.code.to_string());
                    out.push_field(&key, msg);
                }
            }
            validator::ValidationErrorsKind::Struct(struct_errs) => {
                let next = join_path(prefix, field);
                push_validation_errors(out, &next, struct_errs.as_ref());
            }
            validator::ValidationErrorsKind::List(list_errs) => {
                let base = join_path(prefix, field);
                for (idx, nested) in list_errs {
                    let next = join_index(&base, *idx);
                    push_validation_errors(out, &next, nested.as_ref());
                }
            }
        }
    }
}

fn message_for<T>() -> String {
    let name = std::any::type_name::<T>();
    let short = name.rsplit("::").next().unwrap_or(name);
    format!("Malformed {short} payload")
}

fn check<T>(value: Value, prefix: &str, out: &mut SchemaErrors) -> Option<T>
where
    T: DeserializeOwned + Validate,
{
    match serde_json::from_value::<T>(value) {
        Ok(parsed) => {
            if let Err(errs) = parsed.validate() {
                push_validation_errors(out, prefix, &errs);
                return None;
            }
            Some(parsed)
        }
        Err(e) => {
            let key = if prefix.is_empty() { "_schema" } else { prefix };
            out.push_field(key, e.to_string());
            None
        }
    }
}

/// Parse and validate one entity.
pub fn parse<T>(data: Value) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    if data.is_null() {
        return Err(ApiError::not_found("Resource not found"));
    }

    let mut errors = SchemaErrors::default();
    match check::<T>(data, "", &mut errors) {
        Some(parsed) if errors.is_empty() => Ok(parsed),
        _ => Err(errors.into_decode_error(&message_for::<T>())),
    }
}

/// Parse and validate a list of entities. Any bad element fails the whole
/// list; paths are prefixed with the element index.
pub fn parse_many<T>(data: Value) -> Result<Vec<T>, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let items = match data {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            let mut errors = SchemaErrors::default();
            errors.push_schema(format!("expected a list, got {}", kind_of(&other)));
            return Err(errors.into_decode_error(&message_for::<T>()));
        }
    };

    let mut errors = SchemaErrors::default();
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        if let Some(parsed) = check::<T>(item, &join_index("", idx), &mut errors) {
            out.push(parsed);
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors.into_decode_error(&message_for::<T>()))
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Shorthand for a `Decode` error with a single `_schema` entry.
pub fn schema_error(message: &str, msg: impl Into<String>) -> ApiError {
    ApiError::decode(message).with_errors(json!({"_schema": [msg.into()]}))
}

#[cfg(test)]
mod tests {
    use atrium_core::ErrorKind;
    use serde_json::json;

    use super::*;
    use crate::{Project, User};

    #[test]
    fn null_body_reads_as_not_found() {
        let err = parse::<User>(Value::Null).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn invalid_email_is_reported_by_field() {
        let err = parse::<User>(json!({"_id": "1", "email": "nope"})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        let errors = err.errors.as_ref().unwrap();
        assert_eq!(errors["email"][0], "email must be valid");
    }

    #[test]
    fn list_errors_carry_index_and_nested_paths() {
        let data = json!([
            {"_id": "p1", "name": "ok"},
            {"_id": "p2", "name": "bad", "teamMembers": [{"user": ""}]}
        ]);

        let err = parse_many::<Project>(data).unwrap_err();
        let errors = err.errors.as_ref().unwrap();
        assert_eq!(errors["[1].team_members[0].user"][0], "reference id must not be empty");
        assert_eq!(err.message, "Malformed Project payload");
    }

    #[test]
    fn wrong_shape_fails_loudly() {
        let err = parse_many::<User>(json!({"users": []})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        assert_eq!(err.errors.unwrap()["_schema"][0], "expected a list, got an object");

        let err = parse::<User>(json!({"_id": "1", "role": "Wizard"})).unwrap_err();
        assert!(err.errors.unwrap().get("_schema").is_some());
    }

    #[test]
    fn well_formed_list_parses() {
        let users = parse_many::<User>(json!([
            {"_id": "1", "username": "a", "isPremium": true},
            {"_id": "2", "username": "b", "isPremium": false}
        ]))
        .unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].is_premium);
    }
}
