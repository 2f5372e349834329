//! Assigning request values to models.
//!
//! Form data arrives as strings (`published=1`) while JSON bodies carry native
//! values (`"published": true`). The `as_*` helpers accept both, so a model's
//! [`FormModel::set_attribute`] stays a plain `match` over field names:
//!
//! ```rust,ignore
//! fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), ValidationError> {
//!     match name {
//!         "title" => self.title = binding::as_string(name, value)?,
//!         "published" => self.published = binding::as_bool(name, value)?,
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```

use serde_json::{Map, Value};

use crate::core::FormModel;
use crate::validation::{ValidationError, ValidationErrors};

// Basic safety limit
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// Assign every allow-listed value of `values` onto `model`.
///
/// Keys outside [`FormModel::safe_attributes`] are skipped and logged. All
/// values are attempted even when one fails.
///
/// # Errors
///
/// Returns the coercion errors of every rejected value.
pub fn assign_attributes<M: FormModel>(
    model: &mut M,
    values: &Map<String, Value>,
) -> Result<(), ValidationErrors> {
    let safe = model.safe_attributes();
    let mut errors = ValidationErrors::new();

    for (name, value) in values {
        if !safe.contains(&name.as_str()) {
            tracing::debug!(
                model = M::MODEL_NAME,
                scenario = model.scenario(),
                attribute = %name,
                "Ignoring unsafe attribute"
            );
            continue;
        }
        errors.check(model.set_attribute(name, value));
    }

    errors.result()
}

/// Coerce a request value into a string
///
/// # Errors
///
/// Fails for arrays, objects and over-long values.
pub fn as_string(field: &str, value: &Value) -> Result<String, ValidationError> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
            return Err(ValidationError::new(field, "Must be a single value"));
        }
    };
    if text.len() > MAX_FIELD_VALUE_LENGTH {
        return Err(ValidationError::new(field, "Value is too long"));
    }
    Ok(text)
}

/// Coerce a request value into an optional string; blank becomes `None`
///
/// # Errors
///
/// Same as [`as_string`].
pub fn as_optional_string(field: &str, value: &Value) -> Result<Option<String>, ValidationError> {
    let text = as_string(field, value)?;
    Ok(if text.trim().is_empty() { None } else { Some(text) })
}

/// Coerce a request value into a boolean.
///
/// Accepts JSON booleans, `0`/`1`, and the strings `true`/`false`, `1`/`0`,
/// `on`/`off`, `yes`/`no` and the empty string (unchecked box).
///
/// # Errors
///
/// Fails for anything else.
pub fn as_bool(field: &str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Null => Ok(false),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ValidationError::new(field, "Must be a boolean")),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "" | "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(ValidationError::new(field, "Must be a boolean")),
        },
        Value::Array(_) | Value::Object(_) => Err(ValidationError::new(field, "Must be a boolean")),
    }
}

/// Coerce a request value into an integer
///
/// # Errors
///
/// Fails for non-integral values.
pub fn as_i64(field: &str, value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| ValidationError::new(field, "Must be an integer")),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| ValidationError::new(field, "Must be an integer")),
        _ => Err(ValidationError::new(field, "Must be an integer")),
    }
}

/// Coerce a request value into a float
///
/// # Errors
///
/// Fails for non-numeric values.
pub fn as_f64(field: &str, value: &Value) -> Result<f64, ValidationError> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| ValidationError::new(field, "Must be a number")),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| ValidationError::new(field, "Must be a number")),
        _ => Err(ValidationError::new(field, "Must be a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Note {
        scenario: String,
        text: String,
        pinned: bool,
        owner_id: i64,
    }

    impl FormModel for Note {
        const MODEL_NAME: &'static str = "Note";

        fn new_instance() -> Self {
            Self::default()
        }

        fn scenario(&self) -> &str {
            &self.scenario
        }

        fn set_scenario(&mut self, scenario: &str) {
            self.scenario = scenario.to_string();
        }

        fn safe_attributes(&self) -> Vec<&'static str> {
            vec!["text", "pinned"]
        }

        fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), ValidationError> {
            match name {
                "text" => self.text = as_string(name, value)?,
                "pinned" => self.pinned = as_bool(name, value)?,
                "owner_id" => self.owner_id = as_i64(name, value)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn test_assign_skips_unsafe_attributes() {
        let mut note = Note::new_instance();
        let values = json!({"text": "hello", "pinned": "on", "owner_id": "7"});

        assign_attributes(&mut note, values.as_object().unwrap()).unwrap();

        assert_eq!(note.text, "hello");
        assert!(note.pinned);
        assert_eq!(note.owner_id, 0);
    }

    #[test]
    fn test_assign_collects_all_errors() {
        let mut note = Note::new_instance();
        let values = json!({"text": ["a", "b"], "pinned": "maybe"});

        let errors = assign_attributes(&mut note, values.as_object().unwrap()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_as_bool() {
        assert!(as_bool("f", &json!("1")).unwrap());
        assert!(as_bool("f", &json!(true)).unwrap());
        assert!(!as_bool("f", &json!("")).unwrap());
        assert!(!as_bool("f", &json!(0)).unwrap());
        assert!(as_bool("f", &json!(2)).is_err());
    }

    #[test]
    fn test_as_numbers() {
        assert_eq!(as_i64("n", &json!(" 12 ")).unwrap(), 12);
        assert_eq!(as_i64("n", &json!(12)).unwrap(), 12);
        assert!(as_i64("n", &json!("1.5")).is_err());
        assert!((as_f64("n", &json!("1.5")).unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_as_string_limits() {
        assert_eq!(as_string("s", &json!(3)).unwrap(), "3");
        assert!(as_string("s", &json!("x".repeat(MAX_FIELD_VALUE_LENGTH + 1))).is_err());
        assert_eq!(as_optional_string("s", &json!("  ")).unwrap(), None);
    }
}
