use crate::validation::Location;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Validation failure for a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field name that failed validation
    pub field: String,

    /// Error message
    pub message: String,

    /// Where the value was looked up
    pub location: Location,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, location: Location) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors, in schema order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Messages grouped by field, each list in the order the errors were found
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            grouped
                .entry(error.field.clone())
                .or_default()
                .push(error.message.clone());
        }
        grouped
    }

    /// The `by_field` mapping as JSON, the shape sent to clients
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.by_field()
                .into_iter()
                .map(|(field, messages)| {
                    (field, Value::Array(messages.into_iter().map(Value::String).collect()))
                })
                .collect(),
        )
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_groups_messages_by_field_in_order() {
        let mut errors = ValidationErrors::default();
        errors.add(ValidationError::new("email", "is required", Location::Body));
        errors.add(ValidationError::new("age", "must be an integer", Location::Query));
        errors.add(ValidationError::new("email", "must be a valid email", Location::Body));

        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.to_value(),
            json!({
                "age": ["must be an integer"],
                "email": ["is required", "must be a valid email"],
            })
        );
        assert_eq!(
            errors.to_string(),
            "email: is required, age: must be an integer, email: must be a valid email"
        );
    }
}
