// Field checks

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};
use strum_macros::IntoStaticStr;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single check applied to a field value.
///
/// Query, path and header values always arrive as strings, so the numeric
/// and boolean checks accept their string spellings too.
#[derive(Clone, IntoStaticStr)]
pub enum Check {
    Exists,
    NotEmpty,
    IsString,
    IsInt,
    IsFloat,
    IsBoolean,
    IsEmail,
    Length { min: Option<usize>, max: Option<usize> },
    IsIn(Vec<String>),
    Matches(Regex),
    Custom(Predicate),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Length { min, max } => write!(f, "Length({min:?}..{max:?})"),
            Check::IsIn(options) => write!(f, "IsIn({options:?})"),
            Check::Matches(regex) => write!(f, "Matches({})", regex.as_str()),
            Check::Custom(_) => f.write_str("Custom"),
            other => f.write_str(<&'static str>::from(other)),
        }
    }
}

impl Check {
    /// Whether `value` passes. `None` means the field is absent.
    pub fn passes(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Check::Exists => true,
            Check::NotEmpty => match value {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
                _ => true,
            },
            Check::IsString => value.is_string(),
            Check::IsInt => match value {
                Value::Number(n) => n.is_i64() || n.is_u64(),
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            Check::IsFloat => match value {
                Value::Number(_) => true,
                Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
                _ => false,
            },
            Check::IsBoolean => match value {
                Value::Bool(_) => true,
                Value::String(s) => matches!(s.as_str(), "true" | "false"),
                _ => false,
            },
            Check::IsEmail => value.as_str().is_some_and(|s| EMAIL_REGEX.is_match(s)),
            Check::Length { min, max } => {
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    _ => return false,
                };
                min.is_none_or(|min| len >= min) && max.is_none_or(|max| len <= max)
            }
            Check::IsIn(options) => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return false,
                };
                options.contains(&text)
            }
            Check::Matches(regex) => value.as_str().is_some_and(|s| regex.is_match(s)),
            Check::Custom(predicate) => predicate(value),
        }
    }

    /// Message used when the rule does not set its own.
    pub fn default_message(&self, field: &str) -> String {
        match self {
            Check::Exists => format!("{field} is required"),
            Check::NotEmpty => format!("{field} must not be empty"),
            Check::IsString => format!("{field} must be a string"),
            Check::IsInt => format!("{field} must be an integer"),
            Check::IsFloat => format!("{field} must be a number"),
            Check::IsBoolean => format!("{field} must be a boolean"),
            Check::IsEmail => format!("{field} must be a valid email"),
            Check::Length { min, max } => match (min, max) {
                (Some(min), Some(max)) => {
                    format!("{field} must be between {min} and {max} characters")
                }
                (Some(min), None) => format!("{field} must be at least {min} characters"),
                (None, Some(max)) => format!("{field} must be at most {max} characters"),
                (None, None) => format!("{field} has an invalid length"),
            },
            Check::IsIn(options) => format!("{field} must be one of: {}", options.join(", ")),
            Check::Matches(_) | Check::Custom(_) => "Invalid value".to_string(),
        }
    }
}

/// A check with an optional custom message
#[derive(Debug, Clone)]
pub struct Rule {
    pub check: Check,
    pub message: Option<String>,
}

impl Rule {
    pub fn message_for(&self, field: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.check.default_message(field))
    }
}
