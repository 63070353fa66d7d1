//! Argument adapter
//!
//! Maps one task input onto the argument shape the operation is invoked with.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::config::UnpackMode;

/// Argument access errors
#[derive(Error, Debug)]
pub enum ArgsError {
    #[error("expected {expected} arguments, got {actual}")]
    Shape {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("missing positional argument {0}")]
    MissingPositional(usize),

    #[error("missing keyword argument '{0}'")]
    MissingKeyword(String),

    #[error("invalid argument: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Arguments for one invocation of an operation
#[derive(Clone, Debug, PartialEq)]
pub enum Args {
    /// The input passed as a single argument
    Single(Value),
    /// Elements of an array input
    Positional(Vec<Value>),
    /// Entries of an object input
    Keyword(Map<String, Value>),
}

impl Args {
    /// Build the arguments for `input` under `mode`
    pub fn adapt(input: &Value, mode: UnpackMode) -> Self {
        match (mode, input) {
            (UnpackMode::Positional, Value::Array(items)) => Args::Positional(items.clone()),
            (UnpackMode::Keyword, Value::Object(map)) => Args::Keyword(map.clone()),
            _ => Args::Single(input.clone()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Args::Single(_) => "single",
            Args::Positional(_) => "positional",
            Args::Keyword(_) => "keyword",
        }
    }

    /// Deserialize the single argument
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ArgsError> {
        match self {
            Args::Single(value) => Ok(T::deserialize(value)?),
            other => Err(ArgsError::Shape {
                expected: "single",
                actual: other.kind(),
            }),
        }
    }

    /// Deserialize the positional argument at `index`
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgsError> {
        match self {
            Args::Positional(items) => {
                let value = items
                    .get(index)
                    .ok_or(ArgsError::MissingPositional(index))?;
                Ok(T::deserialize(value)?)
            }
            other => Err(ArgsError::Shape {
                expected: "positional",
                actual: other.kind(),
            }),
        }
    }

    /// Deserialize the keyword argument `key`
    pub fn named<T: DeserializeOwned>(&self, key: &str) -> Result<T, ArgsError> {
        match self {
            Args::Keyword(map) => {
                let value = map
                    .get(key)
                    .ok_or_else(|| ArgsError::MissingKeyword(key.to_string()))?;
                Ok(T::deserialize(value)?)
            }
            other => Err(ArgsError::Shape {
                expected: "keyword",
                actual: other.kind(),
            }),
        }
    }

    /// Deserialize an optional keyword argument
    pub fn named_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ArgsError> {
        match self.named(key) {
            Ok(value) => Ok(Some(value)),
            Err(ArgsError::MissingKeyword(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Args::Single(value) => write!(f, "({value})"),
            Args::Positional(items) => {
                let joined: Vec<String> = items.iter().map(Value::to_string).collect();
                write!(f, "({})", joined.join(", "))
            }
            Args::Keyword(map) => {
                let joined: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "({})", joined.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional_spreads_arrays() {
        let args = Args::adapt(&json!(["a", "b"]), UnpackMode::Positional);
        assert_eq!(args, Args::Positional(vec![json!("a"), json!("b")]));
        assert_eq!(args.arg::<String>(1).unwrap(), "b");
        assert_eq!(args.to_string(), r#"("a", "b")"#);
    }

    #[test]
    fn test_keyword_spreads_objects() {
        let args = Args::adapt(&json!({"x": 1}), UnpackMode::Keyword);
        assert_eq!(args.named::<u32>("x").unwrap(), 1);
        assert_eq!(args.named_opt::<u32>("y").unwrap(), None);
        assert_eq!(args.to_string(), "(x=1)");
    }

    #[test]
    fn test_none_keeps_input_whole() {
        let args = Args::adapt(&json!("s"), UnpackMode::None);
        assert_eq!(args, Args::Single(json!("s")));

        let args = Args::adapt(&json!([1, 2]), UnpackMode::None);
        assert_eq!(args.parse::<Vec<u32>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_mismatched_mode_falls_back_to_single() {
        let args = Args::adapt(&json!({"x": 1}), UnpackMode::Positional);
        assert_eq!(args.kind(), "single");

        let args = Args::adapt(&json!([1]), UnpackMode::Keyword);
        assert_eq!(args.kind(), "single");

        let args = Args::adapt(&json!(7), UnpackMode::Positional);
        assert_eq!(args.parse::<u8>().unwrap(), 7);
    }

    #[test]
    fn test_access_errors() {
        let args = Args::adapt(&json!([1]), UnpackMode::Positional);
        assert!(matches!(args.arg::<u32>(3), Err(ArgsError::MissingPositional(3))));
        assert!(matches!(args.parse::<u32>(), Err(ArgsError::Shape { .. })));
        assert!(matches!(args.arg::<String>(0), Err(ArgsError::Invalid(_))));
    }
}
