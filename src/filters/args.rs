use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::traits::FilterError;

/// Caller-supplied transformation of a row label; `None` skips the row
pub type LabelCallback = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub enum FilterArg {
    Value(JsonValue),
    Callback(LabelCallback),
}

impl fmt::Debug for FilterArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterArg::Value(value) => write!(f, "{}", value),
            FilterArg::Callback(_) => f.write_str("<callback>"),
        }
    }
}

/// Named arguments of one filter invocation
#[derive(Clone, Default)]
pub struct FilterArgs {
    args: BTreeMap<String, FilterArg>,
}

impl FilterArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.args.insert(key.into(), FilterArg::Value(value.into()));
        self
    }

    pub fn with_callback(
        mut self,
        key: impl Into<String>,
        callback: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.args
            .insert(key.into(), FilterArg::Callback(Arc::new(callback)));
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilterArg> {
        self.args.get(key)
    }

    fn value(&self, key: &str) -> Result<Option<&JsonValue>, FilterError> {
        match self.args.get(key) {
            None | Some(FilterArg::Value(JsonValue::Null)) => Ok(None),
            Some(FilterArg::Value(value)) => Ok(Some(value)),
            Some(FilterArg::Callback(_)) => Err(invalid(key, "expected a value, got a callback")),
        }
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, FilterError> {
        match self.value(key)? {
            None => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(invalid(key, format!("expected a string, got {}", other))),
        }
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str, FilterError> {
        Ok(self.opt_str(key)?.unwrap_or(default))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, FilterError> {
        self.opt_str(key)?
            .ok_or_else(|| invalid(key, "argument is required"))
    }

    pub fn opt_i64(&self, key: &str) -> Result<Option<i64>, FilterError> {
        match self.value(key)? {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| invalid(key, format!("expected an integer, got {}", value))),
        }
    }

    pub fn opt_usize(&self, key: &str) -> Result<Option<usize>, FilterError> {
        match self.opt_i64(key)? {
            None => Ok(None),
            Some(n) => usize::try_from(n)
                .map(Some)
                .map_err(|_| invalid(key, format!("expected a non-negative integer, got {}", n))),
        }
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, FilterError> {
        match self.value(key)? {
            None => Ok(None),
            Some(JsonValue::Bool(false)) => Ok(Some(0.0)),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| invalid(key, format!("expected a number, got {}", value))),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, FilterError> {
        match self.value(key)? {
            None => Ok(default),
            Some(JsonValue::Bool(b)) => Ok(*b),
            Some(other) => Err(invalid(key, format!("expected a boolean, got {}", other))),
        }
    }

    /// A list given either as an array of strings or a comma-separated string
    pub fn str_list(&self, key: &str) -> Result<Vec<String>, FilterError> {
        match self.value(key)? {
            None => Ok(Vec::new()),
            Some(JsonValue::String(s)) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(key, format!("expected strings, got {}", item)))
                })
                .collect(),
            Some(other) => Err(invalid(key, format!("expected a list, got {}", other))),
        }
    }

    pub fn opt_object(
        &self,
        key: &str,
    ) -> Result<Option<&serde_json::Map<String, JsonValue>>, FilterError> {
        match self.value(key)? {
            None => Ok(None),
            Some(JsonValue::Object(map)) => Ok(Some(map)),
            Some(other) => Err(invalid(key, format!("expected an object, got {}", other))),
        }
    }

    pub fn callback(&self, key: &str) -> Result<Option<&LabelCallback>, FilterError> {
        match self.args.get(key) {
            None => Ok(None),
            Some(FilterArg::Callback(callback)) => Ok(Some(callback)),
            Some(FilterArg::Value(_)) => Err(invalid(key, "expected a callback")),
        }
    }
}

impl fmt::Debug for FilterArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.args.iter()).finish()
    }
}

/// A filter waiting in a table's queue
#[derive(Debug, Clone)]
pub struct QueuedFilter {
    pub name: String,
    pub args: FilterArgs,
}

fn invalid(arg: &str, reason: impl Into<String>) -> FilterError {
    FilterError::InvalidArgument {
        arg: arg.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_accessors() {
        let args = FilterArgs::new()
            .with("limit", 5)
            .with("label", "Others")
            .with("recursive", true)
            .with("pct", 0.05);

        assert_eq!(args.opt_usize("limit").unwrap(), Some(5));
        assert_eq!(args.require_str("label").unwrap(), "Others");
        assert!(args.bool_or("recursive", false).unwrap());
        assert!(!args.bool_or("missing", false).unwrap());
        assert_eq!(args.opt_f64("pct").unwrap(), Some(0.05));
        assert_eq!(args.str_or("column", "nb_visits").unwrap(), "nb_visits");
    }

    #[test]
    fn test_type_mismatch() {
        let args = FilterArgs::new().with("limit", "ten").with("neg", -1);
        assert!(matches!(
            args.opt_usize("limit"),
            Err(FilterError::InvalidArgument { arg, .. }) if arg == "limit"
        ));
        assert!(args.opt_usize("neg").is_err());
        assert_eq!(args.opt_i64("neg").unwrap(), Some(-1));
        assert!(args.require_str("absent").is_err());
    }

    #[test]
    fn test_str_list_forms() {
        let args = FilterArgs::new()
            .with("a", json!(["x", "y"]))
            .with("b", "x, y,,z");
        assert_eq!(args.str_list("a").unwrap(), vec!["x", "y"]);
        assert_eq!(args.str_list("b").unwrap(), vec!["x", "y", "z"]);
        assert!(args.str_list("c").unwrap().is_empty());
    }

    #[test]
    fn test_callback() {
        let args = FilterArgs::new().with_callback("callback", |label| Some(label.to_uppercase()));
        let callback = args.callback("callback").unwrap().unwrap();
        assert_eq!(callback("ff").as_deref(), Some("FF"));
        assert!(args.opt_str("callback").is_err());
        assert!(format!("{:?}", args).contains("<callback>"));
    }
}
