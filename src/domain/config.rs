use serde::{Deserialize, Serialize};

/// Grid dimensions and display tokens used by the engine.
///
/// Missing fields fall back to their defaults when deserialized, so a
/// config file only needs to name what it overrides.
///
/// # Examples
///
/// ```
/// use cellsheet::domain::SheetConfig;
///
/// let config = SheetConfig::from_json(r#"{ "rows": 20 }"#).unwrap();
/// assert_eq!(config.rows, 20);
/// assert_eq!(config.cols, 10);
/// assert_eq!(config.true_token, "TRUE");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub rows: usize,
    pub cols: usize,
    /// Rendered for logical results that hold.
    pub true_token: String,
    /// Rendered for logical results that do not hold.
    pub false_token: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            true_token: "TRUE".to_string(),
            false_token: "FALSE".to_string(),
        }
    }
}

impl SheetConfig {
    /// Ukrainian boolean tokens.
    pub fn ukrainian() -> Self {
        Self {
            true_token: "ІСТИНА".to_string(),
            false_token: "ХИБА".to_string(),
            ..Self::default()
        }
    }

    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The token rendered for a logical result.
    pub fn logical_token(&self, value: bool) -> &str {
        if value { &self.true_token } else { &self.false_token }
    }
}
