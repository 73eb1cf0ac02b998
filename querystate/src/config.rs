//! Wire-format configuration.
//!
//! A [`QueryStateConfig`] applies to every collection field of a form; a
//! single field never mixes the two conventions.
//!
//! # Example
//! ```rust
//! use querystate::{CollectionFormat, QueryStateConfig};
//!
//! let config = QueryStateConfig::new()
//!     .with_collection_format(CollectionFormat::Joined)
//!     .with_separator('|');
//! assert_eq!(config.collection_key("tags"), "tags");
//!
//! let config = QueryStateConfig::from_toml_str("array_suffix = \"\"").unwrap();
//! assert_eq!(config.collection_key("tags"), "tags");
//! ```

use serde::{Deserialize, Serialize};

/// How collection items appear in the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollectionFormat {
    /// One `key[]=item` entry per item.
    #[default]
    Repeated,
    /// A single `key=item1,item2` entry.
    ///
    /// Items containing the separator are split apart when the field is set,
    /// so the stored value matches what a later read returns.
    Joined,
}

/// Form-wide wire configuration.
///
/// * `collection_format` - Repeated or joined collection entries. Default: `Repeated`.
/// * `array_suffix` - Suffix appended to collection keys in the repeated
///   format. Default: `"[]"`.
/// * `separator` - Item separator in the joined format. Default: `,`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryStateConfig {
    pub collection_format: CollectionFormat,
    pub array_suffix: String,
    pub separator: char,
}

impl Default for QueryStateConfig {
    fn default() -> Self {
        Self {
            collection_format: CollectionFormat::default(),
            array_suffix: "[]".to_string(),
            separator: ',',
        }
    }
}

impl QueryStateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = format;
        self
    }

    pub fn with_array_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.array_suffix = suffix.into();
        self
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Parse a configuration from TOML; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// The query-string key that holds a collection field's items.
    pub fn collection_key(&self, key: &str) -> String {
        match self.collection_format {
            CollectionFormat::Repeated => format!("{}{}", key, self.array_suffix),
            CollectionFormat::Joined => key.to_string(),
        }
    }
}
