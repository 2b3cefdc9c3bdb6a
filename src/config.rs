use serde::{Deserialize, Serialize};

/// When INCLUDE children are read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeLoading {
    /// Read the whole include tree while loading the entry file.
    #[default]
    Eager,
    /// Record directives only; children are read by `IncludeNode::resolve_children`.
    Lazy,
}

/// Options for loading decks and extracting their tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub include_loading: IncludeLoading,
    /// Keep inline comments of table rows in a synthetic `COMMENT` column.
    pub keep_table_comments: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            include_loading: IncludeLoading::Eager,
            keep_table_comments: false,
        }
    }
}

impl LoadOptions {
    /// # Errors
    /// Returns a `serde_yaml::Error` if the document does not describe `LoadOptions`.
    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    /// # Errors
    /// Returns a `serde_json::Error` if the document does not describe `LoadOptions`.
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_overrides_defaults() {
        let options =
            LoadOptions::from_yaml_str("include_loading: lazy\nkeep_table_comments: true\n")
                .unwrap();
        assert_eq!(options.include_loading, IncludeLoading::Lazy);
        assert!(options.keep_table_comments);
    }

    #[test]
    fn test_json_empty_object_is_default() {
        assert_eq!(LoadOptions::from_json_str("{}").unwrap(), LoadOptions::default());
    }
}
