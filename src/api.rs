use crate::config::LoadOptions;
use crate::domains::Domain;
use crate::error::{DeckError, Warning};
use crate::fcs::ModelFiles;
use crate::parser::extract;
use crate::property::PropertyBag;
use crate::resolver::{IncludeNode, IncludeResolver};
use crate::serialization::{bag_to_value, Value};
use crate::source::{ObjectLocation, SourceLine};
use crate::table::TableSpec;
use crate::units::UnitSystem;
use serde::{Serialize, Serializer};
use std::path::Path;

/// The outcome of running the extraction engine over one method file.
///
/// Serializes as its property bag, keywords in file order.
#[derive(Debug, Clone)]
pub struct MethodResult {
    pub domain: Domain,
    pub properties: PropertyBag,
    /// Where each table sits in the flattened line sequence.
    pub tables: Vec<TableSpec>,
    /// Every line the method was read from.
    pub location: ObjectLocation,
    pub unit_system: Option<UnitSystem>,
    /// Include and extraction warnings.
    pub warnings: Vec<Warning>,
}

impl Serialize for MethodResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

impl MethodResult {
    #[must_use]
    pub fn to_value(&self) -> Value {
        bag_to_value(&self.properties)
    }

    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// Reads a deck file and its INCLUDE tree.
///
/// # Errors
/// `IncludeError::NotFound` when `path` does not exist, `CircularInclude` when a file
/// includes itself.
pub fn load_deck(path: &Path, options: &LoadOptions) -> Result<IncludeNode, DeckError> {
    Ok(IncludeResolver::new(options.include_loading).resolve(path, None)?)
}

/// Reads a model entry file and the method files it names.
///
/// # Errors
/// Fails when the entry file is missing or an include tree cannot be built.
pub fn load_model(path: &Path, options: &LoadOptions) -> Result<ModelFiles, DeckError> {
    Ok(ModelFiles::load(path, options)?)
}

/// Extracts the properties of one method file with the keyword table of `domain`.
///
/// # Errors
/// `DanglingInclude` for an INCLUDE that was never loaded, `MalformedValue` for a number
/// that does not parse, and table errors for ragged rows.
pub fn parse_method(
    node: &IncludeNode,
    domain: Domain,
    options: &LoadOptions,
) -> Result<MethodResult, DeckError> {
    let lines = node.flatten()?;
    let extraction = extract(domain.keyword_table(), &lines, options.keep_table_comments)?;
    let mut warnings = node.all_warnings();
    warnings.extend(extraction.warnings);
    Ok(MethodResult {
        domain,
        unit_system: UnitSystem::declared_in(&extraction.properties),
        properties: extraction.properties,
        tables: extraction.tables,
        location: ObjectLocation::with_lines(
            node.location().display().to_string(),
            lines.iter().map(SourceLine::id),
        ),
        warnings,
    })
}

/// Extracts a method held in memory. INCLUDE directives in `source` are not followed.
///
/// # Errors
/// As [`parse_method`].
pub fn parse_method_str(
    source: &str,
    file_name: &str,
    domain: Domain,
) -> Result<MethodResult, DeckError> {
    let node = IncludeNode::from_source(file_name, source);
    parse_method(&node, domain, &LoadOptions::default())
}
