pub mod api;
pub mod config;
pub mod domains;
pub mod error;
pub mod fcs;
pub mod keywords;
pub mod lexer;
pub mod parser;
pub mod property;
pub mod resolver;
pub mod source;
pub mod table;
pub mod units;
pub mod utils;
pub mod wells;
pub mod writer;
mod serialization;

pub use api::{load_deck, load_model, parse_method, parse_method_str, MethodResult};
pub use config::{IncludeLoading, LoadOptions};
pub use domains::Domain;
pub use error::{DeckError, Warning};
pub use fcs::ModelFiles;
pub use property::{PropertyBag, PropertyValue};
pub use resolver::{build_include_graph, IncludeNode};
pub use serialization::Value;
pub use source::{LineId, LocationIndex, ObjectLocation, SourceLine};
pub use table::{Cell, Table, TableSpec};
pub use units::{unit_for, UnitConverter, UnitSystem};
pub use wells::WellsFile;
pub use writer::write_to_file;
