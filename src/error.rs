use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum DeckError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Include(#[from] IncludeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Edit(#[from] EditError),
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum IncludeError {
    #[error("File not found: {}", path.display())]
    #[diagnostic(
        code(include::not_found),
        help("Check that the path exists. Relative INCLUDE paths resolve against the including file's directory.")
    )]
    NotFound {
        path: PathBuf,
        origin: Option<PathBuf>,
    },

    #[error("Failed to read {}: {message}", path.display())]
    #[diagnostic(code(include::io))]
    Io { path: PathBuf, message: String },

    #[error("INCLUDE of {} in {} (line {line}) was never resolved", target.display(), file.display())]
    #[diagnostic(
        code(include::dangling),
        help("The included file is missing, or the graph was loaded lazily and the child was not resolved before flattening.")
    )]
    DanglingInclude {
        file: PathBuf,
        line: usize,
        target: PathBuf,
    },

    #[error("Circular INCLUDE detected: {cycle}")]
    #[diagnostic(
        code(include::circular),
        help("A file includes itself directly or through other files.")
    )]
    CircularInclude { cycle: String },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ExtractError {
    #[error("Malformed value '{value}' for {key} in {} (line {line})", file.display())]
    #[diagnostic(
        code(extract::malformed_value),
        help("The keyword expects a number. Numbers are read with a '.' decimal separator.")
    )]
    MalformedValue {
        key: String,
        value: String,
        file: PathBuf,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("expected a {expected} for {key}")]
        span: SourceSpan,
        expected: &'static str,
    },

    #[error("Invalid {key} table in {} (line {line})", file.display())]
    #[diagnostic(code(extract::table))]
    Table {
        key: String,
        file: PathBuf,
        line: usize,
        #[source]
        #[diagnostic_source]
        source: TableError,
    },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum TableError {
    #[error("Row {row} has {found} values but the table has {expected} columns")]
    #[diagnostic(
        code(table::ragged),
        help("Every data row must provide one value per column.")
    )]
    RaggedTable {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column {name} appears more than once")]
    #[diagnostic(code(table::duplicate_column))]
    DuplicateColumn { name: String },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum UnitError {
    #[error("No physical dimension is declared for attribute '{attribute}'")]
    #[diagnostic(code(units::unrecognized_attribute))]
    UnrecognizedAttribute { attribute: String },

    #[error("No conversion registered for {dimension} from {from} to {to}")]
    #[diagnostic(
        code(units::no_conversion),
        help("Register one with UnitConverter::register, or use the lenient convert().")
    )]
    NoConversion {
        dimension: String,
        from: String,
        to: String,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum EditError {
    #[error("Line {id} does not belong to this document")]
    #[diagnostic(code(edit::unknown_line))]
    UnknownLine { id: u64 },

    #[error("No value follows {token} on line {id}")]
    #[diagnostic(code(edit::value_not_found))]
    ValueNotFound { id: u64, token: String },

    #[error("No column named '{name}' in {object}")]
    #[diagnostic(code(edit::unknown_column))]
    UnknownColumn { object: String, name: String },

    #[error("No object named '{name}' is tracked")]
    #[diagnostic(code(edit::unknown_object))]
    UnknownObject { name: String },

    #[error("Failed to write {}: {message}", path.display())]
    #[diagnostic(code(edit::write))]
    Write { path: PathBuf, message: String },
}

/// A non-fatal condition met while loading or extracting.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Warning {
    pub file: PathBuf,
    pub line: Option<usize>,
    pub message: String,
}

impl Warning {
    /// Creates the warning and forwards it to the `log` facade.
    pub fn emit(file: impl Into<PathBuf>, line: Option<usize>, message: impl Into<String>) -> Self {
        let warning = Warning {
            file: file.into(),
            line,
            message: message.into(),
        };
        log::warn!("{warning}");
        warning
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.file.display(), line, self.message),
            None => write!(f, "{}: {}", self.file.display(), self.message),
        }
    }
}
