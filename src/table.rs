use crate::error::TableError;
use crate::lexer::{join_continuations, CommentStripper, Lexer, TokenType};
use crate::utils::parse_float;
use indexmap::IndexMap;
use serde::Serialize;

/// Name of the synthetic column that keeps row comments.
pub const COMMENT_COLUMN: &str = "COMMENT";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Null,
}

impl Cell {
    /// Reads one table value. `NA` and `#` stand for an absent value.
    pub fn parse(token: &str) -> Cell {
        if token.eq_ignore_ascii_case("NA") || token == "#" {
            return Cell::Null;
        }
        match parse_float(token) {
            Some(n) => Cell::Number(n),
            None => Cell::Text(token.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// Named columns of equal length. Column names are upper case and unique.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Table {
    columns: IndexMap<String, Vec<Cell>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<S: AsRef<str>>(names: &[S]) -> Result<Self, TableError> {
        let mut columns = IndexMap::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().to_ascii_uppercase();
            if columns.insert(name.clone(), Vec::new()).is_some() {
                return Err(TableError::DuplicateColumn { name });
            }
        }
        Ok(Table { columns })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Looks a column up by name, ignoring case.
    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns
            .get(&name.to_ascii_uppercase())
            .map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Cell])> {
        self.columns
            .iter()
            .map(|(name, cells)| (name.as_str(), cells.as_slice()))
    }

    pub fn row(&self, index: usize) -> Option<Vec<&Cell>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.values().map(|cells| &cells[index]).collect())
    }

    pub fn rows(&self) -> Vec<Vec<&Cell>> {
        (0..self.row_count())
            .filter_map(|index| self.row(index))
            .collect()
    }

    /// Appends a row. `row` is only used to report a mismatch.
    pub fn push_row(&mut self, cells: Vec<Cell>, row: usize) -> Result<(), TableError> {
        if cells.len() != self.columns.len() {
            return Err(TableError::RaggedTable {
                row,
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        for (column, cell) in self.columns.values_mut().zip(cells) {
            column.push(cell);
        }
        Ok(())
    }

    /// Renames the data columns in order. A trailing `COMMENT` column keeps its name when
    /// `names` covers only the data columns. A table without columns takes `names` as its
    /// (empty) columns.
    pub fn relabel<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), TableError> {
        if self.columns.is_empty() {
            *self = Table::with_columns(names)?;
            return Ok(());
        }
        let has_comment = self.columns.keys().last().map(String::as_str) == Some(COMMENT_COLUMN);
        let data_columns = if has_comment && names.len() + 1 == self.columns.len() {
            names.len()
        } else {
            self.columns.len()
        };
        if names.len() != data_columns {
            return Err(TableError::RaggedTable {
                row: 0,
                expected: names.len(),
                found: data_columns,
            });
        }
        let mut relabelled = IndexMap::with_capacity(self.columns.len());
        let columns = std::mem::take(&mut self.columns);
        for (position, (old_name, cells)) in columns.into_iter().enumerate() {
            let name = match names.get(position) {
                Some(name) => name.as_ref().to_ascii_uppercase(),
                None => old_name,
            };
            if relabelled.insert(name.clone(), cells).is_some() {
                return Err(TableError::DuplicateColumn { name });
            }
        }
        self.columns = relabelled;
        Ok(())
    }
}

/// The location of one table inside a flattened line sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    /// Keyword that introduced the table.
    pub keyword: String,
    pub columns: Vec<String>,
    /// First data line (exclusive of any header line).
    pub start: usize,
    /// One past the last line of the table.
    pub end: usize,
    /// For tables keyed by a run-time value: that value.
    pub owner: Option<String>,
}

/// Builds a table from raw lines. Comments are stripped and `>` continuations joined first.
/// Without a header the columns are named `COL1..COLn` after the first row, for the caller to
/// relabel. Rows without values are dropped; any other row must fill every column.
pub fn build_table<S: AsRef<str>>(
    lines: &[S],
    has_header: bool,
    keep_comments: bool,
) -> Result<Table, TableError> {
    let mut stripper = CommentStripper::new();
    let mut stripped = Vec::with_capacity(lines.len());
    let mut comments = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.as_ref();
        comments.push(inline_comment(line, stripper.in_block_comment()));
        stripped.push(stripper.strip(line));
    }

    let mut table: Option<Table> = None;
    for logical in join_continuations(&stripped) {
        let tokens = crate::lexer::values(&logical.text);
        if tokens.is_empty() {
            continue;
        }
        if let Some(current) = table.as_mut() {
            push_tokens(current, &tokens, keep_comments, &comments, &logical)?;
            continue;
        }
        let mut names: Vec<String> = if has_header {
            tokens.iter().map(|t| t.to_ascii_uppercase()).collect()
        } else {
            (1..=tokens.len()).map(|i| format!("COL{i}")).collect()
        };
        if keep_comments {
            names.push(COMMENT_COLUMN.to_string());
        }
        let mut created = Table::with_columns(&names)?;
        if !has_header {
            push_tokens(&mut created, &tokens, keep_comments, &comments, &logical)?;
        }
        table = Some(created);
    }
    Ok(table.unwrap_or_default())
}

fn push_tokens(
    table: &mut Table,
    tokens: &[String],
    keep_comments: bool,
    comments: &[Option<String>],
    logical: &crate::lexer::LogicalLine,
) -> Result<(), TableError> {
    let mut cells: Vec<Cell> = tokens.iter().map(|t| Cell::parse(t)).collect();
    if keep_comments {
        let text: Vec<&str> = comments[logical.first..=logical.last]
            .iter()
            .filter_map(|c| c.as_deref())
            .collect();
        cells.push(if text.is_empty() {
            Cell::Null
        } else {
            Cell::Text(text.join(" "))
        });
    }
    table.push_row(cells, logical.first)
}

fn inline_comment(line: &str, in_block_comment: bool) -> Option<String> {
    Lexer::with_block_state(line, in_block_comment)
        .lex()
        .into_iter()
        .find_map(|t| match t.ttype {
            TokenType::Comment(text) => Some(text.trim().to_string()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_header() {
        let lines = [
            "SW   KRW  KROW  ! water table",
            "0.2  0.0  1.0",
            "",
            "0.8  0.6  0.0  ! residual oil",
        ];
        let table = build_table(&lines, true, false).unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["SW", "KRW", "KROW"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("krw").unwrap()[1], Cell::Number(0.6));
    }

    #[test]
    fn test_build_keeps_comments_column() {
        let lines = ["pres bo", "1000 1.2 ! low", "2000 1.3"];
        let table = build_table(&lines, true, true).unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["PRES", "BO", "COMMENT"]);
        assert_eq!(table.column("COMMENT").unwrap()[0], Cell::Text("low".to_string()));
        assert!(table.column("COMMENT").unwrap()[1].is_null());
    }

    #[test]
    fn test_build_without_header_then_relabel() {
        let lines = ["1 1 1500 1700", "1 2 1600 1800"];
        let mut table = build_table(&lines, false, false).unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["COL1", "COL2", "COL3", "COL4"]);
        table.relabel(&["IQOIL", "IWCUT", "BHP0", "BHP1"]).unwrap();
        assert_eq!(table.column("BHP1").unwrap()[1], Cell::Number(1800.0));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let lines = ["SW KRW", "0.2 0.0", "0.5"];
        assert_eq!(
            build_table(&lines, true, false),
            Err(TableError::RaggedTable {
                row: 2,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_duplicate_header_is_an_error() {
        let lines = ["SW SW"];
        assert!(matches!(
            build_table(&lines, true, false),
            Err(TableError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_cells_distinguish_numbers_text_and_null() {
        let lines = ["NAME VALUE FLAG", "P1 1D2 NA"];
        let table = build_table(&lines, true, false).unwrap();
        let row = table.row(0).unwrap();
        assert_eq!(row[0], &Cell::Text("P1".to_string()));
        assert_eq!(row[1], &Cell::Number(100.0));
        assert!(row[2].is_null());
    }

    #[test]
    fn test_relabel_empty_table_creates_columns() {
        let mut table = build_table::<&str>(&[], false, false).unwrap();
        table.relabel(&["A", "B"]).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
    }
}
