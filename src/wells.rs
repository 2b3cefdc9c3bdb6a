//! WELLSPEC completion tables, tracked per well and per completion so that one completion can
//! be edited without touching anything else in the file.

use crate::domains::Domain;
use crate::error::{DeckError, EditError, ExtractError, TableError, Warning};
use crate::lexer::{values, CommentStripper};
use crate::resolver::IncludeNode;
use crate::source::{LineId, LocationIndex, ObjectLocation, SourceLine};
use crate::table::{Cell, Table};
use crate::utils::is_numeric;
use crate::writer;

/// One row of a WELLSPEC table.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Name of this completion's record in [`WellsFile::locations`].
    pub record: String,
    pub line: LineId,
    pub cells: Vec<Cell>,
}

/// One WELLSPEC block.
#[derive(Debug, Clone, PartialEq)]
pub struct WellSpec {
    pub name: String,
    /// Record name of the block: the well name, with `@<n>` for its n-th later block.
    pub record: String,
    pub columns: Vec<String>,
    pub completions: Vec<Completion>,
    next_number: usize,
}

impl WellSpec {
    fn new(name: &str, record: String) -> Self {
        WellSpec {
            name: name.to_string(),
            record,
            columns: Vec::new(),
            completions: Vec::new(),
            next_number: 1,
        }
    }

    fn next_record(&mut self) -> String {
        let record = format!("{}#{}", self.record, self.next_number);
        self.next_number += 1;
        record
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }

    /// The completions as a table with the block's header.
    pub fn table(&self) -> Result<Table, TableError> {
        let mut table = Table::with_columns(&self.columns)?;
        for (row, completion) in self.completions.iter().enumerate() {
            table.push_row(completion.cells.clone(), row)?;
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WellsFile {
    pub wells: Vec<WellSpec>,
    pub locations: LocationIndex,
    pub warnings: Vec<Warning>,
}

impl WellsFile {
    /// Reads the WELLSPEC blocks of a wells file and everything it includes.
    pub fn from_node(node: &IncludeNode) -> Result<Self, DeckError> {
        let lines = node.flatten()?;
        Ok(parse_wells(&lines)?)
    }

    /// The first block for `name`.
    pub fn well(&self, name: &str) -> Option<&WellSpec> {
        self.wells.iter().find(|w| w.name.eq_ignore_ascii_case(name))
    }

    fn spec_mut(&mut self, record: &str) -> Result<&mut WellSpec, EditError> {
        self.wells
            .iter_mut()
            .find(|w| w.record == record)
            .ok_or_else(|| EditError::UnknownObject {
                name: record.to_string(),
            })
    }

    fn completion_at(
        &mut self,
        record: &str,
        position: usize,
    ) -> Result<(&mut WellSpec, usize), EditError> {
        let spec = self.spec_mut(record)?;
        if position >= spec.completions.len() {
            return Err(EditError::UnknownObject {
                name: format!("{record}[{position}]"),
            });
        }
        Ok((spec, position))
    }

    /// Deletes the `position`-th completion of the block recorded as `well`.
    pub fn remove_completion(
        &mut self,
        root: &mut IncludeNode,
        well: &str,
        position: usize,
    ) -> Result<Completion, EditError> {
        let (spec, position) = self.completion_at(well, position)?;
        let record = spec.completions[position].record.clone();
        writer::remove_object(root, &mut self.locations, &record)?;
        let (spec, position) = self.completion_at(well, position)?;
        Ok(spec.completions.remove(position))
    }

    /// Appends a completion after the last row of the block (after its header when it has
    /// none) and returns the new completion's record name.
    pub fn add_completion<S: AsRef<str>>(
        &mut self,
        root: &mut IncludeNode,
        well: &str,
        values: &[S],
    ) -> Result<String, DeckError> {
        let spec = self.spec_mut(well)?;
        if values.len() != spec.columns.len() {
            return Err(TableError::RaggedTable {
                row: spec.completions.len(),
                expected: spec.columns.len(),
                found: values.len(),
            }
            .into());
        }
        let last_row = spec.completions.last().map(|c| c.line);
        let anchor = match last_row {
            Some(line) => line,
            None => self
                .locations
                .get(well)
                .and_then(|l| l.lines().last())
                .ok_or_else(|| EditError::UnknownObject {
                    name: well.to_string(),
                })?,
        };
        let indent: String = last_row
            .and_then(|line| root.find_line(line))
            .map(|l| l.text().chars().take_while(|c| c.is_whitespace()).collect())
            .unwrap_or_default();
        let text = format!(
            "{indent}{}",
            values.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("  ")
        );

        let ids = writer::add_lines(root, &mut self.locations, well, anchor, &[text])?;
        // An unterminated anchor is replaced by a terminated copy with a new identity.
        let stale = self
            .spec_mut(well)?
            .completions
            .last()
            .filter(|last| root.find_line(last.line).is_none())
            .map(|last| last.record.clone());
        let refreshed = stale
            .and_then(|record| self.locations.get(&record))
            .and_then(|owner| owner.lines().next());
        let spec = self.spec_mut(well)?;
        if let (Some(last), Some(id)) = (spec.completions.last_mut(), refreshed) {
            last.line = id;
        }
        let record = spec.next_record();
        let cells = values.iter().map(|v| Cell::parse(v.as_ref())).collect();
        spec.completions.push(Completion {
            record: record.clone(),
            line: ids[0],
            cells,
        });
        self.locations.insert(ObjectLocation::with_lines(record.clone(), ids));
        Ok(record)
    }

    /// Rewrites one value of a completion in place.
    pub fn modify_completion(
        &mut self,
        root: &mut IncludeNode,
        well: &str,
        position: usize,
        column: &str,
        value: &str,
    ) -> Result<(), EditError> {
        let (spec, position) = self.completion_at(well, position)?;
        let index = spec.column_index(column).ok_or_else(|| EditError::UnknownColumn {
            object: well.to_string(),
            name: column.to_string(),
        })?;
        let line = spec.completions[position].line;
        let new_line = writer::replace_value_at(root, &mut self.locations, line, index, value)?;
        let (spec, position) = self.completion_at(well, position)?;
        let completion = &mut spec.completions[position];
        completion.line = new_line;
        completion.cells[index] = Cell::parse(value);
        Ok(())
    }
}

/// Reads WELLSPEC blocks from a flattened line sequence. A block is the WELLSPEC line, a header
/// row, and the numeric completion rows after it. Any other line ends the block.
pub fn parse_wells(lines: &[SourceLine]) -> Result<WellsFile, ExtractError> {
    let keywords = Domain::Wells.keyword_table();
    let mut file = WellsFile::default();
    let mut stripper = CommentStripper::new();
    let mut current: Option<(WellSpec, ObjectLocation)> = None;
    let mut awaiting_header = false;

    for line in lines {
        let words = values(&stripper.strip(line.text()));
        let Some(first) = words.first() else {
            continue;
        };

        if keywords.is_known(first) {
            if let Some(done) = current.take() {
                file.close(done);
            }
            if first.eq_ignore_ascii_case("WELLSPEC") {
                match words.get(1) {
                    Some(name) => {
                        let record = file.record_name(name);
                        log::debug!(
                            "WELLSPEC {name} at {}:{}",
                            line.path().display(),
                            line.index()
                        );
                        current = Some((
                            WellSpec::new(name, record.clone()),
                            ObjectLocation::with_lines(record, [line.id()]),
                        ));
                        awaiting_header = true;
                    }
                    None => file.warnings.push(Warning::emit(
                        line.path(),
                        Some(line.index()),
                        "WELLSPEC without a well name",
                    )),
                }
            }
            continue;
        }

        // Completion rows are numeric; any other leading word ends the block and passes through.
        if !awaiting_header && !is_numeric(first) && !Cell::parse(first).is_null() {
            if let Some(done) = current.take() {
                log::trace!("{first} closes WELLSPEC {}", done.0.name);
                file.close(done);
            }
            continue;
        }

        let Some((spec, location)) = current.as_mut() else {
            continue;
        };
        if awaiting_header {
            awaiting_header = false;
            if is_numeric(first) {
                file.warnings.push(Warning::emit(
                    line.path(),
                    Some(line.index()),
                    format!("WELLSPEC {} has no header row", spec.name),
                ));
                current = None;
                continue;
            }
            spec.columns = words.iter().map(|w| w.to_ascii_uppercase()).collect();
            location.push(line.id());
            continue;
        }

        if words.len() != spec.columns.len() {
            return Err(ExtractError::Table {
                key: "WELLSPEC".to_string(),
                file: line.path().to_path_buf(),
                line: line.index(),
                source: TableError::RaggedTable {
                    row: spec.completions.len(),
                    expected: spec.columns.len(),
                    found: words.len(),
                },
            });
        }
        let record = spec.next_record();
        location.push(line.id());
        file.locations.insert(ObjectLocation::with_lines(record.clone(), [line.id()]));
        spec.completions.push(Completion {
            record,
            line: line.id(),
            cells: words.iter().map(|w| Cell::parse(w)).collect(),
        });
    }
    if let Some(done) = current.take() {
        file.close(done);
    }
    Ok(file)
}

impl WellsFile {
    fn record_name(&self, name: &str) -> String {
        let seen = self.wells.iter().filter(|w| w.name.eq_ignore_ascii_case(name)).count();
        match seen {
            0 => name.to_string(),
            n => format!("{name}@{}", n + 1),
        }
    }

    fn close(&mut self, (spec, location): (WellSpec, ObjectLocation)) {
        self.locations.insert(location);
        self.wells.push(spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::render;

    const DECK: &str = "\
TIME 01/01/2020
WELLSPEC PROD1
IW JW L RADW
 1  1  1  0.25
 1  1  2  0.25  ! upper perf
 1  1  3  0.25

WELLSPEC INJ1
IW JW L RADW
10 10  5  0.3
ENDWELLS
";

    fn load(text: &str) -> (IncludeNode, WellsFile) {
        let node = IncludeNode::from_source("wells.dat", text);
        let wells = WellsFile::from_node(&node).unwrap();
        (node, wells)
    }

    fn identity_sets(file: &WellsFile) -> Vec<(String, Vec<LineId>)> {
        file.locations
            .iter()
            .map(|l| (l.name.clone(), l.lines().collect()))
            .collect()
    }

    #[test]
    fn test_reads_blocks_and_records() {
        let (node, wells) = load(DECK);
        assert_eq!(wells.wells.len(), 2);
        let prod = wells.well("prod1").unwrap();
        assert_eq!(prod.columns, vec!["IW", "JW", "L", "RADW"]);
        assert_eq!(prod.completions.len(), 3);
        assert_eq!(prod.completions[1].cells[2], Cell::Number(2.0));
        assert_eq!(wells.locations.get("PROD1").unwrap().len(), 5);
        assert_eq!(wells.locations.get("PROD1#2").unwrap().len(), 1);
        assert_eq!(
            wells.locations.get("INJ1#1").unwrap().lines().next(),
            Some(node.lines()[9].id())
        );
        assert_eq!(prod.table().unwrap().row_count(), 3);
    }

    #[test]
    fn test_remove_completion_is_local() {
        let (mut node, mut wells) = load(DECK);
        let removed_line = wells.well("PROD1").unwrap().completions[1].line;
        let before: Vec<_> = identity_sets(&wells)
            .into_iter()
            .filter(|(name, _)| name != "PROD1#2")
            .map(|(name, ids)| {
                let kept = ids.into_iter().filter(|id| *id != removed_line);
                (name, kept.collect::<Vec<_>>())
            })
            .collect();

        let removed = wells.remove_completion(&mut node, "PROD1", 1).unwrap();
        assert_eq!(removed.record, "PROD1#2");
        assert_eq!(identity_sets(&wells), before);
        assert_eq!(render(&node), DECK.replace(" 1  1  2  0.25  ! upper perf\n", ""));
    }

    #[test]
    fn test_add_completion_follows_last_row() {
        let (mut node, mut wells) = load(DECK);
        let record = wells
            .add_completion(&mut node, "PROD1", &["1", "1", "4", "0.25"])
            .unwrap();
        assert_eq!(record, "PROD1#4");
        assert!(render(&node).contains(" 1  1  3  0.25\n 1  1  4  0.25\n\nWELLSPEC INJ1"));
        assert_eq!(wells.well("PROD1").unwrap().completions.len(), 4);
        assert_eq!(wells.locations.get("PROD1").unwrap().len(), 6);

        let ragged = wells.add_completion(&mut node, "PROD1", &["1", "1"]);
        assert!(matches!(ragged, Err(DeckError::Table(TableError::RaggedTable { .. }))));
    }

    #[test]
    fn test_modify_completion_value() {
        let (mut node, mut wells) = load(DECK);
        wells.modify_completion(&mut node, "PROD1", 1, "radw", "0.3").unwrap();
        assert!(render(&node).contains(" 1  1  2  0.3  ! upper perf\n"));
        let completion = &wells.well("PROD1").unwrap().completions[1];
        assert_eq!(completion.cells[3], Cell::Number(0.3));
        assert!(wells.locations.get("PROD1#2").unwrap().contains(completion.line));

        let unknown = wells.modify_completion(&mut node, "PROD1", 1, "SKIN", "1");
        assert!(matches!(unknown, Err(EditError::UnknownColumn { .. })));
    }

    #[test]
    fn test_ragged_row_is_error() {
        let node = IncludeNode::from_source("wells.dat", "WELLSPEC P\nIW JW L\n1 2\n");
        match WellsFile::from_node(&node) {
            Err(DeckError::Extract(ExtractError::Table { line, .. })) => assert_eq!(line, 2),
            other => panic!("expected a table error, got {other:?}"),
        }
    }

    #[test]
    fn test_unmodeled_keyword_ends_block() {
        let text = "\
WELLSPEC P1
IW JW L RADW
1 1 1 0.25
1 1 2 0.25
ACTIVATE
 P1
ENDACTIVATE
WELLSPEC P2
IW JW L RADW
2 2 1 NA
";
        let (node, wells) = load(text);
        assert_eq!(wells.well("P1").unwrap().completions.len(), 2);
        assert_eq!(wells.locations.get("P1").unwrap().len(), 4);
        assert_eq!(wells.well("P2").unwrap().completions[0].cells[3], Cell::Null);
        assert!(wells.warnings.is_empty());
        assert_eq!(render(&node), text);
    }

    #[test]
    fn test_repeated_well_gets_own_record() {
        let (_, wells) = load("WELLSPEC P\nIW JW L\n1 1 1\nTIME 2\nWELLSPEC P\nIW JW L\n1 1 2\n");
        assert_eq!(wells.wells[1].record, "P@2");
        assert!(wells.locations.get("P@2#1").is_some());
    }

    #[test]
    fn test_missing_name_warns() {
        let (_, wells) = load("WELLSPEC\nIW JW L\n");
        assert!(wells.wells.is_empty());
        assert_eq!(wells.warnings.len(), 1);
    }
}
