//! The keyword-table extraction engine.
//!
//! One forward pass over a flattened line sequence, driven entirely by a domain's
//! [`KeywordTable`]. Comments are stripped and `>` continuations joined up front; the engine
//! then walks the words of the resulting logical lines with a cursor, the way a recursive
//! descent parser walks tokens. Words that name no key are inert and skipped, so keywords the
//! engine does not model never stop a parse.

use crate::error::{ExtractError, TableError, Warning};
use crate::keywords::{
    find_key, in_scope, HeaderRule, KeyDef, KeySpec, KeywordTable, RowShape, TableEnd, TableRule,
};
use crate::lexer::{join_continuations, values, CommentStripper};
use crate::property::{PropertyBag, PropertyValue};
use crate::source::SourceLine;
use crate::table::{build_table, Cell, Table, TableSpec};
use crate::utils::{is_numeric, parse_float, parse_int, word_span};
use miette::NamedSource;

/// What the engine found in one method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub properties: PropertyBag,
    /// Every table read, in the order they appear.
    pub tables: Vec<TableSpec>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
struct Word {
    text: String,
    /// Index into the logical lines.
    line: usize,
    /// First word of its logical line.
    leading: bool,
}

#[derive(Debug)]
struct Row {
    text: String,
    /// First physical line of this logical line.
    first: usize,
    words: Vec<String>,
}

/// Where the cursor currently reads keys.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Method,
    /// Continues over following lines while their leading word belongs to the section.
    Section(&'static str),
    /// Limited to one logical line.
    Options(usize),
}

pub struct Extractor<'a> {
    table: &'a KeywordTable,
    lines: &'a [SourceLine],
    rows: Vec<Row>,
    words: Vec<Word>,
    // Index of the first word of each row, plus one past the last word
    row_start: Vec<usize>,
    position: usize,
    last_line: usize,
    scopes: Vec<&'static [KeyDef]>,
    keep_comments: bool,
    tables: Vec<TableSpec>,
    warnings: Vec<Warning>,
}

impl<'a> Extractor<'a> {
    pub fn new(table: &'a KeywordTable, lines: &'a [SourceLine]) -> Self {
        let mut stripper = CommentStripper::new();
        let stripped: Vec<String> = lines.iter().map(|l| stripper.strip(l.text())).collect();
        let rows: Vec<Row> = join_continuations(&stripped)
            .into_iter()
            .map(|logical| Row {
                words: values(&logical.text),
                text: logical.text,
                first: logical.first,
            })
            .collect();

        let mut words = Vec::new();
        let mut row_start = Vec::with_capacity(rows.len() + 1);
        for (line, row) in rows.iter().enumerate() {
            row_start.push(words.len());
            for (n, text) in row.words.iter().enumerate() {
                words.push(Word {
                    text: text.clone(),
                    line,
                    leading: n == 0,
                });
            }
        }
        row_start.push(words.len());

        Extractor {
            table,
            lines,
            rows,
            words,
            row_start,
            position: 0,
            last_line: 0,
            scopes: Vec::new(),
            keep_comments: false,
            tables: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Keep inline comments of table rows in a `COMMENT` column.
    pub fn keep_table_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    pub fn extract(mut self) -> Result<Extraction, ExtractError> {
        let mut properties = PropertyBag::new();
        self.read_keys(self.table.keys, &mut properties, Scope::Method)?;
        log::debug!(
            "{} method: {} keys, {} tables, {} warnings",
            self.table.name,
            properties.len(),
            self.tables.len(),
            self.warnings.len()
        );
        Ok(Extraction {
            properties,
            tables: self.tables,
            warnings: self.warnings,
        })
    }

    // === Key dispatch ===

    fn read_keys(
        &mut self,
        keys: &'static [KeyDef],
        bag: &mut PropertyBag,
        scope: Scope,
    ) -> Result<(), ExtractError> {
        self.scopes.push(keys);
        let mut last_options: Option<(&'static str, &'static [KeyDef])> = None;

        while let Some(word) = self.peek().cloned() {
            match scope {
                Scope::Options(line) if word.line != line => break,
                Scope::Section(name) if word.leading => {
                    if word.text.eq_ignore_ascii_case(name) {
                        self.advance();
                        continue;
                    }
                    // Unknown leading words are inert; only a keyword of an outer scope closes.
                    if !in_scope(keys, &word.text) && self.is_keyword(&word.text) {
                        break;
                    }
                }
                _ => {}
            }

            if let Some(def) = find_key(keys, &word.text) {
                self.advance();
                if let KeySpec::Options(sub) = def.spec {
                    last_options = Some((def.name, sub));
                }
                self.read_value(def, bag)?;
                continue;
            }

            match scope {
                Scope::Options(_) => break,
                Scope::Section(_) => match last_options {
                    // A line of sub-options continues the last primary keyword
                    Some((name, sub)) if in_scope(sub, &word.text) => {
                        self.read_options(name, sub, bag, word.line)?;
                    }
                    _ => self.skip_inert(),
                },
                Scope::Method => self.skip_inert(),
            }
        }

        self.scopes.pop();
        Ok(())
    }

    fn read_value(
        &mut self,
        def: &'static KeyDef,
        bag: &mut PropertyBag,
    ) -> Result<(), ExtractError> {
        log::trace!("{} {} at line {}", self.table.name, def.name, self.last_line);
        match def.spec {
            KeySpec::Flag => bag.insert(def.name, PropertyValue::Flag),
            KeySpec::Float => {
                if let Some(word) = self.take_value(def.name) {
                    let value = parse_float(&word.text)
                        .ok_or_else(|| self.malformed(def.name, &word, "number"))?;
                    bag.insert(def.name, PropertyValue::Float(value));
                }
            }
            KeySpec::Int => {
                if let Some(word) = self.take_value(def.name) {
                    let value = parse_int(&word.text)
                        .ok_or_else(|| self.malformed(def.name, &word, "integer"))?;
                    bag.insert(def.name, PropertyValue::Int(value));
                }
            }
            KeySpec::Enum(allowed) => self.read_enum(def.name, allowed, bag),
            KeySpec::Array => self.read_array(def.name, bag),
            KeySpec::List(continuation) => self.read_list(def.name, continuation, bag),
            KeySpec::Table(rule) => {
                if let Some(table) = self.read_table(def.name, rule, None, bag)? {
                    bag.insert(def.name, PropertyValue::Table(table));
                }
            }
            KeySpec::KeyedTables { subkey, rule } => {
                self.read_keyed_table(def.name, subkey, rule, bag)?
            }
            KeySpec::Section(keys) => {
                let mut section = bag.get_bag(def.name).cloned().unwrap_or_default();
                self.read_keys(keys, &mut section, Scope::Section(def.name))?;
                bag.insert(def.name, PropertyValue::Bag(section));
            }
            KeySpec::Options(sub) => {
                let line = self.last_line;
                self.read_options(def.name, sub, bag, line)?;
            }
        }
        Ok(())
    }

    /// Reads sub-options of `name` from `line`, merging into any earlier ones.
    fn read_options(
        &mut self,
        name: &'static str,
        sub: &'static [KeyDef],
        bag: &mut PropertyBag,
        line: usize,
    ) -> Result<(), ExtractError> {
        let mut options = bag.get_bag(name).cloned().unwrap_or_default();
        self.read_keys(sub, &mut options, Scope::Options(line))?;
        bag.insert(name, PropertyValue::Bag(options));
        Ok(())
    }

    fn read_enum(&mut self, name: &str, allowed: &[&str], bag: &mut PropertyBag) {
        let Some(word) = self.peek().cloned() else {
            self.warn(self.last_line, format!("{name} expects a value but the input ends"));
            return;
        };
        if let Some(value) = allowed.iter().find(|a| a.eq_ignore_ascii_case(&word.text)) {
            self.advance();
            bag.insert(name, PropertyValue::Text(value.to_string()));
        } else if self.is_keyword(&word.text) {
            self.warn(
                word.line,
                format!("{name} expects a value but is followed by {}", word.text),
            );
        } else {
            self.warn(
                word.line,
                format!(
                    "'{}' is not a valid {name}; expected one of {}",
                    word.text,
                    allowed.join(", ")
                ),
            );
        }
    }

    /// The rest of the key's line, space-joined. A repeated key appends.
    fn read_array(&mut self, name: &str, bag: &mut PropertyBag) {
        let line = self.last_line;
        let mut items = Vec::new();
        while let Some(word) = self.peek().filter(|w| w.line == line) {
            items.push(word.text.clone());
            self.advance();
        }
        if items.is_empty() {
            self.warn(line, format!("{name} has no values"));
            return;
        }
        let mut text = items.join(" ");
        if let Some(PropertyValue::Text(earlier)) = bag.get(name) {
            text = format!("{earlier} {text}");
        }
        bag.insert(name, PropertyValue::Text(text));
    }

    fn read_list(&mut self, name: &str, continuation: &[&str], bag: &mut PropertyBag) {
        let line = self.last_line;
        let mut items = Vec::new();
        while let Some(word) = self.peek().filter(|w| {
            w.line == line && continuation.iter().any(|c| c.eq_ignore_ascii_case(&w.text))
        }) {
            items.push(word.text.to_ascii_uppercase());
            self.advance();
        }
        if items.is_empty() {
            self.warn(line, format!("{name} lists no values"));
            return;
        }
        bag.insert(name, PropertyValue::List(items));
    }

    // === Tables ===

    fn read_keyed_table(
        &mut self,
        name: &'static str,
        subkey: &str,
        rule: TableRule,
        bag: &mut PropertyBag,
    ) -> Result<(), ExtractError> {
        let has_subkey = self
            .peek()
            .is_some_and(|w| w.text.eq_ignore_ascii_case(subkey));
        if !has_subkey {
            self.warn(self.last_line, format!("{name} without {subkey}; table skipped"));
            return Ok(());
        }
        self.advance();
        let Some(owner) = self.take_value(subkey) else {
            return Ok(());
        };
        if !is_numeric(&owner.text) {
            return Err(self.malformed(subkey, &owner, "number"));
        }
        if let Some(table) = self.read_table(name, rule, Some(owner.text.clone()), bag)? {
            let mut tables = bag.get_bag(name).cloned().unwrap_or_default();
            tables.insert(owner.text, PropertyValue::Table(table));
            bag.insert(name, PropertyValue::Bag(tables));
        }
        Ok(())
    }

    /// Reads the table introduced by the key just consumed, and leaves the cursor on the line
    /// that closed it.
    fn read_table(
        &mut self,
        name: &str,
        rule: TableRule,
        owner: Option<String>,
        bag: &PropertyBag,
    ) -> Result<Option<Table>, ExtractError> {
        let key_line = self.last_line;
        let (header, data_first) = match rule.header {
            HeaderRule::Explicit => {
                self.skip_line(key_line);
                let Some(header_line) = self.next_row(key_line + 1) else {
                    self.warn(key_line, format!("{name} table has no header"));
                    return Ok(None);
                };
                let header = self.rows[header_line].words.clone();
                if self.is_keyword(&header[0]) {
                    self.warn(key_line, format!("{name} table has no header"));
                    return Ok(None);
                }
                (header, header_line + 1)
            }
            HeaderRule::OnKeyLine => (self.key_line_header(name, key_line), key_line + 1),
            HeaderRule::Expanded { repeat, count_from } => {
                let mut header = self.key_line_header(name, key_line);
                self.expand_header(&mut header, repeat, count_from, bag, key_line);
                (header, key_line + 1)
            }
            HeaderRule::Positional(names) => {
                self.skip_line(key_line);
                (names.iter().map(|n| n.to_string()).collect(), key_line + 1)
            }
        };

        let (end_line, resume) = self.find_table_end(name, rule, data_first, key_line);
        let start = self.physical(data_first);
        let end = self.physical(end_line);

        let mut table = build_table(&self.lines[start..end], false, self.keep_comments)
            .map_err(|e| self.table_error(name, e, start, key_line))?;
        table
            .relabel(&header)
            .map_err(|e| self.table_error(name, e, start, key_line))?;

        log::debug!(
            "{} table {name}: {} rows on lines {start}..{end}",
            self.table.name,
            table.row_count()
        );
        self.tables.push(TableSpec {
            keyword: name.to_string(),
            columns: table.column_names().map(str::to_string).collect(),
            start,
            end,
            owner,
        });
        self.position = self.row_start[resume];
        Ok(Some(table))
    }

    /// Returns the row closing the table and the row reading resumes at.
    fn find_table_end(
        &mut self,
        name: &str,
        rule: TableRule,
        data_first: usize,
        key_line: usize,
    ) -> (usize, usize) {
        for line in data_first..self.rows.len() {
            let words = &self.rows[line].words;
            let Some(first) = words.first() else {
                continue;
            };
            match rule.end {
                TableEnd::Explicit(end) if first.eq_ignore_ascii_case(end) => {
                    return (line, line + 1)
                }
                TableEnd::Explicit(_) => {}
                TableEnd::Keyword => {
                    let fits = match rule.rows {
                        RowShape::Numeric => is_data(first),
                        RowShape::Named => words.get(1).is_some_and(|w| is_data(w)),
                        RowShape::Text => true,
                    };
                    if self.is_keyword(first) || !fits {
                        return (line, line);
                    }
                }
            }
        }
        if let TableEnd::Explicit(end) = rule.end {
            self.warn(key_line, format!("{name} table is not closed by {end}"));
        }
        (self.rows.len(), self.rows.len())
    }

    fn key_line_header(&mut self, name: &str, key_line: usize) -> Vec<String> {
        let mut header = vec![name.to_string()];
        while let Some(word) = self.peek().filter(|w| w.line == key_line) {
            header.push(word.text.to_ascii_uppercase());
            self.advance();
        }
        header
    }

    fn expand_header(
        &mut self,
        header: &mut Vec<String>,
        repeat: &str,
        count_from: &str,
        bag: &PropertyBag,
        key_line: usize,
    ) {
        if !header.last().is_some_and(|h| h.eq_ignore_ascii_case(repeat)) {
            return;
        }
        let count = match bag.get(count_from) {
            Some(PropertyValue::Text(values)) => values.split_whitespace().count(),
            Some(PropertyValue::List(values)) => values.len(),
            Some(PropertyValue::Float(_)) | Some(PropertyValue::Int(_)) => 1,
            _ => 0,
        };
        if count == 0 {
            self.warn(
                key_line,
                format!("no {count_from} values declared; {repeat} column left as is"),
            );
            return;
        }
        header.pop();
        header.extend((0..count).map(|i| format!("{repeat}{i}")));
    }

    fn table_error(
        &self,
        name: &str,
        error: TableError,
        start: usize,
        key_line: usize,
    ) -> ExtractError {
        let at = match &error {
            TableError::RaggedTable { row, .. } => {
                &self.lines[(start + row).min(self.lines.len() - 1)]
            }
            TableError::DuplicateColumn { .. } => &self.lines[self.rows[key_line].first],
        };
        ExtractError::Table {
            key: name.to_string(),
            file: at.path().to_path_buf(),
            line: at.index(),
            source: error,
        }
    }

    // === Cursor helpers ===

    fn peek(&self) -> Option<&Word> {
        self.words.get(self.position)
    }

    fn advance(&mut self) {
        if let Some(word) = self.words.get(self.position) {
            self.last_line = word.line;
            self.position += 1;
        }
    }

    fn skip_inert(&mut self) {
        if let Some(word) = self.peek() {
            log::trace!("inert word {} at line {}", word.text, word.line);
        }
        self.advance();
    }

    fn skip_line(&mut self, line: usize) {
        while self.peek().is_some_and(|w| w.line == line) {
            self.advance();
        }
    }

    /// The value for `key`: the next word, unless the input ends or the next word is a keyword.
    fn take_value(&mut self, key: &str) -> Option<Word> {
        match self.peek().cloned() {
            Some(word) if !self.is_keyword(&word.text) => {
                self.advance();
                Some(word)
            }
            Some(word) => {
                self.warn(
                    word.line,
                    format!("{key} expects a value but is followed by {}", word.text),
                );
                None
            }
            None => {
                self.warn(self.last_line, format!("{key} expects a value but the input ends"));
                None
            }
        }
    }

    /// Known keywords of the domain, and the keys of every open scope.
    fn is_keyword(&self, word: &str) -> bool {
        self.table.is_known(word) || self.scopes.iter().any(|keys| find_key(keys, word).is_some())
    }

    fn next_row(&self, from: usize) -> Option<usize> {
        (from..self.rows.len()).find(|&line| !self.rows[line].words.is_empty())
    }

    /// First physical line of a logical line, or the end of input.
    fn physical(&self, line: usize) -> usize {
        self.rows.get(line).map_or(self.lines.len(), |row| row.first)
    }

    fn malformed(&self, key: &str, word: &Word, expected: &'static str) -> ExtractError {
        let row = &self.rows[word.line];
        let line = &self.lines[row.first];
        ExtractError::MalformedValue {
            key: key.to_string(),
            value: word.text.clone(),
            file: line.path().to_path_buf(),
            line: line.index(),
            src: NamedSource::new(line.path().display().to_string(), row.text.clone()),
            span: word_span(&row.text, &word.text),
            expected,
        }
    }

    fn warn(&mut self, line: usize, message: String) {
        let warning = match self.rows.get(line).map(|row| &self.lines[row.first]) {
            Some(at) => Warning::emit(at.path(), Some(at.index()), message),
            None => Warning::emit(self.table.name, None, message),
        };
        self.warnings.push(warning);
    }
}

/// A number or a null marker such as `NA`.
fn is_data(word: &str) -> bool {
    is_numeric(word) || Cell::parse(word).is_null()
}

/// Runs the engine for `table` over `lines`.
pub fn extract(
    table: &KeywordTable,
    lines: &[SourceLine],
    keep_table_comments: bool,
) -> Result<Extraction, ExtractError> {
    Extractor::new(table, lines)
        .keep_table_comments(keep_table_comments)
        .extract()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::Domain;
    use crate::source::split_lines;
    use miette::Report;
    use std::path::Path;
    use std::sync::Arc;

    fn lines(text: &str) -> Vec<SourceLine> {
        split_lines(text, &Arc::from(Path::new("method.dat")))
    }

    fn extract_ok(domain: Domain, text: &str) -> Extraction {
        match extract(domain.keyword_table(), &lines(text), false) {
            Ok(extraction) => extraction,
            Err(err) => panic!("{:?}", Report::new(err)),
        }
    }

    #[test]
    fn test_rock_scalars() {
        let out = extract_ok(Domain::Rock, "PREF 2000.0\nCR 1E-6\nKP 0.003\n");
        assert_eq!(out.properties.keys().collect::<Vec<_>>(), vec!["PREF", "CR", "KP"]);
        assert_eq!(out.properties.get_f64("PREF"), Some(2000.0));
        assert_eq!(out.properties.get_f64("CR"), Some(0.000001));
        assert_eq!(out.properties.get_f64("KP"), Some(0.003));
        assert!(out.tables.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_several_keys_on_one_line_and_unknown_words() {
        let out = extract_ok(Domain::Water, "FOO 12 BAR\nPREF 3000 DENW 62.4 ! fresh\nBW 1.01\n");
        assert_eq!(out.properties.keys().collect::<Vec<_>>(), vec!["PREF", "DENW", "BW"]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_value_on_next_line() {
        let out = extract_ok(Domain::Rock, "PREF\n  2000\n");
        assert_eq!(out.properties.get_f64("PREF"), Some(2000.0));
    }

    #[test]
    fn test_missing_value_is_a_warning() {
        let out = extract_ok(Domain::Rock, "PREF\nCR 1E-6\nKP\n");
        assert!(out.properties.get("PREF").is_none());
        assert!(out.properties.get("KP").is_none());
        assert_eq!(out.properties.get_f64("CR"), Some(0.000001));
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.warnings[0].line, Some(1));
    }

    #[test]
    fn test_malformed_value_names_key_and_line() {
        let text = "PREF 2000\nCR 1.0E-6x\n";
        let result = extract(Domain::Rock.keyword_table(), &lines(text), false);
        match result {
            Err(ExtractError::MalformedValue {
                key,
                value,
                line,
                expected,
                ..
            }) => {
                assert_eq!(key, "CR");
                assert_eq!(value, "1.0E-6x");
                assert_eq!(line, 1);
                assert_eq!(expected, "number");
            }
            other => panic!("Expected MalformedValue, got {other:?}"),
        }
    }

    #[test]
    fn test_int_key_rejects_decimal() {
        let result = extract(Domain::Runcontrol.keyword_table(), &lines("MAXNEWTONS 3.5\n"), false);
        assert!(matches!(
            result,
            Err(ExtractError::MalformedValue { expected: "integer", .. })
        ));
    }

    #[test]
    fn test_headed_table_closes_on_known_keyword() {
        let text = "\
BLACKOIL
SATURATED
PRES  RS    BO     VO  ! header
1000  200   1.20   1.1
2000  400   1.30   0.9

API 35
";
        let out = extract_ok(Domain::Pvt, text);
        let table = out.properties.get_table("SATURATED").unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["PRES", "RS", "BO", "VO"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(out.properties.get_f64("API"), Some(35.0));
        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.tables[0].start, 3);
        assert_eq!(out.tables[0].end, 6);
    }

    #[test]
    fn test_table_slice_parses_like_in_place() {
        let text = "CMT\nP KPMULT\n1000 0.98\n! mid-table comment\n3000 1.00\nKP 0.003\n";
        let source = lines(text);
        let out = extract(Domain::Rock.keyword_table(), &source, false).unwrap();
        let spec = &out.tables[0];
        let in_place = out.properties.get_table("CMT").unwrap();

        // The header line sits just before the recorded range
        let sliced = build_table(&source[spec.start - 1..spec.end], true, false).unwrap();
        assert_eq!(
            sliced.column_names().collect::<Vec<_>>(),
            in_place.column_names().collect::<Vec<_>>()
        );
        assert_eq!(sliced.row_count(), in_place.row_count());
        assert_eq!(&sliced, in_place);
    }

    #[test]
    fn test_structural_cue_closes_numeric_table() {
        let text = "SWT\nSW KRW KROW\n0.2 0.0 1.0\n0.8 0.6 0.0\nSOMETHING_NEW 1\n";
        let out = extract_ok(Domain::Relperm, text);
        assert_eq!(out.properties.get_table("SWT").unwrap().row_count(), 2);
        assert_eq!(out.tables[0].end, 4);
    }

    #[test]
    fn test_ragged_row_is_a_table_error() {
        let text = "SWT\nSW KRW KROW\n0.2 0.0 1.0\n0.8 0.6\n";
        match extract(Domain::Relperm.keyword_table(), &lines(text), false) {
            Err(ExtractError::Table { key, line, source, .. }) => {
                assert_eq!(key, "SWT");
                assert_eq!(line, 3);
                assert!(matches!(source, TableError::RaggedTable { expected: 3, found: 2, .. }));
            }
            other => panic!("Expected a table error, got {other:?}"),
        }
    }

    #[test]
    fn test_hysteresis_section_closes_on_foreign_keyword() {
        let text = "\
HYSTERESIS
KRG LINEAR MAXTRAP 0.2 NOMOD
KRW USER
TOLREV 0.05
SWT
SW KRW KROW
0.2 0.0 1.0
0.8 0.6 0.0
";
        let out = extract_ok(Domain::Relperm, text);
        let hysteresis = out.properties.get_bag("HYSTERESIS").unwrap();
        assert_eq!(hysteresis.keys().collect::<Vec<_>>(), vec!["KRG", "KRW", "TOLREV"]);
        let krg = hysteresis.get_bag("KRG").unwrap();
        assert!(krg.get("LINEAR").unwrap().is_flag());
        assert_eq!(krg.get_f64("MAXTRAP"), Some(0.2));
        assert!(krg.get("NOMOD").unwrap().is_flag());
        assert!(hysteresis.get_bag("KRW").unwrap().get("USER").unwrap().is_flag());
        assert_eq!(hysteresis.get_f64("TOLREV"), Some(0.05));
        assert!(hysteresis.get("SWT").is_none());
        assert_eq!(out.properties.get_table("SWT").unwrap().row_count(), 2);
    }

    #[test]
    fn test_unknown_word_inside_section_keeps_it_open() {
        let text = "HYSTERESIS\nKRW USER\nFUTUREOPT 1\nTOLREV 0.05\nNOCHK\n";
        let out = extract_ok(Domain::Relperm, text);
        let hysteresis = out.properties.get_bag("HYSTERESIS").unwrap();
        assert_eq!(hysteresis.keys().collect::<Vec<_>>(), vec!["KRW", "TOLREV"]);
        assert_eq!(hysteresis.get_f64("TOLREV"), Some(0.05));
        assert!(out.properties.get("NOCHK").unwrap().is_flag());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_valve_table_closes_on_unmodeled_keyword() {
        let text = "VALVE\nNAME SETTING\nV1 0.5\nV2 NA\nFUTUREKEY\nICD\nNAME AREA\nD1 0.01\n";
        let out = extract_ok(Domain::Valve, text);
        let valves = out.properties.get_table("VALVE").unwrap();
        assert_eq!(valves.row_count(), 2);
        assert_eq!(valves.column("NAME").unwrap()[1], Cell::Text("V2".to_string()));
        assert_eq!(out.tables[0].end, 4);
        assert_eq!(out.properties.get_table("ICD").unwrap().row_count(), 1);
    }

    #[test]
    fn test_nested_options_and_continued_primary() {
        let text = "\
HYSTERESIS KROW KILLOUGH MAXTRAP 0.1 NOMOD
   PCWO MAXSW 0.9
   ETA 0.1
NOCHK
";
        let out = extract_ok(Domain::Relperm, text);
        let hysteresis = out.properties.get_bag("HYSTERESIS").unwrap();
        let killough = hysteresis.get_bag("KROW").unwrap().get_bag("KILLOUGH").unwrap();
        assert_eq!(killough.get_f64("MAXTRAP"), Some(0.1));
        assert!(killough.get("NOMOD").is_some());
        let pcwo = hysteresis.get_bag("PCWO").unwrap();
        assert_eq!(pcwo.get_f64("MAXSW"), Some(0.9));
        assert_eq!(pcwo.get_f64("ETA"), Some(0.1));
        assert!(out.properties.get("NOCHK").unwrap().is_flag());
    }

    #[test]
    fn test_watinj_endpoints() {
        let out = extract_ok(Domain::Relperm, "WATINJ\n SWL 0.15 SWR 0.2\n SORW 0.25\nSTONE2\n");
        let watinj = out.properties.get_bag("WATINJ").unwrap();
        assert_eq!(watinj.len(), 3);
        assert_eq!(watinj.get_f64("SORW"), Some(0.25));
        assert!(out.properties.get("STONE2").is_some());
    }

    #[test]
    fn test_keyed_tables_in_first_seen_order() {
        let text = "\
IRREVERSIBLE
WIRCT SWINIT 0.3
SW  KRW
0.3 0.0
0.9 0.5
WIRCT SWINIT 0.2
SW  KRW
0.2 0.0
";
        let out = extract_ok(Domain::Rock, text);
        let wirct = out.properties.get_bag("WIRCT").unwrap();
        assert_eq!(wirct.keys().collect::<Vec<_>>(), vec!["0.3", "0.2"]);
        assert_eq!(wirct.get_table("0.3").unwrap().row_count(), 2);
        assert_eq!(out.tables[1].owner.as_deref(), Some("0.2"));
        assert_eq!(out.properties.table_count(), 2);
    }

    #[test]
    fn test_explicit_end_table() {
        let text = "REGDATA\nNUMBER NAME\n1 NORTH\n2 SOUTH\nENDREGDATA\nPSTD 14.7\n";
        let out = extract_ok(Domain::Options, text);
        let regions = out.properties.get_table("REGDATA").unwrap();
        assert_eq!(regions.row_count(), 2);
        assert_eq!(regions.column("NAME").unwrap()[1], Cell::Text("SOUTH".to_string()));
        assert_eq!(out.properties.get_f64("PSTD"), Some(14.7));
        assert_eq!(out.tables[0].end, 4);
    }

    #[test]
    fn test_unterminated_explicit_table_warns() {
        let out = extract_ok(Domain::Options, "REGDATA\nNUMBER NAME\n1 NORTH\n");
        assert_eq!(out.properties.get_table("REGDATA").unwrap().row_count(), 1);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_hydraulics_expands_bhp_columns() {
        let text = "\
QOIL 100 1000
WCUT 0 0.5
THP 200 400 600
IQOIL IWCUT BHP
1 1 1500 1700 1900
2 2 1600 1800 2000
";
        let out = extract_ok(Domain::Hydraulics, text);
        assert_eq!(
            out.properties.get("THP").and_then(PropertyValue::as_str),
            Some("200 400 600")
        );
        let table = out.properties.get_table("IQOIL").unwrap();
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["IQOIL", "IWCUT", "BHP0", "BHP1", "BHP2"]
        );
        assert_eq!(table.column("BHP2").unwrap()[1], Cell::Number(2000.0));
    }

    #[test]
    fn test_positional_table() {
        let out = extract_ok(Domain::Aquifer, "CARTERTRACY\nITDPD\n0.1 0.5\n1.0 0.9\nVISC 0.5\n");
        let table = out.properties.get_table("ITDPD").unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["TD", "PD"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(out.properties.get_f64("VISC"), Some(0.5));
    }

    #[test]
    fn test_key_line_header() {
        let text = "WATERMETHOD 2\nSTAGE TEMP PRES\n1 60 14.7\n2 80 100\n";
        let out = extract_ok(Domain::Separator, text);
        assert_eq!(out.properties.get("WATERMETHOD").and_then(PropertyValue::as_i64), Some(2));
        let table = out.properties.get_table("STAGE").unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["STAGE", "TEMP", "PRES"]);
    }

    #[test]
    fn test_list_reads_continuation_set() {
        let out = extract_ok(Domain::Equil, "PINIT 3000\nOVERREAD sw PRESSURE\nDINIT 5000\n");
        assert_eq!(
            out.properties.get("OVERREAD").and_then(PropertyValue::as_list),
            Some(&["SW".to_string(), "PRESSURE".to_string()][..])
        );
        assert_eq!(out.properties.get_f64("DINIT"), Some(5000.0));
    }

    #[test]
    fn test_runcontrol_options_merge_and_enum() {
        let text = "\
METHOD IMPLICIT
DT AUTO 0.1
DT MAX 60 MIN 0.01
SOLVER RESERVOIR ITERATIVE
METHOD EXPLICIT
START 01/01/2020
";
        let out = extract_ok(Domain::Runcontrol, text);
        assert_eq!(out.properties.get("METHOD").and_then(PropertyValue::as_str), Some("IMPLICIT"));
        let dt = out.properties.get_bag("DT").unwrap();
        assert_eq!(dt.keys().collect::<Vec<_>>(), vec!["AUTO", "MAX", "MIN"]);
        assert_eq!(out.properties.get_bag("SOLVER").unwrap().len(), 2);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].message.contains("EXPLICIT"));
        assert_eq!(
            out.properties.get("START").and_then(PropertyValue::as_str),
            Some("01/01/2020")
        );
    }

    #[test]
    fn test_continuation_lines_are_joined_first() {
        let out = extract_ok(Domain::Hydraulics, "THP 200 >\n  400\nDATUM 5000\n");
        assert_eq!(out.properties.get("THP").and_then(PropertyValue::as_str), Some("200 400"));
        assert_eq!(out.properties.get_f64("DATUM"), Some(5000.0));
    }

    #[test]
    fn test_commented_keywords_are_ignored() {
        let out = extract_ok(Domain::Rock, "! PREF 1000\n[ CR 5\n KP 9 ]\nPREF 2000\n");
        assert_eq!(out.properties.keys().collect::<Vec<_>>(), vec!["PREF"]);
        assert_eq!(out.properties.get_f64("PREF"), Some(2000.0));
    }

    #[test]
    fn test_keep_table_comments() {
        let text = "CMT\nP KPMULT\n1000 0.98 ! low\n";
        let out = extract(Domain::Rock.keyword_table(), &lines(text), true).unwrap();
        let table = out.properties.get_table("CMT").unwrap();
        assert_eq!(table.column("COMMENT").unwrap()[0], Cell::Text("low".to_string()));
    }
}
