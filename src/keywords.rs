//! Declarative description of a domain's keywords, consumed by the extraction engine.
//!
//! Every domain (PVT, rock, relative permeability, ...) is described by an immutable
//! [`KeywordTable`] built from [`KeyDef`]s. The engine in [`crate::parser`] interprets these
//! tables; no domain has a hand-written parsing loop.

/// How the value(s) following a keyword are read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeySpec {
    /// Present or absent, no value.
    Flag,
    Float,
    Int,
    /// A word from an allowed set.
    Enum(&'static [&'static str]),
    /// The remainder of the line, space-joined.
    Array,
    /// Values read while they belong to the continuation set.
    List(&'static [&'static str]),
    Table(TableRule),
    /// One table per run-time value of `subkey`, e.g. one unsaturated table per `PSAT`.
    KeyedTables {
        subkey: &'static str,
        rule: TableRule,
    },
    /// Opens a scope that continues over the following lines while their leading token
    /// belongs to the scope.
    Section(&'static [KeyDef]),
    /// Sub-options read from the same line while they belong to the option set.
    Options(&'static [KeyDef]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyDef {
    pub name: &'static str,
    pub spec: KeySpec,
}

impl KeyDef {
    pub const fn new(name: &'static str, spec: KeySpec) -> Self {
        KeyDef { name, spec }
    }
}

pub const fn flag(name: &'static str) -> KeyDef {
    KeyDef::new(name, KeySpec::Flag)
}

pub const fn float(name: &'static str) -> KeyDef {
    KeyDef::new(name, KeySpec::Float)
}

pub const fn int(name: &'static str) -> KeyDef {
    KeyDef::new(name, KeySpec::Int)
}

pub const fn one_of(name: &'static str, allowed: &'static [&'static str]) -> KeyDef {
    KeyDef::new(name, KeySpec::Enum(allowed))
}

pub const fn array(name: &'static str) -> KeyDef {
    KeyDef::new(name, KeySpec::Array)
}

pub const fn list(name: &'static str, continuation: &'static [&'static str]) -> KeyDef {
    KeyDef::new(name, KeySpec::List(continuation))
}

pub const fn table(name: &'static str, rule: TableRule) -> KeyDef {
    KeyDef::new(name, KeySpec::Table(rule))
}

pub const fn keyed_tables(name: &'static str, subkey: &'static str, rule: TableRule) -> KeyDef {
    KeyDef::new(name, KeySpec::KeyedTables { subkey, rule })
}

pub const fn section(name: &'static str, keys: &'static [KeyDef]) -> KeyDef {
    KeyDef::new(name, KeySpec::Section(keys))
}

pub const fn options(name: &'static str, keys: &'static [KeyDef]) -> KeyDef {
    KeyDef::new(name, KeySpec::Options(keys))
}

/// Where a table's column names come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderRule {
    /// The next non-blank line holds the column names.
    Explicit,
    /// The keyword line itself is the header; the keyword is the first column.
    OnKeyLine,
    /// No header line; columns are named by convention.
    Positional(&'static [&'static str]),
    /// Like `OnKeyLine`, but the header's last name `repeat` expands to `repeat0..repeatN-1`,
    /// N being the number of values given earlier for `count_from`.
    Expanded {
        repeat: &'static str,
        count_from: &'static str,
    },
}

/// What closes a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableEnd {
    /// Any known keyword of the domain.
    Keyword,
    /// A dedicated terminator such as `ENDREGDATA`.
    Explicit(&'static str),
}

/// The shape every data row of a table has. A row of another shape closes the table, so a
/// keyword the domain does not model passes through instead of being read as a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowShape {
    /// Rows start with a number.
    Numeric,
    /// Rows start with a name followed by at least one number, as in valve tables.
    Named,
    /// Any row; only the table end closes the table.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRule {
    pub header: HeaderRule,
    pub end: TableEnd,
    pub rows: RowShape,
}

impl TableRule {
    pub const fn headed() -> Self {
        TableRule {
            header: HeaderRule::Explicit,
            end: TableEnd::Keyword,
            rows: RowShape::Numeric,
        }
    }

    pub const fn key_line() -> Self {
        TableRule {
            header: HeaderRule::OnKeyLine,
            end: TableEnd::Keyword,
            rows: RowShape::Numeric,
        }
    }

    pub const fn positional(columns: &'static [&'static str]) -> Self {
        TableRule {
            header: HeaderRule::Positional(columns),
            end: TableEnd::Keyword,
            rows: RowShape::Numeric,
        }
    }

    pub const fn expanded(repeat: &'static str, count_from: &'static str) -> Self {
        TableRule {
            header: HeaderRule::Expanded { repeat, count_from },
            end: TableEnd::Keyword,
            rows: RowShape::Numeric,
        }
    }

    pub const fn terminated(end: &'static str) -> Self {
        TableRule {
            header: HeaderRule::Explicit,
            end: TableEnd::Explicit(end),
            rows: RowShape::Text,
        }
    }

    pub const fn with_named_rows(self) -> Self {
        TableRule {
            rows: RowShape::Named,
            ..self
        }
    }
}

/// The keyword vocabulary of one domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordTable {
    pub name: &'static str,
    pub keys: &'static [KeyDef],
    /// Further words that count as keywords of this domain (and so close open tables and
    /// sections) without being extracted.
    pub closing: &'static [&'static str],
}

impl KeywordTable {
    pub fn lookup(&self, word: &str) -> Option<&'static KeyDef> {
        find_key(self.keys, word)
    }

    /// Known keywords are the extracted keys, the closing set and explicit `END` markers.
    pub fn is_known(&self, word: &str) -> bool {
        self.lookup(word).is_some()
            || self.closing.iter().any(|c| c.eq_ignore_ascii_case(word))
            || self.keys.iter().any(|k| match k.spec {
                KeySpec::Table(rule) | KeySpec::KeyedTables { rule, .. } => {
                    matches!(rule.end, TableEnd::Explicit(end) if end.eq_ignore_ascii_case(word))
                }
                _ => false,
            })
    }
}

pub fn find_key(keys: &'static [KeyDef], word: &str) -> Option<&'static KeyDef> {
    keys.iter().find(|k| k.name.eq_ignore_ascii_case(word))
}

/// The scope-closing rule shared by every scoped section: a word stays inside a scope if it
/// names one of the scope's keys or, recursively, one of their sub-options.
pub fn in_scope(keys: &[KeyDef], word: &str) -> bool {
    keys.iter().any(|k| {
        k.name.eq_ignore_ascii_case(word)
            || match k.spec {
                KeySpec::Options(sub) | KeySpec::Section(sub) => in_scope(sub, word),
                KeySpec::Enum(allowed) | KeySpec::List(allowed) => {
                    allowed.iter().any(|a| a.eq_ignore_ascii_case(word))
                }
                _ => false,
            }
    })
}
