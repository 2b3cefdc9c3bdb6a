//! Physical lines with stable identities, and the records that tie parsed objects back to them.

use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_LINE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a physical line. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct LineId(u64);

impl LineId {
    pub fn fresh() -> Self {
        LineId(NEXT_LINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The terminator a physical line carried in its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
    /// Final line of a file without a trailing newline.
    None,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::None => "",
        }
    }
}

/// One physical line. Immutable: an edit produces a new line with a new identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    id: LineId,
    text: String,
    ending: LineEnding,
    path: Arc<Path>,
    index: usize,
}

impl SourceLine {
    pub fn new(text: impl Into<String>, ending: LineEnding, path: Arc<Path>, index: usize) -> Self {
        SourceLine {
            id: LineId::fresh(),
            text: text.into(),
            ending,
            path,
            index,
        }
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    /// Text without its terminator.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ending(&self) -> LineEnding {
        self.ending
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn shared_path(&self) -> Arc<Path> {
        Arc::clone(&self.path)
    }

    /// 0-based index of the line in its file when it was created.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Text and terminator exactly as they appear in the file.
    pub fn raw(&self) -> String {
        format!("{}{}", self.text, self.ending.as_str())
    }
}

impl AsRef<str> for SourceLine {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Splits file content into lines, keeping each line's own terminator so that concatenating
/// `raw()` of the result reproduces `content` exactly.
pub fn split_lines(content: &str, path: &Arc<Path>) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut rest = content;
    let mut index = 0;
    while !rest.is_empty() {
        let (text, ending, consumed) = match rest.find('\n') {
            Some(nl) if nl > 0 && rest.as_bytes()[nl - 1] == b'\r' => {
                (&rest[..nl - 1], LineEnding::CrLf, nl + 1)
            }
            Some(nl) => (&rest[..nl], LineEnding::Lf, nl + 1),
            None => (rest, LineEnding::None, rest.len()),
        };
        lines.push(SourceLine::new(text, ending, Arc::clone(path), index));
        rest = &rest[consumed..];
        index += 1;
    }
    lines
}

/// The line identities one logical object (a well, a completion, a property method) was
/// derived from. The lines may live in several files.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectLocation {
    pub name: String,
    lines: IndexSet<LineId>,
}

impl ObjectLocation {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectLocation {
            name: name.into(),
            lines: IndexSet::new(),
        }
    }

    pub fn with_lines(name: impl Into<String>, lines: impl IntoIterator<Item = LineId>) -> Self {
        let mut location = ObjectLocation::new(name);
        location.lines.extend(lines);
        location
    }

    pub fn lines(&self) -> impl Iterator<Item = LineId> + '_ {
        self.lines.iter().copied()
    }

    pub fn contains(&self, id: LineId) -> bool {
        self.lines.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn push(&mut self, id: LineId) {
        self.lines.insert(id);
    }

    /// Inserts `ids` right after `anchor`, or at the end when the anchor is not owned.
    pub fn insert_after(&mut self, anchor: LineId, ids: &[LineId]) {
        let at = match self.lines.get_index_of(&anchor) {
            Some(position) => position + 1,
            None => self.lines.len(),
        };
        for (offset, id) in ids.iter().enumerate() {
            self.lines.shift_insert(at + offset, *id);
        }
    }

    pub fn remove(&mut self, id: LineId) -> bool {
        self.lines.shift_remove(&id)
    }

    pub fn replace(&mut self, old: LineId, new: LineId) -> bool {
        match self.lines.get_index_of(&old) {
            Some(position) => {
                self.lines.shift_remove_index(position);
                self.lines.shift_insert(position, new);
                true
            }
            None => false,
        }
    }
}

/// Registry of object locations keyed by object name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationIndex {
    objects: IndexMap<String, ObjectLocation>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: ObjectLocation) {
        self.objects.insert(location.name.clone(), location);
    }

    pub fn remove(&mut self, name: &str) -> Option<ObjectLocation> {
        self.objects.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ObjectLocation> {
        self.objects.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ObjectLocation> {
        self.objects.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectLocation> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Names of every object that owns `id`.
    pub fn owners_of(&self, id: LineId) -> Vec<&str> {
        self.objects
            .values()
            .filter(|location| location.contains(id))
            .map(|location| location.name.as_str())
            .collect()
    }

    pub(crate) fn forget_line(&mut self, id: LineId) {
        for location in self.objects.values_mut() {
            location.remove(id);
        }
    }

    pub(crate) fn replace_line(&mut self, old: LineId, new: LineId) {
        for location in self.objects.values_mut() {
            location.replace(old, new);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> Arc<Path> {
        Arc::from(PathBuf::from("deck.dat").as_path())
    }

    #[test]
    fn test_split_lines_is_lossless() {
        let content = "PREF 2000.0\r\nCR 1E-6\n\nKP 0.003";
        let lines = split_lines(content, &path());
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].ending(), LineEnding::CrLf);
        assert_eq!(lines[2].text(), "");
        assert_eq!(lines[3].ending(), LineEnding::None);
        let rebuilt: String = lines.iter().map(SourceLine::raw).collect();
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_line_ids_are_unique() {
        let a = split_lines("A\nB\n", &path());
        let b = split_lines("A\nB\n", &path());
        let mut ids: Vec<LineId> = a.iter().chain(b.iter()).map(SourceLine::id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_object_location_edits_keep_order() {
        let ids: Vec<LineId> = (0..3).map(|_| LineId::fresh()).collect();
        let mut location = ObjectLocation::with_lines("well", ids.clone());
        let added = LineId::fresh();
        location.insert_after(ids[0], &[added]);
        assert_eq!(location.lines().collect::<Vec<_>>(), vec![ids[0], added, ids[1], ids[2]]);

        let replacement = LineId::fresh();
        assert!(location.replace(ids[1], replacement));
        assert!(location.remove(ids[2]));
        assert_eq!(location.lines().collect::<Vec<_>>(), vec![ids[0], added, replacement]);
    }
}
