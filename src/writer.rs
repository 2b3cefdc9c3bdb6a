//! Edits on line identities, and rendering back to text.
//!
//! Edits never rewrite text in place. They add, drop or swap whole [`SourceLine`]s in the node
//! that owns them and keep every [`ObjectLocation`](crate::source::ObjectLocation) in step.
//! Text is produced only when rendering, so a line nobody touched comes out exactly as read.

use crate::error::{EditError, IncludeError};
use crate::lexer::{find_next_value, replace_next_value, Lexer, TokenType};
use crate::resolver::IncludeNode;
use crate::source::{LineEnding, LineId, LocationIndex, ObjectLocation, SourceLine};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn unknown_line(id: LineId) -> EditError {
    EditError::UnknownLine { id: id.get() }
}

/// Inserts `texts` as new lines right after `anchor` and records them on `object`, after the
/// anchor when the object owns it and at its end otherwise. Returns the new identities.
pub fn add_lines<S: AsRef<str>>(
    root: &mut IncludeNode,
    index: &mut LocationIndex,
    object: &str,
    anchor: LineId,
    texts: &[S],
) -> Result<Vec<LineId>, EditError> {
    if index.get(object).is_none() {
        return Err(EditError::UnknownObject {
            name: object.to_string(),
        });
    }
    let node = root.node_for_line_mut(anchor).ok_or_else(|| unknown_line(anchor))?;
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let ending = node.preferred_ending();
    let path = node.shared_path();
    let lines = node.lines_mut();
    let position = lines
        .iter()
        .position(|l| l.id() == anchor)
        .ok_or_else(|| unknown_line(anchor))?;

    // An anchor that ended the file without a newline is replaced by a terminated copy, and
    // the last new line inherits the missing terminator.
    let mut retargeted = None;
    let mut last_ending = ending;
    if lines[position].ending() == LineEnding::None {
        let old = &lines[position];
        let terminated = SourceLine::new(old.text(), ending, old.shared_path(), old.index());
        retargeted = Some((anchor, terminated.id()));
        lines[position] = terminated;
        last_ending = LineEnding::None;
    }

    let base = lines[position].index();
    let new_lines: Vec<SourceLine> = texts
        .iter()
        .enumerate()
        .map(|(offset, text)| {
            let line_ending = if offset + 1 == texts.len() { last_ending } else { ending };
            SourceLine::new(text.as_ref(), line_ending, Arc::clone(&path), base + offset + 1)
        })
        .collect();
    let ids: Vec<LineId> = new_lines.iter().map(SourceLine::id).collect();
    lines.splice(position + 1..position + 1, new_lines);

    let mut anchor = anchor;
    if let Some((old, new)) = retargeted {
        node.retarget_include(old, new);
        index.replace_line(old, new);
        anchor = new;
    }
    if let Some(location) = index.get_mut(object) {
        location.insert_after(anchor, &ids);
    }
    log::debug!("added {} lines to {object}", ids.len());
    Ok(ids)
}

/// Deletes lines from the nodes holding them and from every object location. Nothing is
/// removed unless every id is found.
pub fn remove_lines(
    root: &mut IncludeNode,
    index: &mut LocationIndex,
    ids: &[LineId],
) -> Result<(), EditError> {
    if let Some(missing) = ids.iter().find(|id| root.find_line(**id).is_none()) {
        return Err(unknown_line(*missing));
    }
    for &id in ids {
        if let Some(node) = root.node_for_line_mut(id) {
            node.lines_mut().retain(|l| l.id() != id);
            node.forget_include(id);
        }
        index.forget_line(id);
    }
    Ok(())
}

/// Removes every line of `name` and drops its record.
pub fn remove_object(
    root: &mut IncludeNode,
    index: &mut LocationIndex,
    name: &str,
) -> Result<ObjectLocation, EditError> {
    let ids: Vec<LineId> = index
        .get(name)
        .ok_or_else(|| EditError::UnknownObject {
            name: name.to_string(),
        })?
        .lines()
        .collect();
    remove_lines(root, index, &ids)?;
    index.remove(name).ok_or_else(|| EditError::UnknownObject {
        name: name.to_string(),
    })
}

/// Replaces the text of one line. The replacement is a new line with a new identity, which
/// takes the old one's place in the node and in every object location.
pub fn modify_line(
    root: &mut IncludeNode,
    index: &mut LocationIndex,
    id: LineId,
    text: &str,
) -> Result<LineId, EditError> {
    let node = root.node_for_line_mut(id).ok_or_else(|| unknown_line(id))?;
    let lines = node.lines_mut();
    let position = lines
        .iter()
        .position(|l| l.id() == id)
        .ok_or_else(|| unknown_line(id))?;
    let old = &lines[position];
    let line = SourceLine::new(text, old.ending(), old.shared_path(), old.index());
    let new_id = line.id();
    lines[position] = line;
    node.retarget_include(id, new_id);
    index.replace_line(id, new_id);
    Ok(new_id)
}

/// Replaces the value following the word `after` on line `id` (the first value when `after`
/// is `None`), keeping the rest of the line, comments included, as it was.
pub fn replace_value(
    root: &mut IncludeNode,
    index: &mut LocationIndex,
    id: LineId,
    after: Option<&str>,
    replacement: &str,
) -> Result<LineId, EditError> {
    let text = root.find_line(id).ok_or_else(|| unknown_line(id))?.text().to_string();
    let not_found = || EditError::ValueNotFound {
        id: id.get(),
        token: after.unwrap_or_default().to_string(),
    };
    let column = match after {
        Some(token) => Lexer::new(&text)
            .lex()
            .into_iter()
            .take_while(|t| !matches!(t.ttype, TokenType::Comment(_)))
            .find(|t| matches!(&t.ttype, TokenType::Word(w) if w.eq_ignore_ascii_case(token)))
            .map(|t| t.pos_end)
            .ok_or_else(not_found)?,
        None => 0,
    };
    let replaced = replace_next_value(&[text.as_str()], 0, column, &[], replacement)
        .ok_or_else(not_found)?;
    modify_line(root, index, id, &replaced.new_line)
}

/// Replaces the `position`-th value (0-based) of line `id`.
pub fn replace_value_at(
    root: &mut IncludeNode,
    index: &mut LocationIndex,
    id: LineId,
    position: usize,
    replacement: &str,
) -> Result<LineId, EditError> {
    let text = root.find_line(id).ok_or_else(|| unknown_line(id))?.text().to_string();
    let not_found = || EditError::ValueNotFound {
        id: id.get(),
        token: format!("value {position}"),
    };
    let mut column = 0;
    for _ in 0..position {
        column = find_next_value(&[text.as_str()], 0, column, &[])
            .ok_or_else(not_found)?
            .pos_end;
    }
    let replaced = replace_next_value(&[text.as_str()], 0, column, &[], replacement)
        .ok_or_else(not_found)?;
    modify_line(root, index, id, &replaced.new_line)
}

/// The node's own lines, INCLUDE directives as written.
pub fn render(node: &IncludeNode) -> String {
    let mut out = String::new();
    for line in node.lines() {
        out.push_str(line.text());
        out.push_str(line.ending().as_str());
    }
    out
}

/// The node with every INCLUDE replaced by the included text.
pub fn render_flattened(node: &IncludeNode) -> Result<String, IncludeError> {
    let mut out = String::new();
    for line in node.flatten()? {
        out.push_str(line.text());
        out.push_str(line.ending().as_str());
    }
    Ok(out)
}

/// Writes every modified node of the tree back to its own file and returns the paths written.
/// With `new_path` the root is written there instead, modified or not; relative INCLUDE paths
/// in it then resolve against the new location.
pub fn write_to_file(
    root: &mut IncludeNode,
    new_path: Option<&Path>,
) -> Result<Vec<PathBuf>, EditError> {
    let mut written = Vec::new();
    match new_path {
        Some(path) => {
            write_atomic(path, render(root).as_bytes())?;
            written.push(path.to_path_buf());
            for child in root.children_mut().iter_mut().filter_map(|c| c.node.as_mut()) {
                write_modified(child, &mut written)?;
            }
        }
        None => write_modified(root, &mut written)?,
    }
    Ok(written)
}

fn write_modified(node: &mut IncludeNode, written: &mut Vec<PathBuf>) -> Result<(), EditError> {
    if node.is_modified() {
        let path = node.location().to_path_buf();
        write_atomic(&path, render(node).as_bytes())?;
        node.mark_saved();
        log::debug!("wrote {}", path.display());
        written.push(path);
    }
    for child in node.children_mut().iter_mut().filter_map(|c| c.node.as_mut()) {
        write_modified(child, written)?;
    }
    Ok(())
}

/// Writes through a temporary file in the target directory, then renames it into place.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), EditError> {
    let failed = |message: String| EditError::Write {
        path: path.to_path_buf(),
        message,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| failed(e.to_string()))?;
    tmp.write_all(data).map_err(|e| failed(e.to_string()))?;
    tmp.as_file().sync_all().map_err(|e| failed(e.to_string()))?;
    tmp.persist(path).map_err(|e| failed(e.error.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(text: &str) -> (IncludeNode, LocationIndex) {
        let node = IncludeNode::from_source("rock.dat", text);
        let mut index = LocationIndex::new();
        index.insert(ObjectLocation::with_lines("rock", node.lines().iter().map(SourceLine::id)));
        (node, index)
    }

    #[test]
    fn test_untouched_render_is_byte_identical() {
        let text = "PREF 2000.0\r\nCR 1E-6   ! comment  \n\n[ block\n comment ]\nKP 0.003";
        let (node, _) = deck(text);
        assert_eq!(render(&node), text);
        assert_eq!(render_flattened(&node).unwrap(), text);
        assert!(!node.is_modified());
    }

    #[test]
    fn test_add_after_unterminated_last_line() {
        let (mut node, mut index) = deck("PREF 2000.0\nCR 1E-6");
        let anchor = node.lines()[1].id();
        let ids = add_lines(&mut node, &mut index, "rock", anchor, &["KP 0.003"]).unwrap();
        assert_eq!(render(&node), "PREF 2000.0\nCR 1E-6\nKP 0.003");
        assert!(node.is_modified());
        let rock = index.get("rock").unwrap();
        assert_eq!(rock.len(), 3);
        assert!(rock.contains(ids[0]));
        assert!(!rock.contains(anchor));
    }

    #[test]
    fn test_add_uses_file_line_ending() {
        let (mut node, mut index) = deck("PREF 2000.0\r\nKP 0.003\r\n");
        let anchor = node.lines()[0].id();
        add_lines(&mut node, &mut index, "rock", anchor, &["CR 1E-6"]).unwrap();
        assert_eq!(render(&node), "PREF 2000.0\r\nCR 1E-6\r\nKP 0.003\r\n");
    }

    #[test]
    fn test_remove_touches_only_removed_span() {
        let (mut node, mut index) = deck("PREF 2000.0\nCR 1E-6\nKP 0.003\n");
        let cr = node.lines()[1].id();
        index.insert(ObjectLocation::with_lines("other", [node.lines()[0].id()]));
        let other_before = index.get("other").cloned();

        remove_lines(&mut node, &mut index, &[cr]).unwrap();
        assert_eq!(render(&node), "PREF 2000.0\nKP 0.003\n");
        assert_eq!(index.get("rock").unwrap().len(), 2);
        assert_eq!(index.get("other").cloned(), other_before);
    }

    #[test]
    fn test_remove_unknown_line_changes_nothing() {
        let (mut node, mut index) = deck("PREF 2000.0\n");
        let known = node.lines()[0].id();
        let result = remove_lines(&mut node, &mut index, &[known, LineId::fresh()]);
        assert!(matches!(result, Err(EditError::UnknownLine { .. })));
        assert_eq!(render(&node), "PREF 2000.0\n");
        assert!(!node.is_modified());
    }

    #[test]
    fn test_modify_gives_new_identity() {
        let (mut node, mut index) = deck("PREF 2000.0\nCR 1E-6\n");
        let old = node.lines()[0].id();
        let new = modify_line(&mut node, &mut index, old, "PREF 2500.0").unwrap();
        assert_ne!(old, new);
        assert!(node.find_line(old).is_none());
        assert!(index.get("rock").unwrap().contains(new));
        assert_eq!(index.get("rock").unwrap().lines().next(), Some(new));
        assert_eq!(render(&node), "PREF 2500.0\nCR 1E-6\n");
    }

    #[test]
    fn test_replace_value_keeps_comment() {
        let (mut node, mut index) = deck("PREF 2000.0   ! reference\n");
        let id = node.lines()[0].id();
        replace_value(&mut node, &mut index, id, Some("pref"), "2500").unwrap();
        assert_eq!(render(&node), "PREF 2500   ! reference\n");
    }

    #[test]
    fn test_replace_value_without_value() {
        let (mut node, mut index) = deck("PREF\n");
        let id = node.lines()[0].id();
        let result = replace_value(&mut node, &mut index, id, Some("PREF"), "1");
        assert!(matches!(result, Err(EditError::ValueNotFound { .. })));
    }

    #[test]
    fn test_replace_value_at_position() {
        let (mut node, mut index) = deck("  1  2  3   0.25 ! perf\n");
        let id = node.lines()[0].id();
        replace_value_at(&mut node, &mut index, id, 3, "0.5").unwrap();
        assert_eq!(render(&node), "  1  2  3   0.5 ! perf\n");
        let id = node.lines()[0].id();
        let result = replace_value_at(&mut node, &mut index, id, 4, "9");
        assert!(matches!(result, Err(EditError::ValueNotFound { .. })));
    }

    #[test]
    fn test_remove_object_drops_record() {
        let (mut node, mut index) = deck("PREF 2000.0\n");
        let removed = remove_object(&mut node, &mut index, "rock").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(index.get("rock").is_none());
        assert_eq!(render(&node), "");
    }
}
