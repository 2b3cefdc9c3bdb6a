use crate::config::IncludeLoading;
use crate::error::{IncludeError, Warning};
use crate::lexer::{CommentStripper, Lexer, TokenType};
use crate::source::{split_lines, LineEnding, LineId, SourceLine};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An INCLUDE directive found in a node, and the child it resolves to.
#[derive(Debug, Clone)]
pub struct IncludeRef {
    /// The line holding the directive.
    pub line: LineId,
    /// The included path, resolved against the including file's directory.
    pub target: PathBuf,
    /// `None` until loaded, or when the file could not be found.
    pub node: Option<IncludeNode>,
}

/// One file of a deck: its raw lines and the files it includes.
#[derive(Debug, Clone)]
pub struct IncludeNode {
    path: Arc<Path>,
    origin: Option<PathBuf>,
    ancestors: Vec<PathBuf>,
    lines: Vec<SourceLine>,
    children: Vec<IncludeRef>,
    modified: bool,
    warnings: Vec<Warning>,
}

/// A node's line sequence seen with include directives marked.
#[derive(Debug, Clone, Copy)]
pub enum NodeEntry<'a> {
    Line(&'a SourceLine),
    Include(&'a SourceLine, &'a IncludeRef),
}

impl IncludeNode {
    /// Builds a node from in-memory text. INCLUDE directives are recorded but not loaded.
    pub fn from_source(path: impl Into<PathBuf>, text: &str) -> Self {
        let path: PathBuf = path.into();
        let mut node = IncludeNode::empty(Arc::from(path.as_path()), None, Vec::new());
        node.lines = split_lines(text, &node.path);
        node.scan_includes();
        node
    }

    fn empty(path: Arc<Path>, origin: Option<PathBuf>, ancestors: Vec<PathBuf>) -> Self {
        IncludeNode {
            path,
            origin,
            ancestors,
            lines: Vec::new(),
            children: Vec::new(),
            modified: false,
            warnings: Vec::new(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.path
    }

    /// Path of the file that included this one.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn children(&self) -> &[IncludeRef] {
        &self.children
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Warnings of this node and every loaded descendant.
    pub fn all_warnings(&self) -> Vec<Warning> {
        let mut out = self.warnings.clone();
        for child in self.children.iter().filter_map(|c| c.node.as_ref()) {
            out.extend(child.all_warnings());
        }
        out
    }

    pub fn entries(&self) -> Vec<NodeEntry<'_>> {
        let by_line: HashMap<LineId, &IncludeRef> =
            self.children.iter().map(|c| (c.line, c)).collect();
        self.lines
            .iter()
            .map(|line| match by_line.get(&line.id()) {
                Some(include) => NodeEntry::Include(line, include),
                None => NodeEntry::Line(line),
            })
            .collect()
    }

    /// Depth-first substitution of every INCLUDE line by its child's own flattened lines.
    pub fn flatten(&self) -> Result<Vec<SourceLine>, IncludeError> {
        let mut out = Vec::with_capacity(self.lines.len());
        self.flatten_into(&mut out)?;
        Ok(out)
    }

    fn flatten_into(&self, out: &mut Vec<SourceLine>) -> Result<(), IncludeError> {
        for entry in self.entries() {
            match entry {
                NodeEntry::Line(line) => out.push(line.clone()),
                NodeEntry::Include(line, include) => match &include.node {
                    Some(child) => child.flatten_into(out)?,
                    None => {
                        return Err(IncludeError::DanglingInclude {
                            file: self.path.to_path_buf(),
                            line: line.index(),
                            target: include.target.clone(),
                        })
                    }
                },
            }
        }
        Ok(())
    }

    /// Every loaded node of the subtree, this one first.
    pub fn nodes(&self) -> Vec<&IncludeNode> {
        let mut out = vec![self];
        for child in self.children.iter().filter_map(|c| c.node.as_ref()) {
            out.extend(child.nodes());
        }
        out
    }

    pub fn find_line(&self, id: LineId) -> Option<&SourceLine> {
        self.lines.iter().find(|l| l.id() == id).or_else(|| {
            self.children
                .iter()
                .filter_map(|c| c.node.as_ref())
                .find_map(|child| child.find_line(id))
        })
    }

    /// The node of this subtree whose own line sequence holds `id`.
    pub fn node_for_line_mut(&mut self, id: LineId) -> Option<&mut IncludeNode> {
        if self.lines.iter().any(|l| l.id() == id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .filter_map(|c| c.node.as_mut())
            .find_map(|child| child.node_for_line_mut(id))
    }

    /// Loads children left unresolved by lazy loading. With `IncludeLoading::Eager` the whole
    /// subtree below is loaded, with `Lazy` only the direct children.
    pub fn resolve_children(&mut self, loading: IncludeLoading) -> Result<(), IncludeError> {
        let mut resolver = IncludeResolver::new(loading);
        resolver.resolving_stack = self.ancestors.clone();
        resolver.resolving_stack.push(self.path.to_path_buf());
        resolver.load_children(self)
    }

    /// The line terminator new lines in this file should use.
    pub(crate) fn preferred_ending(&self) -> LineEnding {
        if self.lines.iter().any(|l| l.ending() == LineEnding::CrLf) {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub(crate) fn shared_path(&self) -> Arc<Path> {
        Arc::clone(&self.path)
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<SourceLine> {
        self.modified = true;
        &mut self.lines
    }

    pub(crate) fn children_mut(&mut self) -> &mut [IncludeRef] {
        &mut self.children
    }

    pub(crate) fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub(crate) fn forget_include(&mut self, id: LineId) {
        self.children.retain(|c| c.line != id);
    }

    pub(crate) fn retarget_include(&mut self, old: LineId, new: LineId) {
        for child in self.children.iter_mut().filter(|c| c.line == old) {
            child.line = new;
        }
    }

    fn scan_includes(&mut self) {
        let base = self.path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut stripper = CommentStripper::new();
        let mut children = Vec::new();
        for line in &self.lines {
            let stripped = stripper.strip(line.text());
            let tokens: Vec<String> = Lexer::new(&stripped)
                .lex()
                .into_iter()
                .filter_map(|t| match t.ttype {
                    TokenType::Word(w) | TokenType::Quoted(w) => Some(w),
                    _ => None,
                })
                .collect();
            let include = tokens.iter().position(|t| t.eq_ignore_ascii_case("INCLUDE"));
            let Some(position) = include else {
                continue;
            };
            match tokens.get(position + 1) {
                Some(target) => {
                    let target = Path::new(target);
                    let target = if target.is_absolute() {
                        target.to_path_buf()
                    } else {
                        base.join(target)
                    };
                    log::debug!(
                        "{}: line {} includes {}",
                        self.path.display(),
                        line.index(),
                        target.display()
                    );
                    children.push(IncludeRef {
                        line: line.id(),
                        target,
                        node: None,
                    });
                }
                None => self.warnings.push(Warning::emit(
                    self.path.to_path_buf(),
                    Some(line.index()),
                    "INCLUDE without a file path; line kept as text",
                )),
            }
        }
        self.children = children;
    }
}

/// Resolves INCLUDE directives into a tree of [`IncludeNode`]s.
pub struct IncludeResolver {
    loading: IncludeLoading,
    // Files currently being resolved, to detect circular includes
    resolving_stack: Vec<PathBuf>,
}

impl IncludeResolver {
    pub fn new(loading: IncludeLoading) -> Self {
        IncludeResolver {
            loading,
            resolving_stack: Vec::new(),
        }
    }

    /// Reads `path` and resolves its includes. A missing `path` is a hard error.
    pub fn resolve(
        &mut self,
        path: &Path,
        origin: Option<&Path>,
    ) -> Result<IncludeNode, IncludeError> {
        if !path.is_file() {
            return Err(IncludeError::NotFound {
                path: path.to_path_buf(),
                origin: origin.map(Path::to_path_buf),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| IncludeError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.resolve_source(path, &text, origin)
    }

    /// Resolves includes of already-read text that lives at `path`.
    pub fn resolve_source(
        &mut self,
        path: &Path,
        text: &str,
        origin: Option<&Path>,
    ) -> Result<IncludeNode, IncludeError> {
        let key = identity_of(path);
        if self.resolving_stack.iter().any(|p| identity_of(p) == key) {
            let cycle = self
                .resolving_stack
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect::<Vec<String>>()
                .join(" -> ");
            return Err(IncludeError::CircularInclude {
                cycle: format!("{} -> {}", cycle, path.to_string_lossy()),
            });
        }

        let mut node = IncludeNode::empty(
            Arc::from(path),
            origin.map(Path::to_path_buf),
            self.resolving_stack.clone(),
        );
        node.lines = split_lines(text, &node.path);
        node.scan_includes();
        log::debug!(
            "loaded {} ({} lines, {} includes)",
            path.display(),
            node.lines.len(),
            node.children.len()
        );

        self.resolving_stack.push(path.to_path_buf());
        let result = match self.loading {
            IncludeLoading::Eager => self.load_children(&mut node),
            IncludeLoading::Lazy => Ok(()),
        };
        self.resolving_stack.pop();
        result.map(|_| node)
    }

    /// Loads the unloaded children of `node`. The node's own path must already be on the
    /// resolving stack.
    fn load_children(&mut self, node: &mut IncludeNode) -> Result<(), IncludeError> {
        let origin = node.path.to_path_buf();
        let mut warnings = Vec::new();
        for child in node.children.iter_mut().filter(|c| c.node.is_none()) {
            if !child.target.is_file() {
                let line = node.lines.iter().find(|l| l.id() == child.line).map(SourceLine::index);
                warnings.push(Warning::emit(
                    origin.clone(),
                    line,
                    format!("included file {} not found", child.target.display()),
                ));
                continue;
            }
            child.node = Some(self.resolve(&child.target, Some(&origin))?);
        }
        node.warnings.extend(warnings);
        Ok(())
    }
}

fn identity_of(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Reads the entry file at `path` and eagerly resolves its whole include tree.
pub fn build_include_graph(
    path: &Path,
    origin: Option<&Path>,
) -> Result<IncludeNode, IncludeError> {
    IncludeResolver::new(IncludeLoading::Eager).resolve(path, origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source_records_includes_without_loading() {
        let node = IncludeNode::from_source(
            "/deck/main.dat",
            "PREF 2000\nINCLUDE tables/rock.inc ! rock\n! INCLUDE skipped.inc\nKP 0.003\n",
        );
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.children()[0].target, PathBuf::from("/deck/tables/rock.inc"));
        assert!(node.children()[0].node.is_none());
    }

    #[test]
    fn test_flatten_without_includes_is_identity() {
        let text = "PREF 2000.0\nCR 1E-6\nKP 0.003\n";
        let node = IncludeNode::from_source("rock.dat", text);
        let flat = node.flatten().unwrap();
        let rebuilt: String = flat.iter().map(SourceLine::raw).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_flatten_unloaded_include_is_dangling() {
        let node = IncludeNode::from_source("main.dat", "A\nINCLUDE missing.inc\nB\n");
        match node.flatten() {
            Err(IncludeError::DanglingInclude { line, target, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(target, PathBuf::from("missing.inc"));
            }
            other => panic!("Expected DanglingInclude, got {other:?}"),
        }
    }

    #[test]
    fn test_include_without_path_warns() {
        let node = IncludeNode::from_source("main.dat", "INCLUDE\nA\n");
        assert!(node.children().is_empty());
        assert_eq!(node.warnings().len(), 1);
        assert_eq!(node.flatten().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_entry_file_is_not_found() {
        let result = build_include_graph(Path::new("/definitely/not/here.fcs"), None);
        assert!(matches!(result, Err(IncludeError::NotFound { .. })));
    }
}
