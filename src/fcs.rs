//! The model entry file, which names the method files of every property domain.
//!
//! ```text
//! RUNCONTROL  nexus_data/runcontrol.dat
//! PVT_FILES
//!    PVT Method 1 nexus_data/pvt_01.dat
//!    PVT Method 2 nexus_data/pvt_02.dat
//! RECURRENT_FILES
//!    WELLS Set 1 nexus_data/wells.dat
//! ```
//!
//! Words that do not name a domain (section headers, grid files, date formats) are left alone.

use crate::api::{parse_method, MethodResult};
use crate::config::LoadOptions;
use crate::domains::Domain;
use crate::error::{DeckError, EditError, IncludeError, Warning};
use crate::lexer::{values, CommentStripper};
use crate::resolver::{IncludeNode, IncludeResolver};
use crate::writer;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

const NUMBER_MARKERS: [&str; 3] = ["METHOD", "SET", "NETWORK"];

/// The method files of a model, by domain and method number, in entry-file order.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub entry: IncludeNode,
    files: IndexMap<Domain, IndexMap<u32, IncludeNode>>,
    pub warnings: Vec<Warning>,
}

impl ModelFiles {
    /// Reads the entry file and every method file it names. A missing entry file is an error;
    /// a missing method file is skipped with a warning.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self, IncludeError> {
        let entry = IncludeResolver::new(options.include_loading).resolve(path, None)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut model = ModelFiles {
            entry: entry.clone(),
            files: IndexMap::new(),
            warnings: entry.all_warnings(),
        };

        let lines = entry.flatten()?;
        let mut stripper = CommentStripper::new();
        for line in &lines {
            let words = values(&stripper.strip(line.text()));
            let Some(domain) = words.first().and_then(|w| w.parse::<Domain>().ok()) else {
                continue;
            };
            let warn = |message: String| Warning::emit(line.path(), Some(line.index()), message);

            let (number, file) = if domain.is_single_file() {
                (Some(1), words.get(1))
            } else {
                let mut rest = &words[1..];
                if rest
                    .first()
                    .is_some_and(|w| NUMBER_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(w)))
                {
                    rest = &rest[1..];
                }
                (rest.first().and_then(|n| n.parse::<u32>().ok()), rest.get(1))
            };
            let Some(number) = number else {
                model.warnings.push(warn(format!("{domain} entry without a method number")));
                continue;
            };
            let Some(file) = file else {
                model.warnings.push(warn(format!("{domain} method {number} without a file path")));
                continue;
            };

            let target = resolve_path(&base, file);
            if !target.is_file() {
                model.warnings.push(warn(format!(
                    "{domain} method {number}: file {} not found; method skipped",
                    target.display()
                )));
                continue;
            }
            let node = IncludeResolver::new(options.include_loading).resolve(&target, Some(path))?;
            model.warnings.extend(node.all_warnings());
            log::debug!("{domain} method {number}: {}", target.display());
            model.files.entry(domain).or_default().insert(number, node);
        }
        Ok(model)
    }

    /// The method files of `domain` by method number.
    pub fn files(&self, domain: Domain) -> Option<&IndexMap<u32, IncludeNode>> {
        self.files.get(&domain)
    }

    pub fn method(&self, domain: Domain, number: u32) -> Option<&IncludeNode> {
        self.files.get(&domain)?.get(&number)
    }

    pub fn method_mut(&mut self, domain: Domain, number: u32) -> Option<&mut IncludeNode> {
        self.files.get_mut(&domain)?.get_mut(&number)
    }

    pub fn domains(&self) -> impl Iterator<Item = Domain> + '_ {
        self.files.keys().copied()
    }

    /// Runs the extraction engine on every method of `domain`.
    pub fn parse_methods(
        &self,
        domain: Domain,
        options: &LoadOptions,
    ) -> Result<IndexMap<u32, MethodResult>, DeckError> {
        let mut results = IndexMap::new();
        for (number, node) in self.files.get(&domain).into_iter().flatten() {
            let mut result = parse_method(node, domain, options)?;
            result.location.name = format!("{domain} {number}");
            results.insert(*number, result);
        }
        Ok(results)
    }

    /// Writes back every method file that was edited. Returns the paths written.
    pub fn write_modified(&mut self) -> Result<Vec<PathBuf>, EditError> {
        let mut written = Vec::new();
        for node in self.files.values_mut().flat_map(|methods| methods.values_mut()) {
            written.extend(writer::write_to_file(node, None)?);
        }
        Ok(written)
    }
}

fn resolve_path(base: &Path, file: &str) -> PathBuf {
    let file = Path::new(file);
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn model_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/rock1.dat"), "PREF 2000.0\nCR 1E-6\n").unwrap();
        fs::write(dir.path().join("data/rock2.dat"), "PREF 3000.0\n").unwrap();
        fs::write(dir.path().join("data/rc.dat"), "METHOD IMPLICIT\n").unwrap();
        dir
    }

    #[test]
    fn test_reads_methods_in_entry_order() {
        let dir = model_dir();
        let fcs = dir.path().join("model.fcs");
        fs::write(
            &fcs,
            "RUNCONTROL data/rc.dat\nROCK_FILES\n  ROCK Method 2 data/rock2.dat\n  ROCK Method 1 data/rock1.dat\n",
        )
        .unwrap();
        let model = ModelFiles::load(&fcs, &LoadOptions::default()).unwrap();
        let rock: Vec<u32> = model.files(Domain::Rock).unwrap().keys().copied().collect();
        assert_eq!(rock, vec![2, 1]);
        assert!(model.method(Domain::Runcontrol, 1).is_some());
        assert!(model.warnings.is_empty());

        let parsed = model.parse_methods(Domain::Rock, &LoadOptions::default()).unwrap();
        assert_eq!(parsed[&1].properties.get_f64("CR"), Some(1e-6));
        assert_eq!(parsed[&2].location.name, "ROCK 2");
    }

    #[test]
    fn test_missing_method_file_is_skipped() {
        let dir = model_dir();
        let fcs = dir.path().join("model.fcs");
        fs::write(
            &fcs,
            "ROCK Method 1 data/rock1.dat\nROCK Method 3 data/absent.dat\nPVT Method\n",
        )
        .unwrap();
        let model = ModelFiles::load(&fcs, &LoadOptions::default()).unwrap();
        assert_eq!(model.files(Domain::Rock).unwrap().len(), 1);
        assert!(model.files(Domain::Pvt).is_none());
        assert_eq!(model.warnings.len(), 2);
    }

    #[test]
    fn test_missing_entry_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelFiles::load(&dir.path().join("none.fcs"), &LoadOptions::default());
        assert!(matches!(result, Err(IncludeError::NotFound { .. })));
    }
}
