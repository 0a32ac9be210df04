//! [`Project`] - a set of [`Source`]s keyed by path, with cross-file
//! reference aggregation.

use crate::source::Source;
use leda_binder::SymbolId;
use leda_common::{Diagnostic, Location};
use rustc_hash::FxHashMap;

/// Holds every open source, indexed by its path. Paths are unique within a
/// project - inserting a second source under an already-used path replaces
/// the first.
///
/// There is no cross-file name resolution: a `SymbolId` is only meaningful
/// relative to the `Source` that produced it, so reference aggregation is
/// keyed on `(path, SymbolId)` rather than a project-wide symbol identity.
#[derive(Default)]
pub struct Project {
    sources: Vec<Source>,
    index: FxHashMap<String, usize>,
}

impl Project {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) the source at `path` and returns it.
    pub fn insert_source(&mut self, path: impl Into<String>, code: impl Into<String>) -> &mut Source {
        let path = path.into();
        let source = Source::new(path.clone(), code);
        let existing = self.index.get(&path).copied();
        match existing {
            Some(i) => {
                self.sources[i] = source;
                &mut self.sources[i]
            }
            None => {
                let i = self.sources.len();
                self.sources.push(source);
                self.index.insert(path, i);
                &mut self.sources[i]
            }
        }
    }

    #[must_use]
    pub fn source(&self, path: &str) -> Option<&Source> {
        self.index.get(path).map(|&i| &self.sources[i])
    }

    pub fn source_mut(&mut self, path: &str) -> Option<&mut Source> {
        let i = *self.index.get(path)?;
        Some(&mut self.sources[i])
    }

    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Parses, binds, and checks every source in insertion order, calling
    /// `report` with each source's path and its fresh diagnostics as soon
    /// as that source finishes.
    pub fn check_all(&mut self, mut report: impl FnMut(&str, &[Diagnostic])) {
        for source in &mut self.sources {
            source.analyze();
            report(source.path(), source.diagnostics());
        }
    }

    /// Unions `symbol`'s reference list from the source at `path` with,
    /// optionally, its definition location. No cross-file resolution means
    /// a symbol's references never span multiple sources in practice; this
    /// still takes a path so the lookup has a compound `(source, symbol)`
    /// identity ready for a future cross-file binder.
    #[must_use]
    pub fn get_symbol_references(&self, path: &str, symbol: SymbolId, include_definition: bool) -> Vec<Location> {
        let Some(source) = self.source(path) else { return Vec::new() };
        let mut locations: Vec<Location> = Vec::new();
        if include_definition {
            locations.push(source.symbol_definition(symbol));
        }
        locations.extend(source.symbol_references(symbol).into_iter().map(|range| Location::new(path.to_string(), range)));
        locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_all_visits_every_source_and_reports_its_diagnostics() {
        let mut project = Project::new();
        project.insert_source("a.leda", "local x: number = \"hi\"");
        project.insert_source("b.leda", "local y = 1");

        let mut seen = Vec::new();
        project.check_all(|path, diags| seen.push((path.to_string(), diags.len())));

        assert_eq!(seen, vec![("a.leda".to_string(), 1), ("b.leda".to_string(), 0)]);
    }

    #[test]
    fn inserting_the_same_path_twice_replaces_the_source() {
        let mut project = Project::new();
        project.insert_source("a.leda", "local x = 1");
        project.insert_source("a.leda", "local y = 2");
        assert_eq!(project.sources().len(), 1);
        assert_eq!(project.source("a.leda").unwrap().code(), "local y = 2");
    }

    #[test]
    fn get_symbol_references_prepends_the_definition_on_request() {
        let mut project = Project::new();
        project.insert_source("a.leda", "local x = 1\nx = 2");
        let source = project.source_mut("a.leda").unwrap();
        source.analyze();
        let name_node = source.arena().ids().find(|&id| matches!(source.arena().kind(id), leda_parser::NodeKind::Name(_))).unwrap();
        let symbol = source.try_get_symbol(name_node).unwrap();

        let with_def = project.get_symbol_references("a.leda", symbol, true);
        let without_def = project.get_symbol_references("a.leda", symbol, false);
        assert_eq!(with_def.len(), without_def.len() + 1);
    }
}
