//! [`Source`] - one file's code plus every analysis artifact derived from
//! it.

use leda_binder::{BindResult, SymbolId};
use leda_common::{BinderOptions, Diagnostic, LineIndex, Location, Position, Range};
use leda_parser::{NodeArena, NodeId};
use leda_types::Type;
use rustc_hash::FxHashMap;
use tracing::{debug, span as trace_span, Level};

/// A single in-memory file plus the tree, symbol table, and type table the
/// pipeline has produced for its current text. Re-parsing replaces these
/// artifacts wholesale: nothing from a previous version survives `parse()`.
pub struct Source {
    path: String,
    code: String,
    line_index: LineIndex,
    interner: leda_common::Interner,
    arena: NodeArena,
    root: Option<NodeId>,
    bind_result: Option<BindResult>,
    binder_options: BinderOptions,
    symbol_types: FxHashMap<SymbolId, Type>,
    node_types: FxHashMap<NodeId, Type>,
    diagnostics: Vec<Diagnostic>,
}

impl Source {
    #[must_use]
    pub fn new(path: impl Into<String>, code: impl Into<String>) -> Self {
        let path = path.into();
        let code = code.into();
        let line_index = LineIndex::build(&code);
        Self {
            path,
            code,
            line_index,
            interner: leda_common::Interner::new(),
            arena: NodeArena::new(),
            root: None,
            bind_result: None,
            binder_options: BinderOptions::default(),
            symbol_types: FxHashMap::default(),
            node_types: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Overrides the binder configuration used by subsequent [`Source::bind`]/
    /// [`Source::analyze`] calls.
    pub fn set_binder_options(&mut self, options: BinderOptions) {
        self.binder_options = options;
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replaces this source's text wholesale, invalidating every artifact a
    /// previous `parse()`/`bind()`/`check()` produced. Callers must run the
    /// pipeline again (`parse()` then `bind()` then `check()`, or
    /// [`Source::analyze`]) to get fresh diagnostics.
    pub fn update_code(&mut self, new_text: impl Into<String>) {
        self.code = new_text.into();
        self.line_index = LineIndex::build(&self.code);
        self.interner = leda_common::Interner::new();
        self.arena = NodeArena::new();
        self.root = None;
        self.bind_result = None;
        self.symbol_types.clear();
        self.node_types.clear();
        self.diagnostics.clear();
    }

    /// Parses the current code, replacing any previous tree. Returns the
    /// parser's own diagnostics (also folded into [`Source::diagnostics`]).
    pub fn parse(&mut self) -> Vec<Diagnostic> {
        let _span = trace_span!(Level::DEBUG, "source_parse", path = %self.path).entered();
        self.bind_result = None;
        self.symbol_types.clear();
        self.node_types.clear();
        self.diagnostics.clear();

        let parsed = leda_parser::parse(&self.code);
        self.arena = parsed.arena;
        self.interner = parsed.interner;
        self.root = Some(parsed.root);
        let rendered = self.render(parsed.diagnostics);
        self.diagnostics.extend(rendered.iter().cloned());
        rendered
    }

    /// Binds the current tree, attaching symbols to name nodes. Must run
    /// after [`Source::parse`]. Returns the binder's own diagnostics.
    pub fn bind(&mut self) -> Vec<Diagnostic> {
        let _span = trace_span!(Level::DEBUG, "source_bind", path = %self.path).entered();
        let root = self.root.expect("bind() called before parse()");
        self.symbol_types.clear();
        let result = leda_binder::bind_with_options(&self.arena, &mut self.interner, root, self.binder_options);
        let rendered = self.render(result.diagnostics.clone());
        self.bind_result = Some(result);
        self.diagnostics.extend(rendered.iter().cloned());
        rendered
    }

    /// Checks the current bound tree, computing a type for every expression
    /// and declaration. Must run after [`Source::bind`]. Returns the
    /// checker's own diagnostics.
    pub fn check(&mut self) -> Vec<Diagnostic> {
        let _span = trace_span!(Level::DEBUG, "source_check", path = %self.path).entered();
        let root = self.root.expect("check() called before parse()");
        let bind_result = self.bind_result.as_ref().expect("check() called before bind()");
        let result = leda_checker::check(&self.arena, &self.interner, root, bind_result);
        self.node_types = result.node_types;
        self.symbol_types = result.symbol_types;
        let rendered = self.render(result.diagnostics);
        self.diagnostics.extend(rendered.iter().cloned());
        debug!(diagnostics = self.diagnostics.len(), "source analysis finished");
        rendered
    }

    /// Runs `parse()`, `bind()`, and `check()` in order and returns every
    /// diagnostic collected across the three stages.
    pub fn analyze(&mut self) -> &[Diagnostic] {
        self.parse();
        self.bind();
        self.check();
        &self.diagnostics
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn render(&self, raw: Vec<leda_common::RawDiagnostic>) -> Vec<Diagnostic> {
        raw.into_iter().map(|d| d.into_diagnostic(&self.line_index, &self.code)).collect()
    }

    /// The text of line `line` (zero-based), without its trailing newline,
    /// for diagnostic rendering.
    #[must_use]
    pub fn get_line(&self, line: u32) -> Option<&str> {
        let start = self.line_index.line_start(line)? as usize;
        let end = self.line_index.line_start(line + 1).map(|l| l as usize).unwrap_or(self.code.len());
        let text = self.code.get(start..end)?;
        Some(text.strip_suffix('\n').map(|s| s.strip_suffix('\r').unwrap_or(s)).unwrap_or(text))
    }

    #[must_use]
    pub fn try_get_symbol(&self, node: NodeId) -> Option<SymbolId> {
        self.bind_result.as_ref()?.tree_to_symbol.get(&node).copied()
    }

    #[must_use]
    pub fn try_get_symbol_type(&self, symbol: SymbolId) -> Option<&Type> {
        self.symbol_types.get(&symbol)
    }

    #[must_use]
    pub fn try_get_node_type(&self, node: NodeId) -> Option<&Type> {
        self.node_types.get(&node)
    }

    #[must_use]
    pub fn symbol_definition(&self, symbol: SymbolId) -> Location {
        let span = self.bind_result.as_ref().expect("symbols not available before bind()").symbols.get(symbol).definition;
        Location::new(self.path.clone(), self.line_index.span_to_range(span, &self.code))
    }

    #[must_use]
    pub fn symbol_references(&self, symbol: SymbolId) -> Vec<Range> {
        self.bind_result
            .as_ref()
            .expect("symbols not available before bind()")
            .symbols
            .references(symbol)
            .iter()
            .map(|span| self.line_index.span_to_range(*span, &self.code))
            .collect()
    }

    #[must_use]
    pub fn name_at(&self, position: Position) -> Option<NodeId> {
        crate::name_finder::get_name_at(&self.arena, &self.line_index, &self.code, position)
    }

    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    #[must_use]
    pub fn interner(&self) -> &leda_common::Interner {
        &self.interner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leda_common::DiagnosticKind;

    #[test]
    fn analyze_reports_a_type_mismatch() {
        let mut source = Source::new("test.leda", "local x: number = \"hi\"");
        let diags = source.analyze();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::TypeMismatch);
    }

    #[test]
    fn update_code_clears_stale_diagnostics() {
        let mut source = Source::new("test.leda", "local x: number = \"hi\"");
        source.analyze();
        assert_eq!(source.diagnostics().len(), 1);
        source.update_code("local x: number = 1");
        assert!(source.diagnostics().is_empty());
        source.analyze();
        assert!(source.diagnostics().is_empty());
    }

    #[test]
    fn get_line_strips_the_trailing_newline() {
        let source = Source::new("test.leda", "local x = 1\nlocal y = 2\n");
        assert_eq!(source.get_line(0), Some("local x = 1"));
        assert_eq!(source.get_line(1), Some("local y = 2"));
    }

    #[test]
    fn undeclared_global_is_an_error_by_default() {
        let mut source = Source::new("test.leda", "print(1)");
        let diags = source.analyze();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::NameNotFound);
    }

    #[test]
    fn implicit_globals_opt_in_silences_the_error() {
        let mut source = Source::new("test.leda", "print(1)");
        source.set_binder_options(BinderOptions { allow_implicit_globals: true });
        let diags = source.analyze();
        assert!(diags.is_empty());
    }

    #[test]
    fn try_get_symbol_resolves_a_declared_name() {
        let mut source = Source::new("test.leda", "local x = 1");
        source.analyze();
        let name_node =
            source.arena().ids().find(|&id| matches!(source.arena().kind(id), leda_parser::NodeKind::Name(_))).unwrap();
        let symbol = source.try_get_symbol(name_node);
        assert!(symbol.is_some());
        assert!(source.try_get_symbol_type(symbol.unwrap()).is_some());
    }
}
