//! The compilation arena and its queries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::symbols::{Symbol, SymbolDetail, TypeDetail};
use super::syntax::{Ancestors, Descendants, Node, NodeKind};
use super::{CompilationId, DeclarationKey, FileId, NodeId, SymbolId};
use crate::cancel::CancellationToken;
use crate::error::{MockLintError, MockLintResult};
use crate::text::byte_offset_to_position;
use crate::types::Location;

/// Generic nesting deeper than this is treated as malformed.
const MAX_TYPE_DEPTH: usize = 64;

/// A source file of the compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    /// The file's `CompilationUnit` node.
    pub root: NodeId,
    /// Source text, when the host ships it. Enables line:column locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Nodes, symbols and files of one compilation.
///
/// Ids index directly into the arenas. Deserialize through
/// [`Compilation::from_json`] so the name index is built and ids are checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compilation {
    pub id: CompilationId,
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    #[serde(skip)]
    symbols_by_name: HashMap<String, Vec<SymbolId>>,
}

impl Compilation {
    /// Assemble a compilation from its arenas, building the name index.
    pub fn new(
        id: CompilationId,
        files: Vec<SourceFile>,
        nodes: Vec<Node>,
        symbols: Vec<Symbol>,
    ) -> Self {
        let mut compilation = Compilation {
            id,
            files,
            nodes,
            symbols,
            symbols_by_name: HashMap::new(),
        };
        compilation.rebuild_index();
        compilation
    }

    /// Parse and validate a compilation document.
    pub fn from_json(json: &str) -> MockLintResult<Self> {
        let mut compilation: Compilation = serde_json::from_str(json)?;
        compilation.rebuild_index();
        compilation.validate()?;
        Ok(compilation)
    }

    fn rebuild_index(&mut self) {
        self.symbols_by_name.clear();
        for symbol in &self.symbols {
            self.symbols_by_name
                .entry(symbol.qualified_name.clone())
                .or_default()
                .push(symbol.id);
        }
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Reject documents with misplaced or dangling ids.
    pub fn validate(&self) -> MockLintResult<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.index() != index {
                return Err(MockLintError::invalid_model(format!(
                    "node at index {} has id {}",
                    index, node.id
                )));
            }
            if self.file(node.file).is_none() {
                return Err(dangling(node.id, "file", node.file));
            }
            if let Some(parent) = node.parent {
                self.check_node(node.id, "parent", parent)?;
            }
            for child in node.kind.children() {
                self.check_node(node.id, "child", child)?;
            }
            for (role, symbol) in [("symbol", node.symbol), ("type", node.type_)] {
                if let Some(symbol) = symbol {
                    self.check_symbol(node.id, role, symbol)?;
                }
            }
        }

        for (index, symbol) in self.symbols.iter().enumerate() {
            if symbol.id.index() != index {
                return Err(MockLintError::invalid_model(format!(
                    "symbol at index {} has id {}",
                    index, symbol.id
                )));
            }
            for referenced in symbol_references(symbol) {
                self.check_symbol(symbol.id, "reference", referenced)?;
            }
        }

        for (index, file) in self.files.iter().enumerate() {
            if file.id.0 as usize != index {
                return Err(MockLintError::invalid_model(format!(
                    "file at index {} has id {}",
                    index, file.id
                )));
            }
            self.check_node(file.id, "root", file.root)?;
        }

        self.check_tree_links()?;
        self.check_type_arguments()
    }

    /// Every child link is mirrored by the child's parent link, and no
    /// parent chain loops.
    fn check_tree_links(&self) -> MockLintResult<()> {
        for node in &self.nodes {
            for child in node.kind.children() {
                let parent = self.node(child).and_then(|c| c.parent);
                if parent != Some(node.id) {
                    return Err(MockLintError::invalid_model(format!(
                        "node {} lists child {} whose parent is {}",
                        node.id,
                        child,
                        parent.map_or_else(|| "none".to_string(), |p| p.to_string())
                    )));
                }
            }
        }

        // 0: unvisited, 1: on the chain being walked, 2: reaches a root
        let mut state = vec![0u8; self.nodes.len()];
        let mut chain = Vec::new();
        for start in 0..self.nodes.len() {
            let mut current = Some(start);
            while let Some(index) = current {
                match state.get(index).copied() {
                    Some(0) => {}
                    Some(1) => {
                        return Err(MockLintError::invalid_model(format!(
                            "parent links through node {} form a cycle",
                            NodeId(index as u32)
                        )));
                    }
                    _ => break,
                }
                state[index] = 1;
                chain.push(index);
                current = self.nodes[index].parent.map(|p| p.index());
            }
            for index in chain.drain(..) {
                state[index] = 2;
            }
        }
        Ok(())
    }

    /// No type reaches itself through its own type arguments.
    fn check_type_arguments(&self) -> MockLintResult<()> {
        let mut state = vec![0u8; self.symbols.len()];
        for symbol in &self.symbols {
            self.visit_type_arguments(symbol.id, &mut state)?;
        }
        Ok(())
    }

    fn visit_type_arguments(&self, id: SymbolId, state: &mut [u8]) -> MockLintResult<()> {
        // Iterative post-order: 1 while a type's arguments are open, 2 when done.
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            let index = current.index();
            if expanded {
                state[index] = 2;
                continue;
            }
            match state.get(index).copied() {
                Some(0) => {}
                Some(1) => {
                    return Err(MockLintError::invalid_model(format!(
                        "type {} is among its own type arguments",
                        current
                    )));
                }
                _ => continue,
            }
            state[index] = 1;
            stack.push((current, true));
            if let Some(detail) = self.type_detail(current) {
                stack.extend(detail.type_arguments.iter().map(|arg| (*arg, false)));
            }
        }
        Ok(())
    }

    fn check_node(
        &self,
        owner: impl std::fmt::Display,
        role: &str,
        id: NodeId,
    ) -> MockLintResult<()> {
        match self.node(id) {
            Some(_) => Ok(()),
            None => Err(dangling(owner, role, id)),
        }
    }

    fn check_symbol(
        &self,
        owner: impl std::fmt::Display,
        role: &str,
        id: SymbolId,
    ) -> MockLintResult<()> {
        match self.symbol(id) {
            Some(_) => Ok(()),
            None => Err(dangling(owner, role, id)),
        }
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    /// Static type of a node.
    pub fn node_type(&self, id: NodeId) -> Option<SymbolId> {
        self.node(id)?.type_
    }

    /// All symbols with the given qualified name, in table order.
    pub fn symbols_named(&self, qualified_name: &str) -> &[SymbolId] {
        self.symbols_by_name
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First symbol with the given qualified name.
    pub fn type_by_name(&self, qualified_name: &str) -> Option<SymbolId> {
        self.symbols_named(qualified_name)
            .iter()
            .copied()
            .find(|id| self.type_detail(*id).is_some())
    }

    pub fn type_detail(&self, id: SymbolId) -> Option<&TypeDetail> {
        self.symbol(id)?.as_type()
    }

    // ------------------------------------------------------------------------
    // Declaration identity
    // ------------------------------------------------------------------------

    /// Unbound definition of a symbol (the symbol itself when not generic).
    pub fn original_definition(&self, id: SymbolId) -> SymbolId {
        self.symbol(id)
            .and_then(|s| s.original_definition)
            .unwrap_or(id)
    }

    pub fn declaration_key(&self, id: SymbolId) -> DeclarationKey {
        DeclarationKey::from_definition(self.original_definition(id))
    }

    /// Type identity: same symbol, or same definition with identical type
    /// arguments.
    pub fn same_type(&self, a: SymbolId, b: SymbolId) -> bool {
        self.same_type_within(a, b, MAX_TYPE_DEPTH)
    }

    fn same_type_within(&self, a: SymbolId, b: SymbolId, depth: usize) -> bool {
        if a == b {
            return true;
        }
        let Some(depth) = depth.checked_sub(1) else {
            return false;
        };
        if self.declaration_key(a) != self.declaration_key(b) {
            return false;
        }
        let args_a = self.type_arguments(a);
        let args_b = self.type_arguments(b);
        args_a.len() == args_b.len()
            && args_a
                .iter()
                .zip(args_b)
                .all(|(x, y)| self.same_type_within(*x, *y, depth))
    }

    /// Type arguments of a constructed type.
    pub fn type_arguments(&self, id: SymbolId) -> &[SymbolId] {
        self.type_detail(id)
            .map(|t| t.type_arguments.as_slice())
            .unwrap_or(&[])
    }

    /// Readable type name, `Mock<IFoo>` style.
    pub fn display_type(&self, id: SymbolId) -> String {
        self.display_type_within(id, MAX_TYPE_DEPTH)
    }

    fn display_type_within(&self, id: SymbolId, depth: usize) -> String {
        let Some(symbol) = self.symbol(id) else {
            return id.to_string();
        };
        let args = self.type_arguments(id);
        if args.is_empty() {
            return symbol.name.clone();
        }
        let args: Vec<String> = match depth.checked_sub(1) {
            Some(depth) => args
                .iter()
                .map(|a| self.display_type_within(*a, depth))
                .collect(),
            None => vec!["...".to_string()],
        };
        format!("{}<{}>", symbol.name, args.join(", "))
    }

    // ------------------------------------------------------------------------
    // Syntax
    // ------------------------------------------------------------------------

    /// Invocations and object creations, in node order.
    pub fn call_sites(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.kind.is_call_site())
            .map(|n| n.id)
            .collect()
    }

    pub fn ancestors<'a>(
        &'a self,
        node: NodeId,
        scope: Option<NodeId>,
        cancel: &'a CancellationToken,
    ) -> Ancestors<'a> {
        Ancestors::new(self, node, scope, cancel)
    }

    pub fn descendants<'a>(&'a self, root: NodeId, cancel: &'a CancellationToken) -> Descendants<'a> {
        Descendants::new(self, root, cancel)
    }

    /// Skip parentheses and argument wrappers.
    pub fn unwrap_expression(&self, mut id: NodeId) -> NodeId {
        // Bounded by node count, so a malformed cycle cannot spin forever.
        for _ in 0..self.nodes.len() {
            match self.node(id).map(|n| &n.kind) {
                Some(NodeKind::Parenthesized { expression })
                | Some(NodeKind::Argument { expression, .. }) => id = *expression,
                _ => break,
            }
        }
        id
    }

    /// Diagnostic location for a node. Line and column are filled in when the
    /// file carries its text.
    pub fn location(&self, id: NodeId) -> Option<Location> {
        let node = self.node(id)?;
        let file = self.file(node.file)?;
        let location = Location::new(file.path.clone(), node.span);
        Some(match &file.text {
            Some(text) => {
                let offset = usize::try_from(node.span.start).unwrap_or(usize::MAX);
                let (line, col) = byte_offset_to_position(text, offset);
                location.with_position(line, col)
            }
            None => location,
        })
    }
}

fn dangling(owner: impl std::fmt::Display, role: &str, id: impl std::fmt::Display) -> MockLintError {
    MockLintError::invalid_model(format!("{} has dangling {} {}", owner, role, id))
}

fn symbol_references(symbol: &Symbol) -> Vec<SymbolId> {
    let mut refs: Vec<SymbolId> = symbol
        .container
        .iter()
        .chain(symbol.original_definition.iter())
        .copied()
        .collect();
    match &symbol.detail {
        SymbolDetail::Type(t) => {
            refs.extend(t.base_type);
            refs.extend(&t.interfaces);
            refs.extend(&t.type_arguments);
            refs.extend(&t.members);
            refs.extend(t.delegate_invoke);
        }
        SymbolDetail::Method(m) => {
            refs.extend(&m.parameters);
            refs.extend(m.return_type);
            refs.extend(&m.type_arguments);
        }
        SymbolDetail::Property(p) => refs.push(p.type_),
        SymbolDetail::Event(e) => refs.push(e.delegate_type),
        SymbolDetail::Field(f) => refs.push(f.type_),
        SymbolDetail::Parameter(p) => refs.extend(p.type_),
        SymbolDetail::Local(l) => refs.extend(l.type_),
    }
    refs
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "id": 7,
        "files": [{"id": 0, "path": "Tests.cs", "root": 0, "text": "x.Go();"}],
        "nodes": [
            {"id": 0, "file": 0, "span": {"start": 0, "end": 7}, "kind": "compilation_unit", "members": [3]},
            {"id": 1, "file": 0, "parent": 2, "span": {"start": 0, "end": 1}, "kind": "identifier", "name": "x"},
            {"id": 2, "file": 0, "parent": 3, "span": {"start": 0, "end": 4}, "kind": "member_access", "expression": 1, "name": "Go", "symbol": 1},
            {"id": 3, "file": 0, "parent": 0, "span": {"start": 2, "end": 6}, "kind": "invocation", "expression": 2, "symbol": 1}
        ],
        "symbols": [
            {"id": 0, "name": "Object", "qualified_name": "System.Object", "kind": "type", "type_kind": "class"},
            {"id": 1, "name": "Go", "qualified_name": "Demo.Go", "kind": "method", "return_type": 0}
        ]
    }"#;

    mod loading {
        use super::*;

        #[test]
        fn from_json_builds_name_index() {
            let comp = Compilation::from_json(MINIMAL).unwrap();
            assert_eq!(comp.id, CompilationId(7));
            assert_eq!(comp.type_by_name("System.Object"), Some(SymbolId(0)));
            assert_eq!(comp.symbols_named("Demo.Go"), &[SymbolId(1)]);
            assert_eq!(comp.call_sites(), vec![NodeId(3)]);
        }

        #[test]
        fn dangling_child_is_rejected() {
            let broken = MINIMAL.replace(r#""members": [3]"#, r#""members": [99]"#);
            let err = Compilation::from_json(&broken).unwrap_err();
            assert!(matches!(err, MockLintError::InvalidModel { .. }));
            assert!(err.to_string().contains("node_99"));
        }

        #[test]
        fn dangling_symbol_is_rejected() {
            let broken = MINIMAL.replace(r#""return_type": 0"#, r#""return_type": 42"#);
            let err = Compilation::from_json(&broken).unwrap_err();
            assert!(err.to_string().contains("sym_42"));
        }

        #[test]
        fn child_with_another_parent_is_rejected() {
            let broken = MINIMAL.replace(r#""parent": 2,"#, r#""parent": 0,"#);
            let err = Compilation::from_json(&broken).unwrap_err();
            assert!(matches!(err, MockLintError::InvalidModel { .. }));
            assert!(err.to_string().contains("whose parent is node_0"));
        }

        #[test]
        fn parent_cycle_is_rejected() {
            // The compilation unit claims the invocation it contains as parent.
            let broken = MINIMAL.replace(
                r#"{"id": 0, "file": 0, "span""#,
                r#"{"id": 0, "file": 0, "parent": 3, "span""#,
            );
            let err = Compilation::from_json(&broken).unwrap_err();
            assert!(err.to_string().contains("form a cycle"));
        }

        #[test]
        fn self_referential_type_arguments_are_rejected() {
            let broken = MINIMAL.replace(
                r#""type_kind": "class"}"#,
                r#""type_kind": "class", "type_arguments": [0]}"#,
            );
            let err = Compilation::from_json(&broken).unwrap_err();
            assert!(err.to_string().contains("own type arguments"));
        }

        #[test]
        fn shared_type_arguments_are_not_a_cycle() {
            let nested = MINIMAL.replace(
                r#"{"id": 1, "name": "Go", "qualified_name": "Demo.Go", "kind": "method", "return_type": 0}"#,
                r#"{"id": 1, "name": "Go", "qualified_name": "Demo.Go", "kind": "method", "return_type": 0},
                   {"id": 2, "name": "Pair", "qualified_name": "Demo.Pair", "kind": "type", "type_kind": "class", "type_arguments": [0, 0]},
                   {"id": 3, "name": "Box", "qualified_name": "Demo.Box", "kind": "type", "type_kind": "class", "type_arguments": [2, 2]}"#,
            );
            let comp = Compilation::from_json(&nested).unwrap();
            assert_eq!(comp.display_type(SymbolId(3)), "Box<Pair<Object, Object>, Pair<Object, Object>>");
        }

        #[test]
        fn malformed_json_is_a_json_error() {
            let err = Compilation::from_json("{\"id\": ").unwrap_err();
            assert!(matches!(err, MockLintError::Json(_)));
        }
    }

    mod queries {
        use super::*;

        #[test]
        fn location_uses_text_when_present() {
            let comp = Compilation::from_json(MINIMAL).unwrap();
            let loc = comp.location(NodeId(3)).unwrap();
            assert_eq!(loc.to_string(), "Tests.cs:1:3");
        }

        #[test]
        fn declaration_key_defaults_to_self() {
            let comp = Compilation::from_json(MINIMAL).unwrap();
            assert_eq!(comp.declaration_key(SymbolId(1)).definition(), SymbolId(1));
            assert!(comp.same_type(SymbolId(0), SymbolId(0)));
            assert!(!comp.same_type(SymbolId(0), SymbolId(1)));
        }

        #[test]
        fn unvalidated_type_cycles_stay_bounded() {
            let mut comp = Compilation::from_json(MINIMAL).unwrap();
            let mut looped = comp.symbols[0].clone();
            looped.id = SymbolId(2);
            looped.original_definition = Some(SymbolId(0));
            if let SymbolDetail::Type(detail) = &mut looped.detail {
                detail.type_arguments = vec![SymbolId(2)];
            }
            comp.symbols.push(looped.clone());
            looped.id = SymbolId(3);
            if let SymbolDetail::Type(detail) = &mut looped.detail {
                detail.type_arguments = vec![SymbolId(3)];
            }
            comp.symbols.push(looped);

            assert!(comp.display_type(SymbolId(2)).contains("<...>"));
            assert!(!comp.same_type(SymbolId(2), SymbolId(3)));
        }
    }
}
