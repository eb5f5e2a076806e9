//! Incremental construction of a [`Compilation`].
//!
//! Nodes are added bottom-up: children first, then the parent whose kind
//! lists them. Adding a parent links the children back to it. Spans are laid
//! out at [`CompilationBuilder::finish`] by walking each file in source order,
//! so a later statement always starts after an earlier one ends.

use super::compilation::{Compilation, SourceFile};
use super::symbols::{Symbol, SymbolDetail};
use super::syntax::{Node, NodeKind};
use super::{CompilationId, FileId, NodeId, SymbolId};
use crate::types::Span;

/// Builder for in-memory compilations.
#[derive(Debug)]
pub struct CompilationBuilder {
    id: CompilationId,
    files: Vec<SourceFile>,
    nodes: Vec<Node>,
    symbols: Vec<Symbol>,
}

impl CompilationBuilder {
    pub fn new(id: CompilationId) -> Self {
        CompilationBuilder {
            id,
            files: Vec::new(),
            nodes: Vec::new(),
            symbols: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Files and nodes
    // ------------------------------------------------------------------------

    /// Add a file with an empty compilation unit.
    pub fn add_file(&mut self, path: impl Into<String>) -> FileId {
        let file = FileId(self.files.len() as u32);
        let root = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id: root,
            file,
            parent: None,
            span: Span::new(0, 0),
            kind: NodeKind::CompilationUnit {
                members: Vec::new(),
            },
            symbol: None,
            type_: None,
        });
        self.files.push(SourceFile {
            id: file,
            path: path.into(),
            root,
            text: None,
        });
        file
    }

    /// Root node of a file. Panics on an unknown file id.
    pub fn file_root(&self, file: FileId) -> NodeId {
        self.files[file.0 as usize].root
    }

    /// Add an unbound node.
    pub fn node(&mut self, file: FileId, kind: NodeKind) -> NodeId {
        self.bound_node(file, kind, None, None)
    }

    /// Add a node bound to a symbol and/or typed.
    pub fn bound_node(
        &mut self,
        file: FileId,
        kind: NodeKind,
        symbol: Option<SymbolId>,
        type_: Option<SymbolId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            if let Some(node) = self.nodes.get_mut(child.index()) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(Node {
            id,
            file,
            parent: None,
            span: Span::new(0, 0),
            kind,
            symbol,
            type_,
        });
        id
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn set_symbol(&mut self, node: NodeId, symbol: SymbolId) {
        if let Some(n) = self.nodes.get_mut(node.index()) {
            n.symbol = Some(symbol);
        }
    }

    pub fn set_type(&mut self, node: NodeId, type_: SymbolId) {
        if let Some(n) = self.nodes.get_mut(node.index()) {
            n.type_ = Some(type_);
        }
    }

    /// Append `child` to a container node (compilation unit, type
    /// declaration, block, or `Other`). Other parents are left unchanged.
    pub fn add_member(&mut self, parent: NodeId, child: NodeId) {
        let Some(node) = self.nodes.get_mut(parent.index()) else {
            return;
        };
        let list = match &mut node.kind {
            NodeKind::CompilationUnit { members } | NodeKind::TypeDeclaration { members, .. } => {
                members
            }
            NodeKind::Block { statements } => statements,
            NodeKind::Other { children } => children,
            _ => return,
        };
        list.push(child);
        if let Some(child) = self.nodes.get_mut(child.index()) {
            child.parent = Some(parent);
        }
    }

    // ------------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------------

    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        detail: SymbolDetail,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols
            .push(Symbol::new(id, name, qualified_name, detail));
        id
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.index())
    }

    /// Register `member` on type `owner` and point its container back.
    pub fn add_type_member(&mut self, owner: SymbolId, member: SymbolId) {
        if let Some(SymbolDetail::Type(detail)) = self.symbol_mut(owner).map(|s| &mut s.detail) {
            detail.members.push(member);
        }
        if let Some(member) = self.symbol_mut(member) {
            member.container = Some(owner);
        }
    }

    // ------------------------------------------------------------------------
    // Finish
    // ------------------------------------------------------------------------

    /// Lay out spans and produce the compilation.
    pub fn finish(mut self) -> Compilation {
        let roots: Vec<NodeId> = self.files.iter().map(|f| f.root).collect();
        for root in roots {
            let mut position = 0u64;
            self.layout(root, &mut position);
        }
        Compilation::new(self.id, self.files, self.nodes, self.symbols)
    }

    fn layout(&mut self, id: NodeId, position: &mut u64) {
        let Some(node) = self.nodes.get(id.index()) else {
            return;
        };
        let children = node.kind.children();
        let start = *position;
        if children.is_empty() {
            *position += leaf_width(&node.kind);
        } else {
            *position += 1;
            for child in children {
                self.layout(child, position);
                *position += 1;
            }
        }
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.span = Span::new(start, *position);
        }
    }
}

fn leaf_width(kind: &NodeKind) -> u64 {
    let text_len = match kind {
        NodeKind::Identifier { name } | NodeKind::Parameter { name } => name.len(),
        _ => 4,
    };
    text_len.max(1) as u64
}
