use la_arena::{Arena, Idx};

use super::{Node, NodeKind};

pub type NodeId = Idx<Node>;

/// Stable integer identity of a node, used to derive labels.
pub fn node_index(id: NodeId) -> u32 {
    u32::from(id.into_raw())
}

/// Owns every AST node of one compilation. Nodes are never freed one by one.
///
/// Children must exist before their parent and `next` may only point forward
/// and be set once, so the substructure is a tree and statement lists cannot
/// loop back on themselves.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Arena<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_node(&mut self, kind: NodeKind) -> NodeId {
        let len = self.nodes.len() as u32;
        let children = kind.children();
        assert!(
            children.iter().all(|&c| node_index(c) < len),
            "child nodes must be allocated before their parent"
        );
        let height = 1 + children
            .iter()
            .map(|&c| self.nodes[c].height)
            .max()
            .unwrap_or(0);
        self.nodes.alloc(Node {
            kind,
            next: None,
            height,
        })
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn height(&self, id: NodeId) -> usize {
        self.nodes[id].height
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].next
    }

    pub(crate) fn link(&mut self, prev: NodeId, next: NodeId) {
        assert!(
            node_index(next) > node_index(prev),
            "statement lists only link forward"
        );
        let node = &mut self.nodes[prev];
        assert!(node.next.is_none(), "statement already linked");
        node.next = Some(next);
    }

    /// Walks a `next`-linked statement list starting at `head`.
    pub fn statements(&self, head: Option<NodeId>) -> Statements<'_> {
        Statements {
            ast: self,
            cursor: head,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every node; all previously issued ids become invalid.
    pub fn release_all(&mut self) {
        self.nodes = Arena::new();
    }
}

pub struct Statements<'a> {
    ast: &'a Ast,
    cursor: Option<NodeId>,
}

impl Iterator for Statements<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cursor?;
        self.cursor = self.ast.next(id);
        Some(id)
    }
}

/// Accumulates a statement list by patching `next` links.
#[derive(Debug, Default)]
pub(crate) struct StatementList {
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl StatementList {
    pub fn push(&mut self, ast: &mut Ast, id: NodeId) {
        debug_assert!(ast.kind(id).is_statement(), "only statements are listed");
        match self.tail {
            Some(tail) => ast.link(tail, id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }
}
