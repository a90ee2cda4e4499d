use super::node::{Node, NodeRecord};
use crate::error::{Result, TypedGpError};
use serde::{Deserialize, Serialize};

/// Index of a node inside a tree's arena.
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    live: bool,
}

/// Arena-backed expression tree. Every node lives in `slots`; removed
/// subtrees are recycled through `free`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "Vec<NodeRecord>", try_from = "Vec<NodeRecord>")]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Tree {
    pub fn new(root: Node) -> Self {
        Self {
            slots: vec![Slot {
                node: root,
                parent: None,
                children: Vec::new(),
                live: true,
            }],
            free: Vec::new(),
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id].node
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id].node
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id].parent
    }

    fn alloc(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        let slot = Slot {
            node,
            parent,
            children: Vec::new(),
            live: true,
        };
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = slot;
                id
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let children = std::mem::take(&mut self.slots[current].children);
            stack.extend(children);
            self.slots[current].live = false;
            self.slots[current].parent = None;
            self.free.push(current);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.alloc(node, Some(parent));
        self.slots[parent].children.push(id);
        id
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, node: Node) -> NodeId {
        let id = self.alloc(node, Some(parent));
        self.slots[parent].children.insert(index, id);
        id
    }

    /// Swaps the node stored at `id`, keeping its children.
    pub fn replace_node(&mut self, id: NodeId, node: Node) {
        self.slots[id].node = node;
    }

    /// Drops every descendant of `id`.
    pub fn prune_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.slots[id].children);
        for child in children {
            self.release(child);
        }
    }

    /// Replaces the subtree rooted at `at` with a copy of `donor`'s subtree at `donor_root`.
    pub fn graft(&mut self, at: NodeId, donor: &Tree, donor_root: NodeId) {
        self.prune_children(at);
        self.slots[at].node = donor.node(donor_root).clone();
        let mut stack: Vec<(NodeId, NodeId)> = vec![(at, donor_root)];
        while let Some((target, source)) = stack.pop() {
            for &child in donor.children(source) {
                let copy = self.append_child(target, donor.node(child).clone());
                stack.push((copy, child));
            }
        }
    }

    /// Puts `node` in the place of `id` and hangs `id` below it.
    /// `before` and `after` become the siblings around `id` inside `node`.
    pub fn wrap(&mut self, id: NodeId, node: Node, before: Vec<Node>, after: Vec<Node>) -> NodeId {
        let parent = self.slots[id].parent;
        let wrapper = self.alloc(node, parent);
        match parent {
            Some(p) => {
                if let Some(pos) = self.slots[p].children.iter().position(|c| *c == id) {
                    self.slots[p].children[pos] = wrapper;
                }
            }
            None => self.root = wrapper,
        }
        for n in before {
            self.append_child(wrapper, n);
        }
        self.slots[wrapper].children.push(id);
        self.slots[id].parent = Some(wrapper);
        for n in after {
            self.append_child(wrapper, n);
        }
        wrapper
    }

    pub fn pre_order(&self) -> Vec<NodeId> {
        self.pre_order_from(self.root)
    }

    pub fn pre_order_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.slots[current].children.iter().rev());
        }
        out
    }

    pub fn post_order(&self) -> Vec<NodeId> {
        self.post_order_from(self.root)
    }

    /// Children before parents, left to right.
    pub fn post_order_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = self.pre_order_from_mirrored(id);
        out.reverse();
        out
    }

    // root, then right-to-left; reversed this is a left-to-right post-order
    fn pre_order_from_mirrored(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.slots[current].children.iter());
        }
        out
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        self.slots.iter().filter(|s| s.live).count()
    }

    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.pre_order_from(id).len()
    }

    /// Number of levels; a lone root has depth 1.
    pub fn depth(&self) -> usize {
        self.subtree_depth(self.root)
    }

    /// Edges between `id` and the root.
    pub fn depth_of(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.slots[current].parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Levels in the subtree rooted at `id`.
    pub fn subtree_depth(&self, id: NodeId) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(id, 1usize)];
        while let Some((current, level)) = stack.pop() {
            deepest = deepest.max(level);
            for &child in &self.slots[current].children {
                stack.push((child, level + 1));
            }
        }
        deepest
    }

    /// Copy of the subtree rooted at `id` as a standalone tree.
    pub fn subtree(&self, id: NodeId) -> Tree {
        let mut out = Tree::new(self.node(id).clone());
        let root = out.root();
        out.graft(root, self, id);
        out
    }

    /// Checks arity and child types against every node's declared signature.
    pub fn validate(&self) -> Result<()> {
        for id in self.pre_order() {
            let node = self.node(id);
            let children = self.children(id);
            if children.len() != node.arg_types.len() {
                return Err(TypedGpError::InvalidTree(format!(
                    "{} expects {} children, has {}",
                    node.kind,
                    node.arg_types.len(),
                    children.len()
                )));
            }
            for (expected, &child) in node.arg_types.iter().zip(children) {
                let actual = self.node(child).ret_type;
                if *expected != actual {
                    return Err(TypedGpError::TypeMismatch {
                        expected: format!("{} argument of {}", expected, node.kind),
                        actual: actual.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Flat post-order record list.
    pub fn to_records(&self) -> Vec<NodeRecord> {
        self.post_order()
            .into_iter()
            .map(|id| NodeRecord::from(self.node(id).clone()))
            .collect()
    }

    /// Rebuilds a tree from a post-order record list: each record adopts the
    /// last `arity` subtrees built so far.
    pub fn from_records(records: Vec<NodeRecord>) -> Result<Tree> {
        let mut tree: Option<Tree> = None;
        let mut stack: Vec<NodeId> = Vec::new();

        for record in records {
            let node = Node::try_from(record)?;
            let arity = node.arity();
            if stack.len() < arity {
                return Err(TypedGpError::InvalidTree(format!(
                    "{} needs {} children but only {} subtrees are available",
                    node.kind,
                    arity,
                    stack.len()
                )));
            }
            let children = stack.split_off(stack.len() - arity);
            let id = match tree.as_mut() {
                Some(t) => t.alloc(node, None),
                None => {
                    tree = Some(Tree::new(node));
                    0
                }
            };
            if let Some(t) = tree.as_mut() {
                for &child in &children {
                    t.slots[child].parent = Some(id);
                }
                t.slots[id].children = children;
            }
            stack.push(id);
        }

        match (tree, stack.as_slice()) {
            (Some(mut t), [root]) => {
                t.root = *root;
                Ok(t)
            }
            (None, _) => Err(TypedGpError::InvalidTree("empty record list".to_string())),
            (Some(_), rest) => Err(TypedGpError::InvalidTree(format!(
                "{} disconnected subtrees left after rebuilding",
                rest.len()
            ))),
        }
    }
}

impl From<Tree> for Vec<NodeRecord> {
    fn from(tree: Tree) -> Self {
        tree.to_records()
    }
}

impl TryFrom<Vec<NodeRecord>> for Tree {
    type Error = TypedGpError;

    fn try_from(records: Vec<NodeRecord>) -> Result<Self> {
        Tree::from_records(records)
    }
}

/// Structural equality: same nodes in the same shape.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        let a = self.pre_order();
        let b = other.pre_order();
        a.len() == b.len()
            && a.iter().zip(&b).all(|(&x, &y)| {
                self.node(x) == other.node(y) && self.children(x).len() == other.children(y).len()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::nodetype::NodeKind;
    use crate::functions::signatures::Signature;
    use crate::types::ValueKind;

    fn op(kind: NodeKind, arity: usize) -> Node {
        Node::new(kind, &Signature::nary(ValueKind::ArrayF, ValueKind::ArrayF, arity), false)
    }

    fn x(name: &str) -> Node {
        Node::terminal(name, ValueKind::ArrayF, false)
    }

    // Add(x1, Mul(x2, x3))
    fn sample_tree() -> Tree {
        let mut tree = Tree::new(op(NodeKind::Add, 2));
        let root = tree.root();
        tree.append_child(root, x("x1"));
        let mul = tree.append_child(root, op(NodeKind::Mul, 2));
        tree.append_child(mul, x("x2"));
        tree.append_child(mul, x("x3"));
        tree
    }

    fn features(tree: &Tree, order: Vec<NodeId>) -> Vec<String> {
        order
            .into_iter()
            .map(|id| tree.node(id).name(false))
            .collect()
    }

    #[test]
    fn test_traversal_orders() {
        let tree = sample_tree();
        assert_eq!(features(&tree, tree.pre_order()), vec!["Add", "x1", "Mul", "x2", "x3"]);
        assert_eq!(features(&tree, tree.post_order()), vec!["x1", "x2", "x3", "Mul", "Add"]);
    }

    #[test]
    fn test_size_and_depth() {
        let tree = sample_tree();
        assert_eq!(tree.size(), 5);
        assert_eq!(tree.depth(), 3);
        let mul = tree.children(tree.root())[1];
        assert_eq!(tree.depth_of(mul), 1);
        assert_eq!(tree.subtree_depth(mul), 2);
        assert_eq!(tree.subtree_size(mul), 3);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_prune_recycles_slots() {
        let mut tree = sample_tree();
        let mul = tree.children(tree.root())[1];
        tree.prune_children(mul);
        tree.replace_node(mul, x("x4"));
        assert_eq!(tree.size(), 3);
        let before = tree.slots.len();
        tree.append_child(mul, x("x5"));
        assert_eq!(tree.slots.len(), before);
    }

    #[test]
    fn test_wrap_root() {
        let mut tree = sample_tree();
        let old_root = tree.root();
        let wrapper = tree.wrap(old_root, op(NodeKind::Sub, 2), vec![x("c")], vec![]);
        assert_eq!(tree.root(), wrapper);
        assert_eq!(tree.children(wrapper).len(), 2);
        assert_eq!(tree.children(wrapper)[1], old_root);
        assert_eq!(tree.parent(old_root), Some(wrapper));
        assert_eq!(tree.depth(), 4);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_graft_copies_donor() {
        let mut tree = sample_tree();
        let donor = sample_tree();
        let target = tree.children(tree.root())[0];
        tree.graft(target, &donor, donor.root());
        assert_eq!(tree.size(), 9);
        assert_eq!(tree.depth(), 4);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_record_round_trip() {
        let tree = sample_tree();
        let rebuilt = Tree::from_records(tree.to_records()).unwrap();
        assert_eq!(rebuilt, tree);
        assert_eq!(rebuilt.to_records(), tree.to_records());
    }

    #[test]
    fn test_malformed_records_rejected() {
        let mut records = sample_tree().to_records();
        records.remove(0);
        assert!(matches!(
            Tree::from_records(records),
            Err(TypedGpError::InvalidTree(_))
        ));

        let mut records = sample_tree().to_records();
        records.pop();
        assert!(Tree::from_records(records).is_err());
        assert!(Tree::from_records(Vec::new()).is_err());
    }

    #[test]
    fn test_validate_catches_type_mismatch() {
        let mut tree = Tree::new(op(NodeKind::Add, 2));
        let root = tree.root();
        tree.append_child(root, x("x1"));
        tree.append_child(root, Node::terminal("flag", ValueKind::ArrayB, false));
        assert!(matches!(tree.validate(), Err(TypedGpError::TypeMismatch { .. })));
    }
}
