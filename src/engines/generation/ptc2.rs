use super::ast::{NodeId, Tree};
use super::node::Node;
use super::search_space::SearchSpace;
use crate::error::{Result, TypedGpError};
use crate::types::ValueKind;
use crate::utils::sampling::random_dequeue;
use rand::Rng;

/// An argument slot waiting to be filled: the placeholder node, the type it
/// must return and its distance from the subtree root.
struct Pending {
    id: NodeId,
    ret: ValueKind,
    depth: usize,
}

impl SearchSpace {
    /// Grows a tree for `root_type` with the probabilistic tree creation
    /// algorithm (PTC2).
    ///
    /// The root is an operator, restricted to `sig_hash` when given, unless
    /// `max_size` is 1 or no operator returns `root_type`. The size bound is
    /// checked against the open slots, so the result may exceed `max_size` by
    /// the arity of the last operator placed.
    pub fn build<R: Rng>(
        &self,
        root_type: ValueKind,
        sig_hash: Option<u64>,
        max_depth: usize,
        max_size: usize,
        rng: &mut R,
    ) -> Result<Tree> {
        let root = if max_size > 1 {
            self.sample_operator(root_type, sig_hash, None, rng)
        } else {
            None
        };
        let root = match root {
            Some(node) => node,
            None => self.terminal_for(root_type, rng)?,
        };
        let mut tree = Tree::new(root);
        let root = tree.root();
        self.ptc2(&mut tree, root, max_depth, max_size, rng)?;
        Ok(tree)
    }

    /// A fresh subtree returning `ret`, or `None` unless both an operator and
    /// a terminal returning `ret` carry a positive weight.
    pub fn sample_subtree<R: Rng>(
        &self,
        ret: ValueKind,
        max_depth: usize,
        max_size: usize,
        rng: &mut R,
    ) -> Result<Option<Tree>> {
        if !self.has_operator(ret) || !self.has_terminal(ret) {
            return Ok(None);
        }
        let root = if max_size > 1 && max_depth > 1 {
            self.sample_operator(ret, None, None, rng)
        } else {
            None
        };
        let root = match root {
            Some(node) => node,
            None => self.terminal_for(ret, rng)?,
        };
        let mut tree = Tree::new(root);
        let root = tree.root();
        self.ptc2(&mut tree, root, max_depth.saturating_sub(1), max_size, rng)?;
        Ok(Some(tree))
    }

    /// Weighted terminal draw that falls back to a uniform one.
    pub(crate) fn terminal_for<R: Rng>(&self, ret: ValueKind, rng: &mut R) -> Result<Node> {
        self.sample_terminal(Some(ret), false, rng)
            .or_else(|| self.sample_terminal(Some(ret), true, rng))
            .ok_or_else(|| {
                TypedGpError::Configuration(format!("No terminal returns {}", ret))
            })
    }

    /// Fills the arguments of the node at `root`, which must already hold an
    /// operator or leaf. `max_depth` counts edges below `root`.
    pub(crate) fn ptc2<R: Rng>(
        &self,
        tree: &mut Tree,
        root: NodeId,
        max_depth: usize,
        max_size: usize,
        rng: &mut R,
    ) -> Result<()> {
        let mut size: usize = tree
            .pre_order()
            .iter()
            .map(|id| tree.node(*id).size_cost(true))
            .sum();

        let mut queue = Vec::new();
        open_slots(tree, root, 1, &mut queue);

        while !queue.is_empty() && queue.len() + size < max_size {
            let Some(slot) = random_dequeue(&mut queue, rng) else {
                break;
            };
            let node = if slot.depth >= max_depth {
                self.terminal_for(slot.ret, rng)?
            } else {
                match self.sample_operator(slot.ret, None, None, rng) {
                    Some(op) => op,
                    None => self.terminal_for(slot.ret, rng)?,
                }
            };
            size += node.size_cost(true);
            tree.replace_node(slot.id, node);
            open_slots(tree, slot.id, slot.depth + 1, &mut queue);
        }

        while let Some(slot) = random_dequeue(&mut queue, rng) {
            let node = self.terminal_for(slot.ret, rng)?;
            tree.replace_node(slot.id, node);
        }

        log::trace!("ptc2 grew {} nodes (budget {}, depth {})", tree.size(), max_size, max_depth);
        Ok(())
    }
}

/// Appends a placeholder for each argument of `id` and queues it.
fn open_slots(tree: &mut Tree, id: NodeId, depth: usize, queue: &mut Vec<Pending>) {
    let args = tree.node(id).arg_types.clone();
    for ret in args {
        let child = tree.append_child(id, Node::terminal("", ret, false));
        queue.push(Pending { id: child, ret, depth });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchSpaceConfig;
    use crate::data::Dataset;
    use crate::functions::nodetype::NodeKind;
    use crate::types::Value;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn space(functions: &[(&str, f64)]) -> SearchSpace {
        let d = Dataset::new(
            vec![
                ("x1".to_string(), Value::ArrayF(vec![1.0, 2.0, 3.0])),
                ("x2".to_string(), Value::ArrayF(vec![3.0, 1.0, 2.0])),
            ],
            vec![1.0, 2.0, 3.0],
            false,
        )
        .unwrap();
        let cfg = SearchSpaceConfig::with_functions(functions.iter().map(|(k, w)| (*k, *w)));
        SearchSpace::new(&d, &cfg).unwrap()
    }

    #[test]
    fn test_depth_one_size_three_is_operator_over_terminals() {
        let ss = space(&[("Add", 1.0), ("Mul", 1.0)]);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let tree = ss.build(ValueKind::ArrayF, None, 1, 3, &mut rng).unwrap();
            let root = tree.root();
            assert!(matches!(tree.node(root).kind, NodeKind::Add | NodeKind::Mul));
            assert_eq!(tree.children(root).len(), 2);
            for &child in tree.children(root) {
                assert!(tree.node(child).kind.is_leaf());
            }
            tree.validate().unwrap();
        }
    }

    #[test]
    fn test_size_one_gives_single_terminal() {
        let ss = space(&[("Add", 1.0)]);
        let mut rng = StdRng::seed_from_u64(12);
        let tree = ss.build(ValueKind::ArrayF, None, 5, 1, &mut rng).unwrap();
        assert_eq!(tree.size(), 1);
        assert!(tree.node(tree.root()).kind.is_leaf());
    }

    #[test]
    fn test_trees_are_well_typed_and_bounded() {
        let ss = space(&[]);
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..50 {
            let tree = ss.sample_subtree(ValueKind::ArrayF, 4, 20, &mut rng).unwrap().unwrap();
            tree.validate().unwrap();
            assert!(tree.depth() <= 4);
            // no placeholder survives
            for id in tree.pre_order() {
                let node = tree.node(id);
                assert!(node.kind != NodeKind::Terminal || !node.feature().is_empty());
            }
        }
    }

    #[test]
    fn test_missing_type_is_none() {
        let ss = space(&[("Add", 1.0)]);
        let mut rng = StdRng::seed_from_u64(14);
        assert!(ss.sample_subtree(ValueKind::MatrixF, 3, 10, &mut rng).unwrap().is_none());
        assert!(ss.build(ValueKind::MatrixF, None, 3, 10, &mut rng).is_err());
    }

    #[test]
    fn test_terminal_only_type_is_none() {
        let ss = space(&[("Add", 1.0)]);
        let mut rng = StdRng::seed_from_u64(15);
        // booleans have terminals here but no operator
        assert!(ss.has_terminal(ValueKind::ArrayB));
        assert!(!ss.has_operator(ValueKind::ArrayB));
        assert!(ss.sample_subtree(ValueKind::ArrayB, 1, 5, &mut rng).unwrap().is_none());
    }
}
