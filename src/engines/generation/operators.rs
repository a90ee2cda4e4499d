use super::ast::NodeId;
use super::program::Program;
use super::search_space::SearchSpace;
use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::utils::sampling::select_weighted;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The tree mutations, in the order of `MutationProbs::as_array`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// Swap a node for another with the same signature.
    Point,
    /// Wrap a node in a new operator.
    Insert,
    /// Replace a subtree with a terminal.
    Delete,
    /// Replace a subtree with a freshly grown one.
    Subtree,
    ToggleWeightOn,
    ToggleWeightOff,
}

impl MutationKind {
    pub const ALL: [MutationKind; 6] = [
        MutationKind::Point,
        MutationKind::Insert,
        MutationKind::Delete,
        MutationKind::Subtree,
        MutationKind::ToggleWeightOn,
        MutationKind::ToggleWeightOff,
    ];

    /// Every node of `program` paired with the weight of choosing it as the
    /// mutation spot. Nodes this mutation cannot touch get zero.
    pub fn find_spots(self, program: &Program, ss: &SearchSpace, params: &EvolutionConfig) -> Vec<(NodeId, f64)> {
        let tree = &program.tree;
        let size = program.size(true);

        tree.pre_order()
            .into_iter()
            .map(|id| {
                let node = tree.node(id);
                let allowed = match self {
                    MutationKind::Point | MutationKind::Delete => true,
                    MutationKind::Insert => {
                        size < params.max_size
                            && tree.depth_of(id) + tree.subtree_depth(id) < params.max_depth
                            && ss.has_operator(node.ret_type)
                    }
                    MutationKind::Subtree => {
                        tree.depth_of(id) < params.max_depth
                            && (ss.has_operator(node.ret_type) || ss.has_terminal(node.ret_type))
                    }
                    MutationKind::ToggleWeightOn => {
                        size < params.max_size && node.can_toggle_weight() && !node.is_weighted()
                    }
                    MutationKind::ToggleWeightOff => node.can_toggle_weight() && node.is_weighted(),
                };
                (id, if allowed { node.prob_change } else { 0.0 })
            })
            .collect()
    }

    /// Applies the mutation at `spot`. `Ok(false)` means nothing suitable
    /// could be drawn and `program` is unchanged.
    pub fn apply<R: Rng>(
        self,
        program: &mut Program,
        spot: NodeId,
        ss: &SearchSpace,
        params: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<bool> {
        let changed = match self {
            MutationKind::Point => point(program, spot, ss, rng),
            MutationKind::Insert => insert(program, spot, ss, params, rng),
            MutationKind::Delete => delete(program, spot, ss, rng),
            MutationKind::Subtree => subtree(program, spot, ss, params, rng)?,
            MutationKind::ToggleWeightOn => program.tree.node_mut(spot).set_is_weighted(true),
            MutationKind::ToggleWeightOff => program.tree.node_mut(spot).set_is_weighted(false),
        };
        if changed {
            program.invalidate();
        }
        Ok(changed)
    }
}

fn point<R: Rng>(program: &mut Program, spot: NodeId, ss: &SearchSpace, rng: &mut R) -> bool {
    match ss.get_similar(program.tree.node(spot), rng) {
        Some(node) => {
            program.tree.replace_node(spot, node);
            true
        }
        None => false,
    }
}

fn insert<R: Rng>(
    program: &mut Program,
    spot: NodeId,
    ss: &SearchSpace,
    params: &EvolutionConfig,
    rng: &mut R,
) -> bool {
    let size = program.size(true);
    // the wrapper itself takes one unit
    let max_arity = params.max_size.saturating_sub(size + 1);
    if max_arity == 0 {
        return false;
    }
    let ret = program.tree.node(spot).ret_type;
    let Some(op) = ss.sample_operator_with_argument(ret, ret, true, Some(max_arity), rng) else {
        return false;
    };
    let Some(position) = op.arg_types.iter().position(|a| *a == ret) else {
        return false;
    };

    let mut siblings = Vec::with_capacity(op.arity().saturating_sub(1));
    for (i, arg) in op.arg_types.iter().enumerate() {
        if i == position {
            continue;
        }
        let terminal = ss
            .sample_terminal(Some(*arg), false, rng)
            .or_else(|| ss.sample_terminal(Some(*arg), true, rng));
        match terminal {
            Some(t) => siblings.push(t),
            None => return false,
        }
    }
    let after = siblings.split_off(position);
    program.tree.wrap(spot, op, siblings, after);
    true
}

fn delete<R: Rng>(program: &mut Program, spot: NodeId, ss: &SearchSpace, rng: &mut R) -> bool {
    let ret = program.tree.node(spot).ret_type;
    match ss.sample_terminal(Some(ret), false, rng) {
        Some(terminal) => {
            program.tree.prune_children(spot);
            program.tree.replace_node(spot, terminal);
            true
        }
        None => false,
    }
}

fn subtree<R: Rng>(
    program: &mut Program,
    spot: NodeId,
    ss: &SearchSpace,
    params: &EvolutionConfig,
    rng: &mut R,
) -> Result<bool> {
    let outside = program.size(true) - program.size_at(spot, true);
    let spot_depth = program.depth_of(spot);
    if params.max_size <= outside || params.max_depth <= spot_depth {
        return Ok(false);
    }

    let max_depth = params.max_depth - spot_depth;
    let max_size = rng.gen_range(1..=params.max_size - outside);
    let ret = program.tree.node(spot).ret_type;
    match ss.sample_subtree(ret, max_depth, max_size, rng)? {
        Some(grown) => {
            program.tree.graft(spot, &grown, grown.root());
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Replaces a random subtree of `mom` with a type-compatible subtree of
/// `dad` that keeps the child within the budgets. Up to three spots are
/// tried; `None` when all fail.
pub fn crossover<R: Rng>(
    mom: &Program,
    dad: &Program,
    params: &EvolutionConfig,
    rng: &mut R,
) -> Option<Program> {
    let size = mom.size(true);
    let (mom_ids, mom_weights): (Vec<NodeId>, Vec<f64>) = mom
        .tree
        .pre_order()
        .into_iter()
        .map(|id| {
            let node = mom.tree.node(id);
            let open = mom.size_at(id, true) < params.max_size && mom.depth_of(id) < params.max_depth;
            (id, if open { node.prob_change } else { 0.0 })
        })
        .unzip();

    for attempt in 0..3 {
        let spot = mom_ids[select_weighted(&mom_weights, rng)?];
        let ret = mom.tree.node(spot).ret_type;
        let allowed_size = params.max_size.saturating_sub(size - mom.size_at(spot, true));
        let allowed_depth = params.max_depth.saturating_sub(mom.depth_of(spot));

        let (dad_ids, dad_weights): (Vec<NodeId>, Vec<f64>) = dad
            .tree
            .pre_order()
            .into_iter()
            .map(|id| {
                let node = dad.tree.node(id);
                let fits = node.ret_type == ret
                    && dad.size_at(id, true) <= allowed_size
                    && dad.subtree_depth(id) <= allowed_depth;
                (id, if fits { node.prob_change } else { 0.0 })
            })
            .unzip();

        match select_weighted(&dad_weights, rng) {
            Some(i) => {
                let mut child = mom.clone();
                child.tree.graft(spot, &dad.tree, dad_ids[i]);
                child.invalidate();
                return Some(child);
            }
            None => log::trace!("crossover attempt {} found no donor for {}", attempt + 1, ret),
        }
    }
    None
}
