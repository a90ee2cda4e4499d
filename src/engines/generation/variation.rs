use super::operators::{crossover, MutationKind};
use super::program::Program;
use super::search_space::SearchSpace;
use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::utils::sampling::select_weighted;
use rand::Rng;

const ATTEMPTS: usize = 3;

/// Produces offspring from parents under the configured budgets.
pub struct Variation<'a> {
    ss: &'a SearchSpace,
    params: &'a EvolutionConfig,
}

impl<'a> Variation<'a> {
    pub fn new(ss: &'a SearchSpace, params: &'a EvolutionConfig) -> Self {
        Self { ss, params }
    }

    /// A mutated copy of `parent`, or `None` when no attempt yields a child
    /// within `max_size` and `max_depth`.
    pub fn mutate<R: Rng>(&self, parent: &Program, rng: &mut R) -> Result<Option<Program>> {
        let probs = self.params.mutation_probs.as_array();
        for attempt in 0..ATTEMPTS {
            let Some(choice) = select_weighted(&probs, rng) else {
                return Ok(None);
            };
            let kind = MutationKind::ALL[choice];

            let (ids, weights): (Vec<_>, Vec<_>) =
                kind.find_spots(parent, self.ss, self.params).into_iter().unzip();
            let Some(i) = select_weighted(&weights, rng) else {
                log::trace!("{:?}: no spot on attempt {}", kind, attempt + 1);
                continue;
            };

            let mut child = parent.clone();
            if !kind.apply(&mut child, ids[i], self.ss, self.params, rng)? {
                continue;
            }
            if self.within_budget(&child) {
                return Ok(Some(child));
            }
            log::trace!(
                "{:?}: child of size {} and depth {} over budget",
                kind,
                child.size(true),
                child.depth()
            );
        }
        Ok(None)
    }

    pub fn cross<R: Rng>(&self, mom: &Program, dad: &Program, rng: &mut R) -> Option<Program> {
        crossover(mom, dad, self.params, rng).filter(|child| self.within_budget(child))
    }

    /// Crossover with probability `cx_prob` when a second parent is given,
    /// mutation otherwise.
    pub fn vary<R: Rng>(&self, mom: &Program, dad: Option<&Program>, rng: &mut R) -> Result<Option<Program>> {
        match dad {
            Some(dad) if rng.gen::<f64>() < self.params.cx_prob => Ok(self.cross(mom, dad, rng)),
            _ => self.mutate(mom, rng),
        }
    }

    fn within_budget(&self, child: &Program) -> bool {
        child.size(true) <= self.params.max_size && child.depth() <= self.params.max_depth
    }
}
