use super::program::{Program, ProgramType};
use super::search_space::SearchSpace;
use super::variation::Variation;
use crate::config::EvolutionConfig;
use crate::error::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;

/// Draws `params.population_size` programs in parallel. Individual `i` uses
/// its own generator seeded with `seed + i`, so the result does not depend
/// on thread scheduling.
pub fn initial_population(
    ss: &Arc<SearchSpace>,
    program_type: ProgramType,
    params: &EvolutionConfig,
    seed: u64,
) -> Result<Vec<Program>> {
    log::info!("Initializing {} {:?} programs", params.population_size, program_type);
    (0..params.population_size)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            ss.make_program(program_type, 0, 0, params, &mut rng)
        })
        .collect()
}

/// One variation per parent, paired with the next parent for crossover.
/// Slots where variation failed are `None`.
pub fn offspring(
    parents: &[Program],
    ss: &SearchSpace,
    params: &EvolutionConfig,
    seed: u64,
) -> Result<Vec<Option<Program>>> {
    let variation = Variation::new(ss, params);
    let n = parents.len();
    let children = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let dad = (n > 1).then(|| &parents[(i + 1) % n]);
            variation.vary(&parents[i], dad, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;

    let failed = children.iter().filter(|c| c.is_none()).count();
    if failed > 0 {
        log::debug!("{} of {} variations produced no child", failed, n);
    }
    Ok(children)
}
