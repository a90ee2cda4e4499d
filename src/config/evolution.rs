use super::traits::ConfigSection;
use crate::error::TypedGpError;
use serde::{Deserialize, Serialize};

/// Structural budgets and variation rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub max_depth: usize,
    pub max_size: usize,
    /// Probability of crossover instead of mutation when varying.
    pub cx_prob: f64,
    pub mutation_probs: MutationProbs,
    pub seed: Option<u64>,
}

/// Relative sampling weights of the mutation operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationProbs {
    pub point: f64,
    pub insert: f64,
    pub delete: f64,
    pub subtree: f64,
    pub toggle_weight_on: f64,
    pub toggle_weight_off: f64,
}

impl Default for MutationProbs {
    fn default() -> Self {
        Self {
            point: 1.0 / 6.0,
            insert: 1.0 / 6.0,
            delete: 1.0 / 6.0,
            subtree: 1.0 / 6.0,
            toggle_weight_on: 1.0 / 6.0,
            toggle_weight_off: 1.0 / 6.0,
        }
    }
}

impl MutationProbs {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.point,
            self.insert,
            self.delete,
            self.subtree,
            self.toggle_weight_on,
            self.toggle_weight_off,
        ]
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            max_depth: 6,
            max_size: 50,
            cx_prob: 1.0 / 7.0,
            mutation_probs: MutationProbs::default(),
            seed: None,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), TypedGpError> {
        if self.population_size == 0 {
            return Err(TypedGpError::Configuration(
                "Population size must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 || self.max_size == 0 {
            return Err(TypedGpError::Configuration(
                "Maximum depth and size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cx_prob) {
            return Err(TypedGpError::Configuration(
                "Crossover probability must be between 0 and 1".to_string(),
            ));
        }
        let probs = self.mutation_probs.as_array();
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(TypedGpError::Configuration(
                "Mutation probabilities must be non-negative".to_string(),
            ));
        }
        if self.cx_prob < 1.0 && probs.iter().all(|p| *p == 0.0) {
            return Err(TypedGpError::Configuration(
                "At least one mutation needs a positive probability".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_rates() {
        let mut cfg = EvolutionConfig::default();
        cfg.cx_prob = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = EvolutionConfig::default();
        cfg.mutation_probs.delete = -0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = EvolutionConfig::default();
        cfg.max_size = 0;
        assert!(matches!(cfg.validate(), Err(TypedGpError::Configuration(_))));
    }
}
