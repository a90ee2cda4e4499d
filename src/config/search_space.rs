use super::traits::ConfigSection;
use crate::error::TypedGpError;
use crate::functions::nodetype::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpaceConfig {
    /// Operator name to sampling weight. Empty enables every operator at weight 1.
    pub functions: BTreeMap<String, f64>,
    /// Derive terminal weights from each feature's correlation with the target.
    pub weights_init: bool,
}

impl SearchSpaceConfig {
    pub fn with_functions<I, S>(functions: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            functions: functions.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            weights_init: true,
        }
    }

    /// Parsed operator weights; leaf kinds are ignored.
    pub fn operator_weights(&self) -> Result<BTreeMap<NodeKind, f64>, TypedGpError> {
        let mut out = BTreeMap::new();
        for (name, weight) in &self.functions {
            let kind = NodeKind::from_name(name)
                .ok_or_else(|| TypedGpError::Configuration(format!("Unknown operator '{}'", name)))?;
            if !kind.is_leaf() {
                out.insert(kind, *weight);
            }
        }
        Ok(out)
    }
}

impl ConfigSection for SearchSpaceConfig {
    fn section_name() -> &'static str {
        "search_space"
    }

    fn validate(&self) -> Result<(), TypedGpError> {
        if self.functions.values().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(TypedGpError::Configuration(
                "Operator weights must be non-negative".to_string(),
            ));
        }
        self.operator_weights().map(|_| ())
    }
}
