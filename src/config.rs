use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::equity::DEFAULT_HARD_LIMIT;
use crate::error::EngineResult;

/// Tunables for equity and EV queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest number of combo combinations enumerated exactly.
    pub hard_limit: u64,
    /// Monte Carlo trials per equity query.
    pub iterations: usize,
    /// Fixed seed for reproducible sampling.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hard_limit: DEFAULT_HARD_LIMIT,
            iterations: 10_000,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> EngineResult<EngineConfig> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
