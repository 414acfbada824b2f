//! Driver-facing configuration surface: parses the JSON shape the
//! demonstration binary loads its parameters from. Not a parser for the
//! legacy `ms` argument-string grammar — that remains out of scope.

use serde::Deserialize;

use crate::popmodel::PopulationModel;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationModelType {
    Constant,
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopulationModelConfig {
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: PopulationModelType,
    pub param: f64,
    /// Growth rate, only meaningful for `Exponential`.
    #[serde(default)]
    pub alpha: f64,
}

impl PopulationModelConfig {
    fn into_model(self) -> PopulationModel {
        match self.kind {
            PopulationModelType::Constant => PopulationModel::constant(self.time, self.param),
            PopulationModelType::Exponential => PopulationModel::exponential(self.time, self.param, self.alpha),
        }
    }
}

fn default_segment_block_size() -> usize {
    1024
}

fn default_population_block_size() -> usize {
    1024
}

fn default_population_models() -> Vec<PopulationModelConfig> {
    vec![PopulationModelConfig {
        time: 0.0,
        kind: PopulationModelType::Constant,
        param: 1.0,
        alpha: 0.0,
    }]
}

/// The demonstration driver's full set of recognized options.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub sample_size: u32,
    pub num_loci: u32,
    pub random_seed: u64,
    #[serde(default)]
    pub recombination_rate: f64,
    #[serde(default)]
    pub mutation_rate: f64,
    #[serde(default = "default_population_models")]
    pub population_models: Vec<PopulationModelConfig>,
    #[serde(default)]
    pub max_memory: usize,
    #[serde(default = "default_segment_block_size")]
    pub segment_block_size: usize,
    #[serde(default = "default_population_block_size")]
    pub population_block_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            num_loci: 1000,
            random_seed: 42,
            recombination_rate: 0.0,
            mutation_rate: 0.0,
            population_models: default_population_models(),
            max_memory: 0,
            segment_block_size: default_segment_block_size(),
            population_block_size: default_population_block_size(),
        }
    }
}

impl SimulationConfig {
    pub fn population_models(&self) -> Vec<PopulationModel> {
        self.population_models.iter().cloned().map(PopulationModelConfig::into_model).collect()
    }

    pub fn to_sim_params(&self) -> crate::simulator::SimParams {
        crate::simulator::SimParams {
            sample_size: self.sample_size,
            num_loci: self.num_loci,
            recombination_rate: self.recombination_rate,
            population_models: self.population_models(),
            max_memory: self.max_memory,
            segment_block_size: self.segment_block_size,
            population_block_size: self.population_block_size,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::popmodel::PopulationModelKind;

    #[test]
    fn parses_minimal_json() {
        let json = r#"{"sample_size": 5, "num_loci": 100, "random_seed": 1}"#;
        let cfg: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.sample_size, 5);
        assert_eq!(cfg.recombination_rate, 0.0);
        assert_eq!(cfg.population_models().len(), 1);
    }

    #[test]
    fn parses_explicit_population_models() {
        let json = r#"{
            "sample_size": 5, "num_loci": 100, "random_seed": 1,
            "population_models": [
                {"time": 0.0, "type": "constant", "param": 1.0},
                {"time": 0.5, "type": "exponential", "param": 2.0, "alpha": 0.1}
            ]
        }"#;
        let cfg: SimulationConfig = serde_json::from_str(json).unwrap();
        let models = cfg.population_models();
        assert_eq!(models.len(), 2);
        assert!(matches!(models[1].kind, PopulationModelKind::Exponential { .. }));
    }
}
