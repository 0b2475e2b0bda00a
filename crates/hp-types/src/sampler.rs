//! Sampler descriptors forwarded to the remote service.

use serde::{Deserialize, Serialize};

use crate::errors::HopaasResult;

/// Tree-structured Parzen estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpeSampler {
    pub n_startup_trials: u32,
    pub n_ei_candidates: u32,
    pub consider_magic_clip: bool,
}

impl Default for TpeSampler {
    fn default() -> Self {
        Self {
            n_startup_trials: 10,
            n_ei_candidates: 24,
            consider_magic_clip: true,
        }
    }
}

impl TpeSampler {
    pub fn with_startup_trials(mut self, n: u32) -> Self {
        self.n_startup_trials = n;
        self
    }

    pub fn with_ei_candidates(mut self, n: u32) -> Self {
        self.n_ei_candidates = n;
        self
    }
}

/// Sampling strategy run by the server. Serializes as `{name, args}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum Sampler {
    #[serde(rename = "TPESampler")]
    Tpe(TpeSampler),
}

impl Default for Sampler {
    fn default() -> Self {
        Self::Tpe(TpeSampler::default())
    }
}

impl From<TpeSampler> for Sampler {
    fn from(sampler: TpeSampler) -> Self {
        Self::Tpe(sampler)
    }
}

impl Sampler {
    /// Every sampler kind with its default settings.
    pub fn variants() -> Vec<Sampler> {
        vec![Sampler::Tpe(TpeSampler::default())]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tpe(_) => "TPESampler",
        }
    }

    pub fn as_dict(&self) -> HopaasResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
