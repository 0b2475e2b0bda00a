//! Pruner descriptors forwarded to the remote service.
//!
//! Pruning runs entirely on the server. The client only ships the
//! configuration inside `hopaas_config` and polls `should_prune`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::HopaasResult;

/// Never prunes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NopPruner {}

/// Upper resource budget for hyperband: `"auto"` or an explicit count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaxResources {
    #[default]
    Auto,
    Fixed(u64),
}

impl Serialize for MaxResources {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Fixed(n) => serializer.serialize_u64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for MaxResources {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Fixed(u64),
            Label(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Fixed(n) => Ok(Self::Fixed(n)),
            Repr::Label(label) if label == "auto" => Ok(Self::Auto),
            Repr::Label(other) => Err(serde::de::Error::custom(format!(
                "max_resources must be \"auto\" or an integer, got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperbandPruner {
    pub min_resources: u64,
    pub max_resources: MaxResources,
    pub bootstrap_count: u64,
}

impl Default for HyperbandPruner {
    fn default() -> Self {
        Self {
            min_resources: 1,
            max_resources: MaxResources::Auto,
            bootstrap_count: 0,
        }
    }
}

/// Prunes trials whose intermediate loss is worse than the median so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianPruner {
    pub n_startup_trials: u32,
    pub n_warmup_steps: u32,
    pub interval_steps: u32,
    pub n_min_trials: u32,
}

impl Default for MedianPruner {
    fn default() -> Self {
        Self {
            n_startup_trials: 5,
            n_warmup_steps: 0,
            interval_steps: 1,
            n_min_trials: 1,
        }
    }
}

/// Prunes trials whose loss leaves `[lower, upper]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPruner {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub n_warmup_steps: u32,
    pub interval_steps: u32,
}

impl Default for ThresholdPruner {
    fn default() -> Self {
        Self {
            lower: None,
            upper: None,
            n_warmup_steps: 0,
            interval_steps: 1,
        }
    }
}

impl ThresholdPruner {
    pub fn with_upper(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }

    pub fn with_lower(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }
}

/// Pruning strategy run by the server. Serializes as `{name, args}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum Pruner {
    #[serde(rename = "NopPruner")]
    Nop(NopPruner),
    #[serde(rename = "HyperbandPruner")]
    Hyperband(HyperbandPruner),
    #[serde(rename = "MedianPruner")]
    Median(MedianPruner),
    #[serde(rename = "ThresholdPruner")]
    Threshold(ThresholdPruner),
}

impl Default for Pruner {
    fn default() -> Self {
        Self::Nop(NopPruner::default())
    }
}

impl From<NopPruner> for Pruner {
    fn from(pruner: NopPruner) -> Self {
        Self::Nop(pruner)
    }
}

impl From<HyperbandPruner> for Pruner {
    fn from(pruner: HyperbandPruner) -> Self {
        Self::Hyperband(pruner)
    }
}

impl From<MedianPruner> for Pruner {
    fn from(pruner: MedianPruner) -> Self {
        Self::Median(pruner)
    }
}

impl From<ThresholdPruner> for Pruner {
    fn from(pruner: ThresholdPruner) -> Self {
        Self::Threshold(pruner)
    }
}

impl Pruner {
    /// Every pruner kind with its default settings.
    pub fn variants() -> Vec<Pruner> {
        vec![
            Pruner::Nop(NopPruner::default()),
            Pruner::Hyperband(HyperbandPruner::default()),
            Pruner::Median(MedianPruner::default()),
            Pruner::Threshold(ThresholdPruner::default()),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nop(_) => "NopPruner",
            Self::Hyperband(_) => "HyperbandPruner",
            Self::Median(_) => "MedianPruner",
            Self::Threshold(_) => "ThresholdPruner",
        }
    }

    pub fn as_dict(&self) -> HopaasResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
