//! Search-space suggestions and their `optuna#kind(args)` wire encoding.
//!
//! A suggestion stands in for a property value when a study is built. The
//! remote sampler reads the encoded string and answers each ask with a
//! concrete sample in its place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::HopaasResult;
use crate::validation_error;

/// Prefix shared by every encoded suggestion.
pub const SUGGESTION_PREFIX: &str = "optuna#";

/// Token written in place of an absent float step.
pub const NO_STEP_TOKEN: &str = "NaN";

/// Describes how the remote sampler should draw one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Suggestion {
    /// Integer range [low, high] inclusive.
    Int {
        low: i64,
        high: i64,
        step: i64,
        log: bool,
    },
    /// Float range [low, high]; `step = None` means continuous.
    Float {
        low: f64,
        high: f64,
        step: Option<f64>,
        log: bool,
    },
    /// One of an ordered set of labels.
    Categorical { choices: Vec<String> },
    /// Legacy continuous uniform range.
    Uniform { low: f64, high: f64 },
    /// Legacy log-uniform range.
    LogUniform { low: f64, high: f64 },
    /// Legacy quantized uniform range.
    DiscreteUniform { low: f64, high: f64, q: f64 },
}

impl Suggestion {
    pub fn int(low: i64, high: i64) -> Self {
        Self::Int {
            low,
            high,
            step: 1,
            log: false,
        }
    }

    pub fn int_step(low: i64, high: i64, step: i64) -> Self {
        Self::Int {
            low,
            high,
            step,
            log: false,
        }
    }

    pub fn int_log(low: i64, high: i64) -> Self {
        Self::Int {
            low,
            high,
            step: 1,
            log: true,
        }
    }

    pub fn float(low: f64, high: f64) -> Self {
        Self::Float {
            low,
            high,
            step: None,
            log: false,
        }
    }

    pub fn float_step(low: f64, high: f64, step: f64) -> Self {
        Self::Float {
            low,
            high,
            step: Some(step),
            log: false,
        }
    }

    pub fn float_log(low: f64, high: f64) -> Self {
        Self::Float {
            low,
            high,
            step: None,
            log: true,
        }
    }

    pub fn categorical<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Categorical {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn uniform(low: f64, high: f64) -> Self {
        Self::Uniform { low, high }
    }

    pub fn log_uniform(low: f64, high: f64) -> Self {
        Self::LogUniform { low, high }
    }

    pub fn discrete_uniform(low: f64, high: f64, q: f64) -> Self {
        Self::DiscreteUniform { low, high, q }
    }

    /// The `<kind>` segment of the encoded form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Categorical { .. } => "categorical",
            Self::Uniform { .. } => "uniform",
            Self::LogUniform { .. } => "loguniform",
            Self::DiscreteUniform { .. } => "discrete_uniform",
        }
    }

    /// Canonical wire string, e.g. `optuna#int(0,100,1,false)`.
    pub fn encode(&self) -> String {
        let args: Vec<String> = match self {
            Self::Int {
                low,
                high,
                step,
                log,
            } => vec![literal(*low), literal(*high), literal(*step), literal(*log)],
            Self::Float {
                low,
                high,
                step,
                log,
            } => vec![
                literal(*low),
                literal(*high),
                step.map(literal)
                    .unwrap_or_else(|| NO_STEP_TOKEN.to_string()),
                literal(*log),
            ],
            Self::Categorical { choices } => choices.clone(),
            Self::Uniform { low, high } | Self::LogUniform { low, high } => {
                vec![literal(*low), literal(*high)]
            }
            Self::DiscreteUniform { low, high, q } => {
                vec![literal(*low), literal(*high), literal(*q)]
            }
        };

        format!("{SUGGESTION_PREFIX}{}({})", self.kind(), args.join(","))
    }

    /// Check bounds and preconditions before the suggestion goes on the wire.
    pub fn validate(&self) -> HopaasResult<()> {
        match self {
            Self::Int {
                low, high, step, ..
            } => {
                if low > high {
                    return Err(validation_error!(
                        "int suggestion: low ({low}) must not exceed high ({high})"
                    ));
                }
                if *step <= 0 {
                    return Err(validation_error!("int suggestion: step must be positive, got {step}"));
                }
            }
            Self::Float {
                low, high, step, ..
            } => {
                check_float_range("float", *low, *high)?;
                if let Some(step) = step {
                    if !step.is_finite() || *step <= 0.0 {
                        return Err(validation_error!(
                            "float suggestion: step must be a positive number, got {step}"
                        ));
                    }
                }
            }
            Self::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(validation_error!("categorical suggestion needs at least one choice"));
                }
                if let Some(bad) = choices.iter().find(|c| c.contains(',')) {
                    return Err(validation_error!(
                        "categorical choice {bad:?} must not contain ','"
                    ));
                }
            }
            Self::Uniform { low, high } => check_float_range("uniform", *low, *high)?,
            Self::LogUniform { low, high } => check_float_range("loguniform", *low, *high)?,
            Self::DiscreteUniform { low, high, q } => {
                check_float_range("discrete_uniform", *low, *high)?;
                if !q.is_finite() || *q <= 0.0 {
                    return Err(validation_error!(
                        "discrete_uniform suggestion: q must be a positive number, got {q}"
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// JSON literal form of a number or bool (`1`, `1.0`, `true`).
fn literal<T: Into<serde_json::Value>>(value: T) -> String {
    value.into().to_string()
}

fn check_float_range(kind: &str, low: f64, high: f64) -> HopaasResult<()> {
    if !low.is_finite() || !high.is_finite() {
        return Err(validation_error!(
            "{kind} suggestion: bounds must be finite, got ({low}, {high})"
        ));
    }
    if low > high {
        return Err(validation_error!(
            "{kind} suggestion: low ({low}) must not exceed high ({high})"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<Suggestion> {
        vec![
            Suggestion::int(0, 100),
            Suggestion::int_step(0, 100, 5),
            Suggestion::int_log(1, 1000),
            Suggestion::float(-1.0, 1.0),
            Suggestion::float_step(-1.0, 1.0, 0.1),
            Suggestion::float_log(1e-3, 1e3),
            Suggestion::categorical(["Charmander", "Squirtle", "Bulbasaur"]),
            Suggestion::uniform(-50.0, 50.0),
            Suggestion::log_uniform(1e-5, 1e-1),
            Suggestion::discrete_uniform(0.0, 1.0, 0.25),
        ]
    }

    #[test]
    fn encoding_is_deterministic_and_prefixed() {
        for suggestion in all_kinds() {
            let first = suggestion.encode();
            assert_eq!(first, suggestion.encode());
            assert_eq!(first, suggestion.to_string());
            let head = format!("optuna#{}(", suggestion.kind());
            assert!(first.starts_with(&head), "{first} should start with {head}");
            assert!(first.ends_with(')'));
        }
    }

    #[test]
    fn int_encoding() {
        assert_eq!(Suggestion::int(0, 100).encode(), "optuna#int(0,100,1,false)");
        assert_eq!(Suggestion::int_step(0, 100, 5).encode(), "optuna#int(0,100,5,false)");
        assert_eq!(Suggestion::int_log(1, 1000).encode(), "optuna#int(1,1000,1,true)");
    }

    #[test]
    fn float_without_step_writes_nan() {
        let encoded = Suggestion::float(1.0, 2.0).encode();
        assert_eq!(encoded, "optuna#float(1.0,2.0,NaN,false)");
        assert!(encoded.contains(",NaN,"));
    }

    #[test]
    fn float_with_step_and_log() {
        assert_eq!(
            Suggestion::float_step(-1.0, 1.0, 0.1).encode(),
            "optuna#float(-1.0,1.0,0.1,false)"
        );
        assert_eq!(
            Suggestion::float_log(0.001, 1000.0).encode(),
            "optuna#float(0.001,1000.0,NaN,true)"
        );
    }

    #[test]
    fn categorical_joins_raw_choices() {
        let s = Suggestion::categorical(vec!["adam".to_string(), "sgd".to_string()]);
        assert_eq!(s.encode(), "optuna#categorical(adam,sgd)");
    }

    #[test]
    fn legacy_kinds() {
        assert_eq!(Suggestion::uniform(-50.0, 50.0).encode(), "optuna#uniform(-50.0,50.0)");
        assert_eq!(
            Suggestion::log_uniform(0.5, 2.0).encode(),
            "optuna#loguniform(0.5,2.0)"
        );
        assert_eq!(
            Suggestion::discrete_uniform(0.0, 1.0, 0.25).encode(),
            "optuna#discrete_uniform(0.0,1.0,0.25)"
        );
    }

    #[test]
    fn validation_accepts_well_formed() {
        for suggestion in all_kinds() {
            assert!(suggestion.validate().is_ok(), "{suggestion:?}");
        }
    }

    #[test]
    fn validation_rejects_inverted_bounds() {
        assert!(Suggestion::int(10, 1).validate().is_err());
        assert!(Suggestion::float(2.0, 1.0).validate().is_err());
        assert!(Suggestion::uniform(1.0, 0.0).validate().is_err());
        // Degenerate ranges are allowed.
        assert!(Suggestion::int(3, 3).validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_steps_and_choices() {
        assert!(Suggestion::int_step(0, 10, 0).validate().is_err());
        assert!(Suggestion::float_step(0.0, 1.0, -0.5).validate().is_err());
        assert!(Suggestion::float(f64::NAN, 1.0).validate().is_err());
        assert!(Suggestion::discrete_uniform(0.0, 1.0, 0.0).validate().is_err());
        assert!(Suggestion::categorical(Vec::<String>::new()).validate().is_err());
        assert!(Suggestion::categorical(["a,b", "c"]).validate().is_err());
    }
}
