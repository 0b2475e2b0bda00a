//! # hp-study
//!
//! Study and trial lifecycle on top of the Hopaas REST client.
//!
//! ```no_run
//! use hp_study::{Study, Suggestion};
//!
//! # fn main() -> Result<(), hp_study::HopaasError> {
//! let mut study = Study::builder("x_squared")
//!     .property("x", Suggestion::uniform(-50.0, 50.0))
//!     .connect()?;
//!
//! study.trial(|trial| {
//!     let x: f64 = trial.get_as("x")?;
//!     trial.set_loss(x * x);
//!     Ok::<_, hp_study::HopaasError>(())
//! })?;
//! # Ok(())
//! # }
//! ```

mod study;
mod trial;

pub use study::{Study, StudyBuilder, ABORTED_MESSAGE, CONFIG_KEY};
pub use trial::{ActiveTrial, Trial};

pub use hp_client::{Client, ClientConfig, HttpTransport, Transport};
pub use hp_types::{
    Direction, FrozenTrial, HopaasError, HopaasResult, HyperbandPruner, MaxResources,
    MedianPruner, NopPruner, Pruner, Sampler, Suggestion, ThresholdPruner, TpeSampler, TrialId,
    TrialState,
};
