//! Study orchestration and the trial lifecycle.
//!
//! A trial moves `Requested -> Active -> {Completed | Failed | Pruned}`:
//!
//! * opening a scope asks the server for a trial and registers it;
//! * leaving the scope with a loss sends `tell`, unless the server currently
//!   advises pruning, in which case nothing is sent;
//! * leaving the scope without a loss sends `mark_as_failed`.
//!
//! The closing call happens on every exit path, including an error returned
//! by the trial body and a panic unwinding through it.

use hp_client::{Client, HttpTransport, Transport};
use hp_types::{
    consistency_error, parse_trial_tag, valid_properties, validation_error, Direction,
    FrozenTrial, HopaasError, HopaasResult, Property, PropertyMap, Pruner, Sampler, TrialId,
    TrialState, TRIAL_KEY,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::trial::{ActiveTrial, PruneQuery, Trial};

/// Error text sent when a trial ends without a loss.
pub const ABORTED_MESSAGE: &str = "Computation aborted";

/// Key of the study configuration injected into every ask.
pub const CONFIG_KEY: &str = "hopaas_config";

/// Collects the static configuration of a [`Study`].
#[derive(Debug, Clone)]
pub struct StudyBuilder {
    name: String,
    properties: Vec<(String, Property)>,
    raw_properties: Option<Value>,
    special_properties: PropertyMap,
    raw_special_properties: Option<Value>,
    direction: Direction,
    sampler: Sampler,
    pruner: Pruner,
}

impl StudyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            raw_properties: None,
            special_properties: PropertyMap::new(),
            raw_special_properties: None,
            direction: Direction::default(),
            sampler: Sampler::default(),
            pruner: Pruner::default(),
        }
    }

    /// Add a static property; suggestions are sampled by the server.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Property>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Add static properties from a JSON mapping.
    pub fn properties_json(mut self, properties: Value) -> Self {
        self.raw_properties = Some(properties);
        self
    }

    /// Add a server-side configuration override. A leading `_` is optional.
    pub fn special_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.special_properties.insert(name.into(), value.into());
        self
    }

    pub fn special_properties(mut self, properties: Value) -> Self {
        self.raw_special_properties = Some(properties);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn sampler(mut self, sampler: impl Into<Sampler>) -> Self {
        self.sampler = sampler.into();
        self
    }

    pub fn pruner(mut self, pruner: impl Into<Pruner>) -> Self {
        self.pruner = pruner.into();
        self
    }

    /// Validate the configuration and encode every suggestion.
    pub fn build<T: Transport>(self, client: Client<T>) -> HopaasResult<Study<T>> {
        let mut properties = PropertyMap::new();
        if let Some(raw) = self.raw_properties {
            match raw {
                Value::Object(map) => properties.extend(map),
                _ => return Err(validation_error!("study properties must be a mapping")),
            }
        }
        for (name, property) in self.properties {
            if properties.contains_key(&name) {
                return Err(validation_error!("property {name:?} is defined twice"));
            }
            properties.insert(name, property.into_wire()?);
        }

        let mut special = valid_properties(self.raw_special_properties, true)?.unwrap_or_default();
        let extra = valid_properties(Some(Value::Object(self.special_properties)), false)?
            .unwrap_or_default();
        for (name, value) in extra {
            if special.contains_key(&name) {
                return Err(validation_error!("special property {name:?} is defined twice"));
            }
            special.insert(name, value);
        }

        debug!(
            "Built study {:?} with {} properties and {} overrides",
            self.name,
            properties.len(),
            special.len()
        );
        Ok(Study {
            name: self.name,
            properties,
            special_properties: special,
            direction: self.direction,
            sampler: self.sampler,
            pruner: self.pruner,
            client,
            study_id: None,
            trials: BTreeMap::new(),
        })
    }

    /// Build against the server named in `~/.hopaasrc`, prompting if needed.
    pub fn connect(self) -> HopaasResult<Study<HttpTransport>> {
        let client = Client::from_config_file(None::<&Path>, false)?;
        self.build(client)
    }
}

/// A named optimization study backed by the remote service.
pub struct Study<T: Transport = HttpTransport> {
    name: String,
    properties: PropertyMap,
    special_properties: PropertyMap,
    direction: Direction,
    sampler: Sampler,
    pruner: Pruner,
    client: Client<T>,
    study_id: Option<String>,
    trials: BTreeMap<TrialId, Trial>,
}

impl Study<HttpTransport> {
    pub fn builder(name: impl Into<String>) -> StudyBuilder {
        StudyBuilder::new(name)
    }
}

impl<T: Transport> Study<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn pruner(&self) -> &Pruner {
        &self.pruner
    }

    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    /// Static properties as sent on the wire (suggestions already encoded).
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Configuration overrides, without their leading `_`.
    pub fn special_properties(&self) -> &PropertyMap {
        &self.special_properties
    }

    /// True once the server has assigned a study id.
    pub fn is_initialized(&self) -> bool {
        self.study_id.is_some()
    }

    pub fn study_id(&self) -> Option<&str> {
        self.study_id.as_deref()
    }

    /// Snapshot of every trial this instance opened.
    pub fn trials(&self) -> BTreeMap<TrialId, FrozenTrial> {
        let study_id = self.study_id.as_deref().unwrap_or_default();
        self.trials
            .iter()
            .map(|(id, trial)| (*id, trial.freeze(study_id)))
            .collect()
    }

    /// Body of the `ask` request.
    pub fn ask_payload(&self) -> HopaasResult<PropertyMap> {
        let mut payload = self.properties.clone();
        payload.insert(
            CONFIG_KEY.to_string(),
            json!({
                "title": self.name,
                "direction": self.direction,
                "sampler": self.sampler.as_dict()?,
                "pruner": self.pruner.as_dict()?,
            }),
        );
        for (name, value) in &self.special_properties {
            payload.insert(format!("_{name}"), value.clone());
        }
        Ok(payload)
    }

    /// Id of the best trial in the whole remote study.
    pub fn best_trial_id(&self) -> HopaasResult<TrialId> {
        let study_id = self.study_id.as_deref().ok_or_else(|| {
            consistency_error!("study {:?} is not initialized; open a trial first", self.name)
        })?;
        self.client.get_best_trial(study_id, 0)
    }

    /// The best trial, if this instance opened it.
    pub fn best_trial(&self) -> HopaasResult<Option<FrozenTrial>> {
        let best = self.best_trial_id()?;
        Ok(self
            .trials
            .get(&best)
            .map(|trial| trial.freeze(self.study_id.as_deref().unwrap_or_default())))
    }

    /// Run `body` against a fresh trial.
    ///
    /// The trial is reported when `body` returns, whether with `Ok` or
    /// `Err`, and when it panics. An error from `body` takes precedence over
    /// a failure to report; the latter is logged.
    pub fn trial<F, R, E>(&mut self, body: F) -> Result<R, E>
    where
        F: FnOnce(&mut ActiveTrial<'_, T>) -> Result<R, E>,
        E: From<HopaasError>,
    {
        let trial_id = self.open_trial()?;
        let study_id = self
            .study_id
            .as_deref()
            .ok_or_else(|| consistency_error!("study id missing after ask"))?;
        let trial = self
            .trials
            .get_mut(&trial_id)
            .ok_or_else(|| consistency_error!("trial {trial_id} vanished after registration"))?;

        let mut scope = TrialScope {
            active: ActiveTrial {
                trial,
                query: PruneQuery {
                    client: &self.client,
                    study_id,
                },
            },
            finalized: false,
        };
        let outcome = body(&mut scope.active);
        let reported = scope.finalize();

        match (outcome, reported) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(report_err)) => Err(report_err.into()),
            (Err(body_err), Ok(_)) => Err(body_err),
            (Err(body_err), Err(report_err)) => {
                error!("Failed to report trial {}: {}", trial_id, report_err);
                Err(body_err)
            }
        }
    }

    /// Requested -> Active.
    fn open_trial(&mut self) -> HopaasResult<TrialId> {
        let payload = self.ask_payload()?;
        let mut reply = self.client.ask(&payload)?;

        let tag = match reply.remove(TRIAL_KEY) {
            Some(Value::String(tag)) => tag,
            other => {
                return Err(HopaasError::bad_body(
                    200,
                    format!("{TRIAL_KEY} must be a string, got {other:?}"),
                ))
            }
        };
        let (study_id, trial_id) =
            parse_trial_tag(&tag).map_err(|e| HopaasError::bad_body(200, e.to_string()))?;

        if self.study_id.is_none() {
            info!("Study {:?} initialized as {}", self.name, study_id);
        }
        self.study_id = Some(study_id);

        if self.trials.contains_key(&trial_id) {
            return Err(consistency_error!(
                "server handed out trial {trial_id} twice for study {:?}",
                self.name
            ));
        }
        self.trials.insert(trial_id, Trial::new(trial_id, reply));
        info!("Opened trial {} of study {:?}", tag, self.name);
        Ok(trial_id)
    }
}

/// Reports the trial exactly once, even while unwinding.
struct TrialScope<'s, T: Transport> {
    active: ActiveTrial<'s, T>,
    finalized: bool,
}

impl<'s, T: Transport> TrialScope<'s, T> {
    /// Active -> Completed | Failed | Pruned.
    ///
    /// A failed prune check still lets the loss be told; its error is
    /// returned once the trial is finished.
    fn finalize(&mut self) -> HopaasResult<TrialState> {
        self.finalized = true;
        let query = &self.active.query;
        let trial = &mut *self.active.trial;

        let mut prune_err = None;
        let state = match trial.loss() {
            Some(loss) => {
                let pruned = match query.should_prune(trial) {
                    Ok(pruned) => pruned,
                    Err(e) => {
                        warn!("Prune check for trial {} failed, reporting anyway: {}", trial.id(), e);
                        prune_err = Some(e);
                        false
                    }
                };
                if pruned {
                    info!("Trial {} pruned at step {}; not reported", trial.id(), trial.step());
                    TrialState::Pruned
                } else {
                    query.client.tell(query.study_id, trial.id(), loss)?;
                    TrialState::Completed
                }
            }
            None => {
                query
                    .client
                    .mark_as_failed(query.study_id, trial.id(), ABORTED_MESSAGE)?;
                TrialState::Failed
            }
        };
        trial.finish(state);
        match prune_err {
            Some(e) => Err(e),
            None => Ok(state),
        }
    }
}

impl<'s, T: Transport> Drop for TrialScope<'s, T> {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        warn!("Trial {} unwinding; reporting it now", self.active.trial.id());
        if let Err(e) = self.finalize() {
            error!("Failed to report trial {}: {}", self.active.trial.id(), e);
        }
    }
}
