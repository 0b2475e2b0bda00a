//! A single evaluation handed out by the server.

use chrono::{DateTime, Utc};
use hp_client::{Client, Transport};
use hp_types::{
    validation_error, FrozenTrial, HopaasError, HopaasResult, PropertyMap, TrialId, TrialState,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::ops::Deref;

/// One trial: resolved properties plus the loss history reported so far.
///
/// Trials are owned by their [`Study`](crate::Study) and handed to callers
/// only as an [`ActiveTrial`] inside [`Study::trial`](crate::Study::trial).
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    id: TrialId,
    properties: PropertyMap,
    loss: Option<f64>,
    step: i64,
    state: TrialState,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Trial {
    pub(crate) fn new(id: TrialId, properties: PropertyMap) -> Self {
        Self {
            id,
            properties,
            loss: None,
            step: -1,
            state: TrialState::Active,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> TrialId {
        self.id
    }

    /// Resolved value of property `name` (a sample, never a suggestion).
    pub fn get(&self, name: &str) -> HopaasResult<&Value> {
        self.properties
            .get(name)
            .ok_or_else(|| HopaasError::KeyNotFound {
                key: name.to_string(),
            })
    }

    /// Resolved value of property `name`, deserialized into `V`.
    pub fn get_as<V: DeserializeOwned>(&self, name: &str) -> HopaasResult<V> {
        let value = self.get(name)?;
        serde_json::from_value(value.clone())
            .map_err(|e| validation_error!("property {name:?} has unexpected type: {e}"))
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Most recent loss, if any was reported.
    pub fn loss(&self) -> Option<f64> {
        self.loss
    }

    /// Record a new loss. Every call advances `step` by one, so the first
    /// report lands on step 0.
    pub fn set_loss(&mut self, loss: impl Into<f64>) {
        self.step += 1;
        self.loss = Some(loss.into());
    }

    /// Number of loss reports minus one; -1 before the first.
    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub(crate) fn finish(&mut self, state: TrialState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }

    pub fn freeze(&self, study_id: &str) -> FrozenTrial {
        FrozenTrial {
            study_id: study_id.to_string(),
            trial_id: self.id,
            loss: self.loss,
            properties: self.properties.clone(),
            state: self.state,
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// The study's prune query, lent to a trial for the length of its scope.
pub(crate) struct PruneQuery<'s, T: Transport> {
    pub(crate) client: &'s Client<T>,
    pub(crate) study_id: &'s str,
}

impl<'s, T: Transport> PruneQuery<'s, T> {
    /// `false` without asking the server while no loss has been reported.
    pub(crate) fn should_prune(&self, trial: &Trial) -> HopaasResult<bool> {
        match trial.loss {
            None => Ok(false),
            Some(loss) => self
                .client
                .should_prune(self.study_id, trial.id, loss, trial.step),
        }
    }
}

/// A trial inside its [`Study::trial`](crate::Study::trial) scope.
///
/// Read access goes through `Deref<Target = Trial>`.
pub struct ActiveTrial<'s, T: Transport> {
    pub(crate) trial: &'s mut Trial,
    pub(crate) query: PruneQuery<'s, T>,
}

impl<'s, T: Transport> ActiveTrial<'s, T> {
    pub fn set_loss(&mut self, loss: impl Into<f64>) {
        self.trial.set_loss(loss);
    }

    /// Whether the server advises stopping this trial at its current step.
    pub fn should_prune(&self) -> HopaasResult<bool> {
        self.query.should_prune(self.trial)
    }

    pub fn study_id(&self) -> &str {
        self.query.study_id
    }
}

impl<'s, T: Transport> Deref for ActiveTrial<'s, T> {
    type Target = Trial;

    fn deref(&self) -> &Trial {
        self.trial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_client::scripted::ScriptedTransport;
    use hp_client::HttpResponse;
    use serde_json::json;

    fn resolved() -> PropertyMap {
        let mut properties = PropertyMap::new();
        properties.insert("x".into(), json!(1));
        properties.insert("y".into(), json!(42));
        properties.insert("optimizer".into(), json!("adam"));
        properties
    }

    #[test]
    fn step_counts_loss_reports() {
        let mut trial = Trial::new(0, resolved());
        assert_eq!(trial.step(), -1);
        assert_eq!(trial.loss(), None);

        trial.set_loss(3);
        assert_eq!(trial.step(), 0);
        assert_eq!(trial.loss(), Some(3.0));

        trial.set_loss(1.5);
        assert_eq!(trial.step(), 1);
        assert_eq!(trial.loss(), Some(1.5));
    }

    #[test]
    fn get_returns_resolved_values() {
        let trial = Trial::new(0, resolved());
        assert_eq!(trial.get("y").unwrap(), &json!(42));
        assert_eq!(trial.get_as::<i64>("y").unwrap(), 42);
        assert_eq!(trial.get_as::<String>("optimizer").unwrap(), "adam");
        assert!(trial.get_as::<String>("y").is_err());
    }

    #[test]
    fn missing_property_is_key_not_found() {
        let trial = Trial::new(0, resolved());
        match trial.get("z") {
            Err(HopaasError::KeyNotFound { key }) => assert_eq!(key, "z"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn prune_query_skips_the_server_without_loss() {
        let transport = ScriptedTransport::new();
        transport.respond("should_prune", HttpResponse::ok("true"));
        let client = Client::with_transport("http://h", "tok", transport.clone());
        let query = PruneQuery {
            client: &client,
            study_id: "abc",
        };

        let mut trial = Trial::new(4, resolved());
        assert!(!query.should_prune(&trial).unwrap());
        assert_eq!(transport.count("should_prune"), 0);

        trial.set_loss(0.7);
        assert!(query.should_prune(&trial).unwrap());
        let sent = &transport.requests_to("should_prune")[0];
        assert_eq!(
            sent.body.as_ref().unwrap(),
            &json!({"hopaas_trial": "abc:4", "loss": 0.7, "step": 0})
        );
    }

    #[test]
    fn freeze_copies_the_current_state() {
        let mut trial = Trial::new(2, resolved());
        trial.set_loss(0.25);
        trial.finish(TrialState::Completed);

        let frozen = trial.freeze("abc");
        assert_eq!(frozen.study_id, "abc");
        assert_eq!(frozen.trial_id, 2);
        assert_eq!(frozen.loss, Some(0.25));
        assert_eq!(frozen.state, TrialState::Completed);
        assert!(frozen.finished_at.is_some());
        assert_eq!(frozen.properties, resolved());
    }
}
