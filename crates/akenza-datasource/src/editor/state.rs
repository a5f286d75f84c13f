//! The cascading device → topic → data key selection, as a synchronous reducer.
//!
//! [`EditorState::apply`] takes an [`Event`] and returns the [`Effect`]s the
//! caller must carry out. Fetches are tagged with a sequence number; a
//! completion is only applied if it answers the latest fetch issued for its
//! level.
//!
//! The state always satisfies the cascade invariant: a topic is selected only
//! under a selected device, and a data key only under a selected topic.
use akenza_client::Device;
use tracing::debug;

use crate::{
    plugin::InstanceId,
    query::{AkenzaQuery, SelectOption},
};

/// The status of one dropdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelStatus {
    /// No options have been loaded.
    Idle,
    /// A fetch is in flight. Existing options stay visible.
    Loading,
    /// Options are available.
    Populated,
    /// The level above has no selection.
    Disabled,
}

/// One dropdown of the cascade.
#[derive(Clone, Debug, PartialEq)]
pub struct Level<T> {
    options: Vec<SelectOption<T>>,
    selected: Option<SelectOption<T>>,
    status: LevelStatus,
    pending: Option<u64>,
}

impl<T: Clone> Level<T> {
    fn with_status(status: LevelStatus) -> Self {
        Self {
            options: vec![],
            selected: None,
            status,
            pending: None,
        }
    }

    fn restored(option: SelectOption<T>) -> Self {
        Self {
            options: vec![option.clone()],
            selected: Some(option),
            status: LevelStatus::Populated,
            pending: None,
        }
    }

    /// The options offered.
    pub fn options(&self) -> &[SelectOption<T>] {
        &self.options
    }

    /// The selected option.
    pub fn selected(&self) -> Option<&SelectOption<T>> {
        self.selected.as_ref()
    }

    /// The value of the selected option.
    pub fn selected_value(&self) -> Option<&str> {
        self.selected.as_ref().map(|s| s.value.as_str())
    }

    /// The dropdown's status.
    pub fn status(&self) -> LevelStatus {
        self.status
    }

    fn start(&mut self, seq: u64) {
        self.status = LevelStatus::Loading;
        self.pending = Some(seq);
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.pending == Some(seq)
    }

    /// Replace the options, keeping the selection among them.
    fn fill(&mut self, mut options: Vec<SelectOption<T>>) {
        if let Some(selected) = &self.selected {
            if !options.iter().any(|o| o.value == selected.value) {
                options.insert(0, selected.clone());
            }
        }
        self.options = options;
        self.status = LevelStatus::Populated;
        self.pending = None;
    }

    fn fail(&mut self) {
        self.status = if self.options.is_empty() {
            LevelStatus::Idle
        } else {
            LevelStatus::Populated
        };
        self.pending = None;
    }

    fn reset(&mut self, status: LevelStatus) {
        *self = Self::with_status(status);
    }
}

/// Inputs to the reducer: user actions and fetch completions.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The (debounced) device search text changed.
    SearchChanged(String),
    /// A device was picked, or the selection cleared.
    DeviceSelected(Option<SelectOption<Device>>),
    /// A topic was picked, or the selection cleared.
    TopicSelected(Option<String>),
    /// A data key was picked, or the selection cleared.
    KeySelected(Option<String>),
    /// The query now targets another data source instance.
    InstanceChanged(InstanceId),
    /// A device fetch completed.
    DevicesLoaded {
        /// Sequence number of the fetch.
        seq: u64,
        /// Its outcome.
        result: Result<Vec<Device>, akenza_client::Error>,
    },
    /// A topic fetch completed.
    TopicsLoaded {
        /// Sequence number of the fetch.
        seq: u64,
        /// Its outcome.
        result: Result<Vec<String>, akenza_client::Error>,
    },
    /// A data key fetch completed.
    DataKeysLoaded {
        /// Sequence number of the fetch.
        seq: u64,
        /// Its outcome.
        result: Result<Vec<String>, akenza_client::Error>,
    },
}

/// Work requested by the reducer.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Fetch devices, answering with [`Event::DevicesLoaded`].
    FetchDevices {
        /// Sequence number to answer with.
        seq: u64,
        /// Search text, if any.
        search: Option<String>,
    },
    /// Fetch the topics of a device, answering with [`Event::TopicsLoaded`].
    FetchTopics {
        /// Sequence number to answer with.
        seq: u64,
        /// Device id.
        device_id: String,
    },
    /// Fetch the data keys of a topic, answering with [`Event::DataKeysLoaded`].
    FetchDataKeys {
        /// Sequence number to answer with.
        seq: u64,
        /// Device id.
        device_id: String,
        /// Topic.
        topic: String,
    },
    /// The saved query changed and should be stored by the host.
    QueryChanged(AkenzaQuery),
    /// The panel should re-run its queries.
    RunQuery,
}

/// State of the query editor.
#[derive(Clone, Debug)]
pub struct EditorState {
    instance: InstanceId,
    query: AkenzaQuery,
    search: String,
    devices: Level<Device>,
    topics: Level<String>,
    data_keys: Level<String>,
    seq: u64,
}

impl EditorState {
    /// Restore the editor of a saved query.
    ///
    /// Saved selections are shown straight away as single-option lists, while
    /// fetches refresh the full lists behind them.
    pub fn new(instance: InstanceId, query: AkenzaQuery) -> (Self, Vec<Effect>) {
        let device_id = query.device_id.clone().filter(|id| !id.is_empty());
        let topic = device_id
            .as_ref()
            .and(query.topic.clone())
            .filter(|t| !t.is_empty());
        let data_key = topic
            .as_ref()
            .and(query.data_key.clone())
            .filter(|k| !k.is_empty());

        let devices = match &device_id {
            Some(id) => Level::restored(SelectOption::device(
                query
                    .device
                    .clone()
                    .filter(|d| d.id == *id)
                    .unwrap_or_else(|| Device {
                        id: id.clone(),
                        name: String::new(),
                    }),
            )),
            None => Level::with_status(LevelStatus::Idle),
        };
        let topics = match (&device_id, &topic) {
            (Some(_), Some(t)) => Level::restored(SelectOption::text(t.clone())),
            (Some(_), None) => Level::with_status(LevelStatus::Idle),
            (None, _) => Level::with_status(LevelStatus::Disabled),
        };
        let data_keys = match (&topic, &data_key) {
            (Some(_), Some(k)) => Level::restored(SelectOption::text(k.clone())),
            (Some(_), None) => Level::with_status(LevelStatus::Idle),
            (None, _) => Level::with_status(LevelStatus::Disabled),
        };

        let mut state = Self {
            instance,
            query,
            search: String::new(),
            devices,
            topics,
            data_keys,
            seq: 0,
        };
        let mut effects = vec![state.fetch_devices()];
        if let Some(device_id) = device_id {
            effects.push(state.fetch_topics(device_id.clone()));
            if let Some(topic) = topic {
                effects.push(state.fetch_data_keys(device_id, topic));
            }
        }
        (state, effects)
    }

    /// The query being edited.
    pub fn query(&self) -> &AkenzaQuery {
        &self.query
    }

    /// The data source instance the query targets.
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// The last applied search text.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// The device dropdown.
    pub fn devices(&self) -> &Level<Device> {
        &self.devices
    }

    /// The topic dropdown.
    pub fn topics(&self) -> &Level<String> {
        &self.topics
    }

    /// The data key dropdown.
    pub fn data_keys(&self) -> &Level<String> {
        &self.data_keys
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn fetch_devices(&mut self) -> Effect {
        let seq = self.next_seq();
        self.devices.start(seq);
        Effect::FetchDevices {
            seq,
            search: Some(self.search.clone()).filter(|s| !s.is_empty()),
        }
    }

    fn fetch_topics(&mut self, device_id: String) -> Effect {
        let seq = self.next_seq();
        self.topics.start(seq);
        Effect::FetchTopics { seq, device_id }
    }

    fn fetch_data_keys(&mut self, device_id: String, topic: String) -> Effect {
        let seq = self.next_seq();
        self.data_keys.start(seq);
        Effect::FetchDataKeys {
            seq,
            device_id,
            topic,
        }
    }

    fn query_changed(&self) -> Effect {
        Effect::QueryChanged(self.query.clone())
    }

    /// Apply an event, returning the effects to carry out in order.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::SearchChanged(search) => self.search_changed(search),
            Event::DeviceSelected(device) => self.device_selected(device),
            Event::TopicSelected(topic) => self.topic_selected(topic),
            Event::KeySelected(key) => self.key_selected(key),
            Event::InstanceChanged(instance) => self.instance_changed(instance),
            Event::DevicesLoaded { seq, result } => self.devices_loaded(seq, result),
            Event::TopicsLoaded { seq, result } => self.topics_loaded(seq, result),
            Event::DataKeysLoaded { seq, result } => self.data_keys_loaded(seq, result),
        }
    }

    fn search_changed(&mut self, search: String) -> Vec<Effect> {
        if search == self.search {
            return vec![];
        }
        self.search = search;
        vec![self.fetch_devices()]
    }

    fn device_selected(&mut self, device: Option<SelectOption<Device>>) -> Vec<Effect> {
        if device.as_ref().map(|d| d.value.as_str()) == self.devices.selected_value() {
            return vec![];
        }
        self.query.topic = None;
        self.query.data_key = None;
        self.data_keys.reset(LevelStatus::Disabled);
        match device {
            Some(device) => {
                self.query.device_id = Some(device.value.clone());
                self.query.device = Some(device.entity.clone());
                let device_id = device.value.clone();
                self.devices.selected = Some(device);
                self.topics.reset(LevelStatus::Idle);
                let fetch = self.fetch_topics(device_id);
                vec![self.query_changed(), fetch, Effect::RunQuery]
            }
            None => {
                self.query.device_id = None;
                self.query.device = None;
                self.devices.selected = None;
                self.topics.reset(LevelStatus::Disabled);
                vec![self.query_changed(), Effect::RunQuery]
            }
        }
    }

    fn topic_selected(&mut self, topic: Option<String>) -> Vec<Effect> {
        let Some(device_id) = self.devices.selected_value().map(str::to_string) else {
            return vec![];
        };
        if topic.as_deref() == self.topics.selected_value() {
            return vec![];
        }
        self.query.data_key = None;
        match topic {
            Some(topic) => {
                self.query.topic = Some(topic.clone());
                self.topics.selected = Some(SelectOption::text(topic.clone()));
                self.data_keys.reset(LevelStatus::Idle);
                let fetch = self.fetch_data_keys(device_id, topic);
                vec![self.query_changed(), fetch, Effect::RunQuery]
            }
            None => {
                self.query.topic = None;
                self.topics.selected = None;
                self.data_keys.reset(LevelStatus::Disabled);
                vec![self.query_changed(), Effect::RunQuery]
            }
        }
    }

    fn key_selected(&mut self, key: Option<String>) -> Vec<Effect> {
        if self.topics.selected.is_none() || key.as_deref() == self.data_keys.selected_value() {
            return vec![];
        }
        self.query.data_key = key.clone();
        self.data_keys.selected = key.map(SelectOption::text);
        vec![self.query_changed(), Effect::RunQuery]
    }

    fn instance_changed(&mut self, instance: InstanceId) -> Vec<Effect> {
        if instance == self.instance {
            return vec![];
        }
        debug!(uid = %instance.uid, "Data source instance changed, resetting selection");
        self.instance = instance;
        self.search.clear();
        self.query.device_id = None;
        self.query.device = None;
        self.query.topic = None;
        self.query.data_key = None;
        self.devices.reset(LevelStatus::Idle);
        self.topics.reset(LevelStatus::Disabled);
        self.data_keys.reset(LevelStatus::Disabled);
        let fetch = self.fetch_devices();
        vec![self.query_changed(), fetch]
    }

    fn devices_loaded(
        &mut self,
        seq: u64,
        result: Result<Vec<Device>, akenza_client::Error>,
    ) -> Vec<Effect> {
        if !self.devices.is_latest(seq) {
            debug!(seq, "Discarding stale device list");
            return vec![];
        }
        match result {
            Ok(devices) => self
                .devices
                .fill(devices.into_iter().map(SelectOption::device).collect()),
            Err(e) => {
                debug!(error = %e, "Failed to load devices");
                self.devices.fail();
            }
        }
        vec![]
    }

    fn topics_loaded(
        &mut self,
        seq: u64,
        result: Result<Vec<String>, akenza_client::Error>,
    ) -> Vec<Effect> {
        if !self.topics.is_latest(seq) {
            debug!(seq, "Discarding stale topic list");
            return vec![];
        }
        match result {
            Ok(topics) if topics.is_empty() => {
                self.query.topic = None;
                self.query.data_key = None;
                self.topics.reset(LevelStatus::Disabled);
                self.data_keys.reset(LevelStatus::Disabled);
                vec![self.query_changed()]
            }
            Ok(topics) => {
                self.topics
                    .fill(topics.into_iter().map(SelectOption::text).collect());
                vec![]
            }
            Err(e) => {
                debug!(error = %e, "Failed to load topics");
                self.topics.fail();
                vec![]
            }
        }
    }

    fn data_keys_loaded(
        &mut self,
        seq: u64,
        result: Result<Vec<String>, akenza_client::Error>,
    ) -> Vec<Effect> {
        if !self.data_keys.is_latest(seq) {
            debug!(seq, "Discarding stale data key list");
            return vec![];
        }
        match result {
            Ok(keys) => self
                .data_keys
                .fill(keys.into_iter().map(SelectOption::text).collect()),
            Err(e) => {
                debug!(error = %e, "Failed to load data keys");
                self.data_keys.fail();
            }
        }
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    fn instance(uid: &str) -> InstanceId {
        InstanceId {
            uid: uid.to_string(),
            updated: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    fn device(id: &str, name: &str) -> Device {
        Device {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn saved_query() -> AkenzaQuery {
        AkenzaQuery {
            device_id: Some("d1".to_string()),
            device: Some(device("d1", "Sensor A")),
            topic: Some("telemetry".to_string()),
            data_key: Some("temperature".to_string()),
            hide: false,
        }
    }

    fn assert_cascade(state: &EditorState) {
        if state.devices.selected.is_none() {
            assert_eq!(state.topics.status, LevelStatus::Disabled);
            assert!(state.topics.selected.is_none());
        }
        if state.topics.selected.is_none() {
            assert_eq!(state.data_keys.status, LevelStatus::Disabled);
            assert!(state.data_keys.selected.is_none());
        }
        assert_eq!(state.query.device_id.as_deref(), state.devices.selected_value());
        assert_eq!(state.query.topic.as_deref(), state.topics.selected_value());
        assert_eq!(state.query.data_key.as_deref(), state.data_keys.selected_value());
    }

    fn fetch_seq(effect: &Effect) -> u64 {
        match effect {
            Effect::FetchDevices { seq, .. }
            | Effect::FetchTopics { seq, .. }
            | Effect::FetchDataKeys { seq, .. } => *seq,
            other => panic!("not a fetch: {other:?}"),
        }
    }

    #[test]
    fn fresh_queries_fetch_devices_only() {
        let (state, effects) = EditorState::new(instance("a"), AkenzaQuery::default());
        assert_eq!(effects, vec![Effect::FetchDevices { seq: 1, search: None }]);
        assert_eq!(state.devices().status(), LevelStatus::Loading);
        assert_eq!(state.topics().status(), LevelStatus::Disabled);
        assert_eq!(state.data_keys().status(), LevelStatus::Disabled);
        assert_cascade(&state);
    }

    #[test]
    fn saved_queries_are_restored_without_flashing_empty() {
        let (state, effects) = EditorState::new(instance("a"), saved_query());
        assert_eq!(
            effects,
            vec![
                Effect::FetchDevices { seq: 1, search: None },
                Effect::FetchTopics {
                    seq: 2,
                    device_id: "d1".to_string()
                },
                Effect::FetchDataKeys {
                    seq: 3,
                    device_id: "d1".to_string(),
                    topic: "telemetry".to_string()
                },
            ]
        );
        assert_eq!(state.devices().selected().map(|d| d.label.as_str()), Some("Sensor A"));
        assert_eq!(state.devices().options().len(), 1);
        assert_eq!(state.topics().selected_value(), Some("telemetry"));
        assert_eq!(state.data_keys().selected_value(), Some("temperature"));
        assert_cascade(&state);
    }

    #[test]
    fn refreshes_keep_the_restored_selection() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        state.apply(Event::DevicesLoaded {
            seq: 1,
            result: Ok(vec![device("d2", "Sensor B")]),
        });
        state.apply(Event::TopicsLoaded {
            seq: 2,
            result: Ok(vec!["telemetry".to_string(), "status".to_string()]),
        });
        assert_eq!(state.devices().selected_value(), Some("d1"));
        let devices: Vec<_> = state
            .devices()
            .options()
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(devices, vec!["Sensor A", "Sensor B"]);
        assert_eq!(state.devices().status(), LevelStatus::Populated);
        let topics: Vec<_> = state
            .topics()
            .options()
            .iter()
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(topics, vec!["telemetry", "status"]);
        assert_eq!(state.topics().selected_value(), Some("telemetry"));
        assert_eq!(state.query(), &saved_query());
    }

    #[test]
    fn selecting_a_device_resets_the_levels_below() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        let effects = state.apply(Event::DeviceSelected(Some(SelectOption::device(device(
            "d2", "Sensor B",
        )))));
        let mut expected = saved_query();
        expected.device_id = Some("d2".to_string());
        expected.device = Some(device("d2", "Sensor B"));
        expected.topic = None;
        expected.data_key = None;
        assert_eq!(
            effects,
            vec![
                Effect::QueryChanged(expected),
                Effect::FetchTopics {
                    seq: 4,
                    device_id: "d2".to_string()
                },
                Effect::RunQuery,
            ]
        );
        assert_eq!(state.topics().status(), LevelStatus::Loading);
        assert!(state.topics().options().is_empty());
        assert_eq!(state.data_keys().status(), LevelStatus::Disabled);
        assert_cascade(&state);
    }

    #[test]
    fn reselecting_the_current_value_is_a_no_op() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        let same = SelectOption::device(device("d1", "Sensor A"));
        assert_eq!(state.apply(Event::DeviceSelected(Some(same))), vec![]);
        assert_eq!(
            state.apply(Event::TopicSelected(Some("telemetry".to_string()))),
            vec![]
        );
        assert_eq!(
            state.apply(Event::KeySelected(Some("temperature".to_string()))),
            vec![]
        );
    }

    #[test]
    fn topic_and_key_selection() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        let effects = state.apply(Event::TopicSelected(Some("status".to_string())));
        assert_eq!(effects.len(), 3);
        assert_eq!(
            effects[1],
            Effect::FetchDataKeys {
                seq: 4,
                device_id: "d1".to_string(),
                topic: "status".to_string()
            }
        );
        assert_eq!(state.query().data_key, None);
        assert_eq!(state.data_keys().status(), LevelStatus::Loading);

        let effects = state.apply(Event::KeySelected(Some("battery".to_string())));
        let mut expected = saved_query();
        expected.topic = Some("status".to_string());
        expected.data_key = Some("battery".to_string());
        assert_eq!(effects, vec![Effect::QueryChanged(expected), Effect::RunQuery]);
        assert_cascade(&state);
    }

    #[test]
    fn lower_levels_ignore_selections_without_a_parent() {
        let (mut state, _) = EditorState::new(instance("a"), AkenzaQuery::default());
        assert_eq!(state.apply(Event::TopicSelected(Some("t".to_string()))), vec![]);
        assert_eq!(state.apply(Event::KeySelected(Some("k".to_string()))), vec![]);
        assert_cascade(&state);
    }

    #[test]
    fn clearing_the_device_disables_everything_below() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        let effects = state.apply(Event::DeviceSelected(None));
        assert_eq!(effects.last(), Some(&Effect::RunQuery));
        assert_eq!(state.topics().status(), LevelStatus::Disabled);
        assert_eq!(state.data_keys().status(), LevelStatus::Disabled);
        assert_eq!(state.query().device_id, None);
        assert_eq!(state.query().device, None);
        assert_cascade(&state);
    }

    #[test]
    fn devices_without_topics_disable_the_cascade() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        let effects = state.apply(Event::TopicsLoaded {
            seq: 2,
            result: Ok(vec![]),
        });
        assert!(matches!(effects.as_slice(), [Effect::QueryChanged(q)] if q.topic.is_none()));
        assert_eq!(state.topics().status(), LevelStatus::Disabled);
        assert_eq!(state.data_keys().status(), LevelStatus::Disabled);
        // The key fetch issued on restore is now stale.
        state.apply(Event::DataKeysLoaded {
            seq: 3,
            result: Ok(vec!["temperature".to_string()]),
        });
        assert!(state.data_keys().options().is_empty());
        assert_cascade(&state);
    }

    #[test]
    fn stale_completions_are_discarded() {
        let (mut state, _) = EditorState::new(instance("a"), AkenzaQuery::default());
        state.apply(Event::DevicesLoaded {
            seq: 1,
            result: Ok(vec![device("d1", "Sensor A"), device("d2", "Sensor B")]),
        });
        let first = state.apply(Event::DeviceSelected(Some(SelectOption::device(device(
            "d1", "Sensor A",
        )))));
        let second = state.apply(Event::DeviceSelected(Some(SelectOption::device(device(
            "d2", "Sensor B",
        )))));
        let (first, second) = (fetch_seq(&first[1]), fetch_seq(&second[1]));

        state.apply(Event::TopicsLoaded {
            seq: second,
            result: Ok(vec!["b".to_string()]),
        });
        state.apply(Event::TopicsLoaded {
            seq: first,
            result: Ok(vec!["a".to_string()]),
        });
        let topics: Vec<_> = state.topics().options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(topics, vec!["b"]);
    }

    #[test]
    fn failures_stop_loading_and_keep_options() {
        let (mut state, _) = EditorState::new(instance("a"), AkenzaQuery::default());
        state.apply(Event::DevicesLoaded {
            seq: 1,
            result: Ok(vec![device("d1", "Sensor A")]),
        });
        let effects = state.apply(Event::SearchChanged("sens".to_string()));
        let seq = fetch_seq(&effects[0]);
        assert_eq!(state.devices().status(), LevelStatus::Loading);
        state.apply(Event::DevicesLoaded {
            seq,
            result: Err(akenza_client::Error::Unauthorized),
        });
        assert_eq!(state.devices().status(), LevelStatus::Populated);
        assert_eq!(state.devices().options().len(), 1);

        let (mut empty, _) = EditorState::new(instance("a"), AkenzaQuery::default());
        empty.apply(Event::DevicesLoaded {
            seq: 1,
            result: Err(akenza_client::Error::Unauthorized),
        });
        assert_eq!(empty.devices().status(), LevelStatus::Idle);
    }

    #[test]
    fn searches_are_distinct_until_changed() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        let effects = state.apply(Event::SearchChanged("sens".to_string()));
        assert_eq!(
            effects,
            vec![Effect::FetchDevices {
                seq: 4,
                search: Some("sens".to_string())
            }]
        );
        assert_eq!(state.apply(Event::SearchChanged("sens".to_string())), vec![]);
        // Searching does not clear the selection.
        assert_eq!(state.devices().selected_value(), Some("d1"));
        let effects = state.apply(Event::SearchChanged(String::new()));
        assert_eq!(effects, vec![Effect::FetchDevices { seq: 5, search: None }]);
    }

    #[test]
    fn instance_changes_reset_exactly_once() {
        let (mut state, _) = EditorState::new(instance("a"), saved_query());
        state.apply(Event::SearchChanged("sens".to_string()));
        let effects = state.apply(Event::InstanceChanged(instance("b")));
        let expected = AkenzaQuery::default();
        assert_eq!(
            effects,
            vec![
                Effect::QueryChanged(expected),
                Effect::FetchDevices { seq: 5, search: None },
            ]
        );
        assert_eq!(state.search(), "");
        assert_eq!(state.instance(), &instance("b"));
        assert_cascade(&state);
        assert_eq!(state.apply(Event::InstanceChanged(instance("b"))), vec![]);
        assert_eq!(state.apply(Event::InstanceChanged(instance("a"))).len(), 2);
    }

    #[test]
    fn the_cascade_holds_under_any_event_sequence() {
        let events = [
            Event::DeviceSelected(Some(SelectOption::device(device("d1", "A")))),
            Event::TopicSelected(Some("t1".to_string())),
            Event::KeySelected(Some("k1".to_string())),
            Event::TopicSelected(None),
            Event::KeySelected(Some("k2".to_string())),
            Event::DeviceSelected(Some(SelectOption::device(device("d2", "B")))),
            Event::TopicsLoaded {
                seq: 7,
                result: Ok(vec![]),
            },
            Event::TopicSelected(Some("t2".to_string())),
            Event::DeviceSelected(None),
            Event::KeySelected(Some("k3".to_string())),
            Event::InstanceChanged(instance("b")),
        ];
        // Every rotation of the sequence, applied twice over.
        for start in 0..events.len() {
            let (mut state, _) = EditorState::new(instance("a"), saved_query());
            for event in events.iter().cycle().skip(start).take(events.len() * 2) {
                state.apply(event.clone());
                assert_cascade(&state);
            }
        }
    }
}
