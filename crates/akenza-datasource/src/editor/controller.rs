//! Drives an [`EditorState`] against an [`Inventory`].
use std::{sync::Arc, time::Duration};

use akenza_client::Inventory;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    debounce::{Debouncer, DEFAULT_SEARCH_DEBOUNCE},
    state::{EditorState, Effect, Event},
};
use crate::{plugin::InstanceId, query::AkenzaQuery};

/// A request from the editor to its host.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    /// Store this query.
    QueryChanged(AkenzaQuery),
    /// Re-run the panel's queries.
    RunQuery,
}

/// The query editor: its state, in-flight fetches and debounced search.
///
/// Fetches run as tasks which post their completions back to the editor;
/// [`QueryEditor::next`] applies them one at a time.
#[derive(Debug)]
pub struct QueryEditor<I> {
    inventory: Arc<I>,
    state: EditorState,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    searches: Debouncer<Event>,
    in_flight: usize,
    signals: Vec<Signal>,
}

impl<I: Inventory> QueryEditor<I> {
    /// Open the editor for a saved query.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(inventory: Arc<I>, instance: InstanceId, query: AkenzaQuery) -> Self {
        Self::with_debounce(inventory, instance, query, DEFAULT_SEARCH_DEBOUNCE)
    }

    /// Open the editor with a custom search debounce window.
    pub fn with_debounce(
        inventory: Arc<I>,
        instance: InstanceId,
        query: AkenzaQuery,
        window: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, effects) = EditorState::new(instance, query);
        let mut editor = Self {
            inventory,
            state,
            searches: Debouncer::spawn(window, tx.clone()),
            tx,
            rx,
            in_flight: 0,
            signals: vec![],
        };
        editor.run(effects);
        editor
    }

    /// The current state.
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Apply a user event straight away.
    ///
    /// [`Event::InstanceChanged`] is ignored here: an instance change needs the
    /// new instance's inventory, see [`QueryEditor::change_instance`].
    pub fn dispatch(&mut self, event: Event) {
        if let Event::InstanceChanged(instance) = &event {
            warn!(uid = %instance.uid, "Ignoring instance change without an inventory");
            return;
        }
        self.apply(event);
    }

    /// Point the editor at another data source instance.
    ///
    /// The selection is reset and devices are refetched from `inventory`.
    /// Answers still on their way from the previous inventory are discarded.
    pub fn change_instance(&mut self, instance: InstanceId, inventory: Arc<I>) {
        if instance == *self.state.instance() {
            return;
        }
        self.inventory = inventory;
        self.apply(Event::InstanceChanged(instance));
    }

    fn apply(&mut self, event: Event) {
        let effects = self.state.apply(event);
        self.run(effects);
    }

    /// Update the device search text. Only the last text of a burst is applied.
    pub fn search(&mut self, text: impl Into<String>) {
        self.searches.push(Event::SearchChanged(text.into()));
    }

    /// Take the signals raised since the last call.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    fn is_idle(&self) -> bool {
        self.in_flight == 0 && !self.searches.is_pending()
    }

    /// Wait for and apply the next completion or debounced search.
    ///
    /// Returns `false` without waiting when nothing is pending.
    pub async fn next(&mut self) -> bool {
        let event = match self.rx.try_recv() {
            Ok(event) => event,
            Err(_) if self.is_idle() => return false,
            Err(_) => match self.rx.recv().await {
                Some(event) => event,
                None => return false,
            },
        };
        if matches!(
            event,
            Event::DevicesLoaded { .. } | Event::TopicsLoaded { .. } | Event::DataKeysLoaded { .. }
        ) {
            self.in_flight -= 1;
        }
        self.apply(event);
        true
    }

    /// Apply events until no fetch or search is pending.
    pub async fn settle(&mut self) {
        while self.next().await {}
    }

    fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::QueryChanged(query) => self.signals.push(Signal::QueryChanged(query)),
                Effect::RunQuery => self.signals.push(Signal::RunQuery),
                fetch => self.spawn_fetch(fetch),
            }
        }
    }

    fn spawn_fetch(&mut self, effect: Effect) {
        debug!(?effect, "Fetching options");
        let inventory = Arc::clone(&self.inventory);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let event = match effect {
                Effect::FetchDevices { seq, search } => Event::DevicesLoaded {
                    seq,
                    result: inventory.devices(search).await,
                },
                Effect::FetchTopics { seq, device_id } => Event::TopicsLoaded {
                    seq,
                    result: inventory.topics(device_id).await,
                },
                Effect::FetchDataKeys {
                    seq,
                    device_id,
                    topic,
                } => Event::DataKeysLoaded {
                    seq,
                    result: inventory.data_keys(device_id, topic).await,
                },
                Effect::QueryChanged(_) | Effect::RunQuery => return,
            };
            // The editor may have been closed meanwhile.
            let _ = tx.send(event);
        });
    }
}
