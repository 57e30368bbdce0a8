//! Search interface orchestrator
//!
//! The interface runs as a single task that owns all search state. Hosts
//! talk to it through a [`SearchHandle`] (commands in) and an event
//! receiver (events out):
//!
//! 1. Query and filter edits restart the debounce timer
//! 2. When the timer elapses, a [`SearchParams`] snapshot is sent to the
//!    [`SearchService`] under a fresh [`Generation`]
//! 3. Every completion is recorded in history and analytics; only the
//!    newest generation replaces the displayed results

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use mailfind_core::{
    EntryId, Filter, FilterCommand, FilterEditor, FilterRow, SearchError, SearchParams, SearchResult, SearchService,
};
use mailfind_store::{AggregateStats, AnalyticsEvent, AnalyticsStore, HistoryEntry, HistoryStore, StoragePort};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::debounce::{Debouncer, Generation};
use crate::error::{Result, UiError};
use crate::keyboard::ShortcutCommand;
use crate::state::{InterfaceState, Pagination};
use crate::virtual_list::VirtualList;
use crate::voice::{SpeechRecognizer, VoiceController, VoiceErrorCode, VoiceNotice, VoiceState};

/// Commands sent from the host to the interface
#[derive(Debug)]
pub enum SearchCommand {
    // Query and filters
    SetQuery(String),
    Filter(FilterCommand),
    ToggleFilters,
    Submit,
    Clear,

    // Result list
    SelectPrevious,
    SelectNext,
    SelectVisible(usize),
    SelectResult(usize),
    ClickAt(f64),
    Scroll(f64),
    Hover(Option<f64>),
    Resize(f64),
    SetPage(usize),

    Shortcut(ShortcutCommand),
    ToggleVoice,

    // History and analytics
    RerunHistory(EntryId),
    RemoveHistory(EntryId),
    ClearHistory,
    ExportAnalytics,

    View(oneshot::Sender<InterfaceView>),
    Shutdown,
}

/// Events sent from the interface to the host
#[derive(Debug, Clone)]
pub enum SearchEvent {
    SearchStarted { generation: Generation, params: SearchParams },
    ResultsReady { generation: Generation, total: usize },
    SearchFailed { generation: Generation, message: String },
    Superseded { generation: Generation },
    ResultsCleared,
    Cleared,

    FiltersChanged(Vec<Filter>),
    ResultSelected(SearchResult),

    HistoryChanged(Vec<HistoryEntry>),
    StatsUpdated(AggregateStats),
    AnalyticsExported(Vec<AnalyticsEvent>),

    VoiceStateChanged(VoiceState),
    VoiceInterim(String),
    VoiceTranscript(String),
    VoiceError(VoiceErrorCode),
}

/// One mounted result row
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub index: usize,
    pub top: f64,
    pub hovered: bool,
    pub selected: bool,
    pub result: SearchResult,
}

/// Render snapshot of the whole interface
#[derive(Debug, Clone)]
pub struct InterfaceView {
    pub state: InterfaceState,
    pub rows: Vec<RowView>,
    pub scroll_offset: f64,
    pub spacer_before: f64,
    pub spacer_after: f64,
    pub total_height: f64,
    pub pagination: Option<Pagination>,
    /// Empty while the filter panel is hidden
    pub filter_rows: Vec<FilterRow>,
    pub history: Vec<HistoryEntry>,
    pub stats: AggregateStats,
    pub voice: VoiceState,
    pub voice_message: Option<&'static str>,
}

/// Handle to a running search interface
#[derive(Debug, Clone)]
pub struct SearchHandle {
    commands: UnboundedSender<SearchCommand>,
}

impl SearchHandle {
    /// Send a command (non-blocking)
    pub fn send(&self, command: SearchCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| UiError::NotRunning)
    }

    /// Fetch a render snapshot
    pub async fn view(&self) -> Result<InterfaceView> {
        let (tx, rx) = oneshot::channel();
        self.send(SearchCommand::View(tx))?;
        rx.await.map_err(|_| UiError::NotRunning)
    }

    /// Callback for a [`crate::ShortcutDispatcher`]
    pub fn shortcut_sink(&self) -> impl FnMut(ShortcutCommand) + 'static {
        let commands = self.commands.clone();
        move |command| {
            let _ = commands.send(SearchCommand::Shortcut(command));
        }
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(SearchCommand::Shutdown);
    }
}

/// A spawned interface with its channels
pub struct MountedInterface {
    pub handle: SearchHandle,
    pub events: UnboundedReceiver<SearchEvent>,
    pub task: JoinHandle<()>,
}

struct Completion {
    generation: Generation,
    params: SearchParams,
    started: Instant,
    outcome: std::result::Result<Vec<SearchResult>, SearchError>,
}

/// Owner of query, filters, results, history and analytics
pub struct SearchInterface {
    config: SearchConfig,
    service: Arc<dyn SearchService>,
    state: InterfaceState,
    list: VirtualList,
    debouncer: Debouncer,
    history: HistoryStore,
    analytics: AnalyticsStore,
    voice: VoiceController,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    events: UnboundedSender<SearchEvent>,
}

impl SearchInterface {
    /// Build an interface, loading history and analytics from `storage`
    pub fn new(
        config: &SearchConfig,
        service: Arc<dyn SearchService>,
        storage: Arc<dyn StoragePort>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
    ) -> Result<(Self, UnboundedReceiver<SearchEvent>)> {
        config.validate()?;

        let list = VirtualList::new(config.item_height, config.viewport_height)?.with_overscan(config.overscan);
        let history = HistoryStore::load(Arc::clone(&storage), config.history_max_items);
        let analytics = AnalyticsStore::load(storage, config.analytics_settings());
        let (events, event_rx) = mpsc::unbounded_channel();

        info!(
            "Search interface mounted with {} history entries and {} analytics events",
            history.len(),
            analytics.events().len()
        );

        let interface = Self {
            config: config.clone(),
            service,
            state: InterfaceState::new(config.page_size),
            list,
            debouncer: Debouncer::new(config.debounce()),
            history,
            analytics,
            voice: VoiceController::new(recognizer),
            in_flight: FuturesUnordered::new(),
            events,
        };
        Ok((interface, event_rx))
    }

    /// Build and spawn onto the current tokio runtime
    pub fn mount(
        config: &SearchConfig,
        service: Arc<dyn SearchService>,
        storage: Arc<dyn StoragePort>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
    ) -> Result<MountedInterface> {
        let (interface, events) = Self::new(config, service, storage, recognizer)?;
        let (handle, task) = interface.spawn();
        Ok(MountedInterface { handle, events, task })
    }

    pub fn spawn(self) -> (SearchHandle, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(command_rx));
        (SearchHandle { commands }, task)
    }

    /// Process commands until shutdown or every handle is dropped
    pub async fn run(mut self, mut commands: UnboundedReceiver<SearchCommand>) {
        loop {
            let deadline = self.debouncer.deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(SearchCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(completion) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.complete(completion);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(generation) = self.debouncer.fire_if_due(Instant::now()) {
                        self.launch(generation);
                    }
                }
                Some(event) = self.voice.next_event() => {
                    self.with_voice(|voice| voice.process(event));
                }
            }
        }

        self.voice.unmount();
        info!("Search interface stopped");
    }

    /// Render snapshot of the current state
    pub fn view(&self) -> InterfaceView {
        let window = self.list.render(self.state.page_results(), self.state.selected);
        let rows = window
            .rows
            .iter()
            .map(|row| RowView {
                index: row.index,
                top: row.top,
                hovered: row.hovered,
                selected: row.selected,
                result: row.result.clone(),
            })
            .collect();
        let filter_rows = if self.state.show_filters {
            FilterEditor::<fn(Vec<Filter>)>::render(&self.state.filters)
        } else {
            Vec::new()
        };

        InterfaceView {
            state: self.state.clone(),
            rows,
            scroll_offset: self.list.scroll_offset(),
            spacer_before: window.spacer_before,
            spacer_after: window.spacer_after,
            total_height: window.total_height,
            pagination: self.state.pagination(),
            filter_rows,
            history: self.history.entries().to_vec(),
            stats: self.analytics.stats().clone(),
            voice: self.voice.state().clone(),
            voice_message: self.voice.unsupported_message(),
        }
    }

    fn handle_command(&mut self, command: SearchCommand) {
        match command {
            SearchCommand::SetQuery(query) => {
                if query != self.state.query {
                    self.state.query = query;
                    self.debouncer.schedule(Instant::now());
                }
            }
            SearchCommand::Filter(command) => self.edit_filters(command),
            SearchCommand::ToggleFilters => self.state.show_filters = !self.state.show_filters,
            SearchCommand::Submit => self.trigger_now(),
            SearchCommand::Clear => self.clear(),

            SearchCommand::SelectPrevious => {
                if let Some(index) = self.state.select_previous() {
                    self.list.scroll_to_index(index, self.state.page_results().len());
                }
            }
            SearchCommand::SelectNext => {
                if let Some(index) = self.state.select_next() {
                    self.list.scroll_to_index(index, self.state.page_results().len());
                }
            }
            SearchCommand::SelectVisible(n) => {
                if let Some(index) = self.list.nth_visible(n, self.state.page_results().len()) {
                    self.select_result(index);
                }
            }
            SearchCommand::SelectResult(index) => self.select_result(index),
            SearchCommand::ClickAt(y) => {
                let mut clicked = None;
                self.list
                    .click_at(y, self.state.page_results(), |index, _| clicked = Some(index));
                if let Some(index) = clicked {
                    self.select_result(index);
                }
            }
            SearchCommand::Scroll(offset) => {
                self.list.set_scroll_offset(offset, self.state.page_results().len());
            }
            SearchCommand::Hover(y) => self.list.hover_at(y, self.state.page_results().len()),
            SearchCommand::Resize(height) => {
                self.list.set_viewport_height(height, self.state.page_results().len());
            }
            SearchCommand::SetPage(page) => {
                if self.state.set_page(page) {
                    self.list.reset();
                }
            }

            SearchCommand::Shortcut(shortcut) => self.handle_shortcut(shortcut),
            SearchCommand::ToggleVoice => self.with_voice(VoiceController::toggle),

            SearchCommand::RerunHistory(id) => self.rerun_history(id),
            SearchCommand::RemoveHistory(id) => match self.history.remove_entry(id) {
                Ok(false) => debug!("History entry {} already gone", id),
                Ok(true) => self.emit(SearchEvent::HistoryChanged(self.history.entries().to_vec())),
                Err(e) => {
                    warn!("Failed to persist history removal: {}", e);
                    self.emit(SearchEvent::HistoryChanged(self.history.entries().to_vec()));
                }
            },
            SearchCommand::ClearHistory => {
                let events = &self.events;
                let cleared = self.history.clear_all(|| {
                    let _ = events.send(SearchEvent::HistoryChanged(Vec::new()));
                });
                if let Err(e) = cleared {
                    warn!("Failed to persist cleared history: {}", e);
                }
            }
            SearchCommand::ExportAnalytics => {
                let events = &self.events;
                self.analytics.export_data(|exported| {
                    let _ = events.send(SearchEvent::AnalyticsExported(exported));
                });
            }

            SearchCommand::View(reply) => {
                let _ = reply.send(self.view());
            }
            SearchCommand::Shutdown => {}
        }
    }

    fn handle_shortcut(&mut self, shortcut: ShortcutCommand) {
        let command = match shortcut {
            ShortcutCommand::Search => SearchCommand::Submit,
            ShortcutCommand::Clear => SearchCommand::Clear,
            ShortcutCommand::PreviousResult => SearchCommand::SelectPrevious,
            ShortcutCommand::NextResult => SearchCommand::SelectNext,
            ShortcutCommand::ToggleFilters => SearchCommand::ToggleFilters,
            ShortcutCommand::ToggleVoice => SearchCommand::ToggleVoice,
            ShortcutCommand::SelectVisible(n) => SearchCommand::SelectVisible(n),
        };
        self.handle_command(command);
    }

    fn edit_filters(&mut self, command: FilterCommand) {
        let mut next = None;
        FilterEditor::new(|filters| next = Some(filters)).dispatch(&self.state.filters, command);
        if let Some(filters) = next {
            self.state.filters = filters;
            self.emit(SearchEvent::FiltersChanged(self.state.filters.clone()));
            self.debouncer.schedule(Instant::now());
        }
    }

    fn select_result(&mut self, index: usize) {
        let Some(result) = self.state.select(index).cloned() else {
            return;
        };
        self.list.scroll_to_index(index, self.state.page_results().len());
        self.emit(SearchEvent::ResultSelected(result));
    }

    fn clear(&mut self) {
        self.state.clear();
        self.debouncer.invalidate();
        self.list.reset();
        self.emit(SearchEvent::FiltersChanged(Vec::new()));
        self.emit(SearchEvent::Cleared);
    }

    fn rerun_history(&mut self, id: EntryId) {
        let mut selected = None;
        self.history.select_entry(id, |params| selected = Some(params.clone()));
        let Some(params) = selected else {
            warn!("No history entry {}", id);
            return;
        };

        self.state.query = params.query;
        self.state.filters = params.filters;
        self.emit(SearchEvent::FiltersChanged(self.state.filters.clone()));
        self.trigger_now();
    }

    fn trigger_now(&mut self) {
        let generation = self.debouncer.fire_now();
        self.launch(generation);
    }

    fn launch(&mut self, generation: Generation) {
        let params = self.state.params(self.config.semantic);
        if params.is_blank() {
            debug!("Blank search {}, clearing results", generation.0);
            self.state.loading = false;
            self.state.set_results(Vec::new());
            self.list.reset();
            self.emit(SearchEvent::ResultsCleared);
            return;
        }

        debug!("Starting search {} for {:?}", generation.0, params.query);
        self.state.loading = true;
        self.emit(SearchEvent::SearchStarted {
            generation,
            params: params.clone(),
        });

        let service = Arc::clone(&self.service);
        let started = Instant::now();
        self.in_flight.push(
            async move {
                let outcome = service.search(params.clone()).await;
                Completion {
                    generation,
                    params,
                    started,
                    outcome,
                }
            }
            .boxed(),
        );
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            generation,
            params,
            started,
            outcome,
        } = completion;
        let time_spent = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (result_count, success) = match &outcome {
            Ok(results) => (results.len(), true),
            Err(_) => (0, false),
        };
        self.record(&params, result_count, time_spent, success);

        if !self.debouncer.is_current(generation) {
            debug!("Discarding superseded search {} for {:?}", generation.0, params.query);
            self.emit(SearchEvent::Superseded { generation });
            return;
        }

        self.state.loading = false;
        self.list.reset();
        match outcome {
            Ok(results) => {
                debug!("Search {} returned {} results in {}ms", generation.0, results.len(), time_spent);
                let total = results.len();
                self.state.set_results(results);
                self.emit(SearchEvent::ResultsReady { generation, total });
            }
            Err(e) => {
                warn!("Search {} failed: {}", generation.0, e);
                let message = e.to_string();
                self.state.set_error(message.clone());
                self.emit(SearchEvent::SearchFailed { generation, message });
            }
        }
    }

    fn record(&mut self, params: &SearchParams, result_count: usize, time_spent: u64, success: bool) {
        if let Err(e) = self.history.record_search(params.clone()) {
            warn!("Failed to persist search history: {}", e);
        }
        self.emit(SearchEvent::HistoryChanged(self.history.entries().to_vec()));

        let tracked = self.analytics.track_search(
            &params.query,
            params.filter_descriptions(),
            result_count,
            time_spent,
            success,
        );
        if let Err(e) = tracked {
            warn!("Failed to persist search analytics: {}", e);
        }
        self.emit(SearchEvent::StatsUpdated(self.analytics.stats().clone()));
    }

    fn with_voice(&mut self, action: impl FnOnce(&mut VoiceController) -> Vec<VoiceNotice>) {
        let before = self.voice.state().clone();
        let notices = action(&mut self.voice);
        if *self.voice.state() != before {
            self.emit(SearchEvent::VoiceStateChanged(self.voice.state().clone()));
        }

        for notice in notices {
            match notice {
                VoiceNotice::Interim(text) => self.emit(SearchEvent::VoiceInterim(text)),
                VoiceNotice::Transcript(text) => {
                    debug!("Voice transcript {:?}", text);
                    self.state.query = text.clone();
                    self.emit(SearchEvent::VoiceTranscript(text));
                    self.trigger_now();
                }
                VoiceNotice::Error(code) => {
                    warn!("Speech recognition error: {}", code);
                    self.emit(SearchEvent::VoiceError(code));
                }
            }
        }
    }

    fn emit(&self, event: SearchEvent) {
        let _ = self.events.send(event);
    }
}
