use crate::clock::{PlaybackClock, TICK_PERIOD};
use crate::engine::{EngineAction, EngineOutput, SearchMessage, SessionEngine};
use crate::events::PipelineEvent;
use crate::session::TrackSession;
use lyric_bridge_catalog::matcher::build_keyword;
use lyric_bridge_catalog::{CatalogService, MetadataMatcher};
use lyric_bridge_core::{lrc, AppConfig, RecoverableError, TrackKey};
use lyric_bridge_source::LogSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SEARCH_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub translation_tolerance_secs: f64,
    pub event_capacity: usize,
    pub tick_period: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            translation_tolerance_secs: lrc::TRANSLATION_TOLERANCE_SECS,
            event_capacity: 256,
            tick_period: TICK_PERIOD,
        }
    }
}

impl MonitorConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            translation_tolerance_secs: cfg.matching.translation_tolerance_secs,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    StreamEnded,
    Stopped,
    SourceFailed(String),
}

/// Read side of a running monitor. Dropping every handle stops it.
pub struct MonitorHandle {
    events: broadcast::Receiver<PipelineEvent>,
    session: watch::Receiver<TrackSession>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Clone for MonitorHandle {
    fn clone(&self) -> Self {
        Self {
            events: self.events.resubscribe(),
            session: self.session.clone(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl MonitorHandle {
    /// Events published from now on, in the order they were applied.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.resubscribe()
    }

    pub fn watch_session(&self) -> watch::Receiver<TrackSession> {
        self.session.clone()
    }

    pub fn snapshot(&self) -> TrackSession {
        self.session.borrow().clone()
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

enum Step {
    Shutdown,
    Search(SearchMessage),
    Tick(Duration),
    Line(anyhow::Result<Option<String>>),
}

/// Owns the session and is its only writer. Lines, clock ticks and search
/// results are applied one at a time from a single task.
pub struct Monitor {
    engine: SessionEngine,
    matcher: MetadataMatcher<dyn CatalogService>,
    clock: PlaybackClock,
    tolerance_secs: f64,
    events: broadcast::Sender<PipelineEvent>,
    session_tx: watch::Sender<TrackSession>,
    shutdown_rx: watch::Receiver<bool>,
    search_tx: mpsc::Sender<SearchMessage>,
    search_rx: mpsc::Receiver<SearchMessage>,
    search_task: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn new(catalog: Arc<dyn CatalogService>, cfg: MonitorConfig) -> (Self, MonitorHandle) {
        let (events, events_rx) = broadcast::channel(cfg.event_capacity.max(1));
        let (session_tx, session_rx) = watch::channel(TrackSession::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (search_tx, search_rx) = mpsc::channel(SEARCH_CHANNEL_CAPACITY);

        let monitor = Self {
            engine: SessionEngine::new(),
            matcher: MetadataMatcher::new(catalog),
            clock: PlaybackClock::new(cfg.tick_period),
            tolerance_secs: cfg.translation_tolerance_secs,
            events,
            session_tx,
            shutdown_rx,
            search_tx,
            search_rx,
            search_task: None,
        };
        let handle = MonitorHandle {
            events: events_rx,
            session: session_rx,
            shutdown: Arc::new(shutdown_tx),
        };
        (monitor, handle)
    }

    pub async fn run<S: LogSource>(mut self, mut source: S) -> MonitorExit {
        info!(source = source.name(), "monitor started");

        let exit = loop {
            let step = tokio::select! {
                biased;
                changed = self.shutdown_rx.changed() => {
                    if changed.is_ok() && !*self.shutdown_rx.borrow() {
                        continue;
                    }
                    Step::Shutdown
                }
                Some(msg) = self.search_rx.recv() => Step::Search(msg),
                period = self.clock.tick() => Step::Tick(period),
                line = source.next_line() => Step::Line(line),
            };

            match step {
                Step::Shutdown => {
                    info!("stop requested");
                    break MonitorExit::Stopped;
                }
                Step::Search(msg) => {
                    let out = self.engine.apply_search(msg);
                    self.dispatch(out);
                }
                Step::Tick(period) => {
                    let delta_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
                    let out = self.engine.tick(delta_ms);
                    self.dispatch(out);
                }
                Step::Line(Ok(Some(line))) => {
                    let out = self.engine.ingest_line(&line);
                    self.dispatch(out);
                }
                Step::Line(Ok(None)) => {
                    info!(source = source.name(), "log stream ended");
                    break MonitorExit::StreamEnded;
                }
                Step::Line(Err(err)) => {
                    error!(source = source.name(), error = %err, "log source failed");
                    break MonitorExit::SourceFailed(format!("{err:#}"));
                }
            }
        };

        let out = self.engine.stop();
        self.dispatch(out);
        info!(exit = ?exit, "monitor stopped");
        exit
    }

    fn dispatch(&mut self, out: EngineOutput) {
        for action in out.actions {
            match action {
                EngineAction::StartClock => {
                    if self.clock.start() {
                        debug!("playback clock started");
                    }
                }
                EngineAction::StopClock => {
                    if self.clock.stop() {
                        debug!("playback clock stopped");
                    }
                }
                EngineAction::Search { key, title, artist } => self.spawn_search(key, title, artist),
                EngineAction::CancelSearch => self.cancel_search(),
            }
        }

        for event in out.events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        self.session_tx.send_replace(self.engine.session().clone());
    }

    fn spawn_search(&mut self, key: TrackKey, title: String, artist: String) {
        self.cancel_search();
        let job = resolve_track(
            self.matcher.clone(),
            key,
            title,
            artist,
            self.tolerance_secs,
            self.search_tx.clone(),
        );
        self.search_task = Some(tokio::spawn(job));
    }

    fn cancel_search(&mut self) {
        if let Some(task) = self.search_task.take() {
            if !task.is_finished() {
                debug!("aborting search for previous track");
            }
            task.abort();
        }
    }
}

/// Search, then lyrics. Every message carries the key it was started for so
/// the monitor can drop results that arrive after the track changed.
async fn resolve_track(
    matcher: MetadataMatcher<dyn CatalogService>,
    key: TrackKey,
    title: String,
    artist: String,
    tolerance_secs: f64,
    tx: mpsc::Sender<SearchMessage>,
) {
    let keyword = build_keyword(&title).unwrap_or_default();
    let outcome = match matcher.search(&title, &artist).await {
        Ok(Some(outcome)) => outcome,
        Ok(None) => {
            let error = RecoverableError::NoMatchFound { keyword };
            let _ = tx.send(SearchMessage::Unmatched { key, error }).await;
            return;
        }
        Err(err) => {
            warn!(track = %key, error = %err, "catalog search failed");
            let error = RecoverableError::SearchUnavailable {
                keyword,
                reason: err.to_string(),
            };
            let _ = tx.send(SearchMessage::Unmatched { key, error }).await;
            return;
        }
    };

    let song_id = outcome.candidate.id;
    let matched = SearchMessage::Matched {
        key: key.clone(),
        outcome,
    };
    if tx.send(matched).await.is_err() {
        return;
    }

    let msg = match matcher.catalog().lyric(song_id).await {
        Ok(payload) => {
            let document = lrc::from_payload(&payload, tolerance_secs);
            if document.is_empty() {
                SearchMessage::LyricsFailed {
                    key,
                    error: RecoverableError::LyricUnavailable {
                        song_id,
                        reason: "no timed lines".to_string(),
                    },
                }
            } else {
                SearchMessage::LyricsReady { key, document }
            }
        }
        Err(err) => SearchMessage::LyricsFailed {
            key,
            error: RecoverableError::LyricUnavailable {
                song_id,
                reason: err.to_string(),
            },
        },
    };
    let _ = tx.send(msg).await;
}
