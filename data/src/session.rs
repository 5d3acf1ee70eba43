//! Lifecycle of one chart session: historical load, then live polling.
//!
//! The session does no I/O. It hands out [`Request`]s for the host to run and
//! takes their results back, dropping any completion whose session token no
//! longer matches (the instrument changed while it was in flight).

use std::time::Duration;

use exchange::{AdapterError, Instrument, RawSnapshot};
use uuid::Uuid;

use crate::chart::{History, LiveOutcome, Mode, ViewPort, ViewState};
use crate::config::{Config, MIN_POLL_INTERVAL};

/// Below this span the visible range is pinned to the whole history.
const INITIAL_RANGE_SECS: i64 = 180;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Init,
    LoadingHistory,
    LivePolling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Timer,
    /// User retry; the only path whose failure reaches the view.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Historical,
    Live(Origin),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub session: Uuid,
    pub instrument: Instrument,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollTimer {
    pub id: u64,
    pub interval: Duration,
}

/// Most recent quote fields, each carried forward until replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Latest {
    pub last_price: Option<f64>,
    pub last_size: Option<u64>,
    pub underlying_price: Option<f64>,
}

impl Latest {
    fn merge(&mut self, snap: &RawSnapshot) {
        self.last_price = snap.last_price.or(self.last_price);
        self.last_size = snap.last_size.or(self.last_size);
        self.underlying_price = snap.underlying_price.or(self.underlying_price);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub loading: bool,
    pub error: Option<String>,
}

pub struct Session {
    token: Uuid,
    instrument: Option<Instrument>,
    phase: Phase,
    history: History,
    view: ViewState,
    latest: Latest,
    status: Status,
    poll_interval: Duration,
    auto_refresh: bool,
    timer: Option<PollTimer>,
    timer_seq: u64,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            token: Uuid::new_v4(),
            instrument: None,
            phase: Phase::Init,
            history: History::new(config.heatmap.tick_size),
            view: ViewState::new(config.default_mode),
            latest: Latest::default(),
            status: Status::default(),
            poll_interval: config.poll_interval(),
            auto_refresh: config.auto_refresh,
            timer: None,
            timer_seq: 0,
        }
    }

    pub fn instrument(&self) -> Option<&Instrument> {
        self.instrument.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn mode(&self) -> Mode {
        self.view.mode()
    }

    pub fn latest(&self) -> &Latest {
        &self.latest
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// The single recurring poll the host should be running, if any.
    pub fn poll_timer(&self) -> Option<PollTimer> {
        self.timer
    }

    pub fn is_current(&self, token: Uuid) -> bool {
        self.token == token
    }

    /// Pushes the whole session state to a freshly attached host.
    pub fn sync_viewport(&self, viewport: &mut impl ViewPort) {
        viewport.set_bars(self.history.bars());
        viewport.set_window(self.view.window());
        viewport.set_interaction(self.view.interaction());
    }

    pub fn load_instrument(
        &mut self,
        instrument: Instrument,
        viewport: &mut impl ViewPort,
    ) -> Request {
        log::info!("Loading instrument {instrument}");

        self.timer = None;
        self.token = Uuid::new_v4();
        self.instrument = Some(instrument.clone());

        self.history.clear();
        viewport.set_bars(self.history.bars());

        if let Some(window) = self.view.reset() {
            viewport.set_window(window);
        }

        self.latest = Latest::default();
        self.status = Status {
            loading: true,
            error: None,
        };
        self.phase = Phase::LoadingHistory;

        Request {
            session: self.token,
            instrument,
            kind: RequestKind::Historical,
        }
    }

    /// Completes the historical load; on success or failure the session goes
    /// live and the first poll is issued right away.
    pub fn on_historical(
        &mut self,
        token: Uuid,
        result: Result<Vec<RawSnapshot>, AdapterError>,
        viewport: &mut impl ViewPort,
    ) -> Option<Request> {
        if !self.is_current(token) || self.phase != Phase::LoadingHistory {
            log::debug!("Dropping historical response for a superseded session");
            return None;
        }

        match result {
            Ok(snapshots) => {
                let received = snapshots.len();
                let kept = self.history.import(snapshots);

                log::info!("Imported {kept} of {received} historical snapshots");

                viewport.set_bars(self.history.bars());
                viewport.scroll_to_realtime();
            }
            Err(err) => {
                log::error!("Historical load failed, continuing with live data: {err}");
            }
        }

        self.phase = Phase::LivePolling;
        self.rearm_timer();

        self.live_request(Origin::Timer)
    }

    /// A tick from the poll timer identified by `timer_id`.
    pub fn poll(&self, timer_id: u64) -> Option<Request> {
        match self.timer {
            Some(timer) if timer.id == timer_id => self.live_request(Origin::Timer),
            _ => None,
        }
    }

    pub fn retry(&mut self) -> Option<Request> {
        let request = self.live_request(Origin::Manual)?;

        self.status = Status {
            loading: true,
            error: None,
        };

        Some(request)
    }

    pub fn on_live(
        &mut self,
        token: Uuid,
        origin: Origin,
        result: Result<RawSnapshot, AdapterError>,
        viewport: &mut impl ViewPort,
    ) -> Option<LiveOutcome> {
        if !self.is_current(token) {
            log::debug!("Dropping live response for a superseded session");
            return None;
        }

        let snap = match result {
            Ok(snap) => snap,
            Err(err) => {
                match origin {
                    Origin::Timer => log::warn!("Live poll failed: {err}"),
                    Origin::Manual => {
                        log::error!("Manual refresh failed: {err}");
                        self.status = Status {
                            loading: false,
                            error: Some(err.to_user_message().to_string()),
                        };
                    }
                }
                return None;
            }
        };

        let outcome = self.history.apply_live(&snap);

        match outcome {
            LiveOutcome::Malformed => {
                log::debug!("Ignoring live payload without levels");
            }
            LiveOutcome::Stale { time, last } => {
                log::debug!("Ignoring stale update at {time}, latest stored bar is {last}");
            }
            LiveOutcome::NoBar { time } | LiveOutcome::Appended { time } => {
                self.latest.merge(&snap);

                if let Some(window) = self.view.observe_trade_price(snap.last_price) {
                    viewport.set_window(window);
                }

                if matches!(outcome, LiveOutcome::Appended { .. }) {
                    viewport.set_bars(self.history.bars());
                }

                let span = self.history.span();
                if span < INITIAL_RANGE_SECS {
                    let end = self.history.last_time().unwrap_or(time);
                    viewport.set_visible_range(end - span, end);
                }
                viewport.scroll_to_realtime();

                self.status.loading = false;
            }
        }

        if origin == Origin::Manual {
            self.status.loading = false;
        }

        Some(outcome)
    }

    pub fn set_mode(&mut self, mode: Mode, viewport: &mut impl ViewPort) {
        let (interaction, window) = self.view.set_mode(mode);

        viewport.set_interaction(interaction);
        if let Some(window) = window {
            viewport.set_window(window);
        }
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        let interval = interval.max(MIN_POLL_INTERVAL);
        if interval == self.poll_interval {
            return;
        }

        self.poll_interval = interval;
        self.rearm_timer();
    }

    pub fn set_poll_interval_ms(&mut self, millis: u64) {
        self.set_poll_interval(Duration::from_millis(millis));
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        if enabled == self.auto_refresh {
            return;
        }

        self.auto_refresh = enabled;
        self.rearm_timer();
    }

    fn live_request(&self, origin: Origin) -> Option<Request> {
        if self.phase != Phase::LivePolling {
            return None;
        }

        self.instrument.clone().map(|instrument| Request {
            session: self.token,
            instrument,
            kind: RequestKind::Live(origin),
        })
    }

    /// Drops the current timer and, when polling applies, starts a new one.
    fn rearm_timer(&mut self) {
        self.timer = if self.phase == Phase::LivePolling && self.auto_refresh {
            self.timer_seq += 1;
            Some(PollTimer {
                id: self.timer_seq,
                interval: self.poll_interval,
            })
        } else {
            None
        };
    }
}
