#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod chart;
mod logger;
mod style;

use chart::heatmap::{self, HeatmapChart};
use data::session::Origin;
use data::{Request, RequestKind, Session};
use exchange::adapter::{self, AdapterError};
use exchange::{Instrument, RawSnapshot};

use iced::widget::{button, checkbox, column, container, pick_list, row, text, text_input};
use iced::{Alignment, Element, Fill, Length, Subscription, Task, Theme, padding};
use uuid::Uuid;

const POLL_INTERVALS: [PollInterval; 5] = [
    PollInterval(250),
    PollInterval(500),
    PollInterval(1000),
    PollInterval(2000),
    PollInterval(5000),
];

fn main() -> iced::Result {
    if let Err(err) = logger::setup(cfg!(debug_assertions)) {
        eprintln!("Failed to initialize logger: {err}");
    }
    logger::install_panic_hook();

    iced::application(DepthMap::new, DepthMap::update, DepthMap::view)
        .settings(iced::Settings {
            antialiasing: true,
            default_text_size: iced::Pixels(13.0),
            ..Default::default()
        })
        .title(DepthMap::title)
        .theme(DepthMap::theme)
        .scale_factor(DepthMap::scale_factor)
        .subscription(DepthMap::subscription)
        .run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PollInterval(u64);

impl std::fmt::Display for PollInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 >= 1000 && self.0 % 1000 == 0 {
            write!(f, "{} s", self.0 / 1000)
        } else {
            write!(f, "{} ms", self.0)
        }
    }
}

struct DepthMap {
    config: data::Config,
    session: Session,
    chart: HeatmapChart,
    symbol_input: String,
}

#[derive(Debug, Clone)]
enum Message {
    SymbolChanged(String),
    LoadSymbol,
    HistoricalLoaded {
        session: Uuid,
        result: Result<Vec<RawSnapshot>, AdapterError>,
    },
    LiveFetched {
        session: Uuid,
        origin: Origin,
        result: Result<RawSnapshot, AdapterError>,
    },
    PollTick(u64),
    Retry,
    ToggleMode,
    PollIntervalSelected(PollInterval),
    AutoRefreshToggled(bool),
    Chart(heatmap::Message),
}

impl DepthMap {
    fn new() -> (Self, Task<Message>) {
        let config = data::config::load();

        let session = Session::new(&config);
        let mut chart = HeatmapChart::new(config.heatmap, config.scale_factor.into());
        session.sync_viewport(&mut chart);

        let initial_symbol = std::env::args().nth(1).unwrap_or_default();
        let boot = if initial_symbol.trim().is_empty() {
            Task::none()
        } else {
            Task::done(Message::LoadSymbol)
        };

        (
            Self {
                config,
                session,
                chart,
                symbol_input: initial_symbol,
            },
            boot,
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SymbolChanged(symbol) => {
                self.symbol_input = symbol;
            }
            Message::LoadSymbol => {
                let Some(instrument) = Instrument::parse(&self.symbol_input) else {
                    log::warn!("Ignoring blank or invalid symbol {:?}", self.symbol_input);
                    return Task::none();
                };

                let request = self.session.load_instrument(instrument, &mut self.chart);
                return self.fetch(request);
            }
            Message::HistoricalLoaded { session, result } => {
                if let Some(request) = self.session.on_historical(session, result, &mut self.chart)
                {
                    return self.fetch(request);
                }
            }
            Message::LiveFetched {
                session,
                origin,
                result,
            } => {
                self.session.on_live(session, origin, result, &mut self.chart);
            }
            Message::PollTick(timer_id) => {
                if let Some(request) = self.session.poll(timer_id) {
                    return self.fetch(request);
                }
            }
            Message::Retry => {
                if let Some(request) = self.session.retry() {
                    return self.fetch(request);
                }
            }
            Message::ToggleMode => {
                let mode = self.session.mode().toggled();
                self.session.set_mode(mode, &mut self.chart);
            }
            Message::PollIntervalSelected(interval) => {
                self.session.set_poll_interval_ms(interval.0);
            }
            Message::AutoRefreshToggled(enabled) => {
                self.session.set_auto_refresh(enabled);
            }
            Message::Chart(message) => {
                self.chart.update(message);
            }
        }

        Task::none()
    }

    fn fetch(&self, request: Request) -> Task<Message> {
        let Request {
            session,
            instrument,
            kind,
        } = request;

        let base = match self.config.api_url() {
            Ok(base) => base,
            Err(err) => {
                let err = AdapterError::InvalidRequest(err.to_string());

                return Task::done(match kind {
                    RequestKind::Historical => Message::HistoricalLoaded {
                        session,
                        result: Err(err),
                    },
                    RequestKind::Live(origin) => Message::LiveFetched {
                        session,
                        origin,
                        result: Err(err),
                    },
                });
            }
        };

        match kind {
            RequestKind::Historical => Task::perform(
                adapter::fetch_historical(base, instrument),
                move |result| Message::HistoricalLoaded { session, result },
            ),
            RequestKind::Live(origin) => {
                Task::perform(adapter::fetch_live(base, instrument), move |result| {
                    Message::LiveFetched {
                        session,
                        origin,
                        result,
                    }
                })
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let is_live = self.session.phase() == data::Phase::LivePolling;

        let controls = row![
            text_input("Symbol, e.g. SPY 250620C00550000", &self.symbol_input)
                .on_input(Message::SymbolChanged)
                .on_submit(Message::LoadSymbol)
                .width(Length::Fixed(300.0)),
            button(text("Load")).on_press(Message::LoadSymbol),
            pick_list(
                POLL_INTERVALS,
                Some(PollInterval(self.session.poll_interval().as_millis() as u64)),
                Message::PollIntervalSelected,
            ),
            row![
                checkbox(self.session.auto_refresh()).on_toggle(Message::AutoRefreshToggled),
                text("Auto refresh"),
            ]
            .spacing(4)
            .align_y(Alignment::Center),
            button(text(self.session.mode().to_string())).on_press(Message::ToggleMode),
            button(text("Refresh")).on_press_maybe(is_live.then_some(Message::Retry)),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        let mut content = column![controls, self.quote_strip()].spacing(8);

        if let Some(error) = &self.session.status().error {
            content = content.push(
                container(
                    row![
                        text(error.as_str()).width(Fill),
                        button(text("Retry")).on_press(Message::Retry),
                    ]
                    .spacing(8)
                    .align_y(Alignment::Center),
                )
                .padding(8)
                .style(style::error_box),
            );
        }

        content = content.push(self.chart.view().map(Message::Chart));

        container(content).padding(padding::all(8)).into()
    }

    fn quote_strip(&self) -> Element<'_, Message> {
        let precision = self.config.heatmap.price_precision;
        let latest = self.session.latest();

        let symbol = self
            .session
            .instrument()
            .map_or_else(|| "No symbol".to_string(), Instrument::display);

        let price = latest
            .last_price
            .map_or_else(|| "-".to_string(), |p| format!("{p:.precision$}"));
        let size = latest
            .last_size
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        let underlying = latest
            .underlying_price
            .map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));

        let mut strip = row![
            text(symbol).font(style::MONO_BOLD),
            text(format!("Last {price}")).font(style::MONO),
            text(format!("Size {size}")).font(style::MONO),
            text(format!("Underlying {underlying}")).font(style::MONO),
        ]
        .spacing(16)
        .align_y(Alignment::Center);

        if self.session.status().loading {
            strip = strip.push(text("Loading...").style(style::muted_text));
        }

        container(strip)
            .padding([4, 8])
            .width(Fill)
            .style(style::quote_strip)
            .into()
    }

    fn title(&self) -> String {
        match self.session.instrument() {
            Some(instrument) => format!("Depthmap [{}]", instrument.display()),
            None => "Depthmap".to_string(),
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn scale_factor(&self) -> f32 {
        self.config.scale_factor.into()
    }

    fn subscription(&self) -> Subscription<Message> {
        match self.session.poll_timer() {
            Some(timer) => iced::time::every(timer.interval)
                .with(timer.id)
                .map(|(id, _)| Message::PollTick(id)),
            None => Subscription::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_labels() {
        assert_eq!(PollInterval(250).to_string(), "250 ms");
        assert_eq!(PollInterval(1000).to_string(), "1 s");
        assert_eq!(PollInterval(1500).to_string(), "1500 ms");
    }
}
