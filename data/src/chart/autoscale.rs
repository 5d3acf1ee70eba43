use serde::{Deserialize, Serialize};

const BAND_PCT: f64 = 0.1;
const BAND_MIN_HALF_WIDTH: f64 = 0.05;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Mode {
    /// Vertical window locked to a band around the last trade.
    #[default]
    Auto,
    Manual,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Auto => Mode::Manual,
            Mode::Manual => Mode::Auto,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Auto => write!(f, "Auto (±10% band)"),
            Mode::Manual => write!(f, "Manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PriceBand {
    pub min_value: f64,
    pub max_value: f64,
}

impl PriceBand {
    /// ±10% around `price`, never narrower than ±0.05, floored at zero.
    pub fn around(price: f64) -> Self {
        PriceBand {
            min_value: (price - BAND_MIN_HALF_WIDTH).min(price * (1.0 - BAND_PCT)).max(0.0),
            max_value: (price + BAND_MIN_HALF_WIDTH).max(price * (1.0 + BAND_PCT)),
        }
    }

    pub fn span(&self) -> f64 {
        self.max_value - self.min_value
    }
}

/// Declarative vertical window the host should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewWindow {
    /// Fit whatever is visible.
    AutoFit,
    Fixed(PriceBand),
}

/// Which vertical gestures the host may honour; the time axis is always free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub price_drag: bool,
    pub wheel_zoom: bool,
    pub double_click_reset: bool,
}

impl From<Mode> for Interaction {
    fn from(mode: Mode) -> Self {
        let free = mode == Mode::Manual;
        Interaction {
            price_drag: free,
            wheel_zoom: free,
            double_click_reset: free,
        }
    }
}

/// Per-session autoscale state.
///
/// Every `Some(window)` returned from here is an effect the caller must push
/// to its viewport; `None` means the applied window is already current.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    mode: Mode,
    last_trade_price: Option<f64>,
    initial_zoom_applied: bool,
    applied: Option<ViewWindow>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

impl ViewState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            last_trade_price: None,
            initial_zoom_applied: false,
            applied: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn last_trade_price(&self) -> Option<f64> {
        self.last_trade_price
    }

    pub fn initial_zoom_applied(&self) -> bool {
        self.initial_zoom_applied
    }

    pub fn window(&self) -> ViewWindow {
        self.applied.unwrap_or(ViewWindow::AutoFit)
    }

    pub fn interaction(&self) -> Interaction {
        Interaction::from(self.mode)
    }

    /// Band for the cached trade price, computed in either mode.
    pub fn band(&self) -> Option<PriceBand> {
        self.last_trade_price.map(PriceBand::around)
    }

    /// Instrument change: mode survives, everything else starts over.
    pub fn reset(&mut self) -> Option<ViewWindow> {
        self.last_trade_price = None;
        self.initial_zoom_applied = false;
        self.applied = None;

        self.install(ViewWindow::AutoFit)
    }

    pub fn observe_trade_price(&mut self, price: Option<f64>) -> Option<ViewWindow> {
        let price = price.filter(|p| p.is_finite())?;
        self.last_trade_price = Some(price);

        let band = ViewWindow::Fixed(PriceBand::around(price));

        if !self.initial_zoom_applied {
            self.initial_zoom_applied = true;
            return self.install(band);
        }

        match self.mode {
            Mode::Auto => self.install(band),
            Mode::Manual => None,
        }
    }

    pub fn set_mode(&mut self, mode: Mode) -> (Interaction, Option<ViewWindow>) {
        self.mode = mode;

        let window = match mode {
            Mode::Auto => self.band().map(ViewWindow::Fixed),
            Mode::Manual => Some(ViewWindow::AutoFit),
        };

        (
            Interaction::from(mode),
            window.and_then(|window| self.install(window)),
        )
    }

    fn install(&mut self, window: ViewWindow) -> Option<ViewWindow> {
        if self.applied == Some(window) {
            None
        } else {
            self.applied = Some(window);
            Some(window)
        }
    }
}
