use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

const TICKER_WIDTH: usize = 6;
const STRIKE_WIDTH: usize = 8;
const STRIKE_MULTIPLIER: f64 = 1000.0;

static CONTRACT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]+)\s*(\d{6})([CP])(\d{1,8})$").expect("contract code regex is valid")
});

static PADDED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s+(\d{6})([CP])0*(\d+)000").expect("padded code regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    pub fn code(self) -> char {
        match self {
            OptionKind::Call => 'C',
            OptionKind::Put => 'P',
        }
    }
}

/// Listed option contract as entered by the user.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OptionContract {
    pub underlying: String,
    pub expiry: NaiveDate,
    pub kind: OptionKind,
    pub strike: f64,
}

impl OptionContract {
    /// Reads a contract code with or without the ticker padding.
    ///
    /// A full 8 digit strike is already multiplied by 1000; a shorter one is
    /// taken as the plain strike, so `SPY250620C550` is the 550 call.
    pub fn parse(code: &str) -> Option<Self> {
        let caps = CONTRACT_CODE.captures(code.trim())?;

        let expiry = NaiveDate::parse_from_str(&caps[2], "%y%m%d").ok()?;
        let kind = match &caps[3] {
            "C" => OptionKind::Call,
            _ => OptionKind::Put,
        };

        let digits = &caps[4];
        let raw_strike = digits.parse::<u64>().ok()? as f64;
        let strike = if digits.len() == STRIKE_WIDTH {
            raw_strike / STRIKE_MULTIPLIER
        } else {
            raw_strike
        };

        Some(OptionContract {
            underlying: caps[1].to_string(),
            expiry,
            kind,
            strike,
        })
    }

    /// `TICKER` space-padded to 6, `YYMMDD`, `C`/`P`, strike ×1000 zero-padded to 8.
    pub fn code(&self) -> String {
        let strike = (self.strike * STRIKE_MULTIPLIER).round() as u64;

        format!(
            "{:<width$}{}{}{:0>strike_width$}",
            self.underlying.trim().to_uppercase(),
            self.expiry.format("%y%m%d"),
            self.kind.code(),
            strike,
            width = TICKER_WIDTH,
            strike_width = STRIKE_WIDTH,
        )
    }

    pub fn instrument(&self) -> Instrument {
        Instrument(self.code())
    }
}

/// Backend symbol of the instrument a chart session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Instrument(String);

impl Instrument {
    /// Option contract codes are normalised to the padded backend form; any
    /// other symbol is passed through. `%20` escapes are treated as spaces.
    pub fn parse(raw: &str) -> Option<Self> {
        let unescaped = raw.replace("%20", " ");
        let trimmed = unescaped.trim_end();

        if trimmed.trim().is_empty() {
            return None;
        }

        Some(match OptionContract::parse(trimmed) {
            Some(contract) => contract.instrument(),
            None => Self(trimmed.to_string()),
        })
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Human form: padding and the strike multiplier stripped.
    pub fn display(&self) -> String {
        PADDED_CODE.replace(&self.0, "$1 $2$3$4").into_owned()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
