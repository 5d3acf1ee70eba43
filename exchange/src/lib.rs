pub mod adapter;
pub mod client;
pub mod depth;
pub mod instrument;

pub use adapter::AdapterError;
pub use depth::{HistoricalBatch, PriceLevel, RawSnapshot, Side};
pub use instrument::{Instrument, OptionContract, OptionKind};
