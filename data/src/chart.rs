pub mod autoscale;
pub mod heatmap;

pub use autoscale::{Interaction, Mode, PriceBand, ViewState, ViewWindow};
pub use heatmap::{Bar, Cell, History, LiveOutcome};

/// Capabilities a chart host exposes to a session.
///
/// The session only ever talks to its host through this trait, so it never
/// depends on a concrete widget type.
pub trait ViewPort {
    fn set_bars(&mut self, bars: &[Bar]);

    fn set_window(&mut self, window: ViewWindow);

    fn set_interaction(&mut self, interaction: Interaction);

    fn scroll_to_realtime(&mut self);

    /// Show the bars between `from` and `to` (seconds, inclusive).
    fn set_visible_range(&mut self, from: i64, to: i64);
}
