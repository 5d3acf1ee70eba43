use exchange::{PriceLevel, RawSnapshot};
use iced_core::Color;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_SIZE: f64 = 0.01;

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub tick_size: f64,
    pub price_precision: usize,
    /// Gap left around each cell, in media units.
    pub cell_border_width: f32,
    pub bid_color: Color,
    pub ask_color: Color,
    /// Depth magnitude at which a cell is drawn fully opaque.
    pub full_opacity_amount: f64,
    pub bubble_color: Color,
    pub bubble_scale: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tick_size: DEFAULT_TICK_SIZE,
            price_precision: 2,
            cell_border_width: 1.0,
            bid_color: Color::from_rgb8(76, 175, 80),
            ask_color: Color::from_rgb8(244, 67, 54),
            full_opacity_amount: 100.0,
            bubble_color: Color::from_rgba8(239, 246, 105, 0.5),
            bubble_scale: 3.0,
        }
    }
}

impl Config {
    pub fn cell_color(&self, amount: f64) -> Color {
        let alpha = (amount.abs() / self.full_opacity_amount).min(1.0) as f32;
        let base = if amount > 0.0 {
            self.bid_color
        } else {
            self.ask_color
        };

        Color { a: alpha, ..base }
    }
}

/// A one-tick price range with net signed depth; bids positive, asks negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell {
    pub low: f64,
    pub high: f64,
    pub amount: f64,
}

impl Cell {
    pub fn from_level(level: &PriceLevel, tick_size: f64) -> Self {
        Cell {
            low: level.price,
            high: level.price + tick_size,
            amount: level.signed_amount(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.low.is_finite() && self.high.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    /// Whole seconds; strictly increasing across a [`History`].
    pub time: i64,
    pub cells: Vec<Cell>,
    pub last_price: Option<f64>,
    pub last_size: Option<u64>,
}

impl Bar {
    pub fn trade(&self) -> Option<(f64, u64)> {
        match (self.last_price, self.last_size) {
            (Some(price), Some(size)) if price.is_finite() => Some((price, size)),
            _ => None,
        }
    }

    /// Lowest `low` and highest `high` over finite cells.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .filter(|c| c.is_finite())
            .fold(None, |acc, c| match acc {
                None => Some((c.low, c.high)),
                Some((lo, hi)) => Some((lo.min(c.low), hi.max(c.high))),
            })
    }
}

pub fn price_range<'a>(bars: impl IntoIterator<Item = &'a Bar>) -> Option<(f64, f64)> {
    bars.into_iter()
        .filter_map(Bar::price_range)
        .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    /// Payload had no `levels` field.
    Malformed,
    Stale { time: i64, last: i64 },
    /// Accepted, but nothing worth storing (no depth, no print).
    NoBar { time: i64 },
    Appended { time: i64 },
}

/// Time-ordered depth bars of one chart session.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    bars: Vec<Bar>,
    tick_size: f64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_SIZE)
    }
}

impl History {
    pub fn new(tick_size: f64) -> Self {
        Self {
            bars: Vec::new(),
            tick_size,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_time(&self) -> Option<i64> {
        self.bars.last().map(|bar| bar.time)
    }

    /// Seconds between the first and the last stored bar.
    pub fn span(&self) -> i64 {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0,
        }
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }

    /// Replaces the store with a historical batch.
    ///
    /// Snapshots without levels are dropped. A bar whose second is not after
    /// the previously emitted one is pushed to `previous + 1`, in input order.
    /// The first bar is measured against second 0, so it always lands at 1 or
    /// later.
    pub fn import(&mut self, snapshots: impl IntoIterator<Item = RawSnapshot>) -> usize {
        let tick_size = self.tick_size;
        let mut previous: i64 = 0;

        let mut bars: Vec<Bar> = snapshots
            .into_iter()
            .filter(RawSnapshot::has_levels)
            .map(|snap| {
                let mut time = snap.time_secs();
                if time <= previous {
                    time = previous + 1;
                }
                previous = time;

                Bar {
                    time,
                    cells: snap
                        .levels()
                        .iter()
                        .map(|level| Cell::from_level(level, tick_size))
                        .collect(),
                    last_price: snap.last_price,
                    last_size: snap.last_size,
                }
            })
            .collect();

        bars.sort_by_key(|bar| bar.time);
        self.bars = bars;

        self.bars.len()
    }

    /// Merges one live snapshot, keeping bar times strictly increasing.
    pub fn apply_live(&mut self, snap: &RawSnapshot) -> LiveOutcome {
        let Some(levels) = snap.levels.as_deref() else {
            return LiveOutcome::Malformed;
        };

        let current = snap.time_secs();
        let last = self.last_time().unwrap_or(0);

        if current < last {
            return LiveOutcome::Stale {
                time: current,
                last,
            };
        }

        let time = current.max(last + 1);

        let cells: Vec<Cell> = levels
            .iter()
            .filter(|level| level.quantity > 0)
            .map(|level| Cell::from_level(level, self.tick_size))
            .collect();

        if cells.is_empty() && snap.last_size.is_none() {
            return LiveOutcome::NoBar { time };
        }

        let (last_price, last_size) = match (snap.last_price, snap.last_size) {
            (Some(price), Some(size)) => (Some(price), Some(size)),
            _ => (None, None),
        };

        self.bars.retain(|bar| bar.time <= time);
        self.bars.push(Bar {
            time,
            cells,
            last_price,
            last_size,
        });
        self.bars.sort_by_key(|bar| bar.time);

        LiveOutcome::Appended { time }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange::Side;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn level(price: f64, quantity: u64, side: Side) -> PriceLevel {
        PriceLevel {
            price,
            quantity,
            side,
        }
    }

    fn snap(timestamp: i64, levels: Vec<PriceLevel>) -> RawSnapshot {
        RawSnapshot {
            timestamp,
            levels: Some(levels),
            ..Default::default()
        }
    }

    fn one_bid(timestamp: i64) -> RawSnapshot {
        snap(timestamp, vec![level(10.0, 5, Side::Bid)])
    }

    fn assert_monotonic(history: &History) {
        for pair in history.bars().windows(2) {
            assert!(
                pair[0].time < pair[1].time,
                "bars out of order: {} then {}",
                pair[0].time,
                pair[1].time
            );
        }
    }

    #[test]
    fn cells_carry_signed_depth() {
        let bid = Cell::from_level(&level(10.0, 5, Side::Bid), DEFAULT_TICK_SIZE);
        let ask = Cell::from_level(&level(10.0, 3, Side::Ask), DEFAULT_TICK_SIZE);

        assert_eq!(bid.amount, 5.0);
        assert_eq!(ask.amount, -3.0);
        assert!((bid.high - 10.01).abs() < EPS);
    }

    #[test]
    fn import_drops_empty_and_separates_collisions() {
        let mut history = History::default();

        let count = history.import(vec![
            one_bid(1_000_000),
            snap(1_000_200, vec![]),
            RawSnapshot {
                timestamp: 1_000_300,
                ..Default::default()
            },
            one_bid(1_000_400),
            one_bid(1_000_900),
            one_bid(1_003_000),
        ]);

        let times: Vec<i64> = history.bars().iter().map(|b| b.time).collect();
        assert_eq!(count, 4);
        assert_eq!(times, vec![1000, 1001, 1002, 1003]);
    }

    #[test]
    fn import_bumps_out_of_order_input_forward() {
        let mut history = History::default();
        history.import(vec![one_bid(5_000), one_bid(2_000), one_bid(9_000)]);

        let times: Vec<i64> = history.bars().iter().map(|b| b.time).collect();
        assert_eq!(times, vec![5, 6, 9]);
    }

    #[test]
    fn import_replaces_store_and_keeps_trade_fields_independently() {
        let mut history = History::default();
        history.import(vec![one_bid(1_000), one_bid(2_000)]);

        history.import(vec![RawSnapshot {
            last_price: Some(10.0),
            ..one_bid(7_000)
        }]);

        assert_eq!(history.len(), 1);
        assert_eq!(history.bars()[0].last_price, Some(10.0));
        assert_eq!(history.bars()[0].last_size, None);
        assert_eq!(history.bars()[0].trade(), None);
    }

    #[test]
    fn stale_update_leaves_store_untouched() {
        let mut history = History::default();
        history.import(vec![one_bid(1_000_000), one_bid(1_005_000)]);
        let before = history.clone();

        let outcome = history.apply_live(&one_bid(1_004_999));

        assert_eq!(
            outcome,
            LiveOutcome::Stale {
                time: 1004,
                last: 1005
            }
        );
        assert_eq!(history, before);
    }

    #[test]
    fn repeated_timestamp_is_forced_apart() {
        let mut history = History::default();
        history.import(vec![one_bid(1_000_000)]);

        let first = history.apply_live(&one_bid(1_001_000));
        let second = history.apply_live(&one_bid(1_001_000));

        assert_eq!(first, LiveOutcome::Appended { time: 1001 });
        assert_eq!(second, LiveOutcome::Appended { time: 1002 });

        // 1001 is now behind the bumped bar at 1002
        let before = history.clone();
        assert_eq!(
            history.apply_live(&one_bid(1_001_000)),
            LiveOutcome::Stale {
                time: 1001,
                last: 1002
            }
        );
        assert_eq!(history, before);

        assert_eq!(
            history.apply_live(&one_bid(1_002_000)),
            LiveOutcome::Appended { time: 1003 }
        );
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn import_moves_first_bar_past_zero() {
        let mut history = History::default();
        history.import(vec![one_bid(500)]);
        assert_eq!(history.bars()[0].time, 1);

        history.import(vec![one_bid(-3_000), one_bid(0)]);
        let times: Vec<i64> = history.bars().iter().map(|bar| bar.time).collect();
        assert_eq!(times, vec![1, 2]);
    }

    #[test]
    fn equal_to_last_is_not_stale() {
        let mut history = History::default();
        history.import(vec![one_bid(1_000_000)]);

        assert_eq!(
            history.apply_live(&one_bid(1_000_500)),
            LiveOutcome::Appended { time: 1001 }
        );
    }

    #[test]
    fn missing_levels_is_ignored() {
        let mut history = History::default();
        history.import(vec![one_bid(1_000_000)]);
        let before = history.clone();

        let outcome = history.apply_live(&RawSnapshot {
            timestamp: 2_000_000,
            last_price: Some(1.0),
            last_size: Some(1),
            ..Default::default()
        });

        assert_eq!(outcome, LiveOutcome::Malformed);
        assert_eq!(history, before);
    }

    #[test]
    fn empty_frame_without_print_is_not_stored() {
        let mut history = History::default();
        history.import(vec![one_bid(1_000_000)]);

        let outcome = history.apply_live(&RawSnapshot {
            last_price: Some(10.0),
            ..snap(1_002_000, vec![level(10.0, 0, Side::Bid)])
        });

        assert_eq!(outcome, LiveOutcome::NoBar { time: 1002 });
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn print_without_depth_is_stored() {
        let mut history = History::default();

        let outcome = history.apply_live(&RawSnapshot {
            last_price: Some(10.0),
            last_size: Some(4),
            ..snap(3_000, vec![])
        });

        assert_eq!(outcome, LiveOutcome::Appended { time: 3 });
        assert!(history.bars()[0].cells.is_empty());
        assert_eq!(history.bars()[0].trade(), Some((10.0, 4)));
    }

    #[test]
    fn trade_attached_only_when_complete() {
        let mut history = History::default();

        history.apply_live(&RawSnapshot {
            last_size: Some(4),
            ..one_bid(3_000)
        });

        assert_eq!(history.bars()[0].last_price, None);
        assert_eq!(history.bars()[0].last_size, None);
    }

    #[test]
    fn first_live_update_on_empty_store() {
        let mut history = History::default();

        assert_eq!(
            history.apply_live(&one_bid(0)),
            LiveOutcome::Appended { time: 1 }
        );
    }

    #[test]
    fn history_then_live_scenario() {
        let mut history = History::default();
        history.import(vec![RawSnapshot {
            last_price: Some(10.0),
            last_size: Some(2),
            ..one_bid(1_000_000)
        }]);

        let outcome = history.apply_live(&RawSnapshot {
            last_price: Some(10.01),
            last_size: Some(1),
            ..snap(
                1_002_000,
                vec![level(10.0, 7, Side::Bid), level(10.01, 3, Side::Ask)],
            )
        });

        assert_eq!(outcome, LiveOutcome::Appended { time: 1002 });

        let bars = history.bars();
        assert_eq!(bars.len(), 2);

        assert_eq!(bars[0].time, 1000);
        assert_eq!(bars[0].cells.len(), 1);
        assert_eq!(bars[0].cells[0].amount, 5.0);
        assert_eq!(bars[0].trade(), Some((10.0, 2)));

        assert_eq!(bars[1].time, 1002);
        assert_eq!(bars[1].cells[0].amount, 7.0);
        assert!((bars[1].cells[1].low - 10.01).abs() < EPS);
        assert!((bars[1].cells[1].high - 10.02).abs() < EPS);
        assert_eq!(bars[1].cells[1].amount, -3.0);
        assert_eq!(bars[1].trade(), Some((10.01, 1)));
    }

    #[test]
    fn price_range_spans_visible_cells() {
        let mut history = History::default();
        history.import(vec![
            snap(1_000, vec![level(9.5, 1, Side::Bid)]),
            snap(2_000, vec![level(10.5, 1, Side::Ask), level(f64::NAN, 1, Side::Ask)]),
        ]);

        let (lo, hi) = price_range(history.bars()).unwrap();
        assert!((lo - 9.5).abs() < EPS);
        assert!((hi - 10.51).abs() < EPS);
    }

    #[test]
    fn cell_color_scales_opacity() {
        let config = Config::default();

        assert_eq!(config.cell_color(50.0).a, 0.5);
        assert_eq!(config.cell_color(-250.0).a, 1.0);
        assert_eq!(config.cell_color(-250.0).r, config.ask_color.r);
        assert_eq!(config.cell_color(1.0).g, config.bid_color.g);
    }

    fn arb_snapshot() -> impl Strategy<Value = RawSnapshot> {
        (
            0i64..20_000,
            prop::collection::vec((1u64..1_000, 0u64..20, any::<bool>()), 0..4),
            prop::option::of(1u64..50),
        )
            .prop_map(|(timestamp, levels, last_size)| RawSnapshot {
                timestamp,
                levels: Some(
                    levels
                        .into_iter()
                        .map(|(tick, quantity, is_bid)| PriceLevel {
                            price: tick as f64 * DEFAULT_TICK_SIZE,
                            quantity,
                            side: if is_bid { Side::Bid } else { Side::Ask },
                        })
                        .collect(),
                ),
                last_price: last_size.map(|_| 1.0),
                last_size,
                underlying_price: None,
            })
    }

    proptest! {
        #[test]
        fn bars_stay_strictly_ordered(
            historical in prop::collection::vec(arb_snapshot(), 0..30),
            live in prop::collection::vec(arb_snapshot(), 0..30),
        ) {
            let mut history = History::default();
            history.import(historical);
            assert_monotonic(&history);

            for update in &live {
                let before = history.clone();
                let outcome = history.apply_live(update);

                if let LiveOutcome::Stale { .. } = outcome {
                    prop_assert_eq!(&history, &before);
                }
                assert_monotonic(&history);
            }
        }
    }
}
