use data::chart::heatmap::{Config, price_range};
use data::chart::{Bar, Interaction, PriceBand, ViewPort, ViewWindow};
use iced::widget::canvas::{self, Cache, Frame, Geometry, Path};
use iced::{Alignment, Color, Element, Fill, Point, Rectangle, Renderer, Size, Theme, Vector};
use iced_core::mouse;

use crate::style;

use dimensions::Span;
use render::{Align, HeatmapRenderer, Label, PixelRatio, Surface, VisibleRange};

mod dimensions;
mod render;

/// Space kept right of the newest bar for the depth labels.
const LABEL_MARGIN: f32 = 110.0;

const DEFAULT_BAR_SPACING: f32 = 6.0;
const MIN_BAR_SPACING: f32 = 0.5;
const MAX_BAR_SPACING: f32 = 60.0;

/// Fraction of the plot height left empty above and below auto-fitted data.
const AUTO_FIT_MARGIN: f64 = 0.2;

const WHEEL_LINE_STEP: f32 = 0.1;
const WHEEL_PIXEL_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy)]
pub enum Message {
    Scrolled {
        amount: f32,
        cursor: Point,
        bounds: Size,
    },
    Dragged {
        delta: Vector,
        bounds: Size,
    },
    ResetPriceScale,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Spacing {
    Fixed(f32),
    /// Spread the bars whose time falls in `from..=to` over the plot width.
    Fit { from: i64, to: i64 },
}

#[derive(Debug, Default)]
pub struct PointerState {
    drag_from: Option<Point>,
    previous_click: Option<mouse::Click>,
}

/// Canvas host for the depth heatmap.
///
/// Owns the time and price axes; everything it shows is pushed in through
/// [`ViewPort`].
pub struct HeatmapChart {
    renderer: HeatmapRenderer,
    pixel_ratio: PixelRatio,
    window: ViewWindow,
    interaction: Interaction,
    /// Price window set by the user's own drag or wheel gestures.
    price_override: Option<PriceBand>,
    spacing: Spacing,
    /// Bars between the newest bar and the right edge of the plot.
    right_offset: f32,
    cache: Cache,
}

impl HeatmapChart {
    pub fn new(options: Config, pixel_ratio: f32) -> Self {
        Self {
            renderer: HeatmapRenderer::new(options),
            pixel_ratio: PixelRatio::uniform(pixel_ratio),
            window: ViewWindow::AutoFit,
            interaction: Interaction::from(data::chart::Mode::default()),
            price_override: None,
            spacing: Spacing::Fixed(DEFAULT_BAR_SPACING),
            right_offset: 0.0,
            cache: Cache::new(),
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        iced::widget::canvas(self).width(Fill).height(Fill).into()
    }

    pub fn update(&mut self, message: Message) {
        match message {
            Message::Scrolled {
                amount,
                cursor,
                bounds,
            } => {
                if !self.interaction.wheel_zoom {
                    return;
                }
                self.zoom_price(amount, cursor.y, bounds);
            }
            Message::Dragged { delta, bounds } => {
                self.pan_time(delta.x, bounds);

                if self.interaction.price_drag && delta.y != 0.0 {
                    self.pan_price(delta.y, bounds);
                }
            }
            Message::ResetPriceScale => {
                if !self.interaction.double_click_reset {
                    return;
                }
                self.price_override = None;
            }
        }

        self.cache.clear();
    }

    fn bars(&self) -> &[Bar] {
        self.renderer.bars()
    }

    fn bar_spacing(&self, plot_width: f32) -> f32 {
        match self.spacing {
            Spacing::Fixed(spacing) => spacing,
            Spacing::Fit { from, to } => {
                let count = self
                    .bars()
                    .iter()
                    .filter(|bar| (from..=to).contains(&bar.time))
                    .count()
                    .max(1);

                (plot_width / count as f32).clamp(MIN_BAR_SPACING, MAX_BAR_SPACING)
            }
        }
    }

    fn visible_range(&self, bounds: Size) -> Option<VisibleRange> {
        let len = self.bars().len();
        if len == 0 {
            return None;
        }

        let plot_width = (bounds.width - LABEL_MARGIN).max(1.0);
        let bar_spacing = self.bar_spacing(plot_width);

        let offset = (self.right_offset.round() as usize).min(len - 1);
        let last = len - 1 - offset;
        let capacity = (plot_width / bar_spacing).ceil() as usize + 1;
        let first = (last + 1).saturating_sub(capacity);

        let last_x = plot_width - bar_spacing / 2.0;

        Some(VisibleRange {
            bars: first..last + 1,
            first_x: last_x - (last - first) as f32 * bar_spacing,
            bar_spacing,
            ratio: self.pixel_ratio,
        })
    }

    fn price_band(&self, visible: &VisibleRange) -> Option<PriceBand> {
        if let Some(band) = self.price_override {
            return Some(band);
        }

        match self.window {
            ViewWindow::Fixed(band) => Some(band),
            ViewWindow::AutoFit => {
                let (low, high) = price_range(&self.bars()[visible.bars.clone()])?;

                let data_span = high - low;
                let pad = if data_span > 0.0 {
                    data_span * AUTO_FIT_MARGIN / (1.0 - 2.0 * AUTO_FIT_MARGIN)
                } else {
                    self.renderer.options().tick_size
                };

                Some(PriceBand {
                    min_value: low - pad,
                    max_value: high + pad,
                })
            }
        }
    }

    fn current_band(&self, bounds: Size) -> Option<PriceBand> {
        self.visible_range(bounds)
            .and_then(|visible| self.price_band(&visible))
    }

    fn zoom_price(&mut self, amount: f32, cursor_y: f32, bounds: Size) {
        let Some(band) = self.current_band(bounds) else {
            return;
        };
        if bounds.height <= 0.0 {
            return;
        }

        let factor = f64::from((1.0 - amount).clamp(0.2, 5.0));
        let anchor = band.max_value - f64::from(cursor_y / bounds.height) * band.span();

        self.price_override = Some(PriceBand {
            min_value: anchor - (anchor - band.min_value) * factor,
            max_value: anchor + (band.max_value - anchor) * factor,
        });
    }

    fn pan_price(&mut self, dy: f32, bounds: Size) {
        let Some(band) = self.current_band(bounds) else {
            return;
        };
        if bounds.height <= 0.0 {
            return;
        }

        let shift = f64::from(dy / bounds.height) * band.span();

        self.price_override = Some(PriceBand {
            min_value: band.min_value + shift,
            max_value: band.max_value + shift,
        });
    }

    fn pan_time(&mut self, dx: f32, bounds: Size) {
        let plot_width = (bounds.width - LABEL_MARGIN).max(1.0);
        let spacing = self.bar_spacing(plot_width);
        let max_offset = self.bars().len().saturating_sub(1) as f32;

        self.right_offset = (self.right_offset + dx / spacing).clamp(0.0, max_offset);
    }
}

impl ViewPort for HeatmapChart {
    fn set_bars(&mut self, bars: &[Bar]) {
        let options = *self.renderer.options();
        self.renderer.update(bars, options);

        if bars.is_empty() {
            self.right_offset = 0.0;
            self.spacing = Spacing::Fixed(DEFAULT_BAR_SPACING);
        }
        self.cache.clear();
    }

    fn set_window(&mut self, window: ViewWindow) {
        self.window = window;
        self.price_override = None;
        self.cache.clear();
    }

    fn set_interaction(&mut self, interaction: Interaction) {
        self.interaction = interaction;
    }

    fn scroll_to_realtime(&mut self) {
        self.right_offset = 0.0;
        self.cache.clear();
    }

    fn set_visible_range(&mut self, from: i64, to: i64) {
        self.spacing = Spacing::Fit { from, to };
        self.cache.clear();
    }
}

impl canvas::Program<Message> for HeatmapChart {
    type State = PointerState;

    fn update(
        &self,
        state: &mut Self::State,
        event: &iced::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        match event {
            iced::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let position = cursor.position_in(bounds)?;

                if let Some(global) = cursor.position() {
                    let click = mouse::Click::new(global, mouse::Button::Left, state.previous_click);
                    let is_double = click.kind() == mouse::click::Kind::Double;

                    state.previous_click = Some(click);

                    if is_double {
                        state.drag_from = None;
                        return Some(
                            canvas::Action::publish(Message::ResetPriceScale).and_capture(),
                        );
                    }
                }

                state.drag_from = Some(position);
                Some(canvas::Action::capture())
            }
            iced::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                state.drag_from = None;
                None
            }
            iced::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                let from = state.drag_from.as_mut()?;
                let position = cursor.position_in(bounds)?;

                let delta = position - *from;
                *from = position;

                Some(
                    canvas::Action::publish(Message::Dragged {
                        delta,
                        bounds: bounds.size(),
                    })
                    .and_capture(),
                )
            }
            iced::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let position = cursor.position_in(bounds)?;
                let amount = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => *y * WHEEL_LINE_STEP,
                    mouse::ScrollDelta::Pixels { y, .. } => *y * WHEEL_PIXEL_STEP,
                };

                Some(
                    canvas::Action::publish(Message::Scrolled {
                        amount,
                        cursor: position,
                        bounds: bounds.size(),
                    })
                    .and_capture(),
                )
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let Some(visible) = self.visible_range(bounds.size()) else {
            return vec![];
        };
        let Some(band) = self.price_band(&visible) else {
            return vec![];
        };
        if !(band.span() > 0.0) || bounds.height <= 0.0 {
            return vec![];
        }

        let background = theme.extended_palette().background.weakest.color;

        let heatmap = self.cache.draw(renderer, bounds.size(), |frame| {
            frame.fill_rectangle(Point::ORIGIN, bounds.size(), background);

            let height = f64::from(bounds.height);
            let price_to_pixel =
                |price: f64| ((band.max_value - price) / band.span() * height) as f32;

            let mut surface = FrameSurface {
                frame,
                ratio: self.pixel_ratio,
            };
            self.renderer.draw(&mut surface, &visible, price_to_pixel);
        });

        vec![heatmap]
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.drag_from.is_some() {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

/// Paints bitmap coordinates onto an iced frame, which works in logical units.
struct FrameSurface<'a> {
    frame: &'a mut Frame,
    ratio: PixelRatio,
}

impl FrameSurface<'_> {
    fn point(&self, x: f32, y: f32) -> Point {
        Point::new(x / self.ratio.horizontal, y / self.ratio.vertical)
    }
}

impl Surface for FrameSurface<'_> {
    fn fill_rect(&mut self, x: Span, y: Span, color: Color) {
        let top_left = self.point(x.position, y.position);
        let size = Size::new(
            x.length / self.ratio.horizontal,
            y.length / self.ratio.vertical,
        );

        self.frame.fill_rectangle(top_left, size, color);
    }

    fn fill_circle(&mut self, center_x: f32, center_y: f32, radius: f32, color: Color) {
        let circle = Path::circle(
            self.point(center_x, center_y),
            radius / self.ratio.horizontal,
        );

        self.frame.fill(&circle, color);
    }

    fn fill_text(&mut self, label: Label) {
        let align_x = match label.align {
            Align::Left => Alignment::Start,
            Align::Center => Alignment::Center,
        };

        self.frame.fill_text(canvas::Text {
            position: self.point(label.x, label.y),
            size: (label.size / self.ratio.vertical).into(),
            color: label.color,
            font: if label.bold {
                style::MONO_BOLD
            } else {
                style::MONO
            },
            align_x: align_x.into(),
            align_y: Alignment::Center.into(),
            content: label.content,
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::chart::Cell;

    fn bar(time: i64, low: f64) -> Bar {
        Bar {
            time,
            cells: vec![Cell {
                low,
                high: low + 0.01,
                amount: 10.0,
            }],
            last_price: None,
            last_size: None,
        }
    }

    fn chart_with(bars: &[Bar]) -> HeatmapChart {
        let mut chart = HeatmapChart::new(Config::default(), 1.0);
        chart.set_bars(bars);
        chart
    }

    const BOUNDS: Size = Size {
        width: 710.0,
        height: 400.0,
    };

    #[test]
    fn newest_bar_sits_left_of_label_margin() {
        let bars: Vec<Bar> = (0..10).map(|t| bar(t, 10.0)).collect();
        let chart = chart_with(&bars);

        let visible = chart.visible_range(BOUNDS).unwrap();

        assert_eq!(visible.bars, 0..10);
        let last_center = visible.first_x + 9.0 * visible.bar_spacing;
        assert_eq!(last_center, 600.0 - DEFAULT_BAR_SPACING / 2.0);
    }

    #[test]
    fn visible_range_fits_bars_to_plot_width() {
        let bars: Vec<Bar> = (100..110).map(|t| bar(t, 10.0)).collect();
        let mut chart = chart_with(&bars);

        chart.set_visible_range(105, 109);

        let visible = chart.visible_range(BOUNDS).unwrap();
        assert_eq!(visible.bar_spacing, 120.0);
        assert_eq!(visible.bars, 4..10);
    }

    #[test]
    fn drag_scrolls_back_until_realtime_is_requested() {
        let bars: Vec<Bar> = (0..200).map(|t| bar(t, 10.0)).collect();
        let mut chart = chart_with(&bars);

        chart.update(Message::Dragged {
            delta: Vector::new(60.0, 0.0),
            bounds: BOUNDS,
        });
        assert_eq!(chart.visible_range(BOUNDS).unwrap().bars.end, 190);

        chart.scroll_to_realtime();
        assert_eq!(chart.visible_range(BOUNDS).unwrap().bars.end, 200);
    }

    #[test]
    fn auto_fit_leaves_margins() {
        let chart = chart_with(&[bar(1, 10.0), bar(2, 10.59)]);

        let visible = chart.visible_range(BOUNDS).unwrap();
        let band = chart.price_band(&visible).unwrap();

        // data 10.00..10.60 occupies the middle 60%
        assert!((band.min_value - 9.8).abs() < 1e-9);
        assert!((band.max_value - 10.8).abs() < 1e-9);
    }

    #[test]
    fn fixed_window_wins_over_data() {
        let mut chart = chart_with(&[bar(1, 10.0)]);
        let band = PriceBand::around(50.0);

        chart.set_window(ViewWindow::Fixed(band));

        let visible = chart.visible_range(BOUNDS).unwrap();
        assert_eq!(chart.price_band(&visible), Some(band));
    }

    #[test]
    fn price_gestures_follow_interaction_flags() {
        let mut chart = chart_with(&[bar(1, 10.0)]);
        let band = PriceBand {
            min_value: 10.0,
            max_value: 20.0,
        };
        chart.set_window(ViewWindow::Fixed(band));

        chart.set_interaction(Interaction::from(data::chart::Mode::Auto));
        chart.update(Message::Dragged {
            delta: Vector::new(0.0, 40.0),
            bounds: BOUNDS,
        });
        assert_eq!(chart.current_band(BOUNDS), Some(band));

        chart.set_interaction(Interaction::from(data::chart::Mode::Manual));
        chart.update(Message::Dragged {
            delta: Vector::new(0.0, 40.0),
            bounds: BOUNDS,
        });
        let moved = chart.current_band(BOUNDS).unwrap();
        assert!((moved.min_value - 11.0).abs() < 1e-6);
        assert!((moved.max_value - 21.0).abs() < 1e-6);

        chart.update(Message::ResetPriceScale);
        assert_eq!(chart.current_band(BOUNDS), Some(band));
    }

    #[test]
    fn wheel_zooms_price_around_cursor_in_manual() {
        let mut chart = chart_with(&[bar(1, 10.0)]);
        chart.set_window(ViewWindow::Fixed(PriceBand {
            min_value: 10.0,
            max_value: 20.0,
        }));
        chart.set_interaction(Interaction::from(data::chart::Mode::Manual));

        chart.update(Message::Scrolled {
            amount: 0.5,
            cursor: Point::new(10.0, 200.0),
            bounds: BOUNDS,
        });

        let zoomed = chart.current_band(BOUNDS).unwrap();
        assert!((zoomed.min_value - 12.5).abs() < 1e-9);
        assert!((zoomed.max_value - 17.5).abs() < 1e-9);
    }

    #[test]
    fn wheel_is_ignored_in_auto() {
        let mut chart = chart_with(&[bar(1, 10.0)]);
        let before = chart.current_band(BOUNDS);

        chart.update(Message::Scrolled {
            amount: 1.0,
            cursor: Point::new(10.0, 200.0),
            bounds: BOUNDS,
        });

        assert_eq!(chart.spacing, Spacing::Fixed(DEFAULT_BAR_SPACING));
        assert_eq!(chart.price_override, None);
        assert_eq!(chart.current_band(BOUNDS), before);
    }

    #[test]
    fn empty_chart_has_nothing_to_draw() {
        let chart = chart_with(&[]);

        assert!(chart.visible_range(BOUNDS).is_none());
    }
}
