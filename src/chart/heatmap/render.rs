use std::ops::Range;

use data::chart::Bar;
use data::chart::heatmap::Config;
use iced::Color;

use super::dimensions::{Span, full_bar_width, positions_box};

const LABEL_TEXT_SIZE: f32 = 12.0;
const LABEL_PADDING: f32 = 4.0;
const BUBBLE_TEXT_SIZE: f32 = 11.0;
/// Advance of one glyph of the monospace font, relative to its size.
const MONO_ADVANCE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRatio {
    pub horizontal: f32,
    pub vertical: f32,
}

impl PixelRatio {
    pub fn uniform(ratio: f32) -> Self {
        Self {
            horizontal: ratio,
            vertical: ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Text placed in bitmap coordinates, vertically centred on `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Color,
    pub bold: bool,
    pub align: Align,
}

/// Raster target in bitmap coordinates.
pub trait Surface {
    fn fill_rect(&mut self, x: Span, y: Span, color: Color);

    fn fill_circle(&mut self, center_x: f32, center_y: f32, radius: f32, color: Color);

    fn fill_text(&mut self, label: Label);

    fn text_width(&self, content: &str, size: f32) -> f32 {
        content.chars().count() as f32 * size * MONO_ADVANCE
    }
}

/// Which bars are on screen and where.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRange {
    pub bars: Range<usize>,
    /// Media x of the centre of `bars.start`.
    pub first_x: f32,
    pub bar_spacing: f32,
    pub ratio: PixelRatio,
}

impl VisibleRange {
    fn center_of(&self, index: usize) -> f32 {
        self.first_x + (index - self.bars.start) as f32 * self.bar_spacing
    }
}

/// Draws depth cells, the edge labels and trade bubbles.
///
/// Holds only the last pushed bars and options so a resize can redraw
/// without new data.
#[derive(Debug, Default)]
pub struct HeatmapRenderer {
    bars: Vec<Bar>,
    options: Config,
}

impl HeatmapRenderer {
    pub fn new(options: Config) -> Self {
        Self {
            bars: Vec::new(),
            options,
        }
    }

    pub fn update(&mut self, bars: &[Bar], options: Config) {
        self.bars = bars.to_vec();
        self.options = options;
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn options(&self) -> &Config {
        &self.options
    }

    /// `price_to_pixel` maps a price to a media y coordinate.
    pub fn draw<S, F>(&self, target: &mut S, visible: &VisibleRange, price_to_pixel: F)
    where
        S: Surface,
        F: Fn(f64) -> f32,
    {
        let end = visible.bars.end.min(self.bars.len());
        if visible.bars.start >= end {
            return;
        }

        let ratio = visible.ratio;
        let gap_x = self.options.cell_border_width * ratio.horizontal;
        let gap_y = self.options.cell_border_width * ratio.vertical;
        let rightmost = end - 1;

        let mut last_size_drawn: Option<u64> = None;

        for index in visible.bars.start..end {
            let bar = &self.bars[index];

            let full_width = full_bar_width(
                visible.center_of(index),
                visible.bar_spacing / 2.0,
                ratio.horizontal,
            );
            let cell_x = full_width.inset(gap_x);

            for cell in bar.cells.iter().filter(|cell| cell.is_finite()) {
                let vertical = positions_box(
                    price_to_pixel(cell.low),
                    price_to_pixel(cell.high),
                    ratio.vertical,
                );
                let cell_y = vertical.inset(gap_y);

                target.fill_rect(cell_x, cell_y, self.options.cell_color(cell.amount));

                if index == rightmost {
                    self.draw_edge_label(target, full_width, vertical, cell.low, cell.amount, ratio);
                }
            }

            if let Some((price, size)) = bar.trade()
                && last_size_drawn != Some(size)
            {
                last_size_drawn = Some(size);

                let center_x = full_width.center();
                let center_y = price_to_pixel(price) * ratio.vertical;
                let radius = (size as f32).sqrt() * self.options.bubble_scale * ratio.horizontal;

                target.fill_circle(center_x, center_y, radius, self.options.bubble_color);
                target.fill_text(Label {
                    content: size.to_string(),
                    x: center_x,
                    y: center_y,
                    size: BUBBLE_TEXT_SIZE * ratio.vertical,
                    color: Color::BLACK,
                    bold: true,
                    align: Align::Center,
                });
            }
        }
    }

    fn draw_edge_label<S: Surface>(
        &self,
        target: &mut S,
        full_width: Span,
        vertical: Span,
        price: f64,
        amount: f64,
        ratio: PixelRatio,
    ) {
        let size = LABEL_TEXT_SIZE * ratio.vertical;
        let x = full_width.end() + LABEL_PADDING * ratio.horizontal;
        let y = vertical.center();

        let price_text = format!("{:.*}", self.options.price_precision, price);
        let amount_x = x + target.text_width(&price_text, size) + LABEL_PADDING * ratio.horizontal;

        target.fill_text(Label {
            content: price_text,
            x,
            y,
            size,
            color: Color::WHITE,
            bold: false,
            align: Align::Left,
        });

        let amount_color = if amount > 0.0 {
            self.options.bid_color
        } else {
            self.options.ask_color
        };

        target.fill_text(Label {
            content: format!(" {}", amount.abs()),
            x: amount_x,
            y,
            size,
            color: Color {
                a: 1.0,
                ..amount_color
            },
            bold: true,
            align: Align::Left,
        });
    }
}
