//! Media → bitmap coordinate helpers.
//!
//! Media coordinates are device independent; bitmap coordinates are whole
//! raster pixels after scaling by the pixel ratio.

/// A run of whole pixels along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub position: f32,
    pub length: f32,
}

impl Span {
    pub fn end(&self) -> f32 {
        self.position + self.length
    }

    /// Inset by `gap` bitmap pixels on both sides.
    pub fn shrink(self, gap: f32) -> Span {
        Span {
            position: self.position + gap,
            length: self.length - gap * 2.0,
        }
    }

    /// Like [`Span::shrink`], but never thinner than one pixel. A span the
    /// gap would swallow collapses to the pixel under its centre.
    pub fn inset(self, gap: f32) -> Span {
        let shrunk = self.shrink(gap);
        if shrunk.length >= 1.0 {
            return shrunk;
        }

        Span {
            position: (self.center() - 0.5).floor(),
            length: 1.0,
        }
    }

    pub fn center(&self) -> f32 {
        self.position + self.length / 2.0
    }
}

/// Full horizontal extent of a bar centred at `x_media`.
///
/// Both edges are rounded on their own before taking the difference, so the
/// right edge of one bar is always the left edge of the next.
pub fn full_bar_width(x_media: f32, half_bar_spacing_media: f32, pixel_ratio: f32) -> Span {
    let left = ((x_media - half_bar_spacing_media) * pixel_ratio).round();
    let right = ((x_media + half_bar_spacing_media) * pixel_ratio).round();

    Span {
        position: left,
        length: right - left,
    }
}

/// Box between two media positions, inclusive of the far boundary pixel.
pub fn positions_box(position1_media: f32, position2_media: f32, pixel_ratio: f32) -> Span {
    let scaled1 = (position1_media * pixel_ratio).round();
    let scaled2 = (position2_media * pixel_ratio).round();

    Span {
        position: scaled1.min(scaled2),
        length: (scaled2 - scaled1).abs() + 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_bars_share_edges() {
        let ratios = [1.0, 1.25, 1.5, 2.0, 2.75];
        let spacings = [1.0, 2.5, 3.0, 6.25];

        for ratio in ratios {
            for spacing in spacings {
                for i in 0..50 {
                    let x = 10.25 + i as f32 * spacing;
                    let this = full_bar_width(x, spacing / 2.0, ratio);
                    let next = full_bar_width(x + spacing, spacing / 2.0, ratio);

                    assert_eq!(
                        this.end(),
                        next.position,
                        "seam at ratio {ratio}, spacing {spacing}, bar {i}"
                    );
                }
            }
        }
    }

    #[test]
    fn box_is_order_independent_and_inclusive() {
        let down = positions_box(10.2, 20.6, 2.0);
        let up = positions_box(20.6, 10.2, 2.0);

        assert_eq!(down, up);
        assert_eq!(down.position, 20.0);
        assert_eq!(down.length, 22.0);
        assert_eq!(positions_box(5.0, 5.0, 1.0).length, 1.0);
    }

    #[test]
    fn shrink_insets_both_sides() {
        let span = Span {
            position: 10.0,
            length: 8.0,
        }
        .shrink(1.5);

        assert_eq!(span.position, 11.5);
        assert_eq!(span.length, 5.0);
    }

    #[test]
    fn inset_keeps_at_least_one_pixel() {
        let two = Span {
            position: 99.0,
            length: 2.0,
        };
        assert_eq!(
            two.inset(1.0),
            Span {
                position: 99.0,
                length: 1.0
            }
        );

        let one = Span {
            position: 40.0,
            length: 1.0,
        };
        assert_eq!(one.inset(2.0).length, 1.0);
        assert_eq!(one.inset(2.0).position, 40.0);

        let wide = Span {
            position: 10.0,
            length: 8.0,
        };
        assert_eq!(wide.inset(1.5), wide.shrink(1.5));
    }
}
