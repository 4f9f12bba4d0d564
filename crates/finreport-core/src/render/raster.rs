use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ReportError;
use crate::render::chart::{nice_axis, tick_label, BarGeometry, ChartImage, ChartRenderer, ChartSeries};
use crate::render::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::ReportResult;

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [0xFF, 0xFF, 0xFF];
pub const BLACK: Rgb = [0x00, 0x00, 0x00];
pub const BAR_FILL: Rgb = [0x76, 0xB9, 0x00];
pub const BAR_OUTLINE: Rgb = [0x5A, 0x8F, 0x00];
pub const GRID: Rgb = [0xDD, 0xDD, 0xDD];
pub const AXIS: Rgb = [0x33, 0x33, 0x33];

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Minimal RGB drawing surface. Coordinates are pixels from the top left;
/// anything outside the surface is clipped.
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&background);
        }
        Self { width, height, pixels }
    }

    pub fn set(&mut self, x: u32, y: u32, color: Rgb) {
        if x < self.width && y < self.height {
            let i = ((y * self.width + x) * 3) as usize;
            self.pixels[i..i + 3].copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        for yy in y..y.saturating_add(h) {
            for xx in x..x.saturating_add(w) {
                self.set(xx, yy, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        if w == 0 || h == 0 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    /// Draw `text` with its top-left corner at (x, y), each font pixel
    /// `scale` pixels square.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, scale: u32, color: Rgb) -> ReportResult<()> {
        let mut pen = x;
        for ch in text.chars() {
            let rows = glyphs::glyph(ch).ok_or_else(|| ReportError::UnsupportedGlyph {
                ch,
                context: format!("chart text \"{text}\""),
            })?;
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        self.fill_rect(pen + col * scale, y + row as u32 * scale, scale, scale, color);
                    }
                }
            }
            pen += GLYPH_ADVANCE * scale;
        }
        Ok(())
    }

    /// Draw `text` horizontally centred on `cx`.
    pub fn draw_text_centered(&mut self, cx: u32, y: u32, text: &str, scale: u32, color: Rgb) -> ReportResult<()> {
        let w = glyphs::text_width(text) * scale;
        self.draw_text(cx.saturating_sub(w / 2), y, text, scale, color)
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

// ---------------------------------------------------------------------------
// Bar chart backend
// ---------------------------------------------------------------------------

/// Vertical bar chart, one bar per category, value label above each bar.
#[derive(Debug, Clone)]
pub struct BarChartRenderer {
    pub width: u32,
    pub height: u32,
    pub plot_left: u32,
    pub plot_right: u32,
    pub plot_top: u32,
    pub plot_bottom: u32,
    /// Fraction of each category slot taken by its bar, in percent
    pub bar_fill_pct: u32,
    pub text_scale: u32,
    pub value_scale: u32,
}

impl Default for BarChartRenderer {
    /// 900x520 pixels, shown at 450x260 points.
    fn default() -> Self {
        Self {
            width: 900,
            height: 520,
            plot_left: 120,
            plot_right: 820,
            plot_top: 80,
            plot_bottom: 440,
            bar_fill_pct: 60,
            text_scale: 2,
            value_scale: 3,
        }
    }
}

impl BarChartRenderer {
    fn plot_height(&self) -> u32 {
        self.plot_bottom - self.plot_top
    }

    /// Bar height in pixels for `value` on an axis ending at `axis_max`.
    pub fn bar_height(&self, value: Decimal, axis_max: Decimal) -> u32 {
        if axis_max.is_zero() {
            return 0;
        }
        let plot = Decimal::from(self.plot_height());
        let px = value
            .checked_mul(plot)
            .map(|v| v / axis_max)
            .unwrap_or_else(|| value / axis_max * plot);
        px.round().to_u32().unwrap_or(0).min(self.plot_height())
    }
}

impl ChartRenderer for BarChartRenderer {
    fn render(&self, series: &ChartSeries) -> ReportResult<ChartImage> {
        let n = series.values.len() as u32;
        if n == 0 || series.labels.len() != series.values.len() || series.value_labels.len() != series.values.len() {
            return Err(ReportError::invalid(
                format!("charts.{}", series.metric),
                "Series labels and values must be non-empty and aligned",
            ));
        }

        let max = series.values.iter().copied().max().unwrap_or_default();
        let (axis_max, step) = nice_axis(max).ok_or_else(|| {
            ReportError::invalid(
                format!("charts.{}", series.metric),
                format!("No representable value axis for a maximum of {max}"),
            )
        })?;
        let mut canvas = Canvas::new(self.width, self.height, WHITE);

        // Title
        let title_w = glyphs::text_width(&series.title) * self.text_scale;
        if title_w > self.width {
            return Err(ReportError::overflow(
                format!("chart {}", series.metric),
                "Title wider than the chart image",
            ));
        }
        canvas.draw_text_centered(self.width / 2, 24, &series.title, self.text_scale, BLACK)?;

        // Gridlines and value-axis labels
        let glyph_h = GLYPH_HEIGHT * self.text_scale;
        let mut tick = Decimal::ZERO;
        while tick <= axis_max {
            let y = self.plot_bottom - self.bar_height(tick, axis_max);
            canvas.fill_rect(self.plot_left, y, self.plot_right - self.plot_left, 1, GRID);
            let label = tick_label(tick, step);
            let w = glyphs::text_width(&label) * self.text_scale;
            canvas.draw_text(
                self.plot_left.saturating_sub(w + 10),
                y.saturating_sub(glyph_h / 2),
                &label,
                self.text_scale,
                AXIS,
            )?;
            tick = match tick.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        // Bars
        let slot = (self.plot_right - self.plot_left) / n;
        let bar_w = slot * self.bar_fill_pct / 100;
        let mut bars = Vec::with_capacity(n as usize);
        for (i, ((label, value), value_label)) in series
            .labels
            .iter()
            .zip(&series.values)
            .zip(&series.value_labels)
            .enumerate()
        {
            let slot_x = self.plot_left + slot * i as u32;
            let x = slot_x + (slot - bar_w) / 2;
            let h = self.bar_height(*value, axis_max);
            let top = self.plot_bottom - h;
            canvas.fill_rect(x, top, bar_w, h, BAR_FILL);
            canvas.stroke_rect(x, top, bar_w, h, BAR_OUTLINE);

            let label_w = glyphs::text_width(label) * self.text_scale;
            if label_w > slot {
                return Err(ReportError::overflow(
                    format!("chart {}", series.metric),
                    format!("Category label '{label}' wider than its slot"),
                ));
            }
            let cx = x + bar_w / 2;
            canvas.draw_text_centered(cx, self.plot_bottom + 12, label, self.text_scale, BLACK)?;
            let value_h = GLYPH_HEIGHT * self.value_scale;
            canvas.draw_text_centered(
                cx,
                top.saturating_sub(value_h + 8),
                value_label,
                self.value_scale,
                BLACK,
            )?;

            bars.push(BarGeometry {
                label: label.clone(),
                value: *value,
                x,
                width: bar_w,
                top,
                height: h,
            });
        }

        // Axes drawn last so bars never cover them
        canvas.fill_rect(self.plot_left, self.plot_bottom, self.plot_right - self.plot_left, 2, AXIS);
        canvas.fill_rect(self.plot_left - 2, self.plot_top, 2, self.plot_height() + 2, AXIS);

        Ok(ChartImage {
            width: self.width,
            height: self.height,
            pixels: canvas.into_pixels(),
            axis_max,
            axis_step: step,
            bars,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn revenue_series() -> ChartSeries {
        ChartSeries {
            metric: "revenue".into(),
            title: "Acme Corp Quarterly Revenue ($M) - FY 2024".into(),
            labels: vec!["Q1 2024".into(), "Q2 2024".into(), "Q3 2024".into(), "Q4 2024".into()],
            values: vec![dec!(2450), dec!(2610), dec!(2847), dec!(3105)],
            value_labels: vec!["2,450".into(), "2,610".into(), "2,847".into(), "3,105".into()],
        }
    }

    #[test]
    fn test_image_dimensions_and_buffer() {
        let img = BarChartRenderer::default().render(&revenue_series()).unwrap();
        assert_eq!((img.width, img.height), (900, 520));
        assert_eq!(img.pixels.len(), 900 * 520 * 3);
        assert_eq!(img.axis_max, dec!(3500));
        assert_eq!(img.axis_step, dec!(500));
    }

    #[test]
    fn test_bar_heights_proportional_to_values() {
        let r = BarChartRenderer::default();
        let img = r.render(&revenue_series()).unwrap();
        // 360 px plot: 2,847 / 3,500 * 360 = 292.8 -> 293
        assert_eq!(img.bars[2].height, 293);
        for bar in &img.bars {
            let exact = bar.value * dec!(360) / dec!(3500);
            assert!((Decimal::from(bar.height) - exact).abs() <= dec!(0.5));
        }
        let heights: Vec<u32> = img.bars.iter().map(|b| b.height).collect();
        assert!(heights.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bar_pixels_drawn_where_reported() {
        let img = BarChartRenderer::default().render(&revenue_series()).unwrap();
        for bar in &img.bars {
            let cx = bar.x + bar.width / 2;
            // Count fill-coloured pixels in the bar's centre column
            let filled = (0..img.height)
                .filter(|&y| img.pixel(cx, y) == Some(BAR_FILL))
                .count() as u32;
            // Outline takes the top and bottom rows
            assert!(filled + 2 >= bar.height && filled <= bar.height, "bar {} filled {filled}", bar.label);
            assert_eq!(img.pixel(cx, bar.top), Some(BAR_OUTLINE));
        }
    }

    #[test]
    fn test_value_labels_spell_the_table_literals() {
        let r = BarChartRenderer::default();
        let series = revenue_series();
        let img = r.render(&series).unwrap();
        for (bar, literal) in img.bars.iter().zip(&series.value_labels) {
            let w = glyphs::text_width(literal) * r.value_scale;
            let h = GLYPH_HEIGHT * r.value_scale;
            let mut reference = Canvas::new(w, h, WHITE);
            reference.draw_text(0, 0, literal, r.value_scale, BLACK).unwrap();
            let reference = reference.into_pixels();

            let x0 = (bar.x + bar.width / 2) - w / 2;
            let y0 = bar.top - h - 8;
            for dy in 0..h {
                for dx in 0..w {
                    let i = ((dy * w + dx) * 3) as usize;
                    let expected_ink = reference[i..i + 3] == BLACK;
                    let actual_ink = img.pixel(x0 + dx, y0 + dy) == Some(BLACK);
                    assert_eq!(
                        actual_ink, expected_ink,
                        "label {literal} differs at ({dx}, {dy}) above {}",
                        bar.label
                    );
                }
            }
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let r = BarChartRenderer::default();
        assert_eq!(r.render(&revenue_series()).unwrap(), r.render(&revenue_series()).unwrap());
        assert_eq!(
            r.render(&revenue_series()).unwrap().pixels,
            r.render(&revenue_series()).unwrap().pixels
        );
    }

    #[test]
    fn test_unsupported_title_glyph() {
        let mut series = revenue_series();
        series.title = "Revenue \u{20AC}M".into();
        assert!(matches!(
            BarChartRenderer::default().render(&series),
            Err(ReportError::UnsupportedGlyph { ch: '\u{20AC}', .. })
        ));
    }

    #[test]
    fn test_titles_with_any_printable_ascii() {
        let printable: Vec<char> = (' '..='~').collect();
        for chunk in printable.chunks(40) {
            let mut series = revenue_series();
            series.title = chunk.iter().collect();
            assert!(
                BarChartRenderer::default().render(&series).is_ok(),
                "title {:?} failed",
                series.title
            );
        }
        let mut series = revenue_series();
        series.title = "O'Neil Corp + Moody's #1 @ 50% \u{2022} Q&A".into();
        assert!(BarChartRenderer::default().render(&series).is_ok());
    }

    #[test]
    fn test_misaligned_series_rejected() {
        let mut series = revenue_series();
        series.labels.pop();
        assert!(BarChartRenderer::default().render(&series).is_err());
    }

    #[test]
    fn test_too_many_categories_overflow() {
        let mut series = revenue_series();
        for i in 0..40 {
            series.labels.push(format!("Q1 {}", 2030 + i));
            series.values.push(dec!(100));
            series.value_labels.push("100".into());
        }
        assert!(matches!(
            BarChartRenderer::default().render(&series),
            Err(ReportError::LayoutOverflow { .. })
        ));
    }
}
