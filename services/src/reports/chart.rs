//! Mood-over-time line chart rendered to PNG with `plotters`.
//!
//! Text is drawn with an embedded DejaVu Sans so the chart renders the same on hosts
//! without system fonts.

use chrono::{Duration, NaiveDate};
use image::{ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use std::io::Cursor;
use std::ops::Range;
use std::sync::OnceLock;

use crate::entries::form::{MOOD_MAX, MOOD_MIN};

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 600;
pub const CHART_TITLE: &str = "Mood Over Time";

const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const MARGIN: u32 = 20;
const X_LABEL_AREA: u32 = 60;
const Y_LABEL_AREA: u32 = 70;
const X_LABELS: usize = 8;
const MARKER_RADIUS: i32 = 4;

const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Failed to load chart font: {0}")]
    Font(String),
    #[error("Failed to draw chart: {0}")]
    Draw(String),
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

fn draw_error(e: impl std::fmt::Display) -> ChartError {
    ChartError::Draw(e.to_string())
}

fn ensure_font() -> Result<(), ChartError> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

    REGISTERED
        .get_or_init(|| {
            register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES)
                .map_err(|_| "InvalidFont".to_owned())
        })
        .clone()
        .map_err(ChartError::Font)
}

/// X range in days since `first`. A single day is centered.
fn day_range(first: NaiveDate, last: NaiveDate) -> Range<i64> {
    match (last - first).num_days() {
        0 => -1..1,
        span => 0..span,
    }
}

fn draw(buffer: &mut [u8], series: &[(NaiveDate, i32)]) -> Result<(), ChartError> {
    let root =
        BitMapBackend::with_buffer(buffer, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let first = series.iter().map(|(date, _)| *date).min();
    let last = series.iter().map(|(date, _)| *date).max();
    let (first, last) = match first.zip(last) {
        Some(bounds) => bounds,
        None => {
            let today = chrono::Utc::now().date_naive();
            (today, today)
        }
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(CHART_TITLE, (FONT_FAMILY, 28))
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(day_range(first, last), MOOD_MIN..MOOD_MAX)
        .map_err(draw_error)?;

    let date_label = |offset: &i64| {
        (first + Duration::days(*offset))
            .format("%Y-%m-%d")
            .to_string()
    };
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Mood Rating")
        .x_labels(X_LABELS)
        .y_labels((MOOD_MAX - MOOD_MIN + 1) as usize)
        .x_label_formatter(&date_label)
        .label_style((FONT_FAMILY, 14))
        .axis_desc_style((FONT_FAMILY, 18))
        .draw()
        .map_err(draw_error)?;

    let points: Vec<(i64, i32)> = series
        .iter()
        .map(|(date, rating)| {
            (
                (*date - first).num_days(),
                (*rating).clamp(MOOD_MIN, MOOD_MAX),
            )
        })
        .collect();

    chart
        .draw_series(LineSeries::new(points.iter().copied(), LINE_COLOR.stroke_width(2)))
        .map_err(draw_error)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|point| Circle::new(*point, MARKER_RADIUS, LINE_COLOR.filled())),
        )
        .map_err(draw_error)?;

    root.present().map_err(draw_error)
}

/// Render `(date, rating)` points, in the given order, as a PNG.
///
/// Points on the same day share an x position; nothing is aggregated.
pub fn render_mood_chart(series: &[(NaiveDate, i32)]) -> Result<Vec<u8>, ChartError> {
    ensure_font()?;

    let mut buffer = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    draw(&mut buffer, series)?;

    let canvas = ImageBuffer::<Rgb<u8>, _>::from_raw(CHART_WIDTH, CHART_HEIGHT, buffer)
        .ok_or_else(|| ChartError::Encode("pixel buffer has the wrong size".to_owned()))?;

    let mut cursor = Cursor::new(Vec::new());
    canvas
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ChartError::Encode(e.to_string()))?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    type Canvas = ImageBuffer<Rgb<u8>, Vec<u8>>;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn render(series: &[(NaiveDate, i32)]) -> Canvas {
        let bytes = render_mood_chart(series).unwrap();
        image::load_from_memory(&bytes).unwrap().to_rgb8()
    }

    fn has_ink(canvas: &Canvas, xs: Range<u32>, ys: Range<u32>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| *canvas.get_pixel(x, y) != Rgb([255, 255, 255]))
    }

    #[test]
    fn renders_png_with_expected_size() {
        let chart = render(&[(day("2024-01-01"), 3), (day("2024-01-10"), 8)]);
        assert_eq!(chart.dimensions(), (CHART_WIDTH, CHART_HEIGHT));
    }

    #[test]
    fn title_and_axis_labels_are_drawn() {
        let chart = render(&[(day("2024-01-01"), 3), (day("2024-01-10"), 8)]);

        // Caption band across the top.
        assert!(has_ink(&chart, 300..700, 0..MARGIN + 30));
        // Date ticks and the "Date" description under the plot.
        assert!(has_ink(
            &chart,
            Y_LABEL_AREA + MARGIN..CHART_WIDTH - MARGIN,
            CHART_HEIGHT - X_LABEL_AREA..CHART_HEIGHT - MARGIN / 2,
        ));
        // Rating ticks and the "Mood Rating" description left of the plot.
        assert!(has_ink(&chart, MARGIN / 2..MARGIN + Y_LABEL_AREA - 10, 100..500));
    }

    #[test]
    fn line_color_appears_in_plot() {
        let chart = render(&[(day("2024-03-01"), 5), (day("2024-03-05"), 9)]);
        assert!(chart.pixels().any(|pixel| *pixel == Rgb([31, 119, 180])));
    }

    #[test]
    fn single_day_is_centered() {
        assert_eq!(day_range(day("2024-03-01"), day("2024-03-01")), -1..1);
        assert_eq!(day_range(day("2024-03-01"), day("2024-03-31")), 0..30);
    }

    #[test]
    fn empty_series_still_renders() {
        let chart = render(&[]);
        assert!(has_ink(&chart, 300..700, 0..MARGIN + 30));
    }
}
