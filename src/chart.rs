use crate::indicators;
use crate::yahoo::OhlcvData;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use plotters::prelude::*;
use std::io::Cursor;

const CHART_WIDTH: u32 = 1200;
const CHART_HEIGHT: u32 = 600;

#[derive(Debug)]
pub enum ChartError {
    Render(String),
    Encode(String),
}

fn render_err<E: std::fmt::Display>(error: E) -> ChartError {
    ChartError::Render(error.to_string())
}

/// Draws the close-price line plus the requested overlays into a fixed-size
/// raster and returns it as a base64-encoded PNG for inline embedding.
pub fn render_chart(
    series: &[OhlcvData],
    ticker: &str,
    sma_periods: &[usize],
    ema_periods: &[usize],
    include_bollinger: bool,
) -> Result<String, ChartError> {
    if series.len() < 2 {
        return Err(ChartError::Render(format!(
            "Need at least two rows to draw a line, got {}",
            series.len()
        )));
    }

    let closes: Vec<f64> = series.iter().map(|row| row.close).collect();
    let dates: Vec<String> = series
        .iter()
        .map(|row| row.time.format("%Y-%m-%d").to_string())
        .collect();

    // Derive every overlay up front so the y-axis can cover all of them.
    let sma_lines: Vec<(String, Vec<Option<f64>>)> = sma_periods
        .iter()
        .map(|&period| (format!("{}-Day SMA", period), indicators::sma(&closes, period)))
        .collect();

    let ema_lines: Vec<(String, Vec<Option<f64>>)> = ema_periods
        .iter()
        .map(|&period| {
            let values = indicators::ema(&closes, period).into_iter().map(Some).collect();
            (format!("{}-Day EMA", period), values)
        })
        .collect();

    let band_lines: Vec<(String, Vec<Option<f64>>)> = if include_bollinger {
        let (upper, lower) = indicators::bollinger(&closes);
        vec![
            ("Bollinger Upper".to_string(), upper),
            ("Bollinger Lower".to_string(), lower),
        ]
    } else {
        Vec::new()
    };

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &value in closes.iter().chain(
        sma_lines
            .iter()
            .chain(ema_lines.iter())
            .chain(band_lines.iter())
            .flat_map(|(_, values)| values.iter().flatten()),
    ) {
        y_min = y_min.min(value);
        y_max = y_max.max(value);
    }
    let pad = (y_max - y_min).max(1e-3) * 0.05;
    let y_range = (y_min - pad)..(y_max + pad);
    let x_range = 0f64..(series.len() - 1) as f64;

    let mut buffer = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} Stock Price with Moving Averages", ticker),
                ("sans-serif", 28),
            )
            .margin(12)
            .x_label_area_size(44)
            .y_label_area_size(64)
            .build_cartesian_2d(x_range, y_range)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Price (USD)")
            .x_labels(8)
            .x_label_formatter(&|x| {
                let idx = (x.round().max(0.0) as usize).min(dates.len() - 1);
                dates[idx].clone()
            })
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(
                closes.iter().enumerate().map(|(i, &close)| (i as f64, close)),
                BLUE.stroke_width(2),
            ))
            .map_err(render_err)?
            .label("Close Price")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], BLUE.stroke_width(2)));

        let overlays = sma_lines.iter().chain(ema_lines.iter()).chain(band_lines.iter());
        for (color_idx, (label, values)) in overlays.enumerate() {
            let color = Palette99::pick(color_idx + 1);
            let points: Vec<(f64, f64)> = values
                .iter()
                .enumerate()
                .filter_map(|(i, value)| value.map(|y| (i as f64, y)))
                .collect();

            chart
                .draw_series(LineSeries::new(points, color.stroke_width(1)))
                .map_err(render_err)?
                .label(label.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(1))
                });
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    let image = image::RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, buffer)
        .ok_or_else(|| ChartError::Encode("Pixel buffer size mismatch".to_string()))?;

    let mut png_bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| ChartError::Encode(e.to_string()))?;

    Ok(STANDARD.encode(&png_bytes))
}
