//! Cumulative histogram animation
//!
//! Every frame is drawn on a fixed canvas: the x axis spans the board and
//! the y axis is capped at the largest bin count of the whole run, so the
//! scale never jumps during playback.

use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::error::{Error, Result};
use crate::series::FrameSeries;
use crate::settings::AnimationSettings;

use super::bins::BinEdges;
use super::encoder::FrameSink;

/// Bar fill colour
pub const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

/// At most this many labelled count levels
const MAX_GRID_LINES: usize = 10;

/// Tick label face, embedded so no system font lookup happens
static LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

fn render_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Register the embedded face as plotters' `sans-serif` family once
fn register_label_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| {
        plotters::style::register_font("sans-serif", FontStyle::Normal, LABEL_FONT).is_ok()
    });
    if ok {
        Ok(())
    } else {
        Err(Error::Render("embedded label font is invalid".to_string()))
    }
}

/// Pixel layout of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameLayout {
    pub margin: u32,
    pub font_px: u32,
    /// Height of the bin-index strip under the plot
    pub x_label_area: u32,
    /// Width of the count strip left of the plot
    pub y_label_area: u32,
}

/// Renders a frame series against fixed bins
#[derive(Debug, Clone)]
pub struct HistogramAnimator {
    edges: BinEdges,
    settings: AnimationSettings,
    ceiling: u32,
}

impl HistogramAnimator {
    /// Precomputes the y ceiling over every frame of `series`
    pub fn new(edges: BinEdges, settings: AnimationSettings, series: &FrameSeries) -> Result<Self> {
        settings.validate()?;
        register_label_font()?;
        let ceiling = edges.global_max(series);
        log::info!(
            "Histogram: {} bins over [{:.3}, {:.3}], y ceiling {}",
            edges.len(),
            edges.range().0,
            edges.range().1,
            ceiling
        );
        Ok(Self {
            edges,
            settings,
            ceiling,
        })
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Frame size in pixels
    pub fn frame_size(&self) -> (u32, u32) {
        self.settings.resolution.dimensions()
    }

    /// Bytes in one RGB24 frame
    pub fn frame_bytes(&self) -> usize {
        let (w, h) = self.frame_size();
        w as usize * h as usize * 3
    }

    pub(crate) fn layout(&self) -> FrameLayout {
        let (_, height) = self.frame_size();
        let font_px = self.settings.stroke(height / 36);
        FrameLayout {
            margin: height / 20,
            font_px,
            x_label_area: font_px * 2,
            y_label_area: font_px * 3,
        }
    }

    /// Draw one histogram into an RGB24 buffer of [`Self::frame_bytes`] bytes
    pub fn render_frame(&self, counts: &[u32], rgb: &mut [u8]) -> Result<()> {
        if rgb.len() != self.frame_bytes() {
            return Err(Error::Render(format!(
                "buffer has {} bytes, expected {}",
                rgb.len(),
                self.frame_bytes()
            )));
        }
        let (width, height) = self.frame_size();
        let (x_min, x_max) = self.edges.range();
        let top = self.ceiling;
        let layout = self.layout();

        let root = BitMapBackend::with_buffer(rgb, (width, height)).into_drawing_area();
        root.fill(&BLACK).map_err(render_err)?;

        // Integer y axis: count labels never land between whole balls
        let mut chart = ChartBuilder::on(&root)
            .margin(layout.margin)
            .x_label_area_size(layout.x_label_area)
            .y_label_area_size(layout.y_label_area)
            .build_cartesian_2d(x_min..x_max, 0u32..top)
            .map_err(render_err)?;

        let grid = ShapeStyle {
            color: WHITE.mix(0.35),
            filled: false,
            stroke_width: self.settings.stroke(1),
        };
        let label_style = ("sans-serif", layout.font_px, &WHITE);

        // Horizontal grid and count labels; bin labels are drawn below
        chart
            .configure_mesh()
            .disable_x_mesh()
            .max_light_lines(0)
            .bold_line_style(grid)
            .axis_style(WHITE.stroke_width(self.settings.stroke(2)))
            .x_labels(0)
            .y_labels(MAX_GRID_LINES + 1)
            .y_label_formatter(&|count| count.to_string())
            .label_style(label_style)
            .draw()
            .map_err(render_err)?;

        // Vertical lines on bin edges
        let verticals = (0..=self.edges.len()).map(|i| {
            let x = self.edges.edge(i);
            PathElement::new(vec![(x, 0), (x, top)], grid)
        });
        chart.draw_series(verticals).map_err(render_err)?;

        let bars = counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(i, &count)| {
                Rectangle::new(
                    [(self.edges.edge(i), 0), (self.edges.edge(i + 1), count)],
                    BAR_COLOR.filled(),
                )
            });
        chart.draw_series(bars).map_err(render_err)?;

        // Axes frame
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x_min, 0), (x_max, top)],
                WHITE.stroke_width(self.settings.stroke(2)),
            )))
            .map_err(render_err)?;

        // Bin index under each bin centre
        let anchored = label_style
            .into_text_style(&root)
            .pos(Pos::new(HPos::Center, VPos::Top));
        let pad = (layout.font_px / 3) as i32;
        for i in 0..self.edges.len() {
            let centre = (self.edges.edge(i) + self.edges.edge(i + 1)) / 2.0;
            let (px, py) = chart.backend_coord(&(centre, 0));
            root.draw(&Text::new(i.to_string(), (px, py + pad), anchored.clone()))
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
        Ok(())
    }

    /// Render every frame in order and hand it to `sink`. On failure the
    /// sink is aborted so no truncated output is left behind.
    pub fn animate(&self, series: &FrameSeries, sink: &mut dyn FrameSink) -> Result<usize> {
        match self.stream(series, sink) {
            Ok(total) => Ok(total),
            Err(e) => {
                log::error!("Animation failed: {e}");
                sink.abort();
                Err(e)
            }
        }
    }

    fn stream(&self, series: &FrameSeries, sink: &mut dyn FrameSink) -> Result<usize> {
        let mut rgb = vec![0u8; self.frame_bytes()];
        let total = series.len();
        let report_every = (total / 10).max(1);

        for (i, frame) in series.iter().enumerate() {
            let counts = self.edges.histogram(frame.xs());
            self.render_frame(&counts, &mut rgb)?;
            sink.write_frame(&rgb)?;
            if (i + 1) % report_every == 0 {
                log::info!("Rendered frame {}/{} (tick {})", i + 1, total, frame.tick);
            }
        }

        sink.finish()?;
        Ok(total)
    }
}
