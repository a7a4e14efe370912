use chrono::Local;
use image::{Rgba, RgbaImage};
use indexmap::IndexMap;
use nalgebra::Point3;

use crate::models::{HistorySeries, InfoPanel, TelemetrySnapshot};
use crate::renderer::colours::Colours;
use crate::renderer::drawing;
use crate::renderer::fonts::Fonts;
use crate::scene::geometry::Aabb;
use crate::scene::SceneContext;

/// Projected points further out than this (in viewport widths) are dropped
/// instead of rasterised.
const CLIP_FACTOR: f64 = 4.0;
const GRID_STEP: f64 = 50.0;
const RING_SEGMENTS: usize = 48;
const CHART_HEIGHT: u32 = 56;

pub struct RenderContext<'a> {
    pub image: &'a mut RgbaImage,
    pub fonts: &'a Fonts,
    pub colours: &'a Colours,
    pub x: u32,
    pub y: u32,
    pub width: u32,
}

fn visible(scene: &SceneContext, point: &Point3<f64>) -> Option<(f64, f64)> {
    let viewport = scene.viewport();
    let limit = CLIP_FACTOR * f64::from(viewport.width.max(viewport.height));
    scene
        .screen_position(point)
        .filter(|(x, y)| x.abs() <= limit && y.abs() <= limit)
}

fn segment(ctx: &mut RenderContext, scene: &SceneContext, from: &Point3<f64>, to: &Point3<f64>, colour: Rgba<u8>) {
    if let (Some(a), Some(b)) = (visible(scene, from), visible(scene, to)) {
        drawing::line(ctx.image, a, b, colour);
    }
}

fn wireframe(ctx: &mut RenderContext, scene: &SceneContext, bounds: &Aabb, colour: Rgba<u8>) {
    let corners = bounds.corners();
    for (a, b) in Aabb::EDGES {
        segment(ctx, scene, &corners[a], &corners[b], colour);
    }
}

/// Ground grid, building wireframes and pulse rings as the camera sees them.
pub fn render_scene(ctx: &mut RenderContext, scene: &SceneContext) {
    let extent = scene.scene().ground_extent;
    let mut offset = -extent;
    while offset <= extent {
        let ground = ctx.colours.ground;
        segment(ctx, scene, &Point3::new(offset, 0.0, -extent), &Point3::new(offset, 0.0, extent), ground);
        segment(ctx, scene, &Point3::new(-extent, 0.0, offset), &Point3::new(extent, 0.0, offset), ground);
        offset += GRID_STEP;
    }

    for ring in &scene.scene().rings {
        let radius = ring.scaled_radius();
        let points: Vec<(f64, f64)> = (0..RING_SEGMENTS)
            .filter_map(|i| {
                let angle = i as f64 / RING_SEGMENTS as f64 * std::f64::consts::TAU;
                let point = Point3::new(
                    ring.center.x + radius * angle.cos(),
                    ring.center.y,
                    ring.center.z + radius * angle.sin(),
                );
                visible(scene, &point)
            })
            .collect();
        if points.len() == RING_SEGMENTS {
            drawing::polyline(ctx.image, &points, true, ctx.colours.ring);
        }
    }

    let hovered = scene.hovered().map(|object| object.name.as_str());
    let selected = scene.selected().map(|object| object.name.as_str());

    for object in &scene.scene().objects {
        let colour = if !object.is_interactive() {
            ctx.colours.office
        } else if Some(object.name.as_str()) == selected {
            ctx.colours.warehouse_selected
        } else if Some(object.name.as_str()) == hovered {
            ctx.colours.warehouse_hover
        } else {
            ctx.colours.warehouse
        };
        wireframe(ctx, scene, &object.bounds, colour);
    }
}

/// Returns the y position below the panel.
pub fn render_info_panel(ctx: &mut RenderContext, panel: &InfoPanel) -> u32 {
    let fc_title = ctx.fonts.title();
    let fc_regular = ctx.fonts.regular();
    let mut y_pos = ctx.y;

    drawing::text(ctx.image, ctx.colours.header, (ctx.x + 8) as i32, y_pos as i32, &fc_title, "WAREHOUSE");
    y_pos += 28;
    drawing::horizonal_line(ctx.image, ctx.x, y_pos, ctx.width);
    y_pos += 6;

    for (label, value) in panel.lines() {
        drawing::text(ctx.image, ctx.colours.label, (ctx.x + 8) as i32, y_pos as i32, &fc_regular, label);
        drawing::text(ctx.image, ctx.colours.text, (ctx.x + 110) as i32, y_pos as i32, &fc_regular, value);
        y_pos += 22;
    }

    y_pos + 6
}

/// Latest value of every numeric channel, in arrival order.
pub fn render_snapshot(ctx: &mut RenderContext, snapshot: &TelemetrySnapshot) -> u32 {
    let fc_title = ctx.fonts.title();
    let fc_small = ctx.fonts.small();
    let mut y_pos = ctx.y;

    drawing::horizonal_line(ctx.image, ctx.x, y_pos, ctx.width);
    y_pos += 4;
    drawing::text(ctx.image, ctx.colours.header, (ctx.x + 8) as i32, y_pos as i32, &fc_title, "LIVE");
    y_pos += 26;

    if snapshot.is_empty() {
        drawing::text(ctx.image, ctx.colours.label, (ctx.x + 8) as i32, y_pos as i32, &fc_small, "waiting for data");
        return y_pos + 20;
    }

    for (name, value) in snapshot.iter().take(6) {
        let line = format!("{}: {:.2}", name, value);
        drawing::text(ctx.image, ctx.colours.text, (ctx.x + 8) as i32, y_pos as i32, &fc_small, &line);
        y_pos += 17;
    }

    y_pos + 6
}

/// One framed line chart per tracked series, scaled to its own range.
pub fn render_history(ctx: &mut RenderContext, history: &IndexMap<String, HistorySeries>) -> u32 {
    let fc_small = ctx.fonts.small();
    let mut y_pos = ctx.y;
    let chart_width = ctx.width.saturating_sub(16);

    for (index, (name, series)) in history.iter().enumerate() {
        let colour = ctx.colours.series(index);
        let caption = match series.latest() {
            Some(sample) => format!("{} {:.2} @ {}", name, sample.value, sample.time),
            None => format!("{} --", name),
        };
        drawing::text(ctx.image, colour, (ctx.x + 8) as i32, y_pos as i32, &fc_small, &caption);
        y_pos += 17;

        drawing::frame_rect(ctx.image, (ctx.x + 8) as i32, y_pos as i32, chart_width, CHART_HEIGHT);
        let points = chart_points(series, ctx.x + 8, y_pos, chart_width, CHART_HEIGHT);
        drawing::polyline(ctx.image, &points, false, colour);
        y_pos += CHART_HEIGHT + 8;
    }

    y_pos
}

/// Series samples laid out left to right across the box, oldest first, with
/// the capacity as the full width.
fn chart_points(series: &HistorySeries, x: u32, y: u32, width: u32, height: u32) -> Vec<(f64, f64)> {
    let Some((min, max)) = series.range() else {
        return Vec::new();
    };
    let span = if max > min { max - min } else { 1.0 };
    let slots = series.capacity().max(2) - 1;
    let inner = f64::from(height.saturating_sub(4));

    series
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let px = f64::from(x) + i as f64 / slots as f64 * f64::from(width);
            let level = if max > min { (sample.value - min) / span } else { 0.5 };
            let py = f64::from(y) + 2.0 + (1.0 - level) * inner;
            (px, py)
        })
        .collect()
}

pub fn render_footer(ctx: &mut RenderContext, version: u64, frames: u64) {
    let fc_small = ctx.fonts.small();
    drawing::horizonal_line(ctx.image, ctx.x, ctx.y, ctx.width);

    let footer = format!("{}  v{}  f{}", Local::now().format("%H:%M:%S"), version, frames);
    drawing::text(ctx.image, ctx.colours.label, (ctx.x + 8) as i32, (ctx.y + 4) as i32, &fc_small, &footer);
}
