use anyhow::{Context, Result};
use image::{imageops, DynamicImage, RgbaImage};
use log::debug;
use std::time::Instant;

use crate::config::DashboardConfig;
use crate::renderer::colours::Colours;
use crate::renderer::fonts::Fonts;
use crate::renderer::{drawing, widgets};
use crate::scene::SceneContext;
use crate::store::StoreState;

// Create a dashboard image: the scene on the left, the info panel and
// telemetry readouts on the right
pub fn create_image(config: &DashboardConfig, scene: &SceneContext, state: &StoreState, fonts: &Fonts) -> DynamicImage {
    let start = Instant::now();
    let colours = Colours::default();

    let viewport = scene.viewport();
    let scene_width = viewport.width.max(1);
    let height = viewport.height.max(1);
    let width = scene_width + config.panel_width;

    let mut image = RgbaImage::from_pixel(width, height, colours.panel);

    // LEFT - the site as the camera sees it, clipped to its own area
    let mut scene_image = RgbaImage::from_pixel(scene_width, height, colours.background);
    let mut scene_ctx = widgets::RenderContext {
        image: &mut scene_image,
        fonts,
        colours: &colours,
        x: 0,
        y: 0,
        width: scene_width,
    };
    widgets::render_scene(&mut scene_ctx, scene);
    imageops::replace(&mut image, &scene_image, 0, 0);

    if config.panel_width > 0 {
        drawing::vertical_line(&mut image, scene_width, 0, height);

        // RIGHT - selection, live values, history
        let mut panel_ctx = widgets::RenderContext {
            image: &mut image,
            fonts,
            colours: &colours,
            x: scene_width,
            y: 6,
            width: config.panel_width,
        };
        let y_live = widgets::render_info_panel(&mut panel_ctx, scene.panel());

        panel_ctx.y = y_live;
        let y_history = widgets::render_snapshot(&mut panel_ctx, &state.snapshot);

        panel_ctx.y = y_history;
        widgets::render_history(&mut panel_ctx, &state.history);

        panel_ctx.y = height.saturating_sub(24);
        widgets::render_footer(&mut panel_ctx, state.version, scene.frames());
    }

    debug!("Dashboard render took: {} ms", start.elapsed().as_millis());
    DynamicImage::ImageRgba8(image)
}

pub fn save_image(config: &DashboardConfig, image: &DynamicImage) -> Result<()> {
    let target_file = &config.file;

    image
        .save(target_file)
        .with_context(|| format!("Failed to save dashboard to {}", target_file))
}
