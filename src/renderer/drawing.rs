use crate::renderer::fonts::FontConfig;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;

pub fn horizonal_line(image: &mut RgbaImage, x: u32, y: u32, width: u32) {
    draw_line_segment_mut(
        image,
        (x as f32, y as f32),
        ((x + width) as f32, y as f32),
        Rgba([60, 60, 60, 255]),
    );
}

pub fn vertical_line(image: &mut RgbaImage, x: u32, y1: u32, y2: u32) {
    draw_line_segment_mut(
        image,
        (x as f32, y1 as f32),
        (x as f32, y2 as f32),
        Rgba([60, 60, 60, 255]),
    );
}

pub fn line(image: &mut RgbaImage, from: (f64, f64), to: (f64, f64), colour: Rgba<u8>) {
    draw_line_segment_mut(
        image,
        (from.0 as f32, from.1 as f32),
        (to.0 as f32, to.1 as f32),
        colour,
    );
}

pub fn polyline(image: &mut RgbaImage, points: &[(f64, f64)], closed: bool, colour: Rgba<u8>) {
    for pair in points.windows(2) {
        line(image, pair[0], pair[1], colour);
    }
    if closed && points.len() > 2 {
        line(image, points[points.len() - 1], points[0], colour);
    }
}

pub fn text(
    image: &mut RgbaImage,
    colour: Rgba<u8>,
    x: i32,
    y: i32,
    font_config: &Option<FontConfig>,
    text: &str,
) {
    if let Some(font_config) = font_config {
        draw_text_mut(
            image,
            colour,
            x,
            y,
            font_config.scale,
            &font_config.font,
            text,
        );
    }
}

pub fn frame_rect(image: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32) {
    if width == 0 || height == 0 {
        return;
    }
    draw_hollow_rect_mut(
        image,
        Rect::at(x, y).of_size(width, height),
        Rgba([100, 100, 100, 255]),
    );
}
