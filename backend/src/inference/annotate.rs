use super::Detection;
use image::{DynamicImage, Rgb, RgbImage};

const BORDER: u32 = 3;

const PALETTE: [Rgb<u8>; 4] = [
    Rgb([220, 60, 60]),
    Rgb([60, 160, 220]),
    Rgb([60, 200, 120]),
    Rgb([230, 180, 40]),
];

/// Burns detection boxes into a copy of the original scan. Boxes arrive in
/// model-input coordinates and are scaled back to the original resolution.
pub fn draw_boxes(image: &DynamicImage, detections: &[Detection], model_size: u32) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 || model_size == 0 {
        return canvas;
    }

    let scale_x = width as f32 / model_size as f32;
    let scale_y = height as f32 / model_size as f32;

    for detection in detections {
        let x1 = scale(detection.x1, scale_x, width);
        let y1 = scale(detection.y1, scale_y, height);
        let x2 = scale(detection.x2, scale_x, width);
        let y2 = scale(detection.y2, scale_y, height);
        let color = PALETTE[detection.class_id % PALETTE.len()];
        draw_rect(
            &mut canvas,
            x1.min(x2),
            y1.min(y2),
            x1.max(x2),
            y1.max(y2),
            color,
        );
    }

    canvas
}

fn scale(coordinate: f32, factor: f32, limit: u32) -> u32 {
    ((coordinate * factor).round().max(0.0) as u32).min(limit.saturating_sub(1))
}

fn draw_rect(canvas: &mut RgbImage, x1: u32, y1: u32, x2: u32, y2: u32, color: Rgb<u8>) {
    for t in 0..BORDER {
        for x in x1..=x2 {
            put(canvas, x, y1.saturating_add(t).min(y2), color);
            put(canvas, x, y2.saturating_sub(t).max(y1), color);
        }
        for y in y1..=y2 {
            put(canvas, x1.saturating_add(t).min(x2), y, color);
            put(canvas, x2.saturating_sub(t).max(x1), y, color);
        }
    }
}

fn put(canvas: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}
