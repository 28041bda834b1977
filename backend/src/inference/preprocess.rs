use image::imageops::FilterType;
use image::DynamicImage;
use tch::{Device, Tensor};

/// Resizes to the model's square input and packs the pixels channel-first,
/// scaled to [0, 1].
pub fn to_chw_tensor(image: &DynamicImage, size: u32, device: Device) -> Tensor {
    let resized = image
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();

    let mut data = Vec::with_capacity((3 * size * size) as usize);
    for channel in 0..3 {
        for pixel in resized.pixels() {
            data.push(pixel[channel] as f32 / 255.0);
        }
    }

    Tensor::from_slice(&data)
        .view([1, 3, size as i64, size as i64])
        .to_device(device)
}
