use image::RgbImage;
use ndarray::prelude::*;

use crate::options::ChannelOrder;

/// Clamps a normalized sample to `[0, 1]` and rescales it to 8 bits.
///
/// The fractional part is truncated, not rounded: `0.999` maps to `254`.
#[inline]
pub fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Converts a CHW float tensor in `order` to an RGB image. `None` unless the tensor has
/// exactly three channels.
pub fn to_rgb8(tensor: ArrayView3<f32>, order: ChannelOrder) -> Option<RgbImage> {
    let (channels, height, width) = tensor.dim();
    if channels != 3 {
        return None;
    }

    let tensor = match order {
        ChannelOrder::Rgb => tensor,
        ChannelOrder::Bgr => tensor.slice_move(s![..;-1, .., ..]),
    };
    let pixels = tensor
        .permuted_axes([1, 2, 0])
        .iter()
        .copied()
        .map(quantize)
        .collect();

    RgbImage::from_raw(width as u32, height as u32, pixels)
}
