pub mod padding;
pub mod quantize;

pub use padding::{crop, padded_size, reflect_pad};
pub use quantize::to_rgb8;
