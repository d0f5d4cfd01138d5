use ndarray::prelude::*;

/// Smallest multiple of `factor` that is not below `size`.
pub const fn padded_size(size: usize, factor: usize) -> usize {
    if factor <= 1 {
        return size;
    }
    size.div_ceil(factor) * factor
}

/// Maps an index past the end of an axis of length `len` back into it by mirroring
/// around the last element, which itself is not repeated (`torch.nn.functional.pad`
/// "reflect" semantics). Indices further out than one reflection keep bouncing.
pub const fn reflect_index(index: usize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let index = index % period;
    if index < len {
        index
    } else {
        period - index
    }
}

/// Reflect-pads the bottom and right edges of an NCHW tensor up to a multiple of
/// `factor`. Returns the padded tensor together with the original `(height, width)`.
pub fn reflect_pad(tensor: ArrayView4<f32>, factor: usize) -> (Array4<f32>, (usize, usize)) {
    let (batch, channels, height, width) = tensor.dim();
    let (pad_height, pad_width) = (padded_size(height, factor), padded_size(width, factor));

    if pad_height == height && pad_width == width {
        return (tensor.to_owned(), (height, width));
    }

    let padded = Array4::from_shape_fn((batch, channels, pad_height, pad_width), |(n, c, y, x)| {
        tensor[[n, c, reflect_index(y, height), reflect_index(x, width)]]
    });
    (padded, (height, width))
}

/// Crops the spatial axes of an NCHW tensor back to `height` x `width`, anchored at
/// the top-left corner. `None` when the tensor is smaller than the requested size.
pub fn crop(tensor: Array4<f32>, height: usize, width: usize) -> Option<Array4<f32>> {
    let (_, _, h, w) = tensor.dim();
    if h < height || w < width {
        return None;
    }
    if h == height && w == width {
        return Some(tensor);
    }
    Some(tensor.slice_move(s![.., .., ..height, ..width]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_size() {
        assert_eq!(padded_size(100, 4), 100);
        assert_eq!(padded_size(101, 4), 104);
        assert_eq!(padded_size(3, 8), 8);
        assert_eq!(padded_size(7, 1), 7);
        assert_eq!(padded_size(7, 0), 7);
    }

    #[test]
    fn test_reflect_index_excludes_edge() {
        // [a b c d e] -> a b c d e | d c b a b c ...
        let mirrored: Vec<_> = (0..11).map(|i| reflect_index(i, 5)).collect();
        assert_eq!(mirrored, vec![0, 1, 2, 3, 4, 3, 2, 1, 0, 1, 2]);
        assert_eq!(reflect_index(5, 1), 0);
    }

    #[test]
    fn test_reflect_pad_values() {
        let tensor = Array4::from_shape_fn((1, 1, 3, 3), |(_, _, y, x)| (y * 3 + x) as f32);
        let (padded, original) = reflect_pad(tensor.view(), 4);

        assert_eq!(original, (3, 3));
        assert_eq!(padded.dim(), (1, 1, 4, 4));
        // Right column mirrors column 1, bottom row mirrors row 1.
        assert_eq!(padded[[0, 0, 0, 3]], tensor[[0, 0, 0, 1]]);
        assert_eq!(padded[[0, 0, 3, 0]], tensor[[0, 0, 1, 0]]);
        assert_eq!(padded[[0, 0, 3, 3]], tensor[[0, 0, 1, 1]]);
        assert_eq!(padded.slice(s![.., .., ..3, ..3]), tensor);
    }

    #[test]
    fn test_reflect_pad_aligned_is_noop() {
        let tensor = Array4::<f32>::ones((1, 3, 8, 12));
        let (padded, _) = reflect_pad(tensor.view(), 4);
        assert_eq!(padded, tensor);
    }

    #[test]
    fn test_reflect_pad_tiny_image() {
        let tensor = Array4::from_elem((1, 3, 1, 2), 0.5f32);
        let (padded, _) = reflect_pad(tensor.view(), 4);
        assert_eq!(padded.dim(), (1, 3, 4, 4));
        assert!(padded.iter().all(|&v| v == 0.5));
    }

    #[test]
    fn test_pad_then_crop_restores_dimensions() {
        for (height, width) in [(100, 100), (101, 99), (5, 17), (1, 1)] {
            let tensor =
                Array4::from_shape_fn((1, 3, height, width), |(_, c, y, x)| (c + y + x) as f32);
            let (padded, (h, w)) = reflect_pad(tensor.view(), 4);
            assert_eq!(padded.dim().2 % 4, 0);
            assert_eq!(padded.dim().3 % 4, 0);

            let cropped = crop(padded, h, w).unwrap();
            assert_eq!(cropped, tensor);
        }
    }

    #[test]
    fn test_crop_rejects_smaller_tensor() {
        let tensor = Array4::<f32>::zeros((1, 3, 4, 4));
        assert!(crop(tensor, 8, 4).is_none());
    }
}
