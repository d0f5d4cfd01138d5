use crate::errors::Result;
use crate::model::InferenceSettings;
use crate::options::ChannelOrder;
use crate::traits::RestorationModel;
use ndarray::prelude::*;
use parking_lot::Mutex;

/// テスト用のモック復元モデル
///
/// 入力テンソルに `gain` を掛けて返す。推論に渡されたテンソル形状を記録する
#[derive(Debug)]
pub struct MockRestorationModel {
    pub settings: InferenceSettings,
    pub gain: f32,
    seen_shapes: Mutex<Vec<[usize; 4]>>,
}

impl MockRestorationModel {
    pub fn new(settings: InferenceSettings) -> Self {
        Self {
            settings,
            gain: 1.0,
            seen_shapes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// 推論に渡されたテンソル形状（NCHW）
    pub fn seen_shapes(&self) -> Vec<[usize; 4]> {
        self.seen_shapes.lock().clone()
    }
}

impl RestorationModel for MockRestorationModel {
    fn settings(&self) -> InferenceSettings {
        self.settings
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = tensor.dim();
        self.seen_shapes.lock().push([n, c, h, w]);
        Ok(tensor.mapv(|v| v * self.gain))
    }
}

/// テスト用のファクトリー関数（RetinexFormer と同じ 4 倍パディング）
pub fn create_mock_model() -> MockRestorationModel {
    MockRestorationModel::new(InferenceSettings {
        pad_factor: Some(4),
        channel_order: ChannelOrder::Rgb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    /// 8-bit への切り捨てで 1 段階ずれることがある
    fn within_one_level(actual: &Rgb<u8>, expected: Rgb<u8>) -> bool {
        actual.0.iter().zip(expected.0).all(|(a, e)| a.abs_diff(e) <= 1)
    }

    #[test]
    fn test_mock_model_identity() -> Result<()> {
        let mock = create_mock_model();
        let test_image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 7, Rgb([200, 100, 50])));

        let result = mock.restore_image(&test_image)?;
        assert_eq!(result.dimensions(), (10, 7));
        assert_eq!(mock.seen_shapes(), vec![[1, 3, 8, 12]]);
        assert!(result.pixels().all(|p| within_one_level(p, Rgb([200, 100, 50]))));
        Ok(())
    }

    #[test]
    fn test_mock_model_gain_is_clamped() -> Result<()> {
        let mock = create_mock_model().with_gain(4.0);
        let test_image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 64, 0])));

        let result = mock.restore_image(&test_image)?;
        assert!(result.pixels().all(|p| *p == Rgb([255, 255, 0])));
        Ok(())
    }

    #[test]
    fn test_mock_model_without_padding() -> Result<()> {
        let mock = MockRestorationModel::new(InferenceSettings {
            pad_factor: None,
            channel_order: ChannelOrder::Bgr,
        });
        let test_image = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 3, Rgb([1, 2, 3])));

        let result = mock.restore_image(&test_image)?;
        assert_eq!(mock.seen_shapes(), vec![[1, 3, 3, 5]]);
        // BGR in, BGR out: the on-disk order is restored.
        assert!(result.pixels().all(|p| within_one_level(p, Rgb([1, 2, 3]))));
        Ok(())
    }
}
