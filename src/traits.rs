use crate::errors::Result;
use crate::imageops_ai::reflect_pad;
use crate::model::{postprocess, to_input_tensor, InferenceSettings};
use image::{DynamicImage, RgbImage};
use ndarray::prelude::*;

/// 画像復元モデルの抽象化
///
/// 具象モデル（ONNX Runtime）ではなく抽象に依存させ、テストではモックを差し込む
pub trait RestorationModel {
    /// 前処理・後処理の設定（パディング倍数、チャンネル順）
    fn settings(&self) -> InferenceSettings;

    /// テンソル予測（低レベルAPI）。NCHW を受け取り NCHW を返す
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>>;

    /// 単一画像の復元処理
    ///
    /// 正規化 → NCHW 変換 → 右下方向への反射パディング → 推論 → 元サイズへのクロップ
    /// → [0, 1] へのクランプ → 8bit 化
    fn restore_image(&self, img: &DynamicImage) -> Result<RgbImage> {
        let settings = self.settings();
        let tensor = to_input_tensor(img, settings.channel_order);

        let (tensor, (height, width)) = match settings.pad_factor {
            Some(factor) => reflect_pad(tensor.view(), factor as usize),
            None => {
                let (_, _, height, width) = tensor.dim();
                (tensor, (height, width))
            }
        };

        let restored = self.predict(tensor.view())?;
        postprocess(restored, height, width, settings.channel_order)
    }
}
