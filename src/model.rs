use std::path::Path;

use crate::{
    errors::{RestoreError, Result},
    imageops_ai::{crop, padded_size, to_rgb8},
    options::{ChannelOrder, RestoreOptions},
    traits::RestorationModel,
};
use image::{DynamicImage, ImageBuffer, Pixel, Primitive, Rgb, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Graph input names tried after the one from the option document.
const INPUT_ALIASES: [&str; 4] = ["input", "lq", "img", "x"];
/// BasicSR checkpoint groups, tried as output names after `param_key_g`.
const PARAM_GROUPS: [&str; 2] = ["params", "params_ema"];
const OUTPUT_ALIASES: [&str; 4] = ["output", "restored", "out", "result"];

/// Side length of the zero tensor used to validate the session before the batch starts.
const WARM_UP_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceSettings {
    pub pad_factor: Option<u32>,
    pub channel_order: ChannelOrder,
}

impl From<&RestoreOptions> for InferenceSettings {
    fn from(options: &RestoreOptions) -> Self {
        Self {
            pad_factor: options.pad_factor(),
            channel_order: options.network_g.channel_order,
        }
    }
}

/// Names of the graph tensors the runner feeds and reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorBindings {
    pub input: String,
    pub output: String,
}

impl TensorBindings {
    /// Resolves the input and output tensor names against what the graph offers.
    ///
    /// Lookup order: the names from `network_g`, then (outputs only) `param_key_g` and
    /// the BasicSR groups `params`/`params_ema`, then the common export aliases. With
    /// `strict_load_g: false` the first graph tensor is used when nothing matches.
    pub fn resolve(inputs: &[String], outputs: &[String], options: &RestoreOptions) -> Result<Self> {
        let strict = options.path.strict_load_g;

        let input_candidates = options
            .network_g
            .input_name
            .iter()
            .map(String::as_str)
            .chain(INPUT_ALIASES);
        let output_candidates = options
            .network_g
            .output_name
            .iter()
            .chain(options.path.param_key_g.iter())
            .map(String::as_str)
            .chain(PARAM_GROUPS)
            .chain(OUTPUT_ALIASES);

        Ok(Self {
            input: pick_binding("input", inputs, input_candidates, strict)?,
            output: pick_binding("output", outputs, output_candidates, strict)?,
        })
    }
}

fn pick_binding<'a>(
    kind: &str,
    available: &[String],
    candidates: impl IntoIterator<Item = &'a str>,
    strict: bool,
) -> Result<String> {
    if let Some(name) = candidates
        .into_iter()
        .find(|candidate| available.iter().any(|name| name.as_str() == *candidate))
    {
        return Ok(name.to_string());
    }

    match available.first() {
        Some(first) if !strict => {
            warn!("No known {kind} name in graph, falling back to `{first}`");
            Ok(first.clone())
        }
        _ => Err(RestoreError::model(
            format!("{kind} binding resolution"),
            format!(
                "no expected {kind} name found; graph offers [{}] \
                 (set network_g.{kind}_name or path.strict_load_g: false)",
                available.join(", ")
            ),
        )),
    }
}

/// Checks the declared NCHW input shape and returns the warm-up side length.
///
/// Images of any size go through the graph, so height and width must be dynamic axes
/// (negative in the declared shape). An undeclared shape is accepted as is.
fn warm_up_side(declared: Option<&[i64]>, pad_factor: Option<u32>) -> Result<usize> {
    let size = padded_size(WARM_UP_SIZE, pad_factor.unwrap_or(1) as usize);
    let Some(shape) = declared else {
        return Ok(size);
    };

    let invalid = |reason: String| RestoreError::Validation {
        field: "model input shape".to_string(),
        reason,
    };
    match shape {
        [_, channels, _, _] if *channels > 0 && *channels != 3 => Err(invalid(format!(
            "expected 3 channels, graph declares {shape:?}"
        ))),
        [_, _, height, width] if *height > 0 || *width > 0 => Err(invalid(format!(
            "graph declares a fixed spatial size {shape:?}; \
             re-export it with dynamic height and width axes"
        ))),
        [_, _, _, _] => Ok(size),
        _ => Err(invalid(format!("expected an NCHW input, graph declares {shape:?}"))),
    }
}

fn session_error<E: std::fmt::Display>(operation: &'static str) -> impl FnOnce(E) -> RestoreError {
    move |e| RestoreError::model(operation, e.to_string())
}

pub struct Model {
    bindings: TensorBindings,
    settings: InferenceSettings,
    session: Mutex<Session>,
}

impl Model {
    pub fn new(
        weights_path: &Path,
        options: &RestoreOptions,
        device_id: i32,
        num_threads: Option<usize>,
    ) -> Result<Self> {
        // Sequential execution at a fixed optimization level keeps runs reproducible.
        let mut builder = Session::builder()
            .map_err(session_error("セッションビルダー初期化"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(session_error("最適化レベル設定"))?
            .with_parallel_execution(false)
            .map_err(session_error("逐次実行設定"))?;

        if let Some(threads) = num_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(session_error("スレッド数設定"))?;
        }

        if options.num_gpu > 0 {
            builder = builder
                .with_execution_providers([
                    TensorRTExecutionProvider::default()
                        .with_device_id(device_id)
                        .build(),
                    CUDAExecutionProvider::default()
                        .with_device_id(device_id)
                        .build(),
                ])
                .map_err(session_error("実行プロバイダー設定"))?;
        }

        let session = builder
            .commit_from_file(weights_path)
            .map_err(|e| {
                RestoreError::model(
                    format!("モデルファイル読み込み: {}", weights_path.display()),
                    e.to_string(),
                )
            })?;

        let inputs: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let outputs: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        debug!("Graph inputs: {inputs:?}, outputs: {outputs:?}");

        let bindings = TensorBindings::resolve(&inputs, &outputs, options)?;
        let declared: Option<Vec<i64>> = session
            .inputs
            .iter()
            .find(|i| i.name == bindings.input)
            .and_then(|i| i.input_type.tensor_shape())
            .map(|shape| shape.iter().copied().collect());
        let warm_up_size = warm_up_side(declared.as_deref(), options.pad_factor())?;
        info!(
            "Loaded {} from {} (input `{}`, output `{}`)",
            options.network_g.kind,
            weights_path.display(),
            bindings.input,
            bindings.output
        );

        let model = Self {
            bindings,
            settings: InferenceSettings::from(options),
            session: Mutex::new(session),
        };
        model.warm_up(warm_up_size)?;
        Ok(model)
    }

    fn warm_up(&self, size: usize) -> Result<()> {
        let data = Array4::<f32>::zeros((1, 3, size, size));
        self.predict(data.view()).map_err(|e| RestoreError::Model {
            operation: "モデル初期化実行".to_string(),
            source: Box::new(e),
        })?;
        Ok(())
    }
}

impl RestorationModel for Model {
    fn settings(&self) -> InferenceSettings {
        self.settings
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.bindings.input.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.bindings.output.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

/// Normalizes an image to `[0, 1]` and lays it out as a `1 x 3 x H x W` tensor in `order`.
pub fn preprocess<S>(image: &ImageBuffer<Rgb<S>, Vec<S>>, order: ChannelOrder) -> Array4<f32>
where
    Rgb<S>: Pixel<Subpixel = S>,
    S: Into<f32> + Primitive + 'static,
{
    let tensor = image.as_ndarray3();
    let tensor = match order {
        ChannelOrder::Rgb => tensor.slice_move(s![NewAxis, .., .., ..]),
        ChannelOrder::Bgr => tensor.slice_move(s![NewAxis, ..;-1, .., ..]),
    };
    let max: f32 = S::DEFAULT_MAX_VALUE.into();
    tensor.mapv(|v| <S as Into<f32>>::into(v) / max)
}

/// Decodes at the source bit depth so 16-bit and float inputs keep their precision.
pub fn to_input_tensor(img: &DynamicImage, order: ChannelOrder) -> Array4<f32> {
    match img {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => preprocess(&img.to_rgb16(), order),
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            preprocess(&img.to_rgb32f(), order)
        }
        _ => preprocess(&img.to_rgb8(), order),
    }
}

/// Crops the network output back to `height` x `width` and converts it to 8-bit RGB.
pub fn postprocess(
    output: Array4<f32>,
    height: usize,
    width: usize,
    order: ChannelOrder,
) -> Result<RgbImage> {
    let shape = output.shape().to_vec();
    if shape[0] != 1 {
        return Err(RestoreError::Validation {
            field: "output batch".to_string(),
            reason: format!("expected a single image, got shape {shape:?}"),
        });
    }

    let output = crop(output, height, width).ok_or_else(|| RestoreError::Validation {
        field: "output size".to_string(),
        reason: format!("{shape:?} is smaller than the {width}x{height} input"),
    })?;

    to_rgb8(output.index_axis(Axis(0), 0), order).ok_or_else(|| RestoreError::Validation {
        field: "output channels".to_string(),
        reason: format!("expected 3 channels, got shape {shape:?}"),
    })
}
