//! Option document (`--opt`) in the BasicSR YAML layout.
//!
//! Only the keys the runner needs are modeled; training-only keys such as `datasets`,
//! `train` or `logger` are ignored.

use std::{fs, path::Path};

use serde::Deserialize;
use tracing::debug;

use crate::errors::{RestoreError, Result};

/// Channel order the graph consumes and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RestoreOptions {
    pub name: Option<String>,
    pub is_train: bool,
    /// `0` keeps the session on the CPU execution provider.
    pub num_gpu: usize,
    pub network_g: NetworkOptions,
    pub path: PathOptions,
    pub val: ValOptions,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkOptions {
    #[serde(rename = "type")]
    pub kind: String,
    pub input_name: Option<String>,
    pub output_name: Option<String>,
    pub channel_order: ChannelOrder,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    pub strict_load_g: bool,
    pub param_key_g: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValOptions {
    pub padding: bool,
    pub factor: u32,
    pub suffix: Option<String>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            name: None,
            is_train: false,
            num_gpu: 1,
            network_g: NetworkOptions::default(),
            path: PathOptions::default(),
            val: ValOptions::default(),
        }
    }
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            kind: "RetinexFormer".to_string(),
            input_name: None,
            output_name: None,
            channel_order: ChannelOrder::Rgb,
        }
    }
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            strict_load_g: true,
            param_key_g: None,
        }
    }
}

impl Default for ValOptions {
    fn default() -> Self {
        Self {
            padding: true,
            factor: 4,
            suffix: None,
        }
    }
}

impl RestoreOptions {
    /// Reads the document at `path`, or returns the defaults when no document was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| RestoreError::FileSystem {
            path: path.to_path_buf(),
            operation: "option document read".to_string(),
            source: e,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let mut options: Self = serde_yaml::from_str(text)?;
        options.force_eval_mode();
        options.validate()?;
        Ok(options)
    }

    /// Inference never trains and always writes results under the input file name.
    fn force_eval_mode(&mut self) {
        if self.is_train {
            debug!("Overriding is_train: true -> false");
            self.is_train = false;
        }
        if self.val.suffix.as_deref().is_some_and(|s| !s.is_empty()) {
            debug!("Overriding val.suffix -> ''");
        }
        self.val.suffix = Some(String::new());
    }

    pub fn validate(&self) -> Result<()> {
        if self.val.factor == 0 {
            return Err(RestoreError::Validation {
                field: "val.factor".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Alignment the spatial dimensions are padded to, `None` when padding is disabled.
    pub fn pad_factor(&self) -> Option<u32> {
        (self.val.padding && self.val.factor > 1).then_some(self.val.factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETINEXFORMER_LOL: &str = r#"
name: RetinexFormer_LOL_v1
model_type: ImageCleanModel
scale: 1
num_gpu: 1
is_train: true

datasets:
  val:
    name: ValSet
    type: Dataset_PairedImage

network_g:
  type: RetinexFormer
  in_channels: 3
  out_channels: 3
  n_feat: 40
  stage: 1
  num_blocks: [1, 2, 2]

path:
  pretrain_network_g: pretrained_weights/LOL_v1.pth
  strict_load_g: true
  param_key_g: params_ema

val:
  window_size: 4
  save_img: true
  suffix: enhanced
"#;

    #[test]
    fn test_defaults() {
        let options = RestoreOptions::load(None).unwrap();
        assert!(!options.is_train);
        assert_eq!(options.network_g.kind, "RetinexFormer");
        assert_eq!(options.network_g.channel_order, ChannelOrder::Rgb);
        assert!(options.path.strict_load_g);
        assert_eq!(options.pad_factor(), Some(4));
    }

    #[test]
    fn test_basicsr_document_forces_eval_mode() {
        let options = RestoreOptions::from_yaml(RETINEXFORMER_LOL).unwrap();
        assert_eq!(options.name.as_deref(), Some("RetinexFormer_LOL_v1"));
        assert!(!options.is_train);
        assert_eq!(options.val.suffix.as_deref(), Some(""));
        assert_eq!(options.path.param_key_g.as_deref(), Some("params_ema"));
        assert_eq!(options.num_gpu, 1);
    }

    #[test]
    fn test_channel_order_and_bindings() {
        let options = RestoreOptions::from_yaml(
            "network_g:\n  input_name: lq\n  output_name: restored\n  channel_order: bgr\n",
        )
        .unwrap();
        assert_eq!(options.network_g.input_name.as_deref(), Some("lq"));
        assert_eq!(options.network_g.output_name.as_deref(), Some("restored"));
        assert_eq!(options.network_g.channel_order, ChannelOrder::Bgr);
    }

    #[test]
    fn test_padding_disabled() {
        let options = RestoreOptions::from_yaml("val:\n  padding: false\n").unwrap();
        assert_eq!(options.pad_factor(), None);

        let options = RestoreOptions::from_yaml("val:\n  factor: 1\n").unwrap();
        assert_eq!(options.pad_factor(), None);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            RestoreOptions::from_yaml("val:\n  factor: 0\n"),
            Err(RestoreError::Validation { .. })
        ));
        assert!(matches!(
            RestoreOptions::from_yaml("network_g:\n  channel_order: yuv\n"),
            Err(RestoreError::Options { .. })
        ));
        assert!(matches!(
            RestoreOptions::from_yaml("val: [unterminated"),
            Err(RestoreError::Options { .. })
        ));
    }

    #[test]
    fn test_missing_document_is_filesystem_error() {
        let err = RestoreOptions::load(Some(Path::new("/nonexistent/opt.yml"))).unwrap_err();
        assert!(matches!(err, RestoreError::FileSystem { .. }));
    }
}
