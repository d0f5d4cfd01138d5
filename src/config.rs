use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Option document (BasicSR YAML). Defaults are used when omitted.
    #[arg(long)]
    pub opt: Option<PathBuf>,

    /// ONNX graph holding the network and its pretrained weights.
    #[arg(long)]
    pub weights: PathBuf,

    #[arg(long = "input_folder")]
    pub input_folder: PathBuf,

    /// Created when missing.
    #[arg(long = "output_folder")]
    pub output_folder: PathBuf,

    #[arg(long = "device_id", default_value_t = 0)]
    pub device_id: i32,

    /// Intra-op threads for ONNX Runtime. Runtime default when omitted.
    #[arg(long = "num_threads")]
    pub num_threads: Option<usize>,
}
