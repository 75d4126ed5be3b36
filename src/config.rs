use std::fmt::Display;

use burn::LearningRate;
use serde::{Deserialize, Serialize};

use crate::optim::OptimizerKind;

/// The embedder type value that selects plain word and character embeddings
pub static NORMAL_EMBEDDER: &str = "normal";

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Training {
    /// Batch size
    #[config(default = 10)]
    pub batch_size: usize,

    /// Embedder type, either "normal" or the name of a transformer model (e.g., "bert-base-cased")
    #[config(default = "NORMAL_EMBEDDER.to_string()")]
    pub embedder_type: String,

    /// Device target (e.g., "cpu", "cuda:0" or "mps")
    #[config(default = "\"cpu\".to_string()")]
    pub device: String,

    /// Optimizer name, case-insensitive ("sgd", "adam" or "adamw")
    #[config(default = "\"sgd\".to_string()")]
    pub optimizer: String,

    /// Initial learning rate
    #[config(default = 1e-2)]
    pub learning_rate: LearningRate,

    /// L2 regularization penalty, used by SGD
    #[config(default = 1e-8)]
    pub l2: f64,

    /// Inverse-time learning rate decay coefficient
    #[config(default = 0.0)]
    pub lr_decay: f64,

    /// The id of the character padding symbol
    #[config(default = 0)]
    pub char_pad_id: usize,

    /// The kind of precomputed context embeddings attached to each instance
    #[config(default = "ContextEmb::None")]
    pub context_emb: ContextEmb,

    /// The start-of-sequence sentinel token
    #[config(default = "\"[CLS]\".to_string()")]
    pub cls_token: String,

    /// The end-of-sequence sentinel token
    #[config(default = "\"[SEP]\".to_string()")]
    pub sep_token: String,
}

impl Training {
    /// Check the configuration before any batching or training begins
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        OptimizerKind::try_from(self.optimizer.as_str())?;
        DeviceTarget::try_from(self.device.as_str())?;

        Ok(())
    }

    /// The embedder selected by `embedder_type`
    pub fn embedder(&self) -> Embedder {
        Embedder::from(self.embedder_type.as_str())
    }

    /// The device selected by `device`
    pub fn device_target(&self) -> Result<DeviceTarget, ConfigError> {
        DeviceTarget::try_from(self.device.as_str())
    }
}

/// Which kind of embedder the model uses, which decides how instances are batched
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Embedder {
    /// Word and character embeddings, optionally with precomputed context embeddings
    Normal,

    /// A transformer encoder, with the model name contained within
    Transformer(String),
}

impl From<&str> for Embedder {
    fn from(value: &str) -> Self {
        if value.to_lowercase() == NORMAL_EMBEDDER {
            Embedder::Normal
        } else {
            Embedder::Transformer(value.to_string())
        }
    }
}

impl Display for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Embedder::Normal => write!(f, "{}", NORMAL_EMBEDDER),
            Embedder::Transformer(name) => write!(f, "{}", name),
        }
    }
}

/// Precomputed context embeddings
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextEmb {
    /// No context embeddings
    None,

    /// ELMo vectors
    Elmo,

    /// BERT vectors
    Bert,

    /// Flair vectors
    Flair,
}

impl ContextEmb {
    /// Whether instances carry a context embedding matrix
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ContextEmb::None)
    }
}

impl TryFrom<&str> for ContextEmb {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "none" => Ok(ContextEmb::None),
            "elmo" => Ok(ContextEmb::Elmo),
            "bert" => Ok(ContextEmb::Bert),
            "flair" => Ok(ContextEmb::Flair),
            _ => Err(ConfigError::UnknownContextEmb(value.to_string())),
        }
    }
}

/// The device tensors are placed on
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DeviceTarget {
    /// The CPU
    Cpu,

    /// A CUDA device with the given index
    Cuda(usize),

    /// Apple Metal Performance Shaders
    Mps,
}

impl TryFrom<&str> for DeviceTarget {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "cpu" => Ok(DeviceTarget::Cpu),
            "mps" => Ok(DeviceTarget::Mps),
            "cuda" => Ok(DeviceTarget::Cuda(0)),
            _ => lower
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(DeviceTarget::Cuda)
                .ok_or_else(|| ConfigError::UnknownDevice(value.to_string())),
        }
    }
}

#[cfg(feature = "tch")]
impl From<DeviceTarget> for burn::backend::libtorch::LibTorchDevice {
    fn from(target: DeviceTarget) -> Self {
        use burn::backend::libtorch::LibTorchDevice;

        match target {
            DeviceTarget::Cpu => LibTorchDevice::Cpu,
            DeviceTarget::Cuda(index) => LibTorchDevice::Cuda(index),
            DeviceTarget::Mps => LibTorchDevice::Mps,
        }
    }
}

/// Configuration Error
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The optimizer name is not one of "sgd", "adam" or "adamw"
    #[error("illegal optimizer: {0}")]
    IllegalOptimizer(String),

    /// Instances can't be split into empty batches
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    /// Epochs are counted from 1
    #[error("epochs start at 1, got {0}")]
    InvalidEpoch(usize),

    /// No context embedding kind found for the given string
    #[error("no context embedding found for {0}")]
    UnknownContextEmb(String),

    /// No device found for the given string
    #[error("no device found for {0}")]
    UnknownDevice(String),
}
