//! # Burn NER Batching
//!
//! Turns tokenized sentences into padded Burn tensors for sequence labeling models, with the
//! training glue around them: optimizers, learning rate decay, precomputed context embeddings and
//! prediction output.
#![forbid(unsafe_code)]

/// Experiment configuration
pub mod config;

/// Labeled sentences and the fields each pipeline stage fills in
pub mod instance;

/// Sub-word tokenization and word-to-token alignment
pub mod tokenize;

/// Padded tensor batches
pub mod batching;

/// Optimizers and learning rate decay
pub mod optim;

/// Precomputed context embeddings
pub mod embeddings;

/// Prediction output files
pub mod results;

/// Utilities
pub mod utils;

/// Error macros
#[macro_use]
extern crate anyhow;

pub use batching::{batch_instances, Batch, Batcher};
pub use config::{ConfigError, Training};
pub use instance::{ContextEmbedding, Instance, Sentence, SubwordAlignment};

/// CPU backend used by the unit tests
#[cfg(test)]
pub(crate) type TestBackend = burn::backend::NdArray;

/// Autodiff CPU backend used by the optimizer tests
#[cfg(test)]
pub(crate) type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;
