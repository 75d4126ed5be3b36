use burn::{data::dataloader, tensor::backend::Backend};

use crate::{
    config::{ConfigError, Embedder, Training},
    Instance,
};

/// Batching for word and character embeddings
pub mod simple;

/// Batching for transformer encoders
pub mod transformer;

pub use simple::{SimpleBatch, SimpleBatcher};
pub use transformer::{TransformerBatch, TransformerBatcher};

/// A padded batch, shaped for the embedder it was assembled for
#[derive(Clone, Debug)]
pub enum Batch<B: Backend> {
    /// Word ids, character ids and optional context embeddings
    Simple(SimpleBatch<B>),

    /// Sub-word token ids with their word alignment
    Transformer(TransformerBatch<B>),
}

impl<B: Backend> Batch<B> {
    /// Number of instances in the batch
    pub fn batch_size(&self) -> usize {
        match self {
            Batch::Simple(batch) => batch.words.dims()[0],
            Batch::Transformer(batch) => batch.words.dims()[0],
        }
    }
}

/// Assembles chunks of instances into batches. The variant is chosen once from the embedder type.
#[derive(Clone, Debug)]
pub enum Batcher<B: Backend> {
    /// Batches for word and character embeddings
    Simple(SimpleBatcher<B>),

    /// Batches for transformer encoders
    Transformer(TransformerBatcher<B>),
}

impl<B: Backend> Batcher<B> {
    /// Validates the configuration and selects the batcher for its embedder type
    pub fn from_config(config: &Training, device: B::Device) -> Result<Self, ConfigError> {
        config.validate()?;

        let batcher = match config.embedder() {
            Embedder::Normal => Batcher::Simple(SimpleBatcher::from_config(config, device)),
            Embedder::Transformer(_) => Batcher::Transformer(TransformerBatcher::new(device)),
        };

        Ok(batcher)
    }

    /// Assemble a single chunk of instances
    pub fn assemble(&self, insts: &[Instance]) -> Result<Batch<B>, BatchError> {
        match self {
            Batcher::Simple(batcher) => batcher.assemble(insts).map(Batch::Simple),
            Batcher::Transformer(batcher) => batcher.assemble(insts).map(Batch::Transformer),
        }
    }
}

/// Implement Batcher trait for Batcher enum, so it can back a burn DataLoader
impl<B: Backend> dataloader::batcher::Batcher<Instance, Batch<B>> for Batcher<B> {
    /// Collects a vector of instances into a padded batch
    fn batch(&self, items: Vec<Instance>) -> Batch<B> {
        self.assemble(&items).expect("unable to batch instances")
    }
}

/// Split the instances into contiguous chunks of `batch_size`, preserving order, and assemble each
/// one. The last batch may be smaller; there are `ceil(len / batch_size)` batches in total.
pub fn batch_instances<B: Backend>(
    batcher: &Batcher<B>,
    insts: &[Instance],
    batch_size: usize,
) -> Result<Vec<Batch<B>>, BatchError> {
    if batch_size == 0 {
        return Err(ConfigError::ZeroBatchSize.into());
    }

    insts
        .chunks(batch_size)
        .map(|chunk| batcher.assemble(chunk))
        .collect()
}

/// Batch all instances as configured: validate, select the batcher, then split by `batch_size`
pub fn batching_list_instances<B: Backend>(
    config: &Training,
    insts: &[Instance],
    device: B::Device,
) -> Result<Vec<Batch<B>>, BatchError> {
    let batcher = Batcher::from_config(config, device)?;

    batch_instances(&batcher, insts, config.batch_size)
}

pub(crate) fn check_len(
    index: usize,
    field: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), BatchError> {
    if expected == found {
        Ok(())
    } else {
        Err(BatchError::LengthMismatch {
            index,
            field,
            expected,
            found,
        })
    }
}

/// Batching Error
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// The configuration was rejected before batching
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A batch needs at least one instance
    #[error("cannot assemble an empty batch")]
    Empty,

    /// The instance has no sub-word tokens for the transformer batcher
    #[error("instance {0} has not been tokenized")]
    NotTokenized(usize),

    /// Context embeddings are enabled but the instance has none
    #[error("instance {0} has no context embedding")]
    MissingContextEmbedding(usize),

    /// The instance's context embedding size differs from the first instance in the batch
    #[error("instance {index} has a context embedding of size {found}, expected {expected}")]
    EmbeddingSize {
        /// Position of the instance in the batch
        index: usize,

        /// Embedding size of the first instance
        expected: usize,

        /// Embedding size of this instance
        found: usize,
    },

    /// A per-word field doesn't have one entry per word
    #[error("instance {index} has {found} {field} for {expected} words")]
    LengthMismatch {
        /// Position of the instance in the batch
        index: usize,

        /// The field with the wrong length
        field: &'static str,

        /// Number of words
        expected: usize,

        /// Number of entries in the field
        found: usize,
    },
}
