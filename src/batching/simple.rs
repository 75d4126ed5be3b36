use burn::{
    data::dataloader,
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::{config::Training, utils::tensors, Instance};

use super::{check_len, BatchError};

/// A batch for word and character embeddings
#[derive(Clone, Debug, new)]
pub struct SimpleBatch<B: Backend> {
    /// Word ids: [batch_size, max_seq_len]
    pub words: Tensor<B, 2, Int>,

    /// The unpadded length of each sentence: [batch_size]
    pub word_seq_lens: Tensor<B, 1, Int>,

    /// Precomputed context embeddings: [batch_size, max_seq_len, emb_size]
    pub context_emb: Option<Tensor<B, 3>>,

    /// Character ids: [batch_size, max_seq_len, max_char_seq_len]
    pub chars: Tensor<B, 3, Int>,

    /// The unpadded length of each word, 1 for padding words: [batch_size, max_seq_len]
    pub char_seq_lens: Tensor<B, 2, Int>,

    /// Gold label ids, zero where not annotated: [batch_size, max_seq_len]
    pub labels: Tensor<B, 2, Int>,
}

/// Struct for batching instances for word and character embeddings
#[derive(Clone, Debug, new)]
pub struct SimpleBatcher<B: Backend> {
    /// The id of the character padding symbol, written at the first character of padding words
    pub char_pad_id: usize,

    /// Whether instances carry precomputed context embeddings
    pub use_context_emb: bool,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> SimpleBatcher<B> {
    /// Creates a batcher from the experiment configuration
    pub fn from_config(config: &Training, device: B::Device) -> Self {
        Self::new(config.char_pad_id, config.context_emb.is_enabled(), device)
    }

    /// Pad the word ids, character ids, labels and context embeddings of a chunk of instances
    pub fn assemble(&self, insts: &[Instance]) -> Result<SimpleBatch<B>, BatchError> {
        if insts.is_empty() {
            return Err(BatchError::Empty);
        }

        for (index, inst) in insts.iter().enumerate() {
            check_len(index, "word_ids", inst.len(), inst.word_ids.len())?;
            check_len(index, "char_ids", inst.len(), inst.char_ids.len())?;
            if let Some(output_ids) = &inst.output_ids {
                check_len(index, "output_ids", inst.len(), output_ids.len())?;
            }
        }

        let batch_size = insts.len();

        let word_seq_len: Vec<usize> = insts.iter().map(Instance::len).collect();
        let max_seq_len = word_seq_len.iter().copied().max().unwrap_or(0);

        // Padding words get a length of 1, because the character encoder can't take empty words
        let char_seq_len: Vec<usize> = insts
            .iter()
            .flat_map(|inst| {
                inst.char_ids
                    .iter()
                    .map(Vec::len)
                    .chain(std::iter::repeat(1))
                    .take(max_seq_len)
            })
            .collect();
        let max_char_seq_len = char_seq_len.iter().copied().max().unwrap_or(0);

        let mut char_seq = vec![0; batch_size * max_seq_len * max_char_seq_len];

        for (idx, inst) in insts.iter().enumerate() {
            for word_idx in 0..max_seq_len {
                let start = (idx * max_seq_len + word_idx) * max_char_seq_len;

                match inst.char_ids.get(word_idx) {
                    Some(char_ids) => {
                        char_seq[start..start + char_ids.len()].copy_from_slice(char_ids);
                    }
                    None => char_seq[start] = self.char_pad_id,
                }
            }
        }

        let labels: Vec<&[usize]> = insts
            .iter()
            .map(|inst| inst.output_ids.as_deref().unwrap_or_default())
            .collect();

        let word_ids: Vec<&[usize]> = insts.iter().map(|inst| inst.word_ids.as_slice()).collect();

        let context_emb = if self.use_context_emb {
            Some(self.context_emb(insts, max_seq_len)?)
        } else {
            None
        };

        Ok(SimpleBatch {
            words: tensors::pad_to(0, &word_ids, max_seq_len, &self.device),
            word_seq_lens: tensors::lengths(&word_seq_len, &self.device),
            context_emb,
            chars: tensors::int_tensor(
                char_seq,
                [batch_size, max_seq_len, max_char_seq_len],
                &self.device,
            ),
            char_seq_lens: tensors::int_tensor(
                char_seq_len,
                [batch_size, max_seq_len],
                &self.device,
            ),
            labels: tensors::pad_to(0, &labels, max_seq_len, &self.device),
        })
    }

    /// Copy each instance's embedding rows into a zero-filled [batch_size, max_seq_len, emb_size]
    /// tensor. The embedding size comes from the first instance.
    fn context_emb(
        &self,
        insts: &[Instance],
        max_seq_len: usize,
    ) -> Result<Tensor<B, 3>, BatchError> {
        let emb_size = insts[0]
            .context_emb
            .as_ref()
            .ok_or(BatchError::MissingContextEmbedding(0))?
            .dim();

        let mut values = vec![0.0; insts.len() * max_seq_len * emb_size];

        for (idx, inst) in insts.iter().enumerate() {
            let emb = inst
                .context_emb
                .as_ref()
                .ok_or(BatchError::MissingContextEmbedding(idx))?;

            check_len(idx, "context_emb", inst.len(), emb.rows())?;
            if emb.dim() != emb_size {
                return Err(BatchError::EmbeddingSize {
                    index: idx,
                    expected: emb_size,
                    found: emb.dim(),
                });
            }

            let start = idx * max_seq_len * emb_size;
            values[start..start + emb.values().len()].copy_from_slice(emb.values());
        }

        Ok(tensors::float_tensor(
            values,
            [insts.len(), max_seq_len, emb_size],
            &self.device,
        ))
    }
}

/// Implement Batcher trait for SimpleBatcher struct
impl<B: Backend> dataloader::batcher::Batcher<Instance, SimpleBatch<B>> for SimpleBatcher<B> {
    /// Collects a vector of instances into a padded batch
    fn batch(&self, items: Vec<Instance>) -> SimpleBatch<B> {
        self.assemble(&items).expect("unable to batch instances")
    }
}
