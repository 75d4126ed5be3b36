use burn::{
    data::dataloader,
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::{utils::tensors, Instance};

use super::{check_len, BatchError};

/// A batch for transformer encoders. Word-level tensors are [batch_size, max_seq_len], token-level
/// tensors are [batch_size, max_tok_seq_len], and the two lengths differ when words are split into
/// several sub-word tokens.
#[derive(Clone, Debug, new)]
pub struct TransformerBatch<B: Backend> {
    /// Sub-word token ids, sentinels included: [batch_size, max_tok_seq_len]
    pub words: Tensor<B, 2, Int>,

    /// The unpadded number of words in each sentence: [batch_size]
    pub word_seq_lens: Tensor<B, 1, Int>,

    /// The unpadded number of tokens in each sentence: [batch_size]
    pub token_seq_lens: Tensor<B, 1, Int>,

    /// The index of each word's first sub-word token: [batch_size, max_seq_len]
    pub orig_to_tok_index: Tensor<B, 2, Int>,

    /// Bert model needs an input mask, 1 for real tokens: [batch_size, max_tok_seq_len]
    pub input_mask: Tensor<B, 2, Int>,

    /// Gold label ids, zero where not annotated: [batch_size, max_seq_len]
    pub labels: Tensor<B, 2, Int>,
}

/// Struct for batching tokenized instances for transformer encoders
#[derive(Clone, Debug, new)]
pub struct TransformerBatcher<B: Backend> {
    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> TransformerBatcher<B> {
    /// Pad the sub-word token ids, word alignment and labels of a chunk of tokenized instances
    pub fn assemble(&self, insts: &[Instance]) -> Result<TransformerBatch<B>, BatchError> {
        if insts.is_empty() {
            return Err(BatchError::Empty);
        }

        let mut token_ids = Vec::with_capacity(insts.len());
        let mut orig_to_tok_index = Vec::with_capacity(insts.len());
        let mut labels = Vec::with_capacity(insts.len());

        for (index, inst) in insts.iter().enumerate() {
            let subwords = inst
                .subwords
                .as_ref()
                .ok_or(BatchError::NotTokenized(index))?;

            check_len(
                index,
                "orig_to_tok_index",
                inst.len(),
                subwords.orig_to_tok_index.len(),
            )?;
            if let Some(output_ids) = &inst.output_ids {
                check_len(index, "output_ids", inst.len(), output_ids.len())?;
            }

            token_ids.push(subwords.token_ids.as_slice());
            orig_to_tok_index.push(subwords.orig_to_tok_index.as_slice());
            labels.push(inst.output_ids.as_deref().unwrap_or_default());
        }

        let word_seq_len: Vec<usize> = insts.iter().map(Instance::len).collect();
        let max_seq_len = word_seq_len.iter().copied().max().unwrap_or(0);

        let token_seq_len: Vec<usize> = token_ids.iter().map(|ids| ids.len()).collect();
        let max_tok_seq_len = token_seq_len.iter().copied().max().unwrap_or(0);

        let input_mask: Vec<Vec<usize>> = token_seq_len.iter().map(|&len| vec![1; len]).collect();

        Ok(TransformerBatch {
            words: tensors::pad_to(0, &token_ids, max_tok_seq_len, &self.device),
            word_seq_lens: tensors::lengths(&word_seq_len, &self.device),
            token_seq_lens: tensors::lengths(&token_seq_len, &self.device),
            orig_to_tok_index: tensors::pad_to(0, &orig_to_tok_index, max_seq_len, &self.device),
            input_mask: tensors::pad_to(0, &input_mask, max_tok_seq_len, &self.device),
            labels: tensors::pad_to(0, &labels, max_seq_len, &self.device),
        })
    }
}

/// Implement Batcher trait for TransformerBatcher struct
impl<B: Backend> dataloader::batcher::Batcher<Instance, TransformerBatch<B>>
    for TransformerBatcher<B>
{
    /// Collects a vector of tokenized instances into a padded batch
    fn batch(&self, items: Vec<Instance>) -> TransformerBatch<B> {
        self.assemble(&items).expect("unable to batch instances")
    }
}
