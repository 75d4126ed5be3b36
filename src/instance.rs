use derive_new::new;
use serde::{Deserialize, Serialize};

/// The words of a sentence
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// Processed words (e.g., with digits normalized), used for word and character ids
    pub words: Vec<String>,

    /// The words exactly as they appeared in the corpus, used for sub-word tokenization and output
    pub ori_words: Vec<String>,
}

impl Sentence {
    /// A sentence whose processed words are the original words
    pub fn new(words: Vec<String>) -> Self {
        Self {
            ori_words: words.clone(),
            words,
        }
    }

    /// A sentence with separately processed words
    pub fn with_original(words: Vec<String>, ori_words: Vec<String>) -> Self {
        Self { words, ori_words }
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the sentence has no words
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Sub-word token ids for an instance, with the position of each word's first sub-word
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, new)]
pub struct SubwordAlignment {
    /// Token ids, including the start and end sentinels
    pub token_ids: Vec<usize>,

    /// For each original word, the index of its first sub-word token
    pub orig_to_tok_index: Vec<usize>,
}

/// A dense `[rows, dim]` matrix of precomputed per-word vectors, stored row-major
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextEmbedding {
    rows: usize,
    dim: usize,
    values: Vec<f32>,
}

impl ContextEmbedding {
    /// Build a matrix from one vector per word. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, RaggedRows> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let n_rows = rows.len();

        let mut values = Vec::with_capacity(n_rows * dim);
        for (row, vector) in rows.into_iter().enumerate() {
            if vector.len() != dim {
                return Err(RaggedRows {
                    row,
                    expected: dim,
                    found: vector.len(),
                });
            }

            values.extend(vector);
        }

        Ok(Self {
            rows: n_rows,
            dim,
            values,
        })
    }

    /// Number of rows (one per word)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Length of each row
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// All values, row-major
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// A single row
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        (index < self.rows).then(|| &self.values[index * self.dim..(index + 1) * self.dim])
    }

    /// Back to one vector per word
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        (0..self.rows)
            .filter_map(|index| self.row(index).map(<[f32]>::to_vec))
            .collect()
    }
}

/// A row whose length differs from the first row
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("row {row} has {found} values, expected {expected}")]
pub struct RaggedRows {
    /// The offending row
    pub row: usize,

    /// Length of the first row
    pub expected: usize,

    /// Length of the offending row
    pub found: usize,
}

/// One labeled sentence.
///
/// The corpus reader fills `input`, `output`, `word_ids`, `char_ids` and `output_ids`. Later stages
/// each own one of the optional fields:
///
/// - `subwords` is written by [`crate::tokenize::tokenize_instances`] and read by the transformer
///   batcher
/// - `context_emb` is written by [`crate::embeddings::load_context_embeddings`] and read by the
///   simple batcher
/// - `prediction` is written after decoding and read by [`crate::results::write_results`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// The sentence
    pub input: Sentence,

    /// Gold labels, when annotated
    pub output: Option<Vec<String>>,

    /// Word ids, one per word
    pub word_ids: Vec<usize>,

    /// Character ids, one list per word
    pub char_ids: Vec<Vec<usize>>,

    /// Gold label ids, when annotated
    pub output_ids: Option<Vec<usize>>,

    /// Sub-word tokens and their alignment to words
    pub subwords: Option<SubwordAlignment>,

    /// Precomputed context embedding matrix
    pub context_emb: Option<ContextEmbedding>,

    /// Predicted labels
    pub prediction: Option<Vec<String>>,
}

impl Instance {
    /// Creates a new instance from a sentence and its optional gold labels
    pub fn new(input: Sentence, output: Option<Vec<String>>) -> Self {
        Self {
            input,
            output,
            ..Default::default()
        }
    }

    /// Attach word and character ids
    pub fn with_ids(mut self, word_ids: Vec<usize>, char_ids: Vec<Vec<usize>>) -> Self {
        self.word_ids = word_ids;
        self.char_ids = char_ids;
        self
    }

    /// Attach gold label ids
    pub fn with_output_ids(mut self, output_ids: Vec<usize>) -> Self {
        self.output_ids = Some(output_ids);
        self
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Whether the sentence has no words
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn embedding_rows_are_row_major() {
        let emb = ContextEmbedding::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();

        assert_eq!((emb.rows(), emb.dim()), (2, 2));
        assert_eq!(emb.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(emb.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(emb.row(2), None);
    }

    #[test]
    fn ragged_embedding_rows_are_rejected() {
        let err = ContextEmbedding::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();

        assert_eq!(
            err,
            RaggedRows {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }
}
