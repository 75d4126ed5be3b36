use derive_new::new;
use tokenizers::Tokenizer;

use crate::{config::Training, instance::SubwordAlignment, Instance};

/// The pieces of a pretrained tokenizer needed to align words with sub-word tokens
pub trait SubwordTokenizer {
    /// Split a single word into sub-word tokens
    fn tokenize(&self, word: &str) -> Result<Vec<String>, TokenizeError>;

    /// Look up the id of each token
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<usize>, TokenizeError>;
}

impl SubwordTokenizer for Tokenizer {
    fn tokenize(&self, word: &str) -> Result<Vec<String>, TokenizeError> {
        let encoding = self
            .encode(word, false)
            .map_err(|e| TokenizeError::Tokenizer(e.to_string()))?;

        Ok(encoding.get_tokens().to_vec())
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<usize>, TokenizeError> {
        tokens
            .iter()
            .map(|token| {
                self.token_to_id(token)
                    .or_else(|| self.token_to_id(UNK_TOKEN))
                    .map(|id| id as usize)
                    .ok_or_else(|| TokenizeError::UnknownToken(token.clone()))
            })
            .collect()
    }
}

/// Fallback for tokens missing from the vocabulary
pub static UNK_TOKEN: &str = "[UNK]";

/// The sentinel tokens wrapped around every tokenized sentence
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct SpecialTokens {
    /// Start-of-sequence token
    pub cls: String,

    /// End-of-sequence token
    pub sep: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self::new("[CLS]".to_string(), "[SEP]".to_string())
    }
}

impl From<&Training> for SpecialTokens {
    fn from(config: &Training) -> Self {
        Self::new(config.cls_token.clone(), config.sep_token.clone())
    }
}

/// Tokenize the original words of each instance for a transformer model, filling in
/// `Instance::subwords`.
///
/// The first sub-word token of each word represents the word. Alignment indices count sub-word
/// tokens from the start of the sentence, before the start sentinel is added.
pub fn tokenize_instances<T>(
    tokenizer: &T,
    special: &SpecialTokens,
    insts: &mut [Instance],
) -> Result<(), TokenizeError>
where
    T: SubwordTokenizer + ?Sized,
{
    for inst in insts.iter_mut() {
        inst.subwords = Some(align_words(tokenizer, special, &inst.input.ori_words)?);
    }

    Ok(())
}

/// Tokenize a single sentence and record where each word starts
pub fn align_words<T>(
    tokenizer: &T,
    special: &SpecialTokens,
    words: &[String],
) -> Result<SubwordAlignment, TokenizeError>
where
    T: SubwordTokenizer + ?Sized,
{
    let mut tokens = Vec::with_capacity(words.len() + 2);
    let mut orig_to_tok_index = Vec::with_capacity(words.len());

    tokens.push(special.cls.clone());
    for word in words {
        orig_to_tok_index.push(tokens.len() - 1);
        tokens.extend(tokenizer.tokenize(word)?);
    }
    tokens.push(special.sep.clone());

    let token_ids = tokenizer.convert_tokens_to_ids(&tokens)?;

    Ok(SubwordAlignment::new(token_ids, orig_to_tok_index))
}

/// Tokenization Error
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TokenizeError {
    /// The underlying tokenizer failed
    #[error("unable to tokenize: {0}")]
    Tokenizer(String),

    /// The token is not in the vocabulary and there is no UNK fallback
    #[error("no id found for token {0}")]
    UnknownToken(String),
}
