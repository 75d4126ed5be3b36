use std::path::Path;

use crate::{
    instance::{ContextEmbedding, RaggedRows},
    utils::files,
    Instance,
};

/// Load precomputed context embeddings (e.g., ELMo vectors) and attach them to the instances as
/// `Instance::context_emb`.
///
/// The file is a JSON array holding one `[num_words, emb_size]` matrix per instance, in the same
/// order as `insts`. Returns the embedding size, which is assumed to be the same for every
/// instance.
pub async fn load_context_embeddings(
    path: impl AsRef<Path>,
    insts: &mut [Instance],
) -> Result<usize, EmbeddingError> {
    let bytes = tokio::fs::read(path).await?;
    let all_vecs: Vec<Vec<Vec<f32>>> = serde_json::from_slice(&bytes)?;

    if all_vecs.len() != insts.len() {
        log::warn!(
            "found {} context embeddings for {} instances",
            all_vecs.len(),
            insts.len()
        );
    }

    // Check every matrix before touching the instances
    let embs = all_vecs
        .into_iter()
        .zip(insts.iter())
        .enumerate()
        .map(|(index, (vec, inst))| {
            let emb = ContextEmbedding::from_rows(vec)
                .map_err(|source| EmbeddingError::Ragged { index, source })?;

            if emb.rows() != inst.len() {
                return Err(EmbeddingError::RowMismatch {
                    index,
                    words: inst.len(),
                    rows: emb.rows(),
                });
            }

            Ok(emb)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let size = embs.last().map(ContextEmbedding::dim).unwrap_or_default();
    for (emb, inst) in embs.into_iter().zip(insts.iter_mut()) {
        inst.context_emb = Some(emb);
    }

    Ok(size)
}

/// Write the context embeddings of the instances in the format read by
/// [`load_context_embeddings`]. Instances without an embedding are written as empty matrices.
pub async fn save_context_embeddings(
    path: impl AsRef<Path>,
    insts: &[Instance],
) -> Result<(), EmbeddingError> {
    let all_vecs: Vec<Vec<Vec<f32>>> = insts
        .iter()
        .map(|inst| {
            inst.context_emb
                .as_ref()
                .map(ContextEmbedding::to_rows)
                .unwrap_or_default()
        })
        .collect();

    files::write_file(path, &serde_json::to_string(&all_vecs)?).await?;

    Ok(())
}

/// Context Embedding Error
#[derive(thiserror::Error, Debug)]
pub enum EmbeddingError {
    /// The file could not be read or written
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The file is not a JSON array of matrices
    #[error("invalid embedding file: {0}")]
    Format(#[from] serde_json::Error),

    /// A matrix whose rows have different lengths
    #[error("embedding {index} is ragged: {source}")]
    Ragged {
        /// Position of the instance
        index: usize,

        /// The offending row
        source: RaggedRows,
    },

    /// A matrix with a different number of rows than the instance has words
    #[error("embedding {index} has {rows} rows for {words} words")]
    RowMismatch {
        /// Position of the instance
        index: usize,

        /// Number of words in the instance
        words: usize,

        /// Number of rows in the matrix
        rows: usize,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Sentence;

    fn instance(words: &[&str]) -> Instance {
        Instance::new(
            Sentence::new(words.iter().map(|w| w.to_string()).collect()),
            None,
        )
    }

    #[tokio::test]
    async fn attaches_embeddings_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.emb.json");
        tokio::fs::write(&path, "[[[1, 2, 3], [4, 5, 6]], [[7, 8, 9]]]")
            .await
            .unwrap();

        let mut insts = vec![instance(&["EU", "rejects"]), instance(&["Peter"])];
        let size = load_context_embeddings(&path, &mut insts).await.unwrap();

        assert_eq!(size, 3);
        let first = insts[0].context_emb.as_ref().unwrap();
        assert_eq!((first.rows(), first.dim()), (2, 3));
        assert_eq!(
            insts[1].context_emb.as_ref().unwrap().values(),
            &[7.0, 8.0, 9.0]
        );
    }

    #[tokio::test]
    async fn row_count_must_match_word_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.emb.json");
        tokio::fs::write(&path, "[[[1, 2]], [[3, 4]]]").await.unwrap();

        let mut insts = vec![instance(&["EU"]), instance(&["Peter", "Blackburn"])];
        let err = load_context_embeddings(&path, &mut insts).await.unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::RowMismatch {
                index: 1,
                words: 2,
                rows: 1
            }
        ));
    }

    #[tokio::test]
    async fn failed_loads_leave_the_instances_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.emb.json");
        tokio::fs::write(&path, "[[[1, 2]], [[3, 4]]]").await.unwrap();

        let mut insts = vec![instance(&["EU"]), instance(&["Peter", "Blackburn"])];
        assert!(load_context_embeddings(&path, &mut insts).await.is_err());

        assert!(insts.iter().all(|inst| inst.context_emb.is_none()));
    }

    #[tokio::test]
    async fn malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.emb.json");
        tokio::fs::write(&path, "{\"not\": \"a list\"}").await.unwrap();

        let mut insts = vec![instance(&["EU"])];

        assert!(matches!(
            load_context_embeddings(&path, &mut insts).await,
            Err(EmbeddingError::Format(_))
        ));
        assert!(matches!(
            load_context_embeddings(dir.path().join("missing.json"), &mut insts).await,
            Err(EmbeddingError::Io(_))
        ));
    }

    #[tokio::test]
    async fn saved_embeddings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.emb.json");

        let mut insts = vec![instance(&["EU", "rejects"]), instance(&["Peter"])];
        insts[0].context_emb =
            Some(ContextEmbedding::from_rows(vec![vec![0.5, 1.5], vec![2.5, 3.5]]).unwrap());
        insts[1].context_emb = Some(ContextEmbedding::from_rows(vec![vec![4.5, 5.5]]).unwrap());
        save_context_embeddings(&path, &insts).await.unwrap();

        let mut loaded = vec![instance(&["EU", "rejects"]), instance(&["Peter"])];
        let size = load_context_embeddings(&path, &mut loaded).await.unwrap();

        assert_eq!(size, 2);
        assert_eq!(loaded, insts);
    }
}
