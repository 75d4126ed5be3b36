use std::{fmt::Write as _, path::Path};

use anyhow::Context;
use derive_new::new;

use crate::{utils::files, Instance};

/// One token of a prediction file
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct ResultRow {
    /// Position of the word in its sentence
    pub index: usize,

    /// The original word
    pub word: String,

    /// The gold label
    pub gold: String,

    /// The predicted label
    pub predicted: String,
}

/// Write the predictions as one `index\tword\tgold\tpredicted` line per word, with a blank line
/// after each sentence.
///
/// Every instance needs gold labels and predictions of the same length as its sentence.
pub async fn write_results(path: impl AsRef<Path>, insts: &[Instance]) -> anyhow::Result<()> {
    let mut contents = String::new();

    for (inst_idx, inst) in insts.iter().enumerate() {
        let words = &inst.input.ori_words;
        let output = inst
            .output
            .as_deref()
            .ok_or_else(|| anyhow!("instance {} has no gold labels", inst_idx))?;
        let prediction = inst
            .prediction
            .as_deref()
            .ok_or_else(|| anyhow!("instance {} has no predictions", inst_idx))?;

        ensure!(
            output.len() == prediction.len(),
            "instance {} has {} gold labels but {} predictions",
            inst_idx,
            output.len(),
            prediction.len()
        );
        ensure!(
            output.len() == words.len(),
            "instance {} has {} gold labels for {} words",
            inst_idx,
            output.len(),
            words.len()
        );

        for (i, ((word, gold), predicted)) in words.iter().zip(output).zip(prediction).enumerate() {
            writeln!(contents, "{}\t{}\t{}\t{}", i, word, gold, predicted)?;
        }
        contents.push('\n');
    }

    let path = path.as_ref();
    files::write_file(path, &contents)
        .await
        .with_context(|| format!("Unable to write results to {}", path.display()))
}

/// Read a file written by [`write_results`], returning the rows of each sentence
pub async fn read_results(path: impl AsRef<Path>) -> anyhow::Result<Vec<Vec<ResultRow>>> {
    let path = path.as_ref();
    let lines = files::read_file(path)
        .await
        .with_context(|| format!("Unable to read results from {}", path.display()))?;

    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for (line_no, line) in lines.iter().enumerate() {
        if line.is_empty() {
            sentences.push(std::mem::take(&mut current));
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        let [index, word, gold, predicted] = columns[..] else {
            bail!(
                "line {}: expected 4 tab-separated columns, found {}",
                line_no + 1,
                columns.len()
            );
        };

        let index = index
            .parse()
            .with_context(|| format!("line {}: invalid index {:?}", line_no + 1, index))?;

        current.push(ResultRow::new(
            index,
            word.to_string(),
            gold.to_string(),
            predicted.to_string(),
        ));
    }

    // Tolerate a missing blank line after the last sentence
    if !current.is_empty() {
        sentences.push(current);
    }

    Ok(sentences)
}
