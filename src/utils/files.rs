use std::path::Path;

use tokio::{
    fs::File,
    io::{self, AsyncBufReadExt, AsyncWriteExt, Lines},
};

/// Read a file from the given path into a list of strings
pub async fn read_file(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let mut r = file_reader(path).await?;
    let mut lines = Vec::new();

    while let Some(line) = r.next_line().await? {
        lines.push(line);
    }

    Ok(lines)
}

/// Write the given contents to a file, replacing anything already there
pub async fn write_file(path: impl AsRef<Path>, contents: &str) -> io::Result<()> {
    let f = File::create(path).await?;
    let mut w = io::BufWriter::new(f);

    w.write_all(contents.as_bytes()).await?;
    w.flush().await
}

async fn file_reader(path: impl AsRef<Path>) -> io::Result<Lines<io::BufReader<File>>> {
    let f = File::open(path).await?;

    Ok(io::BufReader::new(f).lines())
}
