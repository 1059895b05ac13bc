use anyhow::{bail, Result};
use phrasedex_core::{DocId, Error, InvertedIndex};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub indexed: usize,
    pub skipped: usize,
}

/// Files under `input` in depth-first order, siblings sorted by name.
/// A plain file yields itself.
pub fn collect_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        match entry {
            Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "skipping unreadable directory entry"),
        }
    }
    files
}

/// Add or update every file under `input`. A file that cannot be read is
/// logged and skipped so the rest of the corpus still gets indexed.
pub fn index_corpus(index: &mut InvertedIndex, input: &Path) -> Result<BuildSummary> {
    if !input.exists() {
        bail!("cannot read input path {}", input.display());
    }
    Ok(index_files(index, collect_files(input)))
}

/// Add or update each of `files` in order, skipping the ones that fail.
pub fn index_files<I>(index: &mut InvertedIndex, files: I) -> BuildSummary
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut summary = BuildSummary::default();
    for file in files {
        let path = file.to_string_lossy().into_owned();
        match index_file(index, &path, &file) {
            Ok(doc_id) => {
                tracing::info!(doc_id, path = %path, "adding");
                summary.indexed += 1;
            }
            Err(err) => {
                tracing::warn!(%err, "skipping document");
                summary.skipped += 1;
            }
        }
    }
    summary
}

fn index_file(index: &mut InvertedIndex, path: &str, file: &Path) -> phrasedex_core::Result<DocId> {
    let reader = File::open(file).map_err(|e| Error::io(file, e))?;
    index.index_reader(path, BufReader::new(reader))
}
