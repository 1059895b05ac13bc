use crate::error::{Error, Result};
use crate::index::{InvertedIndex, Segment};
use crate::tokenizer::{Analyzer, AnalyzerConfig};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_live_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn segment(&self) -> PathBuf { self.root.join("segment.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    pub fn exists(&self) -> bool {
        self.meta().is_file() && self.segment().is_file()
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path).map_err(|e| Error::io(path, e))?;
    f.write_all(bytes).map_err(|e| Error::io(path, e))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| Error::io(path, e))?;
    Ok(buf)
}

/// Write the segment and its metadata. `created_at` is recorded verbatim.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, created_at: &str) -> Result<MetaFile> {
    create_dir_all(&paths.root).map_err(|e| Error::io(&paths.root, e))?;
    let bytes = bincode::serialize(index.segment())?;
    write_file(&paths.segment(), &bytes)?;

    let meta = MetaFile {
        num_docs: index.num_docs() as u32,
        num_live_docs: index.num_live_docs() as u32,
        num_terms: index.num_terms() as u32,
        created_at: created_at.to_string(),
        version: FORMAT_VERSION,
        analyzer: index.analyzer().config().clone(),
    };
    let json = serde_json::to_string_pretty(&meta)?;
    write_file(&paths.meta(), json.as_bytes())?;
    Ok(meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let buf = read_file(&paths.meta())?;
    let meta: MetaFile = serde_json::from_slice(&buf)?;
    if meta.version > FORMAT_VERSION {
        return Err(Error::Version { found: meta.version, supported: FORMAT_VERSION });
    }
    Ok(meta)
}

/// Load a saved index, restoring the analyzer it was built with.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    let buf = read_file(&paths.segment())?;
    let segment: Segment = bincode::deserialize(&buf)?;
    Ok(InvertedIndex::from_parts(segment, Analyzer::new(meta.analyzer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::PhraseQuery;
    use crate::search::phrase_matches;
    use tempfile::tempdir;

    #[test]
    fn save_and_reload() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("idx"));
        assert!(!paths.exists());

        let analyzer = Analyzer::new(AnalyzerConfig { stopwords: true, ..Default::default() });
        let mut index = InvertedIndex::with_analyzer(analyzer.clone());
        index.index_reader("a", "The French fries".as_bytes()).unwrap();
        index.index_reader("b", "hamburger".as_bytes()).unwrap();
        index.index_reader("a", "french fries again".as_bytes()).unwrap();

        let meta = save_index(&paths, &index, "2024-01-01T00:00:00Z").unwrap();
        assert_eq!((meta.num_docs, meta.num_live_docs), (3, 2));
        assert!(paths.exists());

        let loaded = load_index(&paths).unwrap();
        assert_eq!(loaded.analyzer(), &analyzer);
        let snap = loaded.open_snapshot();
        assert!(!snap.is_live(0));
        assert_eq!(snap.doc_frequency("french"), 1);
        assert_eq!(phrase_matches(&snap, &PhraseQuery::new(["french", "fries"])), vec![2]);
        assert_eq!(load_meta(&paths).unwrap(), meta);
    }

    #[test]
    fn rejects_newer_format() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &InvertedIndex::new(), "now").unwrap();
        let mut meta = load_meta(&paths).unwrap();
        meta.version = FORMAT_VERSION + 1;
        std::fs::write(dir.path().join("meta.json"), serde_json::to_vec(&meta).unwrap()).unwrap();
        assert!(matches!(load_index(&paths), Err(Error::Version { .. })));
    }

    #[test]
    fn missing_index_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(load_index(&IndexPaths::new(dir.path())), Err(Error::Io { .. })));
    }
}
