use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

#[derive(Debug)]
pub(crate) struct ContentIoError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl ContentIoError {
    fn at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One content XML file. `rel_path` uses `/` separators on every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlSource {
    pub rel_path: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlInputHash {
    pub xml_file_count: usize,
    pub hash_hex: String,
}

/// Stable identity for a level's text, stored in saves so a continue can detect an edited level.
pub fn fingerprint_level_text(text: &str) -> String {
    let digest = Sha256::digest(text.replace("\r\n", "\n").as_bytes());
    format!("{digest:x}")
}

/// Hashes relative paths and bytes of every content XML file, so renames count as edits.
pub(crate) fn hash_xml_inputs(content_dir: &Path) -> Result<XmlInputHash, ContentIoError> {
    let sources = collect_xml_files_sorted(content_dir)?;
    let mut hasher = Sha256::new();
    for source in &sources {
        let bytes = fs::read(&source.path).map_err(ContentIoError::at(&source.path))?;
        hasher.update(source.rel_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
    }
    Ok(XmlInputHash {
        xml_file_count: sources.len(),
        hash_hex: format!("{:x}", hasher.finalize()),
    })
}

pub(crate) fn collect_xml_files_sorted(root: &Path) -> Result<Vec<XmlSource>, ContentIoError> {
    let mut sources = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).map_err(ContentIoError::at(&dir))? {
            let path = entry.map_err(ContentIoError::at(&dir))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if has_xml_extension(&path) {
                if let Some(rel_path) = slash_relative(root, &path) {
                    sources.push(XmlSource { rel_path, path });
                }
            }
        }
    }
    sources.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(sources)
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn slash_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}
