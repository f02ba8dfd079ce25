use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{DocumentId, Domain};

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "eml"];
const BINARY_EXTENSIONS: &[&str] = &["pdf", "docx", "doc"];

/// Extracted text ready for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub id: DocumentId,
    pub domain: Domain,
    pub path: PathBuf,
    pub text: String,
}

#[derive(Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Walks `root` and loads every supported file. One failure does not stop the walk.
    pub fn load_directory(&self, root: &Path) -> Vec<(PathBuf, Result<LoadedDocument>)> {
        let files = self.list_files(root);
        if files.is_empty() {
            info!(dir = %root.display(), "no loadable files found");
            return vec![];
        }
        let out: Vec<_> = files
            .into_iter()
            .map(|path| {
                let loaded = self.load_file(root, &path);
                if let Err(e) = &loaded {
                    warn!(path = %path.display(), error = %e, "skipping file");
                }
                (path, loaded)
            })
            .collect();
        info!(dir = %root.display(), files = out.len(), "loaded directory");
        out
    }

    /// Loads one file. `root` is used to read a domain from the parent directory.
    pub fn load_file(&self, root: &Path, path: &Path) -> Result<LoadedDocument> {
        let ext = extension(path);
        if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::UnsupportedFormat(format!(
                "{}: .{ext} needs upstream text extraction",
                path.display()
            )));
        }
        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::UnsupportedFormat(format!("{}: unknown extension", path.display())));
        }

        let raw = read_file_content(path)?;
        let text = if ext == "eml" { strip_mail_headers(&raw).to_string() } else { raw };
        let id = document_id(root, path);
        let domain = domain_from_path(root, path).unwrap_or_else(|| Domain::detect(&text));
        debug!(document_id = %id, domain = %domain, bytes = text.len(), "loaded file");
        Ok(LoadedDocument { id, domain, path: path.to_path_buf(), text })
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                let ext = extension(p);
                TEXT_EXTENSIONS.contains(&ext.as_str()) || BINARY_EXTENSIONS.contains(&ext.as_str())
            })
            .collect();
        files.sort();
        files
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => {
            let bytes = fs::read(path)
                .map_err(|e| Error::Operation(format!("read {}: {e}", path.display())))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }
}

/// Body of an RFC-822 style message: everything after the first blank line.
fn strip_mail_headers(raw: &str) -> &str {
    let normalized_break = raw.find("\r\n\r\n").map(|i| i + 4);
    let unix_break = raw.find("\n\n").map(|i| i + 2);
    match (normalized_break, unix_break) {
        (Some(a), Some(b)) => &raw[a.min(b)..],
        (Some(a), None) => &raw[a..],
        (None, Some(b)) => &raw[b..],
        (None, None) => raw,
    }
}

/// Path of `path` relative to `root`, `/`-separated and with its extension, so
/// `insurance/policy.txt` and `hr/policy.md` stay distinct documents.
pub fn document_id(root: &Path, path: &Path) -> DocumentId {
    let relative = match path.strip_prefix(root) {
        Ok(r) if !r.as_os_str().is_empty() => r,
        // a single file walked as its own root
        _ => path.file_name().map(Path::new).unwrap_or(path),
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Domain named by the file's parent directory, if it names one.
pub fn domain_from_path(root: &Path, path: &Path) -> Option<Domain> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(|n| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_keep_directory_and_extension() {
        let root = Path::new("/corpus");
        assert_eq!(document_id(root, &root.join("insurance").join("policy.txt")), "insurance/policy.txt");
        assert_eq!(document_id(root, &root.join("hr").join("policy.md")), "hr/policy.md");
        let single = root.join("notes.txt");
        assert_eq!(document_id(&single, &single), "notes.txt");
        assert_eq!(domain_from_path(root, &root.join("hr").join("policy.md")), Some(Domain::Hr));
        assert_eq!(domain_from_path(root, &root.join("policy.md")), None);
    }

    #[test]
    fn mail_headers_are_dropped() {
        let raw = "From: a@b.c\nSubject: hi\n\nBody line.\n\nSecond.";
        assert_eq!(strip_mail_headers(raw), "Body line.\n\nSecond.");
        assert_eq!(strip_mail_headers("no headers"), "no headers");
    }
}
