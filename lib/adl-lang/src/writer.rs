//! Idempotent output file writer.
//!
//! Writes are atomic (write to a temp file, then rename) and optionally
//! suppressed when the target already holds byte-identical content, so a
//! re-run over unchanged inputs leaves the output tree untouched. Every
//! write is recorded in an in-memory manifest of `<path> <sha256>` lines,
//! flushed on [`FileWriter::close`].

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{CompileError, Result};

pub struct FileWriter {
    root: PathBuf,
    no_overwrite: bool,
    manifest_path: Option<PathBuf>,
    manifest: Vec<(String, String)>,
}

impl FileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            no_overwrite: false,
            manifest_path: None,
            manifest: Vec::new(),
        }
    }

    /// Skip writes whose target already has identical contents.
    pub fn with_no_overwrite(mut self, enabled: bool) -> Self {
        self.no_overwrite = enabled;
        self
    }

    /// Flush the manifest to this file on close.
    pub fn with_manifest(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_path = path;
        self
    }

    /// Write `bytes` at `rel_path` under the output root, creating parent
    /// directories as needed. Returns false when the write was skipped
    /// because the file was already up to date.
    pub fn write(&mut self, rel_path: &Path, bytes: &[u8]) -> Result<bool> {
        let target = self.root.join(rel_path);
        let io_err = |path: &Path, e: std::io::Error| CompileError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let digest = sha256_hex(bytes);
        self.manifest
            .push((rel_path.display().to_string(), digest));

        if self.no_overwrite {
            if let Ok(existing) = fs::read(&target) {
                if existing == bytes {
                    return Ok(false);
                }
            }
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let temp = temp_path(&target);
        fs::write(&temp, bytes).map_err(|e| io_err(&temp, e))?;
        fs::rename(&temp, &target).map_err(|e| io_err(&target, e))?;
        Ok(true)
    }

    /// Flush the manifest, if one was configured.
    pub fn close(self) -> Result<()> {
        let Some(path) = self.manifest_path else {
            return Ok(());
        };
        let mut out = String::new();
        for (file, digest) in &self.manifest {
            out.push_str(file);
            out.push(' ');
            out.push_str(digest);
            out.push('\n');
        }
        let temp = temp_path(&path);
        let io_err = |p: &Path, e: std::io::Error| CompileError::Io {
            path: p.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }
        fs::write(&temp, out.as_bytes()).map_err(|e| io_err(&temp, e))?;
        fs::rename(&temp, &path).map_err(|e| io_err(&path, e))?;
        Ok(())
    }

    /// Manifest entries recorded so far.
    pub fn manifest(&self) -> &[(String, String)] {
        &self.manifest
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
