pub mod crossref_export;
pub mod json_export;
pub mod markdown_export;
pub mod word_export;

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::assemble::ConversionOutput;
use crate::core::error::AssemblyError;

pub use crossref_export::CrossRefExporter;
pub use json_export::JsonExporter;
pub use markdown_export::MarkdownExporter;
pub use word_export::WordExporter;

pub trait Exporter {
    fn export(&self, output: &ConversionOutput) -> Result<(), AssemblyError>;
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), AssemblyError> {
    fs::create_dir_all(dir).map_err(|source| AssemblyError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes next to the target and renames into place, so readers never see a
/// half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), AssemblyError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let write_err = |source| AssemblyError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, contents).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        write_err(source)
    })
}

pub(crate) fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
    what: &'static str,
) -> Result<(), AssemblyError> {
    let data = serde_json::to_string_pretty(value)
        .map_err(|source| AssemblyError::Serialize { what, source })?;
    write_atomic(path, data.as_bytes())
}
