//! ZIP-packed ROM extraction.
//!
//! Only store and deflate entries are supported; encrypted entries are
//! rejected. Extraction happens to a temp directory so cores that require a
//! real path (`need_fullpath`) can open the file themselves.

use crate::error::ArchiveError;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::ZipArchive;

fn io_err(path: &Path, source: io::Error) -> ArchiveError {
    ArchiveError::Io { path: path.display().to_string(), source }
}

fn zip_err(path: &Path, source: zip::result::ZipError) -> ArchiveError {
    ArchiveError::Zip { path: path.display().to_string(), source }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name).extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Find the first entry with a supported extension. Returns the entry name.
fn first_supported_entry<R: Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    supported_extensions: &[String],
) -> Option<String> {
    archive
        .file_names()
        .find(|name| {
            extension_of(name).is_some_and(|ext| supported_extensions.iter().any(|s| *s == ext))
        })
        .map(String::from)
}

/// Extracted ROM: the temp file location plus the directory to clean up.
#[derive(Debug)]
pub struct ExtractedRom {
    pub path: PathBuf,
    pub temp_dir: PathBuf,
}

/// Extract the first supported entry in `zip_path` into a fresh temp
/// directory.
pub fn extract_first_supported(
    zip_path: &Path,
    supported_extensions: &[String],
) -> Result<ExtractedRom, ArchiveError> {
    let file = File::open(zip_path).map_err(|source| io_err(zip_path, source))?;
    let reader = BufReader::new(file);
    let mut archive = ZipArchive::new(reader).map_err(|source| zip_err(zip_path, source))?;

    let Some(entry_name) = first_supported_entry(&mut archive, supported_extensions) else {
        return Err(ArchiveError::NoSupportedFiles { path: zip_path.display().to_string() });
    };

    let mut entry = archive.by_name(&entry_name).map_err(|source| zip_err(zip_path, source))?;

    if entry.encrypted() {
        return Err(ArchiveError::Encrypted {
            path: zip_path.display().to_string(),
            name: entry_name,
        });
    }
    match entry.compression() {
        CompressionMethod::Stored | CompressionMethod::Deflated => {}
        other => {
            log::error!("Unsupported compression method {other:?} for '{entry_name}'");
            return Err(ArchiveError::NoSupportedFiles { path: zip_path.display().to_string() });
        }
    }

    let file_name = Path::new(&entry_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rom".to_string());

    let temp_dir = std::env::temp_dir().join(format!("minarch-{}", std::process::id()));
    std::fs::create_dir_all(&temp_dir).map_err(|source| io_err(&temp_dir, source))?;
    let out_path = temp_dir.join(file_name);

    let mut out = File::create(&out_path).map_err(|source| io_err(&out_path, source))?;
    io::copy(&mut entry, &mut out).map_err(|source| io_err(&out_path, source))?;

    log::info!("Extracted '{entry_name}' to '{}'", out_path.display());
    Ok(ExtractedRom { path: out_path, temp_dir })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    struct TempZip(PathBuf);

    impl Drop for TempZip {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn write_zip(name: &str, entries: &[(&str, &[u8])]) -> TempZip {
        let path = std::env::temp_dir().join(format!("minarch-ziptest-{}-{name}", std::process::id()));
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (entry_name, data) in entries {
            writer.start_file(*entry_name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
        TempZip(path)
    }

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn extracts_first_supported_entry() {
        let zip = write_zip("basic.zip", &[("readme.txt", b"hi"), ("game.gba", b"GBAROM")]);
        let extracted = extract_first_supported(&zip.0, &exts(&["gba"])).unwrap();

        assert_eq!(std::fs::read(&extracted.path).unwrap(), b"GBAROM");
        let _ = std::fs::remove_dir_all(&extracted.temp_dir);
    }

    #[test]
    fn rejects_archive_without_supported_entries() {
        let zip = write_zip("nosupport.zip", &[("notes.txt", b"nope")]);
        let err = extract_first_supported(&zip.0, &exts(&["gba", "gb"])).unwrap_err();
        assert!(matches!(err, ArchiveError::NoSupportedFiles { .. }));
    }

    #[test]
    fn extension_matching_is_case_insensitive() {
        let zip = write_zip("case.zip", &[("GAME.GBA", b"ROM")]);
        let extracted = extract_first_supported(&zip.0, &exts(&["gba"])).unwrap();
        assert_eq!(std::fs::read(&extracted.path).unwrap(), b"ROM");
        let _ = std::fs::remove_dir_all(&extracted.temp_dir);
    }
}
