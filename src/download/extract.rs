//! Archive extraction. Each published archive holds one member whose name
//! follows from the archive's own name; it is streamed to a file beside the
//! archive.

use crate::census::member_name;
use crate::{Result, ZctaError};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

pub fn extract_member(archive: &Path) -> Result<ExtractedFile> {
    let corrupt = |detail: String| ZctaError::CorruptArchive(format!("{}: {}", archive.display(), detail));

    let archive_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| corrupt("archive has no usable filename".to_string()))?;
    let member = member_name(archive_name)
        .ok_or_else(|| corrupt("not a .zip archive name".to_string()))?;

    let file = File::open(archive).map_err(|e| corrupt(e.to_string()))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))?;
    let mut entry = zip
        .by_name(&member)
        .map_err(|e| corrupt(format!("member {}: {}", member, e)))?;

    let dest = archive.with_file_name(&member);
    let copied = (|| -> io::Result<u64> {
        let mut writer = BufWriter::new(File::create(&dest)?);
        let bytes = io::copy(&mut entry, &mut writer)?;
        writer.flush()?;
        Ok(bytes)
    })();

    match copied {
        Ok(bytes) => {
            debug!("Extracted {} ({} bytes)", dest.display(), bytes);
            Ok(ExtractedFile { path: dest, bytes })
        }
        Err(e) => {
            fs::remove_file(&dest).ok();
            // Decompression failures surface as I/O errors from the entry reader
            Err(match e.kind() {
                io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof | io::ErrorKind::Other => {
                    corrupt(format!("member {}: {}", member, e))
                }
                _ => ZctaError::Io(e),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, member: &str, content: &[u8]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        zip.start_file(member, FileOptions::default()).unwrap();
        zip.write_all(content).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_extracts_derived_member_beside_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("algeo_uf1.zip");
        write_zip(&archive, "algeo.uf1", b"uSF1  AL040\n");

        let extracted = extract_member(&archive).unwrap();
        assert_eq!(extracted.path, dir.path().join("algeo.uf1"));
        assert_eq!(extracted.bytes, 12);
        assert_eq!(fs::read(&extracted.path).unwrap(), b"uSF1  AL040\n");
    }

    #[test]
    fn test_missing_member_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("al00002_uf1.zip");
        write_zip(&archive, "something_else.txt", b"x");

        match extract_member(&archive) {
            Err(ZctaError::CorruptArchive(msg)) => assert!(msg.contains("al00002.uf1")),
            other => panic!("Expected CorruptArchive, got {:?}", other),
        }
        assert!(!dir.path().join("al00002.uf1").exists());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("akgeo_uf1.zip");
        fs::write(&archive, b"this is not a zip file").unwrap();
        assert!(matches!(extract_member(&archive), Err(ZctaError::CorruptArchive(_))));
    }

    #[test]
    fn test_absent_archive_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            extract_member(&dir.path().join("azgeo_uf1.zip")),
            Err(ZctaError::CorruptArchive(_))
        ));
    }
}
