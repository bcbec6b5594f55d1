//! In-place gzip compression of a finished artifact.

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use gem_types::ArtifactPath;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Compress `path` into `path.gz` and remove the original. Returns the
/// compressed path.
pub fn gzip(path: &Path) -> Result<PathBuf> {
    let target = path.appended("gz");
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("opening {}", path.display()))?,
    );
    let writer = BufWriter::new(
        File::create(&target).with_context(|| format!("creating {}", target.display()))?,
    );
    let mut encoder = GzEncoder::new(writer, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder
        .finish()
        .with_context(|| format!("compressing {}", path.display()))?;
    std::fs::remove_file(path)
        .with_context(|| format!("removing uncompressed {}", path.display()))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::MultiGzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_replaces_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.map");
        std::fs::write(&path, "read1\t0\t100\n").unwrap();

        let compressed = gzip(&path).unwrap();
        assert_eq!(compressed, dir.path().join("sample.map.gz"));
        assert!(!path.exists());

        let mut decoder = MultiGzDecoder::new(File::open(&compressed).unwrap());
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "read1\t0\t100\n");
    }

    #[test]
    fn test_gzip_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(gzip(&dir.path().join("absent.map")).is_err());
    }
}
