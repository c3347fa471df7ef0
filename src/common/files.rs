//! Small file helpers used around package installs.

use anyhow::{Context, Result, bail};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Latin1,
}

fn decode(bytes: Vec<u8>) -> (String, Encoding) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, Encoding::Utf8),
        // Every byte is a valid Latin-1 code point.
        Err(err) => (
            err.into_bytes().iter().map(|&b| b as char).collect(),
            Encoding::Latin1,
        ),
    }
}

fn encode(text: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
        Encoding::Latin1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).ok())
            .collect::<Option<Vec<u8>>>()
            .context("text cannot be represented in Latin-1"),
    }
}

fn read_decoded(path: &Path) -> Result<(String, Encoding)> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(decode(bytes))
}

/// Read a text file, falling back to Latin-1 when it is not valid UTF-8.
pub fn load(path: &Path) -> Result<String> {
    Ok(read_decoded(path)?.0)
}

/// Write `content` as UTF-8, creating parent directories.
pub fn save(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))
}

/// Replace every occurrence of `search`, keeping the file's encoding.
///
/// Returns whether anything was replaced. With `strict`, a missing pattern
/// is an error and the file is left untouched.
pub fn replace_in_file(path: &Path, search: &str, replace: &str, strict: bool) -> Result<bool> {
    let (content, encoding) = read_decoded(path)?;
    if !content.contains(search) {
        if strict {
            bail!(
                "replace_in_file didn't find pattern '{}' in '{}' file.",
                search,
                path.display()
            );
        }
        return Ok(false);
    }

    let replaced = content.replace(search, replace);
    let bytes = encode(&replaced, encoding)
        .with_context(|| format!("re-encoding {}", path.display()))?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}

/// Lowercase hex SHA-256 of a file's contents.
fn digest_file<D: Digest + std::io::Write>(path: &Path) -> Result<String>
where
    sha2::digest::Output<D>: std::fmt::LowerHex,
{
    let mut file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = D::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("hashing {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn check_digest(algorithm: &str, path: &Path, actual: String, expected: &str) -> Result<()> {
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        bail!(
            "{} mismatch for {}: expected {}, got {}",
            algorithm,
            path.display(),
            expected.trim(),
            actual
        );
    }
    Ok(())
}

pub fn sha256_file(path: &Path) -> Result<String> {
    digest_file::<Sha256>(path)
}

pub fn check_sha256(path: &Path, expected: &str) -> Result<()> {
    check_digest("sha256", path, sha256_file(path)?, expected)
}

/// Only for matching checksums published by upstreams that still use MD5.
pub fn md5_file(path: &Path) -> Result<String> {
    digest_file::<Md5>(path)
}

pub fn check_md5(path: &Path, expected: &str) -> Result<()> {
    check_digest("md5", path, md5_file(path)?, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_parents_and_load_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.txt");
        save(&path, "hello ünïcode").unwrap();
        assert_eq!(load(&path).unwrap(), "hello ünïcode");
    }

    #[test]
    fn test_replace_in_utf8_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        save(&path, "Hello World, Jânis§").unwrap();

        assert!(replace_in_file(&path, "World", "There", true).unwrap());
        assert_eq!(load(&path).unwrap(), "Hello There, Jânis§");
    }

    #[test]
    fn test_replace_in_latin1_file_keeps_encoding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.txt");
        // "Jânis§" in Latin-1
        fs::write(&path, b"name: J\xe2nis\xa7\n").unwrap();

        assert_eq!(load(&path).unwrap(), "name: Jânis§\n");
        replace_in_file(&path, "Jânis", "Jânis Doe", true).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"name: J\xe2nis Doe\xa7\n");
    }

    #[test]
    fn test_strict_miss_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        save(&path, "nothing here").unwrap();

        let err = replace_in_file(&path, "absent", "x", true).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("replace_in_file didn't find pattern 'absent' in '")
        );
        assert!(!replace_in_file(&path, "absent", "x", false).unwrap());
        assert_eq!(load(&path).unwrap(), "nothing here");
    }

    #[test]
    fn test_sha256() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        save(&path, "abc").unwrap();
        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(sha256_file(&path).unwrap(), digest);
        check_sha256(&path, &digest.to_uppercase()).unwrap();

        let err = check_sha256(&path, "deadbeef").unwrap_err();
        assert!(err.to_string().contains("deadbeef"));
        assert!(err.to_string().contains(digest));
    }

    #[test]
    fn test_md5() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        save(&path, "abc").unwrap();
        let digest = "900150983cd24fb0d6963f7d28e17f72";
        assert_eq!(md5_file(&path).unwrap(), digest);
        check_md5(&path, &format!(" {} ", digest.to_uppercase())).unwrap();

        let err = check_md5(&path, "deadbeef").unwrap_err();
        assert!(err.to_string().starts_with("md5 mismatch"));
        assert!(err.to_string().contains(digest));
    }
}
