//! Filesystem plumbing around downloads: directory setup, rename-into-place,
//! multi-part concatenation and archive extraction.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;
use zip::read::ZipArchive;

use crate::error::FetchError;

pub fn make_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

pub fn remove_dir(path: &Path) -> io::Result<()> {
    fs::remove_dir_all(path)
}

/// Renames `from` into place at `to`. Atomic on the same filesystem, which
/// is what finished downloads rely on.
pub fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

/// Concatenates multi-part downloads into `target`, in the order given.
pub fn cat(parts: &[impl AsRef<Path>], target: &Path) -> io::Result<()> {
    let mut out = File::create(target)?;
    let mut buffer = vec![0u8; 32 * 1024];
    for part in parts {
        let mut file = File::open(part.as_ref())?;
        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            out.write_all(&buffer[..read])?;
        }
    }
    Ok(())
}

/// Unpacks a `.tar.gz` archive next to itself, optionally deleting the
/// archive afterwards.
pub fn untar(path: &Path, delete: bool) -> Result<(), FetchError> {
    let dir = parent_dir(path)?;
    debug!(path = %path.display(), "unpacking tar archive");
    let file = File::open(path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(dir)?;
    if delete {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Unpacks a `.zip` archive next to itself, optionally deleting the archive
/// afterwards.
pub fn unzip(path: &Path, delete: bool) -> Result<(), FetchError> {
    let dir = parent_dir(path)?.to_owned();
    debug!(path = %path.display(), "unpacking zip archive");
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(&dir)?;
    if delete {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn parent_dir(path: &Path) -> Result<&Path, FetchError> {
    path.parent()
        .ok_or_else(|| FetchError::NoParentDir(path.to_owned()))
}
