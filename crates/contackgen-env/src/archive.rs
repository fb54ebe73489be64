//! Capture file extraction from a runtime archive stream

use crate::error::ArchiveError;
use std::io::Read;
use std::path::Path;

/// Extract exactly one file from a tar stream
///
/// The entry is matched on its final path component, so archives rooted at
/// `capture.pcap` or `data/capture.pcap` both work. Everything else in the
/// archive is ignored. The destination's parent directory must already
/// exist; it is never created.
///
/// # Errors
/// - `ArchiveError::MissingDirectory` if the destination directory is absent
/// - `ArchiveError::EntryMissing` if no entry carries `file_name`
/// - `ArchiveError::Io` if the stream is not a readable tar archive
pub fn extract_file<R: Read>(
    archive: R,
    file_name: &str,
    destination: &Path,
) -> Result<u64, ArchiveError> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.is_dir() {
        return Err(ArchiveError::MissingDirectory(parent.to_path_buf()));
    }

    let mut archive = tar::Archive::new(archive);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let matches = {
            let path = entry.path()?;
            entry.header().entry_type().is_file()
                && path.file_name().is_some_and(|name| name == file_name)
        };
        if !matches {
            continue;
        }

        let size = entry.size();
        entry.unpack(destination)?;
        tracing::debug!(
            destination = %destination.display(),
            bytes = size,
            "capture file extracted"
        );
        return Ok(size);
    }

    Err(ArchiveError::EntryMissing(file_name.to_string()))
}

/// Final path component of a container-internal path
#[must_use]
pub fn internal_file_name(internal_path: &str) -> &str {
    internal_path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(internal_path)
}
