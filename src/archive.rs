// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Song archives are zip files holding `Song.xml` and a `SampleData/` tree.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

/// The song metadata file at the root of every archive.
pub const SONG_XML: &str = "Song.xml";

/// The directory holding the instruments' sample files.
pub const SAMPLE_DATA_DIR: &str = "SampleData";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to read archive {path}: {source}")]
    Zip {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> ArchiveError {
        ArchiveError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn zip(path: &Path, source: zip::result::ZipError) -> ArchiveError {
        ArchiveError::Zip {
            path: path.display().to_string(),
            source,
        }
    }
}

fn open(archive: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(archive).map_err(|e| ArchiveError::io(archive, e))?;
    ZipArchive::new(file).map_err(|e| ArchiveError::zip(archive, e))
}

/// Unpacks every entry of `archive` below `dest` and returns the files written.
///
/// Entries with absolute names or names that climb out of `dest` are skipped.
pub fn extract(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut zip = open(archive)?;
    let mut extracted = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| ArchiveError::zip(archive, e))?;
        let enclosed = match entry.enclosed_name() {
            Some(name) => name.to_owned(),
            None => {
                warn!(entry = entry.name(), "Skipping archive entry outside of the destination");
                continue;
            }
        };
        if enclosed.is_absolute()
            || enclosed
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            warn!(entry = entry.name(), "Skipping archive entry outside of the destination");
            continue;
        }

        let outpath = dest.join(enclosed);
        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| ArchiveError::io(&outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let mut outfile = File::create(&outpath).map_err(|e| ArchiveError::io(&outpath, e))?;
        io::copy(&mut entry, &mut outfile).map_err(|e| ArchiveError::io(&outpath, e))?;

        debug!(path = ?outpath, "Extracted");
        extracted.push(outpath);
    }

    Ok(extracted)
}

/// Reads a single UTF-8 entry, such as `Song.xml`, without extracting the archive.
pub fn read_entry_to_string(archive: &Path, name: &str) -> Result<String, ArchiveError> {
    let mut zip = open(archive)?;
    let mut entry = zip.by_name(name).map_err(|e| ArchiveError::zip(archive, e))?;

    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|e| ArchiveError::io(archive, e))?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::testutil::write_zip;

    #[test]
    fn test_extract() {
        let tempdir = tempdir().unwrap();
        let archive = tempdir.path().join("song.xrns");
        write_zip(
            &archive,
            &[
                ("Song.xml", b"<RenoiseSong/>".to_vec()),
                ("SampleData/Instrument00 (Pad)/Sample00 (C3).flac", b"fLaC".to_vec()),
            ],
        )
        .unwrap();

        let dest = tempdir.path().join("work");
        let extracted = extract(&archive, &dest).unwrap();

        assert_eq!(extracted.len(), 2);
        assert_eq!(fs::read(dest.join(SONG_XML)).unwrap(), b"<RenoiseSong/>");
        assert_eq!(
            fs::read(
                dest.join(SAMPLE_DATA_DIR)
                    .join("Instrument00 (Pad)")
                    .join("Sample00 (C3).flac")
            )
            .unwrap(),
            b"fLaC"
        );
    }

    #[test]
    fn test_extract_skips_escaping_entries() {
        let tempdir = tempdir().unwrap();
        let archive = tempdir.path().join("evil.xrns");
        write_zip(
            &archive,
            &[("../escape.txt", b"nope".to_vec()), ("ok.txt", b"yes".to_vec())],
        )
        .unwrap();

        let dest = tempdir.path().join("work");
        let extracted = extract(&archive, &dest).unwrap();

        assert_eq!(extracted, vec![dest.join("ok.txt")]);
        assert!(!tempdir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_read_entry_to_string() {
        let tempdir = tempdir().unwrap();
        let archive = tempdir.path().join("song.xrns");
        write_zip(&archive, &[("Song.xml", b"<RenoiseSong/>".to_vec())]).unwrap();

        assert_eq!(
            read_entry_to_string(&archive, SONG_XML).unwrap(),
            "<RenoiseSong/>"
        );
        assert!(matches!(
            read_entry_to_string(&archive, "Missing.xml"),
            Err(ArchiveError::Zip { .. })
        ));
    }

    #[test]
    fn test_not_an_archive() {
        let tempdir = tempdir().unwrap();
        let archive = tempdir.path().join("song.xrns");
        fs::write(&archive, b"definitely not a zip").unwrap();

        assert!(matches!(
            extract(&archive, tempdir.path()),
            Err(ArchiveError::Zip { .. })
        ));
        assert!(matches!(
            extract(&tempdir.path().join("missing.xrns"), tempdir.path()),
            Err(ArchiveError::Io { .. })
        ));
    }
}
