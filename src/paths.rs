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

//! File naming for extracted sample data and exported samples.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::convert::ConversionMode;
use crate::project::SampleDescriptor;

/// Replaces characters that are not allowed in file names on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '/' | '\\' | '<' | '>' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `Instrument00 (Name)`
pub fn instrument_dir_name(index: usize, name: &str) -> String {
    format!("Instrument{:02} ({})", index, name)
}

/// `Sample00 (Name)`
pub fn sample_file_stem(index: usize, name: &str) -> String {
    format!("Sample{:02} ({})", index, name)
}

/// Where the exported file for `descriptor` goes below `out_dir`.
///
/// Trimmed loops get a `-loop` suffix so they are never mistaken for the full sample.
pub fn destination_path(
    out_dir: &Path,
    descriptor: &SampleDescriptor,
    mode: ConversionMode,
) -> PathBuf {
    let mut file_name = sample_file_stem(descriptor.sample_index, &descriptor.sample_name);
    if mode == ConversionMode::Trim && descriptor.loop_enabled() {
        file_name.push_str("-loop");
    }
    file_name.push_str(".wav");

    out_dir
        .join(sanitize_filename(&instrument_dir_name(
            descriptor.instrument_index,
            &descriptor.instrument_name,
        )))
        .join(sanitize_filename(&file_name))
}

/// Finds the encoded sample file for `descriptor` in an extracted `SampleData` directory.
///
/// Directories and files are matched on their index prefix only, since the
/// names inside the archive may have been altered when the song was saved.
/// Returns `None` if the sample has no data.
pub fn find_sample_source(
    sample_data_dir: &Path,
    descriptor: &SampleDescriptor,
) -> io::Result<Option<PathBuf>> {
    let instrument_prefix = format!("Instrument{:02} (", descriptor.instrument_index);
    let Some(instrument_dir) = find_entry(sample_data_dir, &instrument_prefix, Path::is_dir)?
    else {
        return Ok(None);
    };

    let sample_prefix = format!("Sample{:02} (", descriptor.sample_index);
    find_entry(&instrument_dir, &sample_prefix, Path::is_file)
}

/// The first entry of `dir` (in name order) whose file name starts with `prefix`.
fn find_entry(
    dir: &Path,
    prefix: &str,
    filter: fn(&Path) -> bool,
) -> io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches_prefix = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(prefix));
        if matches_prefix && filter(&path) {
            matches.push(path);
        }
    }

    matches.sort();
    Ok(matches.into_iter().next())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::project::LoopMode;

    fn descriptor(
        instrument_index: usize,
        sample_index: usize,
        loop_mode: LoopMode,
    ) -> SampleDescriptor {
        SampleDescriptor {
            instrument_index,
            instrument_name: "Keys: Rhodes".to_string(),
            sample_index,
            sample_name: "C3/soft".to_string(),
            loop_mode,
            loop_start: 0,
            loop_end: 10,
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Bass: Sub"), "Bass_ Sub");
        assert_eq!(sanitize_filename("a/b\\c<d>e\"f|g?h*i"), "a_b_c_d_e_f_g_h_i");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
        assert_eq!(sanitize_filename("Pad (Warm) #2"), "Pad (Warm) #2");
    }

    #[test]
    fn test_names() {
        assert_eq!(instrument_dir_name(3, "Pad"), "Instrument03 (Pad)");
        assert_eq!(instrument_dir_name(120, "Pad"), "Instrument120 (Pad)");
        assert_eq!(sample_file_stem(0, "Hit"), "Sample00 (Hit)");
    }

    #[test]
    fn test_destination_path() {
        let out = Path::new("/out");

        assert_eq!(
            destination_path(out, &descriptor(1, 2, LoopMode::Forward), ConversionMode::Tag),
            Path::new("/out/Instrument01 (Keys_ Rhodes)/Sample02 (C3_soft).wav")
        );
        assert_eq!(
            destination_path(out, &descriptor(1, 2, LoopMode::Forward), ConversionMode::Trim),
            Path::new("/out/Instrument01 (Keys_ Rhodes)/Sample02 (C3_soft)-loop.wav")
        );
        // Samples without a loop are copied, so they keep the plain name.
        assert_eq!(
            destination_path(out, &descriptor(1, 2, LoopMode::Off), ConversionMode::Trim),
            Path::new("/out/Instrument01 (Keys_ Rhodes)/Sample02 (C3_soft).wav")
        );
    }

    #[test]
    fn test_find_sample_source() {
        let tempdir = tempdir().unwrap();
        let sample_data = tempdir.path().join("SampleData");
        let instrument = sample_data.join("Instrument01 (Keys_ Rhodes)");
        fs::create_dir_all(&instrument).unwrap();
        fs::create_dir_all(sample_data.join("Instrument10 (Other)")).unwrap();
        fs::write(instrument.join("Sample02 (C3 soft).flac"), b"").unwrap();
        fs::write(instrument.join("Sample20 (Other).flac"), b"").unwrap();

        assert_eq!(
            find_sample_source(&sample_data, &descriptor(1, 2, LoopMode::Off)).unwrap(),
            Some(instrument.join("Sample02 (C3 soft).flac"))
        );
        assert_eq!(
            find_sample_source(&sample_data, &descriptor(1, 3, LoopMode::Off)).unwrap(),
            None
        );
        assert_eq!(
            find_sample_source(&sample_data, &descriptor(4, 0, LoopMode::Off)).unwrap(),
            None
        );
        assert_eq!(
            find_sample_source(&tempdir.path().join("missing"), &descriptor(1, 2, LoopMode::Off))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_find_sample_source_prefers_name_order() {
        let tempdir = tempdir().unwrap();
        let instrument = tempdir.path().join("Instrument00 (Drums)");
        fs::create_dir_all(&instrument).unwrap();
        fs::write(instrument.join("Sample00 (Kick).wav"), b"").unwrap();
        fs::write(instrument.join("Sample00 (Kick).flac"), b"").unwrap();

        assert_eq!(
            find_sample_source(tempdir.path(), &descriptor(0, 0, LoopMode::Off)).unwrap(),
            Some(instrument.join("Sample00 (Kick).flac"))
        );
    }
}
