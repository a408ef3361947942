//! Unpacking fetched artifacts into a staging directory
//!
//! Archive entries are mapped through the descriptor's extraction rules:
//! the first rule whose prefix matches decides where the entry lands,
//! entries matching no rule are skipped. Directory entries are implied by
//! the files below them.

use crate::cache::store::MARKER_FILE;
use crate::error::{GetpackError, GetpackResult};
use crate::resource::ExtractRule;
use flate2::read::GzDecoder;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Supported artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`, `.whl`
    Zip,
    /// `.tar`
    Tar,
    /// `.tar.gz`, `.tgz`
    TarGz,
    /// Anything else: copied as a single file
    File,
}

impl ArchiveFormat {
    /// Parse an explicit `format` attribute
    pub fn from_name(name: &str) -> GetpackResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "zip" | "whl" => Ok(Self::Zip),
            "tar" => Ok(Self::Tar),
            "tar.gz" | "tgz" | "gz" => Ok(Self::TarGz),
            "file" | "raw" => Ok(Self::File),
            other => Err(GetpackError::DescriptorInvalid(format!(
                "unknown archive format '{}'. Valid formats: zip, tar, tar.gz, file",
                other
            ))),
        }
    }

    /// Guess the format from an artifact file name
    pub fn detect(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".zip") || lower.ends_with(".whl") {
            Self::Zip
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGz
        } else if lower.ends_with(".tar") {
            Self::Tar
        } else {
            Self::File
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::File => "file",
        };
        write!(f, "{}", name)
    }
}

/// Map an archive entry name to its destination, relative to the install root
///
/// Returns `Ok(None)` for entries no rule selects.
pub fn map_entry(
    archive: &str,
    entry: &str,
    rules: &[ExtractRule],
) -> GetpackResult<Option<PathBuf>> {
    let unsafe_entry = || GetpackError::UnsafeEntry {
        archive: archive.to_string(),
        entry: entry.to_string(),
    };
    if entry.starts_with('/') || !is_normal_path(Path::new(entry)) {
        return Err(unsafe_entry());
    }

    let Some(rule) = rules.iter().find(|r| entry.starts_with(r.prefix.as_str())) else {
        return Ok(None);
    };
    let rest = entry[rule.prefix.len()..].trim_start_matches('/');
    if rest.is_empty() {
        return Ok(None);
    }

    let joined = if rule.path.is_empty() {
        PathBuf::from(rest)
    } else {
        Path::new(&rule.path).join(rest)
    };
    if !is_normal_path(&joined) {
        return Err(unsafe_entry());
    }

    // `./x` and `x` name the same file
    let relative: PathBuf = joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }
    if relative == Path::new(MARKER_FILE) {
        return Err(unsafe_entry());
    }
    Ok(Some(relative))
}

/// Relative path made only of plain components
fn is_normal_path(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Unpack `artifact` into `destination`, returning the number of files written
pub fn extract(
    artifact: &Path,
    file_name: &str,
    format: ArchiveFormat,
    rules: &[ExtractRule],
    destination: &Path,
) -> GetpackResult<usize> {
    debug!(
        "Extracting {} ({}) into {}",
        file_name,
        format,
        destination.display()
    );
    fs::create_dir_all(destination)
        .map_err(|e| GetpackError::io(format!("creating {}", destination.display()), e))?;

    let written = match format {
        ArchiveFormat::Zip => extract_zip(artifact, file_name, rules, destination)?,
        ArchiveFormat::Tar => {
            let reader = BufReader::new(open(artifact)?);
            extract_tar(reader, file_name, rules, destination)?
        }
        ArchiveFormat::TarGz => {
            let reader = GzDecoder::new(BufReader::new(open(artifact)?));
            extract_tar(reader, file_name, rules, destination)?
        }
        ArchiveFormat::File => copy_plain(artifact, file_name, destination)?,
    };

    debug!("Extracted {} files from {}", written, file_name);
    Ok(written)
}

fn open(path: &Path) -> GetpackResult<File> {
    File::open(path).map_err(|e| GetpackError::io(format!("opening {}", path.display()), e))
}

fn extract_error(archive: &str, reason: impl fmt::Display) -> GetpackError {
    GetpackError::Extract {
        archive: archive.to_string(),
        reason: reason.to_string(),
    }
}

fn extract_zip(
    artifact: &Path,
    file_name: &str,
    rules: &[ExtractRule],
    destination: &Path,
) -> GetpackResult<usize> {
    let mut archive =
        zip::ZipArchive::new(open(artifact)?).map_err(|e| extract_error(file_name, e))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| extract_error(file_name, e))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if entry.enclosed_name().is_none() {
            return Err(GetpackError::UnsafeEntry {
                archive: file_name.to_string(),
                entry: name,
            });
        }
        let Some(relative) = map_entry(file_name, &name, rules)? else {
            trace!("Skipping {}", name);
            continue;
        };
        let mode = entry.unix_mode();
        write_entry(&mut entry, &destination.join(relative), mode)
            .map_err(|e| extract_error(file_name, format!("{}: {}", name, e)))?;
        written += 1;
    }
    Ok(written)
}

fn extract_tar<R: Read>(
    reader: R,
    file_name: &str,
    rules: &[ExtractRule],
    destination: &Path,
) -> GetpackResult<usize> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| extract_error(file_name, e))?;

    let mut written = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| extract_error(file_name, e))?;
        if !entry.header().entry_type().is_file() {
            trace!("Skipping non-file tar entry");
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| extract_error(file_name, e))?
            .to_string_lossy()
            .replace('\\', "/");
        let Some(relative) = map_entry(file_name, &name, rules)? else {
            trace!("Skipping {}", name);
            continue;
        };
        let mode = entry.header().mode().ok();
        write_entry(&mut entry, &destination.join(relative), mode)
            .map_err(|e| extract_error(file_name, format!("{}: {}", name, e)))?;
        written += 1;
    }
    Ok(written)
}

fn copy_plain(artifact: &Path, file_name: &str, destination: &Path) -> GetpackResult<usize> {
    let relative = Path::new(file_name);
    let safe = relative.components().count() == 1
        && matches!(relative.components().next(), Some(Component::Normal(_)))
        && file_name != MARKER_FILE;
    if !safe {
        return Err(GetpackError::UnsafeEntry {
            archive: file_name.to_string(),
            entry: file_name.to_string(),
        });
    }
    let mut source = open(artifact)?;
    // single-file downloads are usually programs
    write_entry(&mut source, &destination.join(relative), Some(0o755))
        .map_err(|e| extract_error(file_name, e))?;
    Ok(1)
}

fn write_entry<R: Read>(reader: &mut R, target: &Path, mode: Option<u32>) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(target)?;
    io::copy(reader, &mut file)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            // rwx bits only, never setuid/setgid
            let perms = fs::Permissions::from_mode((mode & 0o777) | 0o600);
            fs::set_permissions(target, perms)?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// Write a zip archive with the given (name, content) entries
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer
                    .start_file(*name, SimpleFileOptions::default().unix_permissions(0o755))
                    .unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn format_detection() {
        assert_eq!(ArchiveFormat::detect("a-1.0.zip"), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::detect("pkg-1.0-py3-none-any.whl"), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::detect("a.tar.gz"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect("a.TGZ"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect("a.tar"), ArchiveFormat::Tar);
        assert_eq!(ArchiveFormat::detect("tool.exe"), ArchiveFormat::File);
        assert_eq!(ArchiveFormat::from_name("tar.gz").unwrap(), ArchiveFormat::TarGz);
        assert!(ArchiveFormat::from_name("rar").is_err());
    }

    #[test]
    fn map_entry_with_default_rule() {
        let rules = vec![ExtractRule::default()];
        assert_eq!(
            map_entry("a.zip", "bin/tool", &rules).unwrap(),
            Some(PathBuf::from("bin/tool"))
        );
    }

    #[test]
    fn map_entry_strips_prefix_and_skips_others() {
        let rules = vec![ExtractRule::new("ffmpeg-5.1.2-essentials_build/bin/", "")];
        assert_eq!(
            map_entry("a.zip", "ffmpeg-5.1.2-essentials_build/bin/ffmpeg.exe", &rules).unwrap(),
            Some(PathBuf::from("ffmpeg.exe"))
        );
        assert_eq!(
            map_entry("a.zip", "ffmpeg-5.1.2-essentials_build/doc/readme.txt", &rules).unwrap(),
            None
        );
    }

    #[test]
    fn map_entry_into_subdirectory() {
        let rules = vec![ExtractRule::new("pkg/", "lib")];
        assert_eq!(
            map_entry("a.zip", "pkg/mod.py", &rules).unwrap(),
            Some(Path::new("lib").join("mod.py"))
        );
    }

    #[test]
    fn map_entry_rejects_traversal() {
        let rules = vec![ExtractRule::default()];
        let err = map_entry("a.zip", "../evil", &rules).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Install);
        assert!(map_entry("a.zip", "/etc/passwd", &rules).is_err());
        assert!(map_entry("a.zip", MARKER_FILE, &rules).is_err());
    }

    #[test]
    fn map_entry_rejects_marker_behind_cur_dir() {
        let rules = vec![ExtractRule::default()];
        let entry = format!("./{}", MARKER_FILE);
        let err = map_entry("a.tar", &entry, &rules).unwrap_err();
        assert!(matches!(err, GetpackError::UnsafeEntry { .. }));

        let into_root = vec![ExtractRule::new("pkg/", ".")];
        let entry = format!("pkg/{}", MARKER_FILE);
        assert!(map_entry("a.tar", &entry, &into_root).is_err());
        assert_eq!(
            map_entry("a.tar", "pkg/tool", &into_root).unwrap(),
            Some(PathBuf::from("tool"))
        );
    }

    #[test]
    fn map_entry_normalizes_cur_dir() {
        let rules = vec![ExtractRule::default()];
        assert_eq!(
            map_entry("a.tar", "./bin/tool", &rules).unwrap(),
            Some(PathBuf::from("bin/tool"))
        );
        assert_eq!(map_entry("a.tar", "./", &rules).unwrap(), None);
    }

    #[test]
    fn extracts_zip_with_rules() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tool-1.0.zip");
        write_zip(
            &archive,
            &[
                ("tool-1.0/", b""),
                ("tool-1.0/bin/tool", b"#!/bin/sh\necho hi\n"),
                ("tool-1.0/README", b"docs"),
            ],
        );

        let dest = dir.path().join("out");
        let rules = vec![ExtractRule::new("tool-1.0/bin/", "bin")];
        let written = extract(&archive, "tool-1.0.zip", ArchiveFormat::Zip, &rules, &dest).unwrap();

        assert_eq!(written, 1);
        assert!(dest.join("bin/tool").is_file());
        assert!(!dest.join("README").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("bin/tool")).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn extracts_tar_gz() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tool.tar.gz");
        write_tar_gz(&archive, &[("tool/a.txt", b"a"), ("tool/sub/b.txt", b"b")]);

        let dest = dir.path().join("out");
        let written = extract(
            &archive,
            "tool.tar.gz",
            ArchiveFormat::TarGz,
            &[ExtractRule::new("tool/", "")],
            &dest,
        )
        .unwrap();

        assert_eq!(written, 2);
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"b");
    }

    #[test]
    fn copies_plain_file() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("download");
        fs::write(&artifact, b"\x7fELF").unwrap();

        let dest = dir.path().join("out");
        let written = extract(&artifact, "tool", ArchiveFormat::File, &[], &dest).unwrap();
        assert_eq!(written, 1);
        assert_eq!(fs::read(dest.join("tool")).unwrap(), b"\x7fELF");
    }

    #[test]
    fn corrupt_zip_is_install_error() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();

        let err = extract(
            &archive,
            "broken.zip",
            ArchiveFormat::Zip,
            &[ExtractRule::default()],
            &dir.path().join("out"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Install);
    }
}
