//! Local and share filesystem access.
//!
//! Container names vary in case between sites and agent versions, so
//! pattern resolution matches every path component case-insensitively,
//! literal components included.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use fslreset_core::facilities::FileSystem;
use fslreset_core::FacilityError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> Result<bool, FacilityError> {
        path.try_exists()
            .map_err(|e| FacilityError::failed("inspect", display(path), e))
    }

    fn clear_attributes(&self, path: &Path, recursive: bool) -> Result<(), FacilityError> {
        let max_depth = if recursive { usize::MAX } else { 0 };

        for entry in WalkDir::new(path).max_depth(max_depth) {
            let entry = entry.map_err(|e| FacilityError::failed("clear attributes", display(path), e))?;
            if entry.file_type().is_symlink() {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| FacilityError::failed("clear attributes", display(entry.path()), e))?;
            clear_blocking_attributes(entry.path(), &metadata)
                .map_err(|e| FacilityError::failed("clear attributes", display(entry.path()), e))?;
        }

        Ok(())
    }

    fn remove(&self, path: &Path, recursive: bool) -> Result<(), FacilityError> {
        let result = if recursive {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| FacilityError::failed("remove", display(path), e))
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, FacilityError> {
        let (base, segments) = parse_pattern(pattern)?;
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let last = segments.len() - 1;
        let mut current = vec![base];
        for (i, segment) in segments.iter().enumerate() {
            let want_file = i == last;
            current = current
                .iter()
                .flat_map(|dir| segment.resolve(dir, want_file))
                .collect();
            if current.is_empty() {
                break;
            }
        }

        let matches: BTreeSet<PathBuf> = current
            .into_iter()
            .map(|path| match fs::canonicalize(&path) {
                Ok(canonical) => strip_verbatim(canonical),
                Err(_) => path,
            })
            .collect();
        Ok(matches.into_iter().collect())
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        fs::metadata(path).ok().map(|m| m.len())
    }
}

/// One component of a pattern below its root.
enum Segment {
    /// `..` inside a configured location, followed as written.
    Parent,
    Name {
        pattern: Pattern,
        /// The component text when it has no wildcards.
        literal: Option<String>,
    },
}

impl Segment {
    /// Entries of `dir` matching this segment: files for the last
    /// segment, directories otherwise.
    fn resolve(&self, dir: &Path, want_file: bool) -> Vec<PathBuf> {
        let (pattern, literal) = match self {
            Segment::Parent => return vec![dir.join("..")],
            Segment::Name { pattern, literal } => (pattern, literal),
        };
        let is_wanted = |path: &Path| if want_file { path.is_file() } else { path.is_dir() };

        let listing = if dir.as_os_str().is_empty() {
            fs::read_dir(".")
        } else {
            fs::read_dir(dir)
        };

        match listing {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| pattern.matches_with(name, MATCH_OPTIONS))
                })
                .map(|entry| dir.join(entry.file_name()))
                .filter(|path| is_wanted(path.as_path()))
                .collect(),
            // Traverse-only directories still allow an exact lookup.
            Err(e) => match literal {
                Some(name) => {
                    let path = dir.join(name);
                    if is_wanted(path.as_path()) {
                        vec![path]
                    } else {
                        Vec::new()
                    }
                }
                None => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                    Vec::new()
                }
            },
        }
    }
}

/// Split `pattern` into its fixed root (prefix and root directory) and
/// the segments to resolve below it.
fn parse_pattern(pattern: &str) -> Result<(PathBuf, Vec<Segment>), FacilityError> {
    let mut base = PathBuf::new();
    let mut segments = Vec::new();

    for component in Path::new(pattern).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => base.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => segments.push(Segment::Parent),
            Component::Normal(raw) => {
                let text = raw.to_string_lossy();
                let compiled =
                    Pattern::new(&text).map_err(|e| FacilityError::failed("glob", pattern, e))?;
                let literal = (!text.contains(['*', '?', '['])).then(|| text.to_string());
                segments.push(Segment::Name {
                    pattern: compiled,
                    literal,
                });
            }
        }
    }

    Ok((base, segments))
}

/// Drop the `\\?\` form `canonicalize` produces on Windows so reported
/// paths look the way operators write them.
fn strip_verbatim(path: PathBuf) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path;
    };
    if let Some(rest) = text.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{rest}"));
    }
    if let Some(rest) = text.strip_prefix(r"\\?\") {
        return PathBuf::from(rest);
    }
    path
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

const FILE_ATTRIBUTE_READONLY: u32 = 0x1;
const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;
const FILE_ATTRIBUTE_NORMAL: u32 = 0x80;
const FILE_ATTRIBUTE_TEMPORARY: u32 = 0x100;
const FILE_ATTRIBUTE_OFFLINE: u32 = 0x1000;
const FILE_ATTRIBUTE_NOT_CONTENT_INDEXED: u32 = 0x2000;

/// Attributes to set so that none of read-only, hidden or system remain,
/// or `None` when none of them is set. Only attributes that
/// `SetFileAttributesW` accepts are carried over.
#[cfg_attr(not(windows), allow(dead_code))]
fn cleared_attributes(attributes: u32) -> Option<u32> {
    const BLOCKING: u32 = FILE_ATTRIBUTE_READONLY | FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM;
    const SETTABLE: u32 = FILE_ATTRIBUTE_ARCHIVE
        | FILE_ATTRIBUTE_TEMPORARY
        | FILE_ATTRIBUTE_OFFLINE
        | FILE_ATTRIBUTE_NOT_CONTENT_INDEXED;

    if attributes & BLOCKING == 0 {
        return None;
    }
    let kept = attributes & SETTABLE;
    Some(if kept == 0 { FILE_ATTRIBUTE_NORMAL } else { kept })
}

#[cfg(windows)]
fn clear_blocking_attributes(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use std::os::windows::fs::MetadataExt;

    use windows_sys::Win32::Storage::FileSystem::SetFileAttributesW;

    let Some(attributes) = cleared_attributes(metadata.file_attributes()) else {
        return Ok(());
    };
    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    // SAFETY: `wide` is a NUL-terminated UTF-16 path that outlives the call.
    if unsafe { SetFileAttributesW(wide.as_ptr(), attributes) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Grant the owner write access.
#[cfg(unix)]
fn clear_blocking_attributes(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    if mode & 0o200 != 0 {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o200))
}

#[cfg(not(any(unix, windows)))]
#[allow(clippy::permissions_set_readonly_false)]
fn clear_blocking_attributes(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    let mut permissions = metadata.permissions();
    if !permissions.readonly() {
        return Ok(());
    }
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_unc_prefix_is_stripped() {
        assert_eq!(
            strip_verbatim(PathBuf::from(r"\\?\UNC\fs01\profiles\alice.vhdx")),
            PathBuf::from(r"\\fs01\profiles\alice.vhdx")
        );
        assert_eq!(
            strip_verbatim(PathBuf::from(r"\\?\D:\profiles\alice.vhdx")),
            PathBuf::from(r"D:\profiles\alice.vhdx")
        );
        assert_eq!(
            strip_verbatim(PathBuf::from("/shares/profiles/alice.vhdx")),
            PathBuf::from("/shares/profiles/alice.vhdx")
        );
    }

    #[test]
    fn read_only_hidden_and_system_are_all_cleared() {
        let all = FILE_ATTRIBUTE_READONLY | FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM;
        assert_eq!(cleared_attributes(all), Some(FILE_ATTRIBUTE_NORMAL));
        assert_eq!(
            cleared_attributes(FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_ARCHIVE),
            Some(FILE_ATTRIBUTE_ARCHIVE)
        );
        assert_eq!(cleared_attributes(FILE_ATTRIBUTE_ARCHIVE), None);
        assert_eq!(cleared_attributes(0), None);
    }

    #[test]
    fn pattern_root_and_segments() {
        let (base, segments) = parse_pattern("/shares/[[]prod[]]/alice/*.vhd*").unwrap();
        assert_eq!(base, PathBuf::from("/"));
        assert_eq!(segments.len(), 4);
        assert!(matches!(&segments[0], Segment::Name { literal: Some(l), .. } if l == "shares"));
        assert!(matches!(&segments[1], Segment::Name { literal: None, .. }));
        assert!(matches!(&segments[3], Segment::Name { literal: None, .. }));
    }

    #[test]
    fn malformed_component_is_rejected() {
        assert!(parse_pattern("/shares/[unclosed/x").is_err());
    }
}
