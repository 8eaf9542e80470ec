//! Include/exclude filtering for scanned files.
//!
//! Patterns are either one of the extension tags below or a glob matched
//! against the path relative to the source folder (`/` separated):
//!
//! | Pattern               | Matches                                   |
//! |-----------------------|-------------------------------------------|
//! | `_ALL_FILES_`         | every file                                |
//! | `_IMAGE_EXTENSIONS_`  | common image formats                      |
//! | `_RAW_EXTENSIONS_`    | camera RAW formats                        |
//! | `_VIDEO_EXTENSIONS_`  | video formats                             |
//! | `*.jpg`, `2020/**`    | glob; `*` stays within one path segment   |
//! | `IMG_[0-9]*.jpg`      | glob with a character class               |
//!
//! A glob without `/` is matched against the file name only. Exclusion wins
//! over inclusion, and videos are rejected unless uploads of videos are on.

use regex::Regex;
use std::path::Path;

use core_runtime::config::ALL_FILES_TAG;

use crate::error::{Result, SyncError};

pub const IMAGE_EXTENSIONS_TAG: &str = "_IMAGE_EXTENSIONS_";
pub const RAW_EXTENSIONS_TAG: &str = "_RAW_EXTENSIONS_";
pub const VIDEO_EXTENSIONS_TAG: &str = "_VIDEO_EXTENSIONS_";

const IMAGE_EXTENSIONS: &[&str] = &[
    "avif", "bmp", "gif", "heic", "heif", "ico", "jpeg", "jpg", "png", "tif", "tiff", "webp",
];

const RAW_EXTENSIONS: &[&str] = &[
    "3fr", "arw", "cr2", "cr3", "crw", "dng", "erf", "k25", "kdc", "mef", "mos", "mrw", "nef",
    "nrw", "orf", "pef", "raf", "rw2", "sr2", "srw",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "3g2", "3gp", "asf", "avi", "divx", "m2ts", "m4v", "mkv", "mmv", "mod", "mov", "mp4", "mpeg",
    "mpg", "mts", "tod", "vob", "wmv",
];

#[derive(Debug)]
enum Pattern {
    AllFiles,
    Extensions(&'static [&'static str]),
    Glob { regex: Regex, file_name_only: bool },
}

impl Pattern {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            ALL_FILES_TAG => Ok(Self::AllFiles),
            IMAGE_EXTENSIONS_TAG => Ok(Self::Extensions(IMAGE_EXTENSIONS)),
            RAW_EXTENSIONS_TAG => Ok(Self::Extensions(RAW_EXTENSIONS)),
            VIDEO_EXTENSIONS_TAG => Ok(Self::Extensions(VIDEO_EXTENSIONS)),
            glob => {
                let regex = Regex::new(&glob_to_regex(glob)).map_err(|e| SyncError::InvalidPattern {
                    pattern: glob.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Self::Glob {
                    regex,
                    file_name_only: !glob.contains('/'),
                })
            }
        }
    }

    fn matches(&self, relative: &str, file_name: &str, extension: Option<&str>) -> bool {
        match self {
            Self::AllFiles => true,
            Self::Extensions(list) => extension.is_some_and(|ext| list.contains(&ext)),
            Self::Glob {
                regex,
                file_name_only,
            } => {
                if *file_name_only {
                    regex.is_match(file_name)
                } else {
                    regex.is_match(relative)
                }
            }
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("(?i)^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                for c in chars.by_ref() {
                    match c {
                        ']' => {
                            out.push(']');
                            break;
                        }
                        '\\' => out.push_str("\\\\"),
                        c => out.push(c),
                    }
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    out
}

/// Compiled include/exclude rules for one job
#[derive(Debug)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    upload_videos: bool,
}

impl FileFilter {
    pub fn new(include: &[String], exclude: &[String], upload_videos: bool) -> Result<Self> {
        let include = if include.is_empty() {
            vec![Pattern::AllFiles]
        } else {
            include.iter().map(|p| Pattern::parse(p)).collect::<Result<_>>()?
        };
        let exclude = exclude.iter().map(|p| Pattern::parse(p)).collect::<Result<_>>()?;

        Ok(Self {
            include,
            exclude,
            upload_videos,
        })
    }

    /// Decide whether the file at `relative` (inside the source folder) is uploaded
    pub fn is_allowed(&self, relative: &Path) -> bool {
        let relative_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = relative
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        let extension = extension.as_deref();

        if !self.upload_videos && is_video(relative) {
            return false;
        }

        if self
            .exclude
            .iter()
            .any(|p| p.matches(&relative_str, &file_name, extension))
        {
            return false;
        }

        self.include
            .iter()
            .any(|p| p.matches(&relative_str, &file_name, extension))
    }
}

/// Check whether `path` has a known video extension
pub fn is_video(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}
