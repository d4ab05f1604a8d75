use crate::MAX_FILE_SIZE;
use crate::source::RawFile;

/// Why a selected file was refused before queueing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large (max 100MB)")]
    FileTooLarge { size: u64 },

    #[error("File type .{extension} is not allowed")]
    TypeNotAllowed { extension: String },
}

/// Returns the lower-cased extension of `name`: everything after the final `.`.
///
/// A name without a dot yields the whole name, so `"Makefile"` checks as
/// `"makefile"` against an allow-list.
pub fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

/// Checks a candidate against the size limit and the extension allow-list.
///
/// Rules, in order:
/// - size above [`MAX_FILE_SIZE`] is `FileTooLarge`, whatever the allow-list says
/// - a non-empty `allowed` list must contain the lower-cased extension
///
/// An empty allow-list accepts every type.
pub fn validate(file: &RawFile, allowed: &[String]) -> Result<(), ValidationError> {
    if file.size > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge { size: file.size });
    }

    if !allowed.is_empty() {
        let extension = file_extension(&file.name);
        if !allowed.iter().any(|a| *a == extension) {
            return Err(ValidationError::TypeNotAllowed { extension });
        }
    }

    Ok(())
}

/// Preset allow-lists offered by the type filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    Images,
    Documents,
    Media,
}

impl TypeFilter {
    pub const ALL: [TypeFilter; 4] = [Self::All, Self::Images, Self::Documents, Self::Media];

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Files",
            Self::Images => "Images",
            Self::Documents => "Documents",
            Self::Media => "Media",
        }
    }

    /// The allow-list for this preset. `All` is empty, which accepts everything.
    pub fn extensions(self) -> Vec<String> {
        let exts: &[&str] = match self {
            Self::All => &[],
            Self::Images => &["jpg", "jpeg", "png", "gif", "webp"],
            Self::Documents => &["pdf", "doc", "docx", "txt"],
            Self::Media => &["mp4", "mp3", "avi", "mov"],
        };
        exts.iter().map(|e| (*e).to_string()).collect()
    }
}

/// Coarse grouping of a MIME type, used by presentation to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Pdf,
    Document,
    Spreadsheet,
    Presentation,
    Other,
}

impl FileCategory {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else if mime.contains("pdf") {
            Self::Pdf
        } else if mime.contains("word") || mime.contains("document") {
            Self::Document
        } else if mime.contains("sheet") || mime.contains("excel") {
            Self::Spreadsheet
        } else if mime.contains("presentation") || mime.contains("powerpoint") {
            Self::Presentation
        } else {
            Self::Other
        }
    }
}
