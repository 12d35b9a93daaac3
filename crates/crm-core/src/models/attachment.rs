use std::path::PathBuf;

/// An inbound mail attachment, addressed by the hash of its bytes.
///
/// Two attachments with identical content share `hashed_filename` and
/// `hashed_filepath`; only `original_filename` tells them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Hex digest of the content plus the original extension
    pub hashed_filename: String,
    pub hashed_filepath: PathBuf,
    pub hashed_file_url: String,
    pub original_filename: String,
    pub binary_content: Vec<u8>,
    /// Declared MIME type of the part
    pub content_type: String,
}

/// Where content-addressed attachments live on disk and under which URL
/// prefix they are served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentLocation {
    pub attachments_dir: PathBuf,
    pub static_url_path: String,
}

impl AttachmentLocation {
    pub fn new(attachments_dir: impl Into<PathBuf>, static_url_path: impl Into<String>) -> Self {
        Self {
            attachments_dir: attachments_dir.into(),
            static_url_path: static_url_path.into(),
        }
    }

    pub fn file_path(&self, hashed_filename: &str) -> PathBuf {
        self.attachments_dir.join(hashed_filename)
    }

    pub fn file_url(&self, hashed_filename: &str) -> String {
        format!(
            "{}/uploads/attachments/{}",
            self.static_url_path.trim_end_matches('/'),
            hashed_filename
        )
    }
}
