use crate::reference::DocumentReference;

/// File types the management form accepts as evidence.
pub const ACCEPTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "pdf", "xlsx"];

/// Evidence file as chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Evidence renamed after its document reference, ready for the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedEvidence {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{file_name} is empty")]
    Empty { file_name: String },
    #[error("{file_name}: .{extension} files are not accepted")]
    UnsupportedType {
        file_name: String,
        extension: String,
    },
    #[error("evidence storage failed: {0}")]
    Storage(String),
}

/// Media host receiving renamed evidence files.
pub trait BlobStore: Send + Sync {
    /// Uploads the file and returns its public URL.
    fn upload(&self, file: RenamedEvidence) -> Result<String, UploadError>;
}

/// Text after the last `.`; a name without a dot is its own extension.
pub fn extension_of(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or(file_name)
}

/// Renames `file` to `<reference>.<ext>`, keeping the original extension text.
pub fn rename_for(
    reference: &DocumentReference,
    file: EvidenceFile,
) -> Result<RenamedEvidence, UploadError> {
    let extension = extension_of(&file.file_name).to_string();
    let accepted = ACCEPTED_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&extension));
    if !accepted {
        return Err(UploadError::UnsupportedType {
            file_name: file.file_name,
            extension,
        });
    }
    if file.bytes.is_empty() {
        return Err(UploadError::Empty {
            file_name: file.file_name,
        });
    }

    let content_type = mime_guess::from_ext(&extension)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(RenamedEvidence {
        file_name: format!("{reference}.{extension}"),
        content_type,
        bytes: file.bytes,
    })
}
