//! Multipart form handling and upload format checks.

use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::{InnovationError, Result};

/// One uploaded file part
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|n| std::path::Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// True when either the extension or the declared content type matches `kind`
    pub fn matches(&self, kind: UploadKind) -> bool {
        let ext_ok = self
            .extension()
            .is_some_and(|e| kind.extensions().contains(&e.as_str()));
        let type_ok = self
            .content_type
            .as_deref()
            .is_some_and(|t| kind.content_types().contains(&t));
        ext_ok || type_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Csv,
}

impl UploadKind {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => &["jpg", "jpeg", "png"],
            UploadKind::Csv => &["csv"],
        }
    }

    fn content_types(self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => &["image/jpeg", "image/png", "image/jpg"],
            UploadKind::Csv => &["text/csv", "application/csv"],
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            UploadKind::Image => "Please upload an image (JPG/PNG).",
            UploadKind::Csv => "Please upload a CSV file.",
        }
    }
}

/// Text fields and file parts of one submitted form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Upload>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            if file_name.is_some() {
                let bytes = field.bytes().await.map_err(invalid_upload)?;
                form.files.insert(
                    name,
                    Upload {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let text = field.text().await.map_err(invalid_upload)?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The named file, validated against `kind`; missing or empty parts are warnings
    pub fn require_file(&self, name: &str, kind: UploadKind) -> Result<&Upload> {
        let upload = self
            .files
            .get(name)
            .filter(|u| !u.bytes.is_empty())
            .ok_or_else(|| InnovationError::validation(kind.prompt()))?;
        if !upload.matches(kind) {
            return Err(InnovationError::validation(format!(
                "Unsupported file type. {}",
                kind.prompt()
            )));
        }
        Ok(upload)
    }
}

fn invalid_upload(err: axum::extract::multipart::MultipartError) -> InnovationError {
    InnovationError::validation(format!("Invalid upload: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: Option<&str>, content_type: Option<&str>) -> Upload {
        Upload {
            file_name: name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(b"x"),
        }
    }

    #[test]
    fn accepts_by_extension_or_content_type() {
        assert!(upload(Some("scan.JPG"), None).matches(UploadKind::Image));
        assert!(upload(Some("blob"), Some("image/png")).matches(UploadKind::Image));
        assert!(upload(Some("sales.csv"), None).matches(UploadKind::Csv));
        assert!(!upload(Some("notes.gif"), Some("image/gif")).matches(UploadKind::Image));
        assert!(!upload(Some("data.xlsx"), None).matches(UploadKind::Csv));
    }

    #[test]
    fn empty_file_part_is_a_warning() {
        let mut form = UploadForm::default();
        form.files.insert(
            "image".to_string(),
            Upload {
                file_name: Some(String::new()),
                content_type: None,
                bytes: Bytes::new(),
            },
        );
        let err = form.require_file("image", UploadKind::Image).unwrap_err();
        assert!(err.is_warning());
    }
}
