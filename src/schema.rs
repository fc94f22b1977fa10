//! Wire types for the files and OCR endpoints.
//!
//! Field names mirror the hosted OCR API so existing clients can talk to this
//! server unchanged.

use crate::registry::StoredFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolution reported when an image carries no density metadata.
pub const DEFAULT_DPI: u32 = 72;

// ── Files API ───────────────────────────────────────────────────────────────

/// Metadata returned by `POST /v1/files`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileObject {
    pub id: String,
    pub object: String,
    pub bytes: u64,
    pub created_at: i64,
    pub filename: String,
    pub purpose: String,
    pub sample_type: String,
    pub num_lines: u64,
    pub source: String,
}

impl From<&StoredFile> for FileObject {
    fn from(file: &StoredFile) -> Self {
        Self {
            id: file.id.clone(),
            object: "file".to_string(),
            bytes: file.bytes,
            created_at: file.created_at,
            filename: file.filename.clone(),
            purpose: "ocr".to_string(),
            sample_type: "pretrain".to_string(),
            num_lines: 0,
            source: "upload".to_string(),
        }
    }
}

/// Response of `GET /v1/files/{id}/url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileUrl {
    pub url: String,
}

// ── OCR API ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct OcrRequest {
    pub document: DocumentRef,
    #[serde(default)]
    pub model: Option<String>,
    /// Embed each page image as a data URI in the response.
    #[serde(default)]
    pub include_image_base64: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRef {
    pub document_url: String,
}

impl DocumentRef {
    /// Filename referenced by the URL: its last path segment, without any
    /// query string or fragment.
    pub fn filename(&self) -> &str {
        let url = self.document_url.as_str();
        let url = url.split(['?', '#']).next().unwrap_or(url);
        url.rsplit('/').next().unwrap_or(url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    pub pages: Vec<OcrPage>,
    pub model: String,
    pub document_annotation: String,
    pub usage_info: UsageInfo,
}

impl OcrResponse {
    pub fn new(pages: Vec<OcrPage>, model: String, doc_size_bytes: u64) -> Self {
        let usage_info = UsageInfo {
            pages_processed: pages.len(),
            doc_size_bytes,
        };
        Self {
            pages,
            model,
            document_annotation: String::new(),
            usage_info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrPage {
    pub index: usize,
    pub markdown: String,
    pub images: Vec<PageImage>,
    pub dimensions: PageDimensions,
}

impl OcrPage {
    /// Build a page whose single image region spans the whole page.
    pub fn full_page(
        index: usize,
        markdown: String,
        dimensions: PageDimensions,
        image_base64: String,
    ) -> Self {
        let image = PageImage {
            id: Uuid::new_v4().to_string(),
            top_left_x: 0,
            top_left_y: 0,
            bottom_right_x: dimensions.width,
            bottom_right_y: dimensions.height,
            image_base64,
            image_annotation: String::new(),
        };
        Self {
            index,
            markdown,
            images: vec![image],
            dimensions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageImage {
    pub id: String,
    pub top_left_x: u32,
    pub top_left_y: u32,
    pub bottom_right_x: u32,
    pub bottom_right_y: u32,
    pub image_base64: String,
    pub image_annotation: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDimensions {
    pub dpi: u32,
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageInfo {
    pub pages_processed: usize,
    pub doc_size_bytes: u64,
}
