//! 基础设施层：把参考文档变成可渲染的页面

pub mod image_dir;
pub mod page_image;
#[cfg(feature = "pdfium")]
pub mod pdf_document;

use std::path::Path;

use crate::error::RenderError;
use crate::services::PageRenderer;

pub use image_dir::PageImageDirectory;
pub use page_image::{decode_data_uri, encode_jpeg_data_uri, EncodedImage};
#[cfg(feature = "pdfium")]
pub use pdf_document::PdfiumDocument;

/// 按路径打开参考文档
///
/// - 目录：当作已导出的页面图片
/// - `.pdf` 文件：需要 `pdfium` feature
pub async fn open_document(
    path: impl AsRef<Path>,
    jpeg_quality: u8,
) -> Result<Box<dyn PageRenderer>, RenderError> {
    let path = path.as_ref();

    if path.is_dir() {
        return Ok(Box::new(PageImageDirectory::open(path, jpeg_quality).await?));
    }

    if !path.exists() {
        return Err(RenderError::unreadable(path.display().to_string(), "文件不存在"));
    }

    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        return open_pdf(path, jpeg_quality).await;
    }

    Err(RenderError::unreadable(
        path.display().to_string(),
        "只支持 PDF 文件或页面图片目录",
    ))
}

#[cfg(feature = "pdfium")]
async fn open_pdf(path: &Path, jpeg_quality: u8) -> Result<Box<dyn PageRenderer>, RenderError> {
    Ok(Box::new(PdfiumDocument::open(path, jpeg_quality).await?))
}

#[cfg(not(feature = "pdfium"))]
async fn open_pdf(_path: &Path, _jpeg_quality: u8) -> Result<Box<dyn PageRenderer>, RenderError> {
    Err(RenderError::Unsupported {
        kind: "PDF",
        feature: "pdfium",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_missing_path() {
        let result = open_document("/definitely/not/here.pdf", 70).await;
        assert!(matches!(result, Err(RenderError::DocumentUnreadable { .. })));
    }

    #[tokio::test]
    async fn test_open_unknown_file_type() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("deck.docx");
        std::fs::write(&file, b"not a pdf").unwrap();

        let result = open_document(&file, 70).await;
        assert!(matches!(result, Err(RenderError::DocumentUnreadable { .. })));
    }

    #[cfg(not(feature = "pdfium"))]
    #[tokio::test]
    async fn test_pdf_requires_feature() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("deck.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();

        let result = open_document(&file, 70).await;
        assert!(matches!(result, Err(RenderError::Unsupported { kind: "PDF", .. })));
    }
}
