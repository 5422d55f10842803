//! PDF 文档 - 基础设施层
//!
//! 基于 pdfium 渲染 PDF 页面，需要系统里装有 pdfium 动态库，
//! 并用 `--features pdfium` 编译。
//!
//! pdfium 本身不能安全地并发使用，这里用一把锁把渲染串行化，
//! 批次内的其他步骤（LLM 调用）仍然是并发的。

use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::RenderError;
use crate::infrastructure::page_image::encode_jpeg_data_uri;
use crate::services::{PageRenderer, RenderedPage};

/// PDF 文档
///
/// 持有文件字节，每次渲染时在后台线程里重新加载。
pub struct PdfiumDocument {
    path: String,
    bytes: Arc<Vec<u8>>,
    total_pages: u32,
    jpeg_quality: u8,
    render_lock: Mutex<()>,
}

impl PdfiumDocument {
    /// 读取 PDF 并统计页数
    pub async fn open(path: impl AsRef<Path>, jpeg_quality: u8) -> Result<Self, RenderError> {
        let display = path.as_ref().display().to_string();
        let bytes = tokio::fs::read(path.as_ref())
            .await
            .map_err(|e| RenderError::unreadable(&display, e))?;
        let bytes = Arc::new(bytes);

        let total_pages = {
            let bytes = Arc::clone(&bytes);
            let display = display.clone();
            tokio::task::spawn_blocking(move || -> Result<u32, RenderError> {
                let pdfium = bind_pdfium(&display)?;
                let document = pdfium
                    .load_pdf_from_byte_slice(&bytes, None)
                    .map_err(|e| RenderError::unreadable(&display, e))?;
                Ok(u32::from(document.pages().len()))
            })
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??
        };

        debug!("PDF {} 共 {} 页", display, total_pages);

        Ok(Self {
            path: display,
            bytes,
            total_pages,
            jpeg_quality,
            render_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl PageRenderer for PdfiumDocument {
    fn total_pages(&self) -> u32 {
        self.total_pages
    }

    async fn render_page(&self, page_number: u32, scale: f32) -> Result<RenderedPage, RenderError> {
        if page_number == 0 || page_number > self.total_pages {
            return Err(RenderError::PageOutOfRange {
                page: page_number,
                total: self.total_pages,
            });
        }

        let _guard = self.render_lock.lock().await;

        let bytes = Arc::clone(&self.bytes);
        let path = self.path.clone();
        let quality = self.jpeg_quality;

        let encoded = tokio::task::spawn_blocking(move || -> Result<_, RenderError> {
            let pdfium = bind_pdfium(&path)?;
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(|e| RenderError::unreadable(&path, e))?;

            // pdfium 页索引从 0 开始
            let index = u16::try_from(page_number - 1).map_err(|e| RenderError::unreadable(&path, e))?;
            let page = document
                .pages()
                .get(index)
                .map_err(|e| RenderError::unreadable(&path, e))?;

            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| RenderError::unreadable(&path, e))?;

            encode_jpeg_data_uri(&bitmap.as_image(), quality)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))??;

        Ok(RenderedPage {
            page_number,
            data_uri: encoded.data_uri,
            width: encoded.width,
            height: encoded.height,
        })
    }
}

fn bind_pdfium(path: &str) -> Result<Pdfium, RenderError> {
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| RenderError::unreadable(path, format!("pdfium 不可用: {}", e)))
}
