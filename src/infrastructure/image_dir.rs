//! 图片目录文档 - 基础设施层
//!
//! 把一个目录里已经导出的页面图片当成一份文档：第 N 张图就是第 N 页。
//! 文件按文件名中的数字排序（`page-2.png` 在 `page-10.png` 之前）。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::RenderError;
use crate::infrastructure::page_image::{encode_jpeg_data_uri, scale_image};
use crate::services::{PageRenderer, RenderedPage};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "bmp"];

/// 图片目录文档
///
/// 只读，多个任务可以同时渲染不同页。
pub struct PageImageDirectory {
    pages: Vec<PathBuf>,
    jpeg_quality: u8,
}

impl PageImageDirectory {
    /// 扫描目录，收集页面图片
    pub async fn open(dir: impl AsRef<Path>, jpeg_quality: u8) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let display = dir.display().to_string();

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| RenderError::unreadable(&display, e))?;

        let mut pages = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RenderError::unreadable(&display, e))?
        {
            let path = entry.path();
            if is_page_image(&path) {
                pages.push(path);
            }
        }

        if pages.is_empty() {
            return Err(RenderError::unreadable(display, "目录中没有页面图片"));
        }

        pages.sort_by_key(|path| page_sort_key(path));
        debug!("图片目录 {} 共 {} 页", dir.display(), pages.len());

        Ok(Self {
            pages,
            jpeg_quality,
        })
    }
}

#[async_trait]
impl PageRenderer for PageImageDirectory {
    fn total_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn render_page(&self, page_number: u32, scale: f32) -> Result<RenderedPage, RenderError> {
        let total = self.total_pages();
        if page_number == 0 || page_number > total {
            return Err(RenderError::PageOutOfRange {
                page: page_number,
                total,
            });
        }

        let path = self.pages[(page_number - 1) as usize].clone();
        let quality = self.jpeg_quality;

        // 解码和编码都是 CPU 密集型操作
        let encoded = tokio::task::spawn_blocking(move || -> Result<_, RenderError> {
            let img = image::open(&path)?;
            encode_jpeg_data_uri(&scale_image(img, scale), quality)
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

fn is_page_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

/// 文件名中最后一段数字，没有数字的排在最后
fn page_sort_key(path: &Path) -> (u64, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let digits: String = stem
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    (digits.parse().unwrap_or(u64::MAX), stem)
}
