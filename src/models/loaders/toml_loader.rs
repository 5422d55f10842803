use crate::error::{AppError, FileError};
use crate::models::section::{SectionCatalog, SectionMap};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 章节表文件格式
///
/// ```toml
/// [[sections]]
/// id = "back"
/// name = "2. Back (Lưng & Cột sống)"
/// range = [9, 34]
/// offset = 14
/// keywords = ["back", "lưng"]
/// ```
#[derive(Debug, Deserialize)]
struct SectionFile {
    sections: Vec<SectionMap>,
}

/// 解析章节表 TOML 文本
pub fn parse_section_catalog(content: &str) -> Result<SectionCatalog> {
    let file: SectionFile = toml::from_str(content).context("无法解析章节表")?;
    let catalog = SectionCatalog::from_sections(file.sections)?;
    Ok(catalog)
}

/// 从 TOML 文件加载章节表
pub async fn load_section_catalog(toml_file_path: &Path) -> Result<SectionCatalog> {
    let display = toml_file_path.display().to_string();

    if !fs::try_exists(toml_file_path).await.unwrap_or(false) {
        return Err(AppError::File(FileError::NotFound { path: display }).into());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&display, e))?;

    let file: SectionFile = toml::from_str(&content).map_err(|source| {
        AppError::File(FileError::TomlParseFailed {
            path: display.clone(),
            source,
        })
    })?;
    let catalog = SectionCatalog::from_sections(file.sections)
        .with_context(|| format!("章节表不合法: {}", display))?;

    tracing::info!(
        "成功加载 {} 个章节: {}",
        catalog.len(),
        toml_file_path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(catalog)
}

/// 有自定义文件时加载它，否则使用内置章节表
pub async fn load_catalog_or_builtin(path: Option<&str>) -> Result<SectionCatalog> {
    match path {
        Some(path) => load_section_catalog(Path::new(path)).await,
        None => Ok(SectionCatalog::builtin()),
    }
}
