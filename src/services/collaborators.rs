//! 外部协作方接口
//!
//! 生成流程、判分、分析都只依赖这些 trait，
//! 构造时注入具体实现（真实服务或测试替身），不走全局单例。

use async_trait::async_trait;

use crate::error::{LlmError, RenderError};
use crate::models::{MentorResponse, PageClassification, SkillStats};

/// 渲染好的一页
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// 页码（从 1 开始）
    pub page_number: u32,
    /// 自包含的 `data:image/jpeg;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

/// 文档渲染协作方
///
/// 同一个文档在一个批次内会被多个任务并发读取，实现必须支持并发只读访问，
/// 或者在内部把页面提取串行化。
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 文档总页数
    fn total_pages(&self) -> u32;

    /// 以固定缩放比例渲染指定页（从 1 开始）
    async fn render_page(&self, page_number: u32, scale: f32) -> Result<RenderedPage, RenderError>;
}

/// 识图出题协作方
#[async_trait]
pub trait StationClassifier: Send + Sync {
    /// 判断页面是否是符合主题的解剖图，合法时返回题目
    ///
    /// 内容不合法返回 `Ok(PageClassification { is_valid: false, .. })`；
    /// 只有传输层问题才返回 `Err`，其中配额 / 限流可通过
    /// [`LlmError::is_quota_signal`] 区分。
    async fn classify_page(&self, image_uri: &str, topic: &str) -> Result<PageClassification, LlmError>;
}

/// 学习分析协作方
#[async_trait]
pub trait MentorAnalyst: Send + Sync {
    async fn analyze(&self, topic: &str, stats: &SkillStats) -> Result<MentorResponse, LlmError>;
}
