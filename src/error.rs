//! 错误类型
//!
//! 按来源分层：配置 / 生成流程 / LLM / 渲染 / 文件。
//! 生成流程中的致命错误会直接展示给学员，所以使用越南语提示。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 站点生成错误
    #[error("{0}")]
    Generation(#[from] GenerationError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 页面渲染错误
    #[error("渲染错误: {0}")]
    Render(#[from] RenderError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 章节 ID 重复
    #[error("章节 ID 重复: {id}")]
    DuplicateSectionId { id: String },
    /// 卡片范围不合法
    #[error("章节 {id} 的卡片范围不合法: [{start}, {end}]")]
    InvalidSectionRange { id: String, start: u32, end: u32 },
    /// 章节不存在
    #[error("找不到章节: {id}")]
    UnknownSection { id: String },
}

/// 站点生成错误
///
/// 只有这几种情况会让一次生成失败，其余的单页失败都在流程内部消化。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// 没有提供参考文档
    #[error("Vui lòng tải lên file Flashcard PDF.")]
    MissingDocument,
    /// 没有选择章节
    #[error("Vui lòng chọn chương sách.")]
    MissingSection,
    /// 目标站数为 0
    #[error("Số trạm phải lớn hơn 0.")]
    InvalidTargetCount,
    /// 过滤后没有任何候选页
    #[error("Lỗi tính toán trang PDF (chương {section_id}, tài liệu có {total_pages} trang).")]
    PageComputation { section_id: String, total_pages: u32 },
    /// 配额耗尽且一个站点都没生成
    #[error("Đã hết hạn mức sử dụng AI (Quota Exceeded).")]
    QuotaExhausted,
    /// 所有候选页都不符合主题
    #[error("Không tìm thấy hình ảnh giải phẫu nào phù hợp với chủ đề \"{topic}\".")]
    NoMatchingContent { topic: String },
}

/// LLM 服务错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// 未配置 API Key
    #[error("未配置 API Key")]
    MissingApiKey,
    /// 配额耗尽
    #[error("配额已耗尽 (模型: {model}): {message}")]
    QuotaExceeded { model: String, message: String },
    /// 重试后仍被限流
    #[error("请求频率限制 (模型: {model}): {message}")]
    RateLimited { model: String, message: String },
    /// 模型不存在
    #[error("找不到模型 {model}，请检查模型名称和 API 地址")]
    ModelNotFound { model: String },
    /// 普通的调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 构建请求失败
    #[error("构建请求失败: {message}")]
    InvalidRequest { message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容不是合法 JSON
    #[error("无法解析LLM返回的JSON: {message}")]
    InvalidJson { message: String },
}

impl LlmError {
    /// 是否属于配额 / 限流信号
    ///
    /// 批量生成遇到这类错误后不再发起新的批次。
    pub fn is_quota_signal(&self) -> bool {
        matches!(
            self,
            LlmError::QuotaExceeded { .. } | LlmError::RateLimited { .. }
        )
    }

    /// 根据服务端返回的错误文本归类
    pub fn from_api_message(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("404") || lower.contains("not found") {
            LlmError::ModelNotFound { model }
        } else if is_quota_text(&lower) {
            LlmError::QuotaExceeded { model, message }
        } else if is_rate_limit_text(&lower) {
            LlmError::RateLimited { model, message }
        } else {
            LlmError::ApiCallFailed { model, message }
        }
    }
}

/// 文本中是否带有配额耗尽的标记
pub(crate) fn is_quota_text(lower: &str) -> bool {
    lower.contains("quota") || lower.contains("resource_exhausted")
}

/// 文本中是否带有限流 / 过载的标记
pub(crate) fn is_rate_limit_text(lower: &str) -> bool {
    lower.contains("429")
        || lower.contains("503")
        || lower.contains("rate limit")
        || lower.contains("overloaded")
}

/// 页面渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 页码越界
    #[error("页码 {page} 超出范围 [1, {total}]")]
    PageOutOfRange { page: u32, total: u32 },
    /// 文档损坏或无法打开
    #[error("无法打开文档 {path}: {message}")]
    DocumentUnreadable { path: String, message: String },
    /// 图片编码失败
    #[error("图片编码失败: {0}")]
    Encode(#[from] image::ImageError),
    /// 后台渲染任务失败
    #[error("渲染任务失败: {0}")]
    Task(String),
    /// 当前构建不支持该文档类型
    #[error("当前构建不支持 {kind} 文档，请启用 `{feature}` feature")]
    Unsupported {
        kind: &'static str,
        feature: &'static str,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

impl RenderError {
    /// 创建文档无法读取错误
    pub fn unreadable(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        RenderError::DocumentUnreadable {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_quota_message() {
        let err = LlmError::from_api_message("gemini-2.5-flash", "RESOURCE_EXHAUSTED: quota");
        assert!(matches!(err, LlmError::QuotaExceeded { .. }));
        assert!(err.is_quota_signal());
    }

    #[test]
    fn test_classify_rate_limit_message() {
        let err = LlmError::from_api_message("m", "status 429 Too Many Requests");
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert!(err.is_quota_signal());

        let err = LlmError::from_api_message("m", "The model is overloaded");
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[test]
    fn test_classify_not_found_and_other() {
        let err = LlmError::from_api_message("m", "models/foo is not found");
        assert_eq!(err, LlmError::ModelNotFound { model: "m".into() });
        assert!(!err.is_quota_signal());

        let err = LlmError::from_api_message("m", "connection reset by peer");
        assert!(matches!(err, LlmError::ApiCallFailed { .. }));
        assert!(!err.is_quota_signal());
    }

    #[test]
    fn test_generation_error_messages_are_distinct() {
        let quota = GenerationError::QuotaExhausted.to_string();
        let none = GenerationError::NoMatchingContent {
            topic: "Xương đùi".into(),
        }
        .to_string();
        assert_ne!(quota, none);
        assert!(none.contains("Xương đùi"));
    }
}
