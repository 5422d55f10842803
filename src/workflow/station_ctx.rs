//! 候选页处理上下文
//!
//! 封装"我正在处理第几批的哪一页"这一信息

use std::fmt::Display;

/// 候选页处理上下文
#[derive(Debug, Clone)]
pub struct CandidateCtx {
    /// PDF 页码（从 1 开始）
    pub page_number: u32,

    /// 批次编号（仅用于日志显示）
    pub batch_num: usize,

    /// 出题主题
    pub topic: String,
}

impl CandidateCtx {
    /// 创建新的候选页上下文
    pub fn new(page_number: u32, batch_num: usize, topic: impl Into<String>) -> Self {
        Self {
            page_number,
            batch_num,
            topic: topic.into(),
        }
    }
}

impl Display for CandidateCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 #{} 页 #{}]", self.batch_num, self.page_number)
    }
}
