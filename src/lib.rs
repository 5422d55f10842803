//! # Anatomy Spot Test
//!
//! 把解剖闪卡 PDF 变成限时"跑站"考试：随机抽页、识图出题、计时作答、判分并给出学习建议
//!
//! ## 架构设计
//!
//! 本系统采用四层架构，外加考试会话：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 打开参考文档，只暴露"渲染某一页"的能力
//! - `PageImageDirectory` - 已导出的页面图片目录
//! - `PdfiumDocument` - PDF 文档（`pdfium` feature）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单页 / 单个答案
//! - `page_mapper` - 闪卡编号 → 页码
//! - `answer_matcher` - 简答题判分
//! - `LlmService` - 识图出题、学习分析
//! - `retry` - 统一的指数退避重试
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一页候选"的完整处理流程
//! - `CandidateCtx` - 上下文封装（批次 + 页码 + 主题）
//! - `StationFlow` - 流程编排（render → classify → station）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并发出站，管理配额熔断和进度
//!
//! ### 考试会话（Session）
//! - `StationRunner` - 计时状态机
//! - `ResultSummarizer` - 判分汇总与学习建议
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult, GenerationError, LlmError, RenderError};
pub use models::{SectionCatalog, SectionMap, StationItem};
pub use orchestrator::{GenerationOutcome, GenerationRequest, StationBatchGenerator};
pub use services::{LlmService, MentorAnalyst, PageRenderer, RenderedPage, StationClassifier};
pub use session::{ResultSummarizer, StationRunner};
pub use workflow::{CandidateCtx, StationFlow};
