//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是出站流程的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理一个章节的全部候选页)
//!     ↓
//! workflow::StationFlow (处理单个候选页)
//!     ↓
//! services (能力层：page_mapper / llm / retry)
//!     ↓
//! infrastructure (基础设施：页面渲染)
//! ```
//!
//! ## 设计原则
//!
//! 1. **批次串行，批内并发**：`join_all` 一次只等一批
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不做具体判定

pub mod batch_processor;

pub use batch_processor::{
    GenerationOutcome, GenerationProgress, GenerationRequest, StationBatchGenerator,
};
