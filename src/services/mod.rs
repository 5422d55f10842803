pub mod answer_matcher;
pub mod collaborators;
pub mod llm_service;
pub mod page_mapper;
pub mod retry;

pub use answer_matcher::{is_correct, normalize_answer};
pub use collaborators::{MentorAnalyst, PageRenderer, RenderedPage, StationClassifier};
pub use llm_service::LlmService;
pub use retry::{retry_llm_call, RetryPolicy};
