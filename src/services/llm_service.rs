//! LLM 服务 - 业务能力层
//!
//! 只负责"识图出题"和"学习分析"两种能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）
//!
//! 每个调用点都经过 [`retry_llm_call`]，限流时按指数退避重试。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;
use crate::models::{MentorResponse, PageClassification, SkillStats};
use crate::services::collaborators::{MentorAnalyst, StationClassifier};
use crate::services::retry::{retry_llm_call, RetryPolicy};

const MAX_TOKENS: u32 = 4096;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid fence regex"));

/// LLM 服务
///
/// 职责：
/// - 把一页图片交给视觉模型判定并出题
/// - 把成绩统计交给分析模型生成学习建议
/// - 只处理单个请求，不关心批次和流程
pub struct LlmService {
    client: Client<OpenAIConfig>,
    vision_model: String,
    mentor_model: String,
    has_api_key: bool,
    retry: RetryPolicy,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            vision_model: config.vision_model_name.clone(),
            mentor_model: config.mentor_model_name.clone(),
            has_api_key: !config.llm_api_key.trim().is_empty(),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `model`: 模型名称
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `imgs`: 图片 URL / data URI 列表（可选），会追加到用户消息中
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        model: &str,
        user_message: &str,
        system_message: Option<&str>,
        imgs: Option<&[String]>,
    ) -> Result<String, LlmError> {
        if !self.has_api_key {
            return Err(LlmError::MissingApiKey);
        }

        debug!("调用 LLM API，模型: {}", model);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(invalid_request)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = match imgs {
            Some(img_urls) if !img_urls.is_empty() => {
                // 使用 Vision API：文本 + 图片
                let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                    Vec::new();

                content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText {
                        text: user_message.to_string(),
                    },
                ));

                for url in img_urls.iter() {
                    content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: url.clone(),
                                detail: Some(ImageDetail::Auto),
                            },
                        },
                    ));
                }

                debug!("使用 Vision API，包含 {} 张图片", img_urls.len());

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(
                        content_parts,
                    ))
                    .build()
                    .map_err(invalid_request)?
            }
            _ => ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(invalid_request)?,
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(MAX_TOKENS)
            .build()
            .map_err(invalid_request)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::from_api_message(model, e.to_string())
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: model.to_string(),
            })?;

        Ok(content.trim().to_string())
    }

    /// 带重试的调用，返回解析好的 JSON
    async fn request_json<T: DeserializeOwned>(
        &self,
        model: &str,
        user_message: &str,
        system_message: Option<&str>,
        imgs: Option<&[String]>,
    ) -> Result<T, LlmError> {
        let text = retry_llm_call(&self.retry, || {
            self.send_to_llm(model, user_message, system_message, imgs)
        })
        .await?;

        parse_json_reply(&text)
    }
}

#[async_trait]
impl StationClassifier for LlmService {
    async fn classify_page(&self, image_uri: &str, topic: &str) -> Result<PageClassification, LlmError> {
        let system_message = build_vision_system_message(topic);
        let user_message = build_vision_prompt(topic);
        let imgs = [image_uri.to_string()];

        match self
            .request_json::<PageClassification>(
                &self.vision_model,
                &user_message,
                Some(&system_message),
                Some(&imgs),
            )
            .await
        {
            Ok(classification) => Ok(classification),
            // 回复不是合法 JSON：当作无效页，不算传输错误
            Err(LlmError::InvalidJson { message }) | Err(LlmError::EmptyContent { model: message }) => {
                debug!("识图回复无法使用，按无效页处理: {}", message);
                Ok(PageClassification::invalid())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MentorAnalyst for LlmService {
    async fn analyze(&self, topic: &str, stats: &SkillStats) -> Result<MentorResponse, LlmError> {
        let prompt = build_mentor_prompt(topic, stats);
        self.request_json(&self.mentor_model, &prompt, None, None).await
    }
}

fn invalid_request(e: impl std::fmt::Display) -> LlmError {
    LlmError::InvalidRequest {
        message: e.to_string(),
    }
}

/// 去掉 ```json 代码块包裹，返回其中的 JSON 文本
pub fn extract_json_block(text: &str) -> String {
    if let Some(captures) = JSON_FENCE.captures(text) {
        if let Some(body) = captures.get(1) {
            return body.as_str().trim().to_string();
        }
    }
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// 解析模型回复中的 JSON
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let body = extract_json_block(text);
    serde_json::from_str(&body).map_err(|e| LlmError::InvalidJson {
        message: e.to_string(),
    })
}

/// 识图出题的系统提示
fn build_vision_system_message(topic: &str) -> String {
    let topic = if topic.trim().is_empty() {
        "Giải phẫu học"
    } else {
        topic
    };

    format!(
        r#"Bạn là giám khảo thi chạy trạm (Spot Test) Giải phẫu học cực kỳ nghiêm túc.

NHIỆM VỤ 1: KIỂM TRA TÍNH HỢP LỆ & ĐÚNG CHỦ ĐỀ: "{topic}".
- Hình ảnh HỢP LỆ: Hình giải phẫu rõ ràng, có chú thích/leader lines, ĐÚNG CHỦ ĐỀ.
- Hình ảnh KHÔNG HỢP LỆ: Toàn chữ, Mục lục, Sai chủ đề.

NHIỆM VỤ 2: RA ĐỀ (Nếu Hợp lệ):
1. Chọn MỘT cấu trúc giải phẫu quan trọng nhất trong hình LIÊN QUAN ĐẾN CHỦ ĐỀ.
2. Đặt câu hỏi định danh trực tiếp (VD: "Chi tiết số 1 là gì?").
3. Đáp án Tiếng Việt chính xác.

Output JSON format: {{ "isValid": boolean, "questions": [{{ "questionText": string, "correctAnswer": string, "explanation": string }}] }}"#
    )
}

/// 识图出题的用户提示
fn build_vision_prompt(topic: &str) -> String {
    if topic.trim().is_empty() {
        "Kiểm tra xem đây có phải là hình giải phẫu hợp lệ không. Nếu có, hãy tạo 1 câu hỏi trạm.".to_string()
    } else {
        format!(
            "Kiểm tra xem hình này có chứa cấu trúc giải phẫu thuộc chủ đề \"{}\" không. Nếu có, hãy tạo 1 câu hỏi trạm.",
            topic
        )
    }
}

/// 成绩统计的文字描述，每个分类一行
pub fn describe_stats(stats: &SkillStats) -> String {
    stats
        .iter()
        .map(|(category, bucket)| {
            format!(
                "- {}: {}/{} câu ({}%)",
                category,
                bucket.correct,
                bucket.total,
                bucket.percentage()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 学习分析的提示词
fn build_mentor_prompt(topic: &str, stats: &SkillStats) -> String {
    format!(
        r#"Đóng vai là "Rái cá nhỏ" 🦦 - gia sư AI giải phẫu.
Học viên vừa làm bài thi chủ đề: "{}".
DỮ LIỆU:
{}

NHIỆM VỤ:
1. Phân tích năng lực.
2. Chỉ ra Điểm mạnh/Yếu.
3. Lộ trình cải thiện (4 bước cụ thể, kỹ thuật học tập rõ ràng).

JSON Output: {{ "analysis": string, "strengths": string[], "weaknesses": string[], "roadmap": [{{ "step": string, "details": string }}] }}"#,
        topic,
        describe_stats(stats)
    )
}
