use serde::{Deserialize, Serialize};

/// 站点题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationQuestion {
    pub id: String,
    pub question_text: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// 一个考站：一张渲染好的页面图片 + 题目
///
/// 数据结构上支持多道题，但所有使用方都只看第一道题，
/// 统一通过 [`StationItem::primary_question`] 访问。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationItem {
    pub id: String,
    /// 自包含的 data URI，考试期间不需要重新渲染
    pub image_uri: String,
    /// 来源页码（从 1 开始）
    pub source_page: u32,
    pub questions: Vec<StationQuestion>,
}

impl StationItem {
    /// 由识图结果组装考站
    ///
    /// `questions` 为空时返回 `None`，这样的候选页直接丢弃。
    pub fn from_generated(
        timestamp_millis: i64,
        page_number: u32,
        image_uri: String,
        generated: Vec<GeneratedQuestion>,
    ) -> Option<Self> {
        if generated.is_empty() {
            return None;
        }

        let questions = generated
            .into_iter()
            .enumerate()
            .map(|(idx, q)| StationQuestion {
                id: format!("q-{}-{}-{}", timestamp_millis, page_number, idx),
                question_text: q.question_text,
                correct_answer: q.correct_answer,
                explanation: q.explanation.filter(|e| !e.trim().is_empty()),
            })
            .collect();

        Some(Self {
            id: format!("st-{}-{}", timestamp_millis, page_number),
            image_uri,
            source_page: page_number,
            questions,
        })
    }

    /// 考站的主问题
    pub fn primary_question(&self) -> Option<&StationQuestion> {
        self.questions.first()
    }

    /// 主问题的标准答案（没有题目时为空串）
    pub fn correct_answer(&self) -> &str {
        self.primary_question()
            .map(|q| q.correct_answer.as_str())
            .unwrap_or_default()
    }
}

/// 识图模型返回的单道题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// 识图模型对一页的判定
///
/// `is_valid = false` 或没有题目都表示"跳过这一页"，不是错误。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageClassification {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub questions: Option<Vec<GeneratedQuestion>>,
}

impl PageClassification {
    pub fn invalid() -> Self {
        Self::default()
    }

    /// 可用于出站：合法且至少一道题
    pub fn is_usable(&self) -> bool {
        self.is_valid && self.questions.as_ref().is_some_and(|q| !q.is_empty())
    }

    /// 取出可用的题目列表
    pub fn into_usable_questions(self) -> Option<Vec<GeneratedQuestion>> {
        if self.is_usable() {
            self.questions
        } else {
            None
        }
    }
}
