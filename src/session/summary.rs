//! 结果汇总
//!
//! 逐站判分、计算得分率，并向分析服务请求一份学习建议。
//! 建议在一次考试内只请求一次，之后的调用直接复用。

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::models::mentor::MENTOR_MISSING_KEY_MESSAGE;
use crate::models::{MentorResponse, SkillBucket, SkillStats};
use crate::services::{is_correct, MentorAnalyst};
use crate::session::runner::ExamRecord;

/// 跑站模式唯一的能力分类
pub const STATION_SKILL_CATEGORY: &str = "Thực hành chạy trạm";

/// 单站判分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationGrade {
    pub station_id: String,
    pub source_page: u32,
    pub question_text: String,
    /// 未作答时为空串
    pub user_answer: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub is_correct: bool,
}

/// 结果汇总
pub struct ResultSummarizer {
    topic: String,
    grades: Vec<StationGrade>,
    mentor: Arc<dyn MentorAnalyst>,
    report: OnceCell<MentorResponse>,
}

impl ResultSummarizer {
    pub fn new(record: ExamRecord, topic: impl Into<String>, mentor: Arc<dyn MentorAnalyst>) -> Self {
        Self {
            topic: topic.into(),
            grades: grade_all(&record),
            mentor,
            report: OnceCell::new(),
        }
    }

    pub fn grades(&self) -> &[StationGrade] {
        &self.grades
    }

    pub fn total(&self) -> usize {
        self.grades.len()
    }

    /// 没有任何考站
    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    pub fn correct_count(&self) -> usize {
        self.grades.iter().filter(|g| g.is_correct).count()
    }

    /// `round(100 * correct / N)`，N 为 0 时为 0
    pub fn score_percentage(&self) -> u32 {
        self.skill_stats()
            .get(STATION_SKILL_CATEGORY)
            .map(SkillBucket::percentage)
            .unwrap_or(0)
    }

    /// 交给分析服务的统计
    pub fn skill_stats(&self) -> SkillStats {
        let mut stats = SkillStats::new();
        stats.insert(
            STATION_SKILL_CATEGORY.to_string(),
            SkillBucket {
                correct: self.correct_count(),
                total: self.total(),
            },
        );
        stats
    }

    /// 学习建议，首次调用时请求，之后复用
    ///
    /// 分析服务出错时返回固定的兜底报告，不会失败。
    pub async fn mentor_report(&self) -> &MentorResponse {
        self.report
            .get_or_init(|| async {
                let stats = self.skill_stats();
                info!("🦦 请求学习分析: {} ({}/{})", self.topic, self.correct_count(), self.total());

                match self.mentor.analyze(&self.topic, &stats).await {
                    Ok(report) => report,
                    Err(LlmError::MissingApiKey) => {
                        warn!("未配置 API Key，跳过学习分析");
                        MentorResponse::message_only(MENTOR_MISSING_KEY_MESSAGE)
                    }
                    Err(e) => {
                        warn!("学习分析失败，使用兜底报告: {}", e);
                        MentorResponse::fallback()
                    }
                }
            })
            .await
    }
}

fn grade_all(record: &ExamRecord) -> Vec<StationGrade> {
    record
        .stations
        .iter()
        .map(|station| {
            let user_answer = record
                .answers
                .get(&station.id)
                .cloned()
                .unwrap_or_default();
            let question = station.primary_question();
            let correct_answer = station.correct_answer().to_string();

            StationGrade {
                station_id: station.id.clone(),
                source_page: station.source_page,
                question_text: question.map(|q| q.question_text.clone()).unwrap_or_default(),
                is_correct: is_correct(&user_answer, &correct_answer),
                user_answer,
                correct_answer,
                explanation: question.and_then(|q| q.explanation.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StationItem, StationQuestion};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMentor {
        calls: AtomicUsize,
        result: Result<MentorResponse, LlmError>,
    }

    #[async_trait]
    impl MentorAnalyst for CountingMentor {
        async fn analyze(&self, _topic: &str, stats: &SkillStats) -> Result<MentorResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(stats.contains_key(STATION_SKILL_CATEGORY));
            self.result.clone()
        }
    }

    fn mentor(result: Result<MentorResponse, LlmError>) -> Arc<CountingMentor> {
        Arc::new(CountingMentor {
            calls: AtomicUsize::new(0),
            result,
        })
    }

    fn station(id: &str, answer: &str) -> StationItem {
        StationItem {
            id: id.to_string(),
            image_uri: String::new(),
            source_page: 10,
            questions: vec![StationQuestion {
                id: format!("q-{}", id),
                question_text: "Chi tiết số 1 là gì?".into(),
                correct_answer: answer.to_string(),
                explanation: Some("giải thích".into()),
            }],
        }
    }

    fn record(answers: &[(&str, &str)]) -> ExamRecord {
        ExamRecord {
            stations: vec![
                station("a", "xương đùi"),
                station("b", "động mạch chủ"),
                station("c", "tim"),
            ],
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_grading_and_score() {
        let summary = ResultSummarizer::new(
            record(&[("a", "Xương đùi"), ("b", "tĩnh mạch")]),
            "Chi dưới",
            mentor(Ok(MentorResponse::default())),
        );

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.correct_count(), 1);
        assert_eq!(summary.score_percentage(), 33);

        let unanswered = &summary.grades()[2];
        assert_eq!(unanswered.user_answer, "");
        assert!(!unanswered.is_correct);
        assert_eq!(summary.grades()[0].explanation.as_deref(), Some("giải thích"));
    }

    #[test]
    fn test_empty_exam() {
        let summary = ResultSummarizer::new(
            ExamRecord {
                stations: vec![],
                answers: HashMap::new(),
            },
            "t",
            mentor(Ok(MentorResponse::default())),
        );
        assert!(summary.is_empty());
        assert_eq!(summary.score_percentage(), 0);
    }

    #[tokio::test]
    async fn test_mentor_report_is_cached() {
        let analyst = mentor(Ok(MentorResponse::message_only("Tốt lắm")));
        let summary = ResultSummarizer::new(record(&[]), "t", analyst.clone());

        let (first, second) = tokio::join!(summary.mentor_report(), summary.mentor_report());
        assert_eq!(first.analysis, "Tốt lắm");
        assert_eq!(first, second);
        assert_eq!(summary.mentor_report().await.analysis, "Tốt lắm");
        assert_eq!(analyst.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mentor_failure_uses_fallback() {
        let analyst = mentor(Err(LlmError::ApiCallFailed {
            model: "m".into(),
            message: "boom".into(),
        }));
        let summary = ResultSummarizer::new(record(&[]), "t", analyst);

        let report = summary.mentor_report().await;
        assert_eq!(report, &MentorResponse::fallback());
        assert!(report.strengths.is_empty());
        assert!(report.roadmap.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_message() {
        let summary = ResultSummarizer::new(record(&[]), "t", mentor(Err(LlmError::MissingApiKey)));
        assert_eq!(summary.mentor_report().await.analysis, MENTOR_MISSING_KEY_MESSAGE);
    }
}
