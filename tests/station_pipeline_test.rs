//! 出站 → 作答 → 判分 的端到端测试
//!
//! 渲染和识图都用脚本化的替身，不访问网络。

use anatomy_spot_test::config::Config;
use anatomy_spot_test::error::{GenerationError, LlmError, RenderError};
use anatomy_spot_test::models::{
    GeneratedQuestion, MentorResponse, PageClassification, SectionMap, SkillStats, StationItem,
};
use anatomy_spot_test::orchestrator::{GenerationRequest, StationBatchGenerator};
use anatomy_spot_test::services::{MentorAnalyst, PageRenderer, RenderedPage, StationClassifier};
use anatomy_spot_test::session::{ResultSummarizer, RunnerState, StationRunner};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

// ========== 测试替身 ==========

struct FakeDocument {
    pages: u32,
}

#[async_trait]
impl PageRenderer for FakeDocument {
    fn total_pages(&self) -> u32 {
        self.pages
    }

    async fn render_page(&self, page_number: u32, _scale: f32) -> Result<RenderedPage, RenderError> {
        Ok(RenderedPage {
            page_number,
            data_uri: format!("data:image/jpeg;base64,page{}", page_number),
            width: 10,
            height: 10,
        })
    }
}

#[derive(Clone, Copy)]
enum Reply {
    Valid,
    Invalid,
    Quota,
}

/// 按调用顺序返回脚本里的回复，脚本用完后重复最后一条
struct ScriptedClassifier {
    script: Vec<Reply>,
    calls: AtomicUsize,
    topics: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            topics: Mutex::new(Vec::new()),
        })
    }

    fn always(reply: Reply) -> Arc<Self> {
        Self::new(vec![reply])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationClassifier for ScriptedClassifier {
    async fn classify_page(&self, image_uri: &str, topic: &str) -> Result<PageClassification, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.topics.lock().unwrap().push(topic.to_string());

        let reply = self.script.get(n).or(self.script.last()).copied().unwrap_or(Reply::Invalid);
        match reply {
            Reply::Valid => Ok(PageClassification {
                is_valid: true,
                questions: Some(vec![GeneratedQuestion {
                    question_text: format!("Chi tiết trong {} là gì?", image_uri),
                    correct_answer: "xương đùi".into(),
                    explanation: Some("Xương dài nhất cơ thể".into()),
                }]),
            }),
            Reply::Invalid => Ok(PageClassification::invalid()),
            Reply::Quota => Err(LlmError::QuotaExceeded {
                model: "gemini-2.5-flash".into(),
                message: "RESOURCE_EXHAUSTED".into(),
            }),
        }
    }
}

struct SilentMentor;

#[async_trait]
impl MentorAnalyst for SilentMentor {
    async fn analyze(&self, _topic: &str, _stats: &SkillStats) -> Result<MentorResponse, LlmError> {
        Ok(MentorResponse::message_only("ok"))
    }
}

fn section(range: (u32, u32), offset: i32) -> SectionMap {
    SectionMap {
        id: "lower".into(),
        name: "6. Lower Limb (Chi dưới)".into(),
        range,
        offset,
        keywords: vec!["chi dưới".into()],
    }
}

fn generator(classifier: Arc<ScriptedClassifier>) -> StationBatchGenerator {
    StationBatchGenerator::new(classifier, &Config::default()).with_seed(2024)
}

// ========== 出站 ==========

#[tokio::test]
async fn test_target_count_is_honored() {
    let classifier = ScriptedClassifier::always(Reply::Valid);
    let doc = FakeDocument { pages: 200 };
    let section = section((1, 40), 0);

    let outcome = assert_ok!(
        generator(classifier.clone())
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "Xương đùi",
                target_count: 5,
            })
            .await
    );

    // 两批共 6 页，第二批多出的一个被截掉
    assert_eq!(outcome.stations.len(), 5);
    assert_eq!(outcome.candidates_tried, 6);
    assert_eq!(classifier.calls(), 6);
    assert!(!outcome.quota_hit);
    assert!(outcome.warning.is_none());

    let pages: HashSet<u32> = outcome.stations.iter().map(|s| s.source_page).collect();
    assert_eq!(pages.len(), 5);
    for station in &outcome.stations {
        assert_eq!(station.source_page % 2, 0);
        assert!(station.image_uri.ends_with(&format!("page{}", station.source_page)));
    }
}

#[tokio::test]
async fn test_quota_after_two_stations_returns_partial_set() {
    let classifier = ScriptedClassifier::new(vec![Reply::Valid, Reply::Valid, Reply::Quota]);
    let doc = FakeDocument { pages: 200 };
    let section = section((1, 40), 0);

    let outcome = assert_ok!(
        generator(classifier.clone())
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "t",
                target_count: 5,
            })
            .await
    );

    assert_eq!(outcome.stations.len(), 2);
    assert!(outcome.quota_hit);
    assert!(outcome.warning.is_some());
    // 配额信号之后不再发起新批次
    assert_eq!(classifier.calls(), 3);
}

#[tokio::test]
async fn test_quota_with_no_stations_is_fatal() {
    let classifier = ScriptedClassifier::always(Reply::Quota);
    let doc = FakeDocument { pages: 200 };
    let section = section((1, 40), 0);

    let err = assert_err!(
        generator(classifier.clone())
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "t",
                target_count: 5,
            })
            .await
    );
    assert_eq!(err, GenerationError::QuotaExhausted);
    assert_eq!(classifier.calls(), 3);
}

#[tokio::test]
async fn test_no_matching_content_tries_every_candidate() {
    let classifier = ScriptedClassifier::always(Reply::Invalid);
    let doc = FakeDocument { pages: 200 };
    let section = section((1, 10), 0);

    let err = assert_err!(
        generator(classifier.clone())
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "Tim",
                target_count: 3,
            })
            .await
    );
    assert_eq!(
        err,
        GenerationError::NoMatchingContent {
            topic: "Tim".into()
        }
    );
    assert_eq!(classifier.calls(), 10);
}

#[tokio::test]
async fn test_all_pages_out_of_bounds_is_page_computation_error() {
    let classifier = ScriptedClassifier::always(Reply::Valid);
    let doc = FakeDocument { pages: 20 };
    let section = section((1, 5), 100);

    let err = assert_err!(
        generator(classifier.clone())
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "t",
                target_count: 3,
            })
            .await
    );
    assert!(matches!(err, GenerationError::PageComputation { total_pages: 20, .. }));
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_out_of_bounds_candidates_are_skipped() {
    let classifier = ScriptedClassifier::always(Reply::Valid);
    // 卡片 1..=10 → 页 2..=20，只有 2..=10 在文档里
    let doc = FakeDocument { pages: 10 };
    let section = section((1, 10), 0);

    let outcome = assert_ok!(
        generator(classifier)
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "t",
                target_count: 10,
            })
            .await
    );
    assert_eq!(outcome.stations.len(), 5);
    assert!(outcome.stations.iter().all(|s| s.source_page <= 10));
}

#[tokio::test]
async fn test_missing_inputs_are_rejected() {
    let classifier = ScriptedClassifier::always(Reply::Valid);
    let doc = FakeDocument { pages: 200 };
    let section = section((1, 40), 0);
    let generator = generator(classifier.clone());

    let base = GenerationRequest {
        document: Some(&doc),
        section: Some(&section),
        topic: "t",
        target_count: 5,
    };

    let err = assert_err!(
        generator
            .generate(GenerationRequest {
                document: None,
                ..base
            })
            .await
    );
    assert_eq!(err, GenerationError::MissingDocument);

    let err = assert_err!(
        generator
            .generate(GenerationRequest {
                section: None,
                ..base
            })
            .await
    );
    assert_eq!(err, GenerationError::MissingSection);

    let err = assert_err!(
        generator
            .generate(GenerationRequest {
                target_count: 0,
                ..base
            })
            .await
    );
    assert_eq!(err, GenerationError::InvalidTargetCount);
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_blank_topic_falls_back_to_section_name() {
    let classifier = ScriptedClassifier::always(Reply::Valid);
    let doc = FakeDocument { pages: 200 };
    let section = section((1, 40), 0);

    assert_ok!(
        generator(classifier.clone())
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "   ",
                target_count: 1,
            })
            .await
    );

    let topics = classifier.topics.lock().unwrap();
    assert!(!topics.is_empty());
    assert!(topics.iter().all(|t| t == "6. Lower Limb (Chi dưới)"));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start,
    End,
}

/// 每次识图都要等一会儿，记录调用的开始 / 结束顺序
#[derive(Default)]
struct SlowClassifier {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl StationClassifier for SlowClassifier {
    async fn classify_page(&self, _image_uri: &str, _topic: &str) -> Result<PageClassification, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(Event::Start);

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        self.events.lock().unwrap().push(Event::End);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(PageClassification::invalid())
    }
}

#[tokio::test]
async fn test_batches_run_concurrently_and_in_sequence() {
    let classifier = Arc::new(SlowClassifier::default());
    let doc = FakeDocument { pages: 100 };
    let section = section((1, 20), 0);

    assert_err!(
        StationBatchGenerator::new(classifier.clone(), &Config::default())
            .with_seed(7)
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "t",
                target_count: 5,
            })
            .await
    );

    // 批内并发：同时进行的请求正好是一批的大小
    assert_eq!(classifier.peak.load(Ordering::SeqCst), 3);

    // 批间串行：一批里出现结束之后，要等全部结束才会有新的开始
    let events = classifier.events.lock().unwrap();
    assert_eq!(events.len(), 40);

    let mut in_flight = 0usize;
    let mut draining = false;
    let mut batch_sizes = Vec::new();
    let mut started = 0;
    for event in events.iter() {
        match event {
            Event::Start => {
                assert!(!draining, "next batch started before the previous one settled");
                in_flight += 1;
                started += 1;
            }
            Event::End => {
                draining = true;
                in_flight -= 1;
                if in_flight == 0 {
                    draining = false;
                    batch_sizes.push(started);
                    started = 0;
                }
            }
        }
    }
    assert_eq!(batch_sizes, vec![3, 3, 3, 3, 3, 3, 2]);
}

// ========== 作答与判分 ==========

#[tokio::test]
async fn test_generated_stations_run_and_grade() {
    let classifier = ScriptedClassifier::always(Reply::Valid);
    let doc = FakeDocument { pages: 200 };
    let section = section((1, 40), 0);

    let outcome = assert_ok!(
        generator(classifier)
            .generate(GenerationRequest {
                document: Some(&doc),
                section: Some(&section),
                topic: "Chi dưới",
                target_count: 4,
            })
            .await
    );

    let mut runner = StationRunner::new(outcome.stations, 30);
    for answer in ["Xương đùi", "xương đùi.", "XƯƠNG ĐÙI", "xương chày"] {
        runner.set_answer(answer);
        runner.next();
    }
    assert!(runner.is_finished());

    let summary = ResultSummarizer::new(runner.finish(), "Chi dưới", Arc::new(SilentMentor));
    assert_eq!(summary.total(), 4);
    assert_eq!(summary.correct_count(), 3);
    assert_eq!(summary.score_percentage(), 75);
    assert_eq!(summary.mentor_report().await.analysis, "ok");
}

#[test]
fn test_runner_never_moves_backward() {
    let stations: Vec<StationItem> = (0..5)
        .map(|i| StationItem {
            id: format!("st-{}", i),
            image_uri: String::new(),
            source_page: i,
            questions: vec![],
        })
        .collect();

    let mut runner = StationRunner::new(stations, 10);
    runner.next();
    runner.next();
    assert_eq!(runner.state(), RunnerState::AwaitingStation(2));

    let mut last = 2;
    for step in 0..60 {
        if step % 7 == 0 {
            runner.toggle_pause();
        }
        if step % 11 == 0 {
            runner.next();
        } else {
            runner.tick();
        }

        match runner.state() {
            RunnerState::AwaitingStation(i) => {
                assert!(i >= last && i <= last + 1);
                last = i;
            }
            RunnerState::Finished => break,
        }
    }

    runner.next();
    assert!(runner.is_finished() || runner.current_index().unwrap() >= last);
}
