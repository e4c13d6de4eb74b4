use super::*;
use crate::card::{CardResult, Rank, Suit};
use crate::classifier::{Classifier, ClassifierRegistry, Observation, StaticClassifier};
use crate::config::PipelineConfig;
use crate::error::{ClassificationError, SetupError};
use crate::frame::{FrameData, FrameFormat, FrameRef, Orientation};
use crate::thresholds::ConfidenceThresholds;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn create_test_frame(id: u64) -> FrameData {
    FrameData::new(id, SystemTime::now(), vec![0u8; 16], 2, 2, FrameFormat::Bgra32)
}

fn suit_classifier(observations: Vec<Observation>) -> Arc<StaticClassifier> {
    Arc::new(StaticClassifier::new("suit classifier", observations))
}

fn rank_classifier(observations: Vec<Observation>) -> Arc<StaticClassifier> {
    Arc::new(StaticClassifier::new("rank classifier", observations))
}

fn create_pipeline(
    suit: &Arc<StaticClassifier>,
    rank: &Arc<StaticClassifier>,
) -> (StagedInferencePipeline, Arc<PipelineStats>) {
    let stats = Arc::new(PipelineStats::new());
    let pipeline = StagedInferencePipeline::new(
        Some(Arc::clone(suit) as Arc<dyn Classifier>),
        Some(Arc::clone(rank) as Arc<dyn Classifier>),
        Arc::new(ConfidenceThresholds::default()),
        Duration::from_secs(2),
        Arc::clone(&stats),
    );
    (pipeline, stats)
}

fn create_test_pipeline_config(queue_depth: usize) -> PipelineConfig {
    PipelineConfig {
        queue_depth,
        stage_timeout_ms: 2000,
    }
}

fn registry_with(suit: &Arc<StaticClassifier>, rank: &Arc<StaticClassifier>) -> ClassifierRegistry {
    ClassifierRegistry::new()
        .with(Arc::clone(suit) as Arc<dyn Classifier>)
        .with(Arc::clone(rank) as Arc<dyn Classifier>)
}

fn default_selection() -> ClassifierSelection {
    ClassifierSelection {
        suit: "suit classifier".to_string(),
        rank: "rank classifier".to_string(),
    }
}

fn submit_frame(handle: &PipelineHandle, id: u64) -> bool {
    let bytes = vec![id as u8; 16];
    handle.submit(FrameRef {
        id,
        timestamp: SystemTime::now(),
        data: &bytes,
        width: 2,
        height: 2,
        format: FrameFormat::Bgra32,
        orientation: Orientation::UpMirrored,
    })
}

fn collect_results(worker: &PipelineWorker) -> mpsc::UnboundedReceiver<Option<CardResult>> {
    let (tx, rx) = mpsc::unbounded_channel();
    worker.sink().set_handler(move |outcome| {
        let _ = tx.send(outcome);
    });
    rx
}

async fn next_result(rx: &mut mpsc::UnboundedReceiver<Option<CardResult>>) -> Option<CardResult> {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for pipeline outcome")
        .expect("Result channel closed")
}

#[tokio::test]
async fn test_confident_suit_and_rank_produce_card() {
    let suit = suit_classifier(vec![
        Observation::new("spade", 0.995),
        Observation::new("club", 0.003),
    ]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.97)]);
    let (pipeline, stats) = create_pipeline(&suit, &rank);

    let card = pipeline.process(&create_test_frame(1)).await.unwrap();

    assert_eq!(card.suit(), Suit::Spade);
    assert_eq!(card.rank(), Rank::Ace);
    assert_eq!(card.card_string(), "acespade");
    assert_eq!(stats.snapshot().cards_recognized, 1);
}

#[tokio::test]
async fn test_low_suit_confidence_skips_rank_stage() {
    let suit = suit_classifier(vec![Observation::new("spade", 0.80)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let (pipeline, stats) = create_pipeline(&suit, &rank);

    assert!(pipeline.process(&create_test_frame(1)).await.is_none());
    assert_eq!(suit.call_count(), 1);
    assert_eq!(rank.call_count(), 0);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.suit_rejections, 1);
    assert_eq!(snapshot.rank_invocations, 0);
}

#[tokio::test]
async fn test_low_rank_confidence_invokes_rank_once() {
    let suit = suit_classifier(vec![Observation::new("heart", 0.999)]);
    let rank = rank_classifier(vec![Observation::new("king", 0.5)]);
    let (pipeline, stats) = create_pipeline(&suit, &rank);

    assert!(pipeline.process(&create_test_frame(1)).await.is_none());
    assert_eq!(rank.call_count(), 1);
    assert_eq!(stats.snapshot().rank_rejections, 1);
}

#[tokio::test]
async fn test_confidence_equal_to_threshold_passes() {
    let suit = suit_classifier(vec![Observation::new("club", 0.99)]);
    let rank = rank_classifier(vec![Observation::new("seven", 0.95)]);
    let (pipeline, _) = create_pipeline(&suit, &rank);

    let card = pipeline.process(&create_test_frame(1)).await.unwrap();
    assert_eq!(card.card_string(), "sevenclub");
}

#[tokio::test]
async fn test_suit_classifier_error_yields_no_result() {
    let suit = Arc::new(StaticClassifier::failing(
        "suit classifier",
        ClassificationError::MalformedFrame {
            details: "truncated buffer".to_string(),
        },
    ));
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let (pipeline, _) = create_pipeline(&suit, &rank);

    assert!(pipeline.process(&create_test_frame(1)).await.is_none());
    assert_eq!(rank.call_count(), 0);

    match pipeline.suit_stage(&create_test_frame(2)).await {
        Err(StageRejection::ClassificationFailed(ClassificationError::MalformedFrame { .. })) => {}
        other => panic!("Unexpected suit stage outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_truncated_frame_never_reaches_classifiers() {
    let suit = suit_classifier(vec![Observation::new("spade", 0.999)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let (pipeline, stats) = create_pipeline(&suit, &rank);

    let truncated = FrameData::new(1, SystemTime::now(), vec![0u8; 10], 2, 2, FrameFormat::Bgra32);
    assert!(pipeline.process(&truncated).await.is_none());
    assert_eq!(suit.call_count(), 0);
    assert_eq!(rank.call_count(), 0);
    assert_eq!(stats.snapshot().suit_rejections, 1);

    let empty_jpeg = FrameData::new(2, SystemTime::now(), Vec::new(), 2, 2, FrameFormat::Mjpeg);
    match pipeline.suit_stage(&empty_jpeg).await {
        Err(StageRejection::ClassificationFailed(ClassificationError::MalformedFrame { .. })) => {}
        other => panic!("Unexpected suit stage outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_rank_classifier_error_yields_no_result() {
    let suit = suit_classifier(vec![Observation::new("diamond", 0.999)]);
    let rank = Arc::new(StaticClassifier::failing(
        "rank classifier",
        ClassificationError::BackendUnavailable {
            details: "accelerator reset".to_string(),
        },
    ));
    let (pipeline, _) = create_pipeline(&suit, &rank);

    assert!(pipeline.process(&create_test_frame(1)).await.is_none());
    assert_eq!(rank.call_count(), 1);
}

#[tokio::test]
async fn test_unknown_suit_label_is_rejected() {
    let suit = suit_classifier(vec![Observation::new("joker", 0.999)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let (pipeline, _) = create_pipeline(&suit, &rank);

    assert!(pipeline.process(&create_test_frame(1)).await.is_none());
    assert_eq!(rank.call_count(), 0);

    match pipeline.suit_stage(&create_test_frame(2)).await {
        Err(StageRejection::InvalidLabel(invalid)) => assert_eq!(invalid.label, "joker"),
        other => panic!("Unexpected suit stage outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_rank_label_is_rejected() {
    let suit = suit_classifier(vec![Observation::new("spade", 0.999)]);
    let rank = rank_classifier(vec![Observation::new("spade", 0.99)]);
    let (pipeline, _) = create_pipeline(&suit, &rank);

    assert!(pipeline.process(&create_test_frame(1)).await.is_none());
}

#[tokio::test]
async fn test_empty_observations_yield_no_result() {
    let suit = suit_classifier(Vec::new());
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let (pipeline, _) = create_pipeline(&suit, &rank);

    assert_eq!(
        pipeline.suit_stage(&create_test_frame(1)).await,
        Err(StageRejection::NoObservations)
    );
    assert!(pipeline.process(&create_test_frame(2)).await.is_none());
}

#[tokio::test]
async fn test_unsorted_observations_use_maximum() {
    let suit = suit_classifier(vec![
        Observation::new("club", 0.004),
        Observation::new("heart", 0.995),
    ]);
    let rank = rank_classifier(vec![
        Observation::new("two", 0.01),
        Observation::new("jack", 0.98),
        Observation::new("queen", 0.01),
    ]);
    let (pipeline, _) = create_pipeline(&suit, &rank);

    let card = pipeline.process(&create_test_frame(1)).await.unwrap();
    assert_eq!(card.card_string(), "jackheart");
}

#[tokio::test]
async fn test_both_stages_see_same_frame() {
    let suit = suit_classifier(vec![Observation::new("spade", 0.999)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let (pipeline, _) = create_pipeline(&suit, &rank);

    pipeline.process(&create_test_frame(42)).await;

    assert_eq!(suit.seen_frames(), vec![42]);
    assert_eq!(rank.seen_frames(), vec![42]);
}

#[tokio::test]
async fn test_threshold_changes_apply_to_next_check() {
    let thresholds = Arc::new(ConfidenceThresholds::default());
    let suit = suit_classifier(vec![Observation::new("spade", 0.80)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.80)]);
    let pipeline = StagedInferencePipeline::new(
        Some(Arc::clone(&suit) as Arc<dyn Classifier>),
        Some(Arc::clone(&rank) as Arc<dyn Classifier>),
        Arc::clone(&thresholds),
        Duration::from_secs(2),
        Arc::new(PipelineStats::new()),
    );

    assert!(pipeline.process(&create_test_frame(1)).await.is_none());

    thresholds.set_suit(0.75).unwrap();
    assert!(pipeline.process(&create_test_frame(2)).await.is_none());
    assert_eq!(rank.call_count(), 1);

    thresholds.set_rank(0.75).unwrap();
    let card = pipeline.process(&create_test_frame(3)).await.unwrap();
    assert_eq!(card.card_string(), "acespade");
}

#[tokio::test]
async fn test_stage_timeout_yields_no_result() {
    let suit = Arc::new(
        StaticClassifier::new("suit classifier", vec![Observation::new("spade", 0.999)])
            .with_latency(Duration::from_millis(300)),
    );
    let pipeline = StagedInferencePipeline::new(
        Some(suit as Arc<dyn Classifier>),
        Some(rank_classifier(vec![Observation::new("ace", 0.99)]) as Arc<dyn Classifier>),
        Arc::new(ConfidenceThresholds::default()),
        Duration::from_millis(50),
        Arc::new(PipelineStats::new()),
    );

    match pipeline.suit_stage(&create_test_frame(1)).await {
        Err(StageRejection::ClassificationFailed(ClassificationError::Timeout { timeout_ms })) => {
            assert_eq!(timeout_ms, 50)
        }
        other => panic!("Unexpected suit stage outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_unconfigured_pipeline_yields_no_result() {
    let pipeline = StagedInferencePipeline::unconfigured(
        Arc::new(ConfidenceThresholds::default()),
        Duration::from_secs(1),
        Arc::new(PipelineStats::new()),
    );

    assert!(!pipeline.is_configured());
    assert_eq!(
        pipeline.suit_stage(&create_test_frame(1)).await,
        Err(StageRejection::Unavailable)
    );
    assert!(pipeline.process(&create_test_frame(1)).await.is_none());
}

#[tokio::test]
async fn test_worker_delivers_card() {
    let suit = suit_classifier(vec![Observation::new("spade", 0.995)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.97)]);
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(1),
        Arc::new(ConfidenceThresholds::default()),
    );
    let mut results = collect_results(&worker);

    let report = worker.setup(registry_with(&suit, &rank), default_selection()).await.unwrap();
    assert!(report.is_ready());
    assert!(report.failures.is_empty());

    assert!(submit_frame(&worker.handle(), 1));
    let card = next_result(&mut results).await.unwrap();
    assert_eq!(card.card_string(), "acespade");

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_worker_setup_failure_yields_no_result() {
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(1),
        Arc::new(ConfidenceThresholds::default()),
    );
    let mut results = collect_results(&worker);

    let report = worker.setup(ClassifierRegistry::new(), default_selection()).await.unwrap();
    assert!(!report.is_ready());
    assert_eq!(report.failures.len(), 2);
    assert!(matches!(
        report.failures[0],
        SetupError::UnknownClassifier { .. }
    ));

    for id in 0..3 {
        assert!(submit_frame(&worker.handle(), id));
        assert!(next_result(&mut results).await.is_none());
    }

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_worker_prepare_failure_disables_stage() {
    let suit = Arc::new(
        StaticClassifier::new("suit classifier", vec![Observation::new("spade", 0.999)])
            .with_prepare_failure("weights missing"),
    );
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(1),
        Arc::new(ConfidenceThresholds::default()),
    );
    let mut results = collect_results(&worker);

    let report = worker.setup(registry_with(&suit, &rank), default_selection()).await.unwrap();
    assert!(!report.suit_ready);
    assert!(report.rank_ready);

    assert!(submit_frame(&worker.handle(), 1));
    assert!(next_result(&mut results).await.is_none());
    assert_eq!(suit.call_count(), 0);
    assert_eq!(rank.call_count(), 0);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_worker_processes_frames_in_order() {
    let suit = suit_classifier(vec![Observation::new("spade", 0.999)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(8),
        Arc::new(ConfidenceThresholds::default()),
    );
    let mut results = collect_results(&worker);
    worker.setup(registry_with(&suit, &rank), default_selection()).await.unwrap();

    let handle = worker.handle();
    for id in 1..=5 {
        assert!(submit_frame(&handle, id));
    }
    for _ in 1..=5 {
        assert!(next_result(&mut results).await.is_some());
    }

    assert_eq!(suit.seen_frames(), vec![1, 2, 3, 4, 5]);
    assert_eq!(rank.seen_frames(), vec![1, 2, 3, 4, 5]);

    let stats = worker.stats();
    assert_eq!(stats.frames_submitted, 5);
    assert_eq!(stats.frames_processed, 5);
    assert_eq!(stats.cards_recognized, 5);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_worker_drops_frames_when_busy() {
    let suit = Arc::new(
        StaticClassifier::new("suit classifier", vec![Observation::new("spade", 0.999)])
            .with_latency(Duration::from_millis(200)),
    );
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(1),
        Arc::new(ConfidenceThresholds::default()),
    );
    let mut results = collect_results(&worker);
    worker.setup(registry_with(&suit, &rank), default_selection()).await.unwrap();

    let handle = worker.handle();
    assert!(submit_frame(&handle, 1));
    // Let the worker pick up frame 1
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(submit_frame(&handle, 2));
    assert!(!submit_frame(&handle, 3));
    assert!(!submit_frame(&handle, 4));

    assert!(next_result(&mut results).await.is_some());
    assert!(next_result(&mut results).await.is_some());

    assert_eq!(suit.seen_frames(), vec![1, 2]);
    let stats = worker.stats();
    assert_eq!(stats.frames_submitted, 2);
    assert_eq!(stats.frames_dropped, 2);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_latest_result_handler_wins() {
    let suit = suit_classifier(vec![Observation::new("spade", 0.999)]);
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(1),
        Arc::new(ConfidenceThresholds::default()),
    );
    worker.setup(registry_with(&suit, &rank), default_selection()).await.unwrap();

    let mut first = collect_results(&worker);
    let mut second = collect_results(&worker);

    assert!(submit_frame(&worker.handle(), 1));
    assert!(next_result(&mut second).await.is_some());
    assert!(first.try_recv().is_err());

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_answers_queued_frames() {
    let suit = Arc::new(
        StaticClassifier::new("suit classifier", vec![Observation::new("spade", 0.999)])
            .with_latency(Duration::from_millis(100)),
    );
    let rank = rank_classifier(vec![Observation::new("ace", 0.99)]);
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(2),
        Arc::new(ConfidenceThresholds::default()),
    );
    let mut results = collect_results(&worker);
    worker.setup(registry_with(&suit, &rank), default_selection()).await.unwrap();

    let handle = worker.handle();
    assert!(submit_frame(&handle, 1));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(submit_frame(&handle, 2));
    assert!(submit_frame(&handle, 3));

    worker.shutdown().await.unwrap();

    // Frame 1 was in flight and completes; 2 and 3 are answered empty
    assert_eq!(next_result(&mut results).await.unwrap().card_string(), "acespade");
    assert!(next_result(&mut results).await.is_none());
    assert!(next_result(&mut results).await.is_none());
    assert_eq!(suit.seen_frames(), vec![1]);

    // Idempotent
    worker.shutdown().await.unwrap();
    assert!(!worker.is_running());
    assert!(!submit_frame(&handle, 4));
}

#[tokio::test]
async fn test_shutdown_waits_for_slow_frame_in_flight() {
    // Both stages together outlast a fixed three second join
    let suit = Arc::new(
        StaticClassifier::new("suit classifier", vec![Observation::new("spade", 0.999)])
            .with_latency(Duration::from_millis(1600)),
    );
    let rank = Arc::new(
        StaticClassifier::new("rank classifier", vec![Observation::new("ace", 0.99)])
            .with_latency(Duration::from_millis(1600)),
    );
    let worker = PipelineWorker::spawn(
        &create_test_pipeline_config(1),
        Arc::new(ConfidenceThresholds::default()),
    );
    let mut results = collect_results(&worker);
    worker.setup(registry_with(&suit, &rank), default_selection()).await.unwrap();

    assert!(submit_frame(&worker.handle(), 1));
    tokio::time::sleep(Duration::from_millis(50)).await;

    worker.shutdown().await.unwrap();

    // Delivered before shutdown returned
    let outcome = results.try_recv().expect("In-flight frame was not answered");
    assert_eq!(outcome.unwrap().card_string(), "acespade");
    assert!(!worker.is_running());
    assert_eq!(worker.stats().frames_processed, 1);
}
