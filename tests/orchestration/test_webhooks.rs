//! Callback ingestion: idempotency, replacement, concurrency, late delivery.

use futures_util::future::join_all;
use judge_orchestrator_lib::db::ResultUpdate;
use judge_orchestrator_lib::error::AppError;
use judge_orchestrator_lib::models::{SubmissionKind, SubmissionStatus, TestCaseOutcome};
use uuid::Uuid;

use super::test_helpers::*;

#[tokio::test]
async fn test_duplicate_webhook_does_not_double_count() {
    let env = TestEnv::start(2).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let result_id = created.test_cases[0].result_id;

    let first = env.ingestor.ingest(result_id, passed()).await.unwrap();
    assert_eq!(first.disposition, "applied");

    let second = env.ingestor.ingest(result_id, passed()).await.unwrap();
    assert_eq!(second.disposition, "duplicate");
    assert_eq!(second.submission_status, SubmissionStatus::Processing);

    let status = env
        .orchestrator
        .get_run_status(created.submission_id)
        .await
        .unwrap();
    assert_eq!(status.finished_count, 1);
    assert_eq!(status.passed_count, 1);
    assert_eq!(status.total, 2);
}

#[tokio::test]
async fn test_later_terminal_outcome_replaces_stored_one() {
    let env = TestEnv::start(2).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let ids: Vec<_> = created.test_cases.iter().map(|t| t.result_id).collect();

    env.ingestor.ingest(ids[0], passed()).await.unwrap();
    let ack = env.ingestor.ingest(ids[0], wrong_answer()).await.unwrap();
    assert_eq!(ack.disposition, "replaced");
    assert_eq!(ack.submission_status, SubmissionStatus::Processing);
    assert_eq!(env.outcome(ids[0]).await, TestCaseOutcome::Failed);

    let stored = env.pool.get_result(ids[0]).await.unwrap().unwrap();
    assert_eq!(stored.stdout.as_deref(), Some("nope\n"));
    assert_eq!(stored.judge_status_code, Some(4));

    let status = env
        .orchestrator
        .get_run_status(created.submission_id)
        .await
        .unwrap();
    assert_eq!(status.finished_count, 1);
    assert_eq!(status.passed_count, 0);

    // The judge's last word decides the verdict
    let ack = env.ingestor.ingest(ids[1], passed()).await.unwrap();
    assert_eq!(ack.submission_status, SubmissionStatus::WrongAnswer);
}

#[tokio::test]
async fn test_failed_result_can_be_replaced_by_pass() {
    let env = TestEnv::start(1).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let result_id = created.test_cases[0].result_id;

    // Applying directly keeps the submission processing
    env.pool
        .apply_result(result_id, &ResultUpdate::from(wrong_answer()))
        .await
        .unwrap();
    let ack = env.ingestor.ingest(result_id, passed()).await.unwrap();
    assert_eq!(ack.disposition, "replaced");
    assert_eq!(ack.submission_status, SubmissionStatus::Accepted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_apply_once() {
    let env = TestEnv::start(2).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let result_id = created.test_cases[0].result_id;

    let deliveries = (0..8).map(|_| {
        let ingestor = env.ingestor.clone();
        tokio::spawn(async move { ingestor.ingest(result_id, passed()).await })
    });
    let acks: Vec<_> = join_all(deliveries)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let applied = acks.iter().filter(|a| a.disposition == "applied").count();
    assert_eq!(applied, 1);
    assert!(
        acks.iter()
            .all(|a| a.disposition == "applied" || a.disposition == "duplicate")
    );
    assert!(
        acks.iter()
            .all(|a| a.submission_status == SubmissionStatus::Processing)
    );

    let status = env
        .orchestrator
        .get_run_status(created.submission_id)
        .await
        .unwrap();
    assert_eq!(status.finished_count, 1);
    assert_eq!(status.passed_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_webhooks_racing_polls_agree_on_verdict() {
    let env = TestEnv::start(3).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let ids: Vec<_> = created.test_cases.iter().map(|t| t.result_id).collect();
    env.ingestor.ingest(ids[0], passed()).await.unwrap();

    // Each remaining result is delivered three times
    let deliveries = ids[1..].iter().flat_map(|&id| [id; 3]);
    let webhooks = deliveries.map(|id| {
        let ingestor = env.ingestor.clone();
        tokio::spawn(async move {
            ingestor
                .ingest(id, passed())
                .await
                .map(|ack| ack.submission_status)
        })
    });
    let polls = (0..6).map(|_| {
        let orchestrator = env.orchestrator.clone();
        let submission_id = created.submission_id;
        tokio::spawn(async move {
            orchestrator
                .get_run_status(submission_id)
                .await
                .map(|s| s.status)
        })
    });

    let mut seen: Vec<SubmissionStatus> = join_all(webhooks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    seen.extend(
        join_all(polls)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap()),
    );

    assert!(seen.contains(&SubmissionStatus::Accepted));
    assert!(
        seen.iter()
            .all(|s| *s == SubmissionStatus::Processing || *s == SubmissionStatus::Accepted)
    );

    let done = env
        .orchestrator
        .get_run_status(created.submission_id)
        .await
        .unwrap();
    assert_eq!(done.status, SubmissionStatus::Accepted);
    assert_eq!(done.finished_count, 3);
    assert_eq!(done.passed_count, 3);
    assert!(done.finalized_at.is_some());
}

#[tokio::test]
async fn test_non_terminal_status_keeps_result_pending() {
    let env = TestEnv::start(1).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let result_id = created.test_cases[0].result_id;

    let ack = env
        .ingestor
        .ingest(result_id, callback(2, ""))
        .await
        .unwrap();
    assert_eq!(ack.disposition, "progress");
    assert_eq!(ack.submission_status, SubmissionStatus::Processing);

    let stored = env.pool.get_result(result_id).await.unwrap().unwrap();
    assert_eq!(stored.outcome, "pending");
    assert_eq!(stored.judge_status_text.as_deref(), Some("Processing"));

    // Terminal result still lands afterwards
    let ack = env.ingestor.ingest(result_id, passed()).await.unwrap();
    assert_eq!(ack.disposition, "applied");
    assert_eq!(ack.submission_status, SubmissionStatus::Accepted);

    // A stale in-queue status arriving late changes nothing
    let ack = env
        .ingestor
        .ingest(result_id, callback(1, ""))
        .await
        .unwrap();
    assert_eq!(ack.disposition, "ignored");
    assert_eq!(env.outcome(result_id).await, TestCaseOutcome::Passed);
}

#[tokio::test]
async fn test_late_webhook_after_finalization_is_a_no_op() {
    let env = TestEnv::start(1).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let result_id = created.test_cases[0].result_id;

    let ack = env.ingestor.ingest(result_id, passed()).await.unwrap();
    assert_eq!(ack.submission_status, SubmissionStatus::Accepted);
    let before = env.pool.get_result(result_id).await.unwrap().unwrap();

    // Same payload again after finalization
    let ack = env.ingestor.ingest(result_id, passed()).await.unwrap();
    assert_eq!(ack.disposition, "ignored");
    assert_eq!(ack.submission_status, SubmissionStatus::Accepted);

    // Different payload after finalization
    let ack = env.ingestor.ingest(result_id, wrong_answer()).await.unwrap();
    assert_eq!(ack.disposition, "ignored");

    let after = env.pool.get_result(result_id).await.unwrap().unwrap();
    assert_eq!(before, after);

    let status = env
        .orchestrator
        .get_run_status(created.submission_id)
        .await
        .unwrap();
    assert_eq!(status.status, SubmissionStatus::Accepted);
}

#[tokio::test]
async fn test_unknown_result_not_found() {
    let env = TestEnv::start(1).await;
    let err = env
        .ingestor
        .ingest(Uuid::now_v7(), passed())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_invalid_status_rejected() {
    let env = TestEnv::start(1).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    let result_id = created.test_cases[0].result_id;

    let err = env
        .ingestor
        .ingest(result_id, callback(0, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(env.outcome(result_id).await, TestCaseOutcome::Pending);
}

#[tokio::test]
async fn test_secret_required_when_configured() {
    let catalog = StaticCatalog::default().with_problem(PROBLEM, corpus(1));
    let env = TestEnv::start_with(catalog, Some("hook-secret")).await;

    assert!(env.ingestor.authorize(Some("hook-secret")).is_ok());
    assert!(matches!(
        env.ingestor.authorize(Some("wrong")),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        env.ingestor.authorize(None),
        Err(AppError::Unauthorized(_))
    ));
}
