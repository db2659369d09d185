//! Finalization races and status monotonicity.

use futures_util::future::join_all;
use judge_orchestrator_lib::db::{NewSubmission, ResultUpdate};
use judge_orchestrator_lib::error::AppError;
use judge_orchestrator_lib::models::{SubmissionKind, SubmissionStatus};
use uuid::Uuid;

use super::test_helpers::*;

/// Processing submission with every result passed but no verdict stored yet.
async fn fully_reported(env: &TestEnv, cases: usize) -> Uuid {
    let (submission, results) = env
        .pool
        .create_submission(
            NewSubmission {
                user_id: "user-1".to_string(),
                problem_slug: PROBLEM.to_string(),
                language_id: PYTHON,
                source_code: "print(1)".to_string(),
                kind: SubmissionKind::Submit,
            },
            cases,
        )
        .await
        .unwrap();
    assert!(env.pool.mark_processing(submission.id).await.unwrap());

    for result in &results {
        env.pool
            .apply_result(result.id, &ResultUpdate::from(passed()))
            .await
            .unwrap();
    }
    submission.id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_finalize_has_one_winner() {
    let env = TestEnv::start(1).await;
    let submission_id = fully_reported(&env, 3).await;

    let attempts = (0..16).map(|i| {
        let pool = env.pool.clone();
        let status = if i % 2 == 0 {
            SubmissionStatus::Accepted
        } else {
            SubmissionStatus::Errored
        };
        tokio::spawn(async move { pool.finalize_if_processing(submission_id, status).await })
    });

    let winners = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);

    let stored = env.pool.get_submission(submission_id).await.unwrap().unwrap();
    assert!(SubmissionStatus::parse(&stored.status).unwrap().is_final());
    assert!(stored.finalized_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_polls_agree_on_verdict() {
    let env = TestEnv::start(1).await;
    let submission_id = fully_reported(&env, 2).await;

    let polls = (0..10).map(|_| {
        let orchestrator = env.orchestrator.clone();
        tokio::spawn(async move { orchestrator.try_finalize(submission_id).await })
    });

    let statuses: Vec<_> = join_all(polls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(
        statuses
            .iter()
            .all(|s| s.status == SubmissionStatus::Accepted)
    );
    let finalized_at = statuses[0].finalized_at;
    assert!(finalized_at.is_some());
    assert!(statuses.iter().all(|s| s.finalized_at == finalized_at));
}

#[tokio::test]
async fn test_final_status_never_changes() {
    let env = TestEnv::start(1).await;
    let submission_id = fully_reported(&env, 1).await;

    assert!(
        env.pool
            .finalize_if_processing(submission_id, SubmissionStatus::Accepted)
            .await
            .unwrap()
    );
    assert!(
        !env.pool
            .finalize_if_processing(submission_id, SubmissionStatus::Errored)
            .await
            .unwrap()
    );
    assert!(!env.pool.mark_processing(submission_id).await.unwrap());

    let status = env.orchestrator.expire(submission_id).await.unwrap();
    assert_eq!(status, SubmissionStatus::Accepted);
}

#[tokio::test]
async fn test_finalize_to_non_final_status_rejected() {
    let env = TestEnv::start(1).await;
    let submission_id = fully_reported(&env, 1).await;

    let err = env
        .pool
        .finalize_if_processing(submission_id, SubmissionStatus::Queued)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let stored = env.pool.get_submission(submission_id).await.unwrap().unwrap();
    assert_eq!(stored.status, "processing");
}

#[tokio::test]
async fn test_no_finalize_while_results_pending() {
    let env = TestEnv::start(2).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();

    env.ingestor
        .ingest(created.test_cases[0].result_id, passed())
        .await
        .unwrap();

    for _ in 0..3 {
        let status = env
            .orchestrator
            .try_finalize(created.submission_id)
            .await
            .unwrap();
        assert_eq!(status.status, SubmissionStatus::Processing);
        assert!(status.finalized_at.is_none());
    }
}
