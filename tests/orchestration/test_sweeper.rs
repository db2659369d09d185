//! Stale submission sweep.

use std::time::Duration;

use judge_orchestrator_lib::db::NewSubmission;
use judge_orchestrator_lib::models::{SubmissionKind, SubmissionStatus};
use judge_orchestrator_lib::services::{SweepReport, run_sweep};

use super::test_helpers::*;

#[tokio::test]
async fn test_sweep_resolves_stale_submissions() {
    let env = TestEnv::start(2).await;

    let stuck = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();
    env.ingestor
        .ingest(stuck.test_cases[0].result_id, passed())
        .await
        .unwrap();

    let reported = env
        .orchestrator
        .create_submission(SubmissionKind::Run, solution())
        .await
        .unwrap();
    // Write the only result without going through the ingestor so nothing finalizes it
    env.pool
        .apply_result(
            reported.test_cases[0].result_id,
            &judge_orchestrator_lib::db::ResultUpdate::from(passed()),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let report = run_sweep(&env.orchestrator, 0).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            finalized: 1,
            errored: 1,
            failures: 0,
        }
    );

    let stuck_status = env
        .orchestrator
        .get_run_status(stuck.submission_id)
        .await
        .unwrap();
    assert_eq!(stuck_status.status, SubmissionStatus::Errored);
    assert!(stuck_status.finalized_at.is_some());

    let reported_status = env
        .orchestrator
        .get_run_status(reported.submission_id)
        .await
        .unwrap();
    assert_eq!(reported_status.status, SubmissionStatus::Accepted);

    // A callback arriving after expiry changes nothing
    let ack = env
        .ingestor
        .ingest(stuck.test_cases[1].result_id, passed())
        .await
        .unwrap();
    assert_eq!(ack.disposition, "ignored");
    assert_eq!(ack.submission_status, SubmissionStatus::Errored);

    // Nothing left to sweep
    let report = run_sweep(&env.orchestrator, 0).await.unwrap();
    assert_eq!(report, SweepReport::default());
}

#[tokio::test]
async fn test_sweep_leaves_recent_submissions_alone() {
    let env = TestEnv::start(1).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();

    let report = run_sweep(&env.orchestrator, 3600).await.unwrap();
    assert_eq!(report, SweepReport::default());

    let status = env
        .orchestrator
        .get_run_status(created.submission_id)
        .await
        .unwrap();
    assert_eq!(status.status, SubmissionStatus::Processing);
}

#[tokio::test]
async fn test_sweep_resolves_submission_left_queued() {
    let env = TestEnv::start(2).await;

    // Create committed but the move to processing never happened
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
            2,
        )
        .await
        .unwrap();
    assert_eq!(submission.status, "queued");

    tokio::time::sleep(Duration::from_millis(20)).await;
    let report = run_sweep(&env.orchestrator, 0).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            finalized: 0,
            errored: 1,
            failures: 0,
        }
    );

    let status = env
        .orchestrator
        .get_run_status(submission.id)
        .await
        .unwrap();
    assert_eq!(status.status, SubmissionStatus::Errored);
    assert!(status.finalized_at.is_some());

    let ack = env
        .ingestor
        .ingest(results[0].id, passed())
        .await
        .unwrap();
    assert_eq!(ack.disposition, "ignored");

    let report = run_sweep(&env.orchestrator, 0).await.unwrap();
    assert_eq!(report, SweepReport::default());
}

#[tokio::test]
async fn test_sweep_skips_out_of_range_threshold() {
    let env = TestEnv::start(1).await;
    let created = env
        .orchestrator
        .create_submission(SubmissionKind::Submit, solution())
        .await
        .unwrap();

    let report = run_sweep(&env.orchestrator, u64::MAX).await.unwrap();
    assert_eq!(report, SweepReport::default());

    let status = env
        .orchestrator
        .get_run_status(created.submission_id)
        .await
        .unwrap();
    assert_eq!(status.status, SubmissionStatus::Processing);
}
