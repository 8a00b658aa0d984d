#![cfg(unix)]


use buildtsi_runner::error::RebuildError;
use buildtsi_runner::scheduler::JobDescriptor;
use buildtsi_runner::worker::{JobExecutor, JobRunner};
use buildtsi_runner::RunConfig;
use test_harness::FakeInspect;

fn test_executor(fake: &FakeInspect) -> JobExecutor {
    let config = RunConfig::new("/data", "/wal").with_inspect_bin(fake.bin());
    JobExecutor::new(&config)
}

#[tokio::test]
async fn test_execute_passes_buildtsi_arguments() {
    let fake = FakeInspect::new();
    let executor = test_executor(&fake);

    executor
        .run(&JobDescriptor::new("telegraf", 3))
        .await
        .unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            "buildtsi -datadir /data -waldir /wal -max-log-file-size 131072 \
             -database telegraf -shard 3|y"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_execute_answers_prompt_with_y() {
    let fake = FakeInspect::new();
    let executor = test_executor(&fake);

    executor.run(&JobDescriptor::new("db", 0)).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].ends_with("|y"), "stdin was {:?}", calls[0]);
}

#[tokio::test]
async fn test_execute_captures_output_on_success() {
    let fake = FakeInspect::new();
    let executor = test_executor(&fake);
    let job = JobDescriptor::new("db", 4);

    let result = executor.run(&job).await.unwrap();

    assert_eq!(result.job, job);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.output.starts_with("rebuilding buildtsi"));
    assert!(result.output.contains("-shard 4"));
}

#[tokio::test]
async fn test_execute_failure_reports_output() {
    let fake = FakeInspect::failing_on(&[("db2", 0)]);
    let executor = test_executor(&fake);
    let job = JobDescriptor::new("db2", 0);

    let err = executor.run(&job).await.unwrap_err();

    match err {
        RebuildError::JobExecution {
            job: failed,
            exit_code,
            output,
        } => {
            assert_eq!(failed, job);
            assert_eq!(exit_code, Some(1));
            assert!(output.contains("rebuilding buildtsi"));
            assert!(output.contains("index corrupt for db2/0"));
        }
        other => panic!("expected JobExecution, got {:?}", other),
    }
}

#[tokio::test]
async fn test_execute_other_jobs_unaffected_by_failure_rule() {
    let fake = FakeInspect::failing_on(&[("db2", 0)]);
    let executor = test_executor(&fake);

    assert!(executor.run(&JobDescriptor::new("db2", 1)).await.is_ok());
    assert!(executor.run(&JobDescriptor::new("db1", 0)).await.is_ok());
}

#[tokio::test]
async fn test_execute_keeps_stdout_and_stderr_in_write_order() {
    let fake = FakeInspect::with_body("echo one\necho two >&2\necho three\necho four >&2\n");
    let executor = test_executor(&fake);

    let result = executor.run(&JobDescriptor::new("db", 0)).await.unwrap();

    assert_eq!(result.output, "one\ntwo\nthree\nfour\n");
}

#[tokio::test]
async fn test_execute_non_utf8_database_name_is_passed_verbatim() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fake = FakeInspect::with_body("printf '%s' \"$9\" > \"$(dirname \"$0\")/database\"\n");
    let executor = test_executor(&fake);
    let job = JobDescriptor::new(OsStr::from_bytes(b"metrics\xff"), 2);

    executor.run(&job).await.unwrap();

    let written = std::fs::read(fake.bin().with_file_name("database")).unwrap();
    assert_eq!(written, b"metrics\xff");
}

#[tokio::test]
async fn test_execute_missing_binary_is_launch_error() {
    let config =
        RunConfig::new("/data", "/wal").with_inspect_bin("/nonexistent/influx_inspect_12345");
    let executor = JobExecutor::new(&config);

    let err = executor
        .run(&JobDescriptor::new("db", 0))
        .await
        .unwrap_err();

    assert!(matches!(err, RebuildError::JobLaunch { .. }));
    assert!(err.to_string().contains("database (db) shard (0)"));
}
