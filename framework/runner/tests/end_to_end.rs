#![cfg(unix)]

use std::io::BufRead;

use clap::Parser;
use lapse_runner::prelude::{run, AbortedError, LapseCli};
use lapse_summary_model::{load_report, TraceRecord};
use pretty_assertions::assert_eq;

fn cli(args: &[&str]) -> LapseCli {
    LapseCli::parse_from(std::iter::once("lapse").chain(args.iter().copied()))
}

#[test]
fn json_summary_and_raw_traces() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("summary.json");
    let raw = dir.path().join("traces.jsonl");

    run(cli(&[
        "true",
        "exit 1",
        "-n",
        "3",
        "--alternate",
        "--no-progress",
        "--format",
        "json",
        "--run-id",
        "e2e",
        "--out",
        out.to_str().unwrap(),
        "--raw-out",
        raw.to_str().unwrap(),
    ]))
    .unwrap();

    let report = load_report(std::fs::File::open(&out).unwrap()).unwrap();
    assert_eq!("e2e", report.run.run_id);
    assert_eq!(vec!["true", "exit 1"], report.run.scenarios);
    assert!(report.run.alternate);

    let ok = report.scenario("true").unwrap();
    assert_eq!(3, ok.count);
    assert_eq!(0.0, ok.error_rate);
    assert!(ok.perceived.min_ns > 0);

    let failing = report.scenario("exit 1").unwrap();
    assert_eq!(3, failing.count);
    assert_eq!(1.0, failing.error_rate);

    let records = std::io::BufReader::new(std::fs::File::open(&raw).unwrap())
        .lines()
        .map(|line| serde_json::from_str::<TraceRecord>(&line.unwrap()).unwrap())
        .collect::<Vec<_>>();
    let ids = records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>();
    assert_eq!(
        vec!["true", "exit 1", "true", "exit 1", "true", "exit 1"],
        ids
    );
    assert!(records[0].error.is_none());
    assert!(records[1].error.is_some());
}

#[test]
fn config_file_with_hooks() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bench.yaml");
    let out = dir.path().join("summary.csv");
    std::fs::write(
        &config,
        r#"
executions: 2
scenarios:
  - name: touch
    workingDir: WORKDIR
    env:
      MARKER: lapse
    beforeAll:
      cmd: [sh, -c, "echo start > log.txt"]
    afterEach:
      cmd: [sh, -c, "echo each >> log.txt"]
    afterAll:
      cmd: [sh, -c, "echo \"done $MARKER\" >> log.txt"]
    command:
      cmd: ["true"]
"#
        .replace("WORKDIR", dir.path().to_str().unwrap()),
    )
    .unwrap();

    run(cli(&[
        "--config",
        config.to_str().unwrap(),
        "--no-progress",
        "--format",
        "csv",
        "--out",
        out.to_str().unwrap(),
    ]))
    .unwrap();

    let log = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
    assert_eq!("start\neach\neach\ndone lapse\n", log);

    let csv = std::fs::read_to_string(&out).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("scenario,"));
    assert!(lines.next().unwrap().starts_with("touch,2,"));
}

#[test]
fn fail_fast_still_writes_partial_report() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("summary.json");

    let result = run(cli(&[
        "true",
        "exit 1",
        "true; true",
        "-n",
        "2",
        "--fail-fast",
        "--no-progress",
        "--format",
        "json",
        "--out",
        out.to_str().unwrap(),
    ]));

    assert!(result.unwrap_err().is::<AbortedError>());

    let report = load_report(std::fs::File::open(&out).unwrap()).unwrap();
    assert_eq!(2, report.scenario("true").unwrap().count);
    assert_eq!(1, report.scenario("exit 1").unwrap().count);
    assert!(report.scenario("true; true").is_none());
}
