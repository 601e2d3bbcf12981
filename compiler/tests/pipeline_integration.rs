// Integration tests driving the vcc binary end to end.
//
// These tests verify the command-line surface: emit targets, exit codes,
// diagnostic routing to stderr, cost model overrides, and determinism of
// the rendered reports.

use std::path::{Path, PathBuf};
use std::process::Command;

fn vcc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vcc"))
}

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn counter_demo() -> PathBuf {
    project_root().join("demos").join("counter.vio")
}

/// Runs vcc and asserts success, returning stdout.
fn run_vcc(args: &[&str]) -> String {
    let output = Command::new(vcc_binary())
        .args(args)
        .output()
        .expect("failed to run vcc");
    assert!(
        output.status.success(),
        "vcc failed with args {:?}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("non-UTF8 output")
}

/// Runs vcc without asserting on the outcome, for the failure-path tests.
fn run_vcc_raw(args: &[&str]) -> std::process::Output {
    Command::new(vcc_binary())
        .args(args)
        .output()
        .expect("failed to run vcc")
}

fn write_temp_source(name: &str, source: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, source).expect("failed to write temp source");
    path
}

const TWO_PROCESS: &str = "\
signal clk: bit;
signal a: bit<64>;
signal b: bit<64>;
signal y: bit<64>;
signal c: bit;
signal d: bit;

process heavy on posedge(clk) {
    y = a / b;
}

process light on posedge(clk) {
    c = d;
}
";

// ── Happy path ──────────────────────────────────────────────────────────────

/// The default emit target is the text report.
#[test]
fn default_emit_is_the_text_report() {
    let src = counter_demo();
    let stdout = run_vcc(&[src.to_str().unwrap()]);

    assert!(
        stdout.contains("cost report: 1 process(es), 2 lane(s)"),
        "report header missing:\n{}",
        stdout
    );
    assert!(
        stdout.contains("total cost: 40"),
        "counter design should total 40:\n{}",
        stdout
    );
    assert!(
        stdout.contains("process tick (cost 40):"),
        "per-process section missing:\n{}",
        stdout
    );
}

/// The same source produces byte-identical reports across runs.
#[test]
fn report_is_deterministic_across_runs() {
    let src = counter_demo();
    let src = src.to_str().unwrap();

    let first = run_vcc(&[src]);
    let second = run_vcc(&[src]);

    assert_eq!(
        first, second,
        "report output should be byte-identical across runs"
    );
}

/// `--emit json` produces valid JSON carrying provenance fields.
#[test]
fn json_report_carries_provenance() {
    let src = counter_demo();
    let stdout = run_vcc(&[src.to_str().unwrap(), "--emit", "json"]);

    let json: serde_json::Value = serde_json::from_str(&stdout).expect("invalid JSON output");
    assert_eq!(json["compiler_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["total_cost"], 40);
    assert_eq!(json["processes"][0]["name"], "tick");

    let hash = json["source_hash"].as_str().expect("source_hash missing");
    assert_eq!(hash.len(), 64, "sha256 hex digest should be 64 chars");
    assert!(
        hash.chars().all(|c| c.is_ascii_hexdigit()),
        "source_hash should be hex: {}",
        hash
    );
}

/// Different source files produce different source hashes.
#[test]
fn different_sources_get_different_hashes() {
    let first = write_temp_source(
        "vcc_itest_hash_a.vio",
        "signal clk: bit;\nsignal a: bit;\nprocess p on posedge(clk) {\n    a = 1;\n}\n",
    );
    let second = write_temp_source(
        "vcc_itest_hash_b.vio",
        "signal clk: bit;\nsignal a: bit;\nprocess p on posedge(clk) {\n    a = 0;\n}\n",
    );

    let first_json = run_vcc(&[first.to_str().unwrap(), "--emit", "json"]);
    let second_json = run_vcc(&[second.to_str().unwrap(), "--emit", "json"]);

    let _ = std::fs::remove_file(&first);
    let _ = std::fs::remove_file(&second);

    let first_json: serde_json::Value = serde_json::from_str(&first_json).unwrap();
    let second_json: serde_json::Value = serde_json::from_str(&second_json).unwrap();

    assert_ne!(
        first_json["source_hash"], second_json["source_hash"],
        "different source files should have different source_hash"
    );
}

/// `--lanes` controls the width of the emitted plan.
#[test]
fn lanes_flag_controls_plan_width() {
    let src = counter_demo();
    let stdout = run_vcc(&[src.to_str().unwrap(), "--emit", "json", "--lanes", "4"]);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let lanes = json["plan"]["lanes"].as_array().expect("plan.lanes missing");
    assert_eq!(lanes.len(), 4, "plan should carry one entry per lane");
}

/// `--emit plan` prints the lane assignment.
#[test]
fn plan_emit_prints_lane_assignments() {
    let src = counter_demo();
    let stdout = run_vcc(&[src.to_str().unwrap(), "--emit", "plan"]);

    assert!(
        stdout.starts_with("PartitionPlan (2 units over 2 lanes)"),
        "plan header missing:\n{}",
        stdout
    );
    assert!(
        stdout.contains("tick#0: cost 40"),
        "heavy unit missing from plan:\n{}",
        stdout
    );
}

/// `--emit cost-tree` prints one annotated tree per process.
#[test]
fn cost_tree_emit_renders_processes() {
    let src = counter_demo();
    let stdout = run_vcc(&[src.to_str().unwrap(), "--emit", "cost-tree"]);

    assert!(
        stdout.contains("process tick:"),
        "tree header missing:\n{}",
        stdout
    );
    assert!(
        stdout.contains("trigger tick"),
        "trigger line missing:\n{}",
        stdout
    );
}

/// `--process` restricts the cost tree dump to one process.
#[test]
fn process_filter_restricts_the_tree_dump() {
    let src = write_temp_source("vcc_itest_filter.vio", TWO_PROCESS);
    let stdout = run_vcc(&[
        src.to_str().unwrap(),
        "--emit",
        "cost-tree",
        "--process",
        "light",
    ]);
    let _ = std::fs::remove_file(&src);

    assert!(
        stdout.contains("process light:"),
        "selected process missing:\n{}",
        stdout
    );
    assert!(
        !stdout.contains("process heavy:"),
        "filtered process should not appear:\n{}",
        stdout
    );
}

/// A cost model override changes the reported totals.
#[test]
fn cost_model_override_scales_the_report() {
    let model = write_temp_source("vcc_itest_model.json", "{\"call\": 50}\n");
    let src = counter_demo();

    let stdout = run_vcc(&[
        src.to_str().unwrap(),
        "--emit",
        "json",
        "--cost-model",
        model.to_str().unwrap(),
    ]);
    let _ = std::fs::remove_file(&model);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    // Default call weight 14 gives a total of 40; raising it to 50 adds
    // 36 to the one call site in the design.
    assert_eq!(json["total_cost"], 76);
}

/// `--output` writes the report to a file and prints nothing.
#[test]
fn output_flag_writes_report_to_file() {
    let out = std::env::temp_dir().join("vcc_itest_report.txt");
    let src = counter_demo();

    let stdout = run_vcc(&[src.to_str().unwrap(), "--output", out.to_str().unwrap()]);
    assert!(stdout.is_empty(), "stdout should be empty with --output");

    let written = std::fs::read_to_string(&out).expect("output file missing");
    let _ = std::fs::remove_file(&out);
    assert!(
        written.starts_with("cost report:"),
        "file should hold the text report:\n{}",
        written
    );
}

/// Every shipped demo design compiles to a report with no diagnostics.
#[test]
fn all_demos_produce_reports() {
    let demos = std::fs::read_dir(project_root().join("demos")).expect("demos dir");
    let mut seen = 0;
    for entry in demos {
        let path = entry.expect("demos dir entry").path();
        if path.extension().map_or(false, |ext| ext == "vio") {
            seen += 1;
            let output = run_vcc_raw(&[path.to_str().unwrap()]);
            assert!(
                output.status.success(),
                "demo {} failed:\nstderr: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
            assert!(
                output.stderr.is_empty(),
                "demo {} should compile without diagnostics:\n{}",
                path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
        }
    }
    assert!(seen >= 3, "expected at least three demos, found {}", seen);
}

/// Warnings go to stderr and do not block report generation.
#[test]
fn warnings_do_not_block_the_report() {
    let src = write_temp_source(
        "vcc_itest_warn.vio",
        "signal clk: bit;\nsignal a: bit<4>;\nprocess p on posedge(clk) {\n    a = 255;\n}\n",
    );
    let output = run_vcc_raw(&[src.to_str().unwrap()]);
    let _ = std::fs::remove_file(&src);

    assert!(
        output.status.success(),
        "warnings alone should not fail the run"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("warning[W0301]"),
        "truncation warning missing:\n{}",
        stderr
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("cost report:"),
        "report should still be produced:\n{}",
        stdout
    );
}

// ── Failure paths ───────────────────────────────────────────────────────────

/// Syntax errors exit 1 and report on stderr.
#[test]
fn parse_errors_exit_nonzero() {
    let src = write_temp_source("vcc_itest_parse_err.vio", "signal clk bit;\n");
    let output = run_vcc_raw(&[src.to_str().unwrap()]);
    let _ = std::fs::remove_file(&src);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("vcc: parse error"),
        "parse diagnostics missing:\n{}",
        stderr
    );
}

/// Lowering errors stop the pipeline before any report is produced.
#[test]
fn lowering_errors_stop_the_pipeline() {
    let src = write_temp_source(
        "vcc_itest_lower_err.vio",
        "signal clk: bit;\nprocess p on posedge(clk) {\n    x = 1;\n}\n",
    );
    let output = run_vcc_raw(&[src.to_str().unwrap()]);
    let _ = std::fs::remove_file(&src);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error[E0201]"),
        "undeclared-signal diagnostic missing:\n{}",
        stderr
    );
    assert!(
        output.stdout.is_empty(),
        "no report should be emitted on error"
    );
}

/// A missing cost model file is a usage error, not a diagnostic.
#[test]
fn missing_cost_model_is_a_usage_error() {
    let missing = std::env::temp_dir().join("vcc_itest_no_such_model.json");
    let src = counter_demo();
    let output = run_vcc_raw(&[
        src.to_str().unwrap(),
        "--cost-model",
        missing.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("vcc: error:"),
        "usage error missing:\n{}",
        stderr
    );
}

/// Filtering on a process that does not exist is a usage error.
#[test]
fn unknown_process_is_a_usage_error() {
    let src = counter_demo();
    let output = run_vcc_raw(&[src.to_str().unwrap(), "--process", "nosuch"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no process named `nosuch`"),
        "process lookup error missing:\n{}",
        stderr
    );
}
