use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn protolex() -> Command {
    let mut cmd = Command::cargo_bin("protolex").expect("binary exists");
    cmd.env_remove("PROTOLEX_LOG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn protolex_run_quickstart() {
    let mut cmd = protolex();
    cmd.arg("run").arg("demos/quickstart.plx");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Hello from Protolex!"))
        .stdout(predicate::str::contains("circle area 12.57"))
        .stdout(predicate::str::contains("caught: object is frozen"))
        .stdout(predicate::str::contains("resized to 3.0"));
}

#[test]
fn protolex_eval_snippet() {
    let mut cmd = protolex();
    cmd.arg("eval").arg("1 + 2 + 3");
    cmd.assert().success();
}

#[test]
fn eval_prints_through_log_module() {
    let mut cmd = protolex();
    cmd.arg("eval")
        .arg("import log from \"runtime/log\"\nlog.info(6 * 7)\nlog.error(\"oops\")");
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("42\n"))
        .stderr(predicate::str::contains("oops"));
}

#[test]
fn uncaught_exception_exits_with_failure() {
    let mut cmd = protolex();
    cmd.arg("eval").arg("throw \"bad thing\"");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("uncaught exception: bad thing"));
}

#[test]
fn parse_errors_are_fatal_with_position() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("broken.plx");
    fs::write(&script, "x = 1\ny = )\n").expect("write script");

    let mut cmd = protolex();
    cmd.arg("run").arg(&script);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("fatal: unexpected token"))
        .stderr(predicate::str::contains("broken.plx:2:5"));
}

#[test]
fn sys_exit_sets_process_status() {
    let mut cmd = protolex();
    cmd.arg("eval").arg("import sys from \"runtime/sys\"\nsys.exit(7)");
    cmd.assert().code(7);
}

#[test]
fn sys_exit_out_of_range_is_an_uncaught_exception() {
    let mut cmd = protolex();
    cmd.arg("eval").arg("import sys from \"runtime/sys\"\nsys.exit(256)");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("sys.exit expects (int)"));
}

#[test]
fn run_passes_trailing_arguments_to_sys_args() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("args.plx");
    fs::write(
        &script,
        "import sys from \"runtime/sys\"\nimport log from \"runtime/log\"\na = sys.args.tail\nlog.info(a.head)\nlog.info(a.tail.head)\n",
    )
    .expect("write script");

    let mut cmd = protolex();
    cmd.arg("run").arg(&script).arg("alpha").arg("--beta");
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("alpha\n--beta\n"));
}

#[test]
fn run_resolves_imports_next_to_the_script() {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("helper.plx"), "[value = 99]\n").expect("write helper");
    let script = dir.path().join("main.plx");
    fs::write(
        &script,
        "import helper from \"helper.plx\"\nimport log from \"runtime/log\"\nlog.info(helper.value)\n",
    )
    .expect("write script");

    let mut cmd = protolex();
    cmd.current_dir(std::env::temp_dir()).arg("run").arg(&script);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("99"));
}

#[test]
fn max_call_depth_flag_limits_recursion() {
    let mut cmd = protolex();
    cmd.arg("--max-call-depth")
        .arg("10")
        .arg("eval")
        .arg("f = fn(n) { if n == 0 { 0 } else { f(n - 1) } }\nf(50)");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("uncaught exception: stack overflow"));
}

#[test]
fn missing_script_is_reported() {
    let dir = tempdir().expect("create temp dir");
    let mut cmd = protolex();
    cmd.arg("run").arg(dir.path().join("nope.plx"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("fatal:"));
}

#[test]
fn repl_evaluates_lines_from_stdin() {
    let mut cmd = protolex();
    cmd.arg("repl").write_stdin("x = 20\nx * 2 + 2\nthrow 1\n:quit\n");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("42"))
        .stderr(predicate::str::contains("uncaught exception: 1"));
}
