// The run surface: generate the machine and execute a user program on it
// in one step.

use std::io::Write;

#[test]
fn run_executes_a_program_from_stdin() {
    let mut cmd = assert_cmd::Command::cargo_bin("bfvm").expect("bfvm binary");
    // SETB r5, 42. The terminator is appended by the CLI.
    cmd.arg("run")
        .write_stdin(vec![0x03u8, 0x05, 42, 0, 0, 0])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn run_executes_a_program_from_a_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(&[0x01u8]).expect("write program");

    let mut cmd = assert_cmd::Command::cargo_bin("bfvm").expect("bfvm binary");
    cmd.arg("run")
        .arg("--file")
        .arg(file.path())
        .assert()
        .success()
        .stdout("");
}

#[test]
fn run_raw_requires_an_explicit_terminator() {
    let mut cmd = assert_cmd::Command::cargo_bin("bfvm").expect("bfvm binary");
    cmd.args(["run", "--raw"])
        .write_stdin(vec![0x01u8, 0, 0, 0, 0])
        .assert()
        .success();
}

#[test]
fn run_reports_a_missing_file() {
    let mut cmd = assert_cmd::Command::cargo_bin("bfvm").expect("bfvm binary");
    cmd.args(["run", "--file", "/no/such/program.bin"])
        .assert()
        .failure();
}
