use std::fs;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

fn shell_command(cwd: &Path, history: Option<&Path>) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ccsh"));
    // Keep stdout byte-comparable even where the line editor echoes the prompt.
    cmd.arg("--prompt").arg("");
    if let Some(history) = history {
        cmd.arg("--history-file").arg(history);
    }
    cmd.current_dir(cwd)
        .env_remove("CCSH_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn run_in(cwd: &Path, history: Option<&Path>, input: impl AsRef<[u8]>) -> Output {
    let mut child = shell_command(cwd, history).spawn().expect("spawn ccsh");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_ref())
        .expect("write input");
    child.wait_with_output().expect("wait for ccsh")
}

/// Runs `input` in a fresh scratch directory with the history kept elsewhere.
fn run(input: impl AsRef<[u8]>) -> (Output, TempDir, TempDir) {
    let cwd = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let out = run_in(cwd.path(), Some(&state.path().join("history")), input);
    (out, cwd, state)
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn ls_prints_entries_space_separated() {
    let cwd = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    fs::write(cwd.path().join("beta"), "").unwrap();
    fs::write(cwd.path().join("alpha"), "").unwrap();

    let out = run_in(cwd.path(), Some(&state.path().join("history")), "ls\n");

    assert!(out.status.success());
    assert!(stdout(&out).contains("alpha beta\n"), "stdout: {}", stdout(&out));
}

#[test]
fn echo_into_wc_counts_six_bytes() {
    let (out, _cwd, _state) = run("echo hello | wc -c\n");
    assert!(out.status.success());
    assert!(stdout(&out).lines().any(|l| l.trim() == "6"), "stdout: {}", stdout(&out));
}

#[test]
fn pwd_prints_the_working_directory() {
    let (out, cwd, _state) = run("pwd\n");
    let expected = canonical(cwd.path()).display().to_string();
    assert!(
        stdout(&out).lines().any(|l| l.ends_with(&expected)),
        "stdout: {}",
        stdout(&out)
    );
}

#[test]
fn blank_line_runs_nothing_but_is_recorded() {
    let (out, _cwd, state) = run("   \n");
    assert!(out.status.success());
    assert!(stderr(&out).is_empty(), "stderr: {}", stderr(&out));
    assert_eq!(fs::read_to_string(state.path().join("history")).unwrap(), "   \n");
}

#[test]
fn exit_stops_before_the_next_line() {
    let (out, _cwd, state) = run("exit\necho after\n");
    assert_eq!(out.status.code(), Some(0));
    assert!(!stdout(&out).contains("after"));
    assert_eq!(fs::read_to_string(state.path().join("history")).unwrap(), "exit\n");
}

#[test]
fn missing_command_does_not_stop_its_neighbours() {
    let (out, _cwd, _state) = run("doesnotexist123 | echo still\necho next\n");
    assert!(out.status.success());
    let stdout = stdout(&out);
    assert!(stdout.contains("still"), "stdout: {}", stdout);
    assert!(stdout.contains("next"), "stdout: {}", stdout);
    assert!(
        stderr(&out).contains("doesnotexist123: command not found"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn syntax_error_is_reported_and_the_shell_goes_on() {
    let (out, _cwd, _state) = run("echo a | | wc\necho ok\n");
    assert!(out.status.success());
    assert!(stderr(&out).contains("syntax error"), "stderr: {}", stderr(&out));
    let stdout = stdout(&out);
    assert!(!stdout.lines().any(|l| l.trim() == "a"), "stdout: {}", stdout);
    assert!(stdout.contains("ok"), "stdout: {}", stdout);
}

#[test]
fn pipelines_match_the_system_shell() {
    let lines = [
        "echo hello | wc -c",
        "seq 1 200 | tail -n 2",
        "seq 1 20 | sort -r | head -n 3",
        "echo one two three | tr a-z A-Z | wc -w",
    ];
    for line in lines {
        let (out, _cwd, _state) = run(&format!("{}\n", line));
        let expected = Command::new("sh").arg("-c").arg(line).output().unwrap();
        assert_eq!(
            stdout(&out),
            String::from_utf8_lossy(&expected.stdout),
            "pipeline: {}",
            line
        );
    }
}

#[test]
fn builtins_feed_later_stages() {
    let cwd = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(cwd.path().join(name), "").unwrap();
    }

    let out = run_in(
        cwd.path(),
        Some(&state.path().join("history")),
        "ls | wc -w\npwd | cat\n",
    );

    let stdout = stdout(&out);
    assert!(stdout.lines().any(|l| l.trim() == "3"), "stdout: {}", stdout);
    let expected = canonical(cwd.path()).display().to_string();
    assert!(stdout.lines().any(|l| l.ends_with(&expected)), "stdout: {}", stdout);
}

#[test]
fn cd_alone_persists_across_lines() {
    let cwd = tempfile::tempdir().unwrap();
    fs::create_dir(cwd.path().join("sub")).unwrap();
    let state = tempfile::tempdir().unwrap();

    let out = run_in(
        cwd.path(),
        Some(&state.path().join("history")),
        "cd sub\npwd\n",
    );

    let expected = canonical(&cwd.path().join("sub")).display().to_string();
    assert!(
        stdout(&out).lines().any(|l| l.ends_with(&expected)),
        "stdout: {}",
        stdout(&out)
    );
}

#[test]
fn cd_inside_a_pipeline_does_not_persist() {
    let cwd = tempfile::tempdir().unwrap();
    fs::create_dir(cwd.path().join("sub")).unwrap();
    let state = tempfile::tempdir().unwrap();

    let out = run_in(
        cwd.path(),
        Some(&state.path().join("history")),
        "cd sub | true\npwd\n",
    );

    let expected = canonical(cwd.path()).display().to_string();
    assert!(
        stdout(&out).lines().any(|l| l.ends_with(&expected)),
        "stdout: {}",
        stdout(&out)
    );
}

#[test]
fn history_replays_previous_lines_from_the_starting_directory() {
    let cwd = tempfile::tempdir().unwrap();
    fs::create_dir(cwd.path().join("sub")).unwrap();

    let out = run_in(cwd.path(), None, "echo one\ncd sub\nhistory\n");

    assert!(
        stdout(&out).contains("echo one\ncd sub\nhistory\n"),
        "stdout: {}",
        stdout(&out)
    );
    assert!(cwd.path().join(".ccsh_history").exists());
    assert!(!cwd.path().join("sub").join(".ccsh_history").exists());
}

fn fd_numbers(out: &Output) -> Vec<u32> {
    let mut fds: Vec<u32> = stdout(out)
        .split_whitespace()
        .filter_map(|w| w.parse().ok())
        .collect();
    fds.sort();
    fds
}

#[test]
fn stages_hold_no_extra_descriptors() {
    let (alone, _a, _sa) = run("/bin/ls /proc/self/fd\n");
    let (piped, _b, _sb) = run("true | /bin/ls /proc/self/fd | cat\n");

    let alone = fd_numbers(&alone);
    assert!(alone.starts_with(&[0, 1, 2]), "fds: {:?}", alone);
    assert_eq!(fd_numbers(&piped), alone);
}

fn wait_timeout(child: &mut Child, limit: Duration) -> Option<std::process::ExitStatus> {
    let start = Instant::now();
    while start.elapsed() < limit {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(50));
    }
    None
}

#[test]
fn interrupt_kills_the_stage_not_the_shell() {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let cwd = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let mut cmd = shell_command(cwd.path(), Some(&state.path().join("history")));
    cmd.process_group(0);
    let mut child = cmd.spawn().expect("spawn ccsh");
    let mut stdin = child.stdin.take().unwrap();

    stdin.write_all(b"sleep 30\n").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(500));

    let started = Instant::now();
    killpg(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    stdin.write_all(b"echo alive\n").unwrap();
    drop(stdin);

    let status = wait_timeout(&mut child, Duration::from_secs(20));
    if status.is_none() {
        let _ = child.kill();
    }
    let out = child.wait_with_output().unwrap();

    assert!(started.elapsed() < Duration::from_secs(20), "sleep was not interrupted");
    assert!(out.status.success());
    assert!(stdout(&out).contains("alive"), "stdout: {}", stdout(&out));
}

#[test]
fn non_utf8_input_is_passed_through() {
    let (out, _cwd, state) = run(b"echo caf\xe9\necho next\n");

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(contains_bytes(&out.stdout, b"caf\xe9\n"), "stdout: {:?}", out.stdout);
    assert!(stdout(&out).contains("next"), "stdout: {}", stdout(&out));
    assert_eq!(
        fs::read(state.path().join("history")).unwrap(),
        b"echo caf\xe9\necho next\n"
    );
}

#[test]
fn ls_and_pwd_ignore_flag_like_arguments() {
    let cwd = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    fs::write(cwd.path().join("beta"), "").unwrap();
    fs::write(cwd.path().join("alpha"), "").unwrap();

    let out = run_in(
        cwd.path(),
        Some(&state.path().join("history")),
        "ls -la\npwd -P\n",
    );

    assert!(stderr(&out).is_empty(), "stderr: {}", stderr(&out));
    let stdout = stdout(&out);
    assert!(stdout.contains("alpha beta\n"), "stdout: {}", stdout);
    let expected = canonical(cwd.path()).display().to_string();
    assert!(stdout.lines().any(|l| l.ends_with(&expected)), "stdout: {}", stdout);
}

#[test]
fn failing_cd_is_silent() {
    let (out, cwd, _state) =
        run("cd /nonexistent_ccsh_dir\ncd /nonexistent_ccsh_dir | cat\npwd\n");

    assert!(out.status.success());
    assert!(stderr(&out).is_empty(), "stderr: {}", stderr(&out));
    let expected = canonical(cwd.path()).display().to_string();
    assert!(
        stdout(&out).lines().any(|l| l.ends_with(&expected)),
        "stdout: {}",
        stdout(&out)
    );
}
