//! End-to-end runs of `spool watch` against a temporary inbox, with a shell
//! script standing in for `lp`.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tempfile::TempDir;

struct Fixture {
    home: TempDir,
    inbox: PathBuf,
    log: PathBuf,
    config: PathBuf,
}

impl Fixture {
    /// `print_script` runs as `sh -c <script> sh <path>`.
    fn new(print_script: &str) -> Self {
        let home = TempDir::new().expect("home");
        let inbox = home.path().join("inbox");
        fs::create_dir_all(&inbox).expect("mkdir inbox");
        let log = home.path().join("printed.log");
        let config = home.path().join("spool.yaml");

        let script = print_script.replace("LOG", &log.display().to_string());
        let yaml = format!(
            "keywords: [label_, PackingList]\n\
             settle_interval_ms: 100\n\
             poll_interval_secs: 1\n\
             grace_period_secs: 5\n\
             print_command: [sh, -c, {script:?}, sh, \"{{path}}\"]\n"
        );
        fs::write(&config, yaml).expect("write config");

        Self {
            home,
            inbox,
            log,
            config,
        }
    }

    fn drop_file(&self, name: &str) -> PathBuf {
        let path = self.inbox.join(name);
        fs::write(&path, b"%PDF-1.4 test").expect("write inbox file");
        path
    }

    fn printed(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn start(&self, extra: &[&str]) -> Daemon {
        let child = Command::new(env!("CARGO_BIN_EXE_spool"))
            .env("HOME", self.home.path())
            .env("RUST_LOG", "debug")
            .arg("watch")
            .arg("--config")
            .arg(&self.config)
            .arg("--dir")
            .arg(&self.inbox)
            .arg("--skip-printer-check")
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn spool watch");
        Daemon { child }
    }
}

struct Daemon {
    child: Child,
}

impl Daemon {
    /// SIGTERM and wait for the orderly exit.
    fn terminate(&mut self) -> ExitStatus {
        let _ = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .status();

        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.child.try_wait() {
                return status;
            }
            sleep(Duration::from_millis(50));
        }
        let _ = self.child.kill();
        self.child.wait().expect("wait after kill")
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(50));
    }
    false
}

fn settle_time() {
    sleep(Duration::from_millis(1500));
}

#[test]
fn poll_mode_prints_matching_file_and_leaves_others() {
    let fixture = Fixture::new("echo \"$1\" >> LOG");
    let label = fixture.drop_file("label_001.pdf");
    let notes = fixture.drop_file("notes.txt");

    let mut daemon = fixture.start(&["--poll"]);
    assert!(
        wait_until(Duration::from_secs(15), || !label.exists()),
        "label file was not printed and removed",
    );
    settle_time();

    let status = daemon.terminate();
    assert!(status.success(), "orderly shutdown should exit 0, got {status}");
    assert!(notes.exists(), "non-matching file must be left alone");
    let printed = fixture.printed();
    assert_eq!(printed.len(), 1, "printed: {printed:?}");
    assert!(Path::new(&printed[0]).ends_with("label_001.pdf"));
}

#[test]
fn event_mode_prints_file_created_after_startup() {
    let fixture = Fixture::new("echo \"$1\" >> LOG");
    let mut daemon = fixture.start(&[]);
    // Give the watcher time to register before creating the file.
    sleep(Duration::from_millis(500));

    let label = fixture.drop_file("PackingList_42.pdf");
    assert!(
        wait_until(Duration::from_secs(15), || !label.exists()),
        "new file was not printed and removed",
    );

    let status = daemon.terminate();
    assert!(status.success(), "got {status}");
    assert_eq!(fixture.printed().len(), 1);
}

#[test]
fn failed_print_leaves_file_and_is_not_repeated() {
    let fixture = Fixture::new("echo \"$1\" >> LOG; exit 1");
    let packing = fixture.drop_file("PackingList_7.pdf");

    let mut daemon = fixture.start(&["--poll"]);
    assert!(
        wait_until(Duration::from_secs(15), || !fixture.printed().is_empty()),
        "print was never attempted",
    );
    // Several more poll passes must not re-dispatch the same file.
    sleep(Duration::from_millis(2500));

    let status = daemon.terminate();
    assert!(status.success(), "got {status}");
    assert!(packing.exists(), "failed print must leave the file");
    assert_eq!(fixture.printed().len(), 1);
}
