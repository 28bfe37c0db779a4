// Shared helpers for integration tests.
//
// Provides a scripted host (executor and HTTP fetcher) and a sandbox whose
// install locations live under a temporary directory, so each test runs
// the real command path without touching the machine.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use provision_cli::commands::CommandSetup;
use provision_cli::config::Settings;
use provision_cli::config::settings::Paths;
use provision_cli::exec::{ExecResult, Executor, command_line};
use provision_cli::logging::Logger;
use provision_cli::net::{FetchError, Fetcher};
use provision_cli::platform::OsProfile;

/// Executor that simulates a package manager.
///
/// `pacman -Q <pkg>` succeeds once the package was installed by
/// `pacman -S`; installing a package puts the programs it provides on the
/// fake `PATH`. Any command line containing a `failing` needle exits 1.
#[derive(Debug, Default)]
pub struct FakeHost {
    calls: Mutex<Vec<String>>,
    installed: Mutex<HashSet<String>>,
    programs: Mutex<HashSet<String>>,
    provides: BTreeMap<String, String>,
    failing: Vec<String>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installing `package` makes `program` available.
    pub fn provides(mut self, package: &str, program: &str) -> Self {
        self.provides
            .insert(package.to_string(), program.to_string());
        self
    }

    /// Programs already on `PATH`.
    pub fn with_programs(self, programs: &[&str]) -> Self {
        self.programs
            .lock()
            .expect("programs lock")
            .extend(programs.iter().map(ToString::to_string));
        self
    }

    /// Fail every command line containing `needle`.
    pub fn failing(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    /// Every command line run so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn respond(&self, program: &str, args: &[&str]) -> (bool, String) {
        let line = command_line(program, args);
        if self.failing.iter().any(|needle| line.contains(needle.as_str())) {
            return (false, String::new());
        }
        match (program, args.first().copied()) {
            ("pacman", Some("-Q")) => {
                let installed = self.installed.lock().expect("installed lock");
                let found = args.get(1).is_some_and(|p| installed.contains(*p));
                (found, String::new())
            }
            ("pacman", Some("-S")) => {
                for package in args.iter().skip(1).filter(|a| !a.starts_with('-')) {
                    self.installed
                        .lock()
                        .expect("installed lock")
                        .insert((*package).to_string());
                    if let Some(program) = self.provides.get(*package) {
                        self.programs
                            .lock()
                            .expect("programs lock")
                            .insert(program.clone());
                    }
                }
                (true, String::new())
            }
            _ => (true, format!("{program} 1.0.0\n")),
        }
    }
}

impl Executor for FakeHost {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let result = self.run_unchecked(program, args)?;
        if !result.success {
            anyhow::bail!("{} failed", command_line(program, args));
        }
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(command_line(program, args));
        let (success, stdout) = self.respond(program, args);
        Ok(ExecResult {
            stdout,
            stderr: String::new(),
            success,
            code: Some(if success { 0 } else { 1 }),
        })
    }

    fn which(&self, program: &str) -> bool {
        self.programs
            .lock()
            .expect("programs lock")
            .contains(program)
    }
}

/// Fetcher serving canned bodies by URL and counting requests.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    bodies: BTreeMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Request {
                url: url.to_string(),
                reason: "status code 404".to_string(),
            })
    }
}

/// gzip-compressed tarball holding `files` as executables.
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .expect("append tar entry");
    }
    let mut encoder = builder.into_inner().expect("finish tar");
    encoder.flush().expect("flush gzip");
    encoder.finish().expect("finish gzip")
}

/// An isolated install root backed by a [`tempfile::TempDir`].
pub struct Sandbox {
    pub root: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn profile_d(&self) -> PathBuf {
        self.path().join("etc/profile.d")
    }

    pub fn opt(&self) -> PathBuf {
        self.path().join("opt")
    }

    /// Command setup for `os_id` with every location under the sandbox and
    /// `sudo` disabled.
    pub fn setup(
        &self,
        os_id: &str,
        executor: Arc<dyn Executor>,
        fetcher: Arc<dyn Fetcher>,
    ) -> CommandSetup {
        let mut settings = Settings::default();
        settings.paths = Paths::rooted_at(self.path());
        settings.adapter.use_sudo = false;
        CommandSetup::new(
            settings,
            OsProfile::from_override(os_id),
            self.path().join("home"),
            executor,
            fetcher,
        )
    }
}

/// Logger whose summary is inspected by the tests.
pub fn logger() -> Arc<Logger> {
    Arc::new(Logger::new("integration"))
}
