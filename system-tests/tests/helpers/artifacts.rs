// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Run Artifacts
// Description: Per-run artifact directory and summary writer.
// Purpose: Persist the event log and the run summary of each live test.
// Dependencies: system-tests, serde, serde_jcs
// ============================================================================

//! ## Overview
//! [`RunArtifacts`] owns the run directory. [`SummaryWriter`] records a
//! [`RunSummary`] as canonical `summary.json` plus `summary.md`, and records an
//! `interrupted` summary on drop when the test never reached that point.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use system_tests::config::SystemTestConfig;
use system_tests::summary::RunSummary;

/// Run directory for one live test.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Directory holding every artifact of the run.
    root: PathBuf,
}

impl RunArtifacts {
    /// Creates `<run_root>/<test_name>`, defaulting the run root to a
    /// timestamped directory under `target/system-tests`.
    pub fn create(config: &SystemTestConfig, test_name: &str) -> io::Result<Self> {
        let run_root = config.run_root.clone().unwrap_or_else(|| {
            let stamp =
                SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
            PathBuf::from("target/system-tests").join(format!("run_{stamp}"))
        });
        let root = run_root.join(test_name);
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the run directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of a named artifact.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Writes canonical (JCS) JSON.
    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<()> {
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(self.path(name), bytes)
    }
}

/// Records the summary of one live test, even when the test panics.
pub struct SummaryWriter {
    /// Run directory.
    artifacts: RunArtifacts,
    /// Test name.
    test_name: String,
    /// Test start.
    started: Instant,
    /// Set once a summary has been recorded.
    recorded: bool,
}

impl SummaryWriter {
    /// Creates the run directory and starts the clock.
    pub fn start(config: &SystemTestConfig, test_name: &str) -> io::Result<Self> {
        Ok(Self {
            artifacts: RunArtifacts::create(config, test_name)?,
            test_name: test_name.to_string(),
            started: Instant::now(),
            recorded: false,
        })
    }

    /// Returns the run directory.
    pub fn artifacts(&self) -> &RunArtifacts {
        &self.artifacts
    }

    /// Stamps the duration, writes `summary.json` and `summary.md`, and
    /// returns the recorded summary.
    pub fn record(&mut self, summary: RunSummary) -> io::Result<RunSummary> {
        let summary = summary.with_duration(self.started.elapsed().as_millis());
        self.artifacts.write_json("summary.json", &summary)?;
        fs::write(self.artifacts.path("summary.md"), summary.render_markdown())?;
        self.recorded = true;
        Ok(summary)
    }
}

impl Drop for SummaryWriter {
    fn drop(&mut self) {
        if self.recorded {
            return;
        }
        let summary = RunSummary::interrupted(&self.test_name, std::thread::panicking());
        let _ = self.record(summary);
    }
}
