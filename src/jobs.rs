//! Best-effort discovery of Spark jobs from session log text.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SPARK_UI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Started SparkUI at (https?://([0-9a-zA-Z_.\-]+):(\d+))").expect("valid regex")
});

static YARN_JOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tracking URL: (https?://.+/)").expect("valid regex"));

static STANDALONE_JOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Got job (\d+)").expect("valid regex"));

/// Where Livy runs its Spark drivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Drivers run next to Livy and log their own Spark UI
    #[default]
    Local,
    /// Drivers run on YARN; only tracking URLs show up in the log
    Yarn,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Local => "local",
            DeploymentMode::Yarn => "yarn",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(DeploymentMode::Local),
            "yarn" => Ok(DeploymentMode::Yarn),
            other => Err(format!("Unknown deployment mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub url: String,
}

/// Extracts job links from session logs for one deployment mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogJobExtractor {
    mode: DeploymentMode,
}

impl LogJobExtractor {
    pub fn new(mode: DeploymentMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Jobs mentioned in `logs`, in order of first appearance, without duplicates.
    pub fn extract(&self, logs: &str) -> Vec<Job> {
        match self.mode {
            DeploymentMode::Yarn => yarn_jobs(logs),
            DeploymentMode::Local => standalone_jobs(logs),
        }
    }
}

fn yarn_jobs(logs: &str) -> Vec<Job> {
    let mut jobs: Vec<Job> = Vec::new();
    for captures in YARN_JOB_RE.captures_iter(logs) {
        let url = &captures[1];
        if jobs.iter().any(|job| job.url == url) {
            continue;
        }
        // The application id is the last path segment
        let name = url.trim_matches('/').rsplit('/').next().unwrap_or(url);
        jobs.push(Job {
            name: name.to_string(),
            url: url.to_string(),
        });
    }
    jobs
}

fn standalone_jobs(logs: &str) -> Vec<Job> {
    let Some(ui) = SPARK_UI_RE.captures(logs) else {
        tracing::warn!("Could not find the Spark UI URL in the session logs.");
        return Vec::new();
    };
    let ui_url = &ui[1];

    let mut jobs: Vec<Job> = Vec::new();
    for captures in STANDALONE_JOB_RE.captures_iter(logs) {
        let id = &captures[1];
        if jobs.iter().any(|job| job.name == id) {
            continue;
        }
        jobs.push(Job {
            name: id.to_string(),
            url: format!("{}/jobs/job/?id={}", ui_url, id),
        });
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const LOCAL_LOG: &str = "\
16/01/12 INFO SparkUI: Started SparkUI at http://livy-host.example_1:4040
16/01/12 INFO DAGScheduler: Got job 0 (collect at <stdin>:1)
16/01/12 INFO DAGScheduler: Got job 1 (count at <stdin>:1)
16/01/12 INFO DAGScheduler: Got job 0 (collect at <stdin>:1)";

    const YARN_LOG: &str = "\
INFO Client: Application report for application_1453 (state: ACCEPTED)
\t tracking URL: http://rm.example.com:8088/proxy/application_1453_0007/
INFO Client: Application report for application_1453 (state: RUNNING)
\t tracking URL: http://rm.example.com:8088/proxy/application_1453_0007/";

    #[test]
    fn local_jobs_link_to_the_spark_ui() {
        let jobs = LogJobExtractor::new(DeploymentMode::Local).extract(LOCAL_LOG);

        assert_eq!(
            jobs,
            vec![
                Job {
                    name: "0".to_string(),
                    url: "http://livy-host.example_1:4040/jobs/job/?id=0".to_string(),
                },
                Job {
                    name: "1".to_string(),
                    url: "http://livy-host.example_1:4040/jobs/job/?id=1".to_string(),
                },
            ]
        );
    }

    #[traced_test]
    #[test]
    fn local_jobs_need_the_ui_line() {
        let jobs = LogJobExtractor::new(DeploymentMode::Local).extract("Got job 4 (show)");
        assert!(jobs.is_empty());
        assert!(logs_contain("Could not find the Spark UI URL"));
    }

    #[test]
    fn yarn_jobs_are_named_by_application_id() {
        let jobs = LogJobExtractor::new(DeploymentMode::Yarn).extract(YARN_LOG);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "application_1453_0007");
        assert_eq!(
            jobs[0].url,
            "http://rm.example.com:8088/proxy/application_1453_0007/"
        );
    }

    #[test]
    fn yarn_mode_ignores_local_lines() {
        let jobs = LogJobExtractor::new(DeploymentMode::Yarn).extract(LOCAL_LOG);
        assert!(jobs.is_empty());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("YARN".parse::<DeploymentMode>(), Ok(DeploymentMode::Yarn));
        assert_eq!(DeploymentMode::default(), DeploymentMode::Local);
        assert!("mesos".parse::<DeploymentMode>().is_err());
    }
}
