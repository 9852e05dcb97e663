use crate::ExecutionError;
use crate::config::ExecutorConfig;
use crate::exec::{CodeExecutor, ExecutionOutcome, ExecutionRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Judge0 language ids of the editor languages.
const LANGUAGE_IDS: &[(&str, u32)] = &[
    ("c", 50),
    ("cpp", 54),
    ("csharp", 51),
    ("go", 60),
    ("java", 62),
    ("javascript", 63),
    ("kotlin", 78),
    ("php", 68),
    ("python", 71),
    ("ruby", 72),
    ("rust", 73),
    ("swift", 83),
    ("typescript", 74),
];

/// Judge0 statuses the program is not to blame for.
const STATUS_INTERNAL_ERROR: u32 = 13;
const STATUS_EXEC_FORMAT_ERROR: u32 = 14;

pub fn language_id(language: &str) -> Option<u32> {
    let language = language.to_ascii_lowercase();
    LANGUAGE_IDS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, id)| *id)
}

/// Executor backed by a Judge0-compatible HTTP service.
pub struct HttpExecutor {
    config: ExecutorConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct Submission<'a> {
    source_code: &'a str,
    language_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SubmissionResult {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    /// Seconds, as a decimal string.
    time: Option<String>,
    memory: Option<u64>,
    status: Option<SubmissionStatus>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    id: u32,
    description: String,
}

impl HttpExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, http })
    }

    fn submissions_url(&self) -> String {
        format!(
            "{}/submissions?base64_encoded=false&wait=true",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CodeExecutor for HttpExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError> {
        let language_id = language_id(&request.language).ok_or_else(|| {
            ExecutionError::Service(format!("unsupported language '{}'", request.language))
        })?;

        let body = Submission {
            source_code: &request.source,
            language_id,
            stdin: request.stdin.as_deref(),
        };

        debug!(language = %request.language, "Execution request");

        let mut builder = self
            .http
            .post(self.submissions_url())
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-Auth-Token", key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: SubmissionResult = response.json().await?;
        Ok(result.into_outcome())
    }
}

impl SubmissionResult {
    fn into_outcome(self) -> ExecutionOutcome {
        let error = match &self.status {
            Some(status)
                if status.id == STATUS_INTERNAL_ERROR || status.id == STATUS_EXEC_FORMAT_ERROR =>
            {
                Some(self.message.clone().unwrap_or_else(|| status.description.clone()))
            }
            _ => None,
        };

        ExecutionOutcome {
            stdout: self.stdout,
            stderr: self.stderr,
            compile_output: self.compile_output,
            time_ms: self
                .time
                .as_deref()
                .and_then(|t| t.parse::<f64>().ok())
                .map(|secs| (secs * 1000.0).round()),
            memory_kb: self.memory,
            error,
        }
    }
}
