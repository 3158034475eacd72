use crate::{
    config::YtdlpConfig,
    error::{Error, Result},
    formats::{FormatDescriptor, Selector},
};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    process::{Output, Stdio},
    sync::Arc,
    time::Duration,
};
use teloxide::types::ChatId;
use tokio::{process::Command, sync::Semaphore, time::timeout};
use tracing::{debug, info};
use url::Url;

const FALLBACK_MEDIA_ID: &str = "video";

/// Metadata of a resolved link, as printed by `yt-dlp --dump-single-json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaRecord {
    /// The link the user sent. Not part of yt-dlp's output.
    #[serde(skip)]
    pub source_url: String,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatDescriptor>,
}

impl MediaRecord {
    /// Canonical page URL, falling back to what the user sent.
    #[must_use]
    pub fn page_url(&self) -> &str {
        self.webpage_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.source_url)
    }

    /// Media id reduced to characters that are safe in a file name.
    #[must_use]
    pub fn file_safe_id(&self) -> String {
        let id = self
            .id
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '-' | '_'))
            .collect::<String>();
        if id.is_empty() {
            FALLBACK_MEDIA_ID.into()
        } else {
            id
        }
    }

    /// `<chat>_<media id>`, unique per conversation and media item.
    #[must_use]
    pub fn file_stem(&self, chat: ChatId) -> String {
        format!("{}_{}", chat.0, self.file_safe_id())
    }
}

/// One download, built fresh for every button press.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub record: Arc<MediaRecord>,
    pub selector: Selector,
    /// yt-dlp output template, `<dir>/<stem>.%(ext)s`.
    pub output_template: PathBuf,
    /// Where the post-processed file is expected to land.
    pub expected_path: PathBuf,
}

impl DownloadRequest {
    #[must_use]
    pub fn new(record: Arc<MediaRecord>, selector: Selector, chat: ChatId, dir: &Path) -> Self {
        let stem = record.file_stem(chat);
        Self {
            output_template: dir.join(format!("{stem}.%(ext)s")),
            expected_path: dir.join(format!("{stem}.{}", selector.extension())),
            record,
            selector,
        }
    }
}

/// The media extraction and download capability.
#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync {
    /// Fetch metadata only. `Ok(None)` means the extractor produced nothing.
    async fn resolve(&self, url: &Url) -> Result<Option<MediaRecord>>;

    /// Fetch and post-process the media described by `request`.
    async fn download(&self, request: &DownloadRequest) -> Result<()>;
}

/// [`MediaBackend`] backed by the yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlp {
    config: YtdlpConfig,
    permits: Arc<Semaphore>,
}

impl YtDlp {
    #[must_use]
    pub fn new(config: YtdlpConfig, max_concurrent_jobs: usize) -> Self {
        Self {
            config,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = ["--no-playlist", "--quiet", "--no-warnings", "--user-agent"]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        args.push(self.config.user_agent.clone());

        if let Some(cookies_path) = &self.config.cookies_path {
            args.extend(["--cookies".into(), cookies_path.display().to_string()]);
        }
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    fn resolve_args(&self, url: &Url) -> Vec<String> {
        let mut args = self.common_args();
        args.extend(
            ["--dump-single-json", "--skip-download", "--ignore-errors"]
                .iter()
                .map(ToString::to_string),
        );
        args.push(url.to_string());
        args
    }

    fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = self.common_args();
        args.extend([
            "-f".into(),
            request.selector.format_spec(),
            "-o".into(),
            request.output_template.display().to_string(),
        ]);
        args.extend(request.selector.post_process().args());
        args.push(request.record.page_url().to_owned());
        args
    }

    /// Run yt-dlp under a worker permit and a deadline. The child is killed if
    /// the deadline passes.
    async fn run(
        &self,
        stage: &'static str,
        args: &[String],
        limit: Duration,
        capture_stdout: bool,
    ) -> Result<Output> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::other("worker pool closed"))?;

        debug!(stage, ?args, "spawning yt-dlp");

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(if capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(limit, cmd.output())
            .await
            .map_err(|_| Error::Timeout {
                stage,
                secs: limit.as_secs(),
            })??;
        Ok(output)
    }
}

#[async_trait::async_trait]
impl MediaBackend for YtDlp {
    async fn resolve(&self, url: &Url) -> Result<Option<MediaRecord>> {
        let args = self.resolve_args(url);
        let output = self
            .run("extraction", &args, self.config.extraction_timeout, true)
            .await?;

        // --ignore-errors may exit non-zero while still printing usable JSON
        let record = parse_dump(&output.stdout, url)?;
        if record.is_none() && !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::ytdlp_failed(stderr));
        }
        Ok(record)
    }

    async fn download(&self, request: &DownloadRequest) -> Result<()> {
        let args = self.download_args(request);
        let output = self
            .run("download", &args, self.config.download_timeout, false)
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::ytdlp_failed(stderr));
        }

        info!(
            selector = %request.selector,
            path = %request.expected_path.display(),
            "yt-dlp finished"
        );
        Ok(())
    }
}

/// Parse `--dump-single-json` output. Empty output and `null` mean no result.
fn parse_dump(stdout: &[u8], url: &Url) -> Result<Option<MediaRecord>> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let record = serde_json::from_str::<Option<MediaRecord>>(text)?;
    Ok(record.map(|mut r| {
        r.source_url = url.to_string();
        r
    }))
}
