//! Test doubles for the chat transport and the media backend.

use crate::{
    download::{DownloadRequest, MediaBackend, MediaRecord},
    error::{Error, Result},
    formats::{Choice, Selector},
    gateway::Gateway,
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicI32, Ordering},
    },
};
use teloxide::types::{CallbackQueryId, ChatId, MessageId};
use url::Url;

pub fn record(id: &str, title: &str) -> MediaRecord {
    MediaRecord {
        source_url: "https://example.com/watch?v=1".into(),
        webpage_url: Some(format!("https://example.com/watch?v={id}")),
        title: Some(title.into()),
        id: Some(id.into()),
        formats: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(String),
    Edit {
        message: MessageId,
        text: String,
    },
    Choices {
        message: MessageId,
        text: String,
        selectors: Vec<Selector>,
    },
    Audio {
        path: PathBuf,
        title: String,
        existed: bool,
    },
    Video {
        path: PathBuf,
        existed: bool,
    },
    Ack(String),
}

/// Records everything sent; message ids start at 1.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    last_id: AtomicI32,
    fail_delivery: bool,
    fail_ack: bool,
}

impl RecordingGateway {
    pub fn failing_delivery() -> Self {
        Self {
            fail_delivery: true,
            ..Self::default()
        }
    }

    pub fn failing_acknowledgement() -> Self {
        Self {
            fail_ack: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn push(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }

    fn deliver(&self, sent: Sent) -> Result<()> {
        if self.fail_delivery {
            return Err(Error::other("upload rejected"));
        }
        self.push(sent);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Gateway for RecordingGateway {
    async fn send_text(&self, _chat: ChatId, text: &str) -> Result<MessageId> {
        self.push(Sent::Text(text.into()));
        Ok(MessageId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit_text(&self, _chat: ChatId, message: MessageId, text: &str) -> Result<()> {
        self.push(Sent::Edit {
            message,
            text: text.into(),
        });
        Ok(())
    }

    async fn edit_choices(
        &self,
        _chat: ChatId,
        message: MessageId,
        text: &str,
        choices: &[Choice],
    ) -> Result<()> {
        self.push(Sent::Choices {
            message,
            text: text.into(),
            selectors: choices.iter().map(|c| c.selector).collect(),
        });
        Ok(())
    }

    async fn send_audio(&self, _chat: ChatId, path: &Path, title: &str) -> Result<()> {
        self.deliver(Sent::Audio {
            path: path.to_path_buf(),
            title: title.into(),
            existed: path.is_file(),
        })
    }

    async fn send_video(&self, _chat: ChatId, path: &Path) -> Result<()> {
        self.deliver(Sent::Video {
            path: path.to_path_buf(),
            existed: path.is_file(),
        })
    }

    async fn acknowledge(&self, query: CallbackQueryId) -> Result<()> {
        if self.fail_ack {
            return Err(Error::other("query is too old"));
        }
        self.push(Sent::Ack(query.0));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Fail(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadBehavior {
    /// Write the post-processed file where it is expected.
    WriteExpected,
    /// Leave intermediate files behind and fail.
    WritePartialThenFail,
    /// Succeed but produce a different container than expected.
    WriteWrongExtension,
    /// Fail without touching the disk.
    FailWithoutWriting,
}

/// Scripted [`MediaBackend`].
#[derive(Debug)]
pub struct Backend {
    pub resolved: Option<MediaRecord>,
    pub resolve_outcome: Outcome,
    pub download_behavior: DownloadBehavior,
    downloads: Mutex<Vec<Selector>>,
}

impl Backend {
    pub fn resolving(resolved: Option<MediaRecord>) -> Self {
        Self {
            resolved,
            resolve_outcome: Outcome::Ok,
            download_behavior: DownloadBehavior::WriteExpected,
            downloads: Mutex::default(),
        }
    }

    pub fn downloads(&self) -> Vec<Selector> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaBackend for Backend {
    async fn resolve(&self, url: &Url) -> Result<Option<MediaRecord>> {
        match &self.resolve_outcome {
            Outcome::Ok => Ok(self.resolved.clone().map(|mut r| {
                r.source_url = url.to_string();
                r
            })),
            Outcome::Fail(stderr) => Err(Error::ytdlp_failed(stderr.clone())),
        }
    }

    async fn download(&self, request: &DownloadRequest) -> Result<()> {
        self.downloads.lock().unwrap().push(request.selector);
        let expected = &request.expected_path;

        match self.download_behavior {
            DownloadBehavior::WriteExpected => {
                fs::write(expected, b"media")?;
                Ok(())
            }
            DownloadBehavior::WritePartialThenFail => {
                fs::write(expected.with_extension("f137.mp4.part"), b"partial")?;
                fs::write(expected.with_extension("f140.m4a"), b"audio")?;
                Err(Error::ytdlp_failed("ERROR: unable to download video data"))
            }
            DownloadBehavior::WriteWrongExtension => {
                fs::write(expected.with_extension("webm"), b"media")?;
                Ok(())
            }
            DownloadBehavior::FailWithoutWriting => {
                Err(Error::ytdlp_failed("ERROR: Requested format is not available"))
            }
        }
    }
}
