use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::{collections::HashSet, fmt::Display, str::FromStr};

/// Container the video choices are filtered on and merged into.
pub const VIDEO_CONTAINER: &str = "mp4";
/// Container audio-only downloads are extracted to.
pub const AUDIO_CONTAINER: &str = "mp3";
/// Heights offered to the user. Anything else is never shown.
pub const ALLOWED_HEIGHTS: [u32; 4] = [360, 480, 720, 1080];

const AUDIO_PAYLOAD: &str = "audio";
const AUDIO_LABEL: &str = "🎵 Audio Only (MP3)";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One encoded variant as reported by yt-dlp's `formats` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FormatDescriptor {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub filesize_approx: Option<u64>,
}

/// Some extractors report sizes as floats; anything that isn't a
/// non-negative number is treated as unknown.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_number<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| {
            v.as_u64().or_else(|| {
                v.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            })
        })
        .and_then(|n| T::try_from(n).ok()))
}

impl FormatDescriptor {
    /// A missing `vcodec` counts as video; only an explicit `"none"` rules it out.
    #[must_use]
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    /// Audio is absent only when yt-dlp says so explicitly.
    #[must_use]
    pub fn is_audio_absent(&self) -> bool {
        self.acodec.as_deref() == Some("none")
    }

    /// Exact size if known, otherwise the approximation. Zero counts as unknown.
    #[must_use]
    pub fn known_size(&self) -> Option<u64> {
        self.filesize
            .filter(|s| *s > 0)
            .or_else(|| self.filesize_approx.filter(|s| *s > 0))
    }

    fn is_video_only_in(&self, container: &str) -> bool {
        self.has_video() && self.is_audio_absent() && self.ext.as_deref() == Some(container)
    }
}

/// What a button asks for. Round-trips through the callback payload verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Height(u32),
    AudioOnly,
}

/// Post-processing applied by yt-dlp once the streams are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Merge separate video and audio streams into the container.
    Merge { container: &'static str },
    /// Transcode/extract the audio track into the codec's container.
    ExtractAudio { codec: &'static str },
}

impl PostProcess {
    #[must_use]
    pub fn args(self) -> Vec<String> {
        match self {
            Self::Merge { container } => vec!["--merge-output-format".into(), container.into()],
            Self::ExtractAudio { codec } => {
                vec!["-x".into(), "--audio-format".into(), codec.into()]
            }
        }
    }
}

impl Selector {
    /// The callback payload carried by the button.
    #[must_use]
    pub fn payload(self) -> String {
        self.to_string()
    }

    /// yt-dlp `-f` expression, with progressive fallbacks for video.
    #[must_use]
    pub fn format_spec(self) -> String {
        match self {
            Self::AudioOnly => "bestaudio[ext=m4a]/bestaudio/best".into(),
            Self::Height(h) => format!(
                "bestvideo[ext={VIDEO_CONTAINER}][height={h}]+bestaudio[ext=m4a]/best[ext={VIDEO_CONTAINER}]/best"
            ),
        }
    }

    #[must_use]
    pub const fn post_process(self) -> PostProcess {
        match self {
            Self::AudioOnly => PostProcess::ExtractAudio {
                codec: AUDIO_CONTAINER,
            },
            Self::Height(_) => PostProcess::Merge {
                container: VIDEO_CONTAINER,
            },
        }
    }

    /// Extension of the file yt-dlp leaves behind after post-processing.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::AudioOnly => AUDIO_CONTAINER,
            Self::Height(_) => VIDEO_CONTAINER,
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Height(h) => write!(f, "{h}"),
            Self::AudioOnly => f.write_str(AUDIO_PAYLOAD),
        }
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == AUDIO_PAYLOAD {
            return Ok(Self::AudioOnly);
        }
        match s.parse::<u32>() {
            Ok(h) if h > 0 => Ok(Self::Height(h)),
            _ => Err(Error::UnknownSelector(s.to_owned())),
        }
    }
}

/// A button shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub selector: Selector,
}

impl Choice {
    #[must_use]
    pub fn audio_only() -> Self {
        Self {
            label: AUDIO_LABEL.into(),
            selector: Selector::AudioOnly,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn video(height: u32, size: u64) -> Self {
        let size_mb = size as f64 / BYTES_PER_MB;
        Self {
            label: format!("📹 {height}p ({size_mb:.1} MB)"),
            selector: Selector::Height(height),
        }
    }
}

/// Turn raw formats into the buttons offered to the user.
///
/// Only video-only mp4 streams at an allowed height with a known size are
/// kept; the first one seen per height wins. Video choices come best quality
/// first and audio-only is always appended last.
#[must_use]
pub fn rank_formats(formats: &[FormatDescriptor]) -> Vec<Choice> {
    let mut seen_heights = HashSet::new();
    let mut admitted = formats
        .iter()
        .filter(|f| f.is_video_only_in(VIDEO_CONTAINER))
        .filter_map(|f| {
            let height = f.height.filter(|h| ALLOWED_HEIGHTS.contains(h))?;
            let size = f.known_size()?;
            Some((height, size))
        })
        .filter(|(height, _)| seen_heights.insert(*height))
        .collect::<Vec<_>>();

    // heights are unique at this point
    admitted.sort_by(|(a, _), (b, _)| b.cmp(a));

    admitted
        .into_iter()
        .map(|(height, size)| Choice::video(height, size))
        .chain(std::iter::once(Choice::audio_only()))
        .collect()
}
