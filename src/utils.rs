use std::{ffi::OsStr, path::Path};
use tokio::{fs::File, io::AsyncReadExt};

static VIDEO_EXTS: &[&str] = &["mp4", "webm", "mov", "mkv"];
static AUDIO_EXTS: &[&str] = &["mp3", "m4a", "ogg", "opus", "aac"];

/// Kind of a downloaded artifact, decides how it is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Unknown,
}

fn kind_from_extension(path: &Path) -> Option<MediaKind> {
    let ext = path.extension().and_then(OsStr::to_str)?;
    if VIDEO_EXTS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return Some(MediaKind::Video);
    }
    if AUDIO_EXTS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return Some(MediaKind::Audio);
    }
    None
}

fn kind_from_mime(mime: &str) -> MediaKind {
    if mime.starts_with("video/") {
        MediaKind::Video
    } else if mime.starts_with("audio/") {
        MediaKind::Audio
    } else {
        MediaKind::Unknown
    }
}

/// Detect media kind by extension, otherwise read a small prefix
/// asynchronously and probe it with `infer`.
pub async fn detect_media_kind_async(path: &Path) -> MediaKind {
    if let Some(kind) = kind_from_extension(path) {
        return kind;
    }

    // 8 KiB is plenty for container magic
    if let Ok(mut f) = File::open(path).await {
        let mut buf = vec![0u8; 8192];
        match f.read(&mut buf).await {
            Ok(n) if n > 0 => {
                buf.truncate(n);
                if let Some(k) = infer::get(&buf) {
                    return kind_from_mime(k.mime_type());
                }
            }
            _ => {}
        }
    }

    MediaKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_by_extension() {
        assert_eq!(detect_media_kind_async(Path::new("a.mp4")).await, MediaKind::Video);
        assert_eq!(detect_media_kind_async(Path::new("a.MP3")).await, MediaKind::Audio);
        assert_eq!(
            detect_media_kind_async(Path::new("/nonexistent/a.bin")).await,
            MediaKind::Unknown
        );
    }

    #[tokio::test]
    async fn detects_by_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noext");
        // ID3v2 header
        std::fs::write(&path, b"ID3\x04\x00\x00\x00\x00\x00\x00rest-of-file").unwrap();
        assert_eq!(detect_media_kind_async(&path).await, MediaKind::Audio);

        let junk = dir.path().join("junk");
        std::fs::write(&junk, b"plain text").unwrap();
        assert_eq!(detect_media_kind_async(&junk).await, MediaKind::Unknown);
    }
}
