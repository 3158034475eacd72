use crate::error::{Error, Result};
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub ytdlp: YtdlpConfig,
    pub download_dir: PathBuf,
    pub max_concurrent_jobs: usize,
    pub selection_ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct YtdlpConfig {
    pub binary: PathBuf,
    pub user_agent: String,
    pub cookies_path: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub extraction_timeout: Duration,
    pub download_timeout: Duration,
}

impl Config {
    const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the bot token is missing or a value is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the bot token is missing or a value is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup("TELOXIDE_TOKEN")
            .or_else(|| lookup("TELEGRAM_TOKEN"))
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::config("TELOXIDE_TOKEN (or TELEGRAM_TOKEN) is not set"))?;

        let download_dir = lookup("DOWNLOAD_DIR")
            .map_or_else(|| env::temp_dir().join("tg-format-bot"), PathBuf::from);

        let max_concurrent_jobs = parse_var(&lookup, "MAX_CONCURRENT_JOBS")?
            .unwrap_or(Self::DEFAULT_MAX_CONCURRENT_JOBS)
            .max(1);

        let selection_ttl = parse_var::<u64>(&lookup, "SELECTION_TTL_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            token,
            ytdlp: YtdlpConfig::from_lookup(&lookup)?,
            download_dir,
            max_concurrent_jobs,
            selection_ttl,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("ytdlp", &self.ytdlp)
            .field("download_dir", &self.download_dir)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("selection_ttl", &self.selection_ttl)
            .finish()
    }
}

impl YtdlpConfig {
    const DEFAULT_EXTRACTION_TIMEOUT: u64 = 120;
    const DEFAULT_DOWNLOAD_TIMEOUT: u64 = 900;

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let extra_args = match lookup("YTDLP_EXTRA_ARGS") {
            Some(raw) => shlex::split(&raw)
                .ok_or_else(|| Error::config("YTDLP_EXTRA_ARGS has unbalanced quotes"))?,
            None => Vec::new(),
        };

        Ok(Self {
            binary: lookup("YTDLP_PATH").map_or_else(|| PathBuf::from("yt-dlp"), PathBuf::from),
            user_agent: lookup("YTDLP_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.into()),
            cookies_path: lookup("YTDLP_COOKIES_PATH")
                .map(PathBuf::from)
                .filter(|p| p.is_file()),
            extra_args,
            extraction_timeout: Duration::from_secs(
                parse_var(lookup, "EXTRACTION_TIMEOUT_SECS")?
                    .unwrap_or(Self::DEFAULT_EXTRACTION_TIMEOUT),
            ),
            download_timeout: Duration::from_secs(
                parse_var(lookup, "DOWNLOAD_TIMEOUT_SECS")?
                    .unwrap_or(Self::DEFAULT_DOWNLOAD_TIMEOUT),
            ),
        })
    }
}

impl Default for YtdlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            user_agent: DEFAULT_USER_AGENT.into(),
            cookies_path: None,
            extra_args: Vec::new(),
            extraction_timeout: Duration::from_secs(Self::DEFAULT_EXTRACTION_TIMEOUT),
            download_timeout: Duration::from_secs(Self::DEFAULT_DOWNLOAD_TIMEOUT),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| Error::config(format!("{key} is not a valid number: {raw:?}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn telegram_token_is_accepted_as_fallback() {
        let config = Config::from_lookup(lookup(&[("TELEGRAM_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.token, "123:abc");
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[("TELOXIDE_TOKEN", "t")])).unwrap();
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.selection_ttl, None);
        assert_eq!(config.ytdlp.binary, PathBuf::from("yt-dlp"));
        assert_eq!(config.ytdlp.extraction_timeout, Duration::from_secs(120));
        assert_eq!(config.ytdlp.download_timeout, Duration::from_secs(900));
        assert!(config.ytdlp.extra_args.is_empty());
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TELOXIDE_TOKEN", "t"),
            ("MAX_CONCURRENT_JOBS", "0"),
            ("SELECTION_TTL_SECS", "3600"),
            ("DOWNLOAD_TIMEOUT_SECS", "60"),
            ("YTDLP_EXTRA_ARGS", "--proxy 'socks5://127.0.0.1:9050'"),
            ("DOWNLOAD_DIR", "/srv/downloads"),
        ]))
        .unwrap();
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.selection_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.ytdlp.download_timeout, Duration::from_secs(60));
        assert_eq!(
            config.ytdlp.extra_args,
            vec!["--proxy".to_string(), "socks5://127.0.0.1:9050".to_string()]
        );
        assert_eq!(config.download_dir, PathBuf::from("/srv/downloads"));
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        let config =
            Config::from_lookup(lookup(&[("TELOXIDE_TOKEN", "t"), ("SELECTION_TTL_SECS", "0")]))
                .unwrap();
        assert_eq!(config.selection_ttl, None);
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("TELOXIDE_TOKEN", "t"),
            ("EXTRACTION_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn debug_hides_token() {
        let config = Config::from_lookup(lookup(&[("TELOXIDE_TOKEN", "secret-token")])).unwrap();
        assert!(!format!("{config:?}").contains("secret-token"));
    }
}
