use anyhow::{Context, Result};
use directories::UserDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use super::traits::{ConfigIssue, ConfigIssueSeverity, ConfigValidator};
use crate::media::{FetchOptions, SourceKind};

/// Overrides the config directory when `--config-dir` is not given.
pub const CONFIG_DIR_ENV: &str = "MEDIABRIDGE_CONFIG_DIR";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".mediabridge";

// ── Sections ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout for media-list and download requests.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Downloads larger than this are aborted.
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_download_bytes() -> u64 {
    512 * 1024 * 1024
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Download limits for media and thumbnail fetches.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_size_bytes: self.max_download_bytes,
            timeout: self.request_timeout(),
            ..FetchOptions::default()
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

/// OAuth client registration for Instagram or Facebook. Endpoint fields
/// are only needed to point at something other than the production API.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProviderConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub redirect_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorize_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl SocialProviderConfig {
    pub fn new(client_id: &str, client_secret: &str, redirect_url: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scopes: Vec::new(),
            redirect_url: redirect_url.to_string(),
            base_url: None,
            authorize_path: None,
            access_token_path: None,
            media_url: None,
        }
    }
}

impl fmt::Debug for SocialProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("redirect_url", &self.redirect_url)
            .field("base_url", &self.base_url)
            .field("authorize_path", &self.authorize_path)
            .field("access_token_path", &self.access_token_path)
            .field("media_url", &self.media_url)
            .finish()
    }
}

// ── Top-level config ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from the config directory, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Directory listed by the sandbox source. `~` is expanded.
    #[serde(default = "default_sandbox_dir")]
    pub sandbox_dir: String,
    /// Where downloaded remote videos are kept. `~` is expanded.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<SocialProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<SocialProviderConfig>,
}

fn default_sandbox_dir() -> String {
    std::env::temp_dir()
        .join("mediabridge")
        .to_string_lossy()
        .into_owned()
}

fn default_cache_dir() -> String {
    std::env::temp_dir()
        .join("mediabridge-cache")
        .to_string_lossy()
        .into_owned()
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

/// Pick the config directory: explicit flag, then [`CONFIG_DIR_ENV`], then
/// `~/.mediabridge`.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        let dir = dir.trim();
        if !dir.is_empty() {
            return Ok(expand_path(dir));
        }
    }
    default_config_dir()
}

/// HTTP client with the configured timeouts.
pub fn build_http_client(http: &HttpConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(http.request_timeout())
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = UserDirs::new().map_or_else(
            || PathBuf::from(CONFIG_DIR_NAME),
            |u| u.home_dir().join(CONFIG_DIR_NAME),
        );

        Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            sandbox_dir: default_sandbox_dir(),
            cache_dir: default_cache_dir(),
            http: HttpConfig::default(),
            instagram: None,
            facebook: None,
        }
    }
}

impl Config {
    pub async fn load_or_init(config_dir: Option<&Path>) -> Result<Self> {
        let dir = resolve_config_dir(config_dir)?;
        Self::load_from_dir(&dir).await
    }

    /// Load `<dir>/config.toml`, writing defaults there on first run.
    pub async fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let initialized = !config_path.exists();
        let mut config = if initialized {
            let config = Config {
                config_path: config_path.clone(),
                ..Config::default()
            };
            config.save().await?;

            // Provider sections hold client secrets
            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }
            config
        } else {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = fs::metadata(&config_path).await {
                    if meta.permissions().mode() & 0o004 != 0 {
                        tracing::warn!(
                            "Config file {:?} is world-readable (mode {:o}). \
                             Consider restricting with: chmod 600 {:?}",
                            config_path,
                            meta.permissions().mode() & 0o777,
                            config_path,
                        );
                    }
                }
            }

            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.clone();
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            sandbox = %config.sandbox_path().display(),
            initialized,
            "Config loaded"
        );
        Ok(config)
    }

    pub fn sandbox_path(&self) -> PathBuf {
        expand_path(&self.sandbox_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        expand_path(&self.cache_dir)
    }

    /// Client registration for a social source, if configured.
    pub fn social(&self, kind: SourceKind) -> Option<&SocialProviderConfig> {
        match kind {
            SourceKind::Instagram => self.instagram.as_ref(),
            SourceKind::Facebook => self.facebook.as_ref(),
            SourceKind::Sandbox | SourceKind::SystemAlbum => None,
        }
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`. Empty values are ignored. Credential
    /// overrides only touch sections that exist in the file.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("MEDIABRIDGE_SANDBOX_DIR") {
            self.sandbox_dir = dir;
        }

        for (prefix, section) in [
            ("MEDIABRIDGE_INSTAGRAM", &mut self.instagram),
            ("MEDIABRIDGE_FACEBOOK", &mut self.facebook),
        ] {
            let client_id = get(&format!("{prefix}_CLIENT_ID"));
            let client_secret = get(&format!("{prefix}_CLIENT_SECRET"));
            let Some(section) = section.as_mut() else {
                if client_id.is_some() || client_secret.is_some() {
                    tracing::warn!(
                        "{prefix}_* credentials set but the provider has no config section; ignoring"
                    );
                }
                continue;
            };
            if let Some(id) = client_id {
                section.client_id = id;
            }
            if let Some(secret) = client_secret {
                section.client_secret = secret;
            }
        }
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        if self.sandbox_dir.trim().is_empty() {
            anyhow::bail!("sandbox_dir must not be empty");
        }
        if self.cache_dir.trim().is_empty() {
            anyhow::bail!("cache_dir must not be empty");
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than 0");
        }
        if self.http.max_download_bytes == 0 {
            anyhow::bail!("http.max_download_bytes must be greater than 0");
        }

        for (name, section) in [("instagram", &self.instagram), ("facebook", &self.facebook)] {
            let Some(section) = section else {
                continue;
            };
            if section.client_id.trim().is_empty() {
                anyhow::bail!("{name}.client_id must not be empty");
            }
            if section.redirect_url.trim().is_empty() {
                anyhow::bail!("{name}.redirect_url must not be empty");
            }
            Url::parse(&section.redirect_url)
                .with_context(|| format!("{name}.redirect_url is not a valid URL"))?;
            if let Some(media_url) = &section.media_url {
                Url::parse(media_url)
                    .with_context(|| format!("{name}.media_url is not a valid URL"))?;
            }
        }

        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;
        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or(CONFIG_FILE_NAME);
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", std::process::id()));

        fs::write(&temp_path, toml_str.as_bytes())
            .await
            .with_context(|| {
                format!(
                    "Failed to write temporary config file: {}",
                    temp_path.display()
                )
            })?;

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        Ok(())
    }
}

/// Reports what keeps a source from working, without failing the load.
pub struct ReadinessValidator;

impl ConfigValidator for ReadinessValidator {
    fn validate(&self, config: &Config) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if let Err(error) = config.validate() {
            issues.push(ConfigIssue {
                severity: ConfigIssueSeverity::Error,
                field: "config".to_string(),
                message: format!("{error:#}"),
            });
        }

        if !config.sandbox_path().is_dir() {
            issues.push(ConfigIssue {
                severity: ConfigIssueSeverity::Warning,
                field: "sandbox_dir".to_string(),
                message: format!(
                    "{} does not exist; the sandbox lists nothing",
                    config.sandbox_path().display()
                ),
            });
        }

        for kind in [SourceKind::Instagram, SourceKind::Facebook] {
            match config.social(kind) {
                None => issues.push(ConfigIssue {
                    severity: ConfigIssueSeverity::Warning,
                    field: kind.as_str().to_string(),
                    message: format!(
                        "not configured; add a [{kind}] section with client_id and redirect_url"
                    ),
                }),
                Some(section) if section.client_secret.is_empty() => {
                    issues.push(ConfigIssue {
                        severity: ConfigIssueSeverity::Warning,
                        field: format!("{kind}.client_secret"),
                        message: "empty; the token exchange will be rejected".to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        issues
    }

    fn name(&self) -> &str {
        "readiness"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn with_instagram() -> Config {
        Config {
            instagram: Some(SocialProviderConfig::new(
                "ig-client",
                "ig-secret",
                "https://app.example.com/cb",
            )),
            ..Config::default()
        }
    }

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    fn config_default_has_sane_values() {
        let c = Config::default();
        assert_eq!(c.http.timeout_secs, 60);
        assert!(c.instagram.is_none());
        assert!(c.facebook.is_none());
        assert!(c.config_path.to_string_lossy().ends_with("config.toml"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut config = with_instagram();
        config.facebook = Some(SocialProviderConfig {
            scopes: vec!["user_videos".into()],
            media_url: Some("https://graph.example.com/me/videos".into()),
            ..SocialProviderConfig::new("fb-client", "fb-secret", "https://app.example.com/fb")
        });

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.instagram, config.instagram);
        assert_eq!(parsed.facebook, config.facebook);
        assert_eq!(parsed.http, config.http);
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
sandbox_dir = "~/Movies"

[instagram]
client_id = "abc"
redirect_url = "https://app.example.com/cb"
"#,
        )
        .unwrap();
        assert_eq!(parsed.http, HttpConfig::default());
        let ig = parsed.instagram.unwrap();
        assert!(ig.client_secret.is_empty());
        assert!(ig.scopes.is_empty());
        assert!(ig.base_url.is_none());
    }

    #[test]
    fn sandbox_path_expands_tilde() {
        let config = Config {
            sandbox_dir: "~/mediabridge-test".into(),
            ..Config::default()
        };
        let path = config.sandbox_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("mediabridge-test"));
    }

    #[test]
    fn debug_redacts_client_secret() {
        let section = SocialProviderConfig::new("id", "very-secret", "https://a/cb");
        let out = format!("{section:?}");
        assert!(!out.contains("very-secret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn fetch_options_follow_http_config() {
        let http = HttpConfig {
            timeout_secs: 15,
            max_download_bytes: 4096,
            ..HttpConfig::default()
        };
        let options = http.fetch_options();
        assert_eq!(options.timeout, Duration::from_secs(15));
        assert_eq!(options.max_size_bytes, 4096);
        assert!(options.allowed_mime_types.is_none());
    }

    #[test]
    fn default_request_timeout_is_sixty_seconds() {
        assert_eq!(HttpConfig::default().request_timeout(), Duration::from_secs(60));
    }

    // ── Env overrides ────────────────────────────────────────

    #[test]
    fn overrides_replace_credentials_of_existing_sections() {
        let mut config = with_instagram();
        config.apply_overrides(lookup(&[
            ("MEDIABRIDGE_INSTAGRAM_CLIENT_ID", "env-id"),
            ("MEDIABRIDGE_INSTAGRAM_CLIENT_SECRET", "env-secret"),
            ("MEDIABRIDGE_SANDBOX_DIR", "/srv/media"),
        ]));
        let ig = config.instagram.as_ref().unwrap();
        assert_eq!(ig.client_id, "env-id");
        assert_eq!(ig.client_secret, "env-secret");
        assert_eq!(config.sandbox_dir, "/srv/media");
    }

    #[test]
    fn overrides_do_not_create_sections() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("MEDIABRIDGE_FACEBOOK_CLIENT_ID", "fb")]));
        assert!(config.facebook.is_none());
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut config = with_instagram();
        config.apply_overrides(lookup(&[("MEDIABRIDGE_INSTAGRAM_CLIENT_ID", "  ")]));
        assert_eq!(config.instagram.unwrap().client_id, "ig-client");
    }

    // ── Validation ───────────────────────────────────────────

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn validate_rejects_empty_redirect() {
        let mut config = with_instagram();
        if let Some(ig) = config.instagram.as_mut() {
            ig.redirect_url = String::new();
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("instagram.redirect_url"));
    }

    #[test]
    fn validate_accepts_custom_scheme_redirect() {
        let mut config = with_instagram();
        if let Some(ig) = config.instagram.as_mut() {
            ig.redirect_url = "myapp://oauth/callback".into();
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn readiness_warns_about_missing_providers() {
        let issues = ReadinessValidator.validate(&Config::default());
        assert!(issues.iter().any(|i| i.field == "instagram"));
        assert!(issues.iter().any(|i| i.field == "facebook"));
        assert!(issues
            .iter()
            .all(|i| matches!(i.severity, ConfigIssueSeverity::Warning)));
    }

    // ── Load / save ──────────────────────────────────────────

    #[tokio::test]
    async fn load_from_dir_initializes_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from_dir(tmp.path()).await.unwrap();
        assert_eq!(config.config_path, tmp.path().join("config.toml"));
        assert!(config.config_path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&config.config_path)
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn save_then_load_preserves_sections() {
        let tmp = TempDir::new().unwrap();
        let mut config = with_instagram();
        config.config_path = tmp.path().join("config.toml");
        config.sandbox_dir = tmp.path().join("sandbox").to_string_lossy().into_owned();
        config.save().await.unwrap();

        let loaded = Config::load_from_dir(tmp.path()).await.unwrap();
        assert_eq!(loaded.sandbox_dir, config.sandbox_dir);
        assert_eq!(
            loaded.instagram.map(|ig| ig.redirect_url),
            Some("https://app.example.com/cb".to_string())
        );
    }

    #[tokio::test]
    async fn load_rejects_invalid_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[http]\ntimeout_secs = 0\n",
        )
        .unwrap();
        assert!(Config::load_from_dir(tmp.path()).await.is_err());
    }

    #[test]
    fn explicit_config_dir_wins() {
        let dir = resolve_config_dir(Some(Path::new("/tmp/explicit"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/explicit"));
    }
}
