//! Configuration module for sp2blob.
//!
//! Provides typed configuration structs loaded either from a `KEY=value`
//! file or from YAML, with validation, defaults, CLI overrides, and a
//! builder pattern for programmatic use.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::filter::compile_filter;

/// Environment variable consulted when the file leaves `CLIENT_SECRET` empty.
pub const CLIENT_SECRET_ENV: &str = "SP2BLOB_CLIENT_SECRET";

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// A string that never shows up in logs or printed configuration.
///
/// `Debug`, `Display` and `Serialize` all redact; only [`SecretString::expose`]
/// yields the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn redacted(&self) -> &'static str {
        if self.0.is_empty() {
            ""
        } else {
            "********"
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString({:?})", self.redacted())
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.redacted())
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.redacted())
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for sp2blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub sharepoint: SharePointConfig,
    pub storage: StorageConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
}

/// Service principal credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Azure AD tenant (directory) ID.
    pub tenant_id: String,
    /// Application (client) ID of the service principal.
    pub client_id: String,
    pub client_secret: SecretString,
    /// Identity authority, e.g. `https://login.microsoftonline.com`.
    pub authority_host: String,
}

/// Where files are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharePointConfig {
    /// Full site URL, e.g. `https://contoso.sharepoint.com/sites/Finance`.
    pub site_url: String,
    /// Document library display name.
    pub library: String,
    /// Folder inside the library to start from; empty means the library root.
    pub folder: String,
    /// Wildcard file-name filter.
    pub filter: String,
    /// Microsoft Graph base URL.
    pub graph_base_url: String,
}

/// Where files are written to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage account name.
    pub account: String,
    /// Target container.
    pub container: String,
    /// Virtual folder prepended to every blob name.
    pub blob_prefix: String,
    /// Overrides `https://{account}.blob.core.windows.net`.
    pub endpoint: Option<String>,
}

/// Transfer behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bound on concurrent folder listings and on concurrent file copies.
    pub max_concurrency: usize,
    /// Files above this size (in MiB) are uploaded as a block list.
    pub upload_threshold_mb: u64,
    /// Size of each uploaded block (in MiB).
    pub chunk_size_mb: u64,
    /// Delete each source file after it was copied.
    pub delete_after_copy: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: SecretString::default(),
            authority_host: "https://login.microsoftonline.com".to_string(),
        }
    }
}

impl Default for SharePointConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            library: "Documents".to_string(),
            folder: String::new(),
            filter: "*".to_string(),
            graph_base_url: "https://graph.microsoft.com/v1.0".to_string(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            upload_threshold_mb: 32,
            chunk_size_mb: 8,
            delete_after_copy: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl StorageConfig {
    /// Blob service endpoint, without a trailing slash.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                endpoint.trim().trim_end_matches('/').to_string()
            }
            _ => format!("https://{}.blob.core.windows.net", self.account),
        }
    }
}

impl TransferConfig {
    pub fn upload_threshold_bytes(&self) -> u64 {
        self.upload_threshold_mb.saturating_mul(MIB)
    }

    pub fn chunk_size_bytes(&self) -> usize {
        usize::try_from(self.chunk_size_mb.saturating_mul(MIB)).unwrap_or(usize::MAX)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from `path`.
    ///
    /// Files ending in `.yaml`/`.yml` are parsed as YAML, everything else as
    /// `KEY=value` lines. Unknown keys are dropped silently; use
    /// [`Config::load_with_warnings`] to see them.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Self::load_with_warnings(path).map(|(config, _)| config)
    }

    /// Like [`Config::load`] but also returns one warning per ignored line.
    pub fn load_with_warnings(path: &Path) -> anyhow::Result<(Self, Vec<String>)> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let (mut config, warnings) = if is_yaml {
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?;
            (config, Vec::new())
        } else {
            Self::parse_key_values(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        };

        config.apply_env_fallback(|key| std::env::var(key).ok());
        Ok((config, warnings))
    }

    /// Parse `KEY=value` lines.
    ///
    /// Blank lines and `#` comments are skipped, an `export ` prefix is
    /// accepted, and a value wrapped in matching single or double quotes is
    /// unwrapped. Unknown keys and lines without `=` produce warnings.
    pub fn parse_key_values(content: &str) -> anyhow::Result<(Self, Vec<String>)> {
        let mut config = Config::default();
        let mut warnings = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();

            let Some((key, value)) = line.split_once('=') else {
                warnings.push(format!("line {line_no}: expected KEY=value"));
                continue;
            };
            let key = key.trim();
            let value = unquote(value.trim());

            if !config.set_key(key, value, line_no)? {
                warnings.push(format!("line {line_no}: unknown key '{key}' ignored"));
            }
        }

        Ok((config, warnings))
    }

    /// Assign one recognised key. Returns `Ok(false)` for unknown keys.
    fn set_key(&mut self, key: &str, value: &str, line_no: usize) -> anyhow::Result<bool> {
        match key {
            "TENANT_ID" => self.auth.tenant_id = value.to_string(),
            "CLIENT_ID" => self.auth.client_id = value.to_string(),
            "CLIENT_SECRET" => self.auth.client_secret = SecretString::new(value),
            "AUTHORITY_HOST" => self.auth.authority_host = value.to_string(),
            "SHAREPOINT_SITE_URL" => self.sharepoint.site_url = value.to_string(),
            "SHAREPOINT_LIBRARY" => self.sharepoint.library = value.to_string(),
            "SHAREPOINT_FOLDER" => self.sharepoint.folder = value.to_string(),
            "FILE_FILTER" => self.sharepoint.filter = value.to_string(),
            "GRAPH_BASE_URL" => self.sharepoint.graph_base_url = value.to_string(),
            "STORAGE_ACCOUNT" => self.storage.account = value.to_string(),
            "CONTAINER_NAME" => self.storage.container = value.to_string(),
            "BLOB_PREFIX" => self.storage.blob_prefix = value.to_string(),
            "STORAGE_ENDPOINT" => {
                self.storage.endpoint = (!value.is_empty()).then(|| value.to_string())
            }
            "MAX_CONCURRENCY" => self.transfer.max_concurrency = parse_number(key, value, line_no)?,
            "UPLOAD_THRESHOLD_MB" => {
                self.transfer.upload_threshold_mb = parse_number(key, value, line_no)?
            }
            "CHUNK_SIZE_MB" => self.transfer.chunk_size_mb = parse_number(key, value, line_no)?,
            "DELETE_AFTER_COPY" => self.transfer.delete_after_copy = parse_bool(key, value, line_no)?,
            "LOG_LEVEL" => self.logging.level = value.to_lowercase(),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Fill an empty client secret from [`CLIENT_SECRET_ENV`].
    pub fn apply_env_fallback(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.auth.client_secret.is_empty() {
            if let Some(secret) = lookup(CLIENT_SECRET_ENV).filter(|s| !s.is_empty()) {
                self.auth.client_secret = SecretString::new(secret);
            }
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/sp2blob/sp2blob.conf` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("sp2blob")
            .join("sp2blob.conf")
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str, line_no: usize) -> anyhow::Result<T> {
    match value.parse() {
        Ok(n) => Ok(n),
        Err(_) => bail!("line {line_no}: {key} must be a non-negative integer, got '{value}'"),
    }
}

fn parse_bool(key: &str, value: &str, line_no: usize) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => bail!("line {line_no}: {key} must be true or false, got '{value}'"),
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Values supplied on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub library: Option<String>,
    pub folder: Option<String>,
    pub filter: Option<String>,
    pub container: Option<String>,
    pub blob_prefix: Option<String>,
    pub max_concurrency: Option<usize>,
    pub delete_after_copy: Option<bool>,
    pub log_level: Option<String>,
}

impl Config {
    /// Apply CLI overrides on top of the loaded values.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(library) = &overrides.library {
            self.sharepoint.library = library.clone();
        }
        if let Some(folder) = &overrides.folder {
            self.sharepoint.folder = folder.clone();
        }
        if let Some(filter) = &overrides.filter {
            self.sharepoint.filter = filter.clone();
        }
        if let Some(container) = &overrides.container {
            self.storage.container = container.clone();
        }
        if let Some(prefix) = &overrides.blob_prefix {
            self.storage.blob_prefix = prefix.clone();
        }
        if let Some(n) = overrides.max_concurrency {
            self.transfer.max_concurrency = n;
        }
        if let Some(delete) = overrides.delete_after_copy {
            self.transfer.delete_after_copy = delete;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"storage.container"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `transfer.max_concurrency`.
pub const MAX_CONCURRENCY_LIMIT: usize = 32;

/// Largest block a single Put Block accepts (MiB).
pub const MAX_CHUNK_SIZE_MB: u64 = 4000;

/// Largest blob a single Put Blob accepts (MiB).
pub const MAX_UPLOAD_THRESHOLD_MB: u64 = 5000;

const MIB: u64 = 1024 * 1024;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- auth ---
        if self.auth.tenant_id.trim().is_empty() {
            push("auth.tenant_id", "is required (TENANT_ID)".into());
        }
        if self.auth.client_id.trim().is_empty() {
            push("auth.client_id", "is required (CLIENT_ID)".into());
        }
        if self.auth.client_secret.is_empty() {
            push(
                "auth.client_secret",
                format!("is required (CLIENT_SECRET or {CLIENT_SECRET_ENV})"),
            );
        }
        if !is_https_url(&self.auth.authority_host) {
            push(
                "auth.authority_host",
                format!("must be an https URL, got '{}'", self.auth.authority_host),
            );
        }

        // --- sharepoint ---
        if self.sharepoint.site_url.trim().is_empty() {
            push("sharepoint.site_url", "is required (SHAREPOINT_SITE_URL)".into());
        } else if !is_https_url(&self.sharepoint.site_url) {
            push(
                "sharepoint.site_url",
                format!(
                    "must look like https://host/sites/name, got '{}'",
                    self.sharepoint.site_url
                ),
            );
        }
        if self.sharepoint.library.trim().is_empty() {
            push("sharepoint.library", "must not be empty".into());
        }
        if let Err(e) = compile_filter(&self.sharepoint.filter) {
            push("sharepoint.filter", e.to_string());
        }

        // --- storage ---
        if self.storage.account.trim().is_empty() {
            push("storage.account", "is required (STORAGE_ACCOUNT)".into());
        }
        if self.storage.container.trim().is_empty() {
            push("storage.container", "is required (CONTAINER_NAME)".into());
        } else if let Err(message) = check_container_name(&self.storage.container) {
            push("storage.container", message);
        }

        // --- transfer ---
        if self.transfer.max_concurrency == 0 || self.transfer.max_concurrency > MAX_CONCURRENCY_LIMIT
        {
            push(
                "transfer.max_concurrency",
                format!("must be in range 1..={MAX_CONCURRENCY_LIMIT}"),
            );
        }
        if self.transfer.upload_threshold_mb == 0 {
            push("transfer.upload_threshold_mb", "must be greater than 0".into());
        } else if self.transfer.upload_threshold_mb > MAX_UPLOAD_THRESHOLD_MB {
            push(
                "transfer.upload_threshold_mb",
                format!("must be at most {MAX_UPLOAD_THRESHOLD_MB}"),
            );
        }
        if self.transfer.chunk_size_mb == 0 {
            push("transfer.chunk_size_mb", "must be greater than 0".into());
        } else if self.transfer.chunk_size_mb > MAX_CHUNK_SIZE_MB {
            push(
                "transfer.chunk_size_mb",
                format!("must be at most {MAX_CHUNK_SIZE_MB}"),
            );
        }
        if self.transfer.chunk_size_mb > self.transfer.upload_threshold_mb {
            push(
                "transfer.chunk_size_mb",
                format!(
                    "chunk_size_mb ({}) must not exceed upload_threshold_mb ({})",
                    self.transfer.chunk_size_mb, self.transfer.upload_threshold_mb
                ),
            );
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

fn is_https_url(value: &str) -> bool {
    value
        .trim()
        .strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .is_some_and(|host| !host.is_empty())
}

/// Blob container naming rules.
fn check_container_name(name: &str) -> Result<(), String> {
    if !(3..=63).contains(&name.len()) {
        return Err(format!("'{name}' must be 3-63 characters long"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "'{name}' may only contain lowercase letters, digits and hyphens"
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(format!("'{name}' must start and end with a letter or digit"));
    }
    if name.contains("--") {
        return Err(format!("'{name}' must not contain consecutive hyphens"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use sp2blob_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .tenant_id("contoso-tenant")
///     .client_id("app-id")
///     .client_secret("s3cret")
///     .site_url("https://contoso.sharepoint.com/sites/Finance")
///     .storage_account("contosoarchive")
///     .container("invoices")
///     .filter("*.pdf")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- auth ---

    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.config.auth.tenant_id = tenant_id.into();
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = client_id.into();
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.client_secret = SecretString::new(secret);
        self
    }

    pub fn authority_host(mut self, host: impl Into<String>) -> Self {
        self.config.auth.authority_host = host.into();
        self
    }

    // --- sharepoint ---

    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.config.sharepoint.site_url = url.into();
        self
    }

    pub fn library(mut self, library: impl Into<String>) -> Self {
        self.config.sharepoint.library = library.into();
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.config.sharepoint.folder = folder.into();
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.config.sharepoint.filter = filter.into();
        self
    }

    pub fn graph_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.sharepoint.graph_base_url = url.into();
        self
    }

    // --- storage ---

    pub fn storage_account(mut self, account: impl Into<String>) -> Self {
        self.config.storage.account = account.into();
        self
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.config.storage.container = container.into();
        self
    }

    pub fn blob_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.storage.blob_prefix = prefix.into();
        self
    }

    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.storage.endpoint = Some(endpoint.into());
        self
    }

    // --- transfer ---

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.transfer.max_concurrency = n;
        self
    }

    pub fn upload_threshold_mb(mut self, mb: u64) -> Self {
        self.config.transfer.upload_threshold_mb = mb;
        self
    }

    pub fn chunk_size_mb(mut self, mb: u64) -> Self {
        self.config.transfer.chunk_size_mb = mb;
        self
    }

    pub fn delete_after_copy(mut self, delete: bool) -> Self {
        self.config.transfer.delete_after_copy = delete;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
