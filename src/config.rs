//! Run options for kiln.
//! Process-wide defaults come from the environment once, in [`Options::from_env`],
//! and are then passed explicitly into the runner.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default suffix marking a file whose content is rendered.
pub const DEFAULT_MARKER_EXT: &str = ".tpl";

/// Default upper bound for cloning a remote template, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

pub const ENV_TEMPLATE_CACHE: &str = "KILN_TEMPLATE_CACHE";
pub const ENV_MARKER_EXT: &str = "KILN_TEMPLATE_EXT";
pub const ENV_FETCH_TIMEOUT: &str = "KILN_FETCH_TIMEOUT";

/// Options controlling a single run.
#[derive(Debug, Clone, Serialize)]
pub struct Options {
    /// Render the plan but never touch the destination or run hooks.
    pub dry_run: bool,
    /// Directory holding clones of remote templates.
    pub template_cache_dir: PathBuf,
    /// File suffix marking rendered content, including the leading dot.
    pub template_marker_ext: String,
    /// Upper bound for cloning a remote template.
    #[serde(serialize_with = "serialize_secs")]
    pub fetch_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dry_run: false,
            template_cache_dir: default_cache_dir(),
            template_marker_ext: DEFAULT_MARKER_EXT.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl Options {
    /// Builds options from `KILN_*` environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(dir) = std::env::var(ENV_TEMPLATE_CACHE) {
            if !dir.is_empty() {
                options.template_cache_dir = PathBuf::from(dir);
            }
        }
        if let Ok(ext) = std::env::var(ENV_MARKER_EXT) {
            if !ext.is_empty() {
                options.template_marker_ext = normalize_marker_ext(&ext);
            }
        }
        if let Ok(secs) = std::env::var(ENV_FETCH_TIMEOUT) {
            match secs.parse::<u64>() {
                Ok(secs) => options.fetch_timeout = Duration::from_secs(secs),
                Err(_) => log::warn!("Ignoring invalid {ENV_FETCH_TIMEOUT} value '{secs}'"),
            }
        }

        options
    }

    /// Renders the options as `key = value` lines, sorted by key.
    pub fn describe(&self) -> String {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(entries)) => entries
                .iter()
                .map(|(key, value)| format!("{key} = {value}\n"))
                .collect(),
            _ => format!("{self:?}\n"),
        }
    }

    pub fn with_marker_ext(mut self, ext: &str) -> Self {
        self.template_marker_ext = normalize_marker_ext(ext);
        self
    }
}

/// Ensures the marker extension starts with a dot: `tpl` becomes `.tpl`.
pub fn normalize_marker_ext(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("kiln").join("templates"))
        .unwrap_or_else(|| PathBuf::from(".kiln").join("templates"))
}

fn serialize_secs<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}
