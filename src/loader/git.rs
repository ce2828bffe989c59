//! Git template source.
//!
//! A repository is cloned into `<cache>/<slug>`, where the slug is derived from
//! the URL, so repeated runs against the same URL refresh one stable
//! directory. An advisory lock file next to the entry serializes concurrent
//! runs for the same URL from bootstrap until finalize.
use crate::error::{Error, Result};
use crate::loader::Source;
use crate::runner::RunOutcome;
use fs4::fs_std::FileExt;
use log::{debug, info, warn};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use url::Url;

/// Template cloned from a git repository into the template cache.
#[derive(Debug)]
pub struct GitSource {
    url: String,
    cache_dir: PathBuf,
    path: PathBuf,
    absolute_path: PathBuf,
    timeout: Duration,
    lock: Option<File>,
    populated: bool,
}

/// Returns true for locators that look like git remotes.
pub fn is_git_url(s: &str) -> bool {
    if s.starts_with("git@") {
        return true;
    }
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "https" | "git" | "ssh"),
        Err(_) => false,
    }
}

/// Derives the cache directory name for a URL.
///
/// The readable part is a slug of the URL without its trailing `.git` or `/`;
/// a short hash of the full URL keeps distinct URLs with equal slugs apart.
pub fn cache_key(url: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let non_alnum = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

    let normalized = url.trim_end_matches('/').trim_end_matches(".git");
    let lowered = normalized.to_lowercase();
    let slug = non_alnum.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');

    let digest = Sha256::digest(normalized.as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();

    if slug.is_empty() {
        format!("template-{hash}")
    } else {
        format!("{slug}-{hash}")
    }
}

fn fetch_failed(url: &str, reason: impl Into<String>, source: Option<git2::Error>) -> Error {
    Error::SourceFetchError {
        url: url.to_string(),
        reason: reason.into(),
        source,
    }
}

impl GitSource {
    pub fn new<S: Into<String>, P: AsRef<Path>>(
        url: S,
        cache_dir: P,
        timeout: Duration,
    ) -> Result<Self> {
        let url = url.into();
        let cache_dir = cache_dir.as_ref().to_path_buf();
        let path = cache_dir.join(cache_key(&url));
        let absolute_path = std::path::absolute(&path)?;
        Ok(Self {
            url,
            cache_dir,
            path,
            absolute_path,
            timeout,
            lock: None,
            populated: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.cache_dir.join(name)
    }

    fn fetch_error(&self, reason: impl Into<String>) -> Error {
        fetch_failed(&self.url, reason, None)
    }

    fn acquire_lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.fetch_error(format!("cannot open {}: {e}", lock_path.display())))?;
        debug!("Locking template cache entry '{}'.", lock_path.display());
        file.lock_exclusive()
            .map_err(|e| self.fetch_error(format!("cannot lock {}: {e}", lock_path.display())))?;
        Ok(file)
    }
}

impl std::fmt::Display for GitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "git repository: '{}'", self.url)
    }
}

impl Source for GitSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Remote existence is only confirmed by the clone itself.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Clones the repository into its cache entry, replacing a previous clone.
    ///
    /// # Errors
    /// * `Error::SourceFetchError` if the cache cannot be prepared, the clone
    ///   fails or it exceeds the fetch timeout
    fn bootstrap(&mut self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            self.fetch_error(format!(
                "cannot create cache {}: {e}",
                self.cache_dir.display()
            ))
        })?;

        let lock = self.acquire_lock()?;

        if self.path.exists() {
            debug!("Refreshing cached clone '{}'.", self.path.display());
            fs::remove_dir_all(&self.path).map_err(|e| {
                self.fetch_error(format!("cannot clear {}: {e}", self.path.display()))
            })?;
        }
        fs::create_dir_all(&self.path).map_err(|e| {
            self.fetch_error(format!("cannot create {}: {e}", self.path.display()))
        })?;

        info!(
            "Cloning repository '{}' to '{}'.",
            self.url,
            self.path.display()
        );
        if let Err(error) = clone_repository(&self.url, &self.path, self.timeout) {
            // Leave no half-written clone behind for the next run.
            if let Err(e) = fs::remove_dir_all(&self.path) {
                warn!(
                    "Could not remove partial clone '{}': {e}",
                    self.path.display()
                );
            }
            return Err(error);
        }

        self.lock = Some(lock);
        self.populated = true;
        Ok(())
    }

    /// Evicts the cache entry populated by this run when the run was rolled
    /// back, then releases the cache lock.
    fn finalize(&mut self, outcome: &RunOutcome) -> Result<()> {
        let result = if outcome.is_rollback() && self.populated {
            info!("Evicting cached clone '{}'.", self.path.display());
            self.populated = false;
            fs::remove_dir_all(&self.path).map_err(Error::IoError)
        } else {
            Ok(())
        };
        self.lock = None;
        result
    }
}

/// Bounds libgit2's socket connects and reads by `timeout`.
fn set_server_timeouts(timeout: Duration) -> std::result::Result<(), git2::Error> {
    let millis = i32::try_from(timeout.as_millis())
        .unwrap_or(i32::MAX)
        .max(1);
    // SAFETY: the options are process-wide integers set before this run
    // opens any connection.
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)?;
    }
    Ok(())
}

fn remote_callbacks<'a>(within_deadline: &'a dyn Fn() -> bool) -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.transfer_progress(move |_progress| within_deadline());
    callbacks.sideband_progress(move |_data| within_deadline());
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
        } else {
            git2::Cred::default()
        }
    });
    callbacks
}

/// Asks the remote which branch its HEAD points at, e.g. `main`.
fn default_branch(
    url: &str,
    callbacks: git2::RemoteCallbacks<'_>,
) -> std::result::Result<String, git2::Error> {
    let mut remote = git2::Remote::create_detached(url)?;
    let connection = remote.connect_auth(git2::Direction::Fetch, Some(callbacks), None)?;
    let head = connection.default_branch()?;
    let head = head
        .as_str()
        .ok_or_else(|| git2::Error::from_str("default branch name is not UTF-8"))?;
    Ok(head.strip_prefix("refs/heads/").unwrap_or(head).to_string())
}

/// Shallow clone of the default branch of `url` into `into`, abandoned once
/// `timeout` has elapsed.
///
/// Only that branch is fetched, and the clone's `origin` is configured to
/// track it alone.
fn clone_repository(url: &str, into: &Path, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let timed_out = Cell::new(false);
    let within_deadline = || {
        let ok = Instant::now() < deadline;
        if !ok {
            timed_out.set(true);
        }
        ok
    };
    let expired = || fetch_failed(url, format!("timed out after {}s", timeout.as_secs()), None);
    let failed = |stage: &str, error: git2::Error| {
        if timed_out.get() {
            expired()
        } else {
            fetch_failed(url, format!("{stage} failed"), Some(error))
        }
    };

    set_server_timeouts(timeout).map_err(|e| failed("configuring timeouts", e))?;

    let branch = default_branch(url, remote_callbacks(&within_deadline))
        .map_err(|e| failed("listing remote branches", e))?;
    if !within_deadline() {
        return Err(expired());
    }
    debug!("Fetching branch '{branch}' of '{url}'.");

    let mut fetch_opts = git2::FetchOptions::new();
    fetch_opts.remote_callbacks(remote_callbacks(&within_deadline));
    // The local transport does not negotiate shallow fetches.
    if !url.starts_with("file://") {
        fetch_opts.depth(1);
    }

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_opts);
    builder.branch(&branch);
    builder.remote_create(|repo, name, url| {
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{name}/{branch}");
        repo.remote_with_fetch(name, url, &refspec)
    });

    builder
        .clone(url, into)
        .map(|_| ())
        .map_err(|e| failed("cloning", e))
}
