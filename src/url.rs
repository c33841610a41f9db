//! Builds fetch urls for bundles and files.

use std::path::PathBuf;

/// Decides where bundles and files are fetched from.
pub trait UrlResolver: Send + Sync {
    /// Returns the url of the bundle named `name`.
    fn bundle_url(&self, name: &str) -> String;

    /// Returns the url of a shipped file. With `packaged_only` set, newer local
    /// copies are ignored.
    fn local_url(&self, path: &str, packaged_only: bool) -> String;

    /// Returns the url of a file on the download server, if there is one.
    fn remote_url(&self, path: &str) -> Option<String>;
}

/// Prefers a newer copy under the persistent directory, then falls back to the
/// packaged location. Remote urls are rooted at an optional download base.
#[derive(Debug, Clone)]
pub struct LocalFirstResolver {
    persistent: Option<PathBuf>,
    packaged: String,
    remote: Option<String>,
}

impl LocalFirstResolver {
    /// Creates a resolver serving everything from `packaged`, which is a url
    /// prefix like `file:///opt/game/data/` or `mem://`.
    pub fn new<T: Into<String>>(packaged: T) -> Self {
        LocalFirstResolver {
            persistent: None,
            packaged: with_separator(packaged.into()),
            remote: None,
        }
    }

    /// Sets the directory holding downloaded, newer copies.
    pub fn with_persistent<T: Into<PathBuf>>(mut self, dir: T) -> Self {
        self.persistent = Some(dir.into());
        self
    }

    /// Sets the download server base url.
    pub fn with_remote<T: Into<String>>(mut self, base: T) -> Self {
        self.remote = Some(with_separator(base.into()));
        self
    }

    fn persistent_url(&self, path: &str) -> Option<String> {
        let dir = self.persistent.as_ref()?;
        let location = dir.join(path);
        if location.is_file() {
            Some(format!("file://{}", location.display()))
        } else {
            None
        }
    }
}

impl UrlResolver for LocalFirstResolver {
    fn bundle_url(&self, name: &str) -> String {
        self.local_url(name, false)
    }

    fn local_url(&self, path: &str, packaged_only: bool) -> String {
        if !packaged_only {
            if let Some(url) = self.persistent_url(path) {
                return url;
            }
        }

        format!("{}{}", self.packaged, path)
    }

    fn remote_url(&self, path: &str) -> Option<String> {
        self.remote.as_ref().map(|v| format!("{}{}", v, path))
    }
}

fn with_separator(mut prefix: String) -> String {
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }

    prefix
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fallback() {
        let resolver = LocalFirstResolver::new("mem://").with_persistent("/nonexistent-dir");
        assert_eq!(resolver.bundle_url("ui"), "mem://ui");
        assert_eq!(resolver.local_url("a.txt", true), "mem://a.txt");
        assert_eq!(resolver.remote_url("a.txt"), None);

        let resolver = resolver.with_remote("http://cdn.example.com/res");
        assert_eq!(
            resolver.remote_url("a.txt"),
            Some("http://cdn.example.com/res/a.txt".to_owned())
        );
    }
}
