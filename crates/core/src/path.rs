//! Logical path normalization shared by the resolver, merger and dispatcher.

use std::fmt;

/// A normalized POSIX-style logical path: always starts with `/`, never ends
/// with a trailing slash unless it is the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath(String);

impl LogicalPath {
    pub fn root() -> Self {
        LogicalPath("/".to_string())
    }

    /// Normalize an arbitrary path string into a logical path.
    pub fn new(raw: &str) -> Self {
        let mut normalized = String::from("/");
        for component in raw.split('/').filter(|c| !c.is_empty() && *c != ".") {
            if normalized != "/" {
                normalized.push('/');
            }
            normalized.push_str(component);
        }
        LogicalPath(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Build the logical path of a direct child, given a UTF-8 name.
    pub fn join(&self, name: &str) -> LogicalPath {
        if self.is_root() {
            LogicalPath(format!("/{name}"))
        } else {
            LogicalPath(format!("{}/{name}", self.0))
        }
    }

    /// Parent logical path; the root's parent is itself.
    pub fn parent(&self) -> LogicalPath {
        if self.is_root() {
            return self.clone();
        }
        match self.0.rfind('/') {
            Some(0) => LogicalPath::root(),
            Some(idx) => LogicalPath(self.0[..idx].to_string()),
            None => LogicalPath::root(),
        }
    }

    /// Final path component; empty for root.
    pub fn file_name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Strip the leading `/` to obtain a relative filesystem path suitable
    /// for joining onto a layer root.
    pub fn relative(&self) -> &str {
        self.0.trim_start_matches('/')
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalPath {
    fn from(value: &str) -> Self {
        LogicalPath::new(value)
    }
}

impl From<String> for LogicalPath {
    fn from(value: String) -> Self {
        LogicalPath::new(&value)
    }
}
