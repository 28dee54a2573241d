//! Topmost-layer-wins path resolution over the layer stack.

use std::path::PathBuf;

use crate::layout::Layout;
use crate::path::LogicalPath;

/// A layer reference: either the immutable base, or a named agent layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRef {
    Base,
    Agent(String),
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub physical: PathBuf,
    pub layer: LayerRef,
}

/// Resolves logical paths against an ordered stack of agent layers plus base.
pub struct Resolver<'a> {
    layout: &'a Layout,
    /// Agent layers in manifest order (bottom to top); the active agent is
    /// conventionally the last element, but any ordered stack is resolvable.
    agent_order: &'a [String],
}

impl<'a> Resolver<'a> {
    pub fn new(layout: &'a Layout, agent_order: &'a [String]) -> Self {
        Resolver { layout, agent_order }
    }

    /// Scan agent layers from topmost to bottom, then base. Uses `lstat`
    /// semantics (`symlink_metadata`) so symlinks resolve to themselves.
    pub fn resolve(&self, path: &LogicalPath) -> Option<Resolved> {
        for name in self.agent_order.iter().rev() {
            let candidate = self.layout.agent_path(name).join(path.relative());
            if std::fs::symlink_metadata(&candidate).is_ok() {
                return Some(Resolved {
                    physical: candidate,
                    layer: LayerRef::Agent(name.clone()),
                });
            }
        }

        let base_candidate = self.layout.base_path().join(path.relative());
        if path.is_root() || std::fs::symlink_metadata(&base_candidate).is_ok() {
            return Some(Resolved {
                physical: base_candidate,
                layer: LayerRef::Base,
            });
        }

        None
    }

    /// Physical path for `path` within a specific layer, whether or not it
    /// currently exists there. Used by the write path to build copy-up
    /// targets.
    pub fn physical_in(&self, path: &LogicalPath, layer: &str) -> PathBuf {
        self.layout.agent_path(layer).join(path.relative())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Layout) {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.init().unwrap();
        (dir, layout)
    }

    #[test]
    fn topmost_agent_shadows_lower_agent_and_base() {
        let (_dir, layout) = setup();
        layout.add_agent("a1").unwrap();
        layout.add_agent("a2").unwrap();

        fs::write(layout.base_path().join("f.txt"), "base").unwrap();
        fs::write(layout.agent_path("a1").join("f.txt"), "a1").unwrap();
        fs::write(layout.agent_path("a2").join("f.txt"), "a2").unwrap();

        let agents = vec!["a1".to_string(), "a2".to_string()];
        let resolver = Resolver::new(&layout, &agents);
        let resolved = resolver.resolve(&LogicalPath::new("/f.txt")).unwrap();

        assert_eq!(resolved.layer, LayerRef::Agent("a2".to_string()));
        assert_eq!(fs::read_to_string(resolved.physical).unwrap(), "a2");
    }

    #[test]
    fn falls_back_to_base_when_absent_in_agents() {
        let (_dir, layout) = setup();
        layout.add_agent("a1").unwrap();
        fs::write(layout.base_path().join("f.txt"), "base").unwrap();

        let agents = vec!["a1".to_string()];
        let resolver = Resolver::new(&layout, &agents);
        let resolved = resolver.resolve(&LogicalPath::new("/f.txt")).unwrap();

        assert_eq!(resolved.layer, LayerRef::Base);
    }

    #[test]
    fn absent_everywhere_resolves_to_none() {
        let (_dir, layout) = setup();
        let agents: Vec<String> = vec![];
        let resolver = Resolver::new(&layout, &agents);
        assert!(resolver.resolve(&LogicalPath::new("/missing")).is_none());
    }

    #[test]
    fn root_always_resolves_to_base() {
        let (_dir, layout) = setup();
        let agents: Vec<String> = vec![];
        let resolver = Resolver::new(&layout, &agents);
        let resolved = resolver.resolve(&LogicalPath::root()).unwrap();
        assert_eq!(resolved.layer, LayerRef::Base);
    }
}
