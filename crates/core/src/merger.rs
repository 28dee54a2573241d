//! Deterministic merged directory enumeration across the layer stack.
//!
//! Grounded on `jax_fs.rs::readdir`'s merged-entries pattern, generalized
//! across an arbitrary ordered stack instead of a single backend.

use std::collections::HashSet;

use crate::layout::Layout;
use crate::path::LogicalPath;

pub struct Merger<'a> {
    layout: &'a Layout,
    agent_order: &'a [String],
}

impl<'a> Merger<'a> {
    pub fn new(layout: &'a Layout, agent_order: &'a [String]) -> Self {
        Merger { layout, agent_order }
    }

    /// Names present under `dir`, topmost layer first, duplicates suppressed.
    pub fn enumerate(&self, dir: &LogicalPath) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        let mut layer_roots = Vec::new();
        for name in self.agent_order.iter().rev() {
            layer_roots.push(self.layout.agent_path(name));
        }
        layer_roots.push(self.layout.base_path());

        for root in layer_roots {
            let physical = root.join(dir.relative());
            let Ok(read_dir) = std::fs::read_dir(&physical) else {
                continue;
            };
            for entry in read_dir.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if seen.insert(name.clone()) {
                    result.push(name);
                }
            }
        }

        result
    }
}
