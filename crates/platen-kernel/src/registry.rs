//! File types and the conversion graph.
//!
//! Types are interned by name. Conversions are directed edges carrying the
//! argv of an external converter program; the registry keeps at most one edge
//! per ordered `(from, to)` pair, with the last declaration winning. Path
//! queries run BFS over the adjacency structure, so the result is always a
//! fewest-stages path, with ties broken by edge insertion order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use platen_types::{SpoolError, SpoolResult};

/// A conversion edge: run `argv` to turn a `from`-typed stream into `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub argv: Vec<String>,
}

/// Registry of declared file types and conversions between them.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Declared type names.
    types: HashSet<String>,
    /// All conversion edges in insertion order. Redeclaring a pair replaces
    /// the argv in place, keeping the edge's position.
    conversions: Vec<Conversion>,
    /// Adjacency: type name → indices into `conversions`, insertion order.
    adjacency: HashMap<String, Vec<usize>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a file type. Idempotent: declaring an existing name is a
    /// no-op and returns `false`.
    pub fn declare_type(&mut self, name: &str) -> bool {
        self.types.insert(name.to_string())
    }

    /// True if `name` has been declared.
    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains(name)
    }

    /// Infer the type of a file from its extension.
    ///
    /// Returns `None` when the path has no extension or the extension has not
    /// been declared as a type.
    pub fn infer_type(&self, path: &str) -> Option<String> {
        let ext = Path::new(path).extension()?.to_str()?;
        self.contains_type(ext).then(|| ext.to_string())
    }

    /// Declare a conversion edge. Both endpoint types must already be
    /// declared and `argv` must name a program. Redeclaring an existing pair
    /// replaces its argv (last wins).
    pub fn declare_conversion(
        &mut self,
        from: &str,
        to: &str,
        argv: Vec<String>,
    ) -> SpoolResult<()> {
        if !self.contains_type(from) {
            return Err(SpoolError::UnknownType(from.to_string()));
        }
        if !self.contains_type(to) {
            return Err(SpoolError::UnknownType(to.to_string()));
        }
        if argv.is_empty() {
            return Err(SpoolError::Launch("conversion has no program".to_string()));
        }

        if let Some(existing) = self
            .conversions
            .iter_mut()
            .find(|c| c.from == from && c.to == to)
        {
            existing.argv = argv;
            return Ok(());
        }

        let idx = self.conversions.len();
        self.conversions.push(Conversion {
            from: from.to_string(),
            to: to.to_string(),
            argv,
        });
        self.adjacency.entry(from.to_string()).or_default().push(idx);
        Ok(())
    }

    /// Compute the shortest conversion path from `from` to `to`.
    ///
    /// Returns `Some(vec![])` iff `from == to`, `None` when no path exists,
    /// and otherwise the fewest-stages edge sequence. Among equal-length
    /// paths the earliest-declared edges win.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<Conversion>> {
        if !self.contains_type(from) || !self.contains_type(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        // BFS, remembering the edge that first reached each node.
        let mut reached_by: HashMap<&str, usize> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);
        reached_by.insert(from, usize::MAX);

        while let Some(node) = queue.pop_front() {
            let Some(edges) = self.adjacency.get(node) else {
                continue;
            };
            for &idx in edges {
                let next = self.conversions[idx].to.as_str();
                if reached_by.contains_key(next) {
                    continue;
                }
                reached_by.insert(next, idx);
                if next == to {
                    return Some(self.reconstruct(from, to, &reached_by));
                }
                queue.push_back(next);
            }
        }
        None
    }

    fn reconstruct(
        &self,
        from: &str,
        to: &str,
        reached_by: &HashMap<&str, usize>,
    ) -> Vec<Conversion> {
        let mut path = Vec::new();
        let mut node = to;
        while node != from {
            let idx = reached_by[node];
            let edge = &self.conversions[idx];
            path.push(edge.clone());
            node = edge.from.as_str();
        }
        path.reverse();
        path
    }
}
