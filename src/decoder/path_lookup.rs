//! Dotted path lookup over document trees
//!
//! The document engine accepts one logical path `a.b.c` in several shapes:
//!
//! ```json
//! {"a": {"b": {"c": "value1"}}}
//! {"a.b": {"c": "value2"}}
//! {"a": {"b.c": "value3"}}
//! {"a.b.c": "value4"}
//! ```
//!
//! [`PathLookup`] resolves all of them. At each object it takes the longest
//! key that spells a prefix of the remaining segments, then continues below
//! it. Arrays met on the way fan out over their elements. At the top level a
//! key that matches no exact-case spelling is retried case-insensitively.
//!
//! The walk is an explicit stack machine, so deep documents never recurse.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
struct Frame<'d> {
    node: &'d Value,
    /// Index of the first unresolved segment
    start: usize,
    at_root: bool,
}

#[derive(Debug, Clone)]
pub struct PathLookup<'p> {
    segments: Vec<&'p str>,
    case_insensitive_root: bool,
}

impl<'p> PathLookup<'p> {
    /// Lookup from the top of a document, with case-insensitive fallback
    pub fn new(dotted_path: &'p str) -> Self {
        PathLookup {
            segments: dotted_path.split('.').collect(),
            case_insensitive_root: true,
        }
    }

    /// Lookup inside a nested object, exact case only
    pub fn nested(dotted_path: &'p str) -> Self {
        PathLookup {
            case_insensitive_root: false,
            ..Self::new(dotted_path)
        }
    }

    /// Every non-null value reachable under the path, in document order
    pub fn find_all<'d>(&self, document: &'d Value) -> Vec<&'d Value> {
        let mut found = Vec::new();
        let mut stack = vec![Frame {
            node: document,
            start: 0,
            at_root: true,
        }];

        while let Some(frame) = stack.pop() {
            match frame.node {
                Value::Array(items) => {
                    stack.extend(items.iter().rev().map(|item| Frame { node: item, ..frame }));
                }
                Value::Object(map) => {
                    let Some((end, child)) = self.step(map, frame.start, frame.at_root) else {
                        continue;
                    };
                    if end == self.segments.len() {
                        if !child.is_null() {
                            found.push(child);
                        }
                    } else {
                        stack.push(Frame {
                            node: child,
                            start: end,
                            at_root: false,
                        });
                    }
                }
                _ => {}
            }
        }
        found
    }

    pub fn find_first<'d>(&self, document: &'d Value) -> Option<&'d Value> {
        self.find_all(document).into_iter().next()
    }

    /// Longest key spelling `segments[start..end]`; returns `end` and the child
    fn step<'d>(&self, map: &'d Map<String, Value>, start: usize, at_root: bool) -> Option<(usize, &'d Value)> {
        let remaining = self.segments.len() - start;
        let candidates = || {
            (1..=remaining)
                .rev()
                .map(move |len| (start + len, self.segments[start..start + len].join(".")))
        };

        let exact = candidates().find_map(|(end, key)| map.get(&key).map(|child| (end, child)));
        if exact.is_some() || !(at_root && self.case_insensitive_root) {
            return exact;
        }

        candidates().find_map(|(end, key)| {
            map.iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&key))
                .map(|(_, child)| (end, child))
        })
    }
}
