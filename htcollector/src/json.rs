//! Depth-first traversal of JSON trees with JSONPath-like locations.
//!
//! Object members are addressed as `parent.key` and array elements as
//! `parent[i]`, starting from `$`. An array element inherits the key of the
//! member that holds the array, so `{"ids":[1,2]}` visits `ids` at `$.ids`,
//! then `ids` at `$.ids[0]` and `$.ids[1]`.
use serde_json::Value;

/// Path of the document root.
pub const ROOT_PATH: &str = "$";

/// Whether the walker should look inside a container node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Walk {
    /// Visit the children of the node.
    Descend,
    /// Do not visit the children of the node.
    Skip,
}

/// Callback invoked for every node below the root.
pub trait VisitorMut {
    /// Visits `node`, reachable through `key` at `path`. The return value is
    /// ignored for scalar nodes.
    fn visit(&mut self, key: &str, path: &str, node: &mut Value) -> Walk;
}

/// Walks every node below `root` in document order.
pub fn walk_mut<V: VisitorMut>(root: &mut Value, visitor: &mut V) {
    walk_children(root, "", ROOT_PATH, visitor);
}

fn walk_children<V: VisitorMut>(node: &mut Value, key: &str, path: &str, visitor: &mut V) {
    match node {
        Value::Object(members) => {
            for (child_key, child) in members.iter_mut() {
                let child_path = format!("{path}.{child_key}");
                if visitor.visit(child_key, &child_path, child) == Walk::Descend {
                    walk_children(child, child_key, &child_path, visitor);
                }
            }
        }
        Value::Array(elements) => {
            for (index, child) in elements.iter_mut().enumerate() {
                let child_path = format!("{path}[{index}]");
                if visitor.visit(key, &child_path, child) == Walk::Descend {
                    walk_children(child, key, &child_path, visitor);
                }
            }
        }
        _ => {}
    }
}

/// Calls `f` with the path of every scalar leaf of `node`, including `node`
/// itself when it is a scalar. `null` is not a leaf.
pub fn for_each_leaf_mut<F>(node: &mut Value, path: &str, f: &mut F)
where
    F: FnMut(&str, &mut Value),
{
    match node {
        Value::Object(members) => {
            for (key, child) in members.iter_mut() {
                for_each_leaf_mut(child, &format!("{path}.{key}"), f);
            }
        }
        Value::Array(elements) => {
            for (index, child) in elements.iter_mut().enumerate() {
                for_each_leaf_mut(child, &format!("{path}[{index}]"), f);
            }
        }
        Value::Null => {}
        _ => f(path, node),
    }
}

/// Textual form of a scalar: strings without quotes, everything else as JSON.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        visited: Vec<(String, String)>,
    }

    impl VisitorMut for Recorder {
        fn visit(&mut self, key: &str, path: &str, node: &mut Value) -> Walk {
            self.visited.push((key.to_string(), path.to_string()));
            if node.get("secret").is_some() {
                Walk::Skip
            } else {
                Walk::Descend
            }
        }
    }

    #[test]
    fn array_elements_inherit_member_key() {
        let mut doc = json!({"ids": [1, 2], "nested": {"secret": 1}});
        let mut recorder = Recorder::default();
        walk_mut(&mut doc, &mut recorder);

        let visited: Vec<(&str, &str)> = recorder
            .visited
            .iter()
            .map(|(k, p)| (k.as_str(), p.as_str()))
            .collect();
        assert_eq!(
            visited,
            vec![
                ("ids", "$.ids"),
                ("ids", "$.ids[0]"),
                ("ids", "$.ids[1]"),
                ("nested", "$.nested"),
            ]
        );
    }

    #[test]
    fn leaves_skip_null() {
        let mut doc = json!({"a": [true, null, {"b": 1.5}]});
        let mut paths = Vec::new();
        for_each_leaf_mut(&mut doc, ROOT_PATH, &mut |path, value| {
            paths.push(format!("{path}={}", scalar_text(value)));
        });
        assert_eq!(paths, vec!["$.a[0]=true", "$.a[2].b=1.5"]);
    }
}
