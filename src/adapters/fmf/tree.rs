//! Reads fmf metadata trees from a checkout.
//!
//! Every `*.fmf` file below the tree root contributes data to one node:
//! `dir/main.fmf` describes `/dir`, `dir/name.fmf` describes `/dir/name`,
//! and mapping keys starting with `/` describe nested nodes. Children
//! inherit their parent's data. Only leaves become tests or plans.

use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::domain::errors::TreeError;
use crate::domain::models::{Entity, EntityKind};
use crate::domain::ports::{ArtifactTree, TreeLoader};

const TREE_MARKER: &str = ".fmf";
const MAIN_STEM: &str = "main";
const APPEND_SUFFIX: char = '+';

/// Loader for fmf trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct FmfTreeLoader;

impl FmfTreeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl TreeLoader for FmfTreeLoader {
    #[instrument(skip(self), err)]
    fn load(&self, root: &Path, path: Option<&str>) -> Result<Box<dyn ArtifactTree>, TreeError> {
        let tree_root = tree_root(root, path)?;
        let tree = FmfTree::read(&tree_root)?;
        debug!(
            root = %tree_root.display(),
            tests = tree.tests.len(),
            plans = tree.plans.len(),
            "Loaded metadata tree"
        );
        Ok(Box::new(tree))
    }
}

/// Tests and plans of one fmf tree, in visit order.
#[derive(Debug, Clone, Default)]
pub struct FmfTree {
    tests: Vec<Entity>,
    plans: Vec<Entity>,
}

impl FmfTree {
    /// Read the tree rooted at `tree_root`, which must hold a `.fmf` directory.
    pub fn read(tree_root: &Path) -> Result<Self, TreeError> {
        if !tree_root.join(TREE_MARKER).is_dir() {
            return Err(TreeError::NotATree(tree_root.to_path_buf()));
        }

        let mut top = Node::default();
        let walker = WalkDir::new(tree_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map_or_else(|| tree_root.to_path_buf(), Path::to_path_buf);
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                TreeError::Io { path, source }
            })?;

            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|e| e.to_str()) != Some("fmf")
            {
                continue;
            }

            let segments = node_segments(tree_root, entry.path());
            let node = top.descend(&segments);
            absorb(node, read_mapping(entry.path())?, entry.path())?;
        }

        let mut tree = Self::default();
        tree.collect(&top, "/", &Map::new());
        Ok(tree)
    }

    fn collect(&mut self, node: &Node, name: &str, inherited: &Map<String, Value>) {
        let data = inherit(inherited, &node.data);

        if node.children.is_empty() {
            let kind = if data.contains_key("test") {
                EntityKind::Test
            } else if data.contains_key("execute") {
                EntityKind::Plan
            } else {
                return;
            };
            let entity = Entity::new(kind, name).with_metadata(data);
            match kind {
                EntityKind::Test => self.tests.push(entity),
                EntityKind::Plan => self.plans.push(entity),
            }
            return;
        }

        for (child_name, child) in &node.children {
            let full = if name == "/" {
                format!("/{child_name}")
            } else {
                format!("{name}/{child_name}")
            };
            self.collect(child, &full, &data);
        }
    }
}

impl ArtifactTree for FmfTree {
    fn tests(&self) -> &[Entity] {
        &self.tests
    }

    fn plans(&self) -> &[Entity] {
        &self.plans
    }
}

/// One node of the tree with only its own (not yet inherited) data.
#[derive(Debug, Default)]
struct Node {
    data: Map<String, Value>,
    children: Vec<(String, Node)>,
}

impl Node {
    fn child_mut(&mut self, name: &str) -> &mut Node {
        let index = match self.children.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.children.push((name.to_string(), Node::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[index].1
    }

    fn descend<S: AsRef<str>>(&mut self, segments: &[S]) -> &mut Node {
        segments
            .iter()
            .fold(self, |node, segment| node.child_mut(segment.as_ref()))
    }
}

fn tree_root(root: &Path, path: Option<&str>) -> Result<PathBuf, TreeError> {
    let Some(path) = path else {
        return Ok(root.to_path_buf());
    };

    let relative = Path::new(path.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(TreeError::InvalidPath(path.to_string()));
            }
        }
    }
    Ok(resolved)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Node path segments for a file: its directory, plus the stem unless `main`.
fn node_segments(tree_root: &Path, file: &Path) -> Vec<String> {
    let relative = file.strip_prefix(tree_root).unwrap_or(file);
    let mut segments: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
        if stem != MAIN_STEM {
            segments.push(stem.to_string());
        }
    }
    segments
}

fn read_mapping(file: &Path) -> Result<serde_yaml::Mapping, TreeError> {
    let content = std::fs::read_to_string(file).map_err(|source| TreeError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| parse_error(file, e))?;

    match value {
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
        _ => Err(parse_error(file, "top level must be a mapping")),
    }
}

/// Merge a parsed mapping into `node`, creating nested nodes for `/` keys.
fn absorb(node: &mut Node, mapping: serde_yaml::Mapping, file: &Path) -> Result<(), TreeError> {
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            return Err(parse_error(file, "keys must be strings"));
        };

        if let Some(rest) = key.strip_prefix('/') {
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            let child = node.descend(&segments);
            match value {
                serde_yaml::Value::Mapping(inner) => absorb(child, inner, file)?,
                serde_yaml::Value::Null => {}
                _ => return Err(parse_error(file, format!("node '{key}' must be a mapping"))),
            }
            continue;
        }

        let value = serde_json::to_value(value).map_err(|e| parse_error(file, e))?;
        node.data.insert(key.to_string(), value);
    }
    Ok(())
}

/// Apply a child's own data on top of what it inherits.
fn inherit(parent: &Map<String, Value>, own: &Map<String, Value>) -> Map<String, Value> {
    let mut data = parent.clone();
    for (key, value) in own {
        match key.strip_suffix(APPEND_SUFFIX) {
            Some(base) => {
                let merged = match data.remove(base) {
                    Some(existing) => append(existing, value.clone()),
                    None => value.clone(),
                };
                data.insert(base.to_string(), merged);
            }
            None => {
                data.insert(key.clone(), value.clone());
            }
        }
    }
    data
}

fn append(existing: Value, addition: Value) -> Value {
    match (existing, addition) {
        (Value::Array(mut items), Value::Array(more)) => {
            items.extend(more);
            Value::Array(items)
        }
        (Value::Array(mut items), single) => {
            items.push(single);
            Value::Array(items)
        }
        (Value::String(mut s), Value::String(more)) => {
            s.push_str(&more);
            Value::String(s)
        }
        (Value::Object(mut map), Value::Object(more)) => {
            map.extend(more);
            Value::Object(map)
        }
        (_, replacement) => replacement,
    }
}

fn parse_error(file: &Path, message: impl ToString) -> TreeError {
    TreeError::Parse {
        path: file.to_path_buf(),
        message: message.to_string(),
    }
}
