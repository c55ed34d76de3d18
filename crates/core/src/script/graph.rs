use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::{NodeText, ResolvedContext};

/// Outgoing edge offered as a button under a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub label: String,
    pub next: String,
}

impl Response {
    pub fn new(label: impl Into<String>, next: impl Into<String>) -> Self {
        Self { label: label.into(), next: next.into() }
    }
}

#[derive(Clone, Debug)]
pub struct DialogNode {
    pub id: String,
    /// Descriptive phase label; spend inference keys off it.
    pub stage: String,
    pub text: NodeText,
    pub responses: Vec<Response>,
}

impl DialogNode {
    pub fn new(
        id: impl Into<String>,
        stage: impl Into<String>,
        text: impl Into<NodeText>,
        responses: Vec<Response>,
    ) -> Self {
        Self { id: id.into(), stage: stage.into(), text: text.into(), responses }
    }

    pub fn is_terminal(&self) -> bool {
        self.responses.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DanglingEdge {
    pub from: String,
    pub label: String,
    pub next: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScriptDefinitionError {
    #[error("dialog node ids must not be empty")]
    EmptyNodeId,
    #[error("dialog node `{0}` is defined more than once")]
    DuplicateNode(String),
    #[error("start node `{0}` is not defined")]
    MissingStart(String),
    #[error("opener `{opener}` points at unknown node `{node}`")]
    UnknownOpenerTarget { opener: String, node: String },
    #[error("could not read script file `{path}`: {message}")]
    ReadFile { path: PathBuf, message: String },
    #[error("could not parse script definition: {0}")]
    Parse(String),
}

/// Immutable dialog graph, loaded once and shared between sessions.
#[derive(Clone, Debug)]
pub struct ScriptGraph {
    start: String,
    nodes: BTreeMap<String, DialogNode>,
    openers: BTreeMap<String, String>,
}

impl ScriptGraph {
    pub fn builder(start: impl Into<String>) -> ScriptGraphBuilder {
        ScriptGraphBuilder::new(start)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ScriptDefinitionError> {
        ScriptGraphBuilder::from_toml_str(raw)?.build()
    }

    pub fn load(path: &Path) -> Result<Self, ScriptDefinitionError> {
        ScriptGraphBuilder::load(path)?.build()
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn node(&self, id: &str) -> Option<&DialogNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DialogNode> {
        self.nodes.values()
    }

    pub fn openers(&self) -> &BTreeMap<String, String> {
        &self.openers
    }

    /// Entry node for an opener preference; `start` when none matches.
    pub fn entry_for(&self, opener: Option<&str>) -> &str {
        opener
            .and_then(|key| self.openers.get(key.trim()))
            .map(String::as_str)
            .unwrap_or(&self.start)
    }

    /// Responses pointing at nodes that do not exist. They are harmless at
    /// runtime, where following one is a no-op.
    pub fn dangling_edges(&self) -> Vec<DanglingEdge> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.responses.iter().filter(move |response| !self.contains(&response.next)).map(
                    move |response| DanglingEdge {
                        from: node.id.clone(),
                        label: response.label.clone(),
                        next: response.next.clone(),
                    },
                )
            })
            .collect()
    }

    /// Nodes no opener entry can reach.
    pub fn unreachable_nodes(&self) -> Vec<String> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(&self.start);
        queue.extend(self.openers.values().map(String::as_str));

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(id) else { continue };
            if !seen.insert(id) {
                continue;
            }
            queue.extend(node.responses.iter().map(|response| response.next.as_str()));
        }

        self.nodes.keys().filter(|id| !seen.contains(id.as_str())).cloned().collect()
    }
}

#[derive(Clone, Debug)]
pub struct ScriptGraphBuilder {
    start: String,
    nodes: Vec<DialogNode>,
    openers: BTreeMap<String, String>,
}

impl ScriptGraphBuilder {
    pub fn new(start: impl Into<String>) -> Self {
        Self { start: start.into(), nodes: Vec::new(), openers: BTreeMap::new() }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ScriptDefinitionError> {
        let file: ScriptFile =
            toml::from_str(raw).map_err(|error| ScriptDefinitionError::Parse(error.to_string()))?;

        let mut builder = Self::new(file.start);
        builder.openers = file.openers;
        builder.nodes = file
            .nodes
            .into_iter()
            .map(|node| DialogNode::new(node.id, node.stage, node.text, node.responses))
            .collect();
        Ok(builder)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptDefinitionError> {
        let raw = fs::read_to_string(path).map_err(|error| ScriptDefinitionError::ReadFile {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn node(mut self, node: DialogNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn static_node(
        self,
        id: impl Into<String>,
        stage: impl Into<String>,
        text: impl Into<String>,
        responses: Vec<Response>,
    ) -> Self {
        self.node(DialogNode::new(id, stage, NodeText::Static(text.into()), responses))
    }

    pub fn computed_node<F>(
        self,
        id: impl Into<String>,
        stage: impl Into<String>,
        compute: F,
        responses: Vec<Response>,
    ) -> Self
    where
        F: Fn(&ResolvedContext) -> String + Send + Sync + 'static,
    {
        self.node(DialogNode::new(id, stage, NodeText::computed(compute), responses))
    }

    pub fn opener(mut self, key: impl Into<String>, node_id: impl Into<String>) -> Self {
        self.openers.insert(key.into(), node_id.into());
        self
    }

    pub fn build(self) -> Result<ScriptGraph, ScriptDefinitionError> {
        let mut nodes = BTreeMap::new();
        for node in self.nodes {
            if node.id.trim().is_empty() {
                return Err(ScriptDefinitionError::EmptyNodeId);
            }
            if nodes.contains_key(&node.id) {
                return Err(ScriptDefinitionError::DuplicateNode(node.id));
            }
            nodes.insert(node.id.clone(), node);
        }

        if !nodes.contains_key(&self.start) {
            return Err(ScriptDefinitionError::MissingStart(self.start));
        }
        if let Some((opener, node)) =
            self.openers.iter().find(|(_, node)| !nodes.contains_key(node.as_str()))
        {
            return Err(ScriptDefinitionError::UnknownOpenerTarget {
                opener: opener.clone(),
                node: node.clone(),
            });
        }

        Ok(ScriptGraph { start: self.start, nodes, openers: self.openers })
    }
}

#[derive(Debug, Deserialize)]
struct ScriptFile {
    start: String,
    #[serde(default)]
    openers: BTreeMap<String, String>,
    #[serde(default)]
    nodes: Vec<NodeFile>,
}

#[derive(Debug, Deserialize)]
struct NodeFile {
    id: String,
    #[serde(default)]
    stage: String,
    text: String,
    #[serde(default)]
    responses: Vec<Response>,
}
