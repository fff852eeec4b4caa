//! Untyped settings tree parsed from the product's XML settings files.
//!
//! Leaves are element text, branches are elements with child elements and
//! repeated sibling elements collapse into a [`Node::List`] addressed by
//! index segments (`"0"`, `"1"`, ...). Attributes and comments are dropped.

use anyhow::{Result, anyhow, bail};
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(String),
    Branch(IndexMap<String, Node>),
    List(Vec<Node>),
}

impl Node {
    pub fn child(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Branch(map) => map.get(key),
            Node::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            Node::Leaf(_) => None,
        }
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut Node> {
        match self {
            Node::Branch(map) => map.get_mut(key),
            Node::List(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            Node::Leaf(_) => None,
        }
    }

    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        let mut current = self;
        for segment in path {
            current = current.child(segment.as_ref())?;
        }
        Some(current)
    }

    pub fn get_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Node> {
        let mut current = self;
        for segment in path {
            current = current.child_mut(segment.as_ref())?;
        }
        Some(current)
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn leaf<S: AsRef<str>>(&self, path: &[S]) -> Option<&str> {
        self.get(path).and_then(Node::as_leaf)
    }

    /// Overwrites an existing leaf. Returns `false` when the path does not
    /// end at a leaf; the tree shape never changes.
    pub fn set_leaf<S: AsRef<str>>(&mut self, path: &[S], value: impl Into<String>) -> bool {
        match self.get_mut(path) {
            Some(Node::Leaf(existing)) => {
                *existing = value.into();
                true
            }
            _ => false,
        }
    }

    /// Key paths of every leaf, depth-first in document order.
    pub fn leaf_paths(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        let mut scope = Vec::new();
        collect_leaf_paths(self, &mut scope, &mut out);
        out
    }
}

fn collect_leaf_paths(node: &Node, scope: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    match node {
        Node::Leaf(_) => out.push(scope.clone()),
        Node::Branch(map) => {
            for (key, child) in map {
                scope.push(key.clone());
                collect_leaf_paths(child, scope, out);
                scope.pop();
            }
        }
        Node::List(items) => {
            for (index, child) in items.iter().enumerate() {
                scope.push(index.to_string());
                collect_leaf_paths(child, scope, out);
                scope.pop();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsTree {
    pub root: Node,
}

impl SettingsTree {
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut top: Vec<(String, Node)> = Vec::new();
        let mut stack: Vec<OpenElement> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(OpenElement {
                        name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
                        children: Vec::new(),
                        text: String::new(),
                    });
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let node = Node::Leaf(String::new());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push((name, node)),
                        None => top.push((name, node)),
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(open) = stack.last_mut() {
                        let unescaped = t
                            .unescape()
                            .map_err(|err| anyhow!("invalid text at byte {}: {err}", reader.buffer_position()))?;
                        open.text.push_str(&unescaped);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(open) = stack.last_mut() {
                        open.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::End(_)) => {
                    let Some(open) = stack.pop() else {
                        bail!("unbalanced end tag at byte {}", reader.buffer_position());
                    };
                    let (name, node) = open.close();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push((name, node)),
                        None => top.push((name, node)),
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => bail!("at byte {}: {err}", reader.buffer_position()),
            }
        }

        if !stack.is_empty() {
            bail!("unexpected end of document inside <{}>", stack[stack.len() - 1].name);
        }
        if top.len() != 1 {
            bail!("expected exactly one root element, found {}", top.len());
        }

        Ok(Self {
            root: Node::Branch(group_children(top)),
        })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        if let Node::Branch(map) = &self.root {
            for (name, node) in map {
                write_node(&mut out, name, node, 0);
            }
        }
        out
    }

    pub fn settings(&self) -> Option<&Node> {
        self.root_element()?.child("settings")
    }

    pub fn settings_mut(&mut self) -> Option<&mut Node> {
        match &mut self.root {
            Node::Branch(map) => map.values_mut().next()?.child_mut("settings"),
            _ => None,
        }
    }

    fn root_element(&self) -> Option<&Node> {
        match &self.root {
            Node::Branch(map) => map.values().next(),
            _ => None,
        }
    }
}

struct OpenElement {
    name: String,
    children: Vec<(String, Node)>,
    text: String,
}

impl OpenElement {
    fn close(self) -> (String, Node) {
        if self.children.is_empty() {
            (self.name, Node::Leaf(self.text.trim().to_string()))
        } else {
            (self.name, Node::Branch(group_children(self.children)))
        }
    }
}

fn group_children(children: Vec<(String, Node)>) -> IndexMap<String, Node> {
    let mut map: IndexMap<String, Node> = IndexMap::new();
    for (key, node) in children {
        match map.get_mut(&key) {
            None => {
                map.insert(key, node);
            }
            Some(Node::List(items)) => items.push(node),
            Some(existing) => {
                let first = std::mem::replace(existing, Node::List(Vec::new()));
                *existing = Node::List(vec![first, node]);
            }
        }
    }
    map
}

fn write_node(out: &mut String, name: &str, node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Leaf(value) if value.is_empty() => {
            out.push_str(&format!("{indent}<{name}/>\n"));
        }
        Node::Leaf(value) => {
            out.push_str(&format!("{indent}<{name}>{}</{name}>\n", escape(value.as_str())));
        }
        Node::Branch(map) if map.is_empty() => {
            out.push_str(&format!("{indent}<{name}/>\n"));
        }
        Node::Branch(map) => {
            out.push_str(&format!("{indent}<{name}>\n"));
            for (key, child) in map {
                write_node(out, key, child, depth + 1);
            }
            out.push_str(&format!("{indent}</{name}>\n"));
        }
        Node::List(items) => {
            for item in items {
                write_node(out, name, item, depth);
            }
        }
    }
}

/// Dotted paths that exist in one tree but not in the other, or whose
/// node kind differs. Empty when both trees share the same key set at
/// every nesting level.
pub fn keyset_mismatches(left: &Node, right: &Node) -> Vec<String> {
    let mut out = Vec::new();
    let mut scope = Vec::new();
    diff_keys(left, right, &mut scope, &mut out);
    out
}

fn diff_keys(left: &Node, right: &Node, scope: &mut Vec<String>, out: &mut Vec<String>) {
    match (left, right) {
        (Node::Leaf(_), Node::Leaf(_)) => {}
        (Node::Branch(a), Node::Branch(b)) => {
            for (key, child) in a {
                scope.push(key.clone());
                match b.get(key) {
                    Some(other) => diff_keys(child, other, scope, out),
                    None => out.push(scope.join(".")),
                }
                scope.pop();
            }
            for key in b.keys() {
                if !a.contains_key(key) {
                    scope.push(key.clone());
                    out.push(scope.join("."));
                    scope.pop();
                }
            }
        }
        (Node::List(a), Node::List(b)) => {
            for index in 0..a.len().max(b.len()) {
                scope.push(index.to_string());
                match (a.get(index), b.get(index)) {
                    (Some(x), Some(y)) => diff_keys(x, y, scope, out),
                    _ => out.push(scope.join(".")),
                }
                scope.pop();
            }
        }
        _ => out.push(scope.join(".")),
    }
}
