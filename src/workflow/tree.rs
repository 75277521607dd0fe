//! Positioned structural tree.
//!
//! The typed summary loses source positions, so structural queries that
//! report line numbers walk this tree instead. It is built from the marked
//! event stream of `yaml-rust2` and keeps only what the queries need: the
//! shape of the document and the 1-based line each node starts on.

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, ScanError};

/// A YAML node with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar { value: String, line: usize },
    Sequence { items: Vec<Node>, line: usize },
    Mapping { entries: Vec<(Node, Node)>, line: usize },
    Alias { line: usize },
}

impl Node {
    /// Parse the first document of `content`. `Ok(None)` for an empty stream.
    pub fn parse(content: &str) -> Result<Option<Node>, ScanError> {
        let mut builder = TreeBuilder::default();
        let mut parser = Parser::new(content.chars());
        parser.load(&mut builder, false)?;
        Ok(builder.root)
    }

    /// 1-based line the node starts on.
    pub fn line(&self) -> usize {
        match self {
            Node::Scalar { line, .. }
            | Node::Sequence { line, .. }
            | Node::Mapping { line, .. }
            | Node::Alias { line } => *line,
        }
    }

    /// The scalar text, if this is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Entries of a mapping; empty for anything else.
    pub fn entries(&self) -> &[(Node, Node)] {
        match self {
            Node::Mapping { entries, .. } => entries,
            _ => &[],
        }
    }

    /// Items of a sequence; empty for anything else.
    pub fn items(&self) -> &[Node] {
        match self {
            Node::Sequence { items, .. } => items,
            _ => &[],
        }
    }

    /// The key/value pair of a mapping whose key is the scalar `key`.
    pub fn entry(&self, key: &str) -> Option<(&Node, &Node)> {
        self.entries()
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(k, v)| (k, v))
    }

    /// Value of a mapping entry.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|(_, v)| v)
    }

    /// Every `uses: <scalar>` pair at any depth, in document order.
    pub fn find_action_references(&self) -> Vec<(String, usize)> {
        let mut found = Vec::new();
        collect_uses(self, &mut found);
        found
    }
}

fn collect_uses(node: &Node, found: &mut Vec<(String, usize)>) {
    match node {
        Node::Mapping { entries, .. } => {
            for (key, value) in entries {
                match (key.as_str(), value) {
                    (Some("uses"), Node::Scalar { value, line }) => {
                        found.push((value.clone(), *line));
                    }
                    _ => collect_uses(value, found),
                }
            }
        }
        Node::Sequence { items, .. } => {
            for item in items {
                collect_uses(item, found);
            }
        }
        Node::Scalar { .. } | Node::Alias { .. } => {}
    }
}

enum Frame {
    Sequence {
        items: Vec<Node>,
        line: usize,
    },
    Mapping {
        entries: Vec<(Node, Node)>,
        key: Option<Node>,
        line: usize,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<Node>,
}

impl TreeBuilder {
    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                Some(k) => entries.push((k, node)),
                None => *key = Some(node),
            },
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        let line = mark.line();
        match ev {
            Event::Scalar(value, ..) => self.push(Node::Scalar { value, line }),
            Event::Alias(..) => self.push(Node::Alias { line }),
            Event::SequenceStart(..) => self.stack.push(Frame::Sequence {
                items: Vec::new(),
                line,
            }),
            Event::MappingStart(..) => self.stack.push(Frame::Mapping {
                entries: Vec::new(),
                key: None,
                line,
            }),
            Event::SequenceEnd | Event::MappingEnd => {
                let node = match self.stack.pop() {
                    Some(Frame::Sequence { items, line }) => Node::Sequence { items, line },
                    Some(Frame::Mapping { entries, line, .. }) => Node::Mapping { entries, line },
                    None => return,
                };
                self.push(node);
            }
            _ => {}
        }
    }
}
