//! Reference graph model that gives replicated bodies a meaning.
//!
//! Node and link presence live in two LWW element sets. Attributes live in one
//! [`Vertex`] (or [`Edge`]) per id, created the first time any mutation names
//! the id and shared by every later mutation. A `SET` that arrives before the
//! matching `NODE` therefore lands in the same map the node will use, and
//! delivery order never forks a node's attributes.
//!
//! Dropping a node does not cascade into its links; links whose endpoints are
//! gone are filtered out when the model is read.

mod command;

pub use command::{Command, CommandError, Mutation};

use dashmap::DashMap;
use tandem_crdt::{Crdt, Edge, LwwElementSet, Timestamp, Value, Vertex};

const FROM: &str = "from";
const TO: &str = "to";

/// The result of executing one command against a [`Model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The mutation was recorded.
    Applied,
    /// The mutation lost to a newer write and changed nothing.
    Stale,
    /// Rendered output of a query.
    Output(String),
    /// A query named an object that is not visible.
    NotFound(String),
}

/// A replicated property graph.
#[derive(Debug, Default)]
pub struct Model {
    nodes: LwwElementSet<String>,
    links: LwwElementSet<String>,
    vertices: DashMap<String, Vertex>,
    edges: DashMap<String, Edge>,
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a stamped mutation. Queries are answered as usual.
    pub fn apply(&self, mutation: &Mutation) -> Outcome {
        self.execute(&mutation.command, mutation.at)
    }

    /// Executes `command` at `at`. Queries ignore the timestamp.
    pub fn execute(&self, command: &Command, at: Timestamp) -> Outcome {
        let accepted = match command {
            Command::Node { id } => {
                self.vertex(id);
                self.nodes.add(id.clone(), at)
            }
            Command::Drop { id } => self.nodes.remove(id.clone(), at),
            Command::Set { id, key, value } => {
                self.vertex(id)
                    .add(key.clone(), Value::from(value.as_str()), at)
            }
            Command::Unset { id, key } => self.vertex(id).remove(key.clone(), at),
            Command::Link { id, from, to } => {
                let edge = self.edge(id);
                // Non-short-circuiting so all three writes are attempted.
                self.links.add(id.clone(), at)
                    & edge.add(FROM.to_owned(), Value::from(from.as_str()), at)
                    & edge.add(TO.to_owned(), Value::from(to.as_str()), at)
            }
            Command::Unlink { id } => self.links.remove(id.clone(), at),
            Command::Read { id } => return self.read(id),
            Command::Objects => return Outcome::Output(self.render()),
        };
        if accepted {
            Outcome::Applied
        } else {
            Outcome::Stale
        }
    }

    fn vertex(&self, id: &str) -> Vertex {
        self.vertices.entry(id.to_owned()).or_default().clone()
    }

    fn edge(&self, id: &str) -> Edge {
        self.edges.entry(id.to_owned()).or_default().clone()
    }

    /// The attributes of a present node.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<Vertex> {
        if !self.nodes.contains(&id.to_owned()) {
            return None;
        }
        self.vertices.get(id).map(|vertex| vertex.clone())
    }

    /// The endpoints of a visible link.
    ///
    /// A link is visible while it is present and both endpoints are present
    /// nodes.
    #[must_use]
    pub fn link(&self, id: &str) -> Option<(String, String)> {
        if !self.links.contains(&id.to_owned()) {
            return None;
        }
        let edge = self.edges.get(id)?.clone();
        let endpoint = |key: &str| {
            edge.get(&key.to_owned())
                .and_then(|value| value.as_plain().map(str::to_owned))
        };
        let (from, to) = (endpoint(FROM)?, endpoint(TO)?);
        let nodes_present = self.nodes.contains(&from) && self.nodes.contains(&to);
        nodes_present.then_some((from, to))
    }

    /// Ids of present nodes, sorted.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.iter().collect();
        ids.sort();
        ids
    }

    /// Ids of visible links, sorted.
    #[must_use]
    pub fn link_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .links
            .iter()
            .filter(|id| self.link(id).is_some())
            .collect();
        ids.sort();
        ids
    }

    fn render_node(&self, id: &str) -> Option<String> {
        let vertex = self.node(id)?;
        let attributes = Value::Map(vertex.as_map().clone());
        Some(format!("node {id} {attributes}"))
    }

    fn render_link(&self, id: &str) -> Option<String> {
        let (from, to) = self.link(id)?;
        Some(format!("link {id} {from} -> {to}"))
    }

    fn read(&self, id: &str) -> Outcome {
        if let Some(line) = self.render_node(id) {
            let mut lines = vec![line];
            lines.extend(self.link_ids().into_iter().filter_map(|link| {
                let (from, to) = self.link(&link)?;
                (from == id || to == id).then(|| self.render_link(&link))?
            }));
            return Outcome::Output(lines.join("\n"));
        }
        match self.render_link(id) {
            Some(line) => Outcome::Output(line),
            None => Outcome::NotFound(id.to_owned()),
        }
    }

    /// Every visible object, one per line: nodes first, then links, each
    /// sorted by id. Two converged replicas render identically.
    #[must_use]
    pub fn render(&self) -> String {
        let nodes = self
            .node_ids()
            .into_iter()
            .filter_map(|id| self.render_node(&id));
        let links = self
            .link_ids()
            .into_iter()
            .filter_map(|id| self.render_link(&id));
        nodes.chain(links).collect::<Vec<_>>().join("\n")
    }

    /// Folds another replica's full state into this one.
    pub fn merge(&self, other: &Model) {
        if std::ptr::eq(self, other) {
            return;
        }
        self.nodes.merge(&other.nodes);
        self.links.merge(&other.links);
        let vertices: Vec<(String, Vertex)> = other
            .vertices
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        for (id, theirs) in vertices {
            self.vertex(&id).merge(&theirs);
        }
        let edges: Vec<(String, Edge)> = other
            .edges
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        for (id, theirs) in edges {
            self.edge(&id).merge(&theirs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(model: &Model, at: Timestamp, line: &str) -> Outcome {
        model.execute(&line.parse().unwrap(), at)
    }

    #[test]
    fn test_node_lifecycle() {
        let model = Model::new();
        assert_eq!(run(&model, 1, "NODE n1"), Outcome::Applied);
        assert_eq!(run(&model, 2, "SET n1 title Hello there"), Outcome::Applied);
        assert_eq!(
            run(&model, 3, "READ n1"),
            Outcome::Output("node n1 {title: Hello there}".into())
        );

        assert_eq!(run(&model, 4, "DROP n1"), Outcome::Applied);
        assert_eq!(
            run(&model, 5, "READ n1"),
            Outcome::NotFound("n1".into())
        );
    }

    #[test]
    fn test_stale_attribute_write() {
        let model = Model::new();
        run(&model, 1, "NODE n1");
        run(&model, 10, "SET n1 color red");
        assert_eq!(run(&model, 5, "SET n1 color blue"), Outcome::Stale);
        let vertex = model.node("n1").unwrap();
        assert_eq!(vertex.get(&"color".to_string()), Some(Value::from("red")));
    }

    #[test]
    fn test_set_before_node_is_kept() {
        let model = Model::new();
        run(&model, 2, "SET n1 color red");
        assert!(model.node("n1").is_none());
        run(&model, 1, "NODE n1");
        assert_eq!(
            model.render(),
            "node n1 {color: red}"
        );
    }

    #[test]
    fn test_links_hidden_when_endpoint_dropped() {
        let model = Model::new();
        run(&model, 1, "NODE a");
        run(&model, 1, "NODE b");
        run(&model, 2, "LINK ab a b");
        assert_eq!(model.link("ab"), Some(("a".into(), "b".into())));
        assert_eq!(
            run(&model, 3, "READ a"),
            Outcome::Output("node a {}\nlink ab a -> b".into())
        );

        run(&model, 4, "DROP b");
        assert_eq!(model.link("ab"), None);
        assert!(model.link_ids().is_empty());

        // Reviving the node brings the link back.
        run(&model, 5, "NODE b");
        assert_eq!(model.link_ids(), vec!["ab".to_string()]);
    }

    #[test]
    fn test_unlink() {
        let model = Model::new();
        run(&model, 1, "NODE a");
        run(&model, 1, "NODE b");
        run(&model, 2, "LINK ab a b");
        assert_eq!(
            run(&model, 3, "READ ab"),
            Outcome::Output("link ab a -> b".into())
        );
        assert_eq!(run(&model, 4, "UNLINK ab"), Outcome::Applied);
        assert_eq!(run(&model, 5, "READ ab"), Outcome::NotFound("ab".into()));
    }

    #[test]
    fn test_objects_rendering() {
        let model = Model::new();
        run(&model, 1, "NODE b");
        run(&model, 1, "NODE a");
        run(&model, 2, "SET a name Ada");
        run(&model, 3, "LINK k a b");
        run(&model, 4, "UNSET a name");
        assert_eq!(
            run(&model, 5, "OBJECTS"),
            Outcome::Output("node a {}\nnode b {}\nlink k a -> b".into())
        );
    }

    #[test]
    fn test_merge_converges() {
        let left = Model::new();
        let right = Model::new();
        run(&left, 1, "NODE a");
        run(&left, 2, "SET a color red");
        run(&right, 1, "NODE b");
        run(&right, 3, "SET a color blue");
        run(&right, 4, "LINK ab a b");

        left.merge(&right);
        right.merge(&left);
        left.merge(&left);

        assert_eq!(left.render(), right.render());
        assert_eq!(
            left.render(),
            "node a {color: blue}\nnode b {}\nlink ab a -> b"
        );
    }
}
