//! Schema snapshot types and existence predicates

use crate::schema::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

/// A property's declared type and constraints. Used for rendering the
/// schema into prompts, never validated against data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type", default)]
    pub prop_type: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
}

/// One node label known to the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaNode {
    pub label: String,
    pub count: i64,
    pub properties: BTreeMap<String, PropertySpec>,
}

/// One directed edge-type triple (from)-[:rel_type]->(to) known to exist.
/// The same type may appear in several triples connecting different labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRelationship {
    pub from: String,
    pub rel_type: String,
    pub to: String,
    pub properties: BTreeMap<String, PropertySpec>,
}

impl SchemaNode {
    pub fn new(label: impl Into<String>, count: i64) -> Self {
        Self {
            label: label.into(),
            count,
            properties: BTreeMap::new(),
        }
    }
}

impl SchemaRelationship {
    pub fn new(from: impl Into<String>, rel_type: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            rel_type: rel_type.into(),
            to: to.into(),
            properties: BTreeMap::new(),
        }
    }
}

/// Immutable snapshot of the graph schema, taken at load time
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    nodes: Vec<SchemaNode>,
    relationships: Vec<SchemaRelationship>,
}

impl SchemaSnapshot {
    pub fn new(nodes: Vec<SchemaNode>, relationships: Vec<SchemaRelationship>) -> Self {
        Self { nodes, relationships }
    }

    /// Build a snapshot from `CALL apoc.meta.schema()` result rows.
    ///
    /// The introspection reports each relationship twice, once per
    /// endpoint; only the `"out"` direction is kept so every triple
    /// appears exactly once.
    pub fn from_introspection(rows: &[Value]) -> SchemaResult<Self> {
        let first = rows.first().ok_or(SchemaError::Load)?;
        let entries = first
            .get("value")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::Parse("expected a 'value' object column".to_string()))?;

        let mut nodes = Vec::new();
        let mut relationships = Vec::new();

        for (label, details) in entries {
            if details.get("type").and_then(Value::as_str) != Some("node") {
                continue;
            }

            nodes.push(SchemaNode {
                label: label.clone(),
                count: details.get("count").and_then(Value::as_i64).unwrap_or(0),
                properties: parse_properties(details.get("properties")),
            });

            let rels = details
                .get("relationships")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            for (rel_type, rel_details) in &rels {
                if rel_details.get("direction").and_then(Value::as_str) != Some("out") {
                    continue;
                }
                let targets = rel_details
                    .get("labels")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for to in targets.iter().filter_map(Value::as_str) {
                    relationships.push(SchemaRelationship {
                        from: label.clone(),
                        rel_type: rel_type.clone(),
                        to: to.to_string(),
                        properties: parse_properties(rel_details.get("properties")),
                    });
                }
            }
        }

        if nodes.is_empty() {
            return Err(SchemaError::Load);
        }

        Ok(Self { nodes, relationships })
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[SchemaRelationship] {
        &self.relationships
    }

    /// Does the node label exist? Exact match, ignoring surrounding whitespace.
    pub fn label_exists(&self, label: &str) -> bool {
        let label = label.trim();
        self.nodes.iter().any(|node| node.label == label)
    }

    /// Does the relationship type exist at all, regardless of endpoints?
    pub fn relationship_type_exists(&self, rel_type: &str) -> bool {
        self.relationships.iter().any(|rel| rel.rel_type == rel_type)
    }

    /// Does the directed triple exist? An empty label on either endpoint
    /// means "any".
    pub fn triple_exists(&self, from: &str, rel_type: &str, to: &str) -> bool {
        if from.is_empty() {
            self.relationships
                .iter()
                .any(|rel| rel.rel_type == rel_type && rel.to == to)
        } else if to.is_empty() {
            self.relationships
                .iter()
                .any(|rel| rel.rel_type == rel_type && rel.from == from)
        } else {
            self.relationships
                .iter()
                .any(|rel| rel.rel_type == rel_type && rel.from == from && rel.to == to)
        }
    }

    /// Render the schema as a string to stuff into a prompt
    pub fn prompt_string(&self) -> String {
        let properties = |props: &BTreeMap<String, PropertySpec>| -> String {
            let body = props
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.prop_type))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", body)
        };

        let mut out = String::from("Nodes:");
        for node in &self.nodes {
            let _ = write!(out, "\n- (:{} {})", node.label, properties(&node.properties));
        }

        out.push_str("\n\nRelationships:");
        for rel in &self.relationships {
            let _ = write!(
                out,
                "\n- (:{})-[:{} {}]->(:{})",
                rel.from,
                rel.rel_type,
                properties(&rel.properties),
                rel.to
            );
        }

        out
    }
}

fn parse_properties(value: Option<&Value>) -> BTreeMap<String, PropertySpec> {
    value
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, spec)| {
                    let spec: PropertySpec =
                        serde_json::from_value(spec.clone()).unwrap_or_default();
                    (name.clone(), spec)
                })
                .collect()
        })
        .unwrap_or_default()
}
