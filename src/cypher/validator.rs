//! Static validation of Cypher statements against the schema snapshot
//!
//! The validator never rejects a query outright: it returns the (possibly
//! rewritten) statement together with a list of human-readable findings that
//! the repair chain interpolates into its follow-up prompt. The one mutation
//! it performs itself is the direction flip — a relationship that only
//! exists in the opposite direction is rewritten in place rather than
//! reported, since that correction is always safe.

use crate::cypher::extract::{
    extract_labels, extract_relationship_types, node_matches, relationship_matches,
};
use crate::graph::GraphService;
use crate::schema::{SchemaResult, SchemaSnapshot};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Outcome of one validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// The statement, with any safe direction corrections applied
    pub query: String,
    /// Findings in discovery order: label errors first, then relationship
    /// errors, each in left-to-right scan order
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationshipDecision {
    Found,
    ReverseDirection,
    NotFound,
}

/// Schema-aware Cypher validator.
///
/// Holds a shared snapshot of the database schema; `reload` swaps the
/// snapshot wholesale, so concurrent readers always see a consistent view.
pub struct CypherValidator {
    graph: Option<Arc<dyn GraphService>>,
    snapshot: RwLock<Arc<SchemaSnapshot>>,
}

impl CypherValidator {
    /// Build a validator over a fixed snapshot, with no backing database
    pub fn from_snapshot(snapshot: SchemaSnapshot) -> Self {
        Self {
            graph: None,
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Load the schema from the database and build a validator over it
    pub async fn load(graph: Arc<dyn GraphService>) -> SchemaResult<Self> {
        let rows = graph.introspect_schema().await?;
        let snapshot = SchemaSnapshot::from_introspection(&rows)?;
        info!(
            "Loaded schema: {} labels, {} relationship triples",
            snapshot.nodes().len(),
            snapshot.relationships().len()
        );

        Ok(Self {
            graph: Some(graph),
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Reload the schema from the database, replacing the snapshot atomically
    pub async fn reload(&self) -> SchemaResult<()> {
        let Some(graph) = &self.graph else {
            return Ok(());
        };

        let rows = graph.introspect_schema().await?;
        let snapshot = SchemaSnapshot::from_introspection(&rows)?;
        info!(
            "Reloaded schema: {} labels, {} relationship triples",
            snapshot.nodes().len(),
            snapshot.relationships().len()
        );

        let mut guard = self.snapshot.write().expect("schema lock poisoned");
        *guard = Arc::new(snapshot);
        Ok(())
    }

    /// The current schema snapshot
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.snapshot.read().expect("schema lock poisoned").clone()
    }

    /// The schema rendered for inclusion in a prompt
    pub fn schema_string(&self) -> String {
        self.snapshot().prompt_string()
    }

    /// Validate a statement, returning the corrected text and all findings.
    ///
    /// Deterministic: the same snapshot and statement always produce the
    /// same result, and a statement that validates cleanly is returned
    /// byte-for-byte unchanged.
    pub fn validate(&self, query: &str) -> Validation {
        let snapshot = self.snapshot();
        let mut errors = Vec::new();

        // Verify labels
        for node in node_matches(query) {
            for label in extract_labels(&node) {
                // Labels containing a `.` are property-path fragments
                // mis-captured by the lexical scan, not real labels
                if !label.contains('.') && !label.is_empty() && !snapshot.label_exists(&label) {
                    errors.push(no_label_error(&label));
                }
            }
        }

        // Verify relationship triples, flipping safe direction mistakes
        let mut corrected = query.to_string();
        for matched in relationship_matches(query) {
            let left_labels = extract_labels(&matched.left);
            let right_labels = extract_labels(&matched.right);
            let types = extract_relationship_types(&matched.relationship);

            if !types.iter().any(|t| snapshot.relationship_type_exists(t)) {
                // No schema data to check the direction against
                errors.push(no_relationship_type_error(&types));
                continue;
            }

            // Absence of both markers is treated as outgoing
            if matched.outgoing || !matched.incoming {
                match any_relationship_exists(&snapshot, &left_labels, &types, &right_labels) {
                    RelationshipDecision::Found => {}
                    RelationshipDecision::ReverseDirection => {
                        let replacement =
                            format!("({})<-[{}]-({})", matched.left, matched.relationship, matched.right);
                        debug!("Flipping relationship direction: {} -> {}", matched.full, replacement);
                        corrected = corrected.replacen(&matched.full, &replacement, 1);
                    }
                    RelationshipDecision::NotFound => {
                        errors.push(no_relationship_error(&left_labels, &types, &right_labels));
                    }
                }
            } else {
                match any_relationship_exists(&snapshot, &right_labels, &types, &left_labels) {
                    RelationshipDecision::Found => {}
                    RelationshipDecision::ReverseDirection => {
                        let replacement =
                            format!("({})-[{}]->({})", matched.left, matched.relationship, matched.right);
                        debug!("Flipping relationship direction: {} -> {}", matched.full, replacement);
                        corrected = corrected.replacen(&matched.full, &replacement, 1);
                    }
                    RelationshipDecision::NotFound => {
                        errors.push(no_relationship_error(&right_labels, &types, &left_labels));
                    }
                }
            }
        }

        Validation {
            query: corrected,
            errors,
        }
    }
}

/// Existential check over every (from label) x (type) x (to label)
/// combination; a hit in the reverse direction is reported so the caller
/// can rewrite the pattern.
fn any_relationship_exists(
    snapshot: &SchemaSnapshot,
    from: &[String],
    types: &[String],
    to: &[String],
) -> RelationshipDecision {
    for f in from {
        for t in to {
            for r in types {
                if snapshot.triple_exists(f, r, t) {
                    return RelationshipDecision::Found;
                } else if snapshot.triple_exists(t, r, f) {
                    return RelationshipDecision::ReverseDirection;
                }
            }
        }
    }
    RelationshipDecision::NotFound
}

fn no_label_error(label: &str) -> String {
    format!("Node label not found: {}", label)
}

fn no_relationship_type_error(types: &[String]) -> String {
    format!("Relationship type(s) not found: {}", types.join("|"))
}

fn no_relationship_error(from: &[String], types: &[String], to: &[String]) -> String {
    format!(
        "Relationship combination not found: (:{})-[:{}]->(:{})",
        from.join(":"),
        types.join("|"),
        to.join(":")
    )
}
