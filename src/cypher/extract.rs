//! Lexical extraction of node and relationship patterns
//!
//! This is a pragmatic textual scan over the supported Cypher subset, not a
//! grammar-complete parser. Known limitations: string literals containing
//! parentheses can confuse the scans, deeply nested subqueries are not
//! understood, and chained patterns sharing a node (`(a)-[]->(b)-[]->(c)`)
//! only yield the first relationship because matches do not overlap. These
//! are acceptable for validating LLM-generated read queries.

use regex::Regex;
use std::sync::LazyLock;

/// Any `(...)` group containing a `:`. Aggregate calls like `COUNT(u)` have
/// no `:` inside the parentheses and are excluded by construction.
pub static NODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]*?:[^()]*?)\)").expect("node pattern is valid"));

/// A `(left)<-[rel]->(right)` occurrence: left node text, optional `<`
/// marker, relationship bracket contents, optional `>` marker, right node
/// text. Either node may be anonymous or a bare variable from an earlier
/// clause.
pub static RELATIONSHIP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([^()]*?:?[^()]*?)\)(<)?-\[([^\]]+?)\]-(>)?\(([^()]*?:?[^()]*?)\)")
        .expect("relationship pattern is valid")
});

/// One relationship occurrence found in a query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// The full matched text, used for in-place rewriting
    pub full: String,
    pub left: String,
    pub relationship: String,
    pub right: String,
    pub incoming: bool,
    pub outgoing: bool,
}

/// Find every relationship pattern in the query
pub fn relationship_matches(query: &str) -> Vec<PatternMatch> {
    RELATIONSHIP_PATTERN
        .captures_iter(query)
        .map(|caps| PatternMatch {
            full: caps[0].to_string(),
            left: caps[1].to_string(),
            relationship: caps[3].to_string(),
            right: caps[5].to_string(),
            incoming: caps.get(2).is_some(),
            outgoing: caps.get(4).is_some(),
        })
        .collect()
}

/// Find the inner text of every labeled node pattern in the query
pub fn node_matches(query: &str) -> Vec<String> {
    NODE_PATTERN
        .captures_iter(query)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Extract labels from a node pattern.
///
/// `a:Person:Student` yields `["Person", "Student"]`. A bare variable or an
/// anonymous node yields `[""]`, meaning "unconstrained" — callers skip
/// empty labels when checking existence.
pub fn extract_labels(pattern: &str) -> Vec<String> {
    if !pattern.contains(':') {
        return vec![String::new()];
    }

    // Strip brackets
    let pattern = pattern.strip_suffix(')').unwrap_or(pattern);
    let pattern = pattern.strip_prefix('(').unwrap_or(pattern);

    // Strip property map
    let pattern = pattern.split('{').next().unwrap_or(pattern);

    // The only `:` may have been inside the property map
    if !pattern.contains(':') {
        return vec![String::new()];
    }

    // Drop the variable (or the empty string before a leading `:`)
    pattern
        .split(':')
        .skip(1)
        .map(|label| label.trim().to_string())
        .collect()
}

/// Extract relationship types from a relationship pattern.
///
/// `[r:TYPE1|TYPE2*2..]` yields `["TYPE1", "TYPE2"]`: the variable,
/// property map and variable-length-path suffix are stripped, the rest is
/// split on `|`. Hop-count semantics of `*..` paths are ignored; only the
/// base types are validated.
pub fn extract_relationship_types(pattern: &str) -> Vec<String> {
    let mut cleaned = pattern;

    // Strip brackets
    if let Some(ix) = cleaned.find('[') {
        cleaned = &cleaned[ix + 1..];
    }
    if let Some(ix) = cleaned.find(']') {
        cleaned = &cleaned[..ix];
    }

    // Strip properties
    if let Some(ix) = cleaned.find('{') {
        cleaned = &cleaned[..ix];
    }

    // Strip variable
    if let Some(ix) = cleaned.rfind(':') {
        cleaned = &cleaned[ix + 1..];
    }

    // Strip variable length path
    if let Some(ix) = cleaned.find('*') {
        cleaned = &cleaned[..ix];
    }

    cleaned.split('|').map(|t| t.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_a_single_label() {
        assert_eq!(extract_labels("(a:Person)"), vec!["Person"]);
    }

    #[test]
    fn identifies_multiple_labels() {
        assert_eq!(extract_labels("(a:Person:Student)"), vec!["Person", "Student"]);
    }

    #[test]
    fn bare_variables_and_anonymous_nodes_are_unconstrained() {
        assert_eq!(extract_labels("a"), vec![""]);
        assert_eq!(extract_labels(""), vec![""]);
        assert_eq!(extract_labels("a {name: 'X'}"), vec![""]);
    }

    #[test]
    fn labels_survive_property_maps() {
        assert_eq!(extract_labels("m:Movie {title: 'The Matrix'}"), vec!["Movie"]);
    }

    #[test]
    fn identifies_a_single_relationship_type() {
        assert_eq!(extract_relationship_types("[:FRIEND_OF]"), vec!["FRIEND_OF"]);
    }

    #[test]
    fn identifies_multiple_relationship_types() {
        assert_eq!(
            extract_relationship_types("-[:FRIEND_OF|ENEMY_OF]->"),
            vec!["FRIEND_OF", "ENEMY_OF"]
        );
    }

    #[test]
    fn strips_variable_length_path_suffix() {
        assert_eq!(
            extract_relationship_types("[:FRIEND_OF|ENEMY_OF*2..]"),
            vec!["FRIEND_OF", "ENEMY_OF"]
        );
    }

    #[test]
    fn ignores_the_relationship_variable() {
        assert_eq!(
            extract_relationship_types("[r:FRIEND_OF|ENEMY_OF*2..]"),
            vec!["FRIEND_OF", "ENEMY_OF"]
        );
    }

    #[test]
    fn strips_relationship_property_maps() {
        assert_eq!(
            extract_relationship_types("[r:RATED {rating: 5}]"),
            vec!["RATED"]
        );
    }

    #[test]
    fn aggregate_calls_are_not_node_patterns() {
        let nodes = node_matches("RETURN m.title, COUNT(u) AS c, AVG(r.rating) AS avg");
        assert!(nodes.is_empty());
    }

    #[test]
    fn finds_relationships_with_anonymous_endpoints() {
        let matches = relationship_matches("MATCH (m:Movie)<-[r:RATED]-() RETURN m");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].left, "m:Movie");
        assert_eq!(matches[0].relationship, "r:RATED");
        assert_eq!(matches[0].right, "");
        assert!(matches[0].incoming);
        assert!(!matches[0].outgoing);
    }

    #[test]
    fn finds_relationships_across_multiple_clauses() {
        let query = "MATCH (m:Movie)<-[:ACTED_IN]-(a:Actor) \
                     WITH m, COUNT(a) AS actorCount WHERE actorCount > 3 \
                     MATCH (m)-[:RATED]->(u:User) RETURN m.title";
        let matches = relationship_matches(query);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].left, "m:Movie");
        assert!(matches[0].incoming);
        assert_eq!(matches[1].left, "m");
        assert_eq!(matches[1].right, "u:User");
        assert!(matches[1].outgoing);
    }
}
