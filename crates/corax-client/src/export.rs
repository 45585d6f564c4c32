//! Export helpers: render search results as Graphviz DOT or CSV.

use futures_util::StreamExt;

use corax_core::JsonValue;

use crate::client::{CoraxClient, Result};

impl CoraxClient {
    /// Run a graph search and render the result as Graphviz DOT.
    pub async fn export_graphviz(&self, graph: &str, search: &str) -> Result<String> {
        let mut stream = self.search_graph(graph, search, Some("reported")).await?;
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item?);
        }
        Ok(graphviz_dot(&items))
    }

    /// Run a list search and flatten the nodes into CSV columns.
    ///
    /// Columns are dotted paths into each node document, e.g.
    /// `reported.name` or `reported.age`.
    pub async fn export_csv(
        &self,
        graph: &str,
        search: &str,
        columns: &[&str],
    ) -> Result<String> {
        let mut stream = self.search_list(graph, search, Some("reported")).await?;
        let mut nodes = Vec::new();
        while let Some(node) = stream.next().await {
            nodes.push(node?);
        }
        Ok(csv_rows(&nodes, columns))
    }
}

/// Render a search-graph result (node and edge documents) as DOT.
///
/// Node documents carry `type: "node"`, an `id`, and a `reported`
/// section with `kind` and `name`; edge documents carry `type: "edge"`
/// with `from` and `to`.
pub fn graphviz_dot(items: &[JsonValue]) -> String {
    let mut out = String::from("digraph {\nrankdir=LR\noverlap=false\nsplines=true\n");
    for item in items {
        match item.get("type").and_then(JsonValue::as_str) {
            Some("node") => {
                let Some(id) = item.get("id").and_then(JsonValue::as_str) else {
                    continue;
                };
                let kind = item
                    .pointer("/reported/kind")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("graph_node");
                let name = item
                    .pointer("/reported/name")
                    .and_then(JsonValue::as_str)
                    .unwrap_or(id);
                out.push_str(&format!(
                    "\"{}\" [shape=Mrecord, label=\"{{{}|{}}}\"]\n",
                    dot_escape(id),
                    dot_escape(kind),
                    dot_escape(name)
                ));
            }
            Some("edge") => {
                let from = item.get("from").and_then(JsonValue::as_str);
                let to = item.get("to").and_then(JsonValue::as_str);
                if let (Some(from), Some(to)) = (from, to) {
                    out.push_str(&format!("\"{}\" -> \"{}\"\n", dot_escape(from), dot_escape(to)));
                }
            }
            _ => {}
        }
    }
    out.push_str("}\n");
    out
}

/// Flatten node documents into CSV with one column per dotted path.
pub fn csv_rows(nodes: &[JsonValue], columns: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| csv_escape(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');
    for node in nodes {
        let row = columns
            .iter()
            .map(|column| {
                let pointer = format!("/{}", column.replace('.', "/"));
                match node.pointer(&pointer) {
                    Some(JsonValue::String(s)) => csv_escape(s),
                    Some(JsonValue::Null) | None => String::new(),
                    Some(other) => csv_escape(&other.to_string()),
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_graph() -> Vec<JsonValue> {
        vec![
            json!({"type": "node", "id": "n1", "reported": {"kind": "instance", "name": "web-1"}}),
            json!({"type": "node", "id": "n2", "reported": {"kind": "volume", "name": "data"}}),
            json!({"type": "edge", "from": "n1", "to": "n2"}),
        ]
    }

    #[test]
    fn test_graphviz_dot_renders_nodes_and_edges() {
        let dot = graphviz_dot(&sample_graph());
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\"n1\" [shape=Mrecord, label=\"{instance|web-1}\"]"));
        assert!(dot.contains("\"n1\" -> \"n2\""));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_graphviz_dot_escapes_quotes() {
        let items = vec![json!({
            "type": "node",
            "id": "n1",
            "reported": {"kind": "instance", "name": "a \"quoted\" name"},
        })];
        let dot = graphviz_dot(&items);
        assert!(dot.contains("a \\\"quoted\\\" name"));
    }

    #[test]
    fn test_csv_rows_flattens_paths() {
        let nodes = vec![
            json!({"reported": {"name": "web-1", "cores": 4}}),
            json!({"reported": {"name": "db,primary"}}),
        ];
        let csv = csv_rows(&nodes, &["reported.name", "reported.cores"]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "reported.name,reported.cores");
        assert_eq!(lines[1], "web-1,4");
        // missing value is empty, comma is quoted
        assert_eq!(lines[2], "\"db,primary\",");
    }
}
