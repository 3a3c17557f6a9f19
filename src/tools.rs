//! The tool layer shared by the MCP and HTTP surfaces.
//!
//! Every index operation is exposed as a [`Tool`]: a name, a description,
//! a JSON Schema for its parameters, and an async `execute` that returns
//! JSON. Both surfaces look tools up in the same [`ToolRegistry`], so a
//! tool registered once is reachable over stdio and HTTP alike.
//!
//! | Tool | Index operation |
//! |------|-----------------|
//! | `scan_documents` | [`DocumentIndex::scan`] |
//! | `search_documents` | [`DocumentIndex::search`] |
//! | `search_regex` | [`DocumentIndex::search_regex`] |
//! | `list_documents` | [`DocumentIndex::list_documents`] |
//! | `get_document_stats` | [`DocumentIndex::get_stats`] |
//! | `get_document_content` | [`DocumentIndex::get_content`] |
//!
//! Scans and searches are CPU-bound, so they run on tokio's blocking pool.
//! Tool failures are `anyhow` errors; when the cause is an
//! [`IndexError`] the surfaces downcast it to pick a status code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::IndexError;
use crate::index::DocumentIndex;

/// A named operation callable by agents.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route path (`POST /tools/{name}`) and MCP tool name.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Built-in tools are flagged in `GET /tools/list`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema object with `type: "object"`, `properties` and `required`.
    fn parameters_schema(&self) -> Value;

    /// Execute with JSON parameters (always an object).
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// What a tool can reach while it runs.
#[derive(Clone)]
pub struct ToolContext {
    index: Arc<DocumentIndex>,
}

impl ToolContext {
    pub fn new(index: Arc<DocumentIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, IndexError> {
    match params.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(IndexError::InvalidQuery(format!(
            "{} parameter is required",
            key
        ))),
    }
}

/// Search input: any non-empty string. Whitespace is a valid query.
fn required_text<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, IndexError> {
    match params.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(IndexError::InvalidQuery(format!(
            "{} parameter is required",
            key
        ))),
    }
}

/// Zero or negative limits mean "no matches", not an error.
fn max_results(params: &Value, default: usize) -> std::result::Result<usize, IndexError> {
    match params.get("max_results") {
        None | Some(Value::Null) => Ok(default),
        Some(v) => match (v.as_u64(), v.as_i64()) {
            (Some(n), _) => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
            (None, Some(_)) => Ok(0),
            _ => Err(IndexError::InvalidQuery(
                "max_results must be an integer".to_string(),
            )),
        },
    }
}

fn max_results_schema() -> Value {
    json!({
        "type": "integer",
        "description": "Maximum number of matches to return; 0 or less returns none (default: search.default_max_results, 50)"
    })
}

/// Serializable tool info for `GET /tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    /// JSON Schema for the parameters.
    pub parameters: Value,
}

impl ToolInfo {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

/// Checks `params` against a tool schema: required keys present, declared
/// types respected. Missing properties that declare a `default` get it.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be a JSON object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    for field in required {
        if !params_obj.contains_key(field) {
            bail!("missing required parameter: {}", field);
        }
    }

    let mut result = params_obj.clone();
    for (name, prop) in &properties {
        match params_obj.get(name) {
            Some(value) => {
                let Some(expected) = prop.get("type").and_then(Value::as_str) else {
                    continue;
                };
                let type_ok = match expected {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        name,
                        expected,
                        json_type_name(value)
                    );
                }
            }
            None => {
                if let Some(default) = prop.get("default") {
                    result.insert(name.clone(), default.clone());
                }
            }
        }
    }
    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `scan_documents`: scan a directory (or the configured root).
pub struct ScanTool;

#[async_trait]
impl Tool for ScanTool {
    fn name(&self) -> &str {
        "scan_documents"
    }

    fn description(&self) -> &str {
        "Scan and index all documents in the documents directory"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory to scan (default: the configured index root)"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let directory = params
            .get("directory")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let index = Arc::clone(ctx.index());
        let (report, documents) = tokio::task::spawn_blocking(move || {
            let report = index.scan(directory.as_deref())?;
            let documents = index.documents_under(&report.root);
            Ok::<_, IndexError>((report, documents))
        })
        .await??;

        Ok(json!({
            "status": "success",
            "message": format!(
                "Scanned and processed {} documents ({} unchanged, {} failed)",
                report.processed_count(),
                report.skipped_unchanged,
                report.failed_count()
            ),
            "processed_count": report.processed_count(),
            "report": report,
            "documents": documents,
        }))
    }
}

/// `search_documents`: case-insensitive literal search.
pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search for text within the indexed documents (case-insensitive)"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Text to search for in documents" },
                "max_results": max_results_schema()
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = required_text(&params, "query")?.to_string();
        let limit = max_results(&params, ctx.index().default_max_results())?;

        let index = Arc::clone(ctx.index());
        let q = query.clone();
        let outcome = tokio::task::spawn_blocking(move || index.search(&q, limit)).await??;

        Ok(json!({
            "status": "success",
            "query": query,
            "matches": outcome.matches,
            "total_found": outcome.total_found,
            "truncated": outcome.truncated,
        }))
    }
}

/// `search_regex`: regex search with line anchors.
pub struct RegexSearchTool;

#[async_trait]
impl Tool for RegexSearchTool {
    fn name(&self) -> &str {
        "search_regex"
    }

    fn description(&self) -> &str {
        "Search the indexed documents with a regular expression"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Regular expression; ^ and $ match at line boundaries" },
                "case_insensitive": { "type": "boolean", "default": true },
                "max_results": max_results_schema()
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let pattern = required_text(&params, "pattern")?.to_string();
        let case_insensitive = params
            .get("case_insensitive")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let limit = max_results(&params, ctx.index().default_max_results())?;

        let index = Arc::clone(ctx.index());
        let p = pattern.clone();
        let outcome =
            tokio::task::spawn_blocking(move || index.search_regex(&p, case_insensitive, limit))
                .await??;

        Ok(json!({
            "status": "success",
            "pattern": pattern,
            "case_insensitive": case_insensitive,
            "matches": outcome.matches,
            "total_found": outcome.total_found,
            "truncated": outcome.truncated,
        }))
    }
}

/// `list_documents`: summaries of everything indexed.
pub struct ListTool;

#[async_trait]
impl Tool for ListTool {
    fn name(&self) -> &str {
        "list_documents"
    }

    fn description(&self) -> &str {
        "List all processed documents with their metadata"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let documents = ctx.index().list_documents();
        Ok(json!({
            "status": "success",
            "total_documents": documents.len(),
            "documents": documents,
        }))
    }
}

/// `get_document_stats`: collection statistics.
pub struct StatsTool;

#[async_trait]
impl Tool for StatsTool {
    fn name(&self) -> &str {
        "get_document_stats"
    }

    fn description(&self) -> &str {
        "Get statistics about the document collection"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(json!({
            "status": "success",
            "stats": ctx.index().get_stats(),
        }))
    }
}

/// `get_document_content`: full text by path or file name.
pub struct ContentTool;

#[async_trait]
impl Tool for ContentTool {
    fn name(&self) -> &str {
        "get_document_content"
    }

    fn description(&self) -> &str {
        "Get the full content of a specific document by path or file name"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": { "type": "string", "description": "File name or path of the document" },
                "path": { "type": "string", "description": "Alias for filename" }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let key = required_str(&params, "filename")
            .or_else(|_| required_str(&params, "path"))
            .map_err(|_| IndexError::InvalidQuery("filename parameter is required".to_string()))?;
        let record = ctx.index().get_content(key)?;

        Ok(json!({
            "status": "success",
            "path": record.path,
            "file_name": record.file_name,
            "file_type": record.file_type,
            "language": record.language,
            "size_bytes": record.size_bytes,
            "modified_time": record.modified_time,
            "content": record.content,
        }))
    }
}

/// Registry of tools reachable from the MCP and HTTP surfaces.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with all six index tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ScanTool));
        registry.register(Box::new(SearchTool));
        registry.register(Box::new(RegexSearchTool));
        registry.register(Box::new(ListTool));
        registry.register(Box::new(StatsTool));
        registry.register(Box::new(ContentTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn context() -> (TempDir, ToolContext) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "the quick brown fox").unwrap();
        fs::write(tmp.path().join("b.txt"), "the lazy dog").unwrap();
        let mut config = Config::minimal();
        config.index.root = tmp.path().to_path_buf();
        let ctx = ToolContext::new(Arc::new(DocumentIndex::new(&config)));
        (tmp, ctx)
    }

    fn index_error(err: &anyhow::Error) -> &IndexError {
        err.downcast_ref::<IndexError>().expect("IndexError")
    }

    #[test]
    fn builtins_are_registered() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 6);
        for name in [
            "scan_documents",
            "search_documents",
            "search_regex",
            "list_documents",
            "get_document_stats",
            "get_document_content",
        ] {
            let tool = registry.find(name).unwrap_or_else(|| panic!("missing {}", name));
            assert!(tool.is_builtin());
            assert_eq!(tool.parameters_schema()["type"], "object");
        }
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn validate_params_checks_required_and_types() {
        let schema = RegexSearchTool.parameters_schema();
        let err = validate_params(&schema, &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: pattern"));

        let err = validate_params(&schema, &json!({ "pattern": 5 })).unwrap_err();
        assert!(err.to_string().contains("must be of type 'string'"));

        let params = validate_params(&schema, &json!({ "pattern": "^a" })).unwrap();
        assert_eq!(params["case_insensitive"], true);
        assert!(params.get("max_results").is_none());

        let params = validate_params(&ListTool.parameters_schema(), &Value::Null).unwrap();
        assert_eq!(params, json!({}));
    }

    #[tokio::test]
    async fn scan_then_search_through_tools() {
        let (_tmp, ctx) = context();
        let scan = ScanTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(scan["processed_count"], 2);
        assert_eq!(scan["documents"].as_array().unwrap().len(), 2);

        let found = SearchTool
            .execute(json!({ "query": "fox", "max_results": 10 }), &ctx)
            .await
            .unwrap();
        assert_eq!(found["total_found"], 1);
        assert!(found["matches"][0]["context"]
            .as_str()
            .unwrap()
            .contains("**fox**"));
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let (_tmp, ctx) = context();
        let err = SearchTool.execute(json!({}), &ctx).await.unwrap_err();
        assert!(matches!(index_error(&err), IndexError::InvalidQuery(_)));

        let err = SearchTool
            .execute(json!({ "query": "x", "max_results": "ten" }), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(index_error(&err), IndexError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn negative_max_results_returns_nothing() {
        let (_tmp, ctx) = context();
        ScanTool.execute(json!({}), &ctx).await.unwrap();

        let found = SearchTool
            .execute(json!({ "query": "the", "max_results": -1 }), &ctx)
            .await
            .unwrap();
        assert_eq!(found["total_found"], 0);
        assert_eq!(found["matches"], json!([]));

        let found = RegexSearchTool
            .execute(json!({ "pattern": "^the", "max_results": -1 }), &ctx)
            .await
            .unwrap();
        assert_eq!(found["total_found"], 0);
        assert_eq!(found["truncated"], false);

        let schema = SearchTool.parameters_schema();
        assert!(schema["properties"]["max_results"].get("minimum").is_none());
        assert!(validate_params(&schema, &json!({ "query": "the", "max_results": -5 })).is_ok());
    }

    #[tokio::test]
    async fn bad_regex_names_pattern() {
        let (_tmp, ctx) = context();
        let err = RegexSearchTool
            .execute(json!({ "pattern": "(unclosed" }), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
        assert_eq!(index_error(&err).code(), "invalid_pattern");
    }

    #[tokio::test]
    async fn content_by_filename_and_not_found() {
        let (_tmp, ctx) = context();
        ScanTool.execute(json!({}), &ctx).await.unwrap();

        let doc = ContentTool
            .execute(json!({ "filename": "b.txt" }), &ctx)
            .await
            .unwrap();
        assert_eq!(doc["content"], "the lazy dog");
        assert_eq!(doc["file_type"], "Text File");

        let err = ContentTool
            .execute(json!({ "filename": "zzz.txt" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(index_error(&err).code(), "not_found");
    }

    #[tokio::test]
    async fn stats_and_list() {
        let (_tmp, ctx) = context();
        ScanTool.execute(json!({}), &ctx).await.unwrap();
        let stats = StatsTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(stats["stats"]["total_documents"], 2);
        assert_eq!(stats["stats"]["counts_by_type"]["Text File"], 2);

        let list = ListTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(list["total_documents"], 2);
    }
}
