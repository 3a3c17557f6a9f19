//! MCP JSON-RPC bridge over stdio.
//!
//! Adapts the [`ToolRegistry`] to rmcp's [`ServerHandler`] so MCP clients
//! (Claude Desktop, Cursor, ...) can call the index tools by launching
//! `docsift serve mcp` as a subprocess. Stdout carries JSON-RPC only;
//! logs go to stderr.
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "docsift": {
//!       "command": "docsift",
//!       "args": ["--config", "/path/to/docsift.toml", "serve", "mcp"]
//!     }
//!   }
//! }
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};

use crate::index::DocumentIndex;
use crate::tools::{ToolContext, ToolRegistry};

/// Cloned per session; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct McpBridge {
    index: Arc<DocumentIndex>,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(index: Arc<DocumentIndex>, tools: Arc<ToolRegistry>) -> Self {
        Self { index, tools }
    }

    /// Convert a docsift tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::tools::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        // Scanning mutates the in-memory index, everything else only reads it.
        let read_only = tool.name() != "scan_documents";

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(read_only)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "docsift".to_string(),
                title: Some("docsift".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "docsift indexes a directory of documents (PDF, Word, Excel, PowerPoint, \
                 CSV, JSON, Markdown, text). Call scan_documents to refresh the index, \
                 search_documents or search_regex to find text with context, and \
                 get_document_content to read a whole document."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let ctx = ToolContext::new(Arc::clone(&self.index));
        match tool.execute(params, &ctx).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                tracing::warn!(tool = %request.name, error = %e, "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

/// Serve the tools over stdin/stdout until the client disconnects.
pub async fn run_stdio(index: Arc<DocumentIndex>, tools: Arc<ToolRegistry>) -> Result<()> {
    tracing::info!(tools = tools.len(), "MCP server listening on stdio");
    let service = McpBridge::new(index, tools)
        .serve(rmcp::transport::stdio())
        .await
        .context("failed to start MCP session")?;
    let reason = service.waiting().await?;
    tracing::info!(?reason, "MCP session ended");
    Ok(())
}
