use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::editor::load_document_ref;
use crate::merge::execute_split_merge_plan;
use crate::page_range::{decode, encode};
use crate::pdf::PdfDocument;
use crate::plan::SplitMergeRequest;
use crate::store::DocumentStore;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DecodeRequest {
    #[schemars(description = "Page range text (e.g., '1-3,5')")]
    pub text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EncodeRequest {
    #[schemars(description = "Page numbers in order (e.g., [1, 2, 3, 5])")]
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct PdfServer {
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
    store: DocumentStore,
    scratch_dir: PathBuf,
}

impl PdfServer {
    pub fn new(store: DocumentStore, scratch_dir: PathBuf) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
            scratch_dir,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Get PDF metadata including title, author, creator, producer, creation date, version, and page count")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        match PdfDocument::open(&path) {
            Ok(doc) => {
                let info = doc.get_info();
                to_json(&PdfInfoResult {
                    path,
                    page_count: info.page_count,
                    version: info.version,
                    title: info.title,
                    author: info.author,
                    creator: info.creator,
                    producer: info.producer,
                    creation_date: info.creation_date,
                    subject: info.subject,
                })
            }
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Expand page range text like '1-3,5' into page numbers. Malformed parts are ignored.")]
    fn page_range_decode(&self, Parameters(DecodeRequest { text }): Parameters<DecodeRequest>) -> String {
        to_json(&decode(&text))
    }

    #[tool(description = "Compress page numbers into page range text, keeping their order")]
    fn page_range_encode(&self, Parameters(EncodeRequest { pages }): Parameters<EncodeRequest>) -> String {
        encode(&pages)
    }

    #[tool(description = "List the documents of the library with their ids, titles, and page counts")]
    fn library_list(&self) -> String {
        let docs = match self.store.list() {
            Ok(docs) => docs,
            Err(e) => return format!("Error: {}", e),
        };
        let result: Vec<LibraryEntryResult> = docs
            .into_iter()
            .map(|doc| LibraryEntryResult {
                page_count: load_document_ref(&self.store, doc.id)
                    .ok()
                    .and_then(|r| r.page_count),
                id: doc.id,
                title: doc.record.title,
                mime_type: doc.record.mime_type,
            })
            .collect();
        to_json(&result)
    }

    #[tool(description = "Split and/or merge library documents. Each plan entry becomes one new document made of the listed sources in order. With preview set, only temporary PDFs are written and their paths returned.")]
    fn split_merge(&self, Parameters(request): Parameters<SplitMergeRequest>) -> String {
        info!(
            "split_merge: {} target(s), preview={}",
            request.plan.len(),
            request.preview
        );
        match execute_split_merge_plan(&self.store, &request, &self.scratch_dir) {
            Ok(outcome) => to_json(&SplitMergeResult {
                files: outcome
                    .files
                    .iter()
                    .map(|f| f.display().to_string())
                    .collect(),
                documents: outcome.documents,
            }),
            Err(e) => format!("Error: {}", e),
        }
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PdfInfoResult {
    pub path: String,
    pub page_count: u32,
    pub version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LibraryEntryResult {
    pub id: u64,
    pub title: String,
    pub mime_type: String,
    pub page_count: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SplitMergeResult {
    /// Preview files, in plan order.
    pub files: Vec<String>,
    /// Ids of the documents created.
    pub documents: Vec<u64>,
}

impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Document library split/merge tools. Use library_list to find document ids, \
                 page_range_decode and page_range_encode to work with page range text, pdf_info \
                 for PDF metadata, and split_merge (preview first) to build new documents from \
                 pages of existing ones."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(store: DocumentStore, scratch_dir: PathBuf) -> Result<()> {
    let server = PdfServer::new(store, scratch_dir);

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{sample_pdf, write_pdf};
    use tempfile::TempDir;

    fn server() -> (TempDir, PdfServer) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path().join("library")).unwrap();
        let pdf = dir.path().join("in.pdf");
        write_pdf(&mut sample_pdf(3, Some("Three")), &pdf);
        store.import(&pdf, Some("Three".to_string())).unwrap();
        let server = PdfServer::new(store, dir.path().join("scratch"));
        (dir, server)
    }

    #[test]
    fn test_page_range_tools() {
        let (_dir, server) = server();
        let decoded = server.page_range_decode(Parameters(DecodeRequest {
            text: "1-3, 5".to_string(),
        }));
        assert_eq!(
            serde_json::from_str::<Vec<u32>>(&decoded).unwrap(),
            vec![1, 2, 3, 5]
        );
        let encoded = server.page_range_encode(Parameters(EncodeRequest {
            pages: vec![1, 2, 3, 5],
        }));
        assert_eq!(encoded, "1-3,5");
    }

    #[test]
    fn test_library_list_and_preview() {
        let (_dir, server) = server();
        let listing: serde_json::Value = serde_json::from_str(&server.library_list()).unwrap();
        assert_eq!(listing[0]["title"], "Three");
        assert_eq!(listing[0]["page_count"], 3);
        let id = listing[0]["id"].as_u64().unwrap();

        let request: SplitMergeRequest = serde_json::from_value(serde_json::json!({
            "plan": [[{"document": id, "pages": "1-2"}], [{"document": id, "pages": "3"}]],
            "preview": true
        }))
        .unwrap();
        let result: serde_json::Value =
            serde_json::from_str(&server.split_merge(Parameters(request))).unwrap();
        assert_eq!(result["files"].as_array().unwrap().len(), 2);
        assert!(result["documents"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_split_merge_reports_errors() {
        let (_dir, server) = server();
        let request: SplitMergeRequest =
            serde_json::from_str(r#"{"plan": [[{"document": 99}]]}"#).unwrap();
        let result = server.split_merge(Parameters(request));
        assert_eq!(result, "Error: Document 99 does not exist.");
    }
}
