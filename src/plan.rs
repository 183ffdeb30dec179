use rmcp::schemars;
use serde::{Deserialize, Serialize};

/// How metadata of produced documents is derived.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MetadataMode {
    /// Keep only the title of the first source; everything else is assigned anew.
    Redo,
    /// Copy correspondent, document type, tags and created date of the first source.
    #[default]
    CopyFirst,
}

impl std::str::FromStr for MetadataMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redo" => Ok(MetadataMode::Redo),
            "copy_first" | "copy-first" => Ok(MetadataMode::CopyFirst),
            other => Err(format!("unknown metadata mode: {}", other)),
        }
    }
}

/// Pages taken from one library document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SourceSpec {
    #[schemars(description = "Library document id")]
    pub document: u64,
    #[schemars(description = "Page ranges (e.g., '1-3,5'); all pages when omitted")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
}

/// Sources concatenated into one output document.
pub type TargetSpec = Vec<SourceSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SplitMergeRequest {
    #[schemars(description = "One entry per output document, each listing its sources in order")]
    pub plan: Vec<TargetSpec>,
    #[serde(default)]
    pub metadata: MetadataMode,
    #[serde(default)]
    pub delete_source: bool,
    #[serde(default)]
    pub preview: bool,
}

impl SplitMergeRequest {
    /// Ids of every document the plan reads from, in first-use order.
    pub fn source_documents(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        for source in self.plan.iter().flatten() {
            if !ids.contains(&source.document) {
                ids.push(source.document);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json = r#"{
            "plan": [[{"document": 3, "pages": "1-2"}, {"document": 4}], [{"document": 3, "pages": "3"}]],
            "metadata": "redo",
            "delete_source": true
        }"#;
        let request: SplitMergeRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.plan.len(), 2);
        assert_eq!(request.plan[0][1].pages, None);
        assert_eq!(request.metadata, MetadataMode::Redo);
        assert!(request.delete_source);
        assert!(!request.preview);
        assert_eq!(request.source_documents(), vec![3, 4]);

        let back = serde_json::to_value(&request).unwrap();
        assert_eq!(back["metadata"], "redo");
        assert!(back["plan"][0][1].get("pages").is_none());
    }

    #[test]
    fn test_metadata_defaults_to_copy_first() {
        let request: SplitMergeRequest = serde_json::from_str(r#"{"plan": []}"#).unwrap();
        assert_eq!(request.metadata, MetadataMode::CopyFirst);
        assert_eq!("copy-first".parse::<MetadataMode>(), Ok(MetadataMode::CopyFirst));
        assert!("keep".parse::<MetadataMode>().is_err());
    }
}
