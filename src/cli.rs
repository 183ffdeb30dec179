use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::plan::MetadataMode;

#[derive(Parser)]
#[command(name = "splitmerge")]
#[command(about = "Split and merge the PDF documents of a document library, with MCP server support")]
#[command(version)]
pub struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Library directory (scratch files go to <LIBRARY>/scratch unless configured)
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// How to run a split/merge request.
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Only generate preview files; the library is left untouched
    #[arg(long)]
    pub preview: bool,

    /// Delete the source documents once the new ones are stored
    #[arg(long)]
    pub delete_source: bool,

    /// Metadata of new documents: "copy_first" or "redo" (default from config)
    #[arg(long)]
    pub metadata: Option<MetadataMode>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server
    Mcp,

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Expand page range text (e.g., "1-3,5") into page numbers
    Decode {
        /// Page range text
        text: String,
    },

    /// Compress page numbers into page range text
    Encode {
        /// Comma-separated page numbers (e.g., "1,2,3,5")
        #[arg(required = true, value_delimiter = ',')]
        pages: Vec<u32>,
    },

    /// Add files to the library
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Title for the new document (single file only)
        #[arg(short, long)]
        title: Option<String>,

        /// PDF rendition to attach to a non-PDF file (single file only)
        #[arg(long)]
        archive: Option<PathBuf>,
    },

    /// List library documents
    #[command(alias = "ls")]
    List,

    /// Combine documents (or page ranges of them) into one new document
    Merge {
        /// Sources as ID or ID:PAGES (e.g., "4" or "4:1-3,7")
        #[arg(required = true)]
        sources: Vec<String>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Split a document into several new documents
    Split {
        /// Document to split
        document: u64,

        /// Pages after which a new document starts (e.g., "2,5")
        #[arg(short, long, required = true, value_delimiter = ',')]
        after: Vec<u32>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Execute a split/merge request stored as JSON
    Execute {
        /// Request file ("-" reads stdin)
        request: PathBuf,

        /// Force preview mode regardless of the request
        #[arg(long)]
        preview: bool,
    },

    /// Edit a split/merge session interactively with live previews
    Edit {
        /// Documents to start with
        documents: Vec<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encode_list() {
        let cli = Cli::try_parse_from(["splitmerge", "encode", "3,1,2"]).unwrap();
        match cli.command {
            Commands::Encode { pages } => assert_eq!(pages, vec![3, 1, 2]),
            _ => panic!("expected encode"),
        }
    }

    #[test]
    fn test_parse_split_options() {
        let cli = Cli::try_parse_from([
            "splitmerge",
            "--library",
            "/tmp/lib",
            "split",
            "7",
            "--after",
            "2,5",
            "--metadata",
            "redo",
            "--preview",
        ])
        .unwrap();
        assert_eq!(cli.library, Some(PathBuf::from("/tmp/lib")));
        match cli.command {
            Commands::Split {
                document,
                after,
                options,
            } => {
                assert_eq!(document, 7);
                assert_eq!(after, vec![2, 5]);
                assert_eq!(options.metadata, Some(MetadataMode::Redo));
                assert!(options.preview);
                assert!(!options.delete_source);
            }
            _ => panic!("expected split"),
        }
    }

    #[test]
    fn test_rejects_unknown_metadata_mode() {
        assert!(Cli::try_parse_from(["splitmerge", "merge", "1", "--metadata", "keep"]).is_err());
    }
}
