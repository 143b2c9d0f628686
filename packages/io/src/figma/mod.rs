//! Figma REST JSON importer

mod convert;
mod schema;

pub use schema::{FigmaFile, FigmaNode};

use crate::importer::assemble;
use crate::{Diagnostics, Format, ImportOutput, ImportResult, Importer};
use tracing::{info, instrument};

/// Imports `GET /v1/files/:key` responses, `/nodes` responses, or a single
/// exported node
#[derive(Debug, Clone, Copy, Default)]
pub struct FigmaImporter;

impl FigmaImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for FigmaImporter {
    fn format(&self) -> Format {
        Format::Figma
    }

    #[instrument(name = "import_figma", skip_all, fields(bytes = bytes.len()))]
    fn import(&self, bytes: &[u8]) -> ImportResult<ImportOutput> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let mut diagnostics = Diagnostics::new();
        let pages = convert::parse_pages(value, &mut diagnostics)?;
        let document = assemble(pages)?;

        info!(
            pages = document.page_count(),
            nodes = document.node_count(),
            diagnostics = diagnostics.len(),
            "imported figma file"
        );
        Ok(ImportOutput {
            document,
            diagnostics: diagnostics.into_vec(),
        })
    }
}
