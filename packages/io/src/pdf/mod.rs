//! PDF content stream importer.
//!
//! Input is one page's decoded content stream, either in raw PDF operator
//! syntax or as a JSON token list:
//!
//! ```json
//! { "mediaBox": [0, 0, 612, 792],
//!   "operations": [{ "op": "BT" }, { "op": "Tf", "args": ["/F1", 12] }] }
//! ```

mod interpreter;
mod lexer;
mod operation;

pub use lexer::{tokenize, Token};
pub use operation::{parse, ContentStream, Operand, Operation};

use crate::importer::assemble;
use crate::{Diagnostics, Format, ImportOutput, ImportResult, Importer};
use interpreter::Interpreter;
use kurbo::Size;
use tracing::{info, instrument};

/// US Letter, in points
pub const DEFAULT_PAGE_SIZE: Size = Size::new(612.0, 792.0);

#[derive(Debug, Clone, Copy)]
pub struct PdfImporter {
    page_size: Size,
}

impl PdfImporter {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size used when the input carries no media box
    pub fn with_page_size(mut self, width: f64, height: f64) -> Self {
        self.page_size = Size::new(width, height);
        self
    }
}

impl Default for PdfImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Importer for PdfImporter {
    fn format(&self) -> Format {
        Format::Pdf
    }

    #[instrument(name = "import_pdf", skip_all, fields(bytes = bytes.len()))]
    fn import(&self, bytes: &[u8]) -> ImportResult<ImportOutput> {
        let stream = parse(bytes)?;
        let media_box = stream
            .media_box
            .unwrap_or([0.0, 0.0, self.page_size.width, self.page_size.height]);

        let mut diagnostics = Diagnostics::new();
        let nodes = Interpreter::new(media_box, &mut diagnostics).run(&stream.operations);
        let document = assemble(vec![("Page 1".to_string(), nodes)])?;

        info!(
            operations = stream.operations.len(),
            nodes = document.node_count(),
            diagnostics = diagnostics.len(),
            "imported pdf content stream"
        );
        Ok(ImportOutput {
            document,
            diagnostics: diagnostics.into_vec(),
        })
    }
}
