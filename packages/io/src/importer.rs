//! The importer capability and format selection

use crate::{FigmaImporter, ImportError, ImportOutput, ImportResult, PdfImporter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use vellum_core::{Document, NodeTree, Parent};

/// Maps one external format onto a [`Document`]. Implementations are pure:
/// the same bytes always give the same output and nothing else is touched.
pub trait Importer: Send + Sync {
    fn format(&self) -> Format;

    fn import(&self, bytes: &[u8]) -> ImportResult<ImportOutput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Format {
    Figma,
    Pdf,
}

impl Format {
    /// Guess from a file extension: `.json`/`.fig.json` are Figma, `.pdf` and
    /// `.content` are PDF content streams
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" | "figma" => Some(Format::Figma),
            "pdf" | "content" | "stream" => Some(Format::Pdf),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Figma => "figma",
            Format::Pdf => "pdf",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "figma" => Ok(Format::Figma),
            "pdf" => Ok(Format::Pdf),
            other => Err(ImportError::Malformed(format!("unknown format `{}`", other))),
        }
    }
}

/// Default importer for `format`
pub fn importer_for(format: Format) -> Box<dyn Importer> {
    match format {
        Format::Figma => Box::new(FigmaImporter::new()),
        Format::Pdf => Box::new(PdfImporter::new()),
    }
}

/// Build a document from named pages of detached trees. Every tree lands at
/// the page root in order.
pub(crate) fn assemble(pages: Vec<(String, Vec<NodeTree>)>) -> ImportResult<Document> {
    let mut document = Document::new();
    for (name, trees) in pages {
        let page = document.add_page(name);
        for tree in &trees {
            document.insert_tree(page, Parent::Root, tree, None)?;
        }
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::NodeKind;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("design.json")), Some(Format::Figma));
        assert_eq!(Format::from_path(Path::new("page.PDF")), Some(Format::Pdf));
        assert_eq!(Format::from_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("Figma".parse::<Format>().unwrap(), Format::Figma);
        assert!("sketch".parse::<Format>().is_err());
    }

    #[test]
    fn test_importer_for_reports_its_format() {
        assert_eq!(importer_for(Format::Pdf).format(), Format::Pdf);
        assert_eq!(importer_for(Format::Figma).format(), Format::Figma);
    }

    #[test]
    fn test_assemble_keeps_page_order() {
        let doc = assemble(vec![
            ("One".into(), vec![NodeTree::new(NodeKind::rectangle(1.0, 1.0))]),
            ("Two".into(), Vec::new()),
        ])
        .unwrap();

        let names: Vec<_> = doc.pages_in_order().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["One", "Two"]);
        assert_eq!(doc.node_count(), 1);
    }
}
