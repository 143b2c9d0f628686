//! # Vellum IO
//!
//! Importers that map external design formats onto a Vellum [`Document`].
//!
//! Every importer implements [`Importer`]: bytes in, a best-effort document
//! plus [`Diagnostic`]s out. Anything that cannot be represented faithfully
//! is reported rather than dropped. Input that cannot be read at all is an
//! [`ImportError`].
//!
//! ```rust
//! use vellum_io::{importer_for, Format};
//!
//! let output = importer_for(Format::Pdf).import(b"0 0 1 rg 72 72 144 72 re f")?;
//! assert_eq!(output.document.node_count(), 1);
//! assert!(!output.is_partial());
//! # Ok::<(), vellum_io::ImportError>(())
//! ```

mod diagnostic;
mod error;
pub mod figma;
mod importer;
pub mod pdf;

pub use diagnostic::{Diagnostic, Diagnostics, ImportOutput};
pub use error::{ImportError, ImportResult};
pub use figma::FigmaImporter;
pub use importer::{importer_for, Format, Importer};
pub use pdf::PdfImporter;

pub use vellum_core::Document;
