/*!
 * PDF reading and writing.
 *
 * - `extractor`: positioned text runs from content streams
 * - `renderer`: output documents with translated text
 * - `fonts`: font metrics, embedding data and font selection
 * - `encoding`: WinAnsi and ToUnicode CMaps
 * - `geometry`: matrices, boxes and page sizes
 */

pub mod encoding;
pub mod extractor;
pub mod fonts;
pub mod geometry;
pub mod renderer;

pub use extractor::{ExtractedDocument, PageInfo, PositionedRun, extract, extract_document};
pub use fonts::{FontConfig, FontKey, FontProvider, FontSource, PdfFont};
pub use geometry::{BoundingBox, PageSize};
pub use renderer::{PdfRenderer, RenderStrategy};
