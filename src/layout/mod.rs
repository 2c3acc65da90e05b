/*!
 * Layout: from positioned runs to segments, and from translations back to
 * positioned lines.
 *
 * - `grouping`: coalesces runs into translatable segments
 * - `reconciler`: wraps translated text into page coordinates
 */

pub mod grouping;
pub mod reconciler;

pub use grouping::{GroupingStrategy, TextSegment};
pub use reconciler::{LayoutConfig, Placement, PlannedLine, Reconciler, RenderPlan, wrap_text};
