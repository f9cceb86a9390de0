//! Rendering: grid compositing, diffing, and terminal output.

mod compose;
mod diff;
mod grid;
mod sink;

pub use compose::{page_size, rows_per_item, Regions};
pub use diff::{Dims, RenderPipeline, View, Write};
pub use grid::{Grid, Style, StyledCell};
pub use sink::{apply, nearest_ansi16, terminal_color};
