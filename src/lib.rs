pub mod config;
mod error;
mod font;
mod layout;
mod record;
pub mod registry;
mod renderer;
mod report;
pub mod server;
mod stamp;
pub mod store;
mod surface;
pub mod template;
#[cfg(test)]
mod testing;
mod types;

pub use error::{ActaError, ErrorKind, RenderStage, ValueShapeError};
pub use font::{
    BASE_FONT, WinAnsiEncoded, decode_winansi, encode_winansi, font_dictionary,
    measure_encoded_width, measure_text_width,
};
pub use layout::{
    BlockLayout, FloorPolicy, PlacedLine, TableLayout, layout_block, layout_table, line_step,
    truncate_chars, wrap_words,
};
pub use record::{ComponentRow, Record};
pub use registry::{CoordinateMap, lookup, lookup_name};
pub use renderer::{OverlayRenderer, RenderOptions, RenderSummary, Rendered, draw_record};
pub use report::ReportType;
pub use stamp::{PageStamp, PlacedText, extract_placed_text};
pub use surface::{DrawOp, RecordingSurface, Surface};
pub use template::{DirTemplateSource, StaticTemplateSource, TemplateSource};
pub use types::{Anchor, Color, Pt};
