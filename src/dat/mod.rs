//! Object-file codec: bytes → text → objects, and objects → text.

mod encoding;
mod parser;
mod writer;

pub use encoding::decode_source;
pub use parser::{parse_line, parse_objects, LineOutcome};
pub use writer::{render_line, render_object, render_objects, render_parameter};
