//! Serializer for object files.

use crate::config::{COMMENT_MARKER, OBJECT_SEPARATOR};
use crate::types::{DatObject, Parameter};

/// One parameter line, newline included: `key=value`, or `key text` for
/// comment keys (`#`, `# note`).
pub fn render_parameter(param: &Parameter) -> String {
    render_line(&param.key, &param.value)
}

/// Same as [`render_parameter`] from a bare key and value.
pub fn render_line(key: &str, value: &str) -> String {
    if key.starts_with(COMMENT_MARKER) {
        format!("{key} {value}\n")
    } else {
        format!("{key}={value}\n")
    }
}

/// All parameters of one object, in order.
pub fn render_object(object: &DatObject) -> String {
    object.params.iter().map(render_parameter).collect()
}

/// Objects sharing one file, joined by separator lines.
pub fn render_objects(objects: &[DatObject]) -> String {
    objects
        .iter()
        .map(render_object)
        .collect::<Vec<_>>()
        .join(&format!("{OBJECT_SEPARATOR}\n"))
}
