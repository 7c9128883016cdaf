//! Line-oriented parser for object files.

use crate::config::COMMENT_MARKER;
use crate::diagnostics::{Report, Warning, WarningCode};
use crate::types::{DatObject, Parameter};

/// What a single source line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Whitespace only.
    Blank,
    /// Ends the current object.
    Separator,
    Param(Parameter),
    /// Key is empty after trimming.
    EmptyKey,
    /// Key present, value empty after trimming.
    EmptyValue { key: String },
}

/// Classify one line (without its terminator).
pub fn parse_line(line: &str) -> LineOutcome {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let trimmed = trim_blank(line);
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }
    if trimmed.starts_with('-') {
        return LineOutcome::Separator;
    }
    if let Some(text) = trimmed.strip_prefix(COMMENT_MARKER) {
        let text = text.trim();
        if text.is_empty() {
            return LineOutcome::EmptyValue {
                key: COMMENT_MARKER.to_string(),
            };
        }
        return LineOutcome::Param(Parameter::comment(text));
    }

    let (key, value) = match line.split_once('=') {
        Some((key, value)) => (trim_blank(key), value.trim()),
        None => (trim_blank(line), ""),
    };
    if key.is_empty() {
        return LineOutcome::EmptyKey;
    }
    let key = key.to_lowercase();
    if value.is_empty() {
        return LineOutcome::EmptyValue { key };
    }
    LineOutcome::Param(Parameter::new(key, value))
}

/// Split decoded text into objects.
///
/// Objects end at separator lines and at end of input; objects without any
/// parameter are dropped. A repeated key replaces the earlier value in place.
/// Skipped lines, empty values and overwrites are reported against
/// `location:<line>`.
pub fn parse_objects(text: &str, location: &str, report: &mut Report) -> Vec<DatObject> {
    let mut objects = Vec::new();
    let mut current = DatObject::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        match parse_line(line) {
            LineOutcome::Blank => {}
            LineOutcome::Separator => {
                if !current.is_empty() {
                    objects.push(std::mem::take(&mut current));
                }
            }
            LineOutcome::Param(param) => {
                let key = param.key.clone();
                if current.set(param) {
                    report.warn(Warning::new(
                        WarningCode::Overwritten,
                        format!("{location}:{line_no}"),
                        format!("Parameter '{key}' overwritten."),
                    ));
                }
            }
            LineOutcome::EmptyKey => {
                report.warn(Warning::new(
                    WarningCode::SkippedLine,
                    format!("{location}:{line_no}"),
                    format!("Line has no parameter name and was ignored: {}", line.trim()),
                ));
            }
            LineOutcome::EmptyValue { key } => {
                report.warn(Warning::new(
                    WarningCode::NullValue,
                    format!("{location}:{line_no}"),
                    format!("Parameter '{key}' has no value and was ignored."),
                ));
            }
        }
    }

    if !current.is_empty() {
        objects.push(current);
    }
    objects
}

fn trim_blank(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamKind;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> (Vec<DatObject>, Report) {
        let mut report = Report::default();
        let objects = parse_objects(text, "test.dat", &mut report);
        (objects, report)
    }

    #[test]
    fn test_parse_line_key_value() {
        assert_eq!(
            parse_line("  Speed\t=  120 \r"),
            LineOutcome::Param(Parameter::new("speed", "120"))
        );
    }

    #[test]
    fn test_parse_line_value_keeps_later_equals() {
        let LineOutcome::Param(p) = parse_line("intro_text=a=b") else {
            panic!("expected parameter");
        };
        assert_eq!(p.value, "a=b");
        assert_eq!(p.kind, ParamKind::String);
    }

    #[test]
    fn test_parse_line_separators_and_blanks() {
        assert_eq!(parse_line("---"), LineOutcome::Separator);
        assert_eq!(parse_line("  -"), LineOutcome::Separator);
        assert_eq!(parse_line(""), LineOutcome::Blank);
        assert_eq!(parse_line(" \t "), LineOutcome::Blank);
        assert_eq!(parse_line("\r"), LineOutcome::Blank);
    }

    #[test]
    fn test_parse_line_rejects() {
        assert_eq!(parse_line("=5"), LineOutcome::EmptyKey);
        assert_eq!(
            parse_line("Name="),
            LineOutcome::EmptyValue {
                key: "name".to_string()
            }
        );
        assert_eq!(
            parse_line("waytype"),
            LineOutcome::EmptyValue {
                key: "waytype".to_string()
            }
        );
    }

    #[test]
    fn test_comment_line() {
        assert_eq!(
            parse_line("# hello world"),
            LineOutcome::Param(Parameter::comment("hello world"))
        );
        // Comment text may contain '=' and keeps its case.
        assert_eq!(
            parse_line("  #Cost=Low"),
            LineOutcome::Param(Parameter::comment("Cost=Low"))
        );
    }

    #[test]
    fn test_number_and_string_typing() {
        let (objects, _) = parse("name=Bus\nspeed=120\ncost=1.5\n");
        let kinds: Vec<_> = objects[0].params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![ParamKind::String, ParamKind::Number, ParamKind::String]
        );
    }

    #[test]
    fn test_duplicate_key_overwrites_with_warning() {
        let (objects, report) = parse("a=1\na=2\n");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].params, vec![Parameter::new("a", "2")]);
        assert_eq!(report.count_code(&WarningCode::Overwritten), 1);
    }

    #[test]
    fn test_duplicate_key_case_folded_keeps_position() {
        let (objects, report) = parse("Name=x\nspeed=1\nNAME=y\n");
        assert_eq!(
            objects[0].params,
            vec![Parameter::new("name", "y"), Parameter::new("speed", "1")]
        );
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_object_splitting() {
        let (objects, report) = parse("name=x\n---\nname=y\n");
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].get("name"), Some("x"));
        assert_eq!(objects[1].get("name"), Some("y"));
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_empty_objects_are_dropped() {
        let (objects, _) = parse("---\nname=x\n---\n\n-----\n");
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn test_crlf_input() {
        let (objects, report) = parse("Obj=vehicle\r\nName=bus\r\n\r\n---\r\nname=tram\r\n");
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].get("obj"), Some("vehicle"));
        assert_eq!(objects[0].get("name"), Some("bus"));
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_warnings_carry_line_numbers() {
        let (objects, report) = parse("name=x\nspeed=\n=3\n");
        assert_eq!(objects[0].len(), 1);
        assert_eq!(report.warnings[0].code, WarningCode::NullValue);
        assert_eq!(report.warnings[0].location, "test.dat:2");
        assert_eq!(report.warnings[1].code, WarningCode::SkippedLine);
        assert_eq!(report.warnings[1].location, "test.dat:3");
    }
}
