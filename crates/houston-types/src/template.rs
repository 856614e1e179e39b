//! `{{ expression }}` rendering for log bodies and packaging templates.
//!
//! Expressions are dot-separated paths into a JSON value with optional array
//! indices: `{{ name }}`, `{{ package.path }}`, `{{ files[2] }}`. Strings are
//! inserted verbatim; other values are JSON encoded.

use serde_json::Value;

use crate::error::{Result, TypesError};

/// Render every `{{ ... }}` expression in `template` against `data`.
pub fn render_template(template: &str, data: &Value) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        let Some(end) = remaining[start..].find("}}") else {
            break;
        };
        output.push_str(&remaining[..start]);

        let expression = remaining[start + 2..start + end].trim();
        if expression.is_empty() {
            output.push_str(&remaining[start..start + end + 2]);
        } else {
            let value = resolve_expression(expression, data)?;
            output.push_str(&value_to_string(value));
        }

        remaining = &remaining[start + end + 2..];
    }

    output.push_str(remaining);
    Ok(output)
}

/// A segment of a dot-separated path, optionally with an array index.
#[derive(Debug)]
struct PathSegment<'a> {
    name: &'a str,
    index: Option<usize>,
}

fn parse_path_segments(path: &str) -> Vec<PathSegment<'_>> {
    path.split('.')
        .map(|part| {
            if let Some(open) = part.find('[')
                && let Some(close) = part.find(']')
                && open < close
            {
                return PathSegment {
                    name: &part[..open],
                    index: part[open + 1..close].parse().ok(),
                };
            }
            PathSegment {
                name: part,
                index: None,
            }
        })
        .collect()
}

fn resolve_expression<'a>(expression: &str, data: &'a Value) -> Result<&'a Value> {
    let mut current = data;
    for segment in parse_path_segments(expression) {
        let field = if segment.name.is_empty() {
            Some(current)
        } else {
            current.get(segment.name)
        };
        let next = match (field, segment.index) {
            (Some(value), Some(i)) => value.get(i),
            (field, None) => field,
            (None, Some(_)) => None,
        };
        current = next.ok_or_else(|| TypesError::Template {
            expression: expression.to_string(),
            message: format!("cannot resolve segment '{}'", segment.name),
        })?;
    }
    Ok(current)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
