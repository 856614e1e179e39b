//! Install-path naming rules.

/// Prefix inserted before a dotted segment that would start with a digit.
const DIGIT_PREFIX: char = '_';

/// Sanitise a reverse-domain name for use as an installed file name.
///
/// Lowercases, turns spaces and dashes into underscores and prefixes any
/// dot-separated segment beginning with a digit.
pub fn sanitize(name: &str) -> String {
    name.split('.')
        .map(|segment| {
            let cleaned: String = segment
                .chars()
                .map(|c| match c {
                    ' ' | '-' => '_',
                    c => c,
                })
                .collect::<String>()
                .to_lowercase();
            if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
                format!("{DIGIT_PREFIX}{cleaned}")
            } else {
                cleaned
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
