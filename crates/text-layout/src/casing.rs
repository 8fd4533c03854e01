//! Name casing

/// Title-case a name
///
/// Each whitespace-separated token gets its first character uppercased and
/// the rest lowercased. Only ASCII letters change case; other characters
/// pass through untouched. Runs of whitespace collapse to a single space and
/// leading/trailing whitespace is dropped, so the transform is idempotent.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for token in text.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = token.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            result.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }

    result
}
