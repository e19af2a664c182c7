//! Helpers for building case-insensitive `LIKE` searches.

/// Lower-case a user supplied search term and collapse its whitespace.
///
/// Returns `None` for a term that is empty after trimming.
///
/// # Examples
/// ```
/// use pubregistry::utils::normalize_term;
///
/// assert_eq!(normalize_term("  Anna   SVENSSON "), Some("anna svensson".to_string()));
/// assert_eq!(normalize_term("   "), None);
/// ```
pub fn normalize_term(term: &str) -> Option<String> {
    let normalized = term
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase();

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Wrap `term` as a substring pattern, escaping `LIKE` metacharacters
/// so they match literally (Postgres' default escape is `\`).
///
/// # Examples
/// ```
/// use pubregistry::utils::contains_pattern;
///
/// assert_eq!(contains_pattern("svens"), "%svens%");
/// assert_eq!(contains_pattern("100%"), "%100\\%%");
/// ```
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize_term("ÅSA"), Some("åsa".to_string()));
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_term(""), None);
        assert_eq!(normalize_term("\t \n"), None);
    }

    #[test]
    fn test_pattern_plain() {
        assert_eq!(contains_pattern("xanna"), "%xanna%");
    }

    #[test]
    fn test_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }
}
