/// Maximum number of department names shown next to a person.
pub const MAX_AFFILIATIONS: usize = 2;

/// Keep the first `limit` distinct names, preserving input order.
///
/// Input is expected newest first, so the result is the most recent
/// distinct affiliations.
///
/// # Examples
/// ```
/// use pubregistry::utils::most_recent_distinct;
///
/// let names = ["Physics", "Physics", "Chemistry", "Biology"].map(String::from);
/// assert_eq!(most_recent_distinct(names, 2), vec!["Physics", "Chemistry"]);
/// ```
pub fn most_recent_distinct<I>(names: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut distinct: Vec<String> = Vec::with_capacity(limit);
    for name in names {
        if distinct.len() == limit {
            break;
        }
        if !distinct.contains(&name) {
            distinct.push(name);
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty() {
        assert!(most_recent_distinct(Vec::new(), MAX_AFFILIATIONS).is_empty());
    }

    #[test]
    fn test_fewer_than_limit() {
        assert_eq!(
            most_recent_distinct(names(&["Physics", "Physics"]), MAX_AFFILIATIONS),
            names(&["Physics"])
        );
    }

    #[test]
    fn test_truncates_after_dedup() {
        assert_eq!(
            most_recent_distinct(
                names(&["Chemistry", "Chemistry", "Physics", "Chemistry", "Biology"]),
                MAX_AFFILIATIONS
            ),
            names(&["Chemistry", "Physics"])
        );
    }

    #[test]
    fn test_zero_limit() {
        assert!(most_recent_distinct(names(&["Physics"]), 0).is_empty());
    }
}
