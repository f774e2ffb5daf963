use regex::{Regex, RegexBuilder};

/// Case-insensitive literal matcher for the active search term.
pub fn build_highlight_regex(needle: &str) -> Option<Regex> {
    if needle.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into `(segment, is_match)` runs.
pub fn split_matches<'t>(text: &'t str, regex: Option<&Regex>) -> Vec<(&'t str, bool)> {
    let Some(re) = regex else {
        return vec![(text, false)];
    };
    let mut segments = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            segments.push((&text[last..mat.start()], false));
        }
        segments.push((mat.as_str(), true));
        last = mat.end();
    }
    if last < text.len() {
        segments.push((&text[last..], false));
    }
    if segments.is_empty() {
        segments.push((text, false));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignore_case() {
        let regex = build_highlight_regex("note").expect("regex");
        let segments = split_matches("My Notebook notes", Some(&regex));
        assert_eq!(
            segments,
            vec![
                ("My ", false),
                ("Note", true),
                ("book ", false),
                ("note", true),
                ("s", false)
            ]
        );
    }

    #[test]
    fn metacharacters_are_literal() {
        let regex = build_highlight_regex("a+b").expect("regex");
        assert!(regex.is_match("x A+B y"));
        assert!(!regex.is_match("aab"));
        assert!(build_highlight_regex("").is_none());
    }
}
