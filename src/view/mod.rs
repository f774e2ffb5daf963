use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use unicode_segmentation::UnicodeSegmentation;

use crate::highlight::build_highlight_regex;
use crate::model::{Note, NoteId};

mod markup;
mod selection;

pub use markup::{
    markup_from_source, plain_text, source_from_markup, styled_lines, InlineMark, InlineStyle,
    StyledRun,
};
pub use selection::Selection;

pub const LOCKED_PREVIEW: &str = "Content is locked.";
pub const HANDWRITING_PREVIEW: &str = "[Handwriting note]";
pub const DEFAULT_PREVIEW_CHARS: usize = 50;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SortOrder {
    #[default]
    Latest,
    Oldest,
    MostViewed,
}

impl SortOrder {
    pub fn next(self) -> Self {
        match self {
            SortOrder::Latest => SortOrder::Oldest,
            SortOrder::Oldest => SortOrder::MostViewed,
            SortOrder::MostViewed => SortOrder::Latest,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Latest => "Latest",
            SortOrder::Oldest => "Oldest",
            SortOrder::MostViewed => "Most viewed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub sort: SortOrder,
    pub favorites_only: bool,
    /// Case-insensitive substring matched against titles only.
    pub search: String,
}

impl ViewQuery {
    pub fn has_filters(&self) -> bool {
        self.favorites_only || !self.search.trim().is_empty()
    }
}

/// One displayed row.
#[derive(Debug, Clone, Copy)]
pub struct NoteView<'a> {
    pub note: &'a Note,
    pub id: NoteId,
    /// Position in the unsorted collection.
    pub original_index: usize,
    pub locked_for_display: bool,
}

impl NoteView<'_> {
    pub fn display_title(&self) -> String {
        let mut title = if self.locked_for_display {
            format!("🔒 {}", self.note.title)
        } else {
            self.note.title.clone()
        };
        if self.note.has_attachments() {
            title.push_str(" 📎");
        }
        title
    }

    pub fn preview(&self, max_chars: usize) -> String {
        if self.locked_for_display {
            LOCKED_PREVIEW.to_string()
        } else if self.note.is_handwriting() {
            HANDWRITING_PREVIEW.to_string()
        } else {
            text_preview(&self.note.content, max_chars)
        }
    }
}

/// Sorts, filters and annotates the collection for display.
///
/// Stages run in a fixed order: sort, favorites filter, title search.
pub fn project<'a>(notes: &'a [Note], query: &ViewQuery, unlocked: bool) -> Vec<NoteView<'a>> {
    let mut ordered: Vec<(usize, &Note)> = notes.iter().enumerate().collect();
    match query.sort {
        SortOrder::Latest => ordered.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at)),
        SortOrder::Oldest => ordered.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at)),
        SortOrder::MostViewed => ordered.sort_by(|a, b| b.1.view_count.cmp(&a.1.view_count)),
    }

    // Same matcher the list uses for highlighting, so rows and marks agree.
    let matcher = build_highlight_regex(&query.search);
    ordered
        .into_iter()
        .filter(|(_, note)| !query.favorites_only || note.is_favorite)
        .filter(|(_, note)| matcher.as_ref().map_or(true, |re| re.is_match(&note.title)))
        .map(|(original_index, note)| NoteView {
            note,
            id: note.id,
            original_index,
            locked_for_display: note.is_locked && !unlocked,
        })
        .collect()
}

/// First `max_chars` characters of the note's text, with `...` when cut.
pub fn text_preview(markup: &str, max_chars: usize) -> String {
    let text = plain_text(markup)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_chars {
        return text;
    }
    let mut preview: String = graphemes[..max_chars].concat();
    preview.push_str("...");
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attachment, NoteKind, Template};
    use time::{Duration, OffsetDateTime};

    fn note(title: &str, age_days: i64, views: u64, favorite: bool) -> Note {
        Note {
            id: NoteId::new(),
            title: title.to_string(),
            kind: NoteKind::Text,
            template: Template::Basic,
            content: format!("<p>{title} body</p>"),
            attachments: Vec::new(),
            is_favorite: favorite,
            is_locked: false,
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::days(1000 - age_days),
            view_count: views,
        }
    }

    fn titles(rows: &[NoteView<'_>]) -> Vec<String> {
        rows.iter().map(|row| row.note.title.clone()).collect()
    }

    #[test]
    fn sorts_by_creation_and_views() {
        let notes = vec![
            note("middle", 5, 1, false),
            note("newest", 1, 0, false),
            note("oldest", 9, 7, false),
        ];
        let mut query = ViewQuery::default();
        assert_eq!(
            titles(&project(&notes, &query, false)),
            vec!["newest", "middle", "oldest"]
        );
        query.sort = SortOrder::Oldest;
        assert_eq!(
            titles(&project(&notes, &query, false)),
            vec!["oldest", "middle", "newest"]
        );
        query.sort = SortOrder::MostViewed;
        assert_eq!(
            titles(&project(&notes, &query, false)),
            vec!["oldest", "middle", "newest"]
        );
    }

    #[test]
    fn rows_carry_original_index() {
        let notes = vec![note("b", 5, 0, false), note("a", 1, 0, false)];
        let rows = project(&notes, &ViewQuery::default(), false);
        assert_eq!(rows[0].original_index, 1);
        assert_eq!(rows[0].id, notes[1].id);
        assert_eq!(rows[1].original_index, 0);
    }

    #[test]
    fn value_identical_notes_keep_distinct_indices() {
        let first = note("twin", 3, 0, false);
        let mut second = first.clone();
        second.id = NoteId::new();
        let notes = vec![first, second];
        let rows = project(&notes, &ViewQuery::default(), false);
        let mut indices: Vec<usize> = rows.iter().map(|row| row.original_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn favorites_and_search_compose() {
        let notes = vec![note("Alpha", 1, 0, true), note("Beta", 2, 0, false)];
        let mut query = ViewQuery {
            favorites_only: true,
            search: "Alpha".into(),
            ..ViewQuery::default()
        };
        assert_eq!(titles(&project(&notes, &query, false)), vec!["Alpha"]);
        query.search = "Beta".into();
        assert!(project(&notes, &query, false).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_and_title_only() {
        let mut notes = vec![note("Weekly Plan", 1, 0, false)];
        notes[0].content = "<p>groceries</p>".into();
        let mut query = ViewQuery {
            search: "weekly".into(),
            ..ViewQuery::default()
        };
        assert_eq!(project(&notes, &query, false).len(), 1);
        query.search = "groceries".into();
        assert!(project(&notes, &query, false).is_empty());
    }

    #[test]
    fn search_filter_agrees_with_highlighting() {
        let notes = vec![
            note("ſtory", 1, 0, false),
            note("Straße", 2, 0, false),
            note("Plain", 3, 0, false),
        ];
        let query = ViewQuery {
            search: "s".into(),
            ..ViewQuery::default()
        };
        let regex = build_highlight_regex(&query.search);
        let highlighted: Vec<String> = notes
            .iter()
            .filter(|note| {
                crate::highlight::split_matches(&note.title, regex.as_ref())
                    .iter()
                    .any(|(_, hit)| *hit)
            })
            .map(|note| note.title.clone())
            .collect();
        let rows = titles(&project(&notes, &query, false));
        assert_eq!(rows, highlighted);
        assert_eq!(rows, vec!["ſtory", "Straße"]);
    }

    #[test]
    fn locked_notes_are_redacted_until_unlocked() {
        let mut notes = vec![note("Diary", 1, 0, false)];
        notes[0].is_locked = true;
        notes[0]
            .attachments
            .push(Attachment::new("a.png", "image/png", b"x"));

        let rows = project(&notes, &ViewQuery::default(), false);
        assert!(rows[0].locked_for_display);
        assert_eq!(rows[0].display_title(), "🔒 Diary 📎");
        assert_eq!(rows[0].preview(50), LOCKED_PREVIEW);

        let rows = project(&notes, &ViewQuery::default(), true);
        assert!(!rows[0].locked_for_display);
        assert_eq!(rows[0].preview(50), "Diary body");
    }

    #[test]
    fn previews_strip_markup_and_truncate() {
        assert_eq!(
            text_preview("<b>Tom &amp; Jerry</b><br>again", 50),
            "Tom & Jerry again"
        );
        let long = "x".repeat(60);
        let preview = text_preview(&long, 50);
        assert_eq!(preview.len(), 53);
        assert!(preview.ends_with("..."));

        let mut sketch = note("sketch", 1, 0, false);
        sketch.kind = NoteKind::Handwriting;
        let notes = vec![sketch];
        let rows = project(&notes, &ViewQuery::default(), false);
        assert_eq!(rows[0].preview(50), HANDWRITING_PREVIEW);
    }
}
