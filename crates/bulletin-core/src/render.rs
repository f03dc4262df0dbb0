//! Pure rendering of newsletters into view nodes.

use std::fmt;

use chrono::Local;

use crate::model::Newsletter;
use crate::store::ViewEntry;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered representation of one newsletter card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub id: i64,
    pub heading: String,
    pub body: String,
    /// Creation time in the local timezone.
    pub timestamp: String,
    pub fresh: bool,
    pub editing: bool,
}

/// Renders a newsletter as an idle, non-fresh card.
pub fn render(newsletter: &Newsletter) -> ViewNode {
    ViewNode {
        id: newsletter.id,
        heading: newsletter.title.clone(),
        body: newsletter.content.clone(),
        timestamp: newsletter
            .created_at
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        fresh: false,
        editing: false,
    }
}

/// Renders a store entry, showing the draft while an edit is in progress.
pub fn render_entry(entry: &ViewEntry) -> ViewNode {
    let mut node = render(&entry.newsletter);
    node.fresh = entry.fresh;
    if let Some(draft) = &entry.draft {
        node.heading.clone_from(&draft.title);
        node.body.clone_from(&draft.content);
        node.editing = true;
    }
    node
}

impl fmt::Display for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match (self.fresh, self.editing) {
            (_, true) => " [editing]",
            (true, false) => " [new]",
            (false, false) => "",
        };
        writeln!(f, "#{} {}{}", self.id, self.heading, marker)?;
        for line in self.body.lines() {
            writeln!(f, "    {line}")?;
        }
        write!(f, "    {}", self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::NewsletterDraft;
    use crate::store::ViewStore;

    fn sample() -> Newsletter {
        Newsletter {
            id: 3,
            title: "Weekly".to_string(),
            content: "line one\nline two".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        }
    }

    #[test]
    fn test_render_copies_fields_and_formats_local_time() {
        let newsletter = sample();
        let node = render(&newsletter);
        assert_eq!(node.id, 3);
        assert_eq!(node.heading, "Weekly");
        assert_eq!(node.body, "line one\nline two");
        let expected = newsletter
            .created_at
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string();
        assert_eq!(node.timestamp, expected);
        assert!(!node.fresh);
    }

    #[test]
    fn test_render_entry_shows_draft_and_markers() {
        let mut store = ViewStore::new();
        store.insert_front(sample());
        store.begin_edit(3);
        store.set_draft(3, NewsletterDraft::new("Draft", "body"));

        let node = render_entry(store.get(3).unwrap());
        assert!(node.fresh);
        assert!(node.editing);
        assert_eq!(node.heading, "Draft");

        let text = node.to_string();
        assert!(text.starts_with("#3 Draft [editing]"));
        assert!(text.contains("    body"));
    }

    #[test]
    fn test_display_marks_fresh_cards() {
        let mut node = render(&sample());
        node.fresh = true;
        let text = node.to_string();
        assert!(text.starts_with("#3 Weekly [new]\n"));
        assert!(text.contains("    line one\n    line two\n"));
    }
}
