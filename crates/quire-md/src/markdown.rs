//! Markdown to HTML rendering.

use std::collections::HashSet;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render Markdown to HTML.
///
/// Headings without an explicit `{#id}` get an anchor derived from their text.
pub fn render_markdown(content: &str) -> String {
    let mut events: Vec<Event<'_>> = Parser::new_ext(content, options()).collect();
    anchor_headings(&mut events);

    let mut html_output = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut html_output, events.into_iter());

    html_output
}

/// List the headings of a Markdown document with the anchors
/// [`render_markdown`] gives them.
pub fn table_of_contents(content: &str) -> Vec<TocEntry> {
    let mut events: Vec<Event<'_>> = Parser::new_ext(content, options()).collect();
    anchor_headings(&mut events)
}

/// Assign an id to every heading and return them in document order.
///
/// Explicit ids are reserved up front, so generated ids never reuse one.
fn anchor_headings(events: &mut [Event<'_>]) -> Vec<TocEntry> {
    let mut seen: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();
    let mut toc = Vec::new();

    for i in 0..events.len() {
        let (level, explicit) = match &events[i] {
            Event::Start(Tag::Heading { level, id, .. }) => {
                (*level as u8, id.as_ref().map(|id| id.to_string()))
            }
            _ => continue,
        };

        let title = heading_text(&events[i + 1..]);
        let id = match explicit {
            Some(id) => id,
            None => unique_id(&mut seen, slugify(&title)),
        };

        if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
            *slot = Some(CowStr::from(id.clone()));
        }

        toc.push(TocEntry { title, id, level });
    }

    toc
}

/// Concatenate the text of a heading up to its closing tag.
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

fn unique_id(seen: &mut HashSet<String>, slug: String) -> String {
    let slug = if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    };

    let mut id = slug.clone();
    let mut suffix = 1;
    while seen.contains(&id) {
        id = format!("{}-{}", slug, suffix);
        suffix += 1;
    }
    seen.insert(id.clone());

    id
}

/// Convert a heading to a URL-safe slug.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
