//! arXiv Atom response parsing.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesStart, Event};
use sift_core::paper::{PaperRecord, split_versioned_id};

use crate::error::FeedError;

/// Per-entry accumulator for XML parsing state.
#[derive(Default)]
struct EntryAccum {
    id: String,
    title: String,
    summary: String,
    published: String,
    updated: String,
    doi: String,
    authors: Vec<String>,
    categories: Vec<String>,
    abs_url: Option<String>,
    pdf_url: Option<String>,
}

impl EntryAccum {
    fn push_text(&mut self, tag: &str, text: &str, in_author: bool) {
        match tag {
            "id" => self.id.push_str(text),
            "title" => self.title.push_str(text),
            "summary" => self.summary.push_str(text),
            "published" => self.published.push_str(text),
            "updated" => self.updated.push_str(text),
            "arxiv:doi" => self.doi.push_str(text),
            "name" if in_author => {
                if let Some(last) = self.authors.last_mut() {
                    last.push_str(text);
                }
            }
            _ => {}
        }
    }

    fn apply_link(&mut self, attrs: Attributes<'_>) {
        let mut href = None;
        let mut title = None;
        let mut rel = None;
        for attr in attrs.flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match attr.key.as_ref() {
                b"href" => href = Some(value),
                b"title" => title = Some(value),
                b"rel" => rel = Some(value),
                _ => {}
            }
        }
        let Some(href) = href else { return };
        if title.as_deref() == Some("pdf") {
            self.pdf_url = Some(href);
        } else if rel.as_deref() == Some("alternate") {
            self.abs_url = Some(href);
        }
    }

    fn apply_category(&mut self, attrs: Attributes<'_>) {
        for attr in attrs.flatten() {
            if attr.key.as_ref() == b"term" {
                if let Ok(term) = attr.unescape_value() {
                    if !self.categories.iter().any(|c| c == term.as_ref()) {
                        self.categories.push(term.into_owned());
                    }
                }
            }
        }
    }

    fn into_paper(self) -> Result<Option<PaperRecord>, FeedError> {
        // The API reports query errors as a single entry under /api/errors.
        if self.id.contains("/api/errors") {
            return Err(FeedError::Api {
                status: 400,
                message: normalize_whitespace(&self.summary),
            });
        }
        if self.id.trim().is_empty() || self.title.trim().is_empty() {
            return Ok(None);
        }
        let Some(published) = parse_timestamp(&self.published) else {
            tracing::warn!(id = %self.id.trim(), published = %self.published, "entry without a usable publication date");
            return Ok(None);
        };
        let (id, version) = split_versioned_id(&self.id);
        let doi = self.doi.trim();

        Ok(Some(PaperRecord {
            abs_url: self
                .abs_url
                .unwrap_or_else(|| format!("https://arxiv.org/abs/{id}")),
            pdf_url: self
                .pdf_url
                .unwrap_or_else(|| format!("https://arxiv.org/pdf/{id}")),
            title: normalize_whitespace(&self.title),
            summary: normalize_whitespace(&self.summary),
            authors: self
                .authors
                .iter()
                .map(|a| normalize_whitespace(a))
                .filter(|a| !a.is_empty())
                .collect(),
            published,
            updated: parse_timestamp(&self.updated),
            categories: self.categories,
            doi: (!doi.is_empty()).then(|| doi.to_string()),
            id,
            version,
        }))
    }
}

/// Atom XML state machine.
#[derive(Default)]
struct AtomParser {
    papers: Vec<PaperRecord>,
    accum: EntryAccum,
    current_tag: String,
    in_entry: bool,
    in_author: bool,
}

impl AtomParser {
    fn handle_start(&mut self, e: &BytesStart<'_>) {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        match tag.as_str() {
            "entry" => {
                self.in_entry = true;
                self.accum = EntryAccum::default();
            }
            "author" if self.in_entry => {
                self.in_author = true;
                self.accum.authors.push(String::new());
            }
            "link" if self.in_entry => self.accum.apply_link(e.attributes()),
            "category" if self.in_entry => self.accum.apply_category(e.attributes()),
            _ if self.in_entry => self.current_tag = tag,
            _ => {}
        }
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>) {
        if !self.in_entry {
            return;
        }
        match e.name().as_ref() {
            b"link" => self.accum.apply_link(e.attributes()),
            b"category" => self.accum.apply_category(e.attributes()),
            _ => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        if self.in_entry && !self.current_tag.is_empty() {
            self.accum.push_text(&self.current_tag, text, self.in_author);
        }
    }

    fn handle_end(&mut self, name: &[u8]) -> Result<(), FeedError> {
        match name {
            b"entry" => {
                let finished = std::mem::take(&mut self.accum);
                if let Some(paper) = finished.into_paper()? {
                    self.papers.push(paper);
                }
                self.in_entry = false;
                self.current_tag.clear();
            }
            b"author" => {
                self.in_author = false;
                if self.accum.authors.last().is_some_and(String::is_empty) {
                    self.accum.authors.pop();
                }
            }
            _ => self.current_tag.clear(),
        }
        Ok(())
    }
}

/// Parse an arXiv Atom response into paper records, in feed order.
///
/// Entries missing an id, a title, or a publication date are skipped.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] for malformed XML or a body that is not an
/// Atom feed, and [`FeedError::Api`] when the feed reports a query error.
pub fn parse_feed(xml: &str) -> Result<Vec<PaperRecord>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut parser = AtomParser::default();
    let mut saw_feed = false;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"feed" {
                    saw_feed = true;
                }
                depth += 1;
                parser.handle_start(e);
            }
            Ok(Event::Empty(ref e)) => parser.handle_empty(e),
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| FeedError::Parse(err.to_string()))?;
                parser.handle_text(&text);
            }
            Ok(Event::CData(ref e)) => {
                parser.handle_text(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                parser.handle_end(e.name().as_ref())?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "XML error at position {}: {e}",
                    reader.error_position()
                )));
            }
        }
    }

    if !saw_feed {
        return Err(FeedError::Parse("response is not an Atom feed".into()));
    }
    if depth != 0 {
        return Err(FeedError::Parse("truncated Atom document".into()));
    }
    Ok(parser.papers)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
