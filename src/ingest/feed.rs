// src/ingest/feed.rs
//! RSS / Atom parsing into a flat entry shape, on the quick-xml event reader.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::SourceFetchError;
use crate::ingest::normalize_text;

/// One feed entry after markup removal. Nothing is validated yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

impl FeedKind {
    /// `<rss>` and RSS 1.0 `<rdf:RDF>` read the same way; `<feed>` is Atom.
    fn from_root(name: &[u8]) -> Result<Self, SourceFetchError> {
        match local(name) {
            b"rss" | b"RDF" => Ok(FeedKind::Rss),
            b"feed" => Ok(FeedKind::Atom),
            other => Err(SourceFetchError::Parse(format!(
                "unsupported root element <{}>",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn entry_tag(self) -> &'static [u8] {
        match self {
            FeedKind::Rss => b"item",
            FeedKind::Atom => b"entry",
        }
    }

    /// Entry child elements we read. Any other name, including extension
    /// namespaces such as `media:` or `atom:`, is skipped.
    fn field(self, name: &[u8]) -> Option<Field> {
        match (self, name) {
            (_, b"title") => Some(Field::Title),
            (FeedKind::Rss, b"guid") => Some(Field::Id),
            (FeedKind::Rss, b"link") => Some(Field::Link),
            (FeedKind::Rss, b"description") => Some(Field::Summary),
            (FeedKind::Rss, b"content:encoded") => Some(Field::Content),
            (FeedKind::Rss, b"pubDate") => Some(Field::Published),
            (FeedKind::Rss, b"dc:date") => Some(Field::Updated),
            (FeedKind::Atom, b"id") => Some(Field::Id),
            (FeedKind::Atom, b"summary") => Some(Field::Summary),
            (FeedKind::Atom, b"content") => Some(Field::Content),
            (FeedKind::Atom, b"published") => Some(Field::Published),
            (FeedKind::Atom, b"updated") => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
}

/// Raw text collected for one `<item>` / `<entry>`. The first occurrence of
/// a repeated element wins.
#[derive(Debug, Default)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    link: Option<String>,
    /// Atom `<link rel href>` pairs.
    links: Vec<(Option<String>, String)>,
    summary: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl RawEntry {
    fn slot(&mut self, f: Field) -> &mut Option<String> {
        match f {
            Field::Id => &mut self.id,
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        }
    }

    fn push_link(&mut self, e: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"href" => href = Some(decode_entities(&attr.value)),
                b"rel" => rel = Some(decode_entities(&attr.value)),
                _ => {}
            }
        }
        if let Some(h) = href {
            self.links.push((rel, h));
        }
    }

    fn finish(self) -> FeedEntry {
        let alternate = self
            .links
            .iter()
            .find(|(rel, _)| rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| self.links.first())
            .map(|(_, href)| href.clone());

        // guid / id first, link as fallback.
        let id = self
            .id
            .and_then(non_empty)
            .or_else(|| self.link.and_then(non_empty))
            .or_else(|| alternate.and_then(non_empty));

        FeedEntry {
            id,
            title: self.title.map(|t| normalize_text(&t)).unwrap_or_default(),
            body: plain(self.summary).or_else(|| plain(self.content)),
            published: self
                .published
                .as_deref()
                .and_then(parse_feed_date)
                .or_else(|| self.updated.as_deref().and_then(parse_feed_date)),
        }
    }
}

/// Parse an RSS 2.0, RSS 1.0 or Atom document.
///
/// Unknown and namespaced elements are skipped, so extension markup inside an
/// entry does not cost the whole feed. Text is decoded against the full HTML
/// entity table. Only malformed XML fails the document.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, SourceFetchError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();

    let mut kind: Option<FeedKind> = None;
    let mut stack: Vec<Vec<u8>> = Vec::new();
    // Stack depth of the open entry element, and its collected fields.
    let mut entry: Option<(usize, RawEntry)> = None;
    let mut field: Option<(Field, String)> = None;
    let mut out = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            SourceFetchError::Parse(format!("xml at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                let k = match kind {
                    Some(k) => k,
                    None => *kind.insert(FeedKind::from_root(&name)?),
                };
                let depth = stack.len();
                match entry.as_mut() {
                    None if name == k.entry_tag() => {
                        entry = Some((depth, RawEntry::default()));
                    }
                    Some((entry_depth, raw)) if depth == *entry_depth + 1 => {
                        if k == FeedKind::Atom && name == b"link" {
                            raw.push_link(&e);
                        }
                        field = k
                            .field(&name)
                            .filter(|f| raw.slot(*f).is_none())
                            .map(|f| (f, String::new()));
                    }
                    Some(_) => {
                        if let Some((_, text)) = field.as_mut() {
                            text.push(' ');
                        }
                    }
                    None => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if kind.is_none() {
                    kind = Some(FeedKind::from_root(e.name().as_ref())?);
                }
                if let Some((entry_depth, raw)) = entry.as_mut() {
                    if stack.len() == *entry_depth + 1
                        && kind == Some(FeedKind::Atom)
                        && e.name().as_ref() == b"link"
                    {
                        raw.push_link(&e);
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
                let depth = stack.len();
                match entry.as_ref().map(|(d, _)| *d) {
                    Some(d) if depth == d => {
                        if let Some((_, raw)) = entry.take() {
                            out.push(raw.finish());
                        }
                    }
                    Some(d) if depth == d + 1 => {
                        if let (Some((f, text)), Some((_, raw))) = (field.take(), entry.as_mut()) {
                            *raw.slot(f) = Some(text);
                        }
                    }
                    Some(_) => {
                        if let Some((_, text)) = field.as_mut() {
                            text.push(' ');
                        }
                    }
                    None => {}
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&decode_entities(&t));
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(SourceFetchError::Parse(format!(
            "document ended inside <{}>",
            String::from_utf8_lossy(stack.last().map_or(&[][..], |n| n.as_slice()))
        )));
    }
    if kind.is_none() {
        return Err(SourceFetchError::Parse("no root element".into()));
    }
    Ok(out)
}

fn local(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Decode XML and HTML named entities. Unknown ones are left as written.
fn decode_entities(raw: &[u8]) -> String {
    html_escape::decode_html_entities(&String::from_utf8_lossy(raw)).into_owned()
}

fn plain(s: Option<String>) -> Option<String> {
    s.map(|s| normalize_text(&s)).and_then(non_empty)
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom); anything else goes through the lenient
/// ISO-8601 parser, which treats zone-less values as UTC.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        .or_else(|| DateTime::parse_from_rfc2822(s).ok().map(|d| d.with_timezone(&Utc)))
        .or_else(|| crate::model::parse_utc_timestamp(s))
}
