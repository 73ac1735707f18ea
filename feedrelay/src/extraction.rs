//! Heuristic RSS/Atom item extraction.
//!
//! This is not a validating XML parser. The document is sniffed for its dialect and entry
//! blocks are located with non-greedy, case-insensitive patterns. Malformed markup degrades
//! to empty fields or fewer items, never to an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// One normalized feed entry. Absent fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub date: String,
}

/// Feed dialect as decided by [`sniff_dialect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Atom,
    Rss,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Atom => f.write_str("atom"),
            Dialect::Rss => f.write_str("rss"),
        }
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("extraction patterns are valid literals")
}

static ATOM_ROOT: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)<feed[\s>]"));
static ATOM_ENTRY: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<entry\b.*?</entry>"));
static RSS_ITEM: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<item\b.*?</item>"));

static TITLE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<title[^>]*>(.*?)</title>"));
static ATOM_LINK: LazyLock<Regex> = LazyLock::new(|| pattern(r#"(?i)<link[^>]*href="([^"]+)""#));
static UPDATED: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<updated[^>]*>(.*?)</updated>"));
static PUBLISHED: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?is)<published[^>]*>(.*?)</published>"));

static RSS_LINK: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<link[^>]*>(.*?)</link>"));
static GUID: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<guid[^>]*>(.*?)</guid>"));
static PUB_DATE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<pubDate[^>]*>(.*?)</pubDate>"));
static DC_DATE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<dc:date[^>]*>(.*?)</dc:date>"));

static CDATA_MARKER: LazyLock<Regex> = LazyLock::new(|| pattern(r"<!\[CDATA\[|\]\]>"));

/// Atom if the text has a `<feed` opening tag anywhere, RSS otherwise.
pub fn sniff_dialect(xml: &str) -> Dialect {
    if ATOM_ROOT.is_match(xml) {
        Dialect::Atom
    } else {
        Dialect::Rss
    }
}

/// Extract every entry in document order, then keep the first `limit`.
pub fn extract(xml: &str, limit: usize) -> Vec<FeedItem> {
    let mut items = match sniff_dialect(xml) {
        Dialect::Atom => extract_atom(xml),
        Dialect::Rss => extract_rss(xml),
    };
    items.truncate(limit);
    items
}

fn extract_atom(xml: &str) -> Vec<FeedItem> {
    ATOM_ENTRY
        .find_iter(xml)
        .map(|m| {
            let block = m.as_str();
            FeedItem {
                title: pick(block, &TITLE),
                link: pick(block, &ATOM_LINK),
                date: pick_or(block, &UPDATED, &PUBLISHED),
            }
        })
        .collect()
}

fn extract_rss(xml: &str) -> Vec<FeedItem> {
    RSS_ITEM
        .find_iter(xml)
        .map(|m| {
            let block = m.as_str();
            FeedItem {
                title: pick(block, &TITLE),
                link: pick_or(block, &RSS_LINK, &GUID),
                date: pick_or(block, &PUB_DATE, &DC_DATE),
            }
        })
        .collect()
}

/// First capture of `re` in `block`, CDATA-unwrapped and trimmed; empty on miss.
fn pick(block: &str, re: &Regex) -> String {
    re.captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize(m.as_str()))
        .unwrap_or_default()
}

/// `primary` unless it comes back empty, then `fallback`.
fn pick_or(block: &str, primary: &Regex, fallback: &Regex) -> String {
    let value = pick(block, primary);
    if value.is_empty() {
        pick(block, fallback)
    } else {
        value
    }
}

fn normalize(raw: &str) -> String {
    CDATA_MARKER.replace_all(raw, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Security headlines</title>
  <link rel="self" href="https://example.org/feed.atom"/>
  <entry>
    <title type="html">First</title>
    <link rel="alternate" type="text/html" href="https://example.org/1"/>
    <updated>2024-01-02T10:00:00Z</updated>
    <published>2024-01-01T10:00:00Z</published>
  </entry>
  <entry>
    <title>Second</title>
    <link href="https://example.org/2"/>
    <published>2024-01-01T00:00:00Z</published>
  </entry>
</feed>"#;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Tech</title>
    <link>https://example.com</link>
    <item>
      <title><![CDATA[Hello & Goodbye]]></title>
      <link>https://example.com/a</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Guid only</title>
      <link></link>
      <guid isPermaLink="true">https://x/1</guid>
      <dc:date>2024-01-03T00:00:00Z</dc:date>
    </item>
    <ITEM><title>Foo</title></ITEM>
  </channel>
</rss>"#;

    #[test]
    fn sniffs_dialect() {
        assert_eq!(sniff_dialect(ATOM), Dialect::Atom);
        assert_eq!(sniff_dialect(RSS), Dialect::Rss);
        assert_eq!(sniff_dialect("<FEED>"), Dialect::Atom);
        // `<feeds>` or `<feedburner:...>` are not an Atom root
        assert_eq!(sniff_dialect("<feeds><feedburner:info/></feeds>"), Dialect::Rss);
    }

    #[test]
    fn atom_entries_in_document_order() {
        let items = extract(ATOM, 10);
        assert_eq!(
            items,
            vec![
                FeedItem {
                    title: "First".into(),
                    link: "https://example.org/1".into(),
                    date: "2024-01-02T10:00:00Z".into(),
                },
                FeedItem {
                    title: "Second".into(),
                    link: "https://example.org/2".into(),
                    date: "2024-01-01T00:00:00Z".into(),
                },
            ]
        );
    }

    #[test]
    fn rss_items_with_fallbacks() {
        let items = extract(RSS, 10);
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title, "Hello & Goodbye");
        assert_eq!(items[0].link, "https://example.com/a");
        assert_eq!(items[0].date, "Mon, 01 Jan 2024 00:00:00 GMT");

        assert_eq!(items[1].link, "https://x/1");
        assert_eq!(items[1].date, "2024-01-03T00:00:00Z");

        assert_eq!(
            items[2],
            FeedItem {
                title: "Foo".into(),
                link: String::new(),
                date: String::new(),
            }
        );
    }

    #[test]
    fn stray_entry_text_without_feed_root_goes_through_rss_path() {
        let xml = "<rss><channel><entry><title>Nope</title></entry>\
                   <item><title>Yes</title></item></channel></rss>";
        let items = extract(xml, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Yes");
    }

    #[test]
    fn atom_link_skips_links_without_href() {
        let xml = r#"<feed><entry><title>t</title><link rel="x"/><link href="https://a/b"/></entry></feed>"#;
        // the href-less <link> is skipped, not reported as empty
        let items = extract(xml, 10);
        assert_eq!(items[0].link, "https://a/b");
    }

    #[test]
    fn whitespace_only_cdata_falls_back() {
        let xml = "<rss><item><link><![CDATA[  ]]></link><guid>g-1</guid></item></rss>";
        let items = extract(xml, 10);
        assert_eq!(items[0].link, "g-1");
    }

    #[test]
    fn truncates_to_prefix() {
        let mut xml = String::from("<rss><channel>");
        for i in 0..20 {
            xml.push_str(&format!("<item><title>n{i}</title></item>"));
        }
        xml.push_str("</channel></rss>");

        let items = extract(&xml, 6);
        assert_eq!(items.len(), 6);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["n0", "n1", "n2", "n3", "n4", "n5"]);

        assert_eq!(extract(&xml, 0).len(), 0);
        assert_eq!(extract(&xml, 50).len(), 20);
    }

    #[test]
    fn no_entries_or_garbage_yields_empty() {
        assert!(extract("<feed></feed>", 6).is_empty());
        assert!(extract("<rss><channel></channel></rss>", 6).is_empty());
        assert!(extract("<html><body>502 Bad Gateway</body></html>", 6).is_empty());
        assert!(extract("", 6).is_empty());
    }

    #[test]
    fn multiline_fields_are_trimmed() {
        let xml = "<feed>\n<entry>\n  <title>\n    Spread\n  </title>\n</entry>\n</feed>";
        let items = extract(xml, 6);
        assert_eq!(items[0].title, "Spread");
    }
}
