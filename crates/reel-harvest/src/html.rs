//! HTML queries against the site's fixed page structure.
//!
//! Listing pages carry at least two `<table>` elements and the second one
//! holds the content. Detail pages carry a media container holding either
//! a link with a fixed id or an embedded frame.
//!
//! `scraper::Html` is not `Send`, so every function here parses, queries
//! and returns owned data without holding the document across an await.

use crate::error::{HarvestError, HarvestResult};
use scraper::{ElementRef, Html, Selector};

/// Position of the content table among all tables on a page.
pub const CONTENT_TABLE_INDEX: usize = 1;
/// The element wrapping a work's player or media link.
pub const MEDIA_CONTAINER_SELECTOR: &str = "div.ubucontainer";
/// The direct media link inside the container.
pub const MEDIA_LINK_SELECTOR: &str = "a#moviename";
/// Creator biography block inside the content table.
pub const DESCRIPTION_SELECTOR: &str = "div.storycontent p";

/// An `<a>` found in the content table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Trimmed visible text.
    pub text: String,
    /// `None` for anchors without a target; they still occupy a position.
    pub href: Option<String>,
}

/// What the content table of a listing page contains.
#[derive(Debug, Clone, Default)]
pub struct ContentTable {
    /// Anchors in document order.
    pub anchors: Vec<Anchor>,
    /// Paragraphs of the creator biography, joined by blank lines.
    pub description: Option<String>,
    /// All visible text of the table.
    pub text: String,
}

/// Media container state of a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaContainer {
    Missing,
    Present {
        /// `href` of the fixed-id media link.
        link: Option<String>,
        /// `src` of the first embedded frame.
        frame_src: Option<String>,
    },
}

/// Locate the second `<table>` of the page and extract its content.
pub fn extract_content_table(body: &str) -> HarvestResult<ContentTable> {
    let document = Html::parse_document(body);
    let table_sel = Selector::parse("table").unwrap();

    let tables: Vec<ElementRef<'_>> = document.select(&table_sel).collect();
    let table = tables
        .get(CONTENT_TABLE_INDEX)
        .ok_or(HarvestError::NoTableFound {
            found: tables.len(),
        })?;

    Ok(ContentTable {
        anchors: anchors_in(table),
        description: description_in(table),
        text: element_text(table),
    })
}

fn anchors_in(table: &ElementRef<'_>) -> Vec<Anchor> {
    let sel = Selector::parse("a").unwrap();
    table
        .select(&sel)
        .map(|el| Anchor {
            text: element_text(&el),
            href: el.value().attr("href").map(|h| h.trim().to_string()),
        })
        .collect()
}

fn description_in(table: &ElementRef<'_>) -> Option<String> {
    let sel = Selector::parse(DESCRIPTION_SELECTOR).unwrap();
    let paragraphs: Vec<String> = table
        .select(&sel)
        .map(|p| element_text(&p))
        .filter(|t| !t.is_empty())
        .collect();
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

/// Inspect the media container of a raw detail page.
pub fn inspect_media_container(body: &str) -> MediaContainer {
    let document = Html::parse_document(body);
    let container_sel = Selector::parse(MEDIA_CONTAINER_SELECTOR).unwrap();
    let link_sel = Selector::parse(MEDIA_LINK_SELECTOR).unwrap();
    let frame_sel = Selector::parse("iframe").unwrap();

    let Some(container) = document.select(&container_sel).next() else {
        return MediaContainer::Missing;
    };

    let link = container
        .select(&link_sel)
        .find_map(|a| non_empty_attr(&a, "href"));
    let frame_src = container
        .select(&frame_sel)
        .find_map(|f| non_empty_attr(&f, "src"));

    MediaContainer::Present { link, frame_src }
}

/// Find the fixed-id media link anywhere in a (rendered) document.
pub fn find_media_link(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let sel = Selector::parse("#moviename").unwrap();
    document
        .select(&sel)
        .find_map(|a| non_empty_attr(&a, "href"))
}

/// Find the first embedded frame source anywhere in a (rendered) document.
pub fn find_frame_src(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let sel = Selector::parse("iframe").unwrap();
    document
        .select(&sel)
        .find_map(|f| non_empty_attr(&f, "src"))
}

fn non_empty_attr(el: &ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
    <html><body>
      <table><tr><td><a href="nav.html">Navigation</a></td></tr></table>
      <table>
        <tr><td><a href="index.html">  Film  </a></td></tr>
        <tr><td><a href="clarke.html">Shirley
            Clarke</a></td></tr>
        <tr><td><a name="anchor-without-href">skip me</a></td></tr>
        <tr><td><a href="deren.html">Maya Deren</a></td></tr>
        <tr><td><div class="storycontent"><p>First paragraph.</p><p></p><p>Second.</p></div></td></tr>
      </table>
      <table><tr><td><a href="footer.html">Footer</a></td></tr></table>
    </body></html>
    "#;

    #[test]
    fn test_extract_second_table() {
        let table = extract_content_table(LISTING).unwrap();
        let texts: Vec<_> = table.anchors.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["Film", "Shirley Clarke", "skip me", "Maya Deren"]);
        assert_eq!(table.anchors[1].href.as_deref(), Some("clarke.html"));
        assert_eq!(table.anchors[2].href, None);
        assert_eq!(
            table.description.as_deref(),
            Some("First paragraph.\n\nSecond.")
        );
        assert!(table.text.contains("Maya Deren"));
        assert!(!table.text.contains("Navigation"));
    }

    #[test]
    fn test_single_table_is_no_table_found() {
        let html = "<html><body><table><tr><td>only</td></tr></table></body></html>";
        let err = extract_content_table(html).unwrap_err();
        assert!(matches!(err, HarvestError::NoTableFound { found: 1 }));
    }

    #[test]
    fn test_no_tables_at_all() {
        let err = extract_content_table("<p>takedown</p>").unwrap_err();
        assert!(matches!(err, HarvestError::NoTableFound { found: 0 }));
    }

    #[test]
    fn test_media_container_with_static_link() {
        let html = r#"<div class="ubucontainer"><a id="moviename" href="media/a.mp4">A</a></div>"#;
        assert_eq!(
            inspect_media_container(html),
            MediaContainer::Present {
                link: Some("media/a.mp4".into()),
                frame_src: None,
            }
        );
    }

    #[test]
    fn test_media_container_with_frame_only() {
        let html = r#"<div class="ubucontainer"><iframe src="//embed.example/v?m=1"></iframe></div>"#;
        assert_eq!(
            inspect_media_container(html),
            MediaContainer::Present {
                link: None,
                frame_src: Some("//embed.example/v?m=1".into()),
            }
        );
    }

    #[test]
    fn test_media_container_missing() {
        let html = r#"<div class="other"><a id="moviename" href="a.mp4">A</a></div>"#;
        assert_eq!(inspect_media_container(html), MediaContainer::Missing);
    }

    #[test]
    fn test_empty_href_counts_as_absent() {
        let html = r#"<div class="ubucontainer"><a id="moviename" href="  ">A</a></div>"#;
        assert_eq!(
            inspect_media_container(html),
            MediaContainer::Present {
                link: None,
                frame_src: None,
            }
        );
    }

    #[test]
    fn test_find_in_rendered_document() {
        let html = r#"<body><span><a id="moviename" href="media/b.mp4">B</a></span>
                      <iframe src="https://embed.example/x"></iframe></body>"#;
        assert_eq!(find_media_link(html).as_deref(), Some("media/b.mp4"));
        assert_eq!(
            find_frame_src(html).as_deref(),
            Some("https://embed.example/x")
        );
        assert_eq!(find_media_link("<body></body>"), None);
        assert_eq!(find_frame_src("<body></body>"), None);
    }
}
