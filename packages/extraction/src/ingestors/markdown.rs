//! HTML to markdown normalizer built on `htmd`.

use std::sync::LazyLock;

use htmd::{Element, HtmlToMarkdown};
use regex::Regex;
use scraper::Html;
use tracing::warn;

use crate::traits::fetcher::Normalizer;

const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "head"];

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)[*+-][ \t]+").unwrap());
static TRAILING_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static MULTI_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Converts page markup to readable markdown.
///
/// Scripts, styles, `noscript` and `head` are dropped. Links keep their text
/// and lose their target. Headings use `#`, bullets use `-`, table rows become
/// `| cell | cell |` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownNormalizer;

impl MarkdownNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn converter() -> HtmlToMarkdown {
        HtmlToMarkdown::builder()
            .skip_tags(SKIPPED_TAGS.to_vec())
            .add_handler(vec!["a"], |el: Element| Some(el.content.to_string()))
            .add_handler(vec!["h1", "h2", "h3", "h4", "h5", "h6"], |el: Element| {
                let level: usize = el.tag[1..].parse().unwrap_or(1);
                Some(format!("\n\n{} {}\n\n", "#".repeat(level), el.content.trim()))
            })
            .add_handler(vec!["td", "th"], |el: Element| {
                Some(format!(" {} |", el.content.trim()))
            })
            .add_handler(vec!["tr"], |el: Element| {
                Some(format!("\n|{}\n", el.content.trim_end()))
            })
            .add_handler(vec!["thead", "tbody", "tfoot"], |el: Element| {
                Some(el.content.to_string())
            })
            .add_handler(vec!["table"], |el: Element| {
                Some(format!("\n\n{}\n\n", el.content.trim()))
            })
            .build()
    }
}

impl Normalizer for MarkdownNormalizer {
    fn normalize(&self, markup: &str) -> String {
        let markdown = Self::converter().convert(markup).unwrap_or_else(|e| {
            warn!(error = %e, "Markdown conversion failed, falling back to plain text");
            Html::parse_document(markup)
                .root_element()
                .text()
                .collect::<String>()
        });

        let text = markdown.replace('\u{a0}', " ");
        let text = LIST_MARKER.replace_all(&text, "$1- ");
        let text = TRAILING_SPACE.replace_all(&text, "\n");
        let text = MULTI_NEWLINE.replace_all(&text, "\n\n");

        text.trim().to_string()
    }
}
