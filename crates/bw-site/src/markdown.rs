//! Markdown to HTML rendering.
//!
//! Wraps `pulldown-cmark` with the option set used for every page on the
//! site: tables, strikethrough, fenced code, smart punctuation, bare URL
//! autolinking, hard line breaks and no intra-word `*` emphasis.

use std::borrow::Cow;
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream};
use regex::Regex;

static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"]+"#).unwrap());

/// Characters dropped from the end of a bare URL match.
const URL_TRAILING: &[char] = &['.', ',', ':', ';', '!', '?', ')', '\''];

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_SMART_PUNCTUATION
}

/// Render Markdown source to an HTML fragment.
#[must_use]
pub fn render_markdown(source: &str) -> String {
    let source = escape_intraword_stars(source);
    let parser = Parser::new_ext(&source, parser_options());
    let events = TextMergeStream::new(parser).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let events = autolink_bare_urls(events);
    let mut html = String::with_capacity(source.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    html
}

/// Escape `*` runs sitting between two alphanumeric characters.
///
/// Fenced code blocks and inline code spans are left untouched.
fn escape_intraword_stars(source: &str) -> Cow<'_, str> {
    if !source.contains('*') {
        return Cow::Borrowed(source);
    }

    let mut out = String::with_capacity(source.len() + 16);
    let mut fence: Option<&str> = None;

    for line in source.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            out.push_str(line);
            continue;
        }
        if let Some(marker) = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m)) {
            fence = Some(marker);
            out.push_str(line);
            continue;
        }
        escape_line(line, &mut out);
    }

    Cow::Owned(out)
}

fn escape_line(line: &str, out: &mut String) {
    let chars: Vec<char> = line.chars().collect();
    let mut in_code = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '`' {
            in_code = !in_code;
        }
        if c != '*' || in_code {
            out.push(c);
            i += 1;
            continue;
        }

        let run_end = chars[i..]
            .iter()
            .position(|&ch| ch != '*')
            .map_or(chars.len(), |n| i + n);
        let before = i.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(run_end).copied();
        let intraword = before.is_some_and(char::is_alphanumeric)
            && after.is_some_and(char::is_alphanumeric);

        for _ in i..run_end {
            if intraword {
                out.push('\\');
            }
            out.push('*');
        }
        i = run_end;
    }
}

/// Wrap bare `http(s)://` URLs in text in autolinks.
///
/// Text inside links, images and code blocks is left alone.
fn autolink_bare_urls<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in events {
        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) => link_depth += 1,
            Event::End(TagEnd::Link | TagEnd::Image) => link_depth = link_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(text) if link_depth == 0 && !in_code_block && BARE_URL_RE.is_match(text) => {
                push_linked_text(text, &mut out);
                continue;
            }
            _ => {}
        }
        out.push(event);
    }

    out
}

fn push_linked_text<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0;

    for m in BARE_URL_RE.find_iter(text) {
        let url = m.as_str().trim_end_matches(URL_TRAILING);
        if !url.split_once("://").is_some_and(|(_, host)| !host.is_empty()) {
            continue;
        }
        let start = m.start();
        if start > last {
            out.push(Event::Text(CowStr::from(text[last..start].to_owned())));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_owned()),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_owned())));
        out.push(Event::End(TagEnd::Link));
        last = start + url.len();
    }

    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_owned())));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_strong() {
        let html = render_markdown("Hello **world**");
        assert!(html.contains("<strong>world</strong>"), "{html}");
    }

    #[test]
    fn test_tables() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"), "{html}");
        assert!(html.contains("<td>1</td>"), "{html}");
    }

    #[test]
    fn test_strikethrough() {
        let html = render_markdown("~~gone~~");
        assert!(html.contains("<del>gone</del>"), "{html}");
    }

    #[test]
    fn test_fenced_code() {
        let html = render_markdown("```go\nfunc main() {}\n```\n");
        assert!(html.contains(r#"<code class="language-go">"#), "{html}");
    }

    #[test]
    fn test_soft_break_becomes_hard_break() {
        let html = render_markdown("line one\nline two");
        assert_eq!(html, "<p>line one<br />\nline two</p>\n");
    }

    #[test]
    fn test_smart_punctuation() {
        let html = render_markdown("\"quoted\"");
        assert!(html.contains('\u{201c}'), "{html}");
        assert!(html.contains('\u{201d}'), "{html}");
    }

    #[test]
    fn test_autolink_bare_url() {
        let html = render_markdown("See https://beego.me/docs. Thanks");
        assert!(
            html.contains(r#"<a href="https://beego.me/docs">https://beego.me/docs</a>. Thanks"#),
            "{html}"
        );
    }

    #[test]
    fn test_autolink_skips_existing_links() {
        let html = render_markdown("[site](https://beego.me) and [https://beego.me](https://beego.me)");
        assert_eq!(html.matches("<a ").count(), 2, "{html}");
    }

    #[test]
    fn test_autolink_skips_code() {
        let html = render_markdown("`https://beego.me`\n\n```\nhttps://beego.me\n```\n");
        assert!(!html.contains("<a "), "{html}");
    }

    #[test]
    fn test_emphasis() {
        let html = render_markdown("*emph*");
        assert!(html.contains("<em>emph</em>"), "{html}");
    }

    #[test]
    fn test_no_intraword_emphasis() {
        let html = render_markdown("foo*bar*baz");
        assert!(!html.contains("<em>"), "{html}");
        assert!(html.contains("foo*bar*baz"), "{html}");
    }

    #[test]
    fn test_no_intraword_strong() {
        let html = render_markdown("a**b**c");
        assert!(!html.contains("<strong>"), "{html}");
    }

    #[test]
    fn test_intraword_stars_kept_in_code() {
        let html = render_markdown("`a*b*c`\n\n```\nx*y*z\n```\n");
        assert!(html.contains("<code>a*b*c</code>"), "{html}");
        assert!(html.contains("x*y*z"), "{html}");
        assert!(!html.contains('\\'), "{html}");
    }

    #[test]
    fn test_escape_intraword_stars_borrowed_without_stars() {
        assert!(matches!(escape_intraword_stars("plain"), Cow::Borrowed("plain")));
    }
}
