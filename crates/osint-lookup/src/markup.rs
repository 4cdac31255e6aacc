//! Minimal HTML element scanning.
//!
//! The portals serve server-rendered JSF and PHP pages. The adapters only
//! need to locate elements by tag, id, or class and read their text, so
//! elements are matched by scanning tag tokens and balancing open and close
//! tags of the same name.

use crate::text::{collapse_ws, unescape};

static_regex!(
    tag_re,
    r#"(?s)<(/?)([A-Za-z][A-Za-z0-9:_-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#
);
static_regex!(
    attr_re,
    r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#
);
static_regex!(any_tag_re, r#"(?s)<(?:[^>"']|"[^"]*"|'[^']*')*>"#);

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// One element located in a document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element<'a> {
    name: &'a str,
    attrs: &'a str,
    /// Markup between the start and end tags.
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    /// Tag name as written.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Decoded value of attribute `name`. Boolean attributes yield `""`.
    pub fn attr(&self, name: &str) -> Option<String> {
        attr_value(self.attrs, name)
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    /// Whether the `class` attribute lists `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Visible text with whitespace collapsed.
    pub fn text(&self) -> String {
        text(self.inner)
    }
}

fn attr_value(attrs: &str, name: &str) -> Option<String> {
    attr_re().captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let raw = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        Some(unescape(raw))
    })
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_self_closing(attrs: &str) -> bool {
    attrs.trim_end().ends_with('/')
}

/// Find where the element opened just before `from` ends. Returns
/// `(inner_end, outer_end)`; an unclosed element runs to the end of input.
fn close_of(html: &str, name: &str, from: usize) -> (usize, usize) {
    let mut depth = 1usize;
    for caps in tag_re().captures_iter(&html[from..]) {
        let (Some(whole), Some(slash), Some(tag), Some(attrs)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        if !tag.as_str().eq_ignore_ascii_case(name) {
            continue;
        }
        if slash.as_str().is_empty() {
            if !is_self_closing(attrs.as_str()) {
                depth += 1;
            }
        } else {
            depth -= 1;
            if depth == 0 {
                return (from + whole.start(), from + whole.end());
            }
        }
    }
    (html.len(), html.len())
}

/// Scan start tags, yielding each element matching `pred`. With `nested`
/// false, scanning resumes after the end of each match.
fn scan<'a>(
    html: &'a str,
    nested: bool,
    mut pred: impl FnMut(&str, &str) -> bool,
) -> Vec<Element<'a>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < html.len() {
        let Some(caps) = tag_re().captures(&html[pos..]) else {
            break;
        };
        let (Some(whole), Some(slash), Some(tag), Some(attrs)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            break;
        };
        let start_end = pos + whole.end();
        let name = &html[pos + tag.start()..pos + tag.end()];
        let attrs_str = &html[pos + attrs.start()..pos + attrs.end()];

        if !slash.as_str().is_empty() || !pred(name, attrs_str) {
            pos = start_end;
            continue;
        }

        if is_void(name) || is_self_closing(attrs_str) {
            out.push(Element {
                name,
                attrs: attrs_str,
                inner: "",
            });
            pos = start_end;
            continue;
        }

        let (inner_end, outer_end) = close_of(html, name, start_end);
        out.push(Element {
            name,
            attrs: attrs_str,
            inner: &html[start_end..inner_end],
        });
        pos = if nested { start_end } else { outer_end };
    }
    out
}

/// Every `<tag>` element, nested ones included, in document order.
pub(crate) fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    scan(html, true, |name, _| name.eq_ignore_ascii_case(tag))
}

/// `<tag>` elements not contained in another `<tag>` element.
pub(crate) fn top_level<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    scan(html, false, |name, _| name.eq_ignore_ascii_case(tag))
}

/// First element satisfying `pred(tag_name, element)`.
pub(crate) fn find<'a>(
    html: &'a str,
    mut pred: impl FnMut(&str, &Element<'_>) -> bool,
) -> Option<Element<'a>> {
    let mut found = None;
    scan(html, true, |name, attrs| {
        if found.is_some() {
            return false;
        }
        let candidate = Element {
            name,
            attrs,
            inner: "",
        };
        if pred(candidate.name(), &candidate) {
            found = Some(());
            true
        } else {
            false
        }
    })
    .into_iter()
    .next()
}

/// Element whose `id` is exactly `id`.
pub(crate) fn by_id<'a>(html: &'a str, id: &str) -> Option<Element<'a>> {
    find(html, |_, el| el.id().as_deref() == Some(id))
}

/// First `<tag>` element whose `id` ends with `suffix`. JSF prefixes ids
/// with generated container names, so suffixes are the stable part.
pub(crate) fn by_id_suffix<'a>(html: &'a str, tag: &str, suffix: &str) -> Option<Element<'a>> {
    find(html, |name, el| {
        name.eq_ignore_ascii_case(tag) && el.id().is_some_and(|id| id.ends_with(suffix))
    })
}

/// Visible text of a fragment, whitespace collapsed.
pub(crate) fn text(html: &str) -> String {
    collapse_ws(&unescape(&any_tag_re().replace_all(html, " ")))
}

/// Visible text with one line per tag boundary, blank lines dropped.
pub(crate) fn text_lines(html: &str) -> Vec<String> {
    let raw = unescape(&any_tag_re().replace_all(html, "\n"));
    raw.lines()
        .map(collapse_ws)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Cell texts of every row in a table fragment, header cells included.
pub(crate) fn table_rows(table_inner: &str) -> Vec<Vec<String>> {
    elements(table_inner, "tr")
        .iter()
        .map(|tr| {
            scan(tr.inner, false, |name, _| {
                name.eq_ignore_ascii_case("td") || name.eq_ignore_ascii_case("th")
            })
            .iter()
            .map(Element::text)
            .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}
