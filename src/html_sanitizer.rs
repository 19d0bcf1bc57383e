use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use url::Url;

/// Elements kept as-is (after attribute cleaning).
const ALLOWED_ELEMENTS: &[&str] = &[
    "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "strong", "b", "em", "i", "u", "s",
    "sub", "sup", "code", "pre", "blockquote", "a", "ul", "ol", "li", "img", "figure",
    "figcaption", "table", "thead", "tbody", "tfoot", "tr", "th", "td", "span", "mark",
];

/// Elements removed together with everything inside them.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "noscript",
    "template", "svg", "math", "form", "input", "button", "select", "textarea", "link", "meta",
    "base", "head", "title",
];

/// Elements that never have a closing tag in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "br", "hr", "img", "input", "meta", "link", "base", "col", "area", "source", "wbr",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "title"];

/// Attributes holding a URI; their scheme must be in `SAFE_SCHEMES`.
const URI_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "blob"];

fn element_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "target", "rel", "name"],
        "img" => &["src", "alt", "width", "height"],
        "td" | "th" => &["colspan", "rowspan"],
        "ol" => &["start", "type", "reversed"],
        "blockquote" => &["cite"],
        _ => &[],
    }
}

enum Disposition {
    Keep,
    /// Drop the tag itself but keep its children (e.g. `div`, `font`).
    Unwrap,
    Drop,
}

fn disposition(tag: &str) -> Disposition {
    if ALLOWED_ELEMENTS.contains(&tag) {
        Disposition::Keep
    } else if DROPPED_ELEMENTS.contains(&tag) {
        Disposition::Drop
    } else {
        Disposition::Unwrap
    }
}

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Sanitize rich-text markup against an element/attribute allow-list.
///
/// Unknown elements are unwrapped, dangerous ones are removed with their
/// content, event handlers and unsafe URIs are stripped, and unclosed tags are
/// balanced. Input the tokenizer cannot read is returned as escaped text.
pub fn sanitize_html(input: &str) -> String {
    match sanitize_events(input) {
        Some(out) => out,
        None => {
            log::debug!("Rich text could not be tokenized, escaping it as plain text");
            format!("<p>{}</p>", html_escape(input))
        }
    }
}

fn sanitize_events(input: &str) -> Option<String> {
    let mut reader = Reader::from_str(input);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut writer = Writer::new(Vec::new());
    // Open elements: (name, written to output)
    let mut open: Vec<(String, bool)> = Vec::new();
    // Element being skipped and how many same-named elements are nested in it
    let mut skipping: Option<(String, usize)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let tag = tag_name(&e);
                if let Some((ref name, ref mut depth)) = skipping {
                    if *name == tag {
                        *depth += 1;
                    }
                    continue;
                }
                match disposition(&tag) {
                    Disposition::Drop => {
                        if !is_void(&tag) {
                            skipping = Some((tag, 1));
                        }
                    }
                    Disposition::Unwrap => {
                        if !is_void(&tag) {
                            open.push((tag, false));
                        }
                    }
                    Disposition::Keep => {
                        let cleaned = clean_attributes(&e, &tag);
                        if is_void(&tag) {
                            writer.write_event(Event::Empty(cleaned)).ok()?;
                        } else {
                            writer.write_event(Event::Start(cleaned)).ok()?;
                            open.push((tag, true));
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                if let Some((ref name, ref mut depth)) = skipping {
                    if *name == tag {
                        *depth -= 1;
                        if *depth == 0 {
                            skipping = None;
                        }
                    }
                    continue;
                }
                // Stray end tags are ignored; closing an outer element closes
                // everything still open inside it.
                if let Some(pos) = open.iter().rposition(|(name, _)| *name == tag) {
                    for (name, written) in open.drain(pos..).rev() {
                        if written {
                            writer.write_event(Event::End(BytesEnd::new(name))).ok()?;
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if skipping.is_some() {
                    continue;
                }
                let tag = tag_name(&e);
                if let Disposition::Keep = disposition(&tag) {
                    let cleaned = clean_attributes(&e, &tag);
                    if is_void(&tag) {
                        writer.write_event(Event::Empty(cleaned)).ok()?;
                    } else {
                        writer.write_event(Event::Start(cleaned)).ok()?;
                        writer.write_event(Event::End(BytesEnd::new(tag))).ok()?;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if skipping.is_some() {
                    continue;
                }
                writer.write_event(Event::Text(e)).ok()?;
            }
            Ok(Event::CData(e)) => {
                if skipping.is_some() {
                    continue;
                }
                let text = String::from_utf8_lossy(&e).into_owned();
                writer.write_event(Event::Text(BytesText::new(&text))).ok()?;
            }
            // Comments can hide conditional markup; declarations, processing
            // instructions and doctypes have no place in a content block.
            Ok(Event::Comment(_)) | Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {
                continue;
            }
            Err(_) => return None,
        }
    }

    for (name, written) in open.into_iter().rev() {
        if written {
            writer.write_event(Event::End(BytesEnd::new(name))).ok()?;
        }
    }

    String::from_utf8(writer.into_inner()).ok()
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn clean_attributes(e: &BytesStart, tag: &str) -> BytesStart<'static> {
    let mut cleaned = BytesStart::new(tag.to_string());
    let allowed = element_attributes(tag);
    let mut opens_new_tab = false;

    for attr in e.html_attributes().flatten() {
        let name = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
        if !GLOBAL_ATTRIBUTES.contains(&name.as_str()) && !allowed.contains(&name.as_str()) {
            continue;
        }
        // `rel` is rewritten below when the link opens a new tab.
        if name == "rel" && tag == "a" {
            continue;
        }

        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = match unescape_with(&raw, resolve_entity) {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };

        if URI_ATTRIBUTES.contains(&name.as_str()) && !is_safe_uri(&value, tag) {
            continue;
        }
        if name == "target" && value == "_blank" {
            opens_new_tab = true;
        }

        cleaned.push_attribute((name.as_str(), value.as_str()));
    }

    if tag == "a" && opens_new_tab {
        cleaned.push_attribute(("rel", "noopener noreferrer"));
    }

    cleaned
}

fn is_safe_uri(value: &str, tag: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    if tag == "img" && compact.to_lowercase().starts_with("data:image/") {
        return true;
    }

    match Url::parse(&compact) {
        Ok(url) => SAFE_SCHEMES.contains(&url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Named entities a rich-text editor commonly emits in attribute values.
fn resolve_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        "hellip" => Some("\u{2026}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        _ => None,
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_markup_passes_through() {
        let html = "<p>Hi <strong>there</strong>, <em>friend</em></p>";
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn test_keeps_entities() {
        let html = "<p>Tom &amp; Jerry&nbsp;forever</p>";
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn test_strips_script_element() {
        let out = sanitize_html("<p>a</p><script>alert('xss')</script><p>b</p>");
        assert_eq!(out, "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_strips_event_handlers() {
        let out = sanitize_html(r#"<img src="blob:blogdesk/1" onerror="alert(1)">"#);
        assert!(!out.contains("onerror"));
        assert!(out.contains(r#"src="blob:blogdesk/1""#));
    }

    #[test]
    fn test_strips_javascript_href() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">click</a>"#);
        assert!(!out.contains("javascript"));
        assert!(out.contains(">click</a>"));
    }

    #[test]
    fn test_strips_obfuscated_scheme() {
        let out = sanitize_html("<a href=\"java&#x09;script:alert(1)\">x</a>");
        assert!(!out.contains("script:"));
        let out = sanitize_html("<a href=\" JAVASCRIPT:alert(1)\">x</a>");
        assert!(!out.to_lowercase().contains("javascript"));
    }

    #[test]
    fn test_keeps_relative_and_https_links() {
        let out = sanitize_html(r##"<a href="/about">a</a><a href="https://example.com/x?y=1">b</a><a href="#top">c</a>"##);
        assert!(out.contains(r#"href="/about""#));
        assert!(out.contains(r#"href="https://example.com/x?y=1""#));
        assert!(out.contains(r##"href="#top""##));
    }

    #[test]
    fn test_new_tab_links_get_rel() {
        let out = sanitize_html(r#"<a href="https://example.com" target="_blank" rel="opener">x</a>"#);
        assert_eq!(
            out,
            r#"<a href="https://example.com" target="_blank" rel="noopener noreferrer">x</a>"#
        );
    }

    #[test]
    fn test_unwraps_unknown_elements() {
        let out = sanitize_html(r#"<div class="wrap"><p>x</p><font color="red">y</font></div>"#);
        assert_eq!(out, "<p>x</p>y");
    }

    #[test]
    fn test_drops_embedded_frames() {
        let out = sanitize_html(
            r#"<figure class="media"><iframe src="https://evil.test"><p>inner</p></iframe></figure>"#,
        );
        assert_eq!(out, r#"<figure class="media"></figure>"#);
    }

    #[test]
    fn test_balances_unclosed_tags() {
        assert_eq!(sanitize_html("<p><em>x</p>"), "<p><em>x</em></p>");
        assert_eq!(sanitize_html("<ul><li>one<li>two"), "<ul><li>one<li>two</li></li></ul>");
    }

    #[test]
    fn test_void_elements_self_close() {
        assert_eq!(sanitize_html("<p>a<br>b</p>"), "<p>a<br/>b</p>");
    }

    #[test]
    fn test_strips_style_and_comments() {
        let out = sanitize_html(
            r#"<p style="background:url(javascript:x)">a</p><!-- [if IE]><script>x</script><![endif] --><style>p{}</style>"#,
        );
        assert_eq!(out, "<p>a</p>");
    }

    #[test]
    fn test_unreadable_input_is_escaped() {
        let out = sanitize_html("<p>broken <b");
        assert!(!out.contains("<b"));
        assert!(out.starts_with("<p>"));
    }

    #[test]
    fn test_sanitize_is_stable() {
        let once = sanitize_html(r#"<p>x<img src="blob:a" alt="A &amp; B"><a href="/y" onclick="z()">y</a></p>"#);
        assert_eq!(sanitize_html(&once), once);
    }
}
