//! Constrained parser for templated page content.
//!
//! Turns JSX-like markup into plain HTML with a fixed, empty scope: there are
//! no components and no bindings, so only literal expressions produce output.
//! `{…}` expressions are expanded first, then the markup goes through
//! quick-xml. Anything that can run script (script-like elements, inline
//! event handlers, `javascript:` style URIs) is never emitted. Unknown
//! lowercase tags pass through untouched; component tags (capitalised or
//! dotted names) are unwrapped and only their children are kept.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

use crate::error::SiteError;

/// Elements that never have children and are closed implicitly.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements that can execute scripts or load active content. Dropped
/// together with their contents.
const DANGEROUS_ELEMENTS: &[&str] = &[
    "script",
    "iframe",
    "frame",
    "frameset",
    "embed",
    "object",
    "applet",
    "base",
    "meta",
    "foreignobject",
    "set",
    "animate",
    "animatetransform",
    "animatemotion",
    "handler",
    "listener",
];

/// Event handler prefix (onclick, onload, ...)
const DANGEROUS_ATTR_PREFIXES: &[&str] = &["on"];

/// Attributes dropped whatever their value.
const BLOCKED_ATTRIBUTES: &[&str] = &["srcdoc"];

const DANGEROUS_SCHEMES: &[&str] = &[
    "javascript:",
    "data:text/html",
    "data:application",
    "vbscript:",
];

/// Attributes that can contain URIs and need scheme checking
const URI_ATTRIBUTES: &[&str] = &[
    "href",
    "xlink:href",
    "src",
    "action",
    "formaction",
    "poster",
    "data",
    "background",
];

/// Wrapper name substituted for `<>` fragments so they unwrap like components.
const FRAGMENT: &str = "Fragment";

pub fn parse(source: &str) -> Result<String, SiteError> {
    let markup = Expander::new(source).run().map_err(|e| {
        SiteError::ParseFailure(format!("{} at byte {}", e.message, e.offset))
    })?;
    render_markup(&markup)
}

struct OpenTag {
    name: String,
    emitted: bool,
}

fn failure(message: impl Into<String>) -> SiteError {
    SiteError::ParseFailure(message.into())
}

fn emit(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), SiteError> {
    writer
        .write_event(event)
        .map_err(|e| failure(format!("write failed: {}", e)))
}

fn qname(name: QName<'_>) -> Result<String, SiteError> {
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|_| failure("tag name is not valid UTF-8"))
}

/// Walk expanded markup, keeping a tag stack of our own so void elements,
/// components and fragments can be handled the HTML way.
fn render_markup(markup: &str) -> Result<String, SiteError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut stack: Vec<OpenTag> = Vec::new();
    let mut skip_depth: usize = 0;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(failure(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )))
            }
        };

        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                let name = qname(e.name())?;
                let lower = name.to_ascii_lowercase();
                let void = is_void(&lower);

                if skip_depth > 0 {
                    if !void {
                        skip_depth += 1;
                    }
                    continue;
                }
                if is_dangerous_element(&lower) {
                    if !void {
                        skip_depth = 1;
                    }
                    continue;
                }

                let emitted = is_html_element(&name);
                if emitted {
                    emit(&mut writer, Event::Start(clean_attributes(e, &name)?))?;
                }
                if !void {
                    stack.push(OpenTag { name, emitted });
                }
            }
            Event::End(ref e) => {
                let name = qname(e.name())?;
                let lower = name.to_ascii_lowercase();
                if is_void(&lower) {
                    continue;
                }
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }

                match stack.pop() {
                    Some(open) if open.name == name => {
                        if open.emitted {
                            emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                        }
                    }
                    Some(open) => {
                        return Err(failure(format!(
                            "expected </{}> but found </{}>",
                            open.name, name
                        )))
                    }
                    None => return Err(failure(format!("stray closing tag </{}>", name))),
                }
            }
            Event::Empty(ref e) => {
                if skip_depth > 0 {
                    continue;
                }
                let name = qname(e.name())?;
                let lower = name.to_ascii_lowercase();
                if is_dangerous_element(&lower) || !is_html_element(&name) {
                    continue;
                }

                emit(&mut writer, Event::Start(clean_attributes(e, &name)?))?;
                if !is_void(&lower) {
                    emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                }
            }
            Event::Text(e) => {
                if skip_depth == 0 {
                    emit(&mut writer, Event::Text(e))?;
                }
            }
            // Comments, CDATA, declarations, PIs and doctypes are not page content
            _ => {}
        }
    }

    if skip_depth > 0 {
        return Err(failure("unterminated blocked element"));
    }
    if let Some(open) = stack.last() {
        return Err(failure(format!("unclosed <{}>", open.name)));
    }

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|_| failure("output is not valid UTF-8"))
}

fn clean_attributes(e: &BytesStart<'_>, name: &str) -> Result<BytesStart<'static>, SiteError> {
    let mut cleaned = BytesStart::new(name.to_string());

    for attr in e.html_attributes() {
        let attr = attr.map_err(|err| failure(format!("malformed attribute in <{}>: {}", name, err)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|_| failure("attribute name is not valid UTF-8"))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|_| failure("attribute value is not valid UTF-8"))?;

        if is_dangerous_attribute(key) {
            continue;
        }
        let lower = key.to_ascii_lowercase();
        if BLOCKED_ATTRIBUTES.contains(&lower.as_str()) {
            continue;
        }
        if URI_ATTRIBUTES.contains(&lower.as_str()) && has_dangerous_uri(value) {
            continue;
        }
        if lower == "style" {
            let lower_val = decode(value).to_ascii_lowercase();
            if lower_val.contains("javascript:") || lower_val.contains("expression(") {
                continue;
            }
        }

        // Values are already escaped: push the raw bytes back
        cleaned.push_attribute((html_attribute_name(key).as_bytes(), value.as_bytes()));
    }

    Ok(cleaned)
}

fn is_void(lower: &str) -> bool {
    VOID_ELEMENTS.contains(&lower)
}

fn is_dangerous_element(lower: &str) -> bool {
    DANGEROUS_ELEMENTS.contains(&lower)
}

fn is_dangerous_attribute(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    DANGEROUS_ATTR_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix) && lower.len() > prefix.len())
}

fn decode(value: &str) -> String {
    quick_xml::escape::unescape(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Browsers ignore whitespace and control characters inside a scheme, so
/// `java&#x09;script:` still runs.
fn has_dangerous_uri(value: &str) -> bool {
    let compact: String = decode(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    DANGEROUS_SCHEMES
        .iter()
        .any(|scheme| compact.starts_with(scheme))
}

fn is_html_element(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_lowercase()) && !name.contains('.')
}

fn html_attribute_name(name: &str) -> &str {
    match name {
        "className" => "class",
        "htmlFor" => "for",
        other => other,
    }
}

// ─── Expression expansion ───────────────────────────────────

#[derive(Debug)]
struct ExpandError {
    message: String,
    offset: usize,
}

/// Rewrites `{…}` expressions against the empty scope and leaves every
/// other byte for the markup reader. Text expressions become escaped text;
/// `name={…}` becomes a quoted value or disappears; spreads disappear.
struct Expander<'a> {
    src: &'a str,
    pos: usize,
    out: String,
}

impl<'a> Expander<'a> {
    fn new(src: &'a str) -> Self {
        Expander {
            src,
            pos: 0,
            out: String::with_capacity(src.len()),
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ExpandError> {
        Err(ExpandError {
            message: message.into(),
            offset: self.pos,
        })
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Copy `len` bytes of source through unchanged.
    fn copy(&mut self, len: usize) {
        let rest = self.rest();
        self.out.push_str(&rest[..len]);
        self.pos += len;
    }

    fn run(mut self) -> Result<String, ExpandError> {
        while let Some(c) = self.peek() {
            match c {
                '<' => self.markup()?,
                '{' => {
                    let expr = self.expression()?;
                    if let Some(text) = evaluate(expr) {
                        self.out.push_str(&escape_text(&text));
                    }
                }
                '}' => return self.error("unexpected '}'"),
                _ => {
                    let rest = self.rest();
                    let end = rest.find(['<', '{', '}']).unwrap_or(rest.len());
                    self.copy(end);
                }
            }
        }
        Ok(self.out)
    }

    fn markup(&mut self) -> Result<(), ExpandError> {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
            self.copy(end);
        } else if rest.starts_with("<>") {
            self.out.push_str(&format!("<{}>", FRAGMENT));
            self.pos += 2;
        } else if rest.starts_with("</>") {
            self.out.push_str(&format!("</{}>", FRAGMENT));
            self.pos += 3;
        } else if rest.starts_with("</") {
            let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            self.copy(end);
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.tag()?;
        } else {
            self.copy(1);
        }
        Ok(())
    }

    /// Copy an opening tag, expanding expressions among its attributes.
    fn tag(&mut self) -> Result<(), ExpandError> {
        let rest = self.rest();
        let name_end = rest[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        self.copy(name_end);

        // Where the attribute being read started in the output
        let mut attr_mark = self.out.len();
        loop {
            match self.peek() {
                // Left for the reader to report
                None => return Ok(()),
                Some('>') => {
                    self.copy(1);
                    return Ok(());
                }
                Some(q @ ('"' | '\'')) => {
                    let rest = self.rest();
                    let end = rest[1..].find(q).map(|i| i + 2).unwrap_or(rest.len());
                    self.copy(end);
                }
                Some('{') => {
                    let expr = self.expression()?;
                    let trimmed = self.out.trim_end().len();
                    if self.out[..trimmed].ends_with('=') {
                        match evaluate(expr) {
                            Some(value) => {
                                self.out.truncate(trimmed);
                                self.out.push('"');
                                self.out.push_str(&escape_attr(&value));
                                self.out.push('"');
                            }
                            // Unbound expression: drop the whole attribute
                            None => self.out.truncate(attr_mark),
                        }
                    }
                    // Spread attributes need bindings we don't have
                }
                Some(c) if c.is_whitespace() => {
                    self.copy(c.len_utf8());
                    let next = self.rest().trim_start().chars().next();
                    let after_eq = self.out.trim_end().ends_with('=');
                    if next != Some('=') && !after_eq {
                        attr_mark = self.out.len();
                    }
                }
                Some(c) => self.copy(c.len_utf8()),
            }
        }
    }

    /// Consume a `{…}` expression and return its trimmed inner source.
    fn expression(&mut self) -> Result<&'a str, ExpandError> {
        let start = self.pos;
        self.bump();
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(self.src[start + 1..self.pos - 1].trim());
                    }
                }
                '/' if self.peek() == Some('*') => self.skip_comment()?,
                '"' | '\'' | '`' => self.skip_string(c)?,
                _ => {}
            }
        }
        self.pos = start;
        self.error("unterminated expression")
    }

    fn skip_comment(&mut self) -> Result<(), ExpandError> {
        let start = self.pos;
        match self.rest()[1..].find("*/") {
            Some(end) => {
                self.pos += end + 3;
                Ok(())
            }
            None => {
                self.pos = start;
                self.error("unterminated comment in expression")
            }
        }
    }

    fn skip_string(&mut self, quote: char) -> Result<(), ExpandError> {
        let start = self.pos;
        while let Some(c) = self.bump() {
            if c == '\\' {
                self.bump();
            } else if c == quote {
                return Ok(());
            }
        }
        self.pos = start;
        self.error("unterminated string literal")
    }
}

/// Evaluate an expression against the empty scope. Only literals produce
/// output; identifiers are unbound and render nothing.
fn evaluate(expr: &str) -> Option<String> {
    if expr.is_empty() || (expr.starts_with("/*") && expr.ends_with("*/")) {
        return None;
    }

    if let Some(literal) = string_literal(expr) {
        return Some(literal);
    }

    match expr {
        "true" | "false" | "null" | "undefined" => None,
        _ if expr.parse::<f64>().is_ok() => Some(expr.to_string()),
        _ => None,
    }
}

fn string_literal(expr: &str) -> Option<String> {
    let quote = expr.chars().next()?;
    if !matches!(quote, '"' | '\'' | '`') || expr.len() < 2 || !expr.ends_with(quote) {
        return None;
    }
    let inner = &expr[1..expr.len() - 1];
    if quote == '`' && inner.contains("${") {
        return None;
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Some(out)
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(src: &str) -> String {
        parse(src).unwrap()
    }

    #[test]
    fn maps_jsx_attribute_names() {
        assert_eq!(
            ok(r#"<label className="field" htmlFor="q">Query</label>"#),
            r#"<label class="field" for="q">Query</label>"#
        );
    }

    #[test]
    fn literal_expressions_render_escaped_text() {
        assert_eq!(ok(r#"<p>{"a < b"}</p>"#), "<p>a &lt; b</p>");
        assert_eq!(ok("<p>{'single'} {`tick`}</p>"), "<p>single tick</p>");
        assert_eq!(ok("<span>{42}</span>"), "<span>42</span>");
    }

    #[test]
    fn unbound_expressions_render_nothing() {
        assert_eq!(ok("<p>Hello {name}!</p>"), "<p>Hello !</p>");
        assert_eq!(ok("<p>{items.map(i => i)}</p>"), "<p></p>");
        assert_eq!(ok("<p>{/* note */}x</p>"), "<p>x</p>");
        assert_eq!(ok("<p>{true}</p>"), "<p></p>");
    }

    #[test]
    fn comments_inside_expressions_may_hold_quotes() {
        assert_eq!(ok("<p>{/* don't */}ok</p>"), "<p>ok</p>");
        assert_eq!(ok(r#"<p>{/* "} */ "x"}</p>"#), "<p></p>");
    }

    #[test]
    fn expression_attributes_keep_literals_only() {
        assert_eq!(
            ok(r#"<img src={"/a.png"} alt={caption} />"#),
            r#"<img src="/a.png">"#
        );
        assert_eq!(
            ok(r#"<div {...props} id="x"></div>"#),
            r#"<div id="x"></div>"#
        );
    }

    #[test]
    fn scripts_and_event_handlers_are_dropped() {
        assert_eq!(
            ok(r#"<div className="a"><script>alert(1)</script><button onClick={go} onmouseover="x()">Go</button></div>"#),
            r#"<div class="a"><button>Go</button></div>"#
        );
        assert_eq!(ok(r#"<p className="a">x<script src="e.js"/></p>"#), r#"<p class="a">x</p>"#);
    }

    #[test]
    fn script_uris_are_dropped() {
        assert_eq!(
            ok(r#"<a className="x" href="javascript:alert(1)">x</a>"#),
            r#"<a class="x">x</a>"#
        );
        assert_eq!(ok(r#"<a href={"javascript:alert(1)"}>x</a>"#), "<a>x</a>");
        assert_eq!(ok(r#"<a href=" JAVA&#x09;script:alert(1)">x</a>"#), "<a>x</a>");
        assert_eq!(
            ok(r#"<a href="data:text/html;base64,PHNjcmlwdD4=">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(ok(r#"<form action="vbscript:x"></form>"#), "<form></form>");
    }

    #[test]
    fn safe_uris_are_kept() {
        assert_eq!(
            ok(r#"<a href="/about" className="link">About</a>"#),
            r#"<a href="/about" class="link">About</a>"#
        );
        assert_eq!(
            ok(r#"<img src={"https://example.com/a.png"} />"#),
            r#"<img src="https://example.com/a.png">"#
        );
    }

    #[test]
    fn active_content_elements_are_dropped() {
        assert_eq!(
            ok(r#"<iframe srcdoc="&lt;script&gt;alert(2)&lt;/script&gt;"></iframe><p className="a">after</p>"#),
            r#"<p class="a">after</p>"#
        );
        assert_eq!(
            ok(r#"<object data="x.swf"><embed src="x.swf"></object><p>{"kept"}</p>"#),
            "<p>kept</p>"
        );
        assert_eq!(ok(r#"<embed src="x.swf">after<br/>"#), "after<br>");
        assert_eq!(ok(r#"<div className="a"><iframe src="https://evil.example" /></div>"#), r#"<div class="a"></div>"#);
    }

    #[test]
    fn srcdoc_and_style_expressions_are_dropped() {
        assert_eq!(
            ok(r#"<div srcdoc="x" className="a">y</div>"#),
            r#"<div class="a">y</div>"#
        );
        assert_eq!(
            ok(r#"<p style="background:url(javascript:alert(1))" className="a">x</p>"#),
            r#"<p class="a">x</p>"#
        );
        assert_eq!(
            ok(r#"<p style="color: red" className="a">x</p>"#),
            r#"<p style="color: red" class="a">x</p>"#
        );
    }

    #[test]
    fn void_and_self_closing_elements() {
        assert_eq!(ok("a<br/>b<hr>c"), "a<br>b<hr>c");
        assert_eq!(ok(r#"<div className="spacer" />"#), r#"<div class="spacer"></div>"#);
    }

    #[test]
    fn components_and_fragments_are_unwrapped() {
        assert_eq!(ok("<Card title=\"x\"><p>inside</p></Card>"), "<p>inside</p>");
        assert_eq!(ok("<><b>a</b></>"), "<b>a</b>");
        assert_eq!(ok("<motion.div>hi</motion.div>"), "hi");
        assert_eq!(ok("<Icon />after"), "after");
    }

    #[test]
    fn unknown_lowercase_tags_pass_through() {
        assert_eq!(
            ok(r#"<my-widget data-x="1">w</my-widget>"#),
            r#"<my-widget data-x="1">w</my-widget>"#
        );
    }

    #[test]
    fn html_comments_are_removed() {
        assert_eq!(ok("<p>a<!-- hidden -->b</p>"), "<p>ab</p>");
    }

    #[test]
    fn structural_errors_are_reported() {
        let cases = [
            "<div><p>x</div>",
            "<div>",
            "</div>",
            "<p>{unclosed</p>",
            "<p>}</p>",
            "<p title=\"x>y</p>",
            "<p>{\"open}</p>",
            "<p>{/* open }</p>",
            "<script>never closed",
            "<div className=\"a\" <",
            "a < b",
        ];
        for case in cases {
            assert!(
                matches!(parse(case), Err(SiteError::ParseFailure(_))),
                "expected failure for {:?}",
                case
            );
        }
    }
}
