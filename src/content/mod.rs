use regex::Regex;
use std::sync::LazyLock;

pub mod rich;

/// Shown in place of a page body that is empty or only whitespace.
pub const EMPTY_CONTENT: &str = r#"<p class="content-empty">No content available.</p>"#;

/// How stored page content is turned into HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Inserted as-is.
    PlainMarkup,
    /// Templating syntax (attributes like `className=`, `{…}` expressions,
    /// component tags) that goes through the constrained parser first.
    RichExpression,
}

static RICH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // className= / htmlFor= attribute assignment
        r"\b(?:className|htmlFor)\s*=",
        // {expression}
        r"\{[^}]*\}",
        // closing tag of a component
        r"</[A-Z][\w.]*\s*>",
        // self-closing tag
        r"/>",
        // opening tag with an expression among its attributes
        r"<\w+\s+[^>]*\{",
    ]
    .iter()
    .filter_map(|p| match Regex::new(p) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Invalid content pattern {}: {}", p, e);
            None
        }
    })
    .collect()
});

/// Decide how `content` should be rendered. Pure: the same input always
/// yields the same kind.
pub fn classify_content(content: &str) -> ContentKind {
    if RICH_PATTERNS.iter().any(|re| re.is_match(content)) {
        ContentKind::RichExpression
    } else {
        ContentKind::PlainMarkup
    }
}

/// Render stored page content to HTML.
///
/// Content is admin-authored and trusted: plain markup is emitted unescaped
/// and rich content that fails to parse falls back to the same raw output.
pub fn render_content(content: &str) -> String {
    if content.trim().is_empty() {
        return EMPTY_CONTENT.to_string();
    }

    match classify_content(content) {
        ContentKind::RichExpression => match rich::parse(content) {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Rich content parsing failed, falling back to HTML: {}", e);
                content.to_string()
            }
        },
        ContentKind::PlainMarkup => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_html_is_plain_markup() {
        assert_eq!(
            classify_content("<h2>Hi</h2><p>Text</p>"),
            ContentKind::PlainMarkup
        );
        assert_eq!(
            classify_content(r#"<p class="lead">Hello <a href="/x">there</a></p>"#),
            ContentKind::PlainMarkup
        );
        assert_eq!(classify_content("just text"), ContentKind::PlainMarkup);
    }

    #[test]
    fn templating_syntax_is_rich() {
        assert_eq!(
            classify_content("<div className=\"x\">{value}</div>"),
            ContentKind::RichExpression
        );
        assert_eq!(classify_content("<p>{'literal'}</p>"), ContentKind::RichExpression);
        assert_eq!(classify_content("<Card>hi</Card>"), ContentKind::RichExpression);
        assert_eq!(classify_content("line<br/>break"), ContentKind::RichExpression);
        assert_eq!(
            classify_content("<img src={logo} alt=\"logo\">"),
            ContentKind::RichExpression
        );
        assert_eq!(
            classify_content("<label htmlFor=\"q\">Q</label>"),
            ContentKind::RichExpression
        );
    }

    #[test]
    fn classification_is_stable() {
        let inputs = ["<h2>Hi</h2>", "<div className=\"a\"/>", "", "{x}"];
        for input in inputs {
            let first = classify_content(input);
            for _ in 0..3 {
                assert_eq!(classify_content(input), first);
            }
        }
    }

    #[test]
    fn empty_content_gets_placeholder() {
        assert_eq!(render_content("   \n"), EMPTY_CONTENT);
    }

    #[test]
    fn plain_markup_is_inserted_raw() {
        let html = "<h2>Hi</h2><p>Text &amp; more</p>";
        assert_eq!(render_content(html), html);
    }

    #[test]
    fn rich_content_is_parsed() {
        assert_eq!(
            render_content("<div className=\"card\">{\"Hello\"}</div>"),
            "<div class=\"card\">Hello</div>"
        );
    }

    #[test]
    fn unparseable_rich_content_falls_back_to_raw() {
        let broken = "<div className=\"x\"><p>unclosed</div>";
        assert_eq!(render_content(broken), broken);
    }
}
