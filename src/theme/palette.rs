use super::ThemeId;

/// Colours and shape settings for one theme in one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: &'static str,
    pub accent: &'static str,
    pub border: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub radius: &'static str,
    pub font_heading: &'static str,
    pub font_body: &'static str,
}

impl Palette {
    pub fn for_theme(theme: ThemeId, dark: bool) -> Palette {
        let (background, surface, text, muted) = if dark {
            ("#0b0f19", "#111827", "#f3f4f6", "#9ca3af")
        } else {
            ("#ffffff", "#f9fafb", "#111827", "#6b7280")
        };

        let (primary, accent, border) = match (theme, dark) {
            (ThemeId::Minimal, false) => ("#171717", "#737373", "#e5e5e5"),
            (ThemeId::Minimal, true) => ("#f5f5f5", "#a3a3a3", "#404040"),
            (ThemeId::Modern, false) => ("#0ea5e9", "#14b8a6", "#e2e8f0"),
            (ThemeId::Modern, true) => ("#38bdf8", "#2dd4bf", "#334155"),
            (ThemeId::Aesthetic, false) => ("#f472b6", "#c084fc", "#fde8ff"),
            (ThemeId::Aesthetic, true) => ("#f9a8d4", "#d8b4fe", "#4c1d95"),
            (ThemeId::Professional, false) => ("#1e3a8a", "#166534", "#d1d5db"),
            (ThemeId::Professional, true) => ("#60a5fa", "#4ade80", "#374151"),
            (ThemeId::Academic, false) => ("#7f1d1d", "#78350f", "#d6d3d1"),
            (ThemeId::Academic, true) => ("#f87171", "#fbbf24", "#44403c"),
        };

        let (radius, font_heading, font_body) = match theme {
            ThemeId::Minimal => ("0", "Inter", "Inter"),
            ThemeId::Modern => ("0.75rem", "DM Sans", "Inter"),
            ThemeId::Aesthetic => ("1.5rem", "Playfair Display", "DM Sans"),
            ThemeId::Professional => ("0.375rem", "Inter", "Inter"),
            ThemeId::Academic => ("0.25rem", "Source Serif 4", "Source Serif 4"),
        };

        Palette {
            primary,
            accent,
            border,
            background,
            surface,
            text,
            muted,
            radius,
            font_heading,
            font_body,
        }
    }
}

/// CSS custom properties for the page shell.
pub fn css_variables(theme: ThemeId, dark: bool) -> String {
    let p = Palette::for_theme(theme, dark);
    format!(
        r#":root {{
    --color-primary: {primary};
    --color-accent: {accent};
    --color-border: {border};
    --color-bg: {background};
    --color-surface: {surface};
    --color-text: {text};
    --color-text-secondary: {muted};
    --radius: {radius};
    --font-heading: '{font_heading}', {heading_fallback};
    --font-body: '{font_body}', {body_fallback};
}}"#,
        primary = p.primary,
        accent = p.accent,
        border = p.border,
        background = p.background,
        surface = p.surface,
        text = p.text,
        muted = p.muted,
        radius = p.radius,
        font_heading = p.font_heading,
        heading_fallback = generic_family(p.font_heading),
        font_body = p.font_body,
        body_fallback = generic_family(p.font_body),
    )
}

/// Google Fonts stylesheet link for the theme's fonts.
pub fn font_link(theme: ThemeId) -> String {
    let p = Palette::for_theme(theme, false);
    let mut families: Vec<String> = Vec::new();
    for name in [p.font_heading, p.font_body] {
        let family = name.replace(' ', "+");
        if !families.contains(&family) {
            families.push(family);
        }
    }
    let query = families
        .iter()
        .map(|f| format!("family={}:wght@400;600;700", f))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        r#"<link rel="stylesheet" href="https://fonts.googleapis.com/css2?{}&display=swap">"#,
        query
    )
}

fn generic_family(font: &str) -> &'static str {
    if font.contains("Serif") || font.contains("Playfair") {
        "serif"
    } else {
        "sans-serif"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_mode_swaps_surface_colours() {
        let light = Palette::for_theme(ThemeId::Modern, false);
        let dark = Palette::for_theme(ThemeId::Modern, true);
        assert_eq!(light.background, "#ffffff");
        assert_eq!(dark.background, "#0b0f19");
        assert_ne!(light.primary, dark.primary);
        assert_eq!(light.radius, dark.radius);
    }

    #[test]
    fn css_variables_carry_theme_values() {
        let css = css_variables(ThemeId::Academic, false);
        assert!(css.starts_with(":root {"));
        assert!(css.contains("--color-primary: #7f1d1d;"));
        assert!(css.contains("--font-heading: 'Source Serif 4', serif;"));
        assert!(css.contains("--radius: 0.25rem;"));
    }

    #[test]
    fn font_link_deduplicates_families() {
        let link = font_link(ThemeId::Minimal);
        assert_eq!(link.matches("family=Inter").count(), 1);
        let link = font_link(ThemeId::Aesthetic);
        assert!(link.contains("family=Playfair+Display"));
        assert!(link.contains("family=DM+Sans"));
    }
}
