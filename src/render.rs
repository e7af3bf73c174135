use lazy_static::lazy_static;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use regex::Regex;

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"^\s*```").expect("The regex expression should be valid");
    static ref HEADING: Regex =
        Regex::new(r"^(#{1,6})\s+(.*)$").expect("The regex expression should be valid");
    static ref BULLET: Regex =
        Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("The regex expression should be valid");
    static ref INLINE: Regex = Regex::new(r"\*\*(.+?)\*\*|`([^`]+)`")
        .expect("The regex expression should be valid");
}

fn code_style() -> Style {
    Style::default().fg(Color::Yellow)
}

/// Light markdown styling for model output: headings, bullets, bold,
/// inline and fenced code. Everything else is shown as is.
pub fn markdown_text(source: &str) -> Text<'static> {
    let mut lines = Vec::new();
    let mut in_fence = false;

    for raw in source.lines() {
        if FENCE.is_match(raw) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            lines.push(Line::from(vec![Span::styled(raw.to_string(), code_style())]));
            continue;
        }

        if let Some(caps) = HEADING.captures(raw) {
            let mut style = Style::default().add_modifier(Modifier::BOLD);
            if caps[1].len() <= 2 {
                style = style.fg(Color::Cyan);
            }
            lines.push(Line::from(inline_spans(&caps[2], style)));
        } else if let Some(caps) = BULLET.captures(raw) {
            let mut spans = vec![Span::raw(format!("{}• ", &caps[1]))];
            spans.extend(inline_spans(&caps[2], Style::default()));
            lines.push(Line::from(spans));
        } else {
            lines.push(Line::from(inline_spans(raw, Style::default())));
        }
    }
    Text::from(lines)
}

fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in INLINE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.push(Span::styled(text[last..whole.start()].to_string(), base));
        }
        if let Some(bold) = caps.get(1) {
            spans.push(Span::styled(
                bold.as_str().to_string(),
                base.add_modifier(Modifier::BOLD),
            ));
        } else if let Some(code) = caps.get(2) {
            spans.push(Span::styled(code.as_str().to_string(), base.patch(code_style())));
        }
        last = whole.end();
    }
    if last < text.len() || spans.is_empty() {
        spans.push(Span::styled(text[last..].to_string(), base));
    }
    spans
}

#[cfg(test)]
mod tests {
    use ratatui::style::Modifier;
    use ratatui::text::Text;

    use super::markdown_text;

    fn plain(text: &Text) -> Vec<String> {
        text.lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn headings_and_bullets() {
        let text = markdown_text("## Core Loop\n- Explore\n  * Craft\nPlain line");
        assert_eq!(plain(&text), vec!["Core Loop", "• Explore", "  • Craft", "Plain line"]);
        assert!(text.lines[0].spans[0]
            .style
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn bold_and_code_spans() {
        let text = markdown_text("Use **dash** then `attack()` now");
        let line = &text.lines[0];
        let contents: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(contents, vec!["Use ", "dash", " then ", "attack()", " now"]);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(!line.spans[2].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn fenced_code_is_left_alone() {
        let source = "Behavior tree:\n```\n- Selector\n  **not bold**\n```\n- after";
        assert_eq!(
            plain(&markdown_text(source)),
            vec!["Behavior tree:", "- Selector", "  **not bold**", "• after"]
        );
    }

    #[test]
    fn empty_lines_survive() {
        let text = markdown_text("a\n\nb");
        assert_eq!(plain(&text), vec!["a", "", "b"]);
    }
}
