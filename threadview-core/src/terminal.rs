use std::env;

use markdown::{ParseOptions, mdast, to_mdast};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_width::UnicodeWidthStr;

pub const FALLBACK_WIDTH: usize = 80;
pub const MAX_WIDTH: usize = 1024;

static ANSI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalOptions {
    pub width: usize,
    pub color: bool,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            width: FALLBACK_WIDTH,
            color: true,
        }
    }
}

pub fn terminal_width() -> usize {
    stdout_columns()
        .or_else(|| {
            env::var("COLUMNS")
                .ok()
                .and_then(|value| value.trim().parse::<usize>().ok())
                .filter(|columns| *columns > 0)
        })
        .unwrap_or(FALLBACK_WIDTH)
}

#[cfg(unix)]
fn stdout_columns() -> Option<usize> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 {
        Some(usize::from(size.ws_col))
    } else {
        None
    }
}

#[cfg(not(unix))]
fn stdout_columns() -> Option<usize> {
    None
}

pub fn render_terminal(source: &str, options: &TerminalOptions) -> String {
    let width = options.width.clamp(1, MAX_WIDTH);
    let style = Style {
        color: options.color,
    };

    let root = match to_mdast(source, &ParseOptions::gfm()) {
        Ok(node) => node,
        Err(_) => return source.to_string(),
    };
    let nodes = match root {
        mdast::Node::Root(root) => root.children,
        other => vec![other],
    };

    let mut lines = render_blocks(&nodes, width, style);
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

#[derive(Debug, Clone, Copy)]
struct Style {
    color: bool,
}

impl Style {
    fn paint(self, text: &str, open: &str, close: &str) -> String {
        if self.color {
            format!("\x1b[{open}m{text}\x1b[{close}m")
        } else {
            text.to_string()
        }
    }

    fn bold(self, text: &str) -> String {
        self.paint(text, "1", "22")
    }

    fn italic(self, text: &str) -> String {
        self.paint(text, "3", "23")
    }

    fn underline(self, text: &str) -> String {
        self.paint(text, "4", "24")
    }

    fn strikethrough(self, text: &str) -> String {
        self.paint(text, "9", "29")
    }

    fn dim(self, text: &str) -> String {
        self.paint(text, "2", "22")
    }

    fn code(self, text: &str) -> String {
        self.paint(text, "36", "39")
    }
}

fn render_blocks(nodes: &[mdast::Node], width: usize, style: Style) -> Vec<String> {
    let mut lines = Vec::new();
    for node in nodes {
        let block = render_block(node, width, style);
        if block.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(block);
    }
    lines
}

fn render_block(node: &mdast::Node, width: usize, style: Style) -> Vec<String> {
    match node {
        mdast::Node::Paragraph(paragraph) => {
            wrap_text(&render_inline(&paragraph.children, style), width)
        }
        mdast::Node::Heading(heading) => {
            let text = render_inline(&heading.children, style);
            let styled = if heading.depth == 1 {
                style.bold(&style.underline(&text))
            } else {
                style.bold(&format!("{} {text}", "#".repeat(usize::from(heading.depth))))
            };
            wrap_text(&styled, width)
        }
        mdast::Node::Code(code) => {
            let mut lines = vec![style.dim(&format!(
                "```{}",
                code.lang.as_deref().unwrap_or_default()
            ))];
            lines.extend(
                code.value
                    .split('\n')
                    .map(|line| format!("  {}", style.code(line))),
            );
            lines.push(style.dim("```"));
            lines
        }
        mdast::Node::ThematicBreak(_) => vec![style.dim(&"─".repeat(width))],
        mdast::Node::Blockquote(quote) => {
            let bar = style.dim("│ ");
            render_blocks(&quote.children, width.saturating_sub(2).max(1), style)
                .into_iter()
                .map(|line| format!("{bar}{line}"))
                .collect()
        }
        mdast::Node::List(list) => render_list(list, width, style),
        mdast::Node::Html(html) => wrap_text(html.value.trim(), width),
        mdast::Node::Definition(definition) => vec![style.dim(&format!(
            "[{}]: {}",
            definition
                .label
                .as_deref()
                .unwrap_or(&definition.identifier),
            definition.url
        ))],
        mdast::Node::FootnoteDefinition(footnote) => {
            let marker = format!(
                "[^{}]: ",
                footnote.label.as_deref().unwrap_or(&footnote.identifier)
            );
            let indent = " ".repeat(marker.width());
            let body = render_blocks(
                &footnote.children,
                width.saturating_sub(indent.len()).max(1),
                style,
            );
            let mut lines = vec![style.dim(&marker)];
            for (idx, line) in body.into_iter().enumerate() {
                if idx == 0 {
                    lines[0].push_str(&line);
                } else if line.is_empty() {
                    lines.push(line);
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
            lines
        }
        mdast::Node::Table(table) => table
            .children
            .iter()
            .map(|row| match row {
                mdast::Node::TableRow(row) => row
                    .children
                    .iter()
                    .map(|cell| match cell {
                        mdast::Node::TableCell(cell) => render_inline(&cell.children, style),
                        _ => String::new(),
                    })
                    .collect::<Vec<_>>()
                    .join(" │ "),
                _ => String::new(),
            })
            .collect(),
        other => {
            let text = other.to_string();
            if text.trim().is_empty() {
                Vec::new()
            } else {
                wrap_text(&text, width)
            }
        }
    }
}

fn render_list(list: &mdast::List, width: usize, style: Style) -> Vec<String> {
    let mut lines = Vec::new();
    let mut number = list.start.unwrap_or(1);

    for item in &list.children {
        let mdast::Node::ListItem(item) = item else {
            continue;
        };
        let marker = if list.ordered {
            let marker = format!("{number}. ");
            number += 1;
            marker
        } else {
            match item.checked {
                Some(true) => "• [x] ".to_string(),
                Some(false) => "• [ ] ".to_string(),
                None => "• ".to_string(),
            }
        };
        let indent = " ".repeat(marker.width());
        let body = render_blocks(&item.children, width.saturating_sub(indent.len()).max(1), style);

        for (idx, line) in body.into_iter().enumerate() {
            if idx == 0 {
                lines.push(format!("{}{line}", style.dim(&marker)));
            } else if line.is_empty() {
                lines.push(line);
            } else {
                lines.push(format!("{indent}{line}"));
            }
        }
    }

    lines
}

fn render_inline(nodes: &[mdast::Node], style: Style) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            mdast::Node::Text(text) => out.push_str(&text.value),
            mdast::Node::Strong(strong) => {
                out.push_str(&style.bold(&render_inline(&strong.children, style)));
            }
            mdast::Node::Emphasis(emphasis) => {
                out.push_str(&style.italic(&render_inline(&emphasis.children, style)));
            }
            mdast::Node::Delete(delete) => {
                out.push_str(&style.strikethrough(&render_inline(&delete.children, style)));
            }
            mdast::Node::InlineCode(code) => out.push_str(&style.code(&code.value)),
            mdast::Node::Link(link) => {
                let text = render_inline(&link.children, style);
                out.push_str(&style.underline(&text));
                if strip_ansi(&text) != link.url {
                    out.push_str(&style.dim(&format!(" ({})", link.url)));
                }
            }
            mdast::Node::LinkReference(link) => {
                out.push_str(&style.underline(&render_inline(&link.children, style)));
            }
            mdast::Node::ImageReference(image) => {
                if image.alt.is_empty() {
                    out.push_str(&format!("[{}]", image.identifier));
                } else {
                    out.push_str(&image.alt);
                }
            }
            mdast::Node::FootnoteReference(footnote) => {
                let label = footnote.label.as_deref().unwrap_or(&footnote.identifier);
                out.push_str(&style.dim(&format!("[^{label}]")));
            }
            mdast::Node::Image(image) => {
                out.push_str(if image.alt.is_empty() {
                    &image.url
                } else {
                    &image.alt
                });
            }
            mdast::Node::Html(html) => out.push_str(&html.value),
            mdast::Node::Break(_) => out.push('\n'),
            other => out.push_str(&other.to_string()),
        }
    }
    out
}

fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

fn visible_width(text: &str) -> usize {
    strip_ansi(text).width()
}

// Greedy; words wider than `width` keep a line of their own.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for source_line in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in source_line.split(' ').filter(|word| !word.is_empty()) {
            let word_width = visible_width(word);
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
        }

        lines.push(current);
    }

    lines
}
