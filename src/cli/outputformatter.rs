use terminal_size::{terminal_size, Height, Width};

use crate::navigation::NavEntry;
use crate::views::{AlertLevel, Block, Card, ChatTurn, Display, Table};

// Render a view's display as plain terminal text, sized to the current terminal.
pub fn format_display(d: &Display) -> String {
    format_display_width(d, get_terminal_width())
}

pub fn format_display_width(d: &Display, termw: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    out.push(fit_line_to_width(&d.title, termw));
    out.push("=".repeat(display_len(&d.title).min(termw)));
    for b in &d.blocks {
        match b {
            Block::Heading(h) => {
                out.push(String::new());
                out.push(fit_line_to_width(h, termw));
                out.push("-".repeat(display_len(h).min(termw)));
            }
            Block::Text(t) => out.push(t.clone()),
            Block::Table(t) => out.extend(format_table(t, termw)),
            Block::Cards(cards) => out.extend(format_cards(cards)),
            Block::Alert { level, text } => out.push(format!("[{}] {}", level_tag(*level), text)),
            Block::Chat(turns) => out.extend(format_chat(turns)),
        }
    }
    out.join("\n")
}

/// Menu line for the shell; the active entry is bracketed.
pub fn format_menu(entries: &[NavEntry], active: &str) -> String {
    entries
        .iter()
        .map(|e| if e.key == active { format!("[{}]", e.label) } else { e.label.to_string() })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn level_tag(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Info => "info",
        AlertLevel::Warning => "warning",
        AlertLevel::Error => "error",
    }
}

fn format_table(t: &Table, termw: usize) -> Vec<String> {
    // cap to keep output readable
    let max_col_width: usize = 80.min(termw);
    let mut widths: Vec<usize> = t.columns.iter().map(|s| display_len(s).min(max_col_width)).collect();
    for r in &t.rows {
        for (i, cell) in r.iter().enumerate().take(t.columns.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(max_col_width); }
        }
    }

    let sep = build_separator(&widths);
    let mut lines = Vec::with_capacity(t.rows.len() + 4);
    lines.push(fit_line_to_width(&sep, termw));
    lines.push(fit_line_to_width(&build_row(&t.columns, &widths), termw));
    lines.push(fit_line_to_width(&sep, termw));
    for r in &t.rows {
        lines.push(fit_line_to_width(&build_row(r, &widths), termw));
    }
    lines.push(fit_line_to_width(&sep, termw));
    lines
}

fn format_cards(cards: &[Card]) -> Vec<String> {
    let mut lines = Vec::new();
    for c in cards {
        lines.push(format!("* {}", c.title));
        for l in &c.lines { lines.push(format!("    {}", l)); }
    }
    lines
}

fn format_chat(turns: &[ChatTurn]) -> Vec<String> {
    turns.iter().map(|t| format!("{}> {}", if t.from_user { "you" } else { "advisor" }, t.text)).collect()
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let (text, align_right) = (truncate(&cell, *w), is_numeric_like(&cell));
        let pad = w.saturating_sub(display_len(&text));
        s.push(' ');
        if align_right {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    // crude detection for aligning amounts and scores to the right
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}

fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_h))) if w > 4 => (w - 4) as usize,
        _ => 80,
    }
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if display_len(s) <= maxw { return s.to_string(); }
    truncate(s, maxw)
}
