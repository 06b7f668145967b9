//! Side-by-side HTML diff rendering.
//!
//! [`render_side_by_side`] produces a self-contained `<table>` fragment;
//! [`write_page`] wraps a fragment into a standalone page.

use similar::{ChangeTag, DiffOp, TextDiff};
use std::fmt::Write as _;
use std::io::Write;

/// One side of a table row: line number and pre-rendered cell HTML
type Cell = Option<(usize, String)>;

/// Escape text for an HTML body or attribute
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a line diff as a two-column table.
///
/// Changed lines are paired left/right and the words that differ
/// within them are wrapped in `<mark>`. Unchanged runs longer than
/// `context` lines around a change are collapsed between hunks.
pub fn render_side_by_side(from: &str, to: &str, context: usize) -> String {
    let diff = TextDiff::from_lines(from, to);
    let mut html = String::from("<table class=\"diff\">\n");

    let groups = diff.grouped_ops(context);
    if groups.is_empty() {
        html.push_str("<tr><td class=\"same\" colspan=\"4\">No differences</td></tr>\n");
    }

    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            html.push_str("<tr class=\"hunk\"><td colspan=\"4\">&hellip;</td></tr>\n");
        }

        for op in group {
            let mut left: Vec<Cell> = Vec::new();
            let mut right: Vec<Cell> = Vec::new();

            for change in diff.iter_inline_changes(op) {
                let mut cell = String::new();
                for (emphasized, value) in change.iter_strings_lossy() {
                    let value = escape(value.trim_end_matches(&['\r', '\n'][..]));
                    if emphasized {
                        let _ = write!(cell, "<mark>{}</mark>", value);
                    } else {
                        cell.push_str(&value);
                    }
                }

                match change.tag() {
                    ChangeTag::Equal => {
                        left.push(change.old_index().map(|i| (i + 1, cell.clone())));
                        right.push(change.new_index().map(|i| (i + 1, cell)));
                    }
                    ChangeTag::Delete => left.push(change.old_index().map(|i| (i + 1, cell))),
                    ChangeTag::Insert => right.push(change.new_index().map(|i| (i + 1, cell))),
                }
            }

            let rows = left.len().max(right.len());
            for row in 0..rows {
                let l = left.get(row).cloned().flatten();
                let r = right.get(row).cloned().flatten();
                let class = match (&l, &r) {
                    _ if matches!(op, DiffOp::Equal { .. }) => "same",
                    (Some(_), None) => "del",
                    (None, Some(_)) => "ins",
                    _ => "chg",
                };
                render_row(&mut html, class, &l, &r);
            }
        }
    }

    html.push_str("</table>\n");
    html
}

fn render_row(html: &mut String, class: &str, left: &Cell, right: &Cell) {
    let _ = write!(html, "<tr class=\"{}\">", class);
    for (side, cell) in [("old", left), ("new", right)] {
        match cell {
            Some((number, text)) => {
                let _ = write!(
                    html,
                    "<td class=\"num\">{}</td><td class=\"line {}\">{}</td>",
                    number, side, text
                );
            }
            None => {
                let _ = write!(
                    html,
                    "<td class=\"num\"></td><td class=\"line {} empty\"></td>",
                    side
                );
            }
        }
    }
    html.push_str("</tr>\n");
}

/// Write a standalone page around a diff fragment
pub fn write_page<W: Write>(
    mut writer: W,
    title: &str,
    subtitle: &str,
    fragment: &str,
) -> std::io::Result<()> {
    write!(
        writer,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        :root {{
            --bg-primary: #ffffff;
            --bg-secondary: #f6f8fa;
            --text-primary: #1f2328;
            --text-secondary: #59636e;
            --ins: #dafbe1;
            --ins-strong: #aceebb;
            --del: #ffebe9;
            --del-strong: #ffcecb;
        }}

        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            margin: 2rem;
        }}

        header {{
            margin-bottom: 1.5rem;
        }}

        header p {{
            color: var(--text-secondary);
        }}

        table.diff {{
            width: 100%;
            border-collapse: collapse;
            table-layout: fixed;
            font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
            font-size: 0.85rem;
        }}

        td.num {{
            width: 3.5rem;
            text-align: right;
            padding-right: 0.5rem;
            color: var(--text-secondary);
            background: var(--bg-secondary);
        }}

        td.line {{
            white-space: pre-wrap;
            word-break: break-all;
            padding: 0 0.5rem;
        }}

        tr.del td.old, tr.chg td.old {{ background: var(--del); }}
        tr.ins td.new, tr.chg td.new {{ background: var(--ins); }}
        td.old mark {{ background: var(--del-strong); }}
        td.new mark {{ background: var(--ins-strong); }}
        td.empty {{ background: var(--bg-secondary); }}
        tr.hunk td {{ text-align: center; color: var(--text-secondary); background: var(--bg-secondary); }}
    </style>
</head>
<body>
    <header>
        <h1>{title}</h1>
        <p>{subtitle}</p>
    </header>
{fragment}
</body>
</html>
"#,
        title = escape(title),
        subtitle = escape(subtitle),
        fragment = fragment,
    )
}
