//! Edit API: parses a mutator command line, validates its version and
//! position/range, and rewrites the document via [`crate::store::SegmentStore`].
//!
//! Every command that reaches this module is a mutator — queries
//! (`DOC?`, `PERM?`, `LOG?`, `DISCONNECT`) are answered inline by the
//! transport layer and never enqueued, so there is no separate
//! "is this a mutator" branch here: reaching `EditApi::apply` at all
//! already implies one.
//!
//! Wire format (resolved open question, see DESIGN.md): a queued
//! command-text is `<version> <COMMAND> <args...>` — the leading integer
//! is the version the client believed current when it issued the
//! command, compared against the document's current version as the
//! universal precondition every command shares.

use crate::document::Document;
use crate::error::{EditOutcome, RejectReason};
use crate::segment::SegmentState;

#[derive(Debug, Clone, PartialEq)]
enum EditCommand {
    Insert { pos: usize, text: String },
    Del { pos: usize, len: usize },
    Newline { pos: usize },
    Heading { level: u8, pos: usize },
    Bold { start: usize, end: usize },
    Italic { start: usize, end: usize },
    Code { start: usize, end: usize },
    Blockquote { pos: usize },
    UnorderedList { pos: usize },
    HorizontalRule { pos: usize },
    Link { start: usize, end: usize, url: String },
    OrderedList { pos: usize },
}

/// Top-level entry point: apply one queued command-text line against
/// `document`. Never panics on malformed input — every failure mode
/// resolves to a `Reject` outcome.
pub fn apply(document: &mut Document, command_text: &str) -> EditOutcome {
    let mut head = command_text.splitn(2, ' ');
    let version_tok = match head.next() {
        Some(tok) if !tok.is_empty() => tok,
        _ => return EditOutcome::Reject(RejectReason::InvalidPosition),
    };
    let version: u64 = match version_tok.parse() {
        Ok(v) => v,
        Err(_) => return EditOutcome::Reject(RejectReason::InvalidPosition),
    };
    if version != document.version() {
        return EditOutcome::Reject(RejectReason::OutdatedVersion);
    }
    let rest = head.next().unwrap_or("");
    let command = match parse_command(rest) {
        Ok(cmd) => cmd,
        Err(reason) => return EditOutcome::Reject(reason),
    };

    let baseline = document.flatten();
    match dispatch(document, &baseline, command) {
        Ok(()) => EditOutcome::Success,
        Err(reason) => EditOutcome::Reject(reason),
    }
}

fn parse_command(rest: &str) -> Result<EditCommand, RejectReason> {
    let mut parts = rest.splitn(2, ' ');
    let name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("");
    match name {
        "INSERT" => {
            let mut it = args.splitn(2, ' ');
            let pos = parse_usize(it.next())?;
            let text = it.next().unwrap_or("").to_string();
            Ok(EditCommand::Insert { pos, text })
        }
        "DEL" => {
            let (pos, len) = parse_two_usize(args)?;
            Ok(EditCommand::Del { pos, len })
        }
        "NEWLINE" => Ok(EditCommand::Newline {
            pos: parse_usize(args.split_whitespace().next())?,
        }),
        "HEADING" => {
            let (level, pos) = parse_two_usize(args)?;
            if !(1..=3).contains(&level) {
                return Err(RejectReason::InvalidPosition);
            }
            Ok(EditCommand::Heading {
                level: level as u8,
                pos,
            })
        }
        "BOLD" => {
            let (start, end) = parse_range(args)?;
            Ok(EditCommand::Bold { start, end })
        }
        "ITALIC" => {
            let (start, end) = parse_range(args)?;
            Ok(EditCommand::Italic { start, end })
        }
        "CODE" => {
            let (start, end) = parse_range(args)?;
            Ok(EditCommand::Code { start, end })
        }
        "BLOCKQUOTE" => Ok(EditCommand::Blockquote {
            pos: parse_usize(args.split_whitespace().next())?,
        }),
        "UNORDERED_LIST" => Ok(EditCommand::UnorderedList {
            pos: parse_usize(args.split_whitespace().next())?,
        }),
        "HORIZONTAL_RULE" => Ok(EditCommand::HorizontalRule {
            pos: parse_usize(args.split_whitespace().next())?,
        }),
        "ORDERED_LIST" => Ok(EditCommand::OrderedList {
            pos: parse_usize(args.split_whitespace().next())?,
        }),
        "LINK" => {
            let tokens: Vec<&str> = args.split_whitespace().collect();
            if tokens.len() != 3 {
                return Err(RejectReason::InvalidPosition);
            }
            let start = parse_usize(Some(tokens[0]))?;
            let end = parse_usize(Some(tokens[1]))?;
            if end <= start {
                return Err(RejectReason::InvalidPosition);
            }
            Ok(EditCommand::Link {
                start,
                end,
                url: tokens[2].to_string(),
            })
        }
        _ => Err(RejectReason::InvalidPosition),
    }
}

fn parse_usize(tok: Option<&str>) -> Result<usize, RejectReason> {
    tok.and_then(|t| t.parse().ok())
        .ok_or(RejectReason::InvalidPosition)
}

fn parse_two_usize(args: &str) -> Result<(usize, usize), RejectReason> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(RejectReason::InvalidPosition);
    }
    Ok((parse_usize(Some(tokens[0]))?, parse_usize(Some(tokens[1]))?))
}

fn parse_range(args: &str) -> Result<(usize, usize), RejectReason> {
    let (start, end) = parse_two_usize(args)?;
    if end <= start {
        return Err(RejectReason::InvalidPosition);
    }
    Ok((start, end))
}

/// Prepend `\n` to `marker` unless `pos` is already at the start of a
/// line.
fn block_marker(baseline: &[u8], pos: usize, marker: &str) -> String {
    if pos == 0 || baseline.get(pos - 1) == Some(&b'\n') {
        marker.to_string()
    } else {
        format!("\n{marker}")
    }
}

/// `DELETED_POSITION` check: the byte the command addresses (`pos` for a
/// single-position command, or the first byte of a range) must not
/// already be scheduled for deletion earlier in this batch.
fn check_not_deleted(document: &mut Document, pos: usize) -> Result<(), RejectReason> {
    if document.store().state_at(pos) == Some(SegmentState::PendingDelete) {
        Err(RejectReason::DeletedPosition)
    } else {
        Ok(())
    }
}

fn dispatch(
    document: &mut Document,
    baseline: &[u8],
    command: EditCommand,
) -> Result<(), RejectReason> {
    match command {
        EditCommand::Insert { pos, text } => {
            check_not_deleted(document, pos)?;
            document.store().add_text(pos, text.as_bytes())?;
            Ok(())
        }
        EditCommand::Del { pos, len } => {
            check_not_deleted(document, pos)?;
            document.store().delete_range(pos, len)?;
            Ok(())
        }
        EditCommand::Newline { pos } => {
            check_not_deleted(document, pos)?;
            document.store().add_text(pos, b"\n")?;
            Ok(())
        }
        EditCommand::Heading { level, pos } => {
            check_not_deleted(document, pos)?;
            let marker = format!("{} ", "#".repeat(level as usize));
            let text = block_marker(baseline, pos, &marker);
            document.store().add_text(pos, text.as_bytes())?;
            Ok(())
        }
        EditCommand::Blockquote { pos } => {
            check_not_deleted(document, pos)?;
            let text = block_marker(baseline, pos, "> ");
            document.store().add_text(pos, text.as_bytes())?;
            Ok(())
        }
        EditCommand::UnorderedList { pos } => {
            check_not_deleted(document, pos)?;
            let text = block_marker(baseline, pos, "- ");
            document.store().add_text(pos, text.as_bytes())?;
            Ok(())
        }
        EditCommand::HorizontalRule { pos } => {
            check_not_deleted(document, pos)?;
            let text = block_marker(baseline, pos, "---\n");
            document.store().add_text(pos, text.as_bytes())?;
            Ok(())
        }
        EditCommand::Bold { start, end } => wrap_range(document, start, end, "**"),
        EditCommand::Italic { start, end } => wrap_range(document, start, end, "*"),
        EditCommand::Code { start, end } => wrap_range(document, start, end, "`"),
        EditCommand::Link { start, end, url } => {
            check_not_deleted(document, start)?;
            document
                .store()
                .put_text(end, format!("]({url})").as_bytes())?;
            document.store().add_text(start, b"[")?;
            Ok(())
        }
        EditCommand::OrderedList { pos } => ordered_list(document, baseline, pos),
    }
}

/// BOLD/ITALIC/CODE share this shape: close at `end` first (so the
/// closing marker can never be read as affecting `start`'s coordinate),
/// then open at `start` with `add_text` so the new marker sits outside
/// any marker insertions already at `start` from earlier in this batch.
fn wrap_range(
    document: &mut Document,
    start: usize,
    end: usize,
    marker: &str,
) -> Result<(), RejectReason> {
    check_not_deleted(document, start)?;
    document.store().put_text(end, marker.as_bytes())?;
    document.store().add_text(start, marker.as_bytes())?;
    Ok(())
}

fn line_start_at(text: &[u8], idx: usize) -> usize {
    let mut i = idx;
    while i > 0 {
        if text[i - 1] == b'\n' {
            return i;
        }
        i -= 1;
    }
    0
}

fn next_line_start(text: &[u8], from: usize) -> Option<usize> {
    text[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|rel| from + rel + 1)
}

/// If `text[at..]` begins with `<digits>. `, returns the parsed number and
/// the byte length of that prefix (digits plus the two marker bytes).
fn parse_ordered_prefix(text: &[u8], at: usize) -> Option<(u64, usize)> {
    let mut i = at;
    while i < text.len() && text[i].is_ascii_digit() {
        i += 1;
    }
    let digit_len = i - at;
    if digit_len == 0 {
        return None;
    }
    if text.get(i) != Some(&b'.') || text.get(i + 1) != Some(&b' ') {
        return None;
    }
    let number: u64 = std::str::from_utf8(&text[at..i]).ok()?.parse().ok()?;
    Some((number, digit_len + 2))
}

fn ordered_list(document: &mut Document, baseline: &[u8], pos: usize) -> Result<(), RejectReason> {
    check_not_deleted(document, pos)?;
    if pos > baseline.len() {
        return Err(RejectReason::InvalidPosition);
    }

    let line_start = line_start_at(baseline, pos);
    let prev = if line_start == 0 {
        0
    } else {
        let prev_line_start = line_start_at(baseline, line_start - 1);
        parse_ordered_prefix(baseline, prev_line_start)
            .map(|(n, _)| n)
            .unwrap_or(0)
    };

    // The new item is always its own line: besides the leading block-element
    // newline (if `pos` isn't already at line start), it carries a trailing
    // `\n` so the renumbered line that used to start at `pos` doesn't fuse
    // onto it — see the worked renumbering example in DESIGN.md.
    let marker = format!("{}. \n", prev + 1);
    let text = block_marker(baseline, pos, &marker);
    document.store().add_text(pos, text.as_bytes())?;

    let mut cursor = Some(pos);
    let mut next_number = prev + 2;
    while let Some(at) = cursor {
        let Some((_old_number, prefix_len)) = parse_ordered_prefix(baseline, at) else {
            break;
        };
        document.store().delete_range(at, prefix_len)?;
        document
            .store()
            .add_text(at, format!("{next_number}. ").as_bytes())?;
        next_number += 1;
        cursor = next_line_start(baseline, at);
    }
    Ok(())
}
