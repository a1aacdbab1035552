//! Source page parsing.
//!
//! Pages are Markdown. Directives are fenced blocks whose info string is the
//! directive name in braces, with optional `:key: value` lines first:
//!
//! ~~~text
//! ```{holoviews}
//! :backends: bokeh, plotly
//!
//! hv.Curve([1, 2, 3])
//! ```
//! ~~~

use std::collections::BTreeMap;
use std::ops::Range;

use nbsplice_core::DirectiveInvocation;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// A piece of a page, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain Markdown
    Markdown(String),
    /// A directive block
    Directive(DirectiveInvocation),
}

/// Split a page into Markdown and directive segments.
pub fn parse_page(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for (range, name, body) in directive_blocks(source) {
        if range.start > last {
            push_markdown(&mut segments, &source[last..range.start]);
        }
        let lineno = source[..range.start].matches('\n').count() + 1;
        segments.push(Segment::Directive(parse_directive(name, &body, lineno)));
        last = range.end;
    }

    if last < source.len() {
        push_markdown(&mut segments, &source[last..]);
    }

    segments
}

fn push_markdown(segments: &mut Vec<Segment>, text: &str) {
    if !text.trim().is_empty() {
        segments.push(Segment::Markdown(text.to_string()));
    }
}

/// `(block range, directive name, body)` for every directive fence.
fn directive_blocks(source: &str) -> Vec<(Range<usize>, String, String)> {
    let mut blocks = Vec::new();
    let mut current: Option<(Range<usize>, String, String)> = None;

    for (event, range) in Parser::new_ext(source, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                if let Some(name) = directive_name(&info) {
                    current = Some((range, name.to_string(), String::new()));
                }
            }
            Event::Text(text) => {
                if let Some((_, _, body)) = current.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    blocks
}

/// `{name}` info strings name a directive.
fn directive_name(info: &str) -> Option<&str> {
    let inner = info.trim().strip_prefix('{')?;
    let close = inner.find('}')?;
    if !inner[close + 1..].trim().is_empty() {
        return None;
    }
    let name = inner[..close].trim();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

fn parse_directive(name: String, body: &str, lineno: usize) -> DirectiveInvocation {
    let mut options = BTreeMap::new();
    let mut lines = body.lines().peekable();

    while let Some(line) = lines.peek() {
        let Some((key, value)) = parse_option(line) else {
            break;
        };
        options.insert(key, value);
        lines.next();
    }

    if !options.is_empty() && lines.peek().is_some_and(|line| line.trim().is_empty()) {
        lines.next();
    }

    DirectiveInvocation {
        name,
        options,
        content: lines.map(String::from).collect(),
        lineno,
    }
}

fn parse_option(line: &str) -> Option<(String, String)> {
    let rest = line.trim().strip_prefix(':')?;
    let (key, value) = rest.split_once(':')?;
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Directives on a page, in order.
pub fn directives(source: &str) -> Vec<DirectiveInvocation> {
    parse_page(source)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Directive(invocation) => Some(invocation),
            Segment::Markdown(_) => None,
        })
        .collect()
}
