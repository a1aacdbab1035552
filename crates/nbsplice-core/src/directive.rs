//! Directive surface.
//!
//! A directive is a named block in a source document with options and a body.
//! The front end discovers invocations; directives turn them into nodes.

use std::collections::BTreeMap;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::document::{Document, Element, Node};
use crate::engine::NotebookEngine;
use crate::env::BuildEnv;
use crate::error::{Error, Result};
use crate::materialize::execute_cells;

/// One directive occurrence in a source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveInvocation {
    /// Directive name (`exec-jupyter`, `holoviews`, ...)
    pub name: String,

    /// `:key: value` options
    pub options: BTreeMap<String, String>,

    /// Body lines
    pub content: Vec<String>,

    /// 1-based line of the directive in its source
    pub lineno: usize,
}

impl DirectiveInvocation {
    /// Body lines joined into source code.
    pub fn code(&self) -> String {
        self.content.join("\n")
    }

    /// Option value.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

/// Everything a directive may touch while running.
pub struct DirectiveContext<'a> {
    pub env: &'a mut BuildEnv,
    pub document: &'a mut Document,
    pub engine: &'a dyn NotebookEngine,
}

/// A block directive.
pub trait Directive: Send + Sync {
    /// Name the directive is registered under.
    fn name(&self) -> &'static str;

    /// Whether a body is allowed.
    fn has_content(&self) -> bool {
        true
    }

    /// Accepted option names.
    fn option_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Produce nodes for an invocation.
    fn run(
        &self,
        invocation: &DirectiveInvocation,
        ctx: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>>;
}

/// Executes its body as one notebook cell.
pub struct ExecJupyterDirective;

impl Directive for ExecJupyterDirective {
    fn name(&self) -> &'static str {
        "exec-jupyter"
    }

    fn run(
        &self,
        invocation: &DirectiveInvocation,
        ctx: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>> {
        execute_cells(&[invocation.code()], ctx.document, ctx.env, ctx.engine)
    }
}

/// Parse a comma-separated list where every item must be one of `choices`.
pub fn choice_list(argument: &str, choices: &[&str]) -> Result<Vec<String>> {
    argument
        .split(',')
        .map(|item| {
            let item = item.trim();
            if choices.contains(&item) {
                Ok(item.to_string())
            } else {
                Err(Error::Directive(format!(
                    "\"{}\" unknown; choose from {}",
                    item,
                    format_choices(choices)
                )))
            }
        })
        .collect()
}

fn format_choices(choices: &[&str]) -> String {
    let quoted: Vec<String> = choices.iter().map(|c| format!("\"{}\"", c)).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

/// Parse inline markup (emphasis, strong, code) into nodes.
pub fn inline_text(text: &str) -> Vec<Node> {
    let mut stack: Vec<Element> = vec![Element::new("inline")];

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Emphasis) => stack.push(Element::new("emphasis")),
            Event::Start(Tag::Strong) => stack.push(Element::new("strong")),
            Event::End(TagEnd::Emphasis) | Event::End(TagEnd::Strong) => {
                if stack.len() > 1 {
                    if let Some(done) = stack.pop() {
                        push_node(&mut stack, done.into());
                    }
                }
            }
            Event::Text(t) => push_node(&mut stack, Node::text(t.to_string())),
            Event::Code(code) => push_node(
                &mut stack,
                Element::new("literal").with_child(Node::text(code.to_string())).into(),
            ),
            Event::SoftBreak | Event::HardBreak => push_node(&mut stack, Node::text(" ")),
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            push_node(&mut stack, open.into());
        }
    }

    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

/// Inline error report that replaces a failed directive's output.
pub fn system_message(invocation: &DirectiveInvocation, message: &str) -> Node {
    Element::new("system_message")
        .with_attr("level", "3")
        .with_attr("type", "ERROR")
        .with_attr("line", invocation.lineno.to_string())
        .with_child(
            Element::new("paragraph").with_child(Node::text(format!(
                "Error in \"{}\" directive: {}",
                invocation.name, message
            ))),
        )
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKENDS: &[&str] = &["bokeh", "matplotlib", "plotly"];

    #[test]
    fn test_choice_list_trims_items() {
        assert_eq!(
            choice_list("bokeh, plotly", BACKENDS).unwrap(),
            vec!["bokeh", "plotly"]
        );
    }

    #[test]
    fn test_choice_list_rejects_unknown() {
        let err = choice_list("bokeh,not_a_backend", BACKENDS).unwrap_err();
        assert!(err.is_directive_error());
        assert_eq!(
            err.to_string(),
            "directive error: \"not_a_backend\" unknown; choose from \"bokeh\", \"matplotlib\" or \"plotly\""
        );
    }

    #[test]
    fn test_choice_list_rejects_empty_argument() {
        assert!(choice_list("", BACKENDS).is_err());
    }

    #[test]
    fn test_inline_text() {
        assert_eq!(inline_text("bokeh"), vec![Node::text("bokeh")]);

        let nodes = inline_text("*fast* `code`");
        assert_eq!(nodes[0].tag(), "emphasis");
        assert_eq!(nodes[0].astext(), "fast");
        assert_eq!(nodes.last().map(|n| n.tag()), Some("literal"));
    }

    #[test]
    fn test_code_joins_lines() {
        let invocation = DirectiveInvocation {
            name: "exec-jupyter".into(),
            content: vec!["a = 1".into(), "print(a)".into()],
            ..Default::default()
        };
        assert_eq!(invocation.code(), "a = 1\nprint(a)");
    }

    #[test]
    fn test_system_message() {
        let invocation = DirectiveInvocation {
            name: "holoviews".into(),
            lineno: 12,
            ..Default::default()
        };
        let node = system_message(&invocation, "boom");
        assert_eq!(node.as_element().unwrap().attr("line"), Some("12"));
        assert_eq!(node.astext(), "Error in \"holoviews\" directive: boom");
    }
}
