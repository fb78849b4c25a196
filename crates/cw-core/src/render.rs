//! Renders an aggregated post snapshot into one markup document.

use std::sync::LazyLock;

use cw_types::AttachmentType;
use regex::Regex;

use crate::fence::render_message;
use crate::markup::{cursor, div, escape, span, Elem, LineBreaks};

/// Plan rows look like `3. do the thing`.
static PLAN_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.(.*)$").expect("valid plan item pattern"));

/// Role name used until the agent says who the post is for.
pub const UNKNOWN_ROLE: &str = "Unknown";

/// Status shown for a freshly started post.
pub const DEFAULT_STATUS: &str = "Updating";

/// One (possibly still growing) attachment of a post.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub kind: AttachmentType,
    pub content: String,
    pub is_end: bool,
}

/// Everything known about the post currently being produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSnapshot {
    pub attachments: Vec<Attachment>,
    pub status: String,
    pub send_to: String,
    pub message: String,
    pub message_is_end: bool,
    pub message_sent: bool,
}

impl Default for PostSnapshot {
    fn default() -> Self {
        Self {
            attachments: Vec::new(),
            status: DEFAULT_STATUS.to_string(),
            send_to: UNKNOWN_ROLE.to_string(),
            message: String::new(),
            message_is_end: false,
            message_sent: false,
        }
    }
}

/// Render the whole post body.
///
/// `is_end` selects the final view: no cursors, no status block, and raw
/// tool code hidden.
pub fn render_post(post: &PostSnapshot, is_end: bool) -> String {
    let mut chunks: Vec<String> = Vec::new();

    for attachment in &post.attachments {
        if attachment.kind == AttachmentType::ArtifactPaths {
            continue;
        }
        if is_end && attachment.kind == AttachmentType::Python {
            continue;
        }
        chunks.push(render_attachment(attachment, is_end));
    }

    if !post.message.is_empty() {
        if post.send_to == UNKNOWN_ROLE {
            chunks.push("**Message**:".to_string());
        } else {
            chunks.push(format!("**Message To {}**:", escape(&post.send_to, LineBreaks::Block)));
        }

        if !post.message_sent {
            chunks.push(render_message(&post.message, post.message_is_end || is_end));
        }
    }

    if !is_end {
        chunks.push(render_status(&post.status));
    }

    chunks.join("\n\n")
}

fn render_status(status: &str) -> String {
    let spinner = Elem::new("svg")
        .attr("viewBox", "22 22 44 44")
        .render(&[Elem::new("circle").empty()]);
    div("tw-status").render(&[
        span("tw-status-updating").render(&[spinner]),
        span("tw-status-msg").render(&[escape(&format!("{status}..."), LineBreaks::Block)]),
    ])
}

/// Render one attachment block with its header.
pub fn render_attachment(attachment: &Attachment, is_end: bool) -> String {
    let live = !(is_end || attachment.is_end);
    let header = div("tw-atta-header").render(&[
        div("tw-atta-key").render(&[escape(&attachment.kind.label(), LineBreaks::Block)]),
        div("tw-atta-id").render(&[escape(&attachment.id, LineBreaks::Block)]),
    ]);

    let body = match attachment.kind {
        AttachmentType::Plan | AttachmentType::InitPlan => render_plan(&attachment.content, live),
        AttachmentType::ExecutionResult => Elem::new("pre")
            .class("tw-execution-result")
            .render(&[Elem::new("code").render(&[escape(&attachment.content, LineBreaks::Block)])]),
        AttachmentType::Python | AttachmentType::Sample => Elem::new("pre")
            .class("tw-python")
            .attr("data-lang", "python")
            .render(&[Elem::new("code")
                .class("language-python")
                .render(&[escape(&attachment.content, LineBreaks::Entity)])]),
        _ => {
            let mut text = escape(&attachment.content, LineBreaks::Block);
            if live {
                text.push_str(&cursor());
            }
            text
        }
    };

    div("tw-atta").render(&[header, div("tw-atta-cnt").render(&[body])])
}

fn render_plan(content: &str, live: bool) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let last = lines.len() - 1;
    let items: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let text = match PLAN_ITEM.captures(row) {
                Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
                None => row,
            };
            let mut cnt = escape(text, LineBreaks::Block);
            if live && idx == last {
                cnt.push_str(&cursor());
            }
            div("tw-plan-item").render(&[
                div("tw-plan-idx").render(&[(idx + 1).to_string()]),
                div("tw-plan-cnt").render(&[cnt]),
            ])
        })
        .collect();
    div("tw-plan").render(&items)
}
