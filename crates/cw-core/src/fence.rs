//! Code-fence normalization for streamed message text.
//!
//! Messages arrive in fragments, so a fenced block is frequently still open
//! when we render. The scanner walks the text line by line and closes any
//! open block synthetically at the end, so the output is always balanced.

use std::sync::LazyLock;

use regex::Regex;

use crate::markup::{cursor, escape, LineBreaks};

/// Opening fence: three backticks and an optional word-character language.
static OPEN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(\w*)$").expect("valid fence pattern"));

const CLOSE_FENCE: &str = "```";
const CLOSE_TAG: &str = "</code></pre>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum FenceState {
    Text,
    Code { lang: String },
}

fn open_tag(lang: &str) -> String {
    format!(r#"<pre data-lang="{lang}"><code class="language-{lang}">"#)
}

/// Split off the next line. Returns the line (without `\n`), whether it was
/// newline-terminated, and the remainder.
fn next_line(rest: &str) -> (&str, bool, &str) {
    match rest.find('\n') {
        Some(i) => (&rest[..i], true, &rest[i + 1..]),
        None => (rest, false, ""),
    }
}

fn marker_text(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Render raw message text as markup, converting fenced blocks to
/// `<pre><code>` and appending a cursor while the stream is live.
///
/// An opening marker only counts once its line is complete; a closing
/// marker may be the last thing in the text. When the text ends inside a
/// block, the cursor (if any) goes inside the block, right before the
/// synthetic closing tag.
pub fn render_message(message: &str, is_end: bool) -> String {
    let content = escape(message, LineBreaks::Keep);
    let mut out = String::with_capacity(content.len() + 64);
    let mut state = FenceState::Text;
    let mut rest = content.as_str();

    while !rest.is_empty() {
        let (line, terminated, next) = next_line(rest);
        rest = next;

        match &state {
            FenceState::Text => {
                if terminated {
                    if let Some(caps) = OPEN_FENCE.captures(marker_text(line)) {
                        let lang = caps.get(1).map_or("", |m| m.as_str()).to_string();
                        out.push_str(&open_tag(&lang));
                        state = FenceState::Code { lang };
                        continue;
                    }
                }
            }
            FenceState::Code { .. } => {
                if marker_text(line) == CLOSE_FENCE {
                    out.push_str(CLOSE_TAG);
                    state = FenceState::Text;
                    continue;
                }
            }
        }

        out.push_str(line);
        if terminated {
            out.push('\n');
        }
    }

    if !is_end {
        out.push_str(&cursor());
    }
    if let FenceState::Code { lang } = &state {
        tracing::trace!(lang = %lang, "Closing unterminated code fence");
        out.push_str(CLOSE_TAG);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURSOR: &str = r#"<span class="tw-end-cursor"></span>"#;

    #[test]
    fn closed_fence_final() {
        let out = render_message("a\n```python\nprint(1)\n```\nb", true);
        assert_eq!(
            out,
            "a\n<pre data-lang=\"python\"><code class=\"language-python\">print(1)\n</code></pre>b"
        );
        assert_eq!(out.matches("<pre").count(), 1);
        assert_eq!(out.matches("</code></pre>").count(), 1);
        assert!(!out.contains(CURSOR));
    }

    #[test]
    fn closed_fence_streaming_puts_cursor_after_text() {
        let out = render_message("a\n```python\nprint(1)\n```\nb", false);
        assert!(out.ends_with(&format!("</code></pre>b{CURSOR}")));
    }

    #[test]
    fn unterminated_fence_streaming() {
        let out = render_message("```js\nconsole.log(1)", false);
        assert_eq!(
            out,
            format!(
                "<pre data-lang=\"js\"><code class=\"language-js\">console.log(1){CURSOR}</code></pre>"
            )
        );
    }

    #[test]
    fn unterminated_fence_final_has_no_cursor() {
        let out = render_message("```js\nconsole.log(1)", true);
        assert_eq!(
            out,
            "<pre data-lang=\"js\"><code class=\"language-js\">console.log(1)</code></pre>"
        );
    }

    #[test]
    fn plain_text_cursor() {
        assert_eq!(render_message("hello", false), format!("hello{CURSOR}"));
        assert_eq!(render_message("hello", true), "hello");
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(render_message("<b>&", true), "&lt;b&gt;&amp;");
        let out = render_message("```\nif a < b {}\n```", true);
        assert!(out.contains("if a &lt; b {}"));
    }

    #[test]
    fn opening_marker_needs_complete_line() {
        // The language tag may still be arriving.
        assert_eq!(render_message("intro\n```pyt", false), format!("intro\n```pyt{CURSOR}"));
        let out = render_message("intro\n```python\n", false);
        assert_eq!(
            out,
            format!("intro\n<pre data-lang=\"python\"><code class=\"language-python\">{CURSOR}</code></pre>")
        );
    }

    #[test]
    fn closing_marker_at_end_of_text() {
        let out = render_message("```\nx\n```", false);
        assert_eq!(
            out,
            format!("<pre data-lang=\"\"><code class=\"language-\">x\n</code></pre>{CURSOR}")
        );
    }

    #[test]
    fn adjacent_fences_are_independent_blocks() {
        let out = render_message("```a\n1\n```\n```b\n2\n```\n", true);
        assert_eq!(
            out,
            "<pre data-lang=\"a\"><code class=\"language-a\">1\n</code></pre>\
             <pre data-lang=\"b\"><code class=\"language-b\">2\n</code></pre>"
        );
    }

    #[test]
    fn malformed_marker_is_literal() {
        let out = render_message("```py thon\nx\n", true);
        assert_eq!(out, "```py thon\nx\n");
        assert!(!out.contains("<pre"));
    }

    #[test]
    fn fence_opening_inside_block_is_content() {
        let out = render_message("```md\n```rust\n```\n", true);
        assert_eq!(
            out,
            "<pre data-lang=\"md\"><code class=\"language-md\">```rust\n</code></pre>"
        );
    }

    #[test]
    fn nothing_after_unterminated_fence_opens_a_block() {
        let out = render_message("```a\nx\n```b\ny", false);
        assert_eq!(out.matches("<pre").count(), 1);
        assert_eq!(out.matches(CURSOR).count(), 1);
        assert!(out.ends_with(&format!("y{CURSOR}</code></pre>")));
    }

    #[test]
    fn crlf_markers_are_recognised() {
        let out = render_message("```sh\r\nls\r\n```\r\n", true);
        assert!(out.starts_with("<pre data-lang=\"sh\">"));
        assert!(out.contains("</code></pre>"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let text = "x\n```py\ny";
        assert_eq!(render_message(text, false), render_message(text, false));
    }

    #[test]
    fn empty_message() {
        assert_eq!(render_message("", true), "");
        assert_eq!(render_message("", false), CURSOR);
    }
}
