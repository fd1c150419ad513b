//! Recovers the JSON payload from a model reply that may wrap it in prose and
//! markdown fences.

use serde_json::Value;

use crate::error::{AnalysisError, AnalysisResult};

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    pub tag: Option<&'a str>,
    pub body: &'a str,
}

impl FencedBlock<'_> {
    fn is_json(&self) -> bool {
        self.tag
            .map(|tag| tag.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

/// Splits `text` into its fenced blocks, left to right. A fence-open is
/// followed by an optional language tag on the same line; the body runs to
/// the next fence marker, or to the end of the text when unclosed.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let (tag, body_start) = split_fence_tag(after_open);
        let body_region = &after_open[body_start..];
        match body_region.find(FENCE) {
            Some(close) => {
                blocks.push(FencedBlock {
                    tag,
                    body: &body_region[..close],
                });
                rest = &body_region[close + FENCE.len()..];
            }
            None => {
                blocks.push(FencedBlock {
                    tag,
                    body: body_region,
                });
                break;
            }
        }
    }
    blocks
}

/// Returns the language tag (if any) and the byte offset where the body
/// starts, relative to the text right after the opening backticks.
fn split_fence_tag(after_open: &str) -> (Option<&str>, usize) {
    let line_end = after_open.find('\n').unwrap_or(after_open.len());
    let first_line = &after_open[..line_end];
    let body_after_line = (line_end + 1).min(after_open.len());
    let candidate = first_line.trim();
    if candidate.is_empty() {
        return (None, body_after_line);
    }
    if !first_line.contains(FENCE) && is_fence_tag(candidate) {
        return (Some(candidate), body_after_line);
    }
    // `json` glued to the payload on the opening line: ```json{...}```
    let token_len = first_line
        .find(|ch: char| !is_tag_char(ch))
        .unwrap_or(first_line.len());
    let token = &first_line[..token_len];
    if token.eq_ignore_ascii_case("json") {
        return (Some(token), token_len);
    }
    (None, 0)
}

fn is_fence_tag(candidate: &str) -> bool {
    candidate.chars().all(is_tag_char)
}

fn is_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+' | '.')
}

/// Picks the block holding the payload: the first `json`-tagged block, else
/// the first block of any tag.
pub fn select_payload_block<'a>(blocks: &[FencedBlock<'a>]) -> Option<FencedBlock<'a>> {
    blocks
        .iter()
        .find(|block| block.is_json())
        .or_else(|| blocks.first())
        .copied()
}

/// Returns the text that should hold JSON: the selected fenced body, or the
/// whole reply when it carries no fence.
pub fn payload_text(reply: &str) -> &str {
    let blocks = fenced_blocks(reply);
    select_payload_block(&blocks)
        .map(|block| block.body)
        .unwrap_or(reply)
        .trim()
}

/// Parses the JSON payload of a reply. Anything that is not valid JSON is a
/// `MalformedResponse`; nothing is salvaged.
pub fn extract_json_payload(reply: &str) -> AnalysisResult<Value> {
    let candidate = payload_text(reply);
    if candidate.is_empty() {
        return Err(AnalysisError::malformed(
            "reply carries no JSON payload",
            reply,
        ));
    }
    serde_json::from_str(candidate).map_err(|err| {
        AnalysisError::malformed(format!("payload is not valid JSON: {err}"), candidate)
    })
}
