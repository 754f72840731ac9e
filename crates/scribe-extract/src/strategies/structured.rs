//! Transcript text pulled from the page's client-side state globals.

use crate::error::Result;
use crate::strategy::{Artifact, Method, Outcome, Strategy};
use scribe_browser::BrowserActions;
use scribe_core::Item;
use serde_json::Value;
use std::ops::ControlFlow;

const STATE_SCRIPT: &str = r"(() => {
  if (window.__NEXT_DATA__) return JSON.stringify(window.__NEXT_DATA__);
  if (window.__INITIAL_STATE__) return JSON.stringify(window.__INITIAL_STATE__);
  return null;
})()";

/// Serialized state shorter than this cannot hold a transcript.
const MIN_STATE_LEN: usize = 1000;
/// Keys whose subtrees are searched first.
const TRANSCRIPT_KEYS: [&str; 6] = ["transcript", "text", "content", "body", "speech", "monologue"];
/// Nesting depth below which values are not inspected.
const MAX_DEPTH: usize = 10;
/// A keyed string must be longer than this.
const KEYED_MIN_CHARS: usize = 200;
/// Strings of at least this length are gathered by the fallback pass.
const LOOSE_MIN_CHARS: usize = 200;
const MIN_TRANSCRIPT_CHARS: usize = 100;

/// Visit every string in `root` depth-first in document order, down to
/// `MAX_DEPTH`. The flag tells whether the string sits under a transcript key.
fn visit_strings<'a>(
    root: &'a Value,
    mut visitor: impl FnMut(&'a str, bool) -> ControlFlow<()>,
) {
    let mut stack: Vec<(&Value, usize, bool)> = vec![(root, 0, false)];

    while let Some((value, depth, keyed)) = stack.pop() {
        if depth > MAX_DEPTH {
            continue;
        }
        match value {
            Value::String(s) => {
                if visitor(s, keyed).is_break() {
                    return;
                }
            }
            Value::Object(map) => {
                for (key, child) in map.iter().rev() {
                    let keyed = keyed || TRANSCRIPT_KEYS.contains(&key.as_str());
                    stack.push((child, depth + 1, keyed));
                }
            }
            Value::Array(items) => {
                for child in items.iter().rev() {
                    stack.push((child, depth + 1, keyed));
                }
            }
            _ => {}
        }
    }
}

/// Find transcript text in a structured state value.
///
/// The first long string under a transcript key wins; otherwise every long
/// string in the structure is joined.
pub fn find_transcript(root: &Value) -> Option<String> {
    let mut keyed_hit = None;
    visit_strings(root, |s, keyed| {
        if keyed && s.chars().count() > KEYED_MIN_CHARS {
            keyed_hit = Some(s);
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    if let Some(hit) = keyed_hit {
        return Some(hit.to_string());
    }

    let mut loose = Vec::new();
    visit_strings(root, |s, _| {
        if s.chars().count() >= LOOSE_MIN_CHARS {
            loose.push(s);
        }
        ControlFlow::Continue(())
    });
    (!loose.is_empty()).then(|| loose.join("\n"))
}

#[derive(Debug, Default)]
pub struct StructuredData;

#[async_trait::async_trait]
impl Strategy for StructuredData {
    fn method(&self) -> Method {
        Method::StructuredData
    }

    async fn extract(&self, page: &dyn BrowserActions, _item: &Item) -> Result<Outcome> {
        let raw = match page.evaluate(STATE_SCRIPT).await? {
            Value::Null => return Ok(Outcome::Declined("no client state found")),
            Value::String(s) => s,
            other => other.to_string(),
        };
        if raw.len() <= MIN_STATE_LEN {
            return Ok(Outcome::Declined("client state too small"));
        }

        let state: Value = serde_json::from_str(&raw)?;
        match find_transcript(&state) {
            Some(text) if text.chars().count() > MIN_TRANSCRIPT_CHARS => {
                Ok(Outcome::Found(Artifact::Text(text)))
            }
            _ => Ok(Outcome::Declined("no transcript in client state")),
        }
    }
}
