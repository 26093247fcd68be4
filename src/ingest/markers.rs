//! USFM inline marker removal.
//!
//! Turns marked-up verse source such as
//! `\w In|strong="G1722"\w* \it the beginning\it*\f + \ft note\f*`
//! into plain text (`In the beginning`).
//!
//! The text is tokenized into marker and text tokens, then marker pairs
//! (`\name ... \name*`) are resolved with a stack, innermost first. How a
//! pair's content survives depends on the marker name, see [`MarkerClass`].

use std::sync::LazyLock;

use regex::Regex;

/// Output of [`strip_markers_checked`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stripped {
    pub text: String,
    /// True when stripping could not run and `text` is the unmodified input.
    pub degraded: bool,
}

/// How a resolved marker pair treats its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerClass {
    /// Footnotes, endnotes, cross-references and figures: dropped entirely.
    Delete,
    /// Word-level markup with a `|attr="value"` suffix: text before `|` kept.
    Annotated,
    /// Italics, bold and small caps: content kept.
    Formatting,
    /// Any other marker: content kept, wrapper dropped.
    Default,
}

const DELETE_MARKERS: &[&str] = &["f", "fe", "x", "fig"];
const ANNOTATED_MARKERS: &[&str] = &["w"];
const FORMATTING_MARKERS: &[&str] = &["it", "bd", "sc"];

impl MarkerClass {
    /// Classify by marker name; a leading `+` (nested character marker) is
    /// ignored.
    #[must_use]
    pub fn of(name: &str) -> Self {
        let base = name.strip_prefix('+').unwrap_or(name);
        if DELETE_MARKERS.contains(&base) {
            Self::Delete
        } else if ANNOTATED_MARKERS.contains(&base) {
            Self::Annotated
        } else if FORMATTING_MARKERS.contains(&base) {
            Self::Formatting
        } else {
            Self::Default
        }
    }

    fn resolve(self, content: String) -> String {
        match self {
            Self::Delete => String::new(),
            Self::Annotated => content
                .split('|')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
            Self::Formatting | Self::Default => content,
        }
    }
}

struct Patterns {
    /// `\v 12` or `\v 2-3` with surrounding spacing.
    verse: Regex,
    /// `\name`, `\+name`, `\name*`, `\+name*`.
    marker: Regex,
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(|| {
    Ok(Patterns {
        verse: Regex::new(r"\\v\s+\d+(?:-\d+)?\s*")?,
        marker: Regex::new(r"\\(\+?\w+)(\*?)")?,
    })
});

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Open(&'a str),
    Close(&'a str),
}

fn tokenize<'a>(marker: &Regex, text: &'a str) -> Vec<Token<'a>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in marker.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            tokens.push(Token::Text(&text[last..whole.start()]));
        }
        let name = caps.get(1).map_or("", |m| m.as_str());
        let closing = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        tokens.push(if closing {
            Token::Close(name)
        } else {
            Token::Open(name)
        });
        last = whole.end();
    }
    if last < text.len() {
        tokens.push(Token::Text(&text[last..]));
    }
    tokens
}

struct Frame<'a> {
    name: &'a str,
    content: String,
}

/// Resolve marker pairs with a stack. Unpaired openers and closers are
/// dropped while their surrounding text stays in place.
fn resolve(tokens: &[Token<'_>]) -> String {
    let mut stack = vec![Frame {
        name: "",
        content: String::new(),
    }];

    for token in tokens {
        match *token {
            Token::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.content.push_str(text);
                }
            }
            Token::Open(name) => stack.push(Frame {
                name,
                content: String::new(),
            }),
            Token::Close(name) => {
                let Some(pos) = stack[1..].iter().rposition(|f| f.name == name) else {
                    continue;
                };
                let pos = pos + 1;
                while stack.len() > pos + 1 {
                    fold_top(&mut stack);
                }
                if let Some(frame) = stack.pop() {
                    let resolved = MarkerClass::of(frame.name).resolve(frame.content);
                    if let Some(parent) = stack.last_mut() {
                        parent.content.push_str(&resolved);
                    }
                }
            }
        }
    }

    while stack.len() > 1 {
        fold_top(&mut stack);
    }
    stack.pop().map(|f| f.content).unwrap_or_default()
}

/// Drop the top frame's marker, keeping its content in the parent.
fn fold_top(stack: &mut Vec<Frame<'_>>) {
    if let Some(frame) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.content.push_str(&frame.content);
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip USFM markers, reporting whether stripping actually ran.
#[must_use]
pub fn strip_markers_checked(text: &str) -> Stripped {
    let patterns = match PATTERNS.as_ref() {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("marker patterns failed to compile: {e}");
            return Stripped {
                text: text.to_string(),
                degraded: true,
            };
        }
    };

    let without_verse = patterns.verse.replace_all(text, "");
    let tokens = tokenize(&patterns.marker, &without_verse);
    let resolved = resolve(&tokens);

    Stripped {
        text: collapse_whitespace(&resolved),
        degraded: false,
    }
}

/// Strip USFM markers from verse text. Never fails; see
/// [`strip_markers_checked`] to detect a pass-through.
#[must_use]
pub fn strip_markers(text: &str) -> String {
    strip_markers_checked(text).text
}
