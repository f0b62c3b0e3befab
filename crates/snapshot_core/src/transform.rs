use std::sync::LazyLock;

use regex::{Captures, Regex};

static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("script pattern"));
static LINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<link\s.*?/?>").expect("link pattern"));
static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<meta\s.*?/?>").expect("meta pattern"));

/// One `{pattern: replacement}` rule, applied as a global regex substitution.
///
/// Replacement text follows the `String.prototype.replace` conventions of the
/// page scripts these rules are usually copied from: `$$` is a literal `$`,
/// `$&` the whole match, `` $` `` and `$'` the text before and after it, and
/// `$n`/`$nn` a capture group when that group exists. Any other `$` is kept
/// literally, so `$1px` is group 1 followed by `px` and `$5` stays `$5` in a
/// pattern with fewer groups.
#[derive(Debug, Clone)]
pub struct ReplaceRule {
    pattern: Regex,
    replacement: Vec<Piece>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
    Named(String),
    Before,
    After,
}

impl ReplaceRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = Regex::new(pattern)?;
        let replacement = parse_replacement(&replacement.into(), &pattern);
        Ok(Self {
            pattern,
            replacement,
        })
    }

    fn apply(&self, html: &str) -> String {
        self.pattern
            .replace_all(html, |caps: &Captures<'_>| {
                let whole = caps.get(0).map_or(0..0, |m| m.range());
                let mut out = String::new();
                for piece in &self.replacement {
                    match piece {
                        Piece::Literal(text) => out.push_str(text),
                        Piece::Group(index) => {
                            out.push_str(caps.get(*index).map_or("", |m| m.as_str()))
                        }
                        Piece::Named(name) => {
                            out.push_str(caps.name(name).map_or("", |m| m.as_str()))
                        }
                        Piece::Before => out.push_str(&html[..whole.start]),
                        Piece::After => out.push_str(&html[whole.end..]),
                    }
                }
                out
            })
            .into_owned()
    }
}

fn parse_replacement(text: &str, pattern: &Regex) -> Vec<Piece> {
    let groups = pattern.captures_len() - 1;
    let has_names = pattern.capture_names().flatten().next().is_some();
    let bytes = text.as_bytes();
    let digit = |i: usize| {
        bytes
            .get(i)
            .filter(|b| b.is_ascii_digit())
            .map(|b| (b - b'0') as usize)
    };

    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < text.len() {
        let Some(offset) = text[i..].find('$') else {
            literal.push_str(&text[i..]);
            break;
        };
        literal.push_str(&text[i..i + offset]);
        i += offset;

        let (piece, consumed) = match bytes.get(i + 1) {
            Some(b'$') => (Piece::Literal("$".to_string()), 2),
            Some(b'&') => (Piece::Group(0), 2),
            Some(b'`') => (Piece::Before, 2),
            Some(b'\'') => (Piece::After, 2),
            Some(b'<') if has_names => match text[i + 2..].find('>') {
                Some(end) => (Piece::Named(text[i + 2..i + 2 + end].to_string()), end + 3),
                None => (Piece::Literal("$".to_string()), 1),
            },
            _ => match (digit(i + 1), digit(i + 2)) {
                (Some(tens), Some(ones)) if (1..=groups).contains(&(tens * 10 + ones)) => {
                    (Piece::Group(tens * 10 + ones), 3)
                }
                (Some(single), _) if (1..=groups).contains(&single) => (Piece::Group(single), 2),
                _ => (Piece::Literal("$".to_string()), 1),
            },
        };
        match piece {
            Piece::Literal(dollar) => literal.push_str(&dollar),
            piece => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(piece);
            }
        }
        i += consumed;
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

/// Rewrites applied to rendered markup before it is written.
///
/// Stages run in a fixed order: scripts, link tags, meta tags, then each
/// replacement rule in configured order, each seeing the previous output.
#[derive(Debug, Clone, Default)]
pub struct TransformChain {
    remove_scripts: bool,
    remove_link_tags: bool,
    remove_meta_tags: bool,
    replacements: Vec<ReplaceRule>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_scripts(mut self, enabled: bool) -> Self {
        self.remove_scripts = enabled;
        self
    }

    pub fn remove_link_tags(mut self, enabled: bool) -> Self {
        self.remove_link_tags = enabled;
        self
    }

    pub fn remove_meta_tags(mut self, enabled: bool) -> Self {
        self.remove_meta_tags = enabled;
        self
    }

    pub fn replace(mut self, rule: ReplaceRule) -> Self {
        self.replacements.push(rule);
        self
    }

    pub fn apply(&self, html: &str) -> String {
        let mut out = html.to_string();
        if self.remove_scripts {
            out = SCRIPT_TAG.replace_all(&out, "").into_owned();
        }
        if self.remove_link_tags {
            out = LINK_TAG.replace_all(&out, "").into_owned();
        }
        if self.remove_meta_tags {
            out = META_TAG.replace_all(&out, "").into_owned();
        }
        for rule in &self.replacements {
            out = rule.apply(&out);
        }
        out
    }
}
