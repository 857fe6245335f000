//! # NDN name regular expressions
//!
//! A component-level pattern language over names, used by interest filters
//! and config-policy rules. A pattern is a sequence of component matchers:
//!
//! * `<ndn>` matches one component whose escaped string matches the inner
//!   expression; `<>` matches any single component.
//! * `[<a><b>]` matches one component from a set, `[^...]` its complement.
//! * `*`, `+`, `?`, `{n}`, `{n,}` and `{n,m}` repeat the preceding matcher.
//! * `(...)` groups and captures; `|` separates alternatives.
//! * A leading `^` is implied; a trailing `$` anchors the end of the name.
//!
//! Captured groups can be substituted back into a new name with
//! [`NdnRegexTopMatcher::expand`], using `\1`-style references.

use core::fmt;

use regex::Regex;

use crate::error::InvalidArgument;
use crate::types::Name;

#[derive(Clone, Debug)]
enum Piece {
    /// `<>`: any single component.
    Any,
    /// `<expr>`: one component whose escaped string matches `expr`.
    Component(Regex),
    /// `[...]` / `[^...]`: one component from a set or its complement.
    Set { negated: bool, members: Vec<Regex> },
    /// `(...)`: alternatives, capturing the matched component range.
    Group { alternatives: Vec<Vec<Repeat>>, index: usize },
}

#[derive(Clone, Debug)]
struct Repeat {
    piece: Piece,
    min: usize,
    max: Option<usize>,
}

/// One backtracking state: a position in the name plus the capture ranges
/// committed so far.
#[derive(Clone, Debug, Eq, PartialEq)]
struct MatchState {
    pos: usize,
    captures: Vec<Option<(usize, usize)>>,
}

/// A compiled NDN name regex.
#[derive(Clone)]
pub struct NdnRegexTopMatcher {
    pattern: String,
    alternatives: Vec<Vec<Repeat>>,
    anchored_end: bool,
    group_count: usize,
}

impl fmt::Debug for NdnRegexTopMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NdnRegexTopMatcher({:?})", self.pattern)
    }
}

impl NdnRegexTopMatcher {
    pub fn new(pattern: &str) -> Result<Self, InvalidArgument> {
        let mut source = pattern.trim();
        source = source.strip_prefix('^').unwrap_or(source);
        let anchored_end = source.ends_with('$');
        if anchored_end {
            source = &source[..source.len() - 1];
        }
        let mut parser = Parser { input: source.as_bytes(), at: 0, group_count: 0 };
        let alternatives = parser.parse_alternatives(None)?;
        if parser.at != parser.input.len() {
            return Err(InvalidArgument::new(format!(
                "unexpected character at offset {} of name regex \"{pattern}\"",
                parser.at
            )));
        }
        Ok(Self {
            pattern: pattern.to_string(),
            alternatives,
            anchored_end,
            group_count: parser.group_count,
        })
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True if `name` matches: always anchored at the first component, and
    /// at the last too when the pattern ends with `$`.
    pub fn matches(&self, name: &Name) -> bool {
        self.first_match(name).is_some()
    }

    /// Matches `name` and substitutes the captures into `expansion`, which
    /// mixes `\1`-style group references with literal URI text, e.g.
    /// `"\1\2"` or `"/prefix\1"`.
    pub fn expand(&self, name: &Name, expansion: &str) -> Option<Name> {
        let components = component_strings(name);
        let state = self.first_match(name)?;
        let mut result = Name::new();
        let mut rest = expansion;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('\\') {
                let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
                if digits.is_empty() {
                    return None;
                }
                let group: usize = digits.parse().ok()?;
                let (begin, end) = state.captures.get(group.checked_sub(1)?).copied().flatten()?;
                for component_uri in &components[begin..end] {
                    result.append(crate::types::Component::from_escaped_string(component_uri).ok()?);
                }
                rest = &after[digits.len()..];
            } else {
                let literal_end = rest.find('\\').unwrap_or(rest.len());
                let literal = &rest[..literal_end];
                let parsed = Name::from_uri(literal).ok()?;
                result.append_name(&parsed);
                rest = &rest[literal_end..];
            }
        }
        Some(result)
    }

    fn first_match(&self, name: &Name) -> Option<MatchState> {
        let components = component_strings(name);
        let start = MatchState { pos: 0, captures: vec![None; self.group_count] };
        let states = ends_of_alternatives(&self.alternatives, &components, start);
        states
            .into_iter()
            .find(|state| !self.anchored_end || state.pos == components.len())
    }
}

fn component_strings(name: &Name) -> Vec<String> {
    name.components().iter().map(|c| c.to_string()).collect()
}

// ---- matching ----

fn ends_of_alternatives(
    alternatives: &[Vec<Repeat>],
    components: &[String],
    state: MatchState,
) -> Vec<MatchState> {
    let mut states = Vec::new();
    for alternative in alternatives {
        states.extend(ends_of_sequence(alternative, components, state.clone()));
    }
    dedup(states)
}

fn ends_of_sequence(
    sequence: &[Repeat],
    components: &[String],
    state: MatchState,
) -> Vec<MatchState> {
    let mut states = vec![state];
    for repeat in sequence {
        let mut next = Vec::new();
        for state in states {
            next.extend(ends_of_repeat(repeat, components, state));
        }
        states = dedup(next);
        if states.is_empty() {
            break;
        }
    }
    states
}

fn ends_of_repeat(repeat: &Repeat, components: &[String], state: MatchState) -> Vec<MatchState> {
    let mut accepted = Vec::new();
    let mut level = vec![state];
    let mut count = 0;
    loop {
        if count >= repeat.min {
            accepted.push(level.clone());
        }
        if repeat.max.is_some_and(|max| count >= max) || count > components.len() {
            break;
        }
        let mut next = Vec::new();
        for state in &level {
            next.extend(ends_of_piece(&repeat.piece, components, state.clone()));
        }
        level = dedup(next);
        if level.is_empty() {
            break;
        }
        count += 1;
    }
    // Greedy: prefer the longest repetition.
    dedup(accepted.into_iter().rev().flatten().collect())
}

fn ends_of_piece(piece: &Piece, components: &[String], state: MatchState) -> Vec<MatchState> {
    match piece {
        Piece::Any => consume_one(components, state, |_| true),
        Piece::Component(member) => consume_one(components, state, |text| member.is_match(text)),
        Piece::Set { negated, members } => consume_one(components, state, |text| {
            members.iter().any(|member| member.is_match(text)) != *negated
        }),
        Piece::Group { alternatives, index } => {
            let begin = state.pos;
            ends_of_alternatives(alternatives, components, state)
                .into_iter()
                .map(|mut state| {
                    state.captures[*index] = Some((begin, state.pos));
                    state
                })
                .collect()
        }
    }
}

fn consume_one(
    components: &[String],
    state: MatchState,
    accept: impl Fn(&str) -> bool,
) -> Vec<MatchState> {
    match components.get(state.pos) {
        Some(text) if accept(text) => {
            vec![MatchState { pos: state.pos + 1, captures: state.captures }]
        }
        _ => Vec::new(),
    }
}

fn dedup(states: Vec<MatchState>) -> Vec<MatchState> {
    let mut unique: Vec<MatchState> = Vec::with_capacity(states.len());
    for state in states {
        if !unique.contains(&state) {
            unique.push(state);
        }
    }
    unique
}

// ---- parsing ----

struct Parser<'a> {
    input: &'a [u8],
    at: usize,
    group_count: usize,
}

impl<'a> Parser<'a> {
    fn parse_alternatives(
        &mut self,
        closing: Option<u8>,
    ) -> Result<Vec<Vec<Repeat>>, InvalidArgument> {
        let mut alternatives = vec![Vec::new()];
        loop {
            match self.peek() {
                None => {
                    if closing.is_some() {
                        return Err(InvalidArgument::new("unterminated group in name regex"));
                    }
                    return Ok(alternatives);
                }
                Some(byte) if Some(byte) == closing => return Ok(alternatives),
                Some(b'|') => {
                    self.at += 1;
                    alternatives.push(Vec::new());
                }
                Some(_) => {
                    let piece = self.parse_piece()?;
                    let (min, max) = self.parse_quantifier()?;
                    if let Some(alternative) = alternatives.last_mut() {
                        alternative.push(Repeat { piece, min, max });
                    }
                }
            }
        }
    }

    fn parse_piece(&mut self) -> Result<Piece, InvalidArgument> {
        match self.peek() {
            Some(b'<') => {
                let inner = self.take_until(b'<', b'>')?;
                if inner.is_empty() {
                    Ok(Piece::Any)
                } else {
                    Ok(Piece::Component(compile_component(&inner)?))
                }
            }
            Some(b'(') => {
                self.at += 1;
                let index = self.group_count;
                self.group_count += 1;
                let alternatives = self.parse_alternatives(Some(b')'))?;
                self.at += 1; // consume ')'
                Ok(Piece::Group { alternatives, index })
            }
            Some(b'[') => {
                let inner = self.take_until(b'[', b']')?;
                let (negated, body) = match inner.strip_prefix('^') {
                    Some(body) => (true, body.to_string()),
                    None => (false, inner),
                };
                let mut members = Vec::new();
                let mut rest = body.as_str();
                while !rest.is_empty() {
                    let Some(stripped) = rest.strip_prefix('<') else {
                        return Err(InvalidArgument::new(
                            "a component set lists <...> members only",
                        ));
                    };
                    let Some(end) = stripped.find('>') else {
                        return Err(InvalidArgument::new("unterminated component in set"));
                    };
                    members.push(compile_component(&stripped[..end])?);
                    rest = &stripped[end + 1..];
                }
                Ok(Piece::Set { negated, members })
            }
            _ => Err(InvalidArgument::new(
                "expected <component>, (group) or [set] in name regex",
            )),
        }
    }

    fn parse_quantifier(&mut self) -> Result<(usize, Option<usize>), InvalidArgument> {
        match self.peek() {
            Some(b'*') => {
                self.at += 1;
                Ok((0, None))
            }
            Some(b'+') => {
                self.at += 1;
                Ok((1, None))
            }
            Some(b'?') => {
                self.at += 1;
                Ok((0, Some(1)))
            }
            Some(b'{') => {
                let inner = self.take_until(b'{', b'}')?;
                let parse_bound = |text: &str| -> Result<usize, InvalidArgument> {
                    text.parse()
                        .map_err(|_| InvalidArgument::new("invalid repeat bound in name regex"))
                };
                if let Some((low, high)) = inner.split_once(',') {
                    let min = parse_bound(low)?;
                    let max = if high.is_empty() { None } else { Some(parse_bound(high)?) };
                    Ok((min, max))
                } else {
                    let exact = parse_bound(&inner)?;
                    Ok((exact, Some(exact)))
                }
            }
            _ => Ok((1, Some(1))),
        }
    }

    fn take_until(&mut self, open: u8, close: u8) -> Result<String, InvalidArgument> {
        debug_assert_eq!(Some(open), self.peek());
        self.at += 1;
        let start = self.at;
        while let Some(byte) = self.peek() {
            if byte == close {
                let inner = core::str::from_utf8(&self.input[start..self.at])
                    .map_err(|_| InvalidArgument::new("name regex is not valid UTF-8"))?
                    .to_string();
                self.at += 1;
                return Ok(inner);
            }
            self.at += 1;
        }
        Err(InvalidArgument::new(format!(
            "missing closing '{}' in name regex",
            close as char
        )))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.at).copied()
    }
}

fn compile_component(expression: &str) -> Result<Regex, InvalidArgument> {
    Regex::new(&format!("\\A(?:{expression})\\z")).map_err(|error| {
        InvalidArgument::new(format!("invalid component expression: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn literal_components_anchor_at_the_start() {
        let matcher = NdnRegexTopMatcher::new("<a><b>").unwrap();
        assert!(matcher.matches(&name("/a/b")));
        assert!(matcher.matches(&name("/a/b/c")));
        assert!(!matcher.matches(&name("/x/a/b")));
        assert!(!matcher.matches(&name("/a")));
    }

    #[test]
    fn dollar_anchors_the_end() {
        let matcher = NdnRegexTopMatcher::new("^<a><b>$").unwrap();
        assert!(matcher.matches(&name("/a/b")));
        assert!(!matcher.matches(&name("/a/b/c")));
    }

    #[test]
    fn wildcards_and_repeats() {
        let matcher = NdnRegexTopMatcher::new("^<ndn><>*<blog>$").unwrap();
        assert!(matcher.matches(&name("/ndn/blog")));
        assert!(matcher.matches(&name("/ndn/x/y/blog")));
        assert!(!matcher.matches(&name("/ndn/x")));

        let matcher = NdnRegexTopMatcher::new("<a>{2,3}$").unwrap();
        assert!(!matcher.matches(&name("/a")));
        assert!(matcher.matches(&name("/a/a")));
        assert!(matcher.matches(&name("/a/a/a")));
        assert!(!matcher.matches(&name("/a/a/a/a")));
    }

    #[test]
    fn component_expressions_use_string_regex() {
        let matcher = NdnRegexTopMatcher::new("^<seg-\\d+>$").unwrap();
        assert!(matcher.matches(&name("/seg-42")));
        assert!(!matcher.matches(&name("/seg-x")));
    }

    #[test]
    fn sets_and_negated_sets() {
        let matcher = NdnRegexTopMatcher::new("^[<a><b>]<x>$").unwrap();
        assert!(matcher.matches(&name("/a/x")));
        assert!(matcher.matches(&name("/b/x")));
        assert!(!matcher.matches(&name("/c/x")));

        let matcher = NdnRegexTopMatcher::new("^[^<a>]<x>$").unwrap();
        assert!(!matcher.matches(&name("/a/x")));
        assert!(matcher.matches(&name("/z/x")));
    }

    #[test]
    fn alternation_inside_a_group() {
        let matcher = NdnRegexTopMatcher::new("^(<a><b>|<c>)<tail>$").unwrap();
        assert!(matcher.matches(&name("/a/b/tail")));
        assert!(matcher.matches(&name("/c/tail")));
        assert!(!matcher.matches(&name("/a/tail")));
    }

    #[test]
    fn backreference_expansion() {
        let matcher = NdnRegexTopMatcher::new("^(<>*)<KEY>(<>)$").unwrap();
        let expanded = matcher.expand(&name("/alice/site/KEY/k1"), "\\1\\2").unwrap();
        assert_eq!(name("/alice/site/k1"), expanded);

        let expanded = matcher.expand(&name("/alice/KEY/k1"), "/certs\\2").unwrap();
        assert_eq!(name("/certs/k1"), expanded);

        assert!(matcher.expand(&name("/no/key/here"), "\\1").is_none());
    }

    #[test]
    fn greedy_groups_capture_the_longest_prefix() {
        let matcher = NdnRegexTopMatcher::new("^(<>*)<end>").unwrap();
        let expanded = matcher.expand(&name("/a/end/b/end"), "\\1").unwrap();
        // Greedy: the group swallows everything before the final <end>.
        assert_eq!(name("/a/end/b"), expanded);
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(NdnRegexTopMatcher::new("<unclosed").is_err());
        assert!(NdnRegexTopMatcher::new("stray").is_err());
        assert!(NdnRegexTopMatcher::new("(<a>").is_err());
        assert!(NdnRegexTopMatcher::new("<a>{x}").is_err());
    }
}
