// Copyright (c) Microsoft Corporation. All rights reserved.

//! View mappings: ordered translation rules between two path spaces.
//!
//! A [`ViewMap`] holds lines such as `//depot/main/... //ws/main/...`, each an
//! inclusion, an exclusion (`-`) or an overlay (`+`). Rules are evaluated from
//! the most recently inserted to the oldest and the first matching rule
//! decides, so later lines can both add coverage and carve exclusions out of
//! earlier, broader lines.
//!
//! Patterns support three wildcards:
//! - `...` matches any sequence of characters, including `/`
//! - `*` matches any sequence of characters except `/`
//! - `%%1` to `%%9` match like `*` and can be reordered on the other side
//!
//! Wildcards transfer from one side to the other by kind and position.

use std::fmt;
use std::str::FromStr;

use crate::P4Error;

// ============================================================================
// Entries
// ============================================================================

/// How a mapping line affects the paths it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapType {
    Include,
    /// `-` lines remove paths from the mapping.
    Exclude,
    /// `+` lines map paths on top of earlier lines without hiding them.
    Overlay,
}

impl MapType {
    fn prefix(self) -> &'static str {
        match self {
            MapType::Include => "",
            MapType::Exclude => "-",
            MapType::Overlay => "+",
        }
    }
}

/// One line of a [`ViewMap`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapEntry {
    pub lhs: String,
    pub rhs: String,
    pub map_type: MapType,
}

impl MapEntry {
    pub fn new(lhs: impl Into<String>, rhs: impl Into<String>, map_type: MapType) -> Self {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into(),
            map_type,
        }
    }

    fn left(&self) -> Vec<Token> {
        tokenize(&self.lhs)
    }

    fn right(&self) -> Vec<Token> {
        tokenize(&self.rhs)
    }
}

impl fmt::Display for MapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.map_type.prefix();
        if needs_quotes(&self.lhs) || needs_quotes(&self.rhs) {
            write!(f, "\"{}{}\" \"{}\"", prefix, self.lhs, self.rhs)
        } else {
            write!(f, "{}{} {}", prefix, self.lhs, self.rhs)
        }
    }
}

fn needs_quotes(path: &str) -> bool {
    path.chars().any(char::is_whitespace)
}

/// Which side of a mapping a path is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Match the left side, translate to the right side.
    #[default]
    LeftToRight,
    /// Match the right side, translate to the left side.
    RightToLeft,
}

// ============================================================================
// Pattern matching
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Lit(char),
    Star,
    Dots,
    Pos(u8),
}

impl Token {
    fn is_wildcard(self) -> bool {
        !matches!(self, Token::Lit(_))
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i..].starts_with(&['.', '.', '.']) {
            tokens.push(Token::Dots);
            i += 3;
        } else if chars[i] == '*' {
            tokens.push(Token::Star);
            i += 1;
        } else if chars[i..].starts_with(&['%', '%'])
            && chars.get(i + 2).map_or(false, |c| ('1'..='9').contains(c))
        {
            let digit = chars[i + 2] as u8 - b'0';
            tokens.push(Token::Pos(digit));
            i += 3;
        } else {
            tokens.push(Token::Lit(chars[i]));
            i += 1;
        }
    }
    tokens
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Lit(c) => out.push(*c),
            Token::Star => out.push('*'),
            Token::Dots => out.push_str("..."),
            Token::Pos(n) => {
                out.push_str("%%");
                out.push(char::from(b'0' + n));
            }
        }
    }
    out
}

/// The fragment of input consumed by one wildcard of a matching pattern.
type Capture = (Token, Vec<Token>);

/// Whether `wild` may consume `token` as part of its capture.
fn absorbs(wild: Token, token: Token) -> bool {
    match wild {
        Token::Dots => true,
        Token::Star | Token::Pos(_) => match token {
            Token::Lit(c) => c != '/',
            Token::Star | Token::Pos(_) => true,
            Token::Dots => false,
        },
        Token::Lit(_) => false,
    }
}

/// Matches `inner` against `outer`, recording what each wildcard of `outer`
/// consumed.
///
/// When `inner` is a plain path this is path matching; when it contains
/// wildcards it succeeds only if every path `inner` matches is also matched by
/// `outer`.
fn cover(outer: &[Token], inner: &[Token], captures: &mut Vec<Capture>) -> bool {
    let Some((&head, rest)) = outer.split_first() else {
        return inner.is_empty();
    };

    if let Token::Lit(c) = head {
        return match inner.first() {
            Some(Token::Lit(d)) if *d == c => cover(rest, &inner[1..], captures),
            _ => false,
        };
    }

    for len in 0..=inner.len() {
        if len > 0 && !absorbs(head, inner[len - 1]) {
            break;
        }
        captures.push((head, inner[..len].to_vec()));
        if cover(rest, &inner[len..], captures) {
            return true;
        }
        captures.pop();
    }
    false
}

fn contains(outer: &[Token], inner: &[Token]) -> bool {
    cover(outer, inner, &mut Vec::new())
}

/// Rewrites `target`, substituting each wildcard with the capture of the same
/// kind and position. Returns `None` when `target` needs a capture that does
/// not exist.
fn substitute(target: &[Token], captures: &[Capture]) -> Option<Vec<Token>> {
    let dots: Vec<&Vec<Token>> = captures
        .iter()
        .filter(|(w, _)| *w == Token::Dots)
        .map(|(_, c)| c)
        .collect();
    let stars: Vec<&Capture> = captures
        .iter()
        .filter(|(w, _)| matches!(w, Token::Star | Token::Pos(_)))
        .collect();

    let mut next_dots = 0;
    let mut next_star = 0;
    let mut out = Vec::with_capacity(target.len());
    for &token in target {
        match token {
            Token::Lit(_) => out.push(token),
            Token::Dots => {
                out.extend_from_slice(dots.get(next_dots)?);
                next_dots += 1;
            }
            Token::Star => {
                out.extend_from_slice(&stars.get(next_star)?.1);
                next_star += 1;
            }
            Token::Pos(n) => {
                let capture = stars
                    .iter()
                    .find(|(w, _)| *w == Token::Pos(n))
                    .or_else(|| stars.get(usize::from(n) - 1))?;
                out.extend_from_slice(&capture.1);
            }
        }
    }
    Some(out)
}

/// Translates `input` from the `from` side of a rule to its `to` side.
fn translate_tokens(from: &[Token], to: &[Token], input: &[Token]) -> Option<Vec<Token>> {
    let mut captures = Vec::new();
    if !cover(from, input, &mut captures) {
        return None;
    }
    substitute(to, &captures)
}

// ============================================================================
// Line parsing
// ============================================================================

/// Splits a mapping line into its paths, honouring double quotes and a `-`
/// or `+` prefix written before an opening quote.
fn split_paths(line: &str) -> Result<Vec<String>, P4Error> {
    let mut paths = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut path = String::new();
        if c == '-' || c == '+' {
            chars.next();
            path.push(c);
        }

        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                path.push(c);
            }
            if !closed {
                return Err(P4Error::Parse(format!(
                    "Unterminated quote in mapping line: {}",
                    line
                )));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                path.push(c);
                chars.next();
            }
        }
        paths.push(path);
    }
    Ok(paths)
}

fn strip_type(path: &str) -> (MapType, &str) {
    if let Some(rest) = path.strip_prefix('-') {
        (MapType::Exclude, rest)
    } else if let Some(rest) = path.strip_prefix('+') {
        (MapType::Overlay, rest)
    } else {
        (MapType::Include, path)
    }
}

fn unquote(path: &str) -> &str {
    let trimmed = path.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(trimmed)
}

// ============================================================================
// ViewMap
// ============================================================================

/// An ordered set of mapping lines.
///
/// # Examples
///
/// ```rust
/// use p4_sdk::{Direction, ViewMap};
///
/// let mut view = ViewMap::new();
/// view.insert("//depot/main/... //ws/...").unwrap();
/// view.insert("-//depot/main/tmp/... //ws/tmp/...").unwrap();
///
/// assert!(view.includes("//depot/main/foo.c"));
/// assert!(!view.includes("//depot/main/tmp/foo.c"));
/// assert_eq!(
///     view.translate("//ws/foo.c", Direction::RightToLeft).as_deref(),
///     Some("//depot/main/foo.c")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewMap {
    entries: Vec<MapEntry>,
}

impl ViewMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map by inserting each line in order.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, P4Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for line in lines {
            map.insert(line.as_ref())?;
        }
        Ok(map)
    }

    /// Parses and inserts one mapping line.
    ///
    /// The line holds one or two paths, each optionally double-quoted. A
    /// leading `-` or `+` (inside or outside the quotes) marks an exclusion
    /// or an overlay. A single path maps to itself.
    pub fn insert(&mut self, line: &str) -> Result<(), P4Error> {
        let paths = split_paths(line)?;
        let (lhs, rhs) = match paths.as_slice() {
            [] => return Err(P4Error::Parse("Empty mapping line".to_string())),
            [single] => (single.as_str(), None),
            [lhs, rhs] => (lhs.as_str(), Some(rhs.as_str())),
            _ => {
                return Err(P4Error::Parse(format!(
                    "Too many paths in mapping line: {}",
                    line
                )))
            }
        };

        let (map_type, lhs) = strip_type(lhs);
        let rhs = rhs.unwrap_or(lhs);
        self.insert_entry(MapEntry::new(lhs, rhs, map_type))
    }

    /// Inserts a line given as its two sides. The left side may carry a `-`
    /// or `+` prefix.
    pub fn insert_pair(&mut self, lhs: &str, rhs: &str) -> Result<(), P4Error> {
        let (map_type, lhs) = strip_type(unquote(lhs));
        self.insert_entry(MapEntry::new(unquote(lhs), unquote(rhs), map_type))
    }

    fn insert_entry(&mut self, entry: MapEntry) -> Result<(), P4Error> {
        if entry.lhs.is_empty() || entry.rhs.is_empty() {
            return Err(P4Error::Parse("Empty path in mapping line".to_string()));
        }

        if entry.map_type == MapType::Include {
            for exclusion in self.overlap_exclusions(&entry) {
                if !self.entries.contains(&exclusion) {
                    self.entries.push(exclusion);
                }
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// For each earlier inclusion that `entry` overlaps on either side,
    /// computes an exclusion of the earlier line restricted to the overlap.
    fn overlap_exclusions(&self, entry: &MapEntry) -> Vec<MapEntry> {
        let (left, right) = (entry.left(), entry.right());
        let mut exclusions = Vec::new();

        for earlier in &self.entries {
            if earlier.map_type != MapType::Include || earlier == entry {
                continue;
            }
            let (e_left, e_right) = (earlier.left(), earlier.right());

            let exclusion = if contains(&e_left, &left) {
                translate_tokens(&e_left, &e_right, &left).map(|r| (left.clone(), r))
            } else if contains(&e_right, &right) {
                translate_tokens(&e_right, &e_left, &right).map(|l| (l, right.clone()))
            } else if contains(&left, &e_left) || contains(&right, &e_right) {
                Some((e_left, e_right))
            } else {
                None
            };

            if let Some((l, r)) = exclusion {
                let exclusion = MapEntry::new(render(&l), render(&r), MapType::Exclude);
                if !exclusions.contains(&exclusion) {
                    exclusions.push(exclusion);
                }
            }
        }
        exclusions
    }

    /// Returns true if `path` is mapped by its left side.
    pub fn includes(&self, path: &str) -> bool {
        self.includes_in(path, Direction::LeftToRight)
    }

    /// Returns true if `path` is mapped when matched from `direction`.
    pub fn includes_in(&self, path: &str, direction: Direction) -> bool {
        self.find(path, direction).is_some()
    }

    /// Translates `path` to the other side of the map. Returns `None` when no
    /// rule maps it or the deciding rule excludes it.
    pub fn translate(&self, path: &str, direction: Direction) -> Option<String> {
        let (entry, captures) = self.find(path, direction)?;
        let target = match direction {
            Direction::LeftToRight => entry.right(),
            Direction::RightToLeft => entry.left(),
        };
        substitute(&target, &captures).map(|t| render(&t))
    }

    /// Finds the most recent rule matching `path`; an exclusion denies.
    fn find(&self, path: &str, direction: Direction) -> Option<(&MapEntry, Vec<Capture>)> {
        let input = tokenize(path);
        if input.iter().any(|t| t.is_wildcard()) {
            return None;
        }

        for entry in self.entries.iter().rev() {
            let source = match direction {
                Direction::LeftToRight => entry.left(),
                Direction::RightToLeft => entry.right(),
            };
            let mut captures = Vec::new();
            if cover(&source, &input, &mut captures) {
                return match entry.map_type {
                    MapType::Exclude => None,
                    MapType::Include | MapType::Overlay => Some((entry, captures)),
                };
            }
        }
        None
    }

    /// Composes two maps: the result maps `a`'s left side to `b`'s right side
    /// for the paths reachable through both.
    ///
    /// Every pair of lines whose inner sides overlap produces one line. An
    /// exclusion on either side yields an exclusion; otherwise an overlay on
    /// either side yields an overlay.
    pub fn join(a: &ViewMap, b: &ViewMap) -> ViewMap {
        let mut joined = ViewMap::new();

        for first in &a.entries {
            let (a_left, a_right) = (first.left(), first.right());
            for second in &b.entries {
                let (b_left, b_right) = (second.left(), second.right());

                let composed = if contains(&b_left, &a_right) {
                    translate_tokens(&b_left, &b_right, &a_right).map(|r| (a_left.clone(), r))
                } else if contains(&a_right, &b_left) {
                    translate_tokens(&a_right, &a_left, &b_left).map(|l| (l, b_right.clone()))
                } else {
                    None
                };

                if let Some((l, r)) = composed {
                    let map_type = match (first.map_type, second.map_type) {
                        (MapType::Exclude, _) | (_, MapType::Exclude) => MapType::Exclude,
                        (MapType::Overlay, _) | (_, MapType::Overlay) => MapType::Overlay,
                        _ => MapType::Include,
                    };
                    joined
                        .entries
                        .push(MapEntry::new(render(&l), render(&r), map_type));
                }
            }
        }
        joined
    }

    /// Returns the map with both sides of every line swapped.
    pub fn reverse(&self) -> ViewMap {
        ViewMap {
            entries: self
                .entries
                .iter()
                .map(|e| MapEntry::new(e.rhs.clone(), e.lhs.clone(), e.map_type))
                .collect(),
        }
    }

    /// Left sides, each with its `-`/`+` prefix.
    pub fn lhs(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{}{}", e.map_type.prefix(), e.lhs))
            .collect()
    }

    /// Right sides, each with its `-`/`+` prefix.
    pub fn rhs(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{}{}", e.map_type.prefix(), e.rhs))
            .collect()
    }

    /// Formats each line, quoting sides that contain whitespace.
    pub fn to_lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Display for ViewMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl FromStr for ViewMap {
    type Err = P4Error;

    /// Parses one mapping line per non-blank line of text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_lines(s.lines().filter(|l| !l.trim().is_empty()))
    }
}
