use indicatif::ProgressIterator;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::error::RepairError;
use super::records::{Timetable, TimetableFiles};
use super::utils::progress_bar_for_count;

/// Reads every file matching `pattern` into memory.
pub fn load_timetable_files(pattern: &str) -> Result<TimetableFiles, RepairError> {
    let paths = matching_paths(pattern)?;
    if paths.is_empty() {
        warn!("No timetable files match {pattern}");
    }

    let mut files = TimetableFiles::default();
    let progress = progress_bar_for_count(paths.len());
    for path in paths.into_iter().progress_with(progress) {
        let timetables = read_timetables(&path)?;
        files.0.insert(path, timetables);
    }

    info!(
        "Loaded {} timetables from {} files",
        files.record_count(),
        files.0.len()
    );
    Ok(files)
}

pub fn read_timetables(path: &Path) -> Result<Vec<Timetable>, RepairError> {
    let bytes = fs_err::read(path)?;
    serde_json::from_slice(&bytes).map_err(|source| RepairError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Lists the files matching `pattern` in sorted order.
///
/// Only the file name may contain wildcards: `*` matches any run of
/// characters, `?` matches exactly one and `[...]` matches one character of
/// a set (`[!...]` negates it). Hidden files only match a pattern that itself
/// starts with `.`. Symlinks are followed.
pub fn matching_paths(pattern: &str) -> Result<Vec<PathBuf>, RepairError> {
    let pattern_path = Path::new(pattern);
    let file_pattern = pattern_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RepairError::Pattern {
            pattern: pattern.to_string(),
            reason: "no file name to match".to_string(),
        })?;
    let directory = match pattern_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if has_wildcard(&directory.to_string_lossy()) {
        return Err(RepairError::Pattern {
            pattern: pattern.to_string(),
            reason: "wildcards are only supported in the file name".to_string(),
        });
    }
    if !directory.is_dir() {
        warn!("Directory {} does not exist", directory.display());
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs_err::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !wildcard_match(file_pattern, name) {
            continue;
        }
        // Dangling symlinks are kept so reading them reports the failure.
        let is_file = fs_err::metadata(entry.path())
            .map(|metadata| metadata.is_file())
            .unwrap_or(true);
        if is_file {
            paths.push(directory.join(name));
        }
    }
    paths.sort();
    Ok(paths)
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

#[derive(Debug, PartialEq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Token {
    fn matches(&self, c: char) -> bool {
        match self {
            Token::Literal(literal) => *literal == c,
            Token::AnyOne => true,
            Token::AnyRun => false,
            Token::Class { negated, ranges } => {
                ranges.iter().any(|&(low, high)| low <= c && c <= high) != *negated
            }
        }
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => tokens.push(Token::AnyRun),
            '?' => tokens.push(Token::AnyOne),
            '[' => match parse_class(&chars[i + 1..]) {
                Some((token, consumed)) => {
                    tokens.push(token);
                    i += consumed;
                }
                // An unclosed `[` is an ordinary character.
                None => tokens.push(Token::Literal('[')),
            },
            c => tokens.push(Token::Literal(c)),
        }
        i += 1;
    }
    tokens
}

/// Parses the body of a `[...]` class, returning the token and the number of
/// characters consumed including the closing `]`.
fn parse_class(chars: &[char]) -> Option<(Token, usize)> {
    let mut i = 0;
    let negated = matches!(chars.first(), Some('!'));
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    // A `]` right after the opening bracket is a member, not the end.
    let mut first = true;
    while i < chars.len() {
        let c = chars[i];
        if c == ']' && !first {
            return Some((Token::Class { negated, ranges }, i + 1));
        }
        first = false;
        if chars.get(i + 1) == Some(&'-') && chars.get(i + 2).is_some_and(|&high| high != ']') {
            ranges.push((c, chars[i + 2]));
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
    None
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    if name.starts_with('.') && !pattern.starts_with('.') {
        return false;
    }
    let tokens = tokenize(pattern);
    let name: Vec<char> = name.chars().collect();
    let (mut t, mut n) = (0, 0);
    // Last `*` seen, and the name position it is currently matched up to.
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        match tokens.get(t) {
            Some(Token::AnyRun) => {
                star = Some((t, n));
                t += 1;
            }
            Some(token) if token.matches(name[n]) => {
                t += 1;
                n += 1;
            }
            _ => match star {
                Some((star_t, star_n)) => {
                    t = star_t + 1;
                    n = star_n + 1;
                    star = Some((star_t, star_n + 1));
                }
                None => return false,
            },
        }
    }
    tokens[t..].iter().all(|token| *token == Token::AnyRun)
}
