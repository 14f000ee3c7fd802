/// Match a glob pattern against a single file name (no `/`).
///
/// Supports `*` (any run of characters), `?` (one character) and bracket
/// classes such as `[abc]`, `[a-z]` or `[!0-9]`. Dotfiles only match
/// patterns that themselves start with `.`, so `*.cls` never picks up a
/// hidden file.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    if name.starts_with('.') && !pattern.starts_with('.') {
        return false;
    }

    let pat: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    match_chars(&pat, &name)
}

/// One pattern element and how many pattern chars it spans.
enum Token {
    Star,
    Any,
    Class { negated: bool, ranges: Vec<(char, char)> },
    Literal(char),
}

fn token_at(pat: &[char], i: usize) -> (Token, usize) {
    match pat[i] {
        '*' => (Token::Star, 1),
        '?' => (Token::Any, 1),
        '[' => match parse_class(&pat[i + 1..]) {
            Some((negated, ranges, used)) => (Token::Class { negated, ranges }, used + 1),
            // unterminated class: match `[` literally
            None => (Token::Literal('['), 1),
        },
        c => (Token::Literal(c), 1),
    }
}

/// Parse the body of a bracket class, returning the chars consumed
/// including the closing `]`.
fn parse_class(body: &[char]) -> Option<(bool, Vec<(char, char)>, usize)> {
    let mut i = 0;
    let negated = matches!(body.first(), Some('!') | Some('^'));
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    let start = i;
    while i < body.len() {
        let c = body[i];
        if c == ']' && i > start {
            return Some((negated, ranges, i + 1));
        }
        if i + 2 < body.len() && body[i + 1] == '-' && body[i + 2] != ']' {
            ranges.push((c, body[i + 2]));
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
    None
}

fn token_matches(token: &Token, c: char) -> bool {
    match token {
        Token::Star => true,
        Token::Any => true,
        Token::Class { negated, ranges } => {
            ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) != *negated
        }
        Token::Literal(l) => *l == c,
    }
}

/// Greedy match with backtracking to the most recent `*`.
fn match_chars(pat: &[char], name: &[char]) -> bool {
    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < name.len() {
        if pi < pat.len() {
            let (token, width) = token_at(pat, pi);
            if let Token::Star = token {
                backtrack = Some((pi + width, ni));
                pi += width;
                continue;
            }
            if token_matches(&token, name[ni]) {
                pi += width;
                ni += 1;
                continue;
            }
        }
        match backtrack {
            Some((after_star, consumed)) => {
                pi = after_star;
                ni = consumed + 1;
                backtrack = Some((after_star, consumed + 1));
            }
            None => return false,
        }
    }

    pat[pi..].iter().all(|&c| c == '*')
}
