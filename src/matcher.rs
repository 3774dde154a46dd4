/// Ant-style path matcher.
///
/// Pattern grammar, per path segment:
/// - `?` matches a single character
/// - `*` matches any run of characters inside one segment
/// - `{name}` matches one whole segment (named capture, value unconstrained)
///
/// A bare `**` segment matches any number of segments, including none.
#[derive(Clone, Copy, Debug, Default)]
pub struct AntPathMatcher;

impl AntPathMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn matches(&self, pattern: &str, path: &str) -> bool {
        let pattern_segments: Vec<&str> = split_segments(pattern);
        let path_segments: Vec<&str> = split_segments(path);
        match_segments(&pattern_segments, &path_segments)
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((segment, rest)) => match path.split_first() {
            None => false,
            Some((candidate, remaining)) => {
                match_segment(segment, candidate) && match_segments(rest, remaining)
            }
        },
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    Wildcard,
}

fn tokenize(segment: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '?' => tokens.push(Token::AnyChar),
            '*' => tokens.push(Token::Wildcard),
            '{' => {
                // named capture: consume up to the closing brace, value
                // is unconstrained
                for inner in chars.by_ref() {
                    if inner == '}' {
                        break;
                    }
                }
                tokens.push(Token::Wildcard);
            }
            other => tokens.push(Token::Literal(other)),
        }
    }
    tokens
}

fn match_segment(pattern: &str, candidate: &str) -> bool {
    let tokens = tokenize(pattern);
    let chars: Vec<char> = candidate.chars().collect();
    match_chars(&tokens, &chars)
}

fn match_chars(pattern: &[Token], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((Token::Wildcard, rest)) => {
            (0..=text.len()).any(|skip| match_chars(rest, &text[skip..]))
        }
        Some((Token::AnyChar, rest)) => !text.is_empty() && match_chars(rest, &text[1..]),
        Some((Token::Literal(expected), rest)) => {
            text.first() == Some(expected) && match_chars(rest, &text[1..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AntPathMatcher;

    fn matches_all(pattern: &str, paths: &[&str]) -> Vec<bool> {
        let matcher = AntPathMatcher::new();
        paths.iter().map(|path| matcher.matches(pattern, path)).collect()
    }

    #[test]
    fn single_star_stays_inside_one_segment() {
        let matcher = AntPathMatcher::new();
        assert!(matcher.matches("/demo/*.tsx", "/demo/a.tsx"));
        assert!(!matcher.matches("/demo/*.tsx", "/demo/b/a.tsx"));
        assert!(matcher.matches("/src/pages/**/*.less", "/src/pages/demo/style.less"));
    }

    #[test]
    fn question_mark_matches_exactly_one_character() {
        assert_eq!(
            matches_all("/path/**/?z", &["/path/x/y/z/xyz", "/path/x/y/z/xyy"]),
            [false, false]
        );
        assert_eq!(
            matches_all("/path/**/*z", &["/path/x/y/z/xyz", "/path/x/y/z/xyy"]),
            [true, false]
        );
        assert_eq!(
            matches_all("/app/p?ttern", &["/app/pXttern", "/app/pattern", "/app/pttern"]),
            [true, true, false]
        );
    }

    #[test]
    fn named_capture_matches_one_segment() {
        assert_eq!(
            matches_all("/foo/{id}/bar", &["/foo/1/bar", "/foo/ss/bar", "/foo/1/2/bar"]),
            [true, true, false]
        );
    }

    #[test]
    fn double_star_matches_any_number_of_segments() {
        assert_eq!(
            matches_all(
                "/**/example",
                &["/app/example", "/app/foo/example", "/example", "/app/foo/example1"]
            ),
            [true, true, true, false]
        );
        assert_eq!(
            matches_all("/app/**", &["/app/dir/file", "/app/foo/dir/file.html"]),
            [true, true]
        );
        assert_eq!(
            matches_all("/**/*.jsp", &["/app/dir/file.jsp", "/app/foo/dir/file.html"]),
            [true, false]
        );
        assert_eq!(
            matches_all(
                "/app/**/dir/file.",
                &["/app/dir/file.jsp", "/app/foo/dir/file.html"]
            ),
            [false, false]
        );
    }

    #[test]
    fn literal_tail_after_double_star() {
        assert_eq!(
            matches_all(
                "/api/**/user/refreshToken",
                &["/api/1.0.0/user/refreshToken", "/abc/path1/hhh", "/abc/path"]
            ),
            [true, false, false]
        );
    }

    #[test]
    fn extension_suffix_requires_exact_match() {
        assert_eq!(matches_all("/app/*.x", &["/app/a.x", "/app/a.b"]), [true, false]);
    }

    #[test]
    fn non_ascii_segments_match() {
        assert_eq!(
            matches_all("/白色/**", &["/白色/联通/4G/64", "/金色/联通/4G/64"]),
            [true, false]
        );
    }
}
