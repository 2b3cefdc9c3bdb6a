/// The kinds of token found on one physical line of a deck.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    /// A run of spaces or tabs.
    Whitespace,
    /// A bare word: keyword, number, path or any other value.
    Word(String),
    /// A quoted value. Holds the text between the quotes.
    Quoted(String),
    /// An inline `!` comment running to the end of the line. Holds the text after the `!`.
    Comment(String),
    /// A `[...]` block comment, or the part of one that falls on this line.
    BlockComment(String),
    /// A trailing `>` that continues the logical line onto the next physical line.
    Continuation,
}

/// A token with its byte range in the line.
#[derive(Debug, Clone)]
pub struct Token {
    pub ttype: TokenType,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Token {
    pub fn new(ttype: TokenType, pos_start: usize, pos_end: usize) -> Token {
        Token {
            ttype,
            pos_start,
            pos_end,
        }
    }

    /// The value carried by a word or quoted token.
    pub fn value(&self) -> Option<&str> {
        match &self.ttype {
            TokenType::Word(s) | TokenType::Quoted(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.ttype,
            TokenType::Comment(_) | TokenType::BlockComment(_)
        )
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: usize,
    in_block_comment: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_block_state(input, false)
    }

    /// Starts lexing inside a `[...]` comment opened on an earlier line.
    pub fn with_block_state(input: &'a str, in_block_comment: bool) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            position: 0,
            in_block_comment,
        }
    }

    /// Whether a block comment is still open at the end of the input.
    pub fn in_block_comment(&self) -> bool {
        self.in_block_comment
    }

    pub fn lex(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    pub fn next_token(&mut self) -> Option<Token> {
        let start_pos = self.position;
        // An open block survives the end of the line; the caller carries it forward.
        self.peek()?;

        if self.in_block_comment {
            let ttype = self.read_block_comment();
            return Some(Token::new(ttype, start_pos, self.position));
        }

        let c = self.advance()?;
        let ttype = match c {
            '!' => self.read_comment(),
            '[' => {
                self.in_block_comment = true;
                self.read_block_comment()
            }
            '"' | '\'' => self.read_quoted(c),
            '>' if self.rest_is_blank_or_comment() => TokenType::Continuation,
            c if c == ' ' || c == '\t' || c == '\r' || c == '\n' => self.read_whitespace(),
            _ => self.read_word(start_pos),
        };

        Some(Token::new(ttype, start_pos, self.position))
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn rest_is_blank_or_comment(&self) -> bool {
        let rest = self.input[self.position..].trim_start();
        rest.is_empty() || rest.starts_with('!')
    }

    fn read_whitespace(&mut self) -> TokenType {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
                self.advance();
            } else {
                break;
            }
        }
        TokenType::Whitespace
    }

    fn read_comment(&mut self) -> TokenType {
        let text = self.input[self.position..].to_string();
        while self.advance().is_some() {}
        TokenType::Comment(text)
    }

    /// Reads up to and including the closing `]`. Quotes inside the comment are honoured so a
    /// `]` between quotes does not close it.
    fn read_block_comment(&mut self) -> TokenType {
        let start = self.position;
        let mut quote: Option<char> = None;
        while let Some(c) = self.advance() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, ']') => {
                    self.in_block_comment = false;
                    let end = self.position - 1;
                    return TokenType::BlockComment(self.input[start..end].to_string());
                }
                _ => {}
            }
        }
        TokenType::BlockComment(self.input[start..self.position].to_string())
    }

    /// An unterminated quote swallows the rest of the line rather than failing.
    fn read_quoted(&mut self, quote: char) -> TokenType {
        let start = self.position;
        while let Some(c) = self.advance() {
            if c == quote {
                let end = self.position - quote.len_utf8();
                return TokenType::Quoted(self.input[start..end].to_string());
            }
        }
        TokenType::Quoted(self.input[start..self.position].to_string())
    }

    fn read_word(&mut self, start: usize) -> TokenType {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' || c == '\n' || c == '!' || c == '[' {
                break;
            }
            self.advance();
        }
        TokenType::Word(self.input[start..self.position].to_string())
    }
}

/// Removes comments line by line while remembering whether a `[...]` block is still open.
#[derive(Debug, Default, Clone)]
pub struct CommentStripper {
    in_block_comment: bool,
}

impl CommentStripper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_block_comment(&self) -> bool {
        self.in_block_comment
    }

    /// Returns `line` with its comments removed. Everything that is not a comment is copied
    /// byte for byte, including the whitespace in front of a removed comment.
    pub fn strip(&mut self, line: &str) -> String {
        let mut lexer = Lexer::with_block_state(line, self.in_block_comment);
        let mut out = String::with_capacity(line.len());
        for token in lexer.lex() {
            if !token.is_comment() {
                out.push_str(&line[token.pos_start..token.pos_end]);
            }
        }
        self.in_block_comment = lexer.in_block_comment();
        out
    }
}

/// Strips `!` and `[...]` comments from every line and drops lines left blank.
pub fn strip_comments<S: AsRef<str>>(lines: &[S], trim: bool) -> Vec<String> {
    let mut stripper = CommentStripper::new();
    lines
        .iter()
        .map(|line| {
            let stripped = stripper.strip(line.as_ref());
            if trim {
                stripped.trim().to_string()
            } else {
                stripped
            }
        })
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// The value tokens of a line, stopping at the first `!` comment.
pub fn values(line: &str) -> Vec<String> {
    Lexer::new(line)
        .lex()
        .into_iter()
        .take_while(|t| !matches!(t.ttype, TokenType::Comment(_)))
        .filter_map(|t| t.value().map(str::to_string))
        .collect()
}

/// True iff `token` is a whole word of `line`, compared case-insensitively, and is not
/// commented out.
pub fn check_token(token: &str, line: &str) -> bool {
    Lexer::new(line)
        .lex()
        .iter()
        .take_while(|t| !matches!(t.ttype, TokenType::Comment(_)))
        .any(|t| matches!(&t.ttype, TokenType::Word(w) if w.eq_ignore_ascii_case(token)))
}

/// A value located by a forward scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundValue {
    pub value: String,
    pub line_index: usize,
    pub pos_start: usize,
    pub pos_end: usize,
}

fn is_ignored(value: &str, ignore_values: &[&str]) -> bool {
    ignore_values.iter().any(|v| v.eq_ignore_ascii_case(value))
}

/// Finds the next value at or after byte `column` of `lines[start_index]`, wrapping onto the
/// following lines. Returns `None` once the input is exhausted.
pub fn find_next_value<S: AsRef<str>>(
    lines: &[S],
    start_index: usize,
    column: usize,
    ignore_values: &[&str],
) -> Option<FoundValue> {
    let mut in_block = false;
    for (line_index, line) in lines.iter().enumerate().skip(start_index) {
        let line = line.as_ref();
        let mut lexer = Lexer::with_block_state(line, in_block);
        let tokens = lexer.lex();
        in_block = lexer.in_block_comment();
        for token in &tokens {
            if line_index == start_index && token.pos_start < column {
                continue;
            }
            if let TokenType::Comment(_) = token.ttype {
                break;
            }
            if let Some(value) = token.value() {
                if is_ignored(value, ignore_values) {
                    continue;
                }
                return Some(FoundValue {
                    value: value.to_string(),
                    line_index,
                    pos_start: token.pos_start,
                    pos_end: token.pos_end,
                });
            }
        }
    }
    None
}

/// Returns the next value after `start_index`. When `search_text` is given it is scanned in
/// place of `lines[start_index]` before moving on to the following lines.
pub fn get_next_value<S: AsRef<str>>(
    start_index: usize,
    lines: &[S],
    search_text: Option<&str>,
    ignore_values: &[&str],
) -> Option<String> {
    match search_text {
        Some(text) => find_next_value(&[text], 0, 0, ignore_values)
            .or_else(|| find_next_value(lines, start_index + 1, 0, ignore_values))
            .map(|found| found.value),
        None => find_next_value(lines, start_index, 0, ignore_values).map(|found| found.value),
    }
}

/// Locates `token` in `lines[line_index]` and returns the value that follows it, continuing
/// onto later lines when the token ends its line.
pub fn get_token_value<S: AsRef<str>>(
    token: &str,
    lines: &[S],
    line_index: usize,
    ignore_values: &[&str],
) -> Option<String> {
    let line = lines.get(line_index)?.as_ref();
    let position = Lexer::new(line)
        .lex()
        .into_iter()
        .take_while(|t| !matches!(t.ttype, TokenType::Comment(_)))
        .find(|t| matches!(&t.ttype, TokenType::Word(w) if w.eq_ignore_ascii_case(token)))?;
    find_next_value(lines, line_index, position.pos_end, ignore_values).map(|found| found.value)
}

/// The outcome of [`replace_next_value`]: the value that was replaced and the rewritten line.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub line_index: usize,
    pub old_value: String,
    pub new_line: String,
}

/// Finds the next value like [`find_next_value`] and returns the text its line would have
/// with that value replaced. A leading `INCLUDE` marker is stepped over so that the include
/// path is what gets replaced. An empty `replacement` deletes the value together with the
/// whitespace that follows it.
pub fn replace_next_value<S: AsRef<str>>(
    lines: &[S],
    start_index: usize,
    column: usize,
    ignore_values: &[&str],
    replacement: &str,
) -> Option<Replacement> {
    let mut found = find_next_value(lines, start_index, column, ignore_values)?;
    if found.value.eq_ignore_ascii_case("INCLUDE") {
        found = find_next_value(lines, found.line_index, found.pos_end, ignore_values)?;
    }
    let line = lines[found.line_index].as_ref();
    let mut new_line = String::with_capacity(line.len() + replacement.len());
    if replacement.is_empty() {
        let rest = &line[found.pos_end..];
        let trailing = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let mut start = found.pos_start;
        let mut end = found.pos_end + trailing;
        if end == line.len() {
            // Last value on the line: eat the whitespace in front of it instead.
            start = line[..start].trim_end_matches([' ', '\t']).len();
            end = found.pos_end;
        }
        new_line.push_str(&line[..start]);
        new_line.push_str(&line[end..]);
    } else {
        new_line.push_str(&line[..found.pos_start]);
        new_line.push_str(replacement);
        new_line.push_str(&line[found.pos_end..]);
    }
    Some(Replacement {
        line_index: found.line_index,
        old_value: found.value,
        new_line,
    })
}

/// A logical line assembled from one or more physical lines joined by `>`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    pub text: String,
    /// Index of the first physical line.
    pub first: usize,
    /// Index of the last physical line (inclusive).
    pub last: usize,
}

/// Joins physical lines ending in `>`. Expects comment-stripped input.
pub fn join_continuations<S: AsRef<str>>(lines: &[S]) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < lines.len() {
        let first = i;
        let mut buf = String::new();

        loop {
            let line = lines[i].as_ref();
            let trimmed = line.trim_end();
            let continues = trimmed.ends_with('>');
            let piece = if continues {
                trimmed[..trimmed.len() - 1].trim_end()
            } else {
                line
            };

            if i == first {
                buf.push_str(piece);
            } else {
                buf.push(' ');
                buf.push_str(piece.trim_start());
            }

            if continues && i + 1 < lines.len() {
                i += 1;
                continue;
            }
            break;
        }

        out.push(LogicalLine {
            text: buf,
            first,
            last: i,
        });
        i += 1;
    }

    out
}
