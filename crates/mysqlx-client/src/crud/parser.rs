//! Expression parser for CRUD clauses.
//!
//! Parses the document-mode X DevAPI expression language into `Expr`
//! trees:
//!
//! ```text
//! $.address.city == :city AND age BETWEEN 18 AND 65
//! name LIKE 'J%' OR tags IN ['a', 'b']
//! {"name": name, "years": age * 2}
//! ```
//!
//! Binary operators are parsed by precedence climbing. From loosest to
//! tightest: `OR`/`||`, `XOR`, `AND`/`&&`, the `IS`/`IN`/`LIKE`/`BETWEEN`/
//! `REGEXP`/`OVERLAPS` family, comparisons, bitwise `&`/`|`/`^`, shifts,
//! `+`/`-`, then `*`/`/`/`%`. Prefix `NOT`, `!`, `-`, `+` and `~` bind to
//! the operand that follows them.
//!
//! Bare identifiers are document fields (`a.b[0]` is `$.a.b[0]`). Named
//! placeholders (`:name`) are numbered in order of first appearance in a
//! [`Placeholders`] registry that can be shared by several clauses.

use mysqlx_protocol::{
    ColumnIdentifier, Direction, DocumentPathItem, Expr, ExprObjectField, FunctionCall,
    Identifier, Order, Projection, Scalar,
};

use super::CrudError;

type Result<T> = std::result::Result<T, CrudError>;

/// Placeholder names in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    names: Vec<String>,
}

impl Placeholders {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `name`, registering it on first use.
    pub fn position(&mut self, name: &str) -> u32 {
        let index = match self.names.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        };
        // A clause cannot hold anywhere near u32::MAX placeholders.
        u32::try_from(index).unwrap_or(u32::MAX)
    }

    /// Registered names by position.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Check whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Number of registered placeholders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check whether no placeholder is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Integer(u64),
    Float(f64),
    String(String),
    Ident(String),
    QuotedIdent(String),
    Dollar,
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Star,
    DoubleStar,
    Plus,
    Minus,
    Slash,
    Percent,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Tilde,
    Eof,
}

impl TokenKind {
    fn display_name(&self) -> String {
        match self {
            Self::Integer(n) => format!("integer '{n}'"),
            Self::Float(n) => format!("float '{n}'"),
            Self::String(s) => format!("string '{s}'"),
            Self::Ident(s) => format!("identifier '{s}'"),
            Self::QuotedIdent(s) => format!("identifier '`{s}`'"),
            Self::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::Dollar => "$",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Star => "*",
            Self::DoubleStar => "**",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Tilde => "~",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    start: usize,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek(0)?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            while self.peek(0).is_some_and(char::is_whitespace) {
                self.bump();
            }
            let start = self.pos;
            let Some(ch) = self.peek(0) else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    start,
                });
                return Ok(tokens);
            };
            let kind = match ch {
                '0'..='9' => self.number()?,
                '\'' | '"' => TokenKind::String(self.quoted(ch)?),
                '`' => TokenKind::QuotedIdent(self.quoted('`')?),
                c if c.is_alphabetic() || c == '_' => {
                    let ident = self.take_while(|c| c.is_alphanumeric() || c == '_');
                    TokenKind::Ident(ident.to_string())
                }
                _ => self.punct(ch)?,
            };
            tokens.push(Token { kind, start });
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek(0).is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn number(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            let signed = matches!(self.peek(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.bump();
                if signed {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        let text = &self.input[start..self.pos];
        if is_float {
            text.parse()
                .map(TokenKind::Float)
                .map_err(|_| CrudError::syntax(start, format!("invalid number '{text}'")))
        } else {
            text.parse()
                .map(TokenKind::Integer)
                .map_err(|_| CrudError::syntax(start, format!("integer '{text}' is out of range")))
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(CrudError::syntax(start, "unterminated quoted text")),
                Some(c) if c == quote => {
                    // A doubled quote stands for itself.
                    if self.peek(0) == Some(quote) {
                        self.bump();
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some('\\') if quote != '`' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('b') => out.push('\u{8}'),
                    Some('Z') => out.push('\u{1a}'),
                    Some(c) => out.push(c),
                    None => return Err(CrudError::syntax(start, "unterminated quoted text")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn punct(&mut self, ch: char) -> Result<TokenKind> {
        let next = self.peek(1);
        let (kind, len) = match (ch, next) {
            ('*', Some('*')) => (TokenKind::DoubleStar, 2),
            ('=', Some('=')) => (TokenKind::Eq, 2),
            ('!', Some('=')) => (TokenKind::Neq, 2),
            ('<', Some('>')) => (TokenKind::Neq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('<', Some('<')) => (TokenKind::Shl, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('>', Some('>')) => (TokenKind::Shr, 2),
            ('&', Some('&')) => (TokenKind::AndAnd, 2),
            ('|', Some('|')) => (TokenKind::OrOr, 2),
            ('=', _) => (TokenKind::Eq, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('&', _) => (TokenKind::Amp, 1),
            ('|', _) => (TokenKind::Pipe, 1),
            ('$', _) => (TokenKind::Dollar, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('^', _) => (TokenKind::Caret, 1),
            ('~', _) => (TokenKind::Tilde, 1),
            (other, _) => {
                return Err(CrudError::syntax(
                    self.pos,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        for _ in 0..len {
            self.bump();
        }
        Ok(kind)
    }
}

/// Binding strength of binary operators (higher binds tighter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Or,
    Xor,
    And,
    Ilri,
    Comparison,
    Bit,
    Shift,
    AddSub,
    MulDiv,
    Unary,
}

impl Precedence {
    fn next(self) -> Self {
        match self {
            Self::Lowest => Self::Or,
            Self::Or => Self::Xor,
            Self::Xor => Self::And,
            Self::And => Self::Ilri,
            Self::Ilri => Self::Comparison,
            Self::Comparison => Self::Bit,
            Self::Bit => Self::Shift,
            Self::Shift => Self::AddSub,
            Self::AddSub => Self::MulDiv,
            Self::MulDiv | Self::Unary => Self::Unary,
        }
    }
}

/// Parser over one clause string.
pub struct ExprParser<'a, 'p> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    placeholders: &'p mut Placeholders,
}

impl<'a, 'p> ExprParser<'a, 'p> {
    /// Tokenize `input`. Placeholders are registered in `placeholders`.
    pub fn new(input: &'a str, placeholders: &'p mut Placeholders) -> Result<Self> {
        Ok(Self {
            input,
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
            placeholders,
        })
    }

    /// Parse the whole input as one expression.
    pub fn parse_expr(mut self) -> Result<Expr> {
        let expr = self.expr(Precedence::Lowest)?;
        self.expect_end()?;
        Ok(expr)
    }

    /// Parse a comma-separated list of expressions.
    pub fn parse_expr_list(mut self) -> Result<Vec<Expr>> {
        let mut out = vec![self.expr(Precedence::Lowest)?];
        while self.eat(&TokenKind::Comma) {
            out.push(self.expr(Precedence::Lowest)?);
        }
        self.expect_end()?;
        Ok(out)
    }

    /// Parse a comma-separated list of `expr [AS alias]`.
    ///
    /// A projection without an alias is named after its source text.
    pub fn parse_projection_list(mut self) -> Result<Vec<Projection>> {
        let mut out = vec![self.projection()?];
        while self.eat(&TokenKind::Comma) {
            out.push(self.projection()?);
        }
        self.expect_end()?;
        Ok(out)
    }

    /// Parse one expression as a document projection.
    ///
    /// An object literal projects each of its keys; anything else is a
    /// single projection named after its source text.
    pub fn parse_document_projection(mut self) -> Result<Vec<Projection>> {
        let start = self.current().start;
        let expr = self.expr(Precedence::Lowest)?;
        let text = self.input[start..self.current().start].trim().to_string();
        self.expect_end()?;
        Ok(match expr {
            Expr::Object(fields) => fields
                .into_iter()
                .map(|field| Projection {
                    source: field.value,
                    alias: Some(field.key),
                })
                .collect(),
            source => vec![Projection {
                source,
                alias: Some(text),
            }],
        })
    }

    /// Parse a comma-separated list of `expr [ASC | DESC]`.
    pub fn parse_order_list(mut self) -> Result<Vec<Order>> {
        let mut out = vec![self.order()?];
        while self.eat(&TokenKind::Comma) {
            out.push(self.order()?);
        }
        self.expect_end()?;
        Ok(out)
    }

    fn projection(&mut self) -> Result<Projection> {
        let start = self.current().start;
        let source = self.expr(Precedence::Lowest)?;
        let end = self.current().start;
        let alias = if self.eat_keyword("as") {
            self.name()?
        } else {
            self.input[start..end].trim().to_string()
        };
        Ok(Projection {
            source,
            alias: Some(alias),
        })
    }

    fn order(&mut self) -> Result<Order> {
        let expr = self.expr(Precedence::Lowest)?;
        let direction = if self.eat_keyword("desc") {
            Direction::Desc
        } else {
            self.eat_keyword("asc");
            Direction::Asc
        };
        Ok(Order { expr, direction })
    }

    fn current(&self) -> &Token {
        // The token list always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind(0) == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", kind.symbol())))
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek_kind(0) {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of input")),
        }
    }

    fn unexpected(&self, expected: &str) -> CrudError {
        let token = self.current();
        CrudError::syntax(
            token.start,
            format!("expected {expected}, found {}", token.kind.display_name()),
        )
    }

    fn is_keyword_at(&self, offset: usize, keyword: &str) -> bool {
        matches!(self.peek_kind(offset), TokenKind::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword_at(0, keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&keyword.to_uppercase()))
        }
    }

    fn name(&mut self) -> Result<String> {
        match self.peek_kind(0).clone() {
            TokenKind::Ident(s) | TokenKind::QuotedIdent(s) | TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn binary_operator(&self) -> Option<(&'static str, Precedence)> {
        let op = match self.peek_kind(0) {
            TokenKind::OrOr => ("||", Precedence::Or),
            TokenKind::AndAnd => ("&&", Precedence::And),
            TokenKind::Eq => ("==", Precedence::Comparison),
            TokenKind::Neq => ("!=", Precedence::Comparison),
            TokenKind::Lt => ("<", Precedence::Comparison),
            TokenKind::LtEq => ("<=", Precedence::Comparison),
            TokenKind::Gt => (">", Precedence::Comparison),
            TokenKind::GtEq => (">=", Precedence::Comparison),
            TokenKind::Amp => ("&", Precedence::Bit),
            TokenKind::Pipe => ("|", Precedence::Bit),
            TokenKind::Caret => ("^", Precedence::Bit),
            TokenKind::Shl => ("<<", Precedence::Shift),
            TokenKind::Shr => (">>", Precedence::Shift),
            TokenKind::Plus => ("+", Precedence::AddSub),
            TokenKind::Minus => ("-", Precedence::AddSub),
            TokenKind::Star => ("*", Precedence::MulDiv),
            TokenKind::Slash => ("/", Precedence::MulDiv),
            TokenKind::Percent => ("%", Precedence::MulDiv),
            TokenKind::Ident(s) if s.eq_ignore_ascii_case("or") => ("||", Precedence::Or),
            TokenKind::Ident(s) if s.eq_ignore_ascii_case("xor") => ("xor", Precedence::Xor),
            TokenKind::Ident(s) if s.eq_ignore_ascii_case("and") => ("&&", Precedence::And),
            _ => return None,
        };
        Some(op)
    }

    fn ilri_ahead(&self) -> bool {
        const POSTFIX: [&str; 5] = ["in", "like", "between", "regexp", "overlaps"];
        let negated = self.is_keyword_at(0, "not");
        let offset = usize::from(negated);
        self.is_keyword_at(0, "is") || POSTFIX.iter().any(|kw| self.is_keyword_at(offset, kw))
    }

    fn expr(&mut self, min: Precedence) -> Result<Expr> {
        let mut left = self.unary()?;
        loop {
            if min <= Precedence::Ilri && self.ilri_ahead() {
                left = self.ilri(left)?;
                continue;
            }
            let Some((name, prec)) = self.binary_operator() else {
                break;
            };
            if prec < min {
                break;
            }
            self.advance();
            let right = self.expr(prec.next())?;
            left = Expr::operator(name, vec![left, right]);
        }
        Ok(left)
    }

    fn ilri(&mut self, left: Expr) -> Result<Expr> {
        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            let literal = if self.eat_keyword("null") {
                Scalar::Null
            } else if self.eat_keyword("true") {
                Scalar::Bool(true)
            } else if self.eat_keyword("false") {
                Scalar::Bool(false)
            } else {
                return Err(self.unexpected("NULL, TRUE or FALSE"));
            };
            let name = if negated { "is_not" } else { "is" };
            return Ok(Expr::operator(name, vec![left, Expr::Literal(literal)]));
        }

        let negated = self.eat_keyword("not");
        let prefix = if negated { "not_" } else { "" };
        if self.eat_keyword("in") {
            if self.eat(&TokenKind::LParen) {
                let mut params = vec![left];
                if !self.eat(&TokenKind::RParen) {
                    params.push(self.expr(Precedence::Lowest)?);
                    while self.eat(&TokenKind::Comma) {
                        params.push(self.expr(Precedence::Lowest)?);
                    }
                    self.expect(&TokenKind::RParen)?;
                }
                return Ok(Expr::operator(format!("{prefix}in"), params));
            }
            let container = self.expr(Precedence::Comparison)?;
            return Ok(Expr::operator(format!("{prefix}cont_in"), vec![left, container]));
        }
        if self.eat_keyword("like") {
            let mut params = vec![left, self.expr(Precedence::Comparison)?];
            if self.eat_keyword("escape") {
                params.push(self.expr(Precedence::Comparison)?);
            }
            return Ok(Expr::operator(format!("{prefix}like"), params));
        }
        if self.eat_keyword("between") {
            let low = self.expr(Precedence::Comparison)?;
            self.expect_keyword("and")?;
            let high = self.expr(Precedence::Comparison)?;
            return Ok(Expr::operator(format!("{prefix}between"), vec![left, low, high]));
        }
        if self.eat_keyword("regexp") {
            let pattern = self.expr(Precedence::Comparison)?;
            return Ok(Expr::operator(format!("{prefix}regexp"), vec![left, pattern]));
        }
        if self.eat_keyword("overlaps") {
            let other = self.expr(Precedence::Comparison)?;
            return Ok(Expr::operator(format!("{prefix}overlaps"), vec![left, other]));
        }
        Err(self.unexpected("IN, LIKE, BETWEEN, REGEXP or OVERLAPS"))
    }

    fn unary(&mut self) -> Result<Expr> {
        let name = match self.peek_kind(0) {
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::Plus => "sign_plus",
            TokenKind::Minus => "sign_minus",
            TokenKind::Ident(s) if s.eq_ignore_ascii_case("not") => "not",
            _ => return self.primary(),
        };
        self.advance();
        if name == "sign_minus" {
            if let TokenKind::Integer(n) = *self.peek_kind(0) {
                if let Some(negative) = negate(n) {
                    self.advance();
                    return Ok(Expr::Literal(Scalar::Sint(negative)));
                }
            }
        }
        let operand = self.unary()?;
        Ok(Expr::operator(name, vec![operand]))
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Colon => self.placeholder(token.start),
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr(Precedence::Lowest)?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.eat(&TokenKind::RBracket) {
                    items.push(self.expr(Precedence::Lowest)?);
                    while self.eat(&TokenKind::Comma) {
                        items.push(self.expr(Precedence::Lowest)?);
                    }
                    self.expect(&TokenKind::RBracket)?;
                }
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => self.object(),
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(
                    i64::try_from(n).map_or(Scalar::Uint(n), Scalar::Sint),
                ))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Scalar::Double(f)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Scalar::string(s)))
            }
            TokenKind::Dollar => {
                self.advance();
                let path = self.document_path(Vec::new())?;
                Ok(Expr::Identifier(ColumnIdentifier::document_path(path)))
            }
            TokenKind::QuotedIdent(name) => {
                self.advance();
                let path = self.document_path(vec![DocumentPathItem::Member(name)])?;
                Ok(Expr::Identifier(ColumnIdentifier::document_path(path)))
            }
            TokenKind::Ident(name) => {
                if name.eq_ignore_ascii_case("null") {
                    self.advance();
                    return Ok(Expr::Literal(Scalar::Null));
                }
                if name.eq_ignore_ascii_case("true") || name.eq_ignore_ascii_case("false") {
                    self.advance();
                    return Ok(Expr::Literal(Scalar::Bool(name.eq_ignore_ascii_case("true"))));
                }
                self.advance();
                if *self.peek_kind(0) == TokenKind::LParen {
                    return self.function_call(Identifier {
                        name,
                        schema_name: None,
                    });
                }
                if *self.peek_kind(0) == TokenKind::Dot
                    && matches!(self.peek_kind(1), TokenKind::Ident(_))
                    && *self.peek_kind(2) == TokenKind::LParen
                {
                    self.advance();
                    let function = self.name()?;
                    return self.function_call(Identifier {
                        name: function,
                        schema_name: Some(name),
                    });
                }
                let path = self.document_path(vec![DocumentPathItem::Member(name)])?;
                Ok(Expr::Identifier(ColumnIdentifier::document_path(path)))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn placeholder(&mut self, colon_at: usize) -> Result<Expr> {
        self.advance();
        let next = self.current().clone();
        let name = match next.kind {
            TokenKind::Ident(name) if next.start == colon_at + 1 => name,
            TokenKind::Integer(n) if next.start == colon_at + 1 => n.to_string(),
            _ => return Err(self.unexpected("a placeholder name")),
        };
        self.advance();
        Ok(Expr::Placeholder(self.placeholders.position(&name)))
    }

    fn object(&mut self) -> Result<Expr> {
        self.advance();
        let mut fields = Vec::new();
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expr::Object(fields));
        }
        loop {
            let key = self.name()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.expr(Precedence::Lowest)?;
            fields.push(ExprObjectField { key, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Object(fields))
    }

    fn function_call(&mut self, name: Identifier) -> Result<Expr> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                if self.eat(&TokenKind::Star) {
                    params.push(Expr::operator("*", Vec::new()));
                } else {
                    params.push(self.expr(Precedence::Lowest)?);
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        Ok(Expr::FunctionCall(FunctionCall { name, params }))
    }

    fn document_path(&mut self, mut path: Vec<DocumentPathItem>) -> Result<Vec<DocumentPathItem>> {
        loop {
            match self.peek_kind(0) {
                TokenKind::Dot => {
                    self.advance();
                    if self.eat(&TokenKind::Star) {
                        path.push(DocumentPathItem::MemberAsterisk);
                    } else {
                        path.push(DocumentPathItem::Member(self.name()?));
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    if self.eat(&TokenKind::Star) {
                        path.push(DocumentPathItem::ArrayIndexAsterisk);
                    } else if let TokenKind::Integer(n) = *self.peek_kind(0) {
                        let index = u32::try_from(n).map_err(|_| {
                            CrudError::syntax(self.current().start, "array index is out of range")
                        })?;
                        self.advance();
                        path.push(DocumentPathItem::ArrayIndex(index));
                    } else {
                        return Err(self.unexpected("an array index or '*'"));
                    }
                    self.expect(&TokenKind::RBracket)?;
                }
                TokenKind::DoubleStar => {
                    self.advance();
                    path.push(DocumentPathItem::DoubleAsterisk);
                }
                _ => break,
            }
        }
        if matches!(path.last(), Some(DocumentPathItem::DoubleAsterisk)) {
            return Err(self.unexpected("a path element after '**'"));
        }
        Ok(path)
    }
}

fn negate(n: u64) -> Option<i64> {
    if n == 1u64 << 63 {
        Some(i64::MIN)
    } else {
        i64::try_from(n).ok().map(|v| -v)
    }
}
