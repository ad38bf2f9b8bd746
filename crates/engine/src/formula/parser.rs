// Formula parser - converts formula strings into AST
// Supports: numbers, "string" literals, [Column Title] references,
// + - * / with parentheses, unary minus, and single-column aggregates
// (SUM, AVG/AVERAGE, MIN, MAX, COUNT). Anything else is a parse error.

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    /// `[Title]`, resolved against the row at evaluation time
    ColumnRef(String),
    Neg(Box<Expr>),
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Aggregate over one column across all rows
    Aggregate {
        func: Aggregate,
        column: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl Aggregate {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUM" => Some(Aggregate::Sum),
            "AVG" | "AVERAGE" => Some(Aggregate::Avg),
            "MIN" => Some(Aggregate::Min),
            "MAX" => Some(Aggregate::Max),
            "COUNT" => Some(Aggregate::Count),
            _ => None,
        }
    }
}

/// Parse a formula string (with its leading `=`) into an AST.
pub fn parse(formula: &str) -> Result<Expr, String> {
    let input = formula
        .strip_prefix('=')
        .ok_or_else(|| "Formula must start with =".to_string())?;

    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }

    let (expr, pos) = parse_add_sub(&tokens, 0, 0)?;
    if pos < tokens.len() {
        return Err(format!("Unexpected token: {:?}", tokens[pos]));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    StringLit(String),
    ColumnRef(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            '[' => {
                chars.next(); // consume [
                let mut title = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(ch) => title.push(ch),
                        None => return Err("Unterminated column reference".to_string()),
                    }
                }
                tokens.push(Token::ColumnRef(title));
            }
            '"' => {
                chars.next(); // consume opening quote
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            // "" inside a literal is an escaped quote
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                s.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(ch) => s.push(ch),
                        None => return Err("Unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::StringLit(s));
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            'A'..='Z' | 'a'..='z' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(format!("Unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

/// Nesting limit for parentheses, unary signs and operator chains. Bounds
/// both parser recursion and the depth of the resulting tree.
pub const MAX_DEPTH: usize = 256;

fn descend(depth: usize) -> Result<usize, String> {
    if depth >= MAX_DEPTH {
        return Err("Formula nested too deeply".to_string());
    }
    Ok(depth + 1)
}

fn parse_add_sub(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos, depth)?;
    let mut depth = depth;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        // Each operator deepens the left-leaning tree by one
        depth = descend(depth)?;
        let (right, new_pos) = parse_mul_div(tokens, pos + 1, depth)?;
        left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos, depth)?;
    let mut depth = depth;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        depth = descend(depth)?;
        let (right, new_pos) = parse_unary(tokens, pos + 1, depth)?;
        left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    match tokens.get(pos) {
        Some(Token::Minus) => {
            let (inner, new_pos) = parse_unary(tokens, pos + 1, descend(depth)?)?;
            Ok((Expr::Neg(Box::new(inner)), new_pos))
        }
        Some(Token::Plus) => parse_unary(tokens, pos + 1, descend(depth)?),
        _ => parse_primary(tokens, pos, depth),
    }
}

fn parse_primary(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let Some(token) = tokens.get(pos) else {
        return Err("Unexpected end of expression".to_string());
    };

    match token {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::StringLit(s) => Ok((Expr::Text(s.clone()), pos + 1)),
        Token::ColumnRef(title) => Ok((Expr::ColumnRef(title.clone()), pos + 1)),
        Token::LParen => {
            let (expr, new_pos) = parse_add_sub(tokens, pos + 1, descend(depth)?)?;
            match tokens.get(new_pos) {
                Some(Token::RParen) => Ok((expr, new_pos + 1)),
                _ => Err("Missing closing parenthesis".to_string()),
            }
        }
        Token::Ident(name) => {
            let func = Aggregate::from_name(name).ok_or_else(|| format!("Unknown function: {}", name))?;
            // Exactly FUNC([Column])
            match (tokens.get(pos + 1), tokens.get(pos + 2), tokens.get(pos + 3)) {
                (Some(Token::LParen), Some(Token::ColumnRef(column)), Some(Token::RParen)) => {
                    Ok((Expr::Aggregate { func, column: column.clone() }, pos + 4))
                }
                _ => Err(format!("{} expects a single [Column] argument", name.to_ascii_uppercase())),
            }
        }
        other => Err(format!("Unexpected token: {:?}", other)),
    }
}
