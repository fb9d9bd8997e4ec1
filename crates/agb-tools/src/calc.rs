// SPDX-License-Identifier: MIT OR Apache-2.0
//! Restricted arithmetic evaluator.
//!
//! Accepts digits, `+ - * /`, `.`, parentheses, and whitespace; anything
//! else is rejected before any parsing happens. The grammar is evaluated by
//! a small recursive-descent parser with the usual precedence rules.

const ALLOWED: &str = "0123456789+-*/.() ";

/// Evaluate a restricted arithmetic expression.
///
/// Returns `"{expr} = {result}"` on success, the fixed rejection string when
/// the expression contains a disallowed character, and `"Error: …"` for
/// arithmetic or syntax failures. Never panics.
pub fn evaluate(expression: &str) -> String {
    if !expression.chars().all(|c| ALLOWED.contains(c)) {
        return "Invalid expression - only basic math allowed".to_string();
    }

    match Parser::new(expression).parse() {
        Ok(value) => format!("{expression} = {}", format_number(value)),
        Err(reason) => format!("Error: {reason}"),
    }
}

fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn parse(mut self) -> Result<f64, String> {
        self.skip_ws();
        if self.chars.peek().is_none() {
            return Err("empty expression".to_string());
        }
        let value = self.expr()?;
        self.skip_ws();
        match self.chars.peek() {
            None => Ok(value),
            Some(c) => Err(format!("unexpected character '{c}'")),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.peek() == Some(&' ') {
            self.chars.next();
        }
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some('+') => {
                    self.chars.next();
                    value += self.term()?;
                }
                Some('-') => {
                    self.chars.next();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some('*') => {
                    self.chars.next();
                    value *= self.factor()?;
                }
                Some('/') => {
                    self.chars.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, String> {
        self.skip_ws();
        match self.chars.peek() {
            Some('-') => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.chars.next();
                self.factor()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, String> {
        self.skip_ws();
        match self.chars.peek() {
            Some('(') => {
                self.chars.next();
                let value = self.expr()?;
                self.skip_ws();
                if self.chars.next() != Some(')') {
                    return Err("unbalanced parentheses".to_string());
                }
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || *c == '.' => self.number(),
            Some(c) => Err(format!("unexpected character '{c}'")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let mut literal = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                literal.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{literal}'"))
    }
}
