use std::rc::Rc;

use crate::{
    ast::{
        BinaryOp, Block, CatchBinding, CatchClause, ElseBranch, Literal, Node, NodeKind,
        TableField, UnaryOp,
    },
    diagnostics::{Diagnostic, SourcePos},
    lexer::{self, Keyword, Number, Token, TokenKind},
    stack::ensure_sufficient_stack,
};

/// Lexes and parses a whole program.
pub fn parse_program(source: &str) -> Result<Block, Diagnostic> {
    let tokens = lexer::lex(source)?;
    parse(tokens)
}

/// Parses a token stream (which must end with `Eof`) into the program block.
pub fn parse(tokens: Vec<Token>) -> Result<Block, Diagnostic> {
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|tok| tok.kind) != Some(TokenKind::Eof) {
            let pos = tokens.last().map(|tok| tok.pos).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                pos,
                lexeme: None,
                number: None,
            });
        }
        Self { tokens, current: 0 }
    }

    fn parse_program(&mut self) -> Result<Block, Diagnostic> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Block {
            statements,
            pos: SourcePos::new(1, 1),
        })
    }

    fn parse_block(&mut self) -> Result<Block, Diagnostic> {
        let pos = self.consume(TokenKind::LBrace, "expected '{'")?.pos;
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            statements.push(ensure_sufficient_stack(|| self.parse_statement())?);
            self.skip_newlines();
        }
        self.consume(TokenKind::RBrace, "expected '}'")?;
        Ok(Block { statements, pos })
    }

    fn parse_statement(&mut self) -> Result<Node, Diagnostic> {
        self.skip_newlines();
        let pos = self.peek().pos;
        if self.matches_keyword(Keyword::Import) {
            return self.parse_import(pos);
        }
        if self.matches_keyword(Keyword::Mutate) {
            let target = self.parse_expression()?;
            self.skip_newlines();
            let body = self.parse_block()?;
            return Ok(Node::new(
                NodeKind::Mutate {
                    target: Box::new(target),
                    body,
                },
                pos,
            ));
        }
        if self.matches_keyword(Keyword::Undefine) {
            let target = self.parse_expression()?;
            return Ok(Node::new(
                NodeKind::Undefine {
                    target: Box::new(target),
                },
                pos,
            ));
        }
        if self.matches_keyword(Keyword::Try) {
            return self.parse_try(pos);
        }
        if self.matches_keyword(Keyword::Throw) {
            let expr = self.parse_expression()?;
            return Ok(Node::new(NodeKind::Throw(Box::new(expr)), pos));
        }
        self.parse_expression()
    }

    fn parse_import(&mut self, pos: SourcePos) -> Result<Node, Diagnostic> {
        let name = self.consume(TokenKind::Identifier, "expected import name")?;
        self.consume_keyword(Keyword::From, "expected 'from'")?;
        let path = self.consume(TokenKind::String, "expected module path")?;
        Ok(Node::new(
            NodeKind::Import {
                name: name.text().to_string(),
                path: path.text().to_string(),
            },
            pos,
        ))
    }

    fn parse_try(&mut self, pos: SourcePos) -> Result<Node, Diagnostic> {
        self.skip_newlines();
        let body = self.parse_block()?;

        let catch = if self.matches_clause(Keyword::Catch) {
            let binding = if self.matches(TokenKind::Star) {
                CatchBinding::Any
            } else {
                let name = self.consume(TokenKind::Identifier, "expected catch name")?;
                CatchBinding::Named(name.text().to_string())
            };
            self.skip_newlines();
            Some(CatchClause {
                binding,
                body: self.parse_block()?,
            })
        } else {
            None
        };

        let finally = if self.matches_clause(Keyword::Finally) {
            self.skip_newlines();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Node::new(
            NodeKind::Try {
                body,
                catch,
                finally,
            },
            pos,
        ))
    }

    fn parse_expression(&mut self) -> Result<Node, Diagnostic> {
        self.skip_newlines();
        ensure_sufficient_stack(|| self.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Result<Node, Diagnostic> {
        let target = self.parse_or()?;
        if self.matches(TokenKind::Assign) {
            let pos = self.previous().pos;
            let value = ensure_sufficient_stack(|| self.parse_assignment())?;
            return Ok(Node::new(
                NodeKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                pos,
            ));
        }
        Ok(target)
    }

    fn parse_or(&mut self) -> Result<Node, Diagnostic> {
        let mut expr = self.parse_and()?;
        while self.matches(TokenKind::DoublePipe) {
            let pos = self.previous().pos;
            let right = self.parse_and()?;
            expr = binary(BinaryOp::Or, expr, right, pos);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Node, Diagnostic> {
        let mut expr = self.parse_equality()?;
        while self.matches(TokenKind::DoubleAmpersand) {
            let pos = self.previous().pos;
            let right = self.parse_equality()?;
            expr = binary(BinaryOp::And, expr, right, pos);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Node, Diagnostic> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::BangEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_comparison()?;
            expr = binary(op, expr, right, pos);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Node, Diagnostic> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_term()?;
            expr = binary(op, expr, right, pos);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Node, Diagnostic> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_factor()?;
            expr = binary(op, expr, right, pos);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Node, Diagnostic> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let pos = self.advance().pos;
            let right = self.parse_unary()?;
            expr = binary(op, expr, right, pos);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Node, Diagnostic> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            _ => return self.parse_postfix(),
        };
        let pos = self.advance().pos;
        let expr = ensure_sufficient_stack(|| self.parse_unary())?;
        Ok(Node::new(
            NodeKind::Unary {
                op,
                expr: Box::new(expr),
            },
            pos,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Node, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            let pos = expr.pos;
            if self.matches(TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.matches(TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.consume(TokenKind::RParen, "expected ')'")?;
                }
                expr = Node::new(
                    NodeKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    pos,
                );
            } else if self.matches(TokenKind::Dot) {
                let name = self.consume(TokenKind::Identifier, "expected property name")?;
                expr = Node::new(
                    NodeKind::Dot {
                        object: Box::new(expr),
                        name: name.text().to_string(),
                    },
                    pos,
                );
            } else if self.matches(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.consume(TokenKind::RBracket, "expected ']'")?;
                expr = Node::new(
                    NodeKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    pos,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Node, Diagnostic> {
        self.skip_newlines();
        let token = self.advance();
        let pos = token.pos;
        let literal = |lit: Literal| Ok(Node::new(NodeKind::Literal(lit), pos));
        match token.kind {
            TokenKind::Int => match token.number {
                Some(Number::Int(value)) => literal(Literal::Int(value)),
                _ => Err(Diagnostic::parser("malformed int token", pos)),
            },
            TokenKind::Float => match token.number {
                Some(Number::Float(value)) => literal(Literal::Float(value)),
                _ => Err(Diagnostic::parser("malformed float token", pos)),
            },
            TokenKind::String => literal(Literal::String(Rc::from(token.text()))),
            TokenKind::Keyword(Keyword::True) => literal(Literal::Bool(true)),
            TokenKind::Keyword(Keyword::False) => literal(Literal::Bool(false)),
            TokenKind::Keyword(Keyword::Null) => literal(Literal::Null),
            TokenKind::Identifier => Ok(Node::new(
                NodeKind::Variable(token.text().to_string()),
                pos,
            )),
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RParen, "expected ')'")?;
                Ok(expr)
            }
            TokenKind::Keyword(Keyword::Fn) => self.parse_function(pos),
            TokenKind::Keyword(Keyword::If) => self.parse_if(pos),
            TokenKind::LBracket => self.parse_table(pos),
            _ => Err(Diagnostic::parser("unexpected token", pos)),
        }
    }

    fn parse_function(&mut self, pos: SourcePos) -> Result<Node, Diagnostic> {
        self.consume(TokenKind::LParen, "expected '('")?;
        let mut params = Vec::new();
        if !self.matches(TokenKind::RParen) {
            loop {
                let param = self.consume(TokenKind::Identifier, "expected parameter name")?;
                params.push(param.text().to_string());
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(TokenKind::RParen, "expected ')'")?;
        }
        let body = self.parse_block()?;
        Ok(Node::new(
            NodeKind::Function {
                params: params.into(),
                body: Rc::new(body),
            },
            pos,
        ))
    }

    /// Parses the remainder of an `if` whose keyword was already consumed.
    fn parse_if(&mut self, pos: SourcePos) -> Result<Node, Diagnostic> {
        let condition = self.parse_expression()?;
        self.skip_newlines();
        let then_branch = self.parse_block()?;
        self.skip_newlines();
        let else_branch = if self.matches_keyword(Keyword::Else) {
            self.skip_newlines();
            if self.matches_keyword(Keyword::If) {
                let nested_pos = self.previous().pos;
                Some(ElseBranch::If(Box::new(self.parse_if(nested_pos)?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };
        Ok(Node::new(
            NodeKind::If {
                condition: Box::new(condition),
                then_branch,
                else_branch,
            },
            pos,
        ))
    }

    fn parse_table(&mut self, pos: SourcePos) -> Result<Node, Diagnostic> {
        let mut fields = Vec::new();
        self.skip_newlines();
        if !self.matches(TokenKind::RBracket) {
            loop {
                let key = match self.peek().kind {
                    TokenKind::Identifier | TokenKind::String => self.advance(),
                    _ => return Err(self.error("expected table key")),
                };
                self.consume(TokenKind::Assign, "expected '=' in table literal")?;
                let value = self.parse_expression()?;
                fields.push(TableField {
                    key: key.text().to_string(),
                    value,
                });
                self.skip_newlines();
                if self.matches(TokenKind::Comma) {
                    self.skip_newlines();
                    continue;
                }
                if self.matches(TokenKind::RBracket) {
                    break;
                }
                return Err(self.error("expected ',' or ']'"));
            }
        }
        Ok(Node::new(NodeKind::Table(fields), pos))
    }

    fn skip_newlines(&mut self) {
        while self.matches(TokenKind::Newline) {}
    }

    /// Matches `catch`/`finally`, looking past newlines that separate the
    /// clause from the preceding block.
    fn matches_clause(&mut self, keyword: Keyword) -> bool {
        let mut lookahead = self.current;
        while self.tokens[lookahead].kind == TokenKind::Newline {
            lookahead += 1;
        }
        if self.tokens[lookahead].kind == TokenKind::Keyword(keyword) {
            self.current = lookahead + 1;
            true
        } else {
            false
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(TokenKind::Keyword(keyword))
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword, message: &str) -> Result<Token, Diagnostic> {
        self.consume(TokenKind::Keyword(keyword), message)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn error(&self, message: &str) -> Diagnostic {
        Diagnostic::parser(message, self.peek().pos)
    }
}

fn binary(op: BinaryOp, left: Node, right: Node, pos: SourcePos) -> Node {
    Node::new(
        NodeKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        pos,
    )
}
