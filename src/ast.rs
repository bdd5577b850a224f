use std::rc::Rc;

use crate::diagnostics::SourcePos;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Rc<str>),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// A `{ ... }` statement sequence.
#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Node>,
    pub pos: SourcePos,
}

#[derive(Debug, Clone)]
pub enum ElseBranch {
    If(Box<Node>),
    Block(Block),
}

#[derive(Debug, Clone)]
pub enum CatchBinding {
    /// `catch *`
    Any,
    Named(String),
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub binding: CatchBinding,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct TableField {
    pub key: String,
    pub value: Node,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: SourcePos,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Block(Block),
    Literal(Literal),
    Variable(String),
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Dot {
        object: Box<Node>,
        name: String,
    },
    Index {
        object: Box<Node>,
        index: Box<Node>,
    },
    If {
        condition: Box<Node>,
        then_branch: Block,
        else_branch: Option<ElseBranch>,
    },
    Function {
        params: Rc<[String]>,
        body: Rc<Block>,
    },
    Import {
        name: String,
        path: String,
    },
    Mutate {
        target: Box<Node>,
        body: Block,
    },
    Undefine {
        target: Box<Node>,
    },
    Try {
        body: Block,
        catch: Option<CatchClause>,
        finally: Option<Block>,
    },
    Throw(Box<Node>),
    Table(Vec<TableField>),
}

impl Node {
    pub fn new(kind: NodeKind, pos: SourcePos) -> Self {
        Self { kind, pos }
    }
}
