//! Syntax tree for the supported JavaScript subset.
//!
//! The tree is owned and mutated in place by the transform passes. Every
//! identifier occurrence carries a [`NodeId`]; the scope resolver keys its
//! binding references by those ids, so passes that synthesize identifiers must
//! allocate fresh ids through [`Program::ident`].

use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Identity of an identifier occurrence within a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic allocator for [`NodeId`]s.
#[derive(Debug, Default, Clone)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    /// Returns a fresh id.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub const fn allocated(&self) -> u32 {
        self.next
    }
}

/// A parsed source unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Top-level statements, including the directive prologue.
    pub body: Vec<Stmt>,
    /// Id allocator shared with every template parsed into this program.
    pub ids: NodeIdGen,
    /// Every identifier and label name that occurs in the program.
    pub names: HashSet<String>,
    /// Binding names introduced by passes; always renamed.
    pub synthetic: BTreeSet<String>,
}

impl Program {
    /// Creates an identifier node with a fresh id.
    pub fn ident(&mut self, name: impl Into<String>) -> Ident {
        Ident {
            id: self.ids.next_id(),
            name: name.into(),
        }
    }

    /// Reserves a name that occurs nowhere in the program and marks it synthetic.
    ///
    /// Names are `$<hint>` followed by a counter, so they can never clash with
    /// generated hexadecimal or mangled names.
    pub fn fresh_name(&mut self, hint: &str) -> String {
        let mut n = self.synthetic.len();
        loop {
            let candidate = format!("${hint}{n}");
            if !self.names.contains(&candidate) {
                self.names.insert(candidate.clone());
                self.synthetic.insert(candidate.clone());
                return candidate;
            }
            n += 1;
        }
    }

    /// Index of the first statement after the directive prologue.
    pub fn prologue_len(&self) -> usize {
        prologue_len(&self.body)
    }
}

/// Number of leading directive statements in a body.
pub fn prologue_len(body: &[Stmt]) -> usize {
    body.iter()
        .take_while(|s| matches!(s, Stmt::Directive(_)))
        .count()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Let => "let",
            Self::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub decls: Vec<VarDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub name: Ident,
    pub init: Option<Expr>,
}

/// Function declaration, expression, or method body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<Ident>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub params: Vec<Param>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// Left-hand side of `for-in` / `for-of`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForHead {
    Var(VarKind, Ident),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Ident>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A directive such as `'use strict'`, kept as its raw source text.
    Directive(String),
    Expr(Expr),
    Var(VarDecl),
    Function(Function),
    Block(Vec<Stmt>),
    Empty,
    If {
        test: Expr,
        cons: Box<Stmt>,
        alt: Option<Box<Stmt>>,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Continue(Option<String>),
    Break(Option<String>),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Debugger,
}

impl Stmt {
    /// Whether this is an iteration statement.
    pub const fn is_loop(&self) -> bool {
        matches!(
            self,
            Self::For { .. }
                | Self::ForIn { .. }
                | Self::ForOf { .. }
                | Self::While { .. }
                | Self::DoWhile { .. }
        )
    }

    /// Whether this is a block-scoped (`let`/`const`) declaration.
    pub const fn is_lexical_decl(&self) -> bool {
        matches!(
            self,
            Self::Var(VarDecl {
                kind: VarKind::Let | VarKind::Const,
                ..
            })
        )
    }

    /// Body of a loop statement, if this is one.
    pub fn loop_body_mut(&mut self) -> Option<&mut Stmt> {
        match self {
            Self::For { body, .. }
            | Self::ForIn { body, .. }
            | Self::ForOf { body, .. }
            | Self::While { body, .. }
            | Self::DoWhile { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Null,
    Bool(bool),
    /// Numeric literal kept as written (including BigInt suffix).
    Num(String),
    /// Cooked string value.
    Str(String),
    Regex { pattern: String, flags: String },
}

/// Template literal; `quasis` hold raw text and always has one more entry
/// than `exprs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub quasis: Vec<String>,
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Get,
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    KeyValue {
        key: PropKey,
        value: Expr,
        shorthand: bool,
    },
    Method {
        key: PropKey,
        kind: MethodKind,
        func: Function,
    },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    Name(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Typeof => "typeof",
            Self::Void => "void",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Incr,
    Decr,
}

impl UpdateOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incr => "++",
            Self::Decr => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    BitOr,
    BitXor,
    BitAnd,
    In,
    InstanceOf,
    And,
    Or,
    Nullish,
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Exp => "**",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::In => "in",
            Self::InstanceOf => "instanceof",
            Self::And => "&&",
            Self::Or => "||",
            Self::Nullish => "??",
        }
    }

    /// Binding power; higher binds tighter.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Nullish => 3,
            Self::Or => 4,
            Self::And => 5,
            Self::BitOr => 6,
            Self::BitXor => 7,
            Self::BitAnd => 8,
            Self::Eq | Self::NotEq | Self::StrictEq | Self::StrictNotEq => 9,
            Self::Lt | Self::LtE | Self::Gt | Self::GtE | Self::In | Self::InstanceOf => 10,
            Self::Shl | Self::Shr | Self::UShr => 11,
            Self::Add | Self::Sub => 12,
            Self::Mul | Self::Div | Self::Mod => 13,
            Self::Exp => 14,
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        Some(match s {
            "==" => Self::Eq,
            "!=" => Self::NotEq,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNotEq,
            "<" => Self::Lt,
            "<=" => Self::LtE,
            ">" => Self::Gt,
            ">=" => Self::GtE,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            ">>>" => Self::UShr,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Mod,
            "**" => Self::Exp,
            "|" => Self::BitOr,
            "^" => Self::BitXor,
            "&" => Self::BitAnd,
            "in" => Self::In,
            "instanceof" => Self::InstanceOf,
            "&&" => Self::And,
            "||" => Self::Or,
            "??" => Self::Nullish,
            _ => return None,
        })
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Shl,
    Shr,
    UShr,
    BitOr,
    BitXor,
    BitAnd,
    And,
    Or,
    Nullish,
}

impl AssignOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Mod => "%=",
            Self::Exp => "**=",
            Self::Shl => "<<=",
            Self::Shr => ">>=",
            Self::UShr => ">>>=",
            Self::BitOr => "|=",
            Self::BitXor => "^=",
            Self::BitAnd => "&=",
            Self::And => "&&=",
            Self::Or => "||=",
            Self::Nullish => "??=",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        Some(match s {
            "=" => Self::Assign,
            "+=" => Self::Add,
            "-=" => Self::Sub,
            "*=" => Self::Mul,
            "/=" => Self::Div,
            "%=" => Self::Mod,
            "**=" => Self::Exp,
            "<<=" => Self::Shl,
            ">>=" => Self::Shr,
            ">>>=" => Self::UShr,
            "|=" => Self::BitOr,
            "^=" => Self::BitXor,
            "&=" => Self::BitAnd,
            "&&=" => Self::And,
            "||=" => Self::Or,
            "??=" => Self::Nullish,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    This,
    Lit(Lit),
    Template(Template),
    TaggedTemplate {
        tag: Box<Expr>,
        quasi: Template,
    },
    /// Array literal; `None` elements are holes.
    Array(Vec<Option<Expr>>),
    Object(Vec<Prop>),
    Function(Box<Function>),
    Arrow(Box<Arrow>),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Cond {
        test: Box<Expr>,
        cons: Box<Expr>,
        alt: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        prop: MemberProp,
    },
    Seq(Vec<Expr>),
    /// `...expr`; only valid as an array element or call argument.
    Spread(Box<Expr>),
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Lit(Lit::Str(value.into()))
    }

    pub fn num(value: impl fmt::Display) -> Self {
        Self::Lit(Lit::Num(value.to_string()))
    }

    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(callee: Self, args: Vec<Self>) -> Self {
        Self::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn assign(target: Self, value: Self) -> Self {
        Self::Assign {
            op: AssignOp::Assign,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Returns the cooked value if this is a string literal.
    pub fn as_str_lit(&self) -> Option<&str> {
        match self {
            Self::Lit(Lit::Str(s)) => Some(s),
            _ => None,
        }
    }
}
