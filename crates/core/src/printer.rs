//! Code generation.
//!
//! Output is deterministic. Parentheses are inserted from operator
//! precedence, never carried over from the input, and expression statements
//! whose text would start like a declaration or a block are wrapped.

use crate::ast::*;
use crate::lexer::is_id_part;

/// Formatting switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    /// Minimal whitespace, everything on one line.
    pub compact: bool,
    /// Emit every character of string literals as an escape sequence.
    pub unicode_escape: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            compact: true,
            unicode_escape: false,
        }
    }
}

const INDENT: &str = "    ";

// Precedence levels above the binary operators of `BinaryOp::precedence`.
const PREC_SEQ: u8 = 0;
const PREC_ASSIGN: u8 = 1;
const PREC_COND: u8 = 2;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 17;
const PREC_MEMBER: u8 = 18;
const PREC_PRIMARY: u8 = 19;

pub fn print_program(program: &Program, opts: &PrintOptions) -> String {
    let mut printer = Printer::new(*opts);
    printer.stmts(&program.body);
    printer.out
}

/// Prints a single expression; mostly useful for diagnostics and tests.
pub fn print_expr(expr: &Expr, opts: &PrintOptions) -> String {
    let mut printer = Printer::new(*opts);
    printer.expr(expr, PREC_SEQ);
    printer.out
}

/// Quotes `value` as a single-quoted JavaScript string literal.
pub fn quote_string(value: &str, unicode_escape: bool) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if unicode_escape {
            escape_char_code(&mut out, c);
            continue;
        }
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            '\u{2028}' | '\u{2029}' => escape_char_code(&mut out, c),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => escape_char_code(&mut out, c),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn escape_char_code(out: &mut String, c: char) {
    let code = c as u32;
    if code <= 0xff {
        out.push_str(&format!("\\x{code:02x}"));
    } else {
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
            out.push_str(&format!("\\u{unit:04x}"));
        }
    }
}

struct Printer {
    out: String,
    opts: PrintOptions,
    indent: usize,
    /// The last token written was a regular expression literal.
    after_regex: bool,
    /// Printing a `for` initializer, where a bare `in` would end it.
    no_in: bool,
}

impl Printer {
    const fn new(opts: PrintOptions) -> Self {
        Self {
            out: String::new(),
            opts,
            indent: 0,
            after_regex: false,
            no_in: false,
        }
    }

    // ---- low level ------------------------------------------------------

    /// Appends `text`, separating it from the previous token when the two
    /// would otherwise lex differently.
    fn write(&mut self, text: &str) {
        let Some(first) = text.chars().next() else {
            return;
        };
        if let Some(last) = self.out.chars().next_back() {
            let fuse = (is_id_part(last) && is_id_part(first))
                || (self.after_regex && is_id_part(first))
                || (last == '+' && first == '+')
                || (last == '-' && first == '-')
                || (last == '/' && first == '/')
                || (last == '<' && first == '!');
            if fuse {
                self.out.push(' ');
            }
        }
        self.after_regex = false;
        self.out.push_str(text);
    }

    /// A space in readable mode only.
    fn space(&mut self) {
        if !self.opts.compact {
            self.out.push(' ');
        }
    }

    fn newline(&mut self) {
        if self.opts.compact || self.out.is_empty() {
            return;
        }
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn comma(&mut self) {
        self.write(",");
        self.space();
    }

    fn op(&mut self, op: &str) {
        self.space();
        self.write(op);
        self.space();
    }

    // ---- statements -----------------------------------------------------

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.newline();
            self.stmt(stmt);
        }
    }

    fn block(&mut self, body: &[Stmt]) {
        self.write("{");
        if !body.is_empty() {
            self.indent += 1;
            self.stmts(body);
            self.indent -= 1;
            self.newline();
        }
        self.write("}");
    }

    /// Body of a compound statement.
    fn body(&mut self, body: &Stmt) {
        match body {
            Stmt::Block(stmts) => {
                self.space();
                self.block(stmts);
            }
            other => {
                self.space();
                self.stmt(other);
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Directive(raw) => {
                self.write(raw);
                self.write(";");
            }
            Stmt::Expr(e) => {
                self.expr_statement(e);
                self.write(";");
            }
            Stmt::Var(decl) => {
                self.var_decl(decl);
                self.write(";");
            }
            Stmt::Function(f) => self.function(f, "function"),
            Stmt::Block(body) => self.block(body),
            Stmt::Empty => self.write(";"),
            Stmt::If { test, cons, alt } => {
                self.write("if");
                self.space();
                self.write("(");
                self.expr(test, PREC_SEQ);
                self.write(")");
                match alt {
                    Some(alt) => {
                        if ends_with_open_if(cons) {
                            self.space();
                            self.block(std::slice::from_ref(cons.as_ref()));
                        } else {
                            self.body(cons);
                        }
                        self.space();
                        self.write("else");
                        if matches!(alt.as_ref(), Stmt::Block(_)) {
                            self.body(alt);
                        } else {
                            self.out.push(' ');
                            self.stmt(alt);
                        }
                    }
                    None => self.body(cons),
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.write("for");
                self.space();
                self.write("(");
                self.no_in = true;
                match init {
                    Some(ForInit::Var(decl)) => self.var_decl(decl),
                    Some(ForInit::Expr(e)) => self.expr(e, PREC_SEQ),
                    None => {}
                }
                self.no_in = false;
                self.write(";");
                if let Some(test) = test {
                    self.space();
                    self.expr(test, PREC_SEQ);
                }
                self.write(";");
                if let Some(update) = update {
                    self.space();
                    self.expr(update, PREC_SEQ);
                }
                self.write(")");
                self.body(body);
            }
            Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body } => {
                self.write("for");
                self.space();
                self.write("(");
                match left {
                    ForHead::Var(kind, ident) => {
                        self.write(kind.as_str());
                        self.write(&ident.name);
                    }
                    ForHead::Expr(e) => {
                        self.no_in = true;
                        self.expr(e, PREC_CALL);
                        self.no_in = false;
                    }
                }
                if matches!(stmt, Stmt::ForIn { .. }) {
                    self.write("in");
                    self.expr(right, PREC_SEQ);
                } else {
                    self.write("of");
                    self.expr(right, PREC_ASSIGN);
                }
                self.write(")");
                self.body(body);
            }
            Stmt::While { test, body } => {
                self.write("while");
                self.space();
                self.write("(");
                self.expr(test, PREC_SEQ);
                self.write(")");
                self.body(body);
            }
            Stmt::DoWhile { body, test } => {
                self.write("do");
                self.body(body);
                self.space();
                self.write("while");
                self.space();
                self.write("(");
                self.expr(test, PREC_SEQ);
                self.write(")");
                self.write(";");
            }
            Stmt::Continue(label) | Stmt::Break(label) => {
                self.write(if matches!(stmt, Stmt::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    self.write(label);
                }
                self.write(";");
            }
            Stmt::Return(arg) => {
                self.write("return");
                if let Some(arg) = arg {
                    self.space();
                    self.expr(arg, PREC_SEQ);
                }
                self.write(";");
            }
            Stmt::Throw(arg) => {
                self.write("throw");
                self.space();
                self.expr(arg, PREC_SEQ);
                self.write(";");
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.write("try");
                self.space();
                self.block(block);
                if let Some(handler) = handler {
                    self.space();
                    self.write("catch");
                    self.space();
                    if let Some(param) = &handler.param {
                        self.write("(");
                        self.write(&param.name);
                        self.write(")");
                        self.space();
                    }
                    self.block(&handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.space();
                    self.write("finally");
                    self.space();
                    self.block(finalizer);
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                self.write("switch");
                self.space();
                self.write("(");
                self.expr(discriminant, PREC_SEQ);
                self.write(")");
                self.space();
                self.write("{");
                self.indent += 1;
                for case in cases {
                    self.newline();
                    match &case.test {
                        Some(test) => {
                            self.write("case");
                            self.space();
                            self.expr(test, PREC_SEQ);
                        }
                        None => self.write("default"),
                    }
                    self.write(":");
                    self.indent += 1;
                    self.stmts(&case.body);
                    self.indent -= 1;
                }
                self.indent -= 1;
                if !cases.is_empty() {
                    self.newline();
                }
                self.write("}");
            }
            Stmt::Labeled { label, body } => {
                self.write(label);
                self.write(":");
                self.space();
                self.stmt(body);
            }
            Stmt::Debugger => {
                self.write("debugger");
                self.write(";");
            }
        }
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        self.write(decl.kind.as_str());
        for (i, d) in decl.decls.iter().enumerate() {
            if i > 0 {
                self.comma();
            } else {
                self.out.push(' ');
            }
            self.write(&d.name.name);
            if let Some(init) = &d.init {
                self.op("=");
                self.expr(init, PREC_ASSIGN);
            }
        }
    }

    /// Prints an expression in statement position, parenthesized when its
    /// text would be read as a declaration or block.
    fn expr_statement(&mut self, e: &Expr) {
        let mark = self.out.len();
        self.expr(e, PREC_SEQ);
        let text_start = mark
            + self.out[mark..]
                .find(|c: char| c != ' ')
                .unwrap_or(self.out.len() - mark);
        let text = &self.out[text_start..];
        let ambiguous = text.starts_with('{')
            || starts_with_word(text, "function")
            || starts_with_word(text, "class")
            || (starts_with_word(text, "let") && text[3..].trim_start().starts_with('['));
        if ambiguous {
            self.out.insert(text_start, '(');
            self.out.push(')');
        }
    }

    fn function(&mut self, f: &Function, keyword: &str) {
        if !keyword.is_empty() {
            self.write(keyword);
        }
        if let Some(name) = &f.name {
            if !keyword.is_empty() {
                self.out.push(' ');
            }
            self.write(&name.name);
        } else if !keyword.is_empty() {
            self.space();
        }
        self.params(&f.params);
        self.space();
        let saved = std::mem::replace(&mut self.no_in, false);
        self.block(&f.body);
        self.no_in = saved;
    }

    fn params(&mut self, params: &[Param]) {
        self.write("(");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            if p.rest {
                self.write("...");
            }
            self.write(&p.name.name);
            if let Some(default) = &p.default {
                self.op("=");
                self.expr(default, PREC_ASSIGN);
            }
        }
        self.write(")");
    }

    // ---- expressions ----------------------------------------------------

    fn expr(&mut self, e: &Expr, min_prec: u8) {
        let wrap = precedence(e) < min_prec || (self.no_in && contains_bare_in(e));
        if wrap {
            let saved = std::mem::replace(&mut self.no_in, false);
            self.write("(");
            self.expr_inner(e);
            self.write(")");
            self.no_in = saved;
        } else {
            self.expr_inner(e);
        }
    }

    fn expr_inner(&mut self, e: &Expr) {
        match e {
            Expr::Ident(ident) => self.write(&ident.name),
            Expr::This => self.write("this"),
            Expr::Lit(lit) => self.lit(lit),
            Expr::Template(t) => self.template(t),
            Expr::TaggedTemplate { tag, quasi } => {
                self.expr(tag, PREC_CALL);
                self.template(quasi);
            }
            Expr::Array(elements) => {
                self.write("[");
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        self.comma();
                    }
                    if let Some(el) = el {
                        self.expr(el, PREC_ASSIGN);
                    }
                }
                if matches!(elements.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            Expr::Object(props) => self.object(props),
            Expr::Function(f) => self.function(f, "function"),
            Expr::Arrow(arrow) => {
                self.params(&arrow.params);
                self.op("=>");
                match &arrow.body {
                    ArrowBody::Block(body) => {
                        let saved = std::mem::replace(&mut self.no_in, false);
                        self.block(body);
                        self.no_in = saved;
                    }
                    ArrowBody::Expr(body) => {
                        let mark = self.out.len();
                        self.expr(body, PREC_ASSIGN);
                        if self.out[mark..].trim_start().starts_with('{') {
                            let at = mark + self.out[mark..].len()
                                - self.out[mark..].trim_start().len();
                            self.out.insert(at, '(');
                            self.out.push(')');
                        }
                    }
                }
            }
            Expr::Unary { op, arg } => {
                self.write(op.as_str());
                self.expr(arg, PREC_UNARY);
            }
            Expr::Update { op, prefix, arg } => {
                if *prefix {
                    self.write(op.as_str());
                    self.expr(arg, PREC_UNARY);
                } else {
                    self.expr(arg, PREC_CALL);
                    self.write(op.as_str());
                }
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                let (left_min, right_min) = if *op == BinaryOp::Exp {
                    (PREC_POSTFIX, prec)
                } else {
                    (prec, prec + 1)
                };
                self.binary_operand(*op, left, left_min);
                self.op(op.as_str());
                self.binary_operand(*op, right, right_min);
            }
            Expr::Assign { op, target, value } => {
                self.expr(target, PREC_CALL);
                self.op(op.as_str());
                self.expr(value, PREC_ASSIGN);
            }
            Expr::Cond { test, cons, alt } => {
                self.expr(test, PREC_COND + 1);
                self.op("?");
                let saved = std::mem::replace(&mut self.no_in, false);
                self.expr(cons, PREC_ASSIGN);
                self.no_in = saved;
                self.op(":");
                self.expr(alt, PREC_ASSIGN);
            }
            Expr::Call { callee, args } => {
                self.expr(callee, PREC_CALL);
                self.args(args);
            }
            Expr::New { callee, args } => {
                self.write("new");
                if new_callee_needs_parens(callee) {
                    self.write("(");
                    self.expr(callee, PREC_SEQ);
                    self.write(")");
                } else {
                    self.expr(callee, PREC_MEMBER);
                }
                self.args(args);
            }
            Expr::Member { object, prop } => {
                let bare_integer = matches!(object.as_ref(), Expr::Lit(Lit::Num(raw))
                    if raw.chars().all(|c| c.is_ascii_digit()));
                if bare_integer {
                    self.write("(");
                    self.expr(object, PREC_SEQ);
                    self.write(")");
                } else {
                    self.expr(object, PREC_CALL);
                }
                match prop {
                    MemberProp::Name(name) => {
                        self.write(".");
                        self.write(name);
                    }
                    MemberProp::Computed(p) => {
                        let saved = std::mem::replace(&mut self.no_in, false);
                        self.write("[");
                        self.expr(p, PREC_SEQ);
                        self.write("]");
                        self.no_in = saved;
                    }
                }
            }
            Expr::Seq(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.comma();
                    }
                    self.expr(item, PREC_ASSIGN);
                }
            }
            Expr::Spread(arg) => {
                self.write("...");
                self.expr(arg, PREC_ASSIGN);
            }
        }
    }

    /// Operand of a binary operator. `??` may not be mixed with `&&`/`||`
    /// without parentheses.
    fn binary_operand(&mut self, op: BinaryOp, operand: &Expr, min_prec: u8) {
        let mixes_nullish = match operand {
            Expr::Binary { op: inner, .. } => {
                (op == BinaryOp::Nullish && inner.is_logical())
                    || (op.is_logical() && *inner == BinaryOp::Nullish)
            }
            _ => false,
        };
        let unary_base = op == BinaryOp::Exp && matches!(operand, Expr::Unary { .. });
        if mixes_nullish || unary_base {
            self.write("(");
            self.expr(operand, PREC_SEQ);
            self.write(")");
        } else {
            self.expr(operand, min_prec);
        }
    }

    fn args(&mut self, args: &[Expr]) {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.write("(");
        for (i, a) in args.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.expr(a, PREC_ASSIGN);
        }
        self.write(")");
        self.no_in = saved;
    }

    fn lit(&mut self, lit: &Lit) {
        match lit {
            Lit::Null => self.write("null"),
            Lit::Bool(b) => self.write(if *b { "true" } else { "false" }),
            Lit::Num(raw) => self.write(raw),
            Lit::Str(s) => {
                let quoted = quote_string(s, self.opts.unicode_escape);
                self.write(&quoted);
            }
            Lit::Regex { pattern, flags } => {
                self.write(&format!("/{pattern}/{flags}"));
                self.after_regex = true;
            }
        }
    }

    fn template(&mut self, t: &Template) {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.write("`");
        for (i, quasi) in t.quasis.iter().enumerate() {
            self.out.push_str(quasi);
            if let Some(e) = t.exprs.get(i) {
                self.out.push_str("${");
                self.expr(e, PREC_SEQ);
                self.out.push('}');
            }
        }
        self.out.push('`');
        self.no_in = saved;
    }

    fn prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) => self.write(name),
            PropKey::Str(s) => {
                let quoted = quote_string(s, self.opts.unicode_escape);
                self.write(&quoted);
            }
            PropKey::Num(raw) => self.write(raw),
            PropKey::Computed(e) => {
                self.write("[");
                self.expr(e, PREC_ASSIGN);
                self.write("]");
            }
        }
    }

    fn object(&mut self, props: &[Prop]) {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.write("{");
        if !props.is_empty() {
            self.indent += 1;
            for (i, prop) in props.iter().enumerate() {
                if i > 0 {
                    self.write(",");
                }
                self.newline();
                match prop {
                    Prop::KeyValue {
                        key,
                        value,
                        shorthand,
                    } => {
                        let plain_shorthand = *shorthand
                            && matches!((key, value), (PropKey::Ident(k), Expr::Ident(v)) if *k == v.name);
                        self.prop_key(key);
                        if !plain_shorthand {
                            self.write(":");
                            self.space();
                            self.expr(value, PREC_ASSIGN);
                        }
                    }
                    Prop::Method { key, kind, func } => {
                        match kind {
                            MethodKind::Get => {
                                self.write("get");
                                self.out.push(' ');
                            }
                            MethodKind::Set => {
                                self.write("set");
                                self.out.push(' ');
                            }
                            MethodKind::Method => {}
                        }
                        self.prop_key(key);
                        self.function(func, "");
                    }
                    Prop::Spread(e) => {
                        self.write("...");
                        self.expr(e, PREC_ASSIGN);
                    }
                }
            }
            self.indent -= 1;
            self.newline();
        }
        self.write("}");
        self.no_in = saved;
    }
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.starts_with(word) && !text[word.len()..].starts_with(is_id_part)
}

/// Whether the consequent of an `if` with an `else` would capture that
/// `else` when printed without braces.
fn ends_with_open_if(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If { alt: None, .. } => true,
        Stmt::If { alt: Some(alt), .. } => ends_with_open_if(alt),
        Stmt::For { body, .. }
        | Stmt::ForIn { body, .. }
        | Stmt::ForOf { body, .. }
        | Stmt::While { body, .. }
        | Stmt::Labeled { body, .. } => ends_with_open_if(body),
        _ => false,
    }
}

/// A `new` callee containing a call must be parenthesized, otherwise the
/// call's arguments would be taken as the constructor arguments.
fn new_callee_needs_parens(callee: &Expr) -> bool {
    match callee {
        Expr::Call { .. } => true,
        Expr::Member { object, .. } => new_callee_needs_parens(object),
        Expr::TaggedTemplate { tag, .. } => new_callee_needs_parens(tag),
        other => precedence(other) < PREC_MEMBER,
    }
}

/// Whether printing `e` would emit an `in` operator outside any brackets.
fn contains_bare_in(e: &Expr) -> bool {
    match e {
        Expr::Binary { op, left, right } => {
            *op == BinaryOp::In || contains_bare_in(left) || contains_bare_in(right)
        }
        Expr::Assign { target, value, .. } => contains_bare_in(target) || contains_bare_in(value),
        Expr::Cond { test, alt, .. } => contains_bare_in(test) || contains_bare_in(alt),
        Expr::Seq(items) => items.iter().any(contains_bare_in),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } => contains_bare_in(arg),
        Expr::Arrow(arrow) => match &arrow.body {
            ArrowBody::Expr(body) => contains_bare_in(body),
            ArrowBody::Block(_) => false,
        },
        _ => false,
    }
}

fn precedence(e: &Expr) -> u8 {
    match e {
        Expr::Seq(_) => PREC_SEQ,
        Expr::Assign { .. } | Expr::Arrow(_) | Expr::Spread(_) => PREC_ASSIGN,
        Expr::Cond { .. } => PREC_COND,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } | Expr::Update { prefix: true, .. } => PREC_UNARY,
        Expr::Update { prefix: false, .. } => PREC_POSTFIX,
        Expr::Call { .. } | Expr::TaggedTemplate { .. } => PREC_CALL,
        Expr::New { .. } | Expr::Member { .. } => PREC_MEMBER,
        Expr::Ident(_)
        | Expr::This
        | Expr::Lit(_)
        | Expr::Template(_)
        | Expr::Array(_)
        | Expr::Object(_)
        | Expr::Function(_) => PREC_PRIMARY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use pretty_assertions::assert_eq;

    fn compact(src: &str) -> String {
        print_program(&parse_program(src).unwrap(), &PrintOptions::default())
    }

    fn readable(src: &str) -> String {
        let opts = PrintOptions {
            compact: false,
            unicode_escape: false,
        };
        print_program(&parse_program(src).unwrap(), &opts)
    }

    #[test]
    fn test_compact_output() {
        assert_eq!(
            compact("function greet(name) { var msg = \"Hello, \" + name; return msg; }"),
            "function greet(name){var msg='Hello, '+name;return msg;}"
        );
    }

    #[test]
    fn test_readable_output() {
        assert_eq!(
            readable("function f(a){if(a){return 1}else{return 2}}"),
            "function f(a) {\n    if (a) {\n        return 1;\n    } else {\n        return 2;\n    }\n}"
        );
    }

    #[test]
    fn test_parenthesization() {
        assert_eq!(compact("(a + b) * c;"), "(a+b)*c;");
        assert_eq!(compact("a - (b - c);"), "a-(b-c);");
        assert_eq!(compact("(a, b);"), "a,b;");
        assert_eq!(compact("f((a, b));"), "f((a,b));");
        assert_eq!(compact("(a ?? b) || c;"), "(a??b)||c;");
        assert_eq!(compact("(-a) ** 2;"), "(-a)**2;");
        assert_eq!(compact("new (f())();"), "new(f())();");
        assert_eq!(compact("new a.b();"), "new a.b();");
        assert_eq!(compact("(1).toString();"), "(1).toString();");
        assert_eq!(compact("x = (y => ({}));"), "x=(y)=>({});");
    }

    #[test]
    fn test_statement_start_is_disambiguated() {
        assert_eq!(compact("(function(){})();"), "(function(){}());");
        assert_eq!(compact("({}).toString();"), "({}.toString());");
    }

    #[test]
    fn test_tokens_do_not_fuse() {
        assert_eq!(compact("a + +b; a - -b; typeof x; a < !--b;"), "a+ +b;a- -b;typeof x;a< !--b;");
        assert_eq!(compact("x = /re/ in o;"), "x=/re/ in o;");
    }

    #[test]
    fn test_for_init_keeps_in_parenthesized() {
        assert_eq!(
            compact("for (var a = ('x' in o); a; ) {}"),
            "for(var a=('x'in o);a;){}"
        );
    }

    #[test]
    fn test_dangling_else() {
        assert_eq!(
            compact("if (a) { if (b) c(); } else d();"),
            "if(a){if(b)c();}else d();"
        );
    }

    #[test]
    fn test_unicode_escape() {
        assert_eq!(quote_string("a'😀", true), "'\\x61\\x27\\ud83d\\ude00'");
        assert_eq!(quote_string("it's\n", false), "'it\\'s\\n'");
    }

    #[test]
    fn test_printing_is_idempotent() {
        let src = "var o = { a: 1, 'b c': [1, , 3], get d() { return this.a; } };\nlabel: for (var k in o) { if (k) continue label; else break; }\nswitch (x) { case 1: y(); break; default: z(); }\ntry { t(); } catch (e) { u(e); } finally { v(); }\nvar s = `x${o.a + 1}y`;";
        let once = compact(src);
        assert_eq!(compact(&once), once);
        let pretty = readable(src);
        assert_eq!(readable(&pretty), pretty);
    }
}
