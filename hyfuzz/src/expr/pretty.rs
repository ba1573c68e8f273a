//! RcDoc-based pretty-printer with termcolor annotations for [`Expr`].
//!
//! Role
//! - Convert a tree into an annotated document suitable for width-aware rendering.
//! - Provide colored output for terminals (TTY-aware) and plain strings for logs, failure
//!   reports and tests.
//!
//! Notation
//! - Root placeholders print as `$i`, field accesses as `e<i>.<Property>`.
//! - Operators print infix with C-like precedence; calls print as `Name(a, b)`.

use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;
use pretty::{RcDoc, RenderAnnotated};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct, // commas, dots
    /// Parentheses are colored by nesting depth so matching pairs share a color.
    Paren(u8),
    Keyword,  // true, false, null
    Operator, // +, &&, ==, ...
    Ident,    // roots and fields
    Literal,  // numbers, strings, dates
    Function, // Like, StartsWith, ...
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Punct => {
                s.set_dimmed(true);
            }
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    5 => Color::Magenta,
                    _ => unreachable!(),
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Keyword => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
            Style::Function => {
                s.set_fg(Some(Color::Blue)).set_bold(true);
            }
        }
        s
    }
}

fn styled(style: Style, s: &'static str) -> RcDoc<'static, Style> {
    RcDoc::as_string(s).annotate(style)
}

fn punct(s: &'static str) -> RcDoc<'static, Style> {
    styled(Style::Punct, s)
}

#[inline]
fn lparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn op(s: &'static str) -> RcDoc<'static, Style> {
    styled(Style::Operator, s)
}

fn literal(v: &Value) -> RcDoc<'static, Style> {
    match v {
        Value::Null(_) => styled(Style::Keyword, "null"),
        Value::Bool(true) => styled(Style::Keyword, "true"),
        Value::Bool(false) => styled(Style::Keyword, "false"),
        other => RcDoc::as_string(other.to_string()).annotate(Style::Literal),
    }
}

/// Binding strength; higher binds tighter.
fn precedence(e: &Expr) -> u8 {
    match e {
        Expr::Binary { op, .. } => match op {
            BinaryOp::OrElse => 1,
            BinaryOp::AndAlso => 2,
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::Equal | BinaryOp::NotEqual => 5,
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => 6,
            BinaryOp::LeftShift | BinaryOp::RightShift => 7,
            BinaryOp::Add | BinaryOp::Subtract => 8,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 9,
        },
        // `x == null` reads like an equality
        Expr::Unary {
            op: UnaryOp::IsNull | UnaryOp::IsNotNull,
            ..
        } => 5,
        Expr::Unary { .. } => 10,
        Expr::Constant(_) | Expr::Root(_) | Expr::Field(_) | Expr::Call { .. } => 255,
    }
}

/// Operators are left-associative: the right operand needs parentheses on equal precedence.
#[inline]
fn requires_parens(child: &Expr, parent_prec: u8, right_operand: bool) -> bool {
    let child_prec = precedence(child);
    child_prec < parent_prec || (right_operand && child_prec == parent_prec)
}

#[inline]
fn operand_doc(child: &Expr, parent_prec: u8, right_operand: bool, depth: u8) -> RcDoc<'static, Style> {
    if requires_parens(child, parent_prec, right_operand) {
        lparen(depth)
            .append(to_doc_with_depth(child, depth + 1))
            .append(rparen(depth))
            .group()
    } else {
        to_doc_with_depth(child, depth)
    }
}

/// Depth-aware rendering that colors parentheses by nesting level.
fn to_doc_with_depth(e: &Expr, depth: u8) -> RcDoc<'static, Style> {
    match e {
        Expr::Constant(v) => literal(v),
        Expr::Root(r) => RcDoc::as_string(format!("${}", r.index)).annotate(Style::Ident),
        Expr::Field(f) => RcDoc::as_string(format!("e{}", f.column))
            .annotate(Style::Ident)
            .append(punct("."))
            .append(RcDoc::as_string(f.ty.property_name()).annotate(Style::Ident)),
        Expr::Binary { op: bin, lhs, rhs } => {
            let prec = precedence(e);
            operand_doc(lhs, prec, false, depth)
                .append(RcDoc::space())
                .append(op(bin.symbol()))
                .append(RcDoc::line())
                .append(operand_doc(rhs, prec, true, depth))
                .group()
                .nest(2)
        }
        Expr::Unary { op: un, inner } => {
            let prec = precedence(e);
            match un {
                UnaryOp::Not => {
                    // Bitwise complement on integers, logical negation otherwise
                    let symbol = if matches!(inner.value_type(), Ok(crate::types::ValueType::Int)) {
                        "~"
                    } else {
                        "!"
                    };
                    op(symbol).append(operand_doc(inner, prec, true, depth))
                }
                UnaryOp::Negate => op("-").append(operand_doc(inner, prec, true, depth)),
                UnaryOp::IsNull | UnaryOp::IsNotNull => {
                    let symbol = if matches!(un, UnaryOp::IsNull) { "==" } else { "!=" };
                    operand_doc(inner, prec, true, depth)
                        .append(RcDoc::space())
                        .append(op(symbol))
                        .append(RcDoc::space())
                        .append(styled(Style::Keyword, "null"))
                        .group()
                }
                UnaryOp::Convert(to) => lparen(depth)
                    .append(RcDoc::as_string(to.to_string()).annotate(Style::Keyword))
                    .append(rparen(depth))
                    .append(operand_doc(inner, prec, true, depth)),
            }
        }
        Expr::Call { function, args } => {
            let args = RcDoc::intersperse(
                args.iter().map(|a| to_doc_with_depth(a, depth + 1)),
                punct(",").append(RcDoc::line()),
            );
            styled(Style::Function, function.name())
                .append(lparen(depth))
                .append(args.nest(2))
                .append(rparen(depth))
                .group()
        }
    }
}

// A writer that maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

fn render_to<W: WriteColor + Write>(
    doc: &RcDoc<'_, Style>,
    width: usize,
    out: &mut W,
) -> std::io::Result<()> {
    let mut cw = ColorWriter { out };
    doc.render_raw(width, &mut cw)
}

fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Pretty-printing conveniences for expression trees.
pub trait PrettyExpr {
    /// Build an RcDoc representation of this expression with style annotations.
    fn pretty_doc(&self) -> RcDoc<'static, Style>;

    /// Render this expression with colors to any termcolor writer at the given width.
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()>;

    /// Print this expression to stdout with colors (TTY-aware), at auto-detected width.
    fn pretty_print(&self) -> io::Result<()>;

    /// Format this expression into a plain string (no colors) at the given width.
    fn pretty_string(&self, width: usize) -> String;
}

impl PrettyExpr for Expr {
    #[inline]
    fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(self, 0)
    }

    #[inline]
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        render_to(&self.pretty_doc(), width, out)
    }

    fn pretty_print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.pretty_render_to(terminal_width(), &mut stdout)
    }

    fn pretty_string(&self, width: usize) -> String {
        let mut buf = String::new();
        let _ = self.pretty_doc().render_fmt(width, &mut buf);
        buf
    }
}
