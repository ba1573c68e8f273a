//! Query compiler: lowers a tree over field accesses into a postfix stack program.
//!
//! Operands are emitted before their operator. A short-circuit operator compiles to
//!
//! ```text
//!     <lhs>
//!     jump-if-decided op, end
//!     <rhs>
//!     binary op
//! end:
//! ```
//!
//! so the right operand is never evaluated once the left one decides the result, exactly like
//! the reference interpreter.
use std::fmt;

use smallvec::SmallVec;

use crate::{
    error::{EvalError, EvalResult},
    expr::{BinaryOp, Expr, Function, UnaryOp},
    semantics,
    store::accessor::{Column, RowAccessor},
    types::ValueType,
    value::Value,
};

/// One instruction of a compiled program.
#[derive(Debug, Clone)]
pub enum Instr {
    Push(Value),
    Load(RowAccessor),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Call { function: Function, argc: usize },
    /// Jump to `target`, leaving the top of the stack as the result, when it decides `op`.
    JumpIfDecided { op: BinaryOp, target: usize },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Push(v) => write!(f, "push {v}"),
            Instr::Load(a) => write!(f, "load e{} : {}", a.column(), a.value_type()),
            Instr::Unary(op) => write!(f, "unary {op}"),
            Instr::Binary(op) => write!(f, "binary {op}"),
            Instr::Call { function, argc } => write!(f, "call {function}/{argc}"),
            Instr::JumpIfDecided { op, target } => write!(f, "jump-if-decided {op}, {target}"),
        }
    }
}

/// A compiled query tree.
#[derive(Debug, Clone, Default)]
pub struct Program {
    instrs: Vec<Instr>,
}

impl Program {
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Run the program on row `row` of `columns`.
    ///
    /// `stack` is scratch space; it is cleared first so it can be reused across rows.
    pub fn execute(
        &self,
        columns: &[Column],
        row: usize,
        stack: &mut Vec<Value>,
    ) -> EvalResult<Value> {
        stack.clear();
        let mut pc = 0usize;

        while let Some(instr) = self.instrs.get(pc) {
            pc += 1;
            match instr {
                Instr::Push(v) => stack.push(v.clone()),
                Instr::Load(accessor) => stack.push(accessor.read(columns, row)?),
                Instr::Unary(op) => {
                    let operand = stack.pop().ok_or(EvalError::StackUnderflow(pc - 1))?;
                    stack.push(semantics::apply_unary(*op, &operand)?);
                }
                Instr::Binary(op) => {
                    let rhs = stack.pop().ok_or(EvalError::StackUnderflow(pc - 1))?;
                    let lhs = stack.pop().ok_or(EvalError::StackUnderflow(pc - 1))?;
                    stack.push(semantics::apply_binary(*op, &lhs, &rhs)?);
                }
                Instr::Call { function, argc } => {
                    let start = stack
                        .len()
                        .checked_sub(*argc)
                        .ok_or(EvalError::StackUnderflow(pc - 1))?;
                    let args: SmallVec<[Value; 2]> = stack.drain(start..).collect();
                    stack.push(semantics::apply_function(*function, &args)?);
                }
                Instr::JumpIfDecided { op, target } => {
                    let lhs = stack.last().ok_or(EvalError::StackUnderflow(pc - 1))?;
                    if semantics::short_circuits(*op, lhs) {
                        pc = *target;
                    }
                }
            }
        }

        stack.pop().ok_or(EvalError::StackUnderflow(self.instrs.len()))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, instr) in self.instrs.iter().enumerate() {
            writeln!(f, "{pc:>4}: {instr}")?;
        }
        Ok(())
    }
}

struct Compiler<'s> {
    schema: &'s [ValueType],
    instrs: Vec<Instr>,
}

impl Compiler<'_> {
    fn emit(&mut self, expr: &Expr) -> EvalResult<()> {
        match expr {
            Expr::Constant(v) => self.instrs.push(Instr::Push(v.clone())),
            Expr::Root(root) => return Err(EvalError::UnboundRoot(root.index)),
            Expr::Field(field) => {
                let declared = *self.schema.get(field.column as usize).ok_or(
                    EvalError::ColumnOutOfRange {
                        column: field.column,
                        width: self.schema.len(),
                    },
                )?;
                if declared != field.ty {
                    return Err(EvalError::TypeMismatch {
                        context: "field access",
                        expected: field.ty,
                        found: declared,
                    });
                }
                self.instrs
                    .push(Instr::Load(RowAccessor::new(field.column, field.ty)));
            }
            Expr::Binary { op, lhs, rhs } if op.is_short_circuit() => {
                self.emit(lhs)?;
                let jump = self.instrs.len();
                self.instrs.push(Instr::JumpIfDecided {
                    op: *op,
                    target: usize::MAX,
                });
                self.emit(rhs)?;
                self.instrs.push(Instr::Binary(*op));
                let end = self.instrs.len();
                if let Instr::JumpIfDecided { target, .. } = &mut self.instrs[jump] {
                    *target = end;
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                self.emit(lhs)?;
                self.emit(rhs)?;
                self.instrs.push(Instr::Binary(*op));
            }
            Expr::Unary { op, inner } => {
                self.emit(inner)?;
                self.instrs.push(Instr::Unary(*op));
            }
            Expr::Call { function, args } => {
                for arg in args {
                    self.emit(arg)?;
                }
                self.instrs.push(Instr::Call {
                    function: *function,
                    argc: args.len(),
                });
            }
        }
        Ok(())
    }
}

/// Compile `expr` for rows of the given column types.
///
/// Fails on root placeholders and on field accesses that do not match the schema.
pub fn compile(expr: &Expr, schema: &[ValueType]) -> EvalResult<Program> {
    let mut compiler = Compiler {
        schema,
        instrs: Vec::with_capacity(expr.node_count() + 1),
    };
    compiler.emit(expr)?;
    Ok(Program {
        instrs: compiler.instrs,
    })
}
