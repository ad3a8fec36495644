//! XPath Expression Compiler
//!
//! Flattens the parsed AST into a postfix op list for the stack machine in
//! `eval`. Function names and arities are resolved here so evaluation never
//! sees an unknown call.

use super::functions::Function;
use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::error::XPathError;

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top with the nodes reached along an axis
    Navigate(Axis, NodeTest),
    /// Filter the node-set on top
    Predicate(Box<CompiledExpr>),
    /// Union the two node-sets on top
    Union,
    /// Push a number
    Number(f64),
    /// Push a string
    Literal(String),
    /// Call a function with the given number of arguments from the stack
    Call(Function, usize),
    /// Combine the two values on top
    Binary(BinaryOp),
}

impl CompiledExpr {
    /// Compile a parsed expression
    pub fn compile(expr: &Expr) -> Result<Self, XPathError> {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) -> Result<(), XPathError> {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::Literal(s) => ops.push(Op::Literal(s.clone())),
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops)?;
                Self::compile_expr(right, ops)?;
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops)?;
                Self::compile_expr(right, ops)?;
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops)?;
                Self::compile_step(step, ops)?;
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops)?;
                ops.push(Op::Predicate(Box::new(CompiledExpr::compile(pred)?)));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                Self::compile_step(step, ops)?;
            }
            Expr::Function(name, args) => {
                let function = Function::lookup(name, args.len())?;
                for arg in args {
                    Self::compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(function, args.len()));
            }
        }
        Ok(())
    }

    fn compile_step(step: &Step, ops: &mut Vec<Op>) -> Result<(), XPathError> {
        ops.push(Op::Navigate(step.axis, step.node_test.clone()));
        for pred in &step.predicates {
            ops.push(Op::Predicate(Box::new(CompiledExpr::compile(pred)?)));
        }
        Ok(())
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, XPathError> {
    let expr = super::parser::parse(xpath)?;
    CompiledExpr::compile(&expr)
}
