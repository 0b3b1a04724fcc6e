//! Template language for email subjects and bodies
//!
//! Supports:
//! - Field interpolation: `${requester}`
//! - Comparisons: `${a == b}`, `${a < b}` (string equality ignores case)
//! - Ternary conditionals: `${cond ? then : else}`
//! - Null coalesce: `${a ?? b ?? 'default'}`
//! - Format specifiers: `${quantity:,.2f}`, `${due_date:date}`

mod ast;
mod eval;
mod parser;

pub use ast::{CompareOp, FormatExpr, FormatPart, FormatSpec, FormatTemplate, FormatType};
pub use eval::{Context, RenderError, evaluate};
pub use parser::{ParseError, parse_template};
