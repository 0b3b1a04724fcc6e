//! AST types for email templates

use crate::erf::Value;

/// A parsed template: literal text interleaved with `${...}` expressions
#[derive(Debug, Clone, PartialEq)]
pub struct FormatTemplate {
    pub parts: Vec<FormatPart>,
    /// The original template string (for display/debugging)
    pub source: String,
}

impl FormatTemplate {
    pub fn new(parts: Vec<FormatPart>, source: String) -> Self {
        Self { parts, source }
    }

    /// Template with just a literal string (no expressions)
    pub fn literal(s: impl Into<String>) -> Self {
        let s = s.into();
        Self {
            parts: vec![FormatPart::Literal(s.clone())],
            source: s,
        }
    }

    /// Names of all fields referenced, in order of first appearance
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for part in &self.parts {
            if let FormatPart::Expr(expr) = part {
                collect_fields(expr, &mut names);
            }
        }
        names
    }
}

impl std::fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn collect_fields<'a>(expr: &'a FormatExpr, names: &mut Vec<&'a str>) {
    match expr {
        FormatExpr::Field(name) => {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        FormatExpr::Constant(_) => {}
        FormatExpr::Compare { left, right, .. } => {
            collect_fields(left, names);
            collect_fields(right, names);
        }
        FormatExpr::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            collect_fields(condition, names);
            collect_fields(then_expr, names);
            collect_fields(else_expr, names);
        }
        FormatExpr::Coalesce { exprs } => {
            for e in exprs {
                collect_fields(e, names);
            }
        }
        FormatExpr::Formatted { expr, .. } => collect_fields(expr, names),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormatPart {
    Literal(String),
    /// `${...}`
    Expr(FormatExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormatExpr {
    /// A context field: `requester`, `due_date`
    Field(String),
    /// `'text'`, `12`, `1.5`, `true`
    Constant(Value),
    /// `a == b`, `a < b`
    Compare {
        left: Box<FormatExpr>,
        op: CompareOp,
        right: Box<FormatExpr>,
    },
    /// `cond ? then : else`
    Ternary {
        condition: Box<FormatExpr>,
        then_expr: Box<FormatExpr>,
        else_expr: Box<FormatExpr>,
    },
    /// `a ?? b ?? 'default'`
    Coalesce { exprs: Vec<FormatExpr> },
    /// `expr:,.2f`
    Formatted {
        expr: Box<FormatExpr>,
        spec: FormatSpec,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
        }
    }
}

/// Output formatting for one expression
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatSpec {
    /// `,`
    pub thousands_sep: bool,
    /// `.2`
    pub precision: Option<u8>,
    pub format_type: FormatType,
}

impl std::fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.thousands_sep {
            write!(f, ",")?;
        }
        if let Some(prec) = self.precision {
            write!(f, ".{}", prec)?;
        }
        match self.format_type {
            FormatType::Auto => {}
            FormatType::Float => write!(f, "f")?,
            FormatType::Integer => write!(f, "d")?,
            FormatType::Date => write!(f, "date")?,
            FormatType::DateTime => write!(f, "datetime")?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatType {
    /// Infer from value type
    #[default]
    Auto,
    Float,
    Integer,
    /// YYYY-MM-DD
    Date,
    DateTime,
}
