//! Expression tree definitions.

use crate::expression::error::LOG_TARGET;
use crate::expression::{ComparisonOrder, Operator, Term};
use crate::schema::ColumnDefinition;
use crate::types::DataType;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Scalar column reference, optionally subscripted (`m[k]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnValue {
    pub col: Arc<ColumnDefinition>,
    pub sub: Option<Arc<Term>>,
}

impl ColumnValue {
    pub fn new(col: Arc<ColumnDefinition>) -> Self {
        Self { col, sub: None }
    }

    pub fn with_subscript(col: Arc<ColumnDefinition>, sub: Term) -> Self {
        Self {
            col,
            sub: Some(Arc::new(sub)),
        }
    }
}

/// Multi-column left-hand side, e.g. `(a, b, c)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnValueTuple {
    pub elements: Vec<ColumnValue>,
}

/// Logical AND over its children; children are never conjunctions themselves
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conjunction {
    children: Vec<Expression>,
}

impl Conjunction {
    /// Build a conjunction, splicing in the children of nested conjunctions
    pub fn new(children: Vec<Expression>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expression::Conjunction(c) => flat.extend(c.children),
                other => flat.push(other),
            }
        }
        Self { children: flat }
    }

    pub fn children(&self) -> &[Expression] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Expression> {
        self.children
    }
}

/// A single relational or membership test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOperator {
    /// One of `ColumnValue`, `ColumnValueTuple` or `Token`
    pub lhs: Box<Expression>,
    pub op: Operator,
    pub rhs: Arc<Term>,
    pub order: ComparisonOrder,
}

impl BinaryOperator {
    pub fn new(lhs: Expression, op: Operator, rhs: impl Into<Arc<Term>>) -> Self {
        Self {
            lhs: Box::new(lhs),
            op,
            rhs: rhs.into(),
            order: ComparisonOrder::Cql,
        }
    }

    pub fn with_order(mut self, order: ComparisonOrder) -> Self {
        self.order = order;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnresolvedIdentifier {
    pub ident: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    WriteTime,
    Ttl,
}

/// `WRITETIME(col)` or `TTL(col)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnMutationAttribute {
    pub kind: AttributeKind,
    pub column: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionName {
    pub keyspace: Option<String>,
    pub name: String,
}

impl FunctionName {
    pub fn native(name: impl Into<String>) -> Self {
        Self {
            keyspace: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.keyspace {
            Some(ks) => write!(f, "{}.{}", ks, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub func: FunctionName,
    pub args: Vec<Expression>,
}

/// Target of a cast, either resolved against the schema or still raw text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CastType {
    Resolved(DataType),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cast {
    pub arg: Box<Expression>,
    pub cast_type: CastType,
}

/// `structure.field` on a user-defined type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSelection {
    pub structure: Box<Expression>,
    pub field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindVariable {
    pub bind_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    String,
    Integer,
    Uuid,
    FloatingPoint,
    Boolean,
    Hex,
    Duration,
}

/// Literal whose type is not known until it meets a receiver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UntypedConstant {
    pub partial_type: TypeClass,
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleConstructor {
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionStyle {
    List,
    Set,
    Map,
}

/// Collection literal; map elements are `TupleConstructor`s of arity 2
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionConstructor {
    pub style: CollectionStyle,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsertypeConstructor {
    pub elements: BTreeMap<String, Expression>,
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Fully resolved boolean
    Constant(bool),
    Conjunction(Conjunction),
    BinaryOperator(BinaryOperator),
    ColumnValue(ColumnValue),
    ColumnValueTuple(ColumnValueTuple),
    /// The partition token pseudo-column
    Token,
    UnresolvedIdentifier(UnresolvedIdentifier),
    ColumnMutationAttribute(ColumnMutationAttribute),
    FunctionCall(FunctionCall),
    Cast(Cast),
    FieldSelection(FieldSelection),
    Null,
    BindVariable(BindVariable),
    UntypedConstant(UntypedConstant),
    TupleConstructor(TupleConstructor),
    CollectionConstructor(CollectionConstructor),
    UsertypeConstructor(UsertypeConstructor),
}

impl Expression {
    /// Create a column reference expression
    pub fn column(col: Arc<ColumnDefinition>) -> Self {
        Expression::ColumnValue(ColumnValue::new(col))
    }

    /// Create a multi-column reference expression
    pub fn column_tuple(cols: impl IntoIterator<Item = Arc<ColumnDefinition>>) -> Self {
        Expression::ColumnValueTuple(ColumnValueTuple {
            elements: cols.into_iter().map(ColumnValue::new).collect(),
        })
    }

    /// Create a binary operation expression
    pub fn binary(lhs: Expression, op: Operator, rhs: Term) -> Self {
        Expression::BinaryOperator(BinaryOperator::new(lhs, op, rhs))
    }

    /// Create a conjunction, flattening nested conjunctions
    pub fn conjunction(children: Vec<Expression>) -> Self {
        Expression::Conjunction(Conjunction::new(children))
    }

    pub fn unresolved(ident: impl Into<String>) -> Self {
        Expression::UnresolvedIdentifier(UnresolvedIdentifier { ident: ident.into() })
    }

    pub fn as_binary_operator(&self) -> Option<&BinaryOperator> {
        match self {
            Expression::BinaryOperator(op) => Some(op),
            _ => None,
        }
    }
}

impl From<BinaryOperator> for Expression {
    fn from(op: BinaryOperator) -> Self {
        Expression::BinaryOperator(op)
    }
}

fn explode_conjunction(e: Expression) -> Vec<Expression> {
    match e {
        Expression::Conjunction(c) => c.children,
        other => vec![other],
    }
}

/// AND two expressions into one flat conjunction
pub fn make_conjunction(a: Expression, b: Expression) -> Expression {
    let mut children = explode_conjunction(a);
    children.extend(explode_conjunction(b));
    Expression::Conjunction(Conjunction { children })
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.col.name_as_text())?;
        if let Some(sub) = &self.sub {
            write!(f, "[{}]", sub)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Expression::Conjunction(conj) => {
                f.write_str("(")?;
                write_joined(f, &conj.children, ") AND (")?;
                f.write_str(")")
            }
            Expression::BinaryOperator(opr) => write!(f, "({}) {} {}", opr.lhs, opr.op, opr.rhs),
            Expression::Token => f.write_str("TOKEN"),
            Expression::ColumnValue(col) => write!(f, "{}", col),
            Expression::ColumnValueTuple(tuple) => {
                f.write_str("(")?;
                write_joined(f, &tuple.elements, ",")?;
                f.write_str(")")
            }
            Expression::UnresolvedIdentifier(ui) => write!(f, "unresolved({})", ui.ident),
            Expression::ColumnMutationAttribute(cma) => {
                let kind = match cma.kind {
                    AttributeKind::Ttl => "TTL",
                    AttributeKind::WriteTime => "WRITETIME",
                };
                write!(f, "{}({})", kind, cma.column)
            }
            Expression::FunctionCall(fc) => {
                write!(f, "{}(", fc.func)?;
                write_joined(f, &fc.args, ", ")?;
                f.write_str(")")
            }
            Expression::Cast(c) => match &c.cast_type {
                CastType::Resolved(ty) => write!(f, "({} AS {})", c.arg, ty),
                CastType::Raw(ty) => write!(f, "({}) {}", ty, c.arg),
            },
            Expression::FieldSelection(fs) => write!(f, "({}.{})", fs.structure, fs.field),
            Expression::Null => f.write_str("null"),
            Expression::BindVariable(_) => f.write_str("?"),
            Expression::UntypedConstant(uc) => match uc.partial_type {
                TypeClass::String => write!(f, "'{}'", uc.raw_text),
                _ => f.write_str(&uc.raw_text),
            },
            Expression::TupleConstructor(tc) => {
                f.write_str("(")?;
                write_joined(f, &tc.elements, ", ")?;
                f.write_str(")")
            }
            Expression::CollectionConstructor(cc) => match cc.style {
                CollectionStyle::List => {
                    f.write_str("[")?;
                    write_joined(f, &cc.elements, ", ")?;
                    f.write_str("]")
                }
                CollectionStyle::Set => {
                    f.write_str("{")?;
                    write_joined(f, &cc.elements, ", ")?;
                    f.write_str("}")
                }
                CollectionStyle::Map => {
                    f.write_str("{")?;
                    for (i, e) in cc.elements.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        match e {
                            Expression::TupleConstructor(entry) if entry.elements.len() == 2 => {
                                write!(f, "{}:{}", entry.elements[0], entry.elements[1])?;
                            }
                            other => {
                                log::error!(
                                    target: LOG_TARGET,
                                    "map constructor element is not a tuple of arity 2: {:?}",
                                    other
                                );
                                write!(f, "<malformed map entry {:?}>", other)?;
                            }
                        }
                    }
                    f.write_str("}")
                }
            },
            Expression::UsertypeConstructor(uc) => {
                f.write_str("{")?;
                for (i, (field, value)) in uc.elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}:{}", field, value)?;
                }
                f.write_str("}")
            }
        }
    }
}
