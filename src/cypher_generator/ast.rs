//! Typed Cypher clauses and expressions.
//!
//! Emission builds these values and renders them once at the end. User
//! values only ever enter as [`Expr::Param`]; names coming from the schema
//! are escaped when rendered.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::query_ast::sort::SortDirection;

lazy_static! {
    static ref PLAIN_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Backtick-quote a label, type, property or key unless it is a plain name.
pub fn escape_name(name: &str) -> String {
    if PLAIN_NAME.is_match(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Double-quoted string literal for schema-derived constants.
pub fn escape_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub trait ToCypher {
    fn to_cypher(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Add,
    Subtract,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Gte => ">=",
            BinaryOperator::In => "IN",
            BinaryOperator::Contains => "CONTAINS",
            BinaryOperator::StartsWith => "STARTS WITH",
            BinaryOperator::EndsWith => "ENDS WITH",
            BinaryOperator::Matches => "=~",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionItem {
    /// `.title`
    Shorthand(String),
    /// `key: expr`
    Entry(String, Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Variable(String),
    Param(String),
    Property(Box<Expr>, String),
    /// Constant taken from the schema (coalesce defaults, type names)
    Literal(Value),
    Function(&'static str, Vec<Expr>),
    Binary(Box<Expr>, BinaryOperator, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    /// `this:Movie:Film`
    HasLabels(String, Vec<String>),
    Exists(Vec<Clause>),
    Count(Vec<Clause>),
    Map(Vec<(String, Expr)>),
    MapProjection(String, Vec<ProjectionItem>),
    List(Vec<Expr>),
    /// `[x IN list WHERE filter | map]`
    ListComprehension {
        variable: String,
        list: Box<Expr>,
        filter: Option<Box<Expr>>,
        map: Option<Box<Expr>>,
    },
    /// `list[from..to]`
    Slice {
        list: Box<Expr>,
        from: Box<Expr>,
        to: Box<Expr>,
    },
    /// `CASE WHEN condition THEN value ELSE otherwise END`
    Case {
        condition: Box<Expr>,
        value: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Aggregate argument: `collect(DISTINCT x)`
    Distinct(Box<Expr>),
    Star,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn property(variable: &str, property: &str) -> Self {
        Expr::Property(Box::new(Expr::var(variable)), property.to_string())
    }

    pub fn binary(left: Expr, operator: BinaryOperator, right: Expr) -> Self {
        Expr::Binary(Box::new(left), operator, Box::new(right))
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOperator::Eq, right)
    }

    pub fn function(name: &'static str, args: Vec<Expr>) -> Self {
        Expr::Function(name, args)
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Value::Bool(value))
    }

    /// Conjunction; `None` when empty, the expression itself when alone.
    pub fn and_all(mut exprs: Vec<Expr>) -> Option<Expr> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::And(exprs)),
        }
    }

    pub fn or_all(mut exprs: Vec<Expr>) -> Option<Expr> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::Or(exprs)),
        }
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => escape_string(s),
        Value::Array(items) => format!("[{}]", items.iter().map(literal).collect::<Vec<_>>().join(", ")),
        Value::Object(map) => format!(
            "{{ {} }}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", escape_name(k), literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn render_subquery(clauses: &[Clause]) -> String {
    format!("{{\n{}\n}}", indent(&render_clauses(clauses)))
}

impl ToCypher for Expr {
    fn to_cypher(&self) -> String {
        match self {
            Expr::Variable(name) => name.clone(),
            Expr::Param(name) => format!("${}", name),
            Expr::Property(target, property) => format!("{}.{}", target.to_cypher(), escape_name(property)),
            Expr::Literal(value) => literal(value),
            Expr::Function(name, args) => format!(
                "{}({})",
                name,
                args.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(", ")
            ),
            Expr::Binary(left, operator, right) => {
                format!("{} {} {}", left.to_cypher(), operator.as_str(), right.to_cypher())
            }
            Expr::And(exprs) => format!(
                "({})",
                exprs.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(" AND ")
            ),
            Expr::Or(exprs) => format!(
                "({})",
                exprs.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(" OR ")
            ),
            Expr::Not(expr) => format!("NOT ({})", expr.to_cypher()),
            Expr::IsNull(expr) => format!("{} IS NULL", expr.to_cypher()),
            Expr::IsNotNull(expr) => format!("{} IS NOT NULL", expr.to_cypher()),
            Expr::HasLabels(variable, labels) => format!(
                "{}{}",
                variable,
                labels.iter().map(|l| format!(":{}", escape_name(l))).collect::<String>()
            ),
            Expr::Exists(clauses) => format!("EXISTS {}", render_subquery(clauses)),
            Expr::Count(clauses) => format!("COUNT {}", render_subquery(clauses)),
            Expr::Map(entries) if entries.is_empty() => "{ }".to_string(),
            Expr::Map(entries) => format!(
                "{{ {} }}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", escape_name(k), v.to_cypher()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Expr::MapProjection(variable, items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        ProjectionItem::Shorthand(property) => format!(".{}", escape_name(property)),
                        ProjectionItem::Entry(key, expr) => format!("{}: {}", escape_name(key), expr.to_cypher()),
                    })
                    .collect();
                if items.is_empty() {
                    format!("{} {{ }}", variable)
                } else {
                    format!("{} {{ {} }}", variable, items.join(", "))
                }
            }
            Expr::List(items) => format!(
                "[{}]",
                items.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(", ")
            ),
            Expr::ListComprehension {
                variable,
                list,
                filter,
                map,
            } => {
                let mut text = format!("[{} IN {}", variable, list.to_cypher());
                if let Some(filter) = filter {
                    text.push_str(&format!(" WHERE {}", filter.to_cypher()));
                }
                if let Some(map) = map {
                    text.push_str(&format!(" | {}", map.to_cypher()));
                }
                text.push(']');
                text
            }
            Expr::Slice { list, from, to } => {
                format!("{}[{}..{}]", list.to_cypher(), from.to_cypher(), to.to_cypher())
            }
            Expr::Case {
                condition,
                value,
                otherwise,
            } => format!(
                "CASE WHEN {} THEN {} ELSE {} END",
                condition.to_cypher(),
                value.to_cypher(),
                otherwise.to_cypher()
            ),
            Expr::Distinct(expr) => format!("DISTINCT {}", expr.to_cypher()),
            Expr::Star => "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDirection {
    /// `-[]->`
    Outgoing,
    /// `<-[]-`
    Incoming,
    /// `-[]-`
    Undirected,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expr)>,
}

impl NodePattern {
    pub fn new(variable: &str, labels: &[String]) -> Self {
        NodePattern {
            variable: Some(variable.to_string()),
            labels: labels.to_vec(),
            properties: Vec::new(),
        }
    }

    /// An already bound variable: `(this)`
    pub fn bound(variable: &str) -> Self {
        NodePattern {
            variable: Some(variable.to_string()),
            ..Default::default()
        }
    }
}

fn render_properties(properties: &[(String, Expr)]) -> String {
    if properties.is_empty() {
        return String::new();
    }
    format!(
        " {{ {} }}",
        properties
            .iter()
            .map(|(k, v)| format!("{}: {}", escape_name(k), v.to_cypher()))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

impl ToCypher for NodePattern {
    fn to_cypher(&self) -> String {
        format!(
            "({}{}{})",
            self.variable.as_deref().unwrap_or(""),
            self.labels.iter().map(|l| format!(":{}", escape_name(l))).collect::<String>(),
            render_properties(&self.properties)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub rel_type: String,
    pub direction: PathDirection,
    pub properties: Vec<(String, Expr)>,
}

impl ToCypher for RelationshipPattern {
    fn to_cypher(&self) -> String {
        let body = format!(
            "[{}:{}{}]",
            self.variable.as_deref().unwrap_or(""),
            escape_name(&self.rel_type),
            render_properties(&self.properties)
        );
        match self.direction {
            PathDirection::Outgoing => format!("-{}->", body),
            PathDirection::Incoming => format!("<-{}-", body),
            PathDirection::Undirected => format!("-{}-", body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub hops: Vec<(RelationshipPattern, NodePattern)>,
}

impl Pattern {
    pub fn node(start: NodePattern) -> Self {
        Pattern {
            start,
            hops: Vec::new(),
        }
    }

    pub fn hop(start: NodePattern, relationship: RelationshipPattern, end: NodePattern) -> Self {
        Pattern {
            start,
            hops: vec![(relationship, end)],
        }
    }
}

impl ToCypher for Pattern {
    fn to_cypher(&self) -> String {
        let mut text = self.start.to_cypher();
        for (relationship, node) in &self.hops {
            text.push_str(&relationship.to_cypher());
            text.push_str(&node.to_cypher());
        }
        text
    }
}

/// Items, ordering and paging of a WITH or RETURN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub distinct: bool,
    pub items: Vec<(Expr, Option<String>)>,
    pub order_by: Vec<(Expr, SortDirection)>,
    pub skip: Option<Expr>,
    pub limit: Option<Expr>,
    pub where_: Option<Expr>,
}

impl Projection {
    pub fn star() -> Self {
        Projection {
            items: vec![(Expr::Star, None)],
            ..Default::default()
        }
    }

    pub fn item(expr: Expr, alias: &str) -> Self {
        Projection {
            items: vec![(expr, Some(alias.to_string()))],
            ..Default::default()
        }
    }

    /// Carry variables into a subquery: `WITH this, var1`
    pub fn variables(variables: &[&str]) -> Self {
        Projection {
            items: variables.iter().map(|v| (Expr::var(*v), None)).collect(),
            ..Default::default()
        }
    }

    pub fn with_where(mut self, where_: Option<Expr>) -> Self {
        self.where_ = where_;
        self
    }
}

impl ToCypher for Projection {
    fn to_cypher(&self) -> String {
        let mut text = String::new();
        if self.distinct {
            text.push_str("DISTINCT ");
        }
        text.push_str(
            &self
                .items
                .iter()
                .map(|(expr, alias)| match alias {
                    Some(alias) if Expr::var(alias.as_str()) != *expr => {
                        format!("{} AS {}", expr.to_cypher(), escape_name(alias))
                    }
                    _ => expr.to_cypher(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        );
        if !self.order_by.is_empty() {
            text.push_str("\nORDER BY ");
            text.push_str(
                &self
                    .order_by
                    .iter()
                    .map(|(expr, direction)| format!("{} {}", expr.to_cypher(), direction.as_str()))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        if let Some(skip) = &self.skip {
            text.push_str(&format!("\nSKIP {}", skip.to_cypher()));
        }
        if let Some(limit) = &self.limit {
            text.push_str(&format!("\nLIMIT {}", limit.to_cypher()));
        }
        if let Some(where_) = &self.where_ {
            text.push_str(&format!("\nWHERE {}", where_.to_cypher()));
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetItem {
    Property { variable: String, property: String, value: Expr },
}

impl ToCypher for SetItem {
    fn to_cypher(&self) -> String {
        match self {
            SetItem::Property {
                variable,
                property,
                value,
            } => format!("{}.{} = {}", variable, escape_name(property), value.to_cypher()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match {
        optional: bool,
        pattern: Pattern,
        where_: Option<Expr>,
    },
    With(Projection),
    Return(Projection),
    /// `CALL { ... }`; the body starts with its own importing WITH
    Call(Vec<Clause>),
    Union(Vec<Vec<Clause>>),
    Foreach {
        variable: String,
        list: Expr,
        body: Vec<Clause>,
    },
    Unwind { expr: Expr, alias: String },
    Create(Pattern),
    Merge {
        pattern: Pattern,
        on_create: Vec<SetItem>,
    },
    Set(Vec<SetItem>),
    Delete { detach: bool, variables: Vec<String> },
    /// `CALL apoc.util.validate(...)`
    Procedure { name: &'static str, args: Vec<Expr> },
    /// An `@cypher` statement from the schema, inserted verbatim
    Statement(String),
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("    {}", line) })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_clauses(clauses: &[Clause]) -> String {
    clauses.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join("\n")
}

impl ToCypher for Clause {
    fn to_cypher(&self) -> String {
        match self {
            Clause::Match {
                optional,
                pattern,
                where_,
            } => {
                let mut text = format!(
                    "{}MATCH {}",
                    if *optional { "OPTIONAL " } else { "" },
                    pattern.to_cypher()
                );
                if let Some(where_) = where_ {
                    text.push_str(&format!("\nWHERE {}", where_.to_cypher()));
                }
                text
            }
            Clause::With(projection) => format!("WITH {}", projection.to_cypher()),
            Clause::Return(projection) => format!("RETURN {}", projection.to_cypher()),
            Clause::Call(body) => format!("CALL {}", render_subquery(body)),
            Clause::Union(branches) => branches
                .iter()
                .map(|branch| render_clauses(branch))
                .collect::<Vec<_>>()
                .join("\nUNION\n"),
            Clause::Foreach { variable, list, body } => format!(
                "FOREACH ({} IN {} | {})",
                variable,
                list.to_cypher(),
                body.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(" ")
            ),
            Clause::Unwind { expr, alias } => format!("UNWIND {} AS {}", expr.to_cypher(), alias),
            Clause::Create(pattern) => format!("CREATE {}", pattern.to_cypher()),
            Clause::Merge { pattern, on_create } => {
                let mut text = format!("MERGE {}", pattern.to_cypher());
                if !on_create.is_empty() {
                    text.push_str("\nON CREATE SET\n");
                    text.push_str(&indent(
                        &on_create.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(",\n"),
                    ));
                }
                text
            }
            Clause::Set(items) => format!(
                "SET\n{}",
                indent(&items.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(",\n"))
            ),
            Clause::Delete { detach, variables } => format!(
                "{}DELETE {}",
                if *detach { "DETACH " } else { "" },
                variables.join(", ")
            ),
            Clause::Procedure { name, args } => format!(
                "CALL {}({})",
                name,
                args.iter().map(ToCypher::to_cypher).collect::<Vec<_>>().join(", ")
            ),
            Clause::Statement(statement) => statement.trim().to_string(),
        }
    }
}
