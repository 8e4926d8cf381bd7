//! Typed SPARQL syntax and its renderer.
//!
//! Every generated query is assembled from these nodes and turned into text in
//! one place, so literal escaping, prefix compaction, whitespace and clause
//! order are identical across all query shapes. Rendering is deterministic:
//! the same tree always yields byte-identical text.

use once_cell::sync::Lazy;
use oxigraph::model::{NamedNode, NamedNodeRef};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::errors::{PrezError, Result};

/// Local names safe to write as `prefix:local` without escaping
static LOCAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("local name regex"));

/// BCP47-shaped language tag
static LANGUAGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*$").expect("language tag regex"));

const INDENT: &str = "  ";

/// Escape a string for use inside a double-quoted SPARQL literal.
///
/// Quotes, backslashes and every control character are escaped, so the
/// returned text can never terminate the literal it is embedded in.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

pub fn validate_language_tag(language: &str) -> Result<()> {
    if LANGUAGE_TAG.is_match(language) {
        Ok(())
    } else {
        Err(PrezError::InvalidLanguageTag(language.to_string()))
    }
}

/// Parse an IRI coming from a caller. Rejects anything that could break out
/// of `<...>` (whitespace, `<>"{}|^\``, backslashes) along with relative IRIs.
pub fn parse_iri(iri: &str) -> Result<NamedNode> {
    Ok(NamedNode::new(iri)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Simple(String),
    Typed { value: String, datatype: NamedNode },
    LanguageTagged { value: String, language: String },
    Integer(i64),
    Decimal(f64),
}

impl Literal {
    pub fn simple(value: impl Into<String>) -> Self {
        Literal::Simple(value.into())
    }

    pub fn typed(value: impl Into<String>, datatype: NamedNodeRef<'_>) -> Self {
        Literal::Typed {
            value: value.into(),
            datatype: datatype.into_owned(),
        }
    }

    pub fn language_tagged(value: impl Into<String>, language: &str) -> Result<Self> {
        validate_language_tag(language)?;
        Ok(Literal::LanguageTagged {
            value: value.into(),
            language: language.to_string(),
        })
    }

    /// Decimal literal; only finite values are representable
    pub fn decimal(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(PrezError::InvalidInput(format!("not a finite decimal: {}", value)));
        }
        Ok(Literal::Decimal(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(Var),
    Iri(NamedNode),
    Literal(Literal),
    /// RDF collection `( a b c )`, used by text-index property functions
    Collection(Vec<Term>),
}

impl From<Var> for Term {
    fn from(var: Var) -> Self {
        Term::Var(var)
    }
}

impl From<&Var> for Term {
    fn from(var: &Var) -> Self {
        Term::Var(var.clone())
    }
}

impl From<NamedNode> for Term {
    fn from(iri: NamedNode) -> Self {
        Term::Iri(iri)
    }
}

impl From<&NamedNode> for Term {
    fn from(iri: &NamedNode) -> Self {
        Term::Iri(iri.clone())
    }
}

impl From<NamedNodeRef<'_>> for Term {
    fn from(iri: NamedNodeRef<'_>) -> Self {
        Term::Iri(iri.into_owned())
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyPath {
    Iri(NamedNode),
    Sequence(Vec<PropertyPath>),
    Alternative(Vec<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    Inverse(Box<PropertyPath>),
}

impl PropertyPath {
    pub fn sequence<I, P>(steps: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyPath>,
    {
        PropertyPath::Sequence(steps.into_iter().map(Into::into).collect())
    }

    pub fn alternative<I, P>(choices: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyPath>,
    {
        PropertyPath::Alternative(choices.into_iter().map(Into::into).collect())
    }

    pub fn zero_or_more(path: impl Into<PropertyPath>) -> Self {
        PropertyPath::ZeroOrMore(Box::new(path.into()))
    }
}

impl From<NamedNode> for PropertyPath {
    fn from(iri: NamedNode) -> Self {
        PropertyPath::Iri(iri)
    }
}

impl From<&NamedNode> for PropertyPath {
    fn from(iri: &NamedNode) -> Self {
        PropertyPath::Iri(iri.clone())
    }
}

impl From<NamedNodeRef<'_>> for PropertyPath {
    fn from(iri: NamedNodeRef<'_>) -> Self {
        PropertyPath::Iri(iri.into_owned())
    }
}

/// Predicate position of a triple pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    Var(Var),
    Path(PropertyPath),
}

impl From<Var> for Verb {
    fn from(var: Var) -> Self {
        Verb::Var(var)
    }
}

impl From<&Var> for Verb {
    fn from(var: &Var) -> Self {
        Verb::Var(var.clone())
    }
}

impl From<PropertyPath> for Verb {
    fn from(path: PropertyPath) -> Self {
        Verb::Path(path)
    }
}

impl From<NamedNode> for Verb {
    fn from(iri: NamedNode) -> Self {
        Verb::Path(PropertyPath::Iri(iri))
    }
}

impl From<&NamedNode> for Verb {
    fn from(iri: &NamedNode) -> Self {
        Verb::Path(PropertyPath::Iri(iri.clone()))
    }
}

impl From<NamedNodeRef<'_>> for Verb {
    fn from(iri: NamedNodeRef<'_>) -> Self {
        Verb::Path(PropertyPath::Iri(iri.into_owned()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    pub subject: Term,
    pub verb: Verb,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: impl Into<Term>, verb: impl Into<Verb>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            verb: verb.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Str,
    Uri,
    Concat,
    Sha256,
    Datatype,
    Lang,
    IsBlank,
}

impl Function {
    fn keyword(self) -> &'static str {
        match self {
            Function::Str => "STR",
            Function::Uri => "URI",
            Function::Concat => "CONCAT",
            Function::Sha256 => "SHA256",
            Function::Datatype => "DATATYPE",
            Function::Lang => "LANG",
            Function::IsBlank => "ISBLANK",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Var(Var),
    Iri(NamedNode),
    Literal(Literal),
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Call(Function, Vec<Expression>),
    /// Extension function identified by IRI, e.g. `geo:sfIntersects`
    Extension(NamedNode, Vec<Expression>),
    Exists(GroupPattern),
    /// `COUNT(expr)`, or `COUNT(*)` when empty; only valid in projections
    Count(Option<Box<Expression>>),
}

impl Expression {
    pub fn var(var: &Var) -> Self {
        Expression::Var(var.clone())
    }

    pub fn literal(literal: Literal) -> Self {
        Expression::Literal(literal)
    }

    pub fn call(function: Function, args: Vec<Expression>) -> Self {
        Expression::Call(function, args)
    }

    pub fn str(arg: Expression) -> Self {
        Expression::Call(Function::Str, vec![arg])
    }

    pub fn equal(left: Expression, right: Expression) -> Self {
        Expression::Equal(Box::new(left), Box::new(right))
    }

    pub fn not_equal(left: Expression, right: Expression) -> Self {
        Expression::NotEqual(Box::new(left), Box::new(right))
    }

    pub fn count(var: &Var) -> Self {
        Expression::Count(Some(Box::new(Expression::var(var))))
    }
}

impl From<&Var> for Expression {
    fn from(var: &Var) -> Self {
        Expression::Var(var.clone())
    }
}

impl From<NamedNodeRef<'_>> for Expression {
    fn from(iri: NamedNodeRef<'_>) -> Self {
        Expression::Iri(iri.into_owned())
    }
}

impl From<&NamedNode> for Expression {
    fn from(iri: &NamedNode) -> Self {
        Expression::Iri(iri.clone())
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    pub vars: Vec<Var>,
    pub rows: Vec<Vec<Term>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    Triple(TriplePattern),
    Optional(GroupPattern),
    Filter(Expression),
    Bind(Expression, Var),
    Values(Values),
    Union(Vec<GroupPattern>),
    SubSelect(Box<SelectQuery>),
}

/// `{ ... }` group graph pattern
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupPattern {
    pub elements: Vec<PatternElement>,
}

impl GroupPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn push(&mut self, element: PatternElement) -> &mut Self {
        self.elements.push(element);
        self
    }

    pub fn triple(
        &mut self,
        subject: impl Into<Term>,
        verb: impl Into<Verb>,
        object: impl Into<Term>,
    ) -> &mut Self {
        self.push(PatternElement::Triple(TriplePattern::new(subject, verb, object)))
    }

    pub fn filter(&mut self, expression: Expression) -> &mut Self {
        self.push(PatternElement::Filter(expression))
    }

    pub fn bind(&mut self, expression: Expression, var: &Var) -> &mut Self {
        self.push(PatternElement::Bind(expression, var.clone()))
    }

    pub fn values(&mut self, values: Values) -> &mut Self {
        self.push(PatternElement::Values(values))
    }

    pub fn optional(&mut self, group: GroupPattern) -> &mut Self {
        self.push(PatternElement::Optional(group))
    }

    /// Adds the groups as alternatives. A single group is inlined, none is a no-op.
    pub fn union(&mut self, mut groups: Vec<GroupPattern>) -> &mut Self {
        match groups.len() {
            0 => self,
            1 => {
                let only = groups.remove(0);
                self.extend(only)
            }
            _ => self.push(PatternElement::Union(groups)),
        }
    }

    pub fn extend(&mut self, other: GroupPattern) -> &mut Self {
        self.elements.extend(other.elements);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderCondition {
    pub var: Var,
    pub descending: bool,
}

impl OrderCondition {
    pub fn desc(var: &Var) -> Self {
        Self {
            var: var.clone(),
            descending: true,
        }
    }

    pub fn asc(var: &Var) -> Self {
        Self {
            var: var.clone(),
            descending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolutionModifier {
    pub group_by: Vec<Var>,
    pub order_by: Vec<OrderCondition>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Var(Var),
    Expression(Expression, Var),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub distinct: bool,
    pub projection: Vec<Projection>,
    pub pattern: GroupPattern,
    pub modifier: SolutionModifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructQuery {
    pub template: Vec<TriplePattern>,
    pub pattern: GroupPattern,
    pub modifier: SolutionModifier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Construct(ConstructQuery),
    Select(SelectQuery),
}

impl Query {
    /// Render to SPARQL text. Only prefixes that are actually used are declared.
    pub fn render(&self, prefixes: &[(&str, &str)]) -> String {
        let mut renderer = Renderer::new(prefixes);
        let body = match self {
            Query::Construct(construct) => renderer.construct(construct),
            Query::Select(select) => renderer.select(select, 0),
        };
        let mut out = String::new();
        for (index, (prefix, namespace)) in prefixes.iter().enumerate() {
            if renderer.used.contains(&index) {
                let _ = writeln!(out, "PREFIX {}: <{}>", prefix, namespace);
            }
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&body);
        out.push('\n');
        out
    }
}

struct Renderer<'a> {
    prefixes: &'a [(&'a str, &'a str)],
    used: BTreeSet<usize>,
}

fn pad(depth: usize) -> String {
    INDENT.repeat(depth)
}

impl<'a> Renderer<'a> {
    fn new(prefixes: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            prefixes,
            used: BTreeSet::new(),
        }
    }

    fn iri(&mut self, iri: &NamedNode) -> String {
        for (index, (prefix, namespace)) in self.prefixes.iter().enumerate() {
            if let Some(local) = iri.as_str().strip_prefix(namespace) {
                if LOCAL_NAME.is_match(local) {
                    self.used.insert(index);
                    return format!("{}:{}", prefix, local);
                }
            }
        }
        format!("<{}>", iri.as_str())
    }

    fn literal(&mut self, literal: &Literal) -> String {
        match literal {
            Literal::Simple(value) => format!("\"{}\"", escape_literal(value)),
            Literal::Typed { value, datatype } => {
                format!("\"{}\"^^{}", escape_literal(value), self.iri(datatype))
            }
            Literal::LanguageTagged { value, language } => {
                format!("\"{}\"@{}", escape_literal(value), language)
            }
            Literal::Integer(value) => value.to_string(),
            Literal::Decimal(value) => format!("{:.3}", value),
        }
    }

    fn term(&mut self, term: &Term) -> String {
        match term {
            Term::Var(var) => format!("?{}", var.name()),
            Term::Iri(iri) => self.iri(iri),
            Term::Literal(literal) => self.literal(literal),
            Term::Collection(items) => {
                let rendered: Vec<String> = items.iter().map(|item| self.term(item)).collect();
                format!("( {} )", rendered.join(" "))
            }
        }
    }

    fn path(&mut self, path: &PropertyPath) -> String {
        match path {
            PropertyPath::Iri(iri) => self.iri(iri),
            PropertyPath::Sequence(steps) => {
                let rendered: Vec<String> = steps
                    .iter()
                    .map(|step| match step {
                        PropertyPath::Alternative(_) => format!("({})", self.path(step)),
                        _ => self.path(step),
                    })
                    .collect();
                rendered.join("/")
            }
            PropertyPath::Alternative(choices) => {
                let rendered: Vec<String> = choices.iter().map(|choice| self.path(choice)).collect();
                rendered.join("|")
            }
            PropertyPath::ZeroOrMore(inner) => format!("{}*", self.path_primary(inner)),
            PropertyPath::Inverse(inner) => format!("^{}", self.path_primary(inner)),
        }
    }

    fn path_primary(&mut self, path: &PropertyPath) -> String {
        match path {
            PropertyPath::Iri(iri) => self.iri(iri),
            _ => format!("({})", self.path(path)),
        }
    }

    fn verb(&mut self, verb: &Verb) -> String {
        match verb {
            Verb::Var(var) => format!("?{}", var.name()),
            Verb::Path(path) => self.path(path),
        }
    }

    fn triple(&mut self, triple: &TriplePattern) -> String {
        format!(
            "{} {} {} .",
            self.term(&triple.subject),
            self.verb(&triple.verb),
            self.term(&triple.object)
        )
    }

    /// Operand of `=` / `!=`
    fn operand(&mut self, expression: &Expression, depth: usize) -> String {
        match expression {
            Expression::And(_) | Expression::Or(_) | Expression::Equal(..) | Expression::NotEqual(..) => {
                format!("({})", self.expression(expression, depth))
            }
            _ => self.expression(expression, depth),
        }
    }

    /// Operand of `&&` / `||`
    fn junct(&mut self, expression: &Expression, depth: usize) -> String {
        match expression {
            Expression::And(_) | Expression::Or(_) => format!("({})", self.expression(expression, depth)),
            _ => self.expression(expression, depth),
        }
    }

    fn expression(&mut self, expression: &Expression, depth: usize) -> String {
        match expression {
            Expression::Var(var) => format!("?{}", var.name()),
            Expression::Iri(iri) => self.iri(iri),
            Expression::Literal(literal) => self.literal(literal),
            Expression::Equal(left, right) => {
                format!("{} = {}", self.operand(left, depth), self.operand(right, depth))
            }
            Expression::NotEqual(left, right) => {
                format!("{} != {}", self.operand(left, depth), self.operand(right, depth))
            }
            Expression::And(operands) => {
                let rendered: Vec<String> = operands.iter().map(|op| self.junct(op, depth)).collect();
                rendered.join(" && ")
            }
            Expression::Or(operands) => {
                let rendered: Vec<String> = operands.iter().map(|op| self.junct(op, depth)).collect();
                rendered.join(" || ")
            }
            Expression::Call(function, args) => {
                let rendered: Vec<String> = args.iter().map(|arg| self.expression(arg, depth)).collect();
                format!("{}({})", function.keyword(), rendered.join(", "))
            }
            Expression::Extension(iri, args) => {
                let name = self.iri(iri);
                let rendered: Vec<String> = args.iter().map(|arg| self.expression(arg, depth)).collect();
                format!("{}({})", name, rendered.join(", "))
            }
            Expression::Exists(group) => format!("EXISTS {}", self.group(group, depth)),
            Expression::Count(None) => "COUNT(*)".to_string(),
            Expression::Count(Some(inner)) => format!("COUNT({})", self.expression(inner, depth)),
        }
    }

    fn values(&mut self, values: &Values) -> String {
        if values.vars.len() == 1 {
            let rendered: Vec<String> = values
                .rows
                .iter()
                .filter_map(|row| row.first())
                .map(|term| self.term(term))
                .collect();
            if rendered.is_empty() {
                return format!("VALUES ?{} {{}}", values.vars[0].name());
            }
            return format!("VALUES ?{} {{ {} }}", values.vars[0].name(), rendered.join(" "));
        }
        let vars: Vec<String> = values.vars.iter().map(|v| format!("?{}", v.name())).collect();
        let rows: Vec<String> = values
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(|term| self.term(term)).collect();
                format!("({})", cells.join(" "))
            })
            .collect();
        if rows.is_empty() {
            return format!("VALUES ({}) {{}}", vars.join(" "));
        }
        format!("VALUES ({}) {{ {} }}", vars.join(" "), rows.join(" "))
    }

    /// Renders `{ ... }`; the opening brace is written at the current
    /// position, the closing brace at `depth`.
    fn group(&mut self, group: &GroupPattern, depth: usize) -> String {
        let mut out = String::from("{\n");
        if let [PatternElement::SubSelect(select)] = group.elements.as_slice() {
            out.push_str(&self.select(select, depth + 1));
            out.push('\n');
        } else {
            for element in &group.elements {
                out.push_str(&self.element(element, depth + 1));
            }
        }
        out.push_str(&pad(depth));
        out.push('}');
        out
    }

    fn element(&mut self, element: &PatternElement, depth: usize) -> String {
        let indent = pad(depth);
        match element {
            PatternElement::Triple(triple) => format!("{}{}\n", indent, self.triple(triple)),
            PatternElement::Optional(group) => {
                format!("{}OPTIONAL {}\n", indent, self.group(group, depth))
            }
            PatternElement::Filter(expression) => {
                format!("{}FILTER({})\n", indent, self.expression(expression, depth))
            }
            PatternElement::Bind(expression, var) => format!(
                "{}BIND({} AS ?{})\n",
                indent,
                self.expression(expression, depth),
                var.name()
            ),
            PatternElement::Values(values) => format!("{}{}\n", indent, self.values(values)),
            PatternElement::Union(groups) => {
                let rendered: Vec<String> = groups.iter().map(|g| self.group(g, depth)).collect();
                format!("{}{}\n", indent, rendered.join(&format!("\n{}UNION\n{}", indent, indent)))
            }
            PatternElement::SubSelect(select) => {
                format!("{}{{\n{}\n{}}}\n", indent, self.select(select, depth + 1), indent)
            }
        }
    }

    fn modifier(&mut self, modifier: &SolutionModifier, depth: usize) -> String {
        let indent = pad(depth);
        let mut out = String::new();
        if !modifier.group_by.is_empty() {
            let vars: Vec<String> = modifier.group_by.iter().map(|v| format!("?{}", v.name())).collect();
            let _ = write!(out, "\n{}GROUP BY {}", indent, vars.join(" "));
        }
        if !modifier.order_by.is_empty() {
            let conditions: Vec<String> = modifier
                .order_by
                .iter()
                .map(|c| {
                    if c.descending {
                        format!("DESC(?{})", c.var.name())
                    } else {
                        format!("ASC(?{})", c.var.name())
                    }
                })
                .collect();
            let _ = write!(out, "\n{}ORDER BY {}", indent, conditions.join(" "));
        }
        if let Some(limit) = modifier.limit {
            let _ = write!(out, "\n{}LIMIT {}", indent, limit);
        }
        if let Some(offset) = modifier.offset {
            let _ = write!(out, "\n{}OFFSET {}", indent, offset);
        }
        out
    }

    fn select(&mut self, select: &SelectQuery, depth: usize) -> String {
        let indent = pad(depth);
        let projection: Vec<String> = select
            .projection
            .iter()
            .map(|p| match p {
                Projection::Var(var) => format!("?{}", var.name()),
                Projection::Expression(expression, var) => {
                    format!("({} AS ?{})", self.expression(expression, depth), var.name())
                }
            })
            .collect();
        let distinct = if select.distinct { "DISTINCT " } else { "" };
        let mut out = format!("{}SELECT {}{}\n", indent, distinct, projection.join(" "));
        let _ = write!(out, "{}WHERE {}", indent, self.group(&select.pattern, depth));
        out.push_str(&self.modifier(&select.modifier, depth));
        out
    }

    fn construct(&mut self, construct: &ConstructQuery) -> String {
        let mut out = String::from("CONSTRUCT {\n");
        for triple in &construct.template {
            let _ = writeln!(out, "{}{}", INDENT, self.triple(triple));
        }
        out.push_str("}\n");
        let _ = write!(out, "WHERE {}", self.group(&construct.pattern, 0));
        out.push_str(&self.modifier(&construct.modifier, 0));
        out
    }
}
