//! JSONPath subset with located results.
//!
//! Supported syntax: `$`, `.name`, `['name']`, `["name"]`, `[n]` (negative
//! indices count from the end), `[*]`, `.*`, unions (`['a','b']`, `[0,1]`),
//! recursive descent (`..name`, `..*`, `..[...]`) and filters
//! (`[?(@.in == 'query')]`, `[?(@property === 'get')]`).
//!
//! Every match carries the location of the node in the document, which is
//! what diagnostics report.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::EngineError;

/// One step of a location inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Key(key) => serializer.serialize_str(key),
            Self::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Location of a node, from the document root.
pub type NodePath = Vec<PathSegment>;

/// Follow `path` from `root`.
pub fn value_at<'a>(root: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, segment| match (node, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get(key),
        (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
        _ => None,
    })
}

/// Longest prefix of `path` that exists in `root`.
pub fn closest_existing(root: &Value, path: &[PathSegment]) -> NodePath {
    let mut node = root;
    let mut existing = Vec::with_capacity(path.len());
    for segment in path {
        let next = match (node, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
            _ => None,
        };
        match next {
            Some(child) => {
                existing.push(segment.clone());
                node = child;
            }
            None => break,
        }
    }
    existing
}

/// Render a path as an escaped JSON pointer fragment (`#/paths/~1pets/get`).
pub fn to_pointer(path: &[PathSegment]) -> String {
    let mut pointer = String::from("#");
    for segment in path {
        pointer.push('/');
        pointer.push_str(&segment.to_string().replace('~', "~0").replace('/', "~1"));
    }
    pointer
}

/// A node selected by a JSONPath query.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub path: NodePath,
    pub value: &'a Value,
}

/// A compiled JSONPath expression.
#[derive(Debug, Clone)]
pub struct JsonPath {
    source: String,
    selectors: Vec<Selector>,
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Names(Vec<String>),
    Indices(Vec<i64>),
    Wildcard,
    Filter(Filter),
    Descendant(Box<Selector>),
}

impl JsonPath {
    /// Parse a JSONPath expression. The expression must start with `$`.
    pub fn parse(source: &str) -> Result<Self, EngineError> {
        let selectors = Parser::new(source)
            .parse_path()
            .map_err(|reason| EngineError::InvalidPath {
                expression: source.to_string(),
                reason,
            })?;
        Ok(Self {
            source: source.to_string(),
            selectors,
        })
    }

    /// The expression this path was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Select every node matching the expression, in document order.
    pub fn query<'a>(&self, root: &'a Value) -> Vec<Match<'a>> {
        let mut current = vec![Match {
            path: Vec::new(),
            value: root,
        }];
        for selector in &self.selectors {
            let mut next = Vec::new();
            for node in &current {
                apply(selector, node, &mut next);
            }
            current = next;
        }
        current
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn child<'a>(parent: &Match<'a>, segment: PathSegment, value: &'a Value) -> Match<'a> {
    let mut path = parent.path.clone();
    path.push(segment);
    Match { path, value }
}

fn children<'a>(node: &Match<'a>) -> Vec<Match<'a>> {
    match node.value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| child(node, PathSegment::Key(k.clone()), v))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| child(node, PathSegment::Index(i), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn descendants_or_self<'a>(node: &Match<'a>, out: &mut Vec<Match<'a>>) {
    out.push(node.clone());
    for c in children(node) {
        descendants_or_self(&c, out);
    }
}

fn apply<'a>(selector: &Selector, node: &Match<'a>, out: &mut Vec<Match<'a>>) {
    match selector {
        Selector::Names(names) => {
            if let Value::Object(map) = node.value {
                for name in names {
                    if let Some(value) = map.get(name) {
                        out.push(child(node, PathSegment::Key(name.clone()), value));
                    }
                }
            }
        }
        Selector::Indices(indices) => {
            if let Value::Array(items) = node.value {
                for &index in indices {
                    let resolved = if index < 0 {
                        items.len() as i64 + index
                    } else {
                        index
                    };
                    if resolved >= 0 {
                        let resolved = resolved as usize;
                        if let Some(value) = items.get(resolved) {
                            out.push(child(node, PathSegment::Index(resolved), value));
                        }
                    }
                }
            }
        }
        Selector::Wildcard => out.extend(children(node)),
        Selector::Filter(filter) => {
            for c in children(node) {
                let key = c.path.last().cloned();
                if filter.matches(c.value, key.as_ref()) {
                    out.push(c);
                }
            }
        }
        Selector::Descendant(inner) => {
            let mut nodes = Vec::new();
            descendants_or_self(node, &mut nodes);
            for n in &nodes {
                apply(inner, n, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filter expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Or(Box<Filter>, Box<Filter>),
    And(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
    Compare(Operand, CompareOp, Operand),
    Truthy(Operand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// `@` followed by accessors.
    Current(Vec<PathSegment>),
    /// `@property`: the key or index of the current node.
    Property,
    Literal(Value),
}

impl Operand {
    fn resolve(&self, node: &Value, key: Option<&PathSegment>) -> Option<Value> {
        match self {
            Self::Current(path) => value_at(node, path).cloned(),
            Self::Property => key.map(|k| match k {
                PathSegment::Key(k) => Value::String(k.clone()),
                PathSegment::Index(i) => Value::from(*i),
            }),
            Self::Literal(value) => Some(value.clone()),
        }
    }
}

impl Filter {
    fn matches(&self, node: &Value, key: Option<&PathSegment>) -> bool {
        match self {
            Self::Or(a, b) => a.matches(node, key) || b.matches(node, key),
            Self::And(a, b) => a.matches(node, key) && b.matches(node, key),
            Self::Not(inner) => !inner.matches(node, key),
            Self::Truthy(operand) => operand
                .resolve(node, key)
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            Self::Compare(left, op, right) => {
                let left = left.resolve(node, key);
                let right = right.resolve(node, key);
                compare(left.as_ref(), *op, right.as_ref())
            }
        }
    }
}

/// Truthiness as understood by ruleset authors: `false`, `0`, `""` and `null`
/// are falsy, everything else (including empty objects and arrays) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(left: Option<&Value>, op: CompareOp, right: Option<&Value>) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        _ => {
            let ordering = match (left, right) {
                (Some(Value::Number(a)), Some(Value::Number(b))) => {
                    a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
                }
                (Some(Value::String(a)), Some(Value::String(b))) => Some(a.cmp(b)),
                _ => None,
            };
            match ordering {
                Some(ordering) => match op {
                    CompareOp::Lt => ordering.is_lt(),
                    CompareOp::Le => ordering.is_le(),
                    CompareOp::Gt => ordering.is_gt(),
                    CompareOp::Ge => ordering.is_ge(),
                    CompareOp::Eq | CompareOp::Ne => false,
                },
                None => false,
            }
        }
    }
}

fn values_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Maximum nesting of `(` and `!` inside a filter.
const MAX_FILTER_DEPTH: usize = 64;

/// Maximum number of filter nodes in one expression.
const MAX_FILTER_NODES: usize = 256;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    nodes: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.trim().chars().collect(),
            pos: 0,
            depth: 0,
            nodes: 0,
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, String>) -> Result<T, String> {
        if self.depth >= MAX_FILTER_DEPTH {
            return Err(format!(
                "filter nested deeper than {} levels",
                MAX_FILTER_DEPTH
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn node(&mut self, filter: Filter) -> Result<Filter, String> {
        self.nodes += 1;
        if self.nodes > MAX_FILTER_NODES {
            return Err(format!(
                "filter has more than {} terms",
                MAX_FILTER_NODES
            ));
        }
        Ok(filter)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let len = s.chars().count();
        if self.chars.len() >= self.pos + len
            && self.chars[self.pos..self.pos + len].iter().copied().eq(s.chars())
        {
            self.pos += len;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", c)))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &str) -> String {
        match self.peek() {
            Some(c) => format!("expected {} at position {}, found '{}'", expected, self.pos, c),
            None => format!("expected {} at end of expression", expected),
        }
    }

    fn parse_path(&mut self) -> Result<Vec<Selector>, String> {
        if !self.eat('$') {
            return Err("expression must start with '$'".into());
        }
        let mut selectors = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '.' if self.peek_at(1) == Some('.') => {
                    self.pos += 2;
                    let inner = if self.peek() == Some('[') {
                        self.parse_bracket()?
                    } else {
                        self.parse_dot_member()?
                    };
                    selectors.push(Selector::Descendant(Box::new(inner)));
                }
                '.' => {
                    self.pos += 1;
                    selectors.push(self.parse_dot_member()?);
                }
                '[' => selectors.push(self.parse_bracket()?),
                _ => return Err(self.unexpected("'.' or '['")),
            }
        }
        Ok(selectors)
    }

    fn parse_dot_member(&mut self) -> Result<Selector, String> {
        if self.eat('*') {
            return Ok(Selector::Wildcard);
        }
        let name = self.take_while(|c| c != '.' && c != '[');
        if name.is_empty() {
            return Err(self.unexpected("a member name"));
        }
        Ok(Selector::Names(vec![name]))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if pred(c)) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_bracket(&mut self) -> Result<Selector, String> {
        self.expect('[')?;
        self.skip_ws();
        let selector = if self.eat('*') {
            Selector::Wildcard
        } else if self.eat('?') {
            self.skip_ws();
            let parenthesized = self.eat('(');
            let filter = self.parse_or()?;
            self.skip_ws();
            if parenthesized {
                self.expect(')')?;
                self.skip_ws();
            }
            Selector::Filter(filter)
        } else if matches!(self.peek(), Some('\'') | Some('"')) {
            let mut names = vec![self.parse_string()?];
            self.skip_ws();
            while self.eat(',') {
                self.skip_ws();
                names.push(self.parse_string()?);
                self.skip_ws();
            }
            Selector::Names(names)
        } else {
            let mut indices = vec![self.parse_int()?];
            self.skip_ws();
            while self.eat(',') {
                self.skip_ws();
                indices.push(self.parse_int()?);
                self.skip_ws();
            }
            Selector::Indices(indices)
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(selector)
    }

    fn parse_string(&mut self) -> Result<String, String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.unexpected("a quoted string")),
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string".into()),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        None => return Err("unterminated string".into()),
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_int(&mut self) -> Result<i64, String> {
        let start = self.pos;
        self.eat('-');
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            self.pos = start;
            return Err(self.unexpected("an index, a quoted name, '*' or '?'"));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>().map_err(|e| e.to_string())
    }

    fn parse_or(&mut self) -> Result<Filter, String> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.eat_str("||") {
                let right = self.parse_and()?;
                left = self.node(Filter::Or(Box::new(left), Box::new(right)))?;
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_and(&mut self) -> Result<Filter, String> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if self.eat_str("&&") {
                let right = self.parse_unary()?;
                left = self.node(Filter::And(Box::new(left), Box::new(right)))?;
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Filter, String> {
        self.skip_ws();
        if self.peek() == Some('!') && self.peek_at(1) != Some('=') {
            self.pos += 1;
            let inner = self.nested(Self::parse_unary)?;
            return self.node(Filter::Not(Box::new(inner)));
        }
        if self.eat('(') {
            let inner = self.nested(Self::parse_or)?;
            self.skip_ws();
            self.expect(')')?;
            return Ok(inner);
        }
        let left = self.parse_operand()?;
        self.skip_ws();
        match self.parse_compare_op() {
            Some(op) => {
                self.skip_ws();
                let right = self.parse_operand()?;
                self.node(Filter::Compare(left, op, right))
            }
            None => self.node(Filter::Truthy(left)),
        }
    }

    fn parse_compare_op(&mut self) -> Option<CompareOp> {
        // Longest operators first.
        const OPS: &[(&str, CompareOp)] = &[
            ("===", CompareOp::Eq),
            ("!==", CompareOp::Ne),
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        OPS.iter()
            .find(|(text, _)| self.eat_str(text))
            .map(|(_, op)| *op)
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        self.skip_ws();
        match self.peek() {
            Some('@') => {
                self.pos += 1;
                if self.eat_str("property") {
                    return Ok(Operand::Property);
                }
                let mut accessors = Vec::new();
                loop {
                    match self.peek() {
                        Some('.') => {
                            self.pos += 1;
                            let name = self
                                .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '-'));
                            if name.is_empty() {
                                return Err(self.unexpected("a member name"));
                            }
                            accessors.push(PathSegment::Key(name));
                        }
                        Some('[') => {
                            self.pos += 1;
                            self.skip_ws();
                            if matches!(self.peek(), Some('\'') | Some('"')) {
                                accessors.push(PathSegment::Key(self.parse_string()?));
                            } else {
                                let index = self.parse_int()?;
                                let index = usize::try_from(index)
                                    .map_err(|_| "negative index in filter".to_string())?;
                                accessors.push(PathSegment::Index(index));
                            }
                            self.skip_ws();
                            self.expect(']')?;
                        }
                        _ => break,
                    }
                }
                Ok(Operand::Current(accessors))
            }
            Some('\'') | Some('"') => Ok(Operand::Literal(Value::String(self.parse_string()?))),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let text = {
                    let start = self.pos;
                    self.eat('-');
                    self.take_while(|c| c.is_ascii_digit() || c == '.');
                    self.chars[start..self.pos].iter().collect::<String>()
                };
                let number: f64 = text
                    .parse()
                    .map_err(|_| format!("invalid number literal '{}'", text))?;
                Ok(Operand::Literal(
                    serde_json::Number::from_f64(number)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                ))
            }
            _ => {
                if self.eat_str("true") {
                    Ok(Operand::Literal(Value::Bool(true)))
                } else if self.eat_str("false") {
                    Ok(Operand::Literal(Value::Bool(false)))
                } else if self.eat_str("null") {
                    Ok(Operand::Literal(Value::Null))
                } else {
                    Err(self.unexpected("'@', a literal or '('"))
                }
            }
        }
    }
}
