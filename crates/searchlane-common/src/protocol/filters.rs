//! Filter expressions.
//!
//! A filter expression is an AND of clauses. Each clause is either a single
//! facet equality, an OR-group over several values of one facet, or a raw
//! expression supplied by the caller. The rendered form is what the service
//! accepts in the `filters` query parameter:
//!
//! ```text
//! (stars:"*" OR stars:"****") AND city:"Paris"
//! ```

use std::fmt;

/// One AND-ed member of a [`FilterExpression`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// `facet:"value"`
    Equals { facet: String, value: String },
    /// `(facet:"a" OR facet:"b")`
    AnyOf { facet: String, values: Vec<String> },
    /// Caller-supplied expression, rendered verbatim inside parentheses.
    Raw(String),
}

impl FilterClause {
    pub fn equals(facet: impl Into<String>, value: impl Into<String>) -> Self {
        FilterClause::Equals {
            facet: facet.into(),
            value: value.into(),
        }
    }

    pub fn any_of<I, S>(facet: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterClause::AnyOf {
            facet: facet.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn raw(expression: impl Into<String>) -> Self {
        FilterClause::Raw(expression.into())
    }

    /// The facet this clause constrains, if it is a structured clause.
    pub fn facet(&self) -> Option<&str> {
        match self {
            FilterClause::Equals { facet, .. } | FilterClause::AnyOf { facet, .. } => Some(facet),
            FilterClause::Raw(_) => None,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            FilterClause::Equals { .. } => false,
            FilterClause::AnyOf { values, .. } => values.is_empty(),
            FilterClause::Raw(expression) => expression.trim().is_empty(),
        }
    }

    fn render(&self, standalone: bool) -> String {
        match self {
            FilterClause::Equals { facet, value } => render_equality(facet, value),
            FilterClause::AnyOf { facet, values } if values.len() == 1 => {
                render_equality(facet, &values[0])
            }
            FilterClause::AnyOf { facet, values } => {
                let group = values
                    .iter()
                    .map(|value| render_equality(facet, value))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                format!("({})", group)
            }
            FilterClause::Raw(expression) if standalone => expression.trim().to_string(),
            FilterClause::Raw(expression) => format!("({})", expression.trim()),
        }
    }
}

fn render_equality(facet: &str, value: &str) -> String {
    format!("{}:{}", quote_facet(facet), quote(value))
}

fn quote_facet(facet: &str) -> String {
    let needs_quotes = facet
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | ':' | '(' | ')' | '\\'));
    if needs_quotes {
        quote(facet)
    } else {
        facet.to_string()
    }
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// An ordered AND of [`FilterClause`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpression {
    clauses: Vec<FilterClause>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clause, builder style. Empty clauses are dropped.
    pub fn and(mut self, clause: FilterClause) -> Self {
        self.push(clause);
        self
    }

    pub fn push(&mut self, clause: FilterClause) {
        if !clause.is_empty() {
            self.clauses.push(clause);
        }
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns `true` if any structured clause constrains `facet`.
    pub fn mentions(&self, facet: &str) -> bool {
        self.clauses.iter().any(|c| c.facet() == Some(facet))
    }

    /// Renders the expression, or `None` when there is nothing to filter on.
    pub fn render(&self) -> Option<String> {
        if self.clauses.is_empty() {
            return None;
        }
        let standalone = self.clauses.len() == 1;
        Some(
            self.clauses
                .iter()
                .map(|clause| clause.render(standalone))
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render().as_deref().unwrap_or(""))
    }
}

impl FromIterator<FilterClause> for FilterExpression {
    fn from_iter<T: IntoIterator<Item = FilterClause>>(iter: T) -> Self {
        let mut expression = FilterExpression::new();
        for clause in iter {
            expression.push(clause);
        }
        expression
    }
}
