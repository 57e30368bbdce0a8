//! Filter model - structured predicates the user attaches to a query
//!
//! The filter editor is a controlled component: the owner holds the list,
//! the editor turns user edits into [`FilterCommand`]s and hands the new
//! list back through a callback. Nothing here validates that a value's
//! shape fits its operator; that is left to the search service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, Result};

/// Comparison applied between a field and a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    Between,
    In,
}

impl FilterOperator {
    /// Every operator, in the order the editor offers them
    pub const ALL: [FilterOperator; 9] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::Contains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::Between,
        FilterOperator::In,
    ];

    /// Wire name (e.g. `EQUALS`)
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "EQUALS",
            FilterOperator::NotEquals => "NOT_EQUALS",
            FilterOperator::Contains => "CONTAINS",
            FilterOperator::StartsWith => "STARTS_WITH",
            FilterOperator::EndsWith => "ENDS_WITH",
            FilterOperator::GreaterThan => "GREATER_THAN",
            FilterOperator::LessThan => "LESS_THAN",
            FilterOperator::Between => "BETWEEN",
            FilterOperator::In => "IN",
        }
    }

    /// Human-readable label used in analytics and the editor
    pub fn label(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not equals",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "starts with",
            FilterOperator::EndsWith => "ends with",
            FilterOperator::GreaterThan => "greater than",
            FilterOperator::LessThan => "less than",
            FilterOperator::Between => "between",
            FilterOperator::In => "in",
        }
    }

    /// The value shape this operator expects
    pub fn expected_shape(&self) -> ValueShape {
        match self {
            FilterOperator::Between => ValueShape::Range,
            FilterOperator::In => ValueShape::Set,
            _ => ValueShape::Scalar,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownOperator(s.to_string()))
    }
}

/// Shape of a filter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Range,
    Set,
}

/// The right-hand side of a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    Set(Vec<String>),
    Range { start: String, end: String },
}

impl FilterValue {
    pub fn shape(&self) -> ValueShape {
        match self {
            FilterValue::Scalar(_) => ValueShape::Scalar,
            FilterValue::Range { .. } => ValueShape::Range,
            FilterValue::Set(_) => ValueShape::Set,
        }
    }

    /// Text form shown in the editor
    pub fn display_text(&self) -> String {
        match self {
            FilterValue::Scalar(s) => s.clone(),
            FilterValue::Range { start, end } => format!("{}..{}", start, end),
            FilterValue::Set(items) => items.join(","),
        }
    }
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::Scalar(String::new())
    }
}

/// One predicate: `field operator value`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// The empty row added by the editor
    pub fn blank() -> Self {
        Self::default()
    }

    /// Whether the value's shape fits the operator (advisory only)
    pub fn shape_matches(&self) -> bool {
        self.operator.expected_shape() == self.value.shape()
    }

    /// `"field operator"` form recorded by analytics
    pub fn describe(&self) -> String {
        format!("{} {}", self.field, self.operator.label())
    }

    /// Parse a `field:OPERATOR:value` expression
    ///
    /// `BETWEEN` values are written `start..end`, `IN` values are
    /// comma-separated; everything else is a scalar.
    pub fn parse(expr: &str) -> Result<Self> {
        let mut parts = expr.splitn(3, ':');
        let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CoreError::InvalidFilter(expr.to_string()));
        };
        if field.trim().is_empty() {
            return Err(CoreError::InvalidFilter(expr.to_string()));
        }

        let operator: FilterOperator = op.parse()?;
        let value = match operator.expected_shape() {
            ValueShape::Range => {
                let (start, end) = value
                    .split_once("..")
                    .ok_or_else(|| CoreError::InvalidFilter(expr.to_string()))?;
                FilterValue::Range {
                    start: start.to_string(),
                    end: end.to_string(),
                }
            }
            ValueShape::Set => FilterValue::Set(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            ValueShape::Scalar => FilterValue::Scalar(value.to_string()),
        };

        Ok(Self::new(field.trim(), operator, value))
    }
}

/// Partial update merged field-by-field into an existing filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPatch {
    pub field: Option<String>,
    pub operator: Option<FilterOperator>,
    pub value: Option<FilterValue>,
}

impl FilterPatch {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::default()
        }
    }

    pub fn operator(operator: FilterOperator) -> Self {
        Self {
            operator: Some(operator),
            ..Self::default()
        }
    }

    pub fn value(value: FilterValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// Shallow merge: only the fields present in the patch change
    pub fn apply_to(self, filter: &mut Filter) {
        if let Some(field) = self.field {
            filter.field = field;
        }
        if let Some(operator) = self.operator {
            filter.operator = operator;
        }
        if let Some(value) = self.value {
            filter.value = value;
        }
    }
}

/// Edit requests emitted by the filter editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    Add,
    Update { index: usize, patch: FilterPatch },
    Remove { index: usize },
    Clear,
}

impl FilterCommand {
    /// Produce the list that results from applying this command
    ///
    /// Returns `None` when the command targets an index that does not exist.
    pub fn apply(self, filters: &[Filter]) -> Option<Vec<Filter>> {
        let mut next = filters.to_vec();
        match self {
            FilterCommand::Add => next.push(Filter::blank()),
            FilterCommand::Update { index, patch } => {
                let filter = next.get_mut(index)?;
                patch.apply_to(filter);
            }
            FilterCommand::Remove { index } => {
                if index >= next.len() {
                    return None;
                }
                next.remove(index);
            }
            FilterCommand::Clear => next.clear(),
        }
        Some(next)
    }
}

/// One editor row as rendered
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRow {
    pub index: usize,
    pub field: String,
    pub operator: &'static str,
    pub value: String,
    pub shape_ok: bool,
}

/// Controlled filter editor
///
/// Holds no list of its own; every mutation is computed from the list the
/// owner passes in and reported through `on_change`.
pub struct FilterEditor<F>
where
    F: FnMut(Vec<Filter>),
{
    on_change: F,
}

impl<F> FilterEditor<F>
where
    F: FnMut(Vec<Filter>),
{
    pub fn new(on_change: F) -> Self {
        Self { on_change }
    }

    /// Append a blank filter
    pub fn add_filter(&mut self, filters: &[Filter]) -> bool {
        self.dispatch(filters, FilterCommand::Add)
    }

    /// Merge `patch` into the filter at `index`
    pub fn update_filter(&mut self, filters: &[Filter], index: usize, patch: FilterPatch) -> bool {
        self.dispatch(filters, FilterCommand::Update { index, patch })
    }

    /// Delete the filter at `index`
    pub fn remove_filter(&mut self, filters: &[Filter], index: usize) -> bool {
        self.dispatch(filters, FilterCommand::Remove { index })
    }

    /// Apply a command and report the new list; returns whether it changed
    pub fn dispatch(&mut self, filters: &[Filter], command: FilterCommand) -> bool {
        match command.clone().apply(filters) {
            Some(next) => {
                (self.on_change)(next);
                true
            }
            None => {
                warn!("Ignoring filter command {:?}: index out of range", command);
                false
            }
        }
    }

    /// Render rows for the given list
    pub fn render(filters: &[Filter]) -> Vec<FilterRow> {
        filters
            .iter()
            .enumerate()
            .map(|(index, f)| FilterRow {
                index,
                field: f.field.clone(),
                operator: f.operator.label(),
                value: f.value.display_text(),
                shape_ok: f.shape_matches(),
            })
            .collect()
    }
}
