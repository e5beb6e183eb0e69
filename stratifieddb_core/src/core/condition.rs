use std::fmt;

use super::value::Value;

/// Filter operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Equal,
    NotEqual,
    Gt,
    Ge,
    Lt,
    Le,
    Range,
    In,
    NotIn,
    Regexp,
}

impl FilterMode {
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterMode::Equal => "=",
            FilterMode::NotEqual => "!=",
            FilterMode::Gt => ">",
            FilterMode::Ge => ">=",
            FilterMode::Lt => "<",
            FilterMode::Le => "<=",
            FilterMode::Range => "between",
            FilterMode::In => "in",
            FilterMode::NotIn => "not in",
            FilterMode::Regexp => "~=",
        }
    }
}

/// A raw, user-supplied filter on one field. Values are carried as-is and
/// only coerced to the column's storage representation during compilation.
#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub mode: FilterMode,
    pub value: Option<Value>,
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub values: Vec<Value>,
    /// Set operands are already sorted in the column's native order; the
    /// compiler skips its own sort pass when set.
    pub is_sorted: bool,
}

impl Condition {
    fn scalar(field: &str, mode: FilterMode, value: Value) -> Self {
        Condition {
            field: field.to_string(),
            mode,
            value: Some(value),
            from: None,
            to: None,
            values: Vec::new(),
            is_sorted: false,
        }
    }

    pub fn equal(field: &str, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterMode::Equal, value.into())
    }

    pub fn not_equal(field: &str, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterMode::NotEqual, value.into())
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterMode::Gt, value.into())
    }

    pub fn ge(field: &str, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterMode::Ge, value.into())
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterMode::Lt, value.into())
    }

    pub fn le(field: &str, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterMode::Le, value.into())
    }

    pub fn range(field: &str, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Condition {
            field: field.to_string(),
            mode: FilterMode::Range,
            value: None,
            from: Some(from.into()),
            to: Some(to.into()),
            values: Vec::new(),
            is_sorted: false,
        }
    }

    pub fn in_set<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Condition {
            field: field.to_string(),
            mode: FilterMode::In,
            value: None,
            from: None,
            to: None,
            values: values.into_iter().map(Into::into).collect(),
            is_sorted: false,
        }
    }

    pub fn not_in_set<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let mut c = Self::in_set(field, values);
        c.mode = FilterMode::NotIn;
        c
    }

    pub fn regexp(field: &str, pattern: &str) -> Self {
        Self::scalar(field, FilterMode::Regexp, Value::Str(pattern.to_string()))
    }

    /// Marks the operand set as pre-sorted in native order.
    pub fn sorted(mut self) -> Self {
        self.is_sorted = true;
        self
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            FilterMode::Range => write!(
                f,
                "{} {} [{:?}, {:?}]",
                self.field,
                self.mode.symbol(),
                self.from,
                self.to
            ),
            FilterMode::In | FilterMode::NotIn => {
                if self.values.len() > 16 {
                    write!(f, "{} {} [{} values]", self.field, self.mode.symbol(), self.values.len())
                } else {
                    write!(f, "{} {} {:?}", self.field, self.mode.symbol(), self.values)
                }
            }
            _ => write!(f, "{} {} {:?}", self.field, self.mode.symbol(), self.value),
        }
    }
}
