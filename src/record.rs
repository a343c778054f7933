use crate::error::ValueShapeError;
use crate::registry::{COMPONENTS_FIELD, ComponentColumn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open field-name → value mapping submitted with a render request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Drawable text for `field`. Absent, null and empty values yield `None`;
    /// numbers and booleans are drawn in their string form.
    pub fn text(&self, field: &str) -> Result<Option<String>, ValueShapeError> {
        scalar_text(field, self.0.get(field))
    }

    /// Strict boolean: only JSON `true`/`false` count.
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    pub fn components(&self) -> Result<Vec<ComponentRow>, ValueShapeError> {
        match self.0.get(COMPONENTS_FIELD) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(rows)) => rows
                .iter()
                .enumerate()
                .map(|(index, row)| ComponentRow::from_value(index, row))
                .collect(),
            Some(other) => Err(ValueShapeError {
                field: COMPONENTS_FIELD.to_string(),
                shape: shape_name(other),
            }),
        }
    }

    pub fn is_empty_text(&self, field: &str) -> bool {
        !matches!(self.text(field), Ok(Some(_)))
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One line of the reception components table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentRow {
    pub name: Option<String>,
    pub inventory: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
}

impl ComponentRow {
    fn from_value(index: usize, value: &Value) -> Result<Self, ValueShapeError> {
        let Value::Object(map) = value else {
            return Err(ValueShapeError {
                field: format!("{COMPONENTS_FIELD}[{index}]"),
                shape: shape_name(value),
            });
        };
        // Table cells skip every falsy value, including `false` and zero.
        let cell = |column: ComponentColumn| {
            let field = format!("{COMPONENTS_FIELD}[{index}].{}", column.key());
            match map.get(column.key()) {
                Some(value) if is_falsy(value) => Ok(None),
                value => scalar_text(&field, value),
            }
        };
        Ok(Self {
            name: cell(ComponentColumn::Name)?,
            inventory: cell(ComponentColumn::Inventory)?,
            brand: cell(ComponentColumn::Brand)?,
            model: cell(ComponentColumn::Model)?,
            serial: cell(ComponentColumn::Serial)?,
        })
    }

    pub fn cell(&self, column: ComponentColumn) -> Option<&str> {
        let value = match column {
            ComponentColumn::Name => &self.name,
            ComponentColumn::Inventory => &self.inventory,
            ComponentColumn::Brand => &self.brand,
            ComponentColumn::Model => &self.model,
            ComponentColumn::Serial => &self.serial,
        };
        value.as_deref()
    }
}

fn scalar_text(field: &str, value: Option<&Value>) -> Result<Option<String>, ValueShapeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(ValueShapeError {
            field: field.to_string(),
            shape: shape_name(other),
        }),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
