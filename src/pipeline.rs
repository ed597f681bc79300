use crate::item::{NormalizedItem, RawItem};

/// Item fields a stage can be asked to transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Address,
    Price,
    Content,
    AdditionalInfo,
}

/// A field value moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

impl Value {
    fn into_text(self, sep: &str) -> String {
        match self {
            Value::Text(s) => s,
            Value::List(v) => v.join(sep),
        }
    }

    fn into_list(self) -> Vec<String> {
        match self {
            Value::Text(s) => vec![s],
            Value::List(v) => v,
        }
    }
}

/// One field transform of the normalization pipeline.
///
/// Stages must be total: every input yields an output, absent fields never
/// reach a stage.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, field: Field, value: Value) -> Value;
}

/// Strips leading and trailing whitespace from every string, including each
/// element of list fields.
pub struct TrimWhitespace;

impl Stage for TrimWhitespace {
    fn name(&self) -> &'static str {
        "trim-whitespace"
    }

    fn apply(&self, _field: Field, value: Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(s.trim().to_owned()),
            Value::List(v) => Value::List(v.iter().map(|s| s.trim().to_owned()).collect()),
        }
    }
}

/// Collapses the content blocks into one newline separated string.
pub struct JoinContent;

impl Stage for JoinContent {
    fn name(&self) -> &'static str {
        "join-content"
    }

    fn apply(&self, field: Field, value: Value) -> Value {
        match (field, value) {
            // Edges are trimmed so blank leading/trailing blocks don't
            // survive; otherwise a second pass would change the result.
            (Field::Content, Value::List(v)) => Value::Text(v.join("\n").trim().to_owned()),
            (_, value) => value,
        }
    }
}

/// Ordered list of stages applied field by field to every scraped item.
pub struct NormalizationPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Default for NormalizationPipeline {
    fn default() -> Self {
        Self::new()
            .with_stage(TrimWhitespace)
            .with_stage(JoinContent)
    }
}

impl NormalizationPipeline {
    /// A pipeline with no stages.
    pub fn new() -> Self {
        Self { stages: vec![] }
    }

    /// Appends a stage; it runs after every stage added before it.
    pub fn with_stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage over each present field.
    ///
    /// `content` always runs, even with no blocks, and always comes out as
    /// text: if no stage collapsed it, the blocks are joined with `\n` as
    /// they are. `JoinContent` does the join itself and also trims the edges
    /// of the joined text.
    pub fn normalize(&self, item: RawItem) -> NormalizedItem {
        let run = |field: Field, value: Option<Value>| {
            value.map(|v| self.stages.iter().fold(v, |v, stage| stage.apply(field, v)))
        };
        let list = |v: Vec<String>| if v.is_empty() { None } else { Some(Value::List(v)) };

        NormalizedItem {
            title: run(Field::Title, item.title.map(Value::Text)).map(|v| v.into_text(" ")),
            address: run(Field::Address, item.address.map(Value::Text)).map(|v| v.into_text(" ")),
            price: run(Field::Price, item.price.map(Value::Text)).map(|v| v.into_text(" ")),
            content: run(Field::Content, Some(Value::List(item.content)))
                .map(|v| v.into_text("\n"))
                .unwrap_or_default(),
            additional_info: run(Field::AdditionalInfo, list(item.additional_info))
                .map(Value::into_list)
                .unwrap_or_default(),
        }
    }
}
