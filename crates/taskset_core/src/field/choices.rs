//! Choice lists offered by accessors.

use crate::model::value::Value;

/// Fixed set of selectable values with display titles.
pub trait ChoiceProvider {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn choice_at(&self, index: usize) -> Option<&Value>;

    /// Position of `value` among the choices.
    fn index_of(&self, value: &Value) -> Option<usize>;

    fn title(&self, value: &Value) -> Option<&str>;
}

/// One entry of an [`ArrayChoices`] list.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub value: Value,
    pub title: String,
    /// Hidden choices are still resolvable but are not listed.
    pub hidden: bool,
}

/// Ordered, in-memory choice list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayChoices {
    choices: Vec<Choice>,
}

impl ArrayChoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, value: impl Into<Value>, title: impl Into<String>) -> Self {
        self.choices.push(Choice {
            value: value.into(),
            title: title.into(),
            hidden: false,
        });
        self
    }

    pub fn with_hidden(mut self, value: impl Into<Value>, title: impl Into<String>) -> Self {
        self.choices.push(Choice {
            value: value.into(),
            title: title.into(),
            hidden: true,
        });
        self
    }

    fn visible(&self) -> impl Iterator<Item = &Choice> {
        self.choices.iter().filter(|choice| !choice.hidden)
    }
}

impl ChoiceProvider for ArrayChoices {
    fn len(&self) -> usize {
        self.visible().count()
    }

    fn choice_at(&self, index: usize) -> Option<&Value> {
        self.visible().nth(index).map(|choice| &choice.value)
    }

    fn index_of(&self, value: &Value) -> Option<usize> {
        self.visible().position(|choice| choice.value == *value)
    }

    fn title(&self, value: &Value) -> Option<&str> {
        self.choices
            .iter()
            .find(|choice| choice.value == *value)
            .map(|choice| choice.title.as_str())
    }
}
