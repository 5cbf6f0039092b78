use std::fmt::{Display, Formatter};

use serde::Serialize;

/// A chat message component, serialized to the JSON shape the client expects.
/// Style fields are only emitted when explicitly set so that unset options
/// inherit from the parent component.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct Msg {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    italic: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extra: Vec<Msg>,
}

impl Msg {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub(crate) fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub(crate) fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    pub(crate) fn append(mut self, text: impl Into<String>) -> Self {
        self.extra.push(Msg::new(text));
        self
    }
}

// The plain text without any formatting, for log lines.
impl Display for Msg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)?;
        for extra in &self.extra {
            write!(f, "{}", extra)?;
        }
        Ok(())
    }
}

// the full vanilla palette, whether or not the server sends every color
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Color {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}
