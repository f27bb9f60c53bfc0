//! Value types exchanged with a document host.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

/// Categorical shape type as reported by the host.
///
/// `Other(String)` carries any host type name this crate has no variant for.
/// Serialized as the host's type name (`"TextBox"`, `"Group"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeKind {
    TextBox,
    Placeholder,
    GeometricShape,
    Graphic,
    Group,
    Image,
    Line,
    Table,
    SmartArt,
    Chart,
    Media,
    Unsupported,
    Other(String),
}

impl ShapeKind {
    pub fn as_str(&self) -> &str {
        match self {
            ShapeKind::TextBox => "TextBox",
            ShapeKind::Placeholder => "Placeholder",
            ShapeKind::GeometricShape => "GeometricShape",
            ShapeKind::Graphic => "Graphic",
            ShapeKind::Group => "Group",
            ShapeKind::Image => "Image",
            ShapeKind::Line => "Line",
            ShapeKind::Table => "Table",
            ShapeKind::SmartArt => "SmartArt",
            ShapeKind::Chart => "Chart",
            ShapeKind::Media => "Media",
            ShapeKind::Unsupported => "Unsupported",
            ShapeKind::Other(name) => name,
        }
    }

    /// Whether a text read is worth a round trip for this kind.
    pub fn carries_text(&self) -> bool {
        matches!(self, ShapeKind::TextBox | ShapeKind::Placeholder) || self.as_str().contains("Text")
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ShapeKind::Group)
    }
}

impl From<String> for ShapeKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "TextBox" => ShapeKind::TextBox,
            "Placeholder" => ShapeKind::Placeholder,
            "GeometricShape" => ShapeKind::GeometricShape,
            "Graphic" => ShapeKind::Graphic,
            "Group" => ShapeKind::Group,
            "Image" => ShapeKind::Image,
            "Line" => ShapeKind::Line,
            "Table" => ShapeKind::Table,
            "SmartArt" => ShapeKind::SmartArt,
            "Chart" => ShapeKind::Chart,
            "Media" => ShapeKind::Media,
            "Unsupported" => ShapeKind::Unsupported,
            _ => ShapeKind::Other(name),
        }
    }
}

impl From<ShapeKind> for String {
    fn from(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paragraph alignment of a text range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
    JustifyLow,
    Distributed,
    ThaiDistributed,
}

impl FromStr for TextAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(TextAlign::Left),
            "center" | "centre" => Ok(TextAlign::Center),
            "right" => Ok(TextAlign::Right),
            "justify" => Ok(TextAlign::Justify),
            "justifylow" | "justify_low" => Ok(TextAlign::JustifyLow),
            "distributed" => Ok(TextAlign::Distributed),
            "thaidistributed" | "thai_distributed" => Ok(TextAlign::ThaiDistributed),
            other => Err(format!("unknown text alignment: {other}")),
        }
    }
}

/// Font attributes of a text range. Fields stay `None`/`false` when unresolvable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    pub name: Option<String>,
    pub size: Option<f64>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// Contents of a shape's text container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub font: FontInfo,
    #[serde(default)]
    pub text_align: Option<TextAlign>,
}

/// Identity and geometry fields of one shape, read in a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeProps {
    pub id: String,
    pub name: String,
    pub geometry: Geometry,
    pub kind: ShapeKind,
    pub alt_text: Option<String>,
}

/// A slide as seen in the slide collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideInfo {
    pub id: String,
}

/// Address of a shape: owning slide plus the host id (unique within the slide).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeRef {
    pub slide: usize,
    pub id: String,
}

impl ShapeRef {
    pub fn new(slide: usize, id: impl Into<String>) -> Self {
        Self {
            slide,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ShapeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slide {} shape {}", self.slide, self.id)
    }
}

/// An ordered child collection: a slide's top-level shapes or a group's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeCollection {
    Slide(usize),
    Group(ShapeRef),
}

/// A single property write against a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeEdit {
    Left(f64),
    Top(f64),
    Width(f64),
    Height(f64),
    Name(String),
    AltText(String),
    Text(String),
    FontName(String),
    FontSize(f64),
    Bold(bool),
    Italic(bool),
    TextAlign(TextAlign),
}

impl ShapeEdit {
    /// Property name as written in fragments and logs.
    pub fn property(&self) -> &'static str {
        match self {
            ShapeEdit::Left(_) => "left",
            ShapeEdit::Top(_) => "top",
            ShapeEdit::Width(_) => "width",
            ShapeEdit::Height(_) => "height",
            ShapeEdit::Name(_) => "name",
            ShapeEdit::AltText(_) => "alt_text",
            ShapeEdit::Text(_) => "text",
            ShapeEdit::FontName(_) => "font_name",
            ShapeEdit::FontSize(_) => "font_size",
            ShapeEdit::Bold(_) => "bold",
            ShapeEdit::Italic(_) => "italic",
            ShapeEdit::TextAlign(_) => "text_align",
        }
    }

    /// Edits that need a text container on the target shape.
    pub fn touches_text(&self) -> bool {
        matches!(
            self,
            ShapeEdit::Text(_)
                | ShapeEdit::FontName(_)
                | ShapeEdit::FontSize(_)
                | ShapeEdit::Bold(_)
                | ShapeEdit::Italic(_)
                | ShapeEdit::TextAlign(_)
        )
    }
}
