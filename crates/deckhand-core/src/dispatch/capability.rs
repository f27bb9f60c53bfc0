//! Capabilities a code fragment may exercise on the document.

use serde::{Deserialize, Serialize};

use crate::document::ShapeEdit;

/// What kind of document access a fragment statement needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCapability {
    ReadShapes,
    EditLayout,
    EditText,
    EditStyle,
    DeleteShapes,
    /// Touching a slide other than the unit's own.
    CrossSlide,
}

impl DocumentCapability {
    pub const ALL: [DocumentCapability; 6] = [
        DocumentCapability::ReadShapes,
        DocumentCapability::EditLayout,
        DocumentCapability::EditText,
        DocumentCapability::EditStyle,
        DocumentCapability::DeleteShapes,
        DocumentCapability::CrossSlide,
    ];

    /// Capability an edit exercises.
    pub fn for_edit(edit: &ShapeEdit) -> Self {
        match edit {
            ShapeEdit::Left(_) | ShapeEdit::Top(_) | ShapeEdit::Width(_) | ShapeEdit::Height(_) => {
                DocumentCapability::EditLayout
            }
            ShapeEdit::Name(_) | ShapeEdit::AltText(_) | ShapeEdit::Text(_) => {
                DocumentCapability::EditText
            }
            ShapeEdit::FontName(_)
            | ShapeEdit::FontSize(_)
            | ShapeEdit::Bold(_)
            | ShapeEdit::Italic(_)
            | ShapeEdit::TextAlign(_) => DocumentCapability::EditStyle,
        }
    }
}

impl std::fmt::Display for DocumentCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentCapability::ReadShapes => write!(f, "read_shapes"),
            DocumentCapability::EditLayout => write!(f, "edit_layout"),
            DocumentCapability::EditText => write!(f, "edit_text"),
            DocumentCapability::EditStyle => write!(f, "edit_style"),
            DocumentCapability::DeleteShapes => write!(f, "delete_shapes"),
            DocumentCapability::CrossSlide => write!(f, "cross_slide"),
        }
    }
}
