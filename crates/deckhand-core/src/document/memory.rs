//! In-process document host backed by a serde deck model.
//!
//! Used by the CLI to work on decks stored as JSON, and by tests as a fake
//! host with round-trip counting and fault injection.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::{HostError, HostResult};
use super::host::{DocumentHost, Reply, Request};
use super::model::{
    ShapeCollection, ShapeEdit, ShapeKind, ShapeProps, ShapeRef, SlideInfo, TextProps,
};
use crate::error::Result;
use crate::geometry::Geometry;

/// A whole presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub slides: Vec<SlideModel>,
}

impl Deck {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideModel {
    pub id: String,
    /// Selected in the host UI.
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub shapes: Vec<ShapeModel>,
}

impl SlideModel {
    pub fn new(id: impl Into<String>, shapes: Vec<ShapeModel>) -> Self {
        Self {
            id: id.into(),
            selected: false,
            shapes,
        }
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeModel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextProps>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ShapeModel>,
}

impl ShapeModel {
    pub fn new(id: impl Into<String>, kind: ShapeKind, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            left: geometry.left,
            top: geometry.top,
            width: geometry.width,
            height: geometry.height,
            alt_text: None,
            text: None,
            children: Vec::new(),
        }
    }

    /// A group shape containing `children`.
    pub fn group(id: impl Into<String>, geometry: Geometry, children: Vec<ShapeModel>) -> Self {
        let mut shape = Self::new(id, ShapeKind::Group, geometry);
        shape.children = children;
        shape
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    pub fn with_text(mut self, text: TextProps) -> Self {
        self.text = Some(text);
        self
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.left, self.top, self.width, self.height)
    }

    fn props(&self) -> ShapeProps {
        ShapeProps {
            id: self.id.clone(),
            name: self.name.clone(),
            geometry: self.geometry(),
            kind: self.kind.clone(),
            alt_text: self.alt_text.clone(),
        }
    }

    fn apply(&mut self, edit: ShapeEdit) -> HostResult<()> {
        let invalid = |reason: &str| HostError::InvalidEdit {
            id: self.id.clone(),
            property: edit.property().to_string(),
            reason: reason.to_string(),
        };

        if edit.touches_text() && self.kind.is_group() {
            return Err(invalid("groups have no text frame"));
        }

        match &edit {
            ShapeEdit::Left(v) | ShapeEdit::Top(v) if !v.is_finite() => {
                return Err(invalid("position must be finite"))
            }
            ShapeEdit::Width(v) | ShapeEdit::Height(v) if !v.is_finite() || *v < 0.0 => {
                return Err(invalid("size must be a non-negative number"))
            }
            ShapeEdit::FontSize(v) if !v.is_finite() || *v <= 0.0 => {
                return Err(invalid("font size must be positive"))
            }
            _ => {}
        }

        match edit {
            ShapeEdit::Left(v) => self.left = v,
            ShapeEdit::Top(v) => self.top = v,
            ShapeEdit::Width(v) => self.width = v,
            ShapeEdit::Height(v) => self.height = v,
            ShapeEdit::Name(v) => self.name = v,
            ShapeEdit::AltText(v) => self.alt_text = Some(v),
            ShapeEdit::Text(v) => self.text.get_or_insert_with(TextProps::default).text = v,
            ShapeEdit::FontName(v) => {
                self.text.get_or_insert_with(TextProps::default).font.name = Some(v)
            }
            ShapeEdit::FontSize(v) => {
                self.text.get_or_insert_with(TextProps::default).font.size = Some(v)
            }
            ShapeEdit::Bold(v) => self.text.get_or_insert_with(TextProps::default).font.bold = v,
            ShapeEdit::Italic(v) => {
                self.text.get_or_insert_with(TextProps::default).font.italic = v
            }
            ShapeEdit::TextAlign(v) => {
                self.text.get_or_insert_with(TextProps::default).text_align = Some(v)
            }
        }
        Ok(())
    }
}

fn find_in<'a>(shapes: &'a [ShapeModel], id: &str) -> Option<&'a ShapeModel> {
    shapes
        .iter()
        .find_map(|s| if s.id == id { Some(s) } else { find_in(&s.children, id) })
}

fn find_in_mut<'a>(shapes: &'a mut [ShapeModel], id: &str) -> Option<&'a mut ShapeModel> {
    if let Some(pos) = shapes.iter().position(|s| s.id == id) {
        return Some(&mut shapes[pos]);
    }
    for shape in shapes.iter_mut() {
        if let Some(found) = find_in_mut(&mut shape.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove_in(shapes: &mut Vec<ShapeModel>, id: &str) -> bool {
    if let Some(pos) = shapes.iter().position(|s| s.id == id) {
        shapes.remove(pos);
        return true;
    }
    shapes.iter_mut().any(|s| remove_in(&mut s.children, id))
}

#[derive(Debug, Default)]
struct Faults {
    slide_collection: bool,
    unlistable_slides: HashSet<usize>,
    unlistable_groups: HashSet<(usize, String)>,
    unreadable_shapes: HashSet<(usize, String)>,
    unreadable_text: HashSet<(usize, String)>,
    next_sync: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    deck: Deck,
    faults: Faults,
}

impl State {
    fn slide(&self, index: usize) -> HostResult<&SlideModel> {
        self.deck
            .slides
            .get(index)
            .ok_or(HostError::SlideNotFound { index })
    }

    fn shape(&self, shape: &ShapeRef) -> HostResult<&ShapeModel> {
        find_in(&self.slide(shape.slide)?.shapes, &shape.id).ok_or_else(|| {
            HostError::ShapeNotFound {
                slide: shape.slide,
                id: shape.id.clone(),
            }
        })
    }

    fn shape_mut(&mut self, shape: &ShapeRef) -> HostResult<&mut ShapeModel> {
        let slide = self
            .deck
            .slides
            .get_mut(shape.slide)
            .ok_or(HostError::SlideNotFound { index: shape.slide })?;
        find_in_mut(&mut slide.shapes, &shape.id).ok_or_else(|| HostError::ShapeNotFound {
            slide: shape.slide,
            id: shape.id.clone(),
        })
    }

    fn read_items(&self, slide: usize, items: &[ShapeModel]) -> Vec<HostResult<ShapeProps>> {
        items
            .iter()
            .map(|item| {
                if self
                    .faults
                    .unreadable_shapes
                    .contains(&(slide, item.id.clone()))
                {
                    Err(HostError::ReadFailed(format!(
                        "properties of shape {} are unavailable",
                        item.id
                    )))
                } else {
                    Ok(item.props())
                }
            })
            .collect()
    }

    fn apply(&mut self, request: Request) -> HostResult<Reply> {
        match request {
            Request::LoadSlides => {
                if self.faults.slide_collection {
                    return Err(HostError::ReadFailed("slide collection unavailable".into()));
                }
                Ok(Reply::Slides(
                    self.deck
                        .slides
                        .iter()
                        .map(|s| SlideInfo { id: s.id.clone() })
                        .collect(),
                ))
            }
            Request::SelectedSlides => Ok(Reply::Slides(
                self.deck
                    .slides
                    .iter()
                    .filter(|s| s.selected)
                    .map(|s| SlideInfo { id: s.id.clone() })
                    .collect(),
            )),
            Request::LoadShapes(ShapeCollection::Slide(index)) => {
                let slide = self.slide(index)?;
                if self.faults.unlistable_slides.contains(&index) {
                    return Err(HostError::ReadFailed(format!(
                        "shape collection of slide {index} unavailable"
                    )));
                }
                Ok(Reply::Shapes(self.read_items(index, &slide.shapes)))
            }
            Request::LoadShapes(ShapeCollection::Group(group)) => {
                let shape = self.shape(&group)?;
                if !shape.kind.is_group() {
                    return Err(HostError::NotAGroup {
                        slide: group.slide,
                        id: group.id,
                    });
                }
                if self
                    .faults
                    .unlistable_groups
                    .contains(&(group.slide, group.id.clone()))
                {
                    return Err(HostError::ReadFailed(format!(
                        "items of group {} unavailable",
                        group.id
                    )));
                }
                Ok(Reply::Shapes(self.read_items(group.slide, &shape.children)))
            }
            Request::LoadText(target) => {
                let shape = self.shape(&target)?;
                if self
                    .faults
                    .unreadable_text
                    .contains(&(target.slide, target.id.clone()))
                {
                    return Err(HostError::ReadFailed(format!(
                        "text frame of shape {} unavailable",
                        target.id
                    )));
                }
                Ok(Reply::Text(shape.text.clone()))
            }
            Request::ReadShape(target) => {
                let shape = self.shape(&target)?;
                if self
                    .faults
                    .unreadable_shapes
                    .contains(&(target.slide, target.id.clone()))
                {
                    return Err(HostError::ReadFailed(format!(
                        "properties of shape {} are unavailable",
                        target.id
                    )));
                }
                Ok(Reply::Shape(shape.props()))
            }
            Request::Edit { shape, edit } => {
                self.shape_mut(&shape)?.apply(edit)?;
                Ok(Reply::Done)
            }
            Request::Delete(target) => {
                let slide = self
                    .deck
                    .slides
                    .get_mut(target.slide)
                    .ok_or(HostError::SlideNotFound {
                        index: target.slide,
                    })?;
                if remove_in(&mut slide.shapes, &target.id) {
                    Ok(Reply::Done)
                } else {
                    Err(HostError::ShapeNotFound {
                        slide: target.slide,
                        id: target.id,
                    })
                }
            }
        }
    }
}

/// A [`DocumentHost`] over an in-memory [`Deck`].
///
/// Batches that contain edits are applied atomically: if any edit or delete
/// fails, the deck is restored and the whole batch fails to synchronize.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    state: Mutex<State>,
    syncs: AtomicUsize,
}

impl MemoryDocument {
    pub fn new(deck: Deck) -> Self {
        Self {
            state: Mutex::new(State {
                deck,
                faults: Faults::default(),
            }),
            syncs: AtomicUsize::new(0),
        }
    }

    /// Load a deck from a JSON file.
    pub async fn open(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(Deck::from_json(&json)?))
    }

    /// Write the current deck to a JSON file.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = self.deck().to_json()?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Snapshot of the current deck.
    pub fn deck(&self) -> Deck {
        self.state
            .lock()
            .map(|state| state.deck.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().deck.clone())
    }

    /// Round trips served so far.
    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::Relaxed)
    }

    pub fn fail_slide_collection(&self) {
        self.with_faults(|f| f.slide_collection = true);
    }

    pub fn fail_slide_listing(&self, slide: usize) {
        self.with_faults(|f| {
            f.unlistable_slides.insert(slide);
        });
    }

    pub fn fail_group_listing(&self, slide: usize, id: &str) {
        self.with_faults(|f| {
            f.unlistable_groups.insert((slide, id.to_string()));
        });
    }

    pub fn fail_shape_read(&self, slide: usize, id: &str) {
        self.with_faults(|f| {
            f.unreadable_shapes.insert((slide, id.to_string()));
        });
    }

    pub fn fail_text_read(&self, slide: usize, id: &str) {
        self.with_faults(|f| {
            f.unreadable_text.insert((slide, id.to_string()));
        });
    }

    /// Make the next round trip fail as a whole.
    pub fn fail_next_sync(&self, reason: &str) {
        self.with_faults(|f| f.next_sync = Some(reason.to_string()));
    }

    fn with_faults(&self, update: impl FnOnce(&mut Faults)) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut state.faults);
    }

    fn lock(&self) -> HostResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| HostError::SyncFailed("document state poisoned".into()))
    }
}

#[async_trait]
impl DocumentHost for MemoryDocument {
    async fn execute(&self, batch: Vec<Request>) -> HostResult<Vec<HostResult<Reply>>> {
        self.syncs.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock()?;

        if let Some(reason) = state.faults.next_sync.take() {
            return Err(HostError::SyncFailed(reason));
        }

        let checkpoint = batch
            .iter()
            .any(Request::is_mutation)
            .then(|| state.deck.clone());

        let mut replies = Vec::with_capacity(batch.len());
        for request in batch {
            let mutation = request.is_mutation();
            let reply = state.apply(request);
            if let (true, Err(e)) = (mutation, &reply) {
                if let Some(deck) = checkpoint {
                    state.deck = deck;
                }
                return Err(HostError::SyncFailed(format!("batch rolled back: {e}")));
            }
            replies.push(reply);
        }
        Ok(replies)
    }
}
