//! Shape tree extraction.
//!
//! Walks every slide's shape hierarchy, descending into groups, and produces
//! one [`ShapeRecord`] per reachable shape in slide order, then pre-order
//! within each slide.
//!
//! Reads are batched per slide: one round trip lists the top-level shapes
//! together with their identity and geometry, one more per level of group
//! nesting lists group items, and a final one reads the text of every
//! text-bearing shape on the slide. The number of round trips therefore
//! depends on the number of slides and the nesting depth, never on the
//! number of shapes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, Instrument};

use crate::document::{
    DocumentContext, DocumentHost, FontInfo, HostResult, Pending, ShapeCollection, ShapeKind,
    ShapeProps, ShapeRef, TextAlign, TextProps,
};
use crate::geometry::{Bounds, Geometry};
use crate::metrics::METRICS;
use crate::obs;
use crate::overlap::annotate_overlaps;

/// Metadata snapshot of one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRecord {
    pub id: String,
    pub name: String,
    pub parent_group_id: Option<String>,
    #[serde(flatten)]
    pub geometry: Geometry,
    pub text: String,
    pub shape_type: ShapeKind,
    pub alt_text: String,
    /// Dotted ordinal path, e.g. `"2.0.1"`: top-level index, then child indices.
    pub z_order_path: String,
    pub is_likely_icon: bool,
    pub slide_index: usize,
    /// Ids of shapes on the same slide whose bounds intersect this one.
    #[serde(default)]
    pub overlaps_with: Vec<String>,
    pub font: FontInfo,
    pub text_align: Option<TextAlign>,
}

impl Bounds for ShapeRecord {
    fn bounds(&self) -> Geometry {
        self.geometry
    }
}

/// A shape that produced no record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedShape {
    pub slide_index: usize,
    pub z_order_path: String,
    pub shape_id: Option<String>,
    pub reason: String,
}

/// A slide whose shape collection could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideFailure {
    pub slide_index: usize,
    pub reason: String,
}

/// Everything one extraction pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub records: Vec<ShapeRecord>,
    pub skipped_shapes: Vec<SkippedShape>,
    pub failed_slides: Vec<SlideFailure>,
    pub slide_count: usize,
    pub sync_count: usize,
}

/// Extract every shape of the document.
///
/// Only a failure to load the slide collection itself is returned as an
/// error; unreadable shapes and slides are recorded in the report.
pub async fn extract_shapes(host: Arc<dyn DocumentHost>) -> HostResult<ExtractionReport> {
    let pass_id = uuid::Uuid::new_v4().to_string();
    extract_pass(host)
        .instrument(obs::pass_span("extract", &pass_id))
        .await
}

async fn extract_pass(host: Arc<dyn DocumentHost>) -> HostResult<ExtractionReport> {
    let mut ctx = DocumentContext::new(host);
    let slides = ctx.load_slides();
    ctx.sync().await?;
    let slides = ctx.take(slides)?;

    let mut report = ExtractionReport {
        slide_count: slides.len(),
        ..ExtractionReport::default()
    };
    debug!(slides = slides.len(), "extracting shape metadata");

    for slide_index in 0..slides.len() {
        SlideWalk::new(slide_index).run(&mut ctx, &mut report).await;
    }

    report.sync_count = ctx.sync_count();
    METRICS.add_shapes_extracted(report.records.len() as u64);
    obs::emit_extraction_finished(
        report.slide_count,
        report.records.len(),
        report.skipped_shapes.len(),
        report.sync_count,
    );
    Ok(report)
}

/// [`extract_shapes`] followed by overlap annotation.
pub async fn extract_snapshot(host: Arc<dyn DocumentHost>) -> HostResult<ExtractionReport> {
    let mut report = extract_shapes(host).await?;
    annotate_overlaps(&mut report.records);
    Ok(report)
}

struct Visit {
    props: ShapeProps,
    path: String,
    parent_group_id: Option<String>,
    children: Vec<usize>,
    text: Option<TextProps>,
}

impl Visit {
    fn to_record(&self, slide_index: usize) -> ShapeRecord {
        let props = &self.props;
        let text = self.text.clone().unwrap_or_default();
        ShapeRecord {
            id: props.id.clone(),
            name: props.name.clone(),
            parent_group_id: self.parent_group_id.clone(),
            geometry: props.geometry,
            text: text.text.trim().to_string(),
            shape_type: props.kind.clone(),
            alt_text: props.alt_text.clone().unwrap_or_default(),
            z_order_path: self.path.clone(),
            is_likely_icon: is_likely_icon(&props.kind, &props.name),
            slide_index,
            overlaps_with: Vec::new(),
            font: text.font,
            text_align: text.text_align,
        }
    }
}

fn is_likely_icon(kind: &ShapeKind, name: &str) -> bool {
    matches!(kind, ShapeKind::Graphic) || name.to_lowercase().contains("icon")
}

/// Per-slide traversal state. Nodes live in an arena so each nesting level
/// can be listed in one batch and the pre-order is rebuilt afterwards.
struct SlideWalk {
    slide_index: usize,
    arena: Vec<Visit>,
}

impl SlideWalk {
    fn new(slide_index: usize) -> Self {
        Self {
            slide_index,
            arena: Vec::new(),
        }
    }

    async fn run(mut self, ctx: &mut DocumentContext, report: &mut ExtractionReport) {
        let listing = ctx.load_shapes(ShapeCollection::Slide(self.slide_index));
        // A failed sync also resolves the pending listing to its error.
        let _ = ctx.sync().await;
        let items = match ctx.take(listing) {
            Ok(items) => items,
            Err(e) => {
                obs::emit_slide_failed(self.slide_index, &e);
                report.failed_slides.push(SlideFailure {
                    slide_index: self.slide_index,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let roots = self.admit(report, items, None, None);
        self.descend(ctx, report, &roots).await;
        self.read_text(ctx).await;

        for root in roots {
            self.flatten(root, &mut report.records);
        }
    }

    /// Turn listed items into arena nodes, recording unreadable ones as skipped.
    fn admit(
        &mut self,
        report: &mut ExtractionReport,
        items: Vec<HostResult<ShapeProps>>,
        parent_path: Option<&str>,
        parent_group_id: Option<&str>,
    ) -> Vec<usize> {
        let mut admitted = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            let path = match parent_path {
                Some(parent) => format!("{parent}.{position}"),
                None => position.to_string(),
            };
            match item {
                Ok(props) => {
                    self.arena.push(Visit {
                        props,
                        path,
                        parent_group_id: parent_group_id.map(str::to_string),
                        children: Vec::new(),
                        text: None,
                    });
                    admitted.push(self.arena.len() - 1);
                }
                Err(e) => self.skip(report, path, None, &e),
            }
        }
        admitted
    }

    /// List group items one nesting level per round trip.
    async fn descend(
        &mut self,
        ctx: &mut DocumentContext,
        report: &mut ExtractionReport,
        roots: &[usize],
    ) {
        let mut frontier: Vec<usize> = roots
            .iter()
            .copied()
            .filter(|&n| self.arena[n].props.kind.is_group())
            .collect();

        while !frontier.is_empty() {
            let listings: Vec<(usize, Pending<Vec<HostResult<ShapeProps>>>)> = frontier
                .iter()
                .map(|&n| {
                    let group = ShapeRef::new(self.slide_index, self.arena[n].props.id.clone());
                    (n, ctx.load_shapes(ShapeCollection::Group(group)))
                })
                .collect();
            let _ = ctx.sync().await;

            let mut next = Vec::new();
            for (group, listing) in listings {
                let path = self.arena[group].path.clone();
                let group_id = self.arena[group].props.id.clone();
                match ctx.take(listing) {
                    Ok(items) => {
                        let children = self.admit(
                            report,
                            items,
                            Some(path.as_str()),
                            Some(group_id.as_str()),
                        );
                        next.extend(
                            children
                                .iter()
                                .copied()
                                .filter(|&n| self.arena[n].props.kind.is_group()),
                        );
                        self.arena[group].children = children;
                    }
                    Err(e) => self.skip(report, format!("{path}.*"), Some(group_id), &e),
                }
            }
            frontier = next;
        }
    }

    /// Read text for every text-bearing shape in one round trip.
    ///
    /// Missing or unreadable text leaves the text fields at their defaults.
    async fn read_text(&mut self, ctx: &mut DocumentContext) {
        let reads: Vec<(usize, Pending<Option<TextProps>>)> = self
            .arena
            .iter()
            .enumerate()
            .filter(|(_, node)| node.props.kind.carries_text())
            .map(|(n, node)| {
                let shape = ShapeRef::new(self.slide_index, node.props.id.clone());
                (n, ctx.load_text(shape))
            })
            .collect();
        if let Err(e) = ctx.sync().await {
            debug!(slide_index = self.slide_index, error = %e, "text batch failed; using defaults");
        }

        for (n, read) in reads {
            match ctx.take(read) {
                Ok(text) => self.arena[n].text = text,
                Err(e) => debug!(
                    slide_index = self.slide_index,
                    shape_id = %self.arena[n].props.id,
                    error = %e,
                    "text unavailable"
                ),
            }
        }
    }

    fn flatten(&self, node: usize, out: &mut Vec<ShapeRecord>) {
        let visit = &self.arena[node];
        out.push(visit.to_record(self.slide_index));
        for &child in &visit.children {
            self.flatten(child, out);
        }
    }

    fn skip(
        &self,
        report: &mut ExtractionReport,
        z_order_path: String,
        shape_id: Option<String>,
        error: &dyn std::fmt::Display,
    ) {
        obs::emit_shape_skipped(self.slide_index, &z_order_path, error);
        METRICS.inc_shapes_skipped();
        report.skipped_shapes.push(SkippedShape {
            slide_index: self.slide_index,
            z_order_path,
            shape_id,
            reason: error.to_string(),
        });
    }
}
