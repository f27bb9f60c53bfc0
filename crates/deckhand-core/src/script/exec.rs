//! Running parsed deck script against a document context.

use async_trait::async_trait;
use tracing::debug;

use super::parse::{parse, Statement, StatementKind};
use crate::dispatch::{DispatchError, DocumentCapability, FragmentRuntime, UnitScope};
use crate::document::{DocumentContext, Pending, ShapeProps, ShapeRef};

/// The default [`FragmentRuntime`]: interprets deck script.
///
/// Statements are queued in order and flushed at every `sync` and at the end
/// of the fragment. After each flush every queued request is checked, and the
/// first failure is reported against the line that queued it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptRuntime;

impl ScriptRuntime {
    pub fn new() -> Self {
        Self
    }
}

enum Check {
    Applied(Pending<()>),
    Exists(Pending<ShapeProps>),
}

struct Queued {
    line: usize,
    check: Check,
}

#[async_trait]
impl FragmentRuntime for ScriptRuntime {
    fn name(&self) -> &str {
        "deck-script"
    }

    async fn run(
        &self,
        scope: &UnitScope<'_>,
        body: &str,
        doc: &mut DocumentContext,
    ) -> Result<(), DispatchError> {
        let program = parse(body)?;
        debug!(
            unit_key = scope.unit_key,
            statements = program.len(),
            "running deck script"
        );

        let mut queued = Vec::new();
        for statement in program {
            let Statement { line, kind } = statement;
            match kind {
                StatementKind::Set {
                    slide,
                    shape,
                    edits,
                } => {
                    let target = ShapeRef::new(scope.resolve_slide(slide)?, shape);
                    for edit in edits {
                        scope.authorize(DocumentCapability::for_edit(&edit))?;
                        let check = Check::Applied(doc.edit(target.clone(), edit));
                        queued.push(Queued { line, check });
                    }
                }
                StatementKind::Delete { slide, shape } => {
                    let target = ShapeRef::new(scope.resolve_slide(slide)?, shape);
                    scope.authorize(DocumentCapability::DeleteShapes)?;
                    let check = Check::Applied(doc.delete(target));
                    queued.push(Queued { line, check });
                }
                StatementKind::Require { slide, shape } => {
                    let target = ShapeRef::new(scope.resolve_slide(slide)?, shape);
                    scope.authorize(DocumentCapability::ReadShapes)?;
                    let check = Check::Exists(doc.read_shape(target));
                    queued.push(Queued { line, check });
                }
                StatementKind::Sync => flush(doc, &mut queued).await?,
            }
        }
        flush(doc, &mut queued).await
    }
}

async fn flush(doc: &mut DocumentContext, queued: &mut Vec<Queued>) -> Result<(), DispatchError> {
    if queued.is_empty() {
        return Ok(());
    }
    doc.sync().await?;
    for Queued { line, check } in queued.drain(..) {
        let result = match check {
            Check::Applied(pending) => doc.take(pending),
            Check::Exists(pending) => doc.take(pending).map(|_| ()),
        };
        result.map_err(|e| DispatchError::Script {
            line,
            message: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::CapabilityPolicy;
    use crate::document::{
        Deck, DocumentHost, HostError, MemoryDocument, ShapeKind, ShapeModel, SlideModel,
        TextAlign, TextProps,
    };
    use crate::geometry::Geometry;
    use std::sync::Arc;

    fn host() -> Arc<MemoryDocument> {
        let title = ShapeModel::new("t1", ShapeKind::TextBox, Geometry::new(0.0, 0.0, 100.0, 20.0))
            .with_text(TextProps {
                text: "Old".into(),
                ..TextProps::default()
            });
        let logo = ShapeModel::new("7", ShapeKind::Graphic, Geometry::new(90.0, 0.0, 10.0, 10.0));
        Arc::new(MemoryDocument::new(Deck {
            slides: vec![
                SlideModel::new("s0", vec![title, logo]),
                SlideModel::new(
                    "s1",
                    vec![ShapeModel::new(
                        "t1",
                        ShapeKind::TextBox,
                        Geometry::new(0.0, 0.0, 1.0, 1.0),
                    )],
                ),
            ],
        }))
    }

    async fn run(
        host: &Arc<MemoryDocument>,
        policy: &CapabilityPolicy,
        body: &str,
    ) -> Result<(), DispatchError> {
        let shared: Arc<dyn DocumentHost> = host.clone();
        let mut doc = DocumentContext::new(shared);
        ScriptRuntime.run(&UnitScope::new(0, policy), body, &mut doc).await
    }

    #[tokio::test]
    async fn test_edits_and_delete_apply() {
        let host = host();
        run(
            &host,
            &CapabilityPolicy::standard(),
            "shape t1 text = \"New\", bold = true, text_align = center, width = 200\ndelete shape 7",
        )
        .await
        .unwrap();

        let deck = host.deck();
        let shapes = &deck.slides[0].shapes;
        assert_eq!(shapes.len(), 1);
        let text = shapes[0].text.as_ref().unwrap();
        assert_eq!(text.text, "New");
        assert!(text.font.bold);
        assert_eq!(text.text_align, Some(TextAlign::Center));
        assert_eq!(shapes[0].width, 200.0);
        assert_eq!(host.sync_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_statement_splits_round_trips() {
        let host = host();
        run(
            &host,
            &CapabilityPolicy::standard(),
            "shape t1 left = 5; sync; shape t1 top = 6",
        )
        .await
        .unwrap();
        assert_eq!(host.sync_count(), 2);
        assert_eq!(host.deck().slides[0].shapes[0].top, 6.0);
    }

    #[tokio::test]
    async fn test_require_missing_shape_reports_line() {
        let host = host();
        let err = run(
            &host,
            &CapabilityPolicy::standard(),
            "shape t1 left = 5\nrequire shape nope",
        )
        .await
        .unwrap_err();
        match err {
            DispatchError::Script { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("nope"), "{message}");
            }
            other => panic!("expected script error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_edit_of_missing_shape_rolls_back_batch() {
        let host = host();
        let err = run(
            &host,
            &CapabilityPolicy::standard(),
            "shape t1 left = 50\nshape ghost left = 1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DispatchError::Host(HostError::SyncFailed(_))));
        assert_eq!(host.deck().slides[0].shapes[0].left, 0.0);
    }

    #[tokio::test]
    async fn test_cross_slide_needs_permission() {
        let host = host();
        let err = run(&host, &CapabilityPolicy::standard(), "slide 1 shape t1 left = 3")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::PolicyDenied { .. }));
        assert_eq!(host.sync_count(), 0);

        run(&host, &CapabilityPolicy::permissive(), "slide 1 shape t1 left = 3")
            .await
            .unwrap();
        assert_eq!(host.deck().slides[1].shapes[0].left, 3.0);
    }

    #[tokio::test]
    async fn test_parse_error_queues_nothing() {
        let host = host();
        let err = run(
            &host,
            &CapabilityPolicy::standard(),
            "shape t1 left = 5\nshape t1 left = ",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DispatchError::Script { line: 2, .. }));
        assert_eq!(host.sync_count(), 0);
    }
}
