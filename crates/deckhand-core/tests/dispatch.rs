//! Dispatching deck script fragments against an in-memory document.

use std::collections::BTreeMap;
use std::sync::Arc;

use deckhand_core::document::TextProps;
use deckhand_core::{
    CapabilityPolicy, CodeInput, Deck, DispatchConfig, Dispatcher, Geometry, MemoryDocument,
    ScriptRuntime, ShapeKind, ShapeModel, SlideModel,
};

fn deck() -> Deck {
    let slides = (0..3)
        .map(|i| {
            SlideModel::new(
                format!("s{i}"),
                vec![
                    ShapeModel::new("title", ShapeKind::TextBox, Geometry::new(0.0, 0.0, 100.0, 20.0))
                        .with_text(TextProps {
                            text: format!("Slide {i}"),
                            ..TextProps::default()
                        }),
                    ShapeModel::new("logo", ShapeKind::Graphic, Geometry::new(90.0, 0.0, 10.0, 10.0)),
                ],
            )
        })
        .collect();
    Deck { slides }
}

fn dispatcher(host: &Arc<MemoryDocument>, config: DispatchConfig) -> Dispatcher {
    Dispatcher::new(host.clone(), Arc::new(ScriptRuntime::new()), config)
}

fn keyed(entries: &[(u32, &str)]) -> CodeInput {
    CodeInput::PerUnit(
        entries
            .iter()
            .map(|(k, v)| (*k, Some(v.to_string())))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn title_of(host: &MemoryDocument, slide: usize) -> String {
    host.deck().slides[slide].shapes[0]
        .text
        .as_ref()
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn empty_unit_between_valid_ones_is_contained() {
    let host = Arc::new(MemoryDocument::new(deck()));
    let input = keyed(&[
        (0, "shape title text = \"Intro\""),
        (1, ""),
        (2, "shape title text = \"Outro\""),
    ]);
    let result = dispatcher(&host, DispatchConfig::default())
        .dispatch(input)
        .await;

    assert!(!result.overall_succeeded);
    assert!(result.outcomes[0].succeeded);
    assert!(!result.outcomes[1].succeeded);
    assert!(result.outcomes[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("empty or too short"));
    assert!(result.outcomes[2].succeeded);

    assert_eq!(title_of(&host, 0), "Intro");
    assert_eq!(title_of(&host, 1), "Slide 1");
    assert_eq!(title_of(&host, 2), "Outro");
}

#[tokio::test]
async fn fenced_backend_output_runs() {
    let host = Arc::new(MemoryDocument::new(deck()));
    let code: CodeInput = serde_json::from_str(
        r#"{"1": "```deck\n# tidy the header\nshape title left = 10, width = 80\ndelete shape logo\n```"}"#,
    )
    .unwrap();
    let result = dispatcher(&host, DispatchConfig::default())
        .dispatch(code)
        .await;
    assert!(result.overall_succeeded, "{result:?}");

    let deck = host.deck();
    assert_eq!(deck.slides[1].shapes.len(), 1);
    assert_eq!(deck.slides[1].shapes[0].left, 10.0);
    assert_eq!(deck.slides[1].shapes[0].width, 80.0);
    assert_eq!(deck.slides[0].shapes.len(), 2);
}

#[tokio::test]
async fn failing_unit_leaves_document_and_neighbours_intact() {
    let host = Arc::new(MemoryDocument::new(deck()));
    let input = keyed(&[
        (0, "shape title left = 5"),
        (1, "shape title left = 6\nshape missing left = 1"),
        (2, "shape title left = 7"),
    ]);
    let result = dispatcher(&host, DispatchConfig::default())
        .dispatch(input)
        .await;

    assert!(!result.overall_succeeded);
    assert!(result.outcomes[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("missing"));
    let deck = host.deck();
    assert_eq!(deck.slides[0].shapes[0].left, 5.0);
    assert_eq!(deck.slides[1].shapes[0].left, 0.0);
    assert_eq!(deck.slides[2].shapes[0].left, 7.0);
}

#[tokio::test]
async fn script_errors_report_their_line() {
    let host = Arc::new(MemoryDocument::new(deck()));
    let result = dispatcher(&host, DispatchConfig::default())
        .dispatch(CodeInput::from("shape title left = 1\nshape title colour = red"))
        .await;
    let message = result.outcomes[0].error_message.as_deref().unwrap();
    assert!(message.contains("line 2"), "{message}");
    assert_eq!(host.deck().slides[0].shapes[0].left, 0.0);
}

#[tokio::test]
async fn cross_slide_edits_follow_the_policy() {
    let host = Arc::new(MemoryDocument::new(deck()));
    let code = "slide 2 shape title text = \"From zero\"";

    let denied = dispatcher(&host, DispatchConfig::default())
        .dispatch(CodeInput::from(code))
        .await;
    assert!(denied.outcomes[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("policy denied"));
    assert_eq!(title_of(&host, 2), "Slide 2");

    let permissive = DispatchConfig {
        policy: CapabilityPolicy::permissive(),
        ..DispatchConfig::default()
    };
    let allowed = dispatcher(&host, permissive)
        .dispatch(CodeInput::from(code))
        .await;
    assert!(allowed.overall_succeeded);
    assert_eq!(title_of(&host, 2), "From zero");
}

#[tokio::test]
async fn minimum_length_is_configurable() {
    let host = Arc::new(MemoryDocument::new(deck()));
    let strict = DispatchConfig {
        min_fragment_len: 100,
        ..DispatchConfig::default()
    };
    let result = dispatcher(&host, strict)
        .dispatch(CodeInput::from("shape title left = 1"))
        .await;
    assert!(!result.overall_succeeded);
    assert_eq!(host.sync_count(), 0);
}

#[tokio::test]
async fn units_never_share_a_batch() {
    let host = Arc::new(MemoryDocument::new(deck()));
    let input = keyed(&[
        (0, "shape title top = 1"),
        (1, "shape title top = 2"),
        (2, "shape title top = 3"),
    ]);
    let result = dispatcher(&host, DispatchConfig::default())
        .dispatch(input)
        .await;
    assert!(result.overall_succeeded);
    assert_eq!(host.sync_count(), 3);
}
