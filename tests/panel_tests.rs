use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use oai_rt_console::sdk::render::{EmbeddingView, Swatch};
use oai_rt_console::sdk::{Embedder, PanelMsg, PanelView, ToolPanel, ToolRegistry, ToolView};
use oai_rt_console::{ClientEvent, Error, ServerEvent};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver};

struct FixedEmbedder {
    delay: Duration,
    result: Result<Vec<f32>, String>,
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _input: &str) -> oai_rt_console::Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        self.result.clone().map_err(Error::MalformedResponse)
    }
}

struct Harness {
    panel: ToolPanel,
    wake: UnboundedReceiver<PanelMsg>,
    outbound: UnboundedReceiver<ClientEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_embedder(FixedEmbedder { delay: Duration::ZERO, result: Ok(vec![0.25; 1536]) })
    }

    fn with_embedder(embedder: FixedEmbedder) -> Self {
        let (out_tx, outbound) = mpsc::unbounded_channel();
        let (panel, wake) = ToolPanel::new(ToolRegistry::console(), out_tx);
        let mut panel = panel.with_embedder(Arc::new(embedder));
        panel.set_session_active(true);
        Self { panel, wake, outbound }
    }

    /// Deliver deferred work for `span` of (paused) time. Returns what was delivered.
    async fn pump(&mut self, span: Duration) -> Vec<PanelMsg> {
        let deadline = tokio::time::Instant::now() + span;
        let mut seen = Vec::new();
        loop {
            tokio::select! {
                Some(msg) = self.wake.recv() => {
                    seen.push(msg.clone());
                    self.panel.handle_message(msg);
                }
                () = tokio::time::sleep_until(deadline) => break,
            }
        }
        seen
    }

    fn sent(&mut self) -> Vec<ClientEvent> {
        let mut sent = Vec::new();
        while let Ok(event) = self.outbound.try_recv() {
            sent.push(event);
        }
        sent
    }

    fn call(&mut self, name: &str, arguments: &str) -> bool {
        self.panel.handle_event(&done_with_calls(&[(name, arguments)]))
    }

    fn body(&self) -> ToolView {
        match self.panel.render() {
            PanelView::Active { body, .. } => body,
            other => panic!("no active tool: {other:?}"),
        }
    }
}

fn done_with_calls(calls: &[(&str, &str)]) -> ServerEvent {
    let output: Vec<_> = calls
        .iter()
        .enumerate()
        .map(|(i, (name, arguments))| {
            json!({ "type": "function_call", "name": name, "call_id": format!("call_{i}"), "arguments": arguments })
        })
        .collect();
    serde_json::from_value(json!({ "type": "response.done", "response": { "output": output } })).unwrap()
}

fn session_created() -> ServerEvent {
    serde_json::from_value(json!({ "type": "session.created", "session": { "id": "sess_1" } })).unwrap()
}

#[test]
fn inactive_and_idle_views() {
    let (out_tx, _out) = mpsc::unbounded_channel();
    let (mut panel, _wake) = ToolPanel::new(ToolRegistry::console(), out_tx);
    assert_eq!(panel.render(), PanelView::Inactive);
    panel.set_session_active(true);
    assert_eq!(panel.render(), PanelView::Idle);
}

#[tokio::test]
async fn palette_renders_one_swatch_per_color() {
    let mut h = Harness::new();
    let args = json!({
        "theme": "ocean",
        "colors": ["#001f3f", "#0074D9", "#7FDBFF", "#39CCCC", "#3D9970"]
    });
    assert!(h.call("display_color_palette", &args.to_string()));
    let ToolView::Palette(view) = h.body() else { panic!("expected palette") };
    assert_eq!(view.theme, "ocean");
    assert_eq!(view.swatches.len(), 5);
    assert_eq!(view.swatches[1], Swatch { color: "#0074D9".to_string(), is_hex: true });
}

#[tokio::test]
async fn pixel_art_grid_and_legend() {
    let mut h = Harness::new();
    let pixels = vec![vec!["#FF0000"; 8]; 8];
    let args = json!({ "description": "red square", "pixels": pixels, "size": 8 });
    h.call("create_pixel_art", &args.to_string());
    let ToolView::PixelArt(view) = h.body() else { panic!("expected pixel art") };
    assert_eq!(view.cells.len(), 64);
    assert_eq!(view.columns, 8);
    assert_eq!(view.legend, vec!["#FF0000".to_string()]);
}

#[tokio::test]
async fn arrow_glyphs() {
    let mut h = Harness::new();
    for (direction, glyph) in [("up", "↑"), ("down", "↓"), ("left", "←"), ("right", "→")] {
        h.call("show_arrow", &json!({ "direction": direction }).to_string());
        let ToolView::Arrow(view) = h.body() else { panic!("expected arrow") };
        assert_eq!(view.glyph, glyph);
    }
}

#[tokio::test]
async fn malformed_arguments_render_inline() {
    let mut h = Harness::new();
    assert!(h.call("show_arrow", "{not json"));
    let ToolView::Invalid(view) = h.body() else { panic!("expected inline error") };
    assert_eq!(view.tool, "show_arrow");
    assert!(view.message.starts_with("Invalid show_arrow data"), "{}", view.message);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn empty_pixel_grid_renders_inline() {
    let mut h = Harness::new();
    h.call("create_pixel_art", r#"{"description":"void","pixels":[[]],"size":8}"#);
    let ToolView::Invalid(view) = h.body() else { panic!("expected inline error") };
    assert_eq!(view.message, "Invalid pixel data format");
}

#[tokio::test]
async fn unknown_tool_dumps_json() {
    let mut h = Harness::new();
    h.call("summon_dragon", r#"{"size":"huge"}"#);
    let ToolView::Raw(view) = h.body() else { panic!("expected raw dump") };
    assert!(view.json.contains("summon_dragon"));
}

#[tokio::test]
async fn last_function_call_wins() {
    let mut h = Harness::new();
    let event = done_with_calls(&[
        ("show_arrow", r#"{"direction":"up"}"#),
        ("show_arrow", r#"{"direction":"down"}"#),
    ]);
    assert!(h.panel.handle_event(&event));
    match h.panel.render() {
        PanelView::Active { skipped_calls, body: ToolView::Arrow(view), .. } => {
            assert_eq!(skipped_calls, 1);
            assert_eq!(view.direction, "down");
        }
        other => panic!("unexpected view: {other:?}"),
    }
    assert_eq!(h.panel.active_call().and_then(|c| c.call_id.as_deref()), Some("call_1"));
}

#[tokio::test]
async fn response_without_calls_keeps_mount() {
    let mut h = Harness::new();
    h.call("show_arrow", r#"{"direction":"left"}"#);
    let text_only: ServerEvent = serde_json::from_value(json!({
        "type": "response.done",
        "response": { "output": [
            { "type": "message", "role": "assistant", "content": [{ "type": "output_text", "text": "hi" }] }
        ]}
    }))
    .unwrap();
    assert!(!h.panel.handle_event(&text_only));
    assert!(matches!(h.body(), ToolView::Arrow(_)));
}

#[tokio::test(start_paused = true)]
async fn countdown_sends_follow_up_once() {
    let mut h = Harness::new();
    h.call("find_similar_people", r#"{"query":"AI enthusiasts"}"#);
    let ToolView::Game(view) = h.body() else { panic!("expected game") };
    assert_eq!(view.seconds_remaining, 10);
    assert_eq!(view.embedding, None);

    h.pump(Duration::from_millis(9_500)).await;
    let ToolView::Game(view) = h.body() else { panic!("expected game") };
    assert_eq!(view.seconds_remaining, 1);
    assert!(!view.finished);
    assert_eq!(view.embedding, None);
    assert!(h.sent().is_empty());

    h.pump(Duration::from_secs(1)).await;
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    let value = serde_json::to_value(&sent[0]).unwrap();
    assert_eq!(value["type"], "response.create");
    assert_eq!(value["response"]["instructions"], "Ask if they found someone matching the criteria");

    let ToolView::Game(view) = h.body() else { panic!("expected game") };
    assert!(view.finished);
    match view.embedding {
        Some(EmbeddingView::Ready { preview, dimensions }) => {
            assert_eq!(preview.len(), 20);
            assert_eq!(dimensions, 1536);
        }
        other => panic!("unexpected embedding view: {other:?}"),
    }

    h.pump(Duration::from_secs(30)).await;
    assert!(h.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unmount_stops_the_countdown() {
    let mut h = Harness::new();
    h.call("find_similar_people", r#"{"query":"IIT alumni"}"#);
    let ticks = h.pump(Duration::from_millis(3_500)).await;
    assert_eq!(ticks.iter().filter(|m| matches!(m, PanelMsg::Tick { .. })).count(), 3);

    h.call("show_arrow", r#"{"direction":"right"}"#);
    let later = h.pump(Duration::from_secs(30)).await;
    assert!(later.iter().all(|m| !matches!(m, PanelMsg::Tick { .. })), "{later:?}");
    assert!(h.sent().is_empty());
    assert!(matches!(h.body(), ToolView::Arrow(_)));
}

#[tokio::test(start_paused = true)]
async fn late_embedding_for_old_game_is_ignored() {
    let mut h = Harness::with_embedder(FixedEmbedder {
        delay: Duration::from_secs(2),
        result: Ok(vec![1.0; 4]),
    });
    h.call("find_similar_people", r#"{"query":"first"}"#);
    h.pump(Duration::from_millis(500)).await;
    h.call("find_similar_people", r#"{"query":"second"}"#);

    h.pump(Duration::from_millis(10_800)).await;
    let ToolView::Game(view) = h.body() else { panic!("expected game") };
    assert_eq!(view.query, "second");
    assert!(view.finished);
    assert!(matches!(view.embedding, Some(EmbeddingView::Ready { dimensions: 4, .. })));
    assert_eq!(h.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn embedding_failure_shows_after_time_up() {
    let mut h = Harness::with_embedder(FixedEmbedder {
        delay: Duration::ZERO,
        result: Err("no vector".to_string()),
    });
    h.call("find_similar_people", r#"{"query":"gardeners"}"#);
    h.pump(Duration::from_millis(10_500)).await;
    let view = h.panel.render();
    let text = view.to_string();
    assert!(text.contains("Time's Up!"), "{text}");
    assert!(text.contains("Failed to generate embedding"), "{text}");
}

#[tokio::test(start_paused = true)]
async fn slow_embedding_shows_loading_when_finished() {
    let mut h = Harness::with_embedder(FixedEmbedder {
        delay: Duration::from_secs(60),
        result: Ok(vec![1.0]),
    });
    h.call("find_similar_people", r#"{"query":"runners"}"#);
    h.pump(Duration::from_millis(10_500)).await;
    let ToolView::Game(view) = h.body() else { panic!("expected game") };
    assert_eq!(view.embedding, Some(EmbeddingView::Loading));
    assert!(h.panel.render().to_string().contains("Still generating embedding..."));
}

#[tokio::test(start_paused = true)]
async fn tools_registered_once_per_active_session() {
    let mut h = Harness::new();
    assert!(!h.panel.handle_event(&session_created()));
    assert!(!h.panel.handle_event(&session_created()));
    h.pump(Duration::from_millis(500)).await;
    assert!(h.sent().is_empty());

    h.pump(Duration::from_secs(5)).await;
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    let value = serde_json::to_value(&sent[0]).unwrap();
    assert_eq!(value["type"], "session.update");
    assert_eq!(value["session"]["tool_choice"], "auto");
    assert_eq!(value["session"]["tools"].as_array().map(Vec::len), Some(4));

    h.panel.handle_event(&session_created());
    h.pump(Duration::from_secs(5)).await;
    assert!(h.sent().is_empty());

    h.panel.set_session_active(false);
    h.panel.set_session_active(true);
    h.panel.handle_event(&session_created());
    h.pump(Duration::from_secs(5)).await;
    assert_eq!(h.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn registration_from_ended_session_is_dropped() {
    let mut h = Harness::new();
    h.panel.handle_event(&session_created());
    h.pump(Duration::from_millis(300)).await;
    h.panel.set_session_active(false);
    h.panel.set_session_active(true);

    // The first session's send would have fired 700ms from here.
    h.pump(Duration::from_millis(900)).await;
    assert!(h.sent().is_empty());

    h.pump(Duration::from_secs(5)).await;
    assert_eq!(h.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_created_before_activation_still_registers_tools() {
    let (out_tx, outbound) = mpsc::unbounded_channel();
    let (panel, wake) = ToolPanel::new(ToolRegistry::console(), out_tx);
    let mut h = Harness { panel, wake, outbound };

    assert!(!h.panel.handle_event(&session_created()));
    h.pump(Duration::from_secs(5)).await;
    assert!(h.sent().is_empty());

    assert!(h.panel.set_session_active(true));
    h.panel.handle_event(&session_created());
    h.pump(Duration::from_secs(30)).await;
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind(), "session.update");
}

#[tokio::test]
async fn ending_session_clears_the_mount() {
    let mut h = Harness::new();
    h.call("show_arrow", r#"{"direction":"up"}"#);
    assert!(h.panel.set_session_active(false));
    assert_eq!(h.panel.render(), PanelView::Inactive);
    h.panel.set_session_active(true);
    assert_eq!(h.panel.render(), PanelView::Idle);
    assert!(h.panel.active_call().is_none());
}
