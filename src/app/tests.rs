use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use image::{DynamicImage, RgbaImage};
use tempfile::tempdir;

use crate::input::{Intent, Point, TouchEvent};
use crate::page::{Chapter, Manifest, PageDescriptor};
use crate::preload::{LoadCompletion, LoadError};
use crate::viewer::{JsonFileStore, ReadingMode, ViewerStore};

use super::{App, Message, Model, ToastLevel, update};

fn create_manifest(chapter_sizes: &[usize]) -> Manifest {
    Manifest {
        title: "Series".to_string(),
        chapters: chapter_sizes
            .iter()
            .enumerate()
            .map(|(c, &n)| Chapter {
                title: format!("Chapter {}", c + 1),
                pages: (0..n)
                    .map(|i| {
                        PageDescriptor::new(
                            format!("c{c}p{i}"),
                            u32::try_from(i + 1).unwrap(),
                            format!("/pages/c{c}/{i}.png"),
                        )
                        .with_intrinsic_size(800.0, 1200.0)
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// 80x24 terminal: 22 page rows (44 px), pages 80 px wide and 120 px tall.
fn create_test_model() -> Model {
    let mut model = Model::new(
        PathBuf::from("manifest.json"),
        create_manifest(&[20, 10]),
        0,
        (80, 24),
    );
    model.run_frame();
    model
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn press(model: Model, code: KeyCode) -> Model {
    match App::handle_key(key(code), &model) {
        Some(msg) => update(model, msg),
        None => model,
    }
}

fn tap(model: Model, column: u16, at_ms: u64) -> Model {
    let point = Point::new(f64::from(column) * super::CELL_WIDTH_PX, 160.0);
    let model = update(
        model,
        Message::Touch(TouchEvent::Start {
            touches: vec![point],
            at_ms,
        }),
    );
    update(
        model,
        Message::Touch(TouchEvent::End {
            point: Point::new(point.x + 5.0, point.y),
            at_ms: at_ms + 120,
        }),
    )
}

fn image(width: u32, height: u32) -> Arc<DynamicImage> {
    Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(width, height)))
}

#[test]
fn test_initial_frame_loads_visible_pages_first() {
    let mut model = create_test_model();
    let loads = model.take_pending_loads();
    let srcs: Vec<_> = loads.iter().map(|r| r.src.as_str()).collect();
    assert_eq!(srcs, ["/pages/c0/0.png", "/pages/c0/1.png", "/pages/c0/2.png"]);
    assert_eq!(model.cache.queued_len(), 3);
    assert!(model.take_pending_loads().is_empty());
}

#[test]
fn test_layout_matches_terminal() {
    let model = create_test_model();
    assert_eq!(model.page_rows(), 22);
    assert!((model.list.viewport_height() - 44.0).abs() < f64::EPSILON);
    assert!((model.list.total_height() - 2400.0).abs() < f64::EPSILON);
    assert_eq!(model.store.total_pages(), 20);
}

#[test]
fn test_next_page_scrolls_to_page_start() {
    let model = create_test_model();
    let mut model = update(model, Message::Intent(Intent::NextPage));
    assert_eq!(model.store.current_page(), 2);
    assert!((model.list.scroll_top() - 120.0).abs() < f64::EPSILON);
    model.run_frame();
    assert_eq!(model.store.current_page(), 2);
}

/// Ten 1600x400 pages: 20 px tall in the 44 px viewport.
fn create_wide_page_model() -> Model {
    let pages = (0..10)
        .map(|i| {
            PageDescriptor::new(format!("w{i}"), i + 1, format!("/pages/wide/{i}.png"))
                .with_intrinsic_size(1600.0, 400.0)
        })
        .collect();
    let manifest = Manifest {
        title: "Series".to_string(),
        chapters: vec![Chapter {
            title: "Spreads".to_string(),
            pages,
        }],
    };
    let mut model = Model::new(PathBuf::from("manifest.json"), manifest, 0, (80, 24));
    model.run_frame();
    model
}

#[test]
fn test_short_pages_turn_one_at_a_time() {
    let mut model = create_wide_page_model();
    let mut seen = vec![model.store.current_page()];
    for _ in 0..3 {
        model = update(model, Message::Intent(Intent::NextPage));
        model.run_frame();
        seen.push(model.store.current_page());
    }
    assert_eq!(seen, [1, 2, 3, 4]);
    assert_eq!(model.list.current_index(), Some(3));
}

#[test]
fn test_short_pages_at_strip_ends_stay_on_target() {
    let model = create_wide_page_model();
    let mut model = update(model, Message::GoToBottom);
    model.run_frame();
    assert_eq!(model.store.current_page(), 10);
    assert!((model.store.runtime().progress - 100.0).abs() < f64::EPSILON);

    for expected in [9, 8] {
        model = update(model, Message::Intent(Intent::PrevPage));
        model.run_frame();
        assert_eq!(model.store.current_page(), expected);
    }

    model = update(model, Message::GoToTop);
    model.run_frame();
    assert_eq!(model.store.current_page(), 1);
    assert!(model.list.scroll_top().abs() < f64::EPSILON);
}

#[test]
fn test_prev_page_on_first_page_is_noop() {
    let model = create_test_model();
    let model = update(model, Message::Intent(Intent::PrevPage));
    assert_eq!(model.store.current_page(), 1);
    assert!(model.list.scroll_top().abs() < f64::EPSILON);
}

#[test]
fn test_scroll_updates_current_page_on_frame() {
    let model = create_test_model();
    let mut model = update(model, Message::ScrollBy(50));
    model.run_frame();
    // scroll 300, midpoint 322 lies in the third page.
    assert_eq!(model.store.current_page(), 3);
    assert!(model.store.runtime().progress > 0.0);
}

#[test]
fn test_zoom_keys_clamp_and_relayout() {
    let mut model = create_test_model();
    model = press(model, KeyCode::Char('+'));
    assert_eq!(model.store.settings().zoom, 110);
    assert!((model.list.container_width() - 88.0).abs() < f64::EPSILON);

    for _ in 0..25 {
        model = press(model, KeyCode::Char('+'));
    }
    assert_eq!(model.store.settings().zoom, 200);

    model = press(model, KeyCode::Char('0'));
    assert_eq!(model.store.settings().zoom, 100);
    for _ in 0..25 {
        model = press(model, KeyCode::Char('-'));
    }
    assert_eq!(model.store.settings().zoom, 50);
}

#[test]
fn test_left_edge_tap_goes_back_once() {
    let model = create_test_model();
    let model = update(model, Message::Intent(Intent::NextPage));
    let model = update(model, Message::Intent(Intent::NextPage));
    assert_eq!(model.store.current_page(), 3);

    let model = tap(model, 8, 1_000);
    assert_eq!(model.store.current_page(), 2);
    assert!(model.store.runtime().controls_visible);
}

#[test]
fn test_middle_tap_toggles_controls_and_reclaims_row() {
    let model = create_test_model();
    let model = tap(model, 40, 1_000);
    assert!(!model.store.runtime().controls_visible);
    assert_eq!(model.store.current_page(), 1);
    assert_eq!(model.page_rows(), 23);
}

#[test]
fn test_double_tap_zooms_in() {
    let model = create_test_model();
    let model = tap(model, 40, 1_000);
    let model = tap(model, 40, 1_150);
    assert_eq!(model.store.settings().zoom, 150);
}

#[test]
fn test_rtl_mirrors_horizontal_keys_and_taps() {
    let mut model = create_test_model();
    model = update(model, Message::CycleReadingMode);
    model = update(model, Message::CycleReadingMode);
    assert_eq!(model.reading_mode(), ReadingMode::Rtl);

    model = press(model, KeyCode::Left);
    assert_eq!(model.store.current_page(), 2);
    model = press(model, KeyCode::Down);
    assert_eq!(model.store.current_page(), 3);
    model = tap(model, 75, 5_000);
    assert_eq!(model.store.current_page(), 2);
}

#[test]
fn test_paged_mode_wheel_turns_pages() {
    let model = create_test_model();
    let model = update(model, Message::CycleReadingMode);
    assert_eq!(model.reading_mode(), ReadingMode::Paged);
    let model = update(model, Message::ScrollBy(3));
    assert_eq!(model.store.current_page(), 2);
    let model = update(model, Message::ScrollBy(-3));
    assert_eq!(model.store.current_page(), 1);
}

#[test]
fn test_prompt_captures_keys() {
    let mut model = create_test_model();
    model = press(model, KeyCode::Char('g'));
    assert_eq!(model.prompt.as_deref(), Some(""));

    model = press(model, KeyCode::Char('1'));
    model = press(model, KeyCode::Char('0'));
    // '0' is text here, not a zoom reset.
    assert_eq!(model.prompt.as_deref(), Some("10"));
    model = press(model, KeyCode::Down);
    assert_eq!(model.store.current_page(), 1);

    model = press(model, KeyCode::Backspace);
    model = press(model, KeyCode::Char('2'));
    model = press(model, KeyCode::Enter);
    assert!(model.prompt.is_none());
    assert_eq!(model.store.current_page(), 12);
    assert!((model.list.scroll_top() - 1320.0).abs() < f64::EPSILON);
}

#[test]
fn test_prompt_rejects_out_of_range_page() {
    let model = create_test_model();
    let model = update(model, Message::StartPrompt);
    let model = update(model, Message::PromptInput("99".to_string()));
    let model = update(model, Message::PromptSubmit);
    assert_eq!(model.store.current_page(), 1);
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Warning))));
}

#[test]
fn test_prompt_escape_cancels_without_quitting() {
    let model = create_test_model();
    let model = update(model, Message::StartPrompt);
    let model = press(model, KeyCode::Esc);
    assert!(model.prompt.is_none());
    assert!(!model.should_quit);
}

#[test]
fn test_chapter_navigation_resets_sequence() {
    let mut model = create_test_model();
    model.take_pending_loads();
    let model = update(model, Message::Intent(Intent::NextPage));
    let mut model = update(model, Message::Intent(Intent::NextChapter));
    assert_eq!(model.chapter, 1);
    assert_eq!(model.store.total_pages(), 10);
    assert_eq!(model.store.current_page(), 1);
    assert_eq!(model.cache.stats().queued, 0);
    assert!(model.cache.is_empty());

    model.run_frame();
    let loads = model.take_pending_loads();
    assert_eq!(loads[0].src, "/pages/c1/0.png");

    let model = update(model, Message::Intent(Intent::NextChapter));
    assert_eq!(model.chapter, 1);
    assert!(model.active_toast().is_some());
}

#[test]
fn test_prev_chapter_from_first_shows_toast() {
    let model = create_test_model();
    let model = update(model, Message::Intent(Intent::PrevChapter));
    assert_eq!(model.chapter, 0);
    assert!(matches!(model.active_toast(), Some(("First chapter", ToastLevel::Info))));
}

#[test]
fn test_finished_load_caches_and_measures() {
    let mut model = create_test_model();
    model.take_pending_loads();
    model.finish_load(LoadCompletion {
        src: "/pages/c0/0.png".to_string(),
        result: Ok(image(100, 300)),
    });
    assert!(model.cache.is_cached("/pages/c0/0.png"));
    let first = model.list.item(0).unwrap();
    assert!((first.size() - 240.0).abs() < f64::EPSILON);
    assert!((model.list.total_height() - 2520.0).abs() < f64::EPSILON);
    // The freed slot goes to the next queued page.
    assert_eq!(model.take_pending_loads().len(), 1);
}

#[test]
fn test_failed_load_can_be_retried() {
    let mut model = create_test_model();
    model.take_pending_loads();
    model.finish_load(LoadCompletion {
        src: "/pages/c0/0.png".to_string(),
        result: Err(LoadError::Unavailable("/pages/c0/0.png".to_string())),
    });
    assert!(model.cache.is_failed("/pages/c0/0.png"));
    model.take_pending_loads();

    let mut model = update(model, Message::RetryFailed);
    assert!(!model.cache.is_failed("/pages/c0/0.png"));
    assert!(model.cache.is_loading("/pages/c0/0.png") || model.cache.queued_len() > 0);

    let _ = model.take_pending_loads();
    let model = update(model, Message::RetryFailed);
    assert!(matches!(model.active_toast(), Some(("Nothing to retry", _))));
}

#[test]
fn test_auto_next_chapter_at_end() {
    let model = create_test_model();
    let model = update(model, Message::ToggleAutoNext);
    assert!(model.store.settings().auto_next_chapter);
    let mut model = update(model, Message::GoToBottom);
    model.run_frame();
    assert_eq!(model.chapter, 1);
    assert_eq!(model.store.current_page(), 1);
}

#[test]
fn test_end_of_chapter_without_auto_next_stays() {
    let model = create_test_model();
    let mut model = update(model, Message::GoToBottom);
    model.run_frame();
    assert_eq!(model.chapter, 0);
    assert_eq!(model.store.current_page(), 20);
    assert!((model.store.runtime().progress - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_fullscreen_and_escape() {
    let model = create_test_model();
    let model = press(model, KeyCode::Char('f'));
    assert!(model.store.runtime().fullscreen);
    assert!(model.chrome.fullscreen);
    assert_eq!(model.page_rows(), 23);

    let model = press(model, KeyCode::Esc);
    assert!(!model.store.runtime().fullscreen);
    assert!(!model.should_quit);

    let model = press(model, KeyCode::Esc);
    assert!(model.should_quit);
}

#[test]
fn test_quit_keys() {
    let model = create_test_model();
    assert_eq!(App::handle_key(key(KeyCode::Char('q')), &model), Some(Message::Quit));
    let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert_eq!(App::handle_key(ctrl_c, &model), Some(Message::Quit));
}

#[test]
fn test_resize_relayouts() {
    let model = create_test_model();
    let model = update(model, Message::Resize(100, 42));
    assert!((model.list.container_width() - 100.0).abs() < f64::EPSILON);
    assert!((model.list.viewport_height() - 80.0).abs() < f64::EPSILON);
}

#[test]
fn test_fit_modes_change_container_width() {
    let model = create_test_model();
    let model = update(model, Message::CycleFitMode);
    // 44 px viewport / 1.5
    assert!((model.list.container_width() - 29.0).abs() < f64::EPSILON);
    let model = update(model, Message::CycleFitMode);
    assert!((model.list.container_width() - super::ORIGINAL_WIDTH_PX).abs() < f64::EPSILON);
    let model = update(model, Message::CycleFitMode);
    assert!((model.list.container_width() - 80.0).abs() < f64::EPSILON);
}

#[test]
fn test_brightness_steps_clamp() {
    let mut model = create_test_model();
    for _ in 0..12 {
        model = update(model, Message::AdjustBrightness(-1));
    }
    assert_eq!(model.store.settings().brightness, 20);
    model = update(model, Message::AdjustBrightness(1));
    assert_eq!(model.store.settings().brightness, 30);
}

#[test]
fn test_settings_persist_across_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = ViewerStore::open(Box::new(JsonFileStore::open(&path).unwrap()));
    let model = create_test_model().with_store(store);
    let model = update(model, Message::Intent(Intent::SetZoom(130)));
    let model = update(model, Message::TogglePageNumber);
    drop(model);

    let reopened = ViewerStore::open(Box::new(JsonFileStore::open(&path).unwrap()));
    assert_eq!(reopened.settings().zoom, 130);
    assert!(!reopened.settings().show_page_number);

    let model = create_test_model().with_store(reopened);
    assert!((model.list.container_width() - 104.0).abs() < f64::EPSILON);
}

#[test]
fn test_reset_settings_restores_defaults() {
    let model = create_test_model();
    let model = update(model, Message::Intent(Intent::SetZoom(180)));
    let model = update(model, Message::ResetSettings);
    assert_eq!(model.store.settings().zoom, 100);
    assert!((model.list.container_width() - 80.0).abs() < f64::EPSILON);
}

#[test]
fn test_out_of_range_start_chapter_falls_back() {
    let model = Model::new(
        PathBuf::from("manifest.json"),
        create_manifest(&[4]),
        9,
        (80, 24),
    );
    assert_eq!(model.chapter, 0);
    assert_eq!(model.store.total_pages(), 4);
}

#[test]
fn test_replace_manifest_keeps_position() {
    let model = create_test_model();
    let model = update(model, Message::StartPrompt);
    let model = update(model, Message::PromptInput("7".to_string()));
    let mut model = update(model, Message::PromptSubmit);
    model.replace_manifest(create_manifest(&[15, 10]));
    assert_eq!(model.store.total_pages(), 15);
    assert_eq!(model.store.current_page(), 7);
}

#[test]
fn test_reload_from_disk_reads_manifest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    let manifest = create_manifest(&[3]);
    std::fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();

    let mut model = Model::new(path.clone(), create_manifest(&[20]), 0, (80, 24));
    App::handle_message_side_effects(&mut model, &Message::ManifestChanged);
    assert_eq!(model.store.total_pages(), 3);
    assert!(matches!(model.active_toast(), Some(("Manifest reloaded", _))));

    std::fs::write(&path, "{").unwrap();
    App::handle_message_side_effects(&mut model, &Message::ManifestChanged);
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Error))));
    assert_eq!(model.store.total_pages(), 3);
}

#[test]
fn test_frame_coalesces_scroll_bursts() {
    let mut model = create_test_model();
    model = update(model, Message::ScrollBy(10));
    model = update(model, Message::ScrollBy(10));
    assert!(model.tick_frame(1_000));
    assert_eq!(model.store.current_page(), 2);
    model = update(model, Message::ScrollBy(10));
    assert!(!model.tick_frame(1_005));
    assert!(model.tick_frame(1_016));
}
