use crate::app::{Model, ToastLevel};
use crate::input::{Intent, TouchEvent};
use crate::viewer::{BRIGHTNESS_MAX, BRIGHTNESS_MIN, ReadingMode, SettingsPatch};

/// Half-block pixels per wheel notch or `j`/`k` press.
pub const SCROLL_STEP_PX: f64 = 6.0;

/// Brightness change per key press.
pub const BRIGHTNESS_STEP: u8 = 10;

/// All possible events and actions in the application.
///
/// These represent user input, system events, and internal actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Interpreted keyboard or touch input
    Intent(Intent),
    /// Raw touch input, interpreted against the current zoom
    Touch(TouchEvent),

    // Scrolling
    /// Scroll by n wheel steps (negative is up)
    ScrollBy(i32),
    /// Scroll down one screen
    ScreenDown,
    /// Scroll up one screen
    ScreenUp,
    /// Go to first page
    GoToTop,
    /// Go to last page
    GoToBottom,

    // Go-to-page prompt
    /// Open the go-to-page prompt
    StartPrompt,
    /// Replace the prompt text
    PromptInput(String),
    /// Jump to the page typed in the prompt
    PromptSubmit,
    /// Close the prompt
    PromptCancel,

    // Settings
    /// Cycle webtoon, paged, right-to-left
    CycleReadingMode,
    /// Cycle fit width, fit height, original
    CycleFitMode,
    /// Change brightness by n steps
    AdjustBrightness(i8),
    /// Toggle the page number overlay
    TogglePageNumber,
    /// Toggle automatic advance at the end of a chapter
    ToggleAutoNext,
    /// Restore default settings
    ResetSettings,

    // Loading
    /// Retry failed pages on screen
    RetryFailed,
    /// Manifest changed on disk, reload
    ManifestChanged,

    // Window
    /// Terminal resized
    Resize(u16, u16),

    // Application
    /// Quit the application
    Quit,
}

/// Pure function that updates the model based on a message.
///
/// This is the core of TEA - all state transitions happen here. Loads the
/// model wants started are queued on it for the event loop to dispatch.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        Message::Intent(intent) => apply_intent(&mut model, intent),
        Message::Touch(event) => {
            let zoom = model.store.settings().zoom;
            let width = f64::from(model.terminal_size.0) * super::model::CELL_WIDTH_PX;
            if let Some(intent) = model.touch.handle(&event, zoom, width) {
                let intent = if model.reading_mode().is_rtl() {
                    mirror(intent)
                } else {
                    intent
                };
                apply_intent(&mut model, intent);
            }
        }

        Message::ScrollBy(steps) => {
            if model.reading_mode() == ReadingMode::Webtoon {
                model.list.scroll_by(f64::from(steps) * SCROLL_STEP_PX);
                model.request_frame();
            } else if steps > 0 {
                apply_intent(&mut model, Intent::NextPage);
            } else if steps < 0 {
                apply_intent(&mut model, Intent::PrevPage);
            }
        }
        Message::ScreenDown => {
            let screen = model.list.viewport_height();
            model.list.scroll_by(screen);
            model.request_frame();
        }
        Message::ScreenUp => {
            let screen = model.list.viewport_height();
            model.list.scroll_by(-screen);
            model.request_frame();
        }
        Message::GoToTop => {
            if model.store.current_page() > 1 || model.list.scroll_top() > 0.0 {
                model.scroll_to_page(1);
            }
        }
        Message::GoToBottom => model.scroll_to_bottom(),

        Message::StartPrompt => model.prompt = Some(String::new()),
        Message::PromptInput(text) => {
            if model.prompt.is_some() {
                model.prompt = Some(text);
            }
        }
        Message::PromptSubmit => {
            let input = model.prompt.take().unwrap_or_default();
            match input.trim().parse::<usize>() {
                Ok(page) if (1..=model.store.total_pages()).contains(&page) => {
                    model.scroll_to_page(page);
                }
                _ => {
                    let total = model.store.total_pages();
                    model.show_toast(
                        ToastLevel::Warning,
                        format!("No page {:?} (1-{total})", input.trim()),
                    );
                }
            }
        }
        Message::PromptCancel => model.prompt = None,

        Message::CycleReadingMode => {
            let mode = model.reading_mode().next();
            update_settings(
                &mut model,
                &SettingsPatch {
                    reading_mode: Some(mode),
                    ..SettingsPatch::default()
                },
            );
            model.show_toast(ToastLevel::Info, format!("Reading mode: {}", mode.as_str()));
        }
        Message::CycleFitMode => {
            let fit = model.store.settings().fit_mode.next();
            update_settings(
                &mut model,
                &SettingsPatch {
                    fit_mode: Some(fit),
                    ..SettingsPatch::default()
                },
            );
            model.show_toast(ToastLevel::Info, format!("Fit: {}", fit.as_str()));
        }
        Message::AdjustBrightness(steps) => {
            let current = i32::from(model.store.settings().brightness);
            let next = (current + i32::from(steps) * i32::from(BRIGHTNESS_STEP))
                .clamp(i32::from(BRIGHTNESS_MIN), i32::from(BRIGHTNESS_MAX));
            let next = u8::try_from(next).unwrap_or(BRIGHTNESS_MAX);
            update_settings(&mut model, &SettingsPatch::brightness(next));
        }
        Message::TogglePageNumber => {
            let show = !model.store.settings().show_page_number;
            update_settings(
                &mut model,
                &SettingsPatch {
                    show_page_number: Some(show),
                    ..SettingsPatch::default()
                },
            );
        }
        Message::ToggleAutoNext => {
            let enabled = !model.store.settings().auto_next_chapter;
            update_settings(
                &mut model,
                &SettingsPatch {
                    auto_next_chapter: Some(enabled),
                    ..SettingsPatch::default()
                },
            );
            let state = if enabled { "on" } else { "off" };
            model.show_toast(ToastLevel::Info, format!("Auto next chapter {state}"));
        }
        Message::ResetSettings => {
            model.store.reset_settings();
            model.sync_layout();
            model.show_toast(ToastLevel::Info, "Settings reset");
        }

        Message::RetryFailed => {
            let retried = model.retry_failed();
            if retried == 0 {
                model.show_toast(ToastLevel::Info, "Nothing to retry");
            }
        }
        // Reloading reads from disk; handled as a side effect.
        Message::ManifestChanged => {}

        Message::Resize(width, height) => {
            model.terminal_size = (width, height);
            model.sync_layout();
        }

        Message::Quit => model.should_quit = true,
    }
    model
}

fn update_settings(model: &mut Model, patch: &SettingsPatch) {
    if model.store.update_settings(patch) {
        model.sync_layout();
    }
}

fn apply_intent(model: &mut Model, intent: Intent) {
    match intent {
        Intent::NextPage => {
            if model.store.next_page() {
                let page = model.store.current_page();
                model.scroll_to_page(page);
            }
        }
        Intent::PrevPage => {
            if model.store.prev_page() {
                let page = model.store.current_page();
                model.scroll_to_page(page);
            }
        }
        Intent::NextChapter => {
            if !model.open_chapter(model.chapter + 1) {
                model.show_toast(ToastLevel::Info, "Last chapter");
            }
        }
        Intent::PrevChapter => {
            let opened = model
                .chapter
                .checked_sub(1)
                .is_some_and(|prev| model.open_chapter(prev));
            if !opened {
                model.show_toast(ToastLevel::Info, "First chapter");
            }
        }
        Intent::ToggleFullscreen => {
            model.store.toggle_fullscreen(&mut model.chrome);
            model.sync_layout();
        }
        Intent::ToggleControls => {
            model.store.toggle_controls();
            model.sync_layout();
        }
        Intent::SetZoom(zoom) => update_settings(model, &SettingsPatch::zoom(zoom)),
        Intent::Escape => {
            if model.store.runtime().fullscreen {
                model.store.toggle_fullscreen(&mut model.chrome);
                model.sync_layout();
            } else {
                model.should_quit = true;
            }
        }
    }
}

/// Swap page-turn direction for right-to-left reading.
pub(super) const fn mirror(intent: Intent) -> Intent {
    match intent {
        Intent::NextPage => Intent::PrevPage,
        Intent::PrevPage => Intent::NextPage,
        other => other,
    }
}
