use ratatui::prelude::*;

use crate::app::Model;

use super::{pages, status};

/// Split the screen into title, page, and status rows.
///
/// The title row disappears in fullscreen and the status row when the
/// controls are hidden.
pub fn split_screen(area: Rect, fullscreen: bool, controls: bool) -> (Option<Rect>, Rect, Option<Rect>) {
    let title_rows = u16::from(!fullscreen).min(area.height);
    let status_rows = u16::from(controls).min(area.height - title_rows);
    let title = (title_rows > 0).then(|| Rect::new(area.x, area.y, area.width, 1));
    let pages = Rect::new(
        area.x,
        area.y + title_rows,
        area.width,
        area.height - title_rows - status_rows,
    );
    let status = (status_rows > 0).then(|| Rect::new(area.x, area.bottom() - 1, area.width, 1));
    (title, pages, status)
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();
    let runtime = model.store.runtime();
    let (title_area, pages_area, status_area) =
        split_screen(area, runtime.fullscreen, runtime.controls_visible);

    pages::render_pages(model, frame, pages_area);

    if model.store.settings().show_page_number {
        status::render_page_number(model, frame, pages_area);
    }
    if let Some(title_area) = title_area {
        status::render_title_bar(model, frame, title_area);
    }

    let bottom = status_area.unwrap_or_else(|| {
        Rect::new(
            pages_area.x,
            pages_area.bottom().saturating_sub(1),
            pages_area.width,
            1.min(pages_area.height),
        )
    });
    if model.prompt.is_some() {
        status::render_prompt_bar(model, frame, bottom);
    } else if model.active_toast().is_some() {
        status::render_toast_bar(model, frame, bottom);
    } else if let Some(status_area) = status_area {
        status::render_status_bar(model, frame, status_area);
    }
}
