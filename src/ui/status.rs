use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Model;

pub fn render_title_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let chapter = model
        .current_chapter()
        .map_or("untitled", |c| c.title.as_str());
    let position = format!(
        "  ({}/{})",
        model.chapter + 1,
        model.manifest.chapters.len()
    );
    let title = format!(" {}  {}{}", model.manifest.title, chapter, position);
    let bar = Paragraph::new(title).style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(bar, area);
}

pub fn render_prompt_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let input = model.prompt.as_deref().unwrap_or_default();
    let text = format!(
        "Go to page: {input}  (1-{})  Enter: go  Esc: cancel",
        model.store.total_pages()
    );
    let bar = Paragraph::new(text).style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(bar, area);
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let runtime = model.store.runtime();
    let settings = model.store.settings();
    let label = model
        .current_page()
        .map_or_else(|| "-".to_string(), |page| page.page_number.to_string());
    let stats = model.preload_stats();

    let page_info = format!(
        "Page {label} ({}/{})",
        runtime.current_page, runtime.total_pages
    );
    let cache_info = format!(
        "cache {} +{} ~{}{}",
        stats.cached,
        stats.queued,
        stats.in_flight,
        if stats.failed > 0 {
            format!(" !{}", stats.failed)
        } else {
            String::new()
        }
    );
    let watch_indicator = if model.watch_enabled {
        " [watching]"
    } else {
        ""
    };
    let auto_indicator = if settings.auto_next_chapter {
        " [auto]"
    } else {
        ""
    };

    let status = format!(
        " {}  [{:.0}%]  {}x {} {}  {}{}{}",
        page_info,
        runtime.progress,
        settings.zoom,
        settings.fit_mode.as_str(),
        settings.reading_mode.as_str(),
        cache_info,
        watch_indicator,
        auto_indicator,
    );

    let status_bar =
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(status_bar, area);
}

/// Current page label in the top-right corner of the page area.
pub fn render_page_number(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(page) = model.current_page() else {
        return;
    };
    let text = format!(" {} ", page.page_number);
    let width = u16::try_from(text.chars().count()).unwrap_or(area.width).min(area.width);
    let rect = Rect::new(area.right().saturating_sub(width), area.y, width, 1.min(area.height));
    let badge = Paragraph::new(text).style(Style::default().bg(Color::Black).fg(Color::Yellow));
    frame.render_widget(badge, rect);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        crate::app::ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        crate::app::ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        crate::app::ToastLevel::Error => {
            ("[error]", Style::default().bg(Color::Red).fg(Color::White))
        }
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
