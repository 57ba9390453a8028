//! Half-block painting of mounted pages.
//!
//! Every terminal cell holds two vertical pixels: the foreground of `▀` is
//! the upper one and the background the lower one. Layout units are these
//! pixels, so one text row spans two units.

use std::collections::HashMap;

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use ratatui::buffer::Buffer;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Model;

const UPPER_HALF: &str = "▀";

#[derive(Debug)]
struct Thumbnail {
    width: u32,
    height: u32,
    pixels: RgbImage,
}

/// Decoded pages scaled to their current on-screen size.
#[derive(Debug, Default)]
pub struct ThumbnailCache {
    entries: HashMap<String, Thumbnail>,
}

impl ThumbnailCache {
    /// Scaled pixels for `src`, rescaling when the requested size changed.
    pub fn get_or_scale(
        &mut self,
        src: &str,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> &RgbImage {
        let width = width.max(1);
        let height = height.max(1);
        let thumb = self
            .entries
            .entry(src.to_string())
            .or_insert_with(|| scale(image, width, height));
        if thumb.width != width || thumb.height != height {
            crate::perf::log_event("render.rescale", format!("src={src} size={width}x{height}"));
            *thumb = scale(image, width, height);
        }
        &thumb.pixels
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|src, _| keep(src));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn scale(image: &DynamicImage, width: u32, height: u32) -> Thumbnail {
    let pixels = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();
    Thumbnail {
        width,
        height,
        pixels,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn px(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

pub fn render_pages(model: &mut Model, frame: &mut Frame, area: Rect) {
    let scroll_top = model.list.scroll_top();
    let width_px = px(model.list.container_width());
    let x_offset = (i64::from(area.width) - i64::from(width_px)) / 2;
    let brightness = model.store.settings().brightness;
    let screen_px = f64::from(area.height) * 2.0;
    crate::perf::log_event(
        "render.pages",
        format!(
            "range={:?} area={}x{} thumbs={}",
            model.list.visible_range(),
            area.width,
            area.height,
            model.thumbnails.len()
        ),
    );

    for item in model.list.virtual_items() {
        let top = item.start - scroll_top;
        if item.end - scroll_top <= 0.0 || top >= screen_px {
            continue;
        }
        let Some(page) = model.list.pages().get(item.index) else {
            continue;
        };
        if let Some(image) = model.cache.get_cached(&page.primary_src) {
            let pixels =
                model
                    .thumbnails
                    .get_or_scale(&page.primary_src, image, width_px, px(item.size()));
            paint(frame.buffer_mut(), area, pixels, top, x_offset, brightness);
        } else {
            let label = if model.cache.is_failed(&page.primary_src) {
                format!("Page {} failed to load (r to retry)", page.page_number)
            } else if model.cache.is_loading(&page.primary_src) {
                format!("Loading page {}", page.page_number)
            } else {
                format!("Page {}", page.page_number)
            };
            placeholder(frame, area, top, item.size(), &label);
        }
    }
}

/// Paint `pixels` with its top edge `top` pixels below the area's top.
fn paint(buf: &mut Buffer, area: Rect, pixels: &RgbImage, top: f64, x_offset: i64, brightness: u8) {
    for row in 0..area.height {
        for half in 0..2_u16 {
            let screen_y = f64::from(row * 2 + half);
            let src_y = (screen_y - top).floor();
            if src_y < 0.0 || src_y >= f64::from(pixels.height()) {
                continue;
            }
            let src_y = px(src_y);
            for col in 0..area.width {
                let Ok(src_x) = u32::try_from(i64::from(col) - x_offset) else {
                    continue;
                };
                if src_x >= pixels.width() {
                    continue;
                }
                let color = dim(*pixels.get_pixel(src_x, src_y), brightness);
                let cell = &mut buf[(area.x + col, area.y + row)];
                cell.set_symbol(UPPER_HALF);
                if half == 0 {
                    cell.set_fg(color);
                } else {
                    cell.set_bg(color);
                }
            }
        }
    }
}

fn dim(Rgb([r, g, b]): Rgb<u8>, brightness: u8) -> Color {
    let scale = |c: u8| u8::try_from(u16::from(c) * u16::from(brightness) / 100).unwrap_or(u8::MAX);
    Color::Rgb(scale(r), scale(g), scale(b))
}

fn placeholder(frame: &mut Frame, area: Rect, top: f64, size: f64, label: &str) {
    let first = (top / 2.0).floor().max(0.0);
    let last = ((top + size) / 2.0).ceil().min(f64::from(area.height));
    if last <= first {
        return;
    }
    let first_row = u16::try_from(px(first)).unwrap_or(u16::MAX);
    let last_row = u16::try_from(px(last)).unwrap_or(u16::MAX);
    let rect = Rect::new(area.x, area.y + first_row, area.width, last_row - first_row);
    let mid = Rect::new(rect.x, rect.y + rect.height / 2, rect.width, 1);
    let style = Style::default().fg(Color::Gray).bg(Color::Black);
    let buf = frame.buffer_mut();
    for y in rect.top()..rect.bottom() {
        for x in rect.left()..rect.right() {
            buf[(x, y)].set_symbol(" ").set_style(style);
        }
    }
    frame.render_widget(Paragraph::new(label).style(style).centered(), mid);
}
