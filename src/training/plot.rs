//! Confusion-matrix heat map rendered straight to PNG

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::error::FraudResult;
use crate::ml::ConfusionMatrix;

const CELL: u32 = 160;
const MARGIN: u32 = 48;
const WIDTH: u32 = MARGIN + 2 * CELL + 16;
const HEIGHT: u32 = 16 + 2 * CELL + MARGIN;
const ORIGIN_X: u32 = MARGIN;
const ORIGIN_Y: u32 = 16;

const BACKGROUND: [u8; 3] = [255, 255, 255];
const LIGHT: [u8; 3] = [247, 251, 255];
const DARK: [u8; 3] = [8, 48, 107];
const INK: [u8; 3] = [0, 0, 0];

/// 3x5 glyphs for 0-9, one row per byte, low three bits used
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// RGB8 raster
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, color: [u8; 3]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self { width, height, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                let i = ((py * self.width + px) * 3) as usize;
                self.pixels[i..i + 3].copy_from_slice(&color);
            }
        }
    }

    /// Draw a run of digits centred on (cx, cy), scaled to fit `max_width`
    fn draw_number(&mut self, text: &str, cx: u32, cy: u32, max_width: u32, color: [u8; 3]) {
        let glyphs: Vec<usize> = text
            .chars()
            .filter_map(|c| c.to_digit(10).map(|d| d as usize))
            .collect();
        if glyphs.is_empty() {
            return;
        }

        // Each glyph is 3 units wide plus 1 unit of spacing
        let units = glyphs.len() as u32 * 4 - 1;
        let scale = (max_width / units).clamp(1, 6);
        let text_w = units * scale;
        let text_h = 5 * scale;
        let left = cx.saturating_sub(text_w / 2);
        let top = cy.saturating_sub(text_h / 2);

        for (n, &digit) in glyphs.iter().enumerate() {
            let gx = left + n as u32 * 4 * scale;
            for (row, bits) in DIGITS[digit].iter().enumerate() {
                for col in 0..3u32 {
                    if bits & (0b100 >> col) != 0 {
                        self.fill_rect(gx + col * scale, top + row as u32 * scale, scale, scale, color);
                    }
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> FraudResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let writer = BufWriter::new(File::create(path)?);
        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        Ok(())
    }
}

fn blend(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = LIGHT[c] as f64 + (DARK[c] as f64 - LIGHT[c] as f64) * t;
        out[c] = v.round() as u8;
    }
    out
}

/// Rows are actual classes, columns predicted classes; darker means more samples
pub fn render_confusion_matrix(cm: &ConfusionMatrix) -> Canvas {
    let counts = cm.as_array();
    let max = counts.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;
    let mut canvas = Canvas::new(WIDTH, HEIGHT, BACKGROUND);

    for (actual, row) in counts.iter().enumerate() {
        for (predicted, &count) in row.iter().enumerate() {
            let t = count as f64 / max;
            let x = ORIGIN_X + predicted as u32 * CELL;
            let y = ORIGIN_Y + actual as u32 * CELL;
            canvas.fill_rect(x, y, CELL, CELL, blend(t));

            let text_color = if t > 0.5 { BACKGROUND } else { INK };
            canvas.draw_number(&count.to_string(), x + CELL / 2, y + CELL / 2, CELL - 24, text_color);
        }
    }

    // Class ticks: actual on the left, predicted below
    for class in 0..2u32 {
        let label = class.to_string();
        canvas.draw_number(&label, MARGIN / 2, ORIGIN_Y + class * CELL + CELL / 2, 12, INK);
        canvas.draw_number(&label, ORIGIN_X + class * CELL + CELL / 2, ORIGIN_Y + 2 * CELL + MARGIN / 2, 12, INK);
    }

    canvas
}

pub fn save_confusion_matrix(cm: &ConfusionMatrix, path: &Path) -> FraudResult<()> {
    render_confusion_matrix(cm).save(path)
}
