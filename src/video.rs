//! Scan buffer -> true colour framebuffer -> display surface.
//!
//! Nothing in here locks; callers reach the pipeline through the machine
//! lock, which is also what keeps the scan buffer stable while it is read.

use serde::{Deserialize, Serialize};

/// logical display the interpreter boots with
pub const DEFAULT_WIDTH: usize = 64;
pub const DEFAULT_HEIGHT: usize = 32;

/// Plan 9 colour map: 4 levels of red, green and blue, each stretched over
/// 4 levels of brightness. Index 0 is black, 255 is white.
pub const PLAN9: [[u8; 3]; 256] = plan9();

const fn plan9() -> [[u8; 3]; 256] {
    let mut colours = [[0u8; 3]; 256];
    let mut i = 0usize;
    let mut r = 0u32;
    while r < 4 {
        let mut v = 0u32;
        while v < 4 {
            let mut j = v as i32 - r as i32;
            let mut g = 0u32;
            while g < 4 {
                let mut b = 0u32;
                while b < 4 {
                    let mut den = r;
                    if g > den {
                        den = g;
                    }
                    if b > den {
                        den = b;
                    }
                    let idx = i + (j & 0x0f) as usize;
                    colours[idx] = if den == 0 {
                        let y = (0x11 * v) as u8;
                        [y, y, y]
                    } else {
                        let num = 17 * (4 * den + v);
                        [
                            (r * num / den) as u8,
                            (g * num / den) as u8,
                            (b * num / den) as u8,
                        ]
                    };
                    b += 1;
                    j += 1;
                }
                g += 1;
            }
            v += 1;
            i += 16;
        }
        r += 1;
    }
    colours
}

/// How a scan buffer byte becomes a colour. Alpha is always opaque.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PalettePolicy {
    /// look the byte up in the Plan 9 colour map
    #[default]
    Plan9,
    /// the byte is the red intensity, green and blue are zero
    RedIntensity,
}

impl PalettePolicy {
    pub fn rgba(self, index: u8) -> [u8; 4] {
        match self {
            PalettePolicy::Plan9 => {
                let [r, g, b] = PLAN9[index as usize];
                [r, g, b, 0xff]
            }
            PalettePolicy::RedIntensity => [index, 0, 0, 0xff],
        }
    }
}

/// Packed RGBA pixels, row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Framebuffer {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Nearest-neighbour scale, keeping hard pixel edges. A `height` of 0
    /// derives the height from `width` and the current aspect ratio.
    pub fn resize(&self, width: usize, height: usize) -> Option<Framebuffer> {
        if width == 0 || self.width == 0 || self.height == 0 {
            return None;
        }
        let height = match height {
            0 => ((self.height * width + self.width / 2) / self.width).max(1),
            h => h,
        };

        let mut out = Framebuffer::new(width, height);
        for (y, row) in out.pixels.chunks_exact_mut(width * 4).enumerate() {
            let src_y = y * self.height / height;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let src = (src_y * self.width + x * self.width / width) * 4;
                px.copy_from_slice(&self.pixels[src..src + 4]);
            }
        }
        Some(out)
    }
}

/// Turns the interpreter's scan buffer into something a screen can show.
///
/// The framebuffer is allocated on first draw and reused until the logical
/// dimensions change. The scaled surface follows the viewport width.
#[derive(Debug)]
pub struct VideoPipeline {
    palette: PalettePolicy,
    logical_width: usize,
    viewport_width: usize,
    framebuffer: Option<Framebuffer>,
    surface: Option<Framebuffer>,
}

impl VideoPipeline {
    pub fn new(palette: PalettePolicy) -> Self {
        VideoPipeline {
            palette,
            logical_width: DEFAULT_WIDTH,
            viewport_width: 0,
            framebuffer: None,
            surface: None,
        }
    }

    pub fn palette(&self) -> PalettePolicy {
        self.palette
    }

    pub fn logical_width(&self) -> usize {
        self.logical_width
    }

    pub fn set_logical_width(&mut self, width: usize) {
        if width == 0 {
            log::warn!("video: ignoring zero display width");
            return;
        }
        if width != self.logical_width {
            log::debug!("video: logical width {} -> {}", self.logical_width, width);
            self.logical_width = width;
        }
    }

    pub fn viewport_width(&self) -> usize {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: usize) {
        self.viewport_width = width;
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    pub fn surface(&self) -> Option<&Framebuffer> {
        self.surface.as_ref()
    }

    /// render `video` into the framebuffer and scale it to the viewport.
    /// does nothing while there is no viewport to size the output to
    pub fn draw(&mut self, video: &[u8]) {
        if self.viewport_width == 0 {
            return;
        }

        let width = self.logical_width;
        let height = video.len() / width;
        if height == 0 {
            log::warn!(
                "video: {} byte scan buffer is narrower than one {} pixel row",
                video.len(),
                width
            );
            return;
        }
        if video.len() % width != 0 {
            log::warn!(
                "video: dropping {} bytes past the last full row",
                video.len() % width
            );
        }

        let stale = self
            .framebuffer
            .as_ref()
            .map_or(true, |fb| fb.width != width || fb.height != height);
        if stale {
            log::debug!("video: allocating {}x{} framebuffer", width, height);
            self.framebuffer = None;
        }
        let fb = self
            .framebuffer
            .get_or_insert_with(|| Framebuffer::new(width, height));

        for (px, index) in fb.pixels.chunks_exact_mut(4).zip(video) {
            px.copy_from_slice(&self.palette.rgba(*index));
        }

        self.surface = fb.resize(self.viewport_width, 0);
    }
}
