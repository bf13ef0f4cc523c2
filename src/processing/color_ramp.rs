use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::error::{Result, SemioError};
use crate::io::input::{read_color_table, ColorTable};

/// Number of discrete entries a named palette is sampled to.
pub const NAMED_RAMP_SIZE: usize = 256;

/// RGB triple with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xff) as f64 / 255.0,
            ((hex >> 8) & 0xff) as f64 / 255.0,
            (hex & 0xff) as f64 / 255.0,
        )
    }

    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        Rgb::new(
            self.r * (1.0 - t) + other.r * t,
            self.g * (1.0 - t) + other.g * t,
            self.b * (1.0 - t) + other.b * t,
        )
    }

    /// 8-bit channels, rounded and clamped.
    pub fn to_u8(self) -> [u8; 3] {
        let q = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

impl From<[f64; 3]> for Rgb {
    fn from(c: [f64; 3]) -> Self {
        Rgb::new(c[0], c[1], c[2])
    }
}

impl From<colorous::Color> for Rgb {
    fn from(c: colorous::Color) -> Self {
        Rgb::new(c.r as f64 / 255.0, c.g as f64 / 255.0, c.b as f64 / 255.0)
    }
}

impl From<Rgb> for (f64, f64, f64) {
    fn from(c: Rgb) -> Self {
        (c.r, c.g, c.b)
    }
}

/// Palettes selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedPalette {
    Plasma,
    Viridis,
    Inferno,
    Magma,
    Hot,
    Grey,
}

impl NamedPalette {
    pub fn all() -> &'static [NamedPalette] {
        &[
            NamedPalette::Plasma,
            NamedPalette::Viridis,
            NamedPalette::Inferno,
            NamedPalette::Magma,
            NamedPalette::Hot,
            NamedPalette::Grey,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            NamedPalette::Plasma => "Plasma",
            NamedPalette::Viridis => "Viridis",
            NamedPalette::Inferno => "Inferno",
            NamedPalette::Magma => "Magma",
            NamedPalette::Hot => "Hot",
            NamedPalette::Grey => "Grey",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<NamedPalette> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Matplotlib 256-entry lookup table, for the perceptual palettes.
    fn gradient(self) -> Option<colorous::Gradient> {
        match self {
            NamedPalette::Plasma => Some(colorous::PLASMA),
            NamedPalette::Viridis => Some(colorous::VIRIDIS),
            NamedPalette::Inferno => Some(colorous::INFERNO),
            NamedPalette::Magma => Some(colorous::MAGMA),
            NamedPalette::Hot | NamedPalette::Grey => None,
        }
    }

    /// Piecewise-linear stops as (position, 0xRRGGBB), positions increasing over [0, 1].
    fn anchors(self) -> &'static [(f64, u32)] {
        match self {
            NamedPalette::Hot => &[
                (0.0, 0x000000),
                (0.375, 0xff0000),
                (0.75, 0xffff00),
                (1.0, 0xffffff),
            ],
            _ => &[(0.0, 0x000000), (1.0, 0xffffff)],
        }
    }

    fn sample(self, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        if let Some(gradient) = self.gradient() {
            return gradient.eval_continuous(t).into();
        }

        let anchors = self.anchors();
        for pair in anchors.windows(2) {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            if t <= t1 {
                let local = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                return Rgb::from_hex(c0).lerp(Rgb::from_hex(c1), local);
            }
        }
        Rgb::from_hex(anchors[anchors.len() - 1].1)
    }
}

/// Ordered, non-empty sequence of discrete colors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorRamp {
    colors: Vec<Rgb>,
}

impl ColorRamp {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.is_empty() {
            return Err(SemioError::EmptyRamp);
        }
        Ok(Self { colors })
    }

    /// Named palette sampled to `size` evenly spaced entries.
    pub fn from_palette(palette: NamedPalette, size: usize) -> Result<Self> {
        let colors = match size {
            0 => Vec::new(),
            1 => vec![palette.sample(0.0)],
            n => (0..n)
                .map(|i| palette.sample(i as f64 / (n - 1) as f64))
                .collect(),
        };
        Self::new(colors)
    }

    pub fn named(name: &str) -> Result<Self> {
        let palette = NamedPalette::from_name(name)
            .ok_or_else(|| SemioError::UnknownPalette(name.to_string()))?;
        Self::from_palette(palette, NAMED_RAMP_SIZE)
    }

    /// Colors of a color table in label order; alpha is ignored.
    pub fn from_color_table(table: &ColorTable) -> Result<Self> {
        Self::new(table.entries_by_label().map(|e| e.color).collect())
    }

    /// Resolves a palette name first, then falls back to a color-table file.
    pub fn resolve(palette: &str) -> Result<Self> {
        match Self::named(palette) {
            Ok(ramp) => Ok(ramp),
            Err(SemioError::UnknownPalette(_)) if Path::new(palette).is_file() => {
                Self::from_color_table(&read_color_table(palette)?)
            }
            Err(e) => Err(e),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.colors.get(index).copied()
    }

    pub fn first(&self) -> Rgb {
        self.colors[0]
    }

    pub fn last(&self) -> Rgb {
        self.colors[self.colors.len() - 1]
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }
}
