// color.rs
//! HSV <-> RGB conversion between the host color model and the wire format.
//!
//! Host side: hue in degrees `[0, 360)`, saturation and brightness in percent
//! `[0, 100]`. Device side: 8-bit channels. Both directions round half away
//! from zero, so the same inputs always yield the same channels on both ends.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Hue and saturation as seen by the host. Brightness is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HueSaturation {
    pub hue: u16,
    pub saturation: u8,
}

fn to_channel(x: f64) -> u8 {
    (x * 255.0).round().clamp(0.0, 255.0) as u8
}

pub fn hsv_to_rgb(hue: f64, saturation: f64, brightness: f64) -> Rgb {
    let s = saturation.clamp(0.0, 100.0) / 100.0;
    let v = brightness.clamp(0.0, 100.0) / 100.0;
    let h = hue.rem_euclid(360.0) / 360.0;

    if s == 0.0 {
        let c = to_channel(v);
        return Rgb::new(c, c, c);
    }

    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Rgb::new(to_channel(r), to_channel(g), to_channel(b))
}

pub fn rgb_to_hsv(red: u8, green: u8, blue: u8) -> HueSaturation {
    let r = f64::from(red) / 255.0;
    let g = f64::from(green) / 255.0;
    let b = f64::from(blue) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let saturation = if max == 0.0 { 0.0 } else { diff / max };

    let sector = if diff == 0.0 {
        0.0
    } else if max == r {
        (g - b) / diff + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / diff + 2.0
    } else {
        (r - g) / diff + 4.0
    };
    let hue = sector / 6.0;

    // 359.5 and up rounds onto 360, which is the same hue as 0
    HueSaturation {
        hue: ((hue * 360.0).round() as u16) % 360,
        saturation: (saturation * 100.0).round() as u8,
    }
}
