//! Background-color parsing and the light/dark text decision for event chips.

/// Text color chosen to stay readable against an event background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColor {
    Dark,
    Light,
}

impl TextColor {
    /// Pick a text color for the given CSS background color.
    ///
    /// Translucent colors are blended over an assumed white canvas before
    /// the luminance check. Unparseable input counts as a not-light
    /// background, so the text falls back to light.
    pub fn for_background(color: &str) -> TextColor {
        match Rgba::parse(color) {
            Some(rgba) if rgba.over_white().luminance() > 0.6 => TextColor::Dark,
            _ => TextColor::Light,
        }
    }

    /// CSS value for this choice
    pub fn css(&self) -> &'static str {
        match self {
            TextColor::Dark => "#212529",
            TextColor::Light => "#ffffff",
        }
    }
}

/// A color parsed from a CSS color string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    /// Parse `#RRGGBB`, `#RRGGBBAA`, `rgb(r, g, b)` or `rgba(r, g, b, a)`.
    /// Anything else is `None`; this never panics.
    pub fn parse(s: &str) -> Option<Rgba> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Rgba::parse_hex(hex);
        }
        if let Some(body) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            return Rgba::parse_components(body, true);
        }
        if let Some(body) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            return Rgba::parse_components(body, false);
        }
        None
    }

    fn parse_hex(hex: &str) -> Option<Rgba> {
        // Byte indexing below requires ASCII
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        let a = if hex.len() == 8 {
            u8::from_str_radix(&hex[6..8], 16).ok()? as f32 / 255.0
        } else {
            1.0
        };
        Some(Rgba { r, g, b, a })
    }

    fn parse_components(body: &str, with_alpha: bool) -> Option<Rgba> {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let expected = if with_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return None;
        }
        let r = parts[0].parse().ok()?;
        let g = parts[1].parse().ok()?;
        let b = parts[2].parse().ok()?;
        let a = if with_alpha { parts[3].parse().ok()? } else { 1.0 };
        Some(Rgba { r, g, b, a })
    }

    /// Blend over an assumed white canvas when translucent
    pub fn over_white(&self) -> Rgba {
        if self.a >= 1.0 {
            return *self;
        }
        let blend =
            |c: u8| (c as f32 * self.a + 255.0 * (1.0 - self.a)).round().clamp(0.0, 255.0) as u8;
        Rgba {
            r: blend(self.r),
            g: blend(self.g),
            b: blend(self.b),
            a: 1.0,
        }
    }

    /// Perceptual luminance in `0.0..=1.0`
    pub fn luminance(&self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) / 255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== parsing tests ==========

    #[test]
    fn test_parse_six_digit_hex() {
        let c = Rgba::parse("#dce6f4").unwrap();
        assert_eq!((c.r, c.g, c.b), (0xdc, 0xe6, 0xf4));
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_parse_eight_digit_hex_has_alpha() {
        let c = Rgba::parse("#ffffff22").unwrap();
        assert_eq!((c.r, c.g, c.b), (255, 255, 255));
        assert!((c.a - 0x22 as f32 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_hex_is_case_insensitive() {
        assert_eq!(Rgba::parse("#DCE6F4"), Rgba::parse("#dce6f4"));
    }

    #[test]
    fn test_parse_rejects_odd_hex_lengths() {
        assert!(Rgba::parse("#fff").is_none());
        assert!(Rgba::parse("#ffff").is_none());
        assert!(Rgba::parse("#fffffff").is_none());
        assert!(Rgba::parse("#").is_none());
    }

    #[test]
    fn test_parse_rejects_non_hex_digits() {
        assert!(Rgba::parse("#gghhii").is_none());
    }

    #[test]
    fn test_parse_rejects_non_ascii_without_panicking() {
        assert!(Rgba::parse("#ééé").is_none());
        assert!(Rgba::parse("#ffffé").is_none());
    }

    #[test]
    fn test_parse_rgb_function() {
        let c = Rgba::parse("rgb(220, 230, 244)").unwrap();
        assert_eq!((c.r, c.g, c.b), (220, 230, 244));
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_parse_rgba_function() {
        let c = Rgba::parse("rgba(0, 0, 0, 0.5)").unwrap();
        assert_eq!((c.r, c.g, c.b), (0, 0, 0));
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        assert!(Rgba::parse("rgb(1, 2)").is_none());
        assert!(Rgba::parse("rgb(1, 2, 3, 4)").is_none());
        assert!(Rgba::parse("rgba(1, 2, 3)").is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Rgba::parse("").is_none());
        assert!(Rgba::parse("cornflowerblue").is_none());
        assert!(Rgba::parse("hsl(200, 50%, 50%)").is_none());
    }

    // ========== blending and luminance tests ==========

    #[test]
    fn test_over_white_keeps_opaque_colors() {
        let c = Rgba::parse("#336699").unwrap();
        assert_eq!(c.over_white(), c);
    }

    #[test]
    fn test_over_white_fades_toward_white() {
        let c = Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: 0.5,
        };
        let blended = c.over_white();
        assert_eq!((blended.r, blended.g, blended.b), (128, 128, 128));
        assert_eq!(blended.a, 1.0);
    }

    #[test]
    fn test_luminance_extremes() {
        assert_eq!(Rgba::parse("#000000").unwrap().luminance(), 0.0);
        assert!((Rgba::parse("#ffffff").unwrap().luminance() - 1.0).abs() < 1e-5);
    }

    // ========== text color decision tests ==========

    #[test]
    fn test_black_background_gets_light_text() {
        assert_eq!(TextColor::for_background("#000000"), TextColor::Light);
    }

    #[test]
    fn test_white_background_gets_dark_text() {
        assert_eq!(TextColor::for_background("#FFFFFF"), TextColor::Dark);
    }

    #[test]
    fn test_translucent_white_stays_light_background() {
        // The single-day chip idiom: color + "22" alpha over a white page
        assert_eq!(TextColor::for_background("#ffffff22"), TextColor::Dark);
    }

    #[test]
    fn test_translucent_dark_blends_light() {
        // Even a dark color at 13% alpha reads as a light background
        assert_eq!(TextColor::for_background("#00000022"), TextColor::Dark);
    }

    #[test]
    fn test_neutral_default_gray_gets_dark_text() {
        assert_eq!(TextColor::for_background("#e9ecef"), TextColor::Dark);
    }

    #[test]
    fn test_rgb_strings_work() {
        assert_eq!(
            TextColor::for_background("rgb(20, 20, 20)"),
            TextColor::Light
        );
        assert_eq!(
            TextColor::for_background("rgba(255, 255, 255, 0.9)"),
            TextColor::Dark
        );
    }

    #[test]
    fn test_unparseable_falls_back_to_light_text() {
        // Deliberate: unknown input is treated as a dark background
        assert_eq!(TextColor::for_background("bogus"), TextColor::Light);
        assert_eq!(TextColor::for_background(""), TextColor::Light);
    }
}
