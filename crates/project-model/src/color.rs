//! Colour strings used by text overlays.

use std::fmt;
use std::str::FromStr;

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Rgba8 = Rgba8::rgb(255, 255, 255);
    pub const BLACK: Rgba8 = Rgba8::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Copy with alpha scaled by `factor` in `[0, 1]`.
    pub fn with_opacity(self, factor: f64) -> Self {
        let a = (self.a as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

/// Colour string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised colour {0:?}")]
pub struct ColorParseError(pub String);

impl FromStr for Rgba8 {
    type Err = ColorParseError;

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and a few CSS names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ColorParseError(s.to_string());

        if let Some(hex) = raw.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(err());
            }
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            return match hex.len() {
                3 => {
                    let nib = |i: usize| {
                        u8::from_str_radix(&hex[i..i + 1], 16)
                            .map(|v| v * 17)
                            .map_err(|_| err())
                    };
                    Ok(Rgba8::rgb(nib(0)?, nib(1)?, nib(2)?))
                }
                6 => Ok(Rgba8::rgb(byte(0)?, byte(2)?, byte(4)?)),
                8 => Ok(Rgba8::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
                _ => Err(err()),
            };
        }

        match raw.to_ascii_lowercase().as_str() {
            "white" => Ok(Rgba8::WHITE),
            "black" => Ok(Rgba8::BLACK),
            "red" => Ok(Rgba8::rgb(255, 0, 0)),
            "green" => Ok(Rgba8::rgb(0, 128, 0)),
            "blue" => Ok(Rgba8::rgb(0, 0, 255)),
            "yellow" => Ok(Rgba8::rgb(255, 255, 0)),
            "gray" | "grey" => Ok(Rgba8::rgb(128, 128, 128)),
            "transparent" => Ok(Rgba8::rgba(0, 0, 0, 0)),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Rgba8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!("#fff".parse::<Rgba8>().unwrap(), Rgba8::WHITE);
        assert_eq!("#1a1a1a".parse::<Rgba8>().unwrap(), Rgba8::rgb(26, 26, 26));
        assert_eq!(
            "#00000080".parse::<Rgba8>().unwrap(),
            Rgba8::rgba(0, 0, 0, 128)
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("White".parse::<Rgba8>().unwrap(), Rgba8::WHITE);
        assert_eq!(" black ".parse::<Rgba8>().unwrap(), Rgba8::BLACK);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("#12".parse::<Rgba8>().is_err());
        assert!("#gggggg".parse::<Rgba8>().is_err());
        assert!("chartreuse-ish".parse::<Rgba8>().is_err());
    }

    #[test]
    fn test_opacity_and_display() {
        let c = Rgba8::BLACK.with_opacity(0.5);
        assert_eq!(c.a, 128);
        assert_eq!(c.to_string(), "#00000080");
    }
}
