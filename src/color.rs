//! Pixel colors and their wire encoding.

/// An opaque 8-bit RGB color. Alpha never reaches the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb { pub r: u8, pub g: u8, pub b: u8 }

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 0xFF, g: 0xFF, b: 0xFF };

    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Straight 16-bit RGBA: premultiply by alpha, then keep the high byte.
    /// A fully transparent pixel is black.
    pub fn from_rgba16(r: u16, g: u16, b: u16, a: u16) -> Self {
        let premul = |c: u16| ((u32::from(c) * u32::from(a) / 0xFFFF) >> 8) as u8;
        Self { r: premul(r), g: premul(g), b: premul(b) }
    }

    /// Six uppercase hex digits, no prefix.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn is_white(&self) -> bool { *self == Self::WHITE }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}
