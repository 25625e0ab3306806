//! Fill-color parsing for text drawn on the surface.

use image::Rgba;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 0xff]);

/// Parse a CSS-style color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
/// `rgb(r, g, b)`, `rgba(r, g, b, a)` or a basic named color.
///
/// Returns `None` for anything the surface would reject.
pub fn parse_color(input: &str) -> Option<Rgba<u8>> {
    let value = input.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_args(args);
    }
    named(&value)
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 0xff])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 0xff])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba<u8>> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let mut rgba = [0u8, 0, 0, 0xff];
    for (slot, part) in rgba.iter_mut().zip(parts.iter().take(3)) {
        *slot = channel(part)?;
    }
    if let Some(alpha) = parts.get(3) {
        rgba[3] = alpha_channel(alpha)?;
    }
    Some(Rgba(rgba))
}

fn channel(part: &str) -> Option<u8> {
    if let Some(pct) = part.strip_suffix('%') {
        let v: f32 = pct.parse().ok()?;
        return Some((v.clamp(0.0, 100.0) * 2.55).round() as u8);
    }
    let v: f32 = part.parse().ok()?;
    Some(v.clamp(0.0, 255.0).round() as u8)
}

fn alpha_channel(part: &str) -> Option<u8> {
    let v: f32 = match part.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok()? / 100.0,
        None => part.parse().ok()?,
    };
    Some((v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[rustfmt::skip]
fn named(name: &str) -> Option<Rgba<u8>> {
    let rgb = match name {
        "black" => [0x00, 0x00, 0x00],
        "white" => [0xff, 0xff, 0xff],
        "red" => [0xff, 0x00, 0x00],
        "green" => [0x00, 0x80, 0x00],
        "lime" => [0x00, 0xff, 0x00],
        "blue" => [0x00, 0x00, 0xff],
        "navy" => [0x00, 0x00, 0x80],
        "yellow" => [0xff, 0xff, 0x00],
        "gold" => [0xff, 0xd7, 0x00],
        "orange" => [0xff, 0xa5, 0x00],
        "purple" => [0x80, 0x00, 0x80],
        "pink" => [0xff, 0xc0, 0xcb],
        "brown" => [0xa5, 0x2a, 0x2a],
        "gray" | "grey" => [0x80, 0x80, 0x80],
        "silver" => [0xc0, 0xc0, 0xc0],
        "maroon" => [0x80, 0x00, 0x00],
        "teal" => [0x00, 0x80, 0x80],
        "olive" => [0x80, 0x80, 0x00],
        "cyan" | "aqua" => [0x00, 0xff, 0xff],
        "magenta" | "fuchsia" => [0xff, 0x00, 0xff],
        "transparent" => return Some(Rgba([0, 0, 0, 0])),
        _ => return None,
    };
    Some(Rgba([rgb[0], rgb[1], rgb[2], 0xff]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        assert_eq!(parse_color("#000000"), Some(BLACK));
        assert_eq!(parse_color("#f80"), Some(Rgba([0xff, 0x88, 0x00, 0xff])));
        assert_eq!(parse_color("#11223344"), Some(Rgba([0x11, 0x22, 0x33, 0x44])));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#gggggg"), None);
    }

    #[test]
    fn functional_forms() {
        assert_eq!(parse_color("rgb(255, 0, 10)"), Some(Rgba([255, 0, 10, 255])));
        assert_eq!(parse_color("rgba(0,0,0,0.5)"), Some(Rgba([0, 0, 0, 128])));
        assert_eq!(parse_color("rgb(100% 0% 0% / 50%)"), Some(Rgba([255, 0, 0, 128])));
        assert_eq!(parse_color("rgb(1,2)"), None);
    }

    #[test]
    fn named_colors_are_case_insensitive() {
        assert_eq!(parse_color(" White "), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("not-a-color"), None);
    }
}
