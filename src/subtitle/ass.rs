//! Advanced SubStation Alpha (ASS) serialization.
//!
//! ffmpeg's `subtitles` filter renders ASS through libass, which gives us
//! per-word colour overrides that plain SRT cannot express.

use super::{SubtitleClip, SubtitleStyle, SubtitleTrack};
use crate::error::{ReelError, Result};
use std::fmt::Write as _;
use std::path::Path;

const STYLE_NAME: &str = "Reel";

/// Convert a colour name or `#RRGGBB[AA]` hex string to ASS `&HAABBGGRR`.
///
/// `alpha` is ASS transparency: 0 is opaque, 255 fully transparent.
pub fn to_ass_color(color: &str, alpha: u8) -> Result<String> {
    let (r, g, b) = parse_rgb(color)?;
    Ok(format!("&H{:02X}{:02X}{:02X}{:02X}", alpha, b, g, r))
}

fn parse_rgb(color: &str) -> Result<(u8, u8, u8)> {
    let value = color.trim().to_ascii_lowercase();
    let named = match value.as_str() {
        "white" => Some((255, 255, 255)),
        "black" => Some((0, 0, 0)),
        "yellow" => Some((255, 255, 0)),
        "red" => Some((255, 0, 0)),
        "green" => Some((0, 128, 0)),
        "lime" => Some((0, 255, 0)),
        "blue" => Some((0, 0, 255)),
        "cyan" => Some((0, 255, 255)),
        "magenta" => Some((255, 0, 255)),
        "orange" => Some((255, 165, 0)),
        "gray" | "grey" => Some((128, 128, 128)),
        _ => None,
    };
    if let Some(rgb) = named {
        return Ok(rgb);
    }

    let hex = value.strip_prefix('#').unwrap_or(&value);
    if (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
            return Ok((r, g, b));
        }
    }
    Err(ReelError::Config(format!("unsupported subtitle colour '{}'", color)))
}

/// ASS transparency for a background opacity in [0, 1].
fn opacity_to_alpha(opacity: f64) -> u8 {
    ((1.0 - opacity.clamp(0.0, 1.0)) * 255.0).round() as u8
}

/// Format seconds as `H:MM:SS.cc`.
pub(crate) fn format_ass_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = (centis / 6_000) % 60;
    let secs = (centis / 100) % 60;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis % 100)
}

/// Make a word safe for an ASS dialogue line.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\u{29F5}")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace(['\n', '\r'], " ")
}

/// A subtitle track laid out for a specific frame size.
pub struct AssScript<'a> {
    track: &'a SubtitleTrack,
    width: u32,
    height: u32,
}

impl<'a> AssScript<'a> {
    pub fn new(track: &'a SubtitleTrack, width: u32, height: u32) -> Self {
        Self { track, width, height }
    }

    fn style_line(&self, style: &SubtitleStyle) -> Result<String> {
        let primary = to_ass_color(&style.text_color, 0)?;
        let secondary = to_ass_color(&style.highlight_color, 0)?;
        let boxed = style.background_opacity > 0.0;
        let (border_style, outline_colour, back_colour) = if boxed {
            let box_colour = to_ass_color("black", opacity_to_alpha(style.background_opacity))?;
            (3, box_colour.clone(), box_colour)
        } else {
            (1, to_ass_color(&style.outline_color, 0)?, to_ass_color("black", 255)?)
        };
        let margin_side = (self.width as f64 * style.side_margin).round() as u32;
        let margin_v = (self.height as f64 * (1.0 - style.position)).round().max(0.0) as u32;

        Ok(format!(
            "Style: {},{},{},{},{},{},{},0,0,0,0,100,100,0,0,{},{},0,2,{},{},{},1",
            STYLE_NAME,
            style.font,
            style.font_size,
            primary,
            secondary,
            outline_colour,
            back_colour,
            border_style,
            style.outline_width,
            margin_side,
            margin_side,
            margin_v,
        ))
    }

    fn dialogue_text(clip: &SubtitleClip, highlight: &str) -> String {
        clip.words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let word = escape_text(word);
                if i == clip.highlighted {
                    format!("{{\\c{}&}}{}{{\\r}}", highlight, word)
                } else {
                    word
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render the full script.
    pub fn render(&self) -> Result<String> {
        let style = &self.track.style;
        // Inline colour overrides use &HBBGGRR without the alpha byte.
        let highlight = to_ass_color(&style.highlight_color, 0)?.replacen("&H00", "&H", 1);

        let mut out = String::new();
        let _ = writeln!(out, "[Script Info]");
        let _ = writeln!(out, "ScriptType: v4.00+");
        let _ = writeln!(out, "PlayResX: {}", self.width);
        let _ = writeln!(out, "PlayResY: {}", self.height);
        let _ = writeln!(out, "WrapStyle: 0");
        let _ = writeln!(out, "ScaledBorderAndShadow: yes");
        let _ = writeln!(out);
        let _ = writeln!(out, "[V4+ Styles]");
        let _ = writeln!(
            out,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
        );
        let _ = writeln!(out, "{}", self.style_line(style)?);
        let _ = writeln!(out);
        let _ = writeln!(out, "[Events]");
        let _ = writeln!(
            out,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        );
        for clip in &self.track.clips {
            let _ = writeln!(
                out,
                "Dialogue: 0,{},{},{},,0,0,0,,{}",
                format_ass_time(clip.start),
                format_ass_time(clip.end),
                STYLE_NAME,
                Self::dialogue_text(clip, &highlight),
            );
        }
        Ok(out)
    }
}

/// Write `track` as an ASS file sized for a `width` x `height` frame.
pub fn write_ass(track: &SubtitleTrack, width: u32, height: u32, path: &Path) -> Result<()> {
    let script = AssScript::new(track, width, height).render()?;
    std::fs::write(path, script)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> SubtitleTrack {
        let words: Vec<String> = ["Hello", "{world}"].iter().map(|s| s.to_string()).collect();
        SubtitleTrack {
            clips: vec![
                SubtitleClip { words: words.clone(), highlighted: 0, start: 0.0, end: 0.5 },
                SubtitleClip { words, highlighted: 1, start: 0.5, end: 62.35 },
            ],
            style: SubtitleStyle::default(),
        }
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(to_ass_color("yellow", 0).unwrap(), "&H0000FFFF");
        assert_eq!(to_ass_color("#FF8000", 0x80).unwrap(), "&H800080FF");
        assert_eq!(to_ass_color("White", 0).unwrap(), "&H00FFFFFF");
        assert!(matches!(to_ass_color("chartreuse-ish", 0), Err(ReelError::Config(_))));
    }

    #[test]
    fn test_time_format() {
        assert_eq!(format_ass_time(0.0), "0:00:00.00");
        assert_eq!(format_ass_time(62.35), "0:01:02.35");
        assert_eq!(format_ass_time(3723.5), "1:02:03.50");
    }

    #[test]
    fn test_opacity_alpha() {
        assert_eq!(opacity_to_alpha(0.5), 128);
        assert_eq!(opacity_to_alpha(1.0), 0);
        assert_eq!(opacity_to_alpha(0.0), 255);
    }

    #[test]
    fn test_render_script() {
        let script = AssScript::new(&track(), 1080, 1920).render().unwrap();

        assert!(script.contains("PlayResX: 1080"));
        assert!(script.contains("PlayResY: 1920"));
        assert!(script.contains(
            "Style: Reel,Arial,40,&H00FFFFFF,&H0000FFFF,&H80000000,&H80000000,0,0,0,0,100,100,0,0,3,1,0,2,54,54,384,1"
        ));
        assert!(script.contains(
            "Dialogue: 0,0:00:00.00,0:00:00.50,Reel,,0,0,0,,{\\c&H00FFFF&}Hello{\\r} \\{world\\}"
        ));
        assert!(script.contains("Dialogue: 0,0:00:00.50,0:01:02.35,Reel,,0,0,0,,Hello {\\c&H00FFFF&}\\{world\\}{\\r}"));
    }

    #[test]
    fn test_write_ass_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.ass");
        write_ass(&track(), 720, 1280, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[Script Info]"));
        assert_eq!(content.matches("Dialogue:").count(), 2);
    }
}
