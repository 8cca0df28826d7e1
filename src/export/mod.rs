/// Pattern export - renders the note list as a Lua level table
use std::path::Path;

use tracing::info;

use crate::error::{EditorError, Result};
use crate::notes::Note;

/// Width of an annotated section, in seconds
pub const SECTION_SIZE: u32 = 8;

pub const DEFAULT_DIFFICULTY: &str = "Custom";
pub const DEFAULT_BPM: u32 = 120;

/// Metadata written at the top of the pattern file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMeta {
    pub name: String,
    pub difficulty: String,
    pub bpm: u32,
}

impl PatternMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn audio_path(&self) -> String {
        format!("assets/{}.mp3", self.name)
    }
}

impl Default for PatternMeta {
    fn default() -> Self {
        Self {
            name: "untitled".to_string(),
            difficulty: DEFAULT_DIFFICULTY.to_string(),
            bpm: DEFAULT_BPM,
        }
    }
}

/// Label for a section holding `density` notes
pub fn pattern_label(density: usize) -> &'static str {
    if density > 12 {
        "Intense Pattern"
    } else if density > 8 {
        "Complex Sequence"
    } else if density > 4 {
        "Basic Pattern"
    } else {
        "Simple Sequence"
    }
}

fn section_of(note: &Note) -> u32 {
    note.centis() / (SECTION_SIZE * 100)
}

/// Notes falling in `[start, start + SECTION_SIZE)` across the whole list
fn section_density(notes: &[Note], section: u32) -> usize {
    notes.iter().filter(|n| section_of(n) == section).count()
}

/// Track name for a chosen file: its name without the extension
pub fn track_name_from_filename(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(file)
        .to_string()
}

fn lua_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render `notes` (already time-ordered) as a Lua pattern table.
///
/// A comment block opens every section whose index is above the previous
/// note's; sections without notes get none. Density is counted over the
/// whole list.
pub fn export(notes: &[Note], meta: &PatternMeta) -> Result<String> {
    if notes.is_empty() {
        return Err(EditorError::EmptyStore);
    }

    let out = render_pattern(notes, meta);
    info!(notes = notes.len(), name = %meta.name, "pattern exported");
    Ok(out)
}

fn render_pattern(notes: &[Note], meta: &PatternMeta) -> String {
    let mut out = String::from("return {\n");
    out.push_str(&format!("    name = {},\n", lua_string(&meta.name)));
    out.push_str(&format!("    audio = {},\n", lua_string(&meta.audio_path())));
    out.push_str(&format!("    difficulty = {},\n", lua_string(&meta.difficulty)));
    out.push_str(&format!("    bpm = {},\n", meta.bpm));
    out.push_str("    arrows = {\n");

    let mut current: Option<u32> = None;
    for (index, note) in notes.iter().enumerate() {
        let section = section_of(note);
        if current.map_or(true, |c| section > c) {
            current = Some(section);
            let start = section * SECTION_SIZE;
            let end = start + SECTION_SIZE;

            out.push('\n');
            out.push_str(&format!("        -- {}-{} seconds\n", start, end));
            out.push_str(&format!(
                "        -- {}\n",
                pattern_label(section_density(notes, section))
            ));
        }

        let sep = if index + 1 < notes.len() { "," } else { "" };
        out.push_str(&format!(
            "        {{time = {}, direction = \"{}\"}}{}\n",
            note.time_label(),
            note.direction().label(),
            sep
        ));
    }

    out.push_str("    }\n}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::Direction;

    fn notes_at(times: &[f64]) -> Vec<Note> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| Note::new(*t, Direction::ALL[i % 4]))
            .collect()
    }

    #[test]
    fn test_empty_store_fails() {
        assert_eq!(
            export(&[], &PatternMeta::new("song")),
            Err(EditorError::EmptyStore)
        );
    }

    #[test]
    fn test_document_shape() {
        let notes = vec![
            Note::new(0.5, Direction::Left),
            Note::new(0.7, Direction::Down),
        ];
        let doc = export(&notes, &PatternMeta::new("song")).unwrap();
        let expected = "return {
    name = \"song\",
    audio = \"assets/song.mp3\",
    difficulty = \"Custom\",
    bpm = 120,
    arrows = {

        -- 0-8 seconds
        -- Simple Sequence
        {time = 0.50, direction = \"left\"},
        {time = 0.70, direction = \"down\"}
    }
}";
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_section_labels() {
        let mut times: Vec<f64> = (0..13).map(|i| i as f64 * 0.5).collect();
        times.extend([8.0, 9.0, 10.0, 11.0, 12.0]);
        let doc = export(&notes_at(&times), &PatternMeta::new("song")).unwrap();

        assert!(doc.contains("        -- 0-8 seconds\n        -- Intense Pattern\n"));
        assert!(doc.contains("        -- 8-16 seconds\n        -- Basic Pattern\n"));
    }

    #[test]
    fn test_label_thresholds() {
        assert_eq!(pattern_label(0), "Simple Sequence");
        assert_eq!(pattern_label(4), "Simple Sequence");
        assert_eq!(pattern_label(5), "Basic Pattern");
        assert_eq!(pattern_label(8), "Basic Pattern");
        assert_eq!(pattern_label(9), "Complex Sequence");
        assert_eq!(pattern_label(12), "Complex Sequence");
        assert_eq!(pattern_label(13), "Intense Pattern");
    }

    #[test]
    fn test_empty_sections_not_annotated() {
        let doc = export(&notes_at(&[1.0, 30.0]), &PatternMeta::new("gap")).unwrap();
        assert!(doc.contains("-- 0-8 seconds"));
        assert!(doc.contains("-- 24-32 seconds"));
        assert!(!doc.contains("-- 8-16 seconds"));
        assert!(!doc.contains("-- 16-24 seconds"));
        assert_eq!(doc.matches(" seconds\n").count(), 2);
    }

    #[test]
    fn test_section_boundary_is_exclusive() {
        let doc = export(&notes_at(&[7.99, 8.0]), &PatternMeta::new("edge")).unwrap();
        let first = doc.find("-- 8-16 seconds").unwrap();
        let late = doc.find("{time = 7.99").unwrap();
        let boundary = doc.find("{time = 8.00").unwrap();
        assert!(late < first && first < boundary);
    }

    #[test]
    fn test_trailing_commas() {
        let doc = export(&notes_at(&[1.0, 2.0, 3.0]), &PatternMeta::new("s")).unwrap();
        let arrows: Vec<&str> = doc.lines().filter(|l| l.contains("{time")).collect();
        assert_eq!(arrows.len(), 3);
        assert!(arrows[0].ends_with("},"));
        assert!(arrows[1].ends_with("},"));
        assert!(arrows[2].ends_with('}'));
        assert!(doc.ends_with("    }\n}"));
    }

    #[test]
    fn test_export_is_deterministic() {
        let notes = notes_at(&[0.25, 4.0, 9.5, 17.0]);
        let meta = PatternMeta::new("same");
        assert_eq!(export(&notes, &meta), export(&notes, &meta));
    }

    #[test]
    fn test_name_is_escaped() {
        let doc = export(&notes_at(&[1.0]), &PatternMeta::new("say \"hi\"")).unwrap();
        assert!(doc.contains("name = \"say \\\"hi\\\"\","));
    }

    #[test]
    fn test_track_name_from_filename() {
        assert_eq!(track_name_from_filename("song.mp3"), "song");
        assert_eq!(track_name_from_filename("/music/My Track.flac"), "My Track");
        assert_eq!(track_name_from_filename("noext"), "noext");
    }
}
