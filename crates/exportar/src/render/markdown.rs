//! Markdown renderer.
//!
//! Captures PNGs next to the output file and emits one section per
//! slide: an image reference for every click state, followed by the
//! slide's speaker notes. Sections are separated by `---` rules.

use super::{capture_plan, capture_state_png, ensure_parent_dir, Artifact, ExportOutcome};
use crate::deck::{Slide, SlideDeck};
use crate::options::ExportOptions;
use crate::page::PageDriver;
use crate::progress::ExportProgress;
use crate::result::ExportResult;
use std::collections::BTreeMap;

/// Section separator between slides
const SECTION_SEPARATOR: &str = "\n---\n\n";

/// One slide section: image per click state, then the note
#[must_use]
pub(crate) fn slide_section(slide: &Slide, image_files: &[String]) -> String {
    let title = slide.title.as_deref().unwrap_or_default();
    let mut section = String::new();
    for file in image_files {
        section.push_str(&format!("![{title}](./{file})\n\n"));
    }
    if let Some(ref note) = slide.note {
        section.push_str(note.trim_end());
        section.push('\n');
    }
    section
}

/// Assemble the bundle from per-slide sections
#[must_use]
pub(crate) fn assemble(sections: &[String]) -> String {
    sections.join(SECTION_SEPARATOR)
}

/// Render the deck to a Markdown bundle
pub async fn render<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    slide_range: &[u32],
    progress: &ExportProgress,
) -> ExportResult<ExportOutcome> {
    ensure_parent_dir(&options.output)?;
    let image_dir = options
        .output
        .parent()
        .map_or_else(|| std::path::PathBuf::from("."), std::path::Path::to_path_buf);

    page.set_viewport(options.width, options.height, options.scale)
        .await?;

    let mut warnings = Vec::new();
    let mut images_by_slide: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for state in capture_plan(deck, slide_range, options.clicks_enabled()) {
        let png = capture_state_png(page, options, state, &mut warnings).await?;
        let name = format!("{}.png", state.file_stem());
        std::fs::write(image_dir.join(&name), png)?;
        images_by_slide.entry(state.no).or_default().push(name);
        progress.inc();
    }

    let mut sections = Vec::new();
    for &no in slide_range {
        if let (Some(slide), Some(files)) = (deck.get(no), images_by_slide.get(&no)) {
            sections.push(slide_section(slide, files));
        }
    }
    std::fs::write(&options.output, assemble(&sections))?;

    progress.finish(format!("wrote {}", options.output.display()));
    Ok(ExportOutcome {
        artifact: Artifact::File(options.output.clone()),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Frontmatter;

    fn slide(no: u32, title: Option<&str>, note: Option<&str>) -> Slide {
        Slide {
            no,
            title: title.map(String::from),
            title_level: 1,
            note: note.map(String::from),
            clicks: 0,
            frontmatter: Frontmatter::default(),
        }
    }

    #[test]
    fn test_section_with_title_and_note() {
        let s = slide(1, Some("Intro"), Some("welcome everyone"));
        let section = slide_section(&s, &["01.png".to_string()]);
        assert_eq!(section, "![Intro](./01.png)\n\nwelcome everyone\n");
    }

    #[test]
    fn test_section_with_click_states() {
        let s = slide(2, Some("Build"), None);
        let section = slide_section(
            &s,
            &["02.png".to_string(), "02-1.png".to_string()],
        );
        assert_eq!(section, "![Build](./02.png)\n\n![Build](./02-1.png)\n\n");
    }

    #[test]
    fn test_untitled_slide_gets_empty_alt() {
        let s = slide(3, None, None);
        let section = slide_section(&s, &["03.png".to_string()]);
        assert!(section.starts_with("![](./03.png)"));
    }

    #[test]
    fn test_assemble_separates_sections_with_rules() {
        let joined = assemble(&["a\n".to_string(), "b\n".to_string()]);
        assert_eq!(joined, "a\n\n---\n\nb\n");
    }
}
