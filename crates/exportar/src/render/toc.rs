//! Table-of-contents construction.
//!
//! Every titled slide becomes one TOC entry. Entries nest by title
//! level: a deeper entry descends under the previous sibling when that
//! sibling is shallower, otherwise it joins at the current level.
//! Slides marked `hideInToc` stay in the tree (their children must still
//! find their parent) but are flagged, and the PDF writer renders them
//! collapsed.

use crate::deck::Slide;

/// One node of the TOC tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Slide number
    pub no: u32,
    /// 1-based page in the produced document
    pub page: u32,
    /// Slide title
    pub title: String,
    /// Title heading level (1 = top)
    pub level: u32,
    /// Excluded from display (`hideInToc`)
    pub hidden: bool,
    /// Nested entries
    pub children: Vec<TocEntry>,
}

/// Build the TOC tree from `(slide, page)` pairs.
///
/// `page` is the 1-based page the slide starts on in the final document
/// (per-slide exports with clicks produce several pages per slide; the
/// entry points at the first).
#[must_use]
pub fn build_toc(slides: &[(&Slide, u32)]) -> Vec<TocEntry> {
    let mut roots: Vec<TocEntry> = Vec::new();
    // Path of indices from the roots down to the entry new nodes attach under
    let mut path: Vec<usize> = Vec::new();

    for &(slide, page) in slides {
        let Some(title) = slide.title.as_deref() else {
            continue;
        };
        let entry = TocEntry {
            no: slide.no,
            page,
            title: title.to_string(),
            level: slide.title_level,
            hidden: slide.frontmatter.hide_in_toc,
            children: Vec::new(),
        };

        // Walk back up until the entry at the top of the path is
        // shallower than the new one.
        while !path.is_empty() {
            let candidate = level_at(&roots, &path);
            if candidate < entry.level {
                break;
            }
            path.pop();
        }

        if path.is_empty() {
            roots.push(entry);
            path.push(roots.len() - 1);
        } else {
            let parent = node_at_mut(&mut roots, &path);
            parent.children.push(entry);
            let idx = parent.children.len() - 1;
            path.push(idx);
        }
    }

    roots
}

/// Render the outline, one line per titled slide:
/// `"<1-based-page>|<'-' × (title_level-1)>|<title>"`.
#[must_use]
pub fn outline_lines(entries: &[TocEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    collect_lines(entries, &mut lines);
    lines
}

fn collect_lines(entries: &[TocEntry], lines: &mut Vec<String>) {
    for entry in entries {
        lines.push(format!(
            "{}|{}|{}",
            entry.page,
            "-".repeat(entry.level.saturating_sub(1) as usize),
            entry.title
        ));
        collect_lines(&entry.children, lines);
    }
}

fn level_at(roots: &[TocEntry], path: &[usize]) -> u32 {
    let mut node = &roots[path[0]];
    for &idx in &path[1..] {
        node = &node.children[idx];
    }
    node.level
}

fn node_at_mut<'a>(roots: &'a mut [TocEntry], path: &[usize]) -> &'a mut TocEntry {
    let mut node = &mut roots[path[0]];
    for &idx in &path[1..] {
        node = &mut node.children[idx];
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Frontmatter;

    fn slide(no: u32, title: &str, level: u32) -> Slide {
        Slide {
            no,
            title: Some(title.to_string()),
            title_level: level,
            note: None,
            clicks: 0,
            frontmatter: Frontmatter::default(),
        }
    }

    fn hidden_slide(no: u32, title: &str, level: u32) -> Slide {
        let mut s = slide(no, title, level);
        s.frontmatter.hide_in_toc = true;
        s
    }

    fn untitled(no: u32) -> Slide {
        Slide {
            no,
            title: None,
            title_level: 1,
            note: None,
            clicks: 0,
            frontmatter: Frontmatter::default(),
        }
    }

    #[test]
    fn test_flat_deck() {
        let a = slide(1, "A", 1);
        let b = slide(2, "B", 1);
        let toc = build_toc(&[(&a, 1), (&b, 2)]);
        assert_eq!(toc.len(), 2);
        assert!(toc.iter().all(|e| e.children.is_empty()));
    }

    #[test]
    fn test_deeper_level_nests_under_previous() {
        let a = slide(1, "A", 1);
        let a1 = slide(2, "A.1", 2);
        let a2 = slide(3, "A.2", 2);
        let b = slide(4, "B", 1);
        let toc = build_toc(&[(&a, 1), (&a1, 2), (&a2, 3), (&b, 4)]);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].title, "A");
        assert_eq!(toc[0].children.len(), 2);
        assert_eq!(toc[0].children[1].title, "A.2");
        assert_eq!(toc[1].title, "B");
    }

    #[test]
    fn test_level_jump_down_then_up() {
        let a = slide(1, "A", 1);
        let deep = slide(2, "deep", 3);
        let b = slide(3, "B", 2);
        let toc = build_toc(&[(&a, 1), (&deep, 2), (&b, 3)]);
        // "deep" descends under A; B (level 2) pops back up under A
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].children.len(), 2);
        assert_eq!(toc[0].children[0].title, "deep");
        assert_eq!(toc[0].children[1].title, "B");
    }

    #[test]
    fn test_untitled_slides_are_skipped() {
        let a = slide(1, "A", 1);
        let skip = untitled(2);
        let b = slide(3, "B", 1);
        let toc = build_toc(&[(&a, 1), (&skip, 2), (&b, 3)]);
        assert_eq!(toc.len(), 2);
    }

    #[test]
    fn test_hidden_slides_stay_in_tree_flagged() {
        let a = hidden_slide(1, "Secret", 1);
        let child = slide(2, "Child", 2);
        let toc = build_toc(&[(&a, 1), (&child, 2)]);
        assert_eq!(toc.len(), 1);
        assert!(toc[0].hidden);
        assert_eq!(toc[0].children.len(), 1);
        assert!(!toc[0].children[0].hidden);
    }

    #[test]
    fn test_outline_lines_format() {
        let a = slide(1, "A", 1);
        let a1 = slide(2, "A.1", 2);
        let b = slide(3, "B", 1);
        let toc = build_toc(&[(&a, 1), (&a1, 2), (&b, 3)]);
        assert_eq!(
            outline_lines(&toc),
            vec!["1||A".to_string(), "2|-|A.1".to_string(), "3||B".to_string()]
        );
    }

    #[test]
    fn test_outline_one_line_per_titled_slide() {
        let slides = [
            slide(1, "A", 1),
            slide(2, "B", 2),
            slide(3, "C", 3),
            hidden_slide(4, "D", 1),
        ];
        let pairs: Vec<(&Slide, u32)> =
            slides.iter().zip(1u32..).map(|(s, p)| (s, p)).collect();
        let toc = build_toc(&pairs);
        let lines = outline_lines(&toc);
        assert_eq!(lines.len(), 4);
        // Indentation tracks nesting depth
        assert_eq!(lines[1], "2|-|B");
        assert_eq!(lines[2], "3|--|C");
        assert_eq!(lines[3], "4||D");
    }

    #[test]
    fn test_pages_survive_click_multiplied_documents() {
        let a = slide(1, "A", 1);
        let b = slide(2, "B", 1);
        // Slide 1 occupies pages 1-3 (two clicks); slide 2 starts at 4
        let toc = build_toc(&[(&a, 1), (&b, 4)]);
        assert_eq!(toc[1].page, 4);
    }
}
