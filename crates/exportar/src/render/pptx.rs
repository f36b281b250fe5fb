//! PPTX renderer.
//!
//! Captures every slide state as an in-memory PNG (nothing touches disk
//! until the deck is assembled) and packages an image-per-slide OOXML
//! deck: one layout named `"<width>x<height>"` sized at 96 dpi, one
//! full-bleed picture per slide, a notes part where the source slide has
//! speaker notes, and core properties from the first slide's
//! frontmatter.

use super::{capture_plan, capture_state_png, ensure_parent_dir, Artifact, DeckMeta, ExportOutcome};
use crate::deck::SlideDeck;
use crate::options::ExportOptions;
use crate::page::PageDriver;
use crate::progress::ExportProgress;
use crate::result::{ExportError, ExportResult};
use std::io::Write;
use std::path::Path;

/// EMU per CSS pixel at 96 dpi (914400 EMU/inch ÷ 96 px/inch)
const EMU_PER_PX: u64 = 9_525;

/// One slide of the assembled deck
#[derive(Debug, Clone)]
pub struct PptxSlide {
    /// PNG background image
    pub image: Vec<u8>,
    /// Speaker notes, if any
    pub note: Option<String>,
}

/// An assembled image-per-slide deck
#[derive(Debug, Clone)]
pub struct PptxDeck {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Deck metadata
    pub meta: DeckMeta,
    /// Slides in order
    pub slides: Vec<PptxSlide>,
}

impl PptxDeck {
    /// The layout name, `"<width>x<height>"`
    #[must_use]
    pub fn layout_name(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    const fn cx(&self) -> u64 {
        self.width as u64 * EMU_PER_PX
    }

    const fn cy(&self) -> u64 {
        self.height as u64 * EMU_PER_PX
    }
}

/// Render the deck to a PPTX file
pub async fn render<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    slide_range: &[u32],
    progress: &ExportProgress,
) -> ExportResult<ExportOutcome> {
    page.set_viewport(options.width, options.height, options.scale)
        .await?;

    let mut warnings = Vec::new();
    let mut slides = Vec::new();
    for state in capture_plan(deck, slide_range, options.clicks_enabled()) {
        let image = capture_state_png(page, options, state, &mut warnings).await?;
        slides.push(PptxSlide {
            image,
            note: deck.get(state.no).and_then(|s| s.note.clone()),
        });
        progress.inc();
    }

    let assembled = PptxDeck {
        width: options.width,
        height: options.height,
        meta: DeckMeta::from_deck(deck),
        slides,
    };
    write_pptx(&assembled, &options.output)?;
    progress.finish(format!("wrote {}", options.output.display()));
    Ok(ExportOutcome {
        artifact: Artifact::File(options.output.clone()),
        warnings,
    })
}

/// Write the assembled deck as an OOXML package
pub fn write_pptx(deck: &PptxDeck, path: &Path) -> ExportResult<()> {
    if deck.slides.is_empty() {
        return Err(ExportError::Render {
            message: "pptx deck has no slides".to_string(),
        });
    }
    ensure_parent_dir(path)?;
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let opts = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut part = |zip: &mut zip::ZipWriter<std::fs::File>,
                    name: &str,
                    content: &[u8]|
     -> ExportResult<()> {
        zip.start_file(name, opts).map_err(zip_err)?;
        zip.write_all(content)?;
        Ok(())
    };

    part(&mut zip, "[Content_Types].xml", content_types(deck).as_bytes())?;
    part(&mut zip, "_rels/.rels", PACKAGE_RELS.as_bytes())?;
    part(&mut zip, "docProps/core.xml", core_props(&deck.meta).as_bytes())?;
    part(&mut zip, "docProps/app.xml", APP_PROPS.as_bytes())?;
    part(&mut zip, "ppt/presentation.xml", presentation(deck).as_bytes())?;
    part(
        &mut zip,
        "ppt/_rels/presentation.xml.rels",
        presentation_rels(deck).as_bytes(),
    )?;
    part(&mut zip, "ppt/theme/theme1.xml", THEME.as_bytes())?;
    part(&mut zip, "ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER.as_bytes())?;
    part(
        &mut zip,
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        SLIDE_MASTER_RELS.as_bytes(),
    )?;
    part(
        &mut zip,
        "ppt/slideLayouts/slideLayout1.xml",
        slide_layout(deck).as_bytes(),
    )?;
    part(
        &mut zip,
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        SLIDE_LAYOUT_RELS.as_bytes(),
    )?;
    part(&mut zip, "ppt/notesMasters/notesMaster1.xml", NOTES_MASTER.as_bytes())?;
    part(
        &mut zip,
        "ppt/notesMasters/_rels/notesMaster1.xml.rels",
        NOTES_MASTER_RELS.as_bytes(),
    )?;

    for (idx, slide) in deck.slides.iter().enumerate() {
        let n = idx + 1;
        part(
            &mut zip,
            &format!("ppt/media/image{n}.png"),
            &slide.image,
        )?;
        part(
            &mut zip,
            &format!("ppt/slides/slide{n}.xml"),
            slide_xml(deck).as_bytes(),
        )?;
        part(
            &mut zip,
            &format!("ppt/slides/_rels/slide{n}.xml.rels"),
            slide_rels(n, slide.note.is_some()).as_bytes(),
        )?;
        if let Some(ref note) = slide.note {
            part(
                &mut zip,
                &format!("ppt/notesSlides/notesSlide{n}.xml"),
                notes_slide(note).as_bytes(),
            )?;
            part(
                &mut zip,
                &format!("ppt/notesSlides/_rels/notesSlide{n}.xml.rels"),
                notes_rels(n).as_bytes(),
            )?;
        }
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

fn zip_err(e: zip::result::ZipError) -> ExportError {
    ExportError::Render {
        message: format!("pptx packaging failed: {e}"),
    }
}

/// Escape text for XML content and attribute values
#[must_use]
pub(crate) fn escape_xml(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&apos;".to_string(),
            other => other.to_string(),
        })
        .collect()
}

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

fn content_types(deck: &PptxDeck) -> String {
    let mut overrides = String::new();
    for n in 1..=deck.slides.len() {
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
    }
    for (idx, slide) in deck.slides.iter().enumerate() {
        if slide.note.is_some() {
            let n = idx + 1;
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/notesSlides/notesSlide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#
            ));
        }
    }
    format!(
        r#"{XML_HEADER}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/notesMasters/notesMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>{overrides}</Types>"#
    )
}

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

fn core_props(meta: &DeckMeta) -> String {
    let title = meta.title.as_deref().map(escape_xml).unwrap_or_default();
    let author = meta.author.as_deref().map(escape_xml).unwrap_or_default();
    let subject = meta.subject.as_deref().map(escape_xml).unwrap_or_default();
    let keywords = escape_xml(&meta.keywords.join(", "));
    format!(
        r#"{XML_HEADER}
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{title}</dc:title><dc:creator>{author}</dc:creator><dc:subject>{subject}</dc:subject><cp:keywords>{keywords}</cp:keywords></cp:coreProperties>"#
    )
}

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>exportar</Application></Properties>"#;

fn presentation(deck: &PptxDeck) -> String {
    let mut slide_ids = String::new();
    for n in 1..=deck.slides.len() {
        let id = 255 + n;
        let rid = n + 2;
        slide_ids.push_str(&format!(r#"<p:sldId id="{id}" r:id="rId{rid}"/>"#));
    }
    format!(
        r#"{XML_HEADER}
<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:notesMasterIdLst><p:notesMasterId r:id="rId2"/></p:notesMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        cx = deck.cx(),
        cy = deck.cy(),
    )
}

fn presentation_rels(deck: &PptxDeck) -> String {
    let mut rels = String::from(
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster" Target="notesMasters/notesMaster1.xml"/>"#,
    );
    for n in 1..=deck.slides.len() {
        let rid = n + 2;
        rels.push_str(&format!(
            r#"<Relationship Id="rId{rid}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{n}.xml"/>"#
        ));
    }
    format!(r#"{XML_HEADER}
<Relationships xmlns="{REL_NS}">{rels}</Relationships>"#)
}

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Deck"><a:themeElements><a:clrScheme name="Deck"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F1F1F"/></a:dk2><a:lt2><a:srgbClr val="EEEEEE"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Deck"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Deck"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

const EMPTY_SP_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree>"#;

const SLIDE_MASTER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#;

const SLIDE_MASTER_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/></Relationships>"#;

fn slide_layout(deck: &PptxDeck) -> String {
    format!(
        r#"{XML_HEADER}
<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld name="{name}">{EMPTY_SP_TREE}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        name = escape_xml(&deck.layout_name()),
    )
}

const SLIDE_LAYOUT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#;

const NOTES_MASTER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notesMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/></p:notesMaster>"#;

const NOTES_MASTER_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/></Relationships>"#;

fn slide_xml(deck: &PptxDeck) -> String {
    format!(
        r#"{XML_HEADER}
<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:pic><p:nvPicPr><p:cNvPr id="2" name="Slide"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId1"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        cx = deck.cx(),
        cy = deck.cy(),
    )
}

fn slide_rels(n: usize, has_note: bool) -> String {
    let mut rels = format!(
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{n}.png"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#
    );
    if has_note {
        rels.push_str(&format!(
            r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide{n}.xml"/>"#
        ));
    }
    format!(r#"{XML_HEADER}
<Relationships xmlns="{REL_NS}">{rels}</Relationships>"#)
}

fn notes_slide(note: &str) -> String {
    format!(
        r#"{XML_HEADER}
<p:notes xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Notes"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld>{CLR_MAP_OVR}</p:notes>"#,
        escape_xml(note),
        CLR_MAP_OVR = r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    )
}

fn notes_rels(n: usize) -> String {
    format!(
        r#"{XML_HEADER}
<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="../slides/slide{n}.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster" Target="../notesMasters/notesMaster1.xml"/></Relationships>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_part(path: &Path, name: &str) -> String {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    fn two_slide_deck() -> PptxDeck {
        PptxDeck {
            width: 1920,
            height: 1080,
            meta: DeckMeta {
                title: Some("Demo".into()),
                author: Some("X".into()),
                subject: None,
                keywords: vec!["a".into()],
            },
            slides: vec![
                PptxSlide {
                    image: vec![0x89, 0x50, 0x4e, 0x47],
                    note: None,
                },
                PptxSlide {
                    image: vec![0x89, 0x50, 0x4e, 0x47],
                    note: Some("hi".into()),
                },
            ],
        }
    }

    #[test]
    fn test_layout_name_is_dimensions() {
        assert_eq!(two_slide_deck().layout_name(), "1920x1080");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b&c>\"d'"), "a&lt;b&amp;c&gt;&quot;d&apos;");
    }

    #[test]
    fn test_write_pptx_packages_every_part() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("deck.pptx");
        write_pptx(&two_slide_deck(), &path).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for expected in [
            "[Content_Types].xml",
            "_rels/.rels",
            "ppt/presentation.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/media/image1.png",
            "ppt/media/image2.png",
            "ppt/notesSlides/notesSlide2.xml",
        ] {
            assert!(names.contains(&expected), "missing part {expected}");
        }
        // Slide 1 has no note, so no notes part
        assert!(!names.contains(&"ppt/notesSlides/notesSlide1.xml"));
    }

    #[test]
    fn test_slide_size_in_emu() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("deck.pptx");
        write_pptx(&two_slide_deck(), &path).unwrap();
        let presentation = read_part(&path, "ppt/presentation.xml");
        // 1920 * 9525 and 1080 * 9525
        assert!(presentation.contains(r#"<p:sldSz cx="18288000" cy="10287000"/>"#));
    }

    #[test]
    fn test_notes_carry_the_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("deck.pptx");
        write_pptx(&two_slide_deck(), &path).unwrap();
        let notes = read_part(&path, "ppt/notesSlides/notesSlide2.xml");
        assert!(notes.contains("<a:t>hi</a:t>"));
    }

    #[test]
    fn test_layout_carries_dimension_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("deck.pptx");
        write_pptx(&two_slide_deck(), &path).unwrap();
        let layout = read_part(&path, "ppt/slideLayouts/slideLayout1.xml");
        assert!(layout.contains(r#"name="1920x1080""#));
    }

    #[test]
    fn test_metadata_lands_in_core_props() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("deck.pptx");
        write_pptx(&two_slide_deck(), &path).unwrap();
        let core = read_part(&path, "docProps/core.xml");
        assert!(core.contains("<dc:title>Demo</dc:title>"));
        assert!(core.contains("<dc:creator>X</dc:creator>"));
    }

    #[test]
    fn test_empty_deck_rejected() {
        let deck = PptxDeck {
            width: 1920,
            height: 1080,
            meta: DeckMeta::default(),
            slides: Vec::new(),
        };
        let tmp = tempfile::tempdir().unwrap();
        assert!(write_pptx(&deck, &tmp.path().join("x.pptx")).is_err());
    }
}
