//! PDF renderer.
//!
//! One-piece mode asks the browser for a single multi-page PDF from the
//! stacked print route; per-slide mode prints every `(slide, clicks?)`
//! state to a one-page PDF and merges the pages in order. Both modes
//! then get document metadata injected and, when requested, an outline
//! tree computed from slide titles, before the file is rewritten.

use super::toc::{build_toc, TocEntry};
use super::{
    capture_plan, ensure_parent_dir, goto_state, Artifact, DeckMeta, ExportOutcome,
};
use crate::browser::{print_url, PageQuery};
use crate::deck::{Slide, SlideDeck};
use crate::options::ExportOptions;
use crate::page::{PageDriver, PdfPrintOptions};
use crate::progress::ExportProgress;
use crate::result::{ExportError, ExportResult};
use crate::stabilize;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::time::Duration;

/// Render the deck to a PDF file
pub async fn render<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    slide_range: &[u32],
    progress: &ExportProgress,
) -> ExportResult<ExportOutcome> {
    let mut warnings = Vec::new();
    let mut doc = if options.per_slide {
        render_per_slide(page, deck, options, slide_range, progress, &mut warnings).await?
    } else {
        render_one_piece(page, deck, options, slide_range, &mut warnings).await?
    };

    apply_metadata(&mut doc, &DeckMeta::from_deck(deck));
    if options.with_toc {
        let entries = toc_entries(deck, slide_range, options.clicks_enabled());
        attach_outline(&mut doc, &entries)?;
    }

    ensure_parent_dir(&options.output)?;
    doc.save(&options.output).map_err(pdf_err)?;
    progress.finish(format!("wrote {}", options.output.display()));
    Ok(ExportOutcome {
        artifact: Artifact::File(options.output.clone()),
        warnings,
    })
}

async fn render_one_piece<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    slide_range: &[u32],
    warnings: &mut Vec<String>,
) -> ExportResult<Document> {
    let with_clicks = options.clicks_enabled();
    let pages = capture_plan(deck, slide_range, with_clicks).len() as u32;
    page.set_viewport(options.width, options.height * pages.max(1), options.scale)
        .await?;

    let mut query = if with_clicks {
        PageQuery::new().print_clicks()
    } else {
        PageQuery::new().print()
    };
    if let Some(ref expr) = options.range {
        query = query.range(expr);
    }
    let url = print_url(&options.base_url, options.router_mode, &query);
    page.navigate(&url).await?;
    page.set_color_scheme(options.dark).await?;

    let timeout = Duration::from_millis(options.timeout_ms);
    stabilize::wait_for_element(page, "body", timeout).await?;
    warnings.extend(stabilize::wait_for_loaded(page, timeout).await?);
    if options.wait_ms > 0 {
        tokio::time::sleep(Duration::from_millis(options.wait_ms)).await;
    }

    let bytes = page
        .print_to_pdf(&PdfPrintOptions {
            width: options.width,
            height: options.height,
        })
        .await?;
    Document::load_mem(&bytes).map_err(pdf_err)
}

async fn render_per_slide<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    slide_range: &[u32],
    progress: &ExportProgress,
    warnings: &mut Vec<String>,
) -> ExportResult<Document> {
    page.set_viewport(options.width, options.height, options.scale)
        .await?;
    let print_opts = PdfPrintOptions {
        width: options.width,
        height: options.height,
    };

    let mut documents = Vec::new();
    for state in capture_plan(deck, slide_range, options.clicks_enabled()) {
        warnings.extend(goto_state(page, options, state).await?);
        let bytes = page.print_to_pdf(&print_opts).await?;
        documents.push(Document::load_mem(&bytes).map_err(pdf_err)?);
        progress.inc();
    }
    merge_documents(documents)
}

/// TOC entries with their 1-based page numbers in the final document.
///
/// With clicks enabled a slide occupies one page per click state; its
/// entry points at the first.
pub(crate) fn toc_entries(
    deck: &SlideDeck,
    slide_range: &[u32],
    with_clicks: bool,
) -> Vec<TocEntry> {
    let mut pairs: Vec<(&Slide, u32)> = Vec::new();
    let mut page = 1u32;
    for &no in slide_range {
        if let Some(slide) = deck.get(no) {
            pairs.push((slide, page));
            page += if with_clicks { slide.clicks + 1 } else { 1 };
        }
    }
    build_toc(&pairs)
}

/// Inject the Info dictionary
pub(crate) fn apply_metadata(doc: &mut Document, meta: &DeckMeta) {
    let mut info = Dictionary::new();
    if let Some(ref title) = meta.title {
        info.set("Title", Object::string_literal(title.as_str()));
    }
    if let Some(ref author) = meta.author {
        info.set("Author", Object::string_literal(author.as_str()));
    }
    if let Some(ref subject) = meta.subject {
        info.set("Subject", Object::string_literal(subject.as_str()));
    }
    if !meta.keywords.is_empty() {
        info.set(
            "Keywords",
            Object::string_literal(meta.keywords.join(", ")),
        );
    }
    info.set("Producer", Object::string_literal("exportar"));
    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", Object::Reference(info_id));
}

/// Copy the pages of `documents` into one document, in order
pub(crate) fn merge_documents(documents: Vec<Document>) -> ExportResult<Document> {
    let mut merged = Document::with_version("1.5");
    let mut page_ids: Vec<ObjectId> = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(merged.max_id + 1);
        merged.max_id = doc.max_id;
        page_ids.extend(doc.get_pages().into_values());
        merged.objects.extend(doc.objects);
    }
    if page_ids.is_empty() {
        return Err(ExportError::Pdf {
            message: "no pages were produced".to_string(),
        });
    }

    let pages_id = merged.new_object_id();
    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_ids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    Ok(merged)
}

/// Attach the outline tree to the document catalog.
///
/// Hidden entries stay in the tree but are written collapsed (negative
/// `Count`), which is how the outline flags them without dropping their
/// children.
pub(crate) fn attach_outline(doc: &mut Document, entries: &[TocEntry]) -> ExportResult<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let pages = doc.get_pages();
    let outlines_id = doc.new_object_id();
    let (first, last, count) = insert_items(doc, entries, outlines_id, &pages);
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => first,
            "Last" => last,
            "Count" => count,
        }),
    );

    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(pdf_err)?;
    match doc.get_object_mut(root_id) {
        Ok(Object::Dictionary(catalog)) => {
            catalog.set("Outlines", Object::Reference(outlines_id));
            Ok(())
        }
        _ => Err(ExportError::Pdf {
            message: "document has no catalog".to_string(),
        }),
    }
}

fn insert_items(
    doc: &mut Document,
    entries: &[TocEntry],
    parent: ObjectId,
    pages: &BTreeMap<u32, ObjectId>,
) -> (ObjectId, ObjectId, i64) {
    let ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    for (idx, entry) in entries.iter().enumerate() {
        let id = ids[idx];
        let mut dict = Dictionary::new();
        dict.set("Title", Object::string_literal(entry.title.as_str()));
        dict.set("Parent", Object::Reference(parent));
        if idx > 0 {
            dict.set("Prev", Object::Reference(ids[idx - 1]));
        }
        if idx + 1 < ids.len() {
            dict.set("Next", Object::Reference(ids[idx + 1]));
        }
        if let Some(&page_id) = pages.get(&entry.page) {
            dict.set(
                "Dest",
                Object::Array(vec![
                    Object::Reference(page_id),
                    Object::Name(b"Fit".to_vec()),
                ]),
            );
        }
        if !entry.children.is_empty() {
            let (first, last, child_count) = insert_items(doc, &entry.children, id, pages);
            dict.set("First", Object::Reference(first));
            dict.set("Last", Object::Reference(last));
            let count = if entry.hidden { -child_count } else { child_count };
            dict.set("Count", count);
        }
        doc.objects.insert(id, Object::Dictionary(dict));
    }

    let visible: i64 = entries.len() as i64;
    (ids[0], *ids.last().expect("non-empty entries"), visible)
}

fn pdf_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf {
        message: e.to_string(),
    }
}
