//! Extractors for archive-style pages that don't fit a card profile.
//!
//! These pages group links under headings (year accordions, month toggles)
//! or bury the date inside the headline paragraph, so the grouping context
//! has to be carried into each record by hand.

use super::listing::text_of;
use super::{absolutize, page_url, selector, ExtractError, Extractor};
use crate::models::{RenderedDocument, Record};
use crate::utils::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

fn next_sibling_named<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sib| sib.value().name() == name)
}

fn prev_sibling_named<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sib| sib.value().name() == name)
}

/// Baruch NewsCenter: year accordions holding month headings, each followed
/// by a list of headline links. No teasers or images on this index.
pub struct BaruchExtractor {
    block: Selector,
    year: Selector,
    content: Selector,
    month: Selector,
    entry: Selector,
    link: Selector,
}

impl BaruchExtractor {
    pub const SOURCE_LABEL: &'static str = "Baruch NewsCenter";

    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            block: selector("div.accordion")?,
            year: selector("button.accordion-handle")?,
            content: selector("div.accordion-content-inner")?,
            month: selector("h2")?,
            entry: selector("li")?,
            link: selector("a[href]")?,
        })
    }
}

impl Extractor for BaruchExtractor {
    fn extract(&self, document: &RenderedDocument) -> Result<Vec<Record>, ExtractError> {
        let page = page_url(document)?;
        let html = Html::parse_document(&document.html);
        let mut records = Vec::new();

        for block in html.select(&self.block) {
            let year = block
                .select(&self.year)
                .next()
                .map(text_of)
                .unwrap_or_else(|| "Unknown Year".to_string());
            let Some(content) = block.select(&self.content).next() else {
                continue;
            };

            for month_tag in content.select(&self.month) {
                let month = text_of(month_tag);
                let Some(list) = next_sibling_named(month_tag, "ul") else {
                    continue;
                };
                for entry in list.select(&self.entry) {
                    let Some(a) = entry.select(&self.link).next() else {
                        continue;
                    };
                    let link = absolutize(&page, a.value().attr("href").unwrap_or_default());
                    records.push(
                        Record::new(text_of(a), link, "", "")
                            .with_date_label(format!("{month} {year}"))
                            .with_source(Self::SOURCE_LABEL),
                    );
                }
            }
        }
        Ok(records)
    }
}

/// Queens College press release archive: one toggle per month, each holding
/// paragraphs of links with the day printed in the paragraph before.
pub struct QcExtractor {
    toggle: Selector,
    month: Selector,
    content: Selector,
    link: Selector,
}

impl QcExtractor {
    pub const SOURCE_LABEL: &'static str = "Queens College";
    /// Link texts shorter than this are navigation fragments, not headlines.
    const MIN_TITLE_CHARS: usize = 5;

    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            toggle: selector("div.et_pb_module.et_pb_accordion_item")?,
            month: selector("h5.et_pb_toggle_title")?,
            content: selector("div.et_pb_toggle_content")?,
            link: selector("a[href]")?,
        })
    }
}

impl Extractor for QcExtractor {
    fn extract(&self, document: &RenderedDocument) -> Result<Vec<Record>, ExtractError> {
        let page = page_url(document)?;
        let html = Html::parse_document(&document.html);
        let mut records = Vec::new();

        for toggle in html.select(&self.toggle) {
            let month = toggle
                .select(&self.month)
                .next()
                .map(text_of)
                .unwrap_or_else(|| "Unknown Month".to_string());
            let Some(content) = toggle.select(&self.content).next() else {
                continue;
            };

            for a in content.select(&self.link) {
                let title = text_of(a);
                if title.chars().count() < Self::MIN_TITLE_CHARS {
                    continue;
                }

                let date = a
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|el| el.value().name() == "p")
                    .and_then(|p| prev_sibling_named(p, "p"))
                    .map(text_of)
                    .unwrap_or_default();

                let link = absolutize(&page, a.value().attr("href").unwrap_or_default());
                records.push(
                    Record::new(title, link, "", "")
                        .with_date(date)
                        .with_date_label(month.clone())
                        .with_source(Self::SOURCE_LABEL),
                );
            }
        }
        Ok(records)
    }
}

/// Queensborough Community College: the date trails the headline link
/// inside the same `p.article`.
pub struct QccExtractor {
    section: Selector,
    headline: Selector,
    link: Selector,
    image: Selector,
}

impl QccExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            section: selector("section.newsSection")?,
            headline: selector("p.article")?,
            link: selector("a[href]")?,
            image: selector("img")?,
        })
    }
}

impl Extractor for QccExtractor {
    fn extract(&self, document: &RenderedDocument) -> Result<Vec<Record>, ExtractError> {
        let page = page_url(document)?;
        let html = Html::parse_document(&document.html);
        let mut records = Vec::new();

        for section in html.select(&self.section) {
            let Some(p) = section.select(&self.headline).next() else {
                continue;
            };
            let Some(a) = p.select(&self.link).next() else {
                continue;
            };

            let parts: Vec<String> = p
                .text()
                .map(collapse_whitespace)
                .filter(|t| !t.is_empty())
                .collect();
            let date = if parts.len() > 1 {
                parts.last().cloned().unwrap_or_default()
            } else {
                String::new()
            };

            let image = section
                .select(&self.image)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(|src| absolutize(&page, src))
                .unwrap_or_default();

            let link = absolutize(&page, a.value().attr("href").unwrap_or_default());
            records.push(Record::new(text_of(a), link, image, "").with_date(date));
        }
        Ok(records)
    }
}
