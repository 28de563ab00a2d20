//! Declarative extractor for card and list style news pages.
//!
//! Most newsrooms render a repeated item block (a card, an `<article>`, a
//! list item) holding a headline link, an optional teaser, a date and an
//! image. A [`ListingProfile`] names the CSS selectors for those parts and
//! [`ListingExtractor`] applies them. All selectors except
//! [`ListingProfile::item`] are relative to the item element.
//!
//! Items without a headline link are skipped. Links and image paths are
//! resolved against the page URL.

use super::{absolutize, page_url, selector, ExtractError, Extractor};
use crate::models::{RenderedDocument, Record};
use crate::utils::collapse_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static STYLE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("valid regex"));

/// Where an item's image comes from. Strategies are tried in order.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource {
    /// An `<img>`; `src`, falling back to lazy-load `data-src`.
    Img(&'static str),
    /// `background-image: url(...)` in an element's inline style.
    Style(&'static str),
    /// `background-image` on the item element itself.
    ItemStyle,
    /// A data attribute holding either a bare URL or a `url(...)` value.
    Attr(&'static str, &'static str),
}

/// A piece of date text.
#[derive(Debug, Clone, Copy)]
pub enum TextSource {
    Text(&'static str),
    Attr(&'static str, &'static str),
}

/// Selectors describing one newsroom listing layout.
#[derive(Debug, Clone, Copy)]
pub struct ListingProfile {
    /// Repeated item block, matched against the whole document.
    pub item: &'static str,
    /// Headline link inside the item; its `href` is the read-more link.
    pub anchor: &'static str,
    /// Separate headline element. When unset the anchor text is used.
    pub title: Option<&'static str>,
    /// Title used when [`ListingProfile::title`] matches nothing.
    pub title_fallback: &'static str,
    pub images: &'static [ImageSource],
    pub description: Option<&'static str>,
    /// Date fragments, joined with a space.
    pub date: &'static [TextSource],
    /// Fixed `source` label stamped on every record.
    pub source_label: Option<&'static str>,
    /// Drop repeated links within one page (sliders repeating list items).
    pub unique_links: bool,
}

impl ListingProfile {
    pub const fn new(item: &'static str, anchor: &'static str) -> Self {
        Self {
            item,
            anchor,
            title: None,
            title_fallback: "",
            images: &[],
            description: None,
            date: &[],
            source_label: None,
            unique_links: false,
        }
    }

    pub const fn title(self, title: &'static str, fallback: &'static str) -> Self {
        Self {
            title: Some(title),
            title_fallback: fallback,
            ..self
        }
    }

    pub const fn images(self, images: &'static [ImageSource]) -> Self {
        Self { images, ..self }
    }

    pub const fn description(self, description: &'static str) -> Self {
        Self {
            description: Some(description),
            ..self
        }
    }

    pub const fn date(self, date: &'static [TextSource]) -> Self {
        Self { date, ..self }
    }

    pub const fn source_label(self, label: &'static str) -> Self {
        Self {
            source_label: Some(label),
            ..self
        }
    }

    pub const fn unique_links(self) -> Self {
        Self {
            unique_links: true,
            ..self
        }
    }
}

enum CompiledImage {
    Img(Selector),
    Style(Selector),
    ItemStyle,
    Attr(Selector, &'static str),
}

enum CompiledText {
    Text(Selector),
    Attr(Selector, &'static str),
}

/// Extractor driven by a [`ListingProfile`]. Selectors are compiled once.
pub struct ListingExtractor {
    profile: ListingProfile,
    item: Selector,
    anchor: Selector,
    title: Option<Selector>,
    images: Vec<CompiledImage>,
    description: Option<Selector>,
    date: Vec<CompiledText>,
}

impl ListingExtractor {
    /// Compile `profile`.
    ///
    /// # Errors
    ///
    /// [`ExtractError::Selector`] if any selector in the profile is invalid.
    pub fn new(profile: ListingProfile) -> Result<Self, ExtractError> {
        let images = profile
            .images
            .iter()
            .map(|source| {
                Ok(match *source {
                    ImageSource::Img(css) => CompiledImage::Img(selector(css)?),
                    ImageSource::Style(css) => CompiledImage::Style(selector(css)?),
                    ImageSource::ItemStyle => CompiledImage::ItemStyle,
                    ImageSource::Attr(css, attr) => CompiledImage::Attr(selector(css)?, attr),
                })
            })
            .collect::<Result<Vec<_>, ExtractError>>()?;

        let date = profile
            .date
            .iter()
            .map(|source| {
                Ok(match *source {
                    TextSource::Text(css) => CompiledText::Text(selector(css)?),
                    TextSource::Attr(css, attr) => CompiledText::Attr(selector(css)?, attr),
                })
            })
            .collect::<Result<Vec<_>, ExtractError>>()?;

        Ok(Self {
            item: selector(profile.item)?,
            anchor: selector(profile.anchor)?,
            title: profile.title.map(selector).transpose()?,
            description: profile.description.map(selector).transpose()?,
            images,
            date,
            profile,
        })
    }

    fn image(&self, item: ElementRef<'_>) -> String {
        self.images
            .iter()
            .map(|source| match source {
                CompiledImage::Img(sel) => first(item, sel)
                    .and_then(|img| {
                        let attrs = img.value();
                        attrs
                            .attr("src")
                            .filter(|s| !s.trim().is_empty())
                            .or_else(|| attrs.attr("data-src"))
                    })
                    .unwrap_or("")
                    .to_string(),
                CompiledImage::Style(sel) => first(item, sel)
                    .and_then(|el| el.value().attr("style"))
                    .and_then(style_url)
                    .unwrap_or_default(),
                CompiledImage::ItemStyle => item
                    .value()
                    .attr("style")
                    .and_then(style_url)
                    .unwrap_or_default(),
                CompiledImage::Attr(sel, attr) => first(item, sel)
                    .and_then(|el| el.value().attr(attr))
                    .map(|raw| style_url(raw).unwrap_or_else(|| raw.trim().to_string()))
                    .unwrap_or_default(),
            })
            .find(|src| !src.is_empty())
            .unwrap_or_default()
    }

    fn date(&self, item: ElementRef<'_>) -> String {
        self.date
            .iter()
            .filter_map(|source| match source {
                CompiledText::Text(sel) => first(item, sel).map(text_of),
                CompiledText::Attr(sel, attr) => first(item, sel)
                    .and_then(|el| el.value().attr(attr))
                    .map(collapse_whitespace),
            })
            .filter(|part| !part.is_empty())
            .join(" ")
    }
}

impl Extractor for ListingExtractor {
    fn extract(&self, document: &RenderedDocument) -> Result<Vec<Record>, ExtractError> {
        let page = page_url(document)?;
        let html = Html::parse_document(&document.html);

        let mut records = Vec::new();
        for item in html.select(&self.item) {
            let Some(anchor) = first(item, &self.anchor) else {
                continue;
            };
            let link = absolutize(&page, anchor.value().attr("href").unwrap_or_default());

            let title = match &self.title {
                Some(sel) => first(item, sel)
                    .map(text_of)
                    .unwrap_or_else(|| self.profile.title_fallback.to_string()),
                None => text_of(anchor),
            };

            let description = self
                .description
                .as_ref()
                .and_then(|sel| first(item, sel))
                .map(text_of)
                .unwrap_or_default();

            let image = absolutize(&page, &self.image(item));

            let mut record = Record::new(title, link, image, description).with_date(self.date(item));
            if let Some(label) = self.profile.source_label {
                record = record.with_source(label);
            }
            records.push(record);
        }

        if self.profile.unique_links {
            records = records
                .into_iter()
                .unique_by(|r| r.read_more_link.clone())
                .collect();
        }
        Ok(records)
    }
}

fn first<'a>(scope: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    scope.select(sel).next()
}

/// Visible text of an element: each text node trimmed, blank nodes dropped,
/// the rest concatenated with no separator.
///
/// Titles already persisted were produced this way, and merge compares
/// titles exactly, so `Pre<em>fix</em>` must stay `Prefix`.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|t| !t.is_empty()).collect()
}

/// The URL inside a CSS `url(...)` value.
pub(crate) fn style_url(style: &str) -> Option<String> {
    STYLE_URL
        .captures(style)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: ListingProfile = ListingProfile::new("div.card", "h3 a[href]")
        .images(&[ImageSource::Img("img"), ImageSource::Style("div.bg")])
        .description("p.teaser")
        .date(&[TextSource::Text("span.date"), TextSource::Text("span.time")]);

    fn doc(html: &str) -> RenderedDocument {
        RenderedDocument::new("https://www.example.edu/news/", html)
    }

    #[test]
    fn test_extracts_fields_and_resolves_relative_urls() {
        let html = r#"
            <div class="card">
              <h3><a href="/news/spring-gala">  Spring Gala </a></h3>
              <img data-src="/img/gala.jpg">
              <p class="teaser">Join us for the annual gala.</p>
              <span class="date">May 6, 2025</span><span class="time">7 PM</span>
            </div>
            <div class="card">
              <h3><a href="https://other.edu/story">Research grant</a></h3>
              <div class="bg" style="background-image: url('/img/lab.png');"></div>
            </div>
        "#;
        let extractor = ListingExtractor::new(CARDS).unwrap();
        let records = extractor.extract(&doc(html)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Spring Gala");
        assert_eq!(records[0].read_more_link, "https://www.example.edu/news/spring-gala");
        assert_eq!(records[0].image_reference, "https://www.example.edu/img/gala.jpg");
        assert_eq!(records[0].description, "Join us for the annual gala.");
        assert_eq!(records[0].date, "May 6, 2025 7 PM");

        assert_eq!(records[1].read_more_link, "https://other.edu/story");
        assert_eq!(records[1].image_reference, "https://www.example.edu/img/lab.png");
        assert_eq!(records[1].description, "");
        assert_eq!(records[1].date, "");
    }

    #[test]
    fn test_text_nodes_are_trimmed_and_concatenated() {
        let html = Html::parse_fragment(
            "<h3><a href='/x'> Pre<em>fix</em>\n  <strong> Award </strong> </a></h3>",
        );
        let sel = Selector::parse("a").unwrap();
        let a = html.select(&sel).next().unwrap();
        assert_eq!(text_of(a), "PrefixAward");
    }

    #[test]
    fn test_items_without_anchor_are_skipped() {
        let html = r#"
            <div class="card"><h3>No link here</h3></div>
            <div class="card"><h3><a href="/a">Has link</a></h3></div>
        "#;
        let records = ListingExtractor::new(CARDS).unwrap().extract(&doc(html)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Has link");
    }

    #[test]
    fn test_title_fallback_and_source_label() {
        let profile = ListingProfile::new("div.box", "a.block")
            .title("div.hed", "No Title")
            .source_label("Example News");
        let html = r#"
            <div class="box"><a class="block" href="/x"><div class="hed">Headline</div></a></div>
            <div class="box"><a class="block" href="/y"></a></div>
        "#;
        let records = ListingExtractor::new(profile).unwrap().extract(&doc(html)).unwrap();
        assert_eq!(records[0].title, "Headline");
        assert_eq!(records[1].title, "No Title");
        assert_eq!(records[1].source.as_deref(), Some("Example News"));
    }

    #[test]
    fn test_unique_links_keeps_first_occurrence() {
        let profile = ListingProfile::new("article", "h2 a[href]")
            .description("div.excerpt")
            .unique_links();
        let html = r#"
            <article><h2><a href="/a">Slider A</a></h2></article>
            <article><h2><a href="/b">B</a></h2></article>
            <article><h2><a href="/a">List A</a></h2><div class="excerpt">x</div></article>
        "#;
        let records = ListingExtractor::new(profile).unwrap().extract(&doc(html)).unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Slider A", "B"]);
    }

    #[test]
    fn test_attr_image_and_attr_date() {
        let profile = ListingProfile::new("li", "a[href]")
            .images(&[ImageSource::Attr("div.img", "data-bg-image")])
            .date(&[TextSource::Attr("time", "datetime")]);
        let html = r#"
            <ul>
              <li><a href="/a">A</a><div class="img" data-bg-image="url('https://cdn.edu/a.jpg')"></div>
                  <time datetime="2025-05-06">May 6</time></li>
              <li><a href="/b">B</a><div class="img" data-bg-image="https://cdn.edu/b.jpg"></div></li>
            </ul>
        "#;
        let records = ListingExtractor::new(profile).unwrap().extract(&doc(html)).unwrap();
        assert_eq!(records[0].image_reference, "https://cdn.edu/a.jpg");
        assert_eq!(records[0].date, "2025-05-06");
        assert_eq!(records[1].image_reference, "https://cdn.edu/b.jpg");
    }

    #[test]
    fn test_item_style_image() {
        let profile = ListingProfile::new("article", "a[href]")
            .images(&[ImageSource::Img("img"), ImageSource::ItemStyle]);
        let html = r#"<article style='background-image: url("/slide.jpg")'><a href="/s">S</a></article>"#;
        let records = ListingExtractor::new(profile).unwrap().extract(&doc(html)).unwrap();
        assert_eq!(records[0].image_reference, "https://www.example.edu/slide.jpg");
    }

    #[test]
    fn test_invalid_profile_fails_to_compile() {
        let profile = ListingProfile::new("div[[", "a");
        assert!(matches!(
            ListingExtractor::new(profile),
            Err(ExtractError::Selector(_))
        ));
    }

    #[test]
    fn test_style_url() {
        assert_eq!(
            style_url("background-image: url(\"/a.jpg\")").as_deref(),
            Some("/a.jpg")
        );
        assert_eq!(style_url("background: url(b.png) no-repeat").as_deref(), Some("b.png"));
        assert_eq!(style_url("color: red"), None);
    }
}
