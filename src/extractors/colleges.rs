//! Newsroom layouts for the CUNY colleges and the registry that wires them up.

use super::archives::{BaruchExtractor, QcExtractor, QccExtractor};
use super::listing::{ImageSource as Image, ListingExtractor, ListingProfile, TextSource as Text};
use super::{ExtractError, ExtractorRegistry};

const IMG: &[Image] = &[Image::Img("img")];

/// (source id, layout) for every card/list style newsroom.
pub const LISTING_PROFILES: &[(&str, ListingProfile)] = &[
    (
        "ccny",
        ListingProfile::new("div.listing-item", "h3.listing-item__title a[href]")
            .images(IMG)
            .description("div.listing-item__teaser"),
    ),
    (
        "bmcc",
        ListingProfile::new("div.pl-blogcnt", "h4.pl-title a[href]")
            .images(IMG)
            .description("p.pl-text")
            .date(&[Text::Text("h4.pl-title span.pl-date")]),
    ),
    (
        "csi",
        ListingProfile::new("article", ".entry-title a[href]")
            .images(&[Image::Img("img"), Image::ItemStyle])
            .description("div.excerpt")
            .date(&[Text::Text("span.updated")])
            .unique_links(),
    ),
    (
        "guttman",
        ListingProfile::new("article.entry-archive", "a.entry-title-link")
            .images(&[Image::Img("img.entry-image")])
            .description("div.entry-summary")
            .date(&[Text::Text("time.entry-time")]),
    ),
    (
        "hunter",
        ListingProfile::new("div.news-box", "a.hover-block")
            .title("div.hed", "No Title")
            .images(&[Image::Img("img.hover-blockimg")])
            .description("a.hover-block p")
            .date(&[Text::Text("div.date")]),
    ),
    (
        "jjay",
        ListingProfile::new("div.teaser-card", "div.card__title a")
            .images(IMG)
            .date(&[Text::Text("div.card__meta")]),
    ),
    (
        "kbcc",
        ListingProfile::new("div.row.card.g-0", "h2.h3 a[href]")
            .images(&[Image::Style("div.card-img-top")])
            .description("p")
            .date(&[Text::Text("li.pub-date")]),
    ),
    (
        "law",
        ListingProfile::new("ul.post-list-container > li", "h2 a")
            .images(&[
                Image::Attr("div.newsroom-post-img", "data-bg-image"),
                Image::Style("div.newsroom-post-img"),
            ])
            .description("div.entry-content"),
    ),
    (
        "lehman",
        ListingProfile::new("div.course-listing", "p.newsModuleListing__block__desc__title a")
            .images(&[Image::Img("div.newsModuleListing__block__img img")])
            .description("p.newsModuleListing__block__desc__text")
            .date(&[Text::Text("p.newsModuleListing__block__desc__date")]),
    ),
    (
        "macaly",
        ListingProfile::new("div.sub-feature-double__content", "h3 a[href]")
            .images(&[Image::Img("img.sub-feature-double__content--image")])
            .description("p")
            .date(&[Text::Text("time.calendar-event__time--small")]),
    ),
    (
        "mec",
        ListingProfile::new("div.card", "h2 a[href]")
            .images(&[Image::Img("img.wp-post-image")])
            .description("p.card-text")
            .date(&[Text::Text("small.text-muted")]),
    ),
    (
        "sps",
        ListingProfile::new("div.listing-item", "h3.listing-item__title a[href]")
            .images(IMG)
            .description("div.listing-item__teaser")
            .date(&[Text::Text("span.date-display-single")]),
    ),
    (
        "lagrdia",
        ListingProfile::new("article.elementor-post", "p.elementor-post__title a[href]")
            .images(IMG)
            .date(&[
                Text::Text("span.elementor-post-date"),
                Text::Text("span.elementor-post-time"),
            ])
            .source_label("LaGuardia News"),
    ),
    (
        "sph",
        ListingProfile::new("div.list-view-container", "div.news-title a[href]")
            .images(&[Image::Img("div.news-img img")])
            .description("div.news-des-indent_inner")
            .date(&[Text::Text("div.news-date")]),
    ),
    (
        "york",
        ListingProfile::new("div.advanced-item", "h3.threelines a[href]")
            .images(&[Image::Img("div.advancedImage img")])
            .description("div.nine.wide.column p:not(.effectiveDate)")
            .date(&[Text::Text("p.effectiveDate")]),
    ),
    (
        "hostos",
        ListingProfile::new("li", "div.event-info a[href]")
            .images(&[Image::Img("div.event-info span.location img")])
            .description("div.event-info span.location")
            .date(&[Text::Attr("time", "datetime")]),
    ),
    (
        "broklyn",
        ListingProfile::new("div.news-item", "h3 a[href]")
            .images(IMG)
            .description("p"),
    ),
    (
        "bcc",
        ListingProfile::new("article.mk-blog-thumbnail-item", "h3.the-title a[href]")
            .images(&[Image::Img("img.blog-image")])
            .description("div.the-excerpt"),
    ),
    (
        "gc",
        ListingProfile::new("article.card--news", "h3.card__title a[href]")
            .images(&[Image::Img("div.card__media img")])
            .description("p.card__summary")
            .date(&[Text::Text("span.date")]),
    ),
    (
        "ct",
        ListingProfile::new("div.news-item", "a[href]")
            .title(".c-title", "")
            .images(&[Image::Style("div[style]")])
            .description("div.c-desc"),
    ),
];

impl ExtractorRegistry {
    /// Registry with an extractor for every CUNY newsroom.
    ///
    /// # Errors
    ///
    /// [`ExtractError::Selector`] if a built-in layout has a broken selector.
    pub fn cuny() -> Result<Self, ExtractError> {
        let mut registry = Self::new();
        for (source, profile) in LISTING_PROFILES {
            registry.register(*source, ListingExtractor::new(*profile)?);
        }
        registry.register("baruc", BaruchExtractor::new()?);
        registry.register("qc", QcExtractor::new()?);
        registry.register("qcc", QccExtractor::new()?);
        Ok(registry)
    }
}
