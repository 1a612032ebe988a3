//! HTML extraction rules for index and detail pages
//!
//! Two fixed rules drive the whole harvest:
//! - on the index page, every catalog item contributes the `href` of its
//!   first link, in document order
//! - on a detail page, the text of the first content container is the page
//!   content
//!
//! Both rules are CSS selectors taken from the pipeline configuration.

use crate::config::PipelineConfig;
use crate::ConfigError;
use scraper::{Html, Selector};
use url::Url;

/// Compiled selectors for catalog and content extraction
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    catalog: Selector,
    link: Selector,
    content: Selector,
    content_source: String,
}

impl ExtractionRules {
    /// Compiles the three selectors
    ///
    /// # Arguments
    ///
    /// * `catalog` - Matches each catalog item on the index page
    /// * `link` - Matches the link inside a catalog item (first match wins)
    /// * `content` - Matches the text container on a detail page
    pub fn new(catalog: &str, link: &str, content: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            catalog: compile(catalog)?,
            link: compile(link)?,
            content: compile(content)?,
            content_source: content.to_string(),
        })
    }

    /// Builds the rules from the pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Self::new(
            &config.catalog_selector,
            &config.link_selector,
            &config.content_selector,
        )
    }

    /// The content selector as written in the configuration
    pub fn content_selector(&self) -> &str {
        &self.content_source
    }

    /// Extracts catalog links from an index page, in document order
    ///
    /// Items whose first link has no (or a blank) `href` are skipped, as are
    /// targets that cannot be resolved against `base_url`. Relative targets
    /// are resolved; nothing else is filtered or deduplicated.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_harvest::crawler::ExtractionRules;
    /// use url::Url;
    ///
    /// let rules = ExtractionRules::new("#catalog ul li", "a", ".txtnav").unwrap();
    /// let html = r#"<div id="catalog"><ul><li><a href="/1.html">One</a></li></ul></div>"#;
    /// let base = Url::parse("https://example.com/book/").unwrap();
    ///
    /// let links = rules.extract_catalog_links(html, &base);
    /// assert_eq!(links[0].as_str(), "https://example.com/1.html");
    /// ```
    pub fn extract_catalog_links(&self, html: &str, base_url: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        let mut links = Vec::new();

        for item in document.select(&self.catalog) {
            let href = item
                .select(&self.link)
                .next()
                .and_then(|anchor| anchor.value().attr("href"))
                .map(str::trim)
                .unwrap_or("");

            if href.is_empty() {
                continue;
            }

            match base_url.join(href) {
                Ok(url) => links.push(url),
                Err(e) => tracing::debug!("Skipping unresolvable catalog link {}: {}", href, e),
            }
        }

        links
    }

    /// Extracts the text of the first content container on a detail page
    ///
    /// Returns `None` when the page has no matching element. Surrounding
    /// whitespace is trimmed; inner line breaks are kept.
    pub fn extract_content(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        document
            .select(&self.content)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}
