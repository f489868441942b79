//! Le Soleil political news scraper.
//!
//! This module scrapes the politics section of [Le Soleil](https://lesoleil.sn)
//! and keeps the articles that mention a presidential or legislative election.
//!
//! # Selectors
//!
//! - Index: article cards are `a.elementor-cta` links on the section page
//! - Title: `h1.td-page-title`, falling back to the first `h1`
//! - Body: `div.td-post-content`, falling back to
//!   `div.elementor-widget-theme-post-content`
//!
//! Articles missing either a title or a body are skipped.

use super::ScraperError;
use crate::models::ElectionArticle;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Politics section of Le Soleil.
pub const POLITICS_URL: &str = "https://lesoleil.sn/rubriques/actualites/politique/";

/// Phrases that mark an article as election coverage (matched lower-cased).
pub const ELECTION_KEYWORDS: [&str; 6] = [
    "élection présidentielle",
    "présidentielle",
    "élections présidentielles",
    "élection législative",
    "législative",
    "élections législatives",
];

/// Number of article pages fetched concurrently.
const FETCH_CONCURRENCY: usize = 4;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.elementor-cta[href]").expect("invalid selector: links"));
static TITLE_SELECTORS: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        Selector::parse("h1.td-page-title").expect("invalid selector: title"),
        Selector::parse("h1").expect("invalid selector: h1"),
    ]
});
static BODY_SELECTORS: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        Selector::parse("div.td-post-content").expect("invalid selector: body"),
        Selector::parse("div.elementor-widget-theme-post-content")
            .expect("invalid selector: elementor body"),
    ]
});
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("invalid selector: p"));

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an article body, one paragraph per line.
fn body_text(body: ElementRef<'_>) -> String {
    let paragraphs: Vec<String> = body
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| normalize_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect();

    if !paragraphs.is_empty() {
        return paragraphs.join("\n");
    }

    body.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .join("\n")
}

/// Extract unique, absolute article links from the section page.
pub fn parse_index(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|url| url.to_string())
        .unique()
        .collect()
}

/// Title and body text of an article page, if both are present.
pub fn parse_article(html: &str) -> Option<(String, String)> {
    let document = Html::parse_document(html);

    // An empty primary title falls through to the next heading.
    let title = TITLE_SELECTORS
        .iter()
        .flat_map(|sel| document.select(sel))
        .map(|h1| normalize_whitespace(&h1.text().collect::<String>()))
        .find(|t| !t.is_empty())?;

    let body = BODY_SELECTORS
        .iter()
        .find_map(|sel| document.select(sel).next())?;

    Some((title, body_text(body)))
}

/// Whether the title or body mention an election keyword.
pub fn mentions_election(title: &str, content: &str) -> bool {
    let combined = format!("{} {}", title.to_lowercase(), content.to_lowercase());
    ELECTION_KEYWORDS.iter().any(|k| combined.contains(k))
}

/// Build the output record for a matching article, `None` otherwise.
pub fn to_election_article(url: &str, title: String, content: String) -> Option<ElectionArticle> {
    if !mentions_election(&title, &content) {
        return None;
    }
    let description = content.lines().next().unwrap_or_default().to_string();
    Some(ElectionArticle {
        title,
        description,
        content,
        url: url.to_string(),
    })
}

/// Scraper for the Le Soleil politics section.
#[derive(Debug, Clone)]
pub struct LeSoleilScraper {
    client: Client,
    index_url: Url,
}

impl LeSoleilScraper {
    /// Create a scraper for the given section page.
    ///
    /// # Arguments
    ///
    /// * `index_url` - Section page listing the articles (usually [`POLITICS_URL`])
    pub fn new(index_url: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            index_url: Url::parse(index_url)?,
        })
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// Index the section page to extract article URLs.
    ///
    /// # Returns
    ///
    /// Unique absolute article URLs in page order, or an error if the page
    /// fetch fails or returns a non-success status.
    #[instrument(level = "info", skip_all, fields(url = %self.index_url))]
    pub async fn index_articles(&self) -> Result<Vec<String>, ScraperError> {
        let html = self.get_html(self.index_url.as_str()).await?;
        let urls = parse_index(&html, &self.index_url);

        info!(count = urls.len(), "Indexed Le Soleil article URLs");
        debug!(urls = ?urls, "Le Soleil URLs");
        Ok(urls)
    }

    /// Fetch a single article.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the article page
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the page has no title or body, or does not mention an
    /// election; an error when the HTTP request fails.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch_article(&self, url: &str) -> Result<Option<ElectionArticle>, ScraperError> {
        let html = self.get_html(url).await?;
        let Some((title, content)) = parse_article(&html) else {
            debug!("Article has no title or body; skipping");
            return Ok(None);
        };

        let article = to_election_article(url, title, content);
        debug!(matched = article.is_some(), "Parsed Le Soleil article");
        Ok(article)
    }

    /// Fetch all articles concurrently, keeping index order.
    ///
    /// Failed fetches are logged and skipped without failing the batch.
    #[instrument(level = "info", skip_all, fields(count = urls.len()))]
    pub async fn fetch_articles(&self, urls: Vec<String>) -> Vec<ElectionArticle> {
        let articles: Vec<ElectionArticle> = stream::iter(urls)
            .map(|url| async move {
                match self.fetch_article(&url).await {
                    Ok(article) => article,
                    Err(e) => {
                        error!(error = %e, %url, "Le Soleil fetch failed");
                        None
                    }
                }
            })
            .buffered(FETCH_CONCURRENCY)
            .filter_map(std::future::ready)
            .collect()
            .await;

        info!(count = articles.len(), "Fetched election articles");
        articles
    }

    /// Index the section page and return every election article found.
    ///
    /// # Returns
    ///
    /// The matching articles in index order, or an error if the section page
    /// itself cannot be fetched. Individual article failures are logged and
    /// skipped.
    pub async fn scrape(&self) -> Result<Vec<ElectionArticle>, ScraperError> {
        let urls = self.index_articles().await?;
        Ok(self.fetch_articles(urls).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INDEX: &str = r#"
        <html><body>
          <a class="elementor-cta" href="/2025/01/legislatives">One</a>
          <a class="elementor-cta" href="https://lesoleil.sn/2025/01/legislatives">Dup</a>
          <a class="elementor-cta" href="/2025/01/budget">Two</a>
          <a class="other" href="/ignored">Nope</a>
          <a class="elementor-cta">No href</a>
        </body></html>"#;

    fn page(title_html: &str, body_html: &str) -> String {
        format!("<html><body>{title_html}{body_html}</body></html>")
    }

    #[test]
    fn test_parse_index_resolves_and_dedupes() {
        let base = Url::parse(POLITICS_URL).unwrap();
        let urls = parse_index(INDEX, &base);
        assert_eq!(
            urls,
            vec![
                "https://lesoleil.sn/2025/01/legislatives",
                "https://lesoleil.sn/2025/01/budget",
            ]
        );
    }

    #[test]
    fn test_parse_article_primary_selectors() {
        let html = page(
            r#"<h1 class="td-page-title">  Élections   législatives </h1>"#,
            r#"<div class="td-post-content"><p>Premier paragraphe.</p><p></p><p>Second.</p></div>"#,
        );
        let (title, content) = parse_article(&html).unwrap();
        assert_eq!(title, "Élections législatives");
        assert_eq!(content, "Premier paragraphe.\nSecond.");
    }

    #[test]
    fn test_parse_article_fallback_selectors() {
        let html = page(
            "<h1>Titre simple</h1>",
            r#"<div class="elementor-widget-theme-post-content">Texte brut<br>sur deux lignes</div>"#,
        );
        let (title, content) = parse_article(&html).unwrap();
        assert_eq!(title, "Titre simple");
        assert_eq!(content, "Texte brut\nsur deux lignes");
    }

    #[test]
    fn test_parse_article_empty_primary_title_falls_back() {
        let html = page(
            r#"<h1 class="td-page-title">   </h1><h1>Législatives : le calendrier</h1>"#,
            r#"<div class="td-post-content"><p>Le calendrier est publié.</p></div>"#,
        );
        let (title, content) = parse_article(&html).unwrap();
        assert_eq!(title, "Législatives : le calendrier");
        assert_eq!(content, "Le calendrier est publié.");
    }

    #[test]
    fn test_parse_article_requires_title_and_body() {
        assert!(parse_article(&page("", r#"<div class="td-post-content"><p>x</p></div>"#)).is_none());
        assert!(parse_article(&page("<h1>Titre</h1>", "<div>pas de contenu</div>")).is_none());
    }

    #[test]
    fn test_keyword_filter() {
        assert!(mentions_election("La PRÉSIDENTIELLE approche", ""));
        assert!(mentions_election("Actualité", "Les élections législatives auront lieu"));
        assert!(!mentions_election("Budget 2025", "Le conseil des ministres a adopté"));
    }

    #[test]
    fn test_to_election_article_description_is_first_line() {
        let article = to_election_article(
            "https://lesoleil.sn/a",
            "Présidentielle".to_string(),
            "Ligne une.\nLigne deux.".to_string(),
        )
        .unwrap();
        assert_eq!(article.description, "Ligne une.");
        assert_eq!(article.url, "https://lesoleil.sn/a");

        assert!(to_election_article("u", "Sport".to_string(), "Football".to_string()).is_none());
    }

    #[tokio::test]
    async fn test_scrape_end_to_end() {
        let server = MockServer::start().await;
        let index = r#"<a class="elementor-cta" href="/a1">1</a>
                       <a class="elementor-cta" href="/a2">2</a>
                       <a class="elementor-cta" href="/missing">3</a>"#;
        Mock::given(method("GET"))
            .and(path("/politique/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(
                r#"<h1 class="td-page-title">Vers la présidentielle</h1>"#,
                r#"<div class="td-post-content"><p>Les candidats se préparent.</p></div>"#,
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(
                "<h1>Agriculture</h1>",
                r#"<div class="td-post-content"><p>La campagne arachidière.</p></div>"#,
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = LeSoleilScraper::new(&format!("{}/politique/", server.uri())).unwrap();
        let articles = scraper.scrape().await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Vers la présidentielle");
        assert_eq!(articles[0].description, "Les candidats se préparent.");
        assert_eq!(articles[0].url, format!("{}/a1", server.uri()));
    }

    #[tokio::test]
    async fn test_index_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let scraper = LeSoleilScraper::new(&server.uri()).unwrap();
        assert!(matches!(
            scraper.scrape().await,
            Err(ScraperError::Request(_))
        ));
    }
}
