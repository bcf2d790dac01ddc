use scraper::{Html, Selector};

/// Plain text and raw hrefs pulled out of one HTML document.
#[derive(Debug, Default)]
pub struct PageContent {
    pub text: String,
    pub links: Vec<String>,
}

/// Extract the indexable text and every anchor href from an HTML body.
/// Hrefs come back exactly as written; resolution against the page URL is
/// the crawl engine's job.
pub fn extract_page(html: &str) -> PageContent {
    let sel_body = Selector::parse("body").expect("valid selector");
    let sel_a = Selector::parse("a").expect("valid selector");

    let doc = Html::parse_document(html);
    let text = doc
        .select(&sel_body)
        .next()
        .map(|body| body.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string();

    let links = doc
        .select(&sel_a)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    PageContent { text, links }
}
