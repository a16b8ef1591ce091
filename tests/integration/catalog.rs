//! Miniature catalog served by a mock server

use catalog_sentinel::config::Config;
use catalog_sentinel::crawler::SharedStorage;
use catalog_sentinel::storage::SqliteStorage;
use std::path::Path;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One detail page in the mock catalog
#[derive(Debug, Clone)]
pub struct Book {
    pub slug: String,
    pub name: String,
    pub price_incl_tax: f64,
    pub price_excl_tax: f64,
    pub availability: String,
    pub rating: &'static str,
    pub reviews: u32,
}

impl Book {
    pub fn new(slug: &str, name: &str, price: f64) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            price_incl_tax: price,
            price_excl_tax: price,
            availability: "In stock (22 available)".to_string(),
            rating: "Three",
            reviews: 0,
        }
    }

    pub fn path(&self) -> String {
        format!("/catalogue/{}/index.html", self.slug)
    }

    pub fn url(&self, server: &MockServer) -> String {
        format!("{}{}", server.uri(), self.path())
    }

    pub fn html(&self) -> String {
        format!(
            r#"<html><body>
  <ul class="breadcrumb">
    <li><a href="../../index.html">Home</a></li>
    <li><a href="../category/books_1/index.html">Books</a></li>
    <li><a href="../category/books/poetry_23/index.html">Poetry</a></li>
    <li class="active">{name}</li>
  </ul>
  <div class="item active"><img src="../../media/cache/{slug}.jpg" /></div>
  <h1>{name}</h1>
  <p class="star-rating {rating}"></p>
  <div id="product_description"><h2>Product Description</h2></div>
  <p>About {name}.</p>
  <table class="table table-striped">
    <tr><th>Price (excl. tax)</th><td>£{excl:.2}</td></tr>
    <tr><th>Price (incl. tax)</th><td>£{incl:.2}</td></tr>
    <tr><th>Availability</th><td>{availability}</td></tr>
    <tr><th>Number of reviews</th><td>{reviews}</td></tr>
  </table>
</body></html>"#,
            name = self.name,
            slug = self.slug,
            rating = self.rating,
            excl = self.price_excl_tax,
            incl = self.price_incl_tax,
            availability = self.availability,
            reviews = self.reviews,
        )
    }
}

/// Three books over two listing pages
pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new("a-light-in-the-attic_1000", "A Light in the Attic", 51.77),
        Book::new("tipping-the-velvet_999", "Tipping the Velvet", 53.74),
        Book::new("soumission_998", "Soumission", 50.10),
    ]
}

/// Renders a listing page with a "Page X of Y" pager
pub fn index_page(hrefs: &[String], page: u32, total: u32) -> String {
    let articles: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<li><article class="product_pod"><h3><a href="{}">x</a></h3></article></li>"#,
                href
            )
        })
        .collect();

    format!(
        r#"<html><body><ol class="row">{}</ol>
  <ul class="pager"><li class="current">Page {} of {}</li></ul>
</body></html>"#,
        articles, page, total
    )
}

/// Mounts the listing pages: the first two books on page 1, the rest on page 2
pub async fn mount_listing(server: &MockServer, books: &[Book]) {
    let (first, rest) = books.split_at(books.len().min(2));

    let first_hrefs: Vec<String> = first
        .iter()
        .map(|b| format!("catalogue/{}/index.html", b.slug))
        .collect();
    let rest_hrefs: Vec<String> = rest
        .iter()
        .map(|b| format!("../../{}/index.html", b.slug))
        .collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&first_hrefs, 1, 2)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&rest_hrefs, 2, 2)))
        .mount(server)
        .await;
}

/// Mounts one detail page
pub async fn mount_book(server: &MockServer, book: &Book) {
    Mock::given(method("GET"))
        .and(path(book.path()))
        .respond_with(ResponseTemplate::new(200).set_body_string(book.html()))
        .mount(server)
        .await;
}

/// Mounts the listing and every detail page
pub async fn mount_catalog(server: &MockServer, books: &[Book]) {
    mount_listing(server, books).await;
    for book in books {
        mount_book(server, book).await;
    }
}

/// Configuration pointed at the mock server with fast retries
pub fn test_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::for_base_url(
        format!("{}/", server.uri()),
        dir.join("catalog.db").to_string_lossy().to_string(),
    );
    config.fetcher.batch_size = 2;
    config.fetcher.max_concurrent_requests = 4;
    config.retry.min_wait_ms = 10;
    config.retry.max_wait_ms = 20;
    config.output.report_dir = dir.join("reports").to_string_lossy().to_string();
    config.output.reports = vec!["json".to_string()];
    config
}

/// Opens the store named in the configuration
pub fn open_store(config: &Config) -> SharedStorage {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    Arc::new(Mutex::new(storage))
}

/// Counts requests the server received for a path
pub async fn request_count(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}
