// tests/http.rs
// =============================================================================
// The reqwest-backed fetcher and prober against a tiny local HTTP server.
// =============================================================================

use std::io::{Read as _, Write as _};
use std::net::TcpListener;
use std::time::Duration;

use site_guardian::checker::{check_single_link, HttpProber, LinkStatus};
use site_guardian::crawl::{crawl_internal_links, BrokenStatus, CrawlOptions, HttpPageFetcher};

/// (method, path) -> (status line, body). Anything else is a 404.
type Route = (&'static str, &'static str, &'static str, &'static str);

fn start_server(routes: &'static [Route]) -> String {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let _ = stream.set_read_timeout(Some(Duration::from_secs(1)));

            let mut buf = Vec::new();
            let mut tmp = [0u8; 4096];
            for _ in 0..64 {
                match stream.read(&mut tmp) {
                    Ok(0) => break,
                    Ok(n) => {
                        buf.extend_from_slice(&tmp[..n]);
                        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            let request = String::from_utf8_lossy(&buf);
            let mut first = request.lines().next().unwrap_or("").split_whitespace();
            let method = first.next().unwrap_or("").to_string();
            let path = first.next().unwrap_or("").to_string();

            let (status_line, body) = routes
                .iter()
                .find(|(m, p, _, _)| *m == method && *p == path)
                .map(|(_, _, s, b)| (*s, *b))
                .unwrap_or(("404 Not Found", "not found"));

            let body = if method == "HEAD" { "" } else { body };
            let resp = format!(
                "HTTP/1.1 {status_line}\r\n\
Content-Type: text/html\r\n\
Content-Length: {}\r\n\
Connection: close\r\n\
\r\n\
{body}",
                body.len()
            );
            let _ = stream.write_all(resp.as_bytes());
            let _ = stream.flush();
        }
    });

    format!("http://{addr}")
}

fn prober() -> HttpProber {
    HttpProber::new(Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn head_not_allowed_is_retried_with_get() {
    static ROUTES: &[Route] = &[
        ("HEAD", "/no-head", "405 Method Not Allowed", ""),
        ("GET", "/no-head", "200 OK", "hello"),
    ];
    let base = start_server(ROUTES);

    let result = check_single_link(&prober(), &format!("{base}/no-head"), "/").await;
    assert_eq!(result.status, LinkStatus::Ok(200));
    assert!(result.is_ok());
}

#[tokio::test]
async fn missing_page_is_broken() {
    static ROUTES: &[Route] = &[];
    let base = start_server(ROUTES);

    let result = check_single_link(&prober(), &format!("{base}/missing"), "/").await;
    assert_eq!(result.status, LinkStatus::Broken(404));
    assert!(!result.is_ok());
}

#[tokio::test]
async fn refused_connection_is_an_error() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    drop(listener);

    let result = check_single_link(&prober(), &format!("http://{addr}/"), "/").await;
    assert!(matches!(result.status, LinkStatus::Error(_)), "{:?}", result.status);
}

#[tokio::test]
async fn crawl_served_site() {
    static ROUTES: &[Route] = &[
        (
            "GET",
            "/",
            "200 OK",
            r#"<html><body>
                <a href="/about/">About</a>
                <a href="/broken/">Broken</a>
                <a href="/about/#team">Team</a>
                <a href="mailto:hi@example.com">Mail</a>
            </body></html>"#,
        ),
        ("GET", "/about/", "200 OK", r#"<a href="/">Home</a>"#),
    ];
    let base = start_server(ROUTES);

    let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).expect("client");
    let report = crawl_internal_links(&base, &fetcher, &CrawlOptions::default()).await;

    assert_eq!(report.visited, vec!["/", "/about/", "/broken/"]);
    assert_eq!(report.broken_links.len(), 1);
    assert_eq!(report.broken_links[0].url, "/broken/");
    assert_eq!(report.broken_links[0].status, BrokenStatus::Code(404));
    assert_eq!(report.broken_links[0].found_on, "/");
}
