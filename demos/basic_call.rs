//! Basic demo executing a GET and a POST request.
//!
//! This demo shows how to:
//! - Describe a call with `RequestConfig`
//! - Enforce expected status codes
//! - Read the normalized status, headers and body
//! - Tell configuration errors apart from failed calls
//!
//! Run with: `cargo run --example basic_call`

use reqexec::{execute, Error, RequestConfig};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("reqexec=debug,basic_call=info")
        .init();

    println!("=== GET Request Example ===");
    let config = RequestConfig::new("https://jsonplaceholder.typicode.com/posts/1")
        .with_header("Accept", "application/json")
        .with_timeout(Duration::from_secs(5))
        .with_expected_status_codes([200])
        .with_fail_on_http_error(true);

    let result = execute(&config).await?;
    let post: Post = result.json()?;
    println!("Status code: {}", result.response_code);
    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!("Content-Type: {:?}", result.header("content-type"));
    println!();

    println!("=== POST Request Example ===");
    let config = RequestConfig::new("https://jsonplaceholder.typicode.com/posts")
        .with_method("POST")
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"title":"My New Post","body":"Hello","userId":1}"#)
        .with_http_version("HTTP2")
        .with_expected_status_codes([201])
        .with_fail_on_http_error(true);

    let result = execute(&config).await?;
    println!("Status code: {}", result.response_code);
    println!("Raw response length: {} bytes", result.response_body.len());
    println!();

    println!("=== Configuration Error Example ===");
    let config = RequestConfig::new("https://jsonplaceholder.typicode.com/posts/1")
        .with_http_version("HTTP3")
        .with_tls_min_version("TLS12");

    match execute(&config).await {
        Err(e) if e.is_configuration_error() => println!("Rejected before connecting: {}", e),
        Err(e) => println!("Call failed: {}", e),
        Ok(result) => println!("Unexpected success: {}", result.response_code),
    }

    Ok(())
}
