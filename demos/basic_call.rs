//! Basic example demonstrating plain and typed requests.
//!
//! This example shows how to:
//! - Create a client with a timeout and a retry policy
//! - Make a plain GET request with query options
//! - Make a typed POST request through the JSON wrapper
//!
//! Run with: `cargo run --example basic_call`

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sturdyhttp::options::set_query;
use sturdyhttp::retry::backoff;
use sturdyhttp::{Client, Error};

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
    body: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("sturdyhttp=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .retry(backoff::exponential(
            Duration::from_millis(100),
            Duration::from_secs(2),
            3,
            true,
        ))
        .build()?;

    println!("=== GET Request Example ===");
    let body = client
        .get(
            "https://jsonplaceholder.typicode.com/posts",
            vec![set_query("userId", "1")],
        )
        .await?;
    println!("Raw response: {} bytes", body.len());
    println!();

    println!("=== Typed POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let created: Option<Post> = client
        .json()
        .post("https://jsonplaceholder.typicode.com/posts", Some(&new_post), vec![])
        .await?;
    if let Some(post) = created {
        println!("Created post ID: {}", post.id);
    }

    Ok(())
}
