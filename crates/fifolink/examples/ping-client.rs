//! Minimal client — sends one message and waits for the reply.
//!
//! Start `cargo run --example echo-server` first, then:
//!   cargo run --example ping-client

use tokio_util::sync::CancellationToken;

use fifolink::endpoint::{Endpoint, EndpointConfig, Role};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = std::path::PathBuf::from("/tmp/fifolink-echo-example");

    let token = CancellationToken::new();
    let endpoint = Endpoint::open(&root, Role::Client, EndpointConfig::default(), &token)?;

    let written = endpoint.send(b"nihao").await?;
    eprintln!("Sent {written} bytes");

    let reply = endpoint.recv(true).await?;
    println!("{}", String::from_utf8_lossy(reply.payload()));

    endpoint.close().await?;
    Ok(())
}
