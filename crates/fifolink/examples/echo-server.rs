//! Minimal echo server — answers every client message with its own payload.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run -- send /tmp/fifolink-echo-example --data hello --wait

use std::fs;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fifolink::endpoint::{Endpoint, EndpointConfig, Role};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = std::path::PathBuf::from("/tmp/fifolink-echo-example");
    fs::create_dir_all(&root)?;

    let token = CancellationToken::new();
    let endpoint = Arc::new(Endpoint::open(
        &root,
        Role::Server,
        EndpointConfig::default(),
        &token,
    )?);
    eprintln!("Serving on {}", root.display());

    let listener = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.listen().await })
    };

    let ctrl = token.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl.cancel();
    });

    loop {
        match endpoint.recv(true).await {
            Ok(frame) => {
                eprintln!("Received {} bytes, echoing", frame.payload().len());
                let reply = frame.respond(frame.payload());
                endpoint.send(reply.as_bytes()).await?;
            }
            Err(err) => {
                eprintln!("Stopping: {err}");
                break;
            }
        }
    }

    let _ = listener.await;
    endpoint.close().await?;
    Ok(())
}
