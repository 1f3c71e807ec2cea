use std::sync::Arc;

use fifolink_endpoint::{Endpoint, EndpointError, Role};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cmd::EchoArgs;
use crate::exit::{endpoint_error, CliResult, SUCCESS};

/// Serve forever, answering every message with its own payload.
pub async fn run(args: EchoArgs) -> CliResult<i32> {
    let token = CancellationToken::new();
    let endpoint = Arc::new(
        Endpoint::open(&args.root, Role::Server, args.pipes.to_config(), &token)
            .map_err(|err| endpoint_error("open failed", err))?,
    );

    crate::cmd::listen::install_ctrl_c(token.clone());
    info!(root = %args.root.display(), "echo server ready");

    let listener = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.listen().await })
    };

    loop {
        match endpoint.recv(true).await {
            Ok(frame) => {
                debug!(bytes = frame.payload().len(), "echoing message");
                let reply = frame.respond(frame.payload());
                if let Err(err) = endpoint.send(reply.as_bytes()).await {
                    let _ = endpoint.close().await;
                    return Err(endpoint_error("echo reply failed", err));
                }
            }
            Err(EndpointError::Cancelled { .. }) | Err(EndpointError::Closed) => break,
            Err(err) => {
                let _ = endpoint.close().await;
                return Err(endpoint_error("receive failed", err));
            }
        }
    }

    token.cancel();
    if let Ok(result) = listener.await {
        result.map_err(|err| endpoint_error("listen failed", err))?;
    }
    endpoint
        .close()
        .await
        .map_err(|err| endpoint_error("close failed", err))?;
    Ok(SUCCESS)
}
