use std::sync::Arc;

use fifolink_endpoint::{Endpoint, EndpointError, Role};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cmd::ListenArgs;
use crate::exit::{endpoint_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub async fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let token = CancellationToken::new();
    let endpoint = Arc::new(
        Endpoint::open(&args.root, Role::Server, args.pipes.to_config(), &token)
            .map_err(|err| endpoint_error("open failed", err))?,
    );

    install_ctrl_c(token.clone());

    let listener = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.listen().await })
    };

    let mut printed = 0usize;
    loop {
        match endpoint.recv(true).await {
            Ok(frame) => {
                print_frame(&frame, format);
                printed = printed.saturating_add(1);
                if let Some(count) = args.count {
                    if printed >= count {
                        break;
                    }
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
    info!(printed, "listen finished");
    Ok(SUCCESS)
}

pub fn install_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}
