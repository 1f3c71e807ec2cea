use std::fs;
use std::time::Duration;

use fifolink_endpoint::{Endpoint, Role};
use tokio_util::sync::CancellationToken;

use crate::cmd::SendArgs;
use crate::exit::{endpoint_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_frame, OutputFormat};

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let token = CancellationToken::new();
    let endpoint = Endpoint::open(&args.root, Role::Client, args.pipes.to_config(), &token)
        .map_err(|err| endpoint_error("open failed", err))?;

    endpoint
        .send(&payload)
        .await
        .map_err(|err| endpoint_error("send failed", err))?;

    if args.wait {
        let frame = tokio::time::timeout(wait_timeout, endpoint.recv(true))
            .await
            .map_err(|_| CliError::new(TIMEOUT, format!("no response within {wait_timeout:?}")))?
            .map_err(|err| endpoint_error("receive failed", err))?;
        print_frame(&frame, format);
    }

    endpoint
        .close()
        .await
        .map_err(|err| endpoint_error("close failed", err))?;
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::PipeArgs;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn resolve_payload_prefers_inline_data() {
        let args = SendArgs {
            root: "/tmp".into(),
            data: Some("hello".to_string()),
            file: None,
            wait: false,
            wait_timeout: "5s".to_string(),
            pipes: PipeArgs::default(),
        };
        assert_eq!(resolve_payload(&args).unwrap(), b"hello");
    }

    #[test]
    fn resolve_payload_defaults_to_empty() {
        let args = SendArgs {
            root: "/tmp".into(),
            data: None,
            file: None,
            wait: false,
            wait_timeout: "5s".to_string(),
            pipes: PipeArgs::default(),
        };
        assert!(resolve_payload(&args).unwrap().is_empty());
    }
}
