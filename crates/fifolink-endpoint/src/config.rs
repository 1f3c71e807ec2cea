use fifolink_frame::DEFAULT_DELIM;

/// Default name of the pipe a server reads (and a client writes).
pub const DEFAULT_READ_PIPE: &str = "fifolink.1.r";

/// Default name of the pipe a server writes (and a client reads).
pub const DEFAULT_WRITE_PIPE: &str = "fifolink.1.w";

/// Endpoint construction options.
///
/// An explicit immutable value handed to [`crate::Endpoint::open`]; there
/// is no process-wide default state to mutate. Pipe names are given from
/// the server's perspective — a client endpoint swaps them so both parties
/// agree on the same two files.
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    /// File name of the server-read pipe, inside the root directory.
    pub read_pipe_name: String,
    /// File name of the server-write pipe, inside the root directory.
    pub write_pipe_name: String,
    /// Delimiter byte terminating every frame.
    pub delim: u8,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            read_pipe_name: DEFAULT_READ_PIPE.to_string(),
            write_pipe_name: DEFAULT_WRITE_PIPE.to_string(),
            delim: DEFAULT_DELIM,
        }
    }
}

impl EndpointConfig {
    /// Override the server-read pipe file name.
    pub fn with_read_pipe_name(mut self, name: impl Into<String>) -> Self {
        self.read_pipe_name = name.into();
        self
    }

    /// Override the server-write pipe file name.
    pub fn with_write_pipe_name(mut self, name: impl Into<String>) -> Self {
        self.write_pipe_name = name.into();
        self
    }

    /// Override the frame delimiter byte.
    pub fn with_delim(mut self, delim: u8) -> Self {
        self.delim = delim;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol() {
        let config = EndpointConfig::default();
        assert_eq!(config.read_pipe_name, "fifolink.1.r");
        assert_eq!(config.write_pipe_name, "fifolink.1.w");
        assert_eq!(config.delim, b'\n');
    }

    #[test]
    fn builder_overrides() {
        let config = EndpointConfig::default()
            .with_read_pipe_name("in.pipe")
            .with_write_pipe_name("out.pipe")
            .with_delim(b'\r');
        assert_eq!(config.read_pipe_name, "in.pipe");
        assert_eq!(config.write_pipe_name, "out.pipe");
        assert_eq!(config.delim, b'\r');
    }
}
