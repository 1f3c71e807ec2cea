use std::fmt;

/// Which side of the pipe pair this endpoint plays.
///
/// The server creates and removes the FIFO files and runs the listen loop;
/// clients carry a sender id and read the pipe the server writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn is_server(self) -> bool {
        matches!(self, Role::Server)
    }

    pub fn is_client(self) -> bool {
        matches!(self, Role::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Server => f.write_str("server"),
        }
    }
}
