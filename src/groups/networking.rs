use serde::Deserialize;

use crate::options::{Mutation, OptionsGroup, ParametrizedValue, Scope};
use crate::section::Section;

/// Sockets and connection-level tuning.
#[derive(Debug, Clone, Default)]
pub struct Networking;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkingParams {
    /// Internal buffer size for request headers, bytes.
    pub buffer_size: Option<u32>,
    /// Socket listen queue size.
    pub listen_queue_size: Option<u32>,
}

/// A socket to bind. Each kind is filed under its own directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Socket {
    /// Socket speaking the default protocol.
    Default { address: String },
    Http { address: String },
    Https { address: String, cert: String, key: String },
    Uwsgi { address: String },
    /// Socket created before privileges drop, to be referenced by other sockets.
    Shared { address: String },
}

impl Socket {
    fn into_value(self) -> ParametrizedValue {
        match self {
            Socket::Default { address } => socket_value("socket").arg(address),
            Socket::Http { address } => socket_value("http-socket").arg(address),
            Socket::Https { address, cert, key } => socket_value("https-socket")
                .joiner(",")
                .args([address, cert, key]),
            Socket::Uwsgi { address } => socket_value("uwsgi-socket").arg(address),
            Socket::Shared { address } => socket_value("shared-socket").arg(address),
        }
    }
}

fn socket_value(key: &str) -> ParametrizedValue {
    ParametrizedValue::new(key).key(key)
}

impl OptionsGroup for Networking {
    const ID: &'static str = "networking";
    type Params = NetworkingParams;

    fn set_basic_params<'a>(mut scope: Scope<'a, Self>, params: Self::Params) -> &'a mut Section {
        scope.set(Mutation::new("buffer-size", params.buffer_size));
        scope.set(Mutation::new("listen", params.listen_queue_size));
        scope.into_section()
    }
}

impl<'a> Scope<'a, Networking> {
    pub fn register_socket(mut self, socket: Socket) -> &'a mut Section {
        self.set(Mutation::new("socket", socket.into_value()).multi());
        self.into_section()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_params() {
        let mut section = Section::new();
        section.networking().call(NetworkingParams {
            buffer_size: Some(8192),
            listen_queue_size: None,
        });
        assert_eq!(section.render(false), "[uwsgi]\nbuffer-size = 8192\n");
    }

    #[test]
    fn test_sockets_filed_under_own_keys() {
        let mut section = Section::new();
        section
            .networking()
            .register_socket(Socket::Default { address: ":3031".into() })
            .networking()
            .register_socket(Socket::Http { address: ":8080".into() })
            .networking()
            .register_socket(Socket::Https {
                address: ":443".into(),
                cert: "a.crt".into(),
                key: "a.key".into(),
            })
            .networking()
            .register_socket(Socket::Http { address: ":8081".into() });

        assert_eq!(
            section.render(false),
            "[uwsgi]\nsocket = :3031\nhttp-socket = :8080\nhttp-socket = :8081\n\
             https-socket = :443,a.crt,a.key\n"
        );
    }
}
