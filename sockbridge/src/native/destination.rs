use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

/// Where a connect request points to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Host { host: String, port: u16 },
    Address { address: IpAddr, port: u16 },
    Addresses { addresses: Vec<IpAddr>, port: u16 },
    Endpoint(SocketAddr),
}

impl Destination {
    /// Host name that must be resolved first, if any.
    pub fn host(&self) -> Option<&str> {
        match self {
            Destination::Host { host, .. } => Some(host),
            _ => None,
        }
    }

    /// Whether [`Destination::candidates`] has to ask the system resolver.
    /// Host strings holding an IP literal do not.
    pub(crate) fn needs_lookup(&self) -> bool {
        matches!(self, Destination::Host { host, .. } if host.parse::<IpAddr>().is_err())
    }

    /// Candidate endpoints, tried in order.
    ///
    /// Only [`Destination::Host`] performs a lookup; every other form maps
    /// directly.
    pub(crate) fn candidates(&self) -> io::Result<Vec<SocketAddr>> {
        match self {
            Destination::Host { host, port } => {
                let resolved: Vec<SocketAddr> = (host.as_str(), *port).to_socket_addrs()?.collect();

                if resolved.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no addresses found for `{host}`"),
                    ));
                }

                Ok(resolved)
            }
            Destination::Address { address, port } => Ok(vec![SocketAddr::new(*address, *port)]),
            Destination::Addresses { addresses, port } => Ok(addresses
                .iter()
                .map(|address| SocketAddr::new(*address, *port))
                .collect()),
            Destination::Endpoint(endpoint) => Ok(vec![*endpoint]),
        }
    }
}

impl From<SocketAddr> for Destination {
    fn from(endpoint: SocketAddr) -> Self {
        Destination::Endpoint(endpoint)
    }
}
