use crate::bridge::{self, Operation};
use crate::error::{Error, Result};
use crate::native::{Destination, NativeSocket, Request};

use std::net::{IpAddr, SocketAddr};

fn require_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(Error::argument("port", "port 0 cannot be connected to"));
    }

    Ok(())
}

fn start<S>(socket: &S, destination: Destination) -> Operation<Result<()>>
where
    S: NativeSocket + ?Sized,
{
    bridge::drive(socket, Request::Connect(destination), |outcome, _| {
        outcome.map(drop)
    })
}

pub(super) fn connect_host<S>(socket: &S, host: &str, port: u16) -> Result<Operation<Result<()>>>
where
    S: NativeSocket + ?Sized,
{
    if host.trim().is_empty() {
        return Err(Error::argument("host", "host name is empty"));
    }

    require_port(port)?;

    Ok(start(
        socket,
        Destination::Host {
            host: host.to_string(),
            port,
        },
    ))
}

pub(super) fn connect_address<S>(
    socket: &S,
    address: IpAddr,
    port: u16,
) -> Result<Operation<Result<()>>>
where
    S: NativeSocket + ?Sized,
{
    require_port(port)?;

    Ok(start(socket, Destination::Address { address, port }))
}

pub(super) fn connect_addresses<S>(
    socket: &S,
    addresses: &[IpAddr],
    port: u16,
) -> Result<Operation<Result<()>>>
where
    S: NativeSocket + ?Sized,
{
    if addresses.is_empty() {
        return Err(Error::argument("addresses", "address list is empty"));
    }

    require_port(port)?;

    Ok(start(
        socket,
        Destination::Addresses {
            addresses: addresses.to_vec(),
            port,
        },
    ))
}

pub(super) fn connect<S>(socket: &S, endpoint: SocketAddr) -> Result<Operation<Result<()>>>
where
    S: NativeSocket + ?Sized,
{
    require_port(endpoint.port())?;

    Ok(start(socket, Destination::Endpoint(endpoint)))
}
