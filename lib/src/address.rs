use rustls_pki_types::ServerName;

use crate::error::Details;
use crate::Error;

/// Split `host:port` or `[host]:port` into its host and port parts
///
/// The port may be empty, but the separator may not be missing. Unbracketed hosts may not
/// contain a colon, so IPv6 literals must be bracketed.
pub(crate) fn split_host_port(address: &str) -> Result<(&str, &str), Error> {
    let invalid = |reason| Details::Address {
        address: address.to_string(),
        reason,
    };

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let end = rest.find(']').ok_or_else(|| invalid("missing ']'"))?;
        let host = &rest[..end];
        let port = match rest[end + 1..].strip_prefix(':') {
            Some(port) => port,
            None if end + 1 == rest.len() => return Err(invalid("missing port").into()),
            None => return Err(invalid("unexpected characters after ']'").into()),
        };
        (host, port)
    } else {
        let colon = address.rfind(':').ok_or_else(|| invalid("missing port"))?;
        let host = &address[..colon];
        if host.contains(':') {
            return Err(invalid("too many colons").into());
        }
        (host, &address[colon + 1..])
    };

    if host.contains(['[', ']']) {
        return Err(invalid("unexpected '[' or ']' in host").into());
    }
    if port.contains(['[', ']']) {
        return Err(invalid("unexpected '[' or ']' in port").into());
    }

    Ok((host, port))
}

/// Name the peer certificate is validated against when connecting to `address`
pub(crate) fn server_name(address: &str) -> Result<ServerName<'static>, Error> {
    let (host, _) = split_host_port(address)?;
    ServerName::try_from(host.to_string()).map_err(|_| Details::ServerName(host.to_string()).into())
}
