use rustls::Error;
use rustls_pki_types::CertificateDer;

/// Extract the subject common name (CN) of a certificate
///
/// Returns `Ok(None)` if the subject has no CN. Subject alternative names are not consulted.
pub(crate) fn subject_common_name(cert: &CertificateDer) -> Result<Option<String>, Error> {
    let parsed_cert = rx509::x509::Certificate::parse(cert)
        .map_err(|err| Error::General(format!("unable to parse certificate w/ rx509: {err}")))?;

    let subject = parsed_cert
        .tbs_certificate
        .value
        .subject
        .parse()
        .map_err(|err| {
            Error::General(format!(
                "unable to parse certificate subject w/ rx509: {err:?}"
            ))
        })?;

    Ok(subject.common_name.map(|cn| cn.to_string()))
}
