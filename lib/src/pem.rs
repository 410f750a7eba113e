use rustls_pki_types::{
    CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};

/// Error type used by the library that implements [`std::error::Error`]
#[derive(Debug)]
pub(crate) struct Error {
    details: ErrorDetails,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.details {
            ErrorDetails::InvalidPem(err) => write!(f, "invalid PEM: {err}"),
            ErrorDetails::DecryptionError(err) => write!(f, "PKCS#8 error: {err}"),
            ErrorDetails::NoPrivateKey => {
                f.write_str("PEM data does not contain a supported private key")
            }
            ErrorDetails::MoreThanOnePrivateKey => {
                f.write_str("PEM data contains more than one supported private key")
            }
            ErrorDetails::NoCertificate => f.write_str("PEM data does not contain a certificate"),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug)]
enum ErrorDetails {
    InvalidPem(pem::PemError),
    DecryptionError(pkcs8::Error),
    NoPrivateKey,
    MoreThanOnePrivateKey,
    NoCertificate,
}

/// Read at least one certificate from PEM data, ignoring sections that are not certificates
pub(crate) fn read_certificates<B: AsRef<[u8]>>(
    bytes: B,
) -> Result<Vec<CertificateDer<'static>>, Error> {
    let certs: Vec<CertificateDer<'static>> = pem::parse_many(bytes)?
        .into_iter()
        .filter(|x| x.tag() == "CERTIFICATE")
        .map(|x| CertificateDer::from(x.into_contents()))
        .collect();

    if certs.is_empty() {
        return Err(ErrorDetails::NoCertificate.into());
    }

    Ok(certs)
}

/// Read exactly one private key from PEM data that may also contain certificates.
///
/// With a password, the key must be a PKCS #8 'ENCRYPTED PRIVATE KEY'. Without one, the key may be
/// PKCS #8 ('PRIVATE KEY'), PKCS #1 ('RSA PRIVATE KEY') or SEC1 ('EC PRIVATE KEY').
pub(crate) fn read_private_key<B: AsRef<[u8]>>(
    bytes: B,
    password: Option<&str>,
) -> Result<PrivateKeyDer<'static>, Error> {
    let sections = pem::parse_many(bytes)?;
    match password {
        Some(password) => {
            let data = find_only_key(&sections, ENCRYPTED_KEY_TAGS)?;
            let parsed = pkcs8::EncryptedPrivateKeyInfo::try_from(data.contents())?;
            let document = parsed.decrypt(password.as_bytes())?;
            Ok(PrivatePkcs8KeyDer::from(document.as_bytes().to_vec()).into())
        }
        None => {
            let section = find_only_key(&sections, PLAINTEXT_KEY_TAGS)?;
            let der = section.contents().to_vec();
            let key: PrivateKeyDer<'static> = match section.tag() {
                "RSA PRIVATE KEY" => PrivatePkcs1KeyDer::from(der).into(),
                "EC PRIVATE KEY" => PrivateSec1KeyDer::from(der).into(),
                _ => PrivatePkcs8KeyDer::from(der).into(),
            };
            Ok(key)
        }
    }
}

const ENCRYPTED_KEY_TAGS: &[&str] = &["ENCRYPTED PRIVATE KEY"];
const PLAINTEXT_KEY_TAGS: &[&str] = &["PRIVATE KEY", "RSA PRIVATE KEY", "EC PRIVATE KEY"];

fn find_only_key<'a>(
    sections: &'a [pem::Pem],
    allowed_tags: &'static [&'static str],
) -> Result<&'a pem::Pem, Error> {
    let mut iter = sections.iter();
    let first = match iter.find(|x| allowed_tags.contains(&x.tag())) {
        Some(x) => x,
        None => return Err(ErrorDetails::NoPrivateKey.into()),
    };

    if iter.any(|x| allowed_tags.contains(&x.tag())) {
        return Err(ErrorDetails::MoreThanOnePrivateKey.into());
    }

    Ok(first)
}

impl From<pem::PemError> for Error {
    fn from(err: pem::PemError) -> Self {
        ErrorDetails::InvalidPem(err).into()
    }
}

impl From<pkcs8::Error> for Error {
    fn from(err: pkcs8::Error) -> Self {
        ErrorDetails::DecryptionError(err).into()
    }
}

impl From<ErrorDetails> for Error {
    fn from(details: ErrorDetails) -> Self {
        Error { details }
    }
}
