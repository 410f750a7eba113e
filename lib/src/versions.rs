/// Specifies which protocol versions an acceptor will negotiate
///
/// Callers ignore this setting and always pin TLS 1.2 as both the minimum and maximum version.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolVersions {
    /// Allow TLS 1.2
    v1_2: bool,
    /// Allow TLS 1.3
    v1_3: bool,
}

impl ProtocolVersions {
    /// The only version a caller will negotiate
    pub(crate) const CALLER_PIN: Self = Self {
        v1_2: true,
        v1_3: false,
    };

    /// Construct ProtocolVersions with nothing enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct ProtocolVersions with only TLS 1.2 enabled
    pub fn v12_only() -> Self {
        Self::new().enable_v12()
    }

    /// Construct ProtocolVersions with only TLS 1.3 enabled
    pub fn v13_only() -> Self {
        Self::new().enable_v13()
    }

    /// Enable support for TLS 1.2
    pub fn enable_v12(self) -> Self {
        Self { v1_2: true, ..self }
    }

    /// Enable support for TLS 1.3
    pub fn enable_v13(self) -> Self {
        Self { v1_3: true, ..self }
    }

    /// True if no version is enabled, in which case no handshake can succeed
    pub fn is_empty(self) -> bool {
        !(self.v1_2 || self.v1_3)
    }

    pub(crate) fn versions(self) -> &'static [&'static rustls::SupportedProtocolVersion] {
        static V12_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS12];
        static V13_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];
        static V12_AND_V13: &[&rustls::SupportedProtocolVersion] =
            &[&rustls::version::TLS12, &rustls::version::TLS13];

        match (self.v1_2, self.v1_3) {
            (false, false) => &[],
            (false, true) => V13_ONLY,
            (true, false) => V12_ONLY,
            (true, true) => V12_AND_V13,
        }
    }
}
