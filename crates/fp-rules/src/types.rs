//! Flag types for parsed network rules

// =============================================================================
// Rule Flags
// =============================================================================

bitflags::bitflags! {
    /// Flags for rule behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleFlags: u16 {
        /// `@@` exception rule
        const EXCEPTION = 1 << 0;
        /// Case-sensitive matching ($match-case)
        const MATCH_CASE = 1 << 1;
        /// Rule has right anchor (ends with |)
        const HAS_RIGHT_ANCHOR = 1 << 2;
        /// Rule has hostname anchor (||)
        const HAS_HOST_ANCHOR = 1 << 3;
        /// Rule has left anchor (starts with |)
        const HAS_LEFT_ANCHOR = 1 << 4;
    }
}

// =============================================================================
// Scheme Mask
// =============================================================================

bitflags::bitflags! {
    /// URL scheme mask. An empty mask places no restriction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SchemeMask: u8 {
        const HTTP = 1 << 0;
        const HTTPS = 1 << 1;
        const WS = 1 << 2;
        const WSS = 1 << 3;
        const DATA = 1 << 4;
        const FTP = 1 << 5;

        const ALL = 0x3F;
    }
}

impl SchemeMask {
    /// Mask for an option name such as `https`.
    pub fn from_option(name: &str) -> Option<Self> {
        match name {
            "http" => Some(Self::HTTP),
            "https" => Some(Self::HTTPS),
            "ws" => Some(Self::WS),
            "wss" => Some(Self::WSS),
            "data" => Some(Self::DATA),
            "ftp" => Some(Self::FTP),
            _ => None,
        }
    }

    /// Whether a URL with scheme `scheme` passes this mask.
    #[inline]
    pub fn allows(self, scheme: Option<SchemeMask>) -> bool {
        if self.is_empty() {
            return true;
        }
        match scheme {
            Some(scheme) => self.intersects(scheme),
            None => false,
        }
    }
}
