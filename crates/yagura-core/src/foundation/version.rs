//! API version of the layer contract.
//!
//! Versions are encoded as `major << 16 | minor`. A layer built against the
//! same major version and a minor version no newer than the host's is
//! compatible.

/// API version implemented by this runtime.
pub const YAGURA_API_VERSION: u32 = api_version(1, 0);

/// Encodes a `major.minor` pair.
pub const fn api_version(major: u16, minor: u16) -> u32 {
    ((major as u32) << 16) | minor as u32
}

/// Checks whether a layer requiring `required` can run on this host.
pub const fn is_compatible(required: u32) -> bool {
    let host_major = YAGURA_API_VERSION >> 16;
    let host_minor = YAGURA_API_VERSION & 0xFFFF;
    (required >> 16) == host_major && (required & 0xFFFF) <= host_minor
}

/// Formats an encoded version as `major.minor`.
pub fn format_version(version: u32) -> String {
    format!("{}.{}", version >> 16, version & 0xFFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        assert!(is_compatible(YAGURA_API_VERSION));
        assert!(is_compatible(api_version(1, 0)));
        assert!(!is_compatible(api_version(1, 1)));
        assert!(!is_compatible(api_version(0, 9)));
        assert!(!is_compatible(api_version(2, 0)));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_version(api_version(3, 14)), "3.14");
    }
}
