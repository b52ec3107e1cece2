//! Versioned binary bundle of compiled targets.
//!
//! # Format
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Magic: "TIDX" (4 bytes)                  │
//! │ Version: u32 little-endian (4 bytes)     │
//! ├──────────────────────────────────────────┤
//! │ postcard payload: Vec<CompiledTarget>    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The header is fixed-size so the version can be checked before any payload
//! byte is interpreted. A bundle from another version is unreadable, not
//! corrupt: [`import`] reports both versions and yields no targets, while
//! [`decode_bundle`] returns [`TargetIdxError::VersionMismatch`].

use crate::record::CompiledTarget;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{TargetIdxError, TargetIdxResult};
use std::fmt;

/// Magic bytes at the start of every bundle.
pub const BUNDLE_MAGIC: [u8; 4] = *b"TIDX";

/// Format version written by this build.
pub const CURRENT_VERSION: u32 = 2;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 8;

/// A decoded bundle.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledBundle {
    pub version: u32,
    pub targets: Vec<CompiledTarget>,
}

/// Reads the magic and version without touching the payload.
pub fn peek_version(bytes: &[u8]) -> TargetIdxResult<u32> {
    if bytes.len() < HEADER_SIZE {
        return Err(TargetIdxError::InvalidBundle {
            reason: format!("header needs {HEADER_SIZE} bytes, got {}", bytes.len()),
        });
    }
    if bytes[..4] != BUNDLE_MAGIC {
        return Err(TargetIdxError::InvalidBundle {
            reason: "bad magic bytes".to_string(),
        });
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..HEADER_SIZE]);
    Ok(u32::from_le_bytes(version))
}

/// Encodes targets with an explicit version tag.
pub fn encode_bundle(version: u32, targets: &[CompiledTarget]) -> TargetIdxResult<Vec<u8>> {
    let _span = trace_span!("encode_bundle", targets = targets.len()).entered();
    let payload = postcard::to_allocvec(targets).map_err(|err| TargetIdxError::Encode {
        reason: err.to_string(),
    })?;
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&BUNDLE_MAGIC);
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&payload);
    trace_event!("bundle_encoded", bytes = out.len());
    Ok(out)
}

/// Strictly decodes a bundle of the current version.
///
/// The payload must be consumed exactly and every target must pass
/// [`CompiledTarget::validate`].
pub fn decode_bundle(bytes: &[u8]) -> TargetIdxResult<CompiledBundle> {
    let version = peek_version(bytes)?;
    if version != CURRENT_VERSION {
        return Err(TargetIdxError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: version,
        });
    }
    let (targets, rest): (Vec<CompiledTarget>, _) =
        postcard::take_from_bytes(&bytes[HEADER_SIZE..]).map_err(|err| {
            TargetIdxError::InvalidBundle {
                reason: err.to_string(),
            }
        })?;
    if !rest.is_empty() {
        return Err(TargetIdxError::InvalidBundle {
            reason: format!("{} trailing bytes after payload", rest.len()),
        });
    }
    for (idx, target) in targets.iter().enumerate() {
        target
            .validate()
            .map_err(|err| TargetIdxError::InvalidBundle {
                reason: format!("target {idx}: {err}"),
            })?;
    }
    Ok(CompiledBundle { version, targets })
}

/// Encodes targets with [`CURRENT_VERSION`].
pub fn export(targets: &[CompiledTarget]) -> TargetIdxResult<Vec<u8>> {
    encode_bundle(CURRENT_VERSION, targets)
}

/// A bundle left unread because another format version wrote it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VersionSkip {
    pub expected: u32,
    pub found: u32,
}

impl fmt::Display for VersionSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bundle version {} is not supported (expected {}); recompile the targets",
            self.found, self.expected
        )
    }
}

/// Outcome of a lenient [`import`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Imported {
    /// Decoded targets; empty when the bundle was skipped.
    pub targets: Vec<CompiledTarget>,
    /// Set when the bundle was written by another format version.
    pub skipped: Option<VersionSkip>,
}

/// Decodes targets, treating a version mismatch as "nothing readable".
///
/// A mismatch yields no targets and reports both versions in
/// [`Imported::skipped`] (and as a warning with the `tracing` feature);
/// structural damage is still an error.
pub fn import(bytes: &[u8]) -> TargetIdxResult<Imported> {
    match decode_bundle(bytes) {
        Ok(bundle) => Ok(Imported {
            targets: bundle.targets,
            skipped: None,
        }),
        Err(TargetIdxError::VersionMismatch { expected, found }) => {
            let skip = VersionSkip { expected, found };
            trace_warn!(expected = expected, found = found; "{}", skip);
            Ok(Imported {
                targets: Vec::new(),
                skipped: Some(skip),
            })
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MatchingRecord, TargetDims, TrackingRecord};

    fn target(width: usize) -> CompiledTarget {
        CompiledTarget {
            target_image: TargetDims { width, height: 3 },
            matching_data: MatchingRecord::default(),
            tracking_data: TrackingRecord::default(),
        }
    }

    #[test]
    fn header_carries_magic_and_version() {
        let bytes = export(&[target(4)]).unwrap();
        assert_eq!(&bytes[..4], b"TIDX");
        assert_eq!(peek_version(&bytes).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn mismatched_version_is_detected_before_payload() {
        let mut bytes = encode_bundle(CURRENT_VERSION + 1, &[]).unwrap();
        bytes.extend_from_slice(&[0xff; 16]);
        assert_eq!(
            decode_bundle(&bytes),
            Err(TargetIdxError::VersionMismatch {
                expected: CURRENT_VERSION,
                found: CURRENT_VERSION + 1,
            })
        );
        let imported = import(&bytes).unwrap();
        assert!(imported.targets.is_empty());
        assert_eq!(
            imported.skipped,
            Some(VersionSkip {
                expected: CURRENT_VERSION,
                found: CURRENT_VERSION + 1,
            })
        );
    }

    #[test]
    fn short_or_foreign_bytes_are_invalid() {
        assert!(matches!(
            import(b"TID"),
            Err(TargetIdxError::InvalidBundle { .. })
        ));
        assert!(matches!(
            import(b"NOPE\x02\x00\x00\x00"),
            Err(TargetIdxError::InvalidBundle { .. })
        ));
    }

    #[test]
    fn truncated_payload_is_invalid() {
        let bytes = export(&[target(4), target(5)]).unwrap();
        let cut = &bytes[..bytes.len() - 1];
        assert!(matches!(
            decode_bundle(cut),
            Err(TargetIdxError::InvalidBundle { .. })
        ));
    }
}
