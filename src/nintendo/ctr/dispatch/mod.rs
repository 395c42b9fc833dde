//! C10 Dispatcher: identifies which of this toolkit's container kinds a
//! file is, then looks up which of {verify, crypt, build-pkg, install} that
//! kind supports — the matrix from spec.md §4.10. Detection is (a) a magic
//! and structural probe of the first 0x200 bytes, then (b) a path-derived
//! hint (a CDN directory layout looks nothing like a single-file container).

use crate::nintendo::ctr::error::{NintendoCtrError, NintendoCtrResult};
use crate::nintendo::ctr::models::cia::CIA_HEADER_SIZE;
use std::path::Path;

/// The container kinds this toolkit's dispatcher distinguishes. `Firmware`
/// and `LegacyWrap` are recognized by magic so dispatch can route their
/// narrow supported operations correctly, but neither has a structural
/// model in this crate (matching the teacher, which never parsed NATIVE_FIRM
/// or BOSS payloads beyond a decrypt pass) — attempts to build/install them
/// are refused by policy rather than by a missing parser panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// CIA: header + cert chain + ticket + TMD + content + optional meta.
    OuterPackage,
    /// A CDN content directory: loose `<id>` files plus a `.tmd` and `.tik`/`.cetk`.
    NetworkContent,
    /// A single NCCH.
    SecondaryContainer,
    /// NCSD: up to 8 NCCH partitions.
    MultiContainer,
    /// A DS/DSi cartridge header (TWL only; plain-DS-only dumps have no
    /// title to install and are out of scope per spec.md's Non-goals).
    HandheldRom,
    Firmware,
    LegacyWrap,
}

/// What the caller already knows about where the file came from — a
/// structural probe alone can't always distinguish a lone NCCH/NCSD dump
/// from a loose CDN directory, since the probe only sees one file's bytes.
#[derive(Debug, Clone, Default)]
pub struct PathHint {
    pub is_cdn_directory: bool,
    pub extension: Option<String>,
}

const FIRM_MAGIC: &[u8; 4] = b"FIRM";
/// BOSS (SpotPass) container magic, per 3dbrew's documented BOSS header layout.
const BOSS_MAGIC: &[u8; 4] = b"boss";

/// Probes the first 0x200 bytes of a file (or fewer, if the file is
/// shorter) plus a path hint and decides the container kind.
pub fn detect_kind(probe: &[u8], hint: &PathHint) -> NintendoCtrResult<ContainerKind> {
    if hint.is_cdn_directory {
        return Ok(ContainerKind::NetworkContent);
    }

    if probe.len() >= 4 && &probe[0..4] == FIRM_MAGIC {
        return Ok(ContainerKind::Firmware);
    }
    if probe.len() >= 4 && &probe[0..4] == BOSS_MAGIC {
        return Ok(ContainerKind::LegacyWrap);
    }
    if probe.len() >= 0x104 && &probe[0x100..0x104] == b"NCCH" {
        return Ok(ContainerKind::SecondaryContainer);
    }
    if probe.len() >= 0x104 && &probe[0x100..0x104] == b"NCSD" {
        return Ok(ContainerKind::MultiContainer);
    }
    if probe.len() >= 4 {
        let header_size = u32::from_le_bytes([probe[0], probe[1], probe[2], probe[3]]);
        if header_size == CIA_HEADER_SIZE {
            return Ok(ContainerKind::OuterPackage);
        }
    }

    match hint.extension.as_deref() {
        Some("nds") | Some("srl") | Some("dsi") => Ok(ContainerKind::HandheldRom),
        _ => Err(NintendoCtrError::UnknownContainerKind(Path::new("<probe>").to_path_buf())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Verify,
    Crypt,
    BuildPackage,
    Install,
}

/// The support matrix from spec.md §4.10. `HandheldRom` verify/crypt are
/// both listed "(skip)" — trivially supported, not unsupported — since
/// HandheldROM containers carry no hash tree and no per-content crypto to
/// decrypt.
pub fn supports(kind: ContainerKind, op: Operation) -> bool {
    use ContainerKind::*;
    use Operation::*;
    match (kind, op) {
        (OuterPackage, Verify | Crypt | Install) => true,
        (OuterPackage, BuildPackage) => false,

        (NetworkContent, Verify | Crypt | Install) => true,
        (NetworkContent, BuildPackage) => false,

        (SecondaryContainer, _) => true,
        (MultiContainer, _) => true,

        (HandheldRom, Verify | Crypt) => true,
        (HandheldRom, BuildPackage | Install) => true,

        (Firmware, Verify | Crypt) => true,
        (Firmware, BuildPackage | Install) => false,

        (LegacyWrap, Verify | Crypt) => true,
        (LegacyWrap, BuildPackage | Install) => false,
    }
}

/// Fails with `PolicyRefusal` rather than attempting an operation this
/// kind's entry in the matrix marks unsupported ("—").
pub fn require_supported(kind: ContainerKind, op: Operation) -> NintendoCtrResult<()> {
    if supports(kind, op) {
        Ok(())
    } else {
        Err(NintendoCtrError::PolicyRefusal(format!(
            "{kind:?} does not support {op:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_with(bytes: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 0x200];
        buf[..bytes.len()].copy_from_slice(bytes);
        buf
    }

    #[test]
    fn detects_ncch_by_magic_at_0x100() {
        let mut probe = vec![0u8; 0x200];
        probe[0x100..0x104].copy_from_slice(b"NCCH");
        assert_eq!(
            detect_kind(&probe, &PathHint::default()).unwrap(),
            ContainerKind::SecondaryContainer
        );
    }

    #[test]
    fn detects_ncsd_by_magic_at_0x100() {
        let mut probe = vec![0u8; 0x200];
        probe[0x100..0x104].copy_from_slice(b"NCSD");
        assert_eq!(
            detect_kind(&probe, &PathHint::default()).unwrap(),
            ContainerKind::MultiContainer
        );
    }

    #[test]
    fn detects_cia_by_header_size() {
        let probe = probe_with(&CIA_HEADER_SIZE.to_le_bytes());
        assert_eq!(detect_kind(&probe, &PathHint::default()).unwrap(), ContainerKind::OuterPackage);
    }

    #[test]
    fn cdn_directory_hint_wins_even_with_other_bytes() {
        let hint = PathHint {
            is_cdn_directory: true,
            extension: None,
        };
        assert_eq!(detect_kind(&[], &hint).unwrap(), ContainerKind::NetworkContent);
    }

    #[test]
    fn firmware_build_package_is_refused() {
        assert!(require_supported(ContainerKind::Firmware, Operation::BuildPackage).is_err());
        assert!(require_supported(ContainerKind::Firmware, Operation::Verify).is_ok());
    }

    #[test]
    fn unrecognized_bytes_without_extension_hint_error() {
        let probe = vec![0u8; 0x200];
        assert!(detect_kind(&probe, &PathHint::default()).is_err());
    }
}
