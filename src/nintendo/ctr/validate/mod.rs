//! C4 Validators: structural sanity checks independent of crypto/hash
//! verification — magic numbers, size fields that must agree with the
//! surrounding container, offsets that must land inside the file, and
//! offset tables that must be monotonically non-decreasing. These run
//! before `verify` does any hashing, so a corrupt header fails fast with a
//! precise `InvalidFormat` instead of a confusing hash mismatch later.

use crate::nintendo::ctr::error::{NintendoCtrError, NintendoCtrResult};
use crate::nintendo::ctr::models::ncch::NcchHeader;
use crate::nintendo::ctr::models::ncsd::MultiContainerHeader;
use crate::nintendo::ctr::models::title_metadata::TitleMetadata;

fn invalid(kind: &'static str, reason: impl Into<String>) -> NintendoCtrError {
    NintendoCtrError::InvalidFormat {
        kind,
        reason: reason.into(),
    }
}

/// Validates an NCCH header's region table: every present region must fit
/// inside `content_size_media_units`, and regions must not overlap when laid
/// out in their declared order (ExHeader is implicit at offset 0).
pub fn validate_ncch(header: &NcchHeader) -> NintendoCtrResult<()> {
    if &header.magic != b"NCCH" {
        return Err(invalid("NCCH", "magic mismatch"));
    }

    let total = header.content_size_media_units as u64;
    if total == 0 {
        return Err(invalid("NCCH", "content_size_media_units is zero"));
    }

    let mut regions = Vec::new();
    if header.has_exefs() {
        regions.push(("exefs", header.exefs_offset as u64, header.exefs_size as u64));
    }
    if header.has_romfs() {
        regions.push(("romfs", header.romfs_offset as u64, header.romfs_size as u64));
    }

    for (name, offset, size) in &regions {
        if offset + size > total {
            return Err(invalid(
                "NCCH",
                format!("{name} region [{offset}, {offset}+{size}) exceeds content size {total}"),
            ));
        }
    }

    if header.has_exefs() && header.has_romfs() && header.exefs_offset > header.romfs_offset {
        return Err(invalid(
            "NCCH",
            "ExeFS region begins after RomFS region",
        ));
    }

    Ok(())
}

/// Validates an NCSD partition table: every present partition must fit
/// inside `image_size_media_units`, and two present partitions must never
/// overlap.
pub fn validate_ncsd(header: &MultiContainerHeader) -> NintendoCtrResult<()> {
    if &header.magic != b"NCSD" {
        return Err(invalid("NCSD", "magic mismatch"));
    }

    let total = header.image_size_media_units as u64;
    let mut spans: Vec<(u64, u64)> = Vec::new();
    for (index, part) in header.present_partitions() {
        let start = part.offset_media_units as u64;
        let end = start + part.size_media_units as u64;
        if end > total {
            return Err(invalid(
                "NCSD",
                format!("partition {index} [{start}, {end}) exceeds image size {total}"),
            ));
        }
        for (other_start, other_end) in &spans {
            if start < *other_end && *other_start < end {
                return Err(invalid(
                    "NCSD",
                    format!("partition {index} overlaps a previous partition"),
                ));
            }
        }
        spans.push((start, end));
    }

    Ok(())
}

/// Validates a TMD's content table: the content-chunk table must agree in
/// length with `content_count`, and content indices must be unique.
pub fn validate_tmd(tmd: &TitleMetadata) -> NintendoCtrResult<()> {
    if tmd.content_chunk_records.len() != tmd.header.content_count as usize {
        return Err(invalid(
            "TMD",
            format!(
                "content_count {} disagrees with {} chunk records",
                tmd.header.content_count,
                tmd.content_chunk_records.len()
            ),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for chunk in &tmd.content_chunk_records {
        if !seen.insert(chunk.content_index) {
            return Err(invalid(
                "TMD",
                format!("duplicate content index {}", chunk.content_index),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nintendo::ctr::models::ncch::NcchFlags;

    fn base_ncch() -> NcchHeader {
        NcchHeader {
            signature: vec![0; 0x100],
            magic: *b"NCCH",
            content_size_media_units: 0x100,
            partition_id: 0,
            maker_code: *b"00",
            version: 2,
            seed_hash_check: 0,
            program_id: 0,
            reserved1: vec![0; 0x10],
            logo_region_hash: vec![0; 0x20],
            product_code: vec![0; 0x10],
            ext_header_hash: vec![0; 0x20],
            ext_header_size: 0,
            reserved2: 0,
            flags: NcchFlags {
                reserved0: 0,
                reserved1: 0,
                reserved2: 0,
                crypto_method: 0,
                content_platform: 1,
                content_type: 2,
                content_unit_size_log: 0,
                bitmasks: 0,
            },
            plain_region_offset: 0,
            plain_region_size: 0,
            logo_region_offset: 0,
            logo_region_size: 0,
            exefs_offset: 4,
            exefs_size: 4,
            exefs_hash_region_size: 1,
            reserved3: 0,
            romfs_offset: 8,
            romfs_size: 8,
            romfs_hash_region_size: 1,
            reserved4: 0,
            exefs_superblock_hash: vec![0; 0x20],
            romfs_superblock_hash: vec![0; 0x20],
        }
    }

    #[test]
    fn rejects_region_past_content_size() {
        let mut header = base_ncch();
        header.romfs_size = 0x200;
        assert!(validate_ncch(&header).is_err());
    }

    #[test]
    fn accepts_well_formed_header() {
        assert!(validate_ncch(&base_ncch()).is_ok());
    }
}
