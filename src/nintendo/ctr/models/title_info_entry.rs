use crate::nintendo::ctr::models::ncch::ext_header::ExtendedHeader;
use crate::nintendo::ctr::models::ncch::NcchHeader;
use crate::nintendo::ctr::models::title_metadata::TitleMetadata;
use crate::nintendo::ctr::models::twl::HandheldRomHeader;
use binrw::{BinRead, BinWrite};

/// A title.db row (TIE): the bookkeeping record GodMode9's `tie.c` writes
/// per installed title, independent of the TMD on disk. Holds the on-disk
/// footprint (`title_size`), the composed version, and a handful of flag
/// bytes later readers (the HOME Menu, `uninstall`) use to decide how to
/// treat the title.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct TitleInfoEntry {
    /// Fixed type tag for a title.db entry.
    pub tag: u32,
    pub title_size: u64,
    pub title_type: u32,
    pub title_version: u32,
    #[br(count = 16)]
    pub product_code: Vec<u8>,
    pub extdata_id_low: u32,
    pub flags_0: [u8; 4],
    pub flags_1: [u8; 4],
    /// Bits 0/4/5 are the ones GodMode9's `tie.c` actually sets (TWL-port,
    /// not-a-system-title, TWL-port again); the rest are reserved.
    pub flags_2: [u8; 8],
    #[br(count = 0xC)]
    pub reserved: Vec<u8>,
}

const TIE_TAG: u32 = 0x40;

/// `align_size` used by `tie.c`'s size formula: title.db entries destined
/// for the SD card round content up to 0x8000, NAND installs to 0x4000.
fn align_size(sd: bool) -> u64 {
    if sd {
        0x8000
    } else {
        0x4000
    }
}

fn align(value: u64, to: u64) -> u64 {
    (value + to - 1) / to * to
}

/// The TMD-size-in-bytes formula GodMode9 calls `TMD_SIZE_N`: a fixed header
/// plus one content-info record per up-to-64 "index groups" plus one chunk
/// record per content. We only need the total on-disk size here, not a
/// parseable TMD, so this mirrors the constant arithmetic rather than
/// re-deriving it from `TitleMetadata`'s own (different) in-memory layout.
fn tmd_size_n(content_count: u16) -> u64 {
    const TMD_FIXED_SIZE: u64 = 0xB04 + 64 * 0x24;
    const CHUNK_RECORD_SIZE: u64 = 0x30;
    TMD_FIXED_SIZE + content_count as u64 * CHUNK_RECORD_SIZE
}

impl TitleInfoEntry {
    /// `BuildTitleInfoEntryTmd`: the formula shared by every container kind,
    /// parameterized on whether the install target is the SD card.
    pub fn build_from_tmd(tmd: &TitleMetadata, sd: bool) -> Self {
        let align_sz = align_size(sd);
        let content_count = tmd.header.content_count;

        let payload_size: u64 = tmd
            .content_chunk_records
            .iter()
            .map(|c| align(c.content_size, align_sz))
            .sum();

        let title_size = align_sz * 3
            + align(tmd_size_n(content_count), align_sz)
            + align_sz // CMD placeholder slot
            + payload_size;

        let title_id_high = (tmd.header.title_id >> 32) as u32;
        let has_index_one = tmd
            .content_chunk_records
            .iter()
            .any(|c| c.content_index == 1);
        let mut flags_0 = [0u8; 4];
        if has_index_one
            && (title_id_high == 0x00040000 || title_id_high == 0x00040010)
        {
            // "may have manual": a DLP child/manual content is present and
            // the title is an application or system title.
            flags_0[0] = 1;
        }

        let mut flags_2 = [0u8; 8];
        // "system" titles (title-id-hi bit4 set) omit the not-a-system-title
        // user flag; every other title gets it set.
        if title_id_high & 0x10 == 0 {
            flags_2[4] = 1;
        }

        TitleInfoEntry {
            tag: TIE_TAG,
            title_size,
            title_type: tmd.header.title_type,
            title_version: tmd.header.title_version as u32,
            product_code: vec![0; 16],
            extdata_id_low: 0,
            flags_0,
            flags_1: [0; 4],
            flags_2,
            reserved: vec![0; 0xC],
        }
    }

    /// `BuildTitleInfoEntryTwl`: NAND-targeted (sd = false), product code
    /// sourced from the cartridge/ROM header except for the system
    /// data-archive title-ID range, and the TWL-port flag set for ports of
    /// retail DS titles to the 3DS.
    pub fn build_from_twl(tmd: &TitleMetadata, rom: &HandheldRomHeader) -> Self {
        let mut tie = Self::build_from_tmd(tmd, false);
        let title_id_high = (tmd.header.title_id >> 32) as u32;

        if title_id_high != 0x0004800F {
            let code = rom.game_code_str();
            let bytes = code.into_bytes();
            tie.product_code[..bytes.len().min(16)]
                .copy_from_slice(&bytes[..bytes.len().min(16)]);
        }

        if title_id_high == crate::nintendo::ctr::constants::TID_HIGH_TWL_PORT {
            tie.flags_2[0] = 1;
            tie.flags_2[5] = 1;
        }

        tie
    }

    /// `BuildTitleInfoEntryNcch`: product code and composed version sourced
    /// from the NCCH header; reserves extra on-disk space for the save-data
    /// partition when the ExtHeader declares one, and records the low word
    /// of the ext-save-data ID for the uninstaller to clean up later.
    pub fn build_from_ncch(
        tmd: &TitleMetadata,
        ncch: &NcchHeader,
        ext_header: Option<&ExtendedHeader>,
        sd: bool,
    ) -> Self {
        let mut tie = Self::build_from_tmd(tmd, sd);
        let align_sz = align_size(sd);

        let code = ncch.product_code_str().into_bytes();
        tie.product_code = vec![0; 16];
        tie.product_code[..code.len().min(16)].copy_from_slice(&code[..code.len().min(16)]);

        tie.title_version |= (ncch.version as u32) << 16;

        match ext_header {
            Some(ext) if ext.savedata_size > 0 => {
                tie.title_size += align_sz + align(ext.savedata_size, align_sz);
                tie.flags_1[0] = 1;
                tie.extdata_id_low = ext.extdata_id_low();
            }
            None => {
                tie.flags_0[0] = 0;
            }
            _ => {}
        }

        tie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nintendo::ctr::models::title_metadata::{
        ContentChunkRecord, ContentType, TitleMetadataHeader,
    };

    fn sample_tmd(content_count: u16, title_id: u64) -> TitleMetadata {
        TitleMetadata {
            signature_data: crate::nintendo::ctr::models::signature::SignatureData {
                signature_type: crate::nintendo::ctr::models::signature::SignatureType::Rsa2048Sha256,
                signature: vec![0; 0x100],
                padding: vec![0; 0x3C],
            },
            header: TitleMetadataHeader {
                signature_issuer: vec![0; 0x40],
                version: 0,
                ca_crl_version: 0,
                signer_crl_version: 0,
                reserved1: 0,
                system_version: 0,
                title_id,
                title_type: 0x40,
                group_id: 0,
                save_data_size: 0,
                srl_private_save_data_size: 0,
                reserved2: 0,
                srl_flag: 0,
                reserved3: vec![0; 0x31],
                access_rights: 0,
                title_version: 1,
                content_count,
                boot_content: 0,
                padding: 0,
                content_info_records_hash: vec![0; 0x20],
            },
            content_info_records: vec![
                crate::nintendo::ctr::models::title_metadata::ContentInfoRecord {
                    content_index_offset: 0,
                    content_command_count: content_count,
                    hash: vec![0; 0x20],
                };
                64
            ],
            content_chunk_records: (0..content_count)
                .map(|i| ContentChunkRecord {
                    content_id: i as u32,
                    content_index: i,
                    content_type: ContentType(0x0001),
                    content_size: 0x3000,
                    hash: vec![0; 0x20],
                })
                .collect(),
        }
    }

    #[test]
    fn title_size_formula_nand() {
        let tmd = sample_tmd(2, 0x0004000012345600);
        let tie = TitleInfoEntry::build_from_tmd(&tmd, false);
        let expected = 0x4000 * 3 + align(tmd_size_n(2), 0x4000) + 0x4000 + align(0x3000, 0x4000) * 2;
        assert_eq!(tie.title_size, expected);
    }

    #[test]
    fn may_have_manual_flag() {
        let mut tmd = sample_tmd(2, 0x0004000012345600);
        tmd.content_chunk_records[1].content_index = 1;
        let tie = TitleInfoEntry::build_from_tmd(&tmd, true);
        assert_eq!(tie.flags_0[0], 1);
    }

    #[test]
    fn ncch_savedata_extends_title_size() {
        let tmd = sample_tmd(1, 0x0004000012345600);
        let tie_no_save = TitleInfoEntry::build_from_tmd(&tmd, true);

        let ncch = super::tests_support::sample_ncch();
        let mut ext = super::tests_support::sample_ext_header();
        ext.savedata_size = 0x20000;
        let tie = TitleInfoEntry::build_from_ncch(&tmd, &ncch, Some(&ext), true);
        assert!(tie.title_size > tie_no_save.title_size);
        assert_eq!(tie.flags_1[0], 1);
    }
}

#[cfg(test)]
mod tests_support {
    use super::*;

    pub fn sample_ncch() -> NcchHeader {
        NcchHeader {
            signature: vec![0; 0x100],
            magic: *b"NCCH",
            content_size_media_units: 0x10,
            partition_id: 0,
            maker_code: *b"00",
            version: 2,
            seed_hash_check: 0,
            program_id: 0,
            reserved1: vec![0; 0x10],
            logo_region_hash: vec![0; 0x20],
            product_code: {
                let mut v = b"CTR-P-TEST".to_vec();
                v.resize(0x10, 0);
                v
            },
            ext_header_hash: vec![0; 0x20],
            ext_header_size: 0x400,
            reserved2: 0,
            flags: crate::nintendo::ctr::models::ncch::NcchFlags {
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

    pub fn sample_ext_header() -> ExtendedHeader {
        ExtendedHeader {
            application_title: vec![0; 8],
            reserved1: vec![0; 5],
            flag: 0,
            remaster_version: 0,
            text_code_set_info: vec![0; 0x18],
            stack_size: 0,
            read_only_code_set_info: vec![0; 0x18],
            reserved2: vec![0; 4],
            data_code_set_info: vec![0; 0x18],
            bss_size: 0,
            dependency_list: vec![0; 0x30 * 8],
            savedata_size_lo_reserved: vec![0; 4],
            savedata_size: 0,
            jump_id: vec![0; 8],
            reserved3: vec![0; 0x30],
            aci: vec![0; 0x170],
            access_desc_signature: vec![0; 0x100],
            ncch_hdr_public_key: vec![0; 0x100],
            aci_for_limit: vec![0; 0x170],
        }
    }
}
