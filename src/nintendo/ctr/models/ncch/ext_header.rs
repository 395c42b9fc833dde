use binrw::{BinRead, BinWrite};

/// NCCH ExtendedHeader: the first 0x400 bytes of the ExtHeader region,
/// encrypted the same way as ExeFS under the primary key slot (0x2C unless
/// fixed-key). Only the fields the toolkit actually needs are modeled; the
/// rest of the System Control Info / Access Control Info blobs are kept as
/// opaque bytes so a round-trip never loses data it doesn't understand.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct ExtendedHeader {
    #[br(count = 8)]
    pub application_title: Vec<u8>,
    #[br(count = 5)]
    pub reserved1: Vec<u8>,
    pub flag: u8,
    pub remaster_version: u16,

    #[br(count = 0x18)]
    pub text_code_set_info: Vec<u8>,
    pub stack_size: u32,
    #[br(count = 0x18)]
    pub read_only_code_set_info: Vec<u8>,
    #[br(count = 4)]
    pub reserved2: Vec<u8>,
    #[br(count = 0x18)]
    pub data_code_set_info: Vec<u8>,
    pub bss_size: u32,

    #[br(count = 0x30 * 8)]
    pub dependency_list: Vec<u8>,

    #[br(count = 4)]
    pub savedata_size_lo_reserved: Vec<u8>,
    pub savedata_size: u64,
    #[br(count = 8)]
    pub jump_id: Vec<u8>,
    #[br(count = 0x30)]
    pub reserved3: Vec<u8>,

    /// Access Control Info (first copy), 0x170 bytes. Contains program ID
    /// and other fields the installer/naming code reads positionally out of;
    /// kept opaque here and interpreted by `access_control_info()`.
    #[br(count = 0x170)]
    pub aci: Vec<u8>,

    #[br(count = 0x100)]
    pub access_desc_signature: Vec<u8>,
    #[br(count = 0x100)]
    pub ncch_hdr_public_key: Vec<u8>,

    #[br(count = 0x170)]
    pub aci_for_limit: Vec<u8>,
}

impl ExtendedHeader {
    pub const SIZE: usize = 0x400;

    /// GodMode9's `tie.c` reads the program's title ID and the low 32 bits
    /// of the ext-save-data ID out of the ACI's `ARM11 local caps` block,
    /// which begins at a fixed offset inside `aci`. We model just that slice.
    pub fn program_title_id(&self) -> u64 {
        u64::from_le_bytes(self.aci[0..8].try_into().unwrap_or([0; 8]))
    }

    pub fn extdata_id_low(&self) -> u32 {
        // ARM11 local caps storage info starts right after the core-version
        // field inside the ACI block; the low word of the extdata id is the
        // first field of storage info, matching `tie.c`'s `aci_info` offset.
        const STORAGE_INFO_OFFSET: usize = 0x0C;
        u32::from_le_bytes(
            self.aci[STORAGE_INFO_OFFSET..STORAGE_INFO_OFFSET + 4]
                .try_into()
                .unwrap_or([0; 4]),
        )
    }
}
