use hex_literal::hex;

pub const CTR_COMMON_KEYS: [&str; 6] = [
    "64c5fd55dd3ad988325baaec5243db98",
    "4aaa3d0e27d4d728d0b1b433f0f9cbc8",
    "fbb0ef8cdbb0d8e453cd99344371697f",
    "25959b7ad0409f72684198ba2ecd7dc6",
    "7ada22caffc476cc8297a0c7ceeeeebe",
    "a5051ca1b37dcf3afbcf8cc1edd9ce02",
];

pub const CTR_COMMON_KEYS_HEX: [[u8; 16]; 6] = [
    hex!("64c5fd55dd3ad988325baaec5243db98"),
    hex!("4aaa3d0e27d4d728d0b1b433f0f9cbc8"),
    hex!("fbb0ef8cdbb0d8e453cd99344371697f"),
    hex!("25959b7ad0409f72684198ba2ecd7dc6"),
    hex!("7ada22caffc476cc8297a0c7ceeeeebe"),
    hex!("a5051ca1b37dcf3afbcf8cc1edd9ce02"),
];

pub const CTR_TITLE_KEY_SECRET: &str = "fd040105060b111c2d49";

pub const CTR_DEFAULT_TITLE_KEY_PASSWORD: &str = "mypass";

pub const CTR_KEY_0X2C: u128 = 246647523836745093481291640204864831571;
pub const CTR_KEY_0X25: u128 = 275024782269591852539264289417494026995;
pub const CTR_KEY_0X18: u128 = 174013536497093865167571429864564540276;
pub const CTR_KEY_0X1B: u128 = 92615092018138441822550407327763030402;
pub const CTR_FIXED_SYS: u128 = 109645209274529458878270608689136408907;

pub const CTR_KEYS_0: [u128; 4] = [CTR_KEY_0X2C, CTR_KEY_0X25, CTR_KEY_0X18, CTR_KEY_0X1B];
pub const CTR_KEYS_1: [u128; 2] = [0, CTR_FIXED_SYS];

pub const CTR_NCSD_PARTITIONS: [&str; 8] = [
    "Main",
    "Manual",
    "Download Play",
    "Partition4",
    "Partition5",
    "Partition6",
    "N3DSUpdateData",
    "UpdateData",
];

pub const CTR_MEDIA_UNIT_SIZE: u32 = 512;

/// NCCH/NCSD "media unit" used throughout offset/size fields in both headers.
pub const NCCH_MEDIA_UNIT: u64 = 0x200;

/// Block size used by the IVFC hash tree levels (fixed for 3DS RomFS).
pub const IVFC_LEVEL_BLOCK_SIZE: u64 = 0x1000;

/// AES key slots used for NCCH SecondaryContainer decryption, keyed by the
/// `secondary_key_slot` selected from a header's crypto-method byte.
pub const KEYSLOT_0X18: u8 = 0x18;
pub const KEYSLOT_0X1B: u8 = 0x1B;
pub const KEYSLOT_0X25: u8 = 0x25;
pub const KEYSLOT_0X2C: u8 = 0x2C;
pub const KEYSLOT_0X2E: u8 = 0x2E;
pub const KEYSLOT_0X3D: u8 = 0x3D;

/// `KeyScrambler` constant from the 3DS boot ROM, used to derive normal keys
/// from a keyslot's X/Y pair: `rol(keyX, 2) ^ keyY) + scrambler) rol 41`.
pub const CTR_KEY_SCRAMBLER: u128 = 0x1FF9E9AAC5FE0408024591DC5D52768A;

/// Region tags used when deriving the AES-CTR IV for an NCCH's sub-regions.
pub const CTR_REGION_EXHEADER: u8 = 1;
pub const CTR_REGION_EXEFS: u8 = 2;
pub const CTR_REGION_ROMFS: u8 = 3;

/// Title-ID high words used by a handful of special-cased behaviors carried
/// over from GodMode9 (DLC rights filtering, TWL system-port flags).
pub const TID_HIGH_DLC: u32 = 0x0004008C;
pub const TID_HIGH_TWL_SYSTEM: u32 = 0x00048000;
pub const TID_HIGH_TWL_SYSTEM_DATA: u32 = 0x00048010;
pub const TID_HIGH_TWL_PORT: u32 = 0x00048004;
