//! C9 Naming: `GetGoodName`'s deterministic filename composition —
//! `<tid> <short_title> (<product>) (<region>).<ext>` — with illegal
//! characters scrubbed and runs of spaces collapsed, so the same title
//! always produces the same on-disk name regardless of what a CDN or a
//! scene release happened to call it.

use crate::nintendo::ctr::models::smdh::{
    Smdh, LANG_ENGLISH, REGION_AUSTRALIA, REGION_CHINA, REGION_EUROPE, REGION_JAPAN, REGION_KOREA,
    REGION_NORTH_AMERICA, REGION_TAIWAN,
};
use crate::nintendo::ctr::models::twl::HandheldRomHeader;

/// Where the short title text is sourced from, chosen by container kind per
/// spec.md §4.9: SC titles carry an SMDH, HR (DSiWare) titles carry only
/// their cartridge header's ASCII game title (the DSi banner's Unicode title
/// is a separate, unmodeled structure this toolkit never parses — the ASCII
/// game title is the one piece of naming data a HandheldROM header itself
/// carries).
pub enum TitleSource<'a> {
    Smdh(&'a Smdh),
    HandheldRom(&'a HandheldRomHeader),
}

impl<'a> TitleSource<'a> {
    pub fn short_title(&self) -> String {
        match self {
            TitleSource::Smdh(smdh) => smdh
                .title(LANG_ENGLISH)
                .map(|t| t.short_description_str())
                .unwrap_or_default(),
            TitleSource::HandheldRom(rom) => rom.game_title_str(),
        }
    }
}

/// Characters `GetGoodName` treats as illegal on at least one supported
/// host filesystem.
const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Strips illegal filename characters and collapses runs of whitespace to a
/// single space, trimming the result.
pub fn sanitize(raw: &str) -> String {
    let scrubbed: String = raw.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect();
    let mut out = String::with_capacity(scrubbed.len());
    let mut last_was_space = false;
    for c in scrubbed.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Compacts a region-lockout bitmask into `GetGoodName`'s letter code:
/// `{J,U,E,C,K,T}` concatenated in table order, or a single `W` when every
/// bit is set ("world").
pub fn region_code(region_lockout: u32) -> String {
    const TABLE: [(u32, char); 6] = [
        (REGION_JAPAN, 'J'),
        (REGION_NORTH_AMERICA, 'U'),
        (REGION_EUROPE, 'E'),
        (REGION_CHINA, 'C'),
        (REGION_KOREA, 'K'),
        (REGION_TAIWAN, 'T'),
    ];

    let all_set = TABLE.iter().all(|(bit, _)| region_lockout & bit != 0);
    if all_set {
        return "W".to_string();
    }

    let code: String = TABLE
        .iter()
        .filter(|(bit, _)| region_lockout & bit != 0)
        .map(|(_, letter)| *letter)
        .collect();

    if code.is_empty() {
        "--".to_string()
    } else {
        code
    }
}

/// Composes the final filename: `<tid> <short_title> (<product>) (<region>).<ext>`.
pub fn good_name(title_id: u64, source: &TitleSource, product_code: &str, region_lockout: u32, ext: &str) -> String {
    let short_title = sanitize(&source.short_title());
    let product = sanitize(product_code);
    let region = region_code(region_lockout);

    format!("{title_id:016X} {short_title} ({product}) ({region}).{ext}")
}
