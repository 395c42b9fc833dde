use binrw::{BinRead, BinWrite};

/// The per-title Content Manifest (`<title-id-low>.cmd`) stored next to an
/// installed title's content files. Records which content IDs/indices are
/// present on disk, independent of the TMD (which describes what *should*
/// be there) — the installer consults both so a partial/legacy install
/// doesn't get mistaken for a complete one.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct ContentManifest {
    pub unknown: u32,
    pub title_type: u32,
    pub content_count: u32,
    #[br(count = content_count)]
    pub entries: Vec<ContentManifestEntry>,
    /// CMAC over the preceding bytes, computed against the system's CMAC
    /// key; system titles use an all-zero footer instead (per GodMode9,
    /// CMAC fixup is skipped for title-id-hi in the system range).
    pub cmac: [u8; 0x10],
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
pub struct ContentManifestEntry {
    pub content_id: u32,
    pub content_index: u16,
    pub flags: u16,
}

impl ContentManifest {
    pub fn from_chunks(
        title_type: u32,
        chunks: &[crate::nintendo::ctr::models::title_metadata::ContentChunkRecord],
    ) -> Self {
        let entries = chunks
            .iter()
            .map(|c| ContentManifestEntry {
                content_id: c.content_id,
                content_index: c.content_index,
                flags: c.content_type.0,
            })
            .collect::<Vec<_>>();
        ContentManifest {
            unknown: 0x30000,
            title_type,
            content_count: entries.len() as u32,
            entries,
            cmac: [0; 0x10],
        }
    }

    pub fn is_system_cmac(title_id_high: u32) -> bool {
        title_id_high == 0x00040010 || title_id_high == 0x00040001
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let manifest = ContentManifest {
            unknown: 0x30000,
            title_type: 0,
            content_count: 2,
            entries: vec![
                ContentManifestEntry {
                    content_id: 0,
                    content_index: 0,
                    flags: 1,
                },
                ContentManifestEntry {
                    content_id: 1,
                    content_index: 1,
                    flags: 1,
                },
            ],
            cmac: [0x11; 0x10],
        };

        let mut buf = Vec::new();
        manifest.write(&mut Cursor::new(&mut buf)).unwrap();

        let back = ContentManifest::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back.entries.len(), 2);
        assert_eq!(back.cmac, [0x11; 0x10]);
    }
}
