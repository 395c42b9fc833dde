use crate::nintendo::ctr::constants::CTR_COMMON_KEYS_HEX;
use crate::nintendo::ctr::crypto::cipher::apply_ctr_keystream;
use crate::nintendo::ctr::crypto::content_ctr_iv;
use crate::nintendo::ctr::crypto::decrypt_title_key;
use crate::nintendo::ctr::models::cia::{CIA_HEADER_SIZE, CiaFile, CiaHeader};
use crate::nintendo::ctr::models::ticket::Ticket;
use crate::nintendo::ctr::models::title_metadata::TitleMetadata;
use crate::nintendo::ctr::repackage::{finalize_tmd_hashes, merge_certificate_chains, read_certificate_chain};
use binrw::{BinRead, BinWrite, Endian};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

/// Decrypts every content of a CIA in place (title-key unwrap against each
/// of the six known common keys, then AES-CTR over the content using
/// `content_ctr_iv`), clears each chunk's encrypted flag, and recomputes
/// the TMD's content hashes/info-record hashes to match the now-plaintext
/// bytes — used by emulators like Azahar that expect unencrypted CIAs.
pub async fn decrypt_from_encrypted_cia(
    input: &Path,
    out_writer: &mut BufWriter<File>,
) -> anyhow::Result<()> {
    let data = tokio::fs::read(input).await?;
    let cia = CiaFile::read_le(&mut Cursor::new(data))?;

    let title_id = cia.ticket.ticket_data.title_id;
    let encrypted_title_key: [u8; 0x10] = cia.ticket.ticket_data.title_key[..0x10]
        .try_into()
        .map_err(|_| anyhow::anyhow!("ticket title key is not 16 bytes"))?;

    let common_key_index = cia.ticket.ticket_data.common_key_index as usize;
    let common_key = CTR_COMMON_KEYS_HEX
        .get(common_key_index)
        .ok_or_else(|| anyhow::anyhow!("unknown common key index {common_key_index}"))?;
    let title_key = decrypt_title_key(&encrypted_title_key, common_key, title_id)?;

    let mut decrypted_cia = CiaFile {
        header: cia.header,
        cert_chain: cia.cert_chain,
        ticket: cia.ticket,
        tmd: cia.tmd,
        content_data: Vec::with_capacity(cia.content_data.len()),
        meta_data: cia.meta_data,
    };

    let mut offset = 0usize;
    for chunk in &mut decrypted_cia.tmd.content_chunk_records {
        let len = chunk.content_size as usize;
        let mut plain = cia.content_data[offset..offset + len].to_vec();
        offset += len;

        if chunk.content_type.is_encrypted() {
            let iv = content_ctr_iv(chunk.content_index);
            apply_ctr_keystream(&mut plain, 0, &title_key, &iv);
            chunk.content_type.set_encrypted(false);
        }

        let mut hasher = Sha256::new();
        hasher.update(&plain);
        chunk.hash = hasher.finalize().to_vec();

        decrypted_cia.content_data.extend_from_slice(&plain);
    }

    finalize_tmd_hashes(&mut decrypted_cia.tmd)?;

    let mut buf = Cursor::new(Vec::new());
    decrypted_cia.write_le(&mut buf)?;
    out_writer.write_all(buf.get_ref()).await?;

    Ok(())
}

/// Writes out the CIA file
pub async fn write_cia(
    path: &Path,
    out: &mut BufWriter<File>,
    tmd_path: &Path,
    tik_path: &Path,
    tmd: TitleMetadata,
    tik: Ticket,
) -> anyhow::Result<()> {
    // Read all content files
    let mut content = vec![];
    for entry in &tmd.content_chunk_records {
        let content_file = format!("{:08x}", entry.content_id);

        let content_path = path.join(&content_file);
        let mut content_file = File::open(content_path).await?;
        let mut bytes = Vec::new();
        content_file.read_to_end(&mut bytes).await?;
        content.extend_from_slice(&bytes);
    }

    // Extract certificate chains from TMD and Ticket files
    let mut cert_chain = Vec::new();

    // Read certificate chain from TMD file
    let tmd_certs = read_certificate_chain(tmd_path).await?;

    // Read certificate chain from Ticket file
    let tik_certs = read_certificate_chain(tik_path).await?;

    cert_chain.extend(merge_certificate_chains(tmd_certs, tik_certs));

    // Calculate sizes
    let mut tmd_buf = Vec::new();
    tmd.write_options(&mut Cursor::new(&mut tmd_buf), Endian::Big, ())?;
    let tmd_size = tmd_buf.len() as u32;

    let mut tik_buf = Vec::new();
    tik.write_options(&mut Cursor::new(&mut tik_buf), Endian::Big, ())?;
    let ticket_size = tik_buf.len() as u32;

    const CERT_CHAIN_SIZE: u32 = 2560u32;

    // Create the CIA structure
    let mut cia = CiaFile {
        header: CiaHeader {
            header_size: CIA_HEADER_SIZE,
            cia_type: 0, // 0 = Normal
            version: 0,  // CIA format version
            cert_chain_size: CERT_CHAIN_SIZE,
            ticket_size,
            tmd_size,
            meta_size: 0, // No metadata
            content_size: content.len() as u64,
            content_index: vec![0u8; 0x2000],
        },
        cert_chain,
        ticket: tik,
        tmd,
        content_data: content,
        meta_data: None,
    };

    cia.apply_content_indexes();

    // Write the CIA file
    let mut cia_buf = Vec::new();
    cia.write_options(&mut Cursor::new(&mut cia_buf), Endian::Little, ())?;

    // Write to output
    out.write_all(&cia_buf).await?;
    out.flush().await?;

    Ok(())
}
