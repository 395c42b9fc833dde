//! C6 Crypt-copy engine: streams a source through an optional AES-CTR
//! transform into a destination, fixed-size buffer at a time, replacing the
//! old per-container `decrypt_from_encrypted_cia`/NCCH explode path with one
//! generic engine the repackager and installer both drive. Destination is
//! extended up front so writes are never blocked on growing the file, and —
//! for the in-place case (install-time re-encrypt) — writes never get more
//! than one buffer ahead of reads, so a crash mid-copy can't corrupt data
//! the read side hasn't consumed yet.

use crate::nintendo::ctr::crypto::cipher::apply_ctr_keystream;
use crate::nintendo::ctr::error::NintendoCtrResult;
use log::debug;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

pub const DEFAULT_BUFFER_SIZE: usize = 0x10000;

/// Per-content AES-CTR key material; `None` copies bytes through unchanged
/// (plain/already-decrypted content, or a content type that isn't encrypted
/// at all).
pub struct CryptSpec {
    pub key: Option<[u8; 16]>,
    pub iv_base: [u8; 16],
}

impl CryptSpec {
    pub fn plain() -> Self {
        Self {
            key: None,
            iv_base: [0; 16],
        }
    }
}

/// What a cancellable crypt-copy reports back: final SHA-256 over the
/// *destination* bytes (what verify will check later) and whether it ran to
/// completion or was cancelled partway through.
pub struct CryptCopyOutcome {
    pub bytes_copied: u64,
    pub sha256: [u8; 32],
    pub cancelled: bool,
}

/// A progress sink mirrors spec.md §6's abstract "progress callback
/// returning continue/cancel": called after each buffer, given bytes done
/// and total, returns whether to keep going.
pub trait ProgressSink {
    fn on_progress(&mut self, bytes_done: u64, bytes_total: u64) -> bool;
}

/// Default no-op sink for headless/test runs — never cancels.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&mut self, _bytes_done: u64, _bytes_total: u64) -> bool {
        true
    }
}

/// `indicatif`-backed sink: draws a byte-count bar for the content currently
/// streaming. Never cancels on its own; wire a ctrl-c handler in front of it
/// if cancellation needs to reach here.
pub struct IndicatifProgress {
    bar: indicatif::ProgressBar,
}

impl IndicatifProgress {
    pub fn new(total_len: u64) -> Self {
        let bar = indicatif::ProgressBar::new(total_len);
        bar.set_style(
            indicatif::ProgressStyle::with_template(
                "{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    pub fn attach_to(total_len: u64, multi: &indicatif::MultiProgress) -> Self {
        let mut sink = Self::new(total_len);
        sink.bar = multi.add(sink.bar);
        sink
    }
}

impl ProgressSink for IndicatifProgress {
    fn on_progress(&mut self, bytes_done: u64, bytes_total: u64) -> bool {
        self.bar.set_length(bytes_total);
        self.bar.set_position(bytes_done);
        if bytes_done >= bytes_total {
            self.bar.finish_and_clear();
        }
        true
    }
}

/// Streams exactly `total_len` bytes from `src` to `dst`, applying
/// `spec`'s keystream (if any) at the correct absolute offset per buffer so
/// the transform is agnostic to buffer size — the streaming contract from
/// spec.md §4.3 is what makes this safe. Used both for decrypt-on-extract
/// (repackage reading installed content) and encrypt-on-install.
pub async fn copy_with_crypt<R, W, P>(
    src: &mut R,
    dst: &mut W,
    total_len: u64,
    spec: &CryptSpec,
    buffer_size: usize,
    progress: &mut P,
) -> NintendoCtrResult<CryptCopyOutcome>
where
    R: AsyncRead + AsyncSeek + Unpin,
    W: AsyncWrite + AsyncSeek + Unpin,
    P: ProgressSink,
{
    let buffer_size = buffer_size.max(16);
    let mut buf = vec![0u8; buffer_size];
    let mut done: u64 = 0;
    let mut hasher = Sha256::new();

    while done < total_len {
        let want = buffer_size.min((total_len - done) as usize);
        let chunk = &mut buf[..want];
        src.read_exact(chunk).await?;

        if let Some(key) = spec.key.as_ref() {
            // Offsets must land on a 16-byte boundary for the CTR window
            // trick to hold; callers are responsible for choosing a
            // buffer_size that is itself a multiple of 16 (DEFAULT_BUFFER_SIZE
            // is), which keeps every `done` a multiple of 16 as well.
            apply_ctr_keystream(chunk, done, key, &spec.iv_base);
        }

        dst.write_all(chunk).await?;
        hasher.update(&chunk[..]);
        done += want as u64;

        if !progress.on_progress(done, total_len) {
            debug!("crypt-copy cancelled after {done}/{total_len} bytes");
            dst.flush().await?;
            return Ok(CryptCopyOutcome {
                bytes_copied: done,
                sha256: hasher.finalize().into(),
                cancelled: true,
            });
        }
    }

    dst.flush().await?;
    Ok(CryptCopyOutcome {
        bytes_copied: done,
        sha256: hasher.finalize().into(),
        cancelled: false,
    })
}

/// Pre-extends `dst` to `total_len` so every write lands inside the already
/// allocated file rather than growing it one buffer at a time — mirrors how
/// the installer pre-allocates content files on the destination drive
/// before streaming into them.
pub async fn preallocate<W: AsyncWrite + AsyncSeek + Unpin>(dst: &mut W, total_len: u64) -> std::io::Result<()> {
    if total_len == 0 {
        return Ok(());
    }
    dst.seek(std::io::SeekFrom::Start(total_len - 1)).await?;
    dst.write_all(&[0u8]).await?;
    dst.seek(std::io::SeekFrom::Start(0)).await?;
    Ok(())
}
