//! C8 Installer: lays out an installed title's on-disk tree under a drive,
//! emits its ContentManifest and (when declared) a zero-filled savegame, and
//! inserts its bookkeeping rows into the title and ticket databases.
//!
//! The "mounted image" the real hardware swaps between title.db and
//! ticket.db is process-wide shared state (spec.md §5); `MountGuard` models
//! that as a scoped acquisition so every exit path — success, error, or a
//! future panic — restores the prior mount, the same guarantee the original
//! tool gets from its enter/exit mount pairing around each db edit.

use crate::nintendo::ctr::constants::TID_HIGH_TWL_PORT;
use crate::nintendo::ctr::cryptcopy::{copy_with_crypt, preallocate, CryptSpec, NullProgress, ProgressSink};
use crate::nintendo::ctr::error::{NintendoCtrError, NintendoCtrResult};
use crate::nintendo::ctr::models::content_manifest::ContentManifest;
use crate::nintendo::ctr::models::ncch::ext_header::ExtendedHeader;
use crate::nintendo::ctr::models::ncch::NcchHeader;
use crate::nintendo::ctr::models::ticket::Ticket;
use crate::nintendo::ctr::models::title_info_entry::TitleInfoEntry;
use crate::nintendo::ctr::models::title_metadata::TitleMetadata;
use binrw::{BinRead, BinWrite, Endian};
use log::info;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncWrite, AsyncWriteExt};

/// What a caller wants prompted for during an interactive fixup — crypto-fix
/// confirmations, legit-ticket fallbacks, a BOSS hash repair offer. Headless
/// runs use `NonInteractive`, which answers every question with its
/// documented default so CI and batch installs stay deterministic.
pub trait InteractionStrategy {
    fn confirm(&mut self, label: &str) -> bool;
    fn select(&mut self, label: &str, options: &[&str]) -> usize;
}

/// Always declines prompts that default to "no" and always takes option 0 —
/// matches spec.md §6's requirement that headless runs never block on input.
pub struct NonInteractive;

impl InteractionStrategy for NonInteractive {
    fn confirm(&mut self, _label: &str) -> bool {
        false
    }

    fn select(&mut self, _label: &str, _options: &[&str]) -> usize {
        0
    }
}

/// Routes prompts through a caller-supplied callback, for UIs that can
/// actually ask a human.
pub struct Prompt<F: FnMut(&str, &[&str]) -> usize> {
    pub callback: F,
}

impl<F: FnMut(&str, &[&str]) -> usize> InteractionStrategy for Prompt<F> {
    fn confirm(&mut self, label: &str) -> bool {
        (self.callback)(label, &["no", "yes"]) == 1
    }

    fn select(&mut self, label: &str, options: &[&str]) -> usize {
        (self.callback)(label, options)
    }
}

/// Destination filesystem a title is installed onto: the real hardware has
/// several (`A:`/`B:` SD, `1:`/`4:` NAND FAT), but they all expose the same
/// operations this installer needs.
pub trait DriveFs {
    type Write: AsyncWrite + AsyncSeek + Unpin;
    type Read: AsyncRead + AsyncSeek + Unpin;

    async fn create_dir_all(&self, path: &Path) -> NintendoCtrResult<()>;
    async fn create_file(&self, path: &Path) -> NintendoCtrResult<Self::Write>;
    async fn open_file(&self, path: &Path) -> NintendoCtrResult<Self::Read>;
    async fn write_all(&self, path: &Path, data: &[u8]) -> NintendoCtrResult<()>;
    async fn remove_file(&self, path: &Path) -> NintendoCtrResult<()>;
}

/// `tokio::fs`-backed default, rooted at an arbitrary directory — used both
/// for a real SD/NAND mount point and, in tests, a `tempfile::tempdir()`.
pub struct LocalDriveFs {
    pub root: PathBuf,
}

impl LocalDriveFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl DriveFs for LocalDriveFs {
    type Write = tokio::fs::File;
    type Read = tokio::fs::File;

    async fn create_dir_all(&self, path: &Path) -> NintendoCtrResult<()> {
        tokio::fs::create_dir_all(self.resolve(path)).await?;
        Ok(())
    }

    async fn create_file(&self, path: &Path) -> NintendoCtrResult<Self::Write> {
        Ok(tokio::fs::File::create(self.resolve(path)).await?)
    }

    async fn open_file(&self, path: &Path) -> NintendoCtrResult<Self::Read> {
        Ok(tokio::fs::File::open(self.resolve(path)).await?)
    }

    async fn write_all(&self, path: &Path, data: &[u8]) -> NintendoCtrResult<()> {
        tokio::fs::write(self.resolve(path), data).await?;
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> NintendoCtrResult<()> {
        tokio::fs::remove_file(self.resolve(path)).await?;
        Ok(())
    }
}

/// Title-ID-relative path layout, all rooted at a drive: `title/<hi>/<lo>/…`.
/// Every path is returned without the drive prefix — the `DriveFs` impl owns
/// where the drive actually lives.
pub struct TitlePaths {
    pub title_id: u64,
}

impl TitlePaths {
    fn hi_lo(&self) -> (u32, u32) {
        ((self.title_id >> 32) as u32, self.title_id as u32)
    }

    pub fn content_dir(&self) -> PathBuf {
        let (hi, lo) = self.hi_lo();
        PathBuf::from(format!("title/{hi:08x}/{lo:08x}/content"))
    }

    pub fn tmd_path(&self) -> PathBuf {
        self.content_dir().join("00000000.tmd")
    }

    pub fn cmd_path(&self) -> PathBuf {
        self.content_dir().join("cmd/00000001.cmd")
    }

    /// DLC titles nest their content files under an extra `00000000/`
    /// directory; every other kind stores them flat in `content/`.
    pub fn content_path(&self, content_id: u32, is_dlc: bool) -> PathBuf {
        if is_dlc {
            self.content_dir().join(format!("00000000/{content_id:08x}.app"))
        } else {
            self.content_dir().join(format!("{content_id:08x}.app"))
        }
    }

    /// Removable-media savegame path.
    pub fn savegame_path_removable(&self) -> PathBuf {
        let (hi, lo) = self.hi_lo();
        PathBuf::from(format!("title/{hi:08x}/{lo:08x}/data/00000001.sav"))
    }

    /// System-NAND savegame path, hashed under the save-data archive's own
    /// title-ID range (`tid_lo | 0x00020000`), matching `GetInstallSavePath`.
    pub fn savegame_path_nand(&self, id0: u32) -> PathBuf {
        let (_, lo) = self.hi_lo();
        let save_tid_lo = lo | 0x00020000;
        PathBuf::from(format!("data/{id0:08x}/sysdata/{save_tid_lo:08x}/00000000"))
    }
}

pub fn is_dlc_title(title_id: u64) -> bool {
    (title_id >> 32) as u32 == crate::nintendo::ctr::constants::TID_HIGH_DLC
}

/// Best-effort read of the main content's NCCH header and (if declared)
/// ExtHeader straight off the just-written install tree, so the TIE size
/// formula can add the ExtHeader.savedata_size term per spec.md §3 invariant
/// 6. Returns `None` for anything that isn't an NCCH-based title (TWL ports,
/// a truncated/garbled content) rather than failing the whole install.
async fn read_main_ncch_ext_header<D: DriveFs>(
    drive: &D,
    tmd: &TitleMetadata,
    paths: &TitlePaths,
    is_dlc: bool,
) -> Option<(NcchHeader, Option<ExtendedHeader>)> {
    let main_content_id = tmd
        .content_chunk_records
        .iter()
        .find(|c| c.content_index == 0)?
        .content_id;
    let path = paths.content_path(main_content_id, is_dlc);
    let file = drive.open_file(&path).await.ok()?;

    let mut buf = Vec::new();
    file.take(0x600).read_to_end(&mut buf).await.ok()?;

    let ncch = NcchHeader::read(&mut Cursor::new(&buf)).ok()?;
    if ncch.ext_header_size == 0 {
        return Some((ncch, None));
    }

    let ext = ExtendedHeader::read(&mut Cursor::new(&buf[0x200..])).ok();
    Some((ncch, ext))
}

/// The reserved-ID flag policy from spec.md §4.8: TWL-ports and system
/// titles get dedicated `TitleInfoEntry` flag bits that `build_from_twl`/
/// `build_from_ncch` don't derive from a bare TMD alone.
pub fn apply_reserved_id_policy(tie: &mut TitleInfoEntry, title_id: u64) {
    let title_id_high = (title_id >> 32) as u32;

    if title_id_high == TID_HIGH_TWL_PORT {
        tie.flags_2[0] = 1;
        tie.flags_2[5] = 1;
    }

    // "system" titles (title-id-hi bit4 set) omit the not-a-system-title
    // user flag; every other title gets it set.
    tie.flags_2[4] = if title_id_high & 0x10 != 0 { 0 } else { 1 };
}

/// A single content to install: its chunk's metadata plus a reader over its
/// plaintext bytes and the decrypt spec to apply while streaming it in (the
/// source is usually already-decrypted once extracted from a package, so
/// `CryptSpec::plain()` is the common case; re-encrypting on install uses a
/// non-plain spec).
pub struct InstallContent<R> {
    pub content_id: u32,
    pub content_index: u16,
    pub size: u64,
    pub reader: R,
    pub crypt: CryptSpec,
}

/// Scoped db-mount acquisition: the process-wide "mounted image" the real
/// hardware swaps between title.db and ticket.db. `acquire` calls `mount`
/// with the new path; the guard's `Drop` always calls `mount` again with
/// whatever the prior mount was, on every exit path including an early `?`.
pub struct MountGuard<'a, F: FnMut(Option<&str>)> {
    mount: &'a mut F,
    previous: Option<String>,
}

impl<'a, F: FnMut(Option<&str>)> MountGuard<'a, F> {
    pub fn acquire(mount: &'a mut F, previous: Option<String>, new_mount: &str) -> Self {
        mount(Some(new_mount));
        Self { mount, previous }
    }
}

impl<'a, F: FnMut(Option<&str>)> Drop for MountGuard<'a, F> {
    fn drop(&mut self) {
        (self.mount)(self.previous.as_deref());
    }
}

/// Inserts a TIE into the (in-memory, for this toolkit) title.db representation.
pub trait TitleDatabase {
    fn insert(&mut self, title_id: u64, entry: TitleInfoEntry);
}

/// Inserts a ticket into the ticket.db representation.
pub trait TicketDatabase {
    fn insert(&mut self, title_id: u64, ticket: Ticket);
}

/// Minimal in-memory stand-in for the real on-disk title.db/ticket.db binary
/// format (3DS's own SQLite-like bdb layout). No parser/writer for that
/// format exists in this crate — see DESIGN.md's Open Question decision —
/// so a CLI-driven install records rows here for the lifetime of the process
/// rather than persisting them across runs.
#[derive(Default)]
pub struct InMemoryTitleDatabase(pub std::collections::HashMap<u64, TitleInfoEntry>);

impl TitleDatabase for InMemoryTitleDatabase {
    fn insert(&mut self, title_id: u64, entry: TitleInfoEntry) {
        self.0.insert(title_id, entry);
    }
}

#[derive(Default)]
pub struct InMemoryTicketDatabase(pub std::collections::HashMap<u64, Ticket>);

impl TicketDatabase for InMemoryTicketDatabase {
    fn insert(&mut self, title_id: u64, ticket: Ticket) {
        self.0.insert(title_id, ticket);
    }
}

/// Streams every content of a title onto `drive`, writes its TMD/CMD/
/// savegame, then serially updates title.db and ticket.db — db writes commit
/// only after every content is on disk, matching spec.md §5's "no rollback
/// on later failure, but db inserts happen last" ordering.
#[allow(clippy::too_many_arguments)]
pub async fn install_title<D, R, TDB, KDB, M>(
    drive: &D,
    mut tmd: TitleMetadata,
    ticket: Ticket,
    mut contents: Vec<InstallContent<R>>,
    sd: bool,
    title_db: &mut TDB,
    ticket_db: &mut KDB,
    mount_title_db: M,
) -> NintendoCtrResult<()>
where
    D: DriveFs,
    R: AsyncRead + AsyncSeek + Unpin,
    TDB: TitleDatabase,
    KDB: TicketDatabase,
    M: FnMut(Option<&str>),
{
    let title_id = tmd.header.title_id;
    let paths = TitlePaths { title_id };
    let is_dlc = is_dlc_title(title_id);

    drive.create_dir_all(&paths.content_dir()).await?;
    if is_dlc {
        drive.create_dir_all(&paths.content_dir().join("00000000")).await?;
    }
    drive.create_dir_all(&paths.cmd_path().parent().unwrap().to_path_buf()).await?;

    for content in &mut contents {
        let path = paths.content_path(content.content_id, is_dlc);
        let mut dst = drive.create_file(&path).await?;
        preallocate(&mut dst, content.size).await?;

        let mut progress = NullProgress;
        let outcome = copy_with_crypt(
            &mut content.reader,
            &mut dst,
            content.size,
            &content.crypt,
            crate::nintendo::ctr::cryptcopy::DEFAULT_BUFFER_SIZE,
            &mut progress,
        )
        .await?;

        if outcome.cancelled {
            drive.remove_file(&path).await.ok();
            return Err(NintendoCtrError::UserCancel);
        }

        if let Some(chunk) = tmd
            .content_chunk_records
            .iter_mut()
            .find(|c| c.content_index == content.content_index)
        {
            chunk.content_size = outcome.bytes_copied;
            chunk.hash = outcome.sha256.to_vec();
            chunk.content_type.set_encrypted(false);
        }
    }

    let mut tmd_buf = Vec::new();
    tmd.write_options(&mut Cursor::new(&mut tmd_buf), Endian::Big, ())
        .map_err(NintendoCtrError::BinRw)?;
    drive.write_all(&paths.tmd_path(), &tmd_buf).await?;

    let manifest = ContentManifest::from_chunks(tmd.header.title_type, &tmd.content_chunk_records);
    let mut cmd_buf = Vec::new();
    manifest
        .write_options(&mut Cursor::new(&mut cmd_buf), Endian::Little, ())
        .map_err(NintendoCtrError::BinRw)?;
    drive.write_all(&paths.cmd_path(), &cmd_buf).await?;

    let mut tie = match read_main_ncch_ext_header(drive, &tmd, &paths, is_dlc).await {
        Some((ncch, ext)) => TitleInfoEntry::build_from_ncch(&tmd, &ncch, ext.as_ref(), sd),
        None => TitleInfoEntry::build_from_tmd(&tmd, sd),
    };
    apply_reserved_id_policy(&mut tie, title_id);

    let mut mount_fn = mount_title_db;
    {
        let _guard = MountGuard::acquire(&mut mount_fn, None, "dbs/title.db");
        info!("inserting title.db row for {title_id:016x}");
        title_db.insert(title_id, tie);
    }
    {
        let _guard = MountGuard::acquire(&mut mount_fn, None, "dbs/ticket.db");
        info!("inserting ticket.db row for {title_id:016x}");
        ticket_db.insert(title_id, ticket);
    }

    Ok(())
}

/// Writes a zero-filled savegame file sized from the ExtHeader's declared
/// save-data size, when nonzero; skipped entirely for titles that have none
/// (spec.md §4.8, S4's "savegame absent" case).
pub async fn install_savegame<D: DriveFs>(
    drive: &D,
    paths: &TitlePaths,
    savedata_size: u64,
    on_system_nand: Option<u32>,
) -> NintendoCtrResult<()> {
    if savedata_size == 0 {
        return Ok(());
    }

    let path = match on_system_nand {
        Some(id0) => paths.savegame_path_nand(id0),
        None => paths.savegame_path_removable(),
    };

    if let Some(parent) = path.parent() {
        drive.create_dir_all(parent).await?;
    }
    let mut file = drive.create_file(&path).await?;
    preallocate(&mut file, savedata_size).await?;
    file.flush().await?;
    Ok(())
}
