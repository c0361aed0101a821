//! A reader for the AIX "Big" archive format (`<bigaf>\n` magic).
//!
//! Unlike a SysV/GNU `ar`, Big-AR members form a doubly-linked list (`ar_nxtmem`/
//! `ar_prvmem`) rather than being laid out purely sequentially, and every
//! numeric header field is ASCII decimal, space-padded rather than
//! NUL-padded or fixed-width binary.

use crate::endian::{parse_ascii_decimal_u32, parse_ascii_decimal_u64};
use crate::error::{Error, Result};
use log::debug;

pub const MAGIC: &[u8; 8] = b"<bigaf>\n";
pub const SIZEOF_MAGIC: usize = 8;

const SIZEOF_FILE_HEADER: usize = 8 + 20 * 6;
/// Size of the fixed portion of a member header, before the variable-length name.
const SIZEOF_MEMBER_HEADER_FIXED: usize = 20 * 3 + 12 * 4 + 4;

/// The archive's "fixed length" file header: six ASCII-decimal offsets into
/// the file, following the magic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHeader {
    pub memoff: u64,
    pub gstoff: u64,
    pub gst64off: u64,
    pub fstmoff: u64,
    pub lstmoff: u64,
    pub freeoff: u64,
}

impl FileHeader {
    fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SIZEOF_FILE_HEADER {
            return Err(Error::Malformed("archive too small for file header".into()));
        }
        if &bytes[0..SIZEOF_MAGIC] != MAGIC {
            return Err(Error::BadMagic(u64::from_be_bytes(
                bytes[0..8].try_into().unwrap(),
            )));
        }
        let field = |i: usize| -> Result<u64> { parse_ascii_decimal_u64(&bytes[8 + i * 20..8 + (i + 1) * 20]) };
        Ok(FileHeader {
            memoff: field(0)?,
            gstoff: field(1)?,
            gst64off: field(2)?,
            fstmoff: field(3)?,
            lstmoff: field(4)?,
            freeoff: field(5)?,
        })
    }
}

/// One member's header, fully decoded (all ASCII-decimal/octal fields parsed
/// to integers), plus the byte range of its data within the archive.
#[derive(Debug, Clone)]
pub struct MemberHeader {
    pub size: u64,
    pub next_member: u64,
    pub prev_member: u64,
    pub date: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub name: String,
    /// Byte offset of this member's data (immediately following its header + name).
    pub data_offset: usize,
}

impl MemberHeader {
    fn parse(bytes: &[u8], offset: usize) -> Result<Self> {
        let hdr = bytes
            .get(offset..offset + SIZEOF_MEMBER_HEADER_FIXED)
            .ok_or_else(|| Error::Malformed("member header out of bounds".into()))?;
        let size = parse_ascii_decimal_u64(&hdr[0..20])?;
        let next_member = parse_ascii_decimal_u64(&hdr[20..40])?;
        let prev_member = parse_ascii_decimal_u64(&hdr[40..60])?;
        let date = parse_ascii_decimal_u64(&hdr[60..72])?;
        let uid = parse_ascii_decimal_u32(&hdr[72..84])?;
        let gid = parse_ascii_decimal_u32(&hdr[84..96])?;
        let mode = parse_ascii_decimal_u32(&hdr[96..108])?;
        let namlen = parse_ascii_decimal_u32(&hdr[108..112])? as usize;

        let name_off = offset + SIZEOF_MEMBER_HEADER_FIXED;
        let name_bytes = bytes
            .get(name_off..name_off + namlen)
            .ok_or_else(|| Error::Malformed("member name out of bounds".into()))?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        // Name is padded to an even offset, followed by a 2-byte "`\n" trailer.
        let mut data_offset = name_off + namlen;
        if data_offset % 2 != 0 {
            data_offset += 1;
        }
        data_offset += 2; // skip trailer

        Ok(MemberHeader {
            size,
            next_member,
            prev_member,
            date,
            uid,
            gid,
            mode,
            name,
            data_offset,
        })
    }

    pub fn data_range(&self) -> std::ops::Range<usize> {
        self.data_offset..self.data_offset + self.size as usize
    }
}

/// A parsed Big-AR archive, keeping its backing bytes mapped for as long as
/// any extracted member needs to borrow from it.
pub struct BigArchive {
    backing: memmap2::Mmap,
    pub header: FileHeader,
}

impl BigArchive {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let header = FileHeader::parse(&mmap)?;
        debug!("bigar: opened archive, first member at {:#x}", header.fstmoff);
        Ok(BigArchive { backing: mmap, header })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.backing[..]
    }

    /// Walks the member linked list starting at `fl_fstmoff`, following
    /// `ar_nxtmem` rather than scanning sequentially — a member's recorded
    /// offset is authoritative, not its position in the file. Zero-length
    /// members are structural sentinels (e.g. the global symbol table's
    /// placeholder slot) and are skipped rather than returned.
    pub fn iterate_members(&self) -> Result<Vec<MemberHeader>> {
        let mut members = Vec::new();
        let mut offset = self.header.fstmoff;
        while offset != 0 {
            let member = MemberHeader::parse(self.bytes(), offset as usize)?;
            let next = member.next_member;
            if member.size > 0 {
                members.push(member);
            }
            if next == offset {
                break; // defensive: a self-referential list would otherwise spin forever
            }
            offset = next;
        }
        Ok(members)
    }

    pub fn find_member(&self, name: &str) -> Result<Option<MemberHeader>> {
        Ok(self.iterate_members()?.into_iter().find(|m| m.name == name))
    }

    pub fn extract(&self, member: &MemberHeader) -> Result<&[u8]> {
        self.bytes()
            .get(member.data_range())
            .ok_or_else(|| Error::Malformed(format!("member {} data out of bounds", member.name)))
    }
}
