//! A reader for the 32-bit XCOFF object file format used by AIX.
//!
//! Based on <https://www.ibm.com/docs/en/aix/7.2.0?topic=formats-xcoff-object-file-format>,
//! corrected in the two places the published docs are known to be wrong (see
//! [`SectionHeader::s_flags`] and [`LoaderRelocation`]).

mod constants;
mod loader;

pub use constants::*;
pub use loader::*;

use crate::error::{Error, Result};
use log::debug;
use scroll::{Pread, SizeWith};
use std::sync::Arc;

/// Magic number for a 32-bit XCOFF object (`f_magic`).
pub const XCOFFF32_MAGIC: u16 = 0x01DF;
/// Magic number for a 64-bit XCOFF object. Recognized only so we can reject it cleanly;
/// 64-bit objects are out of scope.
pub const XCOFFF64_MAGIC: u16 = 0x01F7;

/// 32-bit XCOFF file header. Always big-endian on disk.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pread, SizeWith)]
pub struct FileHeader {
    pub f_magic: u16,
    pub f_nscns: u16,
    pub f_timdat: u32,
    pub f_symptr: u32,
    pub f_nsyms: u32,
    pub f_opthdr: u16,
    pub f_flags: u16,
}

pub const SIZEOF_FILE_HEADER: usize = 20;

/// 32-bit XCOFF auxiliary ("optional") header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pread, SizeWith)]
pub struct AuxHeader {
    pub o_mflag: u16,
    pub o_vstamp: u16,
    pub o_tsize: u32,
    pub o_dsize: u32,
    pub o_bsize: u32,
    pub o_entry: u32,
    pub o_text_start: u32,
    pub o_data_start: u32,
    pub o_toc: u32,
    pub o_snentry: u16,
    pub o_sntext: u16,
    pub o_sndata: u16,
    pub o_sntoc: u16,
    pub o_snloader: u16,
    pub o_snbss: u16,
    pub o_algntext: u16,
    pub o_algndata: u16,
    pub o_modtype: [u8; 2],
    pub o_cpuflag: u8,
    pub o_cputype: u8,
    pub o_maxstack: u32,
    pub o_maxdata: u32,
    pub o_debugger: u32,
    pub o_textpsize: u8,
    pub o_datapsize: u8,
    pub o_stackpsize: u8,
    pub o_flags: u8,
    pub o_sntdata: u16,
    pub o_sntbss: u16,
}

pub const SIZEOF_AUX_HEADER: usize = 72;

/// 32-bit XCOFF section header.
///
/// Note: `s_flags` is **4 bytes**, not the 2 implied by IBM's published
/// tables (confirmed against the reference implementation this crate is
/// ported from).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pread, SizeWith)]
pub struct SectionHeader {
    pub s_name: [u8; 8],
    pub s_paddr: u32,
    pub s_vaddr: u32,
    pub s_size: u32,
    pub s_scnptr: u32,
    pub s_relptr: u32,
    pub s_lnnoptr: u32,
    pub s_nreloc: u16,
    pub s_nlnno: u16,
    pub s_flags: u32,
}

pub const SIZEOF_SECTION_HEADER: usize = 40;

impl SectionHeader {
    pub fn name(&self) -> &str {
        let end = self.s_name.iter().position(|&b| b == 0).unwrap_or(8);
        std::str::from_utf8(&self.s_name[..end]).unwrap_or("")
    }

    pub fn is_text(&self) -> bool {
        self.s_flags & STYP_TEXT != 0
    }
    pub fn is_data(&self) -> bool {
        self.s_flags & STYP_DATA != 0
    }
    pub fn is_bss(&self) -> bool {
        self.s_flags & STYP_BSS != 0
    }
    pub fn is_loader(&self) -> bool {
        self.s_flags & STYP_LOADER != 0
    }
}

/// A 3-word AIX function descriptor: `{code address, TOC anchor, environment pointer}`.
/// Every AIX function pointer actually points at one of these, not at code.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pread, SizeWith)]
pub struct FuncDesc {
    pub address: u32,
    pub toc_anchor: u32,
    pub env_ptr: u32,
}

pub const SIZEOF_FUNC_DESC: usize = 12;

/// Fixed cap on a single object's section count. 16 is generous for real
/// AIX executables and shared objects (`.text`/`.data`/`.bss`/`.loader` plus
/// a handful of debug/typchk sections); anything claiming more is either
/// corrupt or hostile and is rejected before we'd spend unbounded work
/// walking its section table.
pub const MAX_SECTIONS: u16 = 16;

/// Owns the backing bytes of an XCOFF image for as long as any borrow into it
/// (sections, loader data) needs to exist. An image loaded directly from a
/// path keeps its [`memmap2::Mmap`] alive; one extracted from a Big-AR member
/// shares ownership of the archive's own mapping instead of copying the
/// member out.
pub enum Backing {
    Mmap(memmap2::Mmap),
    Owned(Vec<u8>),
    Archive(Arc<crate::bigar::BigArchive>, std::ops::Range<usize>),
}

impl Backing {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mmap(m) => &m[..],
            Backing::Owned(v) => &v[..],
            Backing::Archive(ar, range) => &ar.bytes()[range.clone()],
        }
    }
}

/// A parsed 32-bit XCOFF object: the three headers plus the section table
/// and (if present) the loader section.
pub struct XcoffImage {
    backing: Backing,
    pub file_header: FileHeader,
    pub aux_header: Option<AuxHeader>,
    pub sections: Vec<SectionHeader>,
    pub loader: Option<LoaderSection>,
}

impl XcoffImage {
    /// Memory-maps `path` and parses it as a 32-bit XCOFF object.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::load(Backing::Mmap(mmap))
    }

    /// Parses an XCOFF object already extracted from a Big-AR archive member,
    /// sharing the archive's own backing mapping.
    pub fn from_archive_member(
        archive: Arc<crate::bigar::BigArchive>,
        range: std::ops::Range<usize>,
    ) -> Result<Self> {
        Self::load(Backing::Archive(archive, range))
    }

    /// Parses an owned byte buffer as a 32-bit XCOFF object.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::load(Backing::Owned(bytes))
    }

    fn load(backing: Backing) -> Result<Self> {
        let bytes = backing.bytes();
        let file_header: FileHeader = bytes.pread_with(0, scroll::BE)?;
        if file_header.f_magic == XCOFFF64_MAGIC {
            return Err(Error::Unsupported("64-bit XCOFF objects are not supported".into()));
        }
        if file_header.f_magic != XCOFFF32_MAGIC {
            return Err(Error::BadMagic(file_header.f_magic as u64));
        }

        let mut offset = SIZEOF_FILE_HEADER;
        let aux_header = if file_header.f_opthdr > 0 {
            let aux: AuxHeader = bytes.pread_with(offset, scroll::BE)?;
            Some(aux)
        } else {
            None
        };
        offset += file_header.f_opthdr as usize;

        if file_header.f_nscns > MAX_SECTIONS {
            return Err(Error::TooManySections {
                found: file_header.f_nscns,
                cap: MAX_SECTIONS,
            });
        }

        let mut sections = Vec::with_capacity(file_header.f_nscns as usize);
        for _ in 0..file_header.f_nscns {
            let sec: SectionHeader = bytes.pread_with(offset, scroll::BE)?;
            offset += SIZEOF_SECTION_HEADER;
            sections.push(sec);
        }

        let loader = sections
            .iter()
            .find(|s| s.is_loader())
            .map(|s| LoaderSection::parse(bytes, s.s_scnptr as usize))
            .transpose()?;

        debug!(
            "xcoff: parsed {} sections, loader present: {}",
            sections.len(),
            loader.is_some()
        );

        Ok(XcoffImage {
            backing,
            file_header,
            aux_header,
            sections,
            loader,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    /// Reads the entry point's code address directly out of the on-disk
    /// function-descriptor triple `<addr, toc, env>`, per spec.md §4.B:
    /// the descriptor lives at file offset `o_entry - o_data_start +
    /// data_section.s_scnptr`. Returns `addr` in host byte order. This is
    /// the *file-level* entry point, i.e. before any runtime relocation;
    /// the main executable's text delta is always 0, so for it this equals
    /// the runtime code address, but a library's would not be.
    pub fn entrypoint(&self) -> Result<u32> {
        let aux = self
            .aux_header
            .as_ref()
            .ok_or_else(|| Error::Malformed("xcoff object has no auxiliary header".into()))?;
        let data = self
            .data_section()
            .ok_or_else(|| Error::Malformed("xcoff object has no .data section".into()))?;

        let desc_off = (aux.o_entry.wrapping_sub(aux.o_data_start)).wrapping_add(data.s_scnptr) as usize;
        let desc_end = desc_off
            .checked_add(12)
            .ok_or_else(|| Error::Malformed("entry point function descriptor offset overflows".into()))?;
        let desc = self
            .bytes()
            .get(desc_off..desc_end)
            .ok_or_else(|| Error::Malformed("entry point function descriptor out of bounds".into()))?;
        Ok(u32::from_be_bytes([desc[0], desc[1], desc[2], desc[3]]))
    }

    pub fn section_data(&self, sec: &SectionHeader) -> Result<&[u8]> {
        if sec.is_bss() {
            return Ok(&[]);
        }
        let start = sec.s_scnptr as usize;
        let end = start
            .checked_add(sec.s_size as usize)
            .ok_or_else(|| Error::Malformed("section extends past usize range".into()))?;
        self.bytes()
            .get(start..end)
            .ok_or_else(|| Error::Malformed(format!("section {} out of bounds", sec.name())))
    }

    pub fn text_section(&self) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.is_text())
    }
    pub fn data_section(&self) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.is_data())
    }
    pub fn bss_section(&self) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.is_bss())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scroll::Pwrite;

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; SIZEOF_FILE_HEADER];
        buf.pwrite_with(0xBEEFu16, 0, scroll::BE).unwrap();
        let err = XcoffImage::from_bytes(buf).unwrap_err();
        assert!(matches!(err, Error::BadMagic(_)));
    }

    #[test]
    fn rejects_64bit_magic() {
        let mut buf = vec![0u8; SIZEOF_FILE_HEADER];
        buf.pwrite_with(XCOFFF64_MAGIC, 0, scroll::BE).unwrap();
        let err = XcoffImage::from_bytes(buf).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn rejects_section_count_past_the_cap() {
        let mut buf = vec![0u8; SIZEOF_FILE_HEADER];
        buf.pwrite_with(XCOFFF32_MAGIC, 0, scroll::BE).unwrap();
        buf.pwrite_with(MAX_SECTIONS + 1, 2, scroll::BE).unwrap();
        let err = XcoffImage::from_bytes(buf).unwrap_err();
        match err {
            Error::TooManySections { found, cap } => {
                assert_eq!(found, MAX_SECTIONS + 1);
                assert_eq!(cap, MAX_SECTIONS);
            }
            other => panic!("expected TooManySections, got {:?}", other),
        }
    }

    #[test]
    fn accepts_section_count_at_the_cap() {
        // At the cap is fine; the section table itself is empty in this
        // buffer, so f_nscns lies, but the cap check must pass through to
        // the (separate) out-of-bounds failure for the section reads rather
        // than rejecting on count alone.
        let mut buf = vec![0u8; SIZEOF_FILE_HEADER];
        buf.pwrite_with(XCOFFF32_MAGIC, 0, scroll::BE).unwrap();
        buf.pwrite_with(MAX_SECTIONS, 2, scroll::BE).unwrap();
        let err = XcoffImage::from_bytes(buf).unwrap_err();
        assert!(!matches!(err, Error::TooManySections { .. }));
    }

    #[test]
    fn parses_minimal_header_no_sections() {
        let mut buf = vec![0u8; SIZEOF_FILE_HEADER];
        buf.pwrite_with(XCOFFF32_MAGIC, 0, scroll::BE).unwrap();
        let image = XcoffImage::from_bytes(buf).unwrap();
        assert_eq!(image.sections.len(), 0);
        assert!(image.loader.is_none());
    }

    /// Builds an object with one `.data` section holding a function
    /// descriptor `<addr, toc, env>` at the file offset `entrypoint()`
    /// derives from `o_entry`/`o_data_start`/`s_scnptr`, and checks the
    /// code address it returns matches what was written.
    #[test]
    fn entrypoint_reads_code_address_out_of_the_on_disk_descriptor() {
        const DATA_VADDR: u32 = 0x2000_0000;
        const ENTRY_VADDR: u32 = DATA_VADDR + 0x40; // descriptor lives 0x40 into .data
        const CODE_ADDR: u32 = 0x1000_0100;
        const TOC_ADDR: u32 = 0x2000_1000;

        let hdr_size = SIZEOF_FILE_HEADER + SIZEOF_AUX_HEADER + SIZEOF_SECTION_HEADER;
        let data_scnptr = hdr_size as u32;
        let data_size = 0x100u32;

        let file_header = FileHeader {
            f_magic: XCOFFF32_MAGIC,
            f_nscns: 1,
            f_opthdr: SIZEOF_AUX_HEADER as u16,
            ..Default::default()
        };
        let aux = AuxHeader {
            o_entry: ENTRY_VADDR,
            o_data_start: DATA_VADDR,
            o_sndata: 1,
            ..Default::default()
        };
        let mut s_name = [0u8; 8];
        s_name[..5].copy_from_slice(b".data");
        let data_section = SectionHeader {
            s_name,
            s_paddr: DATA_VADDR,
            s_vaddr: DATA_VADDR,
            s_size: data_size,
            s_scnptr: data_scnptr,
            s_relptr: 0,
            s_lnnoptr: 0,
            s_nreloc: 0,
            s_nlnno: 0,
            s_flags: STYP_DATA,
        };

        let mut buf = vec![0u8; hdr_size + data_size as usize];
        buf.pwrite_with(file_header, 0, scroll::BE).unwrap();
        buf.pwrite_with(aux, SIZEOF_FILE_HEADER, scroll::BE).unwrap();
        buf.pwrite_with(data_section, SIZEOF_FILE_HEADER + SIZEOF_AUX_HEADER, scroll::BE)
            .unwrap();

        let desc_off = data_scnptr as usize + (ENTRY_VADDR - DATA_VADDR) as usize;
        buf.pwrite_with(CODE_ADDR, desc_off, scroll::BE).unwrap();
        buf.pwrite_with(TOC_ADDR, desc_off + 4, scroll::BE).unwrap();
        buf.pwrite_with(0u32, desc_off + 8, scroll::BE).unwrap();

        let image = XcoffImage::from_bytes(buf).unwrap();
        assert_eq!(image.entrypoint().unwrap(), CODE_ADDR);
    }
}
