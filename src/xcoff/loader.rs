//! The XCOFF loader section: the loader header, symbol table, relocation
//! table, and import file ID table that drive dynamic linking.

use super::constants::*;
use crate::error::{Error, Result};
use crate::strtab::Strtab;
use scroll::Pread;

/// Loader section header (`l_version` .. `l_stoff`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, scroll::Pread, scroll::SizeWith)]
pub struct LoaderHeader {
    pub l_version: u32,
    pub l_nsyms: u32,
    pub l_nreloc: u32,
    pub l_istlen: u32,
    pub l_nimpid: u32,
    pub l_impoff: u32,
    pub l_stlen: u32,
    pub l_stoff: u32,
}

pub const SIZEOF_LOADER_HEADER: usize = 32;

/// One entry of the loader symbol table, with the on-disk 8-byte name/offset
/// union already resolved into an owned `String` — nothing here aliases a
/// pointer into the mapped file.
#[derive(Debug, Clone)]
pub struct LoaderSymbol {
    pub name: String,
    pub value: u32,
    pub section_number: u16,
    pub symbol_type: u8,
    pub storage_class: u8,
    pub import_file_index: u32,
    pub param_check: u32,
}

pub const SIZEOF_LOADER_SYMBOL: usize = 24;

impl LoaderSymbol {
    pub fn is_export(&self) -> bool {
        self.symbol_type & L_EXPORT != 0
    }
    pub fn is_import(&self) -> bool {
        self.symbol_type & L_IMPORT != 0
    }
    pub fn is_entry(&self) -> bool {
        self.symbol_type & L_ENTRY != 0
    }
}

/// A loader relocation entry.
///
/// This is genuinely **12 bytes**, not the 16 the published IBM tables
/// imply: there is no separate `l_value` field, and the relocation type
/// splits into a 1-byte size and a 1-byte type rather than a 4-byte type.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, scroll::Pread, scroll::SizeWith)]
pub struct LoaderRelocation {
    pub vaddr: u32,
    pub symndx: u32,
    pub rsize: u8,
    pub rtype: u8,
    pub section_number: u16,
}

pub const SIZEOF_LOADER_RELOCATION: usize = 12;

/// An import file ID: the three-string tuple `{path, base, member}`, e.g.
/// `{"/usr/lib", "libc.a", "shr.o"}`.
#[derive(Debug, Clone, Default)]
pub struct ImportFile {
    pub path: String,
    pub base: String,
    pub member: String,
}

/// The fully parsed loader section.
pub struct LoaderSection {
    pub header: LoaderHeader,
    pub symbols: Vec<LoaderSymbol>,
    pub relocations: Vec<LoaderRelocation>,
    pub import_files: Vec<ImportFile>,
}

impl LoaderSection {
    pub fn parse(bytes: &[u8], sec_off: usize) -> Result<Self> {
        let header: LoaderHeader = bytes.pread_with(sec_off, scroll::BE)?;

        let strtab_off = sec_off
            .checked_add(header.l_stoff as usize)
            .ok_or_else(|| Error::Malformed("loader string table offset overflows".into()))?;
        let strtab = Strtab::parse(bytes, strtab_off, header.l_stlen as usize, 0)?;

        let mut symbols = Vec::with_capacity(header.l_nsyms as usize);
        let mut off = sec_off + SIZEOF_LOADER_HEADER;
        for _ in 0..header.l_nsyms {
            let name_field: &[u8] = bytes.pread_with(off, 8)?;
            let name = if name_field[0..4] == [0, 0, 0, 0] {
                let strtab_idx: u32 = name_field[4..8].pread_with(0, scroll::BE)?;
                strtab.get(strtab_idx as usize).to_owned()
            } else {
                let end = name_field.iter().position(|&b| b == 0).unwrap_or(8);
                String::from_utf8_lossy(&name_field[..end]).into_owned()
            };
            let value: u32 = bytes.pread_with(off + 8, scroll::BE)?;
            let section_number: u16 = bytes.pread_with(off + 12, scroll::BE)?;
            let symbol_type: u8 = bytes.pread(off + 14)?;
            let storage_class: u8 = bytes.pread(off + 15)?;
            let import_file_index: u32 = bytes.pread_with(off + 16, scroll::BE)?;
            let param_check: u32 = bytes.pread_with(off + 20, scroll::BE)?;
            symbols.push(LoaderSymbol {
                name,
                value,
                section_number,
                symbol_type,
                storage_class,
                import_file_index,
                param_check,
            });
            off += SIZEOF_LOADER_SYMBOL;
        }

        let mut relocations = Vec::with_capacity(header.l_nreloc as usize);
        let mut off = off;
        for _ in 0..header.l_nreloc {
            let rel: LoaderRelocation = bytes.pread_with(off, scroll::BE)?;
            relocations.push(rel);
            off += SIZEOF_LOADER_RELOCATION;
        }

        let impid_off = sec_off
            .checked_add(header.l_impoff as usize)
            .ok_or_else(|| Error::Malformed("import file table offset overflows".into()))?;
        let impid_strtab = Strtab::parse(bytes, impid_off, header.l_istlen as usize, 0)?;
        let mut import_files = Vec::with_capacity(header.l_nimpid as usize);
        let mut idx = 0usize;
        for _ in 0..header.l_nimpid {
            let path = impid_strtab.get(idx).to_owned();
            idx += path.len() + 1;
            let base = impid_strtab.get(idx).to_owned();
            idx += base.len() + 1;
            let member = impid_strtab.get(idx).to_owned();
            idx += member.len() + 1;
            import_files.push(ImportFile { path, base, member });
        }

        Ok(LoaderSection {
            header,
            symbols,
            relocations,
            import_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_header_is_32_bytes() {
        assert_eq!(SIZEOF_LOADER_HEADER, std::mem::size_of::<LoaderHeader>());
    }

    #[test]
    fn loader_relocation_is_12_bytes_not_16() {
        assert_eq!(SIZEOF_LOADER_RELOCATION, std::mem::size_of::<LoaderRelocation>());
    }
}
