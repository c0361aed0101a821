//! The dynamic linker: loads an XCOFF executable and the full transitive
//! closure of the libraries it imports from, relocates every object into
//! the guest address space MM hands out, and resolves every import —
//! against another loaded object, against `/unix` (§ [`crate::unix_shim`]),
//! or, in the one case nothing actually answers, against a poison address.

use crate::bigar::BigArchive;
use crate::cpu::CpuBackend;
use crate::error::{Error, Result};
use crate::mm::{Deltas, LoadedRegions, MemoryManager};
use crate::unix_shim::UnixShim;
use crate::xcoff::{ImportFile, LoaderSymbol, XcoffImage};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Returned for an `L_IMPORT` symbol whose import-file index is 0 — the
/// LIBPATH sentinel, not a module reference. Any guest code that actually
/// dereferences this trips the unmapped-memory hook instead of silently
/// reading garbage; which object does this, and why, is an open question
/// this crate inherited rather than resolved.
pub const LIBPATH_POISON_ADDR: u32 = 0x1111;

/// A successfully loaded and relocated XCOFF object, whether the main
/// executable or one of its transitive library dependencies.
pub struct LoadedObject {
    pub identifier: String,
    pub image: XcoffImage,
    pub regions: LoadedRegions,
    pub toc_anchor: u32,
}

fn delta_for_section_number(deltas: &Deltas, section_number: u32) -> u32 {
    match section_number {
        1 => deltas.text,
        2 => deltas.data,
        3 => deltas.bss,
        _ => 0,
    }
}

fn delta_for_symndx(deltas: &Deltas, symndx: u32) -> u32 {
    match symndx {
        0 => deltas.text,
        1 => deltas.data,
        2 => deltas.bss,
        _ => 0,
    }
}

/// Owns the global list of loaded objects and drives the recursive
/// load/relocate/resolve cycle described in spec.md §4.I.
pub struct Linker<'a, C: CpuBackend> {
    mm: &'a mut MemoryManager<C>,
    shim: &'a mut UnixShim,
    search_paths: Vec<PathBuf>,
    loaded: Vec<LoadedObject>,
}

impl<'a, C: CpuBackend> Linker<'a, C> {
    pub fn new(mm: &'a mut MemoryManager<C>, shim: &'a mut UnixShim, search_paths: Vec<PathBuf>) -> Self {
        Linker {
            mm,
            shim,
            search_paths,
            loaded: Vec::new(),
        }
    }

    pub fn loaded(&self) -> &[LoadedObject] {
        &self.loaded
    }

    pub fn get(&self, identifier: &str) -> Option<&LoadedObject> {
        self.loaded.iter().find(|o| o.identifier == identifier)
    }

    /// Searches `name` as given (a direct or absolute path works unchanged),
    /// then each `-L` search directory in order. There is no AIX filesystem
    /// here — every path this resolves to is a host path.
    fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.is_absolute() || direct.exists() {
            return Ok(direct.to_path_buf());
        }
        for dir in &self.search_paths {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("cannot find '{}' in search path", name),
        )))
    }

    fn identifier_for(path: &Path, member: Option<&str>) -> String {
        match member {
            Some(m) => format!("{}_{}", path.display(), m),
            None => path.display().to_string(),
        }
    }

    fn open_xcoff(path: &Path, member: Option<&str>) -> Result<XcoffImage> {
        match member {
            None => XcoffImage::open(path),
            Some(m) => {
                let archive = Arc::new(BigArchive::open(path)?);
                let member_hdr = archive.find_member(m)?.ok_or_else(|| {
                    Error::Malformed(format!("archive member '{}' not found in {}", m, path.display()))
                })?;
                let range = member_hdr.data_range();
                XcoffImage::from_archive_member(archive, range)
            }
        }
    }

    /// Reads an image's declared `.text`/`.data`/`.bss` extents out of its
    /// auxiliary header and section table. A missing `.bss` section (common
    /// for small objects) is treated as a zero-sized region immediately
    /// following `.data`.
    fn text_data_bss(image: &XcoffImage) -> Result<(u32, u32, u32, u32, u32, u32)> {
        let aux = image
            .aux_header
            .as_ref()
            .ok_or_else(|| Error::Malformed("xcoff object has no auxiliary header".into()))?;

        let text = image
            .sections
            .get(aux.o_sntext.checked_sub(1).ok_or_else(|| Error::Malformed("invalid .text section number".into()))? as usize)
            .ok_or_else(|| Error::Malformed("invalid .text section number".into()))?;
        let data = image
            .sections
            .get(aux.o_sndata.checked_sub(1).ok_or_else(|| Error::Malformed("invalid .data section number".into()))? as usize)
            .ok_or_else(|| Error::Malformed("invalid .data section number".into()))?;

        let (bss_vaddr, bss_size) = if aux.o_snbss != 0 {
            let bss = image
                .sections
                .get(aux.o_snbss as usize - 1)
                .ok_or_else(|| Error::Malformed("invalid .bss section number".into()))?;
            (bss.s_vaddr, bss.s_size)
        } else {
            (data.s_vaddr + data.s_size, 0)
        };

        Ok((text.s_vaddr, text.s_size, data.s_vaddr, data.s_size, bss_vaddr, bss_size))
    }

    /// The recursive entry point: loads `name` (a direct path for the main
    /// executable, a library base name otherwise), laying it out in the
    /// guest address space, relocating it, and resolving every import it
    /// makes along the way. Returns the object's unique identifier; a
    /// second `load()` for an identifier already in the global list is a
    /// no-op that just returns the existing identifier.
    pub fn load(&mut self, name: &str, member: Option<&str>, is_executable: bool) -> Result<String> {
        let path = self.resolve_path(name)?;
        let identifier = Self::identifier_for(&path, member);

        if self.loaded.iter().any(|o| o.identifier == identifier) {
            debug!(target: "loader", "'{}' already loaded, skipping", identifier);
            return Ok(identifier);
        }

        debug!(target: "loader", "loading '{}' (executable={})", identifier, is_executable);
        let mut image = Self::open_xcoff(&path, member)?;
        let (text_vaddr, text_size, data_vaddr, data_size, bss_vaddr, bss_size) = Self::text_data_bss(&image)?;

        let regions = if is_executable {
            self.mm
                .alloc_main_exec_memory(text_vaddr, text_size, data_vaddr, data_size, bss_vaddr, bss_size)?
        } else {
            self.mm
                .alloc_library_memory(text_vaddr, text_size, data_vaddr, data_size, bss_vaddr, bss_size)?
        };

        self.mm.write_text(&image, &regions, is_executable)?;
        self.mm.write_data(&image, &regions, is_executable)?;

        let toc_anchor = image
            .aux_header
            .as_ref()
            .map(|a| a.o_toc.wrapping_add(regions.deltas.data))
            .unwrap_or(0);
        if is_executable {
            self.mm.cpu_mut().write_gpr(2, toc_anchor)?;
        }

        // Export fix-up: every L_EXPORT symbol's stored value becomes a
        // runtime address before anything (including this object's own
        // relocation pass) reads it.
        if let Some(loader) = image.loader.as_mut() {
            for sym in loader.symbols.iter_mut() {
                if sym.is_export() {
                    sym.value = sym.value.wrapping_add(delta_for_section_number(&regions.deltas, sym.section_number as u32));
                }
            }
        }

        let obj = LoadedObject {
            identifier: identifier.clone(),
            image,
            regions,
            toc_anchor,
        };

        // Pushed before relocation runs so a self-referential or cyclic
        // import graph finds this object already in the global list.
        self.loaded.push(obj);
        let idx = self.loaded.len() - 1;
        self.relocate(idx)?;

        Ok(identifier)
    }

    fn relocate(&mut self, idx: usize) -> Result<()> {
        let (deltas, relocations, symbols, import_files) = {
            let obj = &self.loaded[idx];
            let loader = obj.image.loader.as_ref();
            (
                obj.regions.deltas,
                loader.map(|l| l.relocations.clone()).unwrap_or_default(),
                loader.map(|l| l.symbols.clone()).unwrap_or_default(),
                loader.map(|l| l.import_files.clone()).unwrap_or_default(),
            )
        };

        for reloc in &relocations {
            let target_addr = reloc.vaddr.wrapping_add(delta_for_section_number(&deltas, reloc.section_number as u32));

            if reloc.symndx < 3 {
                let delta = delta_for_symndx(&deltas, reloc.symndx);
                let current = self.mm.read_u32(target_addr)?;
                self.mm.write_u32(target_addr, current.wrapping_add(delta))?;
                continue;
            }

            let sym_idx = (reloc.symndx - 3) as usize;
            let sym = symbols
                .get(sym_idx)
                .ok_or_else(|| Error::Malformed(format!("relocation references out-of-range loader symbol {}", sym_idx)))?;

            let value = if sym.is_import() {
                self.resolve(sym, &import_files)?
            } else if sym.is_export() {
                sym.value
            } else {
                continue;
            };
            self.mm.write_u32(target_addr, value)?;
        }
        Ok(())
    }

    /// Resolves one `L_IMPORT` loader symbol to a runtime address: LIBPATH
    /// poison, a `/unix` descriptor or data page, or a name lookup into a
    /// (recursively loaded, if necessary) dependency's exports.
    fn resolve(&mut self, sym: &LoaderSymbol, import_files: &[ImportFile]) -> Result<u32> {
        if sym.import_file_index == 0 {
            warn!(
                target: "loader",
                "symbol '{}' references the LIBPATH import slot, not a module; returning poison address",
                sym.name
            );
            return Ok(LIBPATH_POISON_ADDR);
        }

        let impid = import_files.get(sym.import_file_index as usize).ok_or_else(|| {
            Error::Malformed(format!("import file index {} out of range", sym.import_file_index))
        })?;

        if impid.base == "unix" {
            return self.shim.resolve_unix_import(self.mm, sym, crate::syscalls::handler_lookup);
        }

        let member = if impid.member.is_empty() { None } else { Some(impid.member.as_str()) };
        let identifier = self.load(&impid.base, member, false)?;
        let dep_idx = self
            .loaded
            .iter()
            .position(|o| o.identifier == identifier)
            .expect("just loaded this identifier");

        self.resolve_export(dep_idx, &sym.name)
    }

    /// Looks up `name` among a loaded dependency's exports. A passthrough
    /// (re-exported) symbol is itself `L_IMPORT`; in that case we recurse
    /// into `resolve` rather than returning its (meaningless) stored value.
    fn resolve_export(&mut self, dep_idx: usize, name: &str) -> Result<u32> {
        let found = {
            let obj = &self.loaded[dep_idx];
            obj.image
                .loader
                .as_ref()
                .and_then(|l| l.symbols.iter().find(|s| s.is_export() && s.name == name).cloned())
        };
        let found = found.ok_or_else(|| Error::UnresolvedSymbol(name.to_string()))?;

        if found.is_import() {
            let import_files = self.loaded[dep_idx]
                .image
                .loader
                .as_ref()
                .map(|l| l.import_files.clone())
                .unwrap_or_default();
            self.resolve(&found, &import_files)
        } else {
            Ok(found.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests::FakeCpu;
    use crate::mm::{DATA_START, TEXT_START};
    use crate::xcoff::{AuxHeader, FileHeader, SectionHeader, STYP_BSS, STYP_DATA, STYP_LOADER, STYP_TEXT, L_EXPORT, L_IMPORT, XMC_DS};
    use scroll::Pwrite;
    use std::io::Write;

    fn section(name: &str, vaddr: u32, size: u32, scnptr: u32, flags: u32) -> SectionHeader {
        let mut s_name = [0u8; 8];
        s_name[..name.len()].copy_from_slice(name.as_bytes());
        SectionHeader {
            s_name,
            s_paddr: vaddr,
            s_vaddr: vaddr,
            s_size: size,
            s_scnptr: scnptr,
            s_relptr: 0,
            s_lnnoptr: 0,
            s_nreloc: 0,
            s_nlnno: 0,
            s_flags: flags,
        }
    }

    fn write_loader_symbol(
        buf: &mut Vec<u8>,
        off: usize,
        name: &str,
        value: u32,
        section_number: u16,
        symbol_type: u8,
        storage_class: u8,
        import_file_index: u32,
    ) {
        let mut name_field = [0u8; 8];
        name_field[..name.len()].copy_from_slice(name.as_bytes());
        buf[off..off + 8].copy_from_slice(&name_field);
        buf.pwrite_with(value, off + 8, scroll::BE).unwrap();
        buf.pwrite_with(section_number, off + 12, scroll::BE).unwrap();
        buf[off + 14] = symbol_type;
        buf[off + 15] = storage_class;
        buf.pwrite_with(import_file_index, off + 16, scroll::BE).unwrap();
        buf.pwrite_with(0u32, off + 20, scroll::BE).unwrap();
    }

    /// Builds a minimal library XCOFF object: a tiny `.text`/`.data`/`.bss`
    /// and a loader section exporting one data symbol.
    fn build_library(export_name: &str, export_vaddr: u32) -> Vec<u8> {
        const TEXT_VADDR: u32 = 0x1000_0000;
        const DATA_VADDR: u32 = 0x2000_0000;
        const BSS_VADDR: u32 = 0x2000_0100;

        let file_header = FileHeader {
            f_magic: crate::xcoff::XCOFFF32_MAGIC,
            f_nscns: 4,
            f_timdat: 0,
            f_symptr: 0,
            f_nsyms: 0,
            f_opthdr: crate::xcoff::SIZEOF_AUX_HEADER as u16,
            f_flags: 0,
        };
        let aux = AuxHeader {
            o_sntext: 1,
            o_sndata: 2,
            o_snbss: 3,
            o_toc: DATA_VADDR + 0x50,
            ..Default::default()
        };

        let hdr_size = crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + 4 * crate::xcoff::SIZEOF_SECTION_HEADER;
        let text_data: [u8; 4] = [0, 0, 0, 0];
        let data_data: [u8; 0x100] = [0u8; 0x100];

        let text_scnptr = hdr_size as u32;
        let data_scnptr = text_scnptr + text_data.len() as u32;
        let loader_scnptr = data_scnptr + data_data.len() as u32;

        let text_sec = section(".text", TEXT_VADDR, text_data.len() as u32, text_scnptr, STYP_TEXT);
        let data_sec = section(".data", DATA_VADDR, data_data.len() as u32, data_scnptr, STYP_DATA);
        let bss_sec = section(".bss", BSS_VADDR, 0x10, 0, STYP_BSS);

        let mut buf = vec![0u8; hdr_size];
        buf.pwrite_with(file_header, 0, scroll::BE).unwrap();
        buf.pwrite_with(aux, crate::xcoff::SIZEOF_FILE_HEADER, scroll::BE).unwrap();
        buf.pwrite_with(text_sec, crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER, scroll::BE)
            .unwrap();
        buf.pwrite_with(
            data_sec,
            crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + crate::xcoff::SIZEOF_SECTION_HEADER,
            scroll::BE,
        )
        .unwrap();
        buf.pwrite_with(
            bss_sec,
            crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + 2 * crate::xcoff::SIZEOF_SECTION_HEADER,
            scroll::BE,
        )
        .unwrap();

        buf.extend_from_slice(&text_data);
        buf.extend_from_slice(&data_data);

        // loader section: header(32) + 1 symbol(24) + 0 relocations + import table(0 entries, but still needs a valid strtab region).
        let nsyms = 1u32;
        let loader_header_len = 32usize;
        let symtab_len = nsyms as usize * 24;
        let l_impoff = (loader_header_len + symtab_len) as u32;
        let l_stoff = l_impoff; // empty import table and string table, both zero length, same offset is fine.

        let mut loader = vec![0u8; loader_header_len + symtab_len];
        loader.pwrite_with(1u32, 0, scroll::BE).unwrap(); // l_version
        loader.pwrite_with(nsyms, 4, scroll::BE).unwrap(); // l_nsyms
        loader.pwrite_with(0u32, 8, scroll::BE).unwrap(); // l_nreloc
        loader.pwrite_with(0u32, 12, scroll::BE).unwrap(); // l_istlen
        loader.pwrite_with(0u32, 16, scroll::BE).unwrap(); // l_nimpid
        loader.pwrite_with(l_impoff, 20, scroll::BE).unwrap(); // l_impoff
        loader.pwrite_with(0u32, 24, scroll::BE).unwrap(); // l_stlen
        loader.pwrite_with(l_stoff, 28, scroll::BE).unwrap(); // l_stoff

        write_loader_symbol(&mut loader, loader_header_len, export_name, export_vaddr, 2, L_EXPORT, XMC_DS, 0);

        let mut out = buf;
        let loader_hdr_off = crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + 3 * crate::xcoff::SIZEOF_SECTION_HEADER;
        out.pwrite_with(
            section(".loader", 0, loader.len() as u32, loader_scnptr, STYP_LOADER),
            loader_hdr_off,
            scroll::BE,
        )
        .unwrap();
        out.extend_from_slice(&loader);
        out
    }

    /// Builds a minimal main-executable XCOFF object importing one data
    /// symbol (`import_name`) from import-file index 1, with a single
    /// relocation patching it into `.data` at `reloc_vaddr`.
    fn build_executable(import_name: &str, reloc_vaddr: u32, lib_base: &str) -> Vec<u8> {
        let file_header = FileHeader {
            f_magic: crate::xcoff::XCOFFF32_MAGIC,
            f_nscns: 4,
            f_timdat: 0,
            f_symptr: 0,
            f_nsyms: 0,
            f_opthdr: crate::xcoff::SIZEOF_AUX_HEADER as u16,
            f_flags: 0,
        };
        let aux = AuxHeader {
            o_sntext: 1,
            o_sndata: 2,
            o_snbss: 3,
            o_toc: DATA_START + 0x50,
            ..Default::default()
        };

        let hdr_size = crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + 4 * crate::xcoff::SIZEOF_SECTION_HEADER;
        let text_data: [u8; 4] = [0, 0, 0, 0];
        let data_data: [u8; 0x100] = [0u8; 0x100];

        let text_scnptr = hdr_size as u32;
        let data_scnptr = text_scnptr + text_data.len() as u32;
        let loader_scnptr = data_scnptr + data_data.len() as u32;

        let text_sec = section(".text", TEXT_START, text_data.len() as u32, text_scnptr, STYP_TEXT);
        let data_sec = section(".data", DATA_START, data_data.len() as u32, data_scnptr, STYP_DATA);
        let bss_sec = section(".bss", DATA_START + 0x100, 0x10, 0, STYP_BSS);

        let mut buf = vec![0u8; hdr_size];
        buf.pwrite_with(file_header, 0, scroll::BE).unwrap();
        buf.pwrite_with(aux, crate::xcoff::SIZEOF_FILE_HEADER, scroll::BE).unwrap();
        buf.pwrite_with(text_sec, crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER, scroll::BE)
            .unwrap();
        buf.pwrite_with(
            data_sec,
            crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + crate::xcoff::SIZEOF_SECTION_HEADER,
            scroll::BE,
        )
        .unwrap();
        buf.pwrite_with(
            bss_sec,
            crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + 2 * crate::xcoff::SIZEOF_SECTION_HEADER,
            scroll::BE,
        )
        .unwrap();

        buf.extend_from_slice(&text_data);
        buf.extend_from_slice(&data_data);

        let nsyms = 1u32;
        let loader_header_len = 32usize;
        let symtab_len = nsyms as usize * 24;

        // import file table: two triples (LIBPATH sentinel, then the real dependency),
        // each path/base/member NUL-delimited.
        let mut impid_table = Vec::new();
        impid_table.extend_from_slice(b"\0\0\0"); // LIBPATH: empty path, base, member
        impid_table.extend_from_slice(b"\0"); // path (empty)
        impid_table.extend_from_slice(lib_base.as_bytes());
        impid_table.push(0);
        impid_table.extend_from_slice(b"\0"); // member (empty: direct file, not an archive)

        let reloc_len = 12usize; // one LoaderRelocation entry
        let l_impoff = (loader_header_len + symtab_len + reloc_len) as u32;
        let l_stoff = l_impoff + impid_table.len() as u32;

        let mut loader = vec![0u8; loader_header_len + symtab_len];
        loader.pwrite_with(1u32, 0, scroll::BE).unwrap();
        loader.pwrite_with(nsyms, 4, scroll::BE).unwrap();
        loader.pwrite_with(1u32, 8, scroll::BE).unwrap(); // l_nreloc
        loader.pwrite_with(impid_table.len() as u32, 12, scroll::BE).unwrap(); // l_istlen
        loader.pwrite_with(2u32, 16, scroll::BE).unwrap(); // l_nimpid
        loader.pwrite_with(l_impoff, 20, scroll::BE).unwrap();
        loader.pwrite_with(0u32, 24, scroll::BE).unwrap();
        loader.pwrite_with(l_stoff, 28, scroll::BE).unwrap();

        write_loader_symbol(&mut loader, loader_header_len, import_name, 0, 2, L_IMPORT, XMC_DS, 1);

        // relocation: symndx = 3 (first loader symbol), section_number = 2 (.data).
        let mut reloc = vec![0u8; 12];
        reloc.pwrite_with(reloc_vaddr, 0, scroll::BE).unwrap();
        reloc.pwrite_with(3u32, 4, scroll::BE).unwrap();
        reloc[8] = 4; // rsize
        reloc[9] = 0; // rtype
        reloc.pwrite_with(2u16, 10, scroll::BE).unwrap();

        loader.extend_from_slice(&reloc);
        loader.extend_from_slice(&impid_table);

        let mut out = buf;
        let loader_hdr_off = crate::xcoff::SIZEOF_FILE_HEADER + crate::xcoff::SIZEOF_AUX_HEADER + 3 * crate::xcoff::SIZEOF_SECTION_HEADER;
        out.pwrite_with(
            section(".loader", 0, loader.len() as u32, loader_scnptr, STYP_LOADER),
            loader_hdr_off,
            scroll::BE,
        )
        .unwrap();
        out.extend_from_slice(&loader);
        out
    }

    #[test]
    fn transitive_load_resolves_import_to_library_export() {
        let lib_export_vaddr = 0x2000_0010u32;
        let lib_bytes = build_library("foo", lib_export_vaddr);
        let lib_path = "/tmp/aix_user_test_linker_lib.o";
        let mut f = std::fs::File::create(lib_path).unwrap();
        f.write_all(&lib_bytes).unwrap();
        drop(f);

        let reloc_vaddr = DATA_START + 0x20;
        let exe_bytes = build_executable("foo", reloc_vaddr, "aix_user_test_linker_lib.o");
        let exe_path = "/tmp/aix_user_test_linker_exe.o";
        let mut f = std::fs::File::create(exe_path).unwrap();
        f.write_all(&exe_bytes).unwrap();
        drop(f);

        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        let mut shim = UnixShim::new(0x1, 0x2);
        shim.map_regions(&mut mm).unwrap();
        let mut linker = Linker::new(&mut mm, &mut shim, vec![PathBuf::from("/tmp")]);

        linker.load(exe_path, None, true).unwrap();

        let lib_ident = linker.get("/tmp/aix_user_test_linker_lib.o").expect("library should be loaded");
        let expected = lib_export_vaddr.wrapping_add(lib_ident.regions.deltas.data);

        let patched = mm.read_u32(reloc_vaddr).unwrap();
        assert_eq!(patched, expected);

        std::fs::remove_file(exe_path).ok();
        std::fs::remove_file(lib_path).ok();
    }

    #[test]
    fn libpath_sentinel_returns_poison_without_crashing() {
        let mut mm = MemoryManager::new(FakeCpu::new()).unwrap();
        let mut shim = UnixShim::new(0x1, 0x2);
        shim.map_regions(&mut mm).unwrap();
        let mut linker = Linker::new(&mut mm, &mut shim, vec![]);
        let sym = LoaderSymbol {
            name: "whatever".to_string(),
            value: 0,
            section_number: 0,
            symbol_type: L_IMPORT,
            storage_class: XMC_DS,
            import_file_index: 0,
            param_check: 0,
        };
        let addr = linker.resolve(&sym, &[]).unwrap();
        assert_eq!(addr, LIBPATH_POISON_ADDR);
    }
}
