//! Section flags, loader symbol type bits, and storage classes used by the XCOFF32 format.

/// Executable text (code).
pub const STYP_TEXT: u32 = 0x0020;
/// Initialized data, including the TOC.
pub const STYP_DATA: u32 = 0x0040;
/// Uninitialized data.
pub const STYP_BSS: u32 = 0x0080;
/// Exception section.
pub const STYP_EXCEPT: u32 = 0x0100;
/// Comment section.
pub const STYP_INFO: u32 = 0x0200;
/// Initialized thread-local data.
pub const STYP_TDATA: u32 = 0x0400;
/// Uninitialized thread-local data.
pub const STYP_TBSS: u32 = 0x0800;
/// Loader section.
pub const STYP_LOADER: u32 = 0x1000;

/// Loader symbol is weakly bound.
pub const L_WEAK: u8 = 0x08;
/// Loader symbol is exported.
pub const L_EXPORT: u8 = 0x10;
/// Loader symbol is the module's entry point.
pub const L_ENTRY: u8 = 0x20;
/// Loader symbol is imported.
pub const L_IMPORT: u8 = 0x40;

/// Storage mapping classes (`l_smclass`/`x_smclass`), per the XCOFF csect
/// auxiliary entry table. Only the classes `/unix` import resolution cares
/// about are named here.
pub const XMC_PR: u8 = 0x00; // Program code
pub const XMC_RO: u8 = 0x01; // Read-only constant
pub const XMC_TC: u8 = 0x03; // TOC entry
pub const XMC_UA: u8 = 0x04; // Unclassified
pub const XMC_RW: u8 = 0x05; // Read-write data
pub const XMC_SV: u8 = 0x08; // 32-bit supervisor-call descriptor
pub const XMC_DS: u8 = 0x0A; // Descriptor csect
pub const XMC_SV3264: u8 = 0x12; // Supervisor-call descriptor, 32/64-bit

/// Storage classes treated as "this is a function descriptor" by `/unix`
/// import resolution — i.e. a function, whether or not the linker happened
/// to also mark it as a syscall trampoline.
pub fn is_function_storage_class(smclass: u8) -> bool {
    matches!(smclass, XMC_DS | XMC_SV | XMC_SV3264)
}

/// Storage classes treated as plain, unclassified read-write data.
pub fn is_data_storage_class(smclass: u8) -> bool {
    matches!(smclass, XMC_UA | XMC_RW)
}
