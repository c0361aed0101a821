//! A byte-offset based string table.
//! Used by XCOFF's loader section and Big-AR's extended name table.

use crate::error;
use core::fmt;
use core::ops::Index;
use core::slice;
use core::str;
use scroll::{ctx, Pread};

/// A string table indexed by byte offsets (not member index), delimited by
/// `delim` rather than requiring a fixed record size. Constructed using
/// [`parse`](Strtab::parse) with your choice of delimiter.
pub struct Strtab<'a> {
    bytes: &'a [u8],
    delim: ctx::StrCtx,
}

#[inline(always)]
fn get_str(idx: usize, bytes: &[u8], delim: ctx::StrCtx) -> &str {
    bytes.pread_with::<&str>(idx, delim).unwrap_or("")
}

impl<'a> Strtab<'a> {
    pub fn new(bytes: &'a [u8], delim: u8) -> Self {
        Strtab {
            delim: ctx::StrCtx::from(delim),
            bytes,
        }
    }

    /// # Safety
    /// `bytes_ptr` must be valid for reads of `size` bytes for the lifetime `'a`.
    pub unsafe fn from_raw(bytes_ptr: *const u8, size: usize, delim: u8) -> Strtab<'a> {
        Strtab {
            delim: ctx::StrCtx::from(delim),
            bytes: slice::from_raw_parts(bytes_ptr, size),
        }
    }

    pub fn parse(bytes: &'a [u8], offset: usize, len: usize, delim: u8) -> error::Result<Strtab<'a>> {
        let bytes: &'a [u8] = bytes.pread_with(offset, ctx::StrCtx::Length(len))?;
        Ok(Strtab {
            bytes,
            delim: ctx::StrCtx::from(delim),
        })
    }

    pub fn to_vec(&self) -> Vec<String> {
        let len = self.bytes.len();
        let mut strings = Vec::new();
        let mut i = 0;
        while i < len {
            let string = self.get(i);
            i += string.len() + 1;
            strings.push(string.to_string());
        }
        strings
    }

    pub fn get(&self, idx: usize) -> &'a str {
        get_str(idx, self.bytes, self.delim)
    }
}

impl<'a> fmt::Debug for Strtab<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "delim: {:?} {:?}", self.delim, str::from_utf8(self.bytes))
    }
}

impl<'a> Default for Strtab<'a> {
    fn default() -> Strtab<'a> {
        Strtab {
            bytes: &[],
            delim: ctx::StrCtx::default(),
        }
    }
}

impl<'a> Index<usize> for Strtab<'a> {
    type Output = str;

    fn index(&self, idx: usize) -> &Self::Output {
        get_str(idx, self.bytes, self.delim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_vec_no_final_null() {
        let bytes = b"\0printf\0memmove\0busta";
        let strtab = unsafe { Strtab::from_raw(bytes.as_ptr(), bytes.len(), 0x0) };
        let vec = strtab.to_vec();
        assert_eq!(vec, vec!["", "printf", "memmove", "busta"]);
    }

    #[test]
    fn as_vec_no_first_null_no_final_null() {
        let bytes = b"printf\0memmove\0busta";
        let strtab = unsafe { Strtab::from_raw(bytes.as_ptr(), bytes.len(), 0x0) };
        let vec = strtab.to_vec();
        assert_eq!(vec, vec!["printf", "memmove", "busta"]);
    }

    #[test]
    fn indexes_by_offset() {
        let bytes = b"\0printf\0memmove";
        let strtab = Strtab::new(bytes, 0);
        assert_eq!(&strtab[1], "printf");
        assert_eq!(&strtab[8], "memmove");
    }
}
