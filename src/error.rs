//! Crate-wide error type.

use core::fmt;
use core::result;

/// Everything that can go wrong while loading, linking, or running a guest.
#[derive(Debug)]
pub enum Error {
    /// A host I/O operation failed (opening a file, mapping it, a passthrough syscall, ...).
    Io(std::io::Error),
    /// A `scroll` read/write failed, usually because an offset ran past the end of a buffer.
    Scroll(scroll::Error),
    /// The magic number at the head of a container didn't match what we expect.
    BadMagic(u64),
    /// The container is well-formed up to a point but violates an invariant we rely on.
    Malformed(String),
    /// A section table claimed more sections than the fixed cap this loader enforces.
    TooManySections { found: u16, cap: u16 },
    /// A symbol reference (import, export, relocation target) couldn't be resolved.
    UnresolvedSymbol(String),
    /// The guest used a feature this emulator doesn't implement.
    Unsupported(String),
    /// The CPU backend reported a fault or an unhandled trap.
    Cpu(String),
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {}", err),
            Error::Scroll(err) => write!(f, "parse error: {}", err),
            Error::BadMagic(magic) => write!(f, "invalid magic number: {:#x}", magic),
            Error::Malformed(msg) => write!(f, "malformed object: {}", msg),
            Error::TooManySections { found, cap } => {
                write!(f, "section table claims {} sections, exceeding the cap of {}", found, cap)
            }
            Error::UnresolvedSymbol(name) => write!(f, "unresolved symbol: {}", name),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            Error::Cpu(msg) => write!(f, "cpu fault: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Scroll(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Self {
        Error::Scroll(err)
    }
}
