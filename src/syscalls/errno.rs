//! AIX `errno` constants and the Linux→AIX translation table.
//!
//! AIX's numbering diverges from Linux's past the POSIX-common core (1-34);
//! codes with no AIX equivalent collapse to [`AIX_EINVAL`], exactly as the
//! table this is ported from does.

#![allow(dead_code)]

pub const AIX_EPERM: i32 = 1;
pub const AIX_ENOENT: i32 = 2;
pub const AIX_ESRCH: i32 = 3;
pub const AIX_EINTR: i32 = 4;
pub const AIX_EIO: i32 = 5;
pub const AIX_ENXIO: i32 = 6;
pub const AIX_E2BIG: i32 = 7;
pub const AIX_ENOEXEC: i32 = 8;
pub const AIX_EBADF: i32 = 9;
pub const AIX_ECHILD: i32 = 10;
pub const AIX_EAGAIN: i32 = 11;
pub const AIX_EWOULDBLOCK: i32 = AIX_EAGAIN;
pub const AIX_ENOMEM: i32 = 12;
pub const AIX_EACCES: i32 = 13;
pub const AIX_EFAULT: i32 = 14;
pub const AIX_ENOTBLK: i32 = 15;
pub const AIX_EBUSY: i32 = 16;
pub const AIX_EEXIST: i32 = 17;
pub const AIX_EXDEV: i32 = 18;
pub const AIX_ENODEV: i32 = 19;
pub const AIX_ENOTDIR: i32 = 20;
pub const AIX_EISDIR: i32 = 21;
pub const AIX_EINVAL: i32 = 22;
pub const AIX_ENFILE: i32 = 23;
pub const AIX_EMFILE: i32 = 24;
pub const AIX_ENOTTY: i32 = 25;
pub const AIX_ETXTBSY: i32 = 26;
pub const AIX_EFBIG: i32 = 27;
pub const AIX_ENOSPC: i32 = 28;
pub const AIX_ESPIPE: i32 = 29;
pub const AIX_EROFS: i32 = 30;
pub const AIX_EMLINK: i32 = 31;
pub const AIX_EPIPE: i32 = 32;
pub const AIX_EDOM: i32 = 33;
pub const AIX_ERANGE: i32 = 34;
pub const AIX_EDEADLK: i32 = 35;
pub const AIX_ENAMETOOLONG: i32 = 36;
pub const AIX_ENOLCK: i32 = 37;
pub const AIX_ENOSYS: i32 = 38;
pub const AIX_ENOTEMPTY: i32 = 39;
pub const AIX_ELOOP: i32 = 40;
pub const AIX_ENOMSG: i32 = 41;
pub const AIX_EIDRM: i32 = 42;
pub const AIX_ECHRNG: i32 = 43;
pub const AIX_EL2NSYNC: i32 = 44;
pub const AIX_EL3HLT: i32 = 45;
pub const AIX_EL3RST: i32 = 46;
pub const AIX_ELNRNG: i32 = 47;
pub const AIX_EUNATCH: i32 = 48;
pub const AIX_ENOCSI: i32 = 49;
pub const AIX_EL2HLT: i32 = 50;
pub const AIX_ENOSTR: i32 = 51;
pub const AIX_ENODATA: i32 = 52;
pub const AIX_ETIME: i32 = 53;
pub const AIX_ENOSR: i32 = 54;
pub const AIX_EREMOTE: i32 = 55;
pub const AIX_ENOLINK: i32 = 56;
pub const AIX_EPROTO: i32 = 57;
pub const AIX_EMULTIHOP: i32 = 58;
pub const AIX_EBADMSG: i32 = 59;
pub const AIX_EOVERFLOW: i32 = 60;
pub const AIX_EILSEQ: i32 = 61;
pub const AIX_ERESTART: i32 = 62;
pub const AIX_EUSERS: i32 = 63;
pub const AIX_ENOTSOCK: i32 = 64;
pub const AIX_EDESTADDRREQ: i32 = 65;
pub const AIX_EMSGSIZE: i32 = 66;
pub const AIX_EPROTOTYPE: i32 = 67;
pub const AIX_ENOPROTOOPT: i32 = 68;
pub const AIX_EPROTONOSUPPORT: i32 = 69;
pub const AIX_ESOCKTNOSUPPORT: i32 = 70;
pub const AIX_ENOTSUP: i32 = 71;
pub const AIX_EOPNOTSUPP: i32 = 72;
pub const AIX_EPFNOSUPPORT: i32 = 73;
pub const AIX_EAFNOSUPPORT: i32 = 74;
pub const AIX_EADDRINUSE: i32 = 75;
pub const AIX_EADDRNOTAVAIL: i32 = 76;
pub const AIX_ENETDOWN: i32 = 77;
pub const AIX_ENETUNREACH: i32 = 78;
pub const AIX_ENETRESET: i32 = 79;
pub const AIX_ECONNABORTED: i32 = 80;
pub const AIX_ECONNRESET: i32 = 81;
pub const AIX_ENOBUFS: i32 = 82;
pub const AIX_EISCONN: i32 = 83;
pub const AIX_ENOTCONN: i32 = 84;
pub const AIX_ESHUTDOWN: i32 = 85;
pub const AIX_ETOOMANYREFS: i32 = 86;
pub const AIX_ETIMEDOUT: i32 = 87;
pub const AIX_ECONNREFUSED: i32 = 88;
pub const AIX_EHOSTDOWN: i32 = 89;
pub const AIX_EHOSTUNREACH: i32 = 90;
pub const AIX_EALREADY: i32 = 91;
pub const AIX_EINPROGRESS: i32 = 92;
pub const AIX_ESTALE: i32 = 93;
pub const AIX_EDQUOT: i32 = 94;
pub const AIX_ECANCELED: i32 = 95;
pub const AIX_EOWNERDEAD: i32 = 96;
pub const AIX_ENOTRECOVERABLE: i32 = 97;
/// Not a real AIX errno; used for "not ready" device errors some handlers
/// produce that have no Linux-side source (hence no entry in the table below).
pub const AIX_ENOTREADY: i32 = 98;

/// Translates a host (Linux) `errno` value into its AIX equivalent, per the
/// table this emulator's syscall handlers are ported from. Anything with no
/// AIX counterpart collapses to [`AIX_EINVAL`].
pub fn linux_to_aix(lnx_errno: i32) -> i32 {
    use libc_errno_names::*;
    match lnx_errno {
        EPERM => AIX_EPERM,
        ENOENT => AIX_ENOENT,
        ESRCH => AIX_ESRCH,
        EINTR => AIX_EINTR,
        EIO => AIX_EIO,
        ENXIO => AIX_ENXIO,
        E2BIG => AIX_E2BIG,
        ENOEXEC => AIX_ENOEXEC,
        EBADF => AIX_EBADF,
        ECHILD => AIX_ECHILD,
        EAGAIN => AIX_EAGAIN,
        ENOMEM => AIX_ENOMEM,
        EACCES => AIX_EACCES,
        EFAULT => AIX_EFAULT,
        ENOTBLK => AIX_ENOTBLK,
        EBUSY => AIX_EBUSY,
        EEXIST => AIX_EEXIST,
        EXDEV => AIX_EXDEV,
        ENODEV => AIX_ENODEV,
        ENOTDIR => AIX_ENOTDIR,
        EISDIR => AIX_EISDIR,
        EINVAL => AIX_EINVAL,
        ENFILE => AIX_ENFILE,
        EMFILE => AIX_EMFILE,
        ENOTTY => AIX_ENOTTY,
        ETXTBSY => AIX_ETXTBSY,
        EFBIG => AIX_EFBIG,
        ENOSPC => AIX_ENOSPC,
        ESPIPE => AIX_ESPIPE,
        EROFS => AIX_EROFS,
        EMLINK => AIX_EMLINK,
        EPIPE => AIX_EPIPE,
        EDOM => AIX_EDOM,
        ERANGE => AIX_ERANGE,
        EDEADLK => AIX_EDEADLK,
        ENAMETOOLONG => AIX_ENAMETOOLONG,
        ENOLCK => AIX_ENOLCK,
        ENOSYS => AIX_ENOSYS,
        ENOTEMPTY => AIX_ENOTEMPTY,
        ELOOP => AIX_ELOOP,
        ENOMSG => AIX_ENOMSG,
        EIDRM => AIX_EIDRM,
        ECHRNG => AIX_ECHRNG,
        EL2NSYNC => AIX_EL2NSYNC,
        EL3HLT => AIX_EL3HLT,
        EL3RST => AIX_EL3RST,
        ELNRNG => AIX_ELNRNG,
        EUNATCH => AIX_EUNATCH,
        ENOCSI => AIX_ENOCSI,
        EL2HLT => AIX_EL2HLT,
        ENOSTR => AIX_ENOSTR,
        ENODATA => AIX_ENODATA,
        ETIME => AIX_ETIME,
        ENOSR => AIX_ENOSR,
        EREMOTE => AIX_EREMOTE,
        ENOLINK => AIX_ENOLINK,
        EPROTO => AIX_EPROTO,
        EMULTIHOP => AIX_EMULTIHOP,
        EBADMSG => AIX_EBADMSG,
        EOVERFLOW => AIX_EOVERFLOW,
        EILSEQ => AIX_EILSEQ,
        ERESTART => AIX_ERESTART,
        EUSERS => AIX_EUSERS,
        ENOTSOCK => AIX_ENOTSOCK,
        EDESTADDRREQ => AIX_EDESTADDRREQ,
        EMSGSIZE => AIX_EMSGSIZE,
        EPROTOTYPE => AIX_EPROTOTYPE,
        ENOPROTOOPT => AIX_ENOPROTOOPT,
        EPROTONOSUPPORT => AIX_EPROTONOSUPPORT,
        ESOCKTNOSUPPORT => AIX_ESOCKTNOSUPPORT,
        ENOTSUP => AIX_ENOTSUP,
        EOPNOTSUPP => AIX_EOPNOTSUPP,
        EPFNOSUPPORT => AIX_EPFNOSUPPORT,
        EAFNOSUPPORT => AIX_EAFNOSUPPORT,
        EADDRINUSE => AIX_EADDRINUSE,
        EADDRNOTAVAIL => AIX_EADDRNOTAVAIL,
        ENETDOWN => AIX_ENETDOWN,
        ENETUNREACH => AIX_ENETUNREACH,
        ENETRESET => AIX_ENETRESET,
        ECONNABORTED => AIX_ECONNABORTED,
        ECONNRESET => AIX_ECONNRESET,
        ENOBUFS => AIX_ENOBUFS,
        EISCONN => AIX_EISCONN,
        ENOTCONN => AIX_ENOTCONN,
        ESHUTDOWN => AIX_ESHUTDOWN,
        ETOOMANYREFS => AIX_ETOOMANYREFS,
        ETIMEDOUT => AIX_ETIMEDOUT,
        ECONNREFUSED => AIX_ECONNREFUSED,
        EHOSTDOWN => AIX_EHOSTDOWN,
        EHOSTUNREACH => AIX_EHOSTUNREACH,
        EALREADY => AIX_EALREADY,
        EINPROGRESS => AIX_EINPROGRESS,
        ESTALE => AIX_ESTALE,
        EDQUOT => AIX_EDQUOT,
        ECANCELED => AIX_ECANCELED,
        EOWNERDEAD => AIX_EOWNERDEAD,
        ENOTRECOVERABLE => AIX_ENOTRECOVERABLE,
        _ => AIX_EINVAL,
    }
}

/// The subset of glibc's `errno.h` values this table needs, named so the
/// match arms above read the same as the table it's ported from.
mod libc_errno_names {
    pub const EPERM: i32 = libc::EPERM;
    pub const ENOENT: i32 = libc::ENOENT;
    pub const ESRCH: i32 = libc::ESRCH;
    pub const EINTR: i32 = libc::EINTR;
    pub const EIO: i32 = libc::EIO;
    pub const ENXIO: i32 = libc::ENXIO;
    pub const E2BIG: i32 = libc::E2BIG;
    pub const ENOEXEC: i32 = libc::ENOEXEC;
    pub const EBADF: i32 = libc::EBADF;
    pub const ECHILD: i32 = libc::ECHILD;
    pub const EAGAIN: i32 = libc::EAGAIN;
    pub const ENOMEM: i32 = libc::ENOMEM;
    pub const EACCES: i32 = libc::EACCES;
    pub const EFAULT: i32 = libc::EFAULT;
    pub const ENOTBLK: i32 = libc::ENOTBLK;
    pub const EBUSY: i32 = libc::EBUSY;
    pub const EEXIST: i32 = libc::EEXIST;
    pub const EXDEV: i32 = libc::EXDEV;
    pub const ENODEV: i32 = libc::ENODEV;
    pub const ENOTDIR: i32 = libc::ENOTDIR;
    pub const EISDIR: i32 = libc::EISDIR;
    pub const EINVAL: i32 = libc::EINVAL;
    pub const ENFILE: i32 = libc::ENFILE;
    pub const EMFILE: i32 = libc::EMFILE;
    pub const ENOTTY: i32 = libc::ENOTTY;
    pub const ETXTBSY: i32 = libc::ETXTBSY;
    pub const EFBIG: i32 = libc::EFBIG;
    pub const ENOSPC: i32 = libc::ENOSPC;
    pub const ESPIPE: i32 = libc::ESPIPE;
    pub const EROFS: i32 = libc::EROFS;
    pub const EMLINK: i32 = libc::EMLINK;
    pub const EPIPE: i32 = libc::EPIPE;
    pub const EDOM: i32 = libc::EDOM;
    pub const ERANGE: i32 = libc::ERANGE;
    pub const EDEADLK: i32 = libc::EDEADLK;
    pub const ENAMETOOLONG: i32 = libc::ENAMETOOLONG;
    pub const ENOLCK: i32 = libc::ENOLCK;
    pub const ENOSYS: i32 = libc::ENOSYS;
    pub const ENOTEMPTY: i32 = libc::ENOTEMPTY;
    pub const ELOOP: i32 = libc::ELOOP;
    pub const ENOMSG: i32 = libc::ENOMSG;
    pub const EIDRM: i32 = libc::EIDRM;
    pub const ECHRNG: i32 = libc::ECHRNG;
    pub const EL2NSYNC: i32 = libc::EL2NSYNC;
    pub const EL3HLT: i32 = libc::EL3HLT;
    pub const EL3RST: i32 = libc::EL3RST;
    pub const ELNRNG: i32 = libc::ELNRNG;
    pub const EUNATCH: i32 = libc::EUNATCH;
    pub const ENOCSI: i32 = libc::ENOCSI;
    pub const EL2HLT: i32 = libc::EL2HLT;
    pub const ENOSTR: i32 = libc::ENOSTR;
    pub const ENODATA: i32 = libc::ENODATA;
    pub const ETIME: i32 = libc::ETIME;
    pub const ENOSR: i32 = libc::ENOSR;
    pub const EREMOTE: i32 = libc::EREMOTE;
    pub const ENOLINK: i32 = libc::ENOLINK;
    pub const EPROTO: i32 = libc::EPROTO;
    pub const EMULTIHOP: i32 = libc::EMULTIHOP;
    pub const EBADMSG: i32 = libc::EBADMSG;
    pub const EOVERFLOW: i32 = libc::EOVERFLOW;
    pub const EILSEQ: i32 = libc::EILSEQ;
    pub const ERESTART: i32 = libc::ERESTART;
    pub const EUSERS: i32 = libc::EUSERS;
    pub const ENOTSOCK: i32 = libc::ENOTSOCK;
    pub const EDESTADDRREQ: i32 = libc::EDESTADDRREQ;
    pub const EMSGSIZE: i32 = libc::EMSGSIZE;
    pub const EPROTOTYPE: i32 = libc::EPROTOTYPE;
    pub const ENOPROTOOPT: i32 = libc::ENOPROTOOPT;
    pub const EPROTONOSUPPORT: i32 = libc::EPROTONOSUPPORT;
    pub const ESOCKTNOSUPPORT: i32 = libc::ESOCKTNOSUPPORT;
    pub const ENOTSUP: i32 = libc::ENOTSUP;
    pub const EOPNOTSUPP: i32 = libc::EOPNOTSUPP;
    pub const EPFNOSUPPORT: i32 = libc::EPFNOSUPPORT;
    pub const EAFNOSUPPORT: i32 = libc::EAFNOSUPPORT;
    pub const EADDRINUSE: i32 = libc::EADDRINUSE;
    pub const EADDRNOTAVAIL: i32 = libc::EADDRNOTAVAIL;
    pub const ENETDOWN: i32 = libc::ENETDOWN;
    pub const ENETUNREACH: i32 = libc::ENETUNREACH;
    pub const ENETRESET: i32 = libc::ENETRESET;
    pub const ECONNABORTED: i32 = libc::ECONNABORTED;
    pub const ECONNRESET: i32 = libc::ECONNRESET;
    pub const ENOBUFS: i32 = libc::ENOBUFS;
    pub const EISCONN: i32 = libc::EISCONN;
    pub const ENOTCONN: i32 = libc::ENOTCONN;
    pub const ESHUTDOWN: i32 = libc::ESHUTDOWN;
    pub const ETOOMANYREFS: i32 = libc::ETOOMANYREFS;
    pub const ETIMEDOUT: i32 = libc::ETIMEDOUT;
    pub const ECONNREFUSED: i32 = libc::ECONNREFUSED;
    pub const EHOSTDOWN: i32 = libc::EHOSTDOWN;
    pub const EHOSTUNREACH: i32 = libc::EHOSTUNREACH;
    pub const EALREADY: i32 = libc::EALREADY;
    pub const EINPROGRESS: i32 = libc::EINPROGRESS;
    pub const ESTALE: i32 = libc::ESTALE;
    pub const EDQUOT: i32 = libc::EDQUOT;
    pub const ECANCELED: i32 = libc::ECANCELED;
    pub const EOWNERDEAD: i32 = libc::EOWNERDEAD;
    pub const ENOTRECOVERABLE: i32 = libc::ENOTRECOVERABLE;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_errno() {
        assert_eq!(linux_to_aix(libc::ENOENT), AIX_ENOENT);
        assert_eq!(linux_to_aix(libc::EACCES), AIX_EACCES);
    }

    #[test]
    fn unmapped_errno_collapses_to_einval() {
        assert_eq!(linux_to_aix(libc::EHWPOISON), AIX_EINVAL);
        assert_eq!(linux_to_aix(libc::ENOKEY), AIX_EINVAL);
    }

    #[test]
    fn unknown_value_collapses_to_einval() {
        assert_eq!(linux_to_aix(99999), AIX_EINVAL);
    }
}
