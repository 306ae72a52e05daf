//! Error number definitions.
//!
//! The subset of `<errno.h>` values the RPC database reports through its
//! reentrant interfaces. Values match Linux.

/// No such file or directory (also: end of `getrpcent_r` iteration).
pub const ENOENT: i32 = 2;
/// Input/output error.
pub const EIO: i32 = 5;
/// Invalid argument.
pub const EINVAL: i32 = 22;
/// Result too large (caller buffer too small).
pub const ERANGE: i32 = 34;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_linux() {
        assert_eq!(ENOENT, 2);
        assert_eq!(EIO, 5);
        assert_eq!(EINVAL, 22);
        assert_eq!(ERANGE, 34);
    }
}
