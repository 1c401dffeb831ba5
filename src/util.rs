//! Helpers shared across the codec.

#[inline(always)]
#[cold]
fn cold_path() {}

/// "Annotation" to hint that a branch of an if-statement is likely to occur.
#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if b {
        true
    } else {
        cold_path();
        false
    }
}

/// "Annotation" to hint that a branch of an if-statement is _not likely_ to occur.
#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold_path();
        true
    } else {
        false
    }
}

/// Infallible widening conversions that `From` does not provide because they
/// depend on the target's pointer width.
pub(crate) trait CastFrom<T> {
    fn cast_from(from: T) -> Self;
}

#[allow(clippy::as_conversions)]
impl CastFrom<u32> for usize {
    #[inline(always)]
    fn cast_from(from: u32) -> Self {
        static_assertions::const_assert!(usize::BITS >= 32);
        from as usize
    }
}

#[allow(clippy::as_conversions)]
impl CastFrom<usize> for u64 {
    #[inline(always)]
    fn cast_from(from: usize) -> Self {
        static_assertions::const_assert!(usize::BITS <= 64);
        from as u64
    }
}

#[allow(clippy::as_conversions)]
impl CastFrom<u8> for usize {
    #[inline(always)]
    fn cast_from(from: u8) -> Self {
        from as usize
    }
}
