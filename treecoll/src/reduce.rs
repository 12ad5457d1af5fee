//! Typed elements, their little-endian wire form, and element-wise
//! reduction used by the tree collectives.

use crate::error::{CollError, Result};
use crate::types::{DataType, ReduceOp};

mod private {
    pub trait Sealed {}
}

/// A fixed-width numeric element that collectives can move and combine.
///
/// Sealed: implemented for `i8, i32, i64, u8, u32, u64, f32, f64`.
pub trait Element: private::Sealed + Copy + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    const DTYPE: DataType;

    /// Fill value for freshly allocated receive buffers.
    const ZERO: Self;

    /// Apply `op` to a pair of elements. Integer sum and product wrap.
    fn combine(a: Self, b: Self, op: ReduceOp) -> Self;

    /// Decode from exactly `DTYPE.size_in_bytes()` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode into exactly `DTYPE.size_in_bytes()` bytes.
    fn write_le(self, bytes: &mut [u8]);
}

macro_rules! impl_element {
    (int: $($ty:ty => $dt:ident),*) => {
        $(
            impl private::Sealed for $ty {}
            impl Element for $ty {
                const DTYPE: DataType = DataType::$dt;
                const ZERO: Self = 0;

                #[inline]
                fn combine(a: Self, b: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Sum => a.wrapping_add(b),
                        ReduceOp::Prod => a.wrapping_mul(b),
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    }
                }

                impl_element!(@le $ty);
            }
        )*
    };
    (float: $($ty:ty => $dt:ident),*) => {
        $(
            impl private::Sealed for $ty {}
            impl Element for $ty {
                const DTYPE: DataType = DataType::$dt;
                const ZERO: Self = 0.0;

                #[inline]
                fn combine(a: Self, b: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Sum => a + b,
                        ReduceOp::Prod => a * b,
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    }
                }

                impl_element!(@le $ty);
            }
        )*
    };
    (@le $ty:ty) => {
        #[inline]
        fn read_le(bytes: &[u8]) -> Self {
            let mut raw = [0u8; std::mem::size_of::<$ty>()];
            raw.copy_from_slice(bytes);
            <$ty>::from_le_bytes(raw)
        }

        #[inline]
        fn write_le(self, bytes: &mut [u8]) {
            bytes.copy_from_slice(&self.to_le_bytes());
        }
    };
}

impl_element!(int: i8 => I8, i32 => I32, i64 => I64, u8 => U8, u32 => U32, u64 => U64);
impl_element!(float: f32 => F32, f64 => F64);

/// Serialize a typed slice into its wire bytes.
pub(crate) fn encode<T: Element>(data: &[T]) -> Vec<u8> {
    let size = T::DTYPE.size_in_bytes();
    let mut out = vec![0u8; data.len() * size];
    for (value, chunk) in data.iter().zip(out.chunks_exact_mut(size)) {
        value.write_le(chunk);
    }
    out
}

/// Overwrite `dst` with the elements in `bytes`, which must hold exactly
/// `dst.len()` of them.
pub(crate) fn decode_into<T: Element>(dst: &mut [T], bytes: &[u8]) -> Result<()> {
    let size = T::DTYPE.size_in_bytes();
    check_len(dst.len() * size, bytes.len())?;
    for (slot, chunk) in dst.iter_mut().zip(bytes.chunks_exact(size)) {
        *slot = T::read_le(chunk);
    }
    Ok(())
}

/// Decode a whole payload.
pub(crate) fn decode<T: Element>(bytes: &[u8]) -> Result<Vec<T>> {
    let size = T::DTYPE.size_in_bytes();
    if bytes.len() % size != 0 {
        return Err(CollError::BufferSizeMismatch {
            expected: bytes.len() / size * size,
            actual: bytes.len(),
        });
    }
    Ok(bytes.chunks_exact(size).map(T::read_le).collect())
}

/// Element-wise `dst[i] = op(dst[i], src[i])`.
pub fn combine_into<T: Element>(dst: &mut [T], src: &[T], op: ReduceOp) -> Result<()> {
    let size = T::DTYPE.size_in_bytes();
    check_len(dst.len() * size, src.len() * size)?;
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = T::combine(*d, s, op);
    }
    Ok(())
}

/// Element-wise combine straight from a received payload.
pub(crate) fn combine_bytes_into<T: Element>(
    dst: &mut [T],
    src: &[u8],
    op: ReduceOp,
) -> Result<()> {
    let size = T::DTYPE.size_in_bytes();
    check_len(dst.len() * size, src.len())?;
    for (d, chunk) in dst.iter_mut().zip(src.chunks_exact(size)) {
        *d = T::combine(*d, T::read_le(chunk), op);
    }
    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CollError::BufferSizeMismatch { expected, actual })
    }
}
