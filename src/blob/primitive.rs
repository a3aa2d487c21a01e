//! Fixed-width primitives and the alignment rule shared by every pass.

use std::fmt;
use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width value that can be packed into a blob.
///
/// Every implementor aligns to its own size, so the padding computed by the
/// size calculator, the writer and the reader always agrees.
pub trait Primitive: Copy + Default + PartialEq + fmt::Debug + sealed::Sealed + 'static {
    /// Encoded width in bytes, also the alignment.
    const SIZE: usize;

    /// Writes the little-endian encoding into `out[..Self::SIZE]`.
    fn write_le(self, out: &mut [u8]);

    /// Reads a value from `bytes[..Self::SIZE]`.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),*) => {$(
        impl sealed::Sealed for $ty {}

        impl Primitive for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn write_le(self, out: &mut [u8]) {
                out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..Self::SIZE]);
                <$ty>::from_le_bytes(raw)
            }
        }
    )*};
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl sealed::Sealed for bool {}

impl Primitive for bool {
    const SIZE: usize = 1;

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Rounds `offset` up to a multiple of `align` (a power of two).
#[inline]
pub const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

/// Rounds `offset` up to the natural alignment of `T`.
#[inline]
pub fn align_for<T: Primitive>(offset: usize) -> usize {
    align_up(offset, T::SIZE)
}

/// A borrowed run of packed little-endian values.
///
/// Elements are decoded on access, so the view is valid over any byte
/// slice regardless of its address alignment.
#[derive(Clone, Copy)]
pub struct PackedSlice<'a, T: Primitive> {
    bytes: &'a [u8],
    _marker: PhantomData<T>,
}

impl<'a, T: Primitive> PackedSlice<'a, T> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len() % T::SIZE, 0);
        Self {
            bytes,
            _marker: PhantomData,
        }
    }

    /// An empty view.
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(T::SIZE)?;
        let chunk = self.bytes.get(start..start + T::SIZE)?;
        Some(T::read_le(chunk))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + 'a {
        self.bytes.chunks_exact(T::SIZE).map(T::read_le)
    }

    /// The packed bytes backing this view.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Primitive> fmt::Debug for PackedSlice<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Primitive> PartialEq for PackedSlice<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}
