//! Fixed-width values that can be read and written in little-endian order.

/// A fixed-width value with a little-endian byte representation.
pub trait Primitive: Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decodes a value from the first [`Self::SIZE`] bytes of `bytes`.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Encodes the value into the first [`Self::SIZE`] bytes of `out`.
    fn put_le_slice(self, out: &mut [u8]);
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }

                fn put_le_slice(self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Fixed-size vectors (`[f32; 3]`, `[u16; 4]`, ...) are laid out element by element.
impl<T: Primitive, const N: usize> Primitive for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn from_le_slice(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::from_le_slice(&bytes[i * T::SIZE..]))
    }

    fn put_le_slice(self, out: &mut [u8]) {
        for (i, value) in self.into_iter().enumerate() {
            value.put_le_slice(&mut out[i * T::SIZE..]);
        }
    }
}

/// An enum stored on disk as a fixed-width integer.
pub trait IntEnum: Sized + Copy {
    /// The on-disk integer type.
    type Repr: Primitive;

    /// Maps a raw value to a variant, or `None` if no variant matches.
    fn from_repr(raw: Self::Repr) -> Option<Self>;

    /// Returns the raw value of this variant.
    fn to_repr(self) -> Self::Repr;
}
