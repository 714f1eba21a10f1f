//! Field-level little-endian encoding for persistable tuple types.

use std::io::{self, Read, Write};

/// A tuple type with a fixed little-endian wire encoding.
///
/// Records are written field by field in declaration order: integers and
/// float bit patterns little-endian, booleans as a single `0`/`1` byte,
/// nested tuples and arrays recursing. Implementing this trait is what
/// makes a type persistable; types holding pointers or other
/// non-recursable fields simply have no implementation, so the
/// persistence entry points refuse them at compile time.
///
/// Enums with an integer tag implement the trait by encoding that tag,
/// the same as the underlying integer.
pub trait Storable: Sized {
    /// Write this value's encoding.
    fn store<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()>;

    /// Read one value. Malformed field bytes surface as
    /// [`io::ErrorKind::InvalidData`].
    fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self>;
}

macro_rules! storable_le_bytes {
    ($($ty:ty),+ $(,)?) => {$(
        impl Storable for $ty {
            fn store<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
                writer.write_all(&self.to_le_bytes())
            }

            fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                reader.read_exact(&mut bytes)?;
                Ok(<$ty>::from_le_bytes(bytes))
            }
        }
    )+};
}

storable_le_bytes!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl Storable for bool {
    fn store<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[u8::from(*self)])
    }

    fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        match u8::load(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid boolean byte {other:#04x}"),
            )),
        }
    }
}

impl<T: Storable, const N: usize> Storable for [T; N] {
    fn store<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for element in self {
            element.store(writer)?;
        }
        Ok(())
    }

    fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut elements = Vec::with_capacity(N);
        for _ in 0..N {
            elements.push(T::load(reader)?);
        }
        elements
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "array length mismatch"))
    }
}

macro_rules! storable_tuple {
    ($($field:ident),+) => {
        impl<$($field: Storable),+> Storable for ($($field,)+) {
            fn store<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
                #[allow(non_snake_case)]
                let ($(ref $field,)+) = *self;
                $($field.store(writer)?;)+
                Ok(())
            }

            fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
                Ok(($($field::load(reader)?,)+))
            }
        }
    };
}

storable_tuple!(A);
storable_tuple!(A, B);
storable_tuple!(A, B, C);
storable_tuple!(A, B, C, D);
storable_tuple!(A, B, C, D, E);
storable_tuple!(A, B, C, D, E, F);
storable_tuple!(A, B, C, D, E, F, G);
storable_tuple!(A, B, C, D, E, F, G, H);
