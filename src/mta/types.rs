//! Transfer types - element codes, buffer views and typed elements
//!
//! Defines the element representations the transfer engine understands.

use std::mem::size_of;

/// Built-in element type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    Byte,
    UByte,
    Word,
    UWord,
    Integer,
    Real,
    Double,
    Logical,
    Char,
    Pointer,
}

impl TypeCode {
    pub const ALL: [TypeCode; 10] = [
        Self::Byte,
        Self::UByte,
        Self::Word,
        Self::UWord,
        Self::Integer,
        Self::Real,
        Self::Double,
        Self::Logical,
        Self::Char,
        Self::Pointer,
    ];

    /// Size of one element in bytes; CHAR has no fixed size
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Byte | Self::UByte => 1,
            Self::Word | Self::UWord => 2,
            Self::Integer | Self::Real | Self::Logical => 4,
            Self::Double => 8,
            Self::Pointer => size_of::<usize>(),
            Self::Char => 0,
        }
    }

    /// Class name this code is registered under
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Byte => "BYTE",
            Self::UByte => "UBYTE",
            Self::Word => "WORD",
            Self::UWord => "UWORD",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Logical => "LOGICAL",
            Self::Char => "CHAR",
            Self::Pointer => "POINTER",
        }
    }

    /// Check if type is integral
    #[inline]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::UByte | Self::Word | Self::UWord | Self::Integer
        )
    }

    /// Check if type is floating point
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Real | Self::Double)
    }

    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.is_integral() || self.is_float()
    }
}

/// Read-only view of element storage
#[derive(Debug, Clone, Copy)]
pub enum Data<'a> {
    Bytes(&'a [u8]),
    Text(&'a [String]),
}

/// Writable view of element storage
#[derive(Debug)]
pub enum DataMut<'a> {
    Bytes(&'a mut [u8]),
    Text(&'a mut [String]),
}

impl<'a> Data<'a> {
    /// Number of elements of `size` bytes (or strings) in the view
    pub fn elements(&self, size: usize) -> usize {
        match self {
            Self::Bytes(bytes) => {
                if size == 0 {
                    0
                } else {
                    bytes.len() / size
                }
            }
            Self::Text(text) => text.len(),
        }
    }
}

impl<'a> DataMut<'a> {
    pub fn elements(&self, size: usize) -> usize {
        match self {
            Self::Bytes(bytes) => {
                if size == 0 {
                    0
                } else {
                    bytes.len() / size
                }
            }
            Self::Text(text) => text.len(),
        }
    }

    /// Reborrow as a read-only view
    pub fn as_data(&self) -> Data<'_> {
        match self {
            Self::Bytes(bytes) => Data::Bytes(bytes),
            Self::Text(text) => Data::Text(text),
        }
    }
}

/// Owned element buffer (map scratch space, snapshots)
#[derive(Debug, Clone, PartialEq)]
pub enum Scratch {
    Bytes(Vec<u8>),
    Text(Vec<String>),
}

impl Scratch {
    /// Zeroed buffer able to hold `count` elements
    pub fn zeroed(code: Option<TypeCode>, size: usize, count: usize) -> Self {
        match code {
            Some(TypeCode::Char) => Self::Text(vec![String::new(); count]),
            _ => Self::Bytes(vec![0; size * count]),
        }
    }

    pub fn data(&self) -> Data<'_> {
        match self {
            Self::Bytes(bytes) => Data::Bytes(bytes),
            Self::Text(text) => Data::Text(text),
        }
    }

    pub fn data_mut(&mut self) -> DataMut<'_> {
        match self {
            Self::Bytes(bytes) => DataMut::Bytes(bytes),
            Self::Text(text) => DataMut::Text(text),
        }
    }
}

/// Rust types that map onto a built-in element code
pub trait Element: Copy + Default + 'static {
    const CODE: TypeCode;
    const SIZE: usize;

    /// Write native-endian bytes into the front of `out`
    fn write(self, out: &mut [u8]);

    /// Read from the front of `bytes`
    fn read(bytes: &[u8]) -> Self;
}

macro_rules! element {
    ($ty:ty, $code:expr) => {
        impl Element for $ty {
            const CODE: TypeCode = $code;
            const SIZE: usize = size_of::<$ty>();

            #[inline]
            fn write(self, out: &mut [u8]) {
                out[..Self::SIZE].copy_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn read(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$ty>()];
                buf.copy_from_slice(&bytes[..Self::SIZE]);
                <$ty>::from_ne_bytes(buf)
            }
        }
    };
}

element!(i8, TypeCode::Byte);
element!(u8, TypeCode::UByte);
element!(i16, TypeCode::Word);
element!(u16, TypeCode::UWord);
element!(i32, TypeCode::Integer);
element!(f32, TypeCode::Real);
element!(f64, TypeCode::Double);
element!(usize, TypeCode::Pointer);

/// LOGICAL is stored as a 4-byte integer, non-zero meaning true
impl Element for bool {
    const CODE: TypeCode = TypeCode::Logical;
    const SIZE: usize = 4;

    #[inline]
    fn write(self, out: &mut [u8]) {
        i32::from(self).write(out);
    }

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        i32::read(bytes) != 0
    }
}

/// Pack a slice of elements into native-endian bytes
pub fn encode_all<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * T::SIZE];
    for (value, chunk) in values.iter().zip(out.chunks_exact_mut(T::SIZE)) {
        value.write(chunk);
    }
    out
}

/// Unpack native-endian bytes into elements
pub fn decode_all<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::SIZE).map(T::read).collect()
}
