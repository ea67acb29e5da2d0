//! Element conversion - range-checked casts and text transcoding
//!
//! Design: each source element is decoded into a `Scalar`, then encoded
//! into the destination type. Values that do not fit the destination are
//! replaced with that type's bad value and counted; the caller turns the
//! count into a single aggregate error once the whole transfer is done.

use super::types::{Element, TypeCode};
use crate::error::{AdiError, AdiResult};
use std::borrow::Cow;

/// Bad-value sentinels
pub const BAD_BYTE: i8 = i8::MIN;
pub const BAD_UBYTE: u8 = u8::MAX;
pub const BAD_WORD: i16 = i16::MIN;
pub const BAD_UWORD: u16 = u16::MAX;
pub const BAD_INTEGER: i32 = i32::MIN;
pub const BAD_REAL: f32 = -f32::MAX;
pub const BAD_DOUBLE: f64 = -f64::MAX;

/// Valid range of a numeric type; the bad value lies outside it for integers
pub fn valid_range(code: TypeCode) -> (f64, f64) {
    match code {
        TypeCode::Byte => (-127.0, 127.0),
        TypeCode::UByte => (0.0, 254.0),
        TypeCode::Word => (-32767.0, 32767.0),
        TypeCode::UWord => (0.0, 65534.0),
        TypeCode::Integer => (-2147483647.0, 2147483647.0),
        TypeCode::Real => (-(f32::MAX as f64), f32::MAX as f64),
        _ => (-f64::MAX, f64::MAX),
    }
}

/// Settings that affect text scanning
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    /// Accept `d`/`D` as an exponent marker for float targets
    pub fortran_exponents: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            fortran_exponents: true,
        }
    }
}

/// One decoded element
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Int(i64),
    Float(f64),
    Logical(bool),
    Pointer(usize),
    Text(Cow<'a, str>),
}

/// Decode element bytes of a non-text type
pub fn decode(code: TypeCode, bytes: &[u8]) -> Scalar<'static> {
    match code {
        TypeCode::Byte => Scalar::Int(i8::read(bytes) as i64),
        TypeCode::UByte => Scalar::Int(u8::read(bytes) as i64),
        TypeCode::Word => Scalar::Int(i16::read(bytes) as i64),
        TypeCode::UWord => Scalar::Int(u16::read(bytes) as i64),
        TypeCode::Integer => Scalar::Int(i32::read(bytes) as i64),
        TypeCode::Real => Scalar::Float(f32::read(bytes) as f64),
        TypeCode::Double => Scalar::Float(f64::read(bytes)),
        TypeCode::Logical => Scalar::Logical(bool::read(bytes)),
        TypeCode::Pointer => Scalar::Pointer(usize::read(bytes)),
        TypeCode::Char => Scalar::Text(Cow::Borrowed("")),
    }
}

/// Write the bad value of a numeric type
pub fn write_bad(code: TypeCode, out: &mut [u8]) {
    match code {
        TypeCode::Byte => BAD_BYTE.write(out),
        TypeCode::UByte => BAD_UBYTE.write(out),
        TypeCode::Word => BAD_WORD.write(out),
        TypeCode::UWord => BAD_UWORD.write(out),
        TypeCode::Integer => BAD_INTEGER.write(out),
        TypeCode::Real => BAD_REAL.write(out),
        TypeCode::Double => BAD_DOUBLE.write(out),
        _ => {}
    }
}

fn put_checked<T>(out: &mut [u8], x: f64, code: TypeCode, bad: T) -> bool
where
    T: Element + num_traits::NumCast,
{
    let (min, max) = valid_range(code);
    let value = if x.is_nan() || x < min || x > max {
        None
    } else {
        num_traits::cast::<f64, T>(x)
    };

    match value {
        Some(v) => {
            v.write(out);
            true
        }
        None => {
            bad.write(out);
            false
        }
    }
}

/// Store `x` into a numeric element; false when the bad value was written
pub fn encode_number(code: TypeCode, x: f64, out: &mut [u8]) -> bool {
    match code {
        TypeCode::Byte => put_checked(out, x, code, BAD_BYTE),
        TypeCode::UByte => put_checked(out, x, code, BAD_UBYTE),
        TypeCode::Word => put_checked(out, x, code, BAD_WORD),
        TypeCode::UWord => put_checked(out, x, code, BAD_UWORD),
        TypeCode::Integer => put_checked(out, x, code, BAD_INTEGER),
        TypeCode::Real => put_checked(out, x, code, BAD_REAL),
        TypeCode::Double => put_checked(out, x, code, BAD_DOUBLE),
        _ => false,
    }
}

fn unsupported(from: &str, to: TypeCode) -> AdiError {
    AdiError::illegal("Data conversion from ^FROM to ^TO is not supported")
        .token("FROM", from)
        .token("TO", to.class_name())
}

fn scalar_kind(value: &Scalar<'_>) -> &'static str {
    match value {
        Scalar::Int(_) => "INTEGER",
        Scalar::Float(_) => "DOUBLE",
        Scalar::Logical(_) => "LOGICAL",
        Scalar::Pointer(_) => "POINTER",
        Scalar::Text(_) => "CHAR",
    }
}

/// Encode a decoded value into a non-text element
///
/// Returns `Ok(false)` when a bad value had to be substituted; combinations
/// that have no meaningful conversion are errors.
pub fn encode(
    code: TypeCode,
    value: &Scalar<'_>,
    out: &mut [u8],
    options: &TransferOptions,
) -> AdiResult<bool> {
    match code {
        TypeCode::Logical => {
            let flag = match value {
                Scalar::Int(v) => *v != 0,
                Scalar::Float(x) => *x != 0.0,
                Scalar::Logical(b) => *b,
                Scalar::Text(s) => parse_logical(s),
                Scalar::Pointer(_) => return Err(unsupported("POINTER", code)),
            };
            flag.write(out);
            Ok(true)
        }
        TypeCode::Pointer => match value {
            Scalar::Pointer(p) => {
                p.write(out);
                Ok(true)
            }
            Scalar::Text(s) => match parse_pointer(s) {
                Some(p) => {
                    p.write(out);
                    Ok(true)
                }
                None => {
                    0usize.write(out);
                    Ok(false)
                }
            },
            other => Err(unsupported(scalar_kind(other), code)),
        },
        TypeCode::Char => Err(unsupported(scalar_kind(value), code)),
        _ => {
            let x = match value {
                Scalar::Int(v) => *v as f64,
                Scalar::Float(x) => *x,
                Scalar::Logical(b) => f64::from(u8::from(*b)),
                Scalar::Pointer(_) => return Err(unsupported("POINTER", code)),
                Scalar::Text(s) => {
                    let fortran = options.fortran_exponents && code.is_float();
                    match scan_double(s, fortran) {
                        Some(x) => x,
                        None => {
                            write_bad(code, out);
                            return Ok(false);
                        }
                    }
                }
            };
            Ok(encode_number(code, x, out))
        }
    }
}

/// Text form of a decoded value
pub fn to_text(code: TypeCode, value: &Scalar<'_>) -> String {
    match value {
        Scalar::Int(v) => v.to_string(),
        Scalar::Float(x) => {
            if code == TypeCode::Real {
                format_g(*x as f32 as f64)
            } else {
                format_g(*x)
            }
        }
        Scalar::Logical(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Scalar::Pointer(p) => format!("{:x}", p),
        Scalar::Text(s) => s.to_string(),
    }
}

/// C `%g` formatting with 6 significant digits
pub fn format_g(x: f64) -> String {
    const PRECISION: i32 = 6;

    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:.*e}", (PRECISION - 1) as usize, x);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let mantissa = strip_zeros(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, x)).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Scan the longest floating-point prefix, `sscanf("%lg")` style
pub fn scan_double(text: &str, fortran_exponents: bool) -> Option<f64> {
    let text: Cow<'_, str> = if fortran_exponents && text.contains(['d', 'D']) {
        Cow::Owned(text.replace(['d', 'D'], "e"))
    } else {
        Cow::Borrowed(text)
    };
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let rest = &s[end..];
    for special in ["infinity", "inf", "nan"] {
        if rest.len() >= special.len() && rest[..special.len()].eq_ignore_ascii_case(special) {
            return s[..end + special.len()].parse().ok();
        }
    }

    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// `T`, `TRUE`, `Y` and `YES` are true; anything else is false
pub fn parse_logical(text: &str) -> bool {
    let t = text.trim();
    ["T", "TRUE", "Y", "YES"]
        .iter()
        .any(|word| t.eq_ignore_ascii_case(word))
}

fn parse_pointer(text: &str) -> Option<usize> {
    let t = text.trim();
    let t = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    usize::from_str_radix(t, 16).ok()
}

/// Text of one fixed-width field, up to its first NUL
pub fn field_text(field: &[u8]) -> Cow<'_, str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end])
}

/// Fill a fixed-width field from `text`
///
/// Short values are NUL-terminated or blank-padded. With `strict`, a value
/// that does not fit blanks the field and returns false.
pub fn fill_field(field: &mut [u8], text: &str, nulterm: bool, strict: bool) -> bool {
    let bytes = text.as_bytes();

    if strict && bytes.len() > field.len() {
        field.fill(b' ');
        return false;
    }

    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
    if n < field.len() {
        if nulterm {
            field[n] = 0;
        } else {
            field[n..].fill(b' ');
        }
    }
    true
}
