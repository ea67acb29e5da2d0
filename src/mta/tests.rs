use super::convert::*;
use super::*;
use crate::class::ClassId;
use crate::error::ErrorKind;

fn mta(code: TypeCode, class: u32, dims: &[usize]) -> Mta {
    Mta::buffer(
        ClassId(class),
        Arc::from(code.class_name()),
        Some(code),
        code.size(),
        dims,
    )
}

fn fixed(width: usize, dims: &[usize]) -> Mta {
    Mta::buffer(ClassId(9), Arc::from("CHAR"), Some(TypeCode::Char), width, dims)
}

fn transfer<S: Element, D: Element>(values: &[S], dims: &[usize]) -> (Vec<D>, AdiResult<Transfer>) {
    let src = mta(S::CODE, S::CODE as u32 + 1, dims);
    let mut dst = mta(D::CODE, D::CODE as u32 + 1, dims);
    let input = encode_all(values);
    let mut output = vec![0u8; values.len() * D::SIZE];

    let result = copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut output),
        &TransferOptions::default(),
    );
    (decode_all(&output), result)
}

// ===== Numeric Conversion Tests =====

#[test]
fn test_same_type_round_trip() {
    let values = [1i32, -2, 3, i32::MAX];
    let (out, result) = transfer::<i32, i32>(&values, &[4]);
    assert_eq!(out, values);
    assert_eq!(result.unwrap().elements, 4);
}

#[test]
fn test_narrowing_substitutes_bad_value() {
    let (out, result) = transfer::<i32, u8>(&[10, 300, 20], &[3]);
    assert_eq!(out, vec![10, BAD_UBYTE, 20]);

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion { count: 1 });
    assert_eq!(err.message(), "1 data conversion error(s) occurred");
}

#[test]
fn test_sentinel_excluded_from_range() {
    let (out, result) = transfer::<i32, i8>(&[-128, -127], &[2]);
    assert_eq!(out, vec![BAD_BYTE, -127]);
    assert!(result.is_err());
}

#[test]
fn test_float_to_integer_truncates() {
    let (out, result) = transfer::<f64, i32>(&[2.9, -2.9, 0.5], &[3]);
    assert_eq!(out, vec![2, -2, 0]);
    assert!(result.is_ok());
}

#[test]
fn test_nan_is_bad() {
    let (out, result) = transfer::<f64, i16>(&[f64::NAN], &[1]);
    assert_eq!(out, vec![BAD_WORD]);
    assert!(result.unwrap_err().is(ErrorKind::Conversion { count: 1 }));
}

#[test]
fn test_double_to_real_overflow() {
    let (out, _) = transfer::<f64, f32>(&[1e300, 1.5], &[2]);
    assert_eq!(out, vec![BAD_REAL, 1.5]);
}

#[test]
fn test_widening_is_exact() {
    let (out, result) = transfer::<u16, f64>(&[0, 65534], &[2]);
    assert_eq!(out, vec![0.0, 65534.0]);
    assert!(result.is_ok());
}

#[test]
fn test_logical_conversions() {
    let (flags, _) = transfer::<i32, bool>(&[0, 5, -1], &[3]);
    assert_eq!(flags, vec![false, true, true]);

    let (ints, _) = transfer::<bool, i32>(&[true, false], &[2]);
    assert_eq!(ints, vec![1, 0]);
}

#[test]
fn test_pointer_to_numeric_unsupported() {
    let src = mta(TypeCode::Pointer, 10, &[1]);
    let mut dst = mta(TypeCode::Integer, 5, &[1]);
    let input = encode_all(&[7usize]);
    let mut output = vec![0u8; 4];

    let err = copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut output),
        &TransferOptions::default(),
    )
    .unwrap_err();
    assert!(err.is(ErrorKind::IllegalOperation));
    assert_eq!(
        err.message(),
        "Data conversion from POINTER to INTEGER is not supported"
    );
}

// ===== Shape Tests =====

#[test]
fn test_truncation_flag() {
    let src = mta(TypeCode::Integer, 5, &[5]);
    let mut dst = mta(TypeCode::Integer, 5, &[3]);
    let input = encode_all(&[1i32, 2, 3, 4, 5]);
    let mut output = vec![0u8; 12];

    let done = copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut output),
        &TransferOptions::default(),
    )
    .unwrap();

    assert!(done.truncated);
    assert!(dst.trunc);
    assert_eq!(decode_all::<i32>(&output), vec![1, 2, 3]);
}

#[test]
fn test_short_source_sets_used_dims() {
    let src = mta(TypeCode::Integer, 5, &[2]);
    let mut dst = mta(TypeCode::Integer, 5, &[6]);
    let input = encode_all(&[8i32, 9]);
    let mut output = vec![0u8; 24];

    let done = copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut output),
        &TransferOptions::default(),
    )
    .unwrap();

    assert!(!done.truncated);
    assert_eq!(dst.udims.as_slice(), &[2]);
}

#[test]
fn test_strided_section_copy() {
    // 4x3 array holding 1..=12 column-major; take rows 2..3 of columns 2..3
    let base: Vec<i32> = (1..=12).collect();
    let input = encode_all(&base);
    let src = mta(TypeCode::Integer, 5, &[4, 3]).section(&[2, 2], &[1, 1]);
    assert!(!src.contig);

    let mut dst = mta(TypeCode::Double, 7, &[2, 2]);
    let mut output = vec![0u8; 32];
    copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut output),
        &TransferOptions::default(),
    )
    .unwrap();

    assert_eq!(decode_all::<f64>(&output), vec![6.0, 7.0, 10.0, 11.0]);
}

#[test]
fn test_write_into_section() {
    let mut storage = vec![0u8; 4 * 9];
    let src = mta(TypeCode::Integer, 5, &[2, 2]);
    let input = encode_all(&[1i32, 2, 3, 4]);
    let mut dst = mta(TypeCode::Integer, 5, &[3, 3]).section(&[2, 2], &[1, 0]);

    copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut storage),
        &TransferOptions::default(),
    )
    .unwrap();

    assert_eq!(decode_all::<i32>(&storage), vec![0, 1, 2, 0, 3, 4, 0, 0, 0]);
}

#[test]
fn test_contiguity_rules() {
    let full = mta(TypeCode::Integer, 5, &[4, 3]);
    assert!(full.compute_contig());

    let columns = mta(TypeCode::Integer, 5, &[4, 3]).section(&[4, 2], &[0, 1]);
    assert!(columns.contig);
    assert_eq!(columns.window(), Some((4, 8)));

    let rows = mta(TypeCode::Integer, 5, &[4, 3]).section(&[2, 3], &[0, 0]);
    assert!(!rows.contig);
    assert_eq!(rows.window(), None);

    let cell = mta(TypeCode::Integer, 5, &[4, 3]).section(&[1, 1], &[2, 2]);
    assert!(cell.contig);
    assert_eq!(cell.window(), Some((10, 1)));
}

#[test]
fn test_buffer_too_small() {
    let src = mta(TypeCode::Integer, 5, &[4]);
    let mut dst = mta(TypeCode::Integer, 5, &[4]);
    let input = encode_all(&[1i32, 2, 3, 4]);
    let mut output = vec![0u8; 8];

    let err = copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut output),
        &TransferOptions::default(),
    )
    .unwrap_err();
    assert!(err.is(ErrorKind::InvalidArgument));
}

// ===== Character Tests =====

fn to_strings(src: &Mta, input: &[u8]) -> (Vec<String>, AdiResult<Transfer>) {
    let n = src.elements();
    let mut dst = Mta::buffer(ClassId(9), Arc::from("CHAR"), Some(TypeCode::Char), 0, &[n]);
    let mut out = vec![String::new(); n];
    let result = copy(
        src,
        &Data::Bytes(input),
        &mut dst,
        &mut DataMut::Text(&mut out),
        &TransferOptions::default(),
    );
    (out, result)
}

#[test]
fn test_numbers_to_text() {
    let ints = encode_all(&[42i32, -7]);
    let (text, _) = to_strings(&mta(TypeCode::Integer, 5, &[2]), &ints);
    assert_eq!(text, vec!["42", "-7"]);

    let reals = encode_all(&[1.5f64, 1e10, 0.0001]);
    let (text, _) = to_strings(&mta(TypeCode::Double, 7, &[3]), &reals);
    assert_eq!(text, vec!["1.5", "1e+10", "0.0001"]);

    let flags = encode_all(&[true, false]);
    let (text, _) = to_strings(&mta(TypeCode::Logical, 8, &[2]), &flags);
    assert_eq!(text, vec!["TRUE", "FALSE"]);
}

#[test]
fn test_text_to_numbers() {
    let src = Mta::buffer(ClassId(9), Arc::from("CHAR"), Some(TypeCode::Char), 0, &[4]);
    let input: Vec<String> = ["  12", "1.5d2", "abc", "7xyz"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut dst = mta(TypeCode::Double, 7, &[4]);
    let mut out = vec![0u8; 32];
    let err = copy(
        &src,
        &Data::Text(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut out),
        &TransferOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conversion { count: 1 });
    assert_eq!(decode_all::<f64>(&out), vec![12.0, 150.0, BAD_DOUBLE, 7.0]);
}

#[test]
fn test_text_to_logical() {
    let src = Mta::buffer(ClassId(9), Arc::from("CHAR"), Some(TypeCode::Char), 0, &[4]);
    let input: Vec<String> = ["yes", "T", "no", "true"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut dst = mta(TypeCode::Logical, 8, &[4]);
    let mut out = vec![0u8; 16];
    copy(
        &src,
        &Data::Text(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut out),
        &TransferOptions::default(),
    )
    .unwrap();

    assert_eq!(decode_all::<bool>(&out), vec![true, true, false, true]);
}

#[test]
fn test_fixed_width_padding() {
    let src = Mta::buffer(ClassId(9), Arc::from("CHAR"), Some(TypeCode::Char), 0, &[2]);
    let input = vec!["ab".to_string(), "toolong".to_string()];

    let mut dst = fixed(4, &[2]);
    let mut out = vec![0u8; 8];
    copy(
        &src,
        &Data::Text(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut out),
        &TransferOptions::default(),
    )
    .unwrap();
    assert_eq!(&out, b"ab  tool");

    let mut dst = fixed(4, &[2]).with_nulterm(true);
    let mut out = vec![b'x'; 8];
    copy(
        &src,
        &Data::Text(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut out),
        &TransferOptions::default(),
    )
    .unwrap();
    assert_eq!(&out[..3], b"ab\0");
}

#[test]
fn test_number_overflowing_field_is_blanked() {
    let src = mta(TypeCode::Integer, 5, &[2]);
    let input = encode_all(&[12i32, 123456]);
    let mut dst = fixed(3, &[2]);
    let mut out = vec![0u8; 6];

    let err = copy(
        &src,
        &Data::Bytes(&input),
        &mut dst,
        &mut DataMut::Bytes(&mut out),
        &TransferOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conversion { count: 1 });
    assert_eq!(&out, b"12    ");
}

#[test]
fn test_fixed_field_read_stops_at_nul() {
    let src = fixed(5, &[2]);
    let (text, result) = to_strings(&src, b"hi\0zzab cd");
    assert!(result.is_ok());
    assert_eq!(text, vec!["hi", "ab cd"]);
}

// ===== Formatting Tests =====

#[test]
fn test_format_g() {
    assert_eq!(format_g(0.0), "0");
    assert_eq!(format_g(100.0), "100");
    assert_eq!(format_g(123456.0), "123456");
    assert_eq!(format_g(1234567.0), "1.23457e+06");
    assert_eq!(format_g(0.5), "0.5");
    assert_eq!(format_g(0.00001), "1e-05");
    assert_eq!(format_g(-3.25), "-3.25");
    assert_eq!(format_g(1.0 / 3.0), "0.333333");
}

#[test]
fn test_scan_double() {
    assert_eq!(scan_double("  3.5  ", false), Some(3.5));
    assert_eq!(scan_double("-2e3", false), Some(-2000.0));
    assert_eq!(scan_double("1.0D1", true), Some(10.0));
    assert_eq!(scan_double("1.0D1", false), Some(1.0));
    assert_eq!(scan_double("12abc", false), Some(12.0));
    assert_eq!(scan_double("5e", false), Some(5.0));
    assert_eq!(scan_double(".", false), None);
    assert_eq!(scan_double("", false), None);
}

#[test]
fn test_valid_ranges_exclude_sentinels() {
    for code in [TypeCode::Byte, TypeCode::Word, TypeCode::Integer] {
        let (min, _) = valid_range(code);
        let mut out = [0u8; 4];
        assert!(encode_number(code, min, &mut out));
        assert!(!encode_number(code, min - 1.0, &mut out));
    }
}
