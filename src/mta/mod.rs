//! Memory transfer accessors - shaped views over element buffers
//!
//! Design: An `Mta` describes a rectangular region of a column-major array:
//! - `ddims` are the declared extents of the underlying storage
//! - `udims` are the extents of the region in use, starting at `origin`
//! - `contig` records whether the region is one flat run of elements
//!
//! `copy` moves a region from one buffer to another, converting element
//! types on the way. Contiguous leading axes are merged into runs so a fully
//! contiguous transfer is a single pass; ragged regions are walked with an
//! odometer over the outer axes.

pub mod convert;
pub mod types;

#[cfg(test)]
mod tests;

pub use convert::{format_g, scan_double, Scalar, TransferOptions};
pub use types::{decode_all, encode_all, Data, DataMut, Element, Scratch, TypeCode};

use crate::class::ClassId;
use crate::error::{AdiError, AdiResult};
use crate::logging::log_conversion_errors;
use crate::store::ObjectId;
use convert::{decode, encode, field_text, fill_field, to_text};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;

/// Maximum array dimensionality
pub const MAX_DIMS: usize = 7;

/// Per-axis extents
pub type Dims = SmallVec<[usize; MAX_DIMS]>;

/// Accessor over one typed, shaped region
#[derive(Debug, Clone, PartialEq)]
pub struct Mta {
    /// Class of the elements
    pub class: ClassId,
    /// Class name, for error reporting
    pub name: Arc<str>,
    /// Built-in element code; `None` for user primitives
    pub code: Option<TypeCode>,
    /// Element size in bytes; 0 for variable-length text
    pub size: usize,
    pub ddims: Dims,
    pub udims: Dims,
    pub origin: Dims,
    pub contig: bool,
    /// Set by `copy` when this destination was smaller than the source
    pub trunc: bool,
    /// Fixed-width text fields are NUL-terminated rather than blank padded
    pub nulterm: bool,
    pub owner: Option<ObjectId>,
}

/// Outcome of a completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transfer {
    pub truncated: bool,
    pub elements: usize,
}

impl Mta {
    /// Accessor over a whole user buffer of shape `dims`
    pub fn buffer(
        class: ClassId,
        name: Arc<str>,
        code: Option<TypeCode>,
        size: usize,
        dims: &[usize],
    ) -> Self {
        let ddims: Dims = if dims.is_empty() {
            SmallVec::from_slice(&[1])
        } else {
            SmallVec::from_slice(dims)
        };
        let origin = ddims.iter().map(|_| 0).collect();

        Self {
            class,
            name,
            code,
            size,
            udims: ddims.clone(),
            ddims,
            origin,
            contig: true,
            trunc: false,
            nulterm: false,
            owner: None,
        }
    }

    /// Accessor over `udims` elements of a larger array, starting at `origin`
    pub fn section(mut self, udims: &[usize], origin: &[usize]) -> Self {
        self.udims = SmallVec::from_slice(udims);
        self.origin = SmallVec::from_slice(origin);
        self.contig = self.compute_contig();
        self
    }

    pub fn with_nulterm(mut self, nulterm: bool) -> Self {
        self.nulterm = nulterm;
        self
    }

    pub fn ndim(&self) -> usize {
        self.ddims.len()
    }

    /// Number of elements in the region
    pub fn elements(&self) -> usize {
        self.udims.iter().product()
    }

    /// True when every axis before the last used one spans its declared extent
    pub fn compute_contig(&self) -> bool {
        let last = self
            .udims
            .iter()
            .rposition(|&n| n > 1)
            .unwrap_or(0);

        (0..last).all(|d| self.udims[d] == self.ddims[d])
    }

    /// Element offset and count of a contiguous region
    pub fn window(&self) -> Option<(usize, usize)> {
        if !self.contig {
            return None;
        }
        Some((self.base_offset(&strides(&self.ddims, self.ndim())), self.elements()))
    }

    /// Storage offset of every element in the region, first axis fastest
    pub fn offsets(&self) -> Vec<usize> {
        region_offsets(&self.ddims, &self.udims, &self.origin)
    }

    fn base_offset(&self, strides: &[usize]) -> usize {
        self.origin
            .iter()
            .zip(strides)
            .map(|(o, s)| o * s)
            .sum()
    }

    fn is_text(&self) -> bool {
        self.code == Some(TypeCode::Char) && self.size == 0
    }
}

fn axis(dims: &[usize], d: usize) -> usize {
    dims.get(d).copied().unwrap_or(1)
}

fn strides(ddims: &[usize], ndim: usize) -> Dims {
    let mut out = Dims::with_capacity(ndim);
    let mut step = 1;
    for d in 0..ndim {
        out.push(step);
        step *= axis(ddims, d);
    }
    out
}

/// Storage offsets of the `udims` region at `origin` in an array of `ddims`
pub fn region_offsets(ddims: &[usize], udims: &[usize], origin: &[usize]) -> Vec<usize> {
    let ndim = ddims.len().max(1);
    let strides = strides(ddims, ndim);
    let base: usize = origin.iter().zip(&strides).map(|(o, s)| o * s).sum();
    let total: usize = (0..ndim).map(|d| axis(udims, d)).product();

    let mut out = Vec::with_capacity(total);
    let mut index: Dims = (0..ndim).map(|_| 0).collect();
    for _ in 0..total {
        out.push(base + index.iter().zip(&strides).map(|(i, s)| i * s).sum::<usize>());
        for d in 0..ndim {
            index[d] += 1;
            if index[d] < axis(udims, d) {
                break;
            }
            index[d] = 0;
        }
    }
    out
}

fn unsupported(src: &Mta, dst: &Mta) -> AdiError {
    AdiError::illegal("Data conversion from ^FROM to ^TO is not supported")
        .token("FROM", &src.name)
        .token("TO", &dst.name)
}

/// Reject element-type pairs that have no conversion
fn check_convertible(src: &Mta, dst: &Mta) -> AdiResult<()> {
    if src.class == dst.class {
        return Ok(());
    }

    match (src.code, dst.code) {
        (Some(TypeCode::Pointer), Some(to)) if !matches!(to, TypeCode::Pointer | TypeCode::Char) => {
            Err(unsupported(src, dst))
        }
        (Some(from), Some(TypeCode::Pointer)) if !matches!(from, TypeCode::Pointer | TypeCode::Char) => {
            Err(unsupported(src, dst))
        }
        (Some(_), Some(_)) => Ok(()),
        _ => Err(unsupported(src, dst)),
    }
}

fn check_buffer(mta: &Mta, available: usize, text: bool, last: usize) -> AdiResult<()> {
    if text != mta.is_text() {
        return Err(AdiError::invalid(
            "Transfer buffer does not match element type ^TYPE",
        )
        .token("TYPE", &mta.name));
    }
    if last >= available {
        return Err(AdiError::invalid(
            "Transfer buffer too small for ^TYPE data: need ^NEED elements, have ^HAVE",
        )
        .token("TYPE", &mta.name)
        .token("NEED", last + 1)
        .token("HAVE", available));
    }
    Ok(())
}

/// Copy the region described by `src` into the region described by `dst`
///
/// The destination region is clipped to the source; `dst.udims` is updated
/// to the extents actually written. Elements that cannot be represented in
/// the destination type are replaced by its bad value. When any were, the
/// whole output is still written and the aggregate conversion error is
/// returned.
pub fn copy(
    src: &Mta,
    src_data: &Data<'_>,
    dst: &mut Mta,
    dst_data: &mut DataMut<'_>,
    options: &TransferOptions,
) -> AdiResult<Transfer> {
    check_convertible(src, dst)?;

    let ndim = src.ndim().max(dst.ndim()).max(1);
    let mut used = Dims::with_capacity(ndim);
    let mut truncated = false;

    for d in 0..ndim {
        let have = axis(&src.udims, d);
        let room = axis(&dst.udims, d);
        if room < have {
            truncated = true;
        }
        used.push(have.min(room));
    }

    dst.trunc = truncated;
    dst.udims = used.iter().take(dst.ndim().max(1)).copied().collect();

    let elements: usize = used.iter().product();
    if elements == 0 {
        return Ok(Transfer {
            truncated,
            elements: 0,
        });
    }

    let src_strides = strides(&src.ddims, ndim);
    let dst_strides = strides(&dst.ddims, ndim);
    let src_base = src.base_offset(&src_strides);
    let dst_base = dst.base_offset(&dst_strides);

    let reach = |base: usize, strides: &[usize]| {
        base + used
            .iter()
            .zip(strides)
            .map(|(n, s)| (n - 1) * s)
            .sum::<usize>()
    };
    check_buffer(
        src,
        src_data.elements(src.size),
        matches!(src_data, Data::Text(_)),
        reach(src_base, &src_strides),
    )?;
    check_buffer(
        dst,
        dst_data.elements(dst.size),
        matches!(dst_data, DataMut::Text(_)),
        reach(dst_base, &dst_strides),
    )?;

    // Merge leading axes that are full in both regions into one run
    let mut k = 1;
    while k < ndim
        && axis(&src.ddims, k - 1) == used[k - 1]
        && axis(&dst.ddims, k - 1) == used[k - 1]
    {
        k += 1;
    }
    let run: usize = used[..k].iter().product();

    let mut nerr = 0;
    let mut index: Dims = (0..ndim).map(|_| 0).collect();

    loop {
        let src_off: usize = src_base
            + (k..ndim)
                .map(|d| index[d] * src_strides[d])
                .sum::<usize>();
        let dst_off: usize = dst_base
            + (k..ndim)
                .map(|d| index[d] * dst_strides[d])
                .sum::<usize>();

        nerr += copy_run(src, src_data, src_off, dst, dst_data, dst_off, run, options)?;

        // Advance the odometer over the outer axes
        let mut d = k;
        loop {
            if d == ndim {
                return finish(src, dst, truncated, elements, nerr);
            }
            index[d] += 1;
            if index[d] < used[d] {
                break;
            }
            index[d] = 0;
            d += 1;
        }
    }
}

fn finish(
    src: &Mta,
    dst: &Mta,
    truncated: bool,
    elements: usize,
    nerr: usize,
) -> AdiResult<Transfer> {
    if nerr > 0 {
        log_conversion_errors(&src.name, &dst.name, nerr);
        return Err(AdiError::conversion(nerr));
    }
    Ok(Transfer {
        truncated,
        elements,
    })
}

/// Copy `n` consecutive elements; returns the number of bad values written
#[allow(clippy::too_many_arguments)]
fn copy_run(
    src: &Mta,
    src_data: &Data<'_>,
    src_off: usize,
    dst: &Mta,
    dst_data: &mut DataMut<'_>,
    dst_off: usize,
    n: usize,
    options: &TransferOptions,
) -> AdiResult<usize> {
    let same_layout = src.class == dst.class && src.size == dst.size && src.code != Some(TypeCode::Char);

    match (src_data, dst_data) {
        // Fast path: identical element layout
        (Data::Bytes(from), DataMut::Bytes(to)) if same_layout => {
            let size = src.size;
            to[dst_off * size..(dst_off + n) * size]
                .copy_from_slice(&from[src_off * size..(src_off + n) * size]);
            Ok(0)
        }
        (Data::Text(from), DataMut::Text(to)) => {
            to[dst_off..dst_off + n].clone_from_slice(&from[src_off..src_off + n]);
            Ok(0)
        }
        (from, to) => {
            let mut nerr = 0;
            for i in 0..n {
                let value = read_element(src, from, src_off + i);
                if !write_element(src, &value, dst, to, dst_off + i, options)? {
                    nerr += 1;
                }
            }
            Ok(nerr)
        }
    }
}

fn read_element<'a>(mta: &Mta, data: &'a Data<'_>, index: usize) -> Scalar<'a> {
    match data {
        Data::Text(text) => Scalar::Text(Cow::Borrowed(text[index].as_str())),
        Data::Bytes(bytes) => {
            let field = &bytes[index * mta.size..(index + 1) * mta.size];
            match mta.code {
                Some(TypeCode::Char) => Scalar::Text(field_text(field)),
                Some(code) => decode(code, field),
                None => Scalar::Int(0),
            }
        }
    }
}

fn write_element(
    src: &Mta,
    value: &Scalar<'_>,
    dst: &Mta,
    data: &mut DataMut<'_>,
    index: usize,
    options: &TransferOptions,
) -> AdiResult<bool> {
    let from = src.code.unwrap_or(TypeCode::Byte);

    match data {
        DataMut::Text(text) => {
            text[index] = to_text(from, value);
            Ok(true)
        }
        DataMut::Bytes(bytes) => {
            let field = &mut bytes[index * dst.size..(index + 1) * dst.size];
            match dst.code {
                Some(TypeCode::Char) => {
                    let strict = from != TypeCode::Char;
                    Ok(fill_field(field, &to_text(from, value), dst.nulterm, strict))
                }
                Some(code) => encode(code, value, field, options),
                None => Err(unsupported(src, dst)),
            }
        }
    }
}
