use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayD, ArrayView1, ArrayView2, ArrayView3, Ix1, Ix2, Ix3, IxDyn};
use num_traits::{Bounded, NumCast, Zero};
use serde::{Deserialize, Serialize};

use crate::consts::ERROR_MARKER;
use crate::error::{LuminaError, Result};

/// Element type of a detector frame, named after the NumPy dtypes that
/// detector sources publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "uint16")]
    U16,
    #[serde(rename = "uint32")]
    U32,
    #[serde(rename = "uint64")]
    U64,
    #[serde(rename = "int8")]
    I8,
    #[serde(rename = "int16")]
    I16,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "int64")]
    I64,
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float64")]
    F64,
}

impl DType {
    pub const ALL: [DType; 10] = [
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::F32,
        DType::F64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    pub fn size_bytes(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Signed integer type one size class larger, used to subtract unsigned
    /// frames without wrapping. 64-bit saturates at `int64`.
    pub fn widened_signed(self) -> Option<DType> {
        match self {
            Self::U8 => Some(Self::I16),
            Self::U16 => Some(Self::I32),
            Self::U32 | Self::U64 => Some(Self::I64),
            _ => None,
        }
    }

    fn signed_of_size(bytes: usize) -> DType {
        match bytes {
            1 => Self::I8,
            2 => Self::I16,
            4 => Self::I32,
            _ => Self::I64,
        }
    }

    /// Common type of a binary arithmetic operation, following NumPy's
    /// promotion table for the kinds supported here.
    pub fn promote(self, other: DType) -> DType {
        if self == other {
            return self;
        }
        match (self.is_float(), other.is_float()) {
            (true, true) => {
                if self.size_bytes() >= other.size_bytes() {
                    self
                } else {
                    other
                }
            }
            (true, false) | (false, true) => {
                let (float, int) = if self.is_float() {
                    (self, other)
                } else {
                    (other, self)
                };
                if float == Self::F32 && int.size_bytes() <= 2 {
                    Self::F32
                } else {
                    Self::F64
                }
            }
            (false, false) => {
                if self.is_unsigned() == other.is_unsigned() {
                    if self.size_bytes() >= other.size_bytes() {
                        self
                    } else {
                        other
                    }
                } else {
                    let (unsigned, signed) = if self.is_unsigned() {
                        (self, other)
                    } else {
                        (other, self)
                    };
                    if signed.size_bytes() > unsigned.size_bytes() {
                        signed
                    } else if unsigned == Self::U64 {
                        Self::F64
                    } else {
                        Self::signed_of_size(unsigned.size_bytes() * 2)
                    }
                }
            }
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self> {
        DType::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s.trim())
            .ok_or_else(|| LuminaError::UnsupportedDtype(s.to_string()))
    }
}

/// Floating-point type used for every result that may carry NaN values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatType {
    #[default]
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
}

impl FloatType {
    pub fn dtype(self) -> DType {
        match self {
            Self::Float32 => DType::F32,
            Self::Float64 => DType::F64,
        }
    }
}

impl fmt::Display for FloatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dtype().name())
    }
}

impl FromStr for FloatType {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            other => Err(LuminaError::InvalidConfig(format!(
                "unknown float type '{other}'"
            ))),
        }
    }
}

/// Scalar element of a [`Frame`].
pub trait Pixel:
    Copy + Send + Sync + PartialOrd + Zero + Bounded + NumCast + fmt::Debug + 'static
{
    const DTYPE: DType;

    fn into_frame(array: ArrayD<Self>) -> Frame;

    fn as_f64(self) -> f64;

    /// Subtraction in the element type; integers wrap like NumPy does.
    fn diff(self, other: Self) -> Self;

    fn is_nan(self) -> bool {
        false
    }

    /// Value conversion; values that cannot be represented (NaN into an
    /// integer, out-of-range magnitudes) become zero.
    fn cast<U: Pixel>(self) -> U {
        <U as NumCast>::from(self).unwrap_or_else(U::zero)
    }

    /// Conversion from `f64` that saturates at the type's bounds.
    fn saturate(v: f64) -> Self {
        match <Self as NumCast>::from(v) {
            Some(x) => x,
            None if v > 0.0 => Self::max_value(),
            None => Self::min_value(),
        }
    }
}

macro_rules! impl_int_pixel {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl Pixel for $t {
            const DTYPE: DType = DType::$variant;

            fn into_frame(array: ArrayD<Self>) -> Frame {
                Frame::$variant(array)
            }

            fn as_f64(self) -> f64 {
                self as f64
            }

            fn diff(self, other: Self) -> Self {
                self.wrapping_sub(other)
            }
        }
    )*};
}

macro_rules! impl_float_pixel {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl Pixel for $t {
            const DTYPE: DType = DType::$variant;

            fn into_frame(array: ArrayD<Self>) -> Frame {
                Frame::$variant(array)
            }

            fn as_f64(self) -> f64 {
                self as f64
            }

            fn diff(self, other: Self) -> Self {
                self - other
            }

            fn is_nan(self) -> bool {
                <$t>::is_nan(self)
            }
        }
    )*};
}

impl_int_pixel!(
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
);
impl_float_pixel!(f32 => F32, f64 => F64);

/// A detector frame: an N-dimensional array of any supported element type.
///
/// Axis 0 is the detector x axis and axis 1 the y axis. Multi-channel frames
/// published by sources keep their channel axis first `(c, x, y)`; pseudo-RGB
/// frames produced by channel composition keep it last `(x, y, 3)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Evaluate `$body` with `$arr` bound to the typed array inside a frame.
macro_rules! with_frame {
    ($frame:expr, $arr:ident => $body:expr) => {
        match $frame {
            $crate::frame::Frame::U8($arr) => $body,
            $crate::frame::Frame::U16($arr) => $body,
            $crate::frame::Frame::U32($arr) => $body,
            $crate::frame::Frame::U64($arr) => $body,
            $crate::frame::Frame::I8($arr) => $body,
            $crate::frame::Frame::I16($arr) => $body,
            $crate::frame::Frame::I32($arr) => $body,
            $crate::frame::Frame::I64($arr) => $body,
            $crate::frame::Frame::F32($arr) => $body,
            $crate::frame::Frame::F64($arr) => $body,
        }
    };
}

/// Like [`with_frame`], re-wrapping the resulting array in the same variant.
macro_rules! map_frame {
    ($frame:expr, $arr:ident => $body:expr) => {
        match $frame {
            $crate::frame::Frame::U8($arr) => $crate::frame::Frame::U8($body),
            $crate::frame::Frame::U16($arr) => $crate::frame::Frame::U16($body),
            $crate::frame::Frame::U32($arr) => $crate::frame::Frame::U32($body),
            $crate::frame::Frame::U64($arr) => $crate::frame::Frame::U64($body),
            $crate::frame::Frame::I8($arr) => $crate::frame::Frame::I8($body),
            $crate::frame::Frame::I16($arr) => $crate::frame::Frame::I16($body),
            $crate::frame::Frame::I32($arr) => $crate::frame::Frame::I32($body),
            $crate::frame::Frame::I64($arr) => $crate::frame::Frame::I64($body),
            $crate::frame::Frame::F32($arr) => $crate::frame::Frame::F32($body),
            $crate::frame::Frame::F64($arr) => $crate::frame::Frame::F64($body),
        }
    };
}

/// Evaluate `$body` for two frames of the same element type, `$other` otherwise.
macro_rules! with_frame_pair {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, _ => $other:expr) => {
        match ($a, $b) {
            ($crate::frame::Frame::U8($x), $crate::frame::Frame::U8($y)) => $body,
            ($crate::frame::Frame::U16($x), $crate::frame::Frame::U16($y)) => $body,
            ($crate::frame::Frame::U32($x), $crate::frame::Frame::U32($y)) => $body,
            ($crate::frame::Frame::U64($x), $crate::frame::Frame::U64($y)) => $body,
            ($crate::frame::Frame::I8($x), $crate::frame::Frame::I8($y)) => $body,
            ($crate::frame::Frame::I16($x), $crate::frame::Frame::I16($y)) => $body,
            ($crate::frame::Frame::I32($x), $crate::frame::Frame::I32($y)) => $body,
            ($crate::frame::Frame::I64($x), $crate::frame::Frame::I64($y)) => $body,
            ($crate::frame::Frame::F32($x), $crate::frame::Frame::F32($y)) => $body,
            ($crate::frame::Frame::F64($x), $crate::frame::Frame::F64($y)) => $body,
            _ => $other,
        }
    };
}

pub(crate) use map_frame;
pub(crate) use with_frame;
pub(crate) use with_frame_pair;

impl Frame {
    pub fn from_array<T: Pixel>(array: ArrayD<T>) -> Self {
        T::into_frame(array)
    }

    pub fn zeros(dtype: DType, shape: &[usize]) -> Self {
        let dim = IxDyn(shape);
        match dtype {
            DType::U8 => Self::U8(ArrayD::zeros(dim)),
            DType::U16 => Self::U16(ArrayD::zeros(dim)),
            DType::U32 => Self::U32(ArrayD::zeros(dim)),
            DType::U64 => Self::U64(ArrayD::zeros(dim)),
            DType::I8 => Self::I8(ArrayD::zeros(dim)),
            DType::I16 => Self::I16(ArrayD::zeros(dim)),
            DType::I32 => Self::I32(ArrayD::zeros(dim)),
            DType::I64 => Self::I64(ArrayD::zeros(dim)),
            DType::F32 => Self::F32(ArrayD::zeros(dim)),
            DType::F64 => Self::F64(ArrayD::zeros(dim)),
        }
    }

    pub fn nan_filled(float: FloatType, shape: &[usize]) -> Self {
        let dim = IxDyn(shape);
        match float {
            FloatType::Float32 => Self::F32(ArrayD::from_elem(dim, f32::NAN)),
            FloatType::Float64 => Self::F64(ArrayD::from_elem(dim, f64::NAN)),
        }
    }

    pub fn dtype(&self) -> DType {
        fn of<T: Pixel>(_: &ArrayD<T>) -> DType {
            T::DTYPE
        }
        with_frame!(self, a => of(a))
    }

    pub fn shape(&self) -> &[usize] {
        with_frame!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        with_frame!(self, a => a.ndim())
    }

    pub fn len(&self) -> usize {
        with_frame!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every element to `dtype`.
    pub fn cast(&self, dtype: DType) -> Frame {
        with_frame!(self, a => cast_array(a, dtype))
    }

    /// Convert to `dtype`, reusing the allocation when it already matches.
    pub fn into_dtype(self, dtype: DType) -> Frame {
        if self.dtype() == dtype {
            self
        } else {
            self.cast(dtype)
        }
    }

    pub fn to_f64(&self) -> ArrayD<f64> {
        with_frame!(self, a => a.mapv(Pixel::as_f64))
    }

    /// Element values in logical (row-major) order, converted to `f64`.
    pub fn values_f64(&self) -> Vec<f64> {
        with_frame!(self, a => a.iter().map(|v| v.as_f64()).collect())
    }

    /// Re-lay the data out contiguously in row-major order.
    pub fn into_standard_layout(self) -> Frame {
        map_frame!(self, a => {
            if a.is_standard_layout() {
                a
            } else {
                a.as_standard_layout().into_owned()
            }
        })
    }

    pub fn into_shape(self, shape: &[usize]) -> Result<Frame> {
        let found = self.shape().to_vec();
        let mismatch = || LuminaError::ShapeMismatch {
            expected: shape.to_vec(),
            found: found.clone(),
        };
        Ok(map_frame!(self.into_standard_layout(), a => {
            a.into_shape_with_order(IxDyn(shape)).map_err(|_| mismatch())?
        }))
    }
}

fn cast_array<T: Pixel>(a: &ArrayD<T>, dtype: DType) -> Frame {
    match dtype {
        DType::U8 => Frame::U8(a.mapv(|v| v.cast::<u8>())),
        DType::U16 => Frame::U16(a.mapv(|v| v.cast::<u16>())),
        DType::U32 => Frame::U32(a.mapv(|v| v.cast::<u32>())),
        DType::U64 => Frame::U64(a.mapv(|v| v.cast::<u64>())),
        DType::I8 => Frame::I8(a.mapv(|v| v.cast::<i8>())),
        DType::I16 => Frame::I16(a.mapv(|v| v.cast::<i16>())),
        DType::I32 => Frame::I32(a.mapv(|v| v.cast::<i32>())),
        DType::I64 => Frame::I64(a.mapv(|v| v.cast::<i64>())),
        DType::F32 => Frame::F32(a.mapv(|v| v.cast::<f32>())),
        DType::F64 => Frame::F64(a.mapv(|v| v.cast::<f64>())),
    }
}

/// Rank-discriminated view of a frame's array.
pub enum Ranked<'a, T> {
    Vector(ArrayView1<'a, T>),
    Image(ArrayView2<'a, T>),
    Stack(ArrayView3<'a, T>),
}

pub fn ranked<T>(array: &ArrayD<T>) -> Result<Ranked<'_, T>> {
    let rank = array.ndim();
    let unsupported = |_| LuminaError::UnsupportedRank(rank);
    match rank {
        1 => Ok(Ranked::Vector(
            array.view().into_dimensionality::<Ix1>().map_err(unsupported)?,
        )),
        2 => Ok(Ranked::Image(
            array.view().into_dimensionality::<Ix2>().map_err(unsupported)?,
        )),
        3 => Ok(Ranked::Stack(
            array.view().into_dimensionality::<Ix3>().map_err(unsupported)?,
        )),
        _ => Err(LuminaError::UnsupportedRank(rank)),
    }
}

/// What a source delivered: pixels, or the text of an error it hit.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Pixels(Frame),
    Message(String),
}

impl Payload {
    pub fn pixels(&self) -> Option<&Frame> {
        match self {
            Self::Pixels(frame) => Some(frame),
            Self::Message(_) => None,
        }
    }

    pub fn into_pixels(self) -> Option<Frame> {
        match self {
            Self::Pixels(frame) => Some(frame),
            Self::Message(_) => None,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Self::Pixels(frame) => format!("<{} frame {:?}>", frame.dtype(), frame.shape()),
            Self::Message(text) => text.clone(),
        }
    }
}

/// One source's contribution to the current acquisition tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartialFrame {
    pub name: Option<String>,
    pub payload: Option<Payload>,
    /// JSON object with frame metadata.
    pub metadata: Option<String>,
    pub x_offset: Option<usize>,
    pub y_offset: Option<usize>,
}

impl PartialFrame {
    pub fn new(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            name: Some(name.into()),
            payload: Some(Payload::Pixels(frame)),
            ..Self::default()
        }
    }

    /// A source that reported an error instead of data.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            name: Some(ERROR_MARKER.to_string()),
            payload: Some(Payload::Message(message.into())),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn at(mut self, x_offset: Option<usize>, y_offset: Option<usize>) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.as_deref().is_some_and(|m| !m.is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.name.as_deref() == Some(ERROR_MARKER)
    }

    pub fn pixels(&self) -> Option<&Frame> {
        self.payload.as_ref().and_then(Payload::pixels)
    }
}

/// The logical raw frame of one acquisition tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergedFrame {
    pub name: Option<String>,
    pub payload: Option<Payload>,
    pub metadata: Option<String>,
}

impl MergedFrame {
    pub fn is_error(&self) -> bool {
        self.name.as_deref() == Some(ERROR_MARKER)
    }

    /// Nothing new arrived this tick.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.payload.is_none() && self.metadata.is_none()
    }

    pub fn pixels(&self) -> Option<&Frame> {
        self.payload.as_ref().and_then(Payload::pixels)
    }
}
