//! Element types for umbra buffers.
//!
//! A buffer is either a flat array of scalars or a 2D image whose texels are
//! derived from a scalar element type. The image variant carries its layout
//! (`[height, width]`) so allocators can size the backing texture without any
//! out-of-band metadata.

pub mod ext;

/// Scalar data types (base numeric types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray)]
pub enum ScalarDType {
    Bool,

    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,

    Float16,
    BFloat16,
    Float32,
    Float64,
}

impl ScalarDType {
    /// Width of one element in bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }
}

/// Data type of a device buffer: flat scalar storage or a 2D image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DType {
    /// Scalar type (single value).
    Scalar(ScalarDType),

    /// 2D image with `shape == [height, width]`, texels derived from `base`.
    Image { base: ScalarDType, shape: Vec<usize> },
}

impl From<ScalarDType> for DType {
    fn from(scalar: ScalarDType) -> Self {
        Self::Scalar(scalar)
    }
}

impl DType {
    /// Create a 2D image type.
    pub fn image(base: ScalarDType, height: usize, width: usize) -> Self {
        Self::Image { base, shape: vec![height, width] }
    }

    /// Get the base scalar type.
    pub fn base(&self) -> ScalarDType {
        match self {
            Self::Scalar(s) => *s,
            Self::Image { base, .. } => *base,
        }
    }

    /// Width of one element in bytes. For images this is the width of a
    /// single texel channel, which drives the image format selection.
    pub fn bytes(&self) -> usize {
        self.base().bytes()
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}
