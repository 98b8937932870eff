//! Typed per-vertex attribute storage.
//!
//! This module provides:
//! - [`ElementType`] - Closed set of numeric element types an attribute can hold
//! - [`BufferData`] - A typed array tagged with its element type
//! - [`AttributeBuffer`] - Typed data plus item size and normalization flag

use serde::{Deserialize, Serialize};

/// Numeric element type of an attribute buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// 32-bit float.
    Float32,
    /// 8-bit signed integer.
    Int8,
    /// 8-bit unsigned integer.
    Uint8,
    /// 16-bit signed integer.
    Int16,
    /// 16-bit unsigned integer.
    Uint16,
    /// 32-bit signed integer.
    Int32,
    /// 32-bit unsigned integer.
    Uint32,
}

impl ElementType {
    /// Get the size in bytes of one element.
    pub fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Float32 | Self::Int32 | Self::Uint32 => 4,
        }
    }

    /// Check if this is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32)
    }

    /// Largest representable value, used to map normalized integers to `[-1, 1]` / `[0, 1]`.
    fn normalization_scale(&self) -> f64 {
        match self {
            Self::Float32 => 1.0,
            Self::Int8 => i8::MAX as f64,
            Self::Uint8 => u8::MAX as f64,
            Self::Int16 => i16::MAX as f64,
            Self::Uint16 => u16::MAX as f64,
            Self::Int32 => i32::MAX as f64,
            Self::Uint32 => u32::MAX as f64,
        }
    }

    fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32)
    }
}

/// Typed array backing an [`AttributeBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData {
    Float32(Vec<f32>),
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
}

/// Evaluate `$body` with `$v` bound to the inner vector, whatever its element type.
macro_rules! with_data {
    ($data:expr, |$v:ident| $body:expr) => {
        match $data {
            BufferData::Float32($v) => $body,
            BufferData::Int8($v) => $body,
            BufferData::Uint8($v) => $body,
            BufferData::Int16($v) => $body,
            BufferData::Uint16($v) => $body,
            BufferData::Int32($v) => $body,
            BufferData::Uint32($v) => $body,
        }
    };
}

impl BufferData {
    /// Create an empty array of the given element type.
    pub fn with_capacity(element_type: ElementType, capacity: usize) -> Self {
        match element_type {
            ElementType::Float32 => Self::Float32(Vec::with_capacity(capacity)),
            ElementType::Int8 => Self::Int8(Vec::with_capacity(capacity)),
            ElementType::Uint8 => Self::Uint8(Vec::with_capacity(capacity)),
            ElementType::Int16 => Self::Int16(Vec::with_capacity(capacity)),
            ElementType::Uint16 => Self::Uint16(Vec::with_capacity(capacity)),
            ElementType::Int32 => Self::Int32(Vec::with_capacity(capacity)),
            ElementType::Uint32 => Self::Uint32(Vec::with_capacity(capacity)),
        }
    }

    /// Get the element type tag.
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Float32(_) => ElementType::Float32,
            Self::Int8(_) => ElementType::Int8,
            Self::Uint8(_) => ElementType::Uint8,
            Self::Int16(_) => ElementType::Int16,
            Self::Uint16(_) => ElementType::Uint16,
            Self::Int32(_) => ElementType::Int32,
            Self::Uint32(_) => ElementType::Uint32,
        }
    }

    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        with_data!(self, |v| v.len())
    }

    /// Check if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one element widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        with_data!(self, |v| v.get(index).map(|&x| x as f64))
    }

    /// Overwrite one element. Integer targets saturate.
    pub fn set(&mut self, index: usize, value: f64) {
        with_data!(self, |v| {
            if let Some(slot) = v.get_mut(index) {
                *slot = value as _;
            }
        })
    }

    /// Append `len` elements of `src` starting at `start`.
    ///
    /// Both arrays must share the same element type; returns `false` (and
    /// appends nothing) otherwise.
    pub fn extend_from(&mut self, src: &BufferData, start: usize, len: usize) -> bool {
        let end = start + len;
        match (self, src) {
            (Self::Float32(d), Self::Float32(s)) => d.extend_from_slice(&s[start..end]),
            (Self::Int8(d), Self::Int8(s)) => d.extend_from_slice(&s[start..end]),
            (Self::Uint8(d), Self::Uint8(s)) => d.extend_from_slice(&s[start..end]),
            (Self::Int16(d), Self::Int16(s)) => d.extend_from_slice(&s[start..end]),
            (Self::Uint16(d), Self::Uint16(s)) => d.extend_from_slice(&s[start..end]),
            (Self::Int32(d), Self::Int32(s)) => d.extend_from_slice(&s[start..end]),
            (Self::Uint32(d), Self::Uint32(s)) => d.extend_from_slice(&s[start..end]),
            _ => return false,
        }
        true
    }

    /// View the raw bytes, e.g. for upload to a GPU buffer.
    pub fn as_bytes(&self) -> &[u8] {
        with_data!(self, |v| bytemuck::cast_slice(v.as_slice()))
    }
}

/// A named, typed per-vertex attribute.
///
/// Each vertex owns `item_size` consecutive elements. When `normalized` is set,
/// integer data is interpreted as fixed-point in `[0, 1]` (unsigned) or
/// `[-1, 1]` (signed); [`get`](Self::get) and [`set`](Self::set) work in that
/// interpreted space while [`raw`](Self::raw) returns the stored number.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBuffer {
    /// Optional attribute name (morph targets use it to carry the target name).
    pub name: Option<String>,
    data: BufferData,
    item_size: usize,
    normalized: bool,
}

impl AttributeBuffer {
    /// Create a new attribute over `data`, grouped in items of `item_size`.
    pub fn new(data: BufferData, item_size: usize) -> Self {
        Self {
            name: None,
            data,
            item_size,
            normalized: false,
        }
    }

    /// Convenience constructor for `f32` data.
    pub fn from_f32(data: Vec<f32>, item_size: usize) -> Self {
        Self::new(BufferData::Float32(data), item_size)
    }

    /// Convenience constructor for `u16` data.
    pub fn from_u16(data: Vec<u16>, item_size: usize) -> Self {
        Self::new(BufferData::Uint16(data), item_size)
    }

    /// Convenience constructor for `u8` data.
    pub fn from_u8(data: Vec<u8>, item_size: usize) -> Self {
        Self::new(BufferData::Uint8(data), item_size)
    }

    /// Set the normalization flag.
    #[must_use]
    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Set the attribute name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// An empty attribute with the same element type, item size and
    /// normalization, with room for `capacity` items. The name is not carried.
    pub fn empty_like(&self, capacity: usize) -> Self {
        Self {
            name: None,
            data: BufferData::with_capacity(
                self.data.element_type(),
                capacity * self.item_size,
            ),
            item_size: self.item_size,
            normalized: self.normalized,
        }
    }

    /// Get the typed data.
    pub fn data(&self) -> &BufferData {
        &self.data
    }

    /// Get the element type.
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Number of components per item.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Whether integer data is normalized.
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// Number of items (vertices).
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    /// Check if the attribute holds no complete item.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Stored value of component `component` of item `index`.
    pub fn raw(&self, index: usize, component: usize) -> Option<f64> {
        if component >= self.item_size {
            return None;
        }
        self.data.get(index * self.item_size + component)
    }

    /// Component value with normalization applied.
    pub fn get(&self, index: usize, component: usize) -> Option<f64> {
        let value = self.raw(index, component)?;
        if !self.normalized {
            return Some(value);
        }
        let ty = self.element_type();
        let value = value / ty.normalization_scale();
        Some(if ty.is_signed() { value.max(-1.0) } else { value })
    }

    /// Write a component value, re-applying normalization for integer data.
    pub fn set(&mut self, index: usize, component: usize, value: f64) {
        if component >= self.item_size {
            return;
        }
        let ty = self.element_type();
        let stored = if self.normalized && !ty.is_float() {
            (value * ty.normalization_scale()).round()
        } else if ty.is_float() {
            value
        } else {
            value.round()
        };
        self.data.set(index * self.item_size + component, stored);
    }

    /// Append item `index` of `src` to this attribute, element for element.
    ///
    /// Returns `false` if the source item is out of range or the layouts differ.
    pub fn push_item_from(&mut self, src: &AttributeBuffer, index: usize) -> bool {
        if src.item_size != self.item_size || index >= src.count() {
            return false;
        }
        self.data
            .extend_from(&src.data, index * src.item_size, src.item_size)
    }

    /// Size of the stored data in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len() * self.element_type().size()
    }
}
