//! Attribute values stored in an [`Appearance`](super::Appearance).

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use glam::{DMat4, Vec4};

/// Opaque shared payload stored under an attribute key.
#[derive(Clone)]
pub struct ObjectValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ObjectValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload_type_id() == TypeId::of::<T>()
    }

    #[must_use]
    pub fn payload_type_id(&self) -> TypeId {
        Any::type_id(&*self.value)
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &ObjectValue) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object<{}>", self.type_name)
    }
}

/// Value stored under an attribute key.
///
/// Besides real values there are two sentinels:
/// - [`Inherited`](Self::Inherited): no local value, defer to the ancestors;
/// - [`Default`](Self::Default): use the consumer's default for this key, do
///   not look further up.
#[derive(Clone, Debug)]
pub enum AttributeValue {
    Inherited,
    Default,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(Arc<str>),
    Color(Vec4),
    Matrix(DMat4),
    DoubleArray(Arc<[f64]>),
    FloatArray(Arc<[f32]>),
    IntArray(Arc<[i32]>),
    Object(ObjectValue),
}

/// Type tag used for typed lookups and declared types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// Matches every real value.
    Any,
    Bool,
    Int,
    Long,
    Float,
    Double,
    Char,
    Str,
    Color,
    Matrix,
    DoubleArray,
    FloatArray,
    IntArray,
    /// An object payload of exactly this type.
    Object(TypeId),
}

impl AttributeType {
    #[must_use]
    pub fn object<T: Any>() -> Self {
        AttributeType::Object(TypeId::of::<T>())
    }
}

impl AttributeValue {
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        AttributeValue::Object(ObjectValue::new(value))
    }

    #[inline]
    #[must_use]
    pub fn is_inherited(&self) -> bool {
        matches!(self, AttributeValue::Inherited)
    }

    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, AttributeValue::Default)
    }

    #[inline]
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.is_inherited() || self.is_default()
    }

    /// Type tag of a real value, `None` for the sentinels.
    #[must_use]
    pub fn attribute_type(&self) -> Option<AttributeType> {
        Some(match self {
            AttributeValue::Inherited | AttributeValue::Default => return None,
            AttributeValue::Bool(_) => AttributeType::Bool,
            AttributeValue::Int(_) => AttributeType::Int,
            AttributeValue::Long(_) => AttributeType::Long,
            AttributeValue::Float(_) => AttributeType::Float,
            AttributeValue::Double(_) => AttributeType::Double,
            AttributeValue::Char(_) => AttributeType::Char,
            AttributeValue::Str(_) => AttributeType::Str,
            AttributeValue::Color(_) => AttributeType::Color,
            AttributeValue::Matrix(_) => AttributeType::Matrix,
            AttributeValue::DoubleArray(_) => AttributeType::DoubleArray,
            AttributeValue::FloatArray(_) => AttributeType::FloatArray,
            AttributeValue::IntArray(_) => AttributeType::IntArray,
            AttributeValue::Object(o) => AttributeType::Object(o.payload_type_id()),
        })
    }

    /// Whether this real value is an instance of `ty`. Sentinels are
    /// instances of nothing.
    #[must_use]
    pub fn is_instance_of(&self, ty: AttributeType) -> bool {
        match self.attribute_type() {
            None => false,
            Some(_) if ty == AttributeType::Any => true,
            Some(own) => own == ty,
        }
    }

    /// Reference identity, used for change detection.
    ///
    /// Sentinels are identical to themselves and shared payloads are
    /// identical when they point to the same allocation. Plain values are
    /// stored fresh on every assignment and are never identical, so
    /// assigning an equal number again still counts as a change.
    #[must_use]
    pub fn is_identical(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Inherited, AttributeValue::Inherited)
            | (AttributeValue::Default, AttributeValue::Default) => true,
            (AttributeValue::Str(a), AttributeValue::Str(b)) => Arc::ptr_eq(a, b),
            (AttributeValue::DoubleArray(a), AttributeValue::DoubleArray(b)) => Arc::ptr_eq(a, b),
            (AttributeValue::FloatArray(a), AttributeValue::FloatArray(b)) => Arc::ptr_eq(a, b),
            (AttributeValue::IntArray(a), AttributeValue::IntArray(b)) => Arc::ptr_eq(a, b),
            (AttributeValue::Object(a), AttributeValue::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    // -- Accessors --

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            AttributeValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        match self {
            AttributeValue::Char(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_color(&self) -> Option<Vec4> {
        match self {
            AttributeValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_matrix(&self) -> Option<DMat4> {
        match self {
            AttributeValue::Matrix(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            AttributeValue::Object(v) => Some(v),
            _ => None,
        }
    }
}

/// Value equality. Object payloads compare by identity.
impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        use AttributeValue as V;
        match (self, other) {
            (V::Inherited, V::Inherited) | (V::Default, V::Default) => true,
            (V::Bool(a), V::Bool(b)) => a == b,
            (V::Int(a), V::Int(b)) => a == b,
            (V::Long(a), V::Long(b)) => a == b,
            (V::Float(a), V::Float(b)) => a == b,
            (V::Double(a), V::Double(b)) => a == b,
            (V::Char(a), V::Char(b)) => a == b,
            (V::Str(a), V::Str(b)) => a == b,
            (V::Color(a), V::Color(b)) => a == b,
            (V::Matrix(a), V::Matrix(b)) => a == b,
            (V::DoubleArray(a), V::DoubleArray(b)) => a == b,
            (V::FloatArray(a), V::FloatArray(b)) => a == b,
            (V::IntArray(a), V::IntArray(b)) => a == b,
            (V::Object(a), V::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

macro_rules! impl_attribute_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    AttributeValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_attribute_value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    char => Char,
    &str => Str,
    String => Str,
    Vec4 => Color,
    DMat4 => Matrix,
    Vec<f64> => DoubleArray,
    Vec<f32> => FloatArray,
    Vec<i32> => IntArray,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_matching() {
        assert!(AttributeValue::from(1.5).is_instance_of(AttributeType::Double));
        assert!(!AttributeValue::from(1.5).is_instance_of(AttributeType::Float));
        assert!(AttributeValue::from(1.5).is_instance_of(AttributeType::Any));
        assert!(!AttributeValue::Default.is_instance_of(AttributeType::Any));

        let obj = AttributeValue::object(42_u8);
        assert!(obj.is_instance_of(AttributeType::object::<u8>()));
        assert!(!obj.is_instance_of(AttributeType::object::<u16>()));
    }

    #[test]
    fn test_identity_of_plain_values_never_holds() {
        let a = AttributeValue::from(2.0);
        let b = a.clone();
        assert_eq!(a, b);
        assert!(!a.is_identical(&b));
    }

    #[test]
    fn test_identity_of_shared_payloads() {
        let a = AttributeValue::from("name");
        assert!(a.is_identical(&a.clone()));
        assert!(!a.is_identical(&AttributeValue::from("name")));
        assert!(AttributeValue::Inherited.is_identical(&AttributeValue::Inherited));
    }
}
