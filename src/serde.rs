//! Serde implementations for `VastBitmap`.
//!
//! The bitmap serializes as a sequence of `u64` values in ascending order,
//! which keeps the representation readable in self-describing formats and
//! independent of the internal container forms.

use serde::{
    de::{self, SeqAccess, Visitor},
    ser::SerializeSeq,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::VastBitmap;

impl Serialize for VastBitmap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(usize::try_from(self.len()).ok())?;
        for value in self.iter() {
            seq.serialize_element(&value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for VastBitmap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VastBitmapVisitor;

        impl<'de> Visitor<'de> for VastBitmapVisitor {
            type Value = VastBitmap;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a sequence of u64 values")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut bitmap = VastBitmap::new();
                while let Some(value) = seq.next_element::<u64>()? {
                    bitmap.insert(value);
                }
                Ok(bitmap)
            }
        }

        deserializer.deserialize_seq(VastBitmapVisitor)
    }
}
