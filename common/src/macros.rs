// Compile-time assertion on constant expressions
#[macro_export]
macro_rules! static_assert {
    ($cond:expr $(,)?) => {
        const _: () = assert!($cond);
    };
    ($cond:expr, $msg:expr $(,)?) => {
        const _: () = assert!($cond, $msg);
    };
}

// Field by field Serializer impl, fields are encoded in the listed order
#[macro_export]
macro_rules! impl_serializer {
    ($type:ident { $($field:ident),* $(,)? }) => {
        impl $crate::serializer::Serializer for $type {
            fn write(&self, writer: &mut $crate::serializer::Writer) {
                $( $crate::serializer::Serializer::write(&self.$field, writer); )*
            }

            fn read(
                reader: &mut $crate::serializer::Reader,
            ) -> Result<Self, $crate::serializer::ReaderError> {
                Ok(Self {
                    $( $field: $crate::serializer::Serializer::read(reader)?, )*
                })
            }

            fn size(&self) -> usize {
                0 $( + $crate::serializer::Serializer::size(&self.$field) )*
            }
        }
    };
}
