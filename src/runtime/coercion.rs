//! Floating point to integer narrowing with the managed runtime's rules:
//! NaN becomes zero, out-of-range values saturate, everything else truncates
//! toward zero.
//!
//! The 32-bit conversions compare against the bounds narrowed to `f32`
//! (`2^31` and `-2^31`), as the reference runtime does.

macro_rules! narrowing {
    ($($from:ident: $from_ty:ty => $to:ident: $to_ty:ty, bound as $bound_ty:ty;)*) => {
        paste::paste! {
            $(
                #[allow(clippy::unnecessary_cast)]
                pub fn [<$from _to_ $to>](val: $from_ty) -> $to_ty {
                    if val.is_nan() {
                        0
                    } else if val > (<$to_ty>::MAX as $bound_ty) as $from_ty {
                        <$to_ty>::MAX
                    } else if val < (<$to_ty>::MIN as $bound_ty) as $from_ty {
                        <$to_ty>::MIN
                    } else {
                        val as $to_ty
                    }
                }
            )*
        }
    };
}

narrowing! {
    double: f64 => long: i64, bound as f64;
    float: f32 => long: i64, bound as f32;
    double: f64 => int: i32, bound as f32;
    float: f32 => int: i32, bound as f32;
}

pub fn bits_to_double(bits: u64) -> f64 {
    f64::from_bits(bits)
}

pub fn bits_to_float(bits: u32) -> f32 {
    f32::from_bits(bits)
}

pub fn long_to_double(val: i64) -> f64 {
    val as f64
}

pub fn long_to_float(val: i64) -> f32 {
    val as f32
}
