use std::borrow::Cow;
use std::fmt;

/// 可写入整数列或时间戳列的数值。
///
/// 整数类型直接转换；浮点数必须有限、无小数部分且落在 `i64` 范围内，否则返回 `None`，
/// 由编码器转换为 [`ValidationError::NotIntegral`](crate::ValidationError::NotIntegral)。
pub trait IntegralValue: Copy + fmt::Display {
    /// 转换为 `i64`，无法精确表示时返回 `None`。
    fn to_i64(self) -> Option<i64>;
}

macro_rules! lossless_integral {
    ($($ty:ty),*) => {
        $(
            impl IntegralValue for $ty {
                #[inline]
                fn to_i64(self) -> Option<i64> {
                    Some(i64::from(self))
                }
            }
        )*
    };
}

macro_rules! checked_integral {
    ($($ty:ty),*) => {
        $(
            impl IntegralValue for $ty {
                #[inline]
                fn to_i64(self) -> Option<i64> {
                    i64::try_from(self).ok()
                }
            }
        )*
    };
}

lossless_integral!(i8, i16, i32, i64, u8, u16, u32);
checked_integral!(isize, usize, u64, i128, u128);

// 2^63，`i64::MAX as f64` 会向上取整到这个值，因此上界用严格小于。
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl IntegralValue for f64 {
    fn to_i64(self) -> Option<i64> {
        if self.is_finite() && self.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&self) {
            Some(self as i64)
        } else {
            None
        }
    }
}

impl IntegralValue for f32 {
    fn to_i64(self) -> Option<i64> {
        f64::from(self).to_i64()
    }
}

/// 浮点列的文本表示。
///
/// 有限值使用最短可往返的十进制表示，`23.5` 写作 `23.5`，`1.0` 写作 `1`；
/// 正负无穷与 NaN 分别写作 `Infinity`、`-Infinity`、`NaN`。
pub fn format_float(value: f64) -> Cow<'static, str> {
    if value.is_nan() {
        Cow::Borrowed("NaN")
    } else if value == f64::INFINITY {
        Cow::Borrowed("Infinity")
    } else if value == f64::NEG_INFINITY {
        Cow::Borrowed("-Infinity")
    } else {
        Cow::Owned(value.to_string())
    }
}
