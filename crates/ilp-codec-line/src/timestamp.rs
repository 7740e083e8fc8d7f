//! 指定时间戳文本校验。

use crate::error::ValidationError;

/// 校验纳秒时间戳文本：可选前导 `-`，其后至少一位 ASCII 数字，且能表示为 `i64`。
pub fn validate(value: &str) -> Result<(), ValidationError> {
    let reject = |reason| ValidationError::InvalidTimestamp {
        value: value.to_owned(),
        reason,
    };

    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() {
        return Err(reject("timestamp must contain at least one digit"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(reject("timestamp must be decimal digits only"));
    }
    if value.parse::<i64>().is_err() {
        return Err(reject("timestamp does not fit in a signed 64-bit integer"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nanosecond_text() {
        validate("1465839830100400000").expect("合法时间戳");
        validate("0").expect("零");
        validate("-1").expect("纪元前");
    }

    #[test]
    fn rejects_malformed_text() {
        for value in ["", "-", "12a", "1.5", " 1", "+1", "1e9"] {
            let err = validate(value).unwrap_err();
            assert_eq!(err.code(), "ilp.codec.invalid_timestamp", "{value:?}");
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(validate("9223372036854775808").is_err());
        validate("9223372036854775807").expect("i64 上限");
    }
}
