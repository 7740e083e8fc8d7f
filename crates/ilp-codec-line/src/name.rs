//! 表名、列名与 symbol 名校验。
//!
//! 规则与服务端建表约束保持一致：
//! - 非空，且 UTF-8 字节长度不超过 [`MAX_NAME_LENGTH`]；
//! - 不得包含 `? , ' " \ / : ) ( + * % ~`、ASCII 控制字符或 U+FEFF（UTF-8 BOM）；
//! - 表名中的 `.` 不得位于首尾，也不得连续出现；
//! - 列名与 symbol 名完全禁止 `.` 与 `-`。

use std::fmt;

use crate::error::ValidationError;

/// 名称最大字节长度。
pub const MAX_NAME_LENGTH: usize = 127;

/// 名称所在位置，决定适用哪套规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// 表名。
    Table,
    /// symbol 名。
    Symbol,
    /// 列名。
    Column,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameKind::Table => "table",
            NameKind::Symbol => "symbol",
            NameKind::Column => "column",
        })
    }
}

/// 按 `kind` 对应的规则校验名称。
pub fn validate(kind: NameKind, name: &str) -> Result<(), ValidationError> {
    let reject = |reason: String| ValidationError::InvalidName {
        kind,
        name: name.to_owned(),
        reason,
    };

    if name.is_empty() {
        return Err(reject("name must not be empty".to_owned()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(reject(format!(
            "name is {} bytes long, the limit is {}",
            name.len(),
            MAX_NAME_LENGTH
        )));
    }

    let bytes = name.as_bytes();
    for (index, ch) in name.char_indices() {
        match ch {
            '?' | ',' | '\'' | '"' | '\\' | '/' | ':' | ')' | '(' | '+' | '*' | '%' | '~' => {
                return Err(reject(format!(
                    "character {ch:?} at byte {index} is not allowed"
                )));
            }
            '\u{FEFF}' => {
                return Err(reject(format!("UTF-8 BOM at byte {index} is not allowed")));
            }
            c if c.is_ascii_control() => {
                return Err(reject(format!(
                    "control character {c:?} at byte {index} is not allowed"
                )));
            }
            '.' | '-' if kind != NameKind::Table => {
                return Err(reject(format!(
                    "character {ch:?} at byte {index} is not allowed in {kind} names"
                )));
            }
            '.' => {
                let misplaced =
                    index == 0 || index == bytes.len() - 1 || bytes[index - 1] == b'.';
                if misplaced {
                    return Err(reject(format!(
                        "dot at byte {index} must not be first, last or repeated"
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
