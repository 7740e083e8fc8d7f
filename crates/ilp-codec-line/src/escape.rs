//! 字段转义。
//!
//! 两种上下文共用一套规则，只在三组字符上有差别：
//!
//! | 字节            | `Unquoted`（名称、symbol 值） | `Quoted`（字符串列） |
//! |-----------------|------------------------------|----------------------|
//! | 空格 `,` `=`    | 加反斜杠                      | 原样                 |
//! | `"`             | 原样                          | 加反斜杠             |
//! | `\n` `\r` `\\`  | 加反斜杠                      | 加反斜杠             |
//!
//! 所有需要转义的字节都不大于 `\\`（0x5C），UTF-8 多字节序列的每个字节都 ≥ 0x80，
//! 因此逐字节扫描时大于 `\\` 的字节可以直接原样输出。

use ilp_buffer::RowBuffer;

const BACKSLASH: u8 = b'\\';
const QUOTE: u8 = b'"';

/// 转义上下文。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    /// 表名、列名、symbol 名与 symbol 值，不加引号。
    Unquoted,
    /// 字符串列值，两侧加双引号。
    Quoted,
}

/// 判断某字节在给定上下文中是否需要前置反斜杠。
#[inline]
pub fn must_escape(byte: u8, mode: EscapeMode) -> bool {
    if byte > BACKSLASH {
        return false;
    }
    match byte {
        b'\n' | b'\r' | BACKSLASH => true,
        QUOTE => mode == EscapeMode::Quoted,
        b' ' | b',' | b'=' => mode == EscapeMode::Unquoted,
        _ => false,
    }
}

/// 计算 `value` 转义后写入缓冲所需的字节数，`Quoted` 包含两侧引号。
pub fn escaped_len(value: &[u8], mode: EscapeMode) -> usize {
    let escapes = value.iter().filter(|b| must_escape(**b, mode)).count();
    let quotes = match mode {
        EscapeMode::Quoted => 2,
        EscapeMode::Unquoted => 0,
    };
    value.len() + escapes + quotes
}

/// 把转义后的 `value` 写入缓冲。
///
/// 调用方必须先为 [`escaped_len`] 返回的长度预留容量。
pub fn write_escaped(buffer: &mut RowBuffer, value: &[u8], mode: EscapeMode) {
    if mode == EscapeMode::Quoted {
        buffer.write_byte(QUOTE);
    }

    let mut start = 0;
    for (index, byte) in value.iter().enumerate() {
        if must_escape(*byte, mode) {
            buffer.write(&value[start..index]);
            buffer.write_byte(BACKSLASH);
            start = index;
        }
    }
    buffer.write(&value[start..]);

    if mode == EscapeMode::Quoted {
        buffer.write_byte(QUOTE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &str, mode: EscapeMode) -> Vec<u8> {
        let mut buffer = RowBuffer::with_capacity(4).expect("分配缓冲");
        let len = escaped_len(value.as_bytes(), mode);
        buffer.ensure_capacity(len).expect("扩容成功");
        write_escaped(&mut buffer, value.as_bytes(), mode);
        assert_eq!(buffer.position(), len);
        buffer.as_bytes().to_vec()
    }

    #[test]
    fn unquoted_escapes_separators() {
        assert_eq!(encode("a b,c=d", EscapeMode::Unquoted), b"a\\ b\\,c\\=d");
    }

    #[test]
    fn unquoted_leaves_double_quote() {
        assert_eq!(encode("say \"hi\"", EscapeMode::Unquoted), b"say\\ \"hi\"");
    }

    #[test]
    fn quoted_escapes_only_quote_and_line_breaks() {
        assert_eq!(
            encode("say \"hi\"", EscapeMode::Quoted),
            b"\"say \\\"hi\\\"\""
        );
        assert_eq!(encode("a,b=c d", EscapeMode::Quoted), b"\"a,b=c d\"");
        assert_eq!(encode("x\ny\rz", EscapeMode::Quoted), b"\"x\\\ny\\\rz\"");
    }

    #[test]
    fn backslash_is_doubled_in_both_modes() {
        assert_eq!(encode("a\\b", EscapeMode::Unquoted), b"a\\\\b");
        assert_eq!(encode("a\\b", EscapeMode::Quoted), b"\"a\\\\b\"");
    }

    #[test]
    fn multibyte_characters_pass_through() {
        assert_eq!(
            encode("温度 Zürich", EscapeMode::Unquoted),
            "温度\\ Zürich".as_bytes()
        );
    }

    #[test]
    fn empty_quoted_value_is_two_quotes() {
        assert_eq!(encode("", EscapeMode::Quoted), b"\"\"");
    }
}
