//! Text encoders for the assembled module script

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use modbuild_config::Encoding;

/// Encode `text` into the bytes written to disk.
///
/// `Unicode` and `Utf32` are little endian and start with a byte order mark;
/// `Utf8` does not.
pub fn encode(text: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 => text.as_bytes().to_vec(),
        Encoding::Ascii => text
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect(),
        Encoding::Unicode => {
            let mut bytes = vec![0xFF, 0xFE];
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            bytes
        }
        Encoding::Utf32 => {
            let mut bytes = vec![0xFF, 0xFE, 0x00, 0x00];
            for c in text.chars() {
                bytes.extend_from_slice(&(c as u32).to_le_bytes());
            }
            bytes
        }
        Encoding::Utf7 => encode_utf7(text).into_bytes(),
    }
}

/// RFC 2152 directly encoded characters (set D plus whitespace)
fn is_utf7_direct(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '\'' | '(' | ')' | ',' | '-' | '.' | '/' | ':' | '?' | ' ' | '\t' | '\r' | '\n'
        )
}

fn encode_utf7(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut shifted: Vec<u8> = Vec::new();

    for c in text.chars() {
        if is_utf7_direct(c) || c == '+' {
            flush_utf7(&mut out, &mut shifted);
            if c == '+' {
                out.push_str("+-");
            } else {
                out.push(c);
            }
            continue;
        }

        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
            shifted.extend_from_slice(&unit.to_be_bytes());
        }
    }

    flush_utf7(&mut out, &mut shifted);
    out
}

/// Close a pending base64 run. The explicit `-` terminator keeps the run
/// unambiguous whatever character follows.
fn flush_utf7(out: &mut String, shifted: &mut Vec<u8>) {
    if shifted.is_empty() {
        return;
    }
    out.push('+');
    out.push_str(&STANDARD_NO_PAD.encode(&shifted));
    out.push('-');
    shifted.clear();
}
