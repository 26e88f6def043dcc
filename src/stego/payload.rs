use crate::{errors, Result};

/// Leading magic of a wrapped payload.
pub const MAGIC: &[u8; 4] = b"MP3S";

/// Wrapped-payload header length: magic (4) + length (4) + extension (8).
pub const HEADER_SIZE: usize = 16;

/// Pulls the extension out of a source file name: the basename's last dotted
/// suffix, lower-cased. Returns an empty string when there is none.
pub fn extension_from_name(name: Option<&str>) -> String {
    let name = match name {
        Some(n) if !n.is_empty() => n,
        _ => return String::new(),
    };
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);
    match base.rfind('.') {
        Some(dot) => base[dot + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Rejects extensions the 8-byte header field cannot represent faithfully.
pub fn validate_extension(ext: &str) -> Result<()> {
    if ext.len() > 8 {
        return errors::invalid_input(format!("extension '{}' exceeds 8 bytes", ext));
    }
    for ch in ext.chars() {
        if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
            return errors::invalid_input(format!("extension contains unsupported char: {:?}", ch));
        }
    }
    Ok(())
}

/// Prepends the transport header: `MAGIC | length (u32 BE) | ext (8 bytes,
/// NUL-padded) | payload`. Non-ASCII extension bytes are dropped and the
/// rest truncated to 8, whatever validation the caller did before.
pub fn wrap_payload(payload: &[u8], ext: &str) -> Result<Vec<u8>> {
    if payload.len() > u32::max_value() as usize {
        return errors::invalid_input(format!("payload of {} bytes is too large", payload.len()));
    }

    let mut ext_bytes: Vec<u8> = ext
        .bytes()
        .filter(|b| b.is_ascii())
        .take(8)
        .collect();
    ext_bytes.resize(8, 0);

    let mut wrapped = Vec::with_capacity(HEADER_SIZE + payload.len());
    wrapped.extend_from_slice(MAGIC);
    wrapped.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    wrapped.extend_from_slice(&ext_bytes);
    wrapped.extend_from_slice(payload);
    Ok(wrapped)
}

/// The decoded transport header of a wrapped payload.
pub struct PayloadHeader {
    pub magic_ok: bool,
    /// header plus body length in bytes
    pub total_bytes: usize,
    pub ext: String,
}

/// Decodes the first [`HEADER_SIZE`] bytes of a recovered bit stream.
/// The caller decides what a bad magic means.
pub fn parse_payload_header(buf: &[u8]) -> PayloadHeader {
    debug_assert!(buf.len() >= HEADER_SIZE);

    let magic_ok = &buf[..4] == MAGIC;
    let mut length = [0u8; 4];
    length.copy_from_slice(&buf[4..8]);
    let payload_len = u32::from_be_bytes(length) as usize;

    let ext_raw: &[u8] = {
        let mut end = 16;
        while end > 8 && buf[end - 1] == 0 {
            end -= 1;
        }
        &buf[8..end]
    };
    let ext = if ext_raw.is_ascii() {
        String::from_utf8_lossy(ext_raw).into_owned()
    } else {
        String::new()
    };

    PayloadHeader {
        magic_ok,
        total_bytes: HEADER_SIZE + payload_len,
        ext,
    }
}

/// Repeating-key XOR over arbitrary bytes. An absent or empty key returns
/// the data unchanged. Applying the same key twice is the identity, which is
/// the whole decryption story.
pub fn vigenere_xor(data: &[u8], key: Option<&str>) -> Vec<u8> {
    let key = match key {
        Some(k) if !k.is_empty() => k.as_bytes(),
        _ => return data.to_vec(),
    };
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}
