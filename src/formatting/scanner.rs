pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

pub(super) fn is_escaped_open(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'{') && bytes.get(idx + 1) == Some(&b'{')
}

pub(super) fn is_escaped_close(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'}') && bytes.get(idx + 1) == Some(&b'}')
}
