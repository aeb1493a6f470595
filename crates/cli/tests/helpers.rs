use stackcheck::{parse_address_list, sha256_hex};

#[test]
fn parse_address_list_accepts_commas_and_spaces() {
    let addrs = parse_address_list("0x401010, 0x402020 4096,,").unwrap();
    assert_eq!(addrs, vec![0x401010, 0x402020, 4096]);
    assert!(parse_address_list("").unwrap().is_empty());
}

#[test]
fn parse_address_list_reports_bad_entries() {
    let err = parse_address_list("0x10,0xnope").unwrap_err();
    assert!(err.to_string().contains("0xnope"), "unexpected error: {err}");
}

#[test]
fn sha256_hex_hashes_contents() {
    assert_eq!(sha256_hex(b""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    assert_eq!(sha256_hex(b"abc").len(), 64);
    assert_ne!(sha256_hex(b"abc"), sha256_hex(b"abd"));
}
