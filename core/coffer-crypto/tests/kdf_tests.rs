//! PBKDF2-HMAC-SHA256 reference vectors and derivation behavior.
//!
//! Vectors are the widely published SHA-256 analogues of the RFC 6070
//! PBKDF2 test set (password/salt, c = 1, 2, 4096).

use coffer_crypto::{derive_key, derive_key_bytes, KdfParams, Salt};

fn check_vector(password: &[u8], salt: &[u8], iterations: u32, expected_hex: &str) {
    let expected = hex::decode(expected_hex).unwrap();
    let okm = derive_key_bytes(password, salt, iterations, expected.len()).unwrap();
    assert_eq!(okm.as_slice(), expected.as_slice());
}

#[test]
fn vector_one_iteration() {
    check_vector(
        b"password",
        b"salt",
        1,
        "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b",
    );
}

#[test]
fn vector_two_iterations() {
    check_vector(
        b"password",
        b"salt",
        2,
        "ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43",
    );
}

#[test]
fn vector_4096_iterations() {
    check_vector(
        b"password",
        b"salt",
        4096,
        "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a",
    );
}

#[test]
fn vector_long_password_and_salt_40_byte_output() {
    check_vector(
        b"passwordPASSWORDpassword",
        b"saltSALTsaltSALTsaltSALTsaltSALTsalt",
        4096,
        "348c89dbcbd32b2f32d814b8116e84cf2b17347ebc1800181c4e2a1fb8dd53e1c635518c7dac47e9",
    );
}

#[test]
fn derive_key_matches_general_form() {
    let salt = Salt::from_bytes(*b"0123456789abcdef");
    let params = KdfParams { iterations: 100 };

    let key = derive_key(b"correct horse", &salt, &params).unwrap();
    let okm = derive_key_bytes(b"correct horse", salt.as_bytes(), 100, 32).unwrap();
    assert_eq!(key.as_bytes().as_slice(), okm.as_slice());
}

#[test]
fn iteration_count_changes_output() {
    let salt = Salt::from_bytes([9u8; 16]);
    let a = derive_key(b"pw", &salt, &KdfParams { iterations: 100 }).unwrap();
    let b = derive_key(b"pw", &salt, &KdfParams { iterations: 101 }).unwrap();
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test]
fn empty_password_is_allowed() {
    // Any-length passwords are accepted; only the parameters are gated.
    let okm = derive_key_bytes(b"", b"salt", 1, 32).unwrap();
    assert_eq!(okm.len(), 32);
}

#[test]
fn output_length_is_respected() {
    for len in [1usize, 16, 31, 32, 33, 64, 100] {
        let okm = derive_key_bytes(b"pw", b"salt", 1, len).unwrap();
        assert_eq!(okm.len(), len);
    }
}

#[test]
fn truncated_output_is_prefix_of_longer_output() {
    // PBKDF2 truncates the block stream, so shorter outputs are prefixes.
    let short = derive_key_bytes(b"pw", b"salt", 2, 16).unwrap();
    let long = derive_key_bytes(b"pw", b"salt", 2, 48).unwrap();
    assert_eq!(short.as_slice(), &long[..16]);
}
