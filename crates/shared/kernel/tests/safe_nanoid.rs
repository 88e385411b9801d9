use fauna_kernel::SAFE_ALPHABET;
use fauna_kernel::safe_nanoid;
use fauna_kernel::security::resource::ResourceGuard;

#[test]
fn generates_expected_length_and_charset() {
    let id = safe_nanoid!();
    assert_eq!(id.len(), 12);

    for ch in id.chars() {
        assert!(SAFE_ALPHABET.contains(&ch), "unexpected character in nanoid: {ch}");
    }
}

#[test]
fn custom_length() {
    let id = safe_nanoid!(20);
    assert_eq!(id.len(), 20);
}

#[test]
fn generated_ids_pass_the_guard() {
    for _ in 0..32 {
        let id = safe_nanoid!();
        assert_eq!(ResourceGuard::verify(&id, "id").expect("generated id is valid"), id);
    }
}
