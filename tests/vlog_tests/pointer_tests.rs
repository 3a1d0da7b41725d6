//! Tests for the value pointer codec

use vlogkv::vlog::Pointer;

#[test]
fn test_layout_is_file_number_then_offset() {
    let pointer = Pointer::new(0x0102_0304_0506_0708, 0x1122);
    let bytes = pointer.to_bytes();

    assert_eq!(bytes.len(), Pointer::ENCODED_LEN);
    assert_eq!(&bytes[0..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
    assert_eq!(&bytes[8..16], &[0x22, 0x11, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_decode() {
    let pointer = Pointer::new(3, 32768);
    assert_eq!(Pointer::from_bytes(&pointer.to_bytes()).unwrap(), pointer);

    let max = Pointer::new(u64::MAX, u64::MAX);
    assert_eq!(Pointer::from_bytes(&max.to_bytes()).unwrap(), max);
}

#[test]
fn test_wrong_length_is_corruption() {
    for len in [0, 8, 15, 17, 32] {
        let err = Pointer::from_bytes(&vec![0u8; len]).unwrap_err();
        assert!(err.is_corruption(), "length {}", len);
    }
}

#[test]
fn test_display() {
    assert_eq!(Pointer::new(2, 100).to_string(), "2@100");
}
