use aes::Aes128;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

/// Streaming contract from spec.md §4.3: applying the keystream to a window
/// of a larger logical stream must not depend on what came before it, as
/// long as `absolute_offset` is a multiple of the AES block size (16 bytes).
/// This is what lets the crypt-copy engine (`cryptcopy`) process a content
/// in fixed-size buffers without holding any AES state across calls.
///
/// `iv_base` is the 16-byte big-endian counter value that corresponds to
/// `absolute_offset == 0`; a fresh cipher is instantiated with `iv_base`
/// advanced by `absolute_offset / 16` blocks (as a 128-bit big-endian add),
/// the same trick CIA/NCCH readers upstream use to resume mid-stream.
pub fn apply_ctr_keystream(buf: &mut [u8], absolute_offset: u64, key: &[u8; 16], iv_base: &[u8; 16]) {
    assert_eq!(
        absolute_offset % 16,
        0,
        "CTR keystream windows must start on a 16-byte boundary"
    );

    let block_offset = (absolute_offset / 16) as u128;
    let counter = u128::from_be_bytes(*iv_base).wrapping_add(block_offset);
    let iv = counter.to_be_bytes();

    let mut cipher = Ctr128BE::<Aes128>::new(key.into(), (&iv).into());
    cipher.apply_keystream(buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windowed_apply_matches_one_shot() {
        let key = [0x5Au8; 16];
        let iv = [0u8; 16];
        let mut plain = vec![0u8; 64];
        for (i, b) in plain.iter_mut().enumerate() {
            *b = i as u8;
        }

        let mut one_shot = plain.clone();
        apply_ctr_keystream(&mut one_shot, 0, &key, &iv);

        let mut windowed = plain.clone();
        apply_ctr_keystream(&mut windowed[0..32], 0, &key, &iv);
        apply_ctr_keystream(&mut windowed[32..64], 32, &key, &iv);

        assert_eq!(one_shot, windowed);
    }

    #[test]
    fn decrypt_after_encrypt_is_identity() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let original = b"streaming content test data!!!!".to_vec();

        let mut encrypted = original.clone();
        apply_ctr_keystream(&mut encrypted, 0, &key, &iv);
        assert_ne!(encrypted, original);

        let mut decrypted = encrypted.clone();
        apply_ctr_keystream(&mut decrypted, 0, &key, &iv);
        assert_eq!(decrypted, original);
    }

    #[test]
    #[should_panic]
    fn unaligned_offset_panics() {
        let key = [0u8; 16];
        let iv = [0u8; 16];
        let mut buf = vec![0u8; 16];
        apply_ctr_keystream(&mut buf, 3, &key, &iv);
    }
}
