use soroban_sdk::{crypto::Hash, xdr::ToXdr, Address, Bytes, BytesN, Env};

const PERSONAL_SIGN_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// secp256k1 group order `n`, big-endian.
pub(crate) const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// `n / 2`, the largest `s` the host accepts.
const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// `keccak256(prefix || keccak256(xdr(sale) || xdr(beneficiary) || data))`
pub fn signing_digest(env: &Env, beneficiary: &Address, data: &Bytes) -> Hash<32> {
    let mut message = env.current_contract_address().to_xdr(env);
    message.append(&beneficiary.clone().to_xdr(env));
    message.append(data);
    let inner = env.crypto().keccak256(&message);

    let mut prefixed = Bytes::from_slice(env, PERSONAL_SIGN_PREFIX);
    prefixed.extend_from_array(&inner.to_array());
    env.crypto().keccak256(&prefixed)
}

/// `r` in `[1, n)` and `s` in `[1, n/2]`. Recovery traps on anything else, so callers screen
/// with this first.
pub fn is_well_formed(signature: &BytesN<64>) -> bool {
    let bytes = signature.to_array();
    let (r, s) = bytes.split_at(32);
    let is_zero = |scalar: &[u8]| scalar.iter().all(|b| *b == 0);
    !is_zero(r) && r < &CURVE_ORDER[..] && !is_zero(s) && s <= &HALF_CURVE_ORDER[..]
}

/// Recovers the uncompressed public key that produced `signature` over the purchase digest.
pub fn recover_signer(
    env: &Env,
    beneficiary: &Address,
    data: &Bytes,
    signature: &BytesN<64>,
    recovery_id: u32,
) -> BytesN<65> {
    let digest = signing_digest(env, beneficiary, data);
    env.crypto()
        .secp256k1_recover(&digest, signature, recovery_id)
}
