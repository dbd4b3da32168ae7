//! Capability table for the sale: on-chain whitelist entries and bouncer signing keys.

use soroban_sdk::{contracttype, Address, BytesN, Env};

use crate::{BUMP_AMOUNT, BUMP_THRESHOLD};

#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub enum Capability {
    /// Beneficiary allowed to receive tokens without a signature.
    Whitelisted(Address),
    /// Uncompressed secp256k1 key whose signatures stand in for whitelist membership.
    Bouncer(BytesN<65>),
}

pub fn has(env: &Env, capability: &Capability) -> bool {
    let found = env.storage().persistent().has(capability);
    if found {
        env.storage()
            .persistent()
            .extend_ttl(capability, BUMP_THRESHOLD, BUMP_AMOUNT);
    }
    found
}

/// Returns `false` when the capability was already held.
pub fn grant(env: &Env, capability: &Capability) -> bool {
    if env.storage().persistent().has(capability) {
        return false;
    }
    env.storage().persistent().set(capability, &true);
    env.storage()
        .persistent()
        .extend_ttl(capability, BUMP_THRESHOLD, BUMP_AMOUNT);
    true
}

/// Returns `false` when there was nothing to revoke.
pub fn revoke(env: &Env, capability: &Capability) -> bool {
    if !env.storage().persistent().has(capability) {
        return false;
    }
    env.storage().persistent().remove(capability);
    true
}
