#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Bytes,
    BytesN, Env, Vec,
};

mod access;
mod interface;
mod signature;

use access::Capability;
use interface::{EscrowClient, SaleTokenClient};

pub(crate) const DAY_IN_LEDGERS: u32 = 17280;
pub(crate) const BUMP_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
pub(crate) const BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;

const WEEK: u64 = 7 * 24 * 60 * 60;

/// Fixed supply the reserve shares are computed against: 150M tokens with 18 decimals.
pub const TOKEN_SUPPLY: i128 = 150_000_000 * 1_000_000_000_000_000_000;

pub const SALE_PERCENT: i128 = 58;
pub const GAME_SUPPORT_PERCENT: i128 = 10;
pub const BOUNTY_PERCENT: i128 = 2;
pub const ADVISORS_PERCENT: i128 = 10;
pub const TEAM_PERCENT: i128 = 20;

#[contract]
pub struct Crowdsale;

#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct ReserveWallets {
    pub game_support_fund: Address,
    pub bounty_program: Address,
    pub advisors: Address,
    pub team: Address,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub enum Reserve {
    Disabled,
    /// Sold tokens are limited to the sale share and the rest is minted here at finalization.
    Allocate(ReserveWallets),
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct SaleConfig {
    pub opening_time: u64,
    pub closing_time: u64,
    /// Token units per unit of the payment asset, before bonus.
    pub rate: i128,
    pub wallet: Address,
    pub token: Address,
    pub payment_token: Address,
    pub cap: Option<i128>,
    pub min_contribution: Option<i128>,
    /// Receives `fee_percent` of each contribution when no escrow is configured.
    pub fee_wallet: Option<Address>,
    pub fee_percent: u32,
    /// Contributions are parked here until finalization decides between payout and refunds.
    pub escrow: Option<Address>,
    /// Raise needed for a payout; only meaningful with an escrow.
    pub goal: i128,
    pub reserve: Reserve,
    pub whitelist_enabled: bool,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Owner,
    Config,
    WeiRaised,
    TokensSold,
    Finalized,
}

#[contracterror]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum Error {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    NotOwner = 3,
    NotOpen = 4,
    ZeroValue = 5,
    BelowMinimum = 6,
    NotWhitelisted = 7,
    InvalidSignature = 8,
    CapExceeded = 9,
    NotClosed = 10,
    AlreadyFinalized = 11,
    NotFinalized = 12,
    GoalReached = 13,
    NoEscrow = 14,
    InvalidArgument = 15,
    MathOverflow = 16,
}

fn extend_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(BUMP_THRESHOLD, BUMP_AMOUNT);
}

fn read_owner(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .ok_or(Error::NotInitialized)
}

fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
    let owner = read_owner(env)?;
    if *caller != owner {
        return Err(Error::NotOwner);
    }
    caller.require_auth();
    Ok(())
}

fn read_config(env: &Env) -> Result<SaleConfig, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

fn read_amount(env: &Env, key: &DataKey) -> i128 {
    env.storage().instance().get(key).unwrap_or(0)
}

fn read_finalized(env: &Env) -> bool {
    env.storage()
        .instance()
        .get(&DataKey::Finalized)
        .unwrap_or(false)
}

fn percent_of(amount: i128, percent: i128) -> Result<i128, Error> {
    amount
        .checked_mul(percent)
        .ok_or(Error::MathOverflow)?
        .checked_div(100)
        .ok_or(Error::MathOverflow)
}

fn validate_config(env: &Env, config: &SaleConfig) -> Result<(), Error> {
    let now = env.ledger().timestamp();
    if config.opening_time < now || config.opening_time >= config.closing_time {
        return Err(Error::InvalidArgument);
    }
    if config.rate <= 0 {
        return Err(Error::InvalidArgument);
    }
    let positive = |value: &Option<i128>| value.map_or(true, |v| v > 0);
    if !positive(&config.cap) || !positive(&config.min_contribution) {
        return Err(Error::InvalidArgument);
    }
    if config.fee_percent > 100 || (config.fee_wallet.is_none() && config.fee_percent != 0) {
        return Err(Error::InvalidArgument);
    }
    if config.escrow.is_some() && config.goal <= 0 {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

/// Bonus in percent for a purchase at `now`, stepping down one tier per week towards closing.
fn bonus_at(config: &SaleConfig, now: u64) -> i128 {
    let remaining = config.closing_time.saturating_sub(now);
    if remaining > 4 * WEEK {
        20
    } else if remaining > 3 * WEEK {
        15
    } else if remaining > 2 * WEEK {
        10
    } else if remaining > WEEK {
        5
    } else {
        0
    }
}

fn token_amount_at(config: &SaleConfig, value: i128, now: u64) -> Result<i128, Error> {
    let base = value.checked_mul(config.rate).ok_or(Error::MathOverflow)?;
    percent_of(base, 100 + bonus_at(config, now))
}

fn is_open_at(config: &SaleConfig, now: u64) -> bool {
    config.opening_time <= now && now < config.closing_time
}

fn is_goal_reached(env: &Env, config: &SaleConfig) -> bool {
    match &config.escrow {
        Some(_) => read_amount(env, &DataKey::WeiRaised) >= config.goal,
        None => true,
    }
}

/// Shared purchase pipeline once the beneficiary has been admitted.
fn purchase(
    env: &Env,
    config: &SaleConfig,
    purchaser: &Address,
    beneficiary: &Address,
    value: i128,
) -> Result<i128, Error> {
    let now = env.ledger().timestamp();
    if !is_open_at(config, now) {
        return Err(Error::NotOpen);
    }
    if value <= 0 {
        return Err(Error::ZeroValue);
    }
    if let Some(minimum) = config.min_contribution {
        if value < minimum {
            return Err(Error::BelowMinimum);
        }
    }

    let wei_raised = read_amount(env, &DataKey::WeiRaised)
        .checked_add(value)
        .ok_or(Error::MathOverflow)?;
    if let Some(cap) = config.cap {
        if wei_raised > cap {
            return Err(Error::CapExceeded);
        }
    }

    let amount = token_amount_at(config, value, now)?;
    let tokens_sold = read_amount(env, &DataKey::TokensSold)
        .checked_add(amount)
        .ok_or(Error::MathOverflow)?;
    let reserve_mode = config.reserve != Reserve::Disabled;
    if reserve_mode && tokens_sold > percent_of(TOKEN_SUPPLY, SALE_PERCENT)? {
        return Err(Error::CapExceeded);
    }

    env.storage().instance().set(&DataKey::WeiRaised, &wei_raised);
    env.storage()
        .instance()
        .set(&DataKey::TokensSold, &tokens_sold);
    extend_instance(env);

    let sale = env.current_contract_address();
    SaleTokenClient::new(env, &config.token).mint(&sale, beneficiary, &amount);
    forward_funds(env, config, purchaser, value)?;

    env.events().publish(
        (symbol_short!("purchase"), purchaser.clone(), beneficiary.clone()),
        (value, amount),
    );
    Ok(amount)
}

fn forward_funds(
    env: &Env,
    config: &SaleConfig,
    purchaser: &Address,
    value: i128,
) -> Result<(), Error> {
    if let Some(escrow) = &config.escrow {
        let sale = env.current_contract_address();
        EscrowClient::new(env, escrow).deposit(&sale, purchaser, purchaser, &value);
        return Ok(());
    }

    let payment = token::Client::new(env, &config.payment_token);
    let mut rest = value;
    if let Some(fee_wallet) = &config.fee_wallet {
        let fee_share = percent_of(value, i128::from(config.fee_percent))?;
        rest = value.checked_sub(fee_share).ok_or(Error::MathOverflow)?;
        if fee_share > 0 {
            payment.transfer(purchaser, fee_wallet, &fee_share);
        }
    }
    if rest > 0 {
        payment.transfer(purchaser, &config.wallet, &rest);
    }
    Ok(())
}

fn mint_reserves(env: &Env, config: &SaleConfig, wallets: &ReserveWallets) -> Result<(), Error> {
    let sale_share = percent_of(TOKEN_SUPPLY, SALE_PERCENT)?;
    let unsold = sale_share
        .checked_sub(read_amount(env, &DataKey::TokensSold))
        .ok_or(Error::MathOverflow)?
        .max(0);
    let game_support = percent_of(TOKEN_SUPPLY, GAME_SUPPORT_PERCENT)?
        .checked_add(unsold)
        .ok_or(Error::MathOverflow)?;

    let sale = env.current_contract_address();
    let client = SaleTokenClient::new(env, &config.token);
    client.mint(&sale, &wallets.game_support_fund, &game_support);
    client.mint(
        &sale,
        &wallets.bounty_program,
        &percent_of(TOKEN_SUPPLY, BOUNTY_PERCENT)?,
    );
    client.mint(
        &sale,
        &wallets.advisors,
        &percent_of(TOKEN_SUPPLY, ADVISORS_PERCENT)?,
    );
    client.mint(&sale, &wallets.team, &percent_of(TOKEN_SUPPLY, TEAM_PERCENT)?);
    Ok(())
}

#[contractimpl]
impl Crowdsale {
    pub fn initialize(env: Env, owner: Address, config: SaleConfig) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        owner.require_auth();
        validate_config(&env, &config)?;

        let storage = env.storage().instance();
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::Config, &config);
        storage.set(&DataKey::WeiRaised, &0i128);
        storage.set(&DataKey::TokensSold, &0i128);
        storage.set(&DataKey::Finalized, &false);
        extend_instance(&env);
        Ok(())
    }

    /// Accepts a pending token ownership handed over with `transfer_ownership(sale)`.
    pub fn claim_token_ownership(env: Env, caller: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        let config = read_config(&env)?;
        SaleTokenClient::new(&env, &config.token)
            .claim_ownership(&env.current_contract_address());
        Ok(())
    }

    pub fn config(env: Env) -> Result<SaleConfig, Error> {
        read_config(&env)
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        read_owner(&env)
    }

    pub fn wei_raised(env: Env) -> i128 {
        read_amount(&env, &DataKey::WeiRaised)
    }

    pub fn tokens_sold(env: Env) -> i128 {
        read_amount(&env, &DataKey::TokensSold)
    }

    pub fn finalized(env: Env) -> bool {
        read_finalized(&env)
    }

    pub fn has_closed(env: Env) -> Result<bool, Error> {
        let config = read_config(&env)?;
        Ok(env.ledger().timestamp() > config.closing_time)
    }

    pub fn is_open(env: Env) -> Result<bool, Error> {
        let config = read_config(&env)?;
        Ok(is_open_at(&config, env.ledger().timestamp()))
    }

    pub fn bonus_percent(env: Env) -> Result<u32, Error> {
        let config = read_config(&env)?;
        let bonus = bonus_at(&config, env.ledger().timestamp());
        u32::try_from(bonus).map_err(|_| Error::MathOverflow)
    }

    /// Tokens a purchase of `value` would mint right now.
    pub fn token_amount(env: Env, value: i128) -> Result<i128, Error> {
        let config = read_config(&env)?;
        token_amount_at(&config, value, env.ledger().timestamp())
    }

    pub fn goal_reached(env: Env) -> Result<bool, Error> {
        let config = read_config(&env)?;
        Ok(is_goal_reached(&env, &config))
    }

    /// `purchaser` pays `value` of the payment asset; `beneficiary` receives the tokens.
    pub fn buy_tokens(
        env: Env,
        purchaser: Address,
        beneficiary: Address,
        value: i128,
    ) -> Result<i128, Error> {
        purchaser.require_auth();
        let config = read_config(&env)?;
        if config.whitelist_enabled
            && !access::has(&env, &Capability::Whitelisted(beneficiary.clone()))
        {
            return Err(Error::NotWhitelisted);
        }
        purchase(&env, &config, &purchaser, &beneficiary, value)
    }

    /// Like `buy_tokens`, admitting the beneficiary on a bouncer signature over
    /// `signing_digest(beneficiary, data)` instead of the on-chain whitelist.
    pub fn buy_tokens_signed(
        env: Env,
        purchaser: Address,
        beneficiary: Address,
        value: i128,
        data: Bytes,
        signature: BytesN<64>,
        recovery_id: u32,
    ) -> Result<i128, Error> {
        purchaser.require_auth();
        let config = read_config(&env)?;
        if recovery_id > 3 || !signature::is_well_formed(&signature) {
            return Err(Error::InvalidSignature);
        }
        let signer =
            signature::recover_signer(&env, &beneficiary, &data, &signature, recovery_id);
        if !access::has(&env, &Capability::Bouncer(signer)) {
            return Err(Error::InvalidSignature);
        }
        purchase(&env, &config, &purchaser, &beneficiary, value)
    }

    pub fn signing_digest(env: Env, beneficiary: Address, data: Bytes) -> BytesN<32> {
        signature::signing_digest(&env, &beneficiary, &data).to_bytes()
    }

    pub fn whitelist(env: Env, account: Address) -> bool {
        access::has(&env, &Capability::Whitelisted(account))
    }

    pub fn add_to_whitelist(env: Env, caller: Address, account: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if access::grant(&env, &Capability::Whitelisted(account.clone())) {
            env.events().publish((symbol_short!("wl_add"), account), ());
        }
        Ok(())
    }

    pub fn add_many_to_whitelist(
        env: Env,
        caller: Address,
        accounts: Vec<Address>,
    ) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        for account in accounts.iter() {
            if access::grant(&env, &Capability::Whitelisted(account.clone())) {
                env.events().publish((symbol_short!("wl_add"), account), ());
            }
        }
        Ok(())
    }

    pub fn remove_from_whitelist(
        env: Env,
        caller: Address,
        account: Address,
    ) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if access::revoke(&env, &Capability::Whitelisted(account.clone())) {
            env.events().publish((symbol_short!("wl_rm"), account), ());
        }
        Ok(())
    }

    pub fn add_bouncer(env: Env, caller: Address, key: BytesN<65>) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if access::grant(&env, &Capability::Bouncer(key.clone())) {
            env.events().publish((symbol_short!("bnc_add"),), key);
        }
        Ok(())
    }

    pub fn remove_bouncer(env: Env, caller: Address, key: BytesN<65>) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if access::revoke(&env, &Capability::Bouncer(key.clone())) {
            env.events().publish((symbol_short!("bnc_rm"),), key);
        }
        Ok(())
    }

    pub fn is_bouncer(env: Env, key: BytesN<65>) -> bool {
        access::has(&env, &Capability::Bouncer(key))
    }

    /// Settles the vault, mints reserve allocations and hands the token back to the owner.
    pub fn finalize(env: Env, caller: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if read_finalized(&env) {
            return Err(Error::AlreadyFinalized);
        }
        let config = read_config(&env)?;
        if env.ledger().timestamp() <= config.closing_time {
            return Err(Error::NotClosed);
        }

        env.storage().instance().set(&DataKey::Finalized, &true);
        extend_instance(&env);

        let sale = env.current_contract_address();
        let reached = is_goal_reached(&env, &config);
        if let Some(escrow) = &config.escrow {
            let escrow = EscrowClient::new(&env, escrow);
            if reached {
                escrow.close(&sale);
                escrow.beneficiary_withdraw();
            } else {
                escrow.enable_refunds(&sale);
            }
        }

        if let Reserve::Allocate(wallets) = &config.reserve {
            mint_reserves(&env, &config, wallets)?;
        }

        let token = SaleTokenClient::new(&env, &config.token);
        token.finish_minting(&sale);
        token.unpause(&sale);
        let owner = read_owner(&env)?;
        token.transfer_ownership(&sale, &owner);

        let wei_raised = read_amount(&env, &DataKey::WeiRaised);
        log!(
            &env,
            "sale finalized",
            wei_raised,
            read_amount(&env, &DataKey::TokensSold),
            reached
        );
        env.events()
            .publish((symbol_short!("finalized"),), (wei_raised, reached));
        Ok(())
    }

    /// Pays an investor's contribution back once a sale that missed its goal is finalized.
    pub fn claim_refund(env: Env, investor: Address) -> Result<i128, Error> {
        let config = read_config(&env)?;
        let escrow = config.escrow.clone().ok_or(Error::NoEscrow)?;
        if !read_finalized(&env) {
            return Err(Error::NotFinalized);
        }
        if is_goal_reached(&env, &config) {
            return Err(Error::GoalReached);
        }
        let refunded = EscrowClient::new(&env, &escrow).withdraw(&investor);
        env.events()
            .publish((symbol_short!("refunded"), investor), refunded);
        Ok(refunded)
    }
}
